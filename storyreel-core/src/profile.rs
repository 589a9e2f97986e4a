//! Fixed export profile and scene timing constants

use std::path::{Path, PathBuf};

/// Output file name used when the caller does not supply one
pub const DEFAULT_OUTPUT_FILENAME: &str = "final_video.mp4";

/// Frame dimensions in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameSize {
    pub width: u32,
    pub height: u32,
}

impl FrameSize {
    /// Creates a new frame size
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Width divided by height
    pub fn aspect(&self) -> f64 {
        self.width as f64 / self.height as f64
    }
}

/// Encoding parameters applied to every render
#[derive(Debug, Clone, PartialEq)]
pub struct ExportProfile {
    /// Output frame size
    pub frame_size: FrameSize,
    /// Output frame rate
    pub fps: u32,
    /// FFmpeg encoder name for the video stream
    pub video_codec: String,
    /// FFmpeg encoder name for the audio stream
    pub audio_codec: String,
    /// Encoder speed preset
    pub preset: String,
    /// Worker threads handed to the video encoder
    pub threads: u32,
    /// Sample rate of the encoded audio
    pub audio_sample_rate: u32,
    /// File name of the intermediate audio track, created in the project directory
    pub temp_audio_filename: String,
}

impl Default for ExportProfile {
    fn default() -> Self {
        Self {
            frame_size: FrameSize::new(1280, 720),
            fps: 30,
            video_codec: "libx264".to_string(),
            audio_codec: "aac".to_string(),
            preset: "ultrafast".to_string(),
            threads: 4,
            audio_sample_rate: 48_000,
            temp_audio_filename: "temp_audio.m4a".to_string(),
        }
    }
}

impl ExportProfile {
    /// Path of the intermediate audio file for a project
    pub fn temp_audio_path(&self, project_dir: &Path) -> PathBuf {
        project_dir.join(&self.temp_audio_filename)
    }
}

/// Scene duration rules
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SceneTiming {
    /// Duration of a scene without usable narration, in seconds
    pub default_duration: f64,
    /// Lower bound applied to narration length, in seconds
    pub min_duration: f64,
}

impl Default for SceneTiming {
    fn default() -> Self {
        Self {
            default_duration: 5.0,
            min_duration: 0.1,
        }
    }
}

impl SceneTiming {
    /// Scene duration for narration of the given length.
    ///
    /// Malformed lengths (negative, zero, NaN, infinite) collapse to the floor.
    pub fn duration_from_audio(&self, audio_secs: f64) -> f64 {
        if audio_secs.is_finite() {
            audio_secs.max(self.min_duration)
        } else {
            self.min_duration
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_profile() {
        let profile = ExportProfile::default();
        assert_eq!(profile.frame_size, FrameSize::new(1280, 720));
        assert_eq!(profile.fps, 30);
        assert_eq!(profile.video_codec, "libx264");
        assert_eq!(profile.audio_codec, "aac");
        assert_eq!(profile.preset, "ultrafast");
        assert_eq!(profile.threads, 4);
        assert_eq!(
            profile.temp_audio_path(Path::new("/work/story")),
            Path::new("/work/story/temp_audio.m4a")
        );
    }

    #[test]
    fn test_duration_floor() {
        let timing = SceneTiming::default();
        assert_eq!(timing.duration_from_audio(3.2), 3.2);
        assert_eq!(timing.duration_from_audio(0.0), 0.1);
        assert_eq!(timing.duration_from_audio(-4.0), 0.1);
        assert_eq!(timing.duration_from_audio(f64::NAN), 0.1);
        assert_eq!(timing.duration_from_audio(f64::INFINITY), 0.1);
    }
}
