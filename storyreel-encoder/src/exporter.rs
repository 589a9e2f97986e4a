//! Render contract and the timing math shared by renderers

use crate::Result;
use std::ops::Range;
use std::path::{Path, PathBuf};
use storyreel_core::{ExportProfile, Timeline};
use tracing::warn;

/// Where and how a timeline is rendered
#[derive(Debug, Clone)]
pub struct ExportJob {
    pub profile: ExportProfile,
    pub output_path: PathBuf,
    pub temp_audio_path: PathBuf,
}

impl ExportJob {
    /// Creates a job writing `output_filename` inside `project_dir`
    pub fn new(profile: ExportProfile, project_dir: &Path, output_filename: &str) -> Self {
        let temp_audio_path = profile.temp_audio_path(project_dir);
        Self {
            profile,
            output_path: project_dir.join(output_filename),
            temp_audio_path,
        }
    }
}

/// Renders an assembled timeline to a video file
pub trait Renderer {
    /// Writes `job.output_path`.
    ///
    /// The timeline stays owned by the caller, which releases it whatever the
    /// outcome.
    fn render(&self, timeline: &mut Timeline, job: &ExportJob) -> Result<()>;
}

impl<R: Renderer + ?Sized> Renderer for &R {
    fn render(&self, timeline: &mut Timeline, job: &ExportJob) -> Result<()> {
        (**self).render(timeline, job)
    }
}

/// Frame index ranges of each unit at `fps`.
///
/// Ranges are contiguous and every unit gets at least one frame. Boundaries
/// round the cumulative end time so per-unit rounding errors do not add up.
pub fn frame_spans(timeline: &Timeline, fps: u32) -> Vec<Range<u64>> {
    let mut spans = Vec::with_capacity(timeline.len());
    let mut start = 0u64;
    let mut elapsed = 0.0f64;

    for unit in timeline.units() {
        elapsed += unit.duration();
        let end = ((elapsed * f64::from(fps)).round() as u64).max(start + 1);
        spans.push(start..end);
        start = end;
    }

    spans
}

/// Decodes the narration of every unit into one interleaved stereo track.
///
/// Each unit's audio is trimmed or padded with silence to the unit's
/// duration, so the track lines up with [`frame_spans`]. A unit whose
/// narration cannot be decoded contributes silence.
pub fn mix_timeline_audio(timeline: &mut Timeline, sample_rate: u32) -> Vec<f32> {
    let rate = f64::from(sample_rate);
    let mut samples = Vec::new();
    let mut elapsed = 0.0f64;
    let mut written = 0usize;

    for unit in timeline.units_mut() {
        elapsed += unit.duration();
        let end = (elapsed * rate).round() as usize;
        let needed = end.saturating_sub(written);
        let scene_number = unit.scene_number();

        let mut chunk = match unit.audio_mut() {
            Some(audio) => audio.read_stereo(sample_rate).unwrap_or_else(|e| {
                warn!("Failed to decode audio for scene {scene_number}: {e}");
                Vec::new()
            }),
            None => Vec::new(),
        };
        chunk.resize(needed * 2, 0.0);

        samples.extend_from_slice(&chunk);
        written += needed;
    }

    samples
}
