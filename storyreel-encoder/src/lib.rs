//! Storyreel Encoder Library
//!
//! This library composes per-scene illustrations and narration into scene
//! units and renders them to a single MP4 file.

pub mod audio_reader;
pub mod exporter;
pub mod ffmpeg_encoder;
pub mod loader;
pub mod pipeline;
pub mod progress_tracker;
pub mod scene_composer;

#[cfg(test)]
pub(crate) mod testing;

pub use audio_reader::AudioReader;
pub use exporter::{frame_spans, mix_timeline_audio, ExportJob, Renderer};
pub use ffmpeg_encoder::FfmpegExporter;
pub use loader::{FileMediaLoader, MediaLoader};
pub use pipeline::{assemble, Pipeline};
pub use scene_composer::SceneComposer;

use storyreel_core::{ExportProfile, SceneTiming};

/// Result type for storyreel-encoder operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for storyreel-encoder operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Storyreel core error: {0}")]
    Core(#[from] storyreel_core::Error),

    #[error("Compositor error: {0}")]
    Compositor(#[from] storyreel_compositor::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("FFmpeg error: {0}")]
    Ffmpeg(#[from] ffmpeg_next::Error),

    #[error("Export error: {0}")]
    Export(String),

    #[error("Encoder not found: {0}")]
    EncoderNotFound(String),

    #[error("No audio stream found")]
    NoAudioStream,
}

impl Error {
    /// Whether the run failed because no scene produced a unit
    pub fn is_empty_timeline(&self) -> bool {
        matches!(self, Error::Core(storyreel_core::Error::EmptyTimeline))
    }
}

/// Pipeline configuration
#[derive(Debug, Clone, Default)]
pub struct PipelineConfig {
    /// Encoding parameters for the final render
    pub profile: ExportProfile,
    /// Scene duration rules
    pub timing: SceneTiming,
}
