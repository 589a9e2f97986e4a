//! Storyreel Core Library
//!
//! This library provides the data structures shared by the storyreel
//! assembly pipeline: scene asset locations, the fixed export profile,
//! media tracks with explicit release, and the scene timeline.

pub mod asset;
pub mod profile;
pub mod reaper;
pub mod report;
pub mod timeline;
pub mod track;

pub use asset::{AssetLocator, AssetOutcome, SceneAssets};
pub use profile::{ExportProfile, FrameSize, SceneTiming, DEFAULT_OUTPUT_FILENAME};
pub use reaper::Reaper;
pub use report::{AssemblyReport, AssetState, SceneReport};
pub use timeline::{ComposedSceneUnit, Timeline};
pub use track::{AudioSource, AudioTrack, ImageSource, Placement, Release, TrackKind, VisualTrack};

/// Result type for storyreel-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for storyreel-core operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("No scene units to assemble")]
    EmptyTimeline,

    #[error("{0} track was already released")]
    AlreadyReleased(TrackKind),

    #[error("Failed to release {kind} track: {reason}")]
    Release { kind: TrackKind, reason: String },

    #[error("Media decode error: {0}")]
    Decode(String),

    #[cfg(feature = "serde")]
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
