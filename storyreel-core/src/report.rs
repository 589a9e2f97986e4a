//! Summary of an assembly run

use crate::timeline::{ComposedSceneUnit, Timeline};
use std::fmt;
use std::path::PathBuf;

/// How one asset of a scene was obtained
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum AssetState {
    /// Read from disk and used
    Loaded,
    /// Not on disk; filler used
    Missing,
    /// On disk but could not be decoded; filler used
    Unreadable,
    /// The generation service reported a fallback; filler used
    Fallback,
}

impl AssetState {
    /// Whether filler content replaced the asset
    pub fn is_degraded(&self) -> bool {
        !matches!(self, AssetState::Loaded)
    }
}

impl fmt::Display for AssetState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AssetState::Loaded => write!(f, "loaded"),
            AssetState::Missing => write!(f, "missing"),
            AssetState::Unreadable => write!(f, "unreadable"),
            AssetState::Fallback => write!(f, "fallback"),
        }
    }
}

/// Per-scene line of an [`AssemblyReport`]
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SceneReport {
    pub scene_number: u32,
    /// Effective duration in seconds
    pub duration: f64,
    pub image: AssetState,
    pub audio: AssetState,
}

impl From<&ComposedSceneUnit> for SceneReport {
    fn from(unit: &ComposedSceneUnit) -> Self {
        Self {
            scene_number: unit.scene_number(),
            duration: unit.duration(),
            image: unit.image_state(),
            audio: unit.audio_state(),
        }
    }
}

/// What a successful run produced
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AssemblyReport {
    /// Rendered video file
    pub output_path: PathBuf,
    /// Sum of scene durations in seconds
    pub total_duration: f64,
    /// Scenes in playback order
    pub scenes: Vec<SceneReport>,
}

impl AssemblyReport {
    /// Summarises a timeline that is about to be rendered to `output_path`
    pub fn from_timeline(timeline: &Timeline, output_path: PathBuf) -> Self {
        Self {
            output_path,
            total_duration: timeline.total_duration(),
            scenes: timeline.units().iter().map(SceneReport::from).collect(),
        }
    }

    /// Number of scenes that used filler for the image or the narration
    pub fn degraded_scenes(&self) -> usize {
        self.scenes
            .iter()
            .filter(|s| s.image.is_degraded() || s.audio.is_degraded())
            .count()
    }

    /// Pretty-printed JSON form
    #[cfg(feature = "serde")]
    pub fn to_json(&self) -> crate::Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
