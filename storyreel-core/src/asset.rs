//! Scene asset locations inside a project directory

use crate::Result;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

/// File extension of the illustration written for each scene
pub const IMAGE_EXTENSION: &str = "jpg";

/// File extension of the narration written for each scene
pub const AUDIO_EXTENSION: &str = "mp3";

const SCENE_PREFIX: &str = "scene_";

/// Outcome reported by a generation service for one asset.
///
/// A `Fallback` means the service gave up and whatever sits at the asset path
/// (if anything) is a placeholder; the composer substitutes filler without
/// reading the file.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum AssetOutcome {
    #[default]
    Generated,
    Fallback { reason: String },
}

impl AssetOutcome {
    /// Builds a fallback outcome with the given reason
    pub fn fallback(reason: impl Into<String>) -> Self {
        Self::Fallback {
            reason: reason.into(),
        }
    }
}

/// Resolved asset paths for a single scene
#[derive(Debug, Clone)]
pub struct SceneAssets {
    /// Scene number as supplied by the caller
    pub scene_number: u32,
    /// Expected illustration path
    pub image_path: PathBuf,
    /// Expected narration path
    pub audio_path: PathBuf,
    /// Outcome reported for the illustration
    pub image_outcome: AssetOutcome,
    /// Outcome reported for the narration
    pub audio_outcome: AssetOutcome,
}

impl SceneAssets {
    /// Records the outcome the illustration service reported
    pub fn with_image_outcome(mut self, outcome: AssetOutcome) -> Self {
        self.image_outcome = outcome;
        self
    }

    /// Records the outcome the narration service reported
    pub fn with_audio_outcome(mut self, outcome: AssetOutcome) -> Self {
        self.audio_outcome = outcome;
        self
    }

    /// Checks whether the illustration file is on disk
    pub fn image_exists(&self) -> bool {
        self.image_path.is_file()
    }

    /// Checks whether the narration file is on disk
    pub fn audio_exists(&self) -> bool {
        self.audio_path.is_file()
    }
}

/// Computes where the per-scene assets of a project live
#[derive(Debug, Clone)]
pub struct AssetLocator {
    project_dir: PathBuf,
}

impl AssetLocator {
    /// Creates a locator rooted at the given project directory
    pub fn new(project_dir: impl Into<PathBuf>) -> Self {
        Self {
            project_dir: project_dir.into(),
        }
    }

    /// Returns the project directory
    pub fn project_dir(&self) -> &Path {
        &self.project_dir
    }

    /// Returns `<project_dir>/scene_<n>.jpg`
    pub fn image_path(&self, scene_number: u32) -> PathBuf {
        self.project_dir
            .join(format!("{SCENE_PREFIX}{scene_number}.{IMAGE_EXTENSION}"))
    }

    /// Returns `<project_dir>/scene_<n>.mp3`
    pub fn audio_path(&self, scene_number: u32) -> PathBuf {
        self.project_dir
            .join(format!("{SCENE_PREFIX}{scene_number}.{AUDIO_EXTENSION}"))
    }

    /// Resolves both asset paths for a scene
    pub fn locate(&self, scene_number: u32) -> SceneAssets {
        SceneAssets {
            scene_number,
            image_path: self.image_path(scene_number),
            audio_path: self.audio_path(scene_number),
            image_outcome: AssetOutcome::Generated,
            audio_outcome: AssetOutcome::Generated,
        }
    }

    /// Lists the scene numbers that have at least one asset on disk, ascending.
    pub fn discover_scenes(&self) -> Result<Vec<u32>> {
        let mut scenes = BTreeSet::new();

        for entry in std::fs::read_dir(&self.project_dir)? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            if let Some(scene_number) = entry.file_name().to_str().and_then(parse_scene_file) {
                scenes.insert(scene_number);
            }
        }

        Ok(scenes.into_iter().collect())
    }
}

/// Parses `scene_<n>.jpg` / `scene_<n>.mp3` into `n`
fn parse_scene_file(file_name: &str) -> Option<u32> {
    let (stem, extension) = file_name.rsplit_once('.')?;
    if extension != IMAGE_EXTENSION && extension != AUDIO_EXTENSION {
        return None;
    }
    let digits = stem.strip_prefix(SCENE_PREFIX)?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    // Names must round-trip through image_path and audio_path
    if digits.len() > 1 && digits.starts_with('0') {
        return None;
    }
    digits.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_paths_follow_scene_naming() {
        let locator = AssetLocator::new("/tmp/project");
        assert_eq!(locator.image_path(3), Path::new("/tmp/project/scene_3.jpg"));
        assert_eq!(locator.audio_path(3), Path::new("/tmp/project/scene_3.mp3"));

        let assets = locator.locate(12);
        assert_eq!(assets.scene_number, 12);
        assert_eq!(assets.image_path, Path::new("/tmp/project/scene_12.jpg"));
        assert_eq!(assets.image_outcome, AssetOutcome::Generated);
    }

    #[test]
    fn test_missing_files_are_not_errors() {
        let dir = tempfile::tempdir().unwrap();
        let assets = AssetLocator::new(dir.path()).locate(1);
        assert!(!assets.image_exists());
        assert!(!assets.audio_exists());
    }

    #[test]
    fn test_discover_scenes() {
        let dir = tempfile::tempdir().unwrap();
        for name in [
            "scene_2.mp3",
            "scene_2.jpg",
            "scene_10.jpg",
            "scene_1.mp3",
            "scene_x.jpg",
            "scene_4.png",
            "story_data.json",
            "temp_audio.m4a",
        ] {
            fs::write(dir.path().join(name), b"").unwrap();
        }
        fs::create_dir(dir.path().join("scene_7.jpg")).unwrap();

        let scenes = AssetLocator::new(dir.path()).discover_scenes().unwrap();
        assert_eq!(scenes, vec![1, 2, 10]);
    }

    #[test]
    fn test_parse_scene_file() {
        assert_eq!(parse_scene_file("scene_5.jpg"), Some(5));
        assert_eq!(parse_scene_file("scene_.jpg"), None);
        assert_eq!(parse_scene_file("scene_-1.mp3"), None);
        assert_eq!(parse_scene_file("scene_5.jpg.bak"), None);
        assert_eq!(parse_scene_file("scene_0.jpg"), Some(0));
        assert_eq!(parse_scene_file("scene_01.jpg"), None);
        assert_eq!(parse_scene_file("scene_007.mp3"), None);
    }

    #[test]
    fn test_discovered_scenes_resolve_to_existing_files() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["scene_01.jpg", "scene_0.jpg", "scene_3.mp3", "scene_030.jpg"] {
            fs::write(dir.path().join(name), b"").unwrap();
        }

        let locator = AssetLocator::new(dir.path());
        let scenes = locator.discover_scenes().unwrap();
        assert_eq!(scenes, vec![0, 3]);
        for scene_number in scenes {
            let assets = locator.locate(scene_number);
            assert!(assets.image_exists() || assets.audio_exists(), "{scene_number}");
        }
    }
}
