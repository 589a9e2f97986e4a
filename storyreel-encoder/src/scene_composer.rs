//! Per-scene composition of illustration and narration

use crate::loader::MediaLoader;
use std::path::Path;
use storyreel_compositor::FrameCompositor;
use storyreel_core::{
    AssetOutcome, AssetState, AudioTrack, ComposedSceneUnit, FrameSize, ImageSource,
    SceneAssets, SceneTiming, VisualTrack,
};
use tracing::{error, info, warn};

/// Turns the assets of one scene into a timed scene unit.
///
/// Composition never fails: an asset that is missing, reported as a fallback
/// or unreadable is replaced by a black frame or by silence.
pub struct SceneComposer<L> {
    loader: L,
    compositor: FrameCompositor,
    timing: SceneTiming,
}

impl<L: MediaLoader> SceneComposer<L> {
    /// Creates a composer producing frames of `frame_size`
    pub fn new(loader: L, frame_size: FrameSize, timing: SceneTiming) -> Self {
        Self {
            loader,
            compositor: FrameCompositor::new(frame_size),
            timing,
        }
    }

    /// Composes one scene
    pub fn compose(&self, assets: &SceneAssets) -> ComposedSceneUnit {
        let scene_number = assets.scene_number;

        let (image, mut image_state) = self.load_image(assets);
        let (audio, audio_state) = self.load_audio(assets);

        let duration = match &audio {
            Some(audio) => self.timing.duration_from_audio(audio.duration()),
            None => self.timing.default_duration,
        };

        let visual = match image {
            Some(source) => match self.compositor.letterbox(source.rgba()) {
                Ok((frame, placement)) => VisualTrack::new(frame, placement, duration, source),
                Err(e) => {
                    error!("Failed to resize image for scene {scene_number}: {e}");
                    close_image(source, &assets.image_path);
                    image_state = AssetState::Unreadable;
                    self.filler(scene_number, duration)
                }
            },
            None => self.filler(scene_number, duration),
        };

        info!("Scene {scene_number} added (duration: {duration:.2}s)");
        ComposedSceneUnit::new(scene_number, visual, audio, duration)
            .with_states(image_state, audio_state)
    }

    fn filler(&self, scene_number: u32, duration: f64) -> VisualTrack {
        warn!("Using black screen for scene {scene_number}");
        VisualTrack::filler(self.compositor.target(), duration)
    }

    fn load_image(&self, assets: &SceneAssets) -> (Option<Box<dyn ImageSource>>, AssetState) {
        let scene_number = assets.scene_number;
        let path = &assets.image_path;

        if let AssetOutcome::Fallback { reason } = &assets.image_outcome {
            warn!("Image generation fell back for scene {scene_number}: {reason}");
            return (None, AssetState::Fallback);
        }
        if !assets.image_exists() {
            warn!("Image not found for scene {scene_number}");
            return (None, AssetState::Missing);
        }

        match self.loader.load_image(path) {
            Ok(image) => {
                info!("Loaded image for scene {scene_number}");
                (Some(image), AssetState::Loaded)
            }
            Err(e) => {
                error!("Failed to load image {}: {e}", path.display());
                (None, AssetState::Unreadable)
            }
        }
    }

    fn load_audio(&self, assets: &SceneAssets) -> (Option<AudioTrack>, AssetState) {
        let scene_number = assets.scene_number;
        let path = &assets.audio_path;

        if let AssetOutcome::Fallback { reason } = &assets.audio_outcome {
            warn!("Narration fell back for scene {scene_number}: {reason}");
            return (None, AssetState::Fallback);
        }
        if !assets.audio_exists() {
            warn!("Audio not found for scene {scene_number}");
            return (None, AssetState::Missing);
        }

        match self.loader.load_audio(path) {
            Ok(source) => {
                info!("Loaded audio for scene {scene_number}");
                (Some(AudioTrack::new(source)), AssetState::Loaded)
            }
            Err(e) => {
                error!("Failed to load audio {}: {e}", path.display());
                (None, AssetState::Unreadable)
            }
        }
    }
}

fn close_image(mut source: Box<dyn ImageSource>, path: &Path) {
    if let Err(e) = source.close() {
        warn!("Error closing image {}: {e}", path.display());
    }
}
