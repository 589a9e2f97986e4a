//! End-to-end assembly: locate, compose, concatenate, render, release

use crate::exporter::{ExportJob, Renderer};
use crate::ffmpeg_encoder::FfmpegExporter;
use crate::loader::{FileMediaLoader, MediaLoader};
use crate::scene_composer::SceneComposer;
use crate::{PipelineConfig, Result};
use std::path::{Path, PathBuf};
use storyreel_core::{
    AssemblyReport, AssetLocator, ExportProfile, Reaper, SceneAssets, SceneTiming, Timeline,
};
use tracing::{error, info, instrument};

/// Assembles scene assets into one video file.
///
/// Scenes are composed one after another in the order given. Every media
/// handle opened during a run is released before the run returns, whether the
/// render succeeded or not.
pub struct Pipeline<L, R> {
    loader: L,
    renderer: R,
    config: PipelineConfig,
}

impl<L: MediaLoader, R: Renderer> Pipeline<L, R> {
    /// Creates a pipeline with the default profile and timing
    pub fn new(loader: L, renderer: R) -> Self {
        Self {
            loader,
            renderer,
            config: PipelineConfig::default(),
        }
    }

    /// Replaces the export profile
    pub fn with_profile(mut self, profile: ExportProfile) -> Self {
        self.config.profile = profile;
        self
    }

    /// Replaces the scene duration rules
    pub fn with_timing(mut self, timing: SceneTiming) -> Self {
        self.config.timing = timing;
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Assembles `scenes` from `project_dir` into `project_dir/output_filename`
    #[instrument(skip(self, project_dir), fields(project_dir = %project_dir.display()))]
    pub fn run(
        &self,
        project_dir: &Path,
        scenes: &[u32],
        output_filename: &str,
    ) -> Result<AssemblyReport> {
        let locator = AssetLocator::new(project_dir);
        let assets: Vec<SceneAssets> = scenes.iter().map(|&n| locator.locate(n)).collect();
        self.run_assets(project_dir, &assets, output_filename)
    }

    /// Like [`Pipeline::run`], for callers that already know how each asset
    /// was produced
    pub fn run_assets(
        &self,
        project_dir: &Path,
        assets: &[SceneAssets],
        output_filename: &str,
    ) -> Result<AssemblyReport> {
        info!("Composing {} scenes", assets.len());

        let composer = SceneComposer::new(
            &self.loader,
            self.config.profile.frame_size,
            self.config.timing,
        );
        let units = assets.iter().map(|scene| composer.compose(scene)).collect();

        let timeline = Timeline::assemble(units).inspect_err(|_| {
            error!("No valid clips found.");
        })?;
        let mut timeline = Reaper::new(timeline);

        let job = ExportJob::new(self.config.profile.clone(), project_dir, output_filename);
        let report = AssemblyReport::from_timeline(&timeline, job.output_path.clone());
        info!(
            "Exporting {} scenes ({:.2}s) to {}",
            timeline.len(),
            report.total_duration,
            job.output_path.display()
        );

        if let Err(e) = self.renderer.render(&mut timeline, &job) {
            error!("Video generation failed: {e}");
            return Err(e);
        }

        info!("Video generated successfully: {}", job.output_path.display());
        if report.degraded_scenes() > 0 {
            info!(
                "{} of {} scenes used a black screen or silence",
                report.degraded_scenes(),
                report.scenes.len()
            );
        }
        Ok(report)
    }

    /// Runs the pipeline and returns the rendered file's path
    pub fn assemble(
        &self,
        project_dir: &Path,
        scenes: &[u32],
        output_filename: &str,
    ) -> Result<PathBuf> {
        self.run(project_dir, scenes, output_filename)
            .map(|report| report.output_path)
    }
}

/// Assembles `scenes` with the file loader and the FFmpeg exporter
pub fn assemble(project_dir: &Path, scenes: &[u32], output_filename: &str) -> Result<PathBuf> {
    Pipeline::new(FileMediaLoader, FfmpegExporter::new()).assemble(
        project_dir,
        scenes,
        output_filename,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{project_with, FakeLoader, RecordingRenderer};
    use storyreel_core::{AssetOutcome, AssetState, FrameSize, DEFAULT_OUTPUT_FILENAME};

    #[test]
    fn test_two_scene_story() {
        let dir = project_with(&["scene_1.jpg", "scene_1.mp3", "scene_2.mp3"]);
        let loader = FakeLoader::new()
            .with_image("scene_1.jpg", 1920, 1080)
            .with_audio("scene_1.mp3", 3.2)
            .with_audio("scene_2.mp3", 2.0);
        let renderer = RecordingRenderer::new();
        let pipeline = Pipeline::new(&loader, &renderer);

        let report = pipeline
            .run(dir.path(), &[1, 2], DEFAULT_OUTPUT_FILENAME)
            .unwrap();

        assert_eq!(report.output_path, dir.path().join("final_video.mp4"));
        assert!(report.output_path.is_file());
        assert!((report.total_duration - 5.2).abs() < 1e-9);
        assert_eq!(report.scenes[1].image, AssetState::Missing);
        assert_eq!(report.degraded_scenes(), 1);

        let rendered = renderer.rendered();
        assert_eq!(rendered.len(), 2);
        assert!(rendered
            .iter()
            .all(|unit| unit.frame_size == FrameSize::new(1280, 720)));
        assert_eq!(rendered[0].duration, 3.2);
        assert_eq!(rendered[1].duration, 2.0);

        let counters = loader.counters();
        assert_eq!(counters.opened(), 3);
        assert_eq!(counters.closed(), 3);
    }

    #[test]
    fn test_scene_order_is_preserved() {
        let dir = project_with(&["scene_1.mp3", "scene_2.mp3", "scene_3.mp3"]);
        let loader = FakeLoader::new()
            .with_audio("scene_1.mp3", 1.0)
            .with_audio("scene_2.mp3", 2.0)
            .with_audio("scene_3.mp3", 3.0);
        let renderer = RecordingRenderer::new();

        Pipeline::new(&loader, &renderer)
            .assemble(dir.path(), &[3, 1, 2], "story.mp4")
            .unwrap();

        let order: Vec<u32> = renderer
            .rendered()
            .iter()
            .map(|unit| unit.scene_number)
            .collect();
        assert_eq!(order, vec![3, 1, 2]);
    }

    #[test]
    fn test_empty_scene_list_fails_without_output() {
        let dir = project_with(&[]);
        let loader = FakeLoader::new();
        let renderer = RecordingRenderer::new();

        let err = Pipeline::new(&loader, &renderer)
            .run(dir.path(), &[], DEFAULT_OUTPUT_FILENAME)
            .unwrap_err();

        assert!(err.is_empty_timeline());
        assert!(renderer.rendered().is_empty());
        assert!(!dir.path().join(DEFAULT_OUTPUT_FILENAME).exists());
    }

    #[test]
    fn test_all_assets_missing_still_renders() {
        let dir = project_with(&[]);
        let loader = FakeLoader::new();
        let renderer = RecordingRenderer::new();

        let report = Pipeline::new(&loader, &renderer)
            .run(dir.path(), &[1, 2], DEFAULT_OUTPUT_FILENAME)
            .unwrap();

        assert_eq!(report.total_duration, 10.0);
        assert_eq!(report.degraded_scenes(), 2);
    }

    #[test]
    fn test_render_failure_releases_everything() {
        let dir = project_with(&["scene_1.jpg", "scene_1.mp3", "scene_2.jpg"]);
        let loader = FakeLoader::new()
            .with_image("scene_1.jpg", 640, 480)
            .with_audio("scene_1.mp3", 1.0)
            .with_image("scene_2.jpg", 480, 640);
        let renderer = RecordingRenderer::failing();

        let result = Pipeline::new(&loader, &renderer).assemble(
            dir.path(),
            &[1, 2],
            DEFAULT_OUTPUT_FILENAME,
        );

        assert!(result.is_err());
        let counters = loader.counters();
        assert_eq!(counters.opened(), 3);
        assert_eq!(counters.closed(), 3);
    }

    #[test]
    fn test_run_assets_honours_fallbacks() {
        let dir = project_with(&["scene_1.jpg", "scene_1.mp3"]);
        let loader = FakeLoader::new()
            .with_image("scene_1.jpg", 1280, 720)
            .with_audio("scene_1.mp3", 4.0);
        let renderer = RecordingRenderer::new();
        let assets = vec![AssetLocator::new(dir.path())
            .locate(1)
            .with_audio_outcome(AssetOutcome::fallback("tts quota exceeded"))];

        let report = Pipeline::new(&loader, &renderer)
            .run_assets(dir.path(), &assets, DEFAULT_OUTPUT_FILENAME)
            .unwrap();

        assert_eq!(report.scenes[0].image, AssetState::Loaded);
        assert_eq!(report.scenes[0].audio, AssetState::Fallback);
        assert_eq!(report.total_duration, 5.0);
        assert_eq!(loader.counters().opened(), 1);
        assert_eq!(loader.counters().closed(), 1);
    }

    #[test]
    fn test_custom_profile_and_timing() {
        let dir = project_with(&["scene_1.jpg"]);
        let loader = FakeLoader::new().with_image("scene_1.jpg", 100, 100);
        let renderer = RecordingRenderer::new();
        let profile = ExportProfile {
            frame_size: FrameSize::new(320, 240),
            ..ExportProfile::default()
        };
        let timing = SceneTiming {
            default_duration: 2.0,
            ..SceneTiming::default()
        };

        let report = Pipeline::new(&loader, &renderer)
            .with_profile(profile)
            .with_timing(timing)
            .run(dir.path(), &[1], "small.mp4")
            .unwrap();

        assert_eq!(report.total_duration, 2.0);
        assert_eq!(renderer.rendered()[0].frame_size, FrameSize::new(320, 240));
    }
}
