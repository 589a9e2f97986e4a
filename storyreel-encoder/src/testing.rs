//! In-memory media doubles for pipeline tests

use crate::{Error, ExportJob, MediaLoader, Renderer, Result};
use image::{Rgba, RgbaImage};
use std::cell::RefCell;
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use storyreel_core::{
    AudioSource, AudioTrack, ComposedSceneUnit, FrameSize, ImageSource, Release, Timeline,
    VisualTrack,
};
use tempfile::TempDir;

/// Counts handles opened and closed by a [`FakeLoader`]
#[derive(Debug, Clone, Default)]
pub(crate) struct Counters {
    opened: Arc<AtomicUsize>,
    closed: Arc<AtomicUsize>,
}

impl Counters {
    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    pub fn closed(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }

    fn open(&self) {
        self.opened.fetch_add(1, Ordering::SeqCst);
    }

    fn close(&self) {
        self.closed.fetch_add(1, Ordering::SeqCst);
    }
}

#[derive(Debug, Clone)]
enum FakeAsset {
    Image(u32, u32),
    Audio(f64),
    Broken,
}

/// Loader answering from a table keyed by file name
#[derive(Debug, Default)]
pub(crate) struct FakeLoader {
    assets: HashMap<String, FakeAsset>,
    counters: Counters,
}

impl FakeLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_image(mut self, name: &str, width: u32, height: u32) -> Self {
        self.assets
            .insert(name.to_string(), FakeAsset::Image(width, height));
        self
    }

    pub fn with_audio(mut self, name: &str, secs: f64) -> Self {
        self.assets.insert(name.to_string(), FakeAsset::Audio(secs));
        self
    }

    pub fn with_broken(mut self, name: &str) -> Self {
        self.assets.insert(name.to_string(), FakeAsset::Broken);
        self
    }

    pub fn counters(&self) -> Counters {
        self.counters.clone()
    }

    pub fn audio(&self, secs: f64) -> Box<dyn AudioSource> {
        self.counters.open();
        Box::new(FakeAudio {
            secs,
            counters: self.counters.clone(),
            closed: false,
        })
    }

    fn lookup(&self, path: &Path) -> Option<&FakeAsset> {
        let name = path.file_name()?.to_str()?;
        self.assets.get(name)
    }
}

impl MediaLoader for FakeLoader {
    fn load_image(&self, path: &Path) -> Result<Box<dyn ImageSource>> {
        match self.lookup(path) {
            Some(FakeAsset::Image(width, height)) => {
                self.counters.open();
                Ok(Box::new(FakeImage {
                    pixels: RgbaImage::from_pixel(*width, *height, Rgba([255, 255, 255, 255])),
                    counters: self.counters.clone(),
                    closed: false,
                }))
            }
            _ => Err(Error::Export(format!("cannot decode {}", path.display()))),
        }
    }

    fn load_audio(&self, path: &Path) -> Result<Box<dyn AudioSource>> {
        match self.lookup(path) {
            Some(FakeAsset::Audio(secs)) => Ok(self.audio(*secs)),
            _ => Err(Error::Export(format!("cannot probe {}", path.display()))),
        }
    }
}

struct FakeImage {
    pixels: RgbaImage,
    counters: Counters,
    closed: bool,
}

impl ImageSource for FakeImage {
    fn dimensions(&self) -> (u32, u32) {
        self.pixels.dimensions()
    }

    fn rgba(&self) -> &RgbaImage {
        &self.pixels
    }

    fn close(&mut self) -> storyreel_core::Result<()> {
        assert!(!self.closed, "image closed twice");
        self.closed = true;
        self.counters.close();
        Ok(())
    }
}

struct FakeAudio {
    secs: f64,
    counters: Counters,
    closed: bool,
}

impl AudioSource for FakeAudio {
    fn duration_secs(&self) -> f64 {
        self.secs
    }

    fn read_stereo(&mut self, sample_rate: u32) -> storyreel_core::Result<Vec<f32>> {
        let frames = (self.secs * f64::from(sample_rate)).round() as usize;
        Ok(vec![0.25; frames * 2])
    }

    fn close(&mut self) -> storyreel_core::Result<()> {
        assert!(!self.closed, "audio closed twice");
        self.closed = true;
        self.counters.close();
        Ok(())
    }
}

/// Builds a black unit directly, with narration of `audio_secs` when given
pub(crate) fn fake_unit(
    loader: &FakeLoader,
    scene_number: u32,
    audio_secs: Option<f64>,
) -> ComposedSceneUnit {
    let duration = audio_secs.unwrap_or(5.0);
    let audio = audio_secs.map(|secs| AudioTrack::new(loader.audio(secs)));
    let visual = VisualTrack::filler(FrameSize::new(16, 9), duration);
    ComposedSceneUnit::new(scene_number, visual, audio, duration)
}

/// Creates a project directory holding empty files with the given names
pub(crate) fn project_with(files: &[&str]) -> TempDir {
    let dir = TempDir::new().unwrap();
    for name in files {
        std::fs::write(dir.path().join(name), b"").unwrap();
    }
    dir
}

/// What a [`RecordingRenderer`] saw
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct RenderedUnit {
    pub scene_number: u32,
    pub duration: f64,
    pub frame_size: FrameSize,
}

/// Renderer that records the timeline and writes a placeholder file
#[derive(Debug, Default)]
pub(crate) struct RecordingRenderer {
    rendered: RefCell<Vec<RenderedUnit>>,
    fail: bool,
}

impl RecordingRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            rendered: RefCell::new(Vec::new()),
            fail: true,
        }
    }

    pub fn rendered(&self) -> Vec<RenderedUnit> {
        self.rendered.borrow().clone()
    }
}

impl Renderer for RecordingRenderer {
    fn render(&self, timeline: &mut Timeline, job: &ExportJob) -> Result<()> {
        assert!(!timeline.is_released(), "rendered a released timeline");
        if self.fail {
            return Err(Error::Export("encoder crashed".into()));
        }

        let mut rendered = self.rendered.borrow_mut();
        rendered.extend(timeline.units().iter().map(|unit| RenderedUnit {
            scene_number: unit.scene_number(),
            duration: unit.duration(),
            frame_size: unit.visual().size(),
        }));
        std::fs::write(&job.output_path, b"mp4")?;
        Ok(())
    }
}
