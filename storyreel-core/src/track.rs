//! Media tracks and their release capability

use crate::profile::FrameSize;
use crate::{Error, Result};
use image::{Rgba, RgbaImage};
use std::fmt;

/// Tag of every media handle the pipeline can hold
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackKind {
    Visual,
    Audio,
    Composite,
    Timeline,
}

impl fmt::Display for TrackKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrackKind::Visual => write!(f, "visual"),
            TrackKind::Audio => write!(f, "audio"),
            TrackKind::Composite => write!(f, "composite"),
            TrackKind::Timeline => write!(f, "timeline"),
        }
    }
}

/// Explicit, exactly-once release of the resources behind a media handle.
///
/// A second call returns [`Error::AlreadyReleased`].
pub trait Release {
    /// Which kind of handle this is
    fn kind(&self) -> TrackKind;

    /// Releases the handle
    fn release(&mut self) -> Result<()>;

    /// Whether `release` has already run
    fn is_released(&self) -> bool;
}

/// A decoded still image kept open for the lifetime of a scene
pub trait ImageSource {
    /// Width and height of the decoded image
    fn dimensions(&self) -> (u32, u32);

    /// Decoded pixels
    fn rgba(&self) -> &RgbaImage;

    /// Frees the decoded image
    fn close(&mut self) -> Result<()>;
}

/// An opened narration stream
pub trait AudioSource {
    /// Stream length in seconds as reported by the container
    fn duration_secs(&self) -> f64;

    /// Decodes the whole stream as interleaved stereo `f32` at `sample_rate`
    fn read_stereo(&mut self, sample_rate: u32) -> Result<Vec<f32>>;

    /// Closes the underlying stream
    fn close(&mut self) -> Result<()>;
}

/// Where the fitted image sits inside the output frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Placement {
    /// Placement covering the whole frame
    pub fn full(size: FrameSize) -> Self {
        Self {
            x: 0,
            y: 0,
            width: size.width,
            height: size.height,
        }
    }
}

/// The picture shown for a scene: a full output frame plus its timing
pub struct VisualTrack {
    frame: RgbaImage,
    placement: Placement,
    duration: f64,
    source: Option<Box<dyn ImageSource>>,
    filler: bool,
    released: bool,
}

impl VisualTrack {
    /// Creates a track from a composed frame and the image it was built from
    pub fn new(
        frame: RgbaImage,
        placement: Placement,
        duration: f64,
        source: Box<dyn ImageSource>,
    ) -> Self {
        Self {
            frame,
            placement,
            duration,
            source: Some(source),
            filler: false,
            released: false,
        }
    }

    /// Creates an opaque black frame of the given size
    pub fn filler(size: FrameSize, duration: f64) -> Self {
        Self {
            frame: RgbaImage::from_pixel(size.width, size.height, Rgba([0, 0, 0, 255])),
            placement: Placement::full(size),
            duration,
            source: None,
            filler: true,
            released: false,
        }
    }

    /// Composed output frame
    pub fn frame(&self) -> &RgbaImage {
        &self.frame
    }

    /// Size of the composed output frame
    pub fn size(&self) -> FrameSize {
        FrameSize::new(self.frame.width(), self.frame.height())
    }

    /// Area of the frame covered by the source image
    pub fn placement(&self) -> Placement {
        self.placement
    }

    /// Display duration in seconds
    pub fn duration(&self) -> f64 {
        self.duration
    }

    /// Whether this is a black substitute rather than a real image
    pub fn is_filler(&self) -> bool {
        self.filler
    }
}

impl Release for VisualTrack {
    fn kind(&self) -> TrackKind {
        TrackKind::Visual
    }

    fn release(&mut self) -> Result<()> {
        if self.released {
            return Err(Error::AlreadyReleased(TrackKind::Visual));
        }
        self.released = true;
        self.frame = RgbaImage::new(0, 0);

        match self.source.take() {
            Some(mut source) => source.close().map_err(|e| Error::Release {
                kind: TrackKind::Visual,
                reason: e.to_string(),
            }),
            None => Ok(()),
        }
    }

    fn is_released(&self) -> bool {
        self.released
    }
}

impl fmt::Debug for VisualTrack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VisualTrack")
            .field("size", &self.size())
            .field("placement", &self.placement)
            .field("duration", &self.duration)
            .field("filler", &self.filler)
            .field("released", &self.released)
            .finish()
    }
}

/// The narration attached to a scene
pub struct AudioTrack {
    source: Option<Box<dyn AudioSource>>,
    duration: f64,
}

impl AudioTrack {
    /// Wraps an opened narration stream
    pub fn new(source: Box<dyn AudioSource>) -> Self {
        let duration = source.duration_secs();
        Self {
            source: Some(source),
            duration,
        }
    }

    /// Stream length in seconds as reported by the source
    pub fn duration(&self) -> f64 {
        self.duration
    }

    /// Decodes the narration as interleaved stereo samples
    pub fn read_stereo(&mut self, sample_rate: u32) -> Result<Vec<f32>> {
        match self.source.as_mut() {
            Some(source) => source.read_stereo(sample_rate),
            None => Err(Error::AlreadyReleased(TrackKind::Audio)),
        }
    }
}

impl Release for AudioTrack {
    fn kind(&self) -> TrackKind {
        TrackKind::Audio
    }

    fn release(&mut self) -> Result<()> {
        let mut source = self
            .source
            .take()
            .ok_or(Error::AlreadyReleased(TrackKind::Audio))?;
        source.close().map_err(|e| Error::Release {
            kind: TrackKind::Audio,
            reason: e.to_string(),
        })
    }

    fn is_released(&self) -> bool {
        self.source.is_none()
    }
}

impl fmt::Debug for AudioTrack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AudioTrack")
            .field("duration", &self.duration)
            .field("released", &self.is_released())
            .finish()
    }
}
