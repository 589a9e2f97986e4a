//! Opening scene assets as media handles

use crate::{AudioReader, Result};
use std::path::Path;
use storyreel_compositor::DecodedImage;
use storyreel_core::{AudioSource, ImageSource};

/// Opens the files a scene refers to.
///
/// Every handle returned here is closed exactly once by the pipeline.
pub trait MediaLoader {
    /// Decodes a still image
    fn load_image(&self, path: &Path) -> Result<Box<dyn ImageSource>>;

    /// Opens an audio stream
    fn load_audio(&self, path: &Path) -> Result<Box<dyn AudioSource>>;
}

/// Loads images with the `image` crate and audio with FFmpeg
#[derive(Debug, Clone, Copy, Default)]
pub struct FileMediaLoader;

impl MediaLoader for FileMediaLoader {
    fn load_image(&self, path: &Path) -> Result<Box<dyn ImageSource>> {
        Ok(Box::new(DecodedImage::open(path)?))
    }

    fn load_audio(&self, path: &Path) -> Result<Box<dyn AudioSource>> {
        Ok(Box::new(AudioReader::open(path)?))
    }
}

impl<L: MediaLoader + ?Sized> MediaLoader for &L {
    fn load_image(&self, path: &Path) -> Result<Box<dyn ImageSource>> {
        (**self).load_image(path)
    }

    fn load_audio(&self, path: &Path) -> Result<Box<dyn AudioSource>> {
        (**self).load_audio(path)
    }
}
