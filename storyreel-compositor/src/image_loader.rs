//! Still image decoding

use crate::{Error, Result};
use image::RgbaImage;
use std::path::{Path, PathBuf};
use storyreel_core::ImageSource;

/// A scene illustration decoded into RGBA pixels
pub struct DecodedImage {
    path: PathBuf,
    pixels: RgbaImage,
    closed: bool,
}

impl DecodedImage {
    /// Decodes any format the `image` crate recognises
    pub fn open(path: &Path) -> Result<Self> {
        let pixels = image::open(path)?.to_rgba8();
        if pixels.width() == 0 || pixels.height() == 0 {
            return Err(Error::EmptyImage(pixels.width(), pixels.height()));
        }

        Ok(Self {
            path: path.to_path_buf(),
            pixels,
            closed: false,
        })
    }

    /// Path the image was decoded from
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ImageSource for DecodedImage {
    fn dimensions(&self) -> (u32, u32) {
        self.pixels.dimensions()
    }

    fn rgba(&self) -> &RgbaImage {
        &self.pixels
    }

    fn close(&mut self) -> storyreel_core::Result<()> {
        if self.closed {
            return Err(storyreel_core::Error::Decode(format!(
                "{}: {}",
                self.path.display(),
                Error::Closed
            )));
        }
        self.closed = true;
        self.pixels = RgbaImage::new(0, 0);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    #[test]
    fn test_open_jpeg() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scene_1.jpg");
        RgbImage::from_pixel(40, 30, Rgb([200, 10, 10])).save(&path).unwrap();

        let mut image = DecodedImage::open(&path).unwrap();
        assert_eq!(image.dimensions(), (40, 30));
        assert_eq!(image.rgba().get_pixel(0, 0)[3], 255);

        image.close().unwrap();
        assert_eq!(image.rgba().dimensions(), (0, 0));
        assert!(image.close().is_err());
    }

    #[test]
    fn test_open_corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scene_1.jpg");
        std::fs::write(&path, b"definitely not a jpeg").unwrap();

        assert!(DecodedImage::open(&path).is_err());
    }
}
