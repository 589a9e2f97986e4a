//! Letterbox compositing onto the output frame

use crate::{Error, Result};
use image::imageops::{self, FilterType};
use image::{ImageBuffer, Rgba, RgbaImage};
use storyreel_core::{FrameSize, Placement};

/// Fits an image of `source` dimensions inside `target` without cropping or
/// stretching, centred.
///
/// A source relatively wider than the target spans the full width (bars top
/// and bottom); otherwise it spans the full height (bars left and right).
/// The scaled dimension is truncated to whole pixels.
pub fn fit_within(source: (u32, u32), target: FrameSize) -> Placement {
    let (src_w, src_h) = (source.0.max(1) as u64, source.1.max(1) as u64);
    let (dst_w, dst_h) = (target.width as u64, target.height as u64);

    // src_w / src_h > dst_w / dst_h, compared exactly
    let (width, height) = if src_w * dst_h > src_h * dst_w {
        (dst_w, dst_w * src_h / src_w)
    } else {
        (dst_h * src_w / src_h, dst_h)
    };
    let width = width.clamp(1, dst_w.max(1)) as u32;
    let height = height.clamp(1, dst_h.max(1)) as u32;

    Placement {
        x: (target.width - width) / 2,
        y: (target.height - height) / 2,
        width,
        height,
    }
}

/// Builds full output frames from scene illustrations
#[derive(Debug, Clone)]
pub struct FrameCompositor {
    target: FrameSize,
    filter: FilterType,
}

impl FrameCompositor {
    /// Creates a compositor for the given output frame size
    pub fn new(target: FrameSize) -> Self {
        Self {
            target,
            filter: FilterType::Triangle,
        }
    }

    /// Output frame size
    pub fn target(&self) -> FrameSize {
        self.target
    }

    /// Opaque black frame of the target size
    pub fn blank_frame(&self) -> RgbaImage {
        ImageBuffer::from_pixel(self.target.width, self.target.height, Rgba([0, 0, 0, 255]))
    }

    /// Resizes `image` to fit the target and centres it on a black frame
    pub fn letterbox(&self, image: &RgbaImage) -> Result<(RgbaImage, Placement)> {
        if image.width() == 0 || image.height() == 0 {
            return Err(Error::EmptyImage(image.width(), image.height()));
        }

        let placement = fit_within(image.dimensions(), self.target);
        let resized = if image.dimensions() == (placement.width, placement.height) {
            image.clone()
        } else {
            imageops::resize(image, placement.width, placement.height, self.filter)
        };

        let mut frame = self.blank_frame();
        imageops::overlay(
            &mut frame,
            &resized,
            i64::from(placement.x),
            i64::from(placement.y),
        );
        // Encoded frames carry no alpha
        for pixel in frame.pixels_mut() {
            pixel[3] = 255;
        }

        Ok((frame, placement))
    }
}
