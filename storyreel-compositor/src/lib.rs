//! Storyreel Compositor Library
//!
//! This library loads scene illustrations and fits them onto the fixed
//! output frame with letterbox or pillarbox bars.

pub mod frame_compositor;
pub mod image_loader;

pub use frame_compositor::{fit_within, FrameCompositor};
pub use image_loader::DecodedImage;

/// Result type for storyreel-compositor operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for storyreel-compositor operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Storyreel core error: {0}")]
    Core(#[from] storyreel_core::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Image has no pixels ({0}x{1})")]
    EmptyImage(u32, u32),

    #[error("Image was already closed")]
    Closed,
}
