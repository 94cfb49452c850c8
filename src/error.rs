use thiserror::Error;

use crate::{frame::PixelFormat, geometry::NormalizedRect};

// Never surfaced by the capture paths themselves, which fall back to
// false / None / the uncropped image.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GeometryError {
    #[error("preview size must be positive, got {width}x{height}")]
    InvalidViewport { width: f64, height: f64 },

    #[error("image size must be positive, got {width}x{height}")]
    InvalidImage { width: f64, height: f64 },

    #[error("feature rectangle has no area")]
    DegenerateFeature,

    #[error("crop rectangle is empty after clamping to the image bounds")]
    EmptyCrop,
}

#[derive(Debug, Error)]
pub enum FrameError {
    #[error("frame dimensions must be non-zero, got {width}x{height}")]
    ZeroDimension { width: u32, height: u32 },

    #[error("{format:?} frame of {width}x{height} needs {expected} bytes, buffer has {actual}")]
    BufferTooSmall {
        format: PixelFormat,
        width: u32,
        height: u32,
        expected: usize,
        actual: usize,
    },

    #[error("frame format {0:?} has no luma plane")]
    NoLumaPlane(PixelFormat),

    #[error("frame buffer shape: {0}")]
    Shape(#[from] ndarray::ShapeError),
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("overlap threshold must be within [0, 1], got {0}")]
    ThresholdOutOfRange(f64),

    #[error("scan area {0:?} is not a valid normalized rectangle")]
    InvalidScanArea(NormalizedRect),
}
