use image::{DynamicImage, GrayImage, RgbImage, RgbaImage};
use ndarray::{ArrayView2, Axis};

use crate::{
    error::FrameError,
    geometry::{ImageRect, Size},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelFormat {
    Gray8,
    /// Y plane followed by interleaved VU at quarter resolution.
    Nv21,
    /// Y plane followed by separate U and V planes at quarter resolution.
    Yuv420,
    Rgb8,
    Rgba8,
    Bgra8,
}

impl PixelFormat {
    pub fn expected_len(&self, width: u32, height: u32) -> usize {
        let pixels = width as usize * height as usize;
        match self {
            Self::Gray8 => pixels,
            Self::Nv21 | Self::Yuv420 => {
                let chroma = (width as usize).div_ceil(2) * (height as usize).div_ceil(2);
                pixels + 2 * chroma
            }
            Self::Rgb8 => pixels * 3,
            Self::Rgba8 | Self::Bgra8 => pixels * 4,
        }
    }

    pub fn has_luma_plane(&self) -> bool {
        matches!(self, Self::Gray8 | Self::Nv21 | Self::Yuv420)
    }
}

/// Clockwise rotation that turns the sensor frame upright.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Rotation {
    #[default]
    Deg0,
    Deg90,
    Deg180,
    Deg270,
}

impl Rotation {
    /// Accepts any multiple of 90, including negative ones.
    pub fn from_degrees(degrees: i32) -> Option<Self> {
        match degrees.rem_euclid(360) {
            0 => Some(Self::Deg0),
            90 => Some(Self::Deg90),
            180 => Some(Self::Deg180),
            270 => Some(Self::Deg270),
            _ => None,
        }
    }

    pub fn swaps_axes(&self) -> bool {
        matches!(self, Self::Deg90 | Self::Deg270)
    }
}

#[derive(Clone, Copy)]
pub struct FrameBuffer<'a> {
    data: &'a [u8],
    width: u32,
    height: u32,
    format: PixelFormat,
    rotation: Rotation,
}

impl<'a> FrameBuffer<'a> {
    pub fn new(
        data: &'a [u8],
        width: u32,
        height: u32,
        format: PixelFormat,
    ) -> Result<Self, FrameError> {
        if width == 0 || height == 0 {
            return Err(FrameError::ZeroDimension { width, height });
        }
        let expected = format.expected_len(width, height);
        if data.len() < expected {
            return Err(FrameError::BufferTooSmall {
                format,
                width,
                height,
                expected,
                actual: data.len(),
            });
        }
        Ok(Self {
            data,
            width,
            height,
            format,
            rotation: Rotation::Deg0,
        })
    }

    pub fn with_rotation(mut self, rotation: Rotation) -> Self {
        self.rotation = rotation;
        self
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn format(&self) -> PixelFormat {
        self.format
    }

    pub fn rotation(&self) -> Rotation {
        self.rotation
    }

    pub fn size(&self) -> Size {
        Size::from((self.width, self.height))
    }

    pub fn upright_size(&self) -> Size {
        if self.rotation.swaps_axes() {
            Size::from((self.height, self.width))
        } else {
            self.size()
        }
    }

    pub fn luma(&self) -> Result<ArrayView2<'a, u8>, FrameError> {
        if !self.format.has_luma_plane() {
            return Err(FrameError::NoLumaPlane(self.format));
        }
        let data: &'a [u8] = self.data;
        let (height, width) = (self.height as usize, self.width as usize);
        Ok(ArrayView2::from_shape((height, width), &data[..width * height])?)
    }

    /// Grayscale copy of the frame in sensor orientation, for decoders.
    pub fn to_luma_image(&self) -> Result<GrayImage, FrameError> {
        let expected = self.format.expected_len(self.width, self.height);
        let data = &self.data[..expected];
        let image = match self.format {
            PixelFormat::Gray8 | PixelFormat::Nv21 | PixelFormat::Yuv420 => {
                let luma = self.luma()?;
                let pixels = luma
                    .axis_iter(Axis(0))
                    .flat_map(|row| row.into_iter().copied())
                    .collect::<Vec<u8>>();
                GrayImage::from_raw(self.width, self.height, pixels)
            }
            PixelFormat::Rgb8 => RgbImage::from_raw(self.width, self.height, data.to_vec())
                .map(|it| DynamicImage::ImageRgb8(it).to_luma8()),
            PixelFormat::Rgba8 => RgbaImage::from_raw(self.width, self.height, data.to_vec())
                .map(|it| DynamicImage::ImageRgba8(it).to_luma8()),
            PixelFormat::Bgra8 => {
                let rgba = data
                    .chunks_exact(4)
                    .flat_map(|px| [px[2], px[1], px[0], px[3]])
                    .collect::<Vec<u8>>();
                RgbaImage::from_raw(self.width, self.height, rgba)
                    .map(|it| DynamicImage::ImageRgba8(it).to_luma8())
            }
        };
        image.ok_or(FrameError::BufferTooSmall {
            format: self.format,
            width: self.width,
            height: self.height,
            expected,
            actual: self.data.len(),
        })
    }

    pub fn rect_to_upright(&self, rect: &ImageRect) -> ImageRect {
        let (width, height) = (self.width as f64, self.height as f64);
        match self.rotation {
            Rotation::Deg0 => *rect,
            Rotation::Deg90 => ImageRect::new(
                height - rect.bottom(),
                rect.x,
                rect.height,
                rect.width,
            ),
            Rotation::Deg180 => ImageRect::new(
                width - rect.right(),
                height - rect.bottom(),
                rect.width,
                rect.height,
            ),
            Rotation::Deg270 => {
                ImageRect::new(rect.y, width - rect.right(), rect.height, rect.width)
            }
        }
    }
}

impl std::fmt::Debug for FrameBuffer<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameBuffer")
            .field("len", &self.data.len())
            .field("width", &self.width)
            .field("height", &self.height)
            .field("format", &self.format)
            .field("rotation", &self.rotation)
            .finish()
    }
}
