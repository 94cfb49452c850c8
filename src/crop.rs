use image::{DynamicImage, GenericImageView};
use imageproc::rect::Rect as PixelRect;
use tracing::instrument;

use crate::{
    error::GeometryError,
    geometry::{AspectFill, ImageRect, OriginConvention, Size, ViewRect},
};

/// Computes the image-pixel rectangle showing what the user saw inside the
/// guide. `None` when no usable crop exists; the caller keeps the full image.
pub fn compute_crop_rect(guide: &ViewRect, preview: Size, image: Size) -> Option<ImageRect> {
    match try_compute_crop_rect(guide, preview, image) {
        Ok(rect) => Some(rect),
        Err(err) => {
            log::debug!("Crop unavailable: {err}");
            None
        }
    }
}

#[instrument(level = "debug")]
pub fn try_compute_crop_rect(
    guide: &ViewRect,
    preview: Size,
    image: Size,
) -> Result<ImageRect, GeometryError> {
    if !preview.is_positive() {
        return Err(GeometryError::InvalidViewport {
            width: preview.width,
            height: preview.height,
        });
    }
    let fill = AspectFill::new(image, preview).ok_or(GeometryError::InvalidImage {
        width: image.width,
        height: image.height,
    })?;
    let normalized = guide
        .normalize(preview, OriginConvention::TopLeft)
        .ok_or(GeometryError::InvalidViewport {
            width: preview.width,
            height: preview.height,
        })?;
    let mapped = fill.map_normalized(&normalized);
    log::trace!(
        "Guide {guide:?} normalized to {normalized:?}, letterbox {:?}, mapped to {mapped:?}",
        fill.letterbox()
    );
    mapped.clamp_to(image).ok_or(GeometryError::EmptyCrop)
}

#[derive(Debug, Clone)]
pub enum CropOutcome {
    Cropped {
        image: DynamicImage,
        rect: PixelRect,
    },
    /// Cropping was not possible; the original photo is passed through.
    Uncropped {
        image: DynamicImage,
        reason: GeometryError,
    },
    Rejected { image: DynamicImage },
}

impl CropOutcome {
    pub fn image(&self) -> &DynamicImage {
        match self {
            Self::Cropped { image, .. } | Self::Uncropped { image, .. } | Self::Rejected { image } => {
                image
            }
        }
    }

    pub fn into_image(self) -> DynamicImage {
        match self {
            Self::Cropped { image, .. } | Self::Uncropped { image, .. } | Self::Rejected { image } => {
                image
            }
        }
    }

    pub fn is_cropped(&self) -> bool {
        matches!(self, Self::Cropped { .. })
    }
}

/// Crops `image` to the guide. Never fails: any geometry problem hands the
/// original image back as [`CropOutcome::Uncropped`].
#[instrument(skip(image), level = "debug")]
pub fn crop_to_guide(image: DynamicImage, guide: &ViewRect, preview: Size) -> CropOutcome {
    let (width, height) = image.dimensions();
    let rect = match try_compute_crop_rect(guide, preview, Size::from((width, height))) {
        Ok(rect) => rect,
        Err(reason) => {
            log::debug!("Returning uncropped image: {reason}");
            return CropOutcome::Uncropped { image, reason };
        }
    };
    let Some(pixels) = rect
        .to_pixel_rect()
        .and_then(|it| it.intersect(PixelRect::at(0, 0).of_size(width, height)))
    else {
        return CropOutcome::Uncropped {
            image,
            reason: GeometryError::EmptyCrop,
        };
    };
    log::trace!("Cropping {width}x{height} image to {pixels:?}");
    let cropped = image.crop_imm(
        pixels.left() as u32,
        pixels.top() as u32,
        pixels.width(),
        pixels.height(),
    );
    #[cfg(feature = "debug")]
    if let Err(err) = cropped.save("crops/last.png") {
        log::warn!("Failed to save debug crop: {err}");
    }
    CropOutcome::Cropped {
        image: cropped,
        rect: pixels,
    }
}
