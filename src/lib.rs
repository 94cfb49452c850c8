use float_ord::FloatOrd;
use image::DynamicImage;
use tracing::instrument;

mod crop;
mod error;
pub mod frame;
pub mod geometry;
pub mod guide;
mod result;
mod session;

pub use crop::*;
pub use error::*;
pub use frame::{FrameBuffer, PixelFormat, Rotation};
pub use geometry::{
    AspectFill, ImageRect, Letterbox, NormalizedRect, OriginConvention, Size, ViewRect,
};
pub use guide::{
    is_inside_guide, overlap_ratio, passes_overlap, ContainmentPolicy, OverlapThreshold,
};
pub use result::*;
pub use session::{CaptureSession, FrameGuard, SessionState};

pub struct GuideScannerBuilder {
    strict_frames: bool,
    overlap_threshold: f64,
    feature_origin: OriginConvention,
    scan_area: Option<NormalizedRect>,
}

impl GuideScannerBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn strict_frames(mut self, strict: bool) -> Self {
        self.strict_frames = strict;
        self
    }

    pub fn overlap_threshold(mut self, threshold: f64) -> Self {
        self.overlap_threshold = threshold;
        self
    }

    pub fn feature_origin(mut self, origin: OriginConvention) -> Self {
        self.feature_origin = origin;
        self
    }

    /// Region of the upright frame, top-left origin, that frame detections
    /// are checked against.
    pub fn scan_area(mut self, area: NormalizedRect) -> Self {
        self.scan_area = Some(area);
        self
    }

    #[instrument(skip(self))]
    pub fn build(self) -> Result<GuideScanner, ConfigError> {
        let frame_policy = if self.strict_frames {
            ContainmentPolicy::Strict
        } else {
            ContainmentPolicy::Overlap(OverlapThreshold::new(self.overlap_threshold)?)
        };
        if let Some(area) = self.scan_area {
            if !area.is_valid() {
                return Err(ConfigError::InvalidScanArea(area));
            }
        }
        let options = ScanOptions {
            frame_policy,
            feature_origin: self.feature_origin,
            scan_area: self.scan_area,
        };
        log::debug!("Built scanner with {options:?}");
        Ok(GuideScanner {
            options,
            session: CaptureSession::new(),
        })
    }
}

impl Default for GuideScannerBuilder {
    fn default() -> Self {
        Self {
            strict_frames: false,
            overlap_threshold: OverlapThreshold::DEFAULT.value(),
            feature_origin: OriginConvention::BottomLeft,
            scan_area: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScanOptions {
    pub frame_policy: ContainmentPolicy,
    pub feature_origin: OriginConvention,
    pub scan_area: Option<NormalizedRect>,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            frame_policy: ContainmentPolicy::default(),
            feature_origin: OriginConvention::BottomLeft,
            scan_area: None,
        }
    }
}

#[derive(Debug)]
pub struct GuideScanner {
    options: ScanOptions,
    session: CaptureSession,
}

impl GuideScanner {
    pub fn new(options: ScanOptions) -> Self {
        Self {
            options,
            session: CaptureSession::new(),
        }
    }

    pub fn options(&self) -> &ScanOptions {
        &self.options
    }

    pub fn session(&self) -> &CaptureSession {
        &self.session
    }

    /// Re-arms the scanner after a delivered result. No effect while a frame
    /// is still being processed.
    pub fn reset(&self) -> bool {
        self.session.reset()
    }

    /// First detection inside the guide wins; with no guide, the first detection.
    #[instrument(skip(self, detections), fields(count = detections.len()))]
    pub fn scan_preview(
        &self,
        detections: &[Detection<NormalizedRect>],
        guide: Option<&ViewRect>,
        preview: Size,
    ) -> Option<ScanResult> {
        let Some(guard) = self.session.try_begin() else {
            log::trace!("Dropping preview detections, session busy or finished");
            return None;
        };
        let detection = detections.iter().find(|it| match guide {
            Some(guide) => is_inside_guide(&it.bounds, self.options.feature_origin, guide, preview),
            None => true,
        })?;
        log::debug!("Accepted {:?} barcode inside guide", detection.format);
        guard.complete().then(|| ScanResult {
            value: detection.value.clone(),
            format: detection.format,
            overlap: None,
        })
    }

    /// Detection bounds are in sensor pixels.
    #[instrument(skip(self, detections), fields(count = detections.len()))]
    pub fn scan_frame(
        &self,
        frame: &FrameBuffer<'_>,
        detections: &[Detection<ImageRect>],
    ) -> Option<ScanResult> {
        let Some(guard) = self.session.try_begin() else {
            log::trace!("Dropping frame, session busy or finished");
            return None;
        };
        let (detection, overlap) = match self.options.scan_area {
            None => (detections.first()?, None),
            Some(area) => {
                let area = area.to_image(frame.upright_size());
                let (detection, score) = detections
                    .iter()
                    .filter_map(|it| {
                        let bounds = frame.rect_to_upright(&it.bounds);
                        let score = self.options.frame_policy.score(&bounds, &area);
                        log::trace!("{bounds:?} against scan area {area:?}: {score:?}");
                        Some((it, score?))
                    })
                    // Ties go to the earliest detection.
                    .rev()
                    .max_by_key(|(_, score)| FloatOrd(*score))?;
                (detection, Some(score))
            }
        };
        log::debug!(
            "Accepted {:?} barcode from frame, overlap {overlap:?}",
            detection.format
        );
        guard.complete().then(|| ScanResult {
            value: detection.value.clone(),
            format: detection.format,
            overlap,
        })
    }

    #[instrument(skip(self, image))]
    pub fn crop_capture(&self, image: DynamicImage, guide: &ViewRect, preview: Size) -> CropOutcome {
        if !self.session.try_complete() {
            return CropOutcome::Rejected { image };
        }
        crop_to_guide(image, guide, preview)
    }
}
