use geo::{coord, Area, Contains, Rect};
use tracing::instrument;

use crate::{
    error::{ConfigError, GeometryError},
    geometry::{ImageRect, NormalizedRect, OriginConvention, Size, ViewRect, EPSILON},
};

#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct OverlapThreshold(f64);

impl OverlapThreshold {
    pub const DEFAULT: OverlapThreshold = OverlapThreshold(0.5);

    pub fn new(value: f64) -> Result<Self, ConfigError> {
        if (0.0..=1.0).contains(&value) {
            Ok(Self(value))
        } else {
            Err(ConfigError::ThresholdOutOfRange(value))
        }
    }

    pub fn value(&self) -> f64 {
        self.0
    }
}

impl Default for OverlapThreshold {
    fn default() -> Self {
        Self::DEFAULT
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ContainmentPolicy {
    Strict,
    Overlap(OverlapThreshold),
}

impl Default for ContainmentPolicy {
    fn default() -> Self {
        Self::Overlap(OverlapThreshold::DEFAULT)
    }
}

impl ContainmentPolicy {
    /// Score of an accepted feature, `None` when rejected. Strict containment
    /// always scores 1.0.
    pub fn score(&self, feature: &ImageRect, scan_area: &ImageRect) -> Option<f64> {
        match self {
            Self::Strict => {
                if feature.is_empty() || scan_area.is_empty() {
                    return None;
                }
                contains_with_tolerance(scan_area.to_geo(), feature.to_geo()).then_some(1.0)
            }
            Self::Overlap(threshold) => {
                let ratio = overlap_ratio(feature, scan_area)?;
                (ratio > 0.0 && ratio >= threshold.value()).then_some(ratio)
            }
        }
    }

    pub fn accepts(&self, feature: &ImageRect, scan_area: &ImageRect) -> bool {
        self.score(feature, scan_area).is_some()
    }
}

/// The guide is flipped into `feature_origin` before comparing.
pub fn is_inside_guide(
    feature: &NormalizedRect,
    feature_origin: OriginConvention,
    guide: &ViewRect,
    preview: Size,
) -> bool {
    match try_inside_guide(feature, feature_origin, guide, preview) {
        Ok(inside) => inside,
        Err(err) => {
            log::debug!("Rejecting detection: {err}");
            false
        }
    }
}

#[instrument(level = "trace")]
pub fn try_inside_guide(
    feature: &NormalizedRect,
    feature_origin: OriginConvention,
    guide: &ViewRect,
    preview: Size,
) -> Result<bool, GeometryError> {
    if feature.is_degenerate() {
        return Err(GeometryError::DegenerateFeature);
    }
    let guide = guide
        .normalize(preview, feature_origin)
        .ok_or(GeometryError::InvalidViewport {
            width: preview.width,
            height: preview.height,
        })?;
    Ok(contains_with_tolerance(guide.to_geo(), feature.to_geo()))
}

/// Fraction of `feature`'s area that lies inside `scan_area`. `None` for a
/// feature without area; `Some(0.0)` when they do not intersect.
pub fn overlap_ratio(feature: &ImageRect, scan_area: &ImageRect) -> Option<f64> {
    let feature_area = feature.to_geo().unsigned_area();
    if feature.is_empty() || feature_area <= 0.0 {
        return None;
    }
    let intersection = match feature.intersection(scan_area) {
        Some(intersection) => intersection.to_geo().unsigned_area(),
        None => 0.0,
    };
    Some(intersection / feature_area)
}

pub fn passes_overlap(
    feature: &ImageRect,
    scan_area: &ImageRect,
    threshold: OverlapThreshold,
) -> bool {
    ContainmentPolicy::Overlap(threshold).accepts(feature, scan_area)
}

fn contains_with_tolerance(outer: Rect<f64>, inner: Rect<f64>) -> bool {
    let grown = Rect::new(
        coord! { x: outer.min().x - EPSILON, y: outer.min().y - EPSILON },
        coord! { x: outer.max().x + EPSILON, y: outer.max().y + EPSILON },
    );
    grown.contains(&inner)
}
