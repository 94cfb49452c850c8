use geo::{coord, Rect};
use imageproc::rect::Rect as PixelRect;

pub(crate) const EPSILON: f64 = 1e-9;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    pub const fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    pub fn is_positive(&self) -> bool {
        self.width.is_finite() && self.height.is_finite() && self.width > 0.0 && self.height > 0.0
    }

    pub fn aspect(&self) -> f64 {
        self.width / self.height
    }
}

impl From<(u32, u32)> for Size {
    fn from((width, height): (u32, u32)) -> Self {
        Self::new(width as f64, height as f64)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OriginConvention {
    #[default]
    TopLeft,
    BottomLeft,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NormalizedRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl NormalizedRect {
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub const fn full() -> Self {
        Self::new(0.0, 0.0, 1.0, 1.0)
    }

    pub fn is_valid(&self) -> bool {
        self.x >= -EPSILON
            && self.y >= -EPSILON
            && !self.is_degenerate()
            && self.x + self.width <= 1.0 + 1e-6
            && self.y + self.height <= 1.0 + 1e-6
    }

    pub fn is_degenerate(&self) -> bool {
        !(self.x.is_finite()
            && self.y.is_finite()
            && self.width.is_finite()
            && self.height.is_finite()
            && self.width > 0.0
            && self.height > 0.0)
    }

    pub fn area(&self) -> f64 {
        self.width * self.height
    }

    pub fn flip_vertical(&self) -> Self {
        Self::new(self.x, 1.0 - self.y - self.height, self.width, self.height)
    }

    pub fn to_origin(&self, from: OriginConvention, to: OriginConvention) -> Self {
        if from == to {
            *self
        } else {
            self.flip_vertical()
        }
    }

    pub fn clamped(&self) -> Self {
        let left = self.x.clamp(0.0, 1.0);
        let top = self.y.clamp(0.0, 1.0);
        let right = (self.x + self.width).clamp(0.0, 1.0);
        let bottom = (self.y + self.height).clamp(0.0, 1.0);
        Self::new(left, top, right - left, bottom - top)
    }

    pub fn to_image(&self, image: Size) -> ImageRect {
        ImageRect::new(
            self.x * image.width,
            self.y * image.height,
            self.width * image.width,
            self.height * image.height,
        )
    }

    pub fn to_geo(&self) -> Rect<f64> {
        to_geo(self.x, self.y, self.width, self.height)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl ViewRect {
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn full(view: Size) -> Self {
        Self::new(0.0, 0.0, view.width, view.height)
    }

    /// Divides by the view size and expresses the result with `origin`.
    /// `None` when the view size is not positive.
    pub fn normalize(&self, view: Size, origin: OriginConvention) -> Option<NormalizedRect> {
        if !view.is_positive() {
            return None;
        }
        let rect = NormalizedRect::new(
            self.x / view.width,
            self.y / view.height,
            self.width / view.width,
            self.height / view.height,
        );
        Some(rect.to_origin(OriginConvention::TopLeft, origin))
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImageRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl ImageRect {
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn bounds(image: Size) -> Self {
        Self::new(0.0, 0.0, image.width, image.height)
    }

    pub fn from_geo(rect: Rect<f64>) -> Self {
        Self::new(rect.min().x, rect.min().y, rect.width(), rect.height())
    }

    pub fn to_geo(&self) -> Rect<f64> {
        to_geo(self.x, self.y, self.width, self.height)
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    pub fn area(&self) -> f64 {
        if self.is_empty() {
            0.0
        } else {
            self.width * self.height
        }
    }

    pub fn is_empty(&self) -> bool {
        !(self.x.is_finite()
            && self.y.is_finite()
            && self.width.is_finite()
            && self.height.is_finite()
            && self.width > 0.0
            && self.height > 0.0)
    }

    pub fn intersection(&self, other: &ImageRect) -> Option<ImageRect> {
        if self.is_empty() || other.is_empty() {
            return None;
        }
        let left = self.x.max(other.x);
        let top = self.y.max(other.y);
        let right = self.right().min(other.right());
        let bottom = self.bottom().min(other.bottom());
        if right - left <= 0.0 || bottom - top <= 0.0 {
            return None;
        }
        Some(ImageRect::new(left, top, right - left, bottom - top))
    }

    pub fn clamp_to(&self, image: Size) -> Option<ImageRect> {
        self.intersection(&ImageRect::bounds(image))
    }

    /// Snaps to whole pixels: the origin is floored, the far edges rounded,
    /// and each side is at least one pixel. Negative origins clamp to zero.
    pub fn to_pixel_rect(&self) -> Option<PixelRect> {
        if self.is_empty() {
            return None;
        }
        let left = snap_floor(self.x).max(0.0);
        let top = snap_floor(self.y).max(0.0);
        let right = self.right().round();
        let bottom = self.bottom().round();
        let width = (right - left).max(1.0);
        let height = (bottom - top).max(1.0);
        log::trace!("Snapping {self:?} to pixels ({left}, {top}, {width}, {height})");
        Some(PixelRect::at(left as i32, top as i32).of_size(width as u32, height as u32))
    }
}

// Values within a hair of an integer snap to it.
fn snap_floor(value: f64) -> f64 {
    let nearest = value.round();
    if (value - nearest).abs() < 1e-6 {
        nearest
    } else {
        value.floor()
    }
}

fn to_geo(x: f64, y: f64, width: f64, height: f64) -> Rect<f64> {
    Rect::new(coord! { x: x, y: y }, coord! { x: x + width, y: y + height })
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Letterbox {
    /// The image is relatively wider than the viewport: only a centered band
    /// `scaled_width` pixels wide is visible, starting at `x_offset`.
    LeftRight { scaled_width: f64, x_offset: f64 },
    TopBottom { scaled_height: f64, y_offset: f64 },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AspectFill {
    image: Size,
    view: Size,
}

impl AspectFill {
    pub fn new(image: Size, view: Size) -> Option<Self> {
        if image.is_positive() && view.is_positive() {
            Some(Self { image, view })
        } else {
            None
        }
    }

    pub fn image(&self) -> Size {
        self.image
    }

    pub fn view(&self) -> Size {
        self.view
    }

    pub fn image_aspect(&self) -> f64 {
        self.image.aspect()
    }

    pub fn view_aspect(&self) -> f64 {
        self.view.aspect()
    }

    pub fn letterbox(&self) -> Letterbox {
        let view_aspect = self.view_aspect();
        if self.image_aspect() > view_aspect {
            let scaled_width = self.image.height * view_aspect;
            Letterbox::LeftRight {
                scaled_width,
                x_offset: (self.image.width - scaled_width) / 2.0,
            }
        } else {
            let scaled_height = self.image.width / view_aspect;
            Letterbox::TopBottom {
                scaled_height,
                y_offset: (self.image.height - scaled_height) / 2.0,
            }
        }
    }

    pub fn visible_region(&self) -> ImageRect {
        self.map_normalized(&NormalizedRect::full())
    }

    /// Maps a viewport-relative rectangle (top-left origin) into image pixels.
    /// The result is not clamped to the image bounds.
    pub fn map_normalized(&self, rect: &NormalizedRect) -> ImageRect {
        match self.letterbox() {
            Letterbox::LeftRight {
                scaled_width,
                x_offset,
            } => ImageRect::new(
                x_offset + rect.x * scaled_width,
                rect.y * self.image.height,
                rect.width * scaled_width,
                rect.height * self.image.height,
            ),
            Letterbox::TopBottom {
                scaled_height,
                y_offset,
            } => ImageRect::new(
                rect.x * self.image.width,
                y_offset + rect.y * scaled_height,
                rect.width * self.image.width,
                rect.height * scaled_height,
            ),
        }
    }

    /// Where an image rectangle appears on the preview.
    pub fn image_to_view(&self, rect: &ImageRect) -> ViewRect {
        let (x, y, width, height) = match self.letterbox() {
            Letterbox::LeftRight {
                scaled_width,
                x_offset,
            } => (
                (rect.x - x_offset) / scaled_width,
                rect.y / self.image.height,
                rect.width / scaled_width,
                rect.height / self.image.height,
            ),
            Letterbox::TopBottom {
                scaled_height,
                y_offset,
            } => (
                rect.x / self.image.width,
                (rect.y - y_offset) / scaled_height,
                rect.width / self.image.width,
                rect.height / scaled_height,
            ),
        };
        ViewRect::new(
            x * self.view.width,
            y * self.view.height,
            width * self.view.width,
            height * self.view.height,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(a: f64, b: f64) {
        assert!((a - b).abs() < 1e-6, "{a} != {b}");
    }

    #[test]
    fn flip_is_an_involution() {
        let rect = NormalizedRect::new(0.1, 0.2, 0.3, 0.4);
        let flipped = rect.flip_vertical();
        assert_close(flipped.y, 0.4);
        let back = flipped.flip_vertical();
        assert_close(back.y, rect.y);
        assert_eq!(
            rect.to_origin(OriginConvention::TopLeft, OriginConvention::TopLeft),
            rect
        );
    }

    #[test]
    fn normalize_view_rect() {
        let view = Size::new(1000.0, 2000.0);
        let rect = ViewRect::new(400.0, 800.0, 200.0, 400.0)
            .normalize(view, OriginConvention::TopLeft)
            .unwrap();
        assert_close(rect.x, 0.4);
        assert_close(rect.y, 0.4);
        assert_close(rect.width, 0.2);
        assert_close(rect.height, 0.2);

        let bottom_left = ViewRect::new(0.0, 0.0, 1000.0, 500.0)
            .normalize(view, OriginConvention::BottomLeft)
            .unwrap();
        assert_close(bottom_left.y, 0.75);

        assert!(ViewRect::new(0.0, 0.0, 1.0, 1.0)
            .normalize(Size::new(0.0, 0.0), OriginConvention::TopLeft)
            .is_none());
    }

    #[test]
    fn intersection_of_overlapping_and_disjoint_rects() {
        let a = ImageRect::new(0.0, 0.0, 10.0, 10.0);
        let b = ImageRect::new(5.0, 5.0, 10.0, 10.0);
        assert_eq!(a.intersection(&b), Some(ImageRect::new(5.0, 5.0, 5.0, 5.0)));

        assert_eq!(ImageRect::from_geo(a.to_geo()), a);
        assert_eq!(a.area(), 100.0);

        let touching = ImageRect::new(10.0, 0.0, 5.0, 5.0);
        assert_eq!(a.intersection(&touching), None);
        assert_eq!(a.intersection(&ImageRect::new(0.0, 0.0, 0.0, 4.0)), None);
    }

    #[test]
    fn validity_and_clamping() {
        assert!(NormalizedRect::new(0.0, 0.0, 1.0, 1.0).is_valid());
        assert!(!NormalizedRect::new(0.5, 0.5, 0.6, 0.1).is_valid());
        assert!(!NormalizedRect::new(0.5, 0.5, 0.0, 0.1).is_valid());
        assert!(!NormalizedRect::new(f64::NAN, 0.5, 0.1, 0.1).is_valid());

        let clamped = NormalizedRect::new(-0.1, 0.5, 0.6, 0.7).clamped();
        assert!(clamped.is_valid());
        assert_close(clamped.area(), 0.25);
        assert_close(clamped.x, 0.0);
        assert_close(clamped.width, 0.5);
        assert_close(clamped.height, 0.5);
    }

    #[test]
    fn pixel_snapping_covers_fractional_edges() {
        let rect = ImageRect::new(10.4, 20.6, 99.9, 49.2).to_pixel_rect().unwrap();
        assert_eq!((rect.left(), rect.top()), (10, 20));
        assert_eq!((rect.width(), rect.height()), (100, 50));

        let sliver = ImageRect::new(3.2, 3.2, 0.1, 0.1).to_pixel_rect().unwrap();
        assert_eq!((sliver.width(), sliver.height()), (1, 1));

        assert!(ImageRect::new(0.0, 0.0, -1.0, 5.0).to_pixel_rect().is_none());
    }

    #[test]
    fn letterbox_branches() {
        let wide = AspectFill::new(Size::new(4000.0, 3000.0), Size::new(1000.0, 2000.0)).unwrap();
        match wide.letterbox() {
            Letterbox::LeftRight {
                scaled_width,
                x_offset,
            } => {
                assert_close(scaled_width, 1500.0);
                assert_close(x_offset, 1250.0);
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(
            wide.visible_region(),
            ImageRect::new(1250.0, 0.0, 1500.0, 3000.0)
        );
        assert_eq!(wide.image(), Size::new(4000.0, 3000.0));

        let tall = AspectFill::new(Size::new(3000.0, 4000.0), Size::new(1000.0, 1000.0)).unwrap();
        match tall.letterbox() {
            Letterbox::TopBottom {
                scaled_height,
                y_offset,
            } => {
                assert_close(scaled_height, 3000.0);
                assert_close(y_offset, 500.0);
            }
            other => panic!("unexpected {other:?}"),
        }

        assert!(AspectFill::new(Size::new(10.0, 10.0), Size::new(0.0, 5.0)).is_none());
    }

    #[test]
    fn image_to_view_inverts_mapping() {
        let fill = AspectFill::new(Size::new(4000.0, 3000.0), Size::new(1000.0, 2000.0)).unwrap();
        let view = ViewRect::new(400.0, 800.0, 200.0, 400.0);
        let normalized = view
            .normalize(fill.view(), OriginConvention::TopLeft)
            .unwrap();
        let back = fill.image_to_view(&fill.map_normalized(&normalized));
        assert_close(back.x, view.x);
        assert_close(back.y, view.y);
        assert_close(back.width, view.width);
        assert_close(back.height, view.height);
    }
}
