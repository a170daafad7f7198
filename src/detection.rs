use std::fmt;

/// One labeled result returned by the inference service.
#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
    pub name: String,
    /// Certainty score in `0..=100`.
    pub confidence: f32,
    pub geometry: Option<BoundingBox>,
}

/// Axis-aligned box with every coordinate expressed as a fraction of the
/// image dimensions.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub left: f32,
    pub top: f32,
    pub width: f32,
    pub height: f32,
}

/// A [`BoundingBox`] scaled to pixel space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PixelBox {
    pub left: f32,
    pub top: f32,
    pub width: f32,
    pub height: f32,
}

impl BoundingBox {
    pub fn denormalize(&self, image_width: u32, image_height: u32) -> PixelBox {
        let image_width = image_width as f32;
        let image_height = image_height as f32;
        PixelBox {
            left: image_width * self.left,
            top: image_height * self.top,
            width: image_width * self.width,
            height: image_height * self.height,
        }
    }
}

impl PixelBox {
    pub fn right(&self) -> f32 {
        self.left + self.width
    }

    pub fn bottom(&self) -> f32 {
        self.top + self.height
    }

    /// Closed outline starting and ending at the top-left corner.
    pub fn outline(&self) -> [(f32, f32); 5] {
        [
            (self.left, self.top),
            (self.right(), self.top),
            (self.right(), self.bottom()),
            (self.left, self.bottom()),
            (self.left, self.top),
        ]
    }

    pub fn fits_within(&self, image_width: u32, image_height: u32) -> bool {
        let horizontal =
            0.0 <= self.left && self.left <= self.right() && self.right() <= image_width as f32;
        let vertical =
            0.0 <= self.top && self.top <= self.bottom() && self.bottom() <= image_height as f32;
        horizontal && vertical
    }
}

/// Data-quality condition found while annotating. Never fatal.
#[derive(Debug, Clone, PartialEq)]
pub enum Finding {
    BoxOutOfBounds {
        label: String,
        pixel_box: PixelBox,
        image_width: u32,
        image_height: u32,
    },
}

impl fmt::Display for Finding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Finding::BoxOutOfBounds {
                label,
                pixel_box,
                image_width,
                image_height,
            } => write!(
                f,
                "box for `{}` at ({:.0}, {:.0}, {:.0}x{:.0}) exceeds {}x{} image",
                label,
                pixel_box.left,
                pixel_box.top,
                pixel_box.width,
                pixel_box.height,
                image_width,
                image_height
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_box() -> BoundingBox {
        BoundingBox {
            left: 0.1,
            top: 0.2,
            width: 0.3,
            height: 0.4,
        }
    }

    fn assert_close(a: f32, b: f32) {
        assert!((a - b).abs() < 1e-3, "{} != {}", a, b);
    }

    #[test]
    fn test_denormalize_reference_box() {
        let pixel_box = sample_box().denormalize(1000, 500);

        assert_close(pixel_box.left, 100.0);
        assert_close(pixel_box.top, 100.0);
        assert_close(pixel_box.width, 300.0);
        assert_close(pixel_box.height, 200.0);
    }

    #[test]
    fn test_denormalize_scales_linearly() {
        let base = sample_box().denormalize(640, 480);
        let wide = sample_box().denormalize(1280, 480);

        assert_close(wide.left, base.left * 2.0);
        assert_close(wide.width, base.width * 2.0);
        assert_close(wide.top, base.top);
        assert_close(wide.height, base.height);

        let tall = sample_box().denormalize(640, 960);
        assert_close(tall.top, base.top * 2.0);
        assert_close(tall.height, base.height * 2.0);
    }

    #[test]
    fn test_outline_is_closed() {
        let outline = sample_box().denormalize(1000, 500).outline();

        assert_eq!(outline.len(), 5);
        assert_eq!(outline[0], outline[4]);
        assert_close(outline[2].0, 400.0);
        assert_close(outline[2].1, 300.0);
    }

    #[test]
    fn test_fits_within() {
        assert!(sample_box().denormalize(1000, 500).fits_within(1000, 500));

        let overflowing = BoundingBox {
            left: 0.8,
            top: 0.0,
            width: 0.4,
            height: 0.5,
        };
        assert!(!overflowing.denormalize(100, 100).fits_within(100, 100));

        let negative = BoundingBox {
            left: -0.1,
            top: 0.0,
            width: 0.2,
            height: 0.2,
        };
        assert!(!negative.denormalize(100, 100).fits_within(100, 100));
    }
}
