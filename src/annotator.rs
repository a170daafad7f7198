use crate::{
    config::AnnotationConfig,
    detection::{Detection, Finding, PixelBox},
};
use ab_glyph::{FontArc, InvalidFont, PxScale};
use image::{Rgb, RgbImage};
use imageproc::{
    drawing::{draw_filled_rect_mut, draw_text_mut},
    rect::Rect,
};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::instrument;

/// DejaVu Sans, used when no font file is configured.
const DEFAULT_FONT: &[u8] = include_bytes!("../assets/DejaVuSans.ttf");

pub const MAX_LINE_WIDTH: u32 = 100;

pub fn default_font() -> Result<FontArc, InvalidFont> {
    FontArc::try_from_slice(DEFAULT_FONT)
}

#[derive(Error, Debug)]
pub enum AnnotateError {
    #[error("Failed to decode image {source_name}: {source}")]
    Decode {
        source_name: String,
        source: image::ImageError,
    },
    #[error("Failed to save annotated image to {path:?}: {source}")]
    Save {
        path: PathBuf,
        source: image::ImageError,
    },
}

/// Annotated image plus what happened while drawing it.
#[derive(Debug, Clone)]
pub struct Annotation {
    pub image: RgbImage,
    /// Every detection handed to the annotator, drawn or not.
    pub label_count: usize,
    pub boxes_drawn: usize,
    pub findings: Vec<Finding>,
}

impl Annotation {
    #[instrument(skip(self))]
    pub fn save(&self, path: &Path) -> Result<(), AnnotateError> {
        self.image
            .save(path)
            .map_err(|source| AnnotateError::Save {
                path: path.to_path_buf(),
                source,
            })?;
        tracing::info!("Saved annotated image to {:?}", path);
        Ok(())
    }
}

pub struct Annotator {
    color: Rgb<u8>,
    line_width: u32,
    font: FontArc,
    font_scale: PxScale,
}

impl Annotator {
    pub fn new(config: &AnnotationConfig, font: FontArc) -> Self {
        Self {
            color: Rgb(config.color),
            line_width: config.line_width.clamp(1, MAX_LINE_WIDTH),
            font,
            font_scale: PxScale::from(config.font_scale),
        }
    }

    pub fn decode(source_name: &str, image_data: &[u8]) -> Result<RgbImage, AnnotateError> {
        let decode_error = |source| AnnotateError::Decode {
            source_name: source_name.to_string(),
            source,
        };
        let image = image::ImageReader::new(std::io::Cursor::new(image_data))
            .with_guessed_format()
            .map_err(|e| decode_error(image::ImageError::IoError(e)))?
            .decode()
            .map_err(decode_error)?;
        Ok(image.to_rgb8())
    }

    #[instrument(skip(self, image_data, detections), fields(detections = detections.len()))]
    pub fn annotate(
        &self,
        source_name: &str,
        image_data: &[u8],
        detections: &[Detection],
    ) -> Result<Annotation, AnnotateError> {
        let mut image = Self::decode(source_name, image_data)?;
        let (image_width, image_height) = image.dimensions();
        tracing::debug!("Decoded {}x{} image", image_width, image_height);

        let mut boxes_drawn = 0;
        let mut findings = Vec::new();

        for detection in detections {
            let Some(geometry) = &detection.geometry else {
                continue;
            };
            let pixel_box = geometry.denormalize(image_width, image_height);

            if !pixel_box.fits_within(image_width, image_height) {
                let finding = Finding::BoxOutOfBounds {
                    label: detection.name.clone(),
                    pixel_box,
                    image_width,
                    image_height,
                };
                tracing::warn!("{}", finding);
                findings.push(finding);
            }

            self.draw_outline(&mut image, &pixel_box);
            self.draw_label(&mut image, &pixel_box, &detection.name);
            boxes_drawn += 1;
        }

        Ok(Annotation {
            image,
            label_count: detections.len(),
            boxes_drawn,
            findings,
        })
    }

    fn draw_outline(&self, image: &mut RgbImage, pixel_box: &PixelBox) {
        let (width, height) = image.dimensions();
        let outline = pixel_box.outline();
        for segment in outline.windows(2) {
            let start = clamp_point(segment[0], width, height, self.line_width);
            let end = clamp_point(segment[1], width, height, self.line_width);
            draw_filled_rect_mut(image, self.stroke_rect(start, end), self.color);
        }
    }

    // Axis-aligned stroke centred on the segment.
    fn stroke_rect(&self, start: (i32, i32), end: (i32, i32)) -> Rect {
        let half = (self.line_width / 2) as i32;
        let left = start.0.min(end.0) - half;
        let top = start.1.min(end.1) - half;
        let span_x = start.0.abs_diff(end.0) + self.line_width;
        let span_y = start.1.abs_diff(end.1) + self.line_width;
        Rect::at(left, top).of_size(span_x, span_y)
    }

    fn draw_label(&self, image: &mut RgbImage, pixel_box: &PixelBox, text: &str) {
        let (width, height) = image.dimensions();
        let (x, y) = clamp_point((pixel_box.left, pixel_box.top), width, height, 0);
        draw_text_mut(image, self.color, x, y, self.font_scale, &self.font, text);
    }
}

// Keeps coordinates near the canvas so rect arithmetic cannot overflow;
// anything beyond the canvas is clipped when drawn anyway.
fn clamp_point(point: (f32, f32), width: u32, height: u32, margin: u32) -> (i32, i32) {
    let clamp = |value: f32, limit: u32| {
        let low = -(margin as f32);
        let high = limit.saturating_add(margin) as f32;
        if value.is_nan() {
            0
        } else {
            value.round().clamp(low, high) as i32
        }
    };
    (clamp(point.0, width), clamp(point.1, height))
}
