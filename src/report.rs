use crate::detection::Detection;
use std::fmt;

/// Console summary of a finished run.
pub struct Report<'a> {
    pub object_key: &'a str,
    pub detections: &'a [Detection],
    pub image_width: u32,
    pub image_height: u32,
    pub label_count: usize,
}

impl fmt::Display for Report<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Detected custom labels for {}", self.object_key)?;
        for detection in self.detections {
            writeln!(f, "Label {}", detection.name)?;
            writeln!(f, "Confidence {}", detection.confidence)?;
            if let Some(geometry) = &detection.geometry {
                let pixel_box = geometry.denormalize(self.image_width, self.image_height);
                writeln!(f, "Left: {:.0}", pixel_box.left)?;
                writeln!(f, "Top: {:.0}", pixel_box.top)?;
                writeln!(f, "Label Width: {:.0}", pixel_box.width)?;
                writeln!(f, "Label Height: {:.0}", pixel_box.height)?;
            }
        }
        write!(f, "Custom labels detected: {}", self.label_count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::BoundingBox;

    #[test]
    fn test_report_lists_geometry_only_when_present() {
        let detections = vec![
            Detection {
                name: "Helmet".to_string(),
                confidence: 87.5,
                geometry: Some(BoundingBox {
                    left: 0.1,
                    top: 0.2,
                    width: 0.3,
                    height: 0.4,
                }),
            },
            Detection {
                name: "Construction site".to_string(),
                confidence: 64.25,
                geometry: None,
            },
        ];

        let report = Report {
            object_key: "2.jpg",
            detections: &detections,
            image_width: 1000,
            image_height: 500,
            label_count: detections.len(),
        };

        let expected = "\
Detected custom labels for 2.jpg
Label Helmet
Confidence 87.5
Left: 100
Top: 100
Label Width: 300
Label Height: 200
Label Construction site
Confidence 64.25
Custom labels detected: 2";
        assert_eq!(report.to_string(), expected);
    }

    #[test]
    fn test_empty_report() {
        let report = Report {
            object_key: "empty.jpg",
            detections: &[],
            image_width: 10,
            image_height: 10,
            label_count: 0,
        };

        assert_eq!(
            report.to_string(),
            "Detected custom labels for empty.jpg\nCustom labels detected: 0"
        );
    }
}
