use crate::{
    aws::is_transport_failure,
    detection::{BoundingBox, Detection},
};
use async_trait::async_trait;
use aws_sdk_rekognition::{
    error::{DisplayErrorContext, ProvideErrorMetadata, SdkError},
    operation::detect_custom_labels::DetectCustomLabelsError,
    types::{CustomLabel, Image, S3Object},
    Client,
};
use thiserror::Error;
use tracing::instrument;

#[derive(Error, Debug)]
pub enum InferenceError {
    #[error("Failed to reach inference service for model {model}: {message}")]
    Connectivity { model: String, message: String },
    #[error("Inference service rejected request for model {model} ({code}): {message}")]
    Service {
        model: String,
        code: String,
        message: String,
    },
    #[error("Malformed inference response for model {model}: {reason}")]
    MalformedResponse { model: String, reason: String },
}

/// Parameters of a single detection run.
#[derive(Debug, Clone, PartialEq)]
pub struct DetectionRequest {
    pub bucket: String,
    pub object_key: String,
    pub model_arn: String,
    pub min_confidence: f32,
}

#[async_trait]
pub trait InferenceClient: Send + Sync {
    /// Returns the detections in service order. Filtering by confidence
    /// is left to the service.
    async fn detect(&self, request: &DetectionRequest) -> Result<Vec<Detection>, InferenceError>;
}

#[derive(Debug, Clone)]
pub struct RekognitionClient {
    client: Client,
}

impl RekognitionClient {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

fn classify_detect_error(model: &str, err: SdkError<DetectCustomLabelsError>) -> InferenceError {
    let model = model.to_string();
    let message = DisplayErrorContext(&err).to_string();

    if is_transport_failure(&err) {
        return InferenceError::Connectivity { model, message };
    }

    let code = err
        .as_service_error()
        .and_then(|service_err| service_err.code())
        .unwrap_or("Unknown")
        .to_string();

    InferenceError::Service {
        model,
        code,
        message,
    }
}

fn parse_custom_label(label: &CustomLabel) -> Result<Detection, String> {
    let name = label
        .name()
        .ok_or_else(|| "custom label without a name".to_string())?;
    let confidence = label
        .confidence()
        .ok_or_else(|| format!("custom label `{}` without a confidence", name))?;

    let geometry = match label.geometry().and_then(|g| g.bounding_box()) {
        Some(bbox) => {
            let coordinate = |value: Option<f32>, field: &str| {
                value.ok_or_else(|| format!("bounding box of `{}` missing {}", name, field))
            };
            Some(BoundingBox {
                left: coordinate(bbox.left(), "left")?,
                top: coordinate(bbox.top(), "top")?,
                width: coordinate(bbox.width(), "width")?,
                height: coordinate(bbox.height(), "height")?,
            })
        }
        None => None,
    };

    Ok(Detection {
        name: name.to_string(),
        confidence,
        geometry,
    })
}

#[async_trait]
impl InferenceClient for RekognitionClient {
    #[instrument(skip(self))]
    async fn detect(&self, request: &DetectionRequest) -> Result<Vec<Detection>, InferenceError> {
        let image = Image::builder()
            .s3_object(
                S3Object::builder()
                    .bucket(&request.bucket)
                    .name(&request.object_key)
                    .build(),
            )
            .build();

        let output = self
            .client
            .detect_custom_labels()
            .project_version_arn(&request.model_arn)
            .image(image)
            .min_confidence(request.min_confidence)
            .send()
            .await
            .map_err(|e| classify_detect_error(&request.model_arn, e))?;

        let detections = output
            .custom_labels()
            .iter()
            .map(parse_custom_label)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|reason| InferenceError::MalformedResponse {
                model: request.model_arn.clone(),
                reason,
            })?;

        tracing::debug!("Service returned {} custom labels", detections.len());
        Ok(detections)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aws_sdk_rekognition::types::{BoundingBox as SdkBoundingBox, Geometry};

    fn sdk_box() -> SdkBoundingBox {
        SdkBoundingBox::builder()
            .left(0.1)
            .top(0.2)
            .width(0.3)
            .height(0.4)
            .build()
    }

    #[test]
    fn test_parse_label_with_geometry() {
        let label = CustomLabel::builder()
            .name("Helmet")
            .confidence(87.5)
            .geometry(Geometry::builder().bounding_box(sdk_box()).build())
            .build();

        let detection = parse_custom_label(&label).unwrap();

        assert_eq!(detection.name, "Helmet");
        assert_eq!(detection.confidence, 87.5);
        assert_eq!(
            detection.geometry,
            Some(BoundingBox {
                left: 0.1,
                top: 0.2,
                width: 0.3,
                height: 0.4,
            })
        );
    }

    #[test]
    fn test_parse_label_without_geometry() {
        let label = CustomLabel::builder()
            .name("Construction site")
            .confidence(64.0)
            .build();

        let detection = parse_custom_label(&label).unwrap();
        assert!(detection.geometry.is_none());
    }

    #[test]
    fn test_parse_geometry_without_box_is_absent() {
        let label = CustomLabel::builder()
            .name("Crane")
            .confidence(70.0)
            .geometry(Geometry::builder().build())
            .build();

        let detection = parse_custom_label(&label).unwrap();
        assert!(detection.geometry.is_none());
    }

    #[test]
    fn test_parse_rejects_incomplete_box() {
        let partial = SdkBoundingBox::builder().left(0.1).top(0.2).width(0.3).build();
        let label = CustomLabel::builder()
            .name("Helmet")
            .confidence(87.5)
            .geometry(Geometry::builder().bounding_box(partial).build())
            .build();

        let reason = parse_custom_label(&label).unwrap_err();
        assert!(reason.contains("height"));
    }

    #[test]
    fn test_parse_rejects_missing_name_and_confidence() {
        let unnamed = CustomLabel::builder().confidence(50.0).build();
        assert!(parse_custom_label(&unnamed).is_err());

        let unscored = CustomLabel::builder().name("Helmet").build();
        assert!(parse_custom_label(&unscored).is_err());
    }

    #[test]
    fn test_timeout_maps_to_connectivity() {
        let err = SdkError::<DetectCustomLabelsError>::timeout_error("operation timed out");
        let inference_error = classify_detect_error("arn:model", err);

        assert!(matches!(inference_error, InferenceError::Connectivity { .. }));
        assert!(inference_error.to_string().contains("arn:model"));
    }
}
