use crate::{
    annotator::{AnnotateError, Annotation, Annotator},
    aws::load_sdk_config,
    config::Config,
    detection::Detection,
    inference::{DetectionRequest, InferenceClient, InferenceError, RekognitionClient},
    object_store::{FetchError, ObjectFetcher, S3ObjectFetcher},
    report::Report,
};
use std::path::Path;
use thiserror::Error;
use tracing::instrument;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("Fetch failed: {0}")]
    Fetch(#[from] FetchError),
    #[error("Inference failed: {0}")]
    Inference(#[from] InferenceError),
    #[error("Annotation failed: {0}")]
    Annotate(#[from] AnnotateError),
}

#[derive(Debug)]
pub struct RunOutcome {
    pub detections: Vec<Detection>,
    pub annotation: Annotation,
}

impl RunOutcome {
    pub fn report<'a>(&'a self, object_key: &'a str) -> Report<'a> {
        let (image_width, image_height) = self.annotation.image.dimensions();
        Report {
            object_key,
            detections: &self.detections,
            image_width,
            image_height,
            label_count: self.annotation.label_count,
        }
    }

    /// Saves the image when a path is given, then renders the report.
    /// A failed save yields no report.
    pub fn publish(
        &self,
        object_key: &str,
        output_path: Option<&Path>,
    ) -> Result<String, PipelineError> {
        match output_path {
            Some(path) => self.annotation.save(path)?,
            None => tracing::info!("No output path configured, annotated image discarded"),
        }
        Ok(self.report(object_key).to_string())
    }
}

pub struct Pipeline<F: ObjectFetcher, I: InferenceClient> {
    fetcher: F,
    inference: I,
    annotator: Annotator,
}

impl<F: ObjectFetcher, I: InferenceClient> Pipeline<F, I> {
    pub fn new(fetcher: F, inference: I, annotator: Annotator) -> Self {
        Self {
            fetcher,
            inference,
            annotator,
        }
    }

    /// Fetch, then infer, then annotate. The first failure ends the run.
    #[instrument(skip(self))]
    pub async fn run(&self, request: &DetectionRequest) -> Result<RunOutcome, PipelineError> {
        let image_data = self
            .fetcher
            .fetch(&request.bucket, &request.object_key)
            .await?;
        tracing::info!("Fetched s3://{}/{}", request.bucket, request.object_key);

        let detections = self.inference.detect(request).await?;
        tracing::info!("Received {} detections", detections.len());

        let annotation = self
            .annotator
            .annotate(&request.object_key, &image_data, &detections)?;
        tracing::info!(
            "Drew {} of {} labels",
            annotation.boxes_drawn,
            annotation.label_count
        );

        Ok(RunOutcome {
            detections,
            annotation,
        })
    }
}

pub async fn start_app(config: Config) -> Result<(), PipelineError> {
    let font = config
        .annotation
        .load_font()
        .map_err(PipelineError::Config)?;
    let annotator = Annotator::new(&config.annotation, font);

    let sdk_config = load_sdk_config(&config.aws).await;
    let fetcher = S3ObjectFetcher::new(aws_sdk_s3::Client::new(&sdk_config));
    let inference = RekognitionClient::new(aws_sdk_rekognition::Client::new(&sdk_config));

    let pipeline = Pipeline::new(fetcher, inference, annotator);
    let request = config.request.to_request();
    let outcome = pipeline.run(&request).await?;

    let output_path = config.annotation.output_path.as_deref();
    let report = outcome.publish(&request.object_key, output_path)?;
    println!("{}", report);

    Ok(())
}
