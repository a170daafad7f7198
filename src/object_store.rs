use crate::aws::is_transport_failure;
use async_trait::async_trait;
use aws_sdk_s3::{
    error::{DisplayErrorContext, ProvideErrorMetadata, SdkError},
    operation::get_object::GetObjectError,
    Client,
};
use bytes::Bytes;
use thiserror::Error;
use tracing::instrument;

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("Object s3://{bucket}/{key} not found")]
    NotFound { bucket: String, key: String },
    #[error("Failed to reach object store for s3://{bucket}/{key}: {message}")]
    Connectivity {
        bucket: String,
        key: String,
        message: String,
    },
    #[error("Object store rejected request for s3://{bucket}/{key}: {message}")]
    Service {
        bucket: String,
        key: String,
        message: String,
    },
}

#[async_trait]
pub trait ObjectFetcher: Send + Sync {
    async fn fetch(&self, bucket: &str, key: &str) -> Result<Bytes, FetchError>;
}

#[derive(Debug, Clone)]
pub struct S3ObjectFetcher {
    client: Client,
}

impl S3ObjectFetcher {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

fn classify_get_object_error(bucket: &str, key: &str, err: SdkError<GetObjectError>) -> FetchError {
    let bucket = bucket.to_string();
    let key = key.to_string();
    let message = DisplayErrorContext(&err).to_string();

    if is_transport_failure(&err) {
        return FetchError::Connectivity {
            bucket,
            key,
            message,
        };
    }

    let not_found_status = err
        .raw_response()
        .map(|response| response.status().as_u16() == 404)
        .unwrap_or(false);

    match err.as_service_error() {
        Some(service_err)
            if service_err.is_no_such_key() || service_err.code() == Some("NoSuchBucket") =>
        {
            FetchError::NotFound { bucket, key }
        }
        Some(_) if not_found_status => FetchError::NotFound { bucket, key },
        _ => FetchError::Service {
            bucket,
            key,
            message,
        },
    }
}

#[async_trait]
impl ObjectFetcher for S3ObjectFetcher {
    #[instrument(skip(self))]
    async fn fetch(&self, bucket: &str, key: &str) -> Result<Bytes, FetchError> {
        let output = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| classify_get_object_error(bucket, key, e))?;

        let body = output
            .body
            .collect()
            .await
            .map_err(|e| FetchError::Connectivity {
                bucket: bucket.to_string(),
                key: key.to_string(),
                message: format!("body stream interrupted: {}", e),
            })?
            .into_bytes();

        tracing::debug!("Fetched {} bytes", body.len());
        Ok(body)
    }
}
