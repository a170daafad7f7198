use crate::config::AwsConfig;
use aws_config::{timeout::TimeoutConfig, BehaviorVersion, Region, SdkConfig};
use aws_sdk_s3::error::SdkError;

/// Resolves credentials and region from the environment's default provider
/// chain. Every operation is bounded by the configured timeout.
pub async fn load_sdk_config(aws_config: &AwsConfig) -> SdkConfig {
    let timeout_config = TimeoutConfig::builder()
        .operation_timeout(aws_config.get_operation_timeout())
        .build();

    let mut loader = aws_config::defaults(BehaviorVersion::latest()).timeout_config(timeout_config);
    if let Some(region) = &aws_config.region {
        loader = loader.region(Region::new(region.clone()));
    }

    let sdk_config = loader.load().await;
    tracing::debug!(region = ?sdk_config.region(), "Loaded AWS configuration");
    sdk_config
}

/// True when the request never got a usable answer from the service.
pub fn is_transport_failure<E, R>(err: &SdkError<E, R>) -> bool {
    matches!(
        err,
        SdkError::DispatchFailure(_) | SdkError::TimeoutError(_) | SdkError::ResponseError(_)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use aws_sdk_s3::operation::get_object::GetObjectError;

    #[test]
    fn test_timeout_is_transport_failure() {
        let err = SdkError::<GetObjectError>::timeout_error("operation timed out");
        assert!(is_transport_failure(&err));
    }

    #[test]
    fn test_construction_failure_is_not_transport_failure() {
        let err = SdkError::<GetObjectError>::construction_failure("missing bucket");
        assert!(!is_transport_failure(&err));
    }
}
