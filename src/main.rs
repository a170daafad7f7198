use custom_labels::{config, start_app};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = config::get_configuration()?;
    let log_level = &format!(
        "{},aws_config=warn,aws_smithy_runtime=warn",
        config.log_level.as_str()
    );

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| log_level.into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_level(true)
                .with_writer(std::io::stderr),
        )
        .init();

    if let Err(e) = start_app(config).await {
        tracing::error!("Run failed: {}", e);
        return Err(e.into());
    }

    Ok(())
}
