use clap::Parser;
use logsheet_ocr::config::{Args, Config};
use logsheet_ocr::server;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| args.log_level.clone().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::try_from(args)?;

    tracing::info!(
        "Starting logsheet-ocr-server v{}",
        env!("CARGO_PKG_VERSION")
    );
    tracing::info!("Binding to {}:{}", config.host, config.port);
    tracing::info!(
        "Slicing sheets into {} rows, enhancement: {}",
        config.extraction.row_count,
        config.extraction.enhancement.as_str()
    );
    if let Some(dir) = &config.output_dir {
        tracing::info!("Persisting results to {}", dir.display());
    }

    server::run(config).await
}
