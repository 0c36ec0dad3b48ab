//! analyser-server - binary entry point

use analyser_server::{start_server, AppState, ServerConfig};
use s3_analyser::protocol::aws;
use s3_analyser::AnalyserConfig;
use std::path::Path;
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,analyser_server=debug,s3_analyser=info".into()),
        )
        .json()
        .init();

    let server_config = ServerConfig::from_env()?;

    let mut config = match std::env::var("ANALYSER_CONFIG") {
        Ok(path) => AnalyserConfig::from_file(Path::new(&path))?,
        Err(_) => AnalyserConfig::default(),
    };
    config.apply_env();
    config.validate()?;

    let (s3, cloudwatch) = aws::connect(&config.provider).await?;
    tracing::info!("Provider clients ready for {}", s3.home_region());

    let state = AppState::new(
        Arc::new(s3),
        Arc::new(cloudwatch),
        &server_config.token,
        config,
    );
    start_server(server_config.bind, state).await?;
    Ok(())
}
