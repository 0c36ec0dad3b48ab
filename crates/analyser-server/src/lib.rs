//! HTTP trigger for s3-analyser runs
//!
//! `GET /?token=..&unit=..&prefix=..&conc=..&fmt=..&pretty=..&echo` runs one
//! analysis and answers with its report. Only one run executes at a time; a
//! request arriving meanwhile gets `409 Conflict`.

pub mod error;
pub mod query;
pub mod server;
pub mod state;

pub use error::{ServerError, ServerResult};
pub use server::router;
pub use state::AppState;

use std::net::SocketAddr;

/// Token used when neither `ANALYSER_TOKEN` nor `TOKEN` is set
pub const INSECURE_DEFAULT_TOKEN: &str = "s3cr3t";

/// Configuration for the trigger server
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind: SocketAddr,
    pub token: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([127, 0, 0, 1], 8000)),
            token: INSECURE_DEFAULT_TOKEN.to_string(),
        }
    }
}

impl ServerConfig {
    /// Read `ANALYSER_BIND`, `ANALYSER_TOKEN` and `TOKEN`
    pub fn from_env() -> ServerResult<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> ServerResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        let non_empty = |name: &str| lookup(name).filter(|v| !v.is_empty());

        if let Some(bind) = non_empty("ANALYSER_BIND") {
            config.bind = bind
                .parse()
                .map_err(|e| ServerError::Config(format!("invalid ANALYSER_BIND '{}': {}", bind, e)))?;
        }

        match non_empty("ANALYSER_TOKEN").or_else(|| non_empty("TOKEN")) {
            Some(token) => config.token = token,
            None => tracing::warn!("No ANALYSER_TOKEN set, using the insecure default token"),
        }

        Ok(config)
    }
}

/// Serve `state` on `bind` until the process ends
pub async fn start_server(bind: SocketAddr, state: AppState) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(bind).await?;
    tracing::info!("Starting s3-analyser endpoint at http://{}", bind);
    axum::serve(listener, router(state)).await
}
