use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::{fmt, util::SubscriberInitExt, EnvFilter};

use cardrender::http::{self, AppState};
use cardrender::{CardRenderer, EngineConfig, ServiceConfig};

/// Trading card render service
#[derive(Parser, Debug)]
#[command(name = "cardrender", version, about)]
struct Args {
    /// Address to listen on
    #[arg(long, env = "BIND_ADDR", default_value = "0.0.0.0:8000")]
    bind: SocketAddr,
    /// Maximum number of renders in flight at once
    #[arg(long, env = "MAX_CONCURRENCY", default_value_t = 4)]
    max_concurrency: usize,
    /// Directory containing card.html and card.css
    #[arg(long, env = "CARD_TEMPLATE_DIR", default_value = "card_template")]
    template_dir: PathBuf,
    /// Directory containing index.html
    #[arg(long, env = "STATIC_DIR", default_value = "static")]
    static_dir: PathBuf,
    /// Per-operation render engine timeout in milliseconds
    #[arg(long, default_value_t = 15_000)]
    timeout_ms: u64,
    /// Chrome/Chromium binary to launch
    #[arg(long, env = "CHROME_PATH")]
    chrome_path: Option<PathBuf>,
    /// Largest accepted upload in MiB
    #[arg(long, default_value_t = 16)]
    max_upload_mb: usize,
}

impl Args {
    fn into_config(self) -> ServiceConfig {
        ServiceConfig {
            max_concurrency: self.max_concurrency.max(1),
            template_dir: self.template_dir,
            static_dir: self.static_dir,
            max_upload_bytes: self.max_upload_mb.saturating_mul(1024 * 1024),
            engine: EngineConfig {
                timeout_ms: self.timeout_ms,
                chrome_path: self.chrome_path,
                ..Default::default()
            },
            ..Default::default()
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(true)
        .finish()
        .try_init()
        .context("failed to install log subscriber")?;

    let args = Args::parse();
    let bind = args.bind;
    let config = args.into_config();

    let engine = cardrender::new_engine(config.engine.clone())?;
    let renderer = CardRenderer::from_config(&config, engine);
    let app = http::router(AppState::new(&config, renderer), config.max_upload_bytes);

    log::info!(
        "listening on {} (max concurrency {}, templates in {})",
        bind,
        config.max_concurrency,
        config.template_dir.display()
    );
    let listener = tokio::net::TcpListener::bind(bind)
        .await
        .with_context(|| format!("failed to bind {}", bind))?;
    axum::serve(listener, app).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn huge_upload_limit_saturates() {
        let args = Args::parse_from(["cardrender", "--max-upload-mb", &usize::MAX.to_string()]);
        assert_eq!(args.into_config().max_upload_bytes, usize::MAX);
    }

    #[test]
    fn upload_limit_is_given_in_mebibytes() {
        let args = Args::parse_from(["cardrender", "--max-upload-mb", "2", "--max-concurrency", "0"]);
        let config = args.into_config();
        assert_eq!(config.max_upload_bytes, 2 * 1024 * 1024);
        assert_eq!(config.max_concurrency, 1);
    }
}
