//! Card Render
//!
//! Turns a submitted trading-card form (two images plus a handful of text and
//! styling fields) into a PNG, JPEG or single-page PDF by filling an HTML/CSS
//! card template and rasterizing it in headless Chrome.
//!
//! # Pipeline
//!
//! - **Sanitize**: clamp numerics, escape and bound display strings ([`sanitize`], [`request`])
//! - **Encode**: embed uploads as `data:` URLs ([`assets`])
//! - **Compose**: fill template slots and inline styles ([`template`])
//! - **Gate**: bound concurrent renders, serialize engine sessions ([`gate`])
//! - **Render**: drive the browser ([`cdp`], behind the `cdp` feature)
//! - **Package**: pair bytes with a media type ([`response`])
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use cardrender::{CardRenderer, ServiceConfig};
//! use cardrender::request::{CardForm, RenderRequest};
//! use cardrender::assets::ImagePayload;
//!
//! # async fn run(bg: Vec<u8>, main: Vec<u8>) -> cardrender::Result<()> {
//! let config = ServiceConfig::default();
//! let engine = cardrender::new_engine(config.engine.clone())?;
//! let renderer = CardRenderer::from_config(&config, engine);
//!
//! let form: CardForm = [("playerName", "Daigo"), ("format", "png")].into_iter().collect();
//! let request = RenderRequest::from_form(
//!     &form,
//!     &config.defaults,
//!     ImagePayload::new(Some("image/jpeg"), bg),
//!     ImagePayload::new(Some("image/png"), main),
//! )?;
//! let card = renderer.render(request).await?;
//! println!("{} bytes of {}", card.bytes.len(), card.media_type);
//! # Ok(())
//! # }
//! ```

use std::path::PathBuf;
use std::sync::Arc;

pub mod error;
pub use error::{Error, Result};

pub mod assets;
pub mod gate;
pub mod http;
pub mod icons;
pub mod request;
pub mod response;
pub mod sanitize;
pub mod template;

#[cfg(feature = "cdp")]
pub mod cdp;

// Async render facade over the blocking engine
pub mod async_api;

pub use async_api::CardRenderer;
pub use request::{CardDefaults, OutputFormat};
pub use template::{ComposedDocument, RenderOptions};

/// Configuration for the render engine backend
///
/// # Examples
///
/// ```
/// let cfg = cardrender::EngineConfig::default();
/// assert_eq!(cfg.timeout_ms, 15_000);
/// ```
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Per-operation timeout for browser commands and readiness waits, in milliseconds
    pub timeout_ms: u64,
    /// Chrome/Chromium binary; auto-detected when `None`
    pub chrome_path: Option<PathBuf>,
    /// Whether to keep Chrome's sandbox enabled
    pub sandbox: bool,
    /// Extra command-line switches passed to Chrome
    pub extra_args: Vec<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 15_000,
            chrome_path: None,
            sandbox: false,
            extra_args: vec![
                "--font-render-hinting=medium".to_string(),
                "--enable-font-antialiasing".to_string(),
            ],
        }
    }
}

/// Service-wide configuration
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Maximum number of renders holding a work permit at once
    pub max_concurrency: usize,
    /// Directory containing `card.html` and `card.css`
    pub template_dir: PathBuf,
    /// Directory containing `index.html` for the root page
    pub static_dir: PathBuf,
    /// Largest accepted multipart body in bytes
    pub max_upload_bytes: usize,
    pub engine: EngineConfig,
    pub defaults: CardDefaults,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            max_concurrency: 4,
            template_dir: PathBuf::from("card_template"),
            static_dir: PathBuf::from("static"),
            max_upload_bytes: 16 * 1024 * 1024,
            engine: EngineConfig::default(),
            defaults: CardDefaults::default(),
        }
    }
}

/// Backend that turns a composed document into output bytes
///
/// Implementations are blocking; [`CardRenderer`] runs them on a dedicated
/// worker thread. Each call must own its engine session and release it
/// before returning, on every path.
pub trait RenderEngine: Send + Sync {
    fn render(&self, document: &ComposedDocument, options: &RenderOptions) -> Result<Vec<u8>>;
}

/// Create the default render engine backend.
#[cfg(feature = "cdp")]
pub fn new_engine(config: EngineConfig) -> Result<Arc<dyn RenderEngine>> {
    Ok(Arc::new(cdp::CdpEngine::new(config)))
}

#[cfg(not(feature = "cdp"))]
pub fn new_engine(_config: EngineConfig) -> Result<Arc<dyn RenderEngine>> {
    Err(Error::EngineUnavailable(
        "built without the `cdp` feature; no render backend available".into(),
    ))
}
