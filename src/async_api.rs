use std::sync::Arc;
use std::thread;

use log::{info, warn};
use tokio::sync::oneshot;

use crate::gate::RenderGate;
use crate::icons::IconCatalog;
use crate::request::RenderRequest;
use crate::response::RenderedCard;
use crate::template::{self, ComposedDocument, RenderOptions, TemplateSource};
use crate::{Error, RenderEngine, Result, ServiceConfig};

/// Async render facade.
///
/// Composition happens on the calling task. The engine itself is blocking,
/// so each render runs on a dedicated worker thread that reports back over a
/// oneshot channel while a work permit and the driver lock are held.
#[derive(Clone)]
pub struct CardRenderer {
    engine: Arc<dyn RenderEngine>,
    gate: Arc<RenderGate>,
    templates: TemplateSource,
    icons: Arc<IconCatalog>,
}

impl CardRenderer {
    pub fn new(
        engine: Arc<dyn RenderEngine>,
        gate: Arc<RenderGate>,
        templates: TemplateSource,
        icons: Arc<IconCatalog>,
    ) -> Self {
        Self { engine, gate, templates, icons }
    }

    /// Renderer with a fresh gate, the configured template directory and the builtin icons.
    pub fn from_config(config: &ServiceConfig, engine: Arc<dyn RenderEngine>) -> Self {
        Self::new(
            engine,
            Arc::new(RenderGate::new(config.max_concurrency)),
            TemplateSource::from_dir(&config.template_dir),
            Arc::new(IconCatalog::builtin()),
        )
    }

    pub fn gate(&self) -> &Arc<RenderGate> {
        &self.gate
    }

    /// Compose, render and package one card. Exactly one engine attempt is made.
    pub async fn render(&self, request: RenderRequest) -> Result<RenderedCard> {
        let card_template = self.templates.load().await?;
        let document = template::compose(&card_template, &request, &self.icons);
        let options = RenderOptions::from(&request);
        drop(request);

        // Detached so that a dropped caller cannot give up the driver lock
        // while its Chrome session is still running.
        let engine = self.engine.clone();
        let gate = self.gate.clone();
        let task = tokio::spawn(async move {
            let permit = gate.acquire_work().await?;
            let result = gate
                .with_driver_lock(|| run_on_worker(engine, document, options))
                .await;
            permit.release();
            result
        });
        let result = task
            .await
            .map_err(|e| Error::RenderFailed(format!("render task aborted: {}", e)))
            .and_then(|res| res);

        match result {
            Ok(bytes) => {
                info!("rendered {}x{} {} card ({} bytes)", options.width, options.height, options.format, bytes.len());
                Ok(RenderedCard::new(options.format, bytes))
            }
            Err(err) => {
                warn!("card render failed: {}", err);
                Err(err)
            }
        }
    }
}

async fn run_on_worker(
    engine: Arc<dyn RenderEngine>,
    document: ComposedDocument,
    options: RenderOptions,
) -> Result<Vec<u8>> {
    let (tx, rx) = oneshot::channel();

    thread::Builder::new()
        .name("card-render".into())
        .spawn(move || {
            let res = engine.render(&document, &options);
            let _ = tx.send(res);
        })
        .map_err(|e| Error::EngineUnavailable(format!("failed to spawn render worker: {}", e)))?;

    rx.await
        .map_err(|_| Error::RenderFailed("render worker exited without a result".into()))?
}
