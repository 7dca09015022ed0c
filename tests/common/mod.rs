#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use cardrender::assets::ImagePayload;
use cardrender::gate::RenderGate;
use cardrender::icons::IconCatalog;
use cardrender::template::TemplateSource;
use cardrender::{CardRenderer, ComposedDocument, Error, RenderEngine, RenderOptions, Result};

/// Engine double that records calls and how many ran at once.
#[derive(Default)]
pub struct RecordingEngine {
    pub delay: Duration,
    pub fail_with_timeout: bool,
    calls: AtomicUsize,
    active: AtomicUsize,
    peak: AtomicUsize,
    last: Mutex<Option<(String, RenderOptions)>>,
}

impl RecordingEngine {
    pub fn with_delay(delay: Duration) -> Self {
        Self { delay, ..Default::default() }
    }

    pub fn timing_out() -> Self {
        Self { fail_with_timeout: true, ..Default::default() }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    pub fn last_document(&self) -> Option<String> {
        self.last.lock().unwrap().as_ref().map(|(html, _)| html.clone())
    }

    pub fn last_options(&self) -> Option<RenderOptions> {
        self.last.lock().unwrap().as_ref().map(|(_, opts)| *opts)
    }
}

impl RenderEngine for RecordingEngine {
    fn render(&self, document: &ComposedDocument, options: &RenderOptions) -> Result<Vec<u8>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        std::thread::sleep(self.delay);
        *self.last.lock().unwrap() = Some((document.html.clone(), *options));
        self.active.fetch_sub(1, Ordering::SeqCst);
        if self.fail_with_timeout {
            return Err(Error::RenderTimeout(15_000));
        }
        Ok(format!("{}:{}x{}", options.format, options.width, options.height).into_bytes())
    }
}

pub fn template_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("card_template")
}

pub fn renderer(engine: Arc<RecordingEngine>, capacity: usize) -> CardRenderer {
    CardRenderer::new(
        engine,
        Arc::new(RenderGate::new(capacity)),
        TemplateSource::from_dir(template_dir()),
        Arc::new(IconCatalog::builtin()),
    )
}

pub fn image() -> Option<ImagePayload> {
    ImagePayload::new(Some("image/png"), b"\x89PNG\r\n\x1a\nfake".to_vec())
}
