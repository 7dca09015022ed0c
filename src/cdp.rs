//! Chrome DevTools Protocol render backend

use std::ffi::OsStr;
use std::sync::Arc;
use std::time::Duration;

use headless_chrome::browser::tab::Tab;
use headless_chrome::protocol::cdp::{Emulation, Page, DOM};
use headless_chrome::types::PrintToPdfOptions;
use headless_chrome::util::{Timeout, Wait};
use headless_chrome::{Browser, LaunchOptions};
use log::{debug, warn};

use crate::request::OutputFormat;
use crate::template::{ComposedDocument, RenderOptions};
use crate::{EngineConfig, Error, RenderEngine, Result};

/// JPEG quality used for every JPEG capture.
pub const JPEG_QUALITY: u32 = 95;

/// CSS pixels per inch, for converting page sizes into PDF paper inches.
const CSS_PX_PER_INCH: f64 = 96.0;

const CONTENT_READY: &str =
    "document.readyState === 'complete' && Array.from(document.images).every(img => img.complete)";

const FONTS_READY: &str = "document.fonts ? document.fonts.ready.then(() => true) : true";

/// Headless Chrome backend (uses the `headless_chrome` crate)
///
/// Every render launches its own browser process and tears it down before
/// returning; nothing is pooled between requests.
pub struct CdpEngine {
    config: EngineConfig,
}

/// A live browser process and its tab. Dropping it closes both.
struct EngineSession {
    browser: Browser,
    tab: Option<Arc<Tab>>,
}

impl EngineSession {
    fn tab(&self) -> Result<&Arc<Tab>> {
        self.tab
            .as_ref()
            .ok_or_else(|| Error::RenderFailed("engine session has no tab".into()))
    }
}

impl Drop for EngineSession {
    fn drop(&mut self) {
        if let Some(tab) = self.tab.take() {
            if let Err(e) = tab.close(false) {
                debug!("failed to close render tab: {}", e);
            }
        }
        // The browser field drops next, which kills the Chrome process.
    }
}

impl CdpEngine {
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    fn timeout(&self) -> Duration {
        Duration::from_millis(self.config.timeout_ms)
    }

    fn launch(&self, options: &RenderOptions) -> Result<EngineSession> {
        let args: Vec<&OsStr> = self.config.extra_args.iter().map(OsStr::new).collect();
        let launch_options = LaunchOptions::default_builder()
            .headless(true)
            .sandbox(self.config.sandbox)
            .path(self.config.chrome_path.clone())
            .window_size(Some((options.width, options.height)))
            .idle_browser_timeout(self.timeout().max(Duration::from_secs(30)))
            .args(args)
            .build()
            .map_err(|e| Error::EngineUnavailable(format!("Failed to build launch options: {}", e)))?;

        let browser = Browser::new(launch_options)
            .map_err(|e| Error::EngineUnavailable(format!("Failed to launch browser: {}", e)))?;

        let mut session = EngineSession { browser, tab: None };
        let tab = session
            .browser
            .new_tab()
            .map_err(|e| Error::EngineUnavailable(format!("Failed to create tab: {}", e)))?;
        session.tab = Some(tab);
        Ok(session)
    }

    fn load_document(&self, tab: &Tab, document: &ComposedDocument, options: &RenderOptions) -> Result<()> {
        let timeout_ms = self.config.timeout_ms;
        tab.set_default_timeout(self.timeout());

        tab.call_method(Emulation::SetDeviceMetricsOverride {
            width: options.width,
            height: options.height,
            device_scale_factor: options.device_scale_factor,
            mobile: false,
            scale: None,
            screen_width: None,
            screen_height: None,
            position_x: None,
            position_y: None,
            dont_set_visible_size: None,
            screen_orientation: None,
            viewport: None,
            display_feature: None,
            device_posture: None,
        })
        .map_err(|e| engine_error(e, timeout_ms))?;

        tab.call_method(Emulation::SetEmulatedMedia {
            media: Some("screen".to_string()),
            features: None,
        })
        .map_err(|e| engine_error(e, timeout_ms))?;

        if options.transparent && options.format == OutputFormat::Png {
            tab.call_method(Emulation::SetDefaultBackgroundColorOverride {
                color: Some(DOM::RGBA { r: 0, g: 0, b: 0, a: Some(0.0) }),
            })
            .map_err(|e| engine_error(e, timeout_ms))?;
        }

        tab.navigate_to("about:blank")
            .and_then(|t| t.wait_until_navigated())
            .map_err(|e| engine_error(e, timeout_ms))?;

        let frame_id = tab
            .call_method(Page::GetFrameTree(None))
            .map_err(|e| engine_error(e, timeout_ms))?
            .frame_tree
            .frame
            .id;
        tab.call_method(Page::SetDocumentContent {
            frame_id,
            html: document.html.clone(),
        })
        .map_err(|e| engine_error(e, timeout_ms))?;

        Wait::with_timeout(self.timeout())
            .until(|| {
                let ready = tab.evaluate(CONTENT_READY, false).ok()?;
                ready.value.and_then(|v| v.as_bool()).filter(|ready| *ready)
            })
            .map_err(|_| Error::RenderTimeout(timeout_ms))?;

        // Font readiness is best-effort: a page without the Font Loading API,
        // or one whose check fails, still renders with whatever fonts loaded.
        if let Err(e) = tab.evaluate(FONTS_READY, true) {
            debug!("font readiness check skipped: {}", e);
        }

        Ok(())
    }

    fn capture(&self, tab: &Tab, options: &RenderOptions) -> Result<Vec<u8>> {
        let timeout_ms = self.config.timeout_ms;
        match options.format {
            OutputFormat::Pdf => {
                let pdf_options = PrintToPdfOptions {
                    paper_width: Some(options.width as f64 / CSS_PX_PER_INCH),
                    paper_height: Some(options.height as f64 / CSS_PX_PER_INCH),
                    margin_top: Some(0.0),
                    margin_bottom: Some(0.0),
                    margin_left: Some(0.0),
                    margin_right: Some(0.0),
                    print_background: Some(true),
                    page_ranges: Some("1".to_string()),
                    ..Default::default()
                };
                tab.print_to_pdf(Some(pdf_options))
                    .map_err(|e| engine_error(e, timeout_ms))
            }
            OutputFormat::Png | OutputFormat::Jpeg => {
                let (format, quality) = match options.format {
                    OutputFormat::Jpeg => (Page::CaptureScreenshotFormatOption::Jpeg, Some(JPEG_QUALITY)),
                    _ => (Page::CaptureScreenshotFormatOption::Png, None),
                };
                let clip = Page::Viewport {
                    x: 0.0,
                    y: 0.0,
                    width: options.width as f64,
                    height: options.height as f64,
                    // Device metrics already carry the pixel ratio.
                    scale: 1.0,
                };
                tab.capture_screenshot(format, quality, Some(clip), true)
                    .map_err(|e| engine_error(e, timeout_ms))
            }
        }
    }
}

impl RenderEngine for CdpEngine {
    fn render(&self, document: &ComposedDocument, options: &RenderOptions) -> Result<Vec<u8>> {
        let session = self.launch(options)?;
        let tab = session.tab()?;
        self.load_document(tab, document, options)?;
        let bytes = self.capture(tab, options)?;
        drop(session);
        Ok(bytes)
    }
}

/// Map a `headless_chrome` failure onto the pipeline's error taxonomy.
fn engine_error(err: anyhow::Error, timeout_ms: u64) -> Error {
    let message = err.to_string();
    let lowered = message.to_ascii_lowercase();
    if err.downcast_ref::<Timeout>().is_some() || lowered.contains("timed out") {
        warn!("render engine timed out: {}", message);
        Error::RenderTimeout(timeout_ms)
    } else {
        Error::RenderFailed(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeouts_are_classified() {
        assert!(matches!(engine_error(anyhow::Error::new(Timeout), 15000), Error::RenderTimeout(15000)));
        assert!(matches!(
            engine_error(anyhow::anyhow!("Method call timed out"), 10),
            Error::RenderTimeout(10)
        ));
        assert!(matches!(
            engine_error(anyhow::anyhow!("Target closed"), 10),
            Error::RenderFailed(_)
        ));
        assert!(matches!(
            engine_error(anyhow::anyhow!("Invalid parameters: timeout: integer value expected"), 10),
            Error::RenderFailed(_)
        ));
    }

    #[test]
    #[ignore] // Requires Chrome to be installed
    fn page_sees_requested_device_pixel_ratio() {
        let engine = CdpEngine::new(EngineConfig::default());
        let document = ComposedDocument {
            html: "<html><body style=\"margin:0\"></body></html>".to_string(),
        };
        let options = RenderOptions {
            width: 120,
            height: 80,
            device_scale_factor: 3.0,
            format: OutputFormat::Png,
            transparent: false,
        };
        let session = engine.launch(&options).expect("launch");
        let tab = session.tab().expect("tab");
        engine.load_document(tab, &document, &options).expect("load");

        let dpr = tab.evaluate("window.devicePixelRatio", false).expect("evaluate");
        assert_eq!(dpr.value.and_then(|v| v.as_f64()), Some(3.0));
        let inner = tab.evaluate("window.innerWidth", false).expect("evaluate");
        assert_eq!(inner.value.and_then(|v| v.as_u64()), Some(120));

        let png = engine.capture(tab, &options).expect("capture");
        let width = u32::from_be_bytes(png[16..20].try_into().unwrap());
        assert_eq!(width, 360);
    }

    #[test]
    fn test_cdp_engine_render() {
        // This test requires Chrome to be installed, so we skip it in CI
        if std::env::var("CI").is_ok() {
            return;
        }
        let engine = CdpEngine::new(EngineConfig::default());
        let document = ComposedDocument {
            html: "<html><body style=\"margin:0;background:#123\"></body></html>".to_string(),
        };
        let options = RenderOptions {
            width: 40,
            height: 20,
            device_scale_factor: 1.0,
            format: OutputFormat::Png,
            transparent: false,
        };
        match engine.render(&document, &options) {
            Ok(bytes) => assert!(bytes.starts_with(b"\x89PNG")),
            Err(Error::EngineUnavailable(e)) => {
                eprintln!("Skipping CDP render test because Chrome is not available: {}", e);
            }
            Err(e) => panic!("render failed: {}", e),
        }
    }
}
