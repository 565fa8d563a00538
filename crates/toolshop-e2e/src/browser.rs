//! Browser control over the Chrome `DevTools` Protocol.
//!
//! With the `browser` feature, [`ChromiumDriver`] implements [`Driver`] on a
//! real Chromium page via chromiumoxide and [`ChromiumLauncher`] starts one
//! isolated browser per test. [`BrowserConfig`] is always available.
//!
//! [`Driver`]: crate::driver::Driver

use crate::config::Config;

/// Browser configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrowserConfig {
    /// Run in headless mode
    pub headless: bool,
    /// Viewport width
    pub viewport_width: u32,
    /// Viewport height
    pub viewport_height: u32,
    /// Path to chromium binary (None = auto-detect)
    pub chromium_path: Option<String>,
    /// Sandbox mode (disable for containers)
    pub sandbox: bool,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            headless: true,
            viewport_width: 1280,
            viewport_height: 720,
            chromium_path: None,
            sandbox: true,
        }
    }
}

impl BrowserConfig {
    /// Headless flag and binary path from the suite configuration
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self {
            headless: config.headless,
            chromium_path: config.chromium_path.clone(),
            ..Self::default()
        }
    }

    /// Set viewport dimensions
    #[must_use]
    pub const fn with_viewport(mut self, width: u32, height: u32) -> Self {
        self.viewport_width = width;
        self.viewport_height = height;
        self
    }

    /// Set headless mode
    #[must_use]
    pub const fn with_headless(mut self, headless: bool) -> Self {
        self.headless = headless;
        self
    }

    /// Set chromium path
    #[must_use]
    pub fn with_chromium_path(mut self, path: impl Into<String>) -> Self {
        self.chromium_path = Some(path.into());
        self
    }

    /// Disable sandbox (for containers/CI)
    #[must_use]
    pub const fn with_no_sandbox(mut self) -> Self {
        self.sandbox = false;
        self
    }
}

#[cfg(feature = "browser")]
#[allow(clippy::missing_errors_doc, clippy::significant_drop_tightening)]
mod cdp {
    use super::BrowserConfig;
    use crate::config::Config;
    use crate::driver::{Driver, ElementState};
    use crate::fixture::SessionLauncher;
    use crate::locator::Selector;
    use crate::network::{HttpMethod, SharedTracker};
    use crate::result::{E2eError, E2eResult};
    use async_trait::async_trait;
    use chromiumoxide::browser::{Browser, BrowserConfig as CdpConfig};
    use chromiumoxide::cdp::browser_protocol::network::{
        EnableParams, EventLoadingFailed, EventLoadingFinished, EventRequestWillBeSent,
    };
    use chromiumoxide::cdp::browser_protocol::page::CaptureScreenshotFormat;
    use chromiumoxide::element::Element;
    use chromiumoxide::page::{Page, ScreenshotParams};
    use futures::StreamExt;
    use serde::de::DeserializeOwned;
    use serde::Deserialize;
    use std::fmt;
    use std::sync::Arc;
    use tokio::task::JoinHandle;
    use tracing::{debug, warn};

    /// Attribute used to hand a JS-resolved element over to CDP
    const REF_ATTRIBUTE: &str = "data-e2e-ref";

    fn page_error(e: impl fmt::Display) -> E2eError {
        E2eError::Page {
            message: e.to_string(),
        }
    }

    fn js_string(value: &str) -> String {
        serde_json::Value::String(value.to_string()).to_string()
    }

    #[derive(Debug, Deserialize)]
    struct RawElementState {
        count: usize,
        visible: bool,
        enabled: bool,
    }

    /// A Chromium page driven over CDP
    pub struct ChromiumDriver {
        browser: tokio::sync::Mutex<Option<Browser>>,
        page: Page,
        network: SharedTracker,
        tasks: std::sync::Mutex<Vec<JoinHandle<()>>>,
    }

    impl fmt::Debug for ChromiumDriver {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.debug_struct("ChromiumDriver")
                .field("network", &self.network)
                .finish_non_exhaustive()
        }
    }

    impl ChromiumDriver {
        /// Launch a new browser with one blank page
        pub async fn launch(config: &BrowserConfig) -> E2eResult<Self> {
            let mut builder = CdpConfig::builder()
                .window_size(config.viewport_width, config.viewport_height);
            if !config.headless {
                builder = builder.with_head();
            }
            if !config.sandbox {
                builder = builder.no_sandbox();
            }
            if let Some(ref path) = config.chromium_path {
                builder = builder.chrome_executable(path);
            }
            let cdp_config = builder
                .build()
                .map_err(|message| E2eError::BrowserLaunch { message })?;

            let (browser, mut handler) =
                Browser::launch(cdp_config)
                    .await
                    .map_err(|e| E2eError::BrowserLaunch {
                        message: e.to_string(),
                    })?;

            let handler_task = tokio::spawn(async move {
                while let Some(event) = handler.next().await {
                    if let Err(e) = event {
                        debug!(error = %e, "CDP handler event error");
                    }
                }
            });

            let page = browser.new_page("about:blank").await.map_err(page_error)?;
            let network = SharedTracker::new();
            let mut tasks = vec![handler_task];
            tasks.extend(Self::track_network(&page, &network).await?);
            debug!(headless = config.headless, "chromium session launched");

            Ok(Self {
                browser: tokio::sync::Mutex::new(Some(browser)),
                page,
                network,
                tasks: std::sync::Mutex::new(tasks),
            })
        }

        async fn track_network(
            page: &Page,
            network: &SharedTracker,
        ) -> E2eResult<Vec<JoinHandle<()>>> {
            page.execute(EnableParams::default()).await.map_err(page_error)?;

            let mut sent = page
                .event_listener::<EventRequestWillBeSent>()
                .await
                .map_err(page_error)?;
            let mut finished = page
                .event_listener::<EventLoadingFinished>()
                .await
                .map_err(page_error)?;
            let mut failed = page
                .event_listener::<EventLoadingFailed>()
                .await
                .map_err(page_error)?;

            let tracker = network.clone();
            let on_sent = tokio::spawn(async move {
                while let Some(event) = sent.next().await {
                    tracker.lock().request_started(
                        event.request_id.inner(),
                        &event.request.url,
                        HttpMethod::parse(&event.request.method),
                    );
                }
            });
            let tracker = network.clone();
            let on_finished = tokio::spawn(async move {
                while let Some(event) = finished.next().await {
                    tracker.lock().request_finished(event.request_id.inner());
                }
            });
            let tracker = network.clone();
            let on_failed = tokio::spawn(async move {
                while let Some(event) = failed.next().await {
                    tracker.lock().request_failed(event.request_id.inner());
                }
            });
            Ok(vec![on_sent, on_finished, on_failed])
        }

        /// Evaluate an expression that returns `JSON.stringify(...)`
        async fn eval_json<T: DeserializeOwned>(&self, expression: String) -> E2eResult<T> {
            let raw: String = self
                .page
                .evaluate(expression)
                .await
                .map_err(page_error)?
                .into_value()
                .map_err(page_error)?;
            Ok(serde_json::from_str(&raw)?)
        }

        /// Run `body` against the first match bound to `el`
        async fn with_first<T: DeserializeOwned>(
            &self,
            selector: &Selector,
            body: &str,
        ) -> E2eResult<T> {
            self.eval_json(format!(
                "(() => {{ const el = {}; return JSON.stringify({body}); }})()",
                selector.to_query()
            ))
            .await
        }

        /// Resolve the first match to a CDP element handle
        async fn element(&self, selector: &Selector) -> E2eResult<Element> {
            let css = if let Some(css) = selector.as_css() {
                css.to_string()
            } else {
                let tag = uuid::Uuid::new_v4().simple().to_string();
                let tagged: bool = self
                    .with_first(
                        selector,
                        &format!(
                            "el ? (el.setAttribute({}, {}), true) : false",
                            js_string(REF_ATTRIBUTE),
                            js_string(&tag)
                        ),
                    )
                    .await?;
                if !tagged {
                    return Err(page_error(format!("no element matches {selector}")));
                }
                format!("[{REF_ATTRIBUTE}='{tag}']")
            };
            self.page
                .find_element(css)
                .await
                .map_err(|e| page_error(format!("{selector}: {e}")))
        }
    }

    #[async_trait]
    impl Driver for ChromiumDriver {
        async fn goto(&self, url: &str) -> E2eResult<()> {
            debug!(url, "goto");
            self.network.lock().reset_inflight();
            self.page
                .goto(url)
                .await
                .map_err(|e| E2eError::Navigation {
                    url: url.to_string(),
                    message: e.to_string(),
                })?;
            Ok(())
        }

        async fn current_url(&self) -> E2eResult<String> {
            Ok(self.page.url().await.map_err(page_error)?.unwrap_or_default())
        }

        async fn element_state(&self, selector: &Selector) -> E2eResult<ElementState> {
            let raw: RawElementState = self
                .eval_json(format!(
                    "(() => {{ const all = {}; const el = all[0]; \
                     if (!el) return JSON.stringify({{count: 0, visible: false, enabled: false}}); \
                     const style = window.getComputedStyle(el); const rect = el.getBoundingClientRect(); \
                     const visible = style.visibility !== 'hidden' && style.display !== 'none' \
                       && rect.width > 0 && rect.height > 0; \
                     return JSON.stringify({{count: all.length, visible, enabled: !el.disabled}}); }})()",
                    selector.to_all_query()
                ))
                .await?;
            Ok(ElementState {
                count: raw.count,
                visible: raw.visible,
                enabled: raw.enabled,
            })
        }

        async fn click(&self, selector: &Selector) -> E2eResult<()> {
            debug!(%selector, "click");
            self.element(selector).await?.click().await.map_err(page_error)?;
            Ok(())
        }

        async fn clear(&self, selector: &Selector) -> E2eResult<()> {
            let cleared: bool = self
                .with_first(
                    selector,
                    "el ? (el.focus(), el.value = '', \
                     el.dispatchEvent(new Event('input', {bubbles: true})), true) : false",
                )
                .await?;
            if cleared {
                Ok(())
            } else {
                Err(page_error(format!("no element matches {selector}")))
            }
        }

        async fn type_text(&self, selector: &Selector, text: &str) -> E2eResult<()> {
            debug!(%selector, "type");
            let element = self.element(selector).await?;
            element.focus().await.map_err(page_error)?;
            element.type_str(text).await.map_err(page_error)?;
            Ok(())
        }

        async fn select_option(&self, selector: &Selector, label: &str) -> E2eResult<()> {
            debug!(%selector, label, "select option");
            let selected: bool = self
                .with_first(
                    selector,
                    &format!(
                        "(() => {{ if (!el) return false; \
                         const opt = Array.from(el.options || []).find(o => o.label.trim() === {label}); \
                         if (!opt) return false; el.value = opt.value; \
                         el.dispatchEvent(new Event('input', {{bubbles: true}})); \
                         el.dispatchEvent(new Event('change', {{bubbles: true}})); return true; }})()",
                        label = js_string(label)
                    ),
                )
                .await?;
            if selected {
                Ok(())
            } else {
                Err(page_error(format!("{selector} has no option labelled {label:?}")))
            }
        }

        async fn press(&self, selector: &Selector, key: &str) -> E2eResult<()> {
            debug!(%selector, key, "press");
            let element = self.element(selector).await?;
            element.focus().await.map_err(page_error)?;
            element.press_key(key).await.map_err(page_error)?;
            Ok(())
        }

        async fn set_value(&self, selector: &Selector, value: &str) -> E2eResult<()> {
            debug!(%selector, value, "set value");
            let assigned: bool = self
                .with_first(
                    selector,
                    &format!(
                        "el ? (el.value = {}, \
                         el.dispatchEvent(new Event('input', {{bubbles: true}})), \
                         el.dispatchEvent(new Event('change', {{bubbles: true}})), true) : false",
                        js_string(value)
                    ),
                )
                .await?;
            if assigned {
                Ok(())
            } else {
                Err(page_error(format!("no element matches {selector}")))
            }
        }

        async fn text(&self, selector: &Selector) -> E2eResult<Option<String>> {
            self.with_first(selector, "el ? el.innerText : null").await
        }

        async fn value(&self, selector: &Selector) -> E2eResult<Option<String>> {
            self.with_first(selector, "el ? (el.value ?? el.textContent) : null")
                .await
        }

        async fn set_local_storage(&self, key: &str, value: &str) -> E2eResult<()> {
            let _: bool = self
                .eval_json(format!(
                    "(() => {{ window.localStorage.setItem({}, {}); return JSON.stringify(true); }})()",
                    js_string(key),
                    js_string(value)
                ))
                .await?;
            Ok(())
        }

        async fn local_storage(&self, key: &str) -> E2eResult<Option<String>> {
            self.eval_json(format!(
                "JSON.stringify(window.localStorage.getItem({}))",
                js_string(key)
            ))
            .await
        }

        async fn screenshot(&self) -> E2eResult<Vec<u8>> {
            let params = ScreenshotParams::builder()
                .format(CaptureScreenshotFormat::Png)
                .full_page(true)
                .build();
            self.page
                .screenshot(params)
                .await
                .map_err(|e| E2eError::Screenshot {
                    message: e.to_string(),
                })
        }

        fn network(&self) -> SharedTracker {
            self.network.clone()
        }

        async fn close(&self) -> E2eResult<()> {
            let Some(mut browser) = self.browser.lock().await.take() else {
                return Ok(());
            };
            let closed = browser.close().await;
            if let Err(e) = browser.wait().await {
                warn!(error = %e, "chromium did not exit cleanly");
            }
            for task in self
                .tasks
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner)
                .drain(..)
            {
                task.abort();
            }
            closed.map_err(page_error)?;
            debug!("chromium session closed");
            Ok(())
        }
    }

    /// Starts one isolated Chromium per session
    #[derive(Debug, Clone, Default)]
    pub struct ChromiumLauncher {
        overrides: Option<BrowserConfig>,
    }

    impl ChromiumLauncher {
        /// Launcher deriving its browser settings from the suite configuration
        #[must_use]
        pub fn new() -> Self {
            Self::default()
        }

        /// Launcher with explicit browser settings
        #[must_use]
        pub const fn with_browser_config(config: BrowserConfig) -> Self {
            Self {
                overrides: Some(config),
            }
        }
    }

    #[async_trait]
    impl SessionLauncher for ChromiumLauncher {
        async fn launch(&self, config: &Config) -> E2eResult<Arc<dyn Driver>> {
            let browser_config = self
                .overrides
                .clone()
                .unwrap_or_else(|| BrowserConfig::from_config(config));
            let driver = ChromiumDriver::launch(&browser_config).await?;
            Ok(Arc::new(driver))
        }
    }
}

#[cfg(feature = "browser")]
pub use cdp::{ChromiumDriver, ChromiumLauncher};
