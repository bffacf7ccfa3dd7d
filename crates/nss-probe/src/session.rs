//! Driver sessions over the application under test.
//!
//! A session owns one browser page context and exposes exactly the
//! operations the probes need: navigation, triggering the next random
//! strategy, reading DOM-exposed values by stable selectors, draining
//! captured console output, and closing. The [`StrategySession`] trait
//! keeps probe logic independent of the automation backend: [`CdpSession`]
//! drives a real Chromium over the DevTools protocol (feature `browser`),
//! [`ScriptedSession`] replays canned values for unit tests.

use crate::console::{ConsoleEntry, ConsoleSeverity};
use crate::deployment::Deployment;
use crate::result::{ProbeError, ProbeResult};
use async_trait::async_trait;
use std::time::Duration;

/// Stable element selectors the application under test must expose.
pub mod selectors {
    /// The "generate next strategy" control.
    pub const NEXT_BUTTON: &str = "#nextSeedButton";
    /// Textarea holding the full rendered strategy text.
    pub const RENDERED_STRATEGY: &str = "#renderedStrategy";
    /// Region listing validation errors of the current strategy.
    pub const VALIDATION_ERRORS: &str = "#validationErrors";
    /// Region reporting the JSON encode/decode round-trip outcome.
    pub const ROUNDTRIP_RESULT: &str = "#encodingDecodingResult";
    /// Field holding the generation seed of the current strategy.
    pub const SEED: &str = "#seed";
    /// Alert region carrying the restoration notification.
    pub const ALERT: &str = "[role=alert]";
    /// Link inside the alert region pointing at the issue tracker.
    pub const ALERT_LINK: &str = "[role=alert] a";
}

/// Browser session configuration.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Run the browser headless
    pub headless: bool,
    /// Viewport width
    pub viewport_width: u32,
    /// Viewport height
    pub viewport_height: u32,
    /// Upper bound on a single navigation; a hung page becomes an error
    /// instead of a stuck run
    pub navigation_timeout: Duration,
    /// Upper bound on waiting for an element to appear
    pub element_timeout: Duration,
    /// Path to the chromium binary (`None` = auto-detect)
    pub chromium_path: Option<String>,
    /// Sandbox mode (disable inside containers)
    pub sandbox: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            headless: true,
            viewport_width: 1280,
            viewport_height: 1024,
            navigation_timeout: Duration::from_secs(30),
            element_timeout: Duration::from_secs(5),
            chromium_path: None,
            sandbox: true,
        }
    }
}

impl SessionConfig {
    /// Create a config with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set headless mode.
    #[must_use]
    pub const fn headless(mut self, headless: bool) -> Self {
        self.headless = headless;
        self
    }

    /// Set viewport dimensions.
    #[must_use]
    pub const fn viewport(mut self, width: u32, height: u32) -> Self {
        self.viewport_width = width;
        self.viewport_height = height;
        self
    }

    /// Set the navigation timeout.
    #[must_use]
    pub const fn navigation_timeout(mut self, timeout: Duration) -> Self {
        self.navigation_timeout = timeout;
        self
    }

    /// Set the element timeout.
    #[must_use]
    pub const fn element_timeout(mut self, timeout: Duration) -> Self {
        self.element_timeout = timeout;
        self
    }

    /// Set the chromium binary path.
    #[must_use]
    pub fn chromium_path(mut self, path: impl Into<String>) -> Self {
        self.chromium_path = Some(path.into());
        self
    }

    /// Disable the sandbox (containers, CI).
    #[must_use]
    pub const fn no_sandbox(mut self) -> Self {
        self.sandbox = false;
        self
    }
}

/// One browser-automation connection to the application under test.
#[async_trait]
pub trait StrategySession: Send {
    /// Navigate to a deployment.
    async fn open(&mut self, deployment: &Deployment) -> ProbeResult<()>;

    /// Navigate to a deployment with a strategy hash in the URL fragment.
    ///
    /// The application decodes the fragment only while the document
    /// initializes, so implementations must pass through a blank page
    /// first; changing the fragment of an already-loaded document does not
    /// re-parse it.
    async fn open_with_hash(&mut self, deployment: &Deployment, hash: &str) -> ProbeResult<()>;

    /// Activate the "generate next strategy" control, replacing the
    /// application's current strategy and rendered output. Callers re-read
    /// rendered state afterwards.
    async fn next_strategy(&mut self) -> ProbeResult<()>;

    /// Full rendered strategy text.
    async fn rendered_strategy(&mut self) -> ProbeResult<String>;

    /// Content of the validation-errors region.
    async fn validation_errors(&mut self) -> ProbeResult<String>;

    /// Content of the JSON round-trip result region.
    async fn json_roundtrip_result(&mut self) -> ProbeResult<String>;

    /// Seed that generated the current strategy.
    async fn strategy_seed(&mut self) -> ProbeResult<String>;

    /// Restoration notification from the alert region. Fails with
    /// [`ProbeError::ElementNotFound`] before any restoration attempt.
    async fn restoration_notification(&mut self) -> ProbeResult<String>;

    /// Target of the error-reporting link inside the alert region.
    async fn error_reporting_url(&mut self) -> ProbeResult<String>;

    /// Drain console entries captured so far, keeping those at or above
    /// `min`. The captured sequence is finite and consumed by reading it.
    async fn console_entries(&mut self, min: ConsoleSeverity) -> ProbeResult<Vec<ConsoleEntry>>;

    /// Release the connection. Must be called on every exit path; calling
    /// it again is a no-op.
    async fn close(&mut self) -> ProbeResult<()>;
}

// ============================================================================
// Scripted implementation (unit-test seam, always compiled)
// ============================================================================

/// Session that replays scripted values and records every interaction.
///
/// Readers pop from per-selector queues; queues with a natural "healthy"
/// value fall back to it when empty, the rest report the element as
/// absent, mirroring a document that never rendered it.
#[derive(Debug, Default)]
pub struct ScriptedSession {
    /// Interaction history, in call order
    pub calls: Vec<String>,
    rendered: std::collections::VecDeque<String>,
    validation: std::collections::VecDeque<String>,
    roundtrip: std::collections::VecDeque<String>,
    seeds: std::collections::VecDeque<String>,
    notifications: std::collections::VecDeque<String>,
    report_urls: std::collections::VecDeque<String>,
    console: Vec<ConsoleEntry>,
    closed: bool,
}

impl ScriptedSession {
    /// Create an empty scripted session.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a rendered strategy text.
    pub fn push_rendered(&mut self, text: impl Into<String>) {
        self.rendered.push_back(text.into());
    }

    /// Queue a validation-errors value (default when exhausted: `"[]"`).
    pub fn push_validation(&mut self, text: impl Into<String>) {
        self.validation.push_back(text.into());
    }

    /// Queue a round-trip result value (default when exhausted: `"Ok"`).
    pub fn push_roundtrip(&mut self, text: impl Into<String>) {
        self.roundtrip.push_back(text.into());
    }

    /// Queue a generation seed (default when exhausted: `"0"`).
    pub fn push_seed(&mut self, text: impl Into<String>) {
        self.seeds.push_back(text.into());
    }

    /// Queue a restoration notification.
    pub fn push_notification(&mut self, text: impl Into<String>) {
        self.notifications.push_back(text.into());
    }

    /// Queue an error-reporting link target.
    pub fn push_report_url(&mut self, url: impl Into<String>) {
        self.report_urls.push_back(url.into());
    }

    /// Add a captured console entry.
    pub fn push_console(&mut self, entry: ConsoleEntry) {
        self.console.push(entry);
    }

    /// Whether [`StrategySession::close`] has been called.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Number of times a recorded call starts with `prefix`.
    #[must_use]
    pub fn count_calls(&self, prefix: &str) -> usize {
        self.calls.iter().filter(|c| c.starts_with(prefix)).count()
    }

    fn pop(
        queue: &mut std::collections::VecDeque<String>,
        fallback: Option<&str>,
        selector: &str,
    ) -> ProbeResult<String> {
        queue
            .pop_front()
            .or_else(|| fallback.map(String::from))
            .ok_or_else(|| ProbeError::ElementNotFound {
                selector: selector.to_string(),
            })
    }
}

#[async_trait]
impl StrategySession for ScriptedSession {
    async fn open(&mut self, deployment: &Deployment) -> ProbeResult<()> {
        self.calls.push(format!("navigate:{}", deployment.uri()));
        Ok(())
    }

    async fn open_with_hash(&mut self, deployment: &Deployment, hash: &str) -> ProbeResult<()> {
        // Mirrors the blank-page-first ordering required of real sessions
        // so tests can assert it.
        self.calls.push("navigate:about:blank".to_string());
        self.calls
            .push(format!("navigate:{}", deployment.uri_with_hash(hash)));
        Ok(())
    }

    async fn next_strategy(&mut self) -> ProbeResult<()> {
        self.calls.push("next".to_string());
        Ok(())
    }

    async fn rendered_strategy(&mut self) -> ProbeResult<String> {
        self.calls.push("read:rendered".to_string());
        Self::pop(&mut self.rendered, None, selectors::RENDERED_STRATEGY)
    }

    async fn validation_errors(&mut self) -> ProbeResult<String> {
        self.calls.push("read:validation".to_string());
        Self::pop(&mut self.validation, Some("[]"), selectors::VALIDATION_ERRORS)
    }

    async fn json_roundtrip_result(&mut self) -> ProbeResult<String> {
        self.calls.push("read:roundtrip".to_string());
        Self::pop(&mut self.roundtrip, Some("Ok"), selectors::ROUNDTRIP_RESULT)
    }

    async fn strategy_seed(&mut self) -> ProbeResult<String> {
        self.calls.push("read:seed".to_string());
        Self::pop(&mut self.seeds, Some("0"), selectors::SEED)
    }

    async fn restoration_notification(&mut self) -> ProbeResult<String> {
        self.calls.push("read:notification".to_string());
        Self::pop(&mut self.notifications, None, selectors::ALERT)
    }

    async fn error_reporting_url(&mut self) -> ProbeResult<String> {
        self.calls.push("read:report-url".to_string());
        Self::pop(&mut self.report_urls, None, selectors::ALERT_LINK)
    }

    async fn console_entries(&mut self, min: ConsoleSeverity) -> ProbeResult<Vec<ConsoleEntry>> {
        self.calls.push("console".to_string());
        let drained = std::mem::take(&mut self.console);
        Ok(crate::console::at_or_above(drained, min))
    }

    async fn close(&mut self) -> ProbeResult<()> {
        self.calls.push("close".to_string());
        self.closed = true;
        Ok(())
    }
}

// ============================================================================
// CDP implementation (feature `browser`)
// ============================================================================

#[cfg(feature = "browser")]
mod cdp {
    use super::{selectors, SessionConfig, StrategySession};
    use crate::console::{self, ConsoleEntry, ConsoleSeverity};
    use crate::deployment::Deployment;
    use crate::result::{ProbeError, ProbeResult};
    use async_trait::async_trait;
    use chromiumoxide::browser::{Browser, BrowserConfig};
    use chromiumoxide::page::Page;
    use futures::StreamExt;
    use std::time::Duration;
    use tracing::{debug, warn};

    const POLL_INTERVAL: Duration = Duration::from_millis(100);

    /// Session driving a real Chromium instance over the DevTools protocol.
    #[derive(Debug)]
    pub struct CdpSession {
        config: SessionConfig,
        browser: Browser,
        page: Page,
        handler: tokio::task::JoinHandle<()>,
        closed: bool,
    }

    impl CdpSession {
        /// Launch a browser and open one page on `about:blank`.
        ///
        /// # Errors
        ///
        /// Returns [`ProbeError::BrowserLaunch`] when the browser cannot be
        /// started or the initial page cannot be created.
        pub async fn launch(config: SessionConfig) -> ProbeResult<Self> {
            let mut builder = BrowserConfig::builder()
                .window_size(config.viewport_width, config.viewport_height)
                .request_timeout(config.navigation_timeout);

            if !config.headless {
                builder = builder.with_head();
            }
            if !config.sandbox {
                builder = builder.no_sandbox();
            }
            if let Some(path) = &config.chromium_path {
                builder = builder.chrome_executable(path);
            }

            let browser_config = builder.build().map_err(|e| ProbeError::BrowserLaunch {
                message: e.to_string(),
            })?;

            let (browser, mut handler) =
                Browser::launch(browser_config)
                    .await
                    .map_err(|e| ProbeError::BrowserLaunch {
                        message: e.to_string(),
                    })?;

            let handler = tokio::spawn(async move {
                while let Some(event) = handler.next().await {
                    if event.is_err() {
                        break;
                    }
                }
            });

            let page =
                browser
                    .new_page("about:blank")
                    .await
                    .map_err(|e| ProbeError::BrowserLaunch {
                        message: e.to_string(),
                    })?;

            Ok(Self {
                config,
                browser,
                page,
                handler,
                closed: false,
            })
        }

        async fn navigate(&self, url: &str) -> ProbeResult<()> {
            debug!(url, "navigating");
            let timeout = self.config.navigation_timeout;
            tokio::time::timeout(timeout, async {
                self.page
                    .goto(url)
                    .await
                    .map_err(|e| ProbeError::Navigation {
                        url: url.to_string(),
                        message: e.to_string(),
                    })?;
                self.page
                    .wait_for_navigation()
                    .await
                    .map_err(|e| ProbeError::Navigation {
                        url: url.to_string(),
                        message: e.to_string(),
                    })?;
                Ok(())
            })
            .await
            .map_err(|_| ProbeError::Timeout {
                ms: timeout.as_millis() as u64,
            })?
        }

        /// Console capture hooks into the freshly initialized document, so
        /// it must be re-armed after every navigation.
        async fn arm_console_capture(&self) -> ProbeResult<()> {
            self.eval::<bool>(console::CAPTURE_JS).await?;
            Ok(())
        }

        async fn eval<T: serde::de::DeserializeOwned>(&self, js: &str) -> ProbeResult<T> {
            self.page
                .evaluate(js)
                .await
                .map_err(|e| ProbeError::Evaluation {
                    message: e.to_string(),
                })?
                .into_value()
                .map_err(|e| ProbeError::Evaluation {
                    message: e.to_string(),
                })
        }

        /// Evaluate `js` until it yields a non-null string, polling up to
        /// the element timeout, then report the element as absent.
        async fn read_string(&self, js: &str, selector: &str) -> ProbeResult<String> {
            let deadline = tokio::time::Instant::now() + self.config.element_timeout;
            loop {
                if let Some(value) = self.eval::<Option<String>>(js).await? {
                    return Ok(value);
                }
                if tokio::time::Instant::now() >= deadline {
                    return Err(ProbeError::ElementNotFound {
                        selector: selector.to_string(),
                    });
                }
                tokio::time::sleep(POLL_INTERVAL).await;
            }
        }

        fn value_js(selector: &str) -> String {
            format!(
                "(() => {{ const el = document.querySelector('{selector}'); return el ? el.value : null; }})()"
            )
        }

        fn text_js(selector: &str) -> String {
            format!(
                "(() => {{ const el = document.querySelector('{selector}'); return el ? el.textContent.trim() : null; }})()"
            )
        }

        fn href_js(selector: &str) -> String {
            format!(
                "(() => {{ const el = document.querySelector('{selector}'); return el ? el.href : null; }})()"
            )
        }
    }

    #[async_trait]
    impl StrategySession for CdpSession {
        async fn open(&mut self, deployment: &Deployment) -> ProbeResult<()> {
            self.navigate(deployment.uri()).await?;
            self.arm_console_capture().await
        }

        async fn open_with_hash(&mut self, deployment: &Deployment, hash: &str) -> ProbeResult<()> {
            // The fragment is only decoded while the document initializes;
            // going through a blank page forces re-initialization even when
            // the base URI is already loaded.
            self.navigate("about:blank").await?;
            self.navigate(&deployment.uri_with_hash(hash)).await?;
            self.arm_console_capture().await
        }

        async fn next_strategy(&mut self) -> ProbeResult<()> {
            let deadline = tokio::time::Instant::now() + self.config.element_timeout;
            let element = loop {
                match self.page.find_element(selectors::NEXT_BUTTON).await {
                    Ok(element) => break element,
                    Err(_) if tokio::time::Instant::now() < deadline => {
                        tokio::time::sleep(POLL_INTERVAL).await;
                    }
                    Err(_) => {
                        return Err(ProbeError::ElementNotFound {
                            selector: selectors::NEXT_BUTTON.to_string(),
                        })
                    }
                }
            };
            element.click().await.map_err(|e| ProbeError::Evaluation {
                message: format!("clicking {}: {e}", selectors::NEXT_BUTTON),
            })?;
            Ok(())
        }

        async fn rendered_strategy(&mut self) -> ProbeResult<String> {
            self.read_string(
                &Self::value_js(selectors::RENDERED_STRATEGY),
                selectors::RENDERED_STRATEGY,
            )
            .await
        }

        async fn validation_errors(&mut self) -> ProbeResult<String> {
            self.read_string(
                &Self::text_js(selectors::VALIDATION_ERRORS),
                selectors::VALIDATION_ERRORS,
            )
            .await
        }

        async fn json_roundtrip_result(&mut self) -> ProbeResult<String> {
            self.read_string(
                &Self::text_js(selectors::ROUNDTRIP_RESULT),
                selectors::ROUNDTRIP_RESULT,
            )
            .await
        }

        async fn strategy_seed(&mut self) -> ProbeResult<String> {
            self.read_string(&Self::value_js(selectors::SEED), selectors::SEED)
                .await
        }

        async fn restoration_notification(&mut self) -> ProbeResult<String> {
            self.read_string(&Self::text_js(selectors::ALERT), selectors::ALERT)
                .await
        }

        async fn error_reporting_url(&mut self) -> ProbeResult<String> {
            self.read_string(&Self::href_js(selectors::ALERT_LINK), selectors::ALERT_LINK)
                .await
        }

        async fn console_entries(
            &mut self,
            min: ConsoleSeverity,
        ) -> ProbeResult<Vec<ConsoleEntry>> {
            let json: String = self.eval(console::COLLECT_JS).await?;
            let entries = console::parse_entries(&json)?;
            Ok(console::at_or_above(entries, min))
        }

        async fn close(&mut self) -> ProbeResult<()> {
            if self.closed {
                return Ok(());
            }
            self.closed = true;
            if let Err(e) = self.browser.close().await {
                warn!("browser did not close cleanly: {e}");
            } else if let Err(e) = self.browser.wait().await {
                warn!("browser did not exit cleanly: {e}");
            }
            self.handler.abort();
            Ok(())
        }
    }

    impl Drop for CdpSession {
        fn drop(&mut self) {
            if !self.closed {
                // Close could not be awaited here; stop the event pump and
                // let the browser handle terminate its child process.
                self.handler.abort();
                warn!("session dropped without close()");
            }
        }
    }
}

#[cfg(feature = "browser")]
pub use cdp::CdpSession;
