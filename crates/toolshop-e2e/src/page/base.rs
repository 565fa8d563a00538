//! Shared resolve-wait-act primitives.

use crate::config::Config;
use crate::driver::Driver;
use crate::locator::Locator;
use crate::network::{CapturedRequest, RequestMark};
use crate::result::{E2eError, E2eResult};
use crate::wait::{poll_until, wait_until, WaitOptions};
use std::sync::Arc;
use tracing::debug;

/// Base page: the driver session plus the configuration snapshot
#[derive(Debug, Clone)]
pub struct BasePage {
    driver: Arc<dyn Driver>,
    config: Arc<Config>,
}

impl BasePage {
    /// Wrap a live session
    pub fn new(driver: Arc<dyn Driver>, config: Arc<Config>) -> Self {
        Self { driver, config }
    }

    /// The underlying driver
    pub fn driver(&self) -> &Arc<dyn Driver> {
        &self.driver
    }

    /// The configuration snapshot
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Load `path` relative to the UI origin, then wait for network idle
    pub async fn navigate(&self, path: &str) -> E2eResult<()> {
        let url = self.config.ui_url(path);
        debug!(%url, "navigate");
        self.driver.goto(&url).await?;
        self.wait_for_network_idle().await
    }

    /// Wait until the first match is visible and enabled, then click it
    pub async fn click(&self, locator: &Locator) -> E2eResult<()> {
        let driver = &self.driver;
        let selector = locator.selector();
        wait_until(
            &format!("{locator} to be clickable"),
            self.config.timeouts.element(),
            || async move {
                Ok::<_, E2eError>(driver.element_state(selector).await?.is_actionable())
            },
        )
        .await?;
        driver.click(selector).await
    }

    /// Wait until visible, clear prior content, then type `text`
    pub async fn fill(&self, locator: &Locator, text: &str) -> E2eResult<()> {
        self.wait_visible(locator).await?;
        self.driver.clear(locator.selector()).await?;
        self.driver.type_text(locator.selector(), text).await
    }

    /// Wait until visible, then choose the option labelled `label`
    pub async fn select_option(&self, locator: &Locator, label: &str) -> E2eResult<()> {
        self.wait_visible(locator).await?;
        self.driver.select_option(locator.selector(), label).await
    }

    /// Wait until visible, then press `key` with the element focused
    pub async fn press(&self, locator: &Locator, key: &str) -> E2eResult<()> {
        self.wait_visible(locator).await?;
        self.driver.press(locator.selector(), key).await
    }

    /// Wait until visible, then assign `value` and notify listeners
    pub async fn set_value(&self, locator: &Locator, value: &str) -> E2eResult<()> {
        self.wait_visible(locator).await?;
        self.driver.set_value(locator.selector(), value).await
    }

    /// Wait for the first match to be visible within the element ceiling
    pub async fn wait_visible(&self, locator: &Locator) -> E2eResult<()> {
        self.wait_visible_within(locator, self.config.timeouts.element_ms)
            .await
    }

    /// Wait for the first match to be visible within `timeout_ms`
    pub async fn wait_visible_within(&self, locator: &Locator, timeout_ms: u64) -> E2eResult<()> {
        let driver = &self.driver;
        let selector = locator.selector();
        wait_until(
            &format!("{locator} to be visible"),
            self.config.timeouts.custom(timeout_ms),
            || async move { Ok::<_, E2eError>(driver.element_state(selector).await?.visible) },
        )
        .await?;
        Ok(())
    }

    /// Wait until the first match's text, trimmed, equals `expected`
    pub async fn wait_for_text(
        &self,
        locator: &Locator,
        expected: &str,
        timeout_ms: u64,
    ) -> E2eResult<()> {
        let driver = &self.driver;
        let selector = locator.selector();
        wait_until(
            &format!("{locator} to read {expected:?}"),
            self.config.timeouts.custom(timeout_ms),
            || async move {
                let text = driver.text(selector).await?;
                Ok::<_, E2eError>(text.is_some_and(|t| t.trim() == expected))
            },
        )
        .await?;
        Ok(())
    }

    /// Wait until nothing has been in flight for the idle threshold
    pub async fn wait_for_network_idle(&self) -> E2eResult<()> {
        let network = self.driver.network();
        let threshold = self.config.timeouts.network_idle();
        let network = &network;
        wait_until(
            "network idle",
            self.config.timeouts.navigation(),
            || async move { Ok::<_, E2eError>(network.lock().is_idle(threshold)) },
        )
        .await?;
        Ok(())
    }

    /// Current end of the request log; pass to [`Self::wait_for_request`]
    pub fn request_mark(&self) -> RequestMark {
        self.driver.network().lock().mark()
    }

    /// Wait for a request sent after `mark` whose URL satisfies `predicate`
    pub async fn wait_for_request<P>(
        &self,
        mark: RequestMark,
        predicate: P,
        timeout_ms: u64,
    ) -> E2eResult<CapturedRequest>
    where
        P: Fn(&str) -> bool,
    {
        let network = self.driver.network();
        let network = &network;
        let predicate = &predicate;
        let found = poll_until(
            "matching request",
            self.config.timeouts.custom(timeout_ms),
            || async move {
                Ok::<_, E2eError>(network.lock().find_since(mark, predicate).cloned())
            },
        )
        .await?;
        debug!(url = %found.value.url, "request observed");
        Ok(found.value)
    }

    /// Number of matches right now
    pub async fn count(&self, locator: &Locator) -> E2eResult<usize> {
        self.driver.count(locator.selector()).await
    }

    /// Rendered text of the first match
    pub async fn text(&self, locator: &Locator) -> E2eResult<Option<String>> {
        self.driver.text(locator.selector()).await
    }

    /// Input value of the first match
    pub async fn value(&self, locator: &Locator) -> E2eResult<Option<String>> {
        self.driver.value(locator.selector()).await
    }

    /// Whether the first match is visible right now
    pub async fn is_visible(&self, locator: &Locator) -> E2eResult<bool> {
        Ok(self.driver.element_state(locator.selector()).await?.visible)
    }

    /// Current page URL
    pub async fn current_url(&self) -> E2eResult<String> {
        self.driver.current_url().await
    }

    /// Wait for the first match, then read its text
    pub async fn required_text(&self, locator: &Locator) -> E2eResult<String> {
        self.wait_visible(locator).await?;
        self.text(locator).await?.ok_or_else(|| E2eError::Page {
            message: format!("{locator} disappeared before its text was read"),
        })
    }

    /// Options for a wait bounded by the element ceiling
    pub fn element_wait(&self) -> WaitOptions {
        self.config.timeouts.element()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::{MockDriver, MockElement};
    use crate::locator::Field;
    use crate::wait::Timeouts;

    fn base(driver: &MockDriver) -> BasePage {
        let config = Config::default().with_timeouts(Timeouts {
            element_ms: 1_000,
            navigation_ms: 2_000,
            ..Timeouts::default()
        });
        BasePage::new(Arc::new(driver.clone()), Arc::new(config))
    }

    mod navigation_tests {
        use super::*;

        #[tokio::test(start_paused = true)]
        async fn test_navigate_resolves_relative_path_and_waits_idle() {
            let driver = MockDriver::new();
            driver.on_goto("https://practicesoftwaretesting.com/auth/login", |state| {
                state.complete_request("https://api.practicesoftwaretesting.com/brands");
            });
            let page = base(&driver);
            page.navigate("/auth/login").await.unwrap();

            assert_eq!(
                page.current_url().await.unwrap(),
                "https://practicesoftwaretesting.com/auth/login"
            );
            assert!(driver.network().lock().is_idle(page.config().timeouts.network_idle()));
        }

        #[tokio::test(start_paused = true)]
        async fn test_navigate_times_out_on_endless_request() {
            let driver = MockDriver::new();
            driver.on_goto("https://practicesoftwaretesting.com/", |state| {
                state.start_request("https://api.practicesoftwaretesting.com/stream");
            });
            let err = base(&driver).navigate("/").await.unwrap_err();
            match err {
                E2eError::ElementTimeout { waited_for, timeout_ms } => {
                    assert_eq!(waited_for, "network idle");
                    assert_eq!(timeout_ms, 2_000);
                }
                other => panic!("unexpected error: {other}"),
            }
        }
    }

    mod action_tests {
        use super::*;

        #[tokio::test(start_paused = true)]
        async fn test_fill_replaces_prior_content() {
            let email = Field::Email.locator();
            let driver = MockDriver::new()
                .with_element(email.selector(), MockElement::new().value("stale@x"));
            let page = base(&driver);

            page.fill(&email, "fresh@example.com").await.unwrap();
            assert_eq!(
                page.value(&email).await.unwrap().as_deref(),
                Some("fresh@example.com")
            );
        }

        #[tokio::test(start_paused = true)]
        async fn test_click_waits_for_late_element() {
            let submit = Locator::test_id("login-submit");
            let driver = MockDriver::new()
                .with_element(submit.selector(), MockElement::new().appear_after(5));
            base(&driver).click(&submit).await.unwrap();
            assert!(driver.was_called("click:[data-test='login-submit']"));
        }

        #[tokio::test(start_paused = true)]
        async fn test_click_times_out_on_disabled_element() {
            let submit = Locator::test_id("login-submit");
            let driver =
                MockDriver::new().with_element(submit.selector(), MockElement::new().disabled());
            let err = base(&driver).click(&submit).await.unwrap_err();
            assert!(err.is_timeout());
            assert!(err.to_string().contains("login-submit"));
            assert!(!driver.was_called("click:"));
        }

        #[tokio::test(start_paused = true)]
        async fn test_fill_times_out_on_hidden_element() {
            let city = Field::City.locator();
            let driver =
                MockDriver::new().with_element(city.selector(), MockElement::new().hidden());
            let err = base(&driver).fill(&city, "Utrecht").await.unwrap_err();
            assert!(err.is_timeout());
            assert_eq!(driver.value_of(city.selector()).as_deref(), Some(""));
        }

        #[tokio::test(start_paused = true)]
        async fn test_wait_for_text() {
            let badge = Locator::test_id("cart-quantity");
            let driver =
                MockDriver::new().with_element(badge.selector(), MockElement::new().text(" 1 "));
            let page = base(&driver);
            page.wait_for_text(&badge, "1", 500).await.unwrap();
            assert!(page.wait_for_text(&badge, "2", 500).await.unwrap_err().is_timeout());
        }
    }

    mod request_tests {
        use super::*;

        #[tokio::test(start_paused = true)]
        async fn test_wait_for_request_only_sees_new_requests() {
            let driver = MockDriver::new();
            driver
                .state()
                .complete_request("https://api.test/products?by_category=old");
            let page = base(&driver);
            let mark = page.request_mark();

            let err = page
                .wait_for_request(mark, |url| url.contains("category"), 300)
                .await
                .unwrap_err();
            assert!(err.is_timeout());

            driver
                .state()
                .complete_request("https://api.test/products?by_category=new");
            let request = page
                .wait_for_request(mark, |url| url.contains("category"), 300)
                .await
                .unwrap();
            assert!(request.url.ends_with("=new"));
        }
    }
}
