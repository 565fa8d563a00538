//! Bounded condition waits.
//!
//! Every wait in the suite is a poll loop with a ceiling: the condition is
//! checked, then re-checked every poll interval until it holds or the
//! ceiling elapses. There are no fixed sleeps.

use crate::result::{E2eError, E2eResult};
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;

/// Element visibility ceiling (10 seconds)
pub const ELEMENT_TIMEOUT_MS: u64 = 10_000;

/// Navigation and network idle ceiling (15 seconds)
pub const NAVIGATION_TIMEOUT_MS: u64 = 15_000;

/// Error message ceiling (5 seconds)
pub const ERROR_MESSAGE_TIMEOUT_MS: u64 = 5_000;

/// Success message ceiling (10 seconds)
pub const SUCCESS_MESSAGE_TIMEOUT_MS: u64 = 10_000;

/// Request observation ceiling (10 seconds)
pub const REQUEST_TIMEOUT_MS: u64 = 10_000;

/// Default polling interval (50ms)
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 50;

/// Network idle threshold (500ms without requests)
pub const NETWORK_IDLE_THRESHOLD_MS: u64 = 500;

/// Wait ceilings used by the page objects
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    /// Element visibility / actionability
    pub element_ms: u64,
    /// Navigation and network idle
    pub navigation_ms: u64,
    /// Error message after a rejected login
    pub error_message_ms: u64,
    /// Success message after checkout
    pub success_message_ms: u64,
    /// Observing a specific outgoing request
    pub request_ms: u64,
    /// Quiet window that counts as network idle
    pub network_idle_ms: u64,
    /// Polling interval for every wait
    pub poll_interval_ms: u64,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            element_ms: ELEMENT_TIMEOUT_MS,
            navigation_ms: NAVIGATION_TIMEOUT_MS,
            error_message_ms: ERROR_MESSAGE_TIMEOUT_MS,
            success_message_ms: SUCCESS_MESSAGE_TIMEOUT_MS,
            request_ms: REQUEST_TIMEOUT_MS,
            network_idle_ms: NETWORK_IDLE_THRESHOLD_MS,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
        }
    }
}

impl Timeouts {
    /// Options for an element wait
    #[must_use]
    pub const fn element(&self) -> WaitOptions {
        WaitOptions::new(self.element_ms).with_poll_interval(self.poll_interval_ms)
    }

    /// Options for a navigation or network idle wait
    #[must_use]
    pub const fn navigation(&self) -> WaitOptions {
        WaitOptions::new(self.navigation_ms).with_poll_interval(self.poll_interval_ms)
    }

    /// Options with an explicit ceiling and the configured poll interval
    #[must_use]
    pub const fn custom(&self, timeout_ms: u64) -> WaitOptions {
        WaitOptions::new(timeout_ms).with_poll_interval(self.poll_interval_ms)
    }

    /// Quiet window as a duration
    #[must_use]
    pub const fn network_idle(&self) -> Duration {
        Duration::from_millis(self.network_idle_ms)
    }
}

/// Options for a single wait
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitOptions {
    /// Timeout in milliseconds
    pub timeout_ms: u64,
    /// Polling interval in milliseconds
    pub poll_interval_ms: u64,
}

impl Default for WaitOptions {
    fn default() -> Self {
        Self::new(ELEMENT_TIMEOUT_MS)
    }
}

impl WaitOptions {
    /// Create options with the given ceiling and the default poll interval
    #[must_use]
    pub const fn new(timeout_ms: u64) -> Self {
        Self {
            timeout_ms,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
        }
    }

    /// Set timeout in milliseconds
    #[must_use]
    pub const fn with_timeout(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    /// Set polling interval in milliseconds
    #[must_use]
    pub const fn with_poll_interval(mut self, poll_interval_ms: u64) -> Self {
        self.poll_interval_ms = poll_interval_ms;
        self
    }

    /// Get timeout as Duration
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Get poll interval as Duration
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

/// Result of a successful wait
#[derive(Debug, Clone)]
pub struct WaitResult<T> {
    /// Value produced by the satisfied condition
    pub value: T,
    /// Time spent waiting
    pub elapsed: Duration,
}

/// Poll `probe` until it yields `Some`, or fail with
/// [`E2eError::ElementTimeout`] once the ceiling elapses.
///
/// Errors returned by the probe abort the wait immediately.
pub async fn poll_until<T, F, Fut>(
    waited_for: &str,
    options: WaitOptions,
    mut probe: F,
) -> E2eResult<WaitResult<T>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = E2eResult<Option<T>>>,
{
    let start = Instant::now();
    let timeout = options.timeout();
    loop {
        if let Some(value) = probe().await? {
            return Ok(WaitResult {
                value,
                elapsed: start.elapsed(),
            });
        }
        if start.elapsed() >= timeout {
            return Err(E2eError::ElementTimeout {
                waited_for: waited_for.to_string(),
                timeout_ms: options.timeout_ms,
            });
        }
        tokio::time::sleep(options.poll_interval()).await;
    }
}

/// Poll a boolean condition until it holds
pub async fn wait_until<F, Fut>(
    waited_for: &str,
    options: WaitOptions,
    mut condition: F,
) -> E2eResult<Duration>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = E2eResult<bool>>,
{
    let result = poll_until(waited_for, options, || {
        let check = condition();
        async move {
            let holds = check.await?;
            Ok::<_, E2eError>(holds.then_some(()))
        }
    })
    .await?;
    Ok(result.elapsed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    mod options_tests {
        use super::*;

        #[test]
        fn test_default_timeouts() {
            let timeouts = Timeouts::default();
            assert_eq!(timeouts.element_ms, 10_000);
            assert_eq!(timeouts.navigation_ms, 15_000);
            assert_eq!(timeouts.error_message_ms, 5_000);
            assert_eq!(timeouts.success_message_ms, 10_000);
            assert_eq!(timeouts.request_ms, 10_000);
            assert_eq!(timeouts.network_idle(), Duration::from_millis(500));
        }

        #[test]
        fn test_options_builder() {
            let options = WaitOptions::new(1_000).with_poll_interval(10);
            assert_eq!(options.timeout(), Duration::from_secs(1));
            assert_eq!(options.poll_interval(), Duration::from_millis(10));
            assert_eq!(options.with_timeout(20).timeout_ms, 20);
        }

        #[test]
        fn test_timeouts_carry_poll_interval() {
            let timeouts = Timeouts {
                poll_interval_ms: 5,
                ..Timeouts::default()
            };
            assert_eq!(timeouts.element().poll_interval_ms, 5);
            assert_eq!(timeouts.custom(42).timeout_ms, 42);
        }
    }

    mod polling_tests {
        use super::*;

        #[tokio::test(start_paused = true)]
        async fn test_condition_met_after_several_polls() {
            let calls = AtomicUsize::new(0);
            let calls_ref = &calls;
            let elapsed = wait_until("third poll", WaitOptions::new(1_000), || async move {
                Ok(calls_ref.fetch_add(1, Ordering::SeqCst) >= 2)
            })
            .await
            .unwrap();

            assert_eq!(calls.load(Ordering::SeqCst), 3);
            assert!(elapsed >= Duration::from_millis(100));
            assert!(elapsed < Duration::from_millis(150));
        }

        #[tokio::test(start_paused = true)]
        async fn test_timeout_reports_what_was_awaited() {
            let err = wait_until("never", WaitOptions::new(200), || async { Ok(false) })
                .await
                .unwrap_err();

            match err {
                E2eError::ElementTimeout {
                    waited_for,
                    timeout_ms,
                } => {
                    assert_eq!(waited_for, "never");
                    assert_eq!(timeout_ms, 200);
                }
                other => panic!("unexpected error: {other}"),
            }
        }

        #[tokio::test(start_paused = true)]
        async fn test_probe_error_aborts_wait() {
            let calls = AtomicUsize::new(0);
            let calls_ref = &calls;
            let err = poll_until::<(), _, _>("broken", WaitOptions::new(10_000), || async move {
                calls_ref.fetch_add(1, Ordering::SeqCst);
                Err(E2eError::Page {
                    message: "detached".to_string(),
                })
            })
            .await
            .unwrap_err();

            assert!(matches!(err, E2eError::Page { .. }));
            assert_eq!(calls.load(Ordering::SeqCst), 1);
        }

        #[tokio::test(start_paused = true)]
        async fn test_poll_until_returns_value() {
            let result = poll_until("value", WaitOptions::new(100), || async {
                Ok(Some("ready".to_string()))
            })
            .await
            .unwrap();
            assert_eq!(result.value, "ready");
            assert_eq!(result.elapsed, Duration::ZERO);
        }
    }
}
