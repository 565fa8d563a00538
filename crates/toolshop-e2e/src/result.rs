//! Result and error types for the toolshop suite.

use thiserror::Error;

/// Result type for suite operations
pub type E2eResult<T> = Result<T, E2eError>;

/// Errors that can occur while driving the toolshop
#[derive(Debug, Error)]
pub enum E2eError {
    /// An API precondition call did not succeed
    #[error("Setup failed during {operation}: HTTP {status}: {body}")]
    SetupFailure {
        /// Setup operation (`register`, `login`, `add_to_cart`)
        operation: String,
        /// HTTP status returned by the backend
        status: u16,
        /// Response body, or a note on what was missing from it
        body: String,
    },

    /// A UI wait exceeded its bound
    #[error("Timed out after {timeout_ms}ms waiting for {waited_for}")]
    ElementTimeout {
        /// What was being waited for
        waited_for: String,
        /// Timeout in milliseconds
        timeout_ms: u64,
    },

    /// An explicit expectation about UI or API state did not hold
    #[error("Assertion failed: {message} (expected {expected}, got {actual})")]
    AssertionFailure {
        /// What was being asserted
        message: String,
        /// Expected value
        expected: String,
        /// Actual value
        actual: String,
    },

    /// Browser launch error
    #[error("Failed to launch browser: {message}")]
    BrowserLaunch {
        /// Error message
        message: String,
    },

    /// Page error
    #[error("Page error: {message}")]
    Page {
        /// Error message
        message: String,
    },

    /// Navigation error
    #[error("Navigation to {url} failed: {message}")]
    Navigation {
        /// URL that failed
        url: String,
        /// Error message
        message: String,
    },

    /// Screenshot error
    #[error("Screenshot failed: {message}")]
    Screenshot {
        /// Error message
        message: String,
    },

    /// Invalid state error (operation called in wrong state)
    #[error("Invalid state: {message}")]
    InvalidState {
        /// Error message
        message: String,
    },

    /// Fixture error (setup/teardown failed)
    #[error("Fixture error: {message}")]
    Fixture {
        /// Error message
        message: String,
    },

    /// HTTP transport error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl E2eError {
    /// Build an assertion failure from anything displayable
    pub fn assertion(
        message: impl Into<String>,
        expected: impl std::fmt::Display,
        actual: impl std::fmt::Display,
    ) -> Self {
        Self::AssertionFailure {
            message: message.into(),
            expected: expected.to_string(),
            actual: actual.to_string(),
        }
    }

    /// Whether this failure came from a bounded UI wait
    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::ElementTimeout { .. })
    }

    /// Whether this failure came from an API precondition call
    #[must_use]
    pub const fn is_setup_failure(&self) -> bool {
        matches!(self, Self::SetupFailure { .. })
    }
}

/// Fail with an [`E2eError::AssertionFailure`] unless `expected == actual`.
pub fn ensure_eq<T>(message: &str, expected: T, actual: T) -> E2eResult<()>
where
    T: PartialEq + std::fmt::Debug,
{
    if expected == actual {
        Ok(())
    } else {
        Err(E2eError::assertion(
            message,
            format!("{expected:?}"),
            format!("{actual:?}"),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_setup_failure_display_carries_status_and_body() {
        let err = E2eError::SetupFailure {
            operation: "register".to_string(),
            status: 422,
            body: r#"{"email":["already exists"]}"#.to_string(),
        };
        let text = err.to_string();
        assert!(text.contains("register"));
        assert!(text.contains("422"));
        assert!(text.contains("already exists"));
        assert!(err.is_setup_failure());
        assert!(!err.is_timeout());
    }

    #[test]
    fn test_element_timeout_display() {
        let err = E2eError::ElementTimeout {
            waited_for: "visible [data-test='email']".to_string(),
            timeout_ms: 5000,
        };
        assert!(err.to_string().contains("5000ms"));
        assert!(err.is_timeout());
    }

    #[test]
    fn test_ensure_eq() {
        assert!(ensure_eq("cart quantity", "1", "1").is_ok());

        let err = ensure_eq("cart quantity", "1", "2").unwrap_err();
        match err {
            E2eError::AssertionFailure {
                expected, actual, ..
            } => {
                assert_eq!(expected, "\"1\"");
                assert_eq!(actual, "\"2\"");
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
