//! REST client for API-level test setup.
//!
//! UI tests use the backend directly to create and authenticate accounts,
//! then hand the resulting token to the browser.

mod client;

pub use client::{ApiClient, LoginRequest, DEFAULT_REQUEST_TIMEOUT};
