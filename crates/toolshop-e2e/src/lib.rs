//! toolshop-e2e: end-to-end suite for the Practice Software Testing toolshop
//!
//! Browser tests drive the shop UI through page objects; backend calls set up
//! preconditions (accounts, tokens, cart contents) without clicking through
//! the UI.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │  tests/api.rs, tests/ui.rs                                   │
//! │        │                                                     │
//! │        ▼                                                     │
//! │  Harness ──► TestContext ──► page objects ──► BasePage       │
//! │     │            │                               │           │
//! │     │            ▼                               ▼           │
//! │     │        ApiClient (reqwest)        Driver (CDP / mock)  │
//! │     ▼                                                        │
//! │  Reporter (results.jsonl, screenshots)                       │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! Configuration is resolved once per process from defaults, the
//! environment (and a `.env` file) and explicit overrides, then shared
//! read-only.

#![warn(missing_docs)]
#![cfg_attr(test, allow(clippy::large_stack_arrays, clippy::large_stack_frames))]

/// REST client for preconditions
pub mod api;

/// Browser launch settings and the Chromium driver
pub mod browser;

/// Layered configuration snapshot
pub mod config;

/// Random test users
pub mod data;

/// Browser automation seam and its in-memory double
pub mod driver;

/// Fixtures, test cases and the runner
pub mod fixture;

/// Subscriber setup for `tracing`
pub mod logging;

/// Element locators and the shared field table
pub mod locator;

/// Request tracking for network idle and request waits
pub mod network;

/// Page objects
pub mod page;

/// JSON-lines run report and failure screenshots
pub mod reporter;

mod result;

/// Bounded condition waits
pub mod wait;

pub use api::ApiClient;
pub use browser::BrowserConfig;
#[cfg(feature = "browser")]
pub use browser::{ChromiumDriver, ChromiumLauncher};
pub use config::{Config, ConfigOverrides};
pub use data::{Address, User};
pub use driver::{Driver, ElementState, MockDriver, MockElement, MockLauncher};
pub use fixture::{
    Fixture, FixtureStack, FixtureState, Harness, RunOutcome, SessionFixture, SessionLauncher,
    TestCase, TestContext, TestTag, AUTH_TOKEN_KEY,
};
pub use locator::{Field, Locator, Selector};
pub use network::{
    CapturedRequest, HttpMethod, NetworkTracker, RequestMark, SharedTracker, UrlPattern,
};
pub use page::{
    BasePage, BillingAddress, CheckoutPage, HomePage, LoginPage, PageObject, PaymentMethod,
    ProductPage,
};
pub use reporter::{Reporter, RunSummary, TestResultEntry, TestStatus};
pub use result::{ensure_eq, E2eError, E2eResult};
pub use wait::{Timeouts, WaitOptions};

/// Prelude for test files
pub mod prelude {
    pub use super::{
        ensure_eq, ApiClient, BillingAddress, Config, E2eError, E2eResult, Field, Harness,
        Locator, PageObject, PaymentMethod, TestCase, TestContext, User,
    };
}
