//! Fixtures and the test runner.
//!
//! A [`Harness`] runs one [`TestCase`] at a time. Setup acquires what the
//! case needs (API client, random user, authenticated browser session),
//! pushing every acquired resource on a [`FixtureStack`]. The body then runs
//! against a [`TestContext`]. Whatever happens, the stack is torn down in
//! reverse order, the result is recorded, and the original failure (error
//! or panic) is handed back to the caller.
//!
//! Accounts created during setup are never deleted.

use crate::api::ApiClient;
use crate::config::Config;
use crate::data::User;
use crate::driver::Driver;
use crate::page::{BasePage, CheckoutPage, HomePage, LoginPage, ProductPage};
use crate::reporter::{Reporter, TestResultEntry};
use crate::result::{E2eError, E2eResult};
use async_trait::async_trait;
use futures::future::BoxFuture;
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Local storage key the UI reads its bearer token from
pub const AUTH_TOKEN_KEY: &str = "auth-token";

/// Suite a test belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TestTag {
    /// Backend-only test
    Api,
    /// Browser test
    Ui,
}

impl TestTag {
    /// Lowercase tag name
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Api => "api",
            Self::Ui => "ui",
        }
    }
}

impl fmt::Display for TestTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TestTag {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "api" => Ok(Self::Api),
            "ui" => Ok(Self::Ui),
            _ => Err(()),
        }
    }
}

/// A resource acquired during setup and released after the test
#[async_trait]
pub trait Fixture: Send + Sync + fmt::Debug {
    /// Get the fixture name for logging/debugging
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    /// Release the resource
    async fn teardown(&mut self) -> E2eResult<()>;
}

/// State of a fixture on the stack
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FixtureState {
    /// Acquired, not yet released
    SetUp,
    /// Released
    TornDown,
    /// Teardown failed
    Failed,
}

#[derive(Debug)]
struct FixtureEntry {
    fixture: Box<dyn Fixture>,
    state: FixtureState,
}

/// Acquired fixtures, released last-in first-out
#[derive(Debug, Default)]
pub struct FixtureStack {
    entries: Vec<FixtureEntry>,
}

impl FixtureStack {
    /// Empty stack
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an acquired fixture
    pub fn push(&mut self, fixture: impl Fixture + 'static) {
        debug!(fixture = fixture.name(), "fixture set up");
        self.entries.push(FixtureEntry {
            fixture: Box::new(fixture),
            state: FixtureState::SetUp,
        });
    }

    /// Number of fixtures on the stack
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing was acquired
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Fixture names and states, in acquisition order
    #[must_use]
    pub fn states(&self) -> Vec<(String, FixtureState)> {
        self.entries
            .iter()
            .map(|e| (e.fixture.name().to_string(), e.state))
            .collect()
    }

    /// Tear every live fixture down in reverse acquisition order.
    ///
    /// A failing teardown does not stop the others; the first failure is
    /// returned once all have run.
    pub async fn teardown_all(&mut self) -> E2eResult<()> {
        let mut first_error = None;
        for entry in self.entries.iter_mut().rev() {
            if entry.state != FixtureState::SetUp {
                continue;
            }
            let name = entry.fixture.name().to_string();
            match entry.fixture.teardown().await {
                Ok(()) => {
                    entry.state = FixtureState::TornDown;
                    debug!(fixture = %name, "fixture torn down");
                }
                Err(e) => {
                    entry.state = FixtureState::Failed;
                    warn!(fixture = %name, error = %e, "fixture teardown failed");
                    first_error.get_or_insert(E2eError::Fixture {
                        message: format!("{name}: {e}"),
                    });
                }
            }
        }
        first_error.map_or(Ok(()), Err)
    }
}

/// An open browser session; teardown closes it
#[derive(Debug)]
pub struct SessionFixture {
    driver: Arc<dyn Driver>,
}

impl SessionFixture {
    /// Wrap a launched session
    #[must_use]
    pub fn new(driver: Arc<dyn Driver>) -> Self {
        Self { driver }
    }
}

#[async_trait]
impl Fixture for SessionFixture {
    fn name(&self) -> &'static str {
        "browser-session"
    }

    async fn teardown(&mut self) -> E2eResult<()> {
        self.driver.close().await
    }
}

/// Starts one isolated browser session per test
#[async_trait]
pub trait SessionLauncher: Send + Sync + fmt::Debug {
    /// Launch a fresh session
    async fn launch(&self, config: &Config) -> E2eResult<Arc<dyn Driver>>;
}

/// What a test needs before its body runs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestCase {
    name: String,
    tag: TestTag,
    authenticated: bool,
}

impl TestCase {
    /// Backend-only test
    pub fn api(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            tag: TestTag::Api,
            authenticated: false,
        }
    }

    /// Browser test
    pub fn ui(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            tag: TestTag::Ui,
            authenticated: false,
        }
    }

    /// Register and log in a fresh user first; browser tests also get the
    /// token injected into the session
    #[must_use]
    pub fn authenticated(mut self) -> Self {
        self.authenticated = true;
        self
    }

    /// Test name
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Test tag
    #[must_use]
    pub const fn tag(&self) -> TestTag {
        self.tag
    }

    /// Whether setup logs a user in
    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        self.authenticated
    }
}

/// Everything a test body can reach
#[derive(Debug)]
pub struct TestContext {
    config: Arc<Config>,
    api: ApiClient,
    user: User,
    token: Option<String>,
    driver: Option<Arc<dyn Driver>>,
}

impl TestContext {
    fn new(config: Arc<Config>) -> Self {
        Self {
            api: ApiClient::from_config(&config),
            user: User::random(),
            token: None,
            driver: None,
            config,
        }
    }

    /// Configuration snapshot
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// API client; carries the token for authenticated cases
    #[must_use]
    pub const fn api(&self) -> &ApiClient {
        &self.api
    }

    /// Mutable API client
    pub fn api_mut(&mut self) -> &mut ApiClient {
        &mut self.api
    }

    /// Fresh user generated for this test; registered only for
    /// authenticated cases
    #[must_use]
    pub const fn random_user(&self) -> &User {
        &self.user
    }

    /// Token obtained during setup
    #[must_use]
    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    /// Browser session; only UI cases have one
    pub fn driver(&self) -> E2eResult<&Arc<dyn Driver>> {
        self.driver.as_ref().ok_or_else(|| E2eError::InvalidState {
            message: "this test has no browser session; use TestCase::ui".to_string(),
        })
    }

    /// Base primitives over the session
    pub fn base_page(&self) -> E2eResult<BasePage> {
        Ok(BasePage::new(
            Arc::clone(self.driver()?),
            Arc::clone(&self.config),
        ))
    }

    /// Home page over the session
    pub fn home_page(&self) -> E2eResult<HomePage> {
        self.base_page().map(HomePage::new)
    }

    /// Login page over the session
    pub fn login_page(&self) -> E2eResult<LoginPage> {
        self.base_page().map(LoginPage::new)
    }

    /// Product page over the session
    pub fn product_page(&self) -> E2eResult<ProductPage> {
        self.base_page().map(ProductPage::new)
    }

    /// Checkout flow over the session, at the cart step
    pub fn checkout_page(&self) -> E2eResult<CheckoutPage> {
        self.base_page().map(CheckoutPage::new)
    }
}

/// How a case ended when it did not fail
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// Body ran and succeeded
    Passed,
    /// Tag not selected for this run
    Skipped,
}

type BodyOutcome = Result<E2eResult<()>, Box<dyn Any + Send>>;

/// Runs test cases: setup, body, diagnostics, teardown, report
#[derive(Debug)]
pub struct Harness {
    config: Arc<Config>,
    launcher: Option<Arc<dyn SessionLauncher>>,
    reporter: Reporter,
}

impl Harness {
    /// Harness over `config`, reporting into its directories. UI cases
    /// need a launcher; see [`Self::with_launcher`].
    #[must_use]
    pub fn new(config: Config) -> Self {
        let reporter = Reporter::from_config(&config);
        Self {
            config: Arc::new(config),
            launcher: None,
            reporter,
        }
    }

    /// Harness over the process-wide configuration, with Chromium sessions
    /// when the `browser` feature is enabled
    #[must_use]
    pub fn from_env() -> Self {
        let harness = Self::new(Config::global().clone());
        #[cfg(feature = "browser")]
        let harness = harness.with_launcher(crate::browser::ChromiumLauncher::new());
        harness
    }

    /// Launch browser sessions with `launcher`
    #[must_use]
    pub fn with_launcher(mut self, launcher: impl SessionLauncher + 'static) -> Self {
        self.launcher = Some(Arc::new(launcher));
        self
    }

    /// Report through `reporter`
    #[must_use]
    pub fn with_reporter(mut self, reporter: Reporter) -> Self {
        self.reporter = reporter;
        self
    }

    /// Configuration snapshot
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The reporter
    #[must_use]
    pub const fn reporter(&self) -> &Reporter {
        &self.reporter
    }

    /// Run `body` for `case`.
    ///
    /// Returns the body's error, or the setup error that kept it from
    /// running. A panic in the body is resumed after teardown and
    /// reporting. A teardown failure only surfaces when nothing else failed.
    pub async fn run<F>(&self, case: TestCase, body: F) -> E2eResult<RunOutcome>
    where
        F: for<'a> FnOnce(&'a mut TestContext) -> BoxFuture<'a, E2eResult<()>>,
    {
        if !self.config.selects(case.tag) {
            info!(test = %case.name, tag = %case.tag, "skipped, tag not selected");
            self.record(TestResultEntry::skipped(&case.name, case.tag))
                .await;
            return Ok(RunOutcome::Skipped);
        }

        info!(test = %case.name, tag = %case.tag, "test started");
        let started = Instant::now();
        let mut fixtures = FixtureStack::new();
        let mut ctx = TestContext::new(Arc::clone(&self.config));

        let mut outcome: BodyOutcome = match self.set_up(&case, &mut ctx, &mut fixtures).await {
            Ok(()) => AssertUnwindSafe(body(&mut ctx)).catch_unwind().await,
            Err(e) => {
                warn!(test = %case.name, error = %e, "setup failed");
                Ok(Err(e))
            }
        };

        let mut attachments = Vec::new();
        if !matches!(outcome, Ok(Ok(()))) {
            if let Some(path) = self.capture_failure(&case.name, &ctx).await {
                attachments.push(path);
            }
        }

        if let Err(e) = fixtures.teardown_all().await {
            if matches!(outcome, Ok(Ok(()))) {
                outcome = Ok(Err(e));
            } else {
                warn!(test = %case.name, error = %e, "teardown failed after test failure");
            }
        }

        let duration = started.elapsed();
        let entry = match &outcome {
            Ok(Ok(())) => TestResultEntry::passed(&case.name, case.tag, duration),
            Ok(Err(e)) => TestResultEntry::failed(&case.name, case.tag, duration, e.to_string()),
            Err(panic) => TestResultEntry::failed(
                &case.name,
                case.tag,
                duration,
                format!("panicked: {}", panic_message(panic.as_ref())),
            ),
        };
        let entry = attachments
            .into_iter()
            .fold(entry, TestResultEntry::with_attachment);
        info!(
            test = %case.name,
            status = ?entry.status,
            duration_ms = entry.duration_ms,
            "test finished"
        );
        self.record(entry).await;

        match outcome {
            Ok(Ok(())) => Ok(RunOutcome::Passed),
            Ok(Err(e)) => Err(e),
            Err(panic) => std::panic::resume_unwind(panic),
        }
    }

    async fn set_up(
        &self,
        case: &TestCase,
        ctx: &mut TestContext,
        fixtures: &mut FixtureStack,
    ) -> E2eResult<()> {
        if case.authenticated {
            let user = ctx.user.clone();
            ctx.api.register(&user).await?;
            let token = ctx.api.login(&user.email, &user.password).await?;
            ctx.api.set_token(token.clone());
            ctx.token = Some(token);
        }

        if case.tag == TestTag::Ui {
            let launcher = self.launcher.as_ref().ok_or_else(|| E2eError::Fixture {
                message: "no session launcher configured for UI tests".to_string(),
            })?;
            let driver = launcher.launch(&self.config).await?;
            fixtures.push(SessionFixture::new(Arc::clone(&driver)));
            ctx.driver = Some(Arc::clone(&driver));

            if let Some(token) = &ctx.token {
                // storage is per-origin; the session needs one loaded first
                driver.goto(&self.config.ui_url("/")).await?;
                driver.set_local_storage(AUTH_TOKEN_KEY, token).await?;
                info!(test = %case.name, "session authenticated");
            }
        }
        Ok(())
    }

    async fn capture_failure(&self, test_name: &str, ctx: &TestContext) -> Option<PathBuf> {
        let driver = ctx.driver.as_ref()?;
        let png = match driver.screenshot().await {
            Ok(png) => png,
            Err(e) => {
                warn!(test = test_name, error = %e, "failure screenshot not captured");
                return None;
            }
        };
        match self.reporter.attach_screenshot(test_name, &png).await {
            Ok(path) => Some(path),
            Err(e) => {
                warn!(test = test_name, error = %e, "failure screenshot not saved");
                None
            }
        }
    }

    async fn record(&self, entry: TestResultEntry) {
        if let Err(e) = self.reporter.record(entry).await {
            warn!(error = %e, "report entry not written");
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "non-string panic payload".to_string())
}
