//! Configuration provider.
//!
//! Settings are resolved once, in this order: explicit override, environment
//! value, built-in default. A `.env` file in the working directory is loaded
//! into the environment before the first resolution.
//!
//! | Setting | Environment | Default |
//! |---------|-------------|---------|
//! | UI origin | `BASE_UI_URL` | `https://practicesoftwaretesting.com` |
//! | API origin | `BASE_API_URL` | `https://api.practicesoftwaretesting.com` |
//! | default user | `TEST_USER_EMAIL` / `TEST_USER_PASSWORD` | demo customer |
//! | headless | `HEADLESS` | `true` |
//! | screenshots | `SCREENSHOT_DIR` | `screenshots` |
//! | report | `REPORT_DIR` | `test-results` |
//! | chromium binary | `CHROMIUM_PATH` | auto-detect |
//! | tag selection | `E2E_TAGS` | every tag |

use crate::fixture::TestTag;
use crate::wait::Timeouts;
use serde::Deserialize;
use std::path::PathBuf;
use std::sync::OnceLock;
use tracing::{debug, warn};

/// Default UI origin
pub const DEFAULT_BASE_UI_URL: &str = "https://practicesoftwaretesting.com";

/// Default API origin
pub const DEFAULT_BASE_API_URL: &str = "https://api.practicesoftwaretesting.com";

/// Default pre-seeded customer account
pub const DEFAULT_TEST_USER_EMAIL: &str = "customer@practicesoftwaretesting.com";

/// Password of the pre-seeded customer account
pub const DEFAULT_TEST_USER_PASSWORD: &str = "welcome01";

static GLOBAL: OnceLock<Config> = OnceLock::new();

/// Immutable settings snapshot shared by every component of a run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Origin the UI is served from
    pub base_ui_url: String,
    /// Origin of the REST backend
    pub base_api_url: String,
    /// Email of the pre-seeded customer
    pub test_user_email: String,
    /// Password of the pre-seeded customer
    pub test_user_password: String,
    /// Launch the browser without a window
    pub headless: bool,
    /// Where failure screenshots are written
    pub screenshot_dir: PathBuf,
    /// Where the run report is written
    pub report_dir: PathBuf,
    /// Chromium binary override (None = auto-detect)
    pub chromium_path: Option<String>,
    /// Tags selected for this run (None = every tag)
    pub tags: Option<Vec<TestTag>>,
    /// Wait ceilings
    pub timeouts: Timeouts,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_ui_url: DEFAULT_BASE_UI_URL.to_string(),
            base_api_url: DEFAULT_BASE_API_URL.to_string(),
            test_user_email: DEFAULT_TEST_USER_EMAIL.to_string(),
            test_user_password: DEFAULT_TEST_USER_PASSWORD.to_string(),
            headless: true,
            screenshot_dir: PathBuf::from("screenshots"),
            report_dir: PathBuf::from("test-results"),
            chromium_path: None,
            tags: None,
            timeouts: Timeouts::default(),
        }
    }
}

/// Explicit overrides; they win over the environment and the defaults
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    /// UI origin
    pub base_ui_url: Option<String>,
    /// API origin
    pub base_api_url: Option<String>,
    /// Default user email
    pub test_user_email: Option<String>,
    /// Default user password
    pub test_user_password: Option<String>,
    /// Headless flag
    pub headless: Option<bool>,
    /// Screenshot directory
    pub screenshot_dir: Option<PathBuf>,
    /// Report directory
    pub report_dir: Option<PathBuf>,
}

impl ConfigOverrides {
    /// Create an empty override set
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the UI origin
    #[must_use]
    pub fn base_ui_url(mut self, url: impl Into<String>) -> Self {
        self.base_ui_url = Some(url.into());
        self
    }

    /// Override the API origin
    #[must_use]
    pub fn base_api_url(mut self, url: impl Into<String>) -> Self {
        self.base_api_url = Some(url.into());
        self
    }

    /// Override the headless flag
    #[must_use]
    pub const fn headless(mut self, headless: bool) -> Self {
        self.headless = Some(headless);
        self
    }

    /// Override the screenshot directory
    #[must_use]
    pub fn screenshot_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.screenshot_dir = Some(dir.into());
        self
    }

    /// Override the report directory
    #[must_use]
    pub fn report_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.report_dir = Some(dir.into());
        self
    }
}

/// Flat view of the layered sources before typing
#[derive(Debug, Deserialize)]
struct RawSettings {
    base_ui_url: String,
    base_api_url: String,
    test_user_email: String,
    test_user_password: String,
    headless: String,
    screenshot_dir: String,
    report_dir: String,
    #[serde(default)]
    chromium_path: Option<String>,
    #[serde(default)]
    e2e_tags: Option<String>,
}

impl Config {
    /// Process-wide snapshot, resolved from the environment on first use
    pub fn global() -> &'static Self {
        GLOBAL.get_or_init(|| {
            dotenvy::dotenv().ok();
            Self::resolve(ConfigOverrides::default())
        })
    }

    /// Resolve from the process environment plus `overrides`
    #[must_use]
    pub fn resolve(overrides: ConfigOverrides) -> Self {
        Self::resolve_from(None, overrides)
    }

    /// Resolve from an explicit environment map instead of the process
    /// environment. `None` reads the process environment.
    #[must_use]
    pub fn resolve_from(
        env: Option<config::Map<String, String>>,
        overrides: ConfigOverrides,
    ) -> Self {
        match Self::layered(env, &overrides) {
            Ok(config) => {
                debug!(
                    ui = %config.base_ui_url,
                    api = %config.base_api_url,
                    headless = config.headless,
                    "configuration resolved"
                );
                config
            }
            Err(e) => {
                warn!(error = %e, "configuration sources unreadable, using defaults");
                Self::default().apply(&overrides)
            }
        }
    }

    fn layered(
        env: Option<config::Map<String, String>>,
        overrides: &ConfigOverrides,
    ) -> Result<Self, config::ConfigError> {
        let defaults = Self::default();
        let raw: RawSettings = config::Config::builder()
            .set_default("base_ui_url", defaults.base_ui_url.as_str())?
            .set_default("base_api_url", defaults.base_api_url.as_str())?
            .set_default("test_user_email", defaults.test_user_email.as_str())?
            .set_default("test_user_password", defaults.test_user_password.as_str())?
            .set_default("headless", "true")?
            .set_default("screenshot_dir", "screenshots")?
            .set_default("report_dir", "test-results")?
            .add_source(config::Environment::default().ignore_empty(true).source(env))
            .build()?
            .try_deserialize()?;

        let tags = raw.e2e_tags.as_deref().map(parse_tags);
        let config = Self {
            base_ui_url: raw.base_ui_url,
            base_api_url: raw.base_api_url,
            test_user_email: raw.test_user_email,
            test_user_password: raw.test_user_password,
            headless: parse_bool_like(&raw.headless),
            screenshot_dir: PathBuf::from(raw.screenshot_dir),
            report_dir: PathBuf::from(raw.report_dir),
            chromium_path: raw.chromium_path,
            tags,
            timeouts: defaults.timeouts,
        };
        Ok(config.apply(overrides))
    }

    fn apply(mut self, overrides: &ConfigOverrides) -> Self {
        if let Some(url) = &overrides.base_ui_url {
            self.base_ui_url.clone_from(url);
        }
        if let Some(url) = &overrides.base_api_url {
            self.base_api_url.clone_from(url);
        }
        if let Some(email) = &overrides.test_user_email {
            self.test_user_email.clone_from(email);
        }
        if let Some(password) = &overrides.test_user_password {
            self.test_user_password.clone_from(password);
        }
        if let Some(headless) = overrides.headless {
            self.headless = headless;
        }
        if let Some(dir) = &overrides.screenshot_dir {
            self.screenshot_dir.clone_from(dir);
        }
        if let Some(dir) = &overrides.report_dir {
            self.report_dir.clone_from(dir);
        }
        self
    }

    /// Replace the wait ceilings
    #[must_use]
    pub const fn with_timeouts(mut self, timeouts: Timeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    /// Absolute UI URL for a path relative to the configured origin
    #[must_use]
    pub fn ui_url(&self, path: &str) -> String {
        join_url(&self.base_ui_url, path)
    }

    /// Absolute API URL for a path relative to the configured origin
    #[must_use]
    pub fn api_url(&self, path: &str) -> String {
        join_url(&self.base_api_url, path)
    }

    /// Whether a test carrying `tag` belongs to this run
    #[must_use]
    pub fn selects(&self, tag: TestTag) -> bool {
        self.tags.as_ref().map_or(true, |tags| tags.contains(&tag))
    }
}

/// Join an origin and a relative path with exactly one slash between them
#[must_use]
pub fn join_url(origin: &str, path: &str) -> String {
    let origin = origin.trim_end_matches('/');
    let path = path.trim_start_matches('/');
    if path.is_empty() {
        format!("{origin}/")
    } else {
        format!("{origin}/{path}")
    }
}

/// `true`, `1`, `yes` and `on` (any case) are true; everything else is false
#[must_use]
pub fn parse_bool_like(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "true" | "1" | "yes" | "on"
    )
}

fn parse_tags(value: &str) -> Vec<TestTag> {
    value
        .split(',')
        .filter_map(|tag| {
            let tag = tag.trim();
            match tag.parse() {
                Ok(parsed) => Some(parsed),
                Err(()) => {
                    if !tag.is_empty() {
                        warn!(tag, "ignoring unknown test tag");
                    }
                    None
                }
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn env(pairs: &[(&str, &str)]) -> config::Map<String, String> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    mod resolution_tests {
        use super::*;

        #[test]
        fn test_defaults_when_environment_empty() {
            let config = Config::resolve_from(Some(env(&[])), ConfigOverrides::new());
            assert_eq!(config, Config::default());
            assert!(config.headless);
            assert!(config.tags.is_none());
        }

        #[test]
        fn test_environment_beats_default() {
            let config = Config::resolve_from(
                Some(env(&[
                    ("BASE_UI_URL", "http://localhost:4200"),
                    ("BASE_API_URL", "http://localhost:8091"),
                    ("HEADLESS", "false"),
                    ("TEST_USER_EMAIL", "admin@example.com"),
                ])),
                ConfigOverrides::new(),
            );
            assert_eq!(config.base_ui_url, "http://localhost:4200");
            assert_eq!(config.base_api_url, "http://localhost:8091");
            assert_eq!(config.test_user_email, "admin@example.com");
            assert_eq!(config.test_user_password, DEFAULT_TEST_USER_PASSWORD);
            assert!(!config.headless);
        }

        #[test]
        fn test_override_beats_environment() {
            let config = Config::resolve_from(
                Some(env(&[("BASE_UI_URL", "http://from-env"), ("HEADLESS", "true")])),
                ConfigOverrides::new()
                    .base_ui_url("http://from-override")
                    .headless(false),
            );
            assert_eq!(config.base_ui_url, "http://from-override");
            assert!(!config.headless);
        }

        #[test]
        fn test_empty_environment_value_falls_back() {
            let config =
                Config::resolve_from(Some(env(&[("BASE_API_URL", "")])), ConfigOverrides::new());
            assert_eq!(config.base_api_url, DEFAULT_BASE_API_URL);
        }

        #[test]
        fn test_optional_settings() {
            let config = Config::resolve_from(
                Some(env(&[
                    ("CHROMIUM_PATH", "/usr/bin/chromium"),
                    ("SCREENSHOT_DIR", "out/shots"),
                    ("E2E_TAGS", "api"),
                ])),
                ConfigOverrides::new(),
            );
            assert_eq!(config.chromium_path.as_deref(), Some("/usr/bin/chromium"));
            assert_eq!(config.screenshot_dir, PathBuf::from("out/shots"));
            assert_eq!(config.tags, Some(vec![TestTag::Api]));
        }
    }

    #[test]
    fn test_global_is_resolved_once() {
        let first = Config::global();
        assert!(std::ptr::eq(first, Config::global()));
        assert!(!first.base_ui_url.is_empty());
    }

    mod tag_selection_tests {
        use super::*;

        #[test]
        fn test_every_tag_selected_by_default() {
            let config = Config::default();
            assert!(config.selects(TestTag::Api));
            assert!(config.selects(TestTag::Ui));
        }

        #[test]
        fn test_tag_list_restricts_selection() {
            let config = Config::resolve_from(
                Some(env(&[("E2E_TAGS", " ui , bogus")])),
                ConfigOverrides::new(),
            );
            assert!(config.selects(TestTag::Ui));
            assert!(!config.selects(TestTag::Api));
        }
    }

    mod helper_tests {
        use super::*;

        #[test]
        fn test_parse_bool_like() {
            for truthy in ["true", "TRUE", " yes ", "1", "On"] {
                assert!(parse_bool_like(truthy), "{truthy}");
            }
            for falsy in ["false", "0", "no", "", "headless"] {
                assert!(!parse_bool_like(falsy), "{falsy}");
            }
        }

        #[test]
        fn test_join_url() {
            assert_eq!(
                join_url("https://shop.test/", "/auth/login"),
                "https://shop.test/auth/login"
            );
            assert_eq!(join_url("https://shop.test", "/"), "https://shop.test/");
            assert_eq!(join_url("https://shop.test", "cart"), "https://shop.test/cart");
        }

        #[test]
        fn test_ui_and_api_urls() {
            let config = Config::default();
            assert_eq!(
                config.api_url("/users/login"),
                "https://api.practicesoftwaretesting.com/users/login"
            );
            assert_eq!(
                config.ui_url("/checkout"),
                "https://practicesoftwaretesting.com/checkout"
            );
        }

        proptest! {
            #[test]
            fn prop_join_url_has_single_separator(
                origin in "https://[a-z]{1,10}\\.test/{0,3}",
                path in "/{0,3}[a-z]{1,8}(/[a-z]{1,8}){0,2}",
            ) {
                let joined = join_url(&origin, &path);
                let after_scheme = joined.trim_start_matches("https://");
                prop_assert!(!after_scheme.contains("//"));
                prop_assert!(joined.ends_with(path.trim_start_matches('/')));
            }
        }
    }
}
