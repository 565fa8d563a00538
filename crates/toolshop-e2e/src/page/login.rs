//! Login and registration screen.

use super::{BasePage, PageObject};
use crate::data::User;
use crate::locator::{Field, Locator};
use crate::result::E2eResult;
use tracing::info;

/// Login and registration page (`/auth/login`)
#[derive(Debug, Clone)]
pub struct LoginPage {
    base: BasePage,
    login_submit: Locator,
    register_link: Locator,
    register_submit: Locator,
    error: Locator,
}

impl LoginPage {
    /// Route of the login form
    pub const PATH: &'static str = "/auth/login";

    /// Login page over an open session
    #[must_use]
    pub fn new(base: BasePage) -> Self {
        Self {
            base,
            login_submit: Locator::test_id("login-submit"),
            register_link: Locator::test_id("register-link"),
            register_submit: Locator::test_id("register-submit"),
            error: Locator::new(".alert-danger, .help-block"),
        }
    }

    /// Shared primitives
    #[must_use]
    pub const fn base(&self) -> &BasePage {
        &self.base
    }

    /// Locator of the error message area
    #[must_use]
    pub const fn error_locator(&self) -> &Locator {
        &self.error
    }

    /// Open the login form
    pub async fn navigate_login(&self) -> E2eResult<()> {
        self.base.navigate(Self::PATH).await
    }

    /// Submit the login form and wait for the resulting traffic to settle
    pub async fn login(&self, email: &str, password: &str) -> E2eResult<()> {
        info!(email, "logging in through the UI");
        self.base.fill(&Field::Email.locator(), email).await?;
        self.base.fill(&Field::Password.locator(), password).await?;
        self.base.click(&self.login_submit).await?;
        self.base.wait_for_network_idle().await
    }

    /// Open the registration form, fill it from `user` and submit
    pub async fn register(&self, user: &User) -> E2eResult<()> {
        info!(email = %user.email, "registering through the UI");
        self.base.click(&self.register_link).await?;

        let address = &user.address;
        let values = [
            (Field::FirstName, user.first_name.as_str()),
            (Field::LastName, user.last_name.as_str()),
            (Field::DateOfBirth, user.date_of_birth.as_str()),
            (Field::Street, address.street.as_str()),
            (Field::PostalCode, address.postal_code.as_str()),
            (Field::City, address.city.as_str()),
            (Field::State, address.state.as_str()),
            (Field::Phone, user.phone.as_str()),
            (Field::Email, user.email.as_str()),
            (Field::Password, user.password.as_str()),
        ];
        for (field, value) in values {
            self.base.fill(&field.locator(), value).await?;
        }

        self.base.click(&self.register_submit).await?;
        self.base.wait_for_network_idle().await
    }

    /// Wait for an error message to become visible
    pub async fn wait_for_error(&self, timeout_ms: u64) -> E2eResult<()> {
        self.base.wait_visible_within(&self.error, timeout_ms).await
    }

    /// Whether the browser is still on the login route
    pub async fn is_on_login_path(&self) -> E2eResult<bool> {
        let url = self.base.current_url().await?;
        Ok(self.matches_url(&url))
    }
}

impl PageObject for LoginPage {
    fn url_pattern(&self) -> &str {
        Self::PATH
    }

    fn page_name(&self) -> &'static str {
        "LoginPage"
    }
}
