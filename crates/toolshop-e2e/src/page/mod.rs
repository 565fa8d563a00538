//! Page objects for the toolshop UI.
//!
//! Each page object is a bundle of locators plus domain actions built from
//! the [`BasePage`] primitives. Page objects hold no element handles; every
//! action resolves its locator against the live page.

mod base;
mod checkout;
mod home;
mod login;
mod product;

pub use base::BasePage;
pub use checkout::{
    Billing, BillingAddress, Cart, CheckoutPage, Complete, Payment, PaymentMethod, Review,
};
pub use home::HomePage;
pub use login::LoginPage;
pub use product::ProductPage;

/// A page or screen of the UI
pub trait PageObject {
    /// Path the page lives at (e.g., "/auth/login")
    fn url_pattern(&self) -> &str;

    /// Get the page name for logging/debugging
    fn page_name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    /// Whether `url` points at this page
    fn matches_url(&self, url: &str) -> bool {
        path_matches(self.url_pattern(), url)
    }
}

/// Path component of an absolute or relative URL, without query or fragment
#[must_use]
pub fn url_path(url: &str) -> &str {
    let without_scheme = url.split_once("://").map_or(url, |(_, rest)| rest);
    let path = if url.contains("://") {
        without_scheme
            .find('/')
            .map_or("/", |index| &without_scheme[index..])
    } else {
        without_scheme
    };
    let end = path.find(['?', '#']).unwrap_or(path.len());
    &path[..end]
}

/// `pattern` equals the URL's path or is a parent segment of it. `/` only
/// matches the root.
#[must_use]
pub fn path_matches(pattern: &str, url: &str) -> bool {
    let path = url_path(url);
    let pattern = pattern.trim_end_matches('/');
    let path = path.trim_end_matches('/');
    if pattern.is_empty() {
        return path.is_empty();
    }
    path == pattern
        || path
            .strip_prefix(pattern)
            .is_some_and(|rest| rest.starts_with('/'))
}
