//! Locator abstraction for element selection.
//!
//! A [`Locator`] is declarative: it names a [`Selector`] and is resolved
//! against the live page on every use, never cached. Selectors render to
//! JavaScript query expressions for the CDP driver and to a stable string
//! form used in error messages and by the mock driver.
//!
//! Address and identity inputs are shared between the login/registration
//! form and the checkout billing form, so their selectors live in one table,
//! [`Field`].

use std::fmt;

/// Attribute every toolshop test hook uses
pub const TEST_ATTRIBUTE: &str = "data-test";

/// Selector type for locating elements
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Selector {
    /// CSS selector (e.g., "a[data-test^='product-']")
    Css(String),
    /// Innermost element whose text contains the given string
    Text(String),
    /// CSS selector filtered by contained text
    CssWithText {
        /// Base CSS selector
        css: String,
        /// Text content to match
        text: String,
    },
}

impl Selector {
    /// Create a CSS selector
    #[must_use]
    pub fn css(selector: impl Into<String>) -> Self {
        Self::Css(selector.into())
    }

    /// Create a `[data-test='...']` selector
    #[must_use]
    pub fn test_id(id: &str) -> Self {
        Self::Css(format!("[{TEST_ATTRIBUTE}='{id}']"))
    }

    /// Create a text selector
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(text.into())
    }

    /// CSS source when the selector is plain CSS
    #[must_use]
    pub fn as_css(&self) -> Option<&str> {
        match self {
            Self::Css(css) => Some(css),
            _ => None,
        }
    }

    /// JavaScript expression evaluating to an array of every match
    #[must_use]
    pub fn to_all_query(&self) -> String {
        match self {
            Self::Css(css) => format!("Array.from(document.querySelectorAll({css:?}))"),
            Self::Text(text) => format!(
                "Array.from(document.querySelectorAll('body *')).filter(el => \
                 el.textContent.includes({text:?}) && \
                 !Array.from(el.children).some(c => c.textContent.includes({text:?})))"
            ),
            Self::CssWithText { css, text } => format!(
                "Array.from(document.querySelectorAll({css:?})).filter(el => \
                 el.textContent.includes({text:?}))"
            ),
        }
    }

    /// JavaScript expression evaluating to the first match or `null`
    #[must_use]
    pub fn to_query(&self) -> String {
        match self {
            Self::Css(css) => format!("document.querySelector({css:?})"),
            other => format!("({}[0] || null)", other.to_all_query()),
        }
    }

    /// JavaScript expression evaluating to the number of matches
    #[must_use]
    pub fn to_count_query(&self) -> String {
        match self {
            Self::Css(css) => format!("document.querySelectorAll({css:?}).length"),
            other => format!("{}.length", other.to_all_query()),
        }
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Css(css) => f.write_str(css),
            Self::Text(text) => write!(f, "text={text}"),
            Self::CssWithText { css, text } => write!(f, "{css}:has-text(\"{text}\")"),
        }
    }
}

/// A named, declarative element locator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Locator {
    selector: Selector,
}

impl Locator {
    /// Create a locator with a CSS selector
    #[must_use]
    pub fn new(css: impl Into<String>) -> Self {
        Self::from_selector(Selector::Css(css.into()))
    }

    /// Create a locator from a selector
    #[must_use]
    pub const fn from_selector(selector: Selector) -> Self {
        Self { selector }
    }

    /// Locate by `data-test` hook
    #[must_use]
    pub fn test_id(id: &str) -> Self {
        Self::from_selector(Selector::test_id(id))
    }

    /// Locate the innermost element containing `text`
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self::from_selector(Selector::Text(text.into()))
    }

    /// Filter by text content
    ///
    /// Only CSS locators can be narrowed; a text locator is replaced by the
    /// new text.
    #[must_use]
    pub fn with_text(self, text: impl Into<String>) -> Self {
        let selector = match self.selector {
            Selector::Css(css) | Selector::CssWithText { css, .. } => Selector::CssWithText {
                css,
                text: text.into(),
            },
            Selector::Text(_) => Selector::Text(text.into()),
        };
        Self { selector }
    }

    /// Get the selector
    #[must_use]
    pub const fn selector(&self) -> &Selector {
        &self.selector
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.selector.fmt(f)
    }
}

impl From<Selector> for Locator {
    fn from(selector: Selector) -> Self {
        Self::from_selector(selector)
    }
}

/// Identity and address inputs shared by registration and checkout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    /// Given name
    FirstName,
    /// Family name
    LastName,
    /// Date of birth (YYYY-MM-DD)
    DateOfBirth,
    /// Street address
    Street,
    /// Postal code
    PostalCode,
    /// City
    City,
    /// State / province
    State,
    /// Country
    Country,
    /// Phone number
    Phone,
    /// Email address
    Email,
    /// Password
    Password,
}

impl Field {
    /// Every field, in form order
    pub const ALL: [Self; 11] = [
        Self::FirstName,
        Self::LastName,
        Self::DateOfBirth,
        Self::Street,
        Self::PostalCode,
        Self::City,
        Self::State,
        Self::Country,
        Self::Phone,
        Self::Email,
        Self::Password,
    ];

    /// Value of the field's `data-test` hook
    #[must_use]
    pub const fn test_id(self) -> &'static str {
        match self {
            Self::FirstName => "first-name",
            Self::LastName => "last-name",
            Self::DateOfBirth => "dob",
            Self::Street => "street",
            Self::PostalCode => "postal_code",
            Self::City => "city",
            Self::State => "state",
            Self::Country => "country",
            Self::Phone => "phone",
            Self::Email => "email",
            Self::Password => "password",
        }
    }

    /// Locator for the field's input
    #[must_use]
    pub fn locator(self) -> Locator {
        Locator::test_id(self.test_id())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    mod selector_tests {
        use super::*;

        #[test]
        fn test_test_id_selector() {
            let selector = Selector::test_id("login-submit");
            assert_eq!(selector.as_css(), Some("[data-test='login-submit']"));
            assert_eq!(selector.to_string(), "[data-test='login-submit']");
        }

        #[test]
        fn test_css_queries() {
            let selector = Selector::css(".card-title");
            assert_eq!(selector.to_query(), "document.querySelector(\".card-title\")");
            assert_eq!(
                selector.to_count_query(),
                "document.querySelectorAll(\".card-title\").length"
            );
        }

        #[test]
        fn test_text_query_prefers_innermost_match() {
            let query = Selector::text("Hand Tools").to_all_query();
            assert!(query.contains("\"Hand Tools\""));
            assert!(query.contains("el.children"));
            assert!(Selector::text("Hand Tools").as_css().is_none());
        }

        #[test]
        fn test_display_forms() {
            assert_eq!(Selector::text("Hand Tools").to_string(), "text=Hand Tools");
            let locator = Locator::new(".help-block").with_text("Payment was successful");
            assert_eq!(
                locator.to_string(),
                ".help-block:has-text(\"Payment was successful\")"
            );
            assert!(locator.selector().to_query().ends_with("[0] || null)"));
        }
    }

    mod locator_tests {
        use super::*;

        #[test]
        fn test_with_text_on_text_locator_replaces_text() {
            let locator = Locator::text("Hand Tools").with_text("Power Tools");
            assert_eq!(locator.selector(), &Selector::Text("Power Tools".into()));
        }

        #[test]
        fn test_with_text_twice_keeps_css() {
            let locator = Locator::new("button").with_text("a").with_text("b");
            assert_eq!(
                locator.selector(),
                &Selector::CssWithText {
                    css: "button".into(),
                    text: "b".into()
                }
            );
        }
    }

    mod field_table_tests {
        use super::*;

        #[test]
        fn test_field_selectors_are_unique() {
            let ids: HashSet<_> = Field::ALL.iter().map(|f| f.test_id()).collect();
            assert_eq!(ids.len(), Field::ALL.len());
        }

        #[test]
        fn test_field_locators() {
            assert_eq!(Field::PostalCode.locator().to_string(), "[data-test='postal_code']");
            assert_eq!(Field::DateOfBirth.locator().to_string(), "[data-test='dob']");
            assert_eq!(Field::Email.locator(), Locator::test_id("email"));
        }
    }
}
