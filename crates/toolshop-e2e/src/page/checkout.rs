//! Multi-step checkout as a typestate flow.
//!
//! The checkout only moves forward:
//!
//! ```text
//! Cart --complete_step_1--> Billing --complete_step_2--> Payment
//!      --complete_step_3--> Review --confirm_order--> Complete
//! ```
//!
//! Each transition consumes the page and returns it in the next state, so a
//! step can neither be repeated nor skipped:
//!
//! ```compile_fail
//! use toolshop_e2e::page::{Cart, CheckoutPage};
//!
//! async fn skip_to_confirm(page: CheckoutPage<Cart>) {
//!     let _ = page.confirm_order().await;
//! }
//! ```

use super::{BasePage, PageObject};
use crate::data::Address;
use crate::locator::{Field, Locator};
use crate::result::E2eResult;
use std::fmt;
use std::marker::PhantomData;
use tracing::info;

/// Cart review; the entry state
#[derive(Debug)]
pub struct Cart;

/// Billing address form
#[derive(Debug)]
pub struct Billing;

/// Payment method form
#[derive(Debug)]
pub struct Payment;

/// Final confirmation
#[derive(Debug)]
pub struct Review;

/// Order placed
#[derive(Debug)]
pub struct Complete;

/// Billing address entered at step 2
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BillingAddress {
    /// Street and number
    pub street: String,
    /// City
    pub city: String,
    /// State / province
    pub state: String,
    /// Country; left untouched when `None`
    pub country: Option<String>,
    /// Postal code; left untouched when `None`
    pub postal_code: Option<String>,
}

impl BillingAddress {
    /// Address with only the required fields
    pub fn new(
        street: impl Into<String>,
        city: impl Into<String>,
        state: impl Into<String>,
    ) -> Self {
        Self {
            street: street.into(),
            city: city.into(),
            state: state.into(),
            country: None,
            postal_code: None,
        }
    }

    /// Also fill the country
    #[must_use]
    pub fn with_country(mut self, country: impl Into<String>) -> Self {
        self.country = Some(country.into());
        self
    }

    /// Also fill the postal code
    #[must_use]
    pub fn with_postal_code(mut self, postal_code: impl Into<String>) -> Self {
        self.postal_code = Some(postal_code.into());
        self
    }
}

impl From<&Address> for BillingAddress {
    fn from(address: &Address) -> Self {
        Self {
            street: address.street.clone(),
            city: address.city.clone(),
            state: address.state.clone(),
            country: Some(address.country.clone()),
            postal_code: Some(address.postal_code.clone()),
        }
    }
}

/// Payment methods offered at step 3
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum PaymentMethod {
    /// Bank transfer
    BankTransfer,
    /// Cash on delivery
    #[default]
    CashOnDelivery,
    /// Credit card
    CreditCard,
    /// Buy now, pay later
    BuyNowPayLater,
    /// Gift card
    GiftCard,
}

impl PaymentMethod {
    /// Option label shown in the payment select
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::BankTransfer => "Bank Transfer",
            Self::CashOnDelivery => "Cash on Delivery",
            Self::CreditCard => "Credit Card",
            Self::BuyNowPayLater => "Buy Now Pay Later",
            Self::GiftCard => "Gift Card",
        }
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

const SUCCESS_TEXT: &str = "Payment was successful";

/// Checkout page in state `S`
#[derive(Debug)]
pub struct CheckoutPage<S = Cart> {
    base: BasePage,
    _state: PhantomData<S>,
}

impl<S> CheckoutPage<S> {
    /// Route of the checkout flow
    pub const PATH: &'static str = "/checkout";

    /// Shared primitives
    #[must_use]
    pub const fn base(&self) -> &BasePage {
        &self.base
    }

    fn advance<T>(self) -> CheckoutPage<T> {
        CheckoutPage {
            base: self.base,
            _state: PhantomData,
        }
    }

    async fn click_and_settle(&self, test_id: &str) -> E2eResult<()> {
        self.base.click(&Locator::test_id(test_id)).await?;
        self.base.wait_for_network_idle().await
    }
}

impl CheckoutPage<Cart> {
    /// Checkout over an open session, starting at the cart
    #[must_use]
    pub const fn new(base: BasePage) -> Self {
        Self {
            base,
            _state: PhantomData,
        }
    }

    /// Open the cart
    pub async fn navigate_cart(&self) -> E2eResult<()> {
        self.base.navigate("/cart").await
    }

    /// Proceed past the cart; the session must already be signed in
    pub async fn complete_step_1(self) -> E2eResult<CheckoutPage<Billing>> {
        info!("checkout step 1: sign-in check");
        self.click_and_settle("proceed-1").await?;
        Ok(self.advance())
    }
}

impl CheckoutPage<Billing> {
    /// Fill the billing address and proceed
    pub async fn complete_step_2(
        self,
        address: &BillingAddress,
    ) -> E2eResult<CheckoutPage<Payment>> {
        info!(city = %address.city, "checkout step 2: billing address");
        self.base.fill(&Field::Street.locator(), &address.street).await?;
        self.base.fill(&Field::City.locator(), &address.city).await?;
        self.base.fill(&Field::State.locator(), &address.state).await?;
        if let Some(country) = &address.country {
            self.base.fill(&Field::Country.locator(), country).await?;
        }
        if let Some(postal_code) = &address.postal_code {
            self.base
                .fill(&Field::PostalCode.locator(), postal_code)
                .await?;
        }
        self.click_and_settle("proceed-2").await?;
        Ok(self.advance())
    }
}

impl CheckoutPage<Payment> {
    /// Choose `method` and proceed
    pub async fn complete_step_3(self, method: PaymentMethod) -> E2eResult<CheckoutPage<Review>> {
        info!(%method, "checkout step 3: payment");
        self.base
            .select_option(&Locator::test_id("payment-method"), method.label())
            .await?;
        self.click_and_settle("proceed-3").await?;
        Ok(self.advance())
    }
}

impl CheckoutPage<Review> {
    /// Place the order
    pub async fn confirm_order(self) -> E2eResult<CheckoutPage<Complete>> {
        info!("confirming order");
        self.click_and_settle("finish").await?;
        Ok(self.advance())
    }
}

impl CheckoutPage<Complete> {
    /// Wait for the payment confirmation message
    pub async fn validate_success(&self) -> E2eResult<()> {
        let message = Locator::new(".help-block").with_text(SUCCESS_TEXT);
        let timeout_ms = self.base.config().timeouts.success_message_ms;
        self.base.wait_visible_within(&message, timeout_ms).await
    }
}

impl<S> PageObject for CheckoutPage<S> {
    fn url_pattern(&self) -> &str {
        Self::PATH
    }

    fn page_name(&self) -> &'static str {
        "CheckoutPage"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::driver::{MockDriver, MockElement, MockState};
    use crate::locator::Selector;
    use std::sync::Arc;

    fn settle(state: &mut MockState) {
        state.complete_request("https://api.practicesoftwaretesting.com/carts");
    }

    /// Every checkout control present; `finish` reveals the success message
    fn checkout_form() -> MockDriver {
        let mut driver = MockDriver::new().with_element(
            &Selector::test_id("payment-method"),
            MockElement::new().options(PAYMENT_LABELS),
        );
        for id in ["proceed-1", "proceed-2", "proceed-3", "finish"] {
            driver = driver.with_element(&Selector::test_id(id), MockElement::new());
            driver.on_click(&Selector::test_id(id), settle);
        }
        for field in [Field::Street, Field::City, Field::State, Field::Country, Field::PostalCode] {
            driver = driver.with_element(field.locator().selector(), MockElement::new());
        }
        driver.on_click(&Selector::test_id("finish"), |state| {
            state.insert(
                Locator::new(".help-block").with_text(SUCCESS_TEXT).selector(),
                MockElement::new().text(SUCCESS_TEXT).appear_after(2),
            );
        });
        driver
    }

    const PAYMENT_LABELS: [&str; 5] = [
        "Bank Transfer",
        "Cash on Delivery",
        "Credit Card",
        "Buy Now Pay Later",
        "Gift Card",
    ];

    fn cart(driver: &MockDriver) -> CheckoutPage {
        CheckoutPage::new(BasePage::new(
            Arc::new(driver.clone()),
            Arc::new(Config::default()),
        ))
    }

    mod flow_tests {
        use super::*;

        #[tokio::test(start_paused = true)]
        async fn test_full_checkout_shows_success() {
            let driver = checkout_form();
            let address = BillingAddress::new("Test street 98", "Vienna", "Vienna")
                .with_postal_code("1010")
                .with_country("Austria");

            let done = cart(&driver)
                .complete_step_1()
                .await
                .unwrap()
                .complete_step_2(&address)
                .await
                .unwrap()
                .complete_step_3(PaymentMethod::default())
                .await
                .unwrap()
                .confirm_order()
                .await
                .unwrap();
            done.validate_success().await.unwrap();

            let clicks: Vec<String> = driver
                .history()
                .into_iter()
                .filter(|c| c.starts_with("click:"))
                .collect();
            assert_eq!(
                clicks,
                vec![
                    "click:[data-test='proceed-1']",
                    "click:[data-test='proceed-2']",
                    "click:[data-test='proceed-3']",
                    "click:[data-test='finish']",
                ]
            );
            assert_eq!(
                driver.value_of(&Selector::test_id("payment-method")).as_deref(),
                Some("Cash on Delivery")
            );
            assert_eq!(
                driver.value_of(Field::PostalCode.locator().selector()).as_deref(),
                Some("1010")
            );
        }

        #[tokio::test(start_paused = true)]
        async fn test_optional_billing_fields_left_untouched() {
            let driver = checkout_form();
            let address = BillingAddress::new("Main St 1", "Utrecht", "Utrecht");
            cart(&driver)
                .complete_step_1()
                .await
                .unwrap()
                .complete_step_2(&address)
                .await
                .unwrap();

            assert!(!driver.was_called("type:[data-test='postal_code']"));
            assert!(!driver.was_called("type:[data-test='country']"));
            assert_eq!(
                driver.value_of(Field::Street.locator().selector()).as_deref(),
                Some("Main St 1")
            );
        }

        #[tokio::test(start_paused = true)]
        async fn test_missing_success_message_times_out() {
            let driver = checkout_form();
            driver.on_click(&Selector::test_id("finish"), |state| {
                state.remove(Locator::new(".help-block").with_text(SUCCESS_TEXT).selector());
            });
            let done = cart(&driver)
                .complete_step_1()
                .await
                .unwrap()
                .complete_step_2(&BillingAddress::new("a", "b", "c"))
                .await
                .unwrap()
                .complete_step_3(PaymentMethod::BankTransfer)
                .await
                .unwrap()
                .confirm_order()
                .await
                .unwrap();
            let err = done.validate_success().await.unwrap_err();
            assert!(err.is_timeout());
            assert!(err.to_string().contains(SUCCESS_TEXT));
        }
    }

    mod model_tests {
        use super::*;
        use crate::data::User;

        #[test]
        fn test_payment_labels() {
            assert_eq!(PaymentMethod::default().label(), "Cash on Delivery");
            assert_eq!(PaymentMethod::GiftCard.to_string(), "Gift Card");
        }

        #[test]
        fn test_billing_from_address() {
            let user = User::random();
            let billing = BillingAddress::from(&user.address);
            assert_eq!(billing.street, user.address.street);
            assert_eq!(billing.postal_code.as_ref(), Some(&user.address.postal_code));
            assert_eq!(billing.country.as_ref(), Some(&user.address.country));
        }
    }
}
