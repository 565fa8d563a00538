//! Product detail screen.

use super::{BasePage, PageObject};
use crate::locator::Locator;
use crate::result::E2eResult;
use tracing::info;

/// Product detail page (`/product/<id>`)
#[derive(Debug, Clone)]
pub struct ProductPage {
    base: BasePage,
    add_to_cart: Locator,
    cart_quantity: Locator,
}

impl ProductPage {
    /// Route prefix of detail pages
    pub const PATH: &'static str = "/product";

    /// Product page over an open session
    #[must_use]
    pub fn new(base: BasePage) -> Self {
        Self {
            base,
            add_to_cart: Locator::test_id("add-to-cart"),
            cart_quantity: Locator::test_id("cart-quantity"),
        }
    }

    /// Shared primitives
    #[must_use]
    pub const fn base(&self) -> &BasePage {
        &self.base
    }

    /// Click "Add to cart" and wait for the cart request to settle
    pub async fn add_to_cart(&self) -> E2eResult<()> {
        info!("adding product to cart");
        self.base.click(&self.add_to_cart).await?;
        self.base.wait_for_network_idle().await
    }

    /// Text of the cart badge, `None` while the cart is empty
    pub async fn cart_quantity(&self) -> E2eResult<Option<String>> {
        Ok(self
            .base
            .text(&self.cart_quantity)
            .await?
            .map(|text| text.trim().to_string()))
    }

    /// Wait until the cart badge reads `expected`
    pub async fn wait_for_cart_quantity(&self, expected: &str, timeout_ms: u64) -> E2eResult<()> {
        self.base
            .wait_for_text(&self.cart_quantity, expected, timeout_ms)
            .await
    }
}

impl PageObject for ProductPage {
    fn url_pattern(&self) -> &str {
        Self::PATH
    }
}
