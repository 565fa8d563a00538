//! Product grid on the landing page.

use super::{BasePage, PageObject, ProductPage};
use crate::locator::Locator;
use crate::result::E2eResult;
use tracing::{debug, info};

/// Home page (`/`): product grid, category filter, price slider and search
#[derive(Debug, Clone)]
pub struct HomePage {
    base: BasePage,
    product_card: Locator,
    product_title: Locator,
    hand_tools: Locator,
    price_slider: Locator,
    search_query: Locator,
}

impl HomePage {
    /// Route of the grid
    pub const PATH: &'static str = "/";

    /// Home page over an open session
    #[must_use]
    pub fn new(base: BasePage) -> Self {
        Self {
            base,
            product_card: Locator::new("a[data-test^='product-']"),
            product_title: Locator::new("a[data-test^='product-'] .card-title"),
            hand_tools: Locator::text("Hand Tools"),
            price_slider: Locator::new("input[data-test='price-slider']"),
            search_query: Locator::test_id("search-query"),
        }
    }

    /// Shared primitives
    #[must_use]
    pub const fn base(&self) -> &BasePage {
        &self.base
    }

    /// Locator matching every product card
    #[must_use]
    pub const fn product_card(&self) -> &Locator {
        &self.product_card
    }

    /// Open the grid and wait until at least one card has rendered
    pub async fn navigate_home(&self) -> E2eResult<()> {
        self.base.navigate(Self::PATH).await?;
        self.base.wait_visible(&self.product_card).await
    }

    /// Tick the "Hand Tools" category
    pub async fn filter_by_hand_tools(&self) -> E2eResult<()> {
        info!("filtering by Hand Tools");
        self.base.click(&self.hand_tools).await?;
        self.base.wait_for_network_idle().await
    }

    /// Move the price slider to `target`
    pub async fn filter_by_price(&self, target: u32) -> E2eResult<()> {
        info!(price = target, "setting price slider");
        self.base
            .set_value(&self.price_slider, &target.to_string())
            .await?;
        self.base.wait_for_network_idle().await
    }

    /// Type `query` into the search box and submit with Enter
    pub async fn search(&self, query: &str) -> E2eResult<()> {
        info!(query, "searching");
        self.base.fill(&self.search_query, query).await?;
        self.base.press(&self.search_query, "Enter").await?;
        self.base.wait_for_network_idle().await
    }

    /// Number of product cards, once at least one is visible
    pub async fn get_product_count(&self) -> E2eResult<usize> {
        self.base.wait_visible(&self.product_card).await?;
        let count = self.base.count(&self.product_card).await?;
        debug!(count, "product cards");
        Ok(count)
    }

    /// Title of the first card in the grid
    pub async fn first_product_title(&self) -> E2eResult<String> {
        let title = self.base.required_text(&self.product_title).await?;
        Ok(title.trim().to_string())
    }

    /// Open the first card's detail page
    pub async fn open_first_product(&self) -> E2eResult<ProductPage> {
        self.base.click(&self.product_card).await?;
        self.base.wait_for_network_idle().await?;
        Ok(ProductPage::new(self.base.clone()))
    }
}

impl PageObject for HomePage {
    fn url_pattern(&self) -> &str {
        Self::PATH
    }

    fn page_name(&self) -> &'static str {
        "HomePage"
    }
}
