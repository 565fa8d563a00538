//! Browser suite against the live shop.
//!
//! Run with `E2E_LIVE=1 cargo test --features browser --test ui`.

#[macro_use]
mod common;

use serial_test::serial;
use toolshop_e2e::network::UrlPattern;
use toolshop_e2e::prelude::*;
use toolshop_e2e::wait::REQUEST_TIMEOUT_MS;

#[tokio::test]
#[serial]
async fn test_home_lists_products() {
    require_live!();
    common::harness()
        .run(TestCase::ui("test_home_lists_products"), |ctx| {
            Box::pin(async move {
                let home = ctx.home_page()?;
                home.navigate_home().await?;
                let count = home.get_product_count().await?;
                if count == 0 {
                    return Err(E2eError::assertion("product cards", ">= 1", count));
                }
                Ok(())
            })
        })
        .await
        .unwrap();
}

#[tokio::test]
#[serial]
async fn test_hand_tools_filter_requests_category() {
    require_live!();
    common::harness()
        .run(TestCase::ui("test_hand_tools_filter_requests_category"), |ctx| {
            Box::pin(async move {
                let home = ctx.home_page()?;
                home.navigate_home().await?;

                let category = UrlPattern::Contains("category".to_string());
                let mark = home.base().request_mark();
                home.filter_by_hand_tools().await?;
                home.base()
                    .wait_for_request(mark, |url| category.matches(url), REQUEST_TIMEOUT_MS)
                    .await?;
                home.get_product_count().await?;
                Ok(())
            })
        })
        .await
        .unwrap();
}

#[tokio::test]
#[serial]
async fn test_search_finds_pliers() {
    require_live!();
    common::harness()
        .run(TestCase::ui("test_search_finds_pliers"), |ctx| {
            Box::pin(async move {
                let home = ctx.home_page()?;
                home.navigate_home().await?;
                home.search("Pliers").await?;

                home.get_product_count().await?;
                let title = home.first_product_title().await?;
                if !title.to_lowercase().contains("pliers") {
                    return Err(E2eError::assertion(
                        "first result title",
                        "contains 'pliers'",
                        title,
                    ));
                }
                Ok(())
            })
        })
        .await
        .unwrap();
}

#[tokio::test]
#[serial]
async fn test_add_to_cart_shows_one() {
    require_live!();
    common::harness()
        .run(TestCase::ui("test_add_to_cart_shows_one"), |ctx| {
            Box::pin(async move {
                let home = ctx.home_page()?;
                home.navigate_home().await?;
                let product = home.open_first_product().await?;

                product.add_to_cart().await?;
                let timeout_ms = ctx.config().timeouts.element_ms;
                product.wait_for_cart_quantity("1", timeout_ms).await?;
                ensure_eq(
                    "cart badge",
                    Some("1".to_string()),
                    product.cart_quantity().await?,
                )
            })
        })
        .await
        .unwrap();
}

#[tokio::test]
#[serial]
async fn test_login_wrong_password_shows_error() {
    require_live!();
    common::harness()
        .run(TestCase::ui("test_login_wrong_password_shows_error"), |ctx| {
            Box::pin(async move {
                let login = ctx.login_page()?;
                let email = ctx.config().test_user_email.clone();
                let error_timeout_ms = ctx.config().timeouts.error_message_ms;

                login.navigate_login().await?;
                login.login(&email, "wrongpassword123!").await?;
                login.wait_for_error(error_timeout_ms).await?;
                ensure_eq("still on login page", true, login.is_on_login_path().await?)
            })
        })
        .await
        .unwrap();
}

#[tokio::test]
#[serial]
async fn test_login_form_keeps_typed_values() {
    require_live!();
    common::harness()
        .run(TestCase::ui("test_login_form_keeps_typed_values"), |ctx| {
            Box::pin(async move {
                let login = ctx.login_page()?;
                login.navigate_login().await?;

                let email = Field::Email.locator();
                let typed = ctx.random_user().email.clone();
                login.base().fill(&email, "stale@example.com").await?;
                login.base().fill(&email, &typed).await?;
                ensure_eq("email value", Some(typed), login.base().value(&email).await?)
            })
        })
        .await
        .unwrap();
}

#[tokio::test]
#[serial]
async fn test_register_through_ui() {
    require_live!();
    common::harness()
        .run(TestCase::ui("test_register_through_ui"), |ctx| {
            Box::pin(async move {
                let login = ctx.login_page()?;
                let user = ctx.random_user().clone();
                login.navigate_login().await?;
                login.register(&user).await?;

                // a registered account lands back on the login form
                login.login(&user.email, &user.password).await?;
                ensure_eq("left login page", false, login.is_on_login_path().await?)
            })
        })
        .await
        .unwrap();
}

#[tokio::test]
#[serial]
async fn test_authenticated_checkout_succeeds() {
    require_live!();
    common::harness()
        .run(
            TestCase::ui("test_authenticated_checkout_succeeds").authenticated(),
            |ctx| {
                Box::pin(async move {
                    let home = ctx.home_page()?;
                    home.navigate_home().await?;
                    let product = home.open_first_product().await?;
                    product.add_to_cart().await?;
                    product
                        .wait_for_cart_quantity("1", ctx.config().timeouts.element_ms)
                        .await?;

                    let address = BillingAddress::from(&ctx.random_user().address);
                    let checkout = ctx.checkout_page()?;
                    checkout.navigate_cart().await?;
                    checkout
                        .complete_step_1()
                        .await?
                        .complete_step_2(&address)
                        .await?
                        .complete_step_3(PaymentMethod::CashOnDelivery)
                        .await?
                        .confirm_order()
                        .await?
                        .validate_success()
                        .await
                })
            },
        )
        .await
        .unwrap();
}
