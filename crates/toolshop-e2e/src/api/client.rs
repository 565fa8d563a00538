//! HTTP client for the toolshop backend.

use crate::config::{join_url, Config};
use crate::data::User;
use crate::result::{E2eError, E2eResult};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info};

/// Per-request timeout
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Body of `POST /users/login`
#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest<'a> {
    /// Account email
    pub email: &'a str,
    /// Account password
    pub password: &'a str,
}

#[derive(Debug, Deserialize)]
struct LoginResponse {
    #[serde(default)]
    access_token: Option<String>,
}

#[derive(Debug, Serialize)]
struct CartItem<'a> {
    product_id: &'a str,
    quantity: u32,
}

/// Backend client used for preconditions. One attempt per call, no retries.
#[derive(Debug, Clone)]
pub struct ApiClient {
    base_url: String,
    client: reqwest::Client,
    token: Option<String>,
}

impl ApiClient {
    /// Create a client for the given API origin
    pub fn new(base_url: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(DEFAULT_REQUEST_TIMEOUT)
            .build()
            .unwrap_or_default();
        Self::with_client(base_url, client)
    }

    /// Create a client for the configured API origin
    pub fn from_config(config: &Config) -> Self {
        Self::new(config.base_api_url.clone())
    }

    /// Create a client with a custom reqwest client
    pub fn with_client(base_url: impl Into<String>, client: reqwest::Client) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
            token: None,
        }
    }

    /// Returns the base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Bearer token attached to authenticated calls, if any
    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    /// Attach a bearer token
    pub fn set_token(&mut self, token: impl Into<String>) {
        self.token = Some(token.into());
    }

    /// Attach a bearer token, builder style
    #[must_use]
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.set_token(token);
        self
    }

    fn url(&self, path: &str) -> String {
        join_url(&self.base_url, path)
    }

    /// Create an account. Any 2xx is success; the parsed response body is
    /// returned.
    pub async fn register(&self, user: &User) -> E2eResult<serde_json::Value> {
        debug!(email = %user.email, "registering user");
        let resp = self
            .client
            .post(self.url("/users/register"))
            .json(user)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(setup_failure("register", status, resp).await);
        }
        let record = resp.json().await?;
        info!(email = %user.email, status = status.as_u16(), "user registered");
        Ok(record)
    }

    /// Exchange credentials for an access token
    pub async fn login(&self, email: &str, password: &str) -> E2eResult<String> {
        debug!(email, "logging in via API");
        let resp = self
            .client
            .post(self.url("/users/login"))
            .json(&LoginRequest { email, password })
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(setup_failure("login", status, resp).await);
        }

        let body = resp.text().await?;
        let token = serde_json::from_str::<LoginResponse>(&body)
            .ok()
            .and_then(|parsed| parsed.access_token)
            .filter(|token| !token.is_empty());
        let Some(token) = token else {
            return Err(E2eError::SetupFailure {
                operation: "login".to_string(),
                status: status.as_u16(),
                body,
            });
        };
        info!(email, "API login succeeded");
        Ok(token)
    }

    /// Put one unit of `product_id` in the authenticated user's cart.
    /// Only `201 Created` counts as success.
    pub async fn add_to_cart(&self, product_id: &str) -> E2eResult<()> {
        let token = self.token.as_deref().ok_or_else(|| E2eError::InvalidState {
            message: "add_to_cart requires a bearer token; call login first".to_string(),
        })?;

        debug!(product_id, "adding product to cart via API");
        let resp = self
            .client
            .post(self.url("/carts"))
            .bearer_auth(token)
            .json(&CartItem {
                product_id,
                quantity: 1,
            })
            .send()
            .await?;

        let status = resp.status();
        if status != StatusCode::CREATED {
            return Err(setup_failure("add_to_cart", status, resp).await);
        }
        Ok(())
    }
}

async fn setup_failure(operation: &str, status: StatusCode, resp: reqwest::Response) -> E2eError {
    let body = resp.text().await.unwrap_or_default();
    E2eError::SetupFailure {
        operation: operation.to_string(),
        status: status.as_u16(),
        body,
    }
}
