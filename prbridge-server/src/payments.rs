//! Stripe handoff client.
//!
//! The service never processes card data; it asks Stripe for redirect URLs
//! (account onboarding links, checkout sessions) and hands them to the
//! client, which polls the confirmation endpoint afterwards.

use anyhow::{bail, Context, Result};
use serde::Deserialize;

pub const STRIPE_API_BASE: &str = "https://api.stripe.com/v1";

pub struct StripeClient {
    client: reqwest::Client,
    secret_key: String,
    base_url: String,
}

/// Parameters for a checkout session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutRequest {
    pub amount_cents: i64,
    pub currency: String,
    pub product_name: String,
    pub success_url: String,
    pub cancel_url: String,
}

/// An account-onboarding redirect.
#[derive(Debug, Clone, Deserialize)]
pub struct AccountLink {
    pub url: String,
}

/// A checkout session as Stripe reports it. `url` is present while the
/// session is open; `payment_status` becomes "paid" once settled.
#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutSession {
    pub id: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub payment_status: Option<String>,
}

impl CheckoutSession {
    pub fn is_confirmed(&self) -> bool {
        self.payment_status.as_deref() == Some("paid")
    }
}

impl StripeClient {
    pub fn new(secret_key: impl Into<String>) -> Self {
        Self::with_base_url(secret_key, STRIPE_API_BASE)
    }

    /// Override the API base URL (tests point this at a local stub).
    pub fn with_base_url(secret_key: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            secret_key: secret_key.into(),
            base_url: base_url.into(),
        }
    }

    /// Create an account-onboarding link for Stripe Connect.
    pub async fn create_account_link(
        &self,
        account_id: &str,
        refresh_url: &str,
        return_url: &str,
    ) -> Result<AccountLink> {
        let params = [
            ("account", account_id),
            ("refresh_url", refresh_url),
            ("return_url", return_url),
            ("type", "account_onboarding"),
        ];
        let response = self
            .client
            .post(format!("{}/account_links", self.base_url))
            .bearer_auth(&self.secret_key)
            .form(&params)
            .send()
            .await
            .context("failed to reach Stripe for account link")?;
        Self::parse(response).await
    }

    /// Create a checkout session and return its redirect URL.
    pub async fn create_checkout_session(
        &self,
        request: &CheckoutRequest,
    ) -> Result<CheckoutSession> {
        let response = self
            .client
            .post(format!("{}/checkout/sessions", self.base_url))
            .bearer_auth(&self.secret_key)
            .form(&checkout_form(request))
            .send()
            .await
            .context("failed to reach Stripe for checkout session")?;
        Self::parse(response).await
    }

    /// Fetch a checkout session for confirmation polling.
    pub async fn retrieve_checkout_session(&self, session_id: &str) -> Result<CheckoutSession> {
        let response = self
            .client
            .get(format!("{}/checkout/sessions/{}", self.base_url, session_id))
            .bearer_auth(&self.secret_key)
            .send()
            .await
            .context("failed to reach Stripe for checkout session")?;
        Self::parse(response).await
    }

    async fn parse<T: serde::de::DeserializeOwned>(response: reqwest::Response) -> Result<T> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            bail!("Stripe returned {}: {}", status, body);
        }
        response
            .json::<T>()
            .await
            .context("failed to parse Stripe response")
    }
}

/// Form encoding for a checkout session create call. Stripe's form keys use
/// bracket nesting for line items.
fn checkout_form(request: &CheckoutRequest) -> Vec<(&'static str, String)> {
    vec![
        ("mode", "payment".to_string()),
        ("success_url", request.success_url.clone()),
        ("cancel_url", request.cancel_url.clone()),
        ("line_items[0][quantity]", "1".to_string()),
        (
            "line_items[0][price_data][currency]",
            request.currency.clone(),
        ),
        (
            "line_items[0][price_data][unit_amount]",
            request.amount_cents.to_string(),
        ),
        (
            "line_items[0][price_data][product_data][name]",
            request.product_name.clone(),
        ),
    ]
}
