use crate::config::StripeConfig;
use crate::error::{AppError, AppResult};
use reqwest::Client;
use serde::Deserialize;

/// One line on the hosted checkout page. Amounts are integer cents.
#[derive(Debug, Clone)]
pub struct CheckoutLineItem {
    pub name: String,
    pub description: Option<String>,
    pub unit_amount: i64,
    pub quantity: i64,
}

#[derive(Debug, Deserialize)]
pub struct CheckoutSession {
    pub id: String,
    pub url: String,
}

/// Payment gateway client. Session creation goes straight to the Stripe
/// REST API; webhook events are verified and parsed with the `stripe`
/// crate in the webhook handler.
#[derive(Clone)]
pub struct StripeService {
    client: Client,
    config: StripeConfig,
}

impl StripeService {
    pub fn new(config: StripeConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    pub fn webhook_secret(&self) -> &str {
        &self.config.webhook_secret
    }

    /// Create a hosted checkout session. Metadata carries the reservation
    /// and event ids so the webhook can reconcile the outcome.
    pub async fn create_checkout_session(
        &self,
        line_items: &[CheckoutLineItem],
        customer_email: &str,
        metadata: &[(&str, String)],
        success_url: &str,
        cancel_url: &str,
    ) -> AppResult<CheckoutSession> {
        let url = "https://api.stripe.com/v1/checkout/sessions";
        let params = session_form_params(line_items, customer_email, metadata, success_url, cancel_url);

        let response = self
            .client
            .post(url)
            .bearer_auth(&self.config.secret_key)
            .form(&params)
            .send()
            .await?;

        if response.status().is_success() {
            let session: CheckoutSession = response.json().await?;
            Ok(session)
        } else {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            Err(AppError::ExternalApiError(format!(
                "Failed to create checkout session: {error_text}"
            )))
        }
    }
}

/// Build the form-encoded body for a checkout session. Pure so the
/// parameter layout is testable without the network.
fn session_form_params(
    line_items: &[CheckoutLineItem],
    customer_email: &str,
    metadata: &[(&str, String)],
    success_url: &str,
    cancel_url: &str,
) -> Vec<(String, String)> {
    let mut params = vec![
        ("mode".to_string(), "payment".to_string()),
        ("success_url".to_string(), success_url.to_string()),
        ("cancel_url".to_string(), cancel_url.to_string()),
        ("customer_email".to_string(), customer_email.to_string()),
    ];

    for (key, value) in metadata {
        params.push((format!("metadata[{key}]"), value.clone()));
    }

    for (i, item) in line_items.iter().enumerate() {
        params.push((format!("line_items[{i}][quantity]"), item.quantity.to_string()));
        params.push((
            format!("line_items[{i}][price_data][currency]"),
            "usd".to_string(),
        ));
        params.push((
            format!("line_items[{i}][price_data][unit_amount]"),
            item.unit_amount.to_string(),
        ));
        params.push((
            format!("line_items[{i}][price_data][product_data][name]"),
            item.name.clone(),
        ));
        if let Some(description) = &item.description {
            params.push((
                format!("line_items[{i}][price_data][product_data][description]"),
                description.clone(),
            ));
        }
    }

    params
}

#[cfg(test)]
mod tests {
    use super::*;

    fn find<'a>(params: &'a [(String, String)], key: &str) -> Option<&'a str> {
        params
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    #[test]
    fn builds_session_params() {
        let items = vec![
            CheckoutLineItem {
                name: "Football Game parking".to_string(),
                description: Some("Sep 12, 2026 7:30 PM EDT".to_string()),
                unit_amount: 3500,
                quantity: 2,
            },
            CheckoutLineItem {
                name: "Service fee".to_string(),
                description: None,
                unit_amount: 420,
                quantity: 1,
            },
        ];
        let params = session_form_params(
            &items,
            "fan@example.com",
            &[("reservation_id", "abc".to_string())],
            "https://example.com/success",
            "https://example.com/cancel",
        );

        assert_eq!(find(&params, "mode"), Some("payment"));
        assert_eq!(find(&params, "customer_email"), Some("fan@example.com"));
        assert_eq!(find(&params, "metadata[reservation_id]"), Some("abc"));
        assert_eq!(find(&params, "line_items[0][quantity]"), Some("2"));
        assert_eq!(
            find(&params, "line_items[0][price_data][unit_amount]"),
            Some("3500")
        );
        assert_eq!(
            find(&params, "line_items[1][price_data][product_data][name]"),
            Some("Service fee")
        );
        // No description on the fee line, so the key must be absent.
        assert!(find(&params, "line_items[1][price_data][product_data][description]").is_none());
    }
}
