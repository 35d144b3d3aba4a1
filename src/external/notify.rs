use crate::config::NotifyConfig;
use crate::error::{AppError, AppResult};
use reqwest::Client;
use serde_json::json;
use std::time::Duration;

// Messages are best-effort; a hung provider must not stall the caller.
const SEND_TIMEOUT: Duration = Duration::from_secs(10);

/// Notification sink: confirmation email via the Resend API, optional SMS
/// via Twilio. Both are best-effort; a confirmed payment is never rolled
/// back because a message failed to send.
#[derive(Clone)]
pub struct NotifyService {
    client: Client,
    config: NotifyConfig,
}

impl NotifyService {
    pub fn new(config: NotifyConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    pub async fn send_email(&self, to: &str, subject: &str, html: &str) -> AppResult<()> {
        if self.config.resend_api_key.is_empty() {
            log::info!("Resend not configured; skipping email to {to}");
            return Ok(());
        }

        let response = self
            .client
            .post("https://api.resend.com/emails")
            .timeout(SEND_TIMEOUT)
            .bearer_auth(&self.config.resend_api_key)
            .json(&json!({
                "from": self.config.resend_from_email,
                "to": [to],
                "subject": subject,
                "html": html,
            }))
            .send()
            .await?;

        if response.status().is_success() {
            log::info!("Confirmation email sent to {to}");
            Ok(())
        } else {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            Err(AppError::ExternalApiError(format!(
                "Email send failed: {error_text}"
            )))
        }
    }

    pub async fn send_sms(&self, to: &str, body: &str) -> AppResult<()> {
        if self.config.twilio_account_sid.is_empty() {
            log::info!("Twilio not configured; skipping SMS to {to}");
            return Ok(());
        }

        let url = format!(
            "https://api.twilio.com/2010-04-01/Accounts/{}/Messages.json",
            self.config.twilio_account_sid
        );
        let params = [
            ("To", to),
            ("From", self.config.twilio_from_phone.as_str()),
            ("Body", body),
        ];

        let response = self
            .client
            .post(&url)
            .timeout(SEND_TIMEOUT)
            .basic_auth(
                &self.config.twilio_account_sid,
                Some(&self.config.twilio_auth_token),
            )
            .form(&params)
            .send()
            .await?;

        if response.status().is_success() {
            log::info!("Confirmation SMS sent to {to}");
            Ok(())
        } else {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            Err(AppError::ExternalApiError(format!(
                "SMS send failed: {error_text}"
            )))
        }
    }
}
