//! Twilio SMS provider (fallback channel).

use async_trait::async_trait;
use otp_gate_core::phone::mask_phone;
use otp_gate_core::record::OtpChannel;
use serde::Deserialize;
use std::time::Duration;

use crate::provider::{DeliveryError, DeliveryMeta, DeliveryProvider, DeliveryReceipt};

/// Configuration for the Twilio SMS provider.
///
/// Credentials may be left empty in the file and supplied through the
/// environment; an unconfigured provider reports itself unavailable.
#[derive(Debug, Clone, serde::Serialize, Deserialize)]
#[serde(default)]
pub struct TwilioConfig {
    /// Twilio API base URL.
    pub api_base: String,
    /// Account SID.
    pub account_sid: String,
    /// Auth token.
    pub auth_token: String,
    /// Sender phone number or messaging service sender ID.
    pub from_number: String,
    /// Per-attempt request timeout in seconds.
    pub request_timeout_seconds: u64,
}

impl Default for TwilioConfig {
    fn default() -> Self {
        Self {
            api_base: default_api_base(),
            account_sid: String::new(),
            auth_token: String::new(),
            from_number: String::new(),
            request_timeout_seconds: default_timeout(),
        }
    }
}

fn default_api_base() -> String {
    "https://api.twilio.com".to_string()
}

fn default_timeout() -> u64 {
    5
}

#[derive(Debug, Deserialize)]
struct TwilioMessageResponse {
    sid: Option<String>,
}

/// Twilio SMS provider.
pub struct TwilioSmsProvider {
    config: TwilioConfig,
    client: reqwest::Client,
}

impl TwilioSmsProvider {
    /// Creates a new provider with a bounded-timeout HTTP client.
    pub fn new(config: TwilioConfig) -> Result<Self, DeliveryError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_seconds))
            .build()
            .map_err(|e| DeliveryError::ClientBuild {
                channel: OtpChannel::Sms,
                message: e.to_string(),
            })?;
        Ok(Self { config, client })
    }

    fn messages_url(&self) -> String {
        format!(
            "{}/2010-04-01/Accounts/{}/Messages.json",
            self.config.api_base, self.config.account_sid
        )
    }

    fn message_body(code: &str, expiry_minutes: u64) -> String {
        format!("Ma xac thuc cua ban la {code}. Ma het han sau {expiry_minutes} phut.")
    }
}

#[async_trait]
impl DeliveryProvider for TwilioSmsProvider {
    fn channel(&self) -> OtpChannel {
        OtpChannel::Sms
    }

    fn is_available(&self) -> bool {
        !self.config.account_sid.is_empty()
            && !self.config.auth_token.is_empty()
            && !self.config.from_number.is_empty()
    }

    fn name(&self) -> &'static str {
        "Twilio SMS"
    }

    async fn send(
        &self,
        phone: &str,
        code: &str,
        meta: &DeliveryMeta,
    ) -> Result<DeliveryReceipt, DeliveryError> {
        tracing::info!(phone = %mask_phone(phone), request_id = %meta.request_id, "sending OTP via Twilio SMS");

        let params = [
            ("To", phone.to_string()),
            ("From", self.config.from_number.clone()),
            ("Body", Self::message_body(code, meta.expiry_minutes)),
        ];

        let response = self
            .client
            .post(self.messages_url())
            .basic_auth(&self.config.account_sid, Some(&self.config.auth_token))
            .form(&params)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    DeliveryError::Timeout {
                        channel: OtpChannel::Sms,
                    }
                } else {
                    DeliveryError::Provider {
                        channel: OtpChannel::Sms,
                        message: e.to_string(),
                    }
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(DeliveryError::Provider {
                channel: OtpChannel::Sms,
                message: format!("HTTP {status}: {body}"),
            });
        }

        let parsed: TwilioMessageResponse =
            response.json().await.map_err(|e| DeliveryError::Provider {
                channel: OtpChannel::Sms,
                message: format!("malformed response: {e}"),
            })?;

        Ok(DeliveryReceipt {
            channel: OtpChannel::Sms,
            message_id: parsed.sid,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> TwilioConfig {
        TwilioConfig {
            api_base: default_api_base(),
            account_sid: "AC123".to_string(),
            auth_token: "secret".to_string(),
            from_number: "+15005550006".to_string(),
            request_timeout_seconds: 5,
        }
    }

    #[test]
    fn test_new_builds_client_with_timeout() {
        assert!(TwilioSmsProvider::new(config()).is_ok());
    }

    #[test]
    fn test_availability_requires_credentials() {
        assert!(TwilioSmsProvider::new(config()).unwrap().is_available());

        let mut incomplete = config();
        incomplete.auth_token = String::new();
        assert!(!TwilioSmsProvider::new(incomplete).unwrap().is_available());
    }

    #[test]
    fn test_messages_url() {
        let provider = TwilioSmsProvider::new(config()).unwrap();
        assert_eq!(
            provider.messages_url(),
            "https://api.twilio.com/2010-04-01/Accounts/AC123/Messages.json"
        );
    }

    #[test]
    fn test_message_body_contains_code_and_expiry() {
        let body = TwilioSmsProvider::message_body("123456", 5);
        assert!(body.contains("123456"));
        assert!(body.contains("5 phut"));
    }
}
