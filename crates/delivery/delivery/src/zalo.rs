//! Zalo ZNS (Zalo Notification Service) provider.
//!
//! Sending through ZNS requires an approved Official Account, a registered
//! message template containing an OTP placeholder, and an access token for
//! the Zalo Open API.

use async_trait::async_trait;
use otp_gate_core::phone::mask_phone;
use otp_gate_core::record::OtpChannel;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

use crate::provider::{DeliveryError, DeliveryMeta, DeliveryProvider, DeliveryReceipt};

/// Configuration for the Zalo ZNS provider.
///
/// Credentials may be left empty in the file and supplied through the
/// environment; an unconfigured provider reports itself unavailable.
#[derive(Debug, Clone, serde::Serialize, Deserialize)]
#[serde(default)]
pub struct ZaloConfig {
    /// ZNS API endpoint.
    pub api_endpoint: String,
    /// Access token from the Zalo Open API.
    pub access_token: String,
    /// Official Account ID.
    pub oa_id: String,
    /// Registered template ID for OTP messages.
    pub template_id: String,
    /// Application name injected into the template.
    pub app_name: String,
    /// Per-attempt request timeout in seconds.
    pub request_timeout_seconds: u64,
}

impl Default for ZaloConfig {
    fn default() -> Self {
        Self {
            api_endpoint: default_endpoint(),
            access_token: String::new(),
            oa_id: String::new(),
            template_id: String::new(),
            app_name: default_app_name(),
            request_timeout_seconds: default_timeout(),
        }
    }
}

fn default_endpoint() -> String {
    "https://business.openapi.zalo.me/message/template".to_string()
}

fn default_app_name() -> String {
    "OTP Gate".to_string()
}

fn default_timeout() -> u64 {
    5
}

#[derive(Debug, Deserialize)]
struct ZnsResponse {
    error: i64,
    #[serde(default)]
    message: String,
    #[serde(default)]
    data: Option<ZnsResponseData>,
}

#[derive(Debug, Deserialize)]
struct ZnsResponseData {
    msg_id: Option<String>,
}

/// Zalo ZNS push-message provider (primary channel).
pub struct ZaloZnsProvider {
    config: ZaloConfig,
    client: reqwest::Client,
}

impl ZaloZnsProvider {
    /// Creates a new provider with a bounded-timeout HTTP client.
    pub fn new(config: ZaloConfig) -> Result<Self, DeliveryError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_seconds))
            .build()
            .map_err(|e| DeliveryError::ClientBuild {
                channel: OtpChannel::Zalo,
                message: e.to_string(),
            })?;
        Ok(Self { config, client })
    }

    fn build_payload(&self, phone: &str, code: &str, meta: &DeliveryMeta) -> serde_json::Value {
        // ZNS expects 84xxxxxxxxx without the leading '+'.
        let zalo_phone = phone.trim_start_matches('+');

        json!({
            "phone": zalo_phone,
            "template_id": self.config.template_id,
            "template_data": {
                "otp_code": code,
                "expire_time": format!("{} phút", meta.expiry_minutes),
                "app_name": self.config.app_name,
            },
            "tracking_id": meta.request_id,
        })
    }
}

#[async_trait]
impl DeliveryProvider for ZaloZnsProvider {
    fn channel(&self) -> OtpChannel {
        OtpChannel::Zalo
    }

    fn is_available(&self) -> bool {
        !self.config.access_token.is_empty()
            && !self.config.oa_id.is_empty()
            && !self.config.template_id.is_empty()
    }

    fn name(&self) -> &'static str {
        "Zalo ZNS"
    }

    async fn send(
        &self,
        phone: &str,
        code: &str,
        meta: &DeliveryMeta,
    ) -> Result<DeliveryReceipt, DeliveryError> {
        tracing::info!(phone = %mask_phone(phone), request_id = %meta.request_id, "sending OTP via Zalo ZNS");

        let response = self
            .client
            .post(&self.config.api_endpoint)
            .header("access_token", &self.config.access_token)
            .json(&self.build_payload(phone, code, meta))
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    DeliveryError::Timeout {
                        channel: OtpChannel::Zalo,
                    }
                } else {
                    DeliveryError::Provider {
                        channel: OtpChannel::Zalo,
                        message: e.to_string(),
                    }
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(DeliveryError::Provider {
                channel: OtpChannel::Zalo,
                message: format!("HTTP {status}: {body}"),
            });
        }

        let parsed: ZnsResponse = response.json().await.map_err(|e| DeliveryError::Provider {
            channel: OtpChannel::Zalo,
            message: format!("malformed response: {e}"),
        })?;

        // ZNS reports failures with HTTP 200 and a non-zero error field.
        if parsed.error != 0 {
            return Err(DeliveryError::Provider {
                channel: OtpChannel::Zalo,
                message: format!("ZNS error {}: {}", parsed.error, parsed.message),
            });
        }

        Ok(DeliveryReceipt {
            channel: OtpChannel::Zalo,
            message_id: parsed.data.and_then(|d| d.msg_id),
        })
    }
}
