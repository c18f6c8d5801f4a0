//! Server configuration.

use otp_gate_core::OtpConfig;
use otp_gate_delivery::{TwilioConfig, ZaloConfig};
use serde::{Deserialize, Serialize};

/// Server-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Port to listen on.
    pub port: u16,
    /// Host to bind to.
    pub host: String,
    /// Log filter, e.g. "info" or "otp_gate_service=debug".
    pub log_level: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 8000,
            host: "0.0.0.0".to_string(),
            log_level: "info".to_string(),
        }
    }
}

/// Delivery provider credentials. Providers without a section are not
/// registered, so a deployment can run Zalo-only or SMS-only.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProvidersConfig {
    /// Zalo ZNS provider configuration.
    pub zalo: Option<ZaloConfig>,
    /// Twilio SMS provider configuration.
    pub twilio: Option<TwilioConfig>,
}

/// Top-level application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// HTTP server settings.
    #[serde(default)]
    pub server: ServerConfig,
    /// OTP generation and verification settings.
    #[serde(default)]
    pub otp: OtpConfig,
    /// Delivery provider credentials.
    #[serde(default)]
    pub providers: ProvidersConfig,
}

/// Loads configuration from a TOML file. Provider secrets left empty in
/// the file are filled from the environment.
pub fn load_config(path: &str) -> Result<AppConfig, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::IoError(e.to_string()))?;
    let mut config: AppConfig =
        toml::from_str(&content).map_err(|e| ConfigError::ParseError(e.to_string()))?;
    apply_env_secrets(&mut config);
    Ok(config)
}

fn apply_env_secrets(config: &mut AppConfig) {
    fn fill(target: &mut String, var: &str) {
        if target.is_empty() {
            if let Ok(value) = std::env::var(var) {
                *target = value;
            }
        }
    }

    if let Some(zalo) = &mut config.providers.zalo {
        fill(&mut zalo.access_token, "OTP_GATE_ZALO_ACCESS_TOKEN");
    }
    if let Some(twilio) = &mut config.providers.twilio {
        fill(&mut twilio.account_sid, "OTP_GATE_TWILIO_ACCOUNT_SID");
        fill(&mut twilio.auth_token, "OTP_GATE_TWILIO_AUTH_TOKEN");
    }
}

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(String),
    #[error("Parse error: {0}")]
    ParseError(String),
}
