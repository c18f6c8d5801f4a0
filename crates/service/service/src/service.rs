//! OTP send and verification orchestration.

use chrono::{DateTime, Duration, Utc};
use otp_gate_core::{
    mask_phone, normalize_phone, CodeGenerator, CodeHasher, OtpChannel, OtpConfig, OtpError,
    OtpRecord, OtpResult, OtpStore, RateCounterStore,
};
use otp_gate_delivery::{DeliveryDispatcher, DeliveryMeta, DeliveryProvider};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::rate_limit::RateLimiter;

/// A request to send an OTP.
#[derive(Debug, Clone, Deserialize)]
pub struct SendOtp {
    /// Phone number in any accepted local or international form.
    pub phone: String,
    /// Channel names to try first, in order. Unknown names are ignored.
    #[serde(default)]
    pub preferred_channels: Vec<String>,
}

impl SendOtp {
    /// Creates a send request with the default channel order.
    pub fn new(phone: impl Into<String>) -> Self {
        Self {
            phone: phone.into(),
            preferred_channels: Vec::new(),
        }
    }

    /// Prepends a preferred channel.
    pub fn prefer(mut self, channel: OtpChannel) -> Self {
        self.preferred_channels.push(channel.as_str().to_string());
        self
    }
}

/// Result of a successful send.
#[derive(Debug, Clone, Serialize)]
pub struct SendOutcome {
    /// Opaque token the caller must echo back at verification.
    pub request_id: String,
    /// Channel that accepted the message.
    pub channel: OtpChannel,
    /// Seconds until the code expires.
    pub ttl_seconds: u64,
    /// Masked phone for display, e.g. `+8491***5678`.
    pub masked_phone: String,
    /// Remaining sends for this phone in the current window.
    pub remaining_phone: u32,
    /// Remaining sends for the client IP, when one was supplied.
    pub remaining_ip: Option<u32>,
}

/// Result of a successful verification.
#[derive(Debug, Clone, Serialize)]
pub struct VerifyOutcome {
    /// Phone number in E.164 format.
    pub phone: String,
    /// Request ID that was consumed.
    pub request_id: String,
    /// When the verification completed.
    pub verified_at: DateTime<Utc>,
}

/// The OTP orchestrator.
///
/// Owns the full send pipeline (normalize, rate limit, generate, deliver,
/// persist) and the verification state machine. A pending OTP moves to
/// exactly one terminal state: verified, expired, or exhausted.
pub struct OtpService {
    config: OtpConfig,
    store: Arc<dyn OtpStore>,
    rate_limiter: RateLimiter,
    dispatcher: DeliveryDispatcher,
    generator: CodeGenerator,
    hasher: CodeHasher,
}

impl OtpService {
    /// Starts building a service.
    pub fn builder() -> OtpServiceBuilder {
        OtpServiceBuilder::default()
    }

    /// Exposes the active configuration.
    pub fn config(&self) -> &OtpConfig {
        &self.config
    }

    fn parse_preferred(names: &[String]) -> Vec<OtpChannel> {
        names
            .iter()
            .filter_map(|name| {
                let parsed = OtpChannel::parse(name);
                if parsed.is_none() {
                    tracing::debug!(channel = %name, "ignoring unknown preferred channel");
                }
                parsed
            })
            .collect()
    }

    /// Generates and delivers a fresh OTP.
    ///
    /// The plaintext code is handed to the delivery provider and dropped;
    /// only the salted digest is persisted. Nothing is persisted when every
    /// delivery channel fails, so a stored record always corresponds to a
    /// code that reached a provider.
    pub async fn send(&self, request: SendOtp, client_ip: Option<&str>) -> OtpResult<SendOutcome> {
        let phone = normalize_phone(&request.phone)?;
        let masked = mask_phone(&phone);

        let (remaining_phone, remaining_ip) =
            self.rate_limiter.check_and_consume(&phone, client_ip).await?;

        let request_id = CodeGenerator::generate_request_id();
        let code = self.generator.generate();
        let salt = CodeHasher::generate_salt();
        let code_hash = self.hasher.hash(&code, &salt);

        let meta = DeliveryMeta::new(
            request_id.clone(),
            self.config.ttl_seconds.div_ceil(60),
        );
        let preferred = Self::parse_preferred(&request.preferred_channels);

        let receipt = self
            .dispatcher
            .send_with_fallback(&preferred, &phone, &code, &meta)
            .await
            .map_err(|err| {
                tracing::error!(phone = %masked, error = %err, "OTP delivery failed");
                OtpError::DeliveryFailed
            })?;

        let record = OtpRecord::new(
            phone.clone(),
            request_id.clone(),
            code_hash,
            salt,
            receipt.channel,
            Duration::seconds(self.config.ttl_seconds as i64),
            self.config.max_verification_attempts,
        );

        // Request IDs are fresh UUIDs, so a live duplicate means the store
        // is misbehaving.
        if !self.store.put(record).await? {
            return Err(OtpError::store("duplicate request id"));
        }

        tracing::info!(
            phone = %masked,
            request_id = %request_id,
            channel = %receipt.channel,
            "OTP sent"
        );

        Ok(SendOutcome {
            request_id,
            channel: receipt.channel,
            ttl_seconds: self.config.ttl_seconds,
            masked_phone: masked,
            remaining_phone,
            remaining_ip,
        })
    }

    /// Verifies a submitted code against the pending OTP.
    ///
    /// Expiry is checked before the code, so a correct code for an expired
    /// OTP still fails with `Expired`. A matching code consumes the record
    /// atomically; of two racing verifies exactly one succeeds and the
    /// other observes `NotFound`.
    pub async fn verify(
        &self,
        phone: &str,
        request_id: &str,
        code: &str,
    ) -> OtpResult<VerifyOutcome> {
        let phone = normalize_phone(phone)?;
        let masked = mask_phone(&phone);

        let record = self
            .store
            .get(&phone, request_id)
            .await?
            .ok_or(OtpError::NotFound)?;

        if record.is_expired() {
            self.store.delete(&phone, request_id).await?;
            tracing::info!(phone = %masked, request_id, "OTP expired at verification");
            return Err(OtpError::Expired);
        }

        // An exhausted record stays in the store until its TTL reaps it, so
        // every attempt after the cap reports exhaustion, not absence.
        if record.attempts_exhausted() {
            return Err(OtpError::MaxAttemptsExceeded);
        }

        if self.hasher.verify(code, &record.salt, &record.code_hash) {
            // The take is the single success point; a racing verify that
            // loses sees the record already gone.
            match self.store.take(&phone, request_id).await? {
                Some(_) => {
                    tracing::info!(phone = %masked, request_id, "OTP verified");
                    Ok(VerifyOutcome {
                        phone,
                        request_id: request_id.to_string(),
                        verified_at: Utc::now(),
                    })
                }
                None => Err(OtpError::NotFound),
            }
        } else {
            let attempts = self
                .store
                .increment_attempts(&phone, request_id)
                .await?
                .ok_or(OtpError::NotFound)?;

            if attempts >= record.max_attempts {
                tracing::warn!(phone = %masked, request_id, "OTP attempts exhausted");
                return Err(OtpError::MaxAttemptsExceeded);
            }

            let remaining = record.max_attempts - attempts;
            tracing::info!(
                phone = %masked,
                request_id,
                remaining_attempts = remaining,
                "OTP code mismatch"
            );
            Err(OtpError::InvalidCode {
                remaining_attempts: remaining,
            })
        }
    }

    /// Clears the send counters for a phone (admin operation).
    pub async fn reset_rate_limit(&self, phone: &str) -> OtpResult<String> {
        let phone = normalize_phone(phone)?;
        self.rate_limiter.reset_phone(&phone).await?;
        tracing::info!(phone = %mask_phone(&phone), "rate limit counters reset");
        Ok(phone)
    }

    /// Removes expired records from the store.
    pub async fn purge_expired(&self) -> OtpResult<usize> {
        self.store.purge_expired().await
    }
}

/// Builder for [`OtpService`].
#[derive(Default)]
pub struct OtpServiceBuilder {
    config: Option<OtpConfig>,
    store: Option<Arc<dyn OtpStore>>,
    counters: Option<Arc<dyn RateCounterStore>>,
    providers: Vec<Arc<dyn DeliveryProvider>>,
}

impl OtpServiceBuilder {
    /// Sets the OTP configuration. Defaults apply when omitted.
    pub fn config(mut self, config: OtpConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Sets the record store.
    pub fn store(mut self, store: Arc<dyn OtpStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Sets the rate counter store.
    pub fn counters(mut self, counters: Arc<dyn RateCounterStore>) -> Self {
        self.counters = Some(counters);
        self
    }

    /// Registers a delivery provider.
    pub fn provider(mut self, provider: Arc<dyn DeliveryProvider>) -> Self {
        self.providers.push(provider);
        self
    }

    /// Builds the service.
    pub fn build(self) -> OtpResult<OtpService> {
        let config = self.config.unwrap_or_default();
        let store = self
            .store
            .ok_or_else(|| OtpError::config("an OTP store is required"))?;
        let counters = self
            .counters
            .ok_or_else(|| OtpError::config("a rate counter store is required"))?;
        if self.providers.is_empty() {
            return Err(OtpError::config("at least one delivery provider is required"));
        }
        if config.code_length == 0 {
            return Err(OtpError::config("code length must be positive"));
        }

        Ok(OtpService {
            generator: CodeGenerator::new(config.code_length),
            rate_limiter: RateLimiter::new(counters, config.rate_limit.clone()),
            dispatcher: DeliveryDispatcher::new(self.providers),
            hasher: CodeHasher,
            config,
            store,
        })
    }
}
