//! Send-side rate limiting over a counter store.

use chrono::Duration;
use otp_gate_core::{OtpError, OtpResult, RateCounterStore, RateDecision, RateLimitConfig, RateQuota};
use std::sync::Arc;

/// Sliding-window limiter for OTP sends.
///
/// Keeps one counter per phone number and one per client IP. A send is
/// admitted only when both counters are below their caps; a rejection on
/// either consumes no budget from the other.
pub struct RateLimiter {
    store: Arc<dyn RateCounterStore>,
    config: RateLimitConfig,
}

impl RateLimiter {
    /// Creates a limiter backed by the given counter store.
    pub fn new(store: Arc<dyn RateCounterStore>, config: RateLimitConfig) -> Self {
        Self { store, config }
    }

    fn window(&self) -> Duration {
        Duration::seconds(self.config.window_seconds as i64)
    }

    fn phone_quota(&self, phone: &str) -> RateQuota {
        RateQuota::new(
            format!("phone:{phone}"),
            self.config.max_sends_per_phone,
            self.window(),
        )
    }

    fn ip_quota(&self, ip: &str) -> RateQuota {
        RateQuota::new(
            format!("ip:{ip}"),
            self.config.max_sends_per_ip,
            self.window(),
        )
    }

    /// Admits or rejects one send for the phone and optional client IP.
    ///
    /// On success returns the remaining budgets after the consume. On
    /// rejection returns `RateLimitExceeded` with the seconds until the
    /// saturated window frees a slot.
    pub async fn check_and_consume(
        &self,
        phone: &str,
        ip: Option<&str>,
    ) -> OtpResult<(u32, Option<u32>)> {
        let phone_quota = self.phone_quota(phone);
        let ip_quota = ip.map(|ip| self.ip_quota(ip));

        let decision = self
            .store
            .try_consume_pair(&phone_quota, ip_quota.as_ref())
            .await?;

        match decision {
            RateDecision::Allowed {
                remaining_phone,
                remaining_ip,
            } => Ok((remaining_phone, remaining_ip)),
            RateDecision::Limited {
                retry_after_seconds,
            } => {
                tracing::warn!(
                    key = %phone_quota.key,
                    retry_after_seconds,
                    "OTP send rate limited"
                );
                Err(OtpError::RateLimitExceeded {
                    retry_after_seconds,
                })
            }
        }
    }

    /// Remaining send budget for a phone, without consuming.
    pub async fn remaining_phone(&self, phone: &str) -> OtpResult<u32> {
        self.store.remaining(&self.phone_quota(phone)).await
    }

    /// Remaining send budget for an IP, without consuming.
    pub async fn remaining_ip(&self, ip: &str) -> OtpResult<u32> {
        self.store.remaining(&self.ip_quota(ip)).await
    }

    /// Clears the counter for a phone (admin operation).
    pub async fn reset_phone(&self, phone: &str) -> OtpResult<()> {
        self.store.reset(&format!("phone:{phone}")).await
    }

    /// Clears the counter for an IP (admin operation).
    pub async fn reset_ip(&self, ip: &str) -> OtpResult<()> {
        self.store.reset(&format!("ip:{ip}")).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use otp_gate_adapter_memory::MemoryAdapter;

    fn limiter(max_phone: u32, max_ip: u32) -> RateLimiter {
        RateLimiter::new(
            Arc::new(MemoryAdapter::new()),
            RateLimitConfig::new(max_phone, max_ip, 3600),
        )
    }

    #[tokio::test]
    async fn test_consume_until_limit() {
        let limiter = limiter(2, 10);

        let (remaining, _) = limiter
            .check_and_consume("+84912345678", None)
            .await
            .unwrap();
        assert_eq!(remaining, 1);

        let (remaining, _) = limiter
            .check_and_consume("+84912345678", None)
            .await
            .unwrap();
        assert_eq!(remaining, 0);

        let err = limiter
            .check_and_consume("+84912345678", None)
            .await
            .unwrap_err();
        assert!(matches!(err, OtpError::RateLimitExceeded { .. }));
    }

    #[tokio::test]
    async fn test_phone_and_ip_counters_are_independent_keys() {
        let limiter = limiter(5, 20);

        let (remaining_phone, remaining_ip) = limiter
            .check_and_consume("+84912345678", Some("10.0.0.1"))
            .await
            .unwrap();
        assert_eq!(remaining_phone, 4);
        assert_eq!(remaining_ip, Some(19));

        // A different phone from the same IP shares only the IP budget.
        let (remaining_phone, remaining_ip) = limiter
            .check_and_consume("+84987654321", Some("10.0.0.1"))
            .await
            .unwrap();
        assert_eq!(remaining_phone, 4);
        assert_eq!(remaining_ip, Some(18));
    }

    #[tokio::test]
    async fn test_ip_rejection_preserves_phone_budget() {
        let limiter = limiter(5, 1);

        limiter
            .check_and_consume("+84912345678", Some("10.0.0.1"))
            .await
            .unwrap();

        // IP cap hit; the phone counter must not advance.
        let err = limiter
            .check_and_consume("+84987654321", Some("10.0.0.1"))
            .await
            .unwrap_err();
        assert!(matches!(err, OtpError::RateLimitExceeded { .. }));
        assert_eq!(limiter.remaining_phone("+84987654321").await.unwrap(), 5);
    }

    #[tokio::test]
    async fn test_reset_restores_budget() {
        let limiter = limiter(1, 10);

        limiter
            .check_and_consume("+84912345678", None)
            .await
            .unwrap();
        assert_eq!(limiter.remaining_phone("+84912345678").await.unwrap(), 0);

        limiter.reset_phone("+84912345678").await.unwrap();
        assert_eq!(limiter.remaining_phone("+84912345678").await.unwrap(), 1);
    }
}
