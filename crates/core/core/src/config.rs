//! Configuration types for the OTP subsystem.

use serde::{Deserialize, Serialize};

/// Configuration for OTP generation, storage, and verification.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OtpConfig {
    /// Length of the numeric OTP code. Default: 6.
    pub code_length: usize,
    /// OTP time-to-live in seconds. Default: 300 (5 minutes).
    pub ttl_seconds: u64,
    /// Maximum verification attempts per OTP. Default: 5.
    pub max_verification_attempts: u32,
    /// Rate limiting configuration.
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
}

impl Default for OtpConfig {
    fn default() -> Self {
        Self {
            code_length: 6,
            ttl_seconds: 300, // 5 minutes
            max_verification_attempts: 5,
            rate_limit: RateLimitConfig::default(),
        }
    }
}

impl OtpConfig {
    /// Creates a new config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the code length.
    pub fn code_length(mut self, length: usize) -> Self {
        self.code_length = length;
        self
    }

    /// Sets the TTL in seconds.
    pub fn ttl_seconds(mut self, seconds: u64) -> Self {
        self.ttl_seconds = seconds;
        self
    }

    /// Sets the maximum verification attempts.
    pub fn max_verification_attempts(mut self, attempts: u32) -> Self {
        self.max_verification_attempts = attempts;
        self
    }

    /// Sets the rate limit configuration.
    pub fn rate_limit(mut self, rate_limit: RateLimitConfig) -> Self {
        self.rate_limit = rate_limit;
        self
    }
}

/// Configuration for send-side rate limiting.
///
/// Two independent sliding-window counters are kept, one per phone number
/// and one per client IP, sharing a window length.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Maximum OTP sends per phone number in the window. Default: 5.
    pub max_sends_per_phone: u32,
    /// Maximum OTP sends per IP address in the window. Default: 20.
    pub max_sends_per_ip: u32,
    /// Window length in seconds. Default: 3600 (1 hour).
    pub window_seconds: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_sends_per_phone: 5,
            max_sends_per_ip: 20,
            window_seconds: 3600, // 1 hour
        }
    }
}

impl RateLimitConfig {
    /// Creates a new rate limit config.
    pub fn new(max_sends_per_phone: u32, max_sends_per_ip: u32, window_seconds: u64) -> Self {
        Self {
            max_sends_per_phone,
            max_sends_per_ip,
            window_seconds,
        }
    }
}
