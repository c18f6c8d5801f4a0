//! Stored OTP record and delivery channel types.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Delivery channel for an OTP message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OtpChannel {
    /// Zalo ZNS push message (primary).
    Zalo,
    /// SMS text message (fallback).
    Sms,
}

impl OtpChannel {
    /// String form used in API responses and configuration.
    pub fn as_str(&self) -> &'static str {
        match self {
            OtpChannel::Zalo => "zalo",
            OtpChannel::Sms => "sms",
        }
    }

    /// Parses a channel name, case-insensitive. Unknown names yield `None`.
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "zalo" => Some(OtpChannel::Zalo),
            "sms" => Some(OtpChannel::Sms),
            _ => None,
        }
    }
}

impl std::fmt::Display for OtpChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A pending OTP awaiting verification.
///
/// Keyed by `(phone, request_id)`. Holds only the salted digest of the
/// code, never the plaintext.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OtpRecord {
    /// Phone number in E.164 format.
    pub phone: String,
    /// Opaque unique token generated at send time.
    pub request_id: String,
    /// Salted HMAC-SHA256 digest of the code, hex-encoded.
    pub code_hash: String,
    /// Per-record salt, hex-encoded.
    pub salt: String,
    /// Channel the code was delivered through.
    pub channel: OtpChannel,
    /// Verification attempts made so far.
    pub attempts: u32,
    /// Maximum allowed attempts.
    pub max_attempts: u32,
    /// When this record was created.
    pub created_at: DateTime<Utc>,
    /// When this record expires.
    pub expires_at: DateTime<Utc>,
    /// Whether the code was verified. Set true exactly once.
    pub verified: bool,
}

impl OtpRecord {
    /// Creates a new pending record expiring `ttl` from now.
    pub fn new(
        phone: impl Into<String>,
        request_id: impl Into<String>,
        code_hash: impl Into<String>,
        salt: impl Into<String>,
        channel: OtpChannel,
        ttl: Duration,
        max_attempts: u32,
    ) -> Self {
        let now = Utc::now();
        Self {
            phone: phone.into(),
            request_id: request_id.into(),
            code_hash: code_hash.into(),
            salt: salt.into(),
            channel,
            attempts: 0,
            max_attempts,
            created_at: now,
            expires_at: now + ttl,
            verified: false,
        }
    }

    /// Checks if the record has expired.
    pub fn is_expired(&self) -> bool {
        Utc::now() > self.expires_at
    }

    /// Checks if the attempt cap has been reached.
    pub fn attempts_exhausted(&self) -> bool {
        self.attempts >= self.max_attempts
    }

    /// Remaining verification attempts.
    pub fn remaining_attempts(&self) -> u32 {
        self.max_attempts.saturating_sub(self.attempts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(ttl: Duration, max_attempts: u32) -> OtpRecord {
        OtpRecord::new(
            "+84912345678",
            "req-1",
            "digest",
            "salt",
            OtpChannel::Zalo,
            ttl,
            max_attempts,
        )
    }

    #[test]
    fn test_fresh_record() {
        let rec = record(Duration::seconds(300), 5);
        assert!(!rec.is_expired());
        assert!(!rec.verified);
        assert_eq!(rec.attempts, 0);
        assert_eq!(rec.remaining_attempts(), 5);
    }

    #[test]
    fn test_expiry() {
        let rec = record(Duration::seconds(-1), 5);
        assert!(rec.is_expired());
    }

    #[test]
    fn test_attempt_exhaustion() {
        let mut rec = record(Duration::seconds(300), 2);
        rec.attempts = 2;
        assert!(rec.attempts_exhausted());
        assert_eq!(rec.remaining_attempts(), 0);
    }

    #[test]
    fn test_channel_parse() {
        assert_eq!(OtpChannel::parse("zalo"), Some(OtpChannel::Zalo));
        assert_eq!(OtpChannel::parse("SMS"), Some(OtpChannel::Sms));
        assert_eq!(OtpChannel::parse("email"), None);
    }
}
