//! Storage traits for OTP Gate.
//!
//! Adapters implement these traits to back the service with a concrete
//! store (in-memory, Redis, etc). All operations must be safe under
//! concurrent access for the same key: `increment_attempts` may not lose
//! updates and `take` is the single linearization point for successful
//! verification.

use async_trait::async_trait;
use chrono::Duration;

use crate::error::OtpResult;
use crate::record::OtpRecord;

/// Storage for pending OTP records, keyed by `(phone, request_id)`.
#[async_trait]
pub trait OtpStore: Send + Sync {
    /// Stores a record if no live record exists for the same key.
    ///
    /// Returns false if a live (non-expired) record is already present.
    async fn put(&self, record: OtpRecord) -> OtpResult<bool>;

    /// Retrieves a record if present.
    ///
    /// Expired records are still returned so callers can tell expiry apart
    /// from absence; reaping is left to `delete` and `purge_expired`.
    async fn get(&self, phone: &str, request_id: &str) -> OtpResult<Option<OtpRecord>>;

    /// Atomically increments the attempt counter, returning the new count,
    /// or `None` if the record is absent or expired.
    async fn increment_attempts(&self, phone: &str, request_id: &str) -> OtpResult<Option<u32>>;

    /// Atomically removes and returns a record.
    ///
    /// Of two racing callers, exactly one observes `Some`; the loser sees
    /// `None`.
    async fn take(&self, phone: &str, request_id: &str) -> OtpResult<Option<OtpRecord>>;

    /// Deletes a record. Returns true if something was removed.
    async fn delete(&self, phone: &str, request_id: &str) -> OtpResult<bool>;

    /// Removes all expired records, returning how many were purged.
    async fn purge_expired(&self) -> OtpResult<usize>;
}

/// A key with its sliding-window quota.
#[derive(Debug, Clone)]
pub struct RateQuota {
    /// Counter key (phone number or IP address).
    pub key: String,
    /// Maximum events within the window.
    pub max: u32,
    /// Window length.
    pub window: Duration,
}

impl RateQuota {
    /// Creates a new quota.
    pub fn new(key: impl Into<String>, max: u32, window: Duration) -> Self {
        Self {
            key: key.into(),
            max,
            window,
        }
    }
}

/// Result of a rate limit consume attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RateDecision {
    /// Both counters were below their caps; both were incremented.
    Allowed {
        /// Remaining sends for the phone counter after this consume.
        remaining_phone: u32,
        /// Remaining sends for the IP counter, if one was supplied.
        remaining_ip: Option<u32>,
    },
    /// At least one counter was at its cap; neither was incremented.
    Limited {
        /// Seconds until the oldest event in the saturated window falls out.
        retry_after_seconds: u64,
    },
}

impl RateDecision {
    /// Returns true if the consume was allowed.
    pub fn is_allowed(&self) -> bool {
        matches!(self, RateDecision::Allowed { .. })
    }
}

/// Sliding-window counters for send-side rate limiting.
///
/// The pair consume is all-or-nothing: a rejection on either key must not
/// consume budget from the other.
#[async_trait]
pub trait RateCounterStore: Send + Sync {
    /// Checks both quotas and commits both events only if both pass.
    async fn try_consume_pair(
        &self,
        phone: &RateQuota,
        ip: Option<&RateQuota>,
    ) -> OtpResult<RateDecision>;

    /// Read-only remaining budget for a quota; never mutates state.
    async fn remaining(&self, quota: &RateQuota) -> OtpResult<u32>;

    /// Clears the counter for a key (admin operation).
    async fn reset(&self, key: &str) -> OtpResult<()>;
}
