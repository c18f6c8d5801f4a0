//! # OTP Gate Memory Adapter
//!
//! An in-memory storage adapter for OTP Gate, suitable for testing and
//! single-node deployments. Data is lost when the process exits.
//!
//! Implements both [`OtpStore`] and [`RateCounterStore`]. All mutations go
//! through a single lock per store, which makes the conditional updates
//! (`put` if absent, `take`, pair consume) atomic without CAS loops.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use otp_gate_core::error::OtpResult;
use otp_gate_core::record::OtpRecord;
use otp_gate_core::traits::{OtpStore, RateCounterStore, RateDecision, RateQuota};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

/// In-memory storage adapter for OTP Gate.
#[derive(Debug, Clone, Default)]
pub struct MemoryAdapter {
    records: Arc<RwLock<HashMap<String, OtpRecord>>>,
    counters: Arc<Mutex<HashMap<String, Vec<DateTime<Utc>>>>>,
}

impl MemoryAdapter {
    /// Creates a new in-memory adapter.
    pub fn new() -> Self {
        Self::default()
    }

    /// Clears all stored data.
    pub async fn clear(&self) {
        self.records.write().await.clear();
        self.counters.lock().await.clear();
    }

    /// Returns the number of pending OTP records.
    pub async fn record_count(&self) -> usize {
        self.records.read().await.len()
    }

    fn build_key(phone: &str, request_id: &str) -> String {
        format!("{phone}:{request_id}")
    }

    fn events_in_window(events: &[DateTime<Utc>], quota: &RateQuota, now: DateTime<Utc>) -> usize {
        events.iter().filter(|t| now - **t < quota.window).count()
    }
}

#[async_trait]
impl OtpStore for MemoryAdapter {
    async fn put(&self, record: OtpRecord) -> OtpResult<bool> {
        let key = Self::build_key(&record.phone, &record.request_id);
        let mut records = self.records.write().await;

        if let Some(existing) = records.get(&key) {
            if !existing.is_expired() {
                return Ok(false);
            }
        }

        records.insert(key, record);
        Ok(true)
    }

    async fn get(&self, phone: &str, request_id: &str) -> OtpResult<Option<OtpRecord>> {
        let key = Self::build_key(phone, request_id);
        let records = self.records.read().await;
        Ok(records.get(&key).cloned())
    }

    async fn increment_attempts(&self, phone: &str, request_id: &str) -> OtpResult<Option<u32>> {
        let key = Self::build_key(phone, request_id);
        let mut records = self.records.write().await;

        match records.get_mut(&key) {
            Some(record) if record.is_expired() => {
                records.remove(&key);
                Ok(None)
            }
            Some(record) => {
                record.attempts += 1;
                Ok(Some(record.attempts))
            }
            None => Ok(None),
        }
    }

    async fn take(&self, phone: &str, request_id: &str) -> OtpResult<Option<OtpRecord>> {
        let key = Self::build_key(phone, request_id);
        let mut records = self.records.write().await;

        match records.remove(&key) {
            Some(record) if record.is_expired() => Ok(None),
            other => Ok(other),
        }
    }

    async fn delete(&self, phone: &str, request_id: &str) -> OtpResult<bool> {
        let key = Self::build_key(phone, request_id);
        let mut records = self.records.write().await;
        Ok(records.remove(&key).is_some())
    }

    async fn purge_expired(&self) -> OtpResult<usize> {
        let mut records = self.records.write().await;
        let before = records.len();
        records.retain(|_, record| !record.is_expired());
        let purged = before - records.len();
        if purged > 0 {
            tracing::debug!(purged, "purged expired OTP records");
        }
        Ok(purged)
    }
}

#[async_trait]
impl RateCounterStore for MemoryAdapter {
    async fn try_consume_pair(
        &self,
        phone: &RateQuota,
        ip: Option<&RateQuota>,
    ) -> OtpResult<RateDecision> {
        let mut counters = self.counters.lock().await;
        let now = Utc::now();

        // Prune both windows before deciding, so stale events never count.
        let phone_events = counters.entry(phone.key.clone()).or_default();
        phone_events.retain(|t| now - *t < phone.window);
        let phone_count = phone_events.len() as u32;

        let ip_count = match ip {
            Some(quota) => {
                let events = counters.entry(quota.key.clone()).or_default();
                events.retain(|t| now - *t < quota.window);
                Some(events.len() as u32)
            }
            None => None,
        };

        // Both checks pass before either counter is committed.
        let saturated = if phone_count >= phone.max {
            Some(phone)
        } else {
            ip.filter(|quota| ip_count.unwrap_or(0) >= quota.max)
        };

        if let Some(quota) = saturated {
            let oldest = counters
                .get(&quota.key)
                .and_then(|events| events.iter().min().copied())
                .unwrap_or(now);
            let retry_after = (oldest + quota.window - now).num_seconds().max(1) as u64;
            return Ok(RateDecision::Limited {
                retry_after_seconds: retry_after,
            });
        }

        counters.entry(phone.key.clone()).or_default().push(now);
        if let Some(quota) = ip {
            counters.entry(quota.key.clone()).or_default().push(now);
        }

        Ok(RateDecision::Allowed {
            remaining_phone: phone.max - phone_count - 1,
            remaining_ip: ip.map(|quota| quota.max - ip_count.unwrap_or(0) - 1),
        })
    }

    async fn remaining(&self, quota: &RateQuota) -> OtpResult<u32> {
        let counters = self.counters.lock().await;
        let now = Utc::now();
        let used = counters
            .get(&quota.key)
            .map(|events| Self::events_in_window(events, quota, now) as u32)
            .unwrap_or(0);
        Ok(quota.max.saturating_sub(used))
    }

    async fn reset(&self, key: &str) -> OtpResult<()> {
        self.counters.lock().await.remove(key);
        Ok(())
    }
}
