//! Channel ordering and failover dispatch.

use otp_gate_core::phone::mask_phone;
use otp_gate_core::record::OtpChannel;
use std::collections::HashMap;
use std::sync::Arc;

use crate::provider::{DeliveryError, DeliveryMeta, DeliveryProvider, DeliveryReceipt};

/// Default channel order: push first, SMS fallback.
const DEFAULT_ORDER: [OtpChannel; 2] = [OtpChannel::Zalo, OtpChannel::Sms];

/// Dispatches OTP sends across registered providers with ordered failover.
///
/// A failed channel is never retried within one send; the dispatcher moves
/// straight to the next channel in the order.
pub struct DeliveryDispatcher {
    providers: HashMap<OtpChannel, Arc<dyn DeliveryProvider>>,
}

impl DeliveryDispatcher {
    /// Creates a dispatcher over the given providers.
    pub fn new(providers: Vec<Arc<dyn DeliveryProvider>>) -> Self {
        let mut map: HashMap<OtpChannel, Arc<dyn DeliveryProvider>> = HashMap::new();
        for provider in providers {
            tracing::info!(
                provider = provider.name(),
                channel = %provider.channel(),
                "registered OTP delivery provider"
            );
            map.insert(provider.channel(), provider);
        }
        Self { providers: map }
    }

    /// Resolves the channel order for a send.
    ///
    /// Preferred channels come first (unknown names are dropped by the
    /// caller at parse time); default channels are appended so a partial
    /// preference still has a fallback.
    pub fn channel_order(&self, preferred: &[OtpChannel]) -> Vec<OtpChannel> {
        let mut order: Vec<OtpChannel> = Vec::new();
        for channel in preferred.iter().chain(DEFAULT_ORDER.iter()) {
            if !order.contains(channel) {
                order.push(*channel);
            }
        }
        order
    }

    /// Attempts delivery through each channel in order, returning the first
    /// success. Fails with `AllChannelsFailed` if no channel accepts.
    pub async fn send_with_fallback(
        &self,
        preferred: &[OtpChannel],
        phone: &str,
        code: &str,
        meta: &DeliveryMeta,
    ) -> Result<DeliveryReceipt, DeliveryError> {
        let order = self.channel_order(preferred);

        for (i, channel) in order.iter().enumerate() {
            let Some(provider) = self.providers.get(channel) else {
                tracing::warn!(channel = %channel, "no provider registered for channel");
                continue;
            };

            if !provider.is_available() {
                tracing::warn!(provider = provider.name(), "provider not available, skipping");
                continue;
            }

            match provider.send(phone, code, meta).await {
                Ok(receipt) => {
                    tracing::info!(
                        channel = %receipt.channel,
                        message_id = receipt.message_id.as_deref().unwrap_or("-"),
                        request_id = %meta.request_id,
                        "OTP delivered"
                    );
                    return Ok(receipt);
                }
                Err(err) => {
                    tracing::warn!(
                        channel = %channel,
                        phone = %mask_phone(phone),
                        error = %err,
                        "delivery attempt failed"
                    );
                    if let Some(next) = order.get(i + 1) {
                        tracing::info!(next = %next, "falling back to next channel");
                    }
                }
            }
        }

        Err(DeliveryError::AllChannelsFailed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Provider stub that always succeeds or always fails.
    struct StubProvider {
        channel: OtpChannel,
        available: bool,
        fail: bool,
        calls: AtomicU32,
    }

    impl StubProvider {
        fn ok(channel: OtpChannel) -> Self {
            Self {
                channel,
                available: true,
                fail: false,
                calls: AtomicU32::new(0),
            }
        }

        fn failing(channel: OtpChannel) -> Self {
            Self {
                fail: true,
                ..Self::ok(channel)
            }
        }

        fn unavailable(channel: OtpChannel) -> Self {
            Self {
                available: false,
                ..Self::ok(channel)
            }
        }
    }

    #[async_trait]
    impl DeliveryProvider for StubProvider {
        fn channel(&self) -> OtpChannel {
            self.channel
        }

        fn is_available(&self) -> bool {
            self.available
        }

        fn name(&self) -> &'static str {
            "stub"
        }

        async fn send(
            &self,
            _phone: &str,
            _code: &str,
            _meta: &DeliveryMeta,
        ) -> Result<DeliveryReceipt, DeliveryError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                Err(DeliveryError::Provider {
                    channel: self.channel,
                    message: "simulated failure".to_string(),
                })
            } else {
                Ok(DeliveryReceipt {
                    channel: self.channel,
                    message_id: Some("msg-1".to_string()),
                })
            }
        }
    }

    fn meta() -> DeliveryMeta {
        DeliveryMeta::new("req-1", 5)
    }

    #[tokio::test]
    async fn test_primary_channel_wins() {
        let dispatcher = DeliveryDispatcher::new(vec![
            Arc::new(StubProvider::ok(OtpChannel::Zalo)),
            Arc::new(StubProvider::ok(OtpChannel::Sms)),
        ]);

        let receipt = dispatcher
            .send_with_fallback(&[], "+84912345678", "123456", &meta())
            .await
            .unwrap();
        assert_eq!(receipt.channel, OtpChannel::Zalo);
    }

    #[tokio::test]
    async fn test_fallback_on_primary_failure() {
        let primary = Arc::new(StubProvider::failing(OtpChannel::Zalo));
        let dispatcher = DeliveryDispatcher::new(vec![
            primary.clone(),
            Arc::new(StubProvider::ok(OtpChannel::Sms)),
        ]);

        let receipt = dispatcher
            .send_with_fallback(&[], "+84912345678", "123456", &meta())
            .await
            .unwrap();
        assert_eq!(receipt.channel, OtpChannel::Sms);
        // Primary was attempted exactly once, never retried.
        assert_eq!(primary.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_unavailable_provider_is_skipped() {
        let dispatcher = DeliveryDispatcher::new(vec![
            Arc::new(StubProvider::unavailable(OtpChannel::Zalo)),
            Arc::new(StubProvider::ok(OtpChannel::Sms)),
        ]);

        let receipt = dispatcher
            .send_with_fallback(&[], "+84912345678", "123456", &meta())
            .await
            .unwrap();
        assert_eq!(receipt.channel, OtpChannel::Sms);
    }

    #[tokio::test]
    async fn test_all_channels_failed() {
        let dispatcher = DeliveryDispatcher::new(vec![
            Arc::new(StubProvider::failing(OtpChannel::Zalo)),
            Arc::new(StubProvider::failing(OtpChannel::Sms)),
        ]);

        let err = dispatcher
            .send_with_fallback(&[], "+84912345678", "123456", &meta())
            .await
            .unwrap_err();
        assert!(matches!(err, DeliveryError::AllChannelsFailed));
    }

    #[tokio::test]
    async fn test_preferred_channel_reorders() {
        let dispatcher = DeliveryDispatcher::new(vec![
            Arc::new(StubProvider::ok(OtpChannel::Zalo)),
            Arc::new(StubProvider::ok(OtpChannel::Sms)),
        ]);

        assert_eq!(
            dispatcher.channel_order(&[OtpChannel::Sms]),
            vec![OtpChannel::Sms, OtpChannel::Zalo]
        );

        let receipt = dispatcher
            .send_with_fallback(&[OtpChannel::Sms], "+84912345678", "123456", &meta())
            .await
            .unwrap();
        assert_eq!(receipt.channel, OtpChannel::Sms);
    }
}
