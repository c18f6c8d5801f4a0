//! Delivery provider trait and shared types.

use async_trait::async_trait;
use otp_gate_core::record::OtpChannel;
use thiserror::Error;

/// Context handed to providers alongside the code.
#[derive(Debug, Clone, Default)]
pub struct DeliveryMeta {
    /// Request ID, forwarded to providers that support tracking.
    pub request_id: String,
    /// Code expiry in minutes, for message templates.
    pub expiry_minutes: u64,
}

impl DeliveryMeta {
    /// Creates delivery metadata.
    pub fn new(request_id: impl Into<String>, expiry_minutes: u64) -> Self {
        Self {
            request_id: request_id.into(),
            expiry_minutes,
        }
    }
}

/// Result of a successful send.
#[derive(Debug, Clone)]
pub struct DeliveryReceipt {
    /// Channel that accepted the message.
    pub channel: OtpChannel,
    /// Provider-specific message or transaction ID, if any.
    pub message_id: Option<String>,
}

/// Errors from delivery attempts.
#[derive(Debug, Error)]
pub enum DeliveryError {
    /// The provider rejected the message or responded with an error.
    #[error("{channel} provider error: {message}")]
    Provider {
        channel: OtpChannel,
        message: String,
    },

    /// The provider did not respond within the per-attempt timeout.
    #[error("{channel} provider timed out")]
    Timeout { channel: OtpChannel },

    /// The provider is not configured or disabled.
    #[error("{channel} provider unavailable")]
    Unavailable { channel: OtpChannel },

    /// The HTTP client for a provider could not be constructed.
    #[error("failed to build HTTP client for {channel}: {message}")]
    ClientBuild {
        channel: OtpChannel,
        message: String,
    },

    /// Every channel in the order failed; nothing was sent.
    #[error("all delivery channels failed")]
    AllChannelsFailed,
}

/// A single OTP delivery backend.
///
/// Implementations must bound each send with a timeout so the orchestrator
/// is never blocked indefinitely.
#[async_trait]
pub trait DeliveryProvider: Send + Sync {
    /// The channel this provider serves.
    fn channel(&self) -> OtpChannel;

    /// Whether the provider is configured and enabled.
    fn is_available(&self) -> bool;

    /// Provider name for logging.
    fn name(&self) -> &'static str;

    /// Sends the code to the phone (E.164).
    async fn send(
        &self,
        phone: &str,
        code: &str,
        meta: &DeliveryMeta,
    ) -> Result<DeliveryReceipt, DeliveryError>;
}
