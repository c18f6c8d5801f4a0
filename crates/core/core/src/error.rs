//! Error types for OTP Gate.
//!
//! This module defines the `OtpError` enum which represents all possible
//! errors that can occur during the send/verify flow.

use thiserror::Error;

/// The main error type for OTP Gate operations.
///
/// Each variant maps to a distinct user-visible outcome: an expired code,
/// a wrong code, and an exhausted code all require different corrective
/// action from the caller, so they are never collapsed into one error.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum OtpError {
    // ==================== Validation Errors ====================
    /// The phone number could not be normalized to a supported E.164 number.
    #[error("Invalid phone number")]
    InvalidPhone,

    // ==================== Rate Limiting ====================
    /// Too many send attempts for this phone or IP within the window.
    #[error("Rate limit exceeded. Try again in {retry_after_seconds} seconds")]
    RateLimitExceeded { retry_after_seconds: u64 },

    // ==================== Delivery Errors ====================
    /// Every configured delivery channel failed; no code was sent.
    #[error("Failed to deliver OTP via all channels")]
    DeliveryFailed,

    // ==================== Verification Errors ====================
    /// No pending OTP for this (phone, request_id) pair.
    #[error("OTP not found")]
    NotFound,

    /// The supplied code did not match; attempts remain.
    #[error("Invalid OTP code")]
    InvalidCode { remaining_attempts: u32 },

    /// The OTP expired before verification.
    #[error("OTP has expired, request a new one")]
    Expired,

    /// The attempt cap was hit; the caller must request a new OTP.
    #[error("Maximum verification attempts exceeded, request a new OTP")]
    MaxAttemptsExceeded,

    // ==================== Internal Errors ====================
    /// A storage operation failed.
    #[error("Store error: {message}")]
    Store { message: String },

    /// The configuration is invalid.
    #[error("Configuration error: {message}")]
    Config { message: String },
}

impl OtpError {
    /// Creates a new store error.
    pub fn store(message: impl Into<String>) -> Self {
        Self::Store {
            message: message.into(),
        }
    }

    /// Creates a new configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Returns true if this is a user-facing error (vs internal).
    pub fn is_user_error(&self) -> bool {
        !matches!(self, Self::Store { .. } | Self::Config { .. })
    }

    /// Returns an HTTP status code appropriate for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::InvalidPhone
            | Self::InvalidCode { .. }
            | Self::Expired
            | Self::MaxAttemptsExceeded => 400,
            Self::NotFound => 404,
            Self::RateLimitExceeded { .. } => 429,
            Self::DeliveryFailed | Self::Store { .. } | Self::Config { .. } => 500,
        }
    }
}

/// A Result type alias using OtpError.
pub type OtpResult<T> = Result<T, OtpError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = OtpError::InvalidPhone;
        assert_eq!(err.to_string(), "Invalid phone number");
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(OtpError::InvalidPhone.status_code(), 400);
        assert_eq!(OtpError::NotFound.status_code(), 404);
        assert_eq!(
            OtpError::RateLimitExceeded {
                retry_after_seconds: 60
            }
            .status_code(),
            429
        );
        assert_eq!(OtpError::DeliveryFailed.status_code(), 500);
    }

    #[test]
    fn test_verification_outcomes_are_distinct() {
        let invalid = OtpError::InvalidCode {
            remaining_attempts: 2,
        };
        assert_ne!(invalid.to_string(), OtpError::Expired.to_string());
        assert_ne!(
            OtpError::Expired.to_string(),
            OtpError::MaxAttemptsExceeded.to_string()
        );
    }

    #[test]
    fn test_is_user_error() {
        assert!(OtpError::InvalidPhone.is_user_error());
        assert!(!OtpError::store("connection refused").is_user_error());
    }
}
