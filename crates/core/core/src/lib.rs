//! # OTP Gate Core
//!
//! This crate provides the foundational types and traits for the OTP Gate
//! phone-verification service. It defines the core data structures
//! (`OtpRecord`, `OtpChannel`), error types, phone normalization, code
//! generation/hashing, and the trait interfaces that storage adapters must
//! implement.

pub mod code;
pub mod config;
pub mod context;
pub mod error;
pub mod phone;
pub mod record;
pub mod traits;

// Re-export commonly used items at the crate root
pub use code::{CodeGenerator, CodeHasher};
pub use config::{OtpConfig, RateLimitConfig};
pub use context::RequestParts;
pub use error::{OtpError, OtpResult};
pub use phone::{mask_phone, normalize_phone};
pub use record::{OtpChannel, OtpRecord};
pub use traits::{OtpStore, RateCounterStore, RateDecision, RateQuota};
