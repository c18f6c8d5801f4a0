//! # OTP Gate Service
//!
//! Orchestration layer tying together phone normalization, rate limiting,
//! code generation, delivery, and the verification state machine. The HTTP
//! surface in `otp_gate_server` is a thin shell over [`OtpService`].

mod rate_limit;
mod service;

pub use rate_limit::RateLimiter;
pub use service::{OtpService, OtpServiceBuilder, SendOtp, SendOutcome, VerifyOutcome};
