//! # OTP Gate Delivery
//!
//! Delivery channels for OTP codes. The primary channel is a Zalo ZNS push
//! message; SMS (Twilio) is the fallback. The dispatcher tries channels in
//! order and fails over on the first error without retrying the failed
//! channel.

mod dispatcher;
mod provider;
mod twilio;
mod zalo;

pub use dispatcher::DeliveryDispatcher;
pub use provider::{DeliveryError, DeliveryMeta, DeliveryProvider, DeliveryReceipt};
pub use twilio::{TwilioConfig, TwilioSmsProvider};
pub use zalo::{ZaloConfig, ZaloZnsProvider};
