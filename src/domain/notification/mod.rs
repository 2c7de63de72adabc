//! Notification domain module.
//!
//! Records what a client was told about a sample, where it was delivered,
//! and which device addresses are still usable.

mod delivery;
mod device_token;
mod record;
pub mod templates;

pub use delivery::{codes, DeliveryFailure, DeliveryOutcome, PushPayload};
pub use device_token::{
    redact, validate_token, DeviceInfo, DeviceToken, Platform, MIN_TOKEN_LENGTH,
};
pub use record::{
    ChannelOutcomes, NotificationData, NotificationKind, NotificationRecord, NotificationStatus,
    PushChannelOutcome, UnreadSummary,
};
