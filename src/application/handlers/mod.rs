//! Application handlers.
//!
//! Command and query handlers that orchestrate domain operations.

pub mod notification;
pub mod sample;

pub use notification::{
    ClientTokens, DeviceTokenRegistry, DispatchConfig, InboxConfig, InboxError,
    NotificationDispatcher, NotificationInbox, PlatformTokenCount, RealtimeNotification,
    RegisterDeviceCommand, RegistryError, NOTIFICATION_EVENT,
};
pub use sample::{GetSampleHandler, SampleStateMachine, SampleView, TransitionSampleCommand};
