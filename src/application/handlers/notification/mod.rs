//! Notification handlers: dispatch, device tokens, client inbox.

mod device_registry;
mod dispatcher;
mod inbox;

pub use device_registry::{
    ClientTokens, DeviceTokenRegistry, PlatformTokenCount, RegisterDeviceCommand, RegistryError,
};
pub use dispatcher::{
    DispatchConfig, NotificationDispatcher, RealtimeNotification, NOTIFICATION_EVENT,
};
pub use inbox::{InboxConfig, InboxError, NotificationInbox};
