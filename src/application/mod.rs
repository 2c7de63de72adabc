//! Application layer - Commands, Queries, and Handlers.
//!
//! This layer orchestrates domain operations and coordinates between ports.
//! Transitions are commands; notification listings and sample lookups are
//! queries. Post-commit work runs on the [`SideEffectRunner`].

pub mod handlers;
mod side_effects;

pub use handlers::{
    ClientTokens, DeviceTokenRegistry, DispatchConfig, GetSampleHandler, InboxConfig, InboxError,
    NotificationDispatcher, NotificationInbox, PlatformTokenCount, RegisterDeviceCommand,
    RegistryError, SampleStateMachine, SampleView, TransitionSampleCommand, NOTIFICATION_EVENT,
};
pub use side_effects::{SideEffectConfig, SideEffectRunner};
