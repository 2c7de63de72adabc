//! Push provider adapters.
//!
//! - `FcmPushProvider` - Firebase Cloud Messaging HTTP v1
//! - `SandboxPushProvider` - In-process provider for local runs and tests

mod fcm;
mod sandbox;

pub use fcm::{FcmConfig, FcmPushProvider};
pub use sandbox::SandboxPushProvider;
