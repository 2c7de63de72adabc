//! Sample handlers.

mod get_sample;
mod transition_sample;

pub use get_sample::{GetSampleHandler, SampleView};
pub use transition_sample::{SampleStateMachine, TransitionSampleCommand};
