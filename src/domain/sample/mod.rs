//! Sample domain module.
//!
//! Laboratory samples move through a regulated lifecycle. Which moves are
//! legal is decided by the guard table in [`state`]; the [`Sample`]
//! aggregate plans and applies transitions and keeps the history invariant.

mod aggregate;
mod errors;
mod events;
mod state;

pub use aggregate::{Actor, Rejection, Sample, SampleOwner, TransitionCommit, TransitionEntry};
pub use errors::TransitionError;
pub use events::SampleStateChanged;
pub use state::{Guard, GuardContext, SampleState, UnmetCondition};
