//! Content draft workflow engine.
//!
//! [`machine`] is the pure wizard reducer, [`session::DraftSession`] executes
//! its effects against a [`store::ContentStore`] and owns the debounced
//! autosave task.

mod autosave;
pub mod machine;
pub mod session;

pub use machine::{
    Action, DraftState, DraftStateMachine, Effect, ErrorNote, Intent, PendingWrite, PersistRequest,
    Phase, Transition,
};
pub use session::DraftSession;
