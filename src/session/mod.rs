//! The map session: its state, the commands that change it and the
//! controller that runs them.

pub mod command;
pub mod controller;
pub mod state;

pub use command::{Command, Notice, Outcome, RequestKind, Ticket};
pub use controller::{Completion, SessionController};
pub use state::{Generations, SessionState};
