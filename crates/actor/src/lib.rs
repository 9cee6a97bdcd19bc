//! A lightweight actor runtime.
//!
//! An actor owns its state on a single task and mutates it only in
//! response to messages, one message at a time. This gives callers on
//! any thread a consistent, serialized view of the state without locks.

#![deny(missing_docs)]

#[macro_use]
extern crate tracing;

mod error;
mod handle;
mod mailbox;

pub use error::ActorDeadError;
pub use handle::Actor;
pub use mailbox::Message;
