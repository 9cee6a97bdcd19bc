//! The data contract shared by every part of the chat client.
//!
//! This crate defines what a message, a conversation and a staged
//! attachment look like, the persisted layout of the client state, and
//! the protocol a chat backend must follow. Types here carry invariants
//! but almost no behavior; the registry and the submission pipeline in
//! `orb-chat-core` are the only places that mutate them.

#![deny(missing_docs)]

mod attachment;
mod backend;
mod conversation;
mod error;
mod message;
mod state;

pub use attachment::*;
pub use backend::*;
pub use conversation::*;
pub use error::*;
pub use message::*;
pub use state::*;
