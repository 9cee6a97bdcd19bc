//! An out-of-the-box chat client that assembles the HTTP backend, durable
//! storage and the session.
//!
//! The crate includes a CLI tool for chatting in the terminal. And you can
//! also use it as a library to bring the chat session into your own host
//! apps.

#![deny(missing_docs)]

#[macro_use]
extern crate tracing;

pub mod command;
mod config;
mod session;

pub use config::{
    API_URL_VAR, ClientConfig, ConfigError, DATA_DIR_VAR, TIMEOUT_SECS_VAR,
    default_data_dir,
};
pub use session::{Session, SessionBuilder};

/// Re-exports of [`orb_chat_core`] crate.
pub mod core {
    pub use orb_chat_core::*;
}

/// Re-exports of [`orb_chat_model`] crate.
pub mod model {
    pub use orb_chat_model::*;
}
