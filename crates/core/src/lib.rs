//! Core logic of the chat client: the conversation registry, durable
//! storage, staged files and the submission pipeline.

#![deny(missing_docs)]
#![deny(clippy::missing_safety_doc)]

#[macro_use]
extern crate tracing;

mod backend_client;
pub mod registry;
mod session;
pub mod staging;
pub mod store;

pub use registry::{LookupError, Registry, derive_title};
pub use session::{
    DEFAULT_REQUEST_TIMEOUT, PipelineState, Session, SessionBuilder,
};
pub use staging::{StagingArea, load_attachment};
pub use store::{FileStore, MemoryStore, Store, StoreError};
