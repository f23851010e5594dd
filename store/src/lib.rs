//! Local persisted state for the Whispr client.
//!
//! Every storage backend (LMDB on disk, in-memory for testing) implements
//! [`KeyValueStore`]. The rest of the codebase talks to the typed
//! [`LocalCache`] layered on top of it.

pub mod cache;
pub mod error;
pub mod kv;
pub mod outbox;
pub mod projection;

pub use cache::LocalCache;
pub use error::StoreError;
pub use kv::KeyValueStore;
pub use outbox::{OutboxEntry, RemoteOp};
pub use projection::{DetailEntry, SummaryEntry};
