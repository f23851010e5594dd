//! LMDB storage backend for the Whispr client.
//!
//! Implements [`whispr_store::KeyValueStore`] on a single named LMDB database
//! using the `heed` bindings, so the local report cache survives restarts.

pub mod environment;
pub mod error;

pub use environment::{LmdbKeyValueStore, DEFAULT_MAP_SIZE};
pub use error::LmdbError;
