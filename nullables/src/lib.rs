//! Nullable infrastructure for deterministic testing.
//!
//! Inspired by the "A-frame architecture" pattern from RsNano.
//! Everything the reconciler touches outside the process (clock, local
//! storage, the report canister) is abstracted behind a trait. This crate
//! provides test-friendly implementations that:
//! - Return deterministic values
//! - Can be controlled programmatically, including failure injection
//! - Never touch the filesystem or network
//!
//! Usage: swap real implementations for nullables in tests.

pub mod backend;
pub mod clock;
pub mod store;

pub use backend::{IdStyle, NullBackend};
pub use clock::NullClock;
pub use store::NullKeyValueStore;
