//! The remote side of the Whispr client.
//!
//! The authoritative report store is a canister reached through an HTTP JSON
//! gateway. [`ReportBackend`] is the seam the reconciler depends on;
//! [`CanisterClient`] is the production implementation, and the `wire`
//! module maps the canister's loosely typed records onto `whispr-types`.

pub mod backend;
pub mod client;
pub mod error;
pub mod wire;

pub use backend::ReportBackend;
pub use client::{CanisterClient, ClientOptions};
pub use error::RemoteError;
