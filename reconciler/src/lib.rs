//! Report state reconciliation for the Whispr client.
//!
//! The canister is the source of truth, but it is slow and sometimes
//! unreachable. The reconciler answers every query from the union of the
//! remote state and a local cache, applies reporter and authority actions
//! optimistically, and keeps a shadow token balance in step with report
//! status changes.
//!
//! - [`ReportStateReconciler`]: the operations
//! - [`merge`]: per-id merge rules between remote and cached records
//! - [`ShadowBalance`]: the locally tracked balance and its change feed
//! - [`ReconcilerConfig`] / [`ReconciliationMode`]: policy knobs

pub mod balance;
pub mod config;
pub mod error;
pub mod merge;
pub mod policy;
pub mod reconciler;

pub use balance::ShadowBalance;
pub use config::ReconcilerConfig;
pub use error::{ReconcileError, RemoteWarning};
pub use policy::ReconciliationMode;
pub use reconciler::{DecisionOutcome, ReportStateReconciler, RetryReport, SubmitOutcome};
