//! Fundamental types for the Whispr reporting client.
//!
//! This crate defines the types shared by every other crate in the workspace:
//! report identifiers, statuses, token amounts, timestamps and the report
//! records themselves, together with the mapping from loosely typed wire
//! representations onto these closed types.

pub mod amount;
pub mod error;
pub mod id;
pub mod report;
pub mod stats;
pub mod status;
pub mod time;

pub use amount::Tokens;
pub use error::TypesError;
pub use id::ReportId;
pub use report::{Coordinates, EvidenceFile, Location, Report, ReportDraft, ReportOrigin};
pub use stats::AuthorityStats;
pub use status::{ReportStatus, StatusFilter, Verdict};
pub use time::{Clock, SystemClock, Timestamp};
