//! Remote operations that failed and are waiting to be replayed.

use serde::{Deserialize, Serialize};
use whispr_types::{ReportDraft, ReportId, Timestamp, Verdict};

/// A remote call whose local half has already been applied.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum RemoteOp {
    /// A submission stored locally under a fallback id.
    Submit { local_id: ReportId, draft: ReportDraft },
    /// An authority decision applied locally.
    Decide {
        id: ReportId,
        verdict: Verdict,
        notes: Option<String>,
    },
}

impl RemoteOp {
    /// The report this operation concerns.
    pub fn report_id(&self) -> &ReportId {
        match self {
            Self::Submit { local_id, .. } => local_id,
            Self::Decide { id, .. } => id,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Submit { .. } => "submit",
            Self::Decide {
                verdict: Verdict::Verified,
                ..
            } => "verify",
            Self::Decide {
                verdict: Verdict::Rejected,
                ..
            } => "reject",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OutboxEntry {
    pub op: RemoteOp,
    pub queued_at: Timestamp,
    /// Remote attempts so far, including the original call.
    pub attempts: u32,
    pub last_error: String,
}

impl OutboxEntry {
    pub fn new(op: RemoteOp, queued_at: Timestamp, error: impl Into<String>) -> Self {
        Self {
            op,
            queued_at,
            attempts: 1,
            last_error: error.into(),
        }
    }
}
