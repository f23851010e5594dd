use std::fmt;

use serde::Serialize;
use thiserror::Error;
use whispr_remote::RemoteError;
use whispr_store::StoreError;
use whispr_types::{ReportId, ReportStatus, TypesError};

#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("report not found: {0}")]
    NotFound(ReportId),

    #[error("malformed report id: {0:?}")]
    MalformedId(String),

    #[error("invalid status transition: {from} -> {to}")]
    InvalidTransition { from: ReportStatus, to: ReportStatus },

    #[error("remote unavailable during {operation}: {source}")]
    RemoteUnavailable {
        operation: &'static str,
        #[source]
        source: RemoteError,
    },

    #[error("local cache error: {0}")]
    Cache(#[from] StoreError),

    #[error("configuration error: {0}")]
    Config(String),
}

impl From<TypesError> for ReconcileError {
    fn from(e: TypesError) -> Self {
        match e {
            TypesError::MalformedId(raw) => Self::MalformedId(raw),
            TypesError::InvalidTransition { from, to } => Self::InvalidTransition { from, to },
            other => Self::Cache(StoreError::Corruption(other.to_string())),
        }
    }
}

/// A remote failure that was absorbed by an optimistic local update.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RemoteWarning {
    pub operation: &'static str,
    pub message: String,
}

impl RemoteWarning {
    pub fn new(operation: &'static str, error: &RemoteError) -> Self {
        Self {
            operation,
            message: error.to_string(),
        }
    }
}

impl fmt::Display for RemoteWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} was applied locally only: {}", self.operation, self.message)
    }
}
