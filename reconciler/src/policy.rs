//! How local writes relate to remote calls.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::ReconcileError;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReconciliationMode {
    /// Apply locally first; remote failures become warnings and are queued
    /// for [`retry_pending`](crate::ReportStateReconciler::retry_pending).
    #[default]
    Optimistic,
    /// Call the remote first; nothing is written locally when it fails.
    Strict,
}

impl ReconciliationMode {
    pub fn is_strict(&self) -> bool {
        matches!(self, Self::Strict)
    }
}

impl FromStr for ReconciliationMode {
    type Err = ReconcileError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "optimistic" => Ok(Self::Optimistic),
            "strict" => Ok(Self::Strict),
            other => Err(ReconcileError::Config(format!(
                "unknown reconciliation mode {other:?}"
            ))),
        }
    }
}

impl fmt::Display for ReconciliationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Optimistic => "optimistic",
            Self::Strict => "strict",
        })
    }
}
