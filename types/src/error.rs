//! Error type for the data model.

use thiserror::Error;

use crate::ReportStatus;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypesError {
    #[error("malformed report id: {0:?}")]
    MalformedId(String),

    #[error("unknown report status: {0}")]
    UnknownStatus(String),

    #[error("report cannot move from {from} to {to}")]
    InvalidTransition { from: ReportStatus, to: ReportStatus },

    #[error("invalid evidence payload: {0}")]
    InvalidEvidence(String),
}
