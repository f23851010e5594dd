use thiserror::Error;

/// Any failure to get a valid answer from the remote store.
///
/// The reconciler treats every variant the same way: the remote is
/// unreachable for this attempt.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RemoteError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("gateway returned HTTP {0}")]
    Http(u16),

    #[error("canister error: {0}")]
    Application(String),

    #[error("invalid response: {0}")]
    Decode(String),
}
