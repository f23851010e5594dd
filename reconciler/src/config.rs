//! Reconciler configuration with TOML file support.

use serde::{Deserialize, Serialize};
use std::path::Path;

use whispr_types::Tokens;

use crate::{ReconcileError, ReconciliationMode};

/// Policy knobs for [`ReportStateReconciler`](crate::ReportStateReconciler).
///
/// Usually embedded as the `[reconciler]` table of the CLI config, but can
/// be loaded on its own via [`ReconcilerConfig::from_toml_file`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconcilerConfig {
    /// Whether local writes go ahead of the remote call.
    #[serde(default)]
    pub mode: ReconciliationMode,

    /// Reward multiplier when neither the caller nor the review notes give one.
    #[serde(default = "default_multiplier")]
    pub default_multiplier: u64,

    /// Shadow balance before any remote balance has been seen.
    #[serde(default = "default_initial_balance")]
    pub initial_balance: Tokens,

    /// Outbox entries are dropped once they have failed this many times.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
}

// ── Serde default helpers ──────────────────────────────────────────────

fn default_multiplier() -> u64 {
    10
}

fn default_initial_balance() -> Tokens {
    Tokens::new(250)
}

fn default_max_attempts() -> u32 {
    5
}

// ── Impl ───────────────────────────────────────────────────────────────

impl ReconcilerConfig {
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, ReconcileError> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ReconcileError::Config(e.to_string()))?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(s: &str) -> Result<Self, ReconcileError> {
        let config: Self = toml::from_str(s).map_err(|e| ReconcileError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> Result<String, ReconcileError> {
        toml::to_string_pretty(self).map_err(|e| ReconcileError::Config(e.to_string()))
    }

    pub fn validate(&self) -> Result<(), ReconcileError> {
        if self.default_multiplier == 0 {
            return Err(ReconcileError::Config(
                "default_multiplier must be at least 1".into(),
            ));
        }
        if self.max_attempts == 0 {
            return Err(ReconcileError::Config("max_attempts must be at least 1".into()));
        }
        Ok(())
    }
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self {
            mode: ReconciliationMode::default(),
            default_multiplier: default_multiplier(),
            initial_balance: default_initial_balance(),
            max_attempts: default_max_attempts(),
        }
    }
}
