//! CLI configuration with TOML file support.

use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use whispr_reconciler::ReconcilerConfig;
use whispr_remote::ClientOptions;
use whispr_store_lmdb::DEFAULT_MAP_SIZE;
use whispr_utils::LogFormat;

/// Everything the `whispr` binary needs to wire a reconciler.
///
/// Loaded from a TOML file via [`CliConfig::from_toml_file`]; command-line
/// flags and `WHISPR_*` environment variables are applied on top.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CliConfig {
    /// Base URL of the canister HTTP gateway.
    #[serde(default = "default_gateway_url")]
    pub gateway_url: String,

    /// Report canister id.
    #[serde(default)]
    pub canister_id: String,

    /// Wallet principal to call as. Also scopes the local cache.
    #[serde(default)]
    pub principal: Option<String>,

    /// Directory holding the LMDB cache.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// LMDB map size in bytes.
    #[serde(default = "default_map_size")]
    pub map_size: usize,

    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,

    /// Log format: "human" or "json".
    #[serde(default)]
    pub log_format: LogFormat,

    /// Log level filter, e.g. "warn" or "info,whispr_reconciler=debug".
    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default)]
    pub reconciler: ReconcilerConfig,
}

// ── Serde default helpers ──────────────────────────────────────────────

fn default_gateway_url() -> String {
    "http://127.0.0.1:4943".to_string()
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./whispr_data")
}

fn default_map_size() -> usize {
    DEFAULT_MAP_SIZE
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_connect_timeout_secs() -> u64 {
    10
}

fn default_log_level() -> String {
    "warn".to_string()
}

// ── Impl ───────────────────────────────────────────────────────────────

impl CliConfig {
    pub fn from_toml_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        Self::from_toml_str(&content)
            .with_context(|| format!("invalid config file {}", path.display()))
    }

    pub fn from_toml_str(s: &str) -> anyhow::Result<Self> {
        let config: Self = toml::from_str(s)?;
        config.reconciler.validate()?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> anyhow::Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Cache scope: the principal, or `anonymous` when none is configured.
    pub fn cache_scope(&self) -> &str {
        self.principal.as_deref().unwrap_or("anonymous")
    }

    pub fn client_options(&self) -> anyhow::Result<ClientOptions> {
        if self.canister_id.trim().is_empty() {
            anyhow::bail!("no canister id configured (use --canister-id or WHISPR_CANISTER_ID)");
        }
        let mut options = ClientOptions::new(self.gateway_url.clone(), self.canister_id.clone());
        options.principal = self.principal.clone();
        options.request_timeout = Duration::from_secs(self.request_timeout_secs);
        options.connect_timeout = Duration::from_secs(self.connect_timeout_secs);
        Ok(options)
    }
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            gateway_url: default_gateway_url(),
            canister_id: String::new(),
            principal: None,
            data_dir: default_data_dir(),
            map_size: default_map_size(),
            request_timeout_secs: default_request_timeout_secs(),
            connect_timeout_secs: default_connect_timeout_secs(),
            log_format: LogFormat::default(),
            log_level: default_log_level(),
            reconciler: ReconcilerConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use whispr_reconciler::ReconciliationMode;

    #[test]
    fn default_config_round_trips_through_toml() {
        let config = CliConfig {
            principal: Some("2vxsx-fae".into()),
            ..CliConfig::default()
        };
        let toml_str = config.to_toml_string().unwrap();
        let parsed = CliConfig::from_toml_str(&toml_str).expect("should parse");
        assert_eq!(parsed, config);
    }

    #[test]
    fn minimal_toml_uses_defaults() {
        let config = CliConfig::from_toml_str("").expect("empty toml should use defaults");
        assert_eq!(config.gateway_url, "http://127.0.0.1:4943");
        assert_eq!(config.map_size, DEFAULT_MAP_SIZE);
        assert_eq!(config.log_format, LogFormat::Human);
        assert_eq!(config.reconciler, ReconcilerConfig::default());
        assert_eq!(config.cache_scope(), "anonymous");
    }

    #[test]
    fn nested_reconciler_table() {
        let toml = r#"
            canister_id = "vizcg-th777-77774-qaaea-cai"
            log_format = "json"

            [reconciler]
            mode = "strict"
            max_attempts = 3
        "#;
        let config = CliConfig::from_toml_str(toml).expect("should parse");
        assert_eq!(config.log_format, LogFormat::Json);
        assert_eq!(config.reconciler.mode, ReconciliationMode::Strict);
        assert_eq!(config.reconciler.max_attempts, 3);
        assert_eq!(config.reconciler.default_multiplier, 10);
    }

    #[test]
    fn client_options_need_a_canister() {
        assert!(CliConfig::default().client_options().is_err());

        let config = CliConfig {
            canister_id: "vizcg-th777".into(),
            principal: Some("aaaaa-aa".into()),
            request_timeout_secs: 5,
            ..CliConfig::default()
        };
        let options = config.client_options().unwrap();
        assert_eq!(options.canister_id, "vizcg-th777");
        assert_eq!(options.principal.as_deref(), Some("aaaaa-aa"));
        assert_eq!(options.request_timeout, Duration::from_secs(5));
    }

    #[test]
    fn missing_file_is_an_error() {
        let err = CliConfig::from_toml_file(Path::new("/nonexistent/whispr.toml")).unwrap_err();
        assert!(err.to_string().contains("failed to read config file"));
    }

    #[test]
    fn loads_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("whispr.toml");
        std::fs::write(&path, "principal = \"2vxsx-fae\"\n").unwrap();
        let config = CliConfig::from_toml_file(&path).unwrap();
        assert_eq!(config.cache_scope(), "2vxsx-fae");
    }
}
