//! HTTP gateway client for the report canister.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use whispr_types::{AuthorityStats, Report, ReportDraft, ReportId, StatusFilter, Tokens};

use crate::wire;
use crate::{RemoteError, ReportBackend};

/// Connection settings for [`CanisterClient`].
#[derive(Clone, Debug)]
pub struct ClientOptions {
    /// Base URL of the gateway, e.g. `http://127.0.0.1:4943`.
    pub gateway_url: String,
    pub canister_id: String,
    /// Principal the canister should treat as the caller.
    pub principal: Option<String>,
    pub request_timeout: Duration,
    pub connect_timeout: Duration,
}

impl ClientOptions {
    pub fn new(gateway_url: impl Into<String>, canister_id: impl Into<String>) -> Self {
        Self {
            gateway_url: gateway_url.into(),
            canister_id: canister_id.into(),
            principal: None,
            request_timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
        }
    }
}

/// Calls canister methods through a JSON gateway.
///
/// Every call is a `POST {gateway}/api/v1/call` carrying the canister id,
/// method name, positional arguments and caller principal. The gateway
/// answers `{"result": ...}` or `{"error": "..."}`.
#[derive(Clone)]
pub struct CanisterClient {
    http: reqwest::Client,
    endpoint: String,
    canister_id: String,
    principal: Option<String>,
}

impl CanisterClient {
    pub fn new(options: ClientOptions) -> Result<Self, RemoteError> {
        let http = reqwest::Client::builder()
            .timeout(options.request_timeout)
            .connect_timeout(options.connect_timeout)
            .build()
            .map_err(|e| RemoteError::Transport(format!("failed to create HTTP client: {e}")))?;
        let endpoint = format!("{}/api/v1/call", options.gateway_url.trim_end_matches('/'));
        Ok(Self {
            http,
            endpoint,
            canister_id: options.canister_id,
            principal: options.principal,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn canister_id(&self) -> &str {
        &self.canister_id
    }

    /// Call a canister method and return its (Candid `Result`-unwrapped) value.
    async fn call(&self, method: &str, args: Vec<Value>) -> Result<Value, RemoteError> {
        let body = json!({
            "canister_id": self.canister_id,
            "method": method,
            "args": args,
            "caller": self.principal,
        });

        tracing::debug!(method, "calling canister");
        let response = self
            .http
            .post(&self.endpoint)
            .json(&body)
            .send()
            .await
            .map_err(|e| RemoteError::Transport(format!("{method}: {e}")))?;

        if !response.status().is_success() {
            return Err(RemoteError::Http(response.status().as_u16()));
        }

        let json: Value = response
            .json()
            .await
            .map_err(|e| RemoteError::Decode(format!("{method}: invalid JSON response: {e}")))?;

        if let Some(err) = json.get("error").and_then(Value::as_str) {
            return Err(RemoteError::Application(format!("{method}: {err}")));
        }

        let result = match json {
            Value::Object(mut map) if map.contains_key("result") => {
                map.remove("result").unwrap_or(Value::Null)
            }
            other => other,
        };
        wire::unwrap_result(result)
    }
}

#[async_trait]
impl ReportBackend for CanisterClient {
    async fn submit_report(&self, draft: &ReportDraft) -> Result<ReportId, RemoteError> {
        let result = self
            .call("submit_report", vec![wire::encode_draft(draft)])
            .await?;
        wire::decode_id(&result)
    }

    async fn my_reports(&self) -> Result<Vec<Report>, RemoteError> {
        let result = self.call("get_my_reports", Vec::new()).await?;
        wire::decode_reports(&result)
    }

    async fn report(&self, id: &ReportId) -> Result<Option<Report>, RemoteError> {
        let result = self.call("get_report", vec![wire::encode_id(id)]).await?;
        // `opt Report` on one canister version, `vec Report` on another.
        match wire::optional(Some(&result)) {
            Some(record) => wire::decode_report(record).map(Some),
            None => Ok(None),
        }
    }

    async fn token_balance(&self) -> Result<Tokens, RemoteError> {
        let result = self.call("get_token_balance", Vec::new()).await?;
        wire::decode_tokens(&result)
    }

    async fn reports_by_status(&self, filter: StatusFilter) -> Result<Vec<Report>, RemoteError> {
        match wire::encode_status_filter(filter) {
            Some(status) => {
                let result = self.call("get_reports_by_status", vec![status]).await?;
                wire::decode_reports(&result)
            }
            None => self.all_reports().await,
        }
    }

    async fn all_reports(&self) -> Result<Vec<Report>, RemoteError> {
        let result = self.call("get_all_reports", Vec::new()).await?;
        wire::decode_reports(&result)
    }

    async fn verify_report(&self, id: &ReportId, notes: Option<&str>) -> Result<(), RemoteError> {
        let result = self
            .call(
                "verify_report",
                vec![wire::encode_id(id), wire::encode_notes(notes)],
            )
            .await?;
        wire::expect_success(result, "verify_report")
    }

    async fn reject_report(&self, id: &ReportId, notes: Option<&str>) -> Result<(), RemoteError> {
        let result = self
            .call(
                "reject_report",
                vec![wire::encode_id(id), wire::encode_notes(notes)],
            )
            .await?;
        wire::expect_success(result, "reject_report")
    }

    async fn authority_statistics(&self) -> Result<AuthorityStats, RemoteError> {
        let result = self.call("get_authority_statistics", Vec::new()).await?;
        wire::decode_stats(&result)
    }
}
