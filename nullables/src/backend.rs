//! Nullable report canister: an in-memory remote store.
//!
//! Records are kept as typed [`Report`]s but every read renders them in the
//! canister's JSON shape and decodes them through [`whispr_remote::wire`],
//! so tests exercise the same normalization as production traffic.

use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use serde_json::{json, Value};
use whispr_remote::{wire, RemoteError, ReportBackend};
use whispr_types::{
    AuthorityStats, Report, ReportDraft, ReportId, ReportStatus, StatusFilter, Timestamp, Tokens,
    Verdict,
};

/// How the canister renders report ids on the wire.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum IdStyle {
    /// `"26"`
    #[default]
    Decimal,
    /// `"0x1a"`
    Hex,
    /// `26`
    Number,
}

struct CanisterState {
    reports: Vec<Report>,
    next_id: u64,
    balance: Tokens,
    now: Timestamp,
    reachable: bool,
    failing: HashSet<String>,
    calls: Vec<String>,
}

/// A scriptable in-memory canister.
///
/// Models a single caller who is both reporter and authority: submissions
/// debit the stake, verifications credit stake plus reward.
pub struct NullBackend {
    state: Mutex<CanisterState>,
    id_style: IdStyle,
    reward_multiplier: u64,
}

impl NullBackend {
    pub const INITIAL_BALANCE: Tokens = Tokens::new(250);

    pub fn new() -> Self {
        Self::with_id_style(IdStyle::Decimal)
    }

    pub fn with_id_style(id_style: IdStyle) -> Self {
        Self {
            state: Mutex::new(CanisterState {
                reports: Vec::new(),
                next_id: 1,
                balance: Self::INITIAL_BALANCE,
                now: Timestamp::from_secs(1_700_000_000),
                reachable: true,
                failing: HashSet::new(),
                calls: Vec::new(),
            }),
            id_style,
            reward_multiplier: 10,
        }
    }

    /// Multiplier the canister applies when verifying.
    pub fn with_reward_multiplier(mut self, multiplier: u64) -> Self {
        self.reward_multiplier = multiplier;
        self
    }

    /// Start handing out ids from `next`.
    pub fn with_next_id(self, next: u64) -> Self {
        self.state.lock().unwrap().next_id = next;
        self
    }

    /// When unreachable, every call fails with a transport error.
    pub fn set_reachable(&self, reachable: bool) {
        self.state.lock().unwrap().reachable = reachable;
    }

    /// Make one canister method (e.g. `"verify_report"`) fail with an
    /// application error until [`clear_failures`](Self::clear_failures).
    pub fn fail_method(&self, method: &str) {
        self.state.lock().unwrap().failing.insert(method.to_string());
    }

    pub fn clear_failures(&self) {
        self.state.lock().unwrap().failing.clear();
    }

    pub fn set_balance(&self, balance: Tokens) {
        self.state.lock().unwrap().balance = balance;
    }

    pub fn set_now(&self, now: Timestamp) {
        self.state.lock().unwrap().now = now;
    }

    /// Seed a record as if it had been submitted earlier.
    pub fn insert_report(&self, report: Report) {
        let mut state = self.state.lock().unwrap();
        if let Some(n) = report.id.as_u128().and_then(|n| u64::try_from(n).ok()) {
            state.next_id = state.next_id.max(n + 1);
        }
        state.reports.retain(|r| r.id != report.id);
        state.reports.push(report);
    }

    /// The canister's copy of a record, bypassing the wire.
    pub fn stored(&self, id: &ReportId) -> Option<Report> {
        self.state
            .lock()
            .unwrap()
            .reports
            .iter()
            .find(|r| &r.id == id)
            .cloned()
    }

    pub fn stored_count(&self) -> usize {
        self.state.lock().unwrap().reports.len()
    }

    /// Method names of every call received, reachable or not.
    pub fn calls(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn call_count(&self, method: &str) -> usize {
        self.state
            .lock()
            .unwrap()
            .calls
            .iter()
            .filter(|c| c.as_str() == method)
            .count()
    }

    fn enter(&self, method: &str) -> Result<MutexGuard<'_, CanisterState>, RemoteError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(method.to_string());
        if !state.reachable {
            return Err(RemoteError::Transport(format!(
                "{method}: connection refused"
            )));
        }
        if state.failing.contains(method) {
            return Err(RemoteError::Application(format!(
                "{method}: injected failure"
            )));
        }
        Ok(state)
    }

    fn render_id(&self, id: &ReportId) -> Value {
        match (self.id_style, id.as_u128()) {
            (IdStyle::Hex, Some(n)) => Value::String(format!("{n:#x}")),
            (IdStyle::Number, Some(n)) => u64::try_from(n)
                .map(Value::from)
                .unwrap_or_else(|_| Value::String(id.to_string())),
            _ => Value::String(id.to_string()),
        }
    }

    /// Render a record the way the canister's Candid-to-JSON gateway does.
    fn render(&self, report: &Report) -> Value {
        let opt = |v: Option<Value>| match v {
            Some(v) => json!([v]),
            None => json!([]),
        };
        let evidence: Vec<Value> = report
            .evidence
            .iter()
            .map(|file| {
                json!({
                    "name": file.name,
                    "file_type": file.media_type,
                    "size": file.size,
                    "content": file.decode_bytes().unwrap_or_default(),
                })
            })
            .collect();
        let coordinates = opt(report
            .location
            .coordinates
            .map(|c| json!({ "lat": c.lat, "lng": c.lng })));

        json!({
            "id": self.render_id(&report.id),
            "title": report.title,
            "description": report.description,
            "category": report.category,
            "location": { "address": report.location.address, "coordinates": coordinates },
            "date": opt(report.incident_date.clone().map(Value::from)),
            "time": opt(report.incident_time.clone().map(Value::from)),
            "date_submitted": report.submitted_at.map(|t| t.as_nanos()).unwrap_or_default(),
            "submitter_id": { "__principal__": report.submitter.clone().unwrap_or_else(|| "2vxsx-fae".into()) },
            "stake_amount": report.stake.raw(),
            "reward_amount": opt((!report.reward.is_zero()).then(|| Value::from(report.reward.raw()))),
            "status": wire::encode_status(report.status),
            "evidence_files": if evidence.is_empty() { json!([]) } else { json!([evidence]) },
            "review_notes": opt(report.review_notes.clone().map(Value::from)),
            "review_date": opt(report.reviewed_at.map(|t| Value::from(t.as_nanos()))),
            "reviewer": opt(report.reviewer.clone().map(Value::from)),
        })
    }

    fn decode_all<'a>(
        &self,
        reports: impl IntoIterator<Item = &'a Report>,
    ) -> Result<Vec<Report>, RemoteError> {
        let rendered: Vec<Value> = reports.into_iter().map(|r| self.render(r)).collect();
        wire::decode_reports(&Value::Array(rendered))
    }

    fn decide(
        &self,
        method: &str,
        id: &ReportId,
        verdict: Verdict,
        notes: Option<&str>,
    ) -> Result<(), RemoteError> {
        let mut state = self.enter(method)?;
        let now = state.now;
        let idx = state
            .reports
            .iter()
            .position(|r| &r.id == id)
            .ok_or_else(|| RemoteError::Application("Report not found".into()))?;

        let report = &mut state.reports[idx];
        if report.status.is_terminal() {
            return Err(RemoteError::Application(format!(
                "Report already {}",
                report.status
            )));
        }
        let reward = Tokens::reward_for(report.stake, self.reward_multiplier);
        report
            .apply_verdict(verdict, reward, notes.map(str::to_string), now)
            .map_err(|e| RemoteError::Application(e.to_string()))?;
        report.reviewer = Some("authority".into());

        if verdict == Verdict::Verified {
            let credit = report.stake.saturating_add(reward);
            state.balance = state.balance.saturating_add(credit);
        }
        Ok(())
    }
}

impl Default for NullBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ReportBackend for NullBackend {
    async fn submit_report(&self, draft: &ReportDraft) -> Result<ReportId, RemoteError> {
        let mut state = self.enter("submit_report")?;
        if state.balance < draft.stake {
            return Err(RemoteError::Application("Insufficient token balance".into()));
        }
        let id = ReportId::from(state.next_id);
        state.next_id += 1;
        state.balance = state.balance.saturating_sub(draft.stake);
        let now = state.now;
        state.reports.push(Report::from_draft(id.clone(), draft, now));
        wire::decode_id(&self.render_id(&id))
    }

    async fn my_reports(&self) -> Result<Vec<Report>, RemoteError> {
        let state = self.enter("get_my_reports")?;
        self.decode_all(state.reports.iter().rev())
    }

    async fn report(&self, id: &ReportId) -> Result<Option<Report>, RemoteError> {
        let state = self.enter("get_report")?;
        match state.reports.iter().find(|r| &r.id == id) {
            Some(report) => wire::decode_report(&self.render(report)).map(Some),
            None => Ok(None),
        }
    }

    async fn token_balance(&self) -> Result<Tokens, RemoteError> {
        let state = self.enter("get_token_balance")?;
        wire::decode_tokens(&json!(state.balance.raw()))
    }

    async fn reports_by_status(&self, filter: StatusFilter) -> Result<Vec<Report>, RemoteError> {
        let state = self.enter("get_reports_by_status")?;
        self.decode_all(state.reports.iter().filter(|r| filter.matches(r.status)))
    }

    async fn all_reports(&self) -> Result<Vec<Report>, RemoteError> {
        let state = self.enter("get_all_reports")?;
        self.decode_all(state.reports.iter())
    }

    async fn verify_report(&self, id: &ReportId, notes: Option<&str>) -> Result<(), RemoteError> {
        self.decide("verify_report", id, Verdict::Verified, notes)
    }

    async fn reject_report(&self, id: &ReportId, notes: Option<&str>) -> Result<(), RemoteError> {
        self.decide("reject_report", id, Verdict::Rejected, notes)
    }

    async fn authority_statistics(&self) -> Result<AuthorityStats, RemoteError> {
        let state = self.enter("get_authority_statistics")?;
        Ok(AuthorityStats::from_reports(&state.reports))
    }
}
