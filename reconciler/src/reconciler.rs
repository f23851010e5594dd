//! The report state reconciler.

use std::collections::{HashMap, HashSet};

use serde::Serialize;
use tokio::sync::watch;
use whispr_remote::{RemoteError, ReportBackend};
use whispr_store::{DetailEntry, KeyValueStore, LocalCache, OutboxEntry, RemoteOp, SummaryEntry};
use whispr_types::{
    AuthorityStats, Clock, Report, ReportDraft, ReportId, ReportOrigin, ReportStatus,
    StatusFilter, SystemClock, Tokens, Verdict,
};

use crate::merge::{local_view, merge_by_id, overlay_detail, parse_multiplier};
use crate::{ReconcileError, ReconcilerConfig, RemoteWarning, ShadowBalance};

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SubmitOutcome {
    pub id: ReportId,
    /// Shadow balance after the stake was debited.
    pub balance: Tokens,
    pub warning: Option<RemoteWarning>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DecisionOutcome {
    pub report: Report,
    /// Shadow balance after the decision.
    pub balance: Tokens,
    pub warning: Option<RemoteWarning>,
}

/// Result of one [`ReportStateReconciler::retry_pending`] pass.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct RetryReport {
    pub replayed: usize,
    pub still_pending: usize,
    pub dropped: usize,
}

/// Keeps the remote report store, the local cache and the shadow balance
/// consistent for one wallet principal.
///
/// Operations run one at a time and await remote calls sequentially; there
/// is no locking across operations.
pub struct ReportStateReconciler<B, S, C = SystemClock> {
    backend: B,
    cache: LocalCache<S>,
    clock: C,
    config: ReconcilerConfig,
    balance: ShadowBalance,
}

impl<B, S> ReportStateReconciler<B, S, SystemClock>
where
    B: ReportBackend,
    S: KeyValueStore,
{
    pub fn new(backend: B, cache: LocalCache<S>, config: ReconcilerConfig) -> Self {
        Self::with_clock(backend, cache, SystemClock, config)
    }
}

impl<B, S, C> ReportStateReconciler<B, S, C>
where
    B: ReportBackend,
    S: KeyValueStore,
    C: Clock,
{
    pub fn with_clock(backend: B, cache: LocalCache<S>, clock: C, config: ReconcilerConfig) -> Self {
        let current = match cache.balance() {
            Ok(stored) => stored.unwrap_or(config.initial_balance),
            Err(e) => {
                tracing::warn!("unreadable shadow balance, starting from initial: {e}");
                config.initial_balance
            }
        };
        let balance = ShadowBalance::new(config.initial_balance, current);
        Self {
            backend,
            cache,
            clock,
            config,
            balance,
        }
    }

    pub fn config(&self) -> &ReconcilerConfig {
        &self.config
    }

    pub fn cache(&self) -> &LocalCache<S> {
        &self.cache
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    // ── Reporter operations ──────────────────────────────────────────────

    /// Submit a report.
    ///
    /// The returned id always resolves through [`get_by_id`](Self::get_by_id),
    /// even when the canister was unreachable and a local fallback id was used.
    pub async fn submit(&self, draft: ReportDraft) -> Result<SubmitOutcome, ReconcileError> {
        let (id, origin, warning) = match self.backend.submit_report(&draft).await {
            Ok(id) => {
                tracing::info!(%id, stake = %draft.stake, "report submitted");
                (id, ReportOrigin::Remote, None)
            }
            Err(e) if self.config.mode.is_strict() => {
                return Err(ReconcileError::RemoteUnavailable {
                    operation: "submit",
                    source: e,
                });
            }
            Err(e) => {
                let id = self.fallback_id()?;
                tracing::warn!(%id, "submit failed remotely, keeping report locally: {e}");
                (id, ReportOrigin::LocalOnly, Some(RemoteWarning::new("submit", &e)))
            }
        };

        let mut report = Report::from_draft(id.clone(), &draft, self.clock.now());
        report.origin = origin;
        self.cache.upsert_summary(SummaryEntry::from_report(&report))?;
        self.cache.upsert_detail(DetailEntry::from_report(&report))?;
        let balance = self.balance.debit(&self.cache, draft.stake)?;

        if let Some(warning) = &warning {
            self.queue(
                RemoteOp::Submit {
                    local_id: id.clone(),
                    draft,
                },
                &warning.message,
            );
        }

        Ok(SubmitOutcome {
            id,
            balance,
            warning,
        })
    }

    /// The caller's reports: remote records plus anything only cached locally.
    pub async fn list_mine(&self) -> Result<Vec<Report>, ReconcileError> {
        let local = self.local_reports()?;
        match self.backend.my_reports().await {
            Ok(remote) => {
                tracing::info!(remote = remote.len(), local = local.len(), "fetched my reports");
                Ok(merge_by_id(remote, local))
            }
            Err(e) => {
                tracing::warn!("my reports unavailable remotely, using local cache: {e}");
                Ok(local)
            }
        }
    }

    /// Look a report up by any representation of its id.
    pub async fn get_by_id(&self, raw_id: &str) -> Result<Report, ReconcileError> {
        let id = ReportId::parse(raw_id)?;

        let mut found = self.list_mine().await?.into_iter().find(|r| r.id == id);

        if found.is_none() {
            match self.backend.report(&id).await {
                Ok(Some(report)) => found = Some(report),
                Ok(None) => tracing::debug!(%id, "report unknown to the canister"),
                Err(e) => tracing::warn!(%id, "single report lookup failed: {e}"),
            }
        }

        if found.is_none() {
            found = match self.cache.find_summary(&id)? {
                Some(summary) => Some(summary.to_report()),
                None => self.cache.find_detail(&id)?.map(|d| d.to_report()),
            };
        }

        let mut report = found.ok_or_else(|| ReconcileError::NotFound(id.clone()))?;
        if let Some(detail) = self.cache.find_detail(&id)? {
            overlay_detail(&mut report, &detail);
        }
        Ok(report)
    }

    /// Reports in one status (or all), remote first.
    ///
    /// A reachable canister is authoritative for every report it mirrors, so
    /// only local-only entries top the remote list up.
    pub async fn list_by_status(&self, filter: StatusFilter) -> Result<Vec<Report>, ReconcileError> {
        let local: Vec<Report> = self
            .local_reports()?
            .into_iter()
            .filter(|r| filter.matches(r.status))
            .collect();
        let remote = match filter {
            StatusFilter::All => self.backend.all_reports().await,
            StatusFilter::Only(_) => self.backend.reports_by_status(filter).await,
        };
        match remote {
            Ok(remote) => {
                tracing::info!(%filter, remote = remote.len(), "fetched reports by status");
                Ok(merge_by_id(remote, unmirrored(local)))
            }
            Err(e) => {
                tracing::warn!(%filter, "status query unavailable remotely, using local cache: {e}");
                Ok(local)
            }
        }
    }

    // ── Authority operations ─────────────────────────────────────────────

    /// Every report known to the canister, plus locally cached ones.
    pub async fn list_all(&self) -> Result<Vec<Report>, ReconcileError> {
        let local = self.local_reports()?;
        match self.backend.all_reports().await {
            Ok(remote) => {
                tracing::info!(remote = remote.len(), "fetched all reports");
                Ok(merge_by_id(remote, unmirrored(local)))
            }
            Err(e) => {
                tracing::warn!("report list unavailable remotely, using local cache: {e}");
                Ok(local)
            }
        }
    }

    /// Verify or reject a report.
    ///
    /// The reward multiplier comes from `multiplier`, else from a
    /// `multiplier: <n>x` marker in `notes`, else the configured default.
    pub async fn decide(
        &self,
        raw_id: &str,
        verdict: Verdict,
        notes: Option<String>,
        multiplier: Option<u64>,
    ) -> Result<DecisionOutcome, ReconcileError> {
        let mut report = self.get_by_id(raw_id).await?;
        let target = verdict.status();
        let from = self.local_decision(&report.id)?.unwrap_or(report.status);
        if !from.can_transition_to(target) {
            return Err(ReconcileError::InvalidTransition { from, to: target });
        }

        let multiplier = multiplier
            .or_else(|| notes.as_deref().and_then(parse_multiplier))
            .unwrap_or(self.config.default_multiplier);
        let reward = Tokens::reward_for(report.stake, multiplier);

        let mut warning = None;
        if self.config.mode.is_strict() {
            self.send_decision(&report.id, verdict, notes.as_deref())
                .await
                .map_err(|source| ReconcileError::RemoteUnavailable {
                    operation: verdict_operation(verdict),
                    source,
                })?;
        }

        report.apply_verdict(verdict, reward, notes.clone(), self.clock.now())?;
        self.cache.upsert_summary(SummaryEntry::from_report(&report))?;
        self.cache.upsert_detail(DetailEntry::from_report(&report))?;
        let balance = match verdict {
            Verdict::Verified => self
                .balance
                .credit(&self.cache, report.stake.saturating_add(report.reward))?,
            Verdict::Rejected => self.balance.current(&self.cache)?,
        };
        tracing::debug!(id = %report.id, %verdict, %reward, %balance, "decision applied locally");

        if !self.config.mode.is_strict() {
            if let Err(e) = self.send_decision(&report.id, verdict, notes.as_deref()).await {
                let operation = verdict_operation(verdict);
                tracing::warn!(id = %report.id, "{operation} failed remotely, kept locally: {e}");
                self.queue(
                    RemoteOp::Decide {
                        id: report.id.clone(),
                        verdict,
                        notes,
                    },
                    &e.to_string(),
                );
                warning = Some(RemoteWarning::new(operation, &e));
            }
        }

        Ok(DecisionOutcome {
            report,
            balance,
            warning,
        })
    }

    /// Dashboard counters, computed locally when the canister is unreachable.
    pub async fn authority_statistics(&self) -> Result<AuthorityStats, ReconcileError> {
        match self.backend.authority_statistics().await {
            Ok(stats) => Ok(stats),
            Err(e) => {
                tracing::warn!("statistics unavailable remotely, computing from cache: {e}");
                let local = self.local_reports()?;
                Ok(AuthorityStats::from_reports(&local))
            }
        }
    }

    // ── Balance ──────────────────────────────────────────────────────────

    /// The token balance. A remote value replaces the shadow value.
    pub async fn balance(&self) -> Result<Tokens, ReconcileError> {
        match self.backend.token_balance().await {
            Ok(remote) => {
                tracing::info!(balance = %remote, "fetched token balance");
                Ok(self.balance.set(&self.cache, remote)?)
            }
            Err(e) => {
                tracing::warn!("balance unavailable remotely, using shadow balance: {e}");
                Ok(self.balance.current(&self.cache)?)
            }
        }
    }

    /// Notified whenever the shadow balance changes.
    pub fn subscribe_balance(&self) -> watch::Receiver<Tokens> {
        self.balance.subscribe()
    }

    // ── Outbox ───────────────────────────────────────────────────────────

    /// Remote calls that failed and have only been applied locally.
    pub fn pending_remote_ops(&self) -> Result<Vec<OutboxEntry>, ReconcileError> {
        Ok(self.cache.outbox()?)
    }

    /// Replay queued remote calls in order.
    ///
    /// A replayed submission moves the cached report from its fallback id to
    /// the canister's id; later queued decisions follow it. Decisions on a
    /// submission that is still pending wait without using an attempt.
    pub async fn retry_pending(&self) -> Result<RetryReport, ReconcileError> {
        let entries = self.cache.outbox()?;
        let mut result = RetryReport::default();
        let mut remaining = Vec::with_capacity(entries.len());
        let mut renamed: HashMap<ReportId, ReportId> = HashMap::new();
        let mut unsubmitted: HashSet<ReportId> = HashSet::new();

        for mut entry in entries {
            if let RemoteOp::Decide { id, .. } = &mut entry.op {
                if let Some(new_id) = renamed.get(&*id) {
                    *id = new_id.clone();
                }
                if unsubmitted.contains(&*id) {
                    result.still_pending += 1;
                    remaining.push(entry);
                    continue;
                }
            }

            match self.replay(&entry.op).await {
                Ok(Some((from, to))) => {
                    tracing::info!(%from, %to, "queued submission replayed");
                    renamed.insert(from, to);
                    result.replayed += 1;
                }
                Ok(None) => {
                    tracing::info!(id = %entry.op.report_id(), op = entry.op.name(), "queued call replayed");
                    result.replayed += 1;
                }
                Err(e) => {
                    entry.attempts += 1;
                    entry.last_error = e.to_string();
                    if let RemoteOp::Submit { local_id, .. } = &entry.op {
                        unsubmitted.insert(local_id.clone());
                    }
                    if entry.attempts >= self.config.max_attempts {
                        tracing::error!(
                            id = %entry.op.report_id(),
                            op = entry.op.name(),
                            attempts = entry.attempts,
                            "dropping queued call: {e}"
                        );
                        result.dropped += 1;
                    } else {
                        result.still_pending += 1;
                        remaining.push(entry);
                    }
                }
            }
        }

        self.cache.set_outbox(&remaining)?;
        Ok(result)
    }

    // ── Internals ────────────────────────────────────────────────────────

    fn local_reports(&self) -> Result<Vec<Report>, ReconcileError> {
        let summaries = self.cache.summaries()?;
        let details = self.cache.details()?;
        Ok(local_view(&summaries, &details))
    }

    /// Clock-derived id, stepped forward one second at a time until it is
    /// not used by any cached report.
    fn fallback_id(&self) -> Result<ReportId, ReconcileError> {
        let mut id = ReportId::from_timestamp(self.clock.now());
        while self.cache.contains_report(&id)? {
            match id.successor() {
                Some(next) => id = next,
                None => break,
            }
        }
        Ok(id)
    }

    /// Terminal status already applied locally, from the cache or from a
    /// decision still waiting in the outbox.
    fn local_decision(&self, id: &ReportId) -> Result<Option<ReportStatus>, ReconcileError> {
        let cached = match self.cache.find_summary(id)? {
            Some(summary) => Some(summary.status),
            None => self.cache.find_detail(id)?.map(|d| d.status),
        };
        if let Some(status) = cached.filter(|s| s.is_terminal()) {
            return Ok(Some(status));
        }
        let queued = self.cache.outbox()?.into_iter().find_map(|entry| match entry.op {
            RemoteOp::Decide {
                id: queued, verdict, ..
            } if &queued == id => Some(verdict.status()),
            _ => None,
        });
        Ok(queued)
    }

    /// Queue a failed remote call. The local leg has already been applied,
    /// so a failed write here is logged rather than returned.
    fn queue(&self, op: RemoteOp, error: &str) {
        let id = op.report_id().clone();
        let name = op.name();
        tracing::debug!(%id, op = name, "queueing remote call");
        if let Err(e) = self
            .cache
            .push_outbox(OutboxEntry::new(op, self.clock.now(), error))
        {
            tracing::error!(%id, op = name, "could not queue remote call for replay: {e}");
        }
    }

    async fn send_decision(
        &self,
        id: &ReportId,
        verdict: Verdict,
        notes: Option<&str>,
    ) -> Result<(), RemoteError> {
        match verdict {
            Verdict::Verified => self.backend.verify_report(id, notes).await,
            Verdict::Rejected => self.backend.reject_report(id, notes).await,
        }
    }

    /// Replay one queued call. A submission returns `(fallback id, remote id)`.
    async fn replay(&self, op: &RemoteOp) -> Result<Option<(ReportId, ReportId)>, ReconcileError> {
        match op {
            RemoteOp::Submit { local_id, draft } => {
                let remote_id = self.backend.submit_report(draft).await.map_err(|source| {
                    ReconcileError::RemoteUnavailable {
                        operation: "submit",
                        source,
                    }
                })?;
                self.cache.rekey(local_id, &remote_id)?;
                Ok(Some((local_id.clone(), remote_id)))
            }
            RemoteOp::Decide { id, verdict, notes } => {
                self.send_decision(id, *verdict, notes.as_deref())
                    .await
                    .map_err(|source| ReconcileError::RemoteUnavailable {
                        operation: verdict_operation(*verdict),
                        source,
                    })?;
                Ok(None)
            }
        }
    }
}

fn unmirrored(reports: Vec<Report>) -> Vec<Report> {
    reports
        .into_iter()
        .filter(|r| r.origin == ReportOrigin::LocalOnly)
        .collect()
}

fn verdict_operation(verdict: Verdict) -> &'static str {
    match verdict {
        Verdict::Verified => "verify",
        Verdict::Rejected => "reject",
    }
}
