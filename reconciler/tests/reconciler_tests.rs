//! End-to-end reconciler behavior against the nullable canister and store.

use std::sync::Arc;

use whispr_nullables::{IdStyle, NullBackend, NullClock, NullKeyValueStore};
use whispr_remote::ReportBackend;
use whispr_reconciler::{
    ReconcileError, ReconcilerConfig, ReconciliationMode, ReportStateReconciler, RetryReport,
};
use whispr_store::cache::{BALANCE_KEY, DETAILS_KEY, OUTBOX_KEY, REPORTS_KEY};
use whispr_store::{DetailEntry, KeyValueStore, LocalCache, RemoteOp};
use whispr_types::{
    EvidenceFile, Location, Report, ReportDraft, ReportId, ReportOrigin, ReportStatus,
    StatusFilter, Timestamp, Tokens, Verdict,
};

const NOW: u64 = 1_700_000_000;

type Reconciler = ReportStateReconciler<Arc<NullBackend>, Arc<NullKeyValueStore>, Arc<NullClock>>;

struct Harness {
    backend: Arc<NullBackend>,
    store: Arc<NullKeyValueStore>,
    clock: Arc<NullClock>,
    reconciler: Reconciler,
}

fn harness_with(backend: NullBackend, config: ReconcilerConfig) -> Harness {
    let backend = Arc::new(backend);
    let store = Arc::new(NullKeyValueStore::new());
    let clock = Arc::new(NullClock::new(NOW));
    let reconciler = ReportStateReconciler::with_clock(
        backend.clone(),
        LocalCache::new(store.clone()),
        clock.clone(),
        config,
    );
    Harness {
        backend,
        store,
        clock,
        reconciler,
    }
}

fn harness() -> Harness {
    harness_with(NullBackend::new(), ReconcilerConfig::default())
}

fn strict() -> ReconcilerConfig {
    ReconcilerConfig {
        mode: ReconciliationMode::Strict,
        ..ReconcilerConfig::default()
    }
}

fn draft(stake: u64) -> ReportDraft {
    ReportDraft {
        title: "Illegal dumping".into(),
        description: "Barrels behind the warehouse".into(),
        category: "environmental".into(),
        location: Location {
            address: "12 Dock Rd".into(),
            coordinates: None,
        },
        incident_date: Some("2024-03-01".into()),
        incident_time: Some("22:15".into()),
        stake: Tokens::new(stake),
        evidence: vec![EvidenceFile::from_bytes("photo.jpg", "image/jpeg", &[9, 8, 7])],
    }
}

fn remote_report(id: u64, stake: u64) -> Report {
    let mut report = Report::from_draft(ReportId::from(id), &draft(stake), Timestamp::from_secs(NOW));
    report.description = String::new();
    report.evidence.clear();
    report.evidence_count = 0;
    report
}

// ── Identifier normalization ────────────────────────────────────────────

#[tokio::test]
async fn equivalent_id_forms_resolve_to_the_same_report() {
    let h = harness_with(
        NullBackend::with_id_style(IdStyle::Hex).with_next_id(26),
        ReconcilerConfig::default(),
    );
    let outcome = h.reconciler.submit(draft(10)).await.unwrap();
    assert_eq!(outcome.id.as_str(), "26");

    for raw in ["26", "0x1a", "0x1A", "0x001a", "026", " 26 "] {
        let report = h.reconciler.get_by_id(raw).await.unwrap();
        assert_eq!(report.id, outcome.id, "lookup by {raw:?}");
    }
}

#[tokio::test]
async fn malformed_ids_are_rejected() {
    let h = harness();
    for raw in ["", "   ", "0x", "12 34", "0xzz"] {
        let err = h.reconciler.get_by_id(raw).await.unwrap_err();
        assert!(matches!(err, ReconcileError::MalformedId(_)), "{raw:?}: {err:?}");
    }
}

#[tokio::test]
async fn unknown_report_is_not_found() {
    let h = harness();
    let err = h.reconciler.get_by_id("404").await.unwrap_err();
    assert!(matches!(err, ReconcileError::NotFound(id) if id.as_str() == "404"));
}

// ── Listing ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn list_mine_is_idempotent_and_duplicate_free() {
    let h = harness_with(
        NullBackend::with_id_style(IdStyle::Number),
        ReconcilerConfig::default(),
    );
    h.reconciler.submit(draft(5)).await.unwrap();
    h.reconciler.submit(draft(5)).await.unwrap();
    h.backend.set_reachable(false);
    h.reconciler.submit(draft(5)).await.unwrap();
    h.backend.set_reachable(true);

    let first = h.reconciler.list_mine().await.unwrap();
    let second = h.reconciler.list_mine().await.unwrap();
    assert_eq!(first, second);
    assert_eq!(first.len(), 3);

    let mut ids: Vec<_> = first.iter().map(|r| r.id.clone()).collect();
    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), 3);
    assert_eq!(
        first.iter().filter(|r| r.origin == ReportOrigin::LocalOnly).count(),
        1
    );
}

#[tokio::test]
async fn list_mine_degrades_to_local_cache() {
    let h = harness();
    h.reconciler.submit(draft(5)).await.unwrap();
    h.backend.set_reachable(false);

    let mine = h.reconciler.list_mine().await.unwrap();
    assert_eq!(mine.len(), 1);
    assert_eq!(mine[0].origin, ReportOrigin::LocalOnly);
    assert_eq!(mine[0].description, "Barrels behind the warehouse");
}

#[tokio::test]
async fn remote_status_wins_over_cached_status() {
    let h = harness();
    let id = h.reconciler.submit(draft(10)).await.unwrap().id;
    h.backend.verify_report(&id, None).await.unwrap();

    let mine = h.reconciler.list_mine().await.unwrap();
    assert_eq!(mine.len(), 1);
    assert_eq!(mine[0].status, ReportStatus::Verified);
    assert_eq!(mine[0].reward, Tokens::new(100));
}

#[tokio::test]
async fn list_by_status_tops_up_from_cache() {
    let h = harness();
    h.backend.insert_report(remote_report(1, 10));
    h.backend.set_reachable(false);
    let local = h.reconciler.submit(draft(10)).await.unwrap().id;
    h.reconciler
        .decide(local.as_str(), Verdict::Rejected, None, None)
        .await
        .unwrap();
    h.backend.set_reachable(true);

    let pending = h
        .reconciler
        .list_by_status(StatusFilter::Only(ReportStatus::Pending))
        .await
        .unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].id, ReportId::from(1u64));

    let rejected = h
        .reconciler
        .list_by_status(StatusFilter::Only(ReportStatus::Rejected))
        .await
        .unwrap();
    assert_eq!(rejected.len(), 1);
    assert_eq!(rejected[0].id, local);

    let all = h.reconciler.list_by_status(StatusFilter::All).await.unwrap();
    assert_eq!(all.len(), 2);
    assert_eq!(h.backend.call_count("get_all_reports"), 1);

    h.backend.set_reachable(false);
    let offline = h
        .reconciler
        .list_by_status(StatusFilter::Only(ReportStatus::Pending))
        .await
        .unwrap();
    assert!(offline.is_empty());
}

#[tokio::test]
async fn mirrored_report_follows_the_canister_status() {
    let h = harness();
    let id = h.reconciler.submit(draft(10)).await.unwrap().id;
    h.backend.verify_report(&id, None).await.unwrap();

    let pending = h
        .reconciler
        .list_by_status(StatusFilter::Only(ReportStatus::Pending))
        .await
        .unwrap();
    assert!(pending.is_empty());

    let verified = h
        .reconciler
        .list_by_status(StatusFilter::Only(ReportStatus::Verified))
        .await
        .unwrap();
    assert_eq!(verified.len(), 1);
    assert_eq!(verified[0].id, id);
    assert_eq!(verified[0].status, ReportStatus::Verified);

    let all = h.reconciler.list_all().await.unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].status, ReportStatus::Verified);
}

#[tokio::test]
async fn list_all_merges_remote_and_local() {
    let h = harness();
    h.backend.insert_report(remote_report(1, 10));
    h.backend.insert_report(remote_report(2, 10));
    h.backend.set_reachable(false);
    h.reconciler.submit(draft(10)).await.unwrap();
    h.backend.set_reachable(true);

    let all = h.reconciler.list_all().await.unwrap();
    assert_eq!(all.len(), 3);
}

// ── Detail overlay ──────────────────────────────────────────────────────

#[tokio::test]
async fn remote_record_is_enriched_from_detail_cache() {
    let h = harness();
    h.backend.insert_report(remote_report(7, 10));
    let mut cached = remote_report(7, 10);
    cached.description = "only known locally".into();
    cached.evidence = vec![EvidenceFile::from_bytes("a.png", "image/png", &[1])];
    cached.status = ReportStatus::Rejected;
    h.reconciler
        .cache()
        .upsert_detail(DetailEntry::from_report(&cached))
        .unwrap();

    let report = h.reconciler.get_by_id("0x7").await.unwrap();
    assert_eq!(report.origin, ReportOrigin::Remote);
    assert_eq!(report.status, ReportStatus::Pending);
    assert_eq!(report.description, "only known locally");
    assert_eq!(report.evidence.len(), 1);
    assert_eq!(report.evidence_count, 1);
}

#[tokio::test]
async fn legacy_details_with_url_evidence_keep_their_fields() {
    let h = harness();
    h.store
        .put(
            DETAILS_KEY,
            br#"[{"id":"0x65f1a2b3","title":"Old report","description":"kept description",
                "location":{"address":"Main St"},"status":"pending","stake":10,
                "evidenceFiles":[{"name":"old.jpg","type":"image/jpeg","size":1024,"url":"blob:http://localhost/abc"}]}]"#,
        )
        .unwrap();
    h.backend.set_reachable(false);

    let report = h.reconciler.get_by_id("0x65f1a2b3").await.unwrap();
    assert_eq!(report.description, "kept description");
    assert_eq!(report.location.address, "Main St");
    assert_eq!(report.evidence_count, 1);
    assert!(report.evidence[0].needs_recovery());
}

#[tokio::test]
async fn single_report_lookup_covers_reports_outside_my_list() {
    let h = harness();
    h.backend.insert_report(remote_report(42, 3));
    h.backend.fail_method("get_my_reports");

    let report = h.reconciler.get_by_id("42").await.unwrap();
    assert_eq!(report.stake, Tokens::new(3));
    assert_eq!(h.backend.call_count("get_report"), 1);
}

// ── Submission ──────────────────────────────────────────────────────────

#[tokio::test]
async fn submit_debits_stake_and_uses_remote_id() {
    let h = harness();
    let outcome = h.reconciler.submit(draft(20)).await.unwrap();
    assert_eq!(outcome.id, ReportId::from(1u64));
    assert_eq!(outcome.balance, Tokens::new(230));
    assert!(outcome.warning.is_none());
    assert!(h.reconciler.pending_remote_ops().unwrap().is_empty());

    let report = h.reconciler.get_by_id("1").await.unwrap();
    assert_eq!(report.status, ReportStatus::Pending);
    assert_eq!(report.reward, Tokens::ZERO);
    assert_eq!(report.evidence.len(), 1);
}

#[tokio::test]
async fn offline_submit_is_retrievable_by_fallback_id() {
    let h = harness();
    h.backend.set_reachable(false);

    let outcome = h.reconciler.submit(draft(15)).await.unwrap();
    assert_eq!(outcome.id, ReportId::from(NOW));
    assert_eq!(outcome.balance, Tokens::new(235));
    let warning = outcome.warning.expect("remote failure is reported");
    assert_eq!(warning.operation, "submit");

    let report = h.reconciler.get_by_id(outcome.id.as_str()).await.unwrap();
    assert_eq!(report.origin, ReportOrigin::LocalOnly);
    assert_eq!(report.title, "Illegal dumping");
    assert_eq!(report.evidence[0].decode_bytes().unwrap(), vec![9, 8, 7]);

    let pending = h.reconciler.pending_remote_ops().unwrap();
    assert_eq!(pending.len(), 1);
    assert!(matches!(&pending[0].op, RemoteOp::Submit { local_id, .. } if *local_id == outcome.id));
    assert_eq!(pending[0].attempts, 1);
}

#[tokio::test]
async fn fallback_ids_never_collide() {
    let h = harness();
    h.backend.set_reachable(false);
    let a = h.reconciler.submit(draft(1)).await.unwrap().id;
    let b = h.reconciler.submit(draft(1)).await.unwrap().id;
    h.clock.advance(1);
    let c = h.reconciler.submit(draft(1)).await.unwrap().id;

    assert_eq!(a, ReportId::from(NOW));
    assert_eq!(b, ReportId::from(NOW + 1));
    assert_eq!(c, ReportId::from(NOW + 2));
}

#[tokio::test]
async fn strict_submit_leaves_no_trace_when_remote_fails() {
    let h = harness_with(NullBackend::new(), strict());
    h.backend.set_reachable(false);

    let err = h.reconciler.submit(draft(10)).await.unwrap_err();
    assert!(matches!(
        err,
        ReconcileError::RemoteUnavailable { operation: "submit", .. }
    ));
    assert!(h.store.is_empty());
    assert!(h.reconciler.list_mine().await.unwrap().is_empty());
}

// ── Decisions ───────────────────────────────────────────────────────────

#[tokio::test]
async fn verify_pays_stake_times_multiplier() {
    let h = harness();
    let id = h.reconciler.submit(draft(20)).await.unwrap().id;
    let before = h.reconciler.balance().await.unwrap();

    let outcome = h
        .reconciler
        .decide(id.as_str(), Verdict::Verified, None, Some(10))
        .await
        .unwrap();
    assert_eq!(outcome.report.status, ReportStatus::Verified);
    assert_eq!(outcome.report.reward, Tokens::new(200));
    assert_eq!(outcome.balance, before + Tokens::new(220));
    assert!(outcome.warning.is_none());

    let summary = h.reconciler.cache().find_summary(&id).unwrap().unwrap();
    assert_eq!(summary.status, ReportStatus::Verified);
    assert_eq!(summary.reward, Tokens::new(200));
}

#[tokio::test]
async fn reject_pays_nothing() {
    let h = harness();
    let id = h.reconciler.submit(draft(20)).await.unwrap().id;
    let before = h.reconciler.balance().await.unwrap();

    let outcome = h
        .reconciler
        .decide(id.as_str(), Verdict::Rejected, Some("no evidence".into()), Some(10))
        .await
        .unwrap();
    assert_eq!(outcome.report.status, ReportStatus::Rejected);
    assert_eq!(outcome.report.reward, Tokens::ZERO);
    assert_eq!(outcome.report.review_notes.as_deref(), Some("no evidence"));
    assert_eq!(outcome.balance, before);
}

#[tokio::test]
async fn multiplier_falls_back_to_notes_then_config() {
    let h = harness_with(
        NullBackend::new(),
        ReconcilerConfig {
            default_multiplier: 3,
            ..ReconcilerConfig::default()
        },
    );
    h.backend.set_reachable(false);
    let a = h.reconciler.submit(draft(10)).await.unwrap().id;
    let b = h.reconciler.submit(draft(10)).await.unwrap().id;

    let from_notes = h
        .reconciler
        .decide(
            a.as_str(),
            Verdict::Verified,
            Some("Good work\n\nReward multiplier: 7x".into()),
            None,
        )
        .await
        .unwrap();
    assert_eq!(from_notes.report.reward, Tokens::new(70));

    let from_config = h
        .reconciler
        .decide(b.as_str(), Verdict::Verified, None, None)
        .await
        .unwrap();
    assert_eq!(from_config.report.reward, Tokens::new(30));
}

#[tokio::test]
async fn second_decision_is_an_invalid_transition() {
    let h = harness();
    let id = h.reconciler.submit(draft(10)).await.unwrap().id;
    h.reconciler
        .decide(id.as_str(), Verdict::Rejected, None, None)
        .await
        .unwrap();

    let err = h
        .reconciler
        .decide(id.as_str(), Verdict::Verified, None, None)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ReconcileError::InvalidTransition {
            from: ReportStatus::Rejected,
            to: ReportStatus::Verified
        }
    ));
}

#[tokio::test]
async fn decide_on_missing_report_is_not_found() {
    let h = harness();
    let err = h
        .reconciler
        .decide("0x99", Verdict::Verified, None, None)
        .await
        .unwrap_err();
    assert!(matches!(err, ReconcileError::NotFound(id) if id.as_str() == "153"));
    assert!(h.reconciler.pending_remote_ops().unwrap().is_empty());
}

#[tokio::test]
async fn failed_remote_decision_is_kept_locally_and_queued() {
    let h = harness();
    let id = h.reconciler.submit(draft(10)).await.unwrap().id;
    h.backend.fail_method("verify_report");

    let outcome = h
        .reconciler
        .decide(id.as_str(), Verdict::Verified, None, None)
        .await
        .unwrap();
    let warning = outcome.warning.expect("remote failure is reported");
    assert_eq!(warning.operation, "verify");
    assert_eq!(outcome.report.status, ReportStatus::Verified);

    let pending = h.reconciler.pending_remote_ops().unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].op.name(), "verify");
}

#[tokio::test]
async fn queued_verification_is_credited_once() {
    let h = harness();
    let id = h.reconciler.submit(draft(20)).await.unwrap().id;
    h.backend.fail_method("verify_report");

    let first = h
        .reconciler
        .decide(id.as_str(), Verdict::Verified, None, Some(10))
        .await
        .unwrap();
    assert_eq!(first.balance, Tokens::new(450));

    let err = h
        .reconciler
        .decide(id.as_str(), Verdict::Verified, None, Some(10))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ReconcileError::InvalidTransition {
            from: ReportStatus::Verified,
            to: ReportStatus::Verified
        }
    ));
    assert_eq!(h.reconciler.cache().balance().unwrap(), Some(Tokens::new(450)));
    assert_eq!(h.reconciler.pending_remote_ops().unwrap().len(), 1);
}

#[tokio::test]
async fn strict_decision_changes_nothing_when_remote_refuses() {
    let h = harness_with(NullBackend::new(), strict());
    let id = h.reconciler.submit(draft(10)).await.unwrap().id;
    h.backend.fail_method("verify_report");
    let balance_before = h.reconciler.cache().balance().unwrap();

    let err = h
        .reconciler
        .decide(id.as_str(), Verdict::Verified, None, None)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ReconcileError::RemoteUnavailable { operation: "verify", .. }
    ));
    let summary = h.reconciler.cache().find_summary(&id).unwrap().unwrap();
    assert_eq!(summary.status, ReportStatus::Pending);
    assert_eq!(h.reconciler.cache().balance().unwrap(), balance_before);
    assert!(h.reconciler.pending_remote_ops().unwrap().is_empty());
}

// ── Balance ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn remote_balance_overwrites_shadow_balance() {
    let h = harness();
    h.backend.set_balance(Tokens::new(999));
    assert_eq!(h.reconciler.balance().await.unwrap(), Tokens::new(999));
    assert_eq!(h.store.get_text(BALANCE_KEY).as_deref(), Some("999"));

    h.backend.set_reachable(false);
    assert_eq!(h.reconciler.balance().await.unwrap(), Tokens::new(999));
}

#[tokio::test]
async fn offline_balance_starts_at_initial_value() {
    let h = harness();
    h.backend.set_reachable(false);
    assert_eq!(h.reconciler.balance().await.unwrap(), Tokens::new(250));
}

#[tokio::test]
async fn balance_subscribers_see_every_change() {
    let h = harness();
    let mut rx = h.reconciler.subscribe_balance();
    assert_eq!(*rx.borrow(), Tokens::new(250));

    h.reconciler.submit(draft(30)).await.unwrap();
    assert!(rx.has_changed().unwrap());
    assert_eq!(*rx.borrow_and_update(), Tokens::new(220));

    h.backend.set_balance(Tokens::new(500));
    h.reconciler.balance().await.unwrap();
    assert_eq!(*rx.borrow_and_update(), Tokens::new(500));
}

// ── Authority statistics ────────────────────────────────────────────────

#[tokio::test]
async fn statistics_fall_back_to_local_reports() {
    let h = harness();
    h.backend.set_reachable(false);
    let a = h.reconciler.submit(draft(10)).await.unwrap().id;
    let b = h.reconciler.submit(draft(10)).await.unwrap().id;
    h.reconciler.submit(draft(10)).await.unwrap();
    h.reconciler
        .decide(a.as_str(), Verdict::Verified, None, Some(2))
        .await
        .unwrap();
    h.reconciler
        .decide(b.as_str(), Verdict::Rejected, None, None)
        .await
        .unwrap();

    let stats = h.reconciler.authority_statistics().await.unwrap();
    assert_eq!(stats.reports_pending, 1);
    assert_eq!(stats.reports_verified, 1);
    assert_eq!(stats.reports_rejected, 1);
    assert_eq!(stats.total_rewards_distributed, Tokens::new(20));
}

#[tokio::test]
async fn statistics_prefer_the_canister() {
    let h = harness();
    h.backend.insert_report(remote_report(1, 10));
    let stats = h.reconciler.authority_statistics().await.unwrap();
    assert_eq!(stats.reports_pending, 1);
    assert_eq!(h.backend.call_count("get_authority_statistics"), 1);
}

// ── Outbox replay ───────────────────────────────────────────────────────

#[tokio::test]
async fn retry_replays_submission_and_follow_up_decision() {
    let h = harness();
    h.backend.set_reachable(false);
    let local_id = h.reconciler.submit(draft(10)).await.unwrap().id;
    h.reconciler
        .decide(local_id.as_str(), Verdict::Verified, None, None)
        .await
        .unwrap();
    assert_eq!(h.reconciler.pending_remote_ops().unwrap().len(), 2);

    h.backend.set_reachable(true);
    let report = h.reconciler.retry_pending().await.unwrap();
    assert_eq!(
        report,
        RetryReport {
            replayed: 2,
            still_pending: 0,
            dropped: 0
        }
    );
    assert!(h.reconciler.pending_remote_ops().unwrap().is_empty());

    let remote_id = ReportId::from(1u64);
    let stored = h.backend.stored(&remote_id).expect("submitted remotely");
    assert_eq!(stored.status, ReportStatus::Verified);
    assert!(!h.reconciler.cache().contains_report(&local_id).unwrap());
    let cached = h.reconciler.cache().find_summary(&remote_id).unwrap().unwrap();
    assert_eq!(cached.origin, ReportOrigin::Remote);

    let report = h.reconciler.get_by_id("1").await.unwrap();
    assert_eq!(report.status, ReportStatus::Verified);
    assert_eq!(report.origin, ReportOrigin::Remote);
    assert_eq!(h.reconciler.list_mine().await.unwrap().len(), 1);
}

#[tokio::test]
async fn decisions_wait_for_their_submission() {
    let h = harness();
    h.backend.set_reachable(false);
    let local_id = h.reconciler.submit(draft(10)).await.unwrap().id;
    h.reconciler
        .decide(local_id.as_str(), Verdict::Rejected, None, None)
        .await
        .unwrap();

    let report = h.reconciler.retry_pending().await.unwrap();
    assert_eq!(report.still_pending, 2);
    assert_eq!(report.replayed, 0);

    let pending = h.reconciler.pending_remote_ops().unwrap();
    assert_eq!(pending[0].attempts, 2);
    assert_eq!(pending[1].attempts, 1);
}

#[tokio::test]
async fn entries_are_dropped_after_max_attempts() {
    let h = harness_with(
        NullBackend::new(),
        ReconcilerConfig {
            max_attempts: 2,
            ..ReconcilerConfig::default()
        },
    );
    h.backend.set_reachable(false);
    h.reconciler.submit(draft(10)).await.unwrap();

    let report = h.reconciler.retry_pending().await.unwrap();
    assert_eq!(report.dropped, 1);
    assert!(h.reconciler.pending_remote_ops().unwrap().is_empty());
}

// ── Cache failures ──────────────────────────────────────────────────────

#[tokio::test]
async fn corrupt_cache_surfaces_as_cache_error() {
    let h = harness();
    h.store.put(REPORTS_KEY, b"{broken").unwrap();
    let err = h.reconciler.list_mine().await.unwrap_err();
    assert!(matches!(err, ReconcileError::Cache(_)));
}

#[tokio::test]
async fn failed_cache_write_surfaces_as_cache_error() {
    let h = harness();
    h.store.fail_writes(true);
    let err = h.reconciler.submit(draft(10)).await.unwrap_err();
    assert!(matches!(err, ReconcileError::Cache(_)));
}

#[tokio::test]
async fn unqueueable_remote_failure_is_still_a_warning() {
    let h = harness();
    h.store.fail_writes_to(Some(OUTBOX_KEY));
    h.backend.set_reachable(false);

    let outcome = h.reconciler.submit(draft(10)).await.unwrap();
    assert!(outcome.warning.is_some());
    assert_eq!(outcome.balance, Tokens::new(240));
    assert!(h.reconciler.pending_remote_ops().unwrap().is_empty());

    let decided = h
        .reconciler
        .decide(outcome.id.as_str(), Verdict::Rejected, None, None)
        .await
        .unwrap();
    assert_eq!(decided.warning.map(|w| w.operation), Some("reject"));
    assert_eq!(decided.report.status, ReportStatus::Rejected);

    let report = h.reconciler.get_by_id(outcome.id.as_str()).await.unwrap();
    assert_eq!(report.status, ReportStatus::Rejected);
}

// ── Full round trip ─────────────────────────────────────────────────────

#[tokio::test]
async fn stake_verify_reward_round_trip() {
    let h = harness_with(
        NullBackend::new().with_reward_multiplier(5),
        ReconcilerConfig::default(),
    );
    let start = h.reconciler.balance().await.unwrap();

    let submitted = h.reconciler.submit(draft(10)).await.unwrap();
    assert_eq!(submitted.balance, start.saturating_sub(Tokens::new(10)));

    let decided = h
        .reconciler
        .decide(
            submitted.id.as_str(),
            Verdict::Verified,
            Some("Reward multiplier: 5x".into()),
            None,
        )
        .await
        .unwrap();
    assert_eq!(decided.report.reward, Tokens::new(50));
    assert_eq!(decided.balance, submitted.balance + Tokens::new(60));

    for _ in 0..3 {
        let report = h.reconciler.get_by_id(submitted.id.as_str()).await.unwrap();
        assert_eq!(report.status, ReportStatus::Verified);
        assert_eq!(report.reward, Tokens::new(50));
    }
    assert_eq!(h.reconciler.balance().await.unwrap(), decided.balance);
}

#[tokio::test]
async fn stake_verify_reward_round_trip_offline() {
    let h = harness();
    h.backend.set_reachable(false);

    let submitted = h.reconciler.submit(draft(10)).await.unwrap();
    assert_eq!(submitted.balance, Tokens::new(240));

    let decided = h
        .reconciler
        .decide(submitted.id.as_str(), Verdict::Verified, None, Some(5))
        .await
        .unwrap();
    assert_eq!(decided.report.reward, Tokens::new(50));
    assert_eq!(decided.balance, Tokens::new(300));

    for _ in 0..3 {
        let report = h.reconciler.get_by_id(submitted.id.as_str()).await.unwrap();
        assert_eq!(report.status, ReportStatus::Verified);
        assert_eq!(report.reward, Tokens::new(50));
        assert_eq!(report.review_notes, None);
    }
    assert_eq!(h.reconciler.balance().await.unwrap(), Tokens::new(300));
}
