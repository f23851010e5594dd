//! Merge rules between remote records and the local cache.
//!
//! Ids are canonical by the time records reach this module, so `"0x1a"`
//! from one source and `26` from another are the same key here.

use std::collections::HashSet;

use whispr_store::{DetailEntry, SummaryEntry};
use whispr_types::{Report, ReportId, ReportOrigin};

/// Union of remote and local records, one per id.
///
/// Remote records win. Local records are kept only for ids the remote set
/// does not contain. Within each source the first record per id wins.
pub fn merge_by_id(remote: Vec<Report>, local: Vec<Report>) -> Vec<Report> {
    let mut seen: HashSet<ReportId> = HashSet::with_capacity(remote.len() + local.len());
    remote
        .into_iter()
        .chain(local)
        .filter(|report| seen.insert(report.id.clone()))
        .collect()
}

/// Fill a record from its cached detail projection.
///
/// A remote record only takes what the canister does not carry or left
/// empty: evidence payloads, review notes and date, description, location.
/// A local-only record takes every detail field.
pub fn overlay_detail(report: &mut Report, detail: &DetailEntry) {
    match report.origin {
        ReportOrigin::Remote => {
            if report.evidence.is_empty() {
                report.evidence = detail.evidence_files.clone();
            }
            report.evidence_count = report.evidence_count.max(detail.evidence_count());
            if report.review_notes.is_none() {
                report.review_notes = detail.review_notes();
            }
            if report.reviewed_at.is_none() {
                report.reviewed_at = detail.reviewed_at();
            }
            if report.description.is_empty() {
                report.description = detail.description.clone();
            }
            if report.location.is_empty() {
                report.location = detail.location.clone();
            }
        }
        ReportOrigin::LocalOnly => {
            let has_messages = report.has_messages;
            *report = detail.to_report();
            report.has_messages = has_messages;
            report.origin = ReportOrigin::LocalOnly;
        }
    }
}

/// Every report the local cache knows, summaries enriched with details.
pub fn local_view(summaries: &[SummaryEntry], details: &[DetailEntry]) -> Vec<Report> {
    let mut reports: Vec<Report> = summaries
        .iter()
        .map(|summary| {
            let mut report = summary.to_report();
            if let Some(detail) = details.iter().find(|d| d.id == summary.id) {
                overlay_detail(&mut report, detail);
            }
            report
        })
        .collect();
    for detail in details {
        if !reports.iter().any(|r| r.id == detail.id) {
            reports.push(detail.to_report());
        }
    }
    reports
}

/// Reward multiplier written into review notes as `multiplier: <n>x`.
///
/// Case-insensitive; the first well-formed, non-zero occurrence wins.
pub fn parse_multiplier(notes: &str) -> Option<u64> {
    const MARKER: &str = "multiplier:";
    let lower = notes.to_ascii_lowercase();
    let mut rest = lower.as_str();
    while let Some(pos) = rest.find(MARKER) {
        rest = &rest[pos + MARKER.len()..];
        let value = rest.trim_start();
        let digits = value.bytes().take_while(u8::is_ascii_digit).count();
        if digits > 0 && value[digits..].starts_with('x') {
            if let Some(n) = value[..digits].parse::<u64>().ok().filter(|n| *n > 0) {
                return Some(n);
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use whispr_types::{EvidenceFile, Location, ReportStatus, Timestamp, Tokens};

    fn report(id: u64, status: ReportStatus, origin: ReportOrigin) -> Report {
        Report {
            id: ReportId::from(id),
            title: format!("report {id}"),
            description: String::new(),
            category: "other".into(),
            location: Location::default(),
            incident_date: None,
            incident_time: None,
            submitted_at: Some(Timestamp::from_secs(1)),
            submitter: None,
            stake: Tokens::new(10),
            reward: Tokens::ZERO,
            status,
            evidence: Vec::new(),
            evidence_count: 0,
            review_notes: None,
            reviewed_at: None,
            reviewer: None,
            has_messages: false,
            origin,
        }
    }

    fn detail_for(report: &Report) -> DetailEntry {
        let mut detail = DetailEntry::from_report(report);
        detail.description = "cached description".into();
        detail.evidence_files = vec![EvidenceFile::from_bytes("a.txt", "text/plain", b"x")];
        detail.review_notes = "cached notes".into();
        detail.location.address = "Main St".into();
        detail
    }

    #[test]
    fn remote_wins_and_duplicates_collapse() {
        let remote = vec![
            report(1, ReportStatus::Verified, ReportOrigin::Remote),
            report(1, ReportStatus::Pending, ReportOrigin::Remote),
        ];
        let local = vec![
            report(1, ReportStatus::Pending, ReportOrigin::LocalOnly),
            report(2, ReportStatus::Pending, ReportOrigin::LocalOnly),
        ];
        let merged = merge_by_id(remote, local);
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].status, ReportStatus::Verified);
        assert_eq!(merged[0].origin, ReportOrigin::Remote);
        assert_eq!(merged[1].id, ReportId::from(2u64));
    }

    #[test]
    fn remote_record_only_takes_missing_fields() {
        let mut remote = report(3, ReportStatus::Verified, ReportOrigin::Remote);
        remote.description = "from canister".into();
        remote.review_notes = Some("canister notes".into());
        let mut stale = remote.clone();
        stale.status = ReportStatus::Pending;
        let detail = detail_for(&stale);

        overlay_detail(&mut remote, &detail);
        assert_eq!(remote.status, ReportStatus::Verified);
        assert_eq!(remote.description, "from canister");
        assert_eq!(remote.review_notes.as_deref(), Some("canister notes"));
        assert_eq!(remote.evidence.len(), 1);
        assert_eq!(remote.evidence_count, 1);
        assert_eq!(remote.location.address, "Main St");
    }

    #[test]
    fn local_record_takes_every_detail_field() {
        let mut local = report(4, ReportStatus::Pending, ReportOrigin::LocalOnly);
        local.has_messages = true;
        let mut decided = local.clone();
        decided.status = ReportStatus::Rejected;
        let detail = detail_for(&decided);

        overlay_detail(&mut local, &detail);
        assert_eq!(local.status, ReportStatus::Rejected);
        assert_eq!(local.description, "cached description");
        assert_eq!(local.review_notes.as_deref(), Some("cached notes"));
        assert_eq!(local.origin, ReportOrigin::LocalOnly);
        assert!(local.has_messages);
    }

    #[test]
    fn local_view_includes_detail_only_records() {
        let a = report(5, ReportStatus::Pending, ReportOrigin::LocalOnly);
        let b = report(6, ReportStatus::Pending, ReportOrigin::LocalOnly);
        let summaries = vec![SummaryEntry::from_report(&a)];
        let details = vec![detail_for(&a), detail_for(&b)];

        let view = local_view(&summaries, &details);
        assert_eq!(view.len(), 2);
        assert_eq!(view[0].description, "cached description");
        assert_eq!(view[1].id, b.id);
        assert!(view.iter().all(|r| r.origin == ReportOrigin::LocalOnly));
    }

    #[test]
    fn multiplier_from_notes() {
        assert_eq!(parse_multiplier("Solid evidence\n\nReward multiplier: 5x"), Some(5));
        assert_eq!(parse_multiplier("MULTIPLIER:12X"), Some(12));
        assert_eq!(parse_multiplier("multiplier:   3x and multiplier: 4x"), Some(3));
        assert_eq!(parse_multiplier("multiplier: x5 then multiplier: 7x"), Some(7));
        assert_eq!(parse_multiplier("multiplier: 5"), None);
        assert_eq!(parse_multiplier("multiplier: 0x"), None);
        assert_eq!(parse_multiplier("Verified with 10x reward multiplier"), None);
    }
}
