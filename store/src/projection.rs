//! Cached projections of a report.
//!
//! The cache keeps two lists: a lightweight summary per report for list
//! views, and a detail record carrying the evidence payloads and review
//! annotations the remote list endpoints omit. Field names match the JSON
//! layout the web client already persisted, so existing caches still load.

use serde::{Deserialize, Serialize};
use whispr_types::{EvidenceFile, Location, Report, ReportId, ReportOrigin, ReportStatus, Timestamp, Tokens};

/// Lightweight list projection (`whispr_reports`).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryEntry {
    pub id: ReportId,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub category: String,
    /// `YYYY-MM-DD`, empty when unknown.
    #[serde(default)]
    pub date: String,
    /// `HH:MM`, empty when unknown.
    #[serde(default)]
    pub time: String,
    #[serde(default)]
    pub status: ReportStatus,
    #[serde(default)]
    pub stake: Tokens,
    #[serde(default)]
    pub reward: Tokens,
    #[serde(default)]
    pub has_messages: bool,
    /// Entries written before origins were tracked read as local-only.
    #[serde(default = "legacy_origin")]
    pub origin: ReportOrigin,
}

impl SummaryEntry {
    pub fn from_report(report: &Report) -> Self {
        Self {
            id: report.id.clone(),
            title: report.title.clone(),
            category: report.category.clone(),
            date: report.display_date().unwrap_or_default(),
            time: report.incident_time.clone().unwrap_or_default(),
            status: report.status,
            stake: report.stake,
            reward: report.reward,
            has_messages: report.has_messages,
            origin: report.origin,
        }
    }

    /// Expand into a report carrying the cached origin.
    pub fn to_report(&self) -> Report {
        Report {
            id: self.id.clone(),
            title: self.title.clone(),
            description: String::new(),
            category: self.category.clone(),
            location: Location::default(),
            incident_date: non_empty(&self.date),
            incident_time: non_empty(&self.time),
            submitted_at: None,
            submitter: None,
            stake: self.stake,
            reward: self.reward,
            status: self.status,
            evidence: Vec::new(),
            evidence_count: 0,
            review_notes: None,
            reviewed_at: None,
            reviewer: None,
            has_messages: self.has_messages,
            origin: self.origin,
        }
    }
}

/// Detail projection (`whispr_reports_details`).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetailEntry {
    pub id: ReportId,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub location: Location,
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub time: String,
    #[serde(default)]
    pub status: ReportStatus,
    #[serde(default)]
    pub stake: Tokens,
    #[serde(default)]
    pub reward: Tokens,
    #[serde(default)]
    pub evidence_files: Vec<EvidenceFile>,
    #[serde(default)]
    pub evidence_count: u32,
    #[serde(default)]
    pub review_notes: String,
    /// RFC 3339.
    #[serde(default)]
    pub review_date: Option<String>,
    #[serde(default = "legacy_origin")]
    pub origin: ReportOrigin,
}

impl DetailEntry {
    pub fn from_report(report: &Report) -> Self {
        Self {
            id: report.id.clone(),
            title: report.title.clone(),
            description: report.description.clone(),
            category: report.category.clone(),
            location: report.location.clone(),
            date: report.display_date().unwrap_or_default(),
            time: report.incident_time.clone().unwrap_or_default(),
            status: report.status,
            stake: report.stake,
            reward: report.reward,
            evidence_files: report.evidence.clone(),
            evidence_count: report.evidence_count.max(report.evidence.len() as u32),
            review_notes: report.review_notes.clone().unwrap_or_default(),
            review_date: report.reviewed_at.map(|ts| ts.to_rfc3339()),
            origin: report.origin,
        }
    }

    pub fn review_notes(&self) -> Option<String> {
        non_empty(&self.review_notes)
    }

    pub fn reviewed_at(&self) -> Option<Timestamp> {
        self.review_date
            .as_deref()
            .and_then(Timestamp::parse_rfc3339)
    }

    pub fn evidence_count(&self) -> u32 {
        self.evidence_count.max(self.evidence_files.len() as u32)
    }

    /// Expand into a report carrying the cached origin.
    pub fn to_report(&self) -> Report {
        Report {
            id: self.id.clone(),
            title: self.title.clone(),
            description: self.description.clone(),
            category: self.category.clone(),
            location: self.location.clone(),
            incident_date: non_empty(&self.date),
            incident_time: non_empty(&self.time),
            submitted_at: None,
            submitter: None,
            stake: self.stake,
            reward: self.reward,
            status: self.status,
            evidence: self.evidence_files.clone(),
            evidence_count: self.evidence_count(),
            review_notes: self.review_notes(),
            reviewed_at: self.reviewed_at(),
            reviewer: None,
            has_messages: false,
            origin: self.origin,
        }
    }
}

fn legacy_origin() -> ReportOrigin {
    ReportOrigin::LocalOnly
}

fn non_empty(s: &str) -> Option<String> {
    (!s.is_empty()).then(|| s.to_string())
}

/// Anything stored in a per-report list.
pub trait Keyed {
    fn key(&self) -> &ReportId;
    fn set_key(&mut self, id: ReportId);
}

impl Keyed for SummaryEntry {
    fn key(&self) -> &ReportId {
        &self.id
    }

    fn set_key(&mut self, id: ReportId) {
        self.id = id;
    }
}

impl Keyed for DetailEntry {
    fn key(&self) -> &ReportId {
        &self.id
    }

    fn set_key(&mut self, id: ReportId) {
        self.id = id;
    }
}
