//! Report records, drafts and evidence.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::{ReportId, ReportStatus, Timestamp, Tokens, TypesError, Verdict};

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Location {
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub coordinates: Option<Coordinates>,
}

impl Location {
    pub fn is_empty(&self) -> bool {
        self.address.is_empty() && self.coordinates.is_none()
    }
}

/// An evidence attachment with its bytes inlined as a data URL.
///
/// Older caches stored only a blob `url` whose bytes are gone; those load
/// with no payload and report [`needs_recovery`](Self::needs_recovery).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvidenceFile {
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type", default)]
    pub media_type: String,
    #[serde(default)]
    pub size: u64,
    /// `data:<media type>;base64,<payload>`
    #[serde(rename = "base64Data", default)]
    pub data: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub recovery_needed: bool,
}

impl EvidenceFile {
    pub fn from_bytes(name: impl Into<String>, media_type: impl Into<String>, bytes: &[u8]) -> Self {
        let media_type = media_type.into();
        let data = format!("data:{};base64,{}", media_type, STANDARD.encode(bytes));
        Self {
            name: name.into(),
            media_type,
            size: bytes.len() as u64,
            data: Some(data),
            url: None,
            recovery_needed: false,
        }
    }

    /// Whether the payload is missing and has to be re-attached.
    pub fn needs_recovery(&self) -> bool {
        self.recovery_needed || self.data.is_none()
    }

    /// Decode the inline payload back to raw bytes.
    pub fn decode_bytes(&self) -> Result<Vec<u8>, TypesError> {
        let data = self.data.as_deref().ok_or_else(|| {
            TypesError::InvalidEvidence(format!("{}: payload missing, recovery needed", self.name))
        })?;
        let payload = match data.split_once(";base64,") {
            Some((prefix, payload)) if prefix.starts_with("data:") => payload,
            Some(_) => {
                return Err(TypesError::InvalidEvidence(format!(
                    "{}: not a data URL",
                    self.name
                )))
            }
            None => data,
        };
        STANDARD
            .decode(payload)
            .map_err(|e| TypesError::InvalidEvidence(format!("{}: {e}", self.name)))
    }
}

/// A report as composed by the reporter, before it has an identifier.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ReportDraft {
    pub title: String,
    pub description: String,
    pub category: String,
    pub location: Location,
    pub incident_date: Option<String>,
    pub incident_time: Option<String>,
    pub stake: Tokens,
    pub evidence: Vec<EvidenceFile>,
}

/// Where a report record came from.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportOrigin {
    /// Known to the remote store.
    #[default]
    Remote,
    /// Only present in the local cache, not yet mirrored remotely.
    LocalOnly,
}

/// A submitted report.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub id: ReportId,
    pub title: String,
    pub description: String,
    pub category: String,
    pub location: Location,
    pub incident_date: Option<String>,
    pub incident_time: Option<String>,
    pub submitted_at: Option<Timestamp>,
    pub submitter: Option<String>,
    pub stake: Tokens,
    pub reward: Tokens,
    pub status: ReportStatus,
    pub evidence: Vec<EvidenceFile>,
    pub evidence_count: u32,
    pub review_notes: Option<String>,
    pub reviewed_at: Option<Timestamp>,
    pub reviewer: Option<String>,
    pub has_messages: bool,
    pub origin: ReportOrigin,
}

impl Report {
    /// A fresh pending report built from a draft.
    pub fn from_draft(id: ReportId, draft: &ReportDraft, submitted_at: Timestamp) -> Self {
        Self {
            id,
            title: draft.title.clone(),
            description: draft.description.clone(),
            category: draft.category.clone(),
            location: draft.location.clone(),
            incident_date: draft.incident_date.clone(),
            incident_time: draft.incident_time.clone(),
            submitted_at: Some(submitted_at),
            submitter: None,
            stake: draft.stake,
            reward: Tokens::ZERO,
            status: ReportStatus::Pending,
            evidence: draft.evidence.clone(),
            evidence_count: draft.evidence.len() as u32,
            review_notes: None,
            reviewed_at: None,
            reviewer: None,
            has_messages: false,
            origin: ReportOrigin::Remote,
        }
    }

    /// Date shown for the report: the incident date when known, else the
    /// submission date.
    pub fn display_date(&self) -> Option<String> {
        self.incident_date
            .clone()
            .filter(|d| !d.is_empty())
            .or_else(|| self.submitted_at.map(|ts| ts.date_string()))
    }

    /// Apply an authority decision.
    ///
    /// The reward is only kept for a verification; a rejection always leaves
    /// it at zero.
    pub fn apply_verdict(
        &mut self,
        verdict: Verdict,
        reward: Tokens,
        notes: Option<String>,
        at: Timestamp,
    ) -> Result<(), TypesError> {
        let next = verdict.status();
        if !self.status.can_transition_to(next) {
            return Err(TypesError::InvalidTransition {
                from: self.status,
                to: next,
            });
        }
        self.status = next;
        self.reward = match verdict {
            Verdict::Verified => reward,
            Verdict::Rejected => Tokens::ZERO,
        };
        self.review_notes = notes;
        self.reviewed_at = Some(at);
        Ok(())
    }

    /// Whether the reward invariant holds.
    pub fn reward_is_consistent(&self) -> bool {
        self.status == ReportStatus::Verified || self.reward.is_zero()
    }
}
