//! Report status and the authority's verdicts.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::TypesError;

/// Lifecycle state of a report.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ReportStatus {
    /// Submitted, awaiting an authority.
    #[default]
    Pending,
    /// Picked up by an authority but not yet decided.
    UnderReview,
    /// Accepted; stake returned and reward paid.
    Verified,
    /// Dismissed; stake forfeited.
    Rejected,
}

impl ReportStatus {
    pub const ALL: [ReportStatus; 4] = [
        Self::Pending,
        Self::UnderReview,
        Self::Verified,
        Self::Rejected,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::UnderReview => "under_review",
            Self::Verified => "verified",
            Self::Rejected => "rejected",
        }
    }

    /// Verified and rejected reports never change again.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Verified | Self::Rejected)
    }

    pub fn can_transition_to(&self, next: ReportStatus) -> bool {
        match (self, next) {
            (Self::Pending, Self::UnderReview) => true,
            (Self::Pending | Self::UnderReview, Self::Verified | Self::Rejected) => true,
            _ => false,
        }
    }

    /// Map any wire representation onto the closed enum.
    ///
    /// Accepts plain strings in any case and tagged objects such as
    /// `{"Approved": null}`. The canister calls a verified report `Approved`.
    pub fn from_wire(value: &serde_json::Value) -> Result<Self, TypesError> {
        match value {
            serde_json::Value::String(s) => s.parse(),
            serde_json::Value::Object(map) if map.len() == 1 => {
                let tag = map.keys().next().map(String::as_str).unwrap_or_default();
                tag.parse()
            }
            other => Err(TypesError::UnknownStatus(other.to_string())),
        }
    }
}

impl FromStr for ReportStatus {
    type Err = TypesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key: String = s
            .trim()
            .chars()
            .filter(|c| !matches!(c, '_' | '-' | ' '))
            .collect::<String>()
            .to_ascii_lowercase();
        match key.as_str() {
            "pending" => Ok(Self::Pending),
            "underreview" | "inreview" => Ok(Self::UnderReview),
            "verified" | "approved" => Ok(Self::Verified),
            "rejected" => Ok(Self::Rejected),
            _ => Err(TypesError::UnknownStatus(s.to_string())),
        }
    }
}

impl fmt::Display for ReportStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for ReportStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ReportStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = serde_json::Value::deserialize(deserializer)?;
        Self::from_wire(&value).map_err(serde::de::Error::custom)
    }
}

/// Status selector for list queries.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StatusFilter {
    All,
    Only(ReportStatus),
}

impl StatusFilter {
    pub fn matches(&self, status: ReportStatus) -> bool {
        match self {
            Self::All => true,
            Self::Only(wanted) => *wanted == status,
        }
    }
}

impl FromStr for StatusFilter {
    type Err = TypesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("all") {
            Ok(Self::All)
        } else {
            s.parse().map(Self::Only)
        }
    }
}

impl fmt::Display for StatusFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::All => f.write_str("all"),
            Self::Only(status) => status.fmt(f),
        }
    }
}

/// An authority decision on a report.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Verified,
    Rejected,
}

impl Verdict {
    pub fn status(&self) -> ReportStatus {
        match self {
            Self::Verified => ReportStatus::Verified,
            Self::Rejected => ReportStatus::Rejected,
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.status().fmt(f)
    }
}
