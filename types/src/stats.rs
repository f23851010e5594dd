//! Authority dashboard statistics.

use serde::{Deserialize, Serialize};

use crate::{Report, ReportStatus, Tokens};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorityStats {
    pub reports_pending: u64,
    pub reports_verified: u64,
    pub reports_rejected: u64,
    pub total_rewards_distributed: Tokens,
}

impl AuthorityStats {
    /// Tally statistics from a set of reports. Under-review reports count as pending.
    pub fn from_reports<'a>(reports: impl IntoIterator<Item = &'a Report>) -> Self {
        reports
            .into_iter()
            .fold(Self::default(), |mut stats, report| {
                match report.status {
                    ReportStatus::Pending | ReportStatus::UnderReview => stats.reports_pending += 1,
                    ReportStatus::Verified => {
                        stats.reports_verified += 1;
                        stats.total_rewards_distributed =
                            stats.total_rewards_distributed.saturating_add(report.reward);
                    }
                    ReportStatus::Rejected => stats.reports_rejected += 1,
                }
                stats
            })
    }
}
