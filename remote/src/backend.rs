//! The remote report store seam.

use async_trait::async_trait;
use whispr_types::{AuthorityStats, Report, ReportDraft, ReportId, StatusFilter, Tokens};

use crate::RemoteError;

/// Operations exposed by the report canister.
///
/// Reporter calls are scoped to the caller's principal by the canister;
/// authority calls require the caller to be a registered authority.
#[async_trait]
pub trait ReportBackend: Send + Sync {
    /// Submit a new report; returns the canister-assigned id.
    async fn submit_report(&self, draft: &ReportDraft) -> Result<ReportId, RemoteError>;

    /// Reports submitted by the caller.
    async fn my_reports(&self) -> Result<Vec<Report>, RemoteError>;

    /// A single report, `None` when the canister does not know it.
    async fn report(&self, id: &ReportId) -> Result<Option<Report>, RemoteError>;

    /// The caller's token balance.
    async fn token_balance(&self) -> Result<Tokens, RemoteError>;

    async fn reports_by_status(&self, filter: StatusFilter) -> Result<Vec<Report>, RemoteError>;

    async fn all_reports(&self) -> Result<Vec<Report>, RemoteError>;

    async fn verify_report(&self, id: &ReportId, notes: Option<&str>) -> Result<(), RemoteError>;

    async fn reject_report(&self, id: &ReportId, notes: Option<&str>) -> Result<(), RemoteError>;

    async fn authority_statistics(&self) -> Result<AuthorityStats, RemoteError>;
}

#[async_trait]
impl<T: ReportBackend + ?Sized> ReportBackend for std::sync::Arc<T> {
    async fn submit_report(&self, draft: &ReportDraft) -> Result<ReportId, RemoteError> {
        (**self).submit_report(draft).await
    }

    async fn my_reports(&self) -> Result<Vec<Report>, RemoteError> {
        (**self).my_reports().await
    }

    async fn report(&self, id: &ReportId) -> Result<Option<Report>, RemoteError> {
        (**self).report(id).await
    }

    async fn token_balance(&self) -> Result<Tokens, RemoteError> {
        (**self).token_balance().await
    }

    async fn reports_by_status(&self, filter: StatusFilter) -> Result<Vec<Report>, RemoteError> {
        (**self).reports_by_status(filter).await
    }

    async fn all_reports(&self) -> Result<Vec<Report>, RemoteError> {
        (**self).all_reports().await
    }

    async fn verify_report(&self, id: &ReportId, notes: Option<&str>) -> Result<(), RemoteError> {
        (**self).verify_report(id, notes).await
    }

    async fn reject_report(&self, id: &ReportId, notes: Option<&str>) -> Result<(), RemoteError> {
        (**self).reject_report(id, notes).await
    }

    async fn authority_statistics(&self) -> Result<AuthorityStats, RemoteError> {
        (**self).authority_statistics().await
    }
}
