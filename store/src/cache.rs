//! Typed access to the locally persisted report cache.

use serde::de::DeserializeOwned;
use serde::Serialize;
use whispr_types::{ReportId, ReportOrigin, Tokens};

use crate::projection::Keyed;
use crate::{DetailEntry, KeyValueStore, OutboxEntry, StoreError, SummaryEntry};

pub const REPORTS_KEY: &str = "whispr_reports";
pub const DETAILS_KEY: &str = "whispr_reports_details";
pub const BALANCE_KEY: &str = "user_token_balance";
pub const OUTBOX_KEY: &str = "whispr_outbox";

/// The local shadow of the remote report state.
///
/// All values are JSON. Lists are ordered newest-first and hold at most one
/// entry per report id.
pub struct LocalCache<S> {
    store: S,
    scope: Option<String>,
}

impl<S: KeyValueStore> LocalCache<S> {
    pub fn new(store: S) -> Self {
        Self { store, scope: None }
    }

    /// A cache whose keys are prefixed with `scope` (the wallet principal),
    /// so several identities can share one store.
    pub fn scoped(store: S, scope: impl Into<String>) -> Self {
        Self {
            store,
            scope: Some(scope.into()),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn scope(&self) -> Option<&str> {
        self.scope.as_deref()
    }

    fn key(&self, base: &str) -> String {
        match &self.scope {
            Some(scope) => format!("{scope}/{base}"),
            None => base.to_string(),
        }
    }

    fn read_json<T: DeserializeOwned>(&self, base: &str) -> Result<Option<T>, StoreError> {
        match self.store.get(&self.key(base))? {
            Some(bytes) => serde_json::from_slice(&bytes)
                .map(Some)
                .map_err(|e| StoreError::Corruption(format!("{base}: {e}"))),
            None => Ok(None),
        }
    }

    fn write_json<T: Serialize + ?Sized>(&self, base: &str, value: &T) -> Result<(), StoreError> {
        let bytes = serde_json::to_vec(value)?;
        self.store.put(&self.key(base), &bytes)
    }

    /// Read a per-report list, skipping unreadable entries and collapsing
    /// duplicate ids onto their first occurrence.
    fn read_list<T: DeserializeOwned + Keyed>(&self, base: &str) -> Result<Vec<T>, StoreError> {
        let raw: Vec<serde_json::Value> = self.read_json(base)?.unwrap_or_default();
        let mut entries: Vec<T> = Vec::with_capacity(raw.len());
        for value in raw {
            match serde_json::from_value::<T>(value) {
                Ok(entry) => {
                    if !entries.iter().any(|e| e.key() == entry.key()) {
                        entries.push(entry);
                    }
                }
                Err(e) => tracing::warn!(key = base, "skipping unreadable cache entry: {e}"),
            }
        }
        Ok(entries)
    }

    fn upsert<T: Serialize + DeserializeOwned + Keyed>(
        &self,
        base: &str,
        entry: T,
    ) -> Result<(), StoreError> {
        let mut entries: Vec<T> = self.read_list(base)?;
        match entries.iter().position(|e| e.key() == entry.key()) {
            Some(idx) => entries[idx] = entry,
            None => entries.insert(0, entry),
        }
        self.write_json(base, &entries)
    }

    pub fn summaries(&self) -> Result<Vec<SummaryEntry>, StoreError> {
        self.read_list(REPORTS_KEY)
    }

    pub fn details(&self) -> Result<Vec<DetailEntry>, StoreError> {
        self.read_list(DETAILS_KEY)
    }

    pub fn find_summary(&self, id: &ReportId) -> Result<Option<SummaryEntry>, StoreError> {
        Ok(self.summaries()?.into_iter().find(|e| &e.id == id))
    }

    pub fn find_detail(&self, id: &ReportId) -> Result<Option<DetailEntry>, StoreError> {
        Ok(self.details()?.into_iter().find(|e| &e.id == id))
    }

    /// Insert or replace the summary with the same id.
    pub fn upsert_summary(&self, entry: SummaryEntry) -> Result<(), StoreError> {
        tracing::debug!(id = %entry.id, status = %entry.status, "caching report summary");
        self.upsert(REPORTS_KEY, entry)
    }

    /// Insert or replace the detail record with the same id.
    pub fn upsert_detail(&self, entry: DetailEntry) -> Result<(), StoreError> {
        tracing::debug!(id = %entry.id, evidence = entry.evidence_files.len(), "caching report details");
        self.upsert(DETAILS_KEY, entry)
    }

    /// Move cached entries from `from` to the id the canister assigned.
    ///
    /// Moved entries are marked as mirrored remotely. Entries already stored
    /// under `to` win; the `from` copies are dropped. Returns whether anything
    /// was stored under `from`.
    pub fn rekey(&self, from: &ReportId, to: &ReportId) -> Result<bool, StoreError> {
        let mut summaries = self.summaries()?;
        let moved_summary = rekey_list(&mut summaries, from, to, |e: &mut SummaryEntry| {
            e.origin = ReportOrigin::Remote;
        });
        if moved_summary {
            self.write_json(REPORTS_KEY, &summaries)?;
        }

        let mut details = self.details()?;
        let moved_detail = rekey_list(&mut details, from, to, |e: &mut DetailEntry| {
            e.origin = ReportOrigin::Remote;
        });
        if moved_detail {
            self.write_json(DETAILS_KEY, &details)?;
        }

        Ok(moved_summary || moved_detail)
    }

    /// Whether any cached projection uses this id.
    pub fn contains_report(&self, id: &ReportId) -> Result<bool, StoreError> {
        Ok(self.find_summary(id)?.is_some() || self.find_detail(id)?.is_some())
    }

    /// The shadow token balance, if one was ever recorded.
    pub fn balance(&self) -> Result<Option<Tokens>, StoreError> {
        self.read_json(BALANCE_KEY)
    }

    pub fn set_balance(&self, balance: Tokens) -> Result<(), StoreError> {
        self.write_json(BALANCE_KEY, &balance)
    }

    pub fn outbox(&self) -> Result<Vec<OutboxEntry>, StoreError> {
        Ok(self.read_json(OUTBOX_KEY)?.unwrap_or_default())
    }

    pub fn set_outbox(&self, entries: &[OutboxEntry]) -> Result<(), StoreError> {
        if entries.is_empty() {
            self.store.delete(&self.key(OUTBOX_KEY))
        } else {
            self.write_json(OUTBOX_KEY, entries)
        }
    }

    pub fn push_outbox(&self, entry: OutboxEntry) -> Result<(), StoreError> {
        let mut entries = self.outbox()?;
        entries.push(entry);
        self.set_outbox(&entries)
    }
}

fn rekey_list<T: Keyed>(
    entries: &mut Vec<T>,
    from: &ReportId,
    to: &ReportId,
    mark_mirrored: impl Fn(&mut T),
) -> bool {
    let Some(idx) = entries.iter().position(|e| e.key() == from) else {
        return false;
    };
    if from != to && entries.iter().any(|e| e.key() == to) {
        entries.remove(idx);
        return true;
    }
    entries[idx].set_key(to.clone());
    mark_mirrored(&mut entries[idx]);
    true
}
