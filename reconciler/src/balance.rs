//! The locally tracked token balance.

use tokio::sync::watch;
use whispr_store::{KeyValueStore, LocalCache, StoreError};
use whispr_types::Tokens;

/// Shadow balance persisted in the local cache.
///
/// The balance only ever moves through this type, so every change is also
/// published to [`subscribe`](Self::subscribe) receivers. Arithmetic
/// saturates at zero.
pub struct ShadowBalance {
    initial: Tokens,
    tx: watch::Sender<Tokens>,
}

impl ShadowBalance {
    /// `initial` is the balance assumed before anything was recorded;
    /// `current` seeds the change feed.
    pub fn new(initial: Tokens, current: Tokens) -> Self {
        let (tx, _rx) = watch::channel(current);
        Self { initial, tx }
    }

    pub fn current<S: KeyValueStore>(&self, cache: &LocalCache<S>) -> Result<Tokens, StoreError> {
        Ok(cache.balance()?.unwrap_or(self.initial))
    }

    pub fn set<S: KeyValueStore>(
        &self,
        cache: &LocalCache<S>,
        value: Tokens,
    ) -> Result<Tokens, StoreError> {
        cache.set_balance(value)?;
        self.tx.send_if_modified(|held| {
            let changed = *held != value;
            *held = value;
            changed
        });
        Ok(value)
    }

    pub fn debit<S: KeyValueStore>(
        &self,
        cache: &LocalCache<S>,
        amount: Tokens,
    ) -> Result<Tokens, StoreError> {
        let current = self.current(cache)?;
        self.set(cache, current.saturating_sub(amount))
    }

    pub fn credit<S: KeyValueStore>(
        &self,
        cache: &LocalCache<S>,
        amount: Tokens,
    ) -> Result<Tokens, StoreError> {
        let current = self.current(cache)?;
        self.set(cache, current.saturating_add(amount))
    }

    pub fn subscribe(&self) -> watch::Receiver<Tokens> {
        self.tx.subscribe()
    }
}
