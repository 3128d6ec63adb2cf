//! Favorites store
//!
//! A key-set of favorite track ids. Persistence is up to the implementor; the
//! session only needs membership queries, add/remove, and a change signal so
//! the published favorite flag can follow edits made elsewhere.

use std::collections::BTreeSet;

use tokio::sync::watch;
use tracing::debug;

use crate::Result;

/// Favorite-flag persistence collaborator
pub trait FavoritesStore: Send + Sync {
    /// Whether `id` is currently a favorite
    fn is_favorite(&self, id: &str) -> bool;

    /// Mark `id` as favorite (no-op if already present)
    fn add(&self, id: &str) -> Result<()>;

    /// Unmark `id` (no-op if absent)
    fn remove(&self, id: &str) -> Result<()>;

    /// Receiver that is notified whenever the favorite set changes
    fn subscribe(&self) -> watch::Receiver<BTreeSet<String>>;
}

/// In-memory favorites store
pub struct MemoryFavorites {
    ids: watch::Sender<BTreeSet<String>>,
}

impl MemoryFavorites {
    pub fn new() -> Self {
        let (ids, _) = watch::channel(BTreeSet::new());
        Self { ids }
    }

    /// Create a store pre-populated with `ids`
    pub fn with_ids<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let set: BTreeSet<String> = ids.into_iter().map(Into::into).collect();
        let (ids, _) = watch::channel(set);
        Self { ids }
    }

    /// Snapshot of all favorite ids
    pub fn all(&self) -> BTreeSet<String> {
        self.ids.borrow().clone()
    }
}

impl Default for MemoryFavorites {
    fn default() -> Self {
        Self::new()
    }
}

impl FavoritesStore for MemoryFavorites {
    fn is_favorite(&self, id: &str) -> bool {
        self.ids.borrow().contains(id)
    }

    fn add(&self, id: &str) -> Result<()> {
        let inserted = self.ids.send_if_modified(|ids| ids.insert(id.to_string()));
        debug!(id, inserted, "Favorite added");
        Ok(())
    }

    fn remove(&self, id: &str) -> Result<()> {
        let removed = self.ids.send_if_modified(|ids| ids.remove(id));
        debug!(id, removed, "Favorite removed");
        Ok(())
    }

    fn subscribe(&self) -> watch::Receiver<BTreeSet<String>> {
        self.ids.subscribe()
    }
}
