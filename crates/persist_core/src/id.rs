//! Persistent identifiers and their allocator.
//!
//! A [`PersistentId`] is a plain `u64` tag. Ids are handed out by the
//! [`IdAllocator`] from a high-water mark stored in the document's `id` field,
//! so they stay unique across process restarts.

use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::document::DocumentStore;
use crate::error::StoreResult;

/// A stable identifier for an object whose metadata is persisted.
///
/// Identifiers are never recycled: once allocated, an id is never handed out
/// again, even after its section is deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PersistentId(pub u64);

impl PersistentId {
    /// Create an identifier from a raw `u64`.
    #[must_use]
    pub const fn from_raw(id: u64) -> Self {
        Self(id)
    }

    /// Returns the raw `u64` identifier.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for PersistentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for PersistentId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<u64>().map(Self)
    }
}

/// Allocates monotonically increasing identifiers backed by the document's
/// `id` field.
///
/// The in-memory counter is optimistic: if writing the new high-water mark
/// fails, the counter has still advanced and the id is wasted. Ids are
/// therefore never duplicated, only skipped.
#[derive(Debug)]
pub struct IdAllocator {
    last_id: u64,
}

impl IdAllocator {
    /// Read the persisted high-water mark (0 if the document has none).
    ///
    /// # Errors
    ///
    /// Returns a store error if the document cannot be read.
    pub fn load(store: &mut DocumentStore) -> StoreResult<Self> {
        let last_id = store.load()?.last_id();
        debug!(last_id, "id allocator loaded");
        Ok(Self { last_id })
    }

    /// Returns the next id that would be allocated, without allocating it.
    #[must_use]
    pub fn current(&self) -> PersistentId {
        PersistentId(self.last_id)
    }

    /// Allocate a fresh id and persist the new high-water mark.
    ///
    /// If the document on disk is ahead of the in-memory counter (another
    /// writer allocated in the meantime), the counter is fast-forwarded first.
    ///
    /// # Errors
    ///
    /// Returns a store error if the high-water mark cannot be written. The
    /// counter is not rolled back in that case and the returned-to-nobody id
    /// must not be used.
    pub fn next(&mut self, store: &mut DocumentStore) -> StoreResult<PersistentId> {
        let mut document = match store.load() {
            Ok(document) => document,
            Err(e) => {
                self.last_id += 1;
                error!(wasted = self.last_id - 1, error = %e, "failed to read document, id skipped");
                return Err(e);
            }
        };

        self.last_id = self.last_id.max(document.last_id());
        let id = PersistentId(self.last_id);
        self.last_id += 1;

        document.set_last_id(self.last_id);
        if let Err(e) = store.save(&document) {
            error!(%id, error = %e, "failed to persist id high-water mark, id skipped");
            return Err(e);
        }

        debug!(%id, last_id = self.last_id, "allocated id");
        Ok(id)
    }
}
