//! Lifecycle coordination between host objects and the document.
//!
//! [`MetadataPersistence`] is the boundary the host integration calls into.
//! Nothing past this point returns an error to the host: decode failures
//! and store failures are logged and degrade to `false` / `None`, so a bad
//! object or a failing disk never aborts object creation or chunk loading.
//!
//! Per object the states are `Untagged -> Tagged -> (Active | Deleted)`.
//! Tagging happens in [`MetadataPersistence::register_persistent_metadata`];
//! every group activation rehydrates transient metadata from the document.

use tracing::{debug, error, info, warn};

use crate::config::PersistenceConfig;
use crate::document::DocumentStore;
use crate::error::{DecodeError, StoreResult};
use crate::id::{IdAllocator, PersistentId};
use crate::name;
use crate::value::Value;

/// What the host must expose for an object to take part in persistence.
pub trait PersistentObject {
    /// The object's display name, if it has one.
    fn display_name(&self) -> Option<&str>;

    /// Replace the object's display name. The host must persist this field
    /// with the object.
    fn set_display_name(&mut self, name: String);

    /// Attach a value to the object's in-memory metadata. This is not
    /// expected to survive the object being unloaded.
    fn attach_transient(&mut self, key: &str, value: Value);
}

/// Outcome of rehydrating one activated group.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ActivationReport {
    /// Objects whose stored attributes were attached.
    pub restored: usize,
    /// Objects that carry no usable tag.
    pub skipped: usize,
    /// Tagged objects that could not be restored because the document was
    /// unreadable.
    pub failed: usize,
    /// Total attributes attached across the group.
    pub attributes: usize,
}

/// Persists object metadata across unload/reload.
#[derive(Debug)]
pub struct MetadataPersistence {
    documents: DocumentStore,
    allocator: IdAllocator,
}

impl MetadataPersistence {
    /// Open the data file and read the allocator state.
    ///
    /// # Errors
    ///
    /// Returns a store error if an existing data file cannot be read.
    pub fn open(config: &PersistenceConfig) -> StoreResult<Self> {
        let mut documents = DocumentStore::open(config);
        let allocator = IdAllocator::load(&mut documents)?;
        info!(
            path = %documents.path().display(),
            next_id = %allocator.current(),
            "metadata persistence ready"
        );
        Ok(Self {
            documents,
            allocator,
        })
    }

    /// Returns the next id that will be allocated.
    #[must_use]
    pub fn current_id(&self) -> PersistentId {
        self.allocator.current()
    }

    /// Direct access to the underlying store, for tooling.
    pub fn documents(&mut self) -> &mut DocumentStore {
        &mut self.documents
    }

    /// Read the identifier tagged onto `object`.
    ///
    /// # Errors
    ///
    /// Returns a [`DecodeError`] if the object is untagged or the tag is
    /// malformed.
    pub fn identify<O: PersistentObject + ?Sized>(object: &O) -> Result<PersistentId, DecodeError> {
        name::decode(object.display_name())
    }

    /// Tag `object` with a fresh identifier.
    ///
    /// Always allocates: the current display name is kept verbatim after the
    /// new prefix, even if it already looks like a tag. Returns `false` if
    /// the new high-water mark could not be persisted, in which case the
    /// object is left untagged.
    pub fn register_persistent_metadata<O: PersistentObject + ?Sized>(
        &mut self,
        object: &mut O,
    ) -> bool {
        let id = match self.allocator.next(&mut self.documents) {
            Ok(id) => id,
            Err(e) => {
                error!(error = %e, "failed to allocate identifier");
                return false;
            }
        };

        let tagged = name::encode(id, object.display_name());
        debug!(%id, display = %tagged, "tagged object");
        object.set_display_name(tagged);
        true
    }

    /// Delete the stored attributes of `object`. The object keeps its tag
    /// and its id is never reused.
    pub fn unregister_persistent_metadata<O: PersistentObject + ?Sized>(
        &mut self,
        object: &O,
    ) -> bool {
        let id = match Self::identify(object) {
            Ok(id) => id,
            Err(e) => {
                warn!(error = %e, "cannot unregister object");
                return false;
            }
        };

        match self.documents.sections().delete_section(id) {
            Ok(_) => true,
            Err(e) => {
                error!(%id, error = %e, "failed to delete section");
                false
            }
        }
    }

    /// Attach `value` to `object` and persist it under `key`.
    ///
    /// The transient attachment always happens. Returns `false` if the value
    /// could not be persisted.
    pub fn set_metadata<O: PersistentObject + ?Sized>(
        &mut self,
        object: &mut O,
        key: &str,
        value: impl Into<Value>,
    ) -> bool {
        let value = value.into();
        object.attach_transient(key, value.clone());

        let id = match Self::identify(&*object) {
            Ok(id) => id,
            Err(e) => {
                warn!(key, error = %e, "metadata not persisted");
                return false;
            }
        };

        match self.documents.sections().set_attribute(id, key, value) {
            Ok(()) => true,
            Err(e) => {
                error!(%id, key, error = %e, "failed to persist metadata");
                false
            }
        }
    }

    /// Returns the persisted value of `key` for `object`.
    pub fn get_metadata<O: PersistentObject + ?Sized>(
        &mut self,
        object: &O,
        key: &str,
    ) -> Option<Value> {
        let id = match Self::identify(object) {
            Ok(id) => id,
            Err(e) => {
                warn!(key, error = %e, "metadata lookup on untagged object");
                return None;
            }
        };

        self.documents
            .sections()
            .get_attribute(id, key)
            .unwrap_or_else(|e| {
                error!(%id, key, error = %e, "failed to read metadata");
                None
            })
    }

    /// Remove `key` from the persisted attributes of `object`, returning the
    /// old value. The transient attachment is left to the host.
    pub fn remove_metadata<O: PersistentObject + ?Sized>(
        &mut self,
        object: &O,
        key: &str,
    ) -> Option<Value> {
        let id = match Self::identify(object) {
            Ok(id) => id,
            Err(e) => {
                warn!(key, error = %e, "metadata removal on untagged object");
                return None;
            }
        };

        self.documents
            .sections()
            .remove_attribute(id, key)
            .unwrap_or_else(|e| {
                error!(%id, key, error = %e, "failed to remove metadata");
                None
            })
    }

    /// Rehydrate transient metadata for a group of freshly activated objects.
    ///
    /// Each object is handled independently: untagged objects are skipped
    /// and the rest of the group is still restored. The document is read
    /// once for the whole group.
    pub fn on_group_activated<'a, O, I>(&mut self, objects: I) -> ActivationReport
    where
        O: PersistentObject + ?Sized + 'a,
        I: IntoIterator<Item = &'a mut O>,
    {
        let mut report = ActivationReport::default();
        let document = self.documents.load();

        for object in objects {
            let id = match Self::identify(&*object) {
                Ok(id) => id,
                Err(e) => {
                    debug!(error = %e, "skipping untagged object");
                    report.skipped += 1;
                    continue;
                }
            };

            let document = match &document {
                Ok(document) => document,
                Err(e) => {
                    error!(%id, error = %e, "cannot restore metadata");
                    report.failed += 1;
                    continue;
                }
            };

            if let Some(section) = document.section(id) {
                for (key, value) in section.iter() {
                    object.attach_transient(key, value.clone());
                    report.attributes += 1;
                }
            }
            report.restored += 1;
        }

        debug!(
            restored = report.restored,
            skipped = report.skipped,
            failed = report.failed,
            attributes = report.attributes,
            "group activated"
        );
        report
    }
}
