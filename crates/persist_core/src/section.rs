//! Attribute sections keyed by identifier.
//!
//! A [`SectionStore`] is a short-lived view over a [`DocumentStore`]. Reads
//! go through the store's reload policy; every write is a full
//! read-modify-write of the document.
//!
//! `set_attribute` rewrites the whole owning section. Two writers that read
//! the same section and then write different keys will lose one update.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::document::DocumentStore;
use crate::error::StoreResult;
use crate::id::PersistentId;
use crate::value::Value;

/// The key/value attributes stored for one identifier.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AttributeSection {
    entries: BTreeMap<String, Value>,
}

impl AttributeSection {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }

    /// Set `key`, returning the previous value.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.entries.insert(key.into(), value.into())
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.entries.remove(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<(String, Value)> for AttributeSection {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

/// Create/read/replace/delete access to attribute sections.
#[derive(Debug)]
pub struct SectionStore<'a> {
    documents: &'a mut DocumentStore,
}

impl<'a> SectionStore<'a> {
    pub(crate) fn new(documents: &'a mut DocumentStore) -> Self {
        Self { documents }
    }

    /// Returns the section for `id`, or a new empty one if none is stored.
    /// A new section is not written until it is replaced.
    ///
    /// # Errors
    ///
    /// Returns a store error if the document cannot be read.
    pub fn get_or_create_section(&mut self, id: PersistentId) -> StoreResult<AttributeSection> {
        Ok(self
            .documents
            .load()?
            .section(id)
            .cloned()
            .unwrap_or_default())
    }

    /// Remove the section for `id`. Returns `false` if there was nothing to
    /// remove, in which case the file is left alone.
    ///
    /// # Errors
    ///
    /// Returns a store error if the document cannot be read or written.
    pub fn delete_section(&mut self, id: PersistentId) -> StoreResult<bool> {
        let mut document = self.documents.load()?;
        if document.remove_section(id).is_none() {
            debug!(%id, "no section to delete");
            return Ok(false);
        }
        self.documents.save(&document)?;
        debug!(%id, "section deleted");
        Ok(true)
    }

    /// Store a copy of `section` as the attributes for `id`, replacing
    /// whatever was there.
    ///
    /// # Errors
    ///
    /// Returns a store error if the document cannot be read or written.
    pub fn replace_section(&mut self, id: PersistentId, section: &AttributeSection) -> StoreResult<()> {
        let copy: AttributeSection = section
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect();
        let attributes = copy.len();
        self.documents.update(|document| {
            document.insert_section(id, copy);
        })?;
        debug!(%id, attributes, "section replaced");
        Ok(())
    }

    /// Returns one attribute of `id`, if set.
    ///
    /// # Errors
    ///
    /// Returns a store error if the document cannot be read.
    pub fn get_attribute(&mut self, id: PersistentId, key: &str) -> StoreResult<Option<Value>> {
        Ok(self
            .documents
            .load()?
            .section(id)
            .and_then(|section| section.get(key))
            .cloned())
    }

    /// Set one attribute of `id` and persist the whole section.
    ///
    /// # Errors
    ///
    /// Returns a store error if the document cannot be read or written.
    pub fn set_attribute(
        &mut self,
        id: PersistentId,
        key: &str,
        value: impl Into<Value>,
    ) -> StoreResult<()> {
        let mut section = self.get_or_create_section(id)?;
        section.set(key, value);
        self.replace_section(id, &section)
    }

    /// Remove one attribute of `id`, returning its old value. Nothing is
    /// written if the key was not set.
    ///
    /// # Errors
    ///
    /// Returns a store error if the document cannot be read or written.
    pub fn remove_attribute(&mut self, id: PersistentId, key: &str) -> StoreResult<Option<Value>> {
        let mut section = self.get_or_create_section(id)?;
        let removed = section.remove(key);
        if removed.is_some() {
            self.replace_section(id, &section)?;
        }
        Ok(removed)
    }

    /// Returns the ids of all stored sections in ascending order.
    ///
    /// # Errors
    ///
    /// Returns a store error if the document cannot be read.
    pub fn section_ids(&mut self) -> StoreResult<Vec<PersistentId>> {
        Ok(self.documents.load()?.section_ids().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PersistenceConfig;

    fn store_in(dir: &tempfile::TempDir) -> DocumentStore {
        DocumentStore::open(&PersistenceConfig::new(dir.path().join("data.toml")))
    }

    #[test]
    fn test_missing_section_is_empty_and_unsaved() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = store_in(&dir);
        let section = store.sections().get_or_create_section(PersistentId(3)).unwrap();
        assert!(section.is_empty());
        assert!(!store.path().exists());
    }

    #[test]
    fn test_set_then_get_attribute() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = store_in(&dir);
        let mut sections = store.sections();

        sections.set_attribute(PersistentId(0), "level", 5).unwrap();
        sections.set_attribute(PersistentId(0), "owner", "alex").unwrap();

        assert_eq!(
            sections.get_attribute(PersistentId(0), "level").unwrap(),
            Some(Value::Integer(5))
        );
        assert_eq!(
            sections.get_attribute(PersistentId(0), "owner").unwrap(),
            Some(Value::from("alex"))
        );
        assert_eq!(sections.get_attribute(PersistentId(0), "missing").unwrap(), None);
        assert_eq!(sections.get_attribute(PersistentId(1), "level").unwrap(), None);
    }

    #[test]
    fn test_attributes_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let mut nested = BTreeMap::new();
        nested.insert("x".to_string(), Value::Float(1.5));
        nested.insert("tags".to_string(), Value::List(vec![Value::from("a")]));
        {
            let mut store = store_in(&dir);
            let mut sections = store.sections();
            sections.set_attribute(PersistentId(4), "pos", nested.clone()).unwrap();
            sections.set_attribute(PersistentId(4), "boss", true).unwrap();
        }

        let mut store = store_in(&dir);
        let mut sections = store.sections();
        assert_eq!(
            sections.get_attribute(PersistentId(4), "pos").unwrap(),
            Some(Value::Map(nested))
        );
        assert_eq!(
            sections.get_attribute(PersistentId(4), "boss").unwrap(),
            Some(Value::Boolean(true))
        );
    }

    #[test]
    fn test_delete_then_create_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = store_in(&dir);
        let mut sections = store.sections();

        sections.set_attribute(PersistentId(1), "level", 5).unwrap();
        assert!(sections.delete_section(PersistentId(1)).unwrap());
        assert!(sections.get_or_create_section(PersistentId(1)).unwrap().is_empty());
        assert!(!sections.delete_section(PersistentId(1)).unwrap());
    }

    #[test]
    fn test_replace_section_copies_contents() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = store_in(&dir);
        let mut sections = store.sections();

        sections.set_attribute(PersistentId(2), "stale", 1).unwrap();

        let mut section = AttributeSection::new();
        section.set("fresh", 2);
        sections.replace_section(PersistentId(2), &section).unwrap();
        section.set("later", 3);

        let stored = sections.get_or_create_section(PersistentId(2)).unwrap();
        assert_eq!(stored.keys().collect::<Vec<_>>(), vec!["fresh"]);
    }

    #[test]
    fn test_remove_attribute() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = store_in(&dir);
        let mut sections = store.sections();

        sections.set_attribute(PersistentId(0), "level", 5).unwrap();
        assert_eq!(
            sections.remove_attribute(PersistentId(0), "level").unwrap(),
            Some(Value::Integer(5))
        );
        assert_eq!(sections.remove_attribute(PersistentId(0), "level").unwrap(), None);
        assert_eq!(sections.section_ids().unwrap(), vec![PersistentId(0)]);
    }

    #[test]
    fn test_writes_keep_high_water_mark() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = store_in(&dir);
        store.update(|doc| doc.set_last_id(7)).unwrap();

        store.sections().set_attribute(PersistentId(6), "level", 1).unwrap();
        assert_eq!(store.load().unwrap().last_id(), 7);
    }

    #[test]
    fn test_lost_update_on_overlapping_writes() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = store_in(&dir);

        let mut first = store.sections().get_or_create_section(PersistentId(0)).unwrap();
        let mut second = first.clone();
        first.set("a", 1);
        second.set("b", 2);

        store.sections().replace_section(PersistentId(0), &first).unwrap();
        store.sections().replace_section(PersistentId(0), &second).unwrap();

        let stored = store.sections().get_or_create_section(PersistentId(0)).unwrap();
        assert_eq!(stored.get("a"), None);
        assert_eq!(stored.get("b"), Some(&Value::Integer(2)));
    }
}
