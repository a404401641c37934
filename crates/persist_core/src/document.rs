//! The persisted document and its file-backed store.
//!
//! The document is a single TOML file:
//!
//! ```toml
//! id = 2          # allocator high-water mark
//!
//! [0]             # one table per registered identifier
//! level = 5
//!
//! [1]
//! owner = "alex"
//! ```
//!
//! Top-level keys that are neither `id` nor a table under a canonical
//! decimal id (`5`, not `05` or `+5`) are kept as-is and written back
//! untouched.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, trace, warn};

use crate::config::{PersistenceConfig, ReloadPolicy};
use crate::error::{StoreError, StoreResult};
use crate::id::PersistentId;
use crate::section::{AttributeSection, SectionStore};
use crate::value::Value;

/// Key of the allocator high-water mark.
pub const LAST_ID_KEY: &str = "id";

/// In-memory form of the data file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Document {
    last_id: u64,
    sections: BTreeMap<PersistentId, AttributeSection>,
    /// Unrecognised top-level entries, preserved on write.
    extra: toml::Table,
}

impl Document {
    /// Returns the allocator high-water mark.
    #[must_use]
    pub fn last_id(&self) -> u64 {
        self.last_id
    }

    /// Set the allocator high-water mark.
    pub fn set_last_id(&mut self, last_id: u64) {
        self.last_id = last_id;
    }

    /// Returns the stored section for `id`, if any.
    #[must_use]
    pub fn section(&self, id: PersistentId) -> Option<&AttributeSection> {
        self.sections.get(&id)
    }

    /// Replace the section for `id`, returning the previous contents.
    ///
    /// A preserved non-table entry under the same key is dropped, since the
    /// section takes that key in the file.
    pub fn insert_section(
        &mut self,
        id: PersistentId,
        section: AttributeSection,
    ) -> Option<AttributeSection> {
        if let Some(shadowed) = self.extra.remove(&id.to_string()) {
            warn!(%id, %shadowed, "section replaces a non-table entry with the same key");
        }
        self.sections.insert(id, section)
    }

    /// Remove the section for `id`, returning its contents.
    pub fn remove_section(&mut self, id: PersistentId) -> Option<AttributeSection> {
        self.sections.remove(&id)
    }

    /// Returns all section ids in ascending order.
    pub fn section_ids(&self) -> impl Iterator<Item = PersistentId> + '_ {
        self.sections.keys().copied()
    }

    /// Returns an iterator over all sections in id order.
    pub fn sections(&self) -> impl Iterator<Item = (PersistentId, &AttributeSection)> {
        self.sections.iter().map(|(id, section)| (*id, section))
    }

    /// Build a document from a parsed TOML table.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::InvalidDocument`] if `id` is not a non-negative
    /// integer.
    pub fn from_table(table: toml::Table) -> StoreResult<Self> {
        let mut document = Self::default();

        for (key, value) in table {
            if key == LAST_ID_KEY {
                document.last_id = value
                    .as_integer()
                    .and_then(|id| u64::try_from(id).ok())
                    .ok_or_else(|| {
                        StoreError::InvalidDocument(format!(
                            "`{LAST_ID_KEY}` must be a non-negative integer, found {value}"
                        ))
                    })?;
                continue;
            }

            // Only the canonical spelling is a section; "05" or "+5" would
            // otherwise collide with "5" and be lost on the next write.
            let canonical = key
                .parse::<PersistentId>()
                .ok()
                .filter(|id| id.to_string() == key);

            match (canonical, value) {
                (Some(id), toml::Value::Table(entries)) => {
                    let section = entries
                        .into_iter()
                        .map(|(k, v)| (k, Value::from_toml(v)))
                        .collect();
                    document.sections.insert(id, section);
                }
                (_, value) => {
                    trace!(key = %key, "preserving unrecognised document entry");
                    document.extra.insert(key, value);
                }
            }
        }

        Ok(document)
    }

    /// Render the document as a TOML table.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::IdOverflow`] if the high-water mark exceeds the
    /// TOML integer range.
    pub fn to_table(&self) -> StoreResult<toml::Table> {
        let mut table = self.extra.clone();

        let last_id = i64::try_from(self.last_id)
            .map_err(|_| StoreError::IdOverflow(PersistentId(self.last_id)))?;
        table.insert(LAST_ID_KEY.to_string(), toml::Value::Integer(last_id));

        for (id, section) in &self.sections {
            let entries = section
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_toml()))
                .collect();
            table.insert(id.to_string(), toml::Value::Table(entries));
        }

        Ok(table)
    }
}

/// File-backed access to the [`Document`].
///
/// Every write replaces the file atomically: the new contents go to a
/// sibling temporary file which is synced and then renamed over the target.
#[derive(Debug)]
pub struct DocumentStore {
    path: PathBuf,
    reload: ReloadPolicy,
    cache: Option<Document>,
}

impl DocumentStore {
    /// Create a store for the configured data file. The file is not touched
    /// until the first access.
    #[must_use]
    pub fn open(config: &PersistenceConfig) -> Self {
        Self {
            path: config.data_file.clone(),
            reload: config.reload,
            cache: None,
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Borrow the store as a [`SectionStore`].
    pub fn sections(&mut self) -> SectionStore<'_> {
        SectionStore::new(self)
    }

    /// Read the current document. A missing file reads as an empty document.
    ///
    /// # Errors
    ///
    /// Returns a store error if the file exists but cannot be read or parsed.
    pub fn load(&mut self) -> StoreResult<Document> {
        if self.reload == ReloadPolicy::Cached
            && let Some(document) = &self.cache
        {
            return Ok(document.clone());
        }

        let document = self.read_file()?;
        if self.reload == ReloadPolicy::Cached {
            self.cache = Some(document.clone());
        }
        Ok(document)
    }

    /// Write the whole document to disk.
    ///
    /// # Errors
    ///
    /// Returns a store error if rendering or writing fails. The previous file
    /// contents are left intact in that case.
    pub fn save(&mut self, document: &Document) -> StoreResult<()> {
        let contents = toml::to_string(&document.to_table()?)?;
        self.write_atomic(contents.as_bytes())?;
        debug!(
            path = %self.path.display(),
            sections = document.sections.len(),
            last_id = document.last_id,
            "document saved"
        );

        if self.reload == ReloadPolicy::Cached {
            self.cache = Some(document.clone());
        }
        Ok(())
    }

    /// Read the document, apply `f`, and write the result back.
    ///
    /// # Errors
    ///
    /// Returns a store error if either the read or the write fails.
    pub fn update<R>(&mut self, f: impl FnOnce(&mut Document) -> R) -> StoreResult<R> {
        let mut document = self.load()?;
        let result = f(&mut document);
        self.save(&document)?;
        Ok(result)
    }

    fn read_file(&self) -> StoreResult<Document> {
        let text = match std::fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                trace!(path = %self.path.display(), "data file missing, starting empty");
                return Ok(Document::default());
            }
            Err(e) => return Err(StoreError::io(&self.path, e)),
        };

        let table = toml::from_str::<toml::Table>(&text).map_err(|source| StoreError::Parse {
            path: self.path.clone(),
            source,
        })?;
        Document::from_table(table)
    }

    fn write_atomic(&self, contents: &[u8]) -> StoreResult<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| StoreError::io(parent, e))?;
        }

        let mut tmp_name = self
            .path
            .file_name()
            .map(|name| name.to_os_string())
            .unwrap_or_default();
        tmp_name.push(".tmp");
        let tmp_path = self.path.with_file_name(tmp_name);

        {
            let file = File::create(&tmp_path).map_err(|e| StoreError::io(&tmp_path, e))?;
            let mut writer = BufWriter::new(file);
            writer
                .write_all(contents)
                .map_err(|e| StoreError::io(&tmp_path, e))?;
            let file = writer
                .into_inner()
                .map_err(|e| StoreError::io(&tmp_path, e.into_error()))?;
            file.sync_all().map_err(|e| StoreError::io(&tmp_path, e))?;
        }

        std::fs::rename(&tmp_path, &self.path).map_err(|e| {
            let _ = std::fs::remove_file(&tmp_path);
            StoreError::io(&self.path, e)
        })
    }
}
