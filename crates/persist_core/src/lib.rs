//! # persist_core
//!
//! Persistent metadata for objects the host platform unloads and reloads.
//!
//! Objects are tagged with a numeric id embedded in their display name, and
//! key/value attributes for each id live in a single TOML document, so the
//! attributes can be re-attached whenever the object becomes active again.
//!
//! This crate provides:
//!
//! - [`PersistentId`] and [`IdAllocator`] — monotonically increasing ids
//!   backed by a persisted high-water mark.
//! - [`name`] — encoding ids into and out of display names.
//! - [`Document`] and [`DocumentStore`] — the on-disk document.
//! - [`AttributeSection`] and [`SectionStore`] — per-id attribute access.
//! - [`MetadataPersistence`] — the lifecycle coordinator the host calls into.

pub mod config;
pub mod document;
pub mod error;
pub mod id;
pub mod lifecycle;
pub mod name;
pub mod section;
pub mod value;

pub use config::{PersistenceConfig, ReloadPolicy};
pub use document::{Document, DocumentStore};
pub use error::{DecodeError, StoreError, StoreResult};
pub use id::{IdAllocator, PersistentId};
pub use lifecycle::{ActivationReport, MetadataPersistence, PersistentObject};
pub use section::{AttributeSection, SectionStore};
pub use value::Value;
