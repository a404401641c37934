//! Subcommands that read or edit the data file directly.

use std::collections::BTreeMap;

use anyhow::{Context, Result};
use persist_core::{AttributeSection, Document, DocumentStore, PersistenceConfig, PersistentId, Value};
use tracing::info;

/// Print the high-water mark and all sections.
pub fn show(config: &PersistenceConfig, json: bool) -> Result<()> {
    let document = DocumentStore::open(config).load()?;
    if json {
        println!("{}", render_json(&document)?);
    } else {
        print!("{}", render_text(&document));
    }
    Ok(())
}

/// Print one attribute, or report that it is not set.
pub fn get(config: &PersistenceConfig, id: PersistentId, key: &str) -> Result<()> {
    let mut store = DocumentStore::open(config);
    match store.sections().get_attribute(id, key)? {
        Some(value) => println!("{value}"),
        None => eprintln!("{id}.{key} is not set"),
    }
    Ok(())
}

/// Set one attribute from a TOML literal or plain text.
pub fn set(config: &PersistenceConfig, id: PersistentId, key: &str, raw: &str) -> Result<()> {
    let value = Value::parse_literal(raw);
    let mut store = DocumentStore::open(config);
    store
        .sections()
        .set_attribute(id, key, value.clone())
        .with_context(|| format!("failed to set {id}.{key}"))?;
    info!(%id, key, %value, "attribute set");
    Ok(())
}

/// Remove one attribute.
pub fn unset(config: &PersistenceConfig, id: PersistentId, key: &str) -> Result<()> {
    let mut store = DocumentStore::open(config);
    match store.sections().remove_attribute(id, key)? {
        Some(old) => info!(%id, key, %old, "attribute removed"),
        None => eprintln!("{id}.{key} is not set"),
    }
    Ok(())
}

/// Delete the whole section of `id`.
pub fn delete(config: &PersistenceConfig, id: PersistentId) -> Result<()> {
    let mut store = DocumentStore::open(config);
    if store.sections().delete_section(id)? {
        info!(%id, "section deleted");
    } else {
        eprintln!("no section for {id}");
    }
    Ok(())
}

/// Print the next id that will be allocated.
pub fn next_id(config: &PersistenceConfig) -> Result<()> {
    let document = DocumentStore::open(config).load()?;
    println!("{}", document.last_id());
    Ok(())
}

fn render_text(document: &Document) -> String {
    let mut out = format!("next id: {}\n", document.last_id());
    for (id, section) in document.sections() {
        out.push_str(&format!("[{id}]\n"));
        for (key, value) in section.iter() {
            out.push_str(&format!("  {key} = {value}\n"));
        }
    }
    out
}

fn render_json(document: &Document) -> Result<String> {
    let sections: BTreeMap<String, &AttributeSection> = document
        .sections()
        .map(|(id, section)| (id.to_string(), section))
        .collect();
    let dump = serde_json::json!({
        "id": document.last_id(),
        "sections": sections,
    });
    Ok(serde_json::to_string_pretty(&dump)?)
}
