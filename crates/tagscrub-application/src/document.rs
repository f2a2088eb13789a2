// SPDX-License-Identifier: GPL-3.0-or-later

//! XML document of items, used to save and resume a scrubbing session.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::Utc;
use quick_xml::de::from_str;
use quick_xml::se::Serializer;
use serde::{Deserialize, Serialize};
use tagscrub_domain::{ChangedFields, IdentifyMethod, Item, QueryResult, TagFields};
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("document I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to render document: {0}")]
    Serialize(#[from] quick_xml::SeError),
    #[error("failed to parse document: {0}")]
    Parse(#[from] quick_xml::DeError),
}

/// How imported items are seeded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ImportMode {
    /// Restore every field as exported.
    #[default]
    Verbatim,
    /// Treat the exported clean values as the new originals so identification
    /// can run again on top of earlier work. Empty clean values fall back to
    /// the exported originals.
    CleanAsOriginal,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename = "items")]
struct ItemDocument {
    #[serde(rename = "@exported", default, skip_serializing_if = "Option::is_none")]
    exported: Option<String>,
    #[serde(rename = "item", default)]
    items: Vec<ItemRecord>,
}

/// Paths and tag text are attributes so surrounding whitespace survives a round trip.
#[derive(Debug, Default, Serialize, Deserialize)]
struct ItemRecord {
    #[serde(rename = "@path")]
    path: String,
    #[serde(default)]
    duplicate: bool,
    #[serde(default)]
    result: String,
    #[serde(default)]
    first_method: String,
    #[serde(default)]
    second_method: String,
    #[serde(default)]
    changed: String,
    #[serde(default)]
    original: FieldsRecord,
    #[serde(default)]
    clean: FieldsRecord,
}

/// Track numbers travel as text; an empty value means "unknown".
#[derive(Debug, Default, Serialize, Deserialize)]
struct FieldsRecord {
    #[serde(rename = "@artist", default)]
    artist: String,
    #[serde(rename = "@album", default)]
    album: String,
    #[serde(rename = "@title", default)]
    title: String,
    #[serde(rename = "@number", default)]
    number: String,
}

impl From<&TagFields> for FieldsRecord {
    fn from(fields: &TagFields) -> Self {
        Self {
            artist: fields.artist.clone(),
            album: fields.album.clone(),
            title: fields.title.clone(),
            number: fields.number.map(|n| n.to_string()).unwrap_or_default(),
        }
    }
}

impl From<FieldsRecord> for TagFields {
    fn from(record: FieldsRecord) -> Self {
        Self {
            artist: record.artist,
            album: record.album,
            title: record.title,
            number: parse_track_number(&record.number),
        }
    }
}

impl From<&Item> for ItemRecord {
    fn from(item: &Item) -> Self {
        Self {
            path: item.path.to_string_lossy().into_owned(),
            duplicate: item.is_duplicate,
            result: item.result.as_str().to_string(),
            first_method: item.first_method.as_str().to_string(),
            second_method: item.second_method.as_str().to_string(),
            changed: item.changed.to_flags(),
            original: FieldsRecord::from(&item.original),
            clean: FieldsRecord::from(&item.clean),
        }
    }
}

impl ItemRecord {
    fn into_item(self, mode: ImportMode) -> Item {
        let original = TagFields::from(self.original);
        let clean = TagFields::from(self.clean);

        match mode {
            ImportMode::Verbatim => Item {
                path: PathBuf::from(self.path),
                original,
                clean,
                result: parse_or_default(&self.result, QueryResult::parse),
                first_method: parse_or_default(&self.first_method, IdentifyMethod::parse),
                second_method: parse_or_default(&self.second_method, IdentifyMethod::parse),
                changed: ChangedFields::from_flags(&self.changed),
                is_duplicate: self.duplicate,
            },
            ImportMode::CleanAsOriginal => {
                let reseeded = TagFields {
                    artist: prefer_clean(clean.artist, original.artist),
                    album: prefer_clean(clean.album, original.album),
                    title: prefer_clean(clean.title, original.title),
                    number: clean.number.or(original.number),
                };
                Item::new(self.path, reseeded).with_duplicate(self.duplicate)
            }
        }
    }
}

fn prefer_clean(clean: String, original: String) -> String {
    if clean.is_empty() {
        original
    } else {
        clean
    }
}

fn parse_or_default<T: Default>(value: &str, parse: impl Fn(&str) -> Option<T>) -> T {
    if value.trim().is_empty() {
        return T::default();
    }
    parse(value).unwrap_or_else(|| {
        warn!(target: "session", value, "unrecognised label in document; using default");
        T::default()
    })
}

/// Leading digits of a track number, so "3/12" reads as 3.
pub fn parse_track_number(value: &str) -> Option<u32> {
    let digits: String = value.trim().chars().take_while(char::is_ascii_digit).collect();
    digits.parse().ok()
}

/// Render `items` as an XML document.
pub fn render_items(items: &[Item]) -> Result<String, DocumentError> {
    let document = ItemDocument {
        exported: Some(Utc::now().to_rfc3339()),
        items: items.iter().map(ItemRecord::from).collect(),
    };

    let mut xml = String::new();
    let mut serializer = Serializer::new(&mut xml);
    serializer.indent(' ', 2);
    document.serialize(serializer)?;
    Ok(xml)
}

/// Parse a document produced by [`render_items`].
pub fn parse_items(xml: &str, mode: ImportMode) -> Result<Vec<Item>, DocumentError> {
    let document: ItemDocument = from_str(xml)?;
    Ok(document
        .items
        .into_iter()
        .map(|record| record.into_item(mode))
        .collect())
}

pub fn export_items(items: &[Item], path: &Path) -> Result<(), DocumentError> {
    let xml = render_items(items)?;
    fs::write(path, xml).map_err(|source| DocumentError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    info!(target: "session", path = %path.display(), items = items.len(), "exported items");
    Ok(())
}

pub fn import_items(path: &Path, mode: ImportMode) -> Result<Vec<Item>, DocumentError> {
    let xml = fs::read_to_string(path).map_err(|source| DocumentError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let items = parse_items(&xml, mode)?;
    info!(target: "session", path = %path.display(), items = items.len(), mode = ?mode, "imported items");
    Ok(items)
}
