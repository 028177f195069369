//! Index document persistence
//!
//! The on-disk format is YAML:
//!
//! ```yaml
//! items:
//!   - kind: component
//!     externalId: 6f1c2d9e-0d6b-4b59-9a7a-1f6c3b1a2e44
//!     id: 1
//!     name: Auth Service
//! ```
//!
//! `serde_yaml` places sequence entries at the same column as their owning
//! key. Some downstream readers reject that layout, so [`to_yaml`] re-indents
//! the block that follows the top-level `items:` key. Nothing else in the
//! text is touched.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{IndexError, Result};
use crate::fs_utils;
use crate::schema::{IndexDocument, IndexItem};

const ITEMS_KEY: &str = "items:";
const LIST_INDENT: usize = 2;

/// A persisted index at a fixed path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexFile {
    path: PathBuf,
}

impl IndexFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn write(&self, doc: &IndexDocument) -> Result<()> {
        write_index(&self.path, doc)
    }

    pub fn read(&self) -> Result<IndexDocument> {
        read_index(&self.path)
    }
}

#[derive(Deserialize)]
struct RawDocument {
    #[serde(default)]
    items: Option<Vec<IndexItem>>,
}

/// Serialize a document with the `items:` block canonically indented
pub fn to_yaml(doc: &IndexDocument) -> Result<String> {
    let text = serde_yaml::to_string(doc)
        .map_err(|e| IndexError::malformed(format!("failed to serialize index: {}", e)))?;
    Ok(indent_items_block(&text))
}

/// Parse a document; a leading byte-order mark is ignored
pub fn from_yaml(text: &str) -> Result<IndexDocument> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    let raw: RawDocument = serde_yaml::from_str(text)
        .map_err(|e| IndexError::malformed(format!("invalid index YAML: {}", e)))?;
    let items = raw
        .items
        .ok_or_else(|| IndexError::malformed("document has no 'items' collection"))?;

    let doc = IndexDocument::from_items(items);
    doc.validate()?;
    Ok(doc)
}

/// Serialize and atomically replace the file at `path`
pub fn write_index(path: &Path, doc: &IndexDocument) -> Result<()> {
    let text = to_yaml(doc)?;
    fs_utils::write_atomic(path, text.as_bytes())
        .map_err(|e| IndexError::persistence(path, e.to_string()))?;
    tracing::info!("Wrote {} index items to {}", doc.len(), path.display());
    Ok(())
}

pub fn read_index(path: &Path) -> Result<IndexDocument> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| IndexError::persistence(path, e.to_string()))?;
    let doc = from_yaml(&text)?;
    tracing::debug!("Read {} index items from {}", doc.len(), path.display());
    Ok(doc)
}

/// Shift the list under a top-level `items:` key so every entry sits at
/// least two columns right of the key.
///
/// The block runs from the line after `items:` to the next non-empty line at
/// column 0 that is not a list marker, or to the end of the text. Lines
/// outside that block are returned unchanged.
pub fn indent_items_block(text: &str) -> String {
    let lines: Vec<&str> = text.split_inclusive('\n').collect();

    let Some(key_line) = lines.iter().position(|l| l.trim_end() == ITEMS_KEY) else {
        return text.to_string();
    };
    let start = key_line + 1;
    let end = lines[start..]
        .iter()
        .position(|l| {
            let content = l.trim_end();
            !content.is_empty() && indent_of(content) == 0 && !is_list_marker(content)
        })
        .map(|offset| start + offset)
        .unwrap_or(lines.len());

    let min_marker = lines[start..end]
        .iter()
        .map(|l| l.trim_end())
        .filter(|l| is_list_marker(l.trim_start()))
        .map(indent_of)
        .min();
    let shift = match min_marker {
        Some(indent) if indent < LIST_INDENT => LIST_INDENT - indent,
        _ => return text.to_string(),
    };

    let pad = " ".repeat(shift);
    let mut out = String::with_capacity(text.len() + (end - start) * shift);
    for (i, line) in lines.iter().enumerate() {
        if (start..end).contains(&i) && !line.trim().is_empty() {
            out.push_str(&pad);
        }
        out.push_str(line);
    }
    out
}

fn indent_of(line: &str) -> usize {
    line.len() - line.trim_start_matches(' ').len()
}

fn is_list_marker(line: &str) -> bool {
    line == "-" || line.starts_with("- ")
}
