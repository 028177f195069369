//! Index construction
//!
//! Drains an [`EntitySource`] kind by kind and assigns each row the next
//! integer of a counter owned by that kind, starting at 1. Property options
//! are drained last with their own counter; options without an identifier
//! keep their sequence number and are stored with the nil identifier.
//!
//! The returned document is always in canonical order, independent of the
//! order rows arrived in. Any enumeration error or cancellation discards the
//! partially built item list.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::error::{IndexError, Result};
use crate::kind::EntityKind;
use crate::schema::{IndexDocument, IndexItem};
use crate::source::EntitySource;

/// Builds [`IndexDocument`]s from an entity source
#[derive(Clone)]
pub struct IndexBuilder {
    source: Arc<dyn EntitySource>,
}

impl IndexBuilder {
    pub fn new(source: Arc<dyn EntitySource>) -> Self {
        Self { source }
    }

    pub fn build(&self, cancel: &CancellationToken) -> Result<IndexDocument> {
        let mut items = Vec::new();

        for kind in EntityKind::NAMED {
            ensure_not_cancelled(cancel)?;
            let mut counter = SequenceCounter::default();
            for row in self.source.entities(kind, cancel)? {
                ensure_not_cancelled(cancel)?;
                let (external_id, name) = row?;
                items.push(IndexItem::new(kind.as_str(), external_id, counter.next(), name));
            }
            tracing::debug!("Indexed {} {} entities", counter.current(), kind);
        }

        ensure_not_cancelled(cancel)?;
        let mut options = SequenceCounter::default();
        let mut anonymous = 0usize;
        for row in self.source.options(cancel)? {
            ensure_not_cancelled(cancel)?;
            let (external_id, text) = row?;
            if external_id.is_none() {
                anonymous += 1;
            }
            items.push(IndexItem::new(
                EntityKind::PropertyOption.as_str(),
                external_id.unwrap_or_else(Uuid::nil),
                options.next(),
                text,
            ));
        }
        tracing::debug!(
            "Indexed {} property options ({} without identifier)",
            options.current(),
            anonymous
        );

        let doc = IndexDocument::from_items(items);
        tracing::info!("Built index with {} items", doc.len());
        Ok(doc)
    }
}

/// Per-kind 1-based sequence
#[derive(Debug, Default)]
struct SequenceCounter(u64);

impl SequenceCounter {
    fn next(&mut self) -> u64 {
        self.0 += 1;
        self.0
    }

    fn current(&self) -> u64 {
        self.0
    }
}

fn ensure_not_cancelled(cancel: &CancellationToken) -> Result<()> {
    if cancel.is_cancelled() {
        Err(IndexError::Cancelled)
    } else {
        Ok(())
    }
}
