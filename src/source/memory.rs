//! In-process entity source

use std::collections::HashMap;

use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use super::{EntityRow, EntitySource, OptionRow, Rows};
use crate::error::{IndexError, Result};
use crate::kind::EntityKind;

/// Entity source backed by vectors held in memory
///
/// Rows are returned ordered by name regardless of insertion order, and
/// named-kind rows with a nil identifier are skipped, matching what the
/// relational source does with NULL identifiers.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    entities: HashMap<EntityKind, Vec<EntityRow>>,
    options: Vec<OptionRow>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entity(mut self, kind: EntityKind, id: Uuid, name: impl Into<String>) -> Self {
        self.push_entity(kind, id, name);
        self
    }

    pub fn with_option(mut self, id: Option<Uuid>, text: impl Into<String>) -> Self {
        self.push_option(id, text);
        self
    }

    /// Add a row to a named kind. Option rows pushed this way go to the
    /// option sequence.
    pub fn push_entity(&mut self, kind: EntityKind, id: Uuid, name: impl Into<String>) {
        if kind == EntityKind::PropertyOption {
            self.options.push((Some(id), name.into()));
        } else {
            self.entities.entry(kind).or_default().push((id, name.into()));
        }
    }

    pub fn push_option(&mut self, id: Option<Uuid>, text: impl Into<String>) {
        self.options.push((id, text.into()));
    }

    pub fn len(&self) -> usize {
        self.entities.values().map(Vec::len).sum::<usize>() + self.options.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl EntitySource for MemorySource {
    fn entities<'a>(
        &'a self,
        kind: EntityKind,
        cancel: &'a CancellationToken,
    ) -> Result<Rows<'a, EntityRow>> {
        if kind == EntityKind::PropertyOption {
            return Err(IndexError::invalid_argument(
                "property options are enumerated through options()",
            ));
        }

        let mut rows: Vec<&EntityRow> = self
            .entities
            .get(&kind)
            .map(|rows| rows.iter().filter(|(id, _)| !id.is_nil()).collect())
            .unwrap_or_default();
        rows.sort_by(|a, b| a.1.cmp(&b.1));

        Ok(cancellable(rows.into_iter().cloned(), cancel))
    }

    fn options<'a>(&'a self, cancel: &'a CancellationToken) -> Result<Rows<'a, OptionRow>> {
        let mut rows: Vec<&OptionRow> = self.options.iter().collect();
        rows.sort_by(|a, b| a.1.cmp(&b.1));
        Ok(cancellable(rows.into_iter().cloned(), cancel))
    }
}

fn cancellable<'a, T: 'a>(
    rows: impl Iterator<Item = T> + 'a,
    cancel: &'a CancellationToken,
) -> Rows<'a, T> {
    let mut cancelled = false;
    Box::new(rows.map_while(move |row| {
        if cancelled {
            return None;
        }
        if cancel.is_cancelled() {
            cancelled = true;
            return Some(Err(IndexError::Cancelled));
        }
        Some(Ok(row))
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rows_are_ordered_by_name() {
        let source = MemorySource::new()
            .with_entity(EntityKind::Component, Uuid::new_v4(), "Gateway")
            .with_entity(EntityKind::Component, Uuid::new_v4(), "Auth Service");
        let cancel = CancellationToken::new();

        let names: Vec<String> = source
            .entities(EntityKind::Component, &cancel)
            .unwrap()
            .map(|r| r.unwrap().1)
            .collect();
        assert_eq!(names, vec!["Auth Service", "Gateway"]);
    }

    #[test]
    fn test_nil_ids_skipped_for_named_kinds_only() {
        let source = MemorySource::new()
            .with_entity(EntityKind::Threat, Uuid::nil(), "ghost")
            .with_entity(EntityKind::Threat, Uuid::new_v4(), "real")
            .with_option(None, "Low");
        let cancel = CancellationToken::new();

        assert_eq!(source.entities(EntityKind::Threat, &cancel).unwrap().count(), 1);
        let options: Vec<OptionRow> = source
            .options(&cancel)
            .unwrap()
            .collect::<Result<_>>()
            .unwrap();
        assert_eq!(options, vec![(None, "Low".to_string())]);
    }

    #[test]
    fn test_option_kind_rejected_on_entities() {
        let source = MemorySource::new();
        let cancel = CancellationToken::new();
        assert!(source.entities(EntityKind::PropertyOption, &cancel).is_err());
    }

    #[test]
    fn test_cancelled_sequence_yields_error_then_ends() {
        let source = MemorySource::new()
            .with_entity(EntityKind::Library, Uuid::new_v4(), "a")
            .with_entity(EntityKind::Library, Uuid::new_v4(), "b");
        let cancel = CancellationToken::new();
        cancel.cancel();

        let rows: Vec<Result<EntityRow>> =
            source.entities(EntityKind::Library, &cancel).unwrap().collect();
        assert_eq!(rows.len(), 1);
        assert!(matches!(rows[0], Err(IndexError::Cancelled)));
    }

    #[test]
    fn test_unknown_kind_is_empty() {
        let source = MemorySource::new();
        let cancel = CancellationToken::new();
        assert_eq!(source.entities(EntityKind::TestCase, &cancel).unwrap().count(), 0);
        assert!(source.is_empty());
    }
}
