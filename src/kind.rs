//! Entity kinds covered by the index
//!
//! The set is closed: six "named" kinds that are enumerated in a fixed order,
//! plus property options which are enumerated last with their own counter and
//! may lack an external identifier.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{IndexError, Result};

/// Category tag of an indexed entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EntityKind {
    Component,
    Property,
    Threat,
    SecurityRequirement,
    TestCase,
    Library,
    PropertyOption,
}

/// Backing table layout for a kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceTable {
    pub table: &'static str,
    pub id_column: &'static str,
    pub name_column: &'static str,
}

impl EntityKind {
    /// Kinds with a mandatory external identifier, in build order
    pub const NAMED: [EntityKind; 6] = [
        EntityKind::Component,
        EntityKind::Property,
        EntityKind::Threat,
        EntityKind::SecurityRequirement,
        EntityKind::TestCase,
        EntityKind::Library,
    ];

    /// Every kind, named kinds first
    pub const ALL: [EntityKind; 7] = [
        EntityKind::Component,
        EntityKind::Property,
        EntityKind::Threat,
        EntityKind::SecurityRequirement,
        EntityKind::TestCase,
        EntityKind::Library,
        EntityKind::PropertyOption,
    ];

    /// Wire tag written to the index document
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Component => "component",
            Self::Property => "property",
            Self::Threat => "threat",
            Self::SecurityRequirement => "securityRequirement",
            Self::TestCase => "testCase",
            Self::Library => "library",
            Self::PropertyOption => "propertyOption",
        }
    }

    pub fn source_table(&self) -> SourceTable {
        let (table, name_column) = match self {
            Self::Component => ("Components", "Name"),
            Self::Property => ("Properties", "Name"),
            Self::Threat => ("Threats", "Name"),
            Self::SecurityRequirement => ("SecurityRequirements", "Name"),
            Self::TestCase => ("TestCases", "Name"),
            Self::Library => ("Libraries", "Name"),
            Self::PropertyOption => ("PropertyOptions", "OptionText"),
        };
        SourceTable {
            table,
            id_column: "Guid",
            name_column,
        }
    }

    /// Whether entities of this kind may lack an external identifier
    pub fn allows_nil_id(&self) -> bool {
        matches!(self, Self::PropertyOption)
    }

    /// Parse a caller-supplied kind, ignoring case and surrounding whitespace
    pub fn parse(raw: &str) -> Result<Self> {
        let normalized = normalize_kind(raw);
        if normalized.is_empty() {
            return Err(IndexError::invalid_argument("kind required"));
        }
        Self::ALL
            .iter()
            .copied()
            .find(|k| k.as_str().to_ascii_lowercase() == normalized)
            .ok_or_else(|| IndexError::invalid_argument(format!("unknown kind '{}'", raw.trim())))
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lookup key form of a kind tag: trimmed and case-folded
pub fn normalize_kind(raw: &str) -> String {
    raw.trim().to_lowercase()
}
