//! Entity source contract
//!
//! A source produces, per kind, a lazy sequence of `(external id, name)` rows
//! ordered by name. Named kinds never yield rows without an identifier; the
//! option sequence may. Sequences are pull-based and restartable: calling
//! [`EntitySource::entities`] again starts a fresh enumeration.
//!
//! Cancellation is observed between rows. A cancelled sequence yields
//! [`IndexError::Cancelled`](crate::IndexError::Cancelled) and then ends.

pub mod memory;
pub mod sqlite;

pub use memory::MemorySource;
pub use sqlite::SqliteSource;

use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::error::Result;
use crate::kind::EntityKind;

/// Row of a named kind
pub type EntityRow = (Uuid, String);

/// Row of the option sequence; the identifier may be absent
pub type OptionRow = (Option<Uuid>, String);

/// Lazy, fallible row sequence
pub type Rows<'a, T> = Box<dyn Iterator<Item = Result<T>> + 'a>;

pub trait EntitySource: Send + Sync {
    /// Enumerate a named kind. Passing [`EntityKind::PropertyOption`] is an
    /// invalid argument; options go through [`EntitySource::options`].
    fn entities<'a>(
        &'a self,
        kind: EntityKind,
        cancel: &'a CancellationToken,
    ) -> Result<Rows<'a, EntityRow>>;

    /// Enumerate property options
    fn options<'a>(&'a self, cancel: &'a CancellationToken) -> Result<Rows<'a, OptionRow>>;
}
