//! tf-index: sequential-id index for ThreatFramework entities
//!
//! Every entity in the framework database has a stable GUID. Downstream
//! tools also want a short, human-friendly integer per kind. This crate
//! assigns those integers deterministically, persists them as a YAML
//! document, and serves `(kind, externalId) -> id` lookups from a cache that
//! can be rebuilt while it is being read.
//!
//! # Data flow
//!
//! ```text
//! EntitySource ──► IndexBuilder ──► IndexDocument ──┬──► IndexFile (persist / restore)
//!                                                   └──► IndexCache (resolution table)
//! ```
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use tf_index::{EntityKind, IndexBuilder, IndexCache, MemorySource};
//! use tokio_util::sync::CancellationToken;
//! use uuid::Uuid;
//!
//! let auth = Uuid::new_v4();
//! let source = MemorySource::new()
//!     .with_entity(EntityKind::Component, auth, "Auth Service")
//!     .with_entity(EntityKind::Component, Uuid::new_v4(), "Gateway");
//!
//! let cache = IndexCache::new(Arc::new(IndexBuilder::new(Arc::new(source))));
//! cache.refresh(&CancellationToken::new())?;
//! assert_eq!(cache.try_resolve("component", auth)?, Some(1));
//! # Ok::<(), tf_index::IndexError>(())
//! ```

pub mod builder;
pub mod cache;
pub mod cli;
pub mod commands;
pub mod config;
pub mod daemon;
pub mod error;
pub mod fs_utils;
pub mod kind;
pub mod logging;
pub mod persist;
pub mod query;
pub mod schema;
pub mod source;

// Re-export commonly used types
pub use builder::IndexBuilder;
pub use cache::{DocumentProvider, IndexCache, ResolutionTable};
pub use cli::{Cli, OutputFormat};
pub use config::Settings;
pub use error::{IndexError, Result};
pub use kind::{normalize_kind, EntityKind};
pub use persist::{read_index, write_index, IndexFile};
pub use query::{SelectQueryBuilder, SortDirection, SqlOperator};
pub use schema::{IndexDocument, IndexItem};
pub use source::{EntitySource, MemorySource, SqliteSource};
