//! Resolution cache
//!
//! [`IndexCache`] answers `(kind, externalId) -> id` lookups from an immutable
//! [`ResolutionTable`] snapshot. A refresh builds a complete new table off to
//! the side and swaps it in with a single pointer replacement, so readers see
//! either the previous snapshot or the new one.
//!
//! # Thread Safety
//!
//! - `refresh_lock` (`Mutex`) admits one refresh at a time
//! - `table` (`RwLock<Arc<_>>`) is write-locked only for the swap itself
//! - `version` and `initialized` are atomics read without any lock
//!
//! A lookup on a cache that has never been populated performs one blocking
//! refresh first. Concurrent first lookups share that refresh.

use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::builder::IndexBuilder;
use crate::error::{IndexError, Result};
use crate::kind::normalize_kind;
use crate::persist::{self, IndexFile};
use crate::schema::IndexDocument;

/// Something that can produce a fresh [`IndexDocument`] on demand
pub trait DocumentProvider: Send + Sync {
    fn load(&self, cancel: &CancellationToken) -> Result<IndexDocument>;

    /// Short label used in log lines
    fn describe(&self) -> String;
}

impl DocumentProvider for IndexBuilder {
    fn load(&self, cancel: &CancellationToken) -> Result<IndexDocument> {
        self.build(cancel)
    }

    fn describe(&self) -> String {
        "entity source".to_string()
    }
}

impl DocumentProvider for IndexFile {
    fn load(&self, cancel: &CancellationToken) -> Result<IndexDocument> {
        if cancel.is_cancelled() {
            return Err(IndexError::Cancelled);
        }
        self.read()
    }

    fn describe(&self) -> String {
        format!("index file {}", self.path().display())
    }
}

/// Lookup table derived from exactly one document
///
/// Keys are normalized kind tags. Items with a nil external identifier are
/// not resolvable and are left out. `version` is the cache version the table
/// was installed as (0 until installed).
#[derive(Debug, Default)]
pub struct ResolutionTable {
    by_kind: HashMap<String, HashMap<Uuid, u64>>,
    entries: usize,
    version: u64,
}

impl ResolutionTable {
    pub fn from_document(doc: &IndexDocument) -> Self {
        let mut by_kind: HashMap<String, HashMap<Uuid, u64>> = HashMap::new();
        for item in doc.items().iter().filter(|i| i.is_resolvable()) {
            // Later duplicates overwrite earlier ones
            by_kind
                .entry(normalize_kind(&item.kind))
                .or_default()
                .insert(item.external_id, item.id);
        }
        let entries = by_kind.values().map(HashMap::len).sum();
        Self {
            by_kind,
            entries,
            version: 0,
        }
    }

    /// Look up by an already-normalized kind
    pub fn get(&self, normalized_kind: &str, external_id: Uuid) -> Option<u64> {
        self.by_kind
            .get(normalized_kind)
            .and_then(|ids| ids.get(&external_id))
            .copied()
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn len(&self) -> usize {
        self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries == 0
    }
}

pub struct IndexCache {
    provider: Arc<dyn DocumentProvider>,
    table: RwLock<Arc<ResolutionTable>>,
    version: AtomicU64,
    initialized: AtomicBool,
    refresh_lock: Mutex<()>,
}

impl IndexCache {
    pub fn new(provider: Arc<dyn DocumentProvider>) -> Self {
        Self {
            provider,
            table: RwLock::new(Arc::new(ResolutionTable::default())),
            version: AtomicU64::new(0),
            initialized: AtomicBool::new(false),
            refresh_lock: Mutex::new(()),
        }
    }

    /// Rebuild the table from the provider. Returns the new version.
    ///
    /// On failure the previous table and version stay in place.
    pub fn refresh(&self, cancel: &CancellationToken) -> Result<u64> {
        let _guard = self.refresh_lock.lock();
        self.reload(cancel)
    }

    /// Rebuild the table from a persisted index instead of the provider
    pub fn refresh_from_file(&self, path: &Path, cancel: &CancellationToken) -> Result<u64> {
        if path.as_os_str().to_string_lossy().trim().is_empty() {
            return Err(IndexError::invalid_argument("index file path required"));
        }
        if !path.is_file() {
            return Err(IndexError::persistence(path, "index file not found"));
        }

        let _guard = self.refresh_lock.lock();
        let loaded = if cancel.is_cancelled() {
            Err(IndexError::Cancelled)
        } else {
            persist::read_index(path)
        };
        self.install(loaded, &format!("index file {}", path.display()))
    }

    /// Look up the sequential id for `(kind, external_id)`.
    ///
    /// `kind` is trimmed and case-folded. A miss is `Ok(None)`.
    pub fn try_resolve(&self, kind: &str, external_id: Uuid) -> Result<Option<u64>> {
        self.lookup(kind, external_id).map(|(found, _)| found)
    }

    /// Like [`try_resolve`](Self::try_resolve), also returning the version
    /// of the table that answered
    pub fn lookup(&self, kind: &str, external_id: Uuid) -> Result<(Option<u64>, u64)> {
        let kind = normalize_kind(kind);
        if kind.is_empty() {
            return Err(IndexError::invalid_argument("kind required"));
        }
        self.ensure_initialized()?;

        let table = self.snapshot();
        let found = table.get(&kind, external_id);
        if found.is_none() {
            tracing::debug!("No index entry for {}/{}", kind, external_id);
        }
        Ok((found, table.version()))
    }

    /// Like [`try_resolve`](Self::try_resolve), with a miss reported as
    /// [`IndexError::NotFound`]
    pub fn resolve(&self, kind: &str, external_id: Uuid) -> Result<u64> {
        self.try_resolve(kind, external_id)?
            .ok_or_else(|| IndexError::NotFound {
                kind: kind.trim().to_string(),
                external_id,
            })
    }

    /// Number of successful refreshes so far
    pub fn current_version(&self) -> u64 {
        self.version.load(Ordering::Acquire)
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::Acquire)
    }

    /// Resolvable entries in the current table
    pub fn len(&self) -> usize {
        self.snapshot().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The table currently served to readers
    pub fn snapshot(&self) -> Arc<ResolutionTable> {
        self.table.read().clone()
    }

    fn ensure_initialized(&self) -> Result<()> {
        if self.is_initialized() {
            return Ok(());
        }
        let _guard = self.refresh_lock.lock();
        // Another caller may have finished the first refresh while we waited
        if self.is_initialized() {
            return Ok(());
        }
        tracing::info!("Index cache cold, loading from {}", self.provider.describe());
        self.reload(&CancellationToken::new()).map(|_| ())
    }

    // Caller holds refresh_lock
    fn reload(&self, cancel: &CancellationToken) -> Result<u64> {
        tracing::info!("Refreshing index cache from {}", self.provider.describe());
        let loaded = self.provider.load(cancel);
        self.install(loaded, &self.provider.describe())
    }

    // Caller holds refresh_lock
    fn install(&self, loaded: Result<IndexDocument>, origin: &str) -> Result<u64> {
        let table = loaded.and_then(|doc| {
            doc.validate()?;
            Ok(ResolutionTable::from_document(&doc))
        });
        let mut table = match table {
            Ok(table) => table,
            Err(e) => {
                tracing::warn!(
                    "Index refresh from {} failed, keeping version {}: {}",
                    origin,
                    self.current_version(),
                    e
                );
                return Err(e);
            }
        };

        let entries = table.len();
        let version = self.current_version() + 1;
        table.version = version;
        *self.table.write() = Arc::new(table);
        self.version.store(version, Ordering::Release);
        self.initialized.store(true, Ordering::Release);

        tracing::info!(
            "Index cache refreshed: version {}, {} resolvable entries",
            version,
            entries
        );
        Ok(version)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kind::EntityKind;
    use crate::schema::IndexItem;
    use crate::source::MemorySource;
    use std::sync::atomic::AtomicUsize;

    struct CountingProvider {
        doc: IndexDocument,
        loads: AtomicUsize,
    }

    impl DocumentProvider for CountingProvider {
        fn load(&self, _cancel: &CancellationToken) -> Result<IndexDocument> {
            self.loads.fetch_add(1, Ordering::SeqCst);
            Ok(self.doc.clone())
        }

        fn describe(&self) -> String {
            "counting".to_string()
        }
    }

    struct FailingProvider;

    impl DocumentProvider for FailingProvider {
        fn load(&self, _cancel: &CancellationToken) -> Result<IndexDocument> {
            Err(IndexError::source_unavailable("database offline"))
        }

        fn describe(&self) -> String {
            "failing".to_string()
        }
    }

    fn builder_cache(source: MemorySource) -> IndexCache {
        IndexCache::new(Arc::new(IndexBuilder::new(Arc::new(source))))
    }

    #[test]
    fn test_resolves_after_refresh() {
        let auth = Uuid::new_v4();
        let gateway = Uuid::new_v4();
        let cache = builder_cache(
            MemorySource::new()
                .with_entity(EntityKind::Component, auth, "Auth Service")
                .with_entity(EntityKind::Component, gateway, "Gateway"),
        );

        assert_eq!(cache.refresh(&CancellationToken::new()).unwrap(), 1);
        assert_eq!(cache.try_resolve("component", gateway).unwrap(), Some(2));
        assert_eq!(cache.resolve("  COMPONENT ", auth).unwrap(), 1);
    }

    #[test]
    fn test_blank_kind_rejected_before_bootstrap() {
        let cache = IndexCache::new(Arc::new(FailingProvider));
        let result = cache.try_resolve("   ", Uuid::new_v4());
        assert!(matches!(result, Err(IndexError::InvalidArgument { .. })));
        assert!(!cache.is_initialized());
    }

    #[test]
    fn test_first_lookup_bootstraps_once() {
        let id = Uuid::new_v4();
        let provider = Arc::new(CountingProvider {
            doc: IndexDocument::from_items(vec![IndexItem::new("threat", id, 1, "Spoofing")]),
            loads: AtomicUsize::new(0),
        });
        let cache = IndexCache::new(provider.clone());
        assert!(!cache.is_initialized());

        assert_eq!(cache.try_resolve("threat", id).unwrap(), Some(1));
        assert_eq!(cache.try_resolve("threat", Uuid::new_v4()).unwrap(), None);

        assert!(cache.is_initialized());
        assert_eq!(cache.current_version(), 1);
        assert_eq!(provider.loads.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_failed_refresh_keeps_previous_state() {
        let id = Uuid::new_v4();
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("index.yaml");
        persist::write_index(
            &path,
            &IndexDocument::from_items(vec![IndexItem::new("library", id, 4, "openssl")]),
        )
        .unwrap();

        let cache = IndexCache::new(Arc::new(FailingProvider));
        let cancel = CancellationToken::new();
        assert_eq!(cache.refresh_from_file(&path, &cancel).unwrap(), 1);

        let err = cache.refresh(&cancel).unwrap_err();
        assert!(matches!(err, IndexError::SourceUnavailable { .. }));
        assert_eq!(cache.current_version(), 1);
        assert_eq!(cache.try_resolve("library", id).unwrap(), Some(4));
    }

    #[test]
    fn test_cold_cache_surfaces_bootstrap_failure() {
        let cache = IndexCache::new(Arc::new(FailingProvider));
        assert!(cache.try_resolve("threat", Uuid::new_v4()).is_err());
        assert!(!cache.is_initialized());
        assert_eq!(cache.current_version(), 0);
    }

    #[test]
    fn test_nil_ids_are_not_resolvable() {
        let cache = builder_cache(MemorySource::new().with_option(None, "Low"));
        cache.refresh(&CancellationToken::new()).unwrap();
        assert_eq!(cache.try_resolve("propertyOption", Uuid::nil()).unwrap(), None);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_resolve_miss_is_not_found() {
        let cache = builder_cache(MemorySource::new());
        let missing = Uuid::new_v4();
        match cache.resolve("threat", missing) {
            Err(IndexError::NotFound { kind, external_id }) => {
                assert_eq!(kind, "threat");
                assert_eq!(external_id, missing);
            }
            other => panic!("expected NotFound, got {:?}", other),
        }
    }

    #[test]
    fn test_refresh_from_file_argument_checks() {
        let cache = builder_cache(MemorySource::new());
        let cancel = CancellationToken::new();
        assert!(matches!(
            cache.refresh_from_file(Path::new("  "), &cancel),
            Err(IndexError::InvalidArgument { .. })
        ));
        assert!(matches!(
            cache.refresh_from_file(Path::new("/no/such/index.yaml"), &cancel),
            Err(IndexError::Persistence { .. })
        ));
        assert_eq!(cache.current_version(), 0);
    }

    #[test]
    fn test_malformed_file_is_surfaced() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("index.yaml");
        std::fs::write(&path, "items:\n  - kind: ''\n    id: 1\n").unwrap();

        let cache = builder_cache(MemorySource::new());
        let result = cache.refresh_from_file(&path, &CancellationToken::new());
        assert!(matches!(result, Err(IndexError::MalformedDocument { .. })));
        assert!(!cache.is_initialized());
    }

    #[test]
    fn test_cancelled_refresh_keeps_served_table() {
        let id = Uuid::new_v4();
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("index.yaml");
        persist::write_index(
            &path,
            &IndexDocument::from_items(vec![IndexItem::new("threat", id, 9, "Spoofing")]),
        )
        .unwrap();
        let cache = builder_cache(MemorySource::new().with_entity(EntityKind::Threat, id, "Spoofing"));
        assert_eq!(cache.refresh(&CancellationToken::new()).unwrap(), 1);
        let served = cache.snapshot();

        let cancel = CancellationToken::new();
        cancel.cancel();
        assert!(matches!(cache.refresh(&cancel), Err(IndexError::Cancelled)));
        assert!(matches!(
            cache.refresh_from_file(&path, &cancel),
            Err(IndexError::Cancelled)
        ));

        assert_eq!(cache.current_version(), 1);
        assert!(Arc::ptr_eq(&served, &cache.snapshot()));
        assert_eq!(cache.lookup("threat", id).unwrap(), (Some(1), 1));
    }

    #[test]
    fn test_cancelled_refresh_leaves_cold_cache_cold() {
        let id = Uuid::new_v4();
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("index.yaml");
        persist::write_index(
            &path,
            &IndexDocument::from_items(vec![IndexItem::new("threat", id, 1, "Spoofing")]),
        )
        .unwrap();
        let cache = builder_cache(MemorySource::new().with_entity(EntityKind::Threat, id, "Spoofing"));

        let cancel = CancellationToken::new();
        cancel.cancel();
        assert!(matches!(cache.refresh(&cancel), Err(IndexError::Cancelled)));
        assert!(matches!(
            cache.refresh_from_file(&path, &cancel),
            Err(IndexError::Cancelled)
        ));

        assert!(!cache.is_initialized());
        assert_eq!(cache.current_version(), 0);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_lookup_version_comes_from_answering_table() {
        let id = Uuid::new_v4();
        let cache = builder_cache(MemorySource::new().with_entity(EntityKind::Library, id, "zlib"));
        assert_eq!(cache.lookup("library", id).unwrap(), (Some(1), 1));

        let cancel = CancellationToken::new();
        cache.refresh(&cancel).unwrap();
        cache.refresh(&cancel).unwrap();
        assert_eq!(cache.snapshot().version(), 3);
        assert_eq!(cache.lookup("library", Uuid::new_v4()).unwrap(), (None, 3));
    }

    #[test]
    fn test_duplicate_external_id_last_entry_wins() {
        let id = Uuid::new_v4();
        let doc = IndexDocument::from_items(vec![
            IndexItem::new("threat", id, 1, "first"),
            IndexItem::new("threat", id, 2, "second"),
        ]);
        let table = ResolutionTable::from_document(&doc);
        assert_eq!(table.get("threat", id), Some(2));
        assert_eq!(table.len(), 1);
    }
}
