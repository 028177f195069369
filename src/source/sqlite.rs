//! SQLite-backed entity source
//!
//! Reads one table per kind (see [`EntityKind::source_table`]). Rows are
//! streamed page by page so a large table never has to be materialized, and
//! cancellation is checked before every page fetch and between rows.
//!
//! Every page of one enumeration is read inside a single deferred read
//! transaction, so concurrent writers cannot shift rows between pages.
//! Enumerations that overlap on the same source share that transaction; it
//! ends when the last of them finishes or is dropped.
//!
//! Identifiers are accepted either as 16-byte blobs or as hyphenated text.

use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use rusqlite::types::Value;
use rusqlite::{Connection, OpenFlags};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use super::{EntityRow, EntitySource, OptionRow, Rows};
use crate::error::{IndexError, Result};
use crate::kind::EntityKind;
use crate::query::{SelectQueryBuilder, SortDirection};

/// Default number of rows fetched per round trip
pub const DEFAULT_PAGE_SIZE: u64 = 500;

pub struct SqliteSource {
    state: Mutex<ReadState>,
    db_path: Option<PathBuf>,
    page_size: u64,
}

impl SqliteSource {
    /// Open an existing database read-only
    pub fn open(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(IndexError::source_unavailable(format!(
                "database not found: {}",
                path.display()
            )));
        }
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .map_err(|e| {
            IndexError::source_unavailable(format!("failed to open {}: {}", path.display(), e))
        })?;

        tracing::debug!("Opened entity database {}", path.display());
        Ok(Self {
            state: Mutex::new(ReadState::new(conn)),
            db_path: Some(path.to_path_buf()),
            page_size: DEFAULT_PAGE_SIZE,
        })
    }

    /// Wrap an already-open connection (in-memory databases, tests)
    pub fn from_connection(conn: Connection) -> Self {
        Self {
            state: Mutex::new(ReadState::new(conn)),
            db_path: None,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    pub fn with_page_size(mut self, page_size: u64) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    pub fn db_path(&self) -> Option<&Path> {
        self.db_path.as_deref()
    }

    fn paged(&self, kind: EntityKind) -> Result<SelectQueryBuilder> {
        let table = kind.source_table();
        let mut query = SelectQueryBuilder::from(table.table)?
            .columns(&[table.id_column, table.name_column])?;
        if !kind.allows_nil_id() {
            query = query.where_raw(&format!("[{}] IS NOT NULL", table.id_column))?;
        }
        query
            .order_by(table.name_column, SortDirection::Asc)?
            .order_by(table.id_column, SortDirection::Asc)
    }

    fn fetch_page(&self, kind: EntityKind, page: u64) -> Result<Vec<OptionRow>> {
        let sql = self.paged(kind)?.page(page, self.page_size)?.build()?;
        let state = self.state.lock();
        let mut stmt = state.conn.prepare_cached(&sql.command_text).map_err(|e| {
            IndexError::source_unavailable(format!("{} query failed: {}", kind, e))
        })?;

        let raw: Vec<(Value, Value)> = stmt
            .query_map(sql.named_params().as_slice(), |row| {
                Ok((row.get::<_, Value>(0)?, row.get::<_, Value>(1)?))
            })?
            .collect::<std::result::Result<_, _>>()?;

        raw.into_iter()
            .map(|(id, name)| Ok((decode_uuid(kind, id)?, decode_text(name))))
            .collect()
    }

    fn begin_read(&self) -> Result<()> {
        let mut state = self.state.lock();
        if state.readers == 0 && state.conn.is_autocommit() {
            state.conn.execute_batch("BEGIN DEFERRED").map_err(|e| {
                IndexError::source_unavailable(format!("failed to begin read: {}", e))
            })?;
            state.owns_transaction = true;
        }
        state.readers += 1;
        Ok(())
    }

    fn end_read(&self) {
        let mut state = self.state.lock();
        state.readers = state.readers.saturating_sub(1);
        if state.readers > 0 || !state.owns_transaction {
            return;
        }
        state.owns_transaction = false;
        if let Err(e) = state.conn.execute_batch("COMMIT") {
            tracing::warn!("Failed to end read transaction: {}", e);
            let _ = state.conn.execute_batch("ROLLBACK");
        }
    }

    #[cfg(test)]
    fn in_transaction(&self) -> bool {
        !self.state.lock().conn.is_autocommit()
    }
}

/// Connection plus the count of enumerations reading from it
struct ReadState {
    conn: Connection,
    readers: usize,
    // false when the caller's connection was already inside a transaction
    owns_transaction: bool,
}

impl ReadState {
    fn new(conn: Connection) -> Self {
        Self {
            conn,
            readers: 0,
            owns_transaction: false,
        }
    }
}

impl EntitySource for SqliteSource {
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
        let rows = PagedRows::new(self, kind, cancel);
        Ok(Box::new(rows.filter_map(|row| match row {
            Ok((Some(id), name)) if !id.is_nil() => Some(Ok((id, name))),
            Ok(_) => None,
            Err(e) => Some(Err(e)),
        })))
    }

    fn options<'a>(&'a self, cancel: &'a CancellationToken) -> Result<Rows<'a, OptionRow>> {
        Ok(Box::new(PagedRows::new(
            self,
            EntityKind::PropertyOption,
            cancel,
        )))
    }
}

/// Pull iterator that fetches one page at a time
struct PagedRows<'a> {
    source: &'a SqliteSource,
    kind: EntityKind,
    cancel: &'a CancellationToken,
    next_page: u64,
    buffer: std::vec::IntoIter<OptionRow>,
    // holds a reader slot on the source
    reading: bool,
    // no further pages to fetch
    exhausted: bool,
    // nothing more will be yielded
    finished: bool,
}

impl<'a> PagedRows<'a> {
    fn new(source: &'a SqliteSource, kind: EntityKind, cancel: &'a CancellationToken) -> Self {
        Self {
            source,
            kind,
            cancel,
            next_page: 1,
            buffer: Vec::new().into_iter(),
            reading: false,
            exhausted: false,
            finished: false,
        }
    }

    fn fail(&mut self, err: IndexError) -> Option<Result<OptionRow>> {
        self.finish();
        Some(Err(err))
    }

    fn finish(&mut self) {
        self.finished = true;
        if std::mem::take(&mut self.reading) {
            self.source.end_read();
        }
    }
}

impl Drop for PagedRows<'_> {
    fn drop(&mut self) {
        self.finish();
    }
}

impl Iterator for PagedRows<'_> {
    type Item = Result<OptionRow>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        if self.cancel.is_cancelled() {
            return self.fail(IndexError::Cancelled);
        }

        loop {
            if let Some(row) = self.buffer.next() {
                return Some(Ok(row));
            }
            if self.exhausted {
                self.finish();
                return None;
            }
            if !self.reading {
                if let Err(e) = self.source.begin_read() {
                    return self.fail(e);
                }
                self.reading = true;
            }

            match self.source.fetch_page(self.kind, self.next_page) {
                Ok(rows) => {
                    if (rows.len() as u64) < self.source.page_size {
                        self.exhausted = true;
                    }
                    self.next_page += 1;
                    self.buffer = rows.into_iter();
                }
                Err(e) => return self.fail(e),
            }
        }
    }
}

fn decode_uuid(kind: EntityKind, value: Value) -> Result<Option<Uuid>> {
    match value {
        Value::Null => Ok(None),
        Value::Text(s) => Uuid::parse_str(s.trim()).map(Some).map_err(|e| {
            IndexError::source_unavailable(format!("{} row has invalid identifier '{}': {}", kind, s, e))
        }),
        Value::Blob(b) => Uuid::from_slice(&b).map(Some).map_err(|e| {
            IndexError::source_unavailable(format!("{} row has invalid identifier blob: {}", kind, e))
        }),
        other => Err(IndexError::source_unavailable(format!(
            "{} row has non-identifier value {:?}",
            kind, other
        ))),
    }
}

fn decode_text(value: Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Text(s) => s,
        Value::Integer(i) => i.to_string(),
        Value::Real(f) => f.to_string(),
        Value::Blob(b) => String::from_utf8_lossy(&b).into_owned(),
    }
}
