//! SQLite-backed attendance table.

use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rusqlite::{params, Connection};
use tokio::task;

use asipuc_common::error::{AsipucError, AsipucResult};
use asipuc_model::store::{AttendanceStore, PersistenceRequest, StoredAttendance};
use asipuc_model::tally::{Category, Tally};

const CREATE_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS attendance (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    date TEXT NOT NULL,
    seniors INTEGER NOT NULL DEFAULT 0,
    adults INTEGER NOT NULL DEFAULT 0,
    young_adults INTEGER NOT NULL DEFAULT 0,
    teens INTEGER NOT NULL DEFAULT 0,
    children INTEGER NOT NULL DEFAULT 0,
    visitors INTEGER NOT NULL DEFAULT 0,
    total INTEGER NOT NULL,
    unit_name TEXT,
    unit_time TEXT
);
"#;

const INSERT_ROW: &str = "INSERT INTO attendance \
    (date, seniors, adults, young_adults, teens, children, visitors, total, unit_name, unit_time) \
    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)";

const SELECT_RECENT: &str = "SELECT id, date, seniors, adults, young_adults, teens, children, visitors, \
    total, unit_name, unit_time FROM attendance ORDER BY id DESC LIMIT ?1";

/// Attendance store over a single SQLite connection.
///
/// Statements run on the blocking pool; the connection is serialized by a
/// mutex.
#[derive(Clone)]
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
    label: String,
}

impl SqliteStore {
    /// Open (or create) the database at `path` and ensure the table exists.
    pub fn open(path: impl AsRef<Path>) -> AsipucResult<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path).map_err(|e| {
            AsipucError::config(format!("cannot open database {}: {e}", path.display()))
        })?;
        tracing::info!(path = %path.display(), "Opened attendance database");
        Self::init(conn, path.display().to_string())
    }

    /// Private in-memory database.
    pub fn in_memory() -> AsipucResult<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| AsipucError::config(format!("cannot open in-memory database: {e}")))?;
        Self::init(conn, ":memory:".to_string())
    }

    fn init(conn: Connection, label: String) -> AsipucResult<Self> {
        conn.execute_batch(CREATE_TABLE)
            .map_err(|e| AsipucError::config(format!("cannot create attendance table: {e}")))?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            label,
        })
    }

    async fn with_conn<T, F>(&self, op: F) -> AsipucResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> rusqlite::Result<T> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        task::spawn_blocking(move || {
            let guard = conn
                .lock()
                .map_err(|_| AsipucError::persistence("database connection poisoned"))?;
            op(&guard).map_err(|e| AsipucError::persistence(e.to_string()))
        })
        .await
        .map_err(|e| AsipucError::persistence(format!("database task failed: {e}")))?
    }
}

#[async_trait]
impl AttendanceStore for SqliteStore {
    async fn append(&self, request: PersistenceRequest) -> AsipucResult<i64> {
        let tally = request.tally();
        let total = i64::try_from(request.total)
            .map_err(|_| AsipucError::validation("total exceeds storable range"))?;
        if request.total != tally.total() {
            return Err(AsipucError::validation(format!(
                "total {} does not match counts ({})",
                request.total,
                tally.total()
            )));
        }

        self.with_conn(move |conn| {
            conn.execute(
                INSERT_ROW,
                params![
                    request.date,
                    tally.get(Category::Seniors),
                    tally.get(Category::Adults),
                    tally.get(Category::YoungAdults),
                    tally.get(Category::Teens),
                    tally.get(Category::Children),
                    tally.get(Category::Visitors),
                    total,
                    request.unit_name,
                    request.unit_time,
                ],
            )?;
            Ok(conn.last_insert_rowid())
        })
        .await
    }

    async fn recent(&self, limit: usize) -> AsipucResult<Vec<StoredAttendance>> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        self.with_conn(move |conn| {
            let mut stmt = conn.prepare(SELECT_RECENT)?;
            let rows = stmt.query_map(params![limit], |row| {
                let mut counts = Tally::default();
                for (offset, category) in Category::ALL.into_iter().enumerate() {
                    counts.set(category, row.get::<_, u32>(2 + offset)?);
                }
                let total: i64 = row.get(8)?;
                Ok(StoredAttendance {
                    id: row.get(0)?,
                    date: row.get(1)?,
                    counts,
                    total: total.max(0) as u64,
                    unit_name: row.get(9)?,
                    unit_time: row.get(10)?,
                })
            })?;
            let collected = rows.collect::<rusqlite::Result<Vec<_>>>();
            collected
        })
        .await
    }

    fn name(&self) -> &str {
        &self.label
    }
}
