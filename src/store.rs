//! SQLite-backed document collection for commit metrics.
//!
//! Each row holds one `CommitMetric` as a JSON document plus indexed
//! projection columns used for lookups. `(repository, commit_id)` is unique.

use crate::error::{MetricsError, Result};
use crate::model::{CommitMetric, DateRange, StoredCommit, SCHEMA_VERSION};
use regex::RegexBuilder;
use rusqlite::{params, Connection, OptionalExtension, Row, ToSql};
use serde_json::{Map, Value};
use std::path::Path;
use tracing::debug;

pub struct MetricsStore {
    conn: Connection,
}

impl MetricsStore {
    pub fn open<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let db_path = db_path.as_ref();
        if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(db_path).map_err(|e| {
            MetricsError::Connection(format!("cannot open {}: {e}", db_path.display()))
        })?;
        Self::with_connection(conn)
    }

    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| MetricsError::Connection(format!("cannot open in-memory store: {e}")))?;
        Self::with_connection(conn)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        let mut store = Self { conn };
        store.initialize()?;
        Ok(store)
    }

    fn initialize(&mut self) -> Result<()> {
        self.conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS commits (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                repository TEXT NOT NULL,
                commit_id TEXT NOT NULL,
                author_name TEXT NOT NULL,
                timestamp INTEGER NOT NULL,
                doc TEXT NOT NULL,
                UNIQUE (repository, commit_id)
            );
            CREATE INDEX IF NOT EXISTS idx_commits_timestamp ON commits(timestamp);
            CREATE INDEX IF NOT EXISTS idx_commits_author ON commits(author_name);
            ",
        )?;
        self.check_schema_version()?;
        Ok(())
    }

    fn check_schema_version(&mut self) -> Result<()> {
        let user_version: i64 = self
            .conn
            .query_row("PRAGMA user_version;", [], |row| row.get(0))?;

        if user_version == 0 {
            let set_stmt = format!("PRAGMA user_version = {SCHEMA_VERSION};");
            self.conn.execute_batch(&set_stmt)?;
        } else if user_version != SCHEMA_VERSION as i64 {
            return Err(MetricsError::Connection(format!(
                "Schema version mismatch: expected {}, found {}",
                SCHEMA_VERSION, user_version
            )));
        }

        Ok(())
    }

    /// Writes every metric in one transaction, upserting on `(repository, commit_id)`.
    /// Existing rows keep their identifier. Returns the number of rows written.
    pub fn bulk_insert(&mut self, metrics: &[CommitMetric]) -> Result<usize> {
        for metric in metrics {
            metric.validate()?;
        }

        let tx = self.conn.transaction()?;
        let mut written = 0;
        {
            let mut upsert = tx.prepare(
                "INSERT INTO commits (repository, commit_id, author_name, timestamp, doc)
                 VALUES (?, ?, ?, ?, ?)
                 ON CONFLICT (repository, commit_id) DO UPDATE SET
                     author_name = excluded.author_name,
                     timestamp = excluded.timestamp,
                     doc = excluded.doc",
            )?;
            for metric in metrics {
                written += upsert.execute(params![
                    metric.repository,
                    metric.commit_id,
                    metric.author.name,
                    metric.date_utc().timestamp(),
                    serde_json::to_string(metric)?
                ])?;
            }
        }
        tx.commit()?;

        debug!(written, "bulk insert committed");
        Ok(written)
    }

    pub fn get(&self, id: i64) -> Result<Option<StoredCommit>> {
        self.conn
            .query_row("SELECT id, doc FROM commits WHERE id = ?", params![id], stored_from_row)
            .optional()
            .map_err(Into::into)
    }

    /// Full replace of one record.
    pub fn replace(&mut self, id: i64, metric: &CommitMetric) -> Result<StoredCommit> {
        metric.validate()?;
        let updated = self
            .conn
            .execute(
                "UPDATE commits SET repository = ?, commit_id = ?, author_name = ?, timestamp = ?, doc = ?
                 WHERE id = ?",
                params![
                    metric.repository,
                    metric.commit_id,
                    metric.author.name,
                    metric.date_utc().timestamp(),
                    serde_json::to_string(metric)?,
                    id
                ],
            )
            .map_err(constraint_as_validation)?;

        if updated == 0 {
            return Err(MetricsError::NotFound(id));
        }
        Ok(StoredCommit {
            id,
            metric: metric.clone(),
        })
    }

    /// Merges `fields` into the stored document (`$set` semantics, dotted keys
    /// address nested fields) and writes the result back.
    pub fn patch(&mut self, id: i64, fields: &Map<String, Value>) -> Result<StoredCommit> {
        let current = self.get(id)?.ok_or(MetricsError::NotFound(id))?;

        let mut doc = serde_json::to_value(&current.metric)?;
        for (key, value) in fields {
            if key == "id" || key == "_id" {
                continue;
            }
            set_path(&mut doc, key, value.clone())?;
        }

        let merged: CommitMetric = serde_json::from_value(doc)
            .map_err(|e| MetricsError::Validation(format!("patched commit is invalid: {e}")))?;
        self.replace(id, &merged)
    }

    /// Removes one record. Returns 0 when it was already gone.
    pub fn delete(&mut self, id: i64) -> Result<usize> {
        Ok(self.conn.execute("DELETE FROM commits WHERE id = ?", params![id])?)
    }

    pub fn clear(&mut self) -> Result<usize> {
        Ok(self.conn.execute("DELETE FROM commits", [])?)
    }

    pub fn clear_repository(&mut self, repository: &str) -> Result<usize> {
        Ok(self
            .conn
            .execute("DELETE FROM commits WHERE repository = ?", params![repository])?)
    }

    pub fn count(&self) -> Result<u64> {
        let n: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM commits", [], |row| row.get(0))?;
        Ok(n as u64)
    }

    pub fn repositories(&self) -> Result<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT DISTINCT repository FROM commits ORDER BY repository")?;
        let names = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(names)
    }

    /// Snapshot of every record in insertion order.
    pub fn all(&self) -> Result<Vec<StoredCommit>> {
        self.query_docs("SELECT id, doc FROM commits ORDER BY id", &[])
    }

    pub fn by_repository(&self, repository: &str) -> Result<Vec<StoredCommit>> {
        self.query_docs(
            "SELECT id, doc FROM commits WHERE repository = ? ORDER BY id",
            &[&repository],
        )
    }

    /// Case-insensitive regex match on `author.name`. Invalid patterns match literally.
    pub fn find_by_author(&self, pattern: &str) -> Result<Vec<StoredCommit>> {
        let re = RegexBuilder::new(pattern)
            .case_insensitive(true)
            .build()
            .or_else(|_| {
                RegexBuilder::new(&regex::escape(pattern))
                    .case_insensitive(true)
                    .build()
            })
            .map_err(|e| MetricsError::Validation(format!("invalid author pattern: {e}")))?;

        let mut stmt = self
            .conn
            .prepare("SELECT id, doc, author_name FROM commits ORDER BY id")?;
        let rows = stmt.query_map([], |row| {
            let name: String = row.get(2)?;
            Ok((name, stored_from_row(row)?))
        })?;

        let mut matches = Vec::new();
        for row in rows {
            let (name, stored) = row?;
            if re.is_match(&name) {
                matches.push(stored);
            }
        }
        Ok(matches)
    }

    /// Inclusive filter on the commit instant.
    pub fn find_by_date_range(&self, range: &DateRange) -> Result<Vec<StoredCommit>> {
        let mut query = String::from("SELECT id, doc FROM commits WHERE 1=1");
        let mut to_bind: Vec<Box<dyn ToSql>> = Vec::new();

        if let Some(since) = &range.since {
            query.push_str(" AND timestamp >= ?");
            to_bind.push(Box::new(since.timestamp()));
        }
        if let Some(until) = &range.until {
            query.push_str(" AND timestamp <= ?");
            to_bind.push(Box::new(until.timestamp()));
        }
        query.push_str(" ORDER BY timestamp, id");

        let bind_refs: Vec<&dyn ToSql> = to_bind.iter().map(|b| b.as_ref()).collect();
        self.query_docs(&query, &bind_refs)
    }

    fn query_docs(&self, query: &str, params: &[&dyn ToSql]) -> Result<Vec<StoredCommit>> {
        let mut stmt = self.conn.prepare(query)?;
        let rows = stmt
            .query_map(params, stored_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }
}

fn stored_from_row(row: &Row<'_>) -> rusqlite::Result<StoredCommit> {
    let id: i64 = row.get(0)?;
    let doc: String = row.get(1)?;
    let metric: CommitMetric = serde_json::from_str(&doc).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(1, rusqlite::types::Type::Text, Box::new(e))
    })?;
    Ok(StoredCommit { id, metric })
}

fn constraint_as_validation(err: rusqlite::Error) -> MetricsError {
    match err {
        rusqlite::Error::SqliteFailure(e, msg) if e.code == rusqlite::ErrorCode::ConstraintViolation => {
            MetricsError::Validation(format!(
                "another record already has this repository/commitId: {}",
                msg.unwrap_or_default()
            ))
        }
        other => other.into(),
    }
}

fn set_path(doc: &mut Value, path: &str, value: Value) -> Result<()> {
    let mut segments = path.split('.').peekable();
    let mut cursor = doc;

    while let Some(segment) = segments.next() {
        let object = cursor
            .as_object_mut()
            .ok_or_else(|| MetricsError::Validation(format!("cannot set '{path}': parent is not an object")))?;

        if segments.peek().is_none() {
            object.insert(segment.to_string(), value);
            return Ok(());
        }
        cursor = object
            .entry(segment.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
    }

    Err(MetricsError::Validation("empty patch key".to_string()))
}
