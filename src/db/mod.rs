mod schema;

use std::fs;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("sqlite error: {0}")]
    Sql(#[from] rusqlite::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("hotkey '{0}' is already bound to another snippet")]
    DuplicateHotkey(String),
    #[error("database lock poisoned")]
    LockPoisoned,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Snippet {
    pub id: i64,
    pub label: String,
    pub content: String,
    pub tags: Option<String>,
    pub group: Option<String>,
    pub hotkey: Option<String>,
    pub is_pinned: bool,
    /// Persisted but never acted upon.
    pub is_sensitive: bool,
    pub created_at: String,
    pub updated_at: String,
}

/// Column values for an insert or a full update. Callers validate first.
#[derive(Debug, Clone, Copy)]
pub struct SnippetRow<'a> {
    pub label: &'a str,
    pub content: &'a str,
    pub tags: Option<&'a str>,
    pub group: Option<&'a str>,
    pub hotkey: Option<&'a str>,
}

pub struct Database {
    conn: Mutex<Connection>,
}

const SNIPPET_COLUMNS: &str = "
    id,
    label,
    content,
    tags,
    group_name,
    hotkey,
    is_pinned,
    is_sensitive,
    created_at,
    updated_at
";

const ORDER_FOR_DISPLAY: &str = "ORDER BY is_pinned DESC, created_at DESC, id DESC";

impl Database {
    fn conn(&self) -> Result<MutexGuard<'_, Connection>, DbError> {
        self.conn.lock().map_err(|_| DbError::LockPoisoned)
    }

    pub fn new(path: &Path) -> Result<Self, DbError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        Self::initialize(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    #[cfg(test)]
    pub fn new_in_memory() -> Result<Self, DbError> {
        let conn = Connection::open_in_memory()?;
        Self::initialize(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn initialize(conn: &Connection) -> Result<(), DbError> {
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA temp_store = MEMORY;
            PRAGMA foreign_keys = ON;
            ",
        )?;

        conn.execute_batch(schema::CREATE_SNIPPETS_TABLE)?;
        conn.execute_batch(schema::CREATE_STICKY_NOTES_TABLE)?;
        conn.execute_batch(schema::CREATE_SETTINGS_TABLE)?;
        conn.execute_batch(schema::CREATE_INDEX_CREATED_AT)?;
        conn.execute_batch(schema::CREATE_INDEX_PINNED)?;

        Ok(())
    }

    pub fn list_snippets(&self) -> Result<Vec<Snippet>, DbError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {SNIPPET_COLUMNS} FROM snippets {ORDER_FOR_DISPLAY}"
        ))?;
        let rows = stmt.query_map([], snippet_from_row)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(DbError::from)
    }

    pub fn count_snippets(&self) -> Result<i64, DbError> {
        let conn = self.conn()?;
        conn.query_row("SELECT COUNT(*) FROM snippets", [], |row| row.get(0))
            .map_err(DbError::from)
    }

    pub fn insert_snippet(&self, row: SnippetRow<'_>) -> Result<Snippet, DbError> {
        let conn = self.conn()?;
        conn.execute(
            "
            INSERT INTO snippets (label, content, tags, group_name, hotkey)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ",
            params![row.label, row.content, row.tags, row.group, row.hotkey],
        )
        .map_err(|err| map_hotkey_conflict(err, row.hotkey))?;
        let id = conn.last_insert_rowid();
        Ok(self.get_snippet_internal(&conn, id)?)
    }

    pub fn get_snippet(&self, id: i64) -> Result<Option<Snippet>, DbError> {
        let conn = self.conn()?;
        self.get_snippet_internal(&conn, id)
            .optional()
            .map_err(DbError::from)
    }

    fn get_snippet_internal(&self, conn: &Connection, id: i64) -> Result<Snippet, rusqlite::Error> {
        conn.query_row(
            &format!("SELECT {SNIPPET_COLUMNS} FROM snippets WHERE id = ?1"),
            params![id],
            snippet_from_row,
        )
    }

    pub fn update_snippet(&self, id: i64, row: SnippetRow<'_>) -> Result<Option<Snippet>, DbError> {
        let conn = self.conn()?;
        let changed = conn
            .execute(
                "
                UPDATE snippets
                SET label = ?1,
                    content = ?2,
                    tags = ?3,
                    group_name = ?4,
                    hotkey = ?5,
                    updated_at = CURRENT_TIMESTAMP
                WHERE id = ?6
                ",
                params![row.label, row.content, row.tags, row.group, row.hotkey, id],
            )
            .map_err(|err| map_hotkey_conflict(err, row.hotkey))?;
        if changed == 0 {
            return Ok(None);
        }
        self.get_snippet_internal(&conn, id)
            .optional()
            .map_err(DbError::from)
    }

    pub fn set_pinned(&self, id: i64, pinned: bool) -> Result<Option<Snippet>, DbError> {
        let conn = self.conn()?;
        conn.execute(
            "UPDATE snippets SET is_pinned = ?1, updated_at = CURRENT_TIMESTAMP WHERE id = ?2",
            params![if pinned { 1 } else { 0 }, id],
        )?;
        self.get_snippet_internal(&conn, id)
            .optional()
            .map_err(DbError::from)
    }

    pub fn delete_snippet(&self, id: i64) -> Result<Option<Snippet>, DbError> {
        let conn = self.conn()?;
        let snippet = self
            .get_snippet_internal(&conn, id)
            .optional()
            .map_err(DbError::from)?;
        if snippet.is_none() {
            return Ok(None);
        }
        conn.execute("DELETE FROM snippets WHERE id = ?1", params![id])?;
        Ok(snippet)
    }

    pub fn delete_snippets_by_ids(&self, ids: &[i64]) -> Result<Vec<Snippet>, DbError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut conn = self.conn()?;
        let mut deleted = Vec::with_capacity(ids.len());
        let tx = conn.transaction()?;

        for id in ids {
            let snippet = tx
                .query_row(
                    &format!("SELECT {SNIPPET_COLUMNS} FROM snippets WHERE id = ?1"),
                    params![id],
                    snippet_from_row,
                )
                .optional()?;
            if let Some(snippet) = snippet {
                tx.execute("DELETE FROM snippets WHERE id = ?1", params![id])?;
                deleted.push(snippet);
            }
        }

        tx.commit()?;
        Ok(deleted)
    }

    /// Ids of history entries that may be evicted, oldest first.
    pub fn evictable_ids(&self) -> Result<Vec<i64>, DbError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "
            SELECT id
            FROM snippets
            WHERE is_pinned = 0 AND (hotkey IS NULL OR hotkey = '')
            ORDER BY created_at ASC, id ASC
            ",
        )?;
        let rows = stmt.query_map([], |row| row.get::<_, i64>(0))?;
        rows.collect::<Result<Vec<_>, _>>().map_err(DbError::from)
    }

    pub fn get_setting(&self, key: &str) -> Result<Option<String>, DbError> {
        let conn = self.conn()?;
        let value: Option<Option<String>> = conn
            .query_row(
                "SELECT value FROM settings WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value.flatten())
    }

    pub fn set_setting(&self, key: &str, value: &str) -> Result<(), DbError> {
        let conn = self.conn()?;
        conn.execute(
            "
            INSERT INTO settings (key, value) VALUES (?1, ?2)
            ON CONFLICT(key) DO UPDATE SET value = excluded.value
            ",
            params![key, value],
        )?;
        Ok(())
    }
}

fn map_hotkey_conflict(err: rusqlite::Error, hotkey: Option<&str>) -> DbError {
    match (&err, hotkey) {
        (rusqlite::Error::SqliteFailure(failure, _), Some(hotkey))
            if failure.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE =>
        {
            DbError::DuplicateHotkey(hotkey.to_string())
        }
        _ => DbError::Sql(err),
    }
}

fn snippet_from_row(row: &Row<'_>) -> Result<Snippet, rusqlite::Error> {
    Ok(Snippet {
        id: row.get(0)?,
        label: row.get(1)?,
        content: row.get(2)?,
        tags: row.get(3)?,
        group: row.get(4)?,
        hotkey: row.get(5)?,
        is_pinned: row.get::<_, i64>(6)? != 0,
        is_sensitive: row.get::<_, i64>(7)? != 0,
        created_at: row.get::<_, Option<String>>(8)?.unwrap_or_default(),
        updated_at: row.get::<_, Option<String>>(9)?.unwrap_or_default(),
    })
}
