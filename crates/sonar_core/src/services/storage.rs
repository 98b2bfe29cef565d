//! Local SQLite storage for application metadata.
//!
//! Stores saved queries and UI state (including the last run's editor
//! inputs). Query history is not stored here; it comes from the service.
//!
//! # Data Directory Locations
//!
//! - **macOS**: `~/Library/Application Support/dev.sonar.Sonar`
//! - **Windows**: `%APPDATA%\sonar\Sonar`
//! - **Linux**: `~/.local/share/sonar`
//! - **Debug builds**: `./sonar_data` in current directory

use crate::error::SonarError;
use crate::models::{LastRun, SavedQuery};

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// UI state key holding the last run's editor inputs.
const LAST_RUN_KEY: &str = "insights.last_run";

/// Get the default data directory for the application.
///
/// Debug builds use `./sonar_data` in the current directory.
pub fn default_data_dir() -> PathBuf {
    #[cfg(debug_assertions)]
    {
        PathBuf::from("./sonar_data")
    }

    #[cfg(not(debug_assertions))]
    {
        dirs::data_dir()
            .map(|d| {
                #[cfg(target_os = "macos")]
                {
                    d.join("dev.sonar.Sonar")
                }
                #[cfg(target_os = "windows")]
                {
                    d.join("sonar").join("Sonar")
                }
                #[cfg(not(any(target_os = "macos", target_os = "windows")))]
                {
                    d.join("sonar")
                }
            })
            .unwrap_or_else(|| PathBuf::from("./sonar_data"))
    }
}

/// Initialize the data directory, creating it if needed.
pub fn init_data_dir(path: &Path) -> Result<(), SonarError> {
    if path.exists() {
        if !path.is_dir() {
            return Err(SonarError::storage(
                format!("Data path exists but is not a directory: {}", path.display()),
                Some("Select a different location or remove the existing file"),
            ));
        }
        return Ok(());
    }

    std::fs::create_dir_all(path).map_err(|e| {
        SonarError::storage(
            format!("Failed to create data directory '{}': {}", path.display(), e),
            Some("Check permissions or select a different location"),
        )
    })?;

    tracing::info!(path = %path.display(), "Created data directory");
    Ok(())
}

/// SQLite-based local storage for application data.
///
/// Thread-safe via internal Mutex. Uses WAL mode for concurrent reads.
pub struct LocalStorage {
    connection: Mutex<Connection>,
    data_dir: PathBuf,
}

impl LocalStorage {
    /// Open or create local storage in the given data directory.
    pub fn open(data_dir: PathBuf) -> Result<Self, SonarError> {
        init_data_dir(&data_dir)?;
        let db_path = data_dir.join("sonar.db");
        Self::open_with_path(db_path, data_dir)
    }

    /// Open storage with a specific database path.
    pub fn open_with_path(db_path: PathBuf, data_dir: PathBuf) -> Result<Self, SonarError> {
        let connection = Connection::open(&db_path).map_err(|e| {
            SonarError::storage(
                format!("Failed to open database '{}': {}", db_path.display(), e),
                Some("The database file may be corrupted. Try deleting it to start fresh."),
            )
        })?;

        Self::configure_connection(&connection)?;

        let storage = Self { connection: Mutex::new(connection), data_dir };
        storage.run_migrations()?;

        tracing::info!(path = %db_path.display(), "Local storage opened");
        Ok(storage)
    }

    /// Open a throwaway in-memory database.
    pub fn open_in_memory() -> Result<Self, SonarError> {
        let connection = Connection::open_in_memory()?;
        let storage = Self { connection: Mutex::new(connection), data_dir: PathBuf::new() };
        storage.run_migrations()?;
        Ok(storage)
    }

    fn configure_connection(conn: &Connection) -> Result<(), SonarError> {
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA busy_timeout = 5000;
            PRAGMA temp_store = MEMORY;
            ",
        )
        .map_err(|e| SonarError::storage(format!("Failed to configure database: {e}"), None))
    }

    fn run_migrations(&self) -> Result<(), SonarError> {
        let conn = self.connection.lock();

        conn.execute(
            "CREATE TABLE IF NOT EXISTS migrations (
                domain TEXT NOT NULL,
                step INTEGER NOT NULL,
                migration TEXT NOT NULL,
                PRIMARY KEY(domain, step)
            ) STRICT",
            [],
        )
        .map_err(|e| SonarError::storage(format!("Failed to create migrations table: {e}"), None))?;

        Self::migrate_schema(&conn)
    }

    fn migrate_schema(conn: &Connection) -> Result<(), SonarError> {
        const DOMAIN: &str = "insights";

        let current_step: i32 = conn
            .query_row(
                "SELECT COALESCE(MAX(step), 0) FROM migrations WHERE domain = ?",
                [DOMAIN],
                |row| row.get(0),
            )
            .unwrap_or(0);

        if current_step < 1 {
            conn.execute_batch(
                "
                CREATE TABLE saved_queries (
                    query_id TEXT PRIMARY KEY,
                    name TEXT NOT NULL,
                    query_text TEXT NOT NULL,
                    log_groups_json TEXT NOT NULL DEFAULT '[]',
                    created_at TEXT NOT NULL,
                    updated_at TEXT NOT NULL
                ) STRICT;

                CREATE TABLE ui_state (
                    key TEXT PRIMARY KEY,
                    value_json TEXT NOT NULL,
                    updated_at TEXT NOT NULL
                ) STRICT;

                CREATE INDEX idx_saved_queries_name ON saved_queries(name);
                ",
            )
            .map_err(|e| SonarError::storage(format!("Migration 1 failed: {e}"), None))?;

            conn.execute(
                "INSERT INTO migrations (domain, step, migration) VALUES (?, 1, 'initial_schema')",
                [DOMAIN],
            )
            .map_err(|e| SonarError::storage(format!("Failed to record migration: {e}"), None))?;

            tracing::info!("Applied migration 1: initial_schema");
        }

        Ok(())
    }

    /// Get the data directory path.
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    // ========== Saved Queries Operations ==========

    /// Insert or update a saved query.
    pub fn save_query(&self, query: &SavedQuery) -> Result<(), SonarError> {
        let conn = self.connection.lock();
        let now = Utc::now().to_rfc3339();
        let log_groups = serde_json::to_string(&query.log_groups)?;

        conn.execute(
            "INSERT INTO saved_queries (query_id, name, query_text, log_groups_json, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT(query_id) DO UPDATE SET
                name = excluded.name,
                query_text = excluded.query_text,
                log_groups_json = excluded.log_groups_json,
                updated_at = excluded.updated_at",
            params![
                query.id.to_string(),
                query.name,
                query.query,
                log_groups,
                query.created_at.to_rfc3339(),
                now,
            ],
        )
        .map_err(|e| SonarError::storage(format!("Failed to save query: {e}"), None))?;

        tracing::debug!(query_id = %query.id, name = %query.name, "Query saved");
        Ok(())
    }

    /// Load a saved query by ID.
    pub fn load_saved_query(&self, id: Uuid) -> Result<Option<SavedQuery>, SonarError> {
        let conn = self.connection.lock();

        conn.query_row(
            "SELECT query_id, name, query_text, log_groups_json, created_at, updated_at
             FROM saved_queries WHERE query_id = ?",
            [id.to_string()],
            row_to_saved_query,
        )
        .optional()
        .map_err(|e| SonarError::storage(format!("Failed to load saved query: {e}"), None))
    }

    /// Load a saved query by its exact name.
    pub fn find_saved_query(&self, name: &str) -> Result<Option<SavedQuery>, SonarError> {
        let conn = self.connection.lock();

        conn.query_row(
            "SELECT query_id, name, query_text, log_groups_json, created_at, updated_at
             FROM saved_queries WHERE name = ? ORDER BY updated_at DESC LIMIT 1",
            [name],
            row_to_saved_query,
        )
        .optional()
        .map_err(|e| SonarError::storage(format!("Failed to load saved query: {e}"), None))
    }

    /// Load all saved queries, ordered by name.
    pub fn load_all_saved_queries(&self) -> Result<Vec<SavedQuery>, SonarError> {
        let conn = self.connection.lock();

        let mut stmt = conn
            .prepare(
                "SELECT query_id, name, query_text, log_groups_json, created_at, updated_at
                 FROM saved_queries ORDER BY name COLLATE NOCASE",
            )
            .map_err(|e| SonarError::storage(format!("Failed to prepare query: {e}"), None))?;

        let rows = stmt
            .query_map([], row_to_saved_query)
            .map_err(|e| SonarError::storage(format!("Failed to query saved queries: {e}"), None))?;

        rows.collect::<Result<Vec<_>, _>>()
            .map_err(|e| SonarError::storage(format!("Failed to read saved queries: {e}"), None))
    }

    /// Saved queries matching a case-insensitive filter.
    pub fn search_saved_queries(&self, filter: &str) -> Result<Vec<SavedQuery>, SonarError> {
        Ok(self.load_all_saved_queries()?.into_iter().filter(|q| q.matches(filter)).collect())
    }

    /// Delete a saved query. Returns true if a row was removed.
    pub fn delete_saved_query(&self, id: Uuid) -> Result<bool, SonarError> {
        let conn = self.connection.lock();

        let removed = conn
            .execute("DELETE FROM saved_queries WHERE query_id = ?", [id.to_string()])
            .map_err(|e| SonarError::storage(format!("Failed to delete saved query: {e}"), None))?;

        tracing::debug!(query_id = %id, removed, "Saved query deleted");
        Ok(removed > 0)
    }

    // ========== UI State Operations ==========

    /// Save UI state.
    pub fn save_ui_state(&self, key: &str, value: &serde_json::Value) -> Result<(), SonarError> {
        let conn = self.connection.lock();
        let now = Utc::now().to_rfc3339();
        let json = serde_json::to_string(value)?;

        conn.execute(
            "INSERT INTO ui_state (key, value_json, updated_at)
             VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET
                value_json = excluded.value_json,
                updated_at = excluded.updated_at",
            params![key, json, now],
        )
        .map_err(|e| SonarError::storage(format!("Failed to save UI state: {e}"), None))?;

        Ok(())
    }

    /// Load UI state.
    pub fn load_ui_state(&self, key: &str) -> Result<Option<serde_json::Value>, SonarError> {
        let conn = self.connection.lock();

        let result: Option<String> = conn
            .query_row("SELECT value_json FROM ui_state WHERE key = ?", [key], |row| row.get(0))
            .optional()
            .map_err(|e| SonarError::storage(format!("Failed to load UI state: {e}"), None))?;

        match result {
            Some(json_str) => {
                let value = serde_json::from_str(&json_str)
                    .map_err(|e| SonarError::storage(format!("Invalid UI state JSON: {e}"), None))?;
                Ok(Some(value))
            }
            None => Ok(None),
        }
    }

    /// Remember the editor inputs of a run.
    pub fn save_last_run(&self, last_run: &LastRun) -> Result<(), SonarError> {
        self.save_ui_state(LAST_RUN_KEY, &serde_json::to_value(last_run)?)
    }

    /// Editor inputs of the most recent run, if any were stored.
    ///
    /// An unreadable entry is treated as missing.
    pub fn load_last_run(&self) -> Result<Option<LastRun>, SonarError> {
        let Some(value) = self.load_ui_state(LAST_RUN_KEY)? else {
            return Ok(None);
        };
        match serde_json::from_value(value) {
            Ok(last_run) => Ok(Some(last_run)),
            Err(e) => {
                tracing::warn!(error = %e, "Ignoring unreadable last run state");
                Ok(None)
            }
        }
    }
}

fn row_to_saved_query(row: &rusqlite::Row) -> rusqlite::Result<SavedQuery> {
    let id_str: String = row.get(0)?;
    let log_groups_json: String = row.get(3)?;
    let created_at_str: String = row.get(4)?;
    let updated_at_str: String = row.get(5)?;

    Ok(SavedQuery {
        id: Uuid::parse_str(&id_str).unwrap_or_default(),
        name: row.get(1)?,
        query: row.get(2)?,
        log_groups: serde_json::from_str(&log_groups_json).unwrap_or_default(),
        created_at: parse_timestamp(&created_at_str),
        updated_at: parse_timestamp(&updated_at_str),
    })
}

fn parse_timestamp(value: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{TimeRange, TimeUnit};
    use tempfile::TempDir;

    fn open() -> (TempDir, LocalStorage) {
        let dir = TempDir::new().unwrap();
        let storage = LocalStorage::open(dir.path().to_path_buf()).unwrap();
        (dir, storage)
    }

    #[test]
    fn test_saved_query_crud() {
        let (_dir, storage) = open();

        let mut query = SavedQuery::new(
            "Errors",
            "fields @message | filter @message like /ERROR/",
            vec!["/app/api".into(), "/app/worker".into()],
        );
        storage.save_query(&query).unwrap();

        let loaded = storage.load_saved_query(query.id).unwrap().unwrap();
        assert_eq!(loaded.name, "Errors");
        assert_eq!(loaded.log_groups, vec!["/app/api", "/app/worker"]);

        query.name = "API errors".into();
        storage.save_query(&query).unwrap();
        let all = storage.load_all_saved_queries().unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].name, "API errors");

        assert_eq!(storage.find_saved_query("API errors").unwrap().unwrap().id, query.id);
        assert!(storage.find_saved_query("missing").unwrap().is_none());

        assert!(storage.delete_saved_query(query.id).unwrap());
        assert!(!storage.delete_saved_query(query.id).unwrap());
        assert!(storage.load_all_saved_queries().unwrap().is_empty());
    }

    #[test]
    fn test_search_is_case_insensitive() {
        let (_dir, storage) = open();
        storage.save_query(&SavedQuery::new("Slow requests", "filter duration > 1000", vec![])).unwrap();
        storage.save_query(&SavedQuery::new("Errors", "filter level = 'ERROR'", vec![])).unwrap();

        let found = storage.search_saved_queries("SLOW").unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name, "Slow requests");
        assert_eq!(storage.search_saved_queries("").unwrap().len(), 2);
    }

    #[test]
    fn test_last_run_persists_across_reopen() {
        let dir = TempDir::new().unwrap();
        let last_run = LastRun {
            query: "fields @message".into(),
            log_groups: vec!["/app/api".into()],
            time_range: TimeRange::Relative { amount: 1, unit: TimeUnit::Hour },
        };

        {
            let storage = LocalStorage::open(dir.path().to_path_buf()).unwrap();
            assert!(storage.load_last_run().unwrap().is_none());
            storage.save_last_run(&last_run).unwrap();
        }

        let storage = LocalStorage::open(dir.path().to_path_buf()).unwrap();
        assert_eq!(storage.load_last_run().unwrap(), Some(last_run));
    }

    #[test]
    fn test_unreadable_last_run_is_ignored() {
        let storage = LocalStorage::open_in_memory().unwrap();
        storage.save_ui_state(LAST_RUN_KEY, &serde_json::json!({"query": 42})).unwrap();
        assert!(storage.load_last_run().unwrap().is_none());
    }

    #[test]
    fn test_data_path_must_be_directory() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("not_a_dir");
        std::fs::write(&file, b"x").unwrap();
        let err = init_data_dir(&file).unwrap_err();
        assert_eq!(err.category(), "Storage");
    }
}
