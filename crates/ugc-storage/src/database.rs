//! Database connection and key-value operations

use chrono::Utc;
use parking_lot::Mutex;
use rusqlite::{Connection, OptionalExtension};
use std::path::Path;
use std::sync::Arc;

use crate::migrations::run_migrations;
use crate::Result;

pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        if let Some(parent) = path.as_ref().parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)?;

        // WAL mode so a second process reading tokens doesn't block writers
        let _: String =
            conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;

        run_migrations(&conn)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        run_migrations(&conn)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn with_connection<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        let conn = self.conn.lock();
        f(&conn)
    }

    pub fn transaction<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        let result = f(&tx)?;
        tx.commit()?;
        Ok(result)
    }

    pub fn get_value(&self, key: &str) -> Result<Option<String>> {
        self.with_connection(|conn| {
            let value = conn
                .query_row("SELECT value FROM kv_store WHERE key = ?1", [key], |row| {
                    row.get(0)
                })
                .optional()?;
            Ok(value)
        })
    }

    pub fn set_value(&self, key: &str, value: &str) -> Result<()> {
        self.write_batch(&[(key, Some(value))])
    }

    pub fn remove_value(&self, key: &str) -> Result<()> {
        self.write_batch(&[(key, None)])
    }

    /// Write several entries in one transaction
    pub fn set_values(&self, entries: &[(&str, &str)]) -> Result<()> {
        let batch: Vec<(&str, Option<&str>)> =
            entries.iter().map(|(key, value)| (*key, Some(*value))).collect();
        self.write_batch(&batch)
    }

    /// Delete several entries in one transaction
    pub fn remove_values(&self, keys: &[&str]) -> Result<()> {
        let batch: Vec<(&str, Option<&str>)> = keys.iter().map(|key| (*key, None)).collect();
        self.write_batch(&batch)
    }

    /// Apply upserts (`Some`) and deletions (`None`) atomically
    pub fn write_batch(&self, entries: &[(&str, Option<&str>)]) -> Result<()> {
        let updated_at = Utc::now().to_rfc3339();
        self.transaction(|conn| {
            for (key, value) in entries {
                match value {
                    Some(value) => {
                        conn.execute(
                            "INSERT OR REPLACE INTO kv_store (key, value, updated_at)
                             VALUES (?1, ?2, ?3)",
                            rusqlite::params![key, value, updated_at],
                        )?;
                    }
                    None => {
                        conn.execute("DELETE FROM kv_store WHERE key = ?1", [key])?;
                    }
                }
            }
            Ok(())
        })
    }
}

impl Clone for Database {
    fn clone(&self) -> Self {
        Self {
            conn: Arc::clone(&self.conn),
        }
    }
}
