use std::collections::HashSet;
use std::path::Path;

use anyhow::Context;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};

/// Durable record of which claims have already been posted. The only state
/// this pipeline keeps between runs.
///
/// Writes are at-least-once: recording the same claim number twice must be
/// a no-op.
pub trait PublishHistory {
    fn contains(&self, claim_number: &str) -> anyhow::Result<bool>;

    fn record(
        &mut self,
        claim_number: &str,
        post_id: Option<&str>,
        published_at: DateTime<Utc>,
    ) -> anyhow::Result<()>;
}

/// SQLite-backed history, one row per published claim.
pub struct SqliteHistory {
    conn: Connection,
}

impl SqliteHistory {
    pub fn open(path: &Path) -> anyhow::Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("opening history db {}", path.display()))?;
        Self::from_connection(conn)
    }

    pub fn open_in_memory() -> anyhow::Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> anyhow::Result<Self> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS published_claims (
                claim_number TEXT PRIMARY KEY,
                post_id TEXT,
                published_at TEXT NOT NULL
            )",
            [],
        )?;
        Ok(SqliteHistory { conn })
    }
}

impl PublishHistory for SqliteHistory {
    fn contains(&self, claim_number: &str) -> anyhow::Result<bool> {
        let mut stmt = self
            .conn
            .prepare("SELECT 1 FROM published_claims WHERE claim_number = ?1")?;
        Ok(stmt.exists(params![claim_number])?)
    }

    fn record(
        &mut self,
        claim_number: &str,
        post_id: Option<&str>,
        published_at: DateTime<Utc>,
    ) -> anyhow::Result<()> {
        // OR IGNORE keeps the write idempotent under at-least-once delivery.
        let inserted = self.conn.execute(
            "INSERT OR IGNORE INTO published_claims (claim_number, post_id, published_at)
             VALUES (?1, ?2, ?3)",
            params![claim_number, post_id, published_at.to_rfc3339()],
        )?;
        if inserted == 0 {
            log::warn!("claim {claim_number} was already recorded as published");
        }
        Ok(())
    }
}

/// In-memory history for tests and dry runs.
#[derive(Debug, Default)]
pub struct MemoryHistory {
    published: HashSet<String>,
}

impl MemoryHistory {
    pub fn new() -> Self {
        MemoryHistory::default()
    }

    pub fn with_claims(claims: impl IntoIterator<Item = String>) -> Self {
        MemoryHistory {
            published: claims.into_iter().collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.published.len()
    }

    pub fn is_empty(&self) -> bool {
        self.published.is_empty()
    }
}

impl PublishHistory for MemoryHistory {
    fn contains(&self, claim_number: &str) -> anyhow::Result<bool> {
        Ok(self.published.contains(claim_number))
    }

    fn record(
        &mut self,
        claim_number: &str,
        _post_id: Option<&str>,
        _published_at: DateTime<Utc>,
    ) -> anyhow::Result<()> {
        self.published.insert(claim_number.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn now() -> DateTime<Utc> {
        "2023-06-01T12:00:00Z".parse().unwrap()
    }

    #[test]
    fn sqlite_round_trip() {
        let mut history = SqliteHistory::open_in_memory().unwrap();
        assert!(!history.contains("22-23-000123").unwrap());

        history
            .record("22-23-000123", Some("post-1"), now())
            .unwrap();
        assert!(history.contains("22-23-000123").unwrap());
        assert!(!history.contains("22-23-000999").unwrap());
    }

    #[test]
    fn sqlite_record_is_idempotent() {
        let mut history = SqliteHistory::open_in_memory().unwrap();
        history.record("22-23-000123", Some("post-1"), now()).unwrap();
        // A second write for the same claim must not fail.
        history.record("22-23-000123", Some("post-2"), now()).unwrap();
        assert!(history.contains("22-23-000123").unwrap());
    }

    #[test]
    fn sqlite_persists_across_connections() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("published.db");
        {
            let mut history = SqliteHistory::open(&path).unwrap();
            history.record("22-23-000123", None, now()).unwrap();
        }
        let history = SqliteHistory::open(&path).unwrap();
        assert!(history.contains("22-23-000123").unwrap());
    }

    #[test]
    fn memory_history_tracks_claims() {
        let mut history = MemoryHistory::new();
        assert!(history.is_empty());
        history.record("a", None, now()).unwrap();
        history.record("a", None, now()).unwrap();
        assert_eq!(history.len(), 1);
        assert!(history.contains("a").unwrap());
    }
}
