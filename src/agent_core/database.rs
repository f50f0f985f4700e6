//! SQLite persistence for generated vignettes.
//!
//! Only the artifact of a terminal session is stored; sessions themselves are
//! never persisted. Uses `rusqlite` synchronously with WAL mode enabled.

use rusqlite::{params, Connection};

use super::errors::EngineError;
use super::types::{Artifact, SavedVignette};

// ─── Store Seam ─────────────────────────────────────────────────────────────

/// Where finished artifacts go.
pub trait ArtifactStore: Send {
    /// Persist an artifact for `owner_id`. Returns the new row id.
    fn save(&self, owner_id: &str, topic: &str, artifact: &Artifact) -> Result<i64, EngineError>;

    /// All artifacts saved by `owner_id`, most recent first.
    fn list_by_owner(&self, owner_id: &str) -> Result<Vec<SavedVignette>, EngineError>;
}

// ─── Database ───────────────────────────────────────────────────────────────

/// SQLite-backed [`ArtifactStore`].
pub struct VignetteDatabase {
    conn: Connection,
}

impl VignetteDatabase {
    /// Open (or create) the vignette database at the given path.
    ///
    /// Pass `":memory:"` for an in-memory database (tests).
    pub fn open(path: &str) -> Result<Self, EngineError> {
        let conn = Connection::open(path)?;

        conn.execute_batch("PRAGMA journal_mode=WAL;")?;

        let db = Self { conn };
        db.create_tables()?;
        Ok(db)
    }

    fn create_tables(&self) -> Result<(), EngineError> {
        self.conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS vignettes (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                owner_id TEXT NOT NULL,
                topic TEXT NOT NULL,
                initial_vignette TEXT NOT NULL,
                final_vignette TEXT NOT NULL,
                conversation TEXT NOT NULL,
                created_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%SZ', 'now'))
            );

            CREATE INDEX IF NOT EXISTS idx_vignettes_owner
                ON vignettes(owner_id, id);
            ",
        )?;
        Ok(())
    }

    /// Number of stored vignettes across all owners.
    pub fn count(&self) -> Result<i64, EngineError> {
        let n = self
            .conn
            .query_row("SELECT COUNT(*) FROM vignettes", [], |row| row.get(0))?;
        Ok(n)
    }
}

impl ArtifactStore for VignetteDatabase {
    fn save(&self, owner_id: &str, topic: &str, artifact: &Artifact) -> Result<i64, EngineError> {
        self.conn.execute(
            "INSERT INTO vignettes (owner_id, topic, initial_vignette, final_vignette, conversation)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                owner_id,
                topic,
                artifact.initial_version,
                artifact.final_version,
                artifact.transcript_serialization,
            ],
        )?;
        let id = self.conn.last_insert_rowid();
        tracing::info!(id, owner_id, topic, "vignette saved");
        Ok(id)
    }

    fn list_by_owner(&self, owner_id: &str) -> Result<Vec<SavedVignette>, EngineError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, owner_id, topic, initial_vignette, final_vignette, conversation, created_at
             FROM vignettes WHERE owner_id = ?1 ORDER BY id DESC",
        )?;

        let rows = stmt.query_map(params![owner_id], |row| {
            Ok(SavedVignette {
                id: row.get(0)?,
                owner_id: row.get(1)?,
                topic: row.get(2)?,
                initial_version: row.get(3)?,
                final_version: row.get(4)?,
                conversation: row.get(5)?,
                created_at: row.get(6)?,
            })
        })?;

        let mut vignettes = Vec::new();
        for row in rows {
            vignettes.push(row?);
        }
        Ok(vignettes)
    }
}

// ─── Tests ──────────────────────────────────────────────────────────────────
