//! Formation index persistence over the `kv_store` table.
//!
//! # Responsibility
//! - Read and rewrite the whole persisted formation index as one JSON
//!   document under a fixed key.
//! - Skip individually corrupt index records on read, keeping the rest
//!   available.
//!
//! # Invariants
//! - Every write replaces the complete index; there is no incremental
//!   append path.
//! - Records that fail to parse or fail codec validation never reach the
//!   in-memory model.

use crate::model::formation::FormationSnapshot;
use crate::repo::{RepoResult, RepoError};
use log::{error, warn};
use rusqlite::{params, Connection, OptionalExtension};
use serde_json::Value;

const FORMATIONS_INDEX_KEY: &str = "formations_index";

/// Result of one index read, with corruption accounting.
#[derive(Debug, Default)]
pub struct IndexReadOutcome {
    /// Records that parsed and validated, in stored order.
    pub formations: Vec<FormationSnapshot>,
    /// Records dropped because they failed to parse or validate.
    pub skipped_records: usize,
}

/// Repository interface for the persisted formation index.
pub trait FormationIndexRepository {
    fn read_index(&self) -> RepoResult<IndexReadOutcome>;
    fn write_index(&self, formations: &[FormationSnapshot]) -> RepoResult<()>;
}

/// SQLite `kv_store`-backed formation index repository.
pub struct SqliteFormationIndexRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteFormationIndexRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl FormationIndexRepository for SqliteFormationIndexRepository<'_> {
    fn read_index(&self) -> RepoResult<IndexReadOutcome> {
        let document: Option<String> = self
            .conn
            .query_row(
                "SELECT value FROM kv_store WHERE key = ?1;",
                [FORMATIONS_INDEX_KEY],
                |row| row.get(0),
            )
            .optional()?;

        let Some(document) = document else {
            return Ok(IndexReadOutcome::default());
        };

        let entries: Vec<Value> = match serde_json::from_str(&document) {
            Ok(entries) => entries,
            Err(err) => {
                // Whole-document corruption: start empty rather than refuse
                // to load; the next successful save rewrites the document.
                error!(
                    "event=index_read module=formation_repo status=error error_code=index_document_corrupt error={err}"
                );
                return Ok(IndexReadOutcome::default());
            }
        };

        let mut outcome = IndexReadOutcome::default();
        for entry in entries {
            let snapshot: FormationSnapshot = match serde_json::from_value(entry) {
                Ok(snapshot) => snapshot,
                Err(err) => {
                    warn!(
                        "event=index_read module=formation_repo status=skip error_code=record_unparseable error={err}"
                    );
                    outcome.skipped_records += 1;
                    continue;
                }
            };

            if let Err(err) = snapshot.validate() {
                warn!(
                    "event=index_read module=formation_repo status=skip formation_id={} error_code=record_invalid error={err}",
                    snapshot.id
                );
                outcome.skipped_records += 1;
                continue;
            }

            outcome.formations.push(snapshot);
        }

        Ok(outcome)
    }

    fn write_index(&self, formations: &[FormationSnapshot]) -> RepoResult<()> {
        let document = serde_json::to_string(formations).map_err(RepoError::Encode)?;
        self.conn.execute(
            "INSERT INTO kv_store (key, value, updated_at)
             VALUES (?1, ?2, strftime('%s', 'now') * 1000)
             ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                updated_at = excluded.updated_at;",
            params![FORMATIONS_INDEX_KEY, document],
        )?;
        Ok(())
    }
}
