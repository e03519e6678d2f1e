//! Favorite-product persistence over the `kv_store` table.
//!
//! # Responsibility
//! - Read and rewrite the favorites id-set as one JSON document under a
//!   fixed key.
//!
//! # Invariants
//! - Every write replaces the complete set.
//! - Ids that fail to parse are dropped on read, keeping the rest usable.

use crate::model::product::ProductId;
use crate::repo::{RepoError, RepoResult};
use log::warn;
use rusqlite::{params, Connection, OptionalExtension};
use serde_json::Value;
use std::collections::BTreeSet;

const FAVORITES_KEY: &str = "favorite_product_ids";

/// Repository interface for the persisted favorites set.
pub trait FavoritesRepository {
    fn read_favorites(&self) -> RepoResult<BTreeSet<ProductId>>;
    fn write_favorites(&self, favorites: &BTreeSet<ProductId>) -> RepoResult<()>;
}

/// SQLite `kv_store`-backed favorites repository.
pub struct SqliteFavoritesRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteFavoritesRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl FavoritesRepository for SqliteFavoritesRepository<'_> {
    fn read_favorites(&self) -> RepoResult<BTreeSet<ProductId>> {
        let document: Option<String> = self
            .conn
            .query_row(
                "SELECT value FROM kv_store WHERE key = ?1;",
                [FAVORITES_KEY],
                |row| row.get(0),
            )
            .optional()?;

        let Some(document) = document else {
            return Ok(BTreeSet::new());
        };

        let entries: Vec<Value> = match serde_json::from_str(&document) {
            Ok(entries) => entries,
            Err(err) => {
                warn!(
                    "event=favorites_read module=favorites_repo status=error error_code=document_corrupt error={err}"
                );
                return Ok(BTreeSet::new());
            }
        };

        let mut favorites = BTreeSet::new();
        for entry in entries {
            match serde_json::from_value::<ProductId>(entry) {
                Ok(id) => {
                    favorites.insert(id);
                }
                Err(err) => {
                    warn!(
                        "event=favorites_read module=favorites_repo status=skip error_code=id_unparseable error={err}"
                    );
                }
            }
        }

        Ok(favorites)
    }

    fn write_favorites(&self, favorites: &BTreeSet<ProductId>) -> RepoResult<()> {
        let ids: Vec<&ProductId> = favorites.iter().collect();
        let document = serde_json::to_string(&ids).map_err(RepoError::Encode)?;
        self.conn.execute(
            "INSERT INTO kv_store (key, value, updated_at)
             VALUES (?1, ?2, strftime('%s', 'now') * 1000)
             ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                updated_at = excluded.updated_at;",
            params![FAVORITES_KEY, document],
        )?;
        Ok(())
    }
}
