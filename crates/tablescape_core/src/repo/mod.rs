//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define use-case oriented data access contracts over `kv_store`.
//! - Isolate SQLite and JSON-document details from service orchestration.
//!
//! # Invariants
//! - Index documents are always rewritten whole; repositories never append.
//! - Read paths skip individually corrupt records instead of failing the
//!   whole load.

use crate::db::DbError;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod favorites_repo;
pub mod formation_repo;

pub type RepoResult<T> = Result<T, RepoError>;

/// Generic repository error for key-value persistence operations.
#[derive(Debug)]
pub enum RepoError {
    Db(DbError),
    /// Serialization of an outgoing document failed.
    Encode(serde_json::Error),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::Encode(err) => write!(f, "failed to encode persisted document: {err}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::Encode(err) => Some(err),
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}
