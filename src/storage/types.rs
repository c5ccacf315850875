use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

// ============================================================================
// Error Types
// ============================================================================

/// Database-specific errors with user-friendly messages
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// Another process holds the database lock
    #[error("Another instance of doceria appears to be running. Please close it and try again.")]
    InstanceLocked,

    /// Migration failed
    #[error("Database migration failed: {0}")]
    Migration(String),

    /// Generic database error
    #[error("Database error: {0}")]
    Other(#[from] sqlx::Error),
}

impl DatabaseError {
    /// Classify a sqlx error, mapping lock contention to `InstanceLocked`.
    pub(crate) fn from_sqlx(err: sqlx::Error) -> Self {
        if is_lock_message(&err.to_string()) {
            return DatabaseError::InstanceLocked;
        }
        DatabaseError::Other(err)
    }
}

/// SQLITE_BUSY (5), SQLITE_LOCKED (6) and SQLITE_CANTOPEN (14) all surface
/// through the error text only.
pub(crate) fn is_lock_message(message: &str) -> bool {
    let lower = message.to_lowercase();
    lower.contains("database is locked")
        || lower.contains("database table is locked")
        || lower.contains("sqlite_busy")
        || lower.contains("sqlite_locked")
        || lower.contains("unable to open database file")
}

// ============================================================================
// Category Rows
// ============================================================================

/// A persisted category as returned by either store.
///
/// Field names follow the `categorias` table so the same type decodes rows
/// from SQLite and JSON from the hosted store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: i64,
    pub nome: String,
    #[serde(default)]
    pub parent_id: Option<i64>,
    #[serde(default)]
    pub descricao: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Internal row type for SQLite queries. Timestamps are unix seconds.
#[derive(Debug, sqlx::FromRow)]
pub(crate) struct CategoryDbRow {
    pub id: i64,
    pub nome: String,
    pub parent_id: Option<i64>,
    pub descricao: Option<String>,
    pub created_at: Option<i64>,
    pub updated_at: Option<i64>,
}

impl CategoryDbRow {
    pub(crate) fn into_category(self) -> Category {
        Category {
            id: self.id,
            nome: self.nome,
            parent_id: self.parent_id,
            descricao: self.descricao,
            created_at: self.created_at.and_then(|ts| DateTime::from_timestamp(ts, 0)),
            updated_at: self.updated_at.and_then(|ts| DateTime::from_timestamp(ts, 0)),
        }
    }
}

/// Payload for inserting a category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewCategory {
    pub nome: String,
    pub descricao: Option<String>,
    pub parent_id: Option<i64>,
}

impl NewCategory {
    pub fn root(nome: impl Into<String>) -> Self {
        Self {
            nome: nome.into(),
            descricao: None,
            parent_id: None,
        }
    }

    pub fn child_of(parent_id: i64, nome: impl Into<String>) -> Self {
        Self {
            nome: nome.into(),
            descricao: None,
            parent_id: Some(parent_id),
        }
    }
}

/// Partial update. `None` leaves a column untouched; `descricao: Some(None)`
/// clears the description.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CategoryUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nome: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub descricao: Option<Option<String>>,
}

impl CategoryUpdate {
    pub fn rename(nome: impl Into<String>) -> Self {
        Self {
            nome: Some(nome.into()),
            descricao: None,
        }
    }
}

/// What a delete took away.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeletedCategory {
    pub category: Category,
    /// Rows removed, `category` included. `None` when the store cascades
    /// without reporting how many rows went with it.
    pub removed: Option<u64>,
}

impl DeletedCategory {
    /// Descendants removed along with the category, when known.
    pub fn descendants(&self) -> Option<u64> {
        self.removed.map(|n| n.saturating_sub(1))
    }
}
