//! Repository traits describing persistence adapters.
//!
//! Aggregates read through [`TableStore`], a deliberately narrow view of the
//! remote store: filtered range selects and stored procedures that
//! return loosely typed rows. Callers decode rows into the schemas in
//! `domain::entities` right after fetch.

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use crate::cache::CacheError;
use crate::domain::entities::{NewQuestion, QuestionRecord};
use crate::domain::types::Table;

/// One row as returned by the store, keyed by column name.
pub type Row = serde_json::Map<String, Value>;

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("persistence error: {0}")]
    Persistence(String),
    #[error("record not found")]
    NotFound,
    #[error("duplicate record violates unique constraint `{constraint}`")]
    Duplicate { constraint: String },
    #[error("invalid input: {message}")]
    InvalidInput { message: String },
    #[error("integrity error: {message}")]
    Integrity { message: String },
    #[error("database timeout")]
    Timeout,
}

impl RepoError {
    pub fn from_persistence(err: impl std::fmt::Display) -> Self {
        Self::Persistence(err.to_string())
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }
}

impl From<RepoError> for CacheError {
    fn from(err: RepoError) -> Self {
        CacheError::upstream(err.to_string())
    }
}

/// Equality predicate applied by the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Filter {
    /// Case-insensitive equality on trimmed values.
    EqIgnoreCase { column: &'static str, value: String },
}

impl Filter {
    pub fn eq_ignore_case(column: &'static str, value: impl Into<String>) -> Self {
        Self::EqIgnoreCase {
            column,
            value: value.into(),
        }
    }

    pub fn column(&self) -> &'static str {
        match self {
            Filter::EqIgnoreCase { column, .. } => column,
        }
    }
}

/// Bounded window into an ordered selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowRange {
    pub offset: u64,
    pub limit: u64,
}

impl RowRange {
    pub fn new(offset: u64, limit: u64) -> Self {
        Self { offset, limit }
    }
}

/// Columns, predicates and ordering of a paged select.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    pub table: Table,
    pub columns: &'static [&'static str],
    pub filters: Vec<Filter>,
    /// Ordering must be total so consecutive ranges neither skip nor repeat rows.
    pub order_by: &'static [&'static str],
}

/// Named argument to a stored procedure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcedureArg {
    pub name: &'static str,
    pub value: Value,
}

impl ProcedureArg {
    pub fn new(name: &'static str, value: impl Into<Value>) -> Self {
        Self {
            name,
            value: value.into(),
        }
    }
}

#[async_trait]
pub trait TableStore: Send + Sync {
    async fn select(&self, selection: &Selection, range: RowRange) -> Result<Vec<Row>, RepoError>;

    async fn call_procedure(
        &self,
        name: &str,
        args: &[ProcedureArg],
    ) -> Result<Vec<Row>, RepoError>;
}

#[async_trait]
pub trait QuestionsWriteRepo: Send + Sync {
    async fn insert_question(&self, question: NewQuestion) -> Result<QuestionRecord, RepoError>;
}

#[async_trait]
pub trait StoreHealth: Send + Sync {
    async fn health_check(&self) -> Result<(), RepoError>;
}
