//! Allocation of sequential document numbers (`ADJ-2024-001`, `TRF-2024-014`, ...).
//!
//! The allocator proposes the next free number for a kind and year by scanning the
//! numbers already stored. It keeps no state and takes no lock: two callers that
//! allocate before either inserts get the same candidate, and the unique constraint
//! on the number column decides at insert time.

use async_trait::async_trait;
use chrono::{DateTime, Datelike, Utc};
use db::models::document_number::DocumentNumber;
use sqlx::SqlitePool;
use thiserror::Error;
use tracing::debug;
use utils::document_number::{DocumentKind, InvalidKind, NumberFormat, PrefixTable};

#[derive(Debug, Error)]
pub enum NumberingError {
    #[error("existing document numbers could not be read: {0}")]
    PersistenceUnavailable(#[source] sqlx::Error),
    #[error(transparent)]
    InvalidKind(#[from] InvalidKind),
    #[error("sequence {pattern}* has no numbers left")]
    SequenceExhausted { pattern: String },
}

/// Read access to the numbers already issued for a kind
#[async_trait]
pub trait NumberSource: Send + Sync {
    /// Every stored number of `kind` starting with `prefix_pattern` (case-sensitive)
    async fn list_numbers(
        &self,
        kind: DocumentKind,
        prefix_pattern: &str,
    ) -> Result<Vec<String>, sqlx::Error>;
}

#[async_trait]
impl NumberSource for SqlitePool {
    async fn list_numbers(
        &self,
        kind: DocumentKind,
        prefix_pattern: &str,
    ) -> Result<Vec<String>, sqlx::Error> {
        DocumentNumber::list_by_prefix(self, kind, prefix_pattern).await
    }
}

#[derive(Debug, Clone)]
pub struct NumberAllocator<S> {
    source: S,
    prefixes: PrefixTable,
    format: NumberFormat,
}

impl<S: NumberSource> NumberAllocator<S> {
    pub fn new(source: S, prefixes: PrefixTable) -> Self {
        Self {
            source,
            prefixes,
            format: NumberFormat::default(),
        }
    }

    pub fn with_format(mut self, format: NumberFormat) -> Self {
        self.format = format;
        self
    }

    /// Next candidate number for `kind` in the year of `now`
    pub async fn allocate_next(
        &self,
        kind: DocumentKind,
        now: DateTime<Utc>,
    ) -> Result<String, NumberingError> {
        let prefix = self.prefixes.prefix(kind);
        let period = now.year();
        let pattern = self.format.pattern(prefix, period);

        let existing = self
            .source
            .list_numbers(kind, &pattern)
            .await
            .map_err(NumberingError::PersistenceUnavailable)?;

        let max = self
            .format
            .max_sequence(existing.iter().map(String::as_str), &pattern);
        let next = max
            .checked_add(1)
            .ok_or_else(|| NumberingError::SequenceExhausted {
                pattern: pattern.clone(),
            })?;
        let number = self.format.format(prefix, period, next);

        debug!(
            kind = %kind,
            period,
            existing = existing.len(),
            number = %number,
            "allocated document number candidate"
        );
        Ok(number)
    }

    /// Same as [`allocate_next`](Self::allocate_next) for a kind given by name or route slug
    pub async fn allocate_next_named(
        &self,
        kind: &str,
        now: DateTime<Utc>,
    ) -> Result<String, NumberingError> {
        let kind: DocumentKind = kind.parse()?;
        self.allocate_next(kind, now).await
    }
}
