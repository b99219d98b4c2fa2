//! Gateway error taxonomy.
//!
//! Guard violations (planner fault) and transient infrastructure faults
//! (retryable) are distinct variants so callers can decide whether a retry
//! makes sense. No variant is ever produced for the deliberate leniency of
//! dropping unknown filter fields on reads.

use thiserror::Error;

/// Errors surfaced by the catalog builder, guard policy and executor.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Plan names a table absent from the exposed catalog: blocked, without
    /// a primary key, or simply nonexistent. Rejected before any statement
    /// is built.
    #[error("unknown entity '{0}': not in the exposed catalog")]
    UnknownEntity(String),

    /// A mutation (update or its preview) was requested with zero filters.
    #[error("mutations require at least one filter")]
    MissingFilters,

    /// A mutation filter referenced a column that does not exist. Reads drop
    /// such filters silently; mutations must not run with a loosened WHERE.
    #[error("unknown column '{column}' in mutation filter for '{entity}'")]
    UnknownColumn { entity: String, column: String },

    /// After stripping disallowed and unknown columns, nothing remained to
    /// insert or update.
    #[error("no valid fields remain for '{entity}'")]
    NoValidFields { entity: String },

    /// An update's affected-row count exceeded the ceiling. The statement
    /// was rolled back, not just rejected.
    #[error("update would have affected {attempted} rows, over the ceiling of {max}; rolled back")]
    TooManyRowsAffected { attempted: u64, max: u64 },

    /// A plan-supplied value could not be bound to its column's type.
    #[error("invalid value for column '{column}': {reason}")]
    InvalidValue { column: String, reason: String },

    /// An identifier failed the strict quoting rules. Catalog-sourced names
    /// always pass; this only fires on hostile or corrupt metadata.
    #[error("invalid identifier '{0}'")]
    InvalidIdentifier(String),

    /// Catalog build failed. The session must not serve queries until a
    /// successful rebuild.
    #[error("schema introspection failed: {0}")]
    SchemaIntrospection(String),

    /// No session with the given id. Connect first.
    #[error("session '{0}' is not connected")]
    NotConnected(String),

    /// Connectivity or timeout failure from the database. Safe to retry
    /// with backoff at the caller's discretion; the core never retries.
    #[error("database error: {0}")]
    Transient(#[from] sqlx::Error),
}

impl GatewayError {
    /// True for infrastructure faults a caller may retry. Guard violations
    /// are deterministic and will fail again unchanged.
    pub fn is_retryable(&self) -> bool {
        matches!(self, GatewayError::Transient(_))
    }
}

pub type Result<T> = std::result::Result<T, GatewayError>;
