//! Errors

use thiserror::Error;

use crate::query::QueryState;

/// Result type used across the crate.
pub type Result<T> = anyhow::Result<T, Error>;

/// Errors raised while building, preparing, binding, executing or mapping queries.
#[derive(Error, Debug)]
pub enum Error {
    // --- Binding errors ---
    /// A null value was bound through a field that does not accept nulls.
    #[error("attempt to set a null value to the field {field}")]
    NullConstraint { field: String },

    /// The number of bound parameters does not match the placeholders in the query.
    #[error("query expects {expected} parameter(s) but {bound} were bound")]
    ParameterCount { expected: usize, bound: usize },

    // --- Usage errors ---
    /// The operation is not meaningful for this schema element.
    #[error("unsupported operation: {0}")]
    Unsupported(String),

    /// A table, key or relationship definition is inconsistent.
    #[error("invalid schema: {0}")]
    Schema(String),

    /// A vendor-specific operator was requested but the dialect provides none.
    #[error("operator `{0}` is not available for the configured dialect")]
    MissingOperator(&'static str),

    /// The prepared query is in a state that does not allow the operation.
    #[error("cannot {action} a query that is {state}")]
    InvalidState { state: QueryState, action: &'static str },

    // --- Capability errors ---
    /// The underlying database capability failed.
    #[error(transparent)]
    DataAccess(#[from] anyhow::Error),
}

impl Error {
    /// Returns `true` when the error originated in the database capability.
    #[must_use]
    pub const fn is_data_access(&self) -> bool {
        matches!(self, Self::DataAccess(_))
    }
}

macro_rules! unsupported {
    ($fmt:expr, $($arg:tt)*) => {
        $crate::Error::Unsupported(format!($fmt, $($arg)*))
    };
    ($desc:expr $(,)?) => {
        $crate::Error::Unsupported(format!($desc))
    };
}

macro_rules! schema_error {
    ($fmt:expr, $($arg:tt)*) => {
        $crate::Error::Schema(format!($fmt, $($arg)*))
    };
    ($desc:expr $(,)?) => {
        $crate::Error::Schema(format!($desc))
    };
}

pub(crate) use {schema_error, unsupported};
