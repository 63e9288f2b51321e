//! Vendor-specific operators.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use crate::driver::Connection;
use crate::error::{Error, Result, unsupported};
use crate::expr::Expr;
use crate::field::ColumnRef;

/// Operators that only some databases provide.
pub trait CustomOperators: fmt::Debug + Send + Sync {
    /// The case-insensitive LIKE operator token, e.g. ` ilike `.
    fn case_insensitive_like(&self) -> Expr;

    /// The fuzzy (similarity) match operator token, e.g. ` % `.
    fn fuzzy_match(&self) -> Expr;
}

/// PostgreSQL operators (`ilike`, and `%` from `pg_trgm`).
#[derive(Debug, Clone, Copy, Default)]
pub struct PostgresOperators;

impl CustomOperators for PostgresOperators {
    fn case_insensitive_like(&self) -> Expr {
        Expr::sql(" ilike ")
    }

    fn fuzzy_match(&self) -> Expr {
        Expr::sql(" % ")
    }
}

/// The SQL dialect a query is built for.
#[derive(Debug, Clone, Default)]
pub enum Dialect {
    /// Standard SQL only; no custom operators.
    #[default]
    Generic,
    /// PostgreSQL.
    PostgreSql,
    /// SQLite.
    Sqlite,
    /// Caller supplied operators.
    Custom(Arc<dyn CustomOperators>),
}

impl Dialect {
    /// Resolves a dialect from a database product name such as `PostgreSQL`.
    #[must_use]
    pub fn from_product_name(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "postgresql" | "postgres" => Self::PostgreSql,
            "sqlite" => Self::Sqlite,
            _ => Self::Generic,
        }
    }

    /// Resolves the dialect from the connection's product name, falling back to
    /// [`Dialect::Generic`] when the metadata is unavailable.
    pub fn detect(connection: &dyn Connection) -> Self {
        match connection.product_name() {
            Ok(name) => Self::from_product_name(&name),
            Err(e) => {
                tracing::error!(error = %e, "unable to read database product name");
                Self::Generic
            }
        }
    }

    /// The dialect's custom operators, if it has any.
    #[must_use]
    pub fn custom_operators(&self) -> Option<Arc<dyn CustomOperators>> {
        match self {
            Self::PostgreSql => Some(Arc::new(PostgresOperators)),
            Self::Custom(operators) => Some(Arc::clone(operators)),
            Self::Generic | Self::Sqlite => None,
        }
    }

    /// `field <case-insensitive like> ?`
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingOperator`] if the dialect has no such operator.
    pub fn case_insensitive_like(&self, field: impl Into<ColumnRef>) -> Result<Expr> {
        let operators =
            self.custom_operators().ok_or(Error::MissingOperator("case insensitive like"))?;
        let field = field.into();
        Ok(Expr::Sequence(vec![
            Expr::Column(field.clone()),
            operators.case_insensitive_like(),
            Expr::Placeholder(field),
        ]))
    }

    /// `field <fuzzy match> ?`
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingOperator`] if the dialect has no such operator.
    pub fn fuzzy_match(&self, field: impl Into<ColumnRef>) -> Result<Expr> {
        let operators = self.custom_operators().ok_or(Error::MissingOperator("fuzzy match"))?;
        let field = field.into();
        Ok(Expr::Sequence(vec![
            Expr::Column(field.clone()),
            operators.fuzzy_match(),
            Expr::Placeholder(field),
        ]))
    }
}

impl FromStr for Dialect {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "generic" => Ok(Self::Generic),
            "postgres" | "postgresql" => Ok(Self::PostgreSql),
            "sqlite" => Ok(Self::Sqlite),
            other => Err(unsupported!("unknown SQL dialect `{other}`")),
        }
    }
}
