//! The database access capability the query layer runs on.
//!
//! Providers implement [`Connection`], [`Statement`], [`Cursor`] and [`Row`] to
//! let queries prepare, bind and execute SQL against a backend (SQLite,
//! Postgres, etc). All methods are blocking and report failures with `anyhow`;
//! the query layer surfaces them as [`crate::Error::DataAccess`].

use std::fmt::Debug;

use anyhow::Result;

use crate::value::{DataType, SqlType};

/// An open connection able to prepare statements.
pub trait Connection: Debug + Send + Sync {
    /// Prepare a statement with `?` placeholders.
    ///
    /// # Errors
    ///
    /// Returns an error if the SQL cannot be prepared.
    fn prepare(&self, sql: &str) -> Result<Box<dyn Statement>>;

    /// The database product name reported by the backend, e.g. `PostgreSQL`.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection metadata is unavailable.
    fn product_name(&self) -> Result<String>;
}

/// A prepared statement with 1-based positional parameters.
pub trait Statement: Send {
    /// Bind `value` at the 1-based `index`.
    ///
    /// # Errors
    ///
    /// Returns an error if the value cannot be bound.
    fn bind(&mut self, index: usize, value: DataType) -> Result<()>;

    /// Clear every bound parameter.
    ///
    /// # Errors
    ///
    /// Returns an error if the statement is no longer usable.
    fn clear_parameters(&mut self) -> Result<()>;

    /// Execute a statement that does not return rows and report the affected row count.
    ///
    /// # Errors
    ///
    /// Returns an error if execution fails.
    fn execute_update(&mut self) -> Result<u64>;

    /// Execute a statement that returns rows.
    ///
    /// # Errors
    ///
    /// Returns an error if execution fails.
    fn execute_query(&mut self) -> Result<Box<dyn Cursor + '_>>;

    /// Release the statement.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails to release it.
    fn close(&mut self) -> Result<()>;
}

/// Forward-only iteration over the rows of a result set.
pub trait Cursor {
    /// Advance to the next row.
    ///
    /// # Errors
    ///
    /// Returns an error if the row cannot be fetched.
    fn next_row(&mut self) -> Result<Option<Box<dyn Row>>>;

    /// Release the cursor.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails to release it.
    fn close(&mut self) -> Result<()>;
}

/// A single result row with typed, 1-based column access.
pub trait Row {
    /// Number of columns in the row.
    fn len(&self) -> usize;

    /// Returns `true` if the row has no columns.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Read the column at the 1-based `index` as `sql_type`.
    ///
    /// # Errors
    ///
    /// Returns an error if the column does not exist or cannot be read as the requested type.
    fn get(&self, index: usize, sql_type: SqlType) -> Result<DataType>;
}

/// A backend that can be connected to with options loaded from the environment.
pub trait Backend: Sized + Send + Sync {
    /// The options used to connect to the backend.
    type ConnectOptions: FromEnv;

    /// Connect using options loaded from the environment.
    ///
    /// # Errors
    ///
    /// Returns an error if the options cannot be loaded or the connection fails.
    fn connect() -> Result<Self> {
        Self::connect_with(Self::ConnectOptions::from_env()?)
    }

    /// Connect with the specified options.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection fails.
    fn connect_with(options: Self::ConnectOptions) -> Result<Self>;
}

/// Trait for creating connection options from environment variables.
pub trait FromEnv: Sized {
    /// Create connection options from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if required environment variables are missing or invalid.
    fn from_env() -> Result<Self>;
}
