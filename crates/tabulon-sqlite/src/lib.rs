//! `SQLite` database capability for tabulon.
//!
//! A single `rusqlite` connection shared behind a mutex. Statements are
//! validated when prepared and re-prepared from the connection's statement
//! cache when executed, so they never borrow the connection.

mod statement;
mod value;

use std::sync::Arc;

use anyhow::{Context, Result};
use fromenv::FromEnv;
use parking_lot::Mutex;
use rusqlite::Connection as SqliteConnection;
use tabulon::{Backend, Connection, Dialect, Statement};
use tracing::instrument;

use crate::statement::SqliteStatement;

/// Options used to connect to the SQL database.
///
/// This struct is used to load connection options from environment variables.
#[derive(Debug, Clone, FromEnv)]
pub struct ConnectOptions {
    /// Database path or URI, e.g. `:memory:`.
    #[env(from = "SQL_DATABASE", default = "file::memory:?cache=shared")]
    pub database: String,

    /// Dialect queries on this connection are built for.
    #[env(from = "SQL_DIALECT", default = "sqlite")]
    pub dialect: String,
}

impl ConnectOptions {
    /// Options for `database` with the `SQLite` dialect.
    #[must_use]
    pub fn new(database: impl Into<String>) -> Self {
        Self {
            database: database.into(),
            dialect: "sqlite".to_string(),
        }
    }
}

#[allow(missing_docs)]
impl tabulon::FromEnv for ConnectOptions {
    fn from_env() -> Result<Self> {
        Self::from_env().finalize().context("issue loading connection options")
    }
}

/// `SQLite` implementation of the database capability.
#[derive(Debug, Clone)]
pub struct Sqlite {
    // rusqlite::Connection isn't `Sync`
    conn: Arc<Mutex<SqliteConnection>>,
    dialect: Dialect,
}

impl Backend for Sqlite {
    type ConnectOptions = ConnectOptions;

    #[instrument]
    fn connect_with(options: Self::ConnectOptions) -> Result<Self> {
        tracing::debug!("initializing SQLite connection to: {}", options.database);

        let dialect = options.dialect.parse::<Dialect>()?;
        let conn = SqliteConnection::open(&options.database)
            .context("failed to open SQLite database")?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            dialect,
        })
    }
}

impl Sqlite {
    /// The configured dialect.
    #[must_use]
    pub const fn dialect(&self) -> &Dialect {
        &self.dialect
    }

    /// Run one or more `;` separated statements without parameters, e.g. DDL.
    ///
    /// # Errors
    ///
    /// Returns an error if any statement fails.
    pub fn execute_batch(&self, sql: &str) -> Result<()> {
        tracing::debug!("executing batch: {}", sql);
        self.conn.lock().execute_batch(sql).context("failed to execute batch")
    }
}

impl Connection for Sqlite {
    fn prepare(&self, sql: &str) -> Result<Box<dyn Statement>> {
        tracing::debug!("preparing statement: {}", sql);
        self.conn.lock().prepare_cached(sql).context("failed to prepare statement")?;
        Ok(Box::new(SqliteStatement::new(Arc::clone(&self.conn), sql)))
    }

    fn product_name(&self) -> Result<String> {
        Ok("SQLite".to_string())
    }
}
