#![allow(clippy::significant_drop_tightening)]

use std::collections::VecDeque;
use std::sync::Arc;

use anyhow::{Context, Result, anyhow, bail};
use parking_lot::Mutex;
use rusqlite::types::Value;
use rusqlite::{Connection as SqliteConnection, params_from_iter};
use tabulon::{Cursor, DataType, Row, SqlType, Statement};

use crate::value::{from_sqlite, to_sqlite};

/// A statement re-prepared from the connection's cache on each execution.
///
/// Closing releases the connection handle and the bound values; a closed
/// statement refuses further use.
pub struct SqliteStatement {
    conn: Option<Arc<Mutex<SqliteConnection>>>,
    sql: String,
    params: Vec<Value>,
}

impl SqliteStatement {
    pub fn new(conn: Arc<Mutex<SqliteConnection>>, sql: &str) -> Self {
        Self {
            conn: Some(conn),
            sql: sql.to_string(),
            params: Vec::new(),
        }
    }
}

impl SqliteStatement {
    fn connection(&self) -> Result<&Arc<Mutex<SqliteConnection>>> {
        self.conn.as_ref().ok_or_else(|| anyhow!("statement is closed: {}", self.sql))
    }
}

impl Statement for SqliteStatement {
    fn bind(&mut self, index: usize, value: DataType) -> Result<()> {
        self.connection()?;
        if index == 0 {
            bail!("parameter indexes start at 1");
        }
        if self.params.len() < index {
            self.params.resize(index, Value::Null);
        }
        self.params[index - 1] = to_sqlite(&value);
        Ok(())
    }

    fn clear_parameters(&mut self) -> Result<()> {
        self.params.clear();
        Ok(())
    }

    fn execute_update(&mut self) -> Result<u64> {
        tracing::debug!("executing statement: {}", self.sql);
        let conn = self.connection()?.lock();
        let mut stmt = conn.prepare_cached(&self.sql).context("failed to prepare statement")?;
        let rows = stmt
            .execute(params_from_iter(self.params.iter()))
            .context("failed to execute statement")?;
        Ok(u64::try_from(rows)?)
    }

    fn execute_query(&mut self) -> Result<Box<dyn Cursor + '_>> {
        tracing::debug!("executing query: {}", self.sql);
        let conn = self.connection()?.lock();
        let mut stmt = conn.prepare_cached(&self.sql).context("failed to prepare statement")?;
        let columns = stmt.column_count();

        let mut rows = stmt
            .query(params_from_iter(self.params.iter()))
            .context("failed to execute query")?;
        let mut fetched = VecDeque::new();
        while let Some(row) = rows.next().context("failed to fetch row")? {
            let values = (0..columns)
                .map(|i| row.get::<_, Value>(i).context("failed to get column value"))
                .collect::<Result<Vec<_>>>()?;
            fetched.push_back(values);
        }

        Ok(Box::new(SqliteCursor { rows: fetched }))
    }

    fn close(&mut self) -> Result<()> {
        tracing::debug!("closing statement: {}", self.sql);
        self.params = Vec::new();
        self.conn = None;
        Ok(())
    }
}

/// Rows fetched eagerly so the connection is released before mapping.
struct SqliteCursor {
    rows: VecDeque<Vec<Value>>,
}

impl Cursor for SqliteCursor {
    fn next_row(&mut self) -> Result<Option<Box<dyn Row>>> {
        Ok(self.rows.pop_front().map(|values| Box::new(SqliteRow(values)) as Box<dyn Row>))
    }

    fn close(&mut self) -> Result<()> {
        self.rows = VecDeque::new();
        Ok(())
    }
}

struct SqliteRow(Vec<Value>);

impl Row for SqliteRow {
    fn len(&self) -> usize {
        self.0.len()
    }

    fn get(&self, index: usize, sql_type: SqlType) -> Result<DataType> {
        let value = index
            .checked_sub(1)
            .and_then(|i| self.0.get(i))
            .ok_or_else(|| anyhow!("no column {index} in a row of {}", self.0.len()))?;
        from_sqlite(value, sql_type).with_context(|| format!("failed to read column {index}"))
    }
}
