//! The prepared-query lifecycle.
//!
//! A query definition ([`crate::SelectQuery`], [`crate::InsertQuery`], ...) is
//! rendered exactly once by [`SqlQuery::prepare`], which consumes it: clauses
//! cannot change after preparation. The resulting [`Prepared`] moves through
//! `Prepared → Bound → Executed → Closed`, binding parameters at consecutive
//! 1-based indexes. Every operation is serialised by a per-instance lock, and
//! the statement is released on every path: `close`, the `*_and_close` reads,
//! [`SqlQuery::scoped`], or drop.
//!
//! Reads map rows without holding the lock, so a factory may inspect the query
//! it maps for. While rows are mapped the statement is checked out: binding or
//! clearing parameters fails with [`Error::InvalidState`], and a `close` takes
//! effect once the read returns.

use std::fmt;

use parking_lot::Mutex;

use crate::driver::{Connection, Statement};
use crate::error::{Error, Result};
use crate::field::{ColumnRef, Field, FieldType};
use crate::mapping::{self, Accumulate, Multiple, ObjectFactory, Single};
use crate::value::DataType;

/// Lifecycle state of a [`Prepared`] query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryState {
    /// Rendered and prepared; no parameter bound.
    Prepared,
    /// At least one parameter bound.
    Bound,
    /// Executed at least once.
    Executed,
    /// Statement released.
    Closed,
}

impl fmt::Display for QueryState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match self {
            Self::Prepared => "prepared",
            Self::Bound => "bound",
            Self::Executed => "executed",
            Self::Closed => "closed",
        };
        f.write_str(state)
    }
}

/// A renderable statement.
pub trait SqlQuery: Send + Sync + Sized {
    /// The SQL text with `?` placeholders.
    fn render(&self) -> String;

    /// The fields the placeholders bind to, in placeholder order.
    fn parameters(&self) -> Vec<ColumnRef>;

    /// Render the query and prepare it on `connection`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DataAccess`] if the connection cannot prepare the statement.
    fn prepare(self, connection: &dyn Connection) -> Result<Prepared<Self>> {
        Prepared::new(self, connection)
    }

    /// Prepare the query, run `f`, and close the statement whatever `f` returns.
    ///
    /// # Errors
    ///
    /// Returns the error of `f` if any, otherwise a preparation or close error.
    fn scoped<R>(
        self, connection: &dyn Connection, f: impl FnOnce(&Prepared<Self>) -> Result<R>,
    ) -> Result<R> {
        let prepared = self.prepare(connection)?;
        let result = f(&prepared);
        prepared.finish(result)
    }
}

/// Statements run with [`Prepared::execute`]: insert, update and delete.
pub trait Executable: SqlQuery {}

/// Statements that return rows: select, union and recursive queries.
pub trait Readable: SqlQuery {
    /// The mapped row type.
    type Output;

    /// The factory mapping each row.
    fn factory(&self) -> &dyn ObjectFactory<Self::Output>;

    /// The selected fields in column order.
    fn select_fields(&self) -> Vec<ColumnRef>;
}

/// A parameter bound to a prepared query.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundParameter {
    /// 1-based placeholder index.
    pub index: usize,
    /// The field the value was bound through.
    pub field: ColumnRef,
    /// The bound value.
    pub value: DataType,
}

struct Inner {
    statement: Option<Box<dyn Statement>>,
    bound: Vec<BoundParameter>,
    state: QueryState,
}

impl Inner {
    fn statement(&mut self, action: &'static str) -> Result<&mut dyn Statement> {
        let state = self.state;
        match self.statement.as_mut() {
            Some(statement) => Ok(statement.as_mut()),
            None => Err(Error::InvalidState { state, action }),
        }
    }

    fn bind(&mut self, expected: usize, field: ColumnRef, value: DataType) -> Result<()> {
        let index = self.bound.len() + 1;
        let statement = self.statement("bind")?;
        if index > expected {
            return Err(Error::ParameterCount {
                expected,
                bound: index,
            });
        }
        field.bind(statement, index, value.clone())?;
        self.bound.push(BoundParameter { index, field, value });
        self.state = QueryState::Bound;
        Ok(())
    }

    fn ready(&mut self, expected: usize, action: &'static str) -> Result<&mut dyn Statement> {
        let bound = self.bound.len();
        let statement = self.statement(action)?;
        if bound != expected {
            return Err(Error::ParameterCount { expected, bound });
        }
        Ok(statement)
    }

    /// Takes the statement out so it can run without the lock held.
    fn checkout(&mut self, expected: usize, action: &'static str) -> Result<Box<dyn Statement>> {
        self.ready(expected, action)?;
        let state = self.state;
        self.statement.take().ok_or(Error::InvalidState { state, action })
    }

    fn close(&mut self) -> Result<()> {
        self.state = QueryState::Closed;
        match self.statement.take() {
            Some(mut statement) => Ok(statement.close()?),
            None => Ok(()),
        }
    }
}

/// A rendered, prepared query.
pub struct Prepared<Q: SqlQuery> {
    query: Q,
    sql: String,
    expected: usize,
    inner: Mutex<Inner>,
}

impl<Q: SqlQuery> Prepared<Q> {
    fn new(query: Q, connection: &dyn Connection) -> Result<Self> {
        let sql = query.render();
        let expected = query.parameters().len();

        tracing::debug!(sql = %sql, param_count = expected, "prepared query");

        let statement = connection.prepare(&sql)?;
        Ok(Self {
            query,
            sql,
            expected,
            inner: Mutex::new(Inner {
                statement: Some(statement),
                bound: Vec::new(),
                state: QueryState::Prepared,
            }),
        })
    }

    /// The rendered SQL.
    #[must_use]
    pub fn sql(&self) -> &str {
        &self.sql
    }

    /// The query definition.
    #[must_use]
    pub const fn query(&self) -> &Q {
        &self.query
    }

    /// The current lifecycle state.
    #[must_use]
    pub fn state(&self) -> QueryState {
        self.inner.lock().state
    }

    /// The number of placeholders in the rendered SQL.
    #[must_use]
    pub const fn expected_parameters(&self) -> usize {
        self.expected
    }

    /// The index of the last bound parameter, 0 when none is bound.
    #[must_use]
    pub fn parameter_index(&self) -> usize {
        self.inner.lock().bound.len()
    }

    /// The parameters bound so far, in index order.
    #[must_use]
    pub fn bound_parameters(&self) -> Vec<BoundParameter> {
        self.inner.lock().bound.clone()
    }

    /// Bind `value` at the next index through the empty field of its type.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ParameterCount`] when every placeholder is already
    /// bound, [`Error::InvalidState`] once closed, or [`Error::DataAccess`] if
    /// the statement rejects the value.
    pub fn add_parameter(&self, value: impl Into<DataType>) -> Result<()> {
        let value = value.into();
        let field = ColumnRef::empty(value.sql_type());
        self.inner.lock().bind(self.expected, field, value)
    }

    /// Bind a typed `NULL` at the next index through `field`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NullConstraint`] if `field` is not nullable, plus the
    /// errors of [`Prepared::add_parameter`].
    pub fn add_null_parameter(&self, field: impl Into<ColumnRef>) -> Result<()> {
        let field = field.into();
        let value = DataType::null(field.sql_type());
        self.inner.lock().bind(self.expected, field, value)
    }

    /// Bind `value` at the next index through `field`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NullConstraint`] if `value` is `None` and `field` is not
    /// nullable, plus the errors of [`Prepared::add_parameter`].
    pub fn bind<T: FieldType>(&self, field: &Field<T>, value: Option<T::Value>) -> Result<()> {
        self.inner.lock().bind(self.expected, field.column().clone(), T::wrap(value))
    }

    /// Bind a tagged `value` at the next index through `field`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NullConstraint`] if `value` is `NULL` and `field` is not
    /// nullable, plus the errors of [`Prepared::add_parameter`].
    pub fn bind_value(&self, field: impl Into<ColumnRef>, value: DataType) -> Result<()> {
        self.inner.lock().bind(self.expected, field.into(), value)
    }

    /// Clear every bound parameter and reset the index to 0.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidState`] once closed, or [`Error::DataAccess`] if
    /// the statement cannot be cleared.
    pub fn clear_parameters(&self) -> Result<()> {
        let mut inner = self.inner.lock();
        inner.statement("clear parameters of")?.clear_parameters()?;
        inner.bound.clear();
        inner.state = QueryState::Prepared;
        Ok(())
    }

    /// Release the statement. Closing twice is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DataAccess`] if the statement fails to close.
    pub fn close(&self) -> Result<()> {
        self.inner.lock().close()
    }

    /// Close, preferring an earlier error over a close failure.
    fn finish<R>(&self, result: Result<R>) -> Result<R> {
        let closed = self.close();
        match (result, closed) {
            (Ok(value), Ok(())) => Ok(value),
            (Ok(_), Err(e)) | (Err(e), Ok(())) => Err(e),
            (Err(e), Err(close)) => {
                tracing::warn!(
                    error = %close, sql = %self.sql,
                    "failed to close statement after error"
                );
                Err(e)
            }
        }
    }
}

impl<Q: Executable> Prepared<Q> {
    /// Execute the statement and return the affected row count.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ParameterCount`] unless every placeholder is bound,
    /// [`Error::InvalidState`] once closed, or [`Error::DataAccess`] if
    /// execution fails.
    pub fn execute(&self) -> Result<u64> {
        let mut inner = self.inner.lock();
        let rows = inner.ready(self.expected, "execute")?.execute_update()?;
        inner.state = QueryState::Executed;

        tracing::debug!(sql = %self.sql, rows, "executed statement");
        Ok(rows)
    }

    /// Execute, then close.
    ///
    /// # Errors
    ///
    /// Returns the execution error if any, otherwise a close error.
    pub fn execute_and_close(self) -> Result<u64> {
        let result = self.execute();
        self.finish(result)
    }
}

impl<Q: Readable> Prepared<Q> {
    /// The selected fields in column order.
    #[must_use]
    pub fn select_fields(&self) -> Vec<ColumnRef> {
        self.query.select_fields()
    }

    /// Execute and map the first row, if any. Further rows are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ParameterCount`] unless every placeholder is bound,
    /// [`Error::InvalidState`] once closed, or [`Error::DataAccess`] if
    /// execution or mapping fails.
    pub fn single_result(&self) -> Result<Option<Q::Output>> {
        self.fetch::<Single<_>>()
    }

    /// Execute and map every row, in cursor order.
    ///
    /// # Errors
    ///
    /// As for [`Prepared::single_result`].
    pub fn result_list(&self) -> Result<Vec<Q::Output>> {
        self.fetch::<Multiple<_>>()
    }

    /// [`Prepared::single_result`], then close.
    ///
    /// # Errors
    ///
    /// Returns the read error if any, otherwise a close error.
    pub fn single_result_and_close(self) -> Result<Option<Q::Output>> {
        let result = self.single_result();
        self.finish(result)
    }

    /// [`Prepared::result_list`], then close.
    ///
    /// # Errors
    ///
    /// Returns the read error if any, otherwise a close error.
    pub fn result_list_and_close(self) -> Result<Vec<Q::Output>> {
        let result = self.result_list();
        self.finish(result)
    }

    fn fetch<A: Accumulate<Q::Output>>(&self) -> Result<A::Output> {
        let mut statement = self.inner.lock().checkout(self.expected, "read")?;
        let (executed, records) = match statement.execute_query() {
            Ok(mut cursor) => {
                (true, mapping::map_rows::<_, A>(cursor.as_mut(), self.query.factory()))
            }
            Err(e) => (false, Err(e.into())),
        };

        let mut inner = self.inner.lock();
        if inner.state == QueryState::Closed {
            if let Err(e) = statement.close() {
                tracing::warn!(error = %e, sql = %self.sql, "failed to close statement after read");
            }
        } else {
            inner.statement = Some(statement);
            if executed {
                inner.state = QueryState::Executed;
            }
        }
        records
    }
}

impl<Q: SqlQuery> Drop for Prepared<Q> {
    fn drop(&mut self) {
        let statement = self.inner.get_mut().statement.take();
        if let Some(mut statement) = statement
            && let Err(e) = statement.close()
        {
            tracing::warn!(error = %e, sql = %self.sql, "failed to close statement on drop");
        }
    }
}

impl<Q: SqlQuery> fmt::Debug for Prepared<Q> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("Prepared")
            .field("sql", &self.sql)
            .field("state", &inner.state)
            .field("bound", &inner.bound)
            .finish_non_exhaustive()
    }
}
