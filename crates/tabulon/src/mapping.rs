//! Mapping result rows to values.
//!
//! Single and multi-record reads share one loop over the cursor and differ
//! only in how they accumulate mapped rows. The cursor is closed on every
//! path; a close failure never hides a mapping failure.

use std::fmt;

use crate::driver::{Cursor, Row};
use crate::error::Result;
use crate::field::{Field, FieldType};

/// Builds one value from one result row.
///
/// Columns are read positionally (1-based) in select-field order. Implemented
/// for closures taking `&dyn Row`.
pub trait ObjectFactory<T>: Send + Sync {
    /// Map `row` to a value.
    ///
    /// # Errors
    ///
    /// Returns an error if a column cannot be read.
    fn create(&self, row: &dyn Row) -> Result<T>;
}

impl<T, F> ObjectFactory<T> for F
where
    F: Fn(&dyn Row) -> Result<T> + Send + Sync,
{
    fn create(&self, row: &dyn Row) -> Result<T> {
        self(row)
    }
}

/// Reads a single typed column, by default the first.
pub struct ScalarFactory<T: FieldType> {
    field: Field<T>,
    index: usize,
}

impl<T: FieldType> ScalarFactory<T> {
    /// Reads column 1.
    #[must_use]
    pub fn new() -> Self {
        Self::at(1)
    }

    /// Reads the 1-based column `index`.
    #[must_use]
    pub fn at(index: usize) -> Self {
        Self {
            field: Field::empty(),
            index,
        }
    }
}

impl<T: FieldType> Default for ScalarFactory<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: FieldType> fmt::Debug for ScalarFactory<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScalarFactory")
            .field("type", &T::SQL_TYPE)
            .field("index", &self.index)
            .finish()
    }
}

impl<T: FieldType> ObjectFactory<Option<T::Value>> for ScalarFactory<T> {
    fn create(&self, row: &dyn Row) -> Result<Option<T::Value>> {
        self.field.read(row, self.index)
    }
}

/// Accumulation policy for mapped rows.
pub(crate) trait Accumulate<T>: Default {
    type Output;

    /// Takes a mapped row; returns `false` once no further rows are wanted.
    fn accept(&mut self, record: T) -> bool;

    fn finish(self) -> Self::Output;
}

/// Keeps the first row.
pub(crate) struct Single<T>(Option<T>);

impl<T> Default for Single<T> {
    fn default() -> Self {
        Self(None)
    }
}

impl<T> Accumulate<T> for Single<T> {
    type Output = Option<T>;

    fn accept(&mut self, record: T) -> bool {
        self.0 = Some(record);
        false
    }

    fn finish(self) -> Self::Output {
        self.0
    }
}

/// Keeps every row in cursor order.
pub(crate) struct Multiple<T>(Vec<T>);

impl<T> Default for Multiple<T> {
    fn default() -> Self {
        Self(Vec::new())
    }
}

impl<T> Accumulate<T> for Multiple<T> {
    type Output = Vec<T>;

    fn accept(&mut self, record: T) -> bool {
        self.0.push(record);
        true
    }

    fn finish(self) -> Self::Output {
        self.0
    }
}

/// Maps the cursor's rows with `factory`, then closes the cursor.
pub(crate) fn map_rows<T, A: Accumulate<T>>(
    cursor: &mut (dyn Cursor + '_), factory: &dyn ObjectFactory<T>,
) -> Result<A::Output> {
    let mut records = A::default();
    let mapped = drain(cursor, factory, &mut records);
    let closed = cursor.close();

    match (mapped, closed) {
        (Ok(()), Ok(())) => Ok(records.finish()),
        (Ok(()), Err(e)) => Err(e.into()),
        (Err(e), Ok(())) => Err(e),
        (Err(e), Err(close)) => {
            tracing::warn!(error = %close, "failed to close cursor after mapping error");
            Err(e)
        }
    }
}

fn drain<T, A: Accumulate<T>>(
    cursor: &mut (dyn Cursor + '_), factory: &dyn ObjectFactory<T>, records: &mut A,
) -> Result<()> {
    while let Some(row) = cursor.next_row()? {
        if !records.accept(factory.create(row.as_ref())?) {
            match cursor.next_row() {
                Ok(Some(_)) => {
                    tracing::warn!(
                        "single-result query matched more than one row, extra rows ignored"
                    );
                }
                Ok(None) => {}
                Err(e) => {
                    tracing::warn!(error = %e, "failed to look past a single result, ignored");
                }
            }
            break;
        }
    }
    Ok(())
}
