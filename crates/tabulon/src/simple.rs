use std::sync::Arc;

use crate::driver::Connection;
use crate::error::Result;
use crate::field::{ColumnRef, Field, FieldType};
use crate::filter::Filterable;
use crate::mapping::{ObjectFactory, ScalarFactory};
use crate::query::SqlQuery;
use crate::select::SelectQuery;
use crate::table::{Table, TableName};
use crate::value::DataType;

/// Reads one field of the row identified by a single-field primary key.
///
/// ```ignore
/// let names = SimpleSelect::new(&PERSON, &PERSON_NAME)?;
/// let name: Option<String> = names.read(&conn, 5)?;
/// ```
#[derive(Debug, Clone)]
pub struct SimpleSelect<T: FieldType> {
    table: TableName,
    key: ColumnRef,
    field: Field<T>,
}

impl<T: FieldType> SimpleSelect<T> {
    /// Looks `field` up by the primary key of `table`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Unsupported`] if the table has no primary key or
    /// the key is composite.
    pub fn new(table: &Table, field: &Field<T>) -> Result<Self> {
        let key = table.require_primary_key()?.single_field()?.clone();
        Ok(Self {
            table: table.table_name().clone(),
            key,
            field: field.clone(),
        })
    }

    /// The value of the field for `key`, `None` when no row matches or the
    /// value is `NULL`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::DataAccess`] if the query fails, or
    /// [`crate::Error::NullConstraint`] if `key` is `NULL`.
    pub fn read(
        &self, connection: &dyn Connection, key: impl Into<DataType>,
    ) -> Result<Option<T::Value>> {
        let factory: Arc<dyn ObjectFactory<Option<T::Value>>> =
            Arc::new(ScalarFactory::<T>::new());
        let query = SelectQuery::from_fields([self.field.column()], &self.table, factory)
            .where_field(&self.key);

        let key = key.into();
        let value = query.scoped(connection, |prepared| {
            prepared.bind_value(&self.key, key)?;
            prepared.single_result()
        })?;
        Ok(value.flatten())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use crate::field::ty;

    #[test]
    fn composite_key_is_unsupported() {
        let mut builder = Table::builder("", "membership");
        let person = builder.not_null::<ty::Int>("person_id");
        let team = builder.not_null::<ty::Int>("team_id");
        let role = builder.nullable::<ty::Varchar>("role");
        builder.composite_key([&person, &team]);
        let table = builder.build().expect("membership");

        let err = SimpleSelect::new(&table, &role).unwrap_err();
        assert!(matches!(err, Error::Unsupported(_)));
    }

    #[test]
    fn missing_key_is_unsupported() {
        let mut builder = Table::builder("", "log");
        let line = builder.nullable::<ty::Varchar>("line");
        let table = builder.build().expect("log");

        let err = SimpleSelect::new(&table, &line).unwrap_err();
        assert!(matches!(err, Error::Unsupported(_)));
    }
}
