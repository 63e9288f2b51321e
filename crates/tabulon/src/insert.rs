use crate::field::ColumnRef;
use crate::query::{Executable, SqlQuery};
use crate::table::{Table, TableName};

/// Builder for INSERT queries.
///
/// Every listed field gets one placeholder, bound in field order.
#[derive(Debug, Clone)]
pub struct InsertQuery {
    table: TableName,
    fields: Vec<ColumnRef>,
}

impl InsertQuery {
    /// Inserts every field of `table`.
    #[must_use]
    pub fn new(table: &Table) -> Self {
        Self::with_fields(table.table_name(), table.fields().cloned())
    }

    /// Inserts `fields` into `table`.
    pub fn with_fields<I>(table: &TableName, fields: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<ColumnRef>,
    {
        Self {
            table: table.clone(),
            fields: fields.into_iter().map(Into::into).collect(),
        }
    }

    /// The target table.
    #[must_use]
    pub const fn table(&self) -> &TableName {
        &self.table
    }
}

impl SqlQuery for InsertQuery {
    fn render(&self) -> String {
        let names = self.fields.iter().map(ColumnRef::name).collect::<Vec<_>>().join(", ");
        let placeholders = vec!["?"; self.fields.len()].join(", ");
        format!("INSERT INTO {} ({names}) VALUES ({placeholders})", self.table.complete_name())
    }

    fn parameters(&self) -> Vec<ColumnRef> {
        self.fields.clone()
    }
}

impl Executable for InsertQuery {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::ty;

    #[test]
    fn insert_every_field() {
        let mut builder = Table::builder("hr", "person");
        builder.not_null::<ty::Int>("id");
        builder.nullable::<ty::Varchar>("name");
        builder.nullable::<ty::Int>("manager_id");
        let table = builder.build().expect("person");

        let query = table.insert_query();
        assert_eq!(
            query.render(),
            "INSERT INTO hr.person (id, name, manager_id) VALUES (?, ?, ?)"
        );
        let names: Vec<_> = query.parameters().iter().map(ColumnRef::name).collect();
        assert_eq!(names, ["id", "name", "manager_id"]);
    }
}
