use crate::field::ColumnRef;
use crate::filter::{Filter, Filterable};
use crate::query::{Executable, SqlQuery};
use crate::table::{Table, TableName};

/// Builder for DELETE queries.
#[derive(Debug, Clone)]
pub struct DeleteQuery {
    table: TableName,
    filter: Option<Filter>,
}

impl DeleteQuery {
    /// Deletes from `table`; without a WHERE clause every row is deleted.
    #[must_use]
    pub fn new(table: &Table) -> Self {
        Self::from_name(table.table_name())
    }

    /// Deletes from the table named `table`.
    #[must_use]
    pub fn from_name(table: &TableName) -> Self {
        Self {
            table: table.clone(),
            filter: None,
        }
    }

    /// The target table.
    #[must_use]
    pub const fn table(&self) -> &TableName {
        &self.table
    }
}

impl SqlQuery for DeleteQuery {
    fn render(&self) -> String {
        let mut sql = format!("DELETE FROM {}", self.table.complete_name());
        Filter::write(self.filter.as_ref(), " WHERE ", &mut sql);
        sql
    }

    fn parameters(&self) -> Vec<ColumnRef> {
        self.where_parameters()
    }
}

impl Filterable for DeleteQuery {
    fn filter_mut(&mut self) -> &mut Filter {
        self.filter.get_or_insert_with(Filter::default)
    }

    fn filter(&self) -> Option<&Filter> {
        self.filter.as_ref()
    }
}

impl Executable for DeleteQuery {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::Expr;
    use crate::field::ty;

    #[test]
    fn delete_with_and_without_filter() {
        let mut builder = Table::builder("hr", "person");
        let id = builder.not_null::<ty::Int>("id");
        let table = builder.build().expect("person");

        assert_eq!(table.delete_query().render(), "DELETE FROM hr.person");
        assert!(table.delete_query().parameters().is_empty());

        let query = table.delete_query().where_field(&id);
        assert_eq!(query.render(), "DELETE FROM hr.person WHERE hr.person.id = ?");

        let query = table.delete_query().r#where(Expr::in_list(&id, "1,2,3"));
        assert_eq!(query.render(), "DELETE FROM hr.person WHERE hr.person.id in (1,2,3)");
        assert!(query.parameters().is_empty());
    }
}
