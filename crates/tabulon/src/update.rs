use crate::expr::Expr;
use crate::field::ColumnRef;
use crate::filter::{Filter, Filterable};
use crate::query::{Executable, SqlQuery};
use crate::table::{Table, TableName};

/// Builder for UPDATE queries.
///
/// Parameters bind SET values first, then the WHERE clause.
#[derive(Debug, Clone)]
pub struct UpdateQuery {
    table: TableName,
    assignments: Vec<Expr>,
    filter: Option<Filter>,
}

impl UpdateQuery {
    /// Assigns every field of `table`.
    #[must_use]
    pub fn new(table: &Table) -> Self {
        Self::with_fields(table.table_name(), table.fields().cloned())
    }

    /// Assigns `fields` as `name = ?`.
    pub fn with_fields<I>(table: &TableName, fields: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<ColumnRef>,
    {
        Self::with_assignments(table, fields.into_iter().map(Expr::assign))
    }

    /// Uses custom SET expressions, e.g. [`Expr::increment`].
    pub fn with_assignments(
        table: &TableName, assignments: impl IntoIterator<Item = Expr>,
    ) -> Self {
        Self {
            table: table.clone(),
            assignments: assignments.into_iter().collect(),
            filter: None,
        }
    }

    /// The target table.
    #[must_use]
    pub const fn table(&self) -> &TableName {
        &self.table
    }
}

impl SqlQuery for UpdateQuery {
    fn render(&self) -> String {
        let assignments = self.assignments.iter().map(Expr::render).collect::<Vec<_>>().join(", ");
        let mut sql = format!("UPDATE {} SET {assignments}", self.table.complete_name());
        Filter::write(self.filter.as_ref(), " WHERE ", &mut sql);
        sql
    }

    fn parameters(&self) -> Vec<ColumnRef> {
        let mut parameters: Vec<_> = self.assignments.iter().flat_map(Expr::parameters).collect();
        parameters.extend(self.where_parameters());
        parameters
    }
}

impl Filterable for UpdateQuery {
    fn filter_mut(&mut self) -> &mut Filter {
        self.filter.get_or_insert_with(Filter::default)
    }

    fn filter(&self) -> Option<&Filter> {
        self.filter.as_ref()
    }
}

impl Executable for UpdateQuery {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::ty;

    #[test]
    fn update_by_composite_key() {
        let mut builder = Table::builder("", "membership");
        let person = builder.not_null::<ty::Int>("person_id");
        let team = builder.not_null::<ty::Int>("team_id");
        builder.nullable::<ty::Varchar>("role");
        builder.composite_key([&person, &team]);
        let table = builder.build().expect("membership");

        let query = table.update_query().r#where(Expr::and(Expr::eq(&person), Expr::eq(&team)));
        assert_eq!(
            query.render(),
            "UPDATE membership SET person_id = ?, team_id = ?, role = ? WHERE (membership.person_id = ?) AND (membership.team_id = ?)"
        );

        let names: Vec<_> = query.parameters().iter().map(ColumnRef::complete_name).collect();
        assert_eq!(
            names,
            [
                "membership.person_id",
                "membership.team_id",
                "membership.role",
                "membership.person_id",
                "membership.team_id"
            ]
        );
    }

    #[test]
    fn custom_assignments() {
        let mut builder = Table::builder("", "counter");
        let id = builder.not_null::<ty::Int>("id");
        let hits = builder.not_null::<ty::Int>("hits");
        let table = builder.build().expect("counter");

        let query = UpdateQuery::with_assignments(table.table_name(), [Expr::increment(&hits)])
            .where_field(&id);
        assert_eq!(query.render(), "UPDATE counter SET hits = hits + 1 WHERE counter.id = ?");
        assert_eq!(query.parameters(), [id.column().clone()]);
    }
}
