use std::fmt;

use crate::field::ColumnRef;
use crate::mapping::ObjectFactory;
use crate::query::{Readable, SqlQuery};
use crate::select::SelectQuery;

/// The UNION of two selects mapped by the first select's factory.
///
/// Both selects must produce compatible columns; this is not checked.
pub struct UnionQuery<T> {
    first: SelectQuery<T>,
    second: SelectQuery<T>,
    all: bool,
}

impl<T> UnionQuery<T> {
    /// `(first) UNION (second)`.
    #[must_use]
    pub const fn new(first: SelectQuery<T>, second: SelectQuery<T>) -> Self {
        Self {
            first,
            second,
            all: false,
        }
    }

    /// Keep duplicate rows (UNION ALL).
    #[must_use]
    pub const fn all(mut self) -> Self {
        self.all = true;
        self
    }
}

impl<T> SqlQuery for UnionQuery<T> {
    fn render(&self) -> String {
        let keyword = if self.all { "UNION ALL" } else { "UNION" };
        format!("({})\n{keyword} ({})", self.first.render(), self.second.render())
    }

    fn parameters(&self) -> Vec<ColumnRef> {
        let mut parameters = self.first.parameters();
        parameters.extend(self.second.parameters());
        parameters
    }
}

impl<T> Readable for UnionQuery<T> {
    type Output = T;

    fn factory(&self) -> &dyn ObjectFactory<T> {
        self.first.factory()
    }

    fn select_fields(&self) -> Vec<ColumnRef> {
        self.first.select_fields()
    }
}

impl<T> fmt::Debug for UnionQuery<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UnionQuery").field("sql", &self.render()).finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::expr::Expr;
    use crate::field::ty;
    use crate::filter::Filterable;
    use crate::mapping::ScalarFactory;
    use crate::table::Table;

    #[test]
    fn union_concatenates_parameters() {
        let mut builder = Table::builder("", "person");
        let id = builder.not_null::<ty::Int>("id");
        let name = builder.nullable::<ty::Varchar>("name");
        let table = builder.build().expect("person");

        let factory: Arc<dyn ObjectFactory<Option<i32>>> =
            Arc::new(ScalarFactory::<ty::Int>::new());
        let first = SelectQuery::from_fields([&id], table.table_name(), Arc::clone(&factory))
            .where_field(&name);
        let second = SelectQuery::from_fields([&id], table.table_name(), factory)
            .r#where(Expr::gt(&id));

        let query = UnionQuery::new(first, second);
        assert_eq!(
            query.render(),
            "(SELECT person.id as f1\nFROM person\nWHERE person.name = ?)\nUNION (SELECT person.id as f1\nFROM person\nWHERE person.id > ?)"
        );
        assert_eq!(query.parameters(), [name.column().clone(), id.column().clone()]);

        let query = query.all();
        assert!(query.render().contains("\nUNION ALL (SELECT"));
    }
}
