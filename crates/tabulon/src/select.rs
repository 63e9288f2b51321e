use std::fmt;
use std::sync::Arc;

use crate::builder::WhereBuilder;
use crate::dialect::{CustomOperators, Dialect};
use crate::expr::Expr;
use crate::field::ColumnRef;
use crate::filter::{Filter, Filterable};
use crate::join::Join;
use crate::mapping::ObjectFactory;
use crate::query::{Readable, SqlQuery};
use crate::table::{Table, TableName};

/// Builder for SELECT queries.
///
/// Selected fields are aliased `f1`, `f2`, ... and read back positionally by
/// the factory.
pub struct SelectQuery<T> {
    fields: Vec<ColumnRef>,
    tables: Vec<TableName>,
    joins: Vec<Join>,
    filter: Option<Filter>,
    group_by: Vec<ColumnRef>,
    having: Vec<Expr>,
    order_by: Vec<ColumnRef>,
    distinct: bool,
    limit: Option<u64>,
    offset: Option<u64>,
    dialect: Dialect,
    factory: Arc<dyn ObjectFactory<T>>,
}

impl<T> SelectQuery<T> {
    /// Selects every field of `table`.
    #[must_use]
    pub fn new(table: &Table, factory: Arc<dyn ObjectFactory<T>>) -> Self {
        Self::from_fields(table.fields().cloned(), table.table_name(), factory)
    }

    /// Selects `fields` from `table`.
    pub fn from_fields<I>(
        fields: I, table: &TableName, factory: Arc<dyn ObjectFactory<T>>,
    ) -> Self
    where
        I: IntoIterator,
        I::Item: Into<ColumnRef>,
    {
        Self {
            fields: fields.into_iter().map(Into::into).collect(),
            tables: vec![table.clone()],
            joins: Vec::new(),
            filter: None,
            group_by: Vec::new(),
            having: Vec::new(),
            order_by: Vec::new(),
            distinct: false,
            limit: None,
            offset: None,
            dialect: Dialect::default(),
            factory,
        }
    }

    /// Adds `table` to the FROM list (a cross join).
    #[must_use]
    pub fn cross(mut self, table: &TableName) -> Self {
        self.tables.push(table.clone());
        self
    }

    /// Adds SELECT DISTINCT.
    #[must_use]
    pub const fn distinct(mut self) -> Self {
        self.distinct = true;
        self
    }

    /// Adds a JOIN clause to the query.
    #[must_use]
    pub fn join(mut self, join: Join) -> Self {
        self.joins.push(join);
        self
    }

    /// Appends GROUP BY fields.
    #[must_use]
    pub fn group_by<I>(mut self, fields: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<ColumnRef>,
    {
        self.group_by.extend(fields.into_iter().map(Into::into));
        self
    }

    /// Sets the HAVING clause to `expr`.
    #[must_use]
    pub fn having(mut self, expr: Expr) -> Self {
        self.having = vec![expr];
        self
    }

    /// Sets the HAVING clause to `exprs` concatenated in order.
    #[must_use]
    pub fn having_all(mut self, exprs: impl IntoIterator<Item = Expr>) -> Self {
        self.having = exprs.into_iter().collect();
        self
    }

    /// Appends an ORDER BY field; use [`crate::Field::desc`] for descending order.
    #[must_use]
    pub fn order_by(mut self, field: impl Into<ColumnRef>) -> Self {
        self.order_by.push(field.into());
        self
    }

    /// Sets the maximum number of rows to return.
    #[must_use]
    pub const fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Sets the number of rows to skip.
    #[must_use]
    pub const fn offset(mut self, offset: u64) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Sets the dialect used for custom operators.
    #[must_use]
    pub fn with_dialect(mut self, dialect: Dialect) -> Self {
        self.dialect = dialect;
        self
    }

    /// The configured dialect.
    #[must_use]
    pub const fn dialect(&self) -> &Dialect {
        &self.dialect
    }

    /// The dialect's custom operators, if any.
    #[must_use]
    pub fn custom_operators(&self) -> Option<Arc<dyn CustomOperators>> {
        self.dialect.custom_operators()
    }

    /// A WHERE builder offering this query's custom operators.
    #[must_use]
    pub fn where_builder(&self) -> WhereBuilder {
        WhereBuilder::with_dialect(&self.dialect)
    }
}

impl<T> SqlQuery for SelectQuery<T> {
    fn render(&self) -> String {
        let mut sql = String::from("SELECT ");
        if self.distinct {
            sql.push_str("DISTINCT ");
        }
        sql.push_str(
            &self
                .fields
                .iter()
                .enumerate()
                .map(|(i, field)| format!("{} as f{}", field.complete_name(), i + 1))
                .collect::<Vec<_>>()
                .join(", "),
        );

        sql.push_str("\nFROM ");
        sql.push_str(
            &self.tables.iter().map(TableName::complete_name).collect::<Vec<_>>().join(", "),
        );
        for join in &self.joins {
            sql.push_str(&join.render());
        }

        Filter::write(self.filter.as_ref(), "\nWHERE ", &mut sql);

        if !self.group_by.is_empty() {
            sql.push_str("\nGROUP BY ");
            sql.push_str(&complete_names(&self.group_by));
        }
        if !self.having.is_empty() {
            sql.push_str("\nHAVING ");
            sql.extend(self.having.iter().map(Expr::render));
        }
        if !self.order_by.is_empty() {
            sql.push_str("\nORDER BY ");
            sql.push_str(&complete_names(&self.order_by));
        }
        if let Some(limit) = self.limit {
            sql.push_str(&format!("\nLIMIT {limit}"));
        }
        if let Some(offset) = self.offset {
            sql.push_str(&format!("\nOFFSET {offset}"));
        }
        sql
    }

    fn parameters(&self) -> Vec<ColumnRef> {
        let mut parameters = self.where_parameters();
        parameters.extend(self.having.iter().flat_map(Expr::parameters));
        parameters
    }
}

impl<T> Filterable for SelectQuery<T> {
    fn filter_mut(&mut self) -> &mut Filter {
        self.filter.get_or_insert_with(Filter::default)
    }

    fn filter(&self) -> Option<&Filter> {
        self.filter.as_ref()
    }
}

impl<T> Readable for SelectQuery<T> {
    type Output = T;

    fn factory(&self) -> &dyn ObjectFactory<T> {
        self.factory.as_ref()
    }

    fn select_fields(&self) -> Vec<ColumnRef> {
        self.fields.clone()
    }
}

impl<T> fmt::Debug for SelectQuery<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SelectQuery").field("sql", &self.render()).finish_non_exhaustive()
    }
}

pub(crate) fn complete_names(fields: &[ColumnRef]) -> String {
    fields.iter().map(ColumnRef::complete_name).collect::<Vec<_>>().join(", ")
}
