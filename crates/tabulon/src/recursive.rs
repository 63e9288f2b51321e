//! `WITH RECURSIVE` queries walking a self-referencing table.

use std::fmt;
use std::sync::Arc;

use crate::error::{Result, schema_error};
use crate::expr::Expr;
use crate::field::{ColumnRef, Decoration, Field, FieldType};
use crate::mapping::ObjectFactory;
use crate::query::{Readable, SqlQuery};
use crate::table::{Table, TableName};

const DEPTH: &str = "depth";

/// A recursive common table expression over one table.
///
/// The seed select reads the rows matching the start condition at depth 1;
/// the step select joins the table to the expression itself, filtered by the
/// stop condition, one level deeper each time. The outer select reads the
/// named columns back; the implicit `depth` column is never selected.
///
/// Columns of the expression are matched to selected fields by position, so
/// [`Self::recursive_field`] and [`Self::order_by`] follow any renaming done
/// by [`Self::with_columns`].
pub struct RecursiveQuery<T> {
    name: String,
    table: TableName,
    fields: Vec<ColumnRef>,
    columns: Vec<String>,
    start: Vec<Expr>,
    stop: Vec<Expr>,
    order_by: Vec<(usize, Option<Decoration>)>,
    factory: Arc<dyn ObjectFactory<T>>,
}

impl<T> RecursiveQuery<T> {
    /// A recursive query `name` selecting `fields` from `table`. Columns of
    /// the expression take the field names.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Schema`] if `fields` is empty or a field is
    /// named `depth`.
    pub fn new<I>(
        name: impl Into<String>, table: &Table, fields: I, factory: Arc<dyn ObjectFactory<T>>,
    ) -> Result<Self>
    where
        I: IntoIterator,
        I::Item: Into<ColumnRef>,
    {
        let fields: Vec<ColumnRef> = fields.into_iter().map(Into::into).collect();
        let columns: Vec<String> = fields.iter().map(ColumnRef::name).collect();
        Self {
            name: name.into(),
            table: table.table_name().clone(),
            fields,
            columns: Vec::new(),
            start: Vec::new(),
            stop: Vec::new(),
            order_by: Vec::new(),
            factory,
        }
        .with_columns(columns)
    }

    /// Renames the columns of the expression, one per selected field.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Schema`] if the count differs from the field
    /// count, the list is empty, or a column is named `depth`.
    pub fn with_columns<I>(mut self, columns: I) -> Result<Self>
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        let columns: Vec<String> = columns.into_iter().map(Into::into).collect();
        if columns.is_empty() {
            return Err(schema_error!("recursive query {} selects no column", self.name));
        }
        if columns.len() != self.fields.len() {
            return Err(schema_error!(
                "recursive query {} names {} columns for {} fields",
                self.name,
                columns.len(),
                self.fields.len()
            ));
        }
        if columns.iter().any(|column| column.eq_ignore_ascii_case(DEPTH)) {
            return Err(schema_error!("recursive query {} reserves the column {DEPTH}", self.name));
        }
        self.columns = columns;
        Ok(self)
    }

    /// Sets the seed condition.
    #[must_use]
    pub fn start(mut self, expr: Expr) -> Self {
        self.start = vec![expr];
        self
    }

    /// Sets the seed condition to `exprs` concatenated in order.
    #[must_use]
    pub fn start_all(mut self, exprs: impl IntoIterator<Item = Expr>) -> Self {
        self.start = exprs.into_iter().collect();
        self
    }

    /// Sets the step condition, usually relating a table field to a column of
    /// the expression (see [`Self::recursive_field`]).
    #[must_use]
    pub fn stop(mut self, expr: Expr) -> Self {
        self.stop = vec![expr];
        self
    }

    /// Sets the step condition to `exprs` concatenated in order.
    #[must_use]
    pub fn stop_all(mut self, exprs: impl IntoIterator<Item = Expr>) -> Self {
        self.stop = exprs.into_iter().collect();
        self
    }

    /// Appends an outer ORDER BY on the expression column selecting `field`.
    /// A DESC decoration is kept.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Schema`] if `field` is not selected.
    pub fn order_by(mut self, field: impl Into<ColumnRef>) -> Result<Self> {
        let field = field.into();
        let index = self.position(&field)?;
        self.order_by.push((index, field.decoration()));
        Ok(self)
    }

    /// The expression column selecting `field`, qualified by the expression
    /// name, for use in the step condition. Call after [`Self::with_columns`].
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Schema`] if `field` is not selected.
    pub fn recursive_field<F: FieldType>(&self, field: &Field<F>) -> Result<Field<F>> {
        let index = self.position(field.column())?;
        let column = field.undecorated().renamed(self.columns[index].as_str());
        Ok(Field::from_column(column.aliased(self.name.as_str())))
    }

    /// The expression name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    fn position(&self, field: &ColumnRef) -> Result<usize> {
        let base = field.undecorated();
        self.fields.iter().position(|selected| selected == base).ok_or_else(|| {
            schema_error!("{base} is not selected by recursive query {}", self.name)
        })
    }

    fn write_select(&self, sql: &mut String, depth: &str, from: &str, condition: &[Expr]) {
        sql.push_str("SELECT ");
        for field in &self.fields {
            sql.push_str(&field.complete_name());
            sql.push_str(", ");
        }
        sql.push_str(depth);
        sql.push_str("\nFROM ");
        sql.push_str(from);
        if !condition.is_empty() {
            sql.push_str("\nWHERE ");
            sql.extend(condition.iter().map(Expr::render));
        }
    }
}

impl<T> SqlQuery for RecursiveQuery<T> {
    fn render(&self) -> String {
        let table = self.table.complete_name();
        let columns = self.columns.join(", ");

        let mut sql = format!("WITH RECURSIVE {}({columns}, {DEPTH}) AS (\n", self.name);
        self.write_select(&mut sql, "1", &table, &self.start);
        sql.push_str("\nUNION ALL\n");
        self.write_select(
            &mut sql,
            &format!("{}.{DEPTH} + 1", self.name),
            &format!("{table}, {}", self.name),
            &self.stop,
        );
        sql.push_str(&format!(")\nSELECT {columns} FROM {}", self.name));

        if !self.order_by.is_empty() {
            let order = self
                .order_by
                .iter()
                .map(|&(index, decoration)| {
                    let column = &self.columns[index];
                    decoration.map_or_else(|| column.clone(), |d| d.apply(column))
                })
                .collect::<Vec<_>>()
                .join(", ");
            sql.push_str(" ORDER BY ");
            sql.push_str(&order);
        }
        sql
    }

    fn parameters(&self) -> Vec<ColumnRef> {
        self.start.iter().chain(&self.stop).flat_map(Expr::parameters).collect()
    }
}

impl<T> Readable for RecursiveQuery<T> {
    type Output = T;

    fn factory(&self) -> &dyn ObjectFactory<T> {
        self.factory.as_ref()
    }

    fn select_fields(&self) -> Vec<ColumnRef> {
        self.fields.clone()
    }
}

impl<T> fmt::Debug for RecursiveQuery<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecursiveQuery").field("sql", &self.render()).finish_non_exhaustive()
    }
}
