use std::fmt;

use crate::field::ColumnRef;
use crate::query::SqlQuery;

/// A SQL fragment together with the fields its `?` placeholders bind to.
///
/// Every constructor keeps the placeholders in [`Expr::render`] and the
/// fields in [`Expr::parameters`] in the same order, so a query can bind
/// values positionally without inspecting its own text.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Literal SQL, rendered verbatim.
    Sql(String),
    /// A column rendered by its complete name.
    Column(ColumnRef),
    /// A column rendered by its bare name (UPDATE assignments).
    Name(ColumnRef),
    /// A `?` placeholder bound through the given field.
    Placeholder(ColumnRef),
    /// Two operands joined by an operator.
    Binary(Box<Binary>),
    /// `value BETWEEN low AND high`
    Between {
        /// Tested operand.
        value: Box<Self>,
        /// Lower bound.
        low: Box<Self>,
        /// Upper bound.
        high: Box<Self>,
    },
    /// `NOT (expr)`
    Not(Box<Self>),
    /// Tokens concatenated in order, as produced by [`crate::WhereBuilder`].
    Sequence(Vec<Self>),
    /// A rendered sub-select with its own parameters, rendered in parentheses.
    Subquery {
        /// The sub-select text.
        sql: String,
        /// The sub-select's parameters in order.
        parameters: Vec<ColumnRef>,
    },
}

/// The generic dual-operand combinator.
#[derive(Debug, Clone, PartialEq)]
pub struct Binary {
    /// Left operand.
    pub left: Expr,
    /// Operator token, e.g. `=` or `AND`.
    pub operator: String,
    /// Right operand.
    pub right: Expr,
    /// Wrap both operands in parentheses.
    pub parentheses: bool,
}

impl Expr {
    /// Literal SQL.
    pub fn sql(text: impl Into<String>) -> Self {
        Self::Sql(text.into())
    }

    /// A column rendered by its complete name.
    pub fn column(field: impl Into<ColumnRef>) -> Self {
        Self::Column(field.into())
    }

    /// A `?` placeholder bound through `field`.
    pub fn placeholder(field: impl Into<ColumnRef>) -> Self {
        Self::Placeholder(field.into())
    }

    /// `left operator right`, or `(left) operator (right)` with `parentheses`.
    #[must_use]
    pub fn binary(
        left: Self, operator: impl Into<String>, right: Self, parentheses: bool,
    ) -> Self {
        Self::Binary(Box::new(Binary {
            left,
            operator: operator.into(),
            right,
            parentheses,
        }))
    }

    fn compare(field: impl Into<ColumnRef>, operator: &str) -> Self {
        let field = field.into();
        Self::binary(Self::Column(field.clone()), operator, Self::Placeholder(field), false)
    }

    fn compare_sql(field: impl Into<ColumnRef>, operator: &str, sql: impl Into<String>) -> Self {
        Self::binary(Self::Column(field.into()), operator, Self::Sql(sql.into()), false)
    }

    /// `field = ?`
    pub fn eq(field: impl Into<ColumnRef>) -> Self {
        Self::compare(field, "=")
    }

    /// `field = sql`
    pub fn eq_sql(field: impl Into<ColumnRef>, sql: impl Into<String>) -> Self {
        Self::compare_sql(field, "=", sql)
    }

    /// `field = other`, comparing two columns.
    pub fn eq_column(field: impl Into<ColumnRef>, other: impl Into<ColumnRef>) -> Self {
        Self::binary(Self::column(field), "=", Self::column(other), false)
    }

    /// `name = ?` with the bare field name, as used in UPDATE ... SET.
    pub fn assign(field: impl Into<ColumnRef>) -> Self {
        let field = field.into();
        Self::binary(Self::Name(field.clone()), "=", Self::Placeholder(field), false)
    }

    /// `name = name + 1`
    pub fn increment(field: impl Into<ColumnRef>) -> Self {
        let field = field.into();
        let name = field.name();
        Self::binary(Self::Name(field), "=", Self::Sql(format!("{name} + 1")), false)
    }

    /// `field <> ?`
    pub fn different(field: impl Into<ColumnRef>) -> Self {
        Self::compare(field, "<>")
    }

    /// `field <> sql`
    pub fn different_sql(field: impl Into<ColumnRef>, sql: impl Into<String>) -> Self {
        Self::compare_sql(field, "<>", sql)
    }

    /// `field like ?`
    pub fn like(field: impl Into<ColumnRef>) -> Self {
        Self::compare(field, "like")
    }

    /// `field like pattern`, where `pattern` is SQL text such as `'%son'`.
    pub fn like_sql(field: impl Into<ColumnRef>, pattern: impl Into<String>) -> Self {
        Self::compare_sql(field, "like", pattern)
    }

    /// `field > ?`
    pub fn gt(field: impl Into<ColumnRef>) -> Self {
        Self::compare(field, ">")
    }

    /// `field >= ?`
    pub fn gte(field: impl Into<ColumnRef>) -> Self {
        Self::compare(field, ">=")
    }

    /// `field < ?`
    pub fn lt(field: impl Into<ColumnRef>) -> Self {
        Self::compare(field, "<")
    }

    /// `field <= ?`
    pub fn lte(field: impl Into<ColumnRef>) -> Self {
        Self::compare(field, "<=")
    }

    /// `field IS NULL`
    pub fn is_null(field: impl Into<ColumnRef>) -> Self {
        Self::Sequence(vec![Self::column(field), Self::sql(" IS NULL")])
    }

    /// `field IS NOT NULL`
    pub fn is_not_null(field: impl Into<ColumnRef>) -> Self {
        Self::Sequence(vec![Self::column(field), Self::sql(" IS NOT NULL")])
    }

    /// `field BETWEEN ? AND ?`, binding through `low` then `high`.
    pub fn between(
        field: impl Into<ColumnRef>, low: impl Into<ColumnRef>, high: impl Into<ColumnRef>,
    ) -> Self {
        Self::Between {
            value: Box::new(Self::column(field)),
            low: Box::new(Self::placeholder(low)),
            high: Box::new(Self::placeholder(high)),
        }
    }

    /// `field BETWEEN low AND high` with literal bounds.
    pub fn between_sql(
        field: impl Into<ColumnRef>, low: impl Into<String>, high: impl Into<String>,
    ) -> Self {
        Self::Between {
            value: Box::new(Self::column(field)),
            low: Box::new(Self::sql(low)),
            high: Box::new(Self::sql(high)),
        }
    }

    /// `field in (list)`. The list may be given with or without its parentheses.
    pub fn in_list(field: impl Into<ColumnRef>, list: impl AsRef<str>) -> Self {
        Self::compare_sql(field, "in", parenthesize(list.as_ref()))
    }

    /// `field not in (list)`. The list may be given with or without its parentheses.
    pub fn not_in_list(field: impl Into<ColumnRef>, list: impl AsRef<str>) -> Self {
        Self::compare_sql(field, "not in", parenthesize(list.as_ref()))
    }

    /// `field in (<sub-select>)`, carrying the sub-select's parameters.
    pub fn in_select(field: impl Into<ColumnRef>, query: &impl SqlQuery) -> Self {
        let subquery = Self::Subquery {
            sql: query.render(),
            parameters: query.parameters(),
        };
        Self::binary(Self::column(field), "in", subquery, false)
    }

    /// `(left) AND (right)`
    #[must_use]
    pub fn and(left: Self, right: Self) -> Self {
        Self::binary(left, "AND", right, true)
    }

    /// `(left) OR (right)`
    #[must_use]
    pub fn or(left: Self, right: Self) -> Self {
        Self::binary(left, "OR", right, true)
    }

    /// Left-folds `exprs` with [`Expr::and`]; a single expression is returned as is.
    pub fn all(exprs: impl IntoIterator<Item = Self>) -> Self {
        exprs.into_iter().reduce(Self::and).unwrap_or_else(|| Self::Sequence(Vec::new()))
    }

    /// `NOT (expr)`
    #[must_use]
    pub fn not(expr: Self) -> Self {
        Self::Not(Box::new(expr))
    }

    /// The SQL text.
    #[must_use]
    pub fn render(&self) -> String {
        let mut sql = String::new();
        self.write(&mut sql);
        sql
    }

    fn write(&self, sql: &mut String) {
        match self {
            Self::Sql(text) => sql.push_str(text),
            Self::Column(field) => sql.push_str(&field.complete_name()),
            Self::Name(field) => sql.push_str(&field.name()),
            Self::Placeholder(_) => sql.push('?'),
            Self::Binary(binary) => {
                let Binary {
                    left,
                    operator,
                    right,
                    parentheses,
                } = binary.as_ref();
                if *parentheses {
                    sql.push('(');
                    left.write(sql);
                    sql.push_str(") ");
                    sql.push_str(operator);
                    sql.push_str(" (");
                    right.write(sql);
                    sql.push(')');
                } else {
                    left.write(sql);
                    sql.push(' ');
                    sql.push_str(operator);
                    sql.push(' ');
                    right.write(sql);
                }
            }
            Self::Between { value, low, high } => {
                value.write(sql);
                sql.push_str(" BETWEEN ");
                low.write(sql);
                sql.push_str(" AND ");
                high.write(sql);
            }
            Self::Not(expr) => {
                sql.push_str("NOT (");
                expr.write(sql);
                sql.push(')');
            }
            Self::Sequence(tokens) => tokens.iter().for_each(|token| token.write(sql)),
            Self::Subquery { sql: text, .. } => {
                sql.push('(');
                sql.push_str(text);
                sql.push(')');
            }
        }
    }

    /// The fields bound by this expression's placeholders, in placeholder order.
    #[must_use]
    pub fn parameters(&self) -> Vec<ColumnRef> {
        let mut parameters = Vec::new();
        self.collect(&mut parameters);
        parameters
    }

    fn collect(&self, parameters: &mut Vec<ColumnRef>) {
        match self {
            Self::Sql(_) | Self::Column(_) | Self::Name(_) => {}
            Self::Placeholder(field) => parameters.push(field.clone()),
            Self::Binary(binary) => {
                binary.left.collect(parameters);
                binary.right.collect(parameters);
            }
            Self::Between { value, low, high } => {
                value.collect(parameters);
                low.collect(parameters);
                high.collect(parameters);
            }
            Self::Not(expr) => expr.collect(parameters),
            Self::Sequence(tokens) => tokens.iter().for_each(|token| token.collect(parameters)),
            Self::Subquery {
                parameters: inner, ..
            } => parameters.extend(inner.iter().cloned()),
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

fn parenthesize(list: &str) -> String {
    let list = list.trim();
    if list.starts_with('(') && list.ends_with(')') {
        list.to_string()
    } else {
        format!("({list})")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::{Field, ty};
    use crate::table::Table;

    struct Person {
        id: Field<ty::Int>,
        name: Field<ty::Varchar>,
        age: Field<ty::Int>,
        visits: Field<ty::Int>,
    }

    fn person() -> Person {
        let mut builder = Table::builder("", "person");
        let id = builder.not_null::<ty::Int>("id");
        let name = builder.nullable::<ty::Varchar>("name");
        let age = builder.nullable::<ty::Int>("age");
        let visits = builder.not_null::<ty::Int>("visits");
        Person {
            id,
            name,
            age,
            visits,
        }
    }

    fn placeholders(sql: &str) -> usize {
        sql.matches('?').count()
    }

    #[test]
    fn comparisons() {
        let p = person();
        assert_eq!(Expr::eq(&p.id).render(), "person.id = ?");
        assert_eq!(Expr::eq_sql(&p.id, "7").render(), "person.id = 7");
        assert_eq!(Expr::different(&p.name).render(), "person.name <> ?");
        assert_eq!(Expr::like_sql(&p.name, "'%son'").render(), "person.name like '%son'");
        assert_eq!(Expr::gte(&p.age).render(), "person.age >= ?");
        assert_eq!(Expr::is_null(&p.age).render(), "person.age IS NULL");
        assert_eq!(Expr::eq_column(&p.visits, &p.age).render(), "person.visits = person.age");
    }

    #[test]
    fn assignments() {
        let p = person();
        assert_eq!(Expr::assign(&p.name).render(), "name = ?");
        assert_eq!(Expr::assign(&p.name).parameters(), [p.name.column().clone()]);

        let increment = Expr::increment(&p.visits);
        assert_eq!(increment.render(), "visits = visits + 1");
        assert!(increment.parameters().is_empty());
    }

    #[test]
    fn in_list_literal() {
        let p = person();
        let expr = Expr::in_list(&p.id, "(1,2,3)");
        assert_eq!(expr.render(), "person.id in (1,2,3)");
        assert!(expr.parameters().is_empty());

        assert_eq!(Expr::not_in_list(&p.id, "4, 5").render(), "person.id not in (4, 5)");
    }

    #[test]
    fn between() {
        let p = person();
        let expr = Expr::between(&p.age, &p.age, &p.age);
        assert_eq!(expr.render(), "person.age BETWEEN ? AND ?");
        assert_eq!(expr.parameters().len(), 2);

        let expr = Expr::between_sql(&p.age, "18", "65");
        assert_eq!(expr.render(), "person.age BETWEEN 18 AND 65");
        assert!(expr.parameters().is_empty());
    }

    #[test]
    fn combinators_concatenate_parameters() {
        let p = person();
        let expr = Expr::or(
            Expr::and(Expr::eq(&p.id), Expr::like(&p.name)),
            Expr::not(Expr::between(&p.age, &p.age, &p.visits)),
        );

        assert_eq!(
            expr.render(),
            "((person.id = ?) AND (person.name like ?)) OR (NOT (person.age BETWEEN ? AND ?))"
        );
        assert_eq!(
            expr.parameters(),
            [
                p.id.column().clone(),
                p.name.column().clone(),
                p.age.column().clone(),
                p.visits.column().clone()
            ]
        );
    }

    #[test]
    fn all_folds_left() {
        let p = person();
        assert_eq!(Expr::all([Expr::eq(&p.id)]).render(), "person.id = ?");
        assert_eq!(
            Expr::all([Expr::eq(&p.id), Expr::eq(&p.name), Expr::eq(&p.age)]).render(),
            "((person.id = ?) AND (person.name = ?)) AND (person.age = ?)"
        );
        assert_eq!(Expr::all([]).render(), "");
    }

    #[test]
    fn placeholder_count_matches_parameters() {
        let p = person();
        let exprs = [
            Expr::eq(&p.id),
            Expr::assign(&p.name),
            Expr::increment(&p.visits),
            Expr::in_list(&p.id, "1,2"),
            Expr::between(&p.age, &p.age, &p.age),
            Expr::and(Expr::eq(&p.id), Expr::different_sql(&p.name, "'x'")),
            Expr::not(Expr::or(Expr::lt(&p.age), Expr::gt(&p.visits))),
            Expr::Sequence(vec![Expr::column(&p.id), Expr::sql(" = "), Expr::placeholder(&p.id)]),
        ];

        for expr in exprs {
            assert_eq!(placeholders(&expr.render()), expr.parameters().len(), "{expr}");
        }
    }
}
