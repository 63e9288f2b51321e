use crate::expr::Expr;
use crate::field::ColumnRef;

/// The WHERE clause shared by select, update and delete queries.
///
/// Expressions are rendered by concatenation in order, so several
/// expressions form one token sequence.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    expressions: Vec<Expr>,
}

impl Filter {
    /// Replaces the clause with `expressions`.
    pub fn set(&mut self, expressions: Vec<Expr>) {
        self.expressions = expressions;
    }

    /// The clause's expressions.
    #[must_use]
    pub fn expressions(&self) -> &[Expr] {
        &self.expressions
    }

    /// Returns `true` when no expression is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.expressions.is_empty()
    }

    /// The expressions concatenated.
    #[must_use]
    pub fn render(&self) -> String {
        self.expressions.iter().map(Expr::render).collect()
    }

    /// The expressions' parameters in order.
    #[must_use]
    pub fn parameters(&self) -> Vec<ColumnRef> {
        self.expressions.iter().flat_map(Expr::parameters).collect()
    }

    /// `{keyword}{clause}` when the clause is not empty.
    pub(crate) fn write(filter: Option<&Self>, keyword: &str, sql: &mut String) {
        if let Some(filter) = filter.filter(|filter| !filter.is_empty()) {
            sql.push_str(keyword);
            sql.push_str(&filter.render());
        }
    }
}

/// Queries with a WHERE clause.
///
/// The clause holder is created on first use; every setter replaces it.
pub trait Filterable: Sized {
    /// The clause holder, created if absent.
    fn filter_mut(&mut self) -> &mut Filter;

    /// The clause holder, if one was created.
    fn filter(&self) -> Option<&Filter>;

    /// Sets the WHERE clause to `expr`.
    #[must_use]
    fn r#where(mut self, expr: Expr) -> Self {
        self.filter_mut().set(vec![expr]);
        self
    }

    /// Sets the WHERE clause to `field = ?`.
    #[must_use]
    fn where_field(self, field: impl Into<ColumnRef>) -> Self {
        self.r#where(Expr::eq(field))
    }

    /// Sets the WHERE clause to `exprs` concatenated in order.
    #[must_use]
    fn where_all(mut self, exprs: impl IntoIterator<Item = Expr>) -> Self {
        self.filter_mut().set(exprs.into_iter().collect());
        self
    }

    /// The WHERE clause's parameters, empty when unset.
    fn where_parameters(&self) -> Vec<ColumnRef> {
        self.filter().map(Filter::parameters).unwrap_or_default()
    }
}
