use std::sync::Arc;

use crate::dialect::{CustomOperators, Dialect};
use crate::error::{Error, Result};
use crate::expr::Expr;
use crate::field::ColumnRef;

/// Fluent token builder for hand-written predicates.
///
/// Tokens are concatenated in insertion order with no precedence analysis;
/// parentheses are the caller's job via [`WhereBuilder::lb`] and [`WhereBuilder::rb`].
///
/// ```
/// use tabulon::{Field, WhereBuilder, ty};
///
/// let age = Field::<ty::Int>::synthetic("age");
/// let expr = WhereBuilder::new()
///     .field(&age)
///     .between()
///     .param(&age)
///     .and()
///     .param(&age)
///     .build();
///
/// assert_eq!(expr.render(), "age between ? and ?");
/// assert_eq!(expr.parameters().len(), 2);
/// ```
#[derive(Debug, Clone, Default)]
pub struct WhereBuilder {
    tokens: Vec<Expr>,
    operators: Option<Arc<dyn CustomOperators>>,
}

impl WhereBuilder {
    /// A builder without custom operators.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A builder offering the custom operators of `dialect`.
    #[must_use]
    pub fn with_dialect(dialect: &Dialect) -> Self {
        Self {
            tokens: Vec::new(),
            operators: dialect.custom_operators(),
        }
    }

    fn token(mut self, expr: Expr) -> Self {
        self.tokens.push(expr);
        self
    }

    /// Appends an expression.
    #[must_use]
    pub fn eval(self, expr: Expr) -> Self {
        self.token(expr)
    }

    /// Appends a field's complete name.
    #[must_use]
    pub fn field(self, field: impl Into<ColumnRef>) -> Self {
        self.token(Expr::column(field))
    }

    /// Appends a `?` placeholder bound through `field`.
    #[must_use]
    pub fn param(self, field: impl Into<ColumnRef>) -> Self {
        self.token(Expr::placeholder(field))
    }

    /// Appends literal SQL.
    #[must_use]
    pub fn sql(self, text: impl Into<String>) -> Self {
        self.token(Expr::sql(text))
    }

    /// ` and `
    #[must_use]
    pub fn and(self) -> Self {
        self.sql(" and ")
    }

    /// ` or `
    #[must_use]
    pub fn or(self) -> Self {
        self.sql(" or ")
    }

    /// ` not `
    #[must_use]
    pub fn not(self) -> Self {
        self.sql(" not ")
    }

    /// ` = `
    #[must_use]
    pub fn eq(self) -> Self {
        self.sql(" = ")
    }

    /// ` <> `
    #[must_use]
    pub fn different(self) -> Self {
        self.sql(" <> ")
    }

    /// ` like `
    #[must_use]
    pub fn like(self) -> Self {
        self.sql(" like ")
    }

    /// ` between `
    #[must_use]
    pub fn between(self) -> Self {
        self.sql(" between ")
    }

    /// ` in (`
    #[must_use]
    pub fn in_(self) -> Self {
        self.sql(" in (")
    }

    /// ` (`
    #[must_use]
    pub fn lb(self) -> Self {
        self.sql(" (")
    }

    /// `) `
    #[must_use]
    pub fn rb(self) -> Self {
        self.sql(") ")
    }

    /// `,`
    #[must_use]
    pub fn comma(self) -> Self {
        self.sql(",")
    }

    /// The dialect's case-insensitive LIKE.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingOperator`] if the builder has no custom operators.
    pub fn ilike(self) -> Result<Self> {
        let operators =
            self.operators.clone().ok_or(Error::MissingOperator("case insensitive like"))?;
        Ok(self.token(operators.case_insensitive_like()))
    }

    /// The dialect's fuzzy match.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingOperator`] if the builder has no custom operators.
    pub fn similar(self) -> Result<Self> {
        let operators = self.operators.clone().ok_or(Error::MissingOperator("fuzzy match"))?;
        Ok(self.token(operators.fuzzy_match()))
    }

    /// The concatenated tokens as one expression.
    #[must_use]
    pub fn build(self) -> Expr {
        Expr::Sequence(self.tokens)
    }
}
