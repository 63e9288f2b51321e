//! Foreign-key relationships between tables.

use crate::error::{Result, schema_error};
use crate::field::ColumnRef;
use crate::table::{Table, TableName};

/// A local field and the related table's field it references.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelatedFields {
    /// Field on the table declaring the relationship.
    pub field: ColumnRef,
    /// Field on the related table.
    pub related: ColumnRef,
}

impl RelatedFields {
    /// Pairs `field` with `related`.
    pub fn new(field: impl Into<ColumnRef>, related: impl Into<ColumnRef>) -> Self {
        Self {
            field: field.into(),
            related: related.into(),
        }
    }
}

/// Relationship cardinality.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cardinality {
    /// Many rows of this table reference one row of the related table.
    ManyToOne,
    /// Rows of the two tables share their primary key.
    OneToOne,
}

/// A relationship to another table (or to the same table under an alias).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relationship {
    cardinality: Cardinality,
    related: TableName,
    pairs: Vec<RelatedFields>,
    alias: Option<String>,
}

impl Relationship {
    /// A many-to-one relationship joining on `pairs`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Schema`] if `pairs` is empty.
    pub fn many_to_one(
        related: &TableName, pairs: impl IntoIterator<Item = RelatedFields>,
    ) -> Result<Self> {
        let pairs: Vec<_> = pairs.into_iter().collect();
        if pairs.is_empty() {
            return Err(schema_error!("relationship to {related} has no field pairs"));
        }
        Ok(Self {
            cardinality: Cardinality::ManyToOne,
            related: related.clone(),
            pairs,
            alias: None,
        })
    }

    /// A one-to-one relationship pairing the single-field primary keys of `main` and `related`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Unsupported`] if either table lacks a primary
    /// key or has a composite one.
    pub fn one_to_one(main: &Table, related: &Table) -> Result<Self> {
        let field = main.require_primary_key()?.single_field()?.clone();
        let related_field = related.require_primary_key()?.single_field()?.clone();
        Ok(Self {
            cardinality: Cardinality::OneToOne,
            related: related.table_name().clone(),
            pairs: vec![RelatedFields::new(field, related_field)],
            alias: None,
        })
    }

    /// Qualifies the related side with `alias`, as needed for self joins.
    #[must_use]
    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    /// The relationship cardinality.
    #[must_use]
    pub const fn cardinality(&self) -> Cardinality {
        self.cardinality
    }

    /// The related table.
    #[must_use]
    pub const fn related(&self) -> &TableName {
        &self.related
    }

    /// The joined field pairs (never empty).
    #[must_use]
    pub fn pairs(&self) -> &[RelatedFields] {
        &self.pairs
    }

    /// The alias of the related table, if any.
    #[must_use]
    pub fn alias(&self) -> Option<&str> {
        self.alias.as_deref()
    }

    /// A related-side field qualified the way joins render it.
    #[must_use]
    pub fn related_field(&self, field: &ColumnRef) -> ColumnRef {
        self.alias.as_ref().map_or_else(|| field.clone(), |alias| field.aliased(alias.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use crate::field::ty;

    #[test]
    fn many_to_one_requires_pairs() {
        let name = TableName::new("", "person");
        let result = Relationship::many_to_one(&name, Vec::new());
        assert!(matches!(result, Err(Error::Schema(_))));
    }

    #[test]
    fn one_to_one_pairs_primary_keys() {
        let mut builder = Table::builder("", "person");
        let id = builder.not_null::<ty::Int>("id");
        builder.primary_key(&id);
        let person = builder.build().expect("person");

        let mut builder = Table::builder("", "passport");
        let person_id = builder.not_null::<ty::Int>("person_id");
        builder.primary_key(&person_id);
        let passport = builder.build().expect("passport");

        let relationship = Relationship::one_to_one(&person, &passport).expect("relationship");
        assert_eq!(relationship.cardinality(), Cardinality::OneToOne);
        assert_eq!(relationship.pairs(), [RelatedFields::new(&id, &person_id)]);

        let mut builder = Table::builder("", "membership");
        let a = builder.not_null::<ty::Int>("a");
        let b = builder.not_null::<ty::Int>("b");
        builder.composite_key([&a, &b]);
        let membership = builder.build().expect("membership");

        assert!(matches!(
            Relationship::one_to_one(&person, &membership),
            Err(Error::Unsupported(_))
        ));
    }

    #[test]
    fn alias_qualifies_related_side() {
        let mut builder = Table::builder("", "person");
        let id = builder.not_null::<ty::Int>("id");
        let manager = builder.nullable::<ty::Int>("manager_id");
        let name = builder.table_name().clone();
        let relationship = Relationship::many_to_one(&name, [RelatedFields::new(&manager, &id)])
            .expect("relationship")
            .with_alias("mgr");

        let related = relationship.related_field(&relationship.pairs()[0].related);
        assert_eq!(related.complete_name(), "mgr.id");
    }
}
