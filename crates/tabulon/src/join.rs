use crate::relationship::Relationship;

/// Represents a SQL join along a declared relationship.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Join {
    relationship: Relationship,
    kind: JoinKind,
}

/// Join types supported by queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    /// `INNER JOIN`
    Inner,
    /// `LEFT OUTER JOIN`
    Left,
    /// `RIGHT OUTER JOIN`
    Right,
}

impl JoinKind {
    const fn keyword(self) -> &'static str {
        match self {
            Self::Inner => "INNER JOIN",
            Self::Left => "LEFT OUTER JOIN",
            Self::Right => "RIGHT OUTER JOIN",
        }
    }
}

impl Join {
    /// Creates a JOIN (defaults to INNER JOIN).
    #[must_use]
    pub const fn new(relationship: Relationship) -> Self {
        Self {
            relationship,
            kind: JoinKind::Inner,
        }
    }

    /// Creates an INNER JOIN (alias for `new`).
    #[must_use]
    pub const fn inner(relationship: Relationship) -> Self {
        Self::new(relationship)
    }

    /// Creates a LEFT OUTER JOIN.
    #[must_use]
    pub const fn left(relationship: Relationship) -> Self {
        Self {
            relationship,
            kind: JoinKind::Left,
        }
    }

    /// Creates a RIGHT OUTER JOIN.
    #[must_use]
    pub const fn right(relationship: Relationship) -> Self {
        Self {
            relationship,
            kind: JoinKind::Right,
        }
    }

    /// The join type.
    #[must_use]
    pub const fn kind(&self) -> JoinKind {
        self.kind
    }

    /// The relationship joined along.
    #[must_use]
    pub const fn relationship(&self) -> &Relationship {
        &self.relationship
    }

    /// `\n<KIND> JOIN related[ alias] ON (local = related AND ...)`
    #[must_use]
    pub fn render(&self) -> String {
        let relationship = &self.relationship;
        let related = relationship.related().complete_name();
        let mut sql = format!("\n{} {related}", self.kind.keyword());
        if let Some(alias) = relationship.alias() {
            sql.push(' ');
            sql.push_str(alias);
        }

        let on = relationship
            .pairs()
            .iter()
            .map(|pair| {
                format!(
                    "{} = {}",
                    pair.field.complete_name(),
                    relationship.related_field(&pair.related).complete_name()
                )
            })
            .collect::<Vec<_>>()
            .join(" AND ");
        sql.push_str(" ON (");
        sql.push_str(&on);
        sql.push(')');
        sql
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::ty;
    use crate::relationship::RelatedFields;
    use crate::table::Table;

    #[test]
    fn render_kinds() {
        let mut builder = Table::builder("hr", "department");
        let id = builder.not_null::<ty::Int>("id");
        let department = builder.build().expect("department");

        let mut builder = Table::builder("hr", "person");
        let department_id = builder.nullable::<ty::Int>("department_id");
        builder.build().expect("person");

        let relationship = Relationship::many_to_one(
            department.table_name(),
            [RelatedFields::new(&department_id, &id)],
        )
        .expect("relationship");

        assert_eq!(
            Join::inner(relationship.clone()).render(),
            "\nINNER JOIN hr.department ON (hr.person.department_id = hr.department.id)"
        );
        assert_eq!(
            Join::left(relationship.clone()).render(),
            "\nLEFT OUTER JOIN hr.department ON (hr.person.department_id = hr.department.id)"
        );
        assert_eq!(
            Join::right(relationship).render(),
            "\nRIGHT OUTER JOIN hr.department ON (hr.person.department_id = hr.department.id)"
        );
    }

    #[test]
    fn aliased_self_join_with_composite_pairs() {
        let mut builder = Table::builder("", "employee");
        let company = builder.not_null::<ty::Int>("company_id");
        let id = builder.not_null::<ty::Int>("id");
        let manager = builder.nullable::<ty::Int>("manager_id");
        let name = builder.table_name().clone();

        let relationship = Relationship::many_to_one(
            &name,
            [RelatedFields::new(&company, &company), RelatedFields::new(&manager, &id)],
        )
        .expect("relationship")
        .with_alias("mgr");

        assert_eq!(
            Join::left(relationship).render(),
            "\nLEFT OUTER JOIN employee mgr ON (employee.company_id = mgr.company_id AND employee.manager_id = mgr.id)"
        );
    }
}
