//! Tables, schemas and primary keys.

use std::fmt;
use std::sync::Arc;

use indexmap::IndexSet;

use crate::delete::DeleteQuery;
use crate::error::{Result, schema_error, unsupported};
use crate::field::{ColumnRef, Field, FieldType};
use crate::insert::InsertQuery;
use crate::mapping::ObjectFactory;
use crate::relationship::Relationship;
use crate::select::SelectQuery;
use crate::update::UpdateQuery;

/// A table name with its (possibly empty) schema.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TableName {
    schema: String,
    name: String,
}

impl TableName {
    /// Creates a table name; an empty `schema` leaves the name unqualified.
    #[must_use]
    pub fn new(schema: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            schema: schema.into(),
            name: name.into(),
        }
    }

    /// The schema, empty when unqualified.
    #[must_use]
    pub fn schema(&self) -> &str {
        &self.schema
    }

    /// The bare table name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// `schema.name`, or `name` when the schema is empty.
    #[must_use]
    pub fn complete_name(&self) -> String {
        if self.schema.is_empty() {
            self.name.clone()
        } else {
            format!("{}.{}", self.schema, self.name)
        }
    }
}

impl fmt::Display for TableName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.complete_name())
    }
}

/// A table's primary key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PrimaryKey {
    /// A single column key.
    Single(ColumnRef),
    /// A key spanning several columns, in declaration order.
    Composite(Vec<ColumnRef>),
}

impl PrimaryKey {
    /// The key column of a single-column key.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Unsupported`] for a composite key.
    pub fn single_field(&self) -> Result<&ColumnRef> {
        match self {
            Self::Single(field) => Ok(field),
            Self::Composite(_) => {
                Err(unsupported!("there is more than one field in the primary key"))
            }
        }
    }

    /// The key columns in order.
    #[must_use]
    pub fn fields(&self) -> &[ColumnRef] {
        match self {
            Self::Single(field) => std::slice::from_ref(field),
            Self::Composite(fields) => fields,
        }
    }

    /// Returns `true` for a composite key.
    #[must_use]
    pub const fn is_composite(&self) -> bool {
        matches!(self, Self::Composite(_))
    }
}

/// A database table: its name, ordered fields, primary key and relationships.
///
/// Tables are built once with [`TableBuilder`] and immutable afterwards. They
/// are usually held in a `static` alongside their typed fields:
///
/// ```
/// use std::sync::LazyLock;
/// use tabulon::{Field, Table, ty};
///
/// struct Person {
///     table: Table,
///     id: Field<ty::Int>,
///     name: Field<ty::Varchar>,
/// }
///
/// static PERSON: LazyLock<Person> = LazyLock::new(|| {
///     let mut builder = Table::builder("hr", "person");
///     let id = builder.not_null::<ty::Int>("id");
///     let name = builder.nullable::<ty::Varchar>("name");
///     builder.primary_key(&id);
///     let table = builder.build().expect("valid table");
///     Person { table, id, name }
/// });
///
/// assert_eq!(PERSON.table.complete_name(), "hr.person");
/// assert_eq!(PERSON.name.complete_name(), "hr.person.name");
/// # let _ = &PERSON.id;
/// ```
#[derive(Debug, Clone)]
pub struct Table {
    name: TableName,
    fields: IndexSet<ColumnRef>,
    primary_key: Option<PrimaryKey>,
    relationships: Vec<Relationship>,
}

impl Table {
    /// Starts building a table; an empty `schema` leaves it unqualified.
    #[must_use]
    pub fn builder(schema: impl Into<String>, name: impl Into<String>) -> TableBuilder {
        TableBuilder::new(TableName::new(schema, name))
    }

    /// The table's name.
    #[must_use]
    pub const fn table_name(&self) -> &TableName {
        &self.name
    }

    /// The bare table name.
    #[must_use]
    pub fn name(&self) -> &str {
        self.name.name()
    }

    /// The schema, empty when unqualified.
    #[must_use]
    pub fn schema(&self) -> &str {
        self.name.schema()
    }

    /// `schema.name`, or `name` when the schema is empty.
    #[must_use]
    pub fn complete_name(&self) -> String {
        self.name.complete_name()
    }

    /// Fields in registration order.
    pub fn fields(&self) -> impl ExactSizeIterator<Item = &ColumnRef> {
        self.fields.iter()
    }

    /// Position of `field` in registration order.
    #[must_use]
    pub fn position(&self, field: &ColumnRef) -> Option<usize> {
        self.fields.get_index_of(field)
    }

    /// The primary key, if declared.
    #[must_use]
    pub const fn primary_key(&self) -> Option<&PrimaryKey> {
        self.primary_key.as_ref()
    }

    /// The primary key.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Unsupported`] if the table has no primary key.
    pub fn require_primary_key(&self) -> Result<&PrimaryKey> {
        self.primary_key
            .as_ref()
            .ok_or_else(|| unsupported!("table {} has no primary key", self.complete_name()))
    }

    /// Relationships declared on this table.
    #[must_use]
    pub fn relationships(&self) -> &[Relationship] {
        &self.relationships
    }

    /// `INSERT` of every field.
    #[must_use]
    pub fn insert_query(&self) -> InsertQuery {
        InsertQuery::new(self)
    }

    /// `UPDATE` assigning every field.
    #[must_use]
    pub fn update_query(&self) -> UpdateQuery {
        UpdateQuery::new(self)
    }

    /// `DELETE` from this table.
    #[must_use]
    pub fn delete_query(&self) -> DeleteQuery {
        DeleteQuery::new(self)
    }

    /// `SELECT` of every field, mapped with `factory`.
    #[must_use]
    pub fn select_query<T>(&self, factory: Arc<dyn ObjectFactory<T>>) -> SelectQuery<T> {
        SelectQuery::new(self, factory)
    }
}

/// Registers fields, the primary key and relationships of a [`Table`].
#[derive(Debug)]
pub struct TableBuilder {
    name: TableName,
    fields: IndexSet<ColumnRef>,
    duplicates: Vec<String>,
    primary_key: Option<Vec<ColumnRef>>,
    relationships: Vec<Relationship>,
}

impl TableBuilder {
    fn new(name: TableName) -> Self {
        Self {
            name,
            fields: IndexSet::new(),
            duplicates: Vec::new(),
            primary_key: None,
            relationships: Vec::new(),
        }
    }

    /// The name of the table being built, for self-referencing relationships.
    #[must_use]
    pub const fn table_name(&self) -> &TableName {
        &self.name
    }

    /// Registers a field that accepts `NULL`.
    pub fn nullable<T: FieldType>(&mut self, name: &str) -> Field<T> {
        self.field(name, true)
    }

    /// Registers a field that rejects `NULL`.
    pub fn not_null<T: FieldType>(&mut self, name: &str) -> Field<T> {
        self.field(name, false)
    }

    /// Registers a field; a name registered twice fails [`TableBuilder::build`].
    pub fn field<T: FieldType>(&mut self, name: &str, nullable: bool) -> Field<T> {
        let column = ColumnRef::column(self.name.clone(), name, T::SQL_TYPE, nullable);
        if !self.fields.insert(column.clone()) {
            self.duplicates.push(name.to_string());
        }
        Field::from_column(column)
    }

    /// Declares a single-column primary key.
    pub fn primary_key(&mut self, field: impl Into<ColumnRef>) -> &mut Self {
        self.primary_key = Some(vec![field.into()]);
        self
    }

    /// Declares a primary key over `fields`, in order.
    pub fn composite_key<I>(&mut self, fields: I) -> &mut Self
    where
        I: IntoIterator,
        I::Item: Into<ColumnRef>,
    {
        self.primary_key = Some(fields.into_iter().map(Into::into).collect());
        self
    }

    /// Adds a relationship from this table.
    pub fn relationship(&mut self, relationship: Relationship) -> &mut Self {
        self.relationships.push(relationship);
        self
    }

    /// Freezes the table.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Schema`] if a field name was registered twice, or
    /// if the primary key is empty or names a field of another table.
    pub fn build(self) -> Result<Table> {
        if let Some(name) = self.duplicates.first() {
            return Err(schema_error!(
                "field {name} registered twice on table {}",
                self.name.complete_name()
            ));
        }

        let primary_key = match self.primary_key {
            None => None,
            Some(mut fields) => {
                if let Some(foreign) = fields.iter().find(|field| !self.fields.contains(*field)) {
                    return Err(schema_error!(
                        "primary key field {foreign} does not belong to table {}",
                        self.name.complete_name()
                    ));
                }
                match fields.len() {
                    0 => {
                        return Err(schema_error!(
                            "empty primary key on table {}",
                            self.name.complete_name()
                        ));
                    }
                    1 => fields.pop().map(PrimaryKey::Single),
                    _ => Some(PrimaryKey::Composite(fields)),
                }
            }
        };

        Ok(Table {
            name: self.name,
            fields: self.fields,
            primary_key,
            relationships: self.relationships,
        })
    }
}
