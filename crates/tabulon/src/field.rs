//! Typed columns and their type-erased handles.
//!
//! A [`Field<T>`] is a typed view over a [`ColumnRef`]. Clauses, expressions
//! and tables work with `ColumnRef`s so fields of different types can sit in
//! the same list; reading and binding go through the typed `Field` so values
//! keep their host type.
//!
//! Fields are created through [`crate::TableBuilder`], which registers each one
//! with its table exactly once. Unowned fields come from [`Field::empty`] (ad hoc
//! parameters), [`Field::synthetic`], constants and decorations.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;
use std::ops::Deref;
use std::sync::Arc;

use anyhow::anyhow;

use crate::driver::{Row, Statement};
use crate::error::{Error, Result};
use crate::table::TableName;
use crate::value::{DataType, SqlType};

/// Maps a logical column type to its host value type and SQL type tag.
pub trait FieldType: Send + Sync + 'static {
    /// Host representation of a non-null value.
    type Value: Clone + fmt::Debug + Send + Sync;

    /// SQL type tag used for binding and typed reads.
    const SQL_TYPE: SqlType;

    /// Wrap a host value in its tagged representation.
    fn wrap(value: Option<Self::Value>) -> DataType;

    /// Extract the host value, returning the original value when the variant does not match.
    ///
    /// # Errors
    ///
    /// Returns the unmatched value when it carries a different type tag.
    fn unwrap(data: DataType) -> std::result::Result<Option<Self::Value>, DataType>;
}

/// Column type markers.
pub mod ty {
    use super::FieldType;
    use crate::value::{DataType, SqlType};

    macro_rules! field_types {
        ($($(#[$meta:meta])* $name:ident: $value:ty => $sql:ident, $variant:ident;)*) => {
            $(
                $(#[$meta])*
                #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
                pub struct $name;

                impl FieldType for $name {
                    type Value = $value;

                    const SQL_TYPE: SqlType = SqlType::$sql;

                    fn wrap(value: Option<Self::Value>) -> DataType {
                        DataType::$variant(value)
                    }

                    fn unwrap(data: DataType) -> Result<Option<Self::Value>, DataType> {
                        match data {
                            DataType::$variant(value) => Ok(value),
                            other => Err(other),
                        }
                    }
                }
            )*
        };
    }

    field_types! {
        /// `INTEGER` read as `i32`.
        Int: i32 => Integer, Int32;
        /// `BIGINT` read as `i64`.
        BigInt: i64 => BigInt, Int64;
        /// `DOUBLE` read as `f64`.
        Double: f64 => Double, Double;
        /// `NUMERIC` read as a decimal.
        Decimal: rust_decimal::Decimal => Numeric, Decimal;
        /// `BOOLEAN` read as `bool`.
        Bool: bool => Boolean, Boolean;
        /// `CHAR` read as `String`.
        Char: String => Char, Char;
        /// `VARCHAR` read as `String`.
        Varchar: String => Varchar, Str;
        /// `DATE` read as a naive date.
        Date: chrono::NaiveDate => Date, Date;
        /// `TIMESTAMP` read as a naive date-time.
        Timestamp: chrono::NaiveDateTime => Timestamp, Timestamp;
        /// `BLOB` read as bytes.
        Binary: Vec<u8> => Binary, Binary;
        /// `UUID` read as a UUID.
        Uuid: uuid::Uuid => Uuid, Uuid;
    }
}

/// Aggregate or ordering wrapper applied to a column's rendered name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Decoration {
    /// `AVG(column)`
    Avg,
    /// `MIN(column)`
    Min,
    /// `MAX(column)`
    Max,
    /// `SUM(column)`
    Sum,
    /// `column DESC`
    Desc,
}

impl Decoration {
    pub(crate) fn apply(self, name: &str) -> String {
        match self {
            Self::Avg => format!("AVG({name})"),
            Self::Min => format!("MIN({name})"),
            Self::Max => format!("MAX({name})"),
            Self::Sum => format!("SUM({name})"),
            Self::Desc => format!("{name} DESC"),
        }
    }
}

#[derive(Clone)]
enum Rendering {
    Column,
    Literal,
    Decorated(Decoration, ColumnRef),
}

struct ColumnDef {
    name: String,
    alias: Option<String>,
    nullable: bool,
    table: Option<TableName>,
    sql_type: SqlType,
    rendering: Rendering,
}

/// Type-erased handle to a column, constant or decorated column.
///
/// Identity, equality, ordering and hashing are by complete name.
#[derive(Clone)]
pub struct ColumnRef(Arc<ColumnDef>);

impl ColumnRef {
    pub(crate) fn column(
        table: TableName, name: impl Into<String>, sql_type: SqlType, nullable: bool,
    ) -> Self {
        Self(Arc::new(ColumnDef {
            name: name.into(),
            alias: None,
            nullable,
            table: Some(table),
            sql_type,
            rendering: Rendering::Column,
        }))
    }

    /// An unnamed, nullable column with no table, used to bind ad hoc parameters.
    #[must_use]
    pub fn empty(sql_type: SqlType) -> Self {
        Self::unowned(String::new(), sql_type, true, Rendering::Column)
    }

    fn unowned(name: String, sql_type: SqlType, nullable: bool, rendering: Rendering) -> Self {
        Self(Arc::new(ColumnDef {
            name,
            alias: None,
            nullable,
            table: None,
            sql_type,
            rendering,
        }))
    }

    /// The bare column name.
    #[must_use]
    pub fn name(&self) -> String {
        match &self.0.rendering {
            Rendering::Column | Rendering::Literal => self.0.name.clone(),
            Rendering::Decorated(decoration, inner) => decoration.apply(&inner.name()),
        }
    }

    /// The qualified name: `alias.name`, `[schema.]table.name`, or the bare name
    /// for columns without a table.
    #[must_use]
    pub fn complete_name(&self) -> String {
        match &self.0.rendering {
            Rendering::Literal => self.0.name.clone(),
            Rendering::Decorated(decoration, inner) => decoration.apply(&inner.complete_name()),
            Rendering::Column => match (&self.0.alias, &self.0.table) {
                (Some(alias), _) => format!("{alias}.{}", self.0.name),
                (None, Some(table)) => format!("{}.{}", table.complete_name(), self.0.name),
                (None, None) => self.0.name.clone(),
            },
        }
    }

    /// The qualifier override set by [`Self::aliased`].
    #[must_use]
    pub fn alias(&self) -> Option<&str> {
        self.0.alias.as_deref()
    }

    /// Whether `NULL` may be bound through this column.
    #[must_use]
    pub fn is_nullable(&self) -> bool {
        self.0.nullable
    }

    /// The column's type tag.
    #[must_use]
    pub fn sql_type(&self) -> SqlType {
        self.0.sql_type
    }

    /// The owning table, if any.
    #[must_use]
    pub fn table(&self) -> Option<&TableName> {
        self.0.table.as_ref()
    }

    /// The decoration applied to this column, if any.
    #[must_use]
    pub fn decoration(&self) -> Option<Decoration> {
        match &self.0.rendering {
            Rendering::Decorated(decoration, _) => Some(*decoration),
            _ => None,
        }
    }

    /// A copy of this column qualified by `alias` instead of its table.
    #[must_use]
    pub fn aliased(&self, alias: impl Into<String>) -> Self {
        let (alias, rendering) = match &self.0.rendering {
            Rendering::Decorated(decoration, inner) => {
                (None, Rendering::Decorated(*decoration, inner.aliased(alias)))
            }
            rendering => (Some(alias.into()), rendering.clone()),
        };
        Self(Arc::new(ColumnDef {
            name: self.0.name.clone(),
            alias,
            nullable: self.0.nullable,
            table: self.0.table.clone(),
            sql_type: self.0.sql_type,
            rendering,
        }))
    }

    /// The column under any decoration.
    pub(crate) fn undecorated(&self) -> &Self {
        match &self.0.rendering {
            Rendering::Decorated(_, inner) => inner.undecorated(),
            Rendering::Column | Rendering::Literal => self,
        }
    }

    /// A plain column of the same type and table named `name`.
    pub(crate) fn renamed(&self, name: impl Into<String>) -> Self {
        Self(Arc::new(ColumnDef {
            name: name.into(),
            alias: None,
            nullable: self.0.nullable,
            table: self.0.table.clone(),
            sql_type: self.0.sql_type,
            rendering: Rendering::Column,
        }))
    }

    fn decorate(&self, decoration: Decoration, sql_type: SqlType, nullable: bool) -> Self {
        Self(Arc::new(ColumnDef {
            name: self.0.name.clone(),
            alias: None,
            nullable,
            table: self.0.table.clone(),
            sql_type,
            rendering: Rendering::Decorated(decoration, self.clone()),
        }))
    }

    /// Bind `value` at `index`, refusing `NULL` for non-nullable columns.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NullConstraint`] without touching the statement when a
    /// null is bound to a non-nullable column, or [`Error::DataAccess`] if the
    /// statement rejects the value.
    pub fn bind(
        &self, statement: &mut dyn Statement, index: usize, value: DataType,
    ) -> Result<()> {
        if value.is_null() && !self.0.nullable {
            return Err(Error::NullConstraint {
                field: self.complete_name(),
            });
        }
        Ok(statement.bind(index, value)?)
    }

    /// Read the value at the 1-based `index` as this column's type.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DataAccess`] if the row cannot be read.
    pub fn read(&self, row: &dyn Row, index: usize) -> Result<DataType> {
        Ok(row.get(index, self.0.sql_type)?)
    }
}

impl PartialEq for ColumnRef {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0) || self.complete_name() == other.complete_name()
    }
}

impl Eq for ColumnRef {}

impl Hash for ColumnRef {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.complete_name().hash(state);
    }
}

impl PartialOrd for ColumnRef {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ColumnRef {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.complete_name().cmp(&other.complete_name())
    }
}

impl fmt::Debug for ColumnRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ColumnRef")
            .field("name", &self.complete_name())
            .field("type", &self.0.sql_type)
            .field("nullable", &self.0.nullable)
            .finish()
    }
}

impl fmt::Display for ColumnRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.complete_name())
    }
}

/// A typed column.
pub struct Field<T: FieldType> {
    column: ColumnRef,
    _type: PhantomData<fn() -> T>,
}

/// `INTEGER` field.
pub type IntField = Field<ty::Int>;
/// `BIGINT` field.
pub type BigIntField = Field<ty::BigInt>;
/// `DOUBLE` field.
pub type DoubleField = Field<ty::Double>;
/// `NUMERIC` field.
pub type DecimalField = Field<ty::Decimal>;
/// `BOOLEAN` field.
pub type BoolField = Field<ty::Bool>;
/// `CHAR` field.
pub type CharField = Field<ty::Char>;
/// `VARCHAR` field.
pub type VarcharField = Field<ty::Varchar>;
/// `DATE` field.
pub type DateField = Field<ty::Date>;
/// `TIMESTAMP` field.
pub type TimestampField = Field<ty::Timestamp>;
/// `BLOB` field.
pub type BinaryField = Field<ty::Binary>;
/// `UUID` field.
pub type UuidField = Field<ty::Uuid>;

impl<T: FieldType> Field<T> {
    pub(crate) const fn from_column(column: ColumnRef) -> Self {
        Self {
            column,
            _type: PhantomData,
        }
    }

    /// The nullable, unnamed field of this type used for ad hoc parameters.
    #[must_use]
    pub fn empty() -> Self {
        Self::from_column(ColumnRef::empty(T::SQL_TYPE))
    }

    /// A nullable field with no table, rendered by its bare name.
    #[must_use]
    pub fn synthetic(name: impl Into<String>) -> Self {
        Self::from_column(ColumnRef::unowned(name.into(), T::SQL_TYPE, true, Rendering::Column))
    }

    /// A non-nullable field that renders `sql` verbatim, e.g. a literal in a select list.
    #[must_use]
    pub fn constant_sql(sql: impl Into<String>) -> Self {
        Self::from_column(ColumnRef::unowned(sql.into(), T::SQL_TYPE, false, Rendering::Literal))
    }

    /// The type-erased handle.
    #[must_use]
    pub const fn column(&self) -> &ColumnRef {
        &self.column
    }

    /// Read the value at the 1-based `index`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DataAccess`] if the row cannot be read, or if the
    /// capability answers with a value of another type.
    pub fn read(&self, row: &dyn Row, index: usize) -> Result<Option<T::Value>> {
        let data = self.column.read(row, index)?;
        T::unwrap(data).map_err(|other| {
            Error::DataAccess(anyhow!(
                "column {index} returned {} for {} field {}",
                other.sql_type(),
                T::SQL_TYPE,
                self.column.complete_name()
            ))
        })
    }

    /// Bind `value` at `index`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NullConstraint`] when `value` is `None` and the field is
    /// not nullable, or [`Error::DataAccess`] if the statement rejects the value.
    pub fn bind(
        &self, statement: &mut dyn Statement, index: usize, value: Option<T::Value>,
    ) -> Result<()> {
        self.column.bind(statement, index, T::wrap(value))
    }

    /// This field qualified by a table alias, as used with aliased joins.
    #[must_use]
    pub fn aliased(&self, alias: impl Into<String>) -> Self {
        Self::from_column(self.column.aliased(alias))
    }

    /// `MIN(field)`
    #[must_use]
    pub fn min(&self) -> Self {
        Self::from_column(self.column.decorate(Decoration::Min, T::SQL_TYPE, true))
    }

    /// `MAX(field)`
    #[must_use]
    pub fn max(&self) -> Self {
        Self::from_column(self.column.decorate(Decoration::Max, T::SQL_TYPE, true))
    }

    /// `SUM(field)`
    #[must_use]
    pub fn sum(&self) -> Self {
        Self::from_column(self.column.decorate(Decoration::Sum, T::SQL_TYPE, true))
    }

    /// `AVG(field)`, read as a double.
    #[must_use]
    pub fn avg(&self) -> Field<ty::Double> {
        Field::from_column(self.column.decorate(Decoration::Avg, SqlType::Double, true))
    }

    /// `field DESC`, for ORDER BY lists.
    #[must_use]
    pub fn desc(&self) -> Self {
        let nullable = self.column.is_nullable();
        Self::from_column(self.column.decorate(Decoration::Desc, T::SQL_TYPE, nullable))
    }
}

impl Field<ty::BigInt> {
    /// `COUNT(*)`
    #[must_use]
    pub fn count() -> Self {
        Self::from_column(ColumnRef::unowned(
            "COUNT(*)".to_string(),
            SqlType::BigInt,
            false,
            Rendering::Literal,
        ))
    }
}

impl Field<ty::Int> {
    /// An integer literal in a select list.
    #[must_use]
    pub fn constant(value: i32) -> Self {
        Self::constant_sql(value.to_string())
    }
}

impl Field<ty::Uuid> {
    /// A quoted UUID literal in a select list.
    #[must_use]
    pub fn constant(value: uuid::Uuid) -> Self {
        Self::constant_sql(format!("'{}'", value.hyphenated()))
    }
}

impl<T: FieldType> Clone for Field<T> {
    fn clone(&self) -> Self {
        Self::from_column(self.column.clone())
    }
}

impl<T: FieldType> Deref for Field<T> {
    type Target = ColumnRef;

    fn deref(&self) -> &Self::Target {
        &self.column
    }
}

impl<T: FieldType> AsRef<ColumnRef> for Field<T> {
    fn as_ref(&self) -> &ColumnRef {
        &self.column
    }
}

impl<T: FieldType> From<Field<T>> for ColumnRef {
    fn from(field: Field<T>) -> Self {
        field.column
    }
}

impl<T: FieldType> From<&Field<T>> for ColumnRef {
    fn from(field: &Field<T>) -> Self {
        field.column.clone()
    }
}

impl From<&ColumnRef> for ColumnRef {
    fn from(column: &ColumnRef) -> Self {
        column.clone()
    }
}

impl<T: FieldType> PartialEq for Field<T> {
    fn eq(&self, other: &Self) -> bool {
        self.column == other.column
    }
}

impl<T: FieldType> Eq for Field<T> {}

impl<T: FieldType> fmt::Debug for Field<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.column, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn person() -> TableName {
        TableName::new("hr", "person")
    }

    #[test]
    fn names() {
        let name = Field::<ty::Varchar>::from_column(ColumnRef::column(
            person(),
            "name",
            SqlType::Varchar,
            true,
        ));
        assert_eq!(name.name(), "name");
        assert_eq!(name.complete_name(), "hr.person.name");
        assert_eq!(name.aliased("mgr").complete_name(), "mgr.name");

        let local = ColumnRef::column(TableName::new("", "person"), "id", SqlType::Integer, false);
        assert_eq!(local.complete_name(), "person.id");

        assert_eq!(Field::<ty::Int>::synthetic("depth").complete_name(), "depth");
        assert_eq!(Field::<ty::Int>::empty().complete_name(), "");
    }

    #[test]
    fn decorations_wrap_names() {
        let salary = DecimalField::from_column(ColumnRef::column(
            person(),
            "salary",
            SqlType::Numeric,
            false,
        ));

        assert_eq!(salary.min().complete_name(), "MIN(hr.person.salary)");
        assert_eq!(salary.max().name(), "MAX(salary)");
        assert_eq!(salary.sum().complete_name(), "SUM(hr.person.salary)");
        assert_eq!(salary.desc().complete_name(), "hr.person.salary DESC");
        assert!(!salary.desc().is_nullable());

        let avg = salary.avg();
        assert_eq!(avg.complete_name(), "AVG(hr.person.salary)");
        assert_eq!(avg.sql_type(), SqlType::Double);
        assert_eq!(avg.decoration(), Some(Decoration::Avg));

        assert_eq!(salary.max().aliased("p").complete_name(), "MAX(p.salary)");
    }

    #[test]
    fn literals() {
        assert_eq!(BigIntField::count().complete_name(), "COUNT(*)");
        assert!(!BigIntField::count().is_nullable());
        assert_eq!(Field::<ty::Int>::constant(1).complete_name(), "1");

        let id = uuid::Uuid::nil();
        assert_eq!(
            Field::<ty::Uuid>::constant(id).name(),
            "'00000000-0000-0000-0000-000000000000'"
        );
    }

    #[test]
    fn identity_is_complete_name() {
        let a = ColumnRef::column(person(), "id", SqlType::Integer, false);
        let b = ColumnRef::column(person(), "id", SqlType::Integer, true);
        let c = ColumnRef::column(TableName::new("", "person"), "id", SqlType::Integer, false);

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert!(c < a);
    }
}
