//! Primary-key services for value objects.
//!
//! An [`Entity`] knows its table, how to map itself from a row selecting every
//! table field, and how to list its values in table-field order. [`Service`]
//! builds the usual statements from that: select, delete and update by primary
//! key, insert, and paged reads. Each call prepares, binds, runs and closes
//! its own statement.
//!
//! The [`entity!`](crate::entity) macro declares the value object, its table
//! and typed fields, and the [`Entity`] implementation in one place.

use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use anyhow::anyhow;
use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::driver::{Connection, Row};
use crate::error::{Error, Result, schema_error};
use crate::expr::Expr;
use crate::field::{ColumnRef, FieldType, ty};
use crate::filter::Filterable;
use crate::mapping::ObjectFactory;
use crate::query::{Prepared, SqlQuery};
use crate::select::SelectQuery;
use crate::table::Table;
use crate::value::DataType;

/// A value object stored in one table.
pub trait Entity: Sized + Send + Sync + 'static {
    /// The table holding this entity.
    fn table() -> &'static Table;

    /// Map a row selecting every table field, in table-field order.
    ///
    /// # Errors
    ///
    /// Returns an error if a column cannot be read.
    fn from_row(row: &dyn Row) -> Result<Self>;

    /// The entity's values, one per table field, in table-field order.
    fn to_values(&self) -> Vec<DataType>;

    /// The values at the primary-key positions, in key order.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Unsupported`] if the table has no primary key, or
    /// [`crate::Error::Schema`] if [`Entity::to_values`] is missing a key value.
    fn key_values(&self) -> Result<Vec<DataType>> {
        let table = Self::table();
        let values = self.to_values();
        table
            .require_primary_key()?
            .fields()
            .iter()
            .map(|field| {
                table
                    .position(field)
                    .and_then(|i| values.get(i).cloned())
                    .ok_or_else(|| schema_error!("no value for key field {field}"))
            })
            .collect()
    }
}

/// Declares an entity: the value object, a companion struct holding its
/// [`Table`] and typed fields, and the [`Entity`] implementation.
///
/// Struct fields map to columns of the same name, in declaration order.
/// `Option<_>` fields are nullable columns. The companion is built once, on
/// first use, and reached through `<Name>::columns()`.
///
/// # Examples
///
/// ```
/// use tabulon::{Entity, SqlQuery, entity};
///
/// entity! {
///     table = ("hr", "person"),
///     columns = PersonColumns,
///     key = [id],
///     #[derive(Debug, Clone, PartialEq)]
///     pub struct Person {
///         pub id: i32,
///         pub name: Option<String>,
///     }
/// }
///
/// assert_eq!(Person::table().complete_name(), "hr.person");
/// assert_eq!(Person::columns().name.complete_name(), "hr.person.name");
/// assert_eq!(
///     Person::table().insert_query().render(),
///     "INSERT INTO hr.person (id, name) VALUES (?, ?)"
/// );
/// ```
#[macro_export]
macro_rules! entity {
    (
        table = ($schema:literal, $table:literal),
        columns = $columns:ident,
        $(key = [$($key:ident),+ $(,)?],)?
        $(#[$meta:meta])*
        pub struct $name:ident {
            $(
                $(#[$field_meta:meta])*
                pub $field:ident : $field_ty:ty
            ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        pub struct $name {
            $(
                $(#[$field_meta])*
                pub $field: $field_ty,
            )*
        }

        #[doc = concat!("Table and typed fields of [`", stringify!($name), "`].")]
        #[allow(missing_docs)]
        pub struct $columns {
            pub table: $crate::Table,
            $(pub $field: $crate::Field<<$field_ty as $crate::ColumnValue>::Type>,)*
        }

        impl $name {
            /// The table and typed fields.
            ///
            /// # Panics
            ///
            /// Panics on first use if the declaration is not a valid table.
            pub fn columns() -> &'static $columns {
                static COLUMNS: ::std::sync::LazyLock<$columns> = ::std::sync::LazyLock::new(|| {
                    let mut builder = $crate::Table::builder($schema, $table);
                    $(
                        let $field = builder.field::<<$field_ty as $crate::ColumnValue>::Type>(
                            stringify!($field),
                            <$field_ty as $crate::ColumnValue>::NULLABLE,
                        );
                    )*
                    $(builder.composite_key([$($crate::ColumnRef::from(&$key)),+]);)?
                    let table = builder.build().expect("entity should declare a valid table");
                    $columns { table, $($field),* }
                });
                &COLUMNS
            }
        }

        impl $crate::Entity for $name {
            fn table() -> &'static $crate::Table {
                &Self::columns().table
            }

            fn from_row(row: &dyn $crate::Row) -> $crate::Result<Self> {
                let columns = Self::columns();
                let mut index = 0;
                Ok(Self {
                    $(
                        $field: {
                            index += 1;
                            <$field_ty as $crate::ColumnValue>::from_column(
                                columns.$field.read(row, index)?,
                            )?
                        },
                    )*
                })
            }

            fn to_values(&self) -> ::std::vec::Vec<$crate::DataType> {
                ::std::vec![$($crate::ColumnValue::to_data(&self.$field)),*]
            }
        }
    };
}

/// Host types an [`entity!`](crate::entity) field may hold.
///
/// Implemented for the host value of every column type except `CHAR`, and for
/// their `Option`s, which make the column nullable.
pub trait ColumnValue: Sized {
    /// The column type.
    type Type: FieldType;

    /// Whether the column accepts `NULL`.
    const NULLABLE: bool;

    /// Convert a value read from the column.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DataAccess`] when `NULL` is read into a non-optional value.
    fn from_column(value: Option<<Self::Type as FieldType>::Value>) -> Result<Self>;

    /// The tagged value to bind.
    fn to_data(&self) -> DataType;
}

macro_rules! column_values {
    ($($host:ty => $ty:ident),* $(,)?) => {
        $(
            impl ColumnValue for $host {
                type Type = ty::$ty;

                const NULLABLE: bool = false;

                fn from_column(value: Option<<Self::Type as FieldType>::Value>) -> Result<Self> {
                    value.ok_or_else(|| {
                        Error::from(anyhow!("unexpected NULL in a {} column", ty::$ty::SQL_TYPE))
                    })
                }

                fn to_data(&self) -> DataType {
                    <ty::$ty as FieldType>::wrap(Some(self.clone()))
                }
            }

            impl ColumnValue for Option<$host> {
                type Type = ty::$ty;

                const NULLABLE: bool = true;

                fn from_column(value: Option<<Self::Type as FieldType>::Value>) -> Result<Self> {
                    Ok(value)
                }

                fn to_data(&self) -> DataType {
                    <ty::$ty as FieldType>::wrap(self.clone())
                }
            }
        )*
    };
}

column_values! {
    bool => Bool,
    i32 => Int,
    i64 => BigInt,
    f64 => Double,
    Decimal => Decimal,
    String => Varchar,
    NaiveDate => Date,
    NaiveDateTime => Timestamp,
    Vec<u8> => Binary,
    Uuid => Uuid,
}

/// The [`ObjectFactory`] of an entity, delegating to [`Entity::from_row`].
pub struct EntityFactory<E>(PhantomData<fn() -> E>);

impl<E> EntityFactory<E> {
    /// A factory for `E`.
    #[must_use]
    pub const fn new() -> Self {
        Self(PhantomData)
    }
}

impl<E> Default for EntityFactory<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> fmt::Debug for EntityFactory<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("EntityFactory").field(&std::any::type_name::<E>()).finish()
    }
}

impl<E: Entity> ObjectFactory<E> for EntityFactory<E> {
    fn create(&self, row: &dyn Row) -> Result<E> {
        E::from_row(row)
    }
}

/// Primary-key statements for an entity.
///
/// Keys are passed as values in primary-key field order; a key with the wrong
/// number of values fails with [`crate::Error::ParameterCount`].
pub struct Service<E>(PhantomData<fn() -> E>);

impl<E> Default for Service<E> {
    fn default() -> Self {
        Self(PhantomData)
    }
}

impl<E> fmt::Debug for Service<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Service").field(&std::any::type_name::<E>()).finish()
    }
}

impl<E: Entity> Service<E> {
    /// A service for `E`.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The entity with primary key `key`, if any.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Unsupported`] if the table has no primary key,
    /// [`crate::Error::ParameterCount`] if `key` does not match the key fields,
    /// or [`crate::Error::DataAccess`] if the query fails.
    pub fn select_by_pk(
        &self, connection: &dyn Connection, key: &[DataType],
    ) -> Result<Option<E>> {
        let (fields, predicate) = key_predicate::<E>()?;
        Self::select().r#where(predicate).scoped(connection, |prepared| {
            bind_all(prepared, &fields, key)?;
            prepared.single_result()
        })
    }

    /// Delete the entity with primary key `key`, returning the affected row count.
    ///
    /// # Errors
    ///
    /// As for [`Service::select_by_pk`].
    pub fn delete_by_pk(&self, connection: &dyn Connection, key: &[DataType]) -> Result<u64> {
        let (fields, predicate) = key_predicate::<E>()?;
        E::table().delete_query().r#where(predicate).scoped(connection, |prepared| {
            bind_all(prepared, &fields, key)?;
            prepared.execute()
        })
    }

    /// Insert `entity`, binding every table field.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::NullConstraint`] if a `NULL` is bound to a
    /// non-nullable field, or [`crate::Error::DataAccess`] if the insert fails.
    pub fn insert(&self, connection: &dyn Connection, entity: &E) -> Result<u64> {
        let fields = table_fields::<E>();
        E::table().insert_query().scoped(connection, |prepared| {
            bind_all(prepared, &fields, &entity.to_values())?;
            prepared.execute()
        })
    }

    /// Update every field of the row keyed by `entity`'s primary key.
    ///
    /// SET values are bound first, then the key values.
    ///
    /// # Errors
    ///
    /// As for [`Service::insert`] and [`Service::select_by_pk`].
    pub fn update_by_pk(&self, connection: &dyn Connection, entity: &E) -> Result<u64> {
        let (keys, predicate) = key_predicate::<E>()?;
        let key_values = entity.key_values()?;
        let fields = table_fields::<E>();
        E::table().update_query().r#where(predicate).scoped(connection, |prepared| {
            bind_all(prepared, &fields, &entity.to_values())?;
            bind_all(prepared, &keys, &key_values)?;
            prepared.execute()
        })
    }

    /// Every row of the table, in primary-key order when a key exists.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::DataAccess`] if the query fails.
    pub fn read_all(&self, connection: &dyn Connection) -> Result<Vec<E>> {
        Self::ordered().prepare(connection)?.result_list_and_close()
    }

    /// At most `size` rows after skipping `offset`, in primary-key order when a
    /// key exists.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::DataAccess`] if the query fails.
    pub fn read_page(
        &self, connection: &dyn Connection, offset: u64, size: u64,
    ) -> Result<Vec<E>> {
        Self::ordered().limit(size).offset(offset).prepare(connection)?.result_list_and_close()
    }

    fn select() -> SelectQuery<E> {
        E::table().select_query(Arc::new(EntityFactory::<E>::new()))
    }

    fn ordered() -> SelectQuery<E> {
        let keys = E::table().primary_key().map(|key| key.fields().to_vec()).unwrap_or_default();
        keys.into_iter().fold(Self::select(), |query, key| query.order_by(key))
    }
}

fn table_fields<E: Entity>() -> Vec<ColumnRef> {
    E::table().fields().cloned().collect()
}

fn key_predicate<E: Entity>() -> Result<(Vec<ColumnRef>, Expr)> {
    let fields = E::table().require_primary_key()?.fields().to_vec();
    let predicate = Expr::all(fields.iter().map(Expr::eq));
    Ok((fields, predicate))
}

fn bind_all<Q: SqlQuery>(
    prepared: &Prepared<Q>, fields: &[ColumnRef], values: &[DataType],
) -> Result<()> {
    if fields.len() != values.len() {
        return Err(Error::ParameterCount {
            expected: fields.len(),
            bound: values.len(),
        });
    }
    for (field, value) in fields.iter().zip(values) {
        prepared.bind_value(field, value.clone())?;
    }
    Ok(())
}
