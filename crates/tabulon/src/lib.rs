//! Typed SQL query building over a plain database access capability.
//!
//! Tables and their typed fields are declared once. Queries are composed from
//! fields and expressions, rendered to SQL with `?` placeholders, prepared on a
//! [`Connection`], bound positionally and executed. Read queries map rows to
//! values through an [`ObjectFactory`].
//!
//! # Quick Start
//!
//! ## Declare a table
//!
//! ```ignore
//! entity! {
//!     table = ("hr", "person"),
//!     columns = PersonColumns,
//!     key = [id],
//!     #[derive(Debug, Clone)]
//!     pub struct Person {
//!         pub id: i32,
//!         pub name: Option<String>,
//!         pub manager_id: Option<i32>,
//!     }
//! }
//! ```
//!
//! ## Query it
//!
//! ```ignore
//! let person = Person::columns();
//!
//! // SELECT hr.person.id as f1, ... FROM hr.person WHERE hr.person.name like ?
//! let query = Person::table()
//!     .select_query(Arc::new(EntityFactory::<Person>::new()))
//!     .r#where(Expr::like(&person.name))
//!     .order_by(person.id.desc())
//!     .limit(10);
//!
//! let people = query.scoped(&conn, |prepared| {
//!     prepared.bind(&person.name, Some("A%".to_string()))?;
//!     prepared.result_list()
//! })?;
//! ```
//!
//! ## Primary-key services
//!
//! ```ignore
//! let service = Service::<Person>::new();
//! service.insert(&conn, &Person { id: 1, name: Some("Ada".into()), manager_id: None })?;
//! let ada = service.select_by_pk(&conn, &[1.into()])?;
//! ```
//!
//! ## Vendor operators
//!
//! ```ignore
//! let query = Person::table().select_query(factory).with_dialect(Dialect::PostgreSql);
//! let name = query.where_builder().field(&person.name).ilike()?.param(&person.name).build();
//! let query = query.r#where(name);
//! ```
//!
//! Backends implement the [`driver`] traits; see `tabulon-sqlite`.

mod builder;
mod delete;
mod dialect;
pub mod driver;
mod entity;
mod error;
mod expr;
mod field;
mod filter;
mod insert;
mod join;
mod json;
mod mapping;
mod query;
mod recursive;
mod relationship;
mod select;
mod simple;
mod table;
mod union;
mod update;
mod value;

pub use builder::WhereBuilder;
pub use delete::DeleteQuery;
pub use dialect::{CustomOperators, Dialect, PostgresOperators};
pub use driver::{Backend, Connection, Cursor, FromEnv, Row, Statement};
pub use entity::{ColumnValue, Entity, EntityFactory, Service};
pub use error::{Error, Result};
pub use expr::{Binary, Expr};
pub use field::{
    BigIntField, BinaryField, BoolField, CharField, ColumnRef, DateField, DecimalField,
    Decoration, DoubleField, Field, FieldType, IntField, TimestampField, UuidField, VarcharField,
    ty,
};
pub use filter::{Filter, Filterable};
pub use insert::InsertQuery;
pub use join::{Join, JoinKind};
pub use json::{JsonFactory, to_json};
pub use mapping::{ObjectFactory, ScalarFactory};
pub use query::{BoundParameter, Executable, Prepared, QueryState, Readable, SqlQuery};
pub use recursive::RecursiveQuery;
pub use relationship::{Cardinality, RelatedFields, Relationship};
pub use select::SelectQuery;
pub use simple::SimpleSelect;
pub use table::{PrimaryKey, Table, TableBuilder, TableName};
pub use union::UnionQuery;
pub use update::UpdateQuery;
pub use value::{DataType, SqlType};
