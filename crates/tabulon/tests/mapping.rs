//! Integration tests for result mapping.

#![allow(missing_docs)]

mod common;

use std::sync::Arc;

use anyhow::anyhow;
use common::{Event, Person, Recorder, person_row};
use serde_json::{Value, json};
use tabulon::{
    DataType, Entity, EntityFactory, Error, Filterable, JsonFactory, ObjectFactory, Row,
    ScalarFactory, SelectQuery, SqlQuery, ty,
};

fn people() -> SelectQuery<Person> {
    Person::table().select_query(Arc::new(EntityFactory::<Person>::new()))
}

#[test]
fn single_result_without_rows_is_none() {
    let conn = Recorder::new();
    let person = Person::columns();

    let prepared = people().where_field(&person.id).prepare(&conn).unwrap();
    prepared.add_parameter(5).unwrap();
    assert_eq!(prepared.single_result().unwrap(), None);
    assert_eq!(conn.count(&Event::CloseCursor), 1);
    assert_eq!(conn.count(&Event::CloseStatement), 0);
}

#[test]
fn single_result_takes_the_first_row() {
    let conn = Recorder::new();
    conn.push_rows(vec![person_row(1, Some("Ada"), None), person_row(2, Some("Bob"), Some(1))]);

    let first = people().prepare(&conn).unwrap().single_result_and_close().unwrap();
    assert_eq!(
        first,
        Some(Person {
            id: 1,
            name: Some("Ada".to_string()),
            manager_id: None,
        })
    );
    assert_eq!(conn.count(&Event::CloseCursor), 1);
    assert_eq!(conn.count(&Event::CloseStatement), 1);
}

#[test]
fn result_list_keeps_cursor_order() {
    let conn = Recorder::new();
    conn.push_rows(vec![
        person_row(3, Some("Cy"), Some(1)),
        person_row(1, Some("Ada"), None),
        person_row(2, None, Some(1)),
    ]);
    conn.push_rows(Vec::new());

    let prepared = people().prepare(&conn).unwrap();
    let ids: Vec<_> = prepared.result_list().unwrap().into_iter().map(|p| p.id).collect();
    assert_eq!(ids, [3, 1, 2]);

    assert!(prepared.result_list().unwrap().is_empty());
    assert_eq!(prepared.select_fields().len(), 3);
    prepared.close().unwrap();
}

#[test]
fn factory_error_closes_the_cursor() {
    let conn = Recorder::new();
    conn.push_rows(vec![vec![DataType::from("not an id")]]);
    conn.fail_cursor_close();

    let err = people().prepare(&conn).unwrap().result_list_and_close().unwrap_err();
    assert!(err.is_data_access());
    assert!(err.to_string().contains("holds VARCHAR not INTEGER"));
    assert_eq!(conn.count(&Event::CloseCursor), 1);
    assert_eq!(conn.count(&Event::CloseStatement), 1);
}

#[test]
fn null_in_a_required_field_is_a_mapping_error() {
    let conn = Recorder::new();
    conn.push_rows(vec![vec![DataType::Int32(None), DataType::Str(None), DataType::Int32(None)]]);

    let err = people().prepare(&conn).unwrap().single_result_and_close().unwrap_err();
    assert!(matches!(err, Error::DataAccess(_)));
}

#[test]
fn closure_and_scalar_factories() {
    let conn = Recorder::new();
    let person = Person::columns();
    conn.push_rows(vec![vec![DataType::from("Ada"), DataType::from(1)]]);
    conn.push_rows(vec![vec![DataType::Int64(Some(42))]]);

    let labels = |row: &dyn Row| -> tabulon::Result<String> {
        let name = person.name.read(row, 1)?.unwrap_or_default();
        let id = person.id.read(row, 2)?.ok_or_else(|| Error::from(anyhow!("no id")))?;
        Ok(format!("{name}#{id}"))
    };
    let factory: Arc<dyn ObjectFactory<String>> = Arc::new(labels);
    let fields = [person.name.column(), person.id.column()];
    let labels = SelectQuery::from_fields(fields, Person::table().table_name(), factory)
        .prepare(&conn)
        .unwrap()
        .result_list_and_close()
        .unwrap();
    assert_eq!(labels, ["Ada#1"]);

    let count = tabulon::BigIntField::count();
    let factory: Arc<dyn ObjectFactory<Option<i64>>> =
        Arc::new(ScalarFactory::<ty::BigInt>::new());
    let total = SelectQuery::from_fields([&count], Person::table().table_name(), factory)
        .prepare(&conn)
        .unwrap()
        .single_result_and_close()
        .unwrap();
    assert_eq!(total, Some(Some(42)));
    assert_eq!(conn.prepared()[1], "SELECT COUNT(*) as f1\nFROM person");
}

#[test]
fn json_rows() {
    let conn = Recorder::new();
    conn.push_rows(vec![person_row(1, Some("Ada"), None)]);

    let factory: Arc<dyn ObjectFactory<Value>> = Arc::new(JsonFactory::for_table(Person::table()));
    let rows = Person::table().select_query(factory).prepare(&conn).unwrap();
    let rows = rows.result_list_and_close().unwrap();
    assert_eq!(rows, [json!({"id": 1, "name": "Ada", "manager_id": null})]);
}
