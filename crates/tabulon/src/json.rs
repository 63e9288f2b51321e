//! Rows as JSON objects.

use base64ct::{Base64, Encoding};
use serde_json::{Map, Value};

use crate::driver::Row;
use crate::error::Result;
use crate::field::ColumnRef;
use crate::mapping::ObjectFactory;
use crate::table::Table;
use crate::value::DataType;

/// Maps a row to a JSON object keyed by select-field name.
///
/// Columns are read positionally, so the factory must list the same fields,
/// in the same order, as the query it maps. Binary values are base64 encoded;
/// decimals, dates, timestamps and UUIDs are rendered as strings.
#[derive(Debug, Clone)]
pub struct JsonFactory {
    fields: Vec<ColumnRef>,
}

impl JsonFactory {
    /// Maps rows selecting `fields`.
    pub fn new<I>(fields: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<ColumnRef>,
    {
        Self {
            fields: fields.into_iter().map(Into::into).collect(),
        }
    }

    /// Maps rows selecting every field of `table`.
    #[must_use]
    pub fn for_table(table: &Table) -> Self {
        Self::new(table.fields())
    }
}

impl ObjectFactory<Value> for JsonFactory {
    fn create(&self, row: &dyn Row) -> Result<Value> {
        let mut map = Map::new();
        for (i, field) in self.fields.iter().enumerate() {
            let value = field.read(row, i + 1)?;
            map.insert(field.name(), to_json(value));
        }
        Ok(Value::Object(map))
    }
}

/// Convert a tagged value to JSON; SQL `NULL` becomes `null`.
#[must_use]
pub fn to_json(value: DataType) -> Value {
    match value {
        DataType::Boolean(Some(v)) => Value::Bool(v),
        DataType::Int32(Some(v)) => Value::Number(v.into()),
        DataType::Int64(Some(v)) => Value::Number(v.into()),
        DataType::Double(Some(v)) => {
            serde_json::Number::from_f64(v).map_or(Value::Null, Value::Number)
        }
        DataType::Decimal(Some(v)) => Value::String(v.to_string()),
        DataType::Char(Some(v)) | DataType::Str(Some(v)) => Value::String(v),
        DataType::Date(Some(v)) => Value::String(v.to_string()),
        DataType::Timestamp(Some(v)) => Value::String(v.to_string()),
        DataType::Binary(Some(v)) => Value::String(Base64::encode_string(&v)),
        DataType::Uuid(Some(v)) => Value::String(v.to_string()),
        DataType::Boolean(None)
        | DataType::Int32(None)
        | DataType::Int64(None)
        | DataType::Double(None)
        | DataType::Decimal(None)
        | DataType::Char(None)
        | DataType::Str(None)
        | DataType::Date(None)
        | DataType::Timestamp(None)
        | DataType::Binary(None)
        | DataType::Uuid(None) => Value::Null,
    }
}

#[cfg(test)]
mod tests {
    use anyhow::anyhow;
    use chrono::NaiveDate;
    use serde_json::json;

    use super::*;
    use crate::field::ty;
    use crate::value::SqlType;

    struct VecRow(Vec<DataType>);

    impl Row for VecRow {
        fn len(&self) -> usize {
            self.0.len()
        }

        fn get(&self, index: usize, sql_type: SqlType) -> anyhow::Result<DataType> {
            let value = self.0.get(index - 1).ok_or_else(|| anyhow!("no column {index}"))?;
            if value.sql_type() != sql_type {
                return Err(anyhow!("column {index} is not {sql_type}"));
            }
            Ok(value.clone())
        }
    }

    #[test]
    fn row_to_object() {
        let mut builder = Table::builder("", "document");
        builder.not_null::<ty::Int>("id");
        builder.nullable::<ty::Varchar>("title");
        builder.nullable::<ty::Binary>("body");
        builder.nullable::<ty::Date>("published");
        let table = builder.build().expect("document");

        let row = VecRow(vec![
            DataType::from(7),
            DataType::Str(None),
            DataType::from(b"hello".as_slice()),
            DataType::from(NaiveDate::from_ymd_opt(2024, 2, 29).expect("date")),
        ]);
        let value = JsonFactory::for_table(&table).create(&row).expect("json");
        assert_eq!(
            value,
            json!({"id": 7, "title": null, "body": "aGVsbG8=", "published": "2024-02-29"})
        );
    }

    #[test]
    fn read_failure_is_data_access() {
        let factory = JsonFactory::new([ColumnRef::empty(SqlType::Integer)]);
        let err = factory.create(&VecRow(vec![DataType::from("text")])).unwrap_err();
        assert!(err.is_data_access());
    }
}
