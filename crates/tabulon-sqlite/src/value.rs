//! Conversions between tagged values and `SQLite` storage classes.
//!
//! `SQLite` stores booleans as 0/1 integers and has no decimal, date, timestamp
//! or UUID class: those are stored as text.

use anyhow::{Context, Result, bail};
use chrono::{NaiveDate, NaiveDateTime};
use rusqlite::types::Value;
use rust_decimal::Decimal;
use tabulon::{DataType, SqlType};
use uuid::Uuid;

const DATE_FORMAT: &str = "%Y-%m-%d";
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";

pub fn to_sqlite(value: &DataType) -> Value {
    match value {
        DataType::Boolean(Some(b)) => Value::Integer(i64::from(*b)),
        DataType::Int32(Some(i)) => Value::Integer(i64::from(*i)),
        DataType::Int64(Some(i)) => Value::Integer(*i),
        DataType::Double(Some(f)) => Value::Real(*f),
        DataType::Decimal(Some(d)) => Value::Text(d.to_string()),
        DataType::Char(Some(s)) | DataType::Str(Some(s)) => Value::Text(s.clone()),
        DataType::Date(Some(d)) => Value::Text(d.format(DATE_FORMAT).to_string()),
        DataType::Timestamp(Some(ts)) => Value::Text(ts.format(TIMESTAMP_FORMAT).to_string()),
        DataType::Binary(Some(b)) => Value::Blob(b.clone()),
        DataType::Uuid(Some(u)) => Value::Text(u.to_string()),
        // All None variants map to NULL
        _ => Value::Null,
    }
}

#[allow(clippy::cast_precision_loss)]
pub fn from_sqlite(value: &Value, sql_type: SqlType) -> Result<DataType> {
    if matches!(value, Value::Null) {
        return Ok(DataType::null(sql_type));
    }

    let data = match (sql_type, value) {
        (SqlType::Boolean, Value::Integer(i)) => DataType::from(*i != 0),
        (SqlType::Integer, Value::Integer(i)) => {
            DataType::from(i32::try_from(*i).context("integer out of range")?)
        }
        (SqlType::BigInt, Value::Integer(i)) => DataType::from(*i),
        (SqlType::Double, Value::Real(f)) => DataType::from(*f),
        (SqlType::Double, Value::Integer(i)) => DataType::from(*i as f64),
        (SqlType::Numeric, Value::Text(s)) => {
            DataType::from(s.parse::<Decimal>().context("invalid decimal")?)
        }
        (SqlType::Numeric, Value::Integer(i)) => DataType::from(Decimal::from(*i)),
        (SqlType::Numeric, Value::Real(f)) => {
            DataType::from(Decimal::try_from(*f).context("invalid decimal")?)
        }
        (SqlType::Char, Value::Text(s)) => DataType::char(s.as_str()),
        (SqlType::Varchar, Value::Text(s)) => DataType::from(s.as_str()),
        (SqlType::Date, Value::Text(s)) => {
            DataType::from(NaiveDate::parse_from_str(s, DATE_FORMAT).context("invalid date")?)
        }
        (SqlType::Timestamp, Value::Text(s)) => DataType::from(
            NaiveDateTime::parse_from_str(s, TIMESTAMP_FORMAT).context("invalid timestamp")?,
        ),
        (SqlType::Binary, Value::Blob(b)) => DataType::from(b.as_slice()),
        (SqlType::Uuid, Value::Text(s)) => {
            DataType::from(Uuid::parse_str(s).context("invalid uuid")?)
        }
        (SqlType::Uuid, Value::Blob(b)) => {
            DataType::from(Uuid::from_slice(b).context("invalid uuid")?)
        }
        (sql_type, value) => bail!("cannot read {:?} as {sql_type}", value.data_type()),
    };
    Ok(data)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_classes() {
        assert_eq!(to_sqlite(&DataType::from(true)), Value::Integer(1));
        assert_eq!(to_sqlite(&DataType::Int32(None)), Value::Null);
        assert_eq!(to_sqlite(&DataType::char("Y")), Value::Text("Y".to_string()));

        let day = NaiveDate::from_ymd_opt(2024, 2, 29).expect("valid date");
        assert_eq!(to_sqlite(&DataType::from(day)), Value::Text("2024-02-29".to_string()));

        let at = day.and_hms_milli_opt(13, 5, 9, 250).expect("valid time");
        let stored = to_sqlite(&DataType::from(at));
        assert_eq!(stored, Value::Text("2024-02-29 13:05:09.250".to_string()));
        let read = from_sqlite(&stored, SqlType::Timestamp).expect("timestamp");
        assert_eq!(read, DataType::from(at));
    }

    #[test]
    fn reads_by_requested_type() {
        assert_eq!(
            from_sqlite(&Value::Integer(0), SqlType::Boolean).expect("bool"),
            DataType::from(false)
        );
        assert_eq!(
            from_sqlite(&Value::Integer(3), SqlType::Double).expect("double"),
            DataType::from(3.0)
        );
        assert_eq!(
            from_sqlite(&Value::Text("12.50".to_string()), SqlType::Numeric).expect("decimal"),
            DataType::from(Decimal::new(1250, 2))
        );
        assert_eq!(
            from_sqlite(&Value::Null, SqlType::Uuid).expect("null"),
            DataType::Uuid(None)
        );
    }

    #[test]
    fn rejects_mismatched_values() {
        let err = from_sqlite(&Value::Text("x".to_string()), SqlType::Integer).unwrap_err();
        assert_eq!(err.to_string(), "cannot read Text as INTEGER");
        assert!(from_sqlite(&Value::Integer(i64::MAX), SqlType::Integer).is_err());
        assert!(from_sqlite(&Value::Text("2024-13-01".to_string()), SqlType::Date).is_err());
    }
}
