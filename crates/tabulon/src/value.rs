//! Typed values exchanged with the database capability.

use std::fmt;

use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use uuid::Uuid;

/// Column type tag used when binding and reading values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SqlType {
    /// `BOOLEAN`
    Boolean,
    /// 32-bit `INTEGER`
    Integer,
    /// 64-bit `BIGINT`
    BigInt,
    /// `DOUBLE PRECISION`
    Double,
    /// arbitrary precision `NUMERIC`
    Numeric,
    /// fixed width `CHAR`
    Char,
    /// `VARCHAR` / `TEXT`
    Varchar,
    /// calendar `DATE`
    Date,
    /// `TIMESTAMP` without time zone
    Timestamp,
    /// `BLOB` / `BYTEA`
    Binary,
    /// `UUID`
    Uuid,
}

impl fmt::Display for SqlType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Boolean => "BOOLEAN",
            Self::Integer => "INTEGER",
            Self::BigInt => "BIGINT",
            Self::Double => "DOUBLE",
            Self::Numeric => "NUMERIC",
            Self::Char => "CHAR",
            Self::Varchar => "VARCHAR",
            Self::Date => "DATE",
            Self::Timestamp => "TIMESTAMP",
            Self::Binary => "BINARY",
            Self::Uuid => "UUID",
        };
        f.write_str(name)
    }
}

/// A nullable value tagged with its SQL type. `None` is SQL `NULL` of that type.
#[derive(Debug, Clone, PartialEq)]
pub enum DataType {
    /// Boolean value.
    Boolean(Option<bool>),
    /// 32-bit integer.
    Int32(Option<i32>),
    /// 64-bit integer.
    Int64(Option<i64>),
    /// Double precision float.
    Double(Option<f64>),
    /// Arbitrary precision decimal.
    Decimal(Option<Decimal>),
    /// Fixed width character string.
    Char(Option<String>),
    /// Variable width character string.
    Str(Option<String>),
    /// Calendar date.
    Date(Option<NaiveDate>),
    /// Date and time without time zone.
    Timestamp(Option<NaiveDateTime>),
    /// Raw bytes.
    Binary(Option<Vec<u8>>),
    /// UUID.
    Uuid(Option<Uuid>),
}

impl DataType {
    /// Typed SQL `NULL`.
    #[must_use]
    pub const fn null(sql_type: SqlType) -> Self {
        match sql_type {
            SqlType::Boolean => Self::Boolean(None),
            SqlType::Integer => Self::Int32(None),
            SqlType::BigInt => Self::Int64(None),
            SqlType::Double => Self::Double(None),
            SqlType::Numeric => Self::Decimal(None),
            SqlType::Char => Self::Char(None),
            SqlType::Varchar => Self::Str(None),
            SqlType::Date => Self::Date(None),
            SqlType::Timestamp => Self::Timestamp(None),
            SqlType::Binary => Self::Binary(None),
            SqlType::Uuid => Self::Uuid(None),
        }
    }

    /// Fixed width character value.
    #[must_use]
    pub fn char(value: impl Into<String>) -> Self {
        Self::Char(Some(value.into()))
    }

    /// The type tag of this value.
    #[must_use]
    pub const fn sql_type(&self) -> SqlType {
        match self {
            Self::Boolean(_) => SqlType::Boolean,
            Self::Int32(_) => SqlType::Integer,
            Self::Int64(_) => SqlType::BigInt,
            Self::Double(_) => SqlType::Double,
            Self::Decimal(_) => SqlType::Numeric,
            Self::Char(_) => SqlType::Char,
            Self::Str(_) => SqlType::Varchar,
            Self::Date(_) => SqlType::Date,
            Self::Timestamp(_) => SqlType::Timestamp,
            Self::Binary(_) => SqlType::Binary,
            Self::Uuid(_) => SqlType::Uuid,
        }
    }

    /// Returns `true` for SQL `NULL`.
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(
            self,
            Self::Boolean(None)
                | Self::Int32(None)
                | Self::Int64(None)
                | Self::Double(None)
                | Self::Decimal(None)
                | Self::Char(None)
                | Self::Str(None)
                | Self::Date(None)
                | Self::Timestamp(None)
                | Self::Binary(None)
                | Self::Uuid(None)
        )
    }
}

macro_rules! data_type_from {
    ($($host:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$host> for DataType {
                fn from(value: $host) -> Self {
                    Self::$variant(Some(value.into()))
                }
            }

            impl From<Option<$host>> for DataType {
                fn from(value: Option<$host>) -> Self {
                    Self::$variant(value.map(Into::into))
                }
            }
        )*
    };
}

data_type_from! {
    bool => Boolean,
    i32 => Int32,
    i64 => Int64,
    f64 => Double,
    Decimal => Decimal,
    String => Str,
    &str => Str,
    NaiveDate => Date,
    NaiveDateTime => Timestamp,
    Vec<u8> => Binary,
    &[u8] => Binary,
    Uuid => Uuid,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_carries_its_type() {
        for sql_type in [
            SqlType::Boolean,
            SqlType::Integer,
            SqlType::BigInt,
            SqlType::Double,
            SqlType::Numeric,
            SqlType::Char,
            SqlType::Varchar,
            SqlType::Date,
            SqlType::Timestamp,
            SqlType::Binary,
            SqlType::Uuid,
        ] {
            let null = DataType::null(sql_type);
            assert!(null.is_null());
            assert_eq!(null.sql_type(), sql_type);
        }
    }

    #[test]
    fn host_conversions() {
        assert_eq!(DataType::from(7), DataType::Int32(Some(7)));
        assert_eq!(DataType::from(7_i64), DataType::Int64(Some(7)));
        assert_eq!(DataType::from("ada"), DataType::Str(Some("ada".to_string())));
        assert_eq!(DataType::from(None::<bool>), DataType::Boolean(None));
        assert_eq!(DataType::char("Y").sql_type(), SqlType::Char);
        assert!(!DataType::from(&b"\x00"[..]).is_null());
    }
}
