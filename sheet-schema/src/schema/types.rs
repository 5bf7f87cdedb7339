//! Semantic column types and their SQL / ORM spellings.

use std::fmt;
use std::str::FromStr;

use arrow::datatypes::DataType;
use serde::{Deserialize, Serialize};

/// Semantic type tag attached to every inferred column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SemanticType {
    Integer,
    Float,
    Boolean,
    Datetime,
    #[default]
    Text,
}

impl SemanticType {
    /// Maps an Arrow type reported by the decoder onto a semantic tag.
    ///
    /// String columns map to `Text` here; the decoder may refine them later by
    /// sampling values.
    pub fn from_arrow(data_type: &DataType) -> Self {
        match data_type {
            DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64 => SemanticType::Integer,
            DataType::Float16
            | DataType::Float32
            | DataType::Float64
            | DataType::Decimal128(_, _)
            | DataType::Decimal256(_, _) => SemanticType::Float,
            DataType::Boolean => SemanticType::Boolean,
            DataType::Date32
            | DataType::Date64
            | DataType::Time32(_)
            | DataType::Time64(_)
            | DataType::Timestamp(_, _) => SemanticType::Datetime,
            _ => SemanticType::Text,
        }
    }

    /// Returns the lower-case tag used in JSON payloads.
    pub fn as_str(&self) -> &'static str {
        match self {
            SemanticType::Integer => "integer",
            SemanticType::Float => "float",
            SemanticType::Boolean => "boolean",
            SemanticType::Datetime => "datetime",
            SemanticType::Text => "text",
        }
    }

    /// Column type used in generated `CREATE TABLE` statements.
    pub fn sql_type(&self) -> &'static str {
        match self {
            SemanticType::Integer => "INTEGER",
            SemanticType::Float => "FLOAT",
            SemanticType::Boolean => "BOOLEAN",
            SemanticType::Datetime => "TIMESTAMP",
            SemanticType::Text => "TEXT",
        }
    }

    /// SQLAlchemy column type used in generated ORM classes.
    pub fn orm_type(&self) -> &'static str {
        match self {
            SemanticType::Integer => "Integer",
            SemanticType::Float => "Float",
            SemanticType::Boolean => "Boolean",
            SemanticType::Datetime => "DateTime",
            SemanticType::Text => "String",
        }
    }

    /// Whether values of this type compare numerically.
    pub fn is_numeric(&self) -> bool {
        matches!(self, SemanticType::Integer | SemanticType::Float)
    }
}

impl fmt::Display for SemanticType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SemanticType {
    type Err = std::convert::Infallible;

    /// Parses loose type names ("int64", "double", "timestamp", ...).
    /// Anything unrecognised is `Text`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.to_ascii_lowercase();
        let parsed = if lower.contains("int") {
            SemanticType::Integer
        } else if lower.contains("float") || lower.contains("double") || lower.contains("decimal")
        {
            SemanticType::Float
        } else if lower.contains("bool") {
            SemanticType::Boolean
        } else if lower.contains("date") || lower.contains("time") {
            SemanticType::Datetime
        } else {
            SemanticType::Text
        };
        Ok(parsed)
    }
}
