// Schema Module
//
// Ordered column names with a shared name to position lookup, plus the kind
// of values each column holds. Kinds are declared by typed table files or
// inferred from stored rows, and let the planner reject mismatched
// comparisons before any row is read.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::query::executor::result::{exact_integer, DataValue, QueryError, QueryResult, ValueKind};

/// Data types a table file may declare for its columns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DataType {
    Integer,
    Float,
    Text,
    Boolean,
}

impl DataType {
    /// Convert a string representation to a DataType
    pub fn from_str(s: &str) -> QueryResult<Self> {
        match s.to_uppercase().as_str() {
            "INT" | "INTEGER" => Ok(DataType::Integer),
            "FLOAT" | "REAL" | "DOUBLE" => Ok(DataType::Float),
            "STR" | "TEXT" | "VARCHAR" | "STRING" => Ok(DataType::Text),
            "BOOL" | "BOOLEAN" => Ok(DataType::Boolean),
            _ => Err(QueryError::SchemaError(format!("Unknown data type: {}", s))),
        }
    }

    /// Coerce a loaded value into this type. Nulls pass through.
    pub fn coerce(&self, value: DataValue) -> QueryResult<DataValue> {
        match (self, value) {
            (_, DataValue::Null) => Ok(DataValue::Null),

            (DataType::Integer, DataValue::Integer(i)) => Ok(DataValue::Integer(i)),
            (DataType::Integer, DataValue::Float(f)) => exact_integer(f)
                .map(DataValue::Integer)
                .ok_or_else(|| QueryError::TypeError(format!("Float {} is not an Integer in range", f))),
            (DataType::Integer, DataValue::Text(s)) => s.trim().parse::<i64>()
                .map(DataValue::Integer)
                .map_err(|e| QueryError::TypeError(format!("Cannot convert Text '{}' to Integer: {}", s, e))),

            (DataType::Float, DataValue::Integer(i)) => Ok(DataValue::Float(i as f64)),
            (DataType::Float, DataValue::Float(f)) => Ok(DataValue::Float(f)),
            (DataType::Float, DataValue::Text(s)) => s.trim().parse::<f64>()
                .map(DataValue::Float)
                .map_err(|e| QueryError::TypeError(format!("Cannot convert Text '{}' to Float: {}", s, e))),

            (DataType::Text, DataValue::Text(s)) => Ok(DataValue::Text(s)),
            (DataType::Text, DataValue::Integer(i)) => Ok(DataValue::Text(i.to_string())),
            (DataType::Text, DataValue::Float(f)) => Ok(DataValue::Text(f.to_string())),
            (DataType::Text, DataValue::Boolean(b)) => Ok(DataValue::Text(b.to_string())),

            (DataType::Boolean, DataValue::Boolean(b)) => Ok(DataValue::Boolean(b)),
            (DataType::Boolean, DataValue::Text(s)) => {
                if s.eq_ignore_ascii_case("true") {
                    Ok(DataValue::Boolean(true))
                } else if s.eq_ignore_ascii_case("false") {
                    Ok(DataValue::Boolean(false))
                } else {
                    Err(QueryError::TypeError(format!("Cannot convert Text '{}' to Boolean", s)))
                }
            }

            (target, other) => Err(QueryError::TypeError(format!("Cannot convert {} to {:?}", other, target))),
        }
    }

    /// Type of a non-null value
    pub fn of(value: &DataValue) -> Option<DataType> {
        match value {
            DataValue::Null => None,
            DataValue::Boolean(_) => Some(DataType::Boolean),
            DataValue::Integer(_) => Some(DataType::Integer),
            DataValue::Float(_) => Some(DataType::Float),
            DataValue::Text(_) => Some(DataType::Text),
        }
    }

    /// Comparable kind of values of this type
    pub fn kind(&self) -> ValueKind {
        match self {
            DataType::Integer | DataType::Float => ValueKind::Number,
            DataType::Text => ValueKind::Text,
            DataType::Boolean => ValueKind::Boolean,
        }
    }
}

/// What is known about the values of one column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ColumnType {
    /// Nothing declared and no non-null value seen
    #[default]
    Unknown,
    /// Every non-null value has this type
    Typed(DataType),
    /// Non-null values of incomparable kinds
    Mixed,
}

impl ColumnType {
    /// Widen with the type of one more value; integers and floats widen to float
    pub fn widen(self, value: &DataValue) -> ColumnType {
        let Some(seen) = DataType::of(value) else {
            return self;
        };
        match self {
            ColumnType::Unknown => ColumnType::Typed(seen),
            ColumnType::Typed(current) if current == seen => self,
            ColumnType::Typed(current) if current.kind() == seen.kind() => ColumnType::Typed(DataType::Float),
            ColumnType::Typed(_) | ColumnType::Mixed => ColumnType::Mixed,
        }
    }
}

/// Ordered, unique column names of one table and their column types
#[derive(Debug, Clone, PartialEq)]
pub struct Schema {
    columns: Vec<String>,
    types: Vec<ColumnType>,
    column_map: HashMap<String, usize>,
}

impl Schema {
    /// Build a schema of untyped columns, rejecting duplicate column names
    pub fn new(columns: Vec<String>) -> QueryResult<Self> {
        let types = vec![ColumnType::Unknown; columns.len()];
        Schema::with_types(columns, types)
    }

    /// Build a schema with one column type per column
    pub fn with_types(columns: Vec<String>, types: Vec<ColumnType>) -> QueryResult<Self> {
        if types.len() != columns.len() {
            return Err(QueryError::SchemaError(format!(
                "{} column types given for {} columns",
                types.len(),
                columns.len()
            )));
        }
        let mut column_map = HashMap::with_capacity(columns.len());
        for (i, name) in columns.iter().enumerate() {
            if column_map.insert(name.clone(), i).is_some() {
                return Err(QueryError::SchemaError(format!("Duplicate column: {}", name)));
            }
        }
        Ok(Schema { columns, types, column_map })
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn types(&self) -> &[ColumnType] {
        &self.types
    }

    /// Type of the column at a position
    pub fn column_type(&self, index: usize) -> ColumnType {
        self.types.get(index).copied().unwrap_or_default()
    }

    /// Same column types under new names
    pub fn renamed(&self, columns: Vec<String>) -> QueryResult<Schema> {
        Schema::with_types(columns, self.types.clone())
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Get the column index for a column name
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.column_map.get(name).copied()
    }

    /// Concatenate two schemas; the column sets must be disjoint
    pub fn merge(&self, other: &Schema) -> QueryResult<Schema> {
        let mut columns = self.columns.clone();
        columns.extend(other.columns.iter().cloned());
        let mut types = self.types.clone();
        types.extend(other.types.iter().copied());
        Schema::with_types(columns, types)
    }
}
