// Query Result Implementation
//
// This module defines the value, row, error and result set types shared by
// the catalog, the planner and the executor.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

use linked_hash_map::LinkedHashMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// Possible data types for values in a row
///
/// Equality and hashing are numeric across `Integer` and `Float`: `1` equals
/// `1.0` and `0.0` equals `-0.0`, matching the where-clause `=`.
#[derive(Debug, Clone)]
pub enum DataValue {
    Null,
    Boolean(bool),
    Integer(i64),
    Float(f64),
    Text(String),
}

/// The comparable kind of a value. Integers and floats share the number kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Null,
    Boolean,
    Number,
    Text,
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ValueKind::Null => "null",
            ValueKind::Boolean => "boolean",
            ValueKind::Number => "number",
            ValueKind::Text => "text",
        };
        write!(f, "{}", name)
    }
}

/// The integer a float holds exactly, if it is integral and within `i64` range
pub fn exact_integer(f: f64) -> Option<i64> {
    if f.fract() == 0.0 && f >= i64::MIN as f64 && f < i64::MAX as f64 {
        Some(f as i64)
    } else {
        None
    }
}

impl PartialEq for DataValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (DataValue::Null, DataValue::Null) => true,
            (DataValue::Boolean(a), DataValue::Boolean(b)) => a == b,
            (DataValue::Integer(a), DataValue::Integer(b)) => a == b,
            (DataValue::Float(a), DataValue::Float(b)) => a == b || (a.is_nan() && b.is_nan()),
            (DataValue::Integer(i), DataValue::Float(f)) | (DataValue::Float(f), DataValue::Integer(i)) => {
                exact_integer(*f) == Some(*i)
            }
            (DataValue::Text(a), DataValue::Text(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for DataValue {}

// Must agree with `eq`: integral floats hash as the integer they hold
impl Hash for DataValue {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match self {
            DataValue::Null => 0.hash(state),
            DataValue::Boolean(b) => { 1.hash(state); b.hash(state); }
            DataValue::Integer(i) => { 2.hash(state); i.hash(state); }
            DataValue::Float(f) => match exact_integer(*f) {
                Some(i) => { 2.hash(state); i.hash(state); }
                None if f.is_nan() => { 3.hash(state); f64::NAN.to_bits().hash(state); }
                None => { 3.hash(state); f.to_bits().hash(state); }
            },
            DataValue::Text(s) => { 4.hash(state); s.hash(state); }
        }
    }
}

impl fmt::Display for DataValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataValue::Null => write!(f, "NULL"),
            DataValue::Boolean(b) => write!(f, "{}", b),
            DataValue::Integer(i) => write!(f, "{}", i),
            DataValue::Float(fl) => write!(f, "{}", fl),
            DataValue::Text(s) => write!(f, "\"{}\"", s),
        }
    }
}

impl PartialOrd for DataValue {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (DataValue::Null, DataValue::Null) => Some(Ordering::Equal),
            (DataValue::Null, _) => Some(Ordering::Less),
            (_, DataValue::Null) => Some(Ordering::Greater),

            (DataValue::Integer(a), DataValue::Integer(b)) => a.partial_cmp(b),
            (DataValue::Float(a), DataValue::Float(b)) => a.partial_cmp(b),
            (DataValue::Integer(a), DataValue::Float(b)) => match exact_integer(*b) {
                Some(b) => Some(a.cmp(&b)),
                None => (*a as f64).partial_cmp(b),
            },
            (DataValue::Float(a), DataValue::Integer(b)) => match exact_integer(*a) {
                Some(a) => Some(a.cmp(b)),
                None => a.partial_cmp(&(*b as f64)),
            },
            (DataValue::Text(a), DataValue::Text(b)) => Some(a.cmp(b)),
            (DataValue::Boolean(a), DataValue::Boolean(b)) => a.partial_cmp(b),

            _ => None,
        }
    }
}

impl DataValue {
    pub fn kind(&self) -> ValueKind {
        match self {
            DataValue::Null => ValueKind::Null,
            DataValue::Boolean(_) => ValueKind::Boolean,
            DataValue::Integer(_) | DataValue::Float(_) => ValueKind::Number,
            DataValue::Text(_) => ValueKind::Text,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, DataValue::Null)
    }

    /// Compare two DataValues for sorting purposes.
    /// Handles NULLs (NULLs are considered less than any non-NULL value).
    /// Returns Ordering or QueryError for incompatible types.
    pub fn compare(&self, other: &Self) -> QueryResult<Ordering> {
        match (self, other) {
            (DataValue::Null, DataValue::Null) => Ok(Ordering::Equal),
            (DataValue::Null, _) => Ok(Ordering::Less), // Nulls first
            (_, DataValue::Null) => Ok(Ordering::Greater),
            (a, b) => a.partial_cmp(b).ok_or_else(||
                QueryError::TypeError(format!("Cannot compare {} value {} with {} value {}", a.kind(), a, b.kind(), b))
            )
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            DataValue::Integer(i) => Some(*i as f64),
            DataValue::Float(f) => Some(*f),
            _ => None,
        }
    }
}

// Values travel as plain JSON scalars in query descriptors, table files and
// serialized results.
impl Serialize for DataValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            DataValue::Null => serializer.serialize_none(),
            DataValue::Boolean(b) => serializer.serialize_bool(*b),
            DataValue::Integer(i) => serializer.serialize_i64(*i),
            DataValue::Float(f) => serializer.serialize_f64(*f),
            DataValue::Text(s) => serializer.serialize_str(s),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum JsonScalar {
    Null,
    Boolean(bool),
    Integer(i64),
    Float(f64),
    Text(String),
}

impl<'de> Deserialize<'de> for DataValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(match JsonScalar::deserialize(deserializer)? {
            JsonScalar::Null => DataValue::Null,
            JsonScalar::Boolean(b) => DataValue::Boolean(b),
            JsonScalar::Integer(i) => DataValue::Integer(i),
            JsonScalar::Float(f) => DataValue::Float(f),
            JsonScalar::Text(s) => DataValue::Text(s),
        })
    }
}

/// A row of values, positionally aligned with the schema of the table or
/// stage that produced it
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Row {
    values: Vec<DataValue>,
}

impl Row {
    /// Create a row from values in schema order
    pub fn from_values(values: Vec<DataValue>) -> Self {
        Row { values }
    }

    /// Get a value by column position
    pub fn get(&self, index: usize) -> Option<&DataValue> {
        self.values.get(index)
    }

    /// Get all values in column order
    pub fn values(&self) -> &[DataValue] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Combine this row with another, left values first
    pub fn concat(&self, other: &Row) -> Row {
        let mut values = Vec::with_capacity(self.values.len() + other.values.len());
        values.extend(self.values.iter().cloned());
        values.extend(other.values.iter().cloned());
        Row { values }
    }
}

/// Kind of a query failure, independent of its message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ErrorKind {
    UnknownTable,
    UnknownColumn,
    TypeError,
    SchemaError,
    AggregationError,
    DivisionByZero,
    NumericOverflow,
    InvalidQuery,
    StorageError,
}

/// Represents query execution error
#[derive(Error, Debug, Clone, PartialEq)]
pub enum QueryError {
    /// A referenced table or alias has no matching source
    #[error("Unknown table: {0}")]
    UnknownTable(String),
    /// A referenced column does not exist or is ambiguous
    #[error("Unknown column: {0}")]
    UnknownColumn(String),
    /// A comparison, arithmetic or aggregate was applied to incompatible kinds
    #[error("Type error: {0}")]
    TypeError(String),
    /// Renaming or combining tables would produce duplicate column names
    #[error("Schema error: {0}")]
    SchemaError(String),
    /// Select list mixes grouped and non-grouped columns
    #[error("Aggregation error: {0}")]
    AggregationError(String),
    /// Division by zero
    #[error("Division by zero")]
    DivisionByZero,
    /// Numeric overflow
    #[error("Numeric overflow")]
    NumericOverflow,
    /// The query descriptor could not be decoded
    #[error("Invalid query: {0}")]
    InvalidQuery(String),
    /// Table files could not be read
    #[error("Storage error: {0}")]
    StorageError(String),
}

impl QueryError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            QueryError::UnknownTable(_) => ErrorKind::UnknownTable,
            QueryError::UnknownColumn(_) => ErrorKind::UnknownColumn,
            QueryError::TypeError(_) => ErrorKind::TypeError,
            QueryError::SchemaError(_) => ErrorKind::SchemaError,
            QueryError::AggregationError(_) => ErrorKind::AggregationError,
            QueryError::DivisionByZero => ErrorKind::DivisionByZero,
            QueryError::NumericOverflow => ErrorKind::NumericOverflow,
            QueryError::InvalidQuery(_) => ErrorKind::InvalidQuery,
            QueryError::StorageError(_) => ErrorKind::StorageError,
        }
    }

    /// Unknown tables and unknown or ambiguous columns are semantic errors
    pub fn is_semantic(&self) -> bool {
        matches!(self, QueryError::UnknownTable(_) | QueryError::UnknownColumn(_))
    }
}

impl From<serde_json::Error> for QueryError {
    fn from(err: serde_json::Error) -> Self {
        QueryError::InvalidQuery(err.to_string())
    }
}

/// Result type for query operations
pub type QueryResult<T> = Result<T, QueryError>;

/// Fully materialized query output
#[derive(Debug, Clone, PartialEq)]
pub struct QueryResultSet {
    /// Column names in the resultset
    columns: Vec<String>,
    /// Rows of data
    rows: Vec<Row>,
}

impl QueryResultSet {
    /// Create a new empty resultset with column names
    pub fn new(columns: Vec<String>) -> Self {
        QueryResultSet {
            columns,
            rows: Vec::new(),
        }
    }

    /// Add a row to the resultset
    pub fn add_row(&mut self, row: Row) {
        self.rows.push(row);
    }

    /// Get the columns in the resultset
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Get the rows in the resultset
    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    /// Get the number of rows
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// A row as an ordered column name to value map
    pub fn row_map(&self, index: usize) -> Option<LinkedHashMap<String, DataValue>> {
        let row = self.rows.get(index)?;
        Some(
            self.columns
                .iter()
                .cloned()
                .zip(row.values().iter().cloned())
                .collect(),
        )
    }

    /// All values of one output column, in row order
    pub fn column_values(&self, column: &str) -> Option<Vec<DataValue>> {
        let index = self.columns.iter().position(|c| c == column)?;
        Some(
            self.rows
                .iter()
                .map(|row| row.get(index).cloned().unwrap_or(DataValue::Null))
                .collect(),
        )
    }

    /// Serialize as `{"columns": [...], "rows": [{...}, ...]}` keeping column order
    pub fn to_json(&self) -> QueryResult<String> {
        let rows: Vec<LinkedHashMap<String, DataValue>> = (0..self.rows.len())
            .filter_map(|i| self.row_map(i))
            .collect();
        let mut document = LinkedHashMap::new();
        document.insert("columns", serde_json::to_value(&self.columns)?);
        document.insert("rows", serde_json::to_value(&rows)?);
        Ok(serde_json::to_string_pretty(&document)?)
    }

    /// Format the resultset as a string table
    pub fn to_string_table(&self) -> String {
        if self.columns.is_empty() {
            return "Empty result".to_string();
        }

        let mut result = String::new();

        // Add column headers
        result.push_str("| ");
        for col in &self.columns {
            result.push_str(&format!("{} | ", col));
        }
        result.push('\n');

        // Add separator
        result.push('|');
        for col in &self.columns {
            result.push_str(&format!("{}|", "-".repeat(col.len() + 2)));
        }
        result.push('\n');

        // Add rows
        for row in &self.rows {
            result.push_str("| ");
            for value in row.values() {
                result.push_str(&format!("{} | ", value));
            }
            result.push('\n');
        }

        result.push_str(&format!("({} rows)\n", self.rows.len()));
        result
    }
}
