// Table Loader
//
// Reads source tables from `<dir>/<source>.table.json`. Two layouts are
// understood: a headed array whose first element lists the columns (with an
// optional declared type each) followed by positional rows, and a records
// object with a column list and one JSON object per row.

use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind as IoErrorKind;
use std::path::{Path, PathBuf};

use log::info;
use serde::Deserialize;

use crate::catalog::schema::DataType;
use crate::catalog::table::Table;
use crate::query::executor::result::{DataValue, QueryError, QueryResult, Row};

/// File suffix of table files
pub const TABLE_FILE_SUFFIX: &str = ".table.json";

#[derive(Deserialize)]
#[serde(untagged)]
enum TableFile {
    Headed(Vec<serde_json::Value>),
    Records {
        columns: Vec<String>,
        rows: Vec<HashMap<String, DataValue>>,
    },
}

/// `["pop", "int"]` or just `"pop"`
#[derive(Deserialize)]
#[serde(untagged)]
enum ColumnHeader {
    Typed(String, String),
    Untyped(String),
}

/// Loads tables from a directory of table files
#[derive(Debug, Clone)]
pub struct TableLoader {
    dir: PathBuf,
}

impl TableLoader {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        TableLoader { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the file backing a source
    pub fn table_path(&self, source: &str) -> PathBuf {
        self.dir.join(format!("{}{}", source, TABLE_FILE_SUFFIX))
    }

    /// Load a source table; the table is named after the source
    pub fn load(&self, source: &str) -> QueryResult<Table> {
        let path = self.table_path(source);
        let text = fs::read_to_string(&path).map_err(|e| match e.kind() {
            IoErrorKind::NotFound => QueryError::UnknownTable(format!("{} (no file {})", source, path.display())),
            _ => QueryError::StorageError(format!("Cannot read {}: {}", path.display(), e)),
        })?;

        let table = parse_table(source, &text)?;
        info!("Loaded table {} from {}", source, path.display());
        Ok(table)
    }
}

/// Decode the contents of one table file
pub fn parse_table(name: &str, text: &str) -> QueryResult<Table> {
    let file: TableFile = serde_json::from_str(text)
        .map_err(|e| QueryError::StorageError(format!("Malformed table file for {}: {}", name, e)))?;

    match file {
        TableFile::Records { columns, rows } => Table::from_records(name, columns, rows),
        TableFile::Headed(elements) => parse_headed(name, elements),
    }
}

fn parse_headed(name: &str, elements: Vec<serde_json::Value>) -> QueryResult<Table> {
    let mut elements = elements.into_iter();
    let header = elements
        .next()
        .ok_or_else(|| QueryError::StorageError(format!("Table file for {} has no header", name)))?;
    let headers: Vec<ColumnHeader> = serde_json::from_value(header)
        .map_err(|e| QueryError::StorageError(format!("Bad header in table file for {}: {}", name, e)))?;

    let mut columns = Vec::with_capacity(headers.len());
    let mut types = Vec::with_capacity(headers.len());
    for header in headers {
        match header {
            ColumnHeader::Typed(column, type_name) => {
                types.push(Some(DataType::from_str(&type_name)?));
                columns.push(column);
            }
            ColumnHeader::Untyped(column) => {
                types.push(None);
                columns.push(column);
            }
        }
    }

    let mut rows = Vec::new();
    for (i, element) in elements.enumerate() {
        let values: Vec<DataValue> = serde_json::from_value(element)
            .map_err(|e| QueryError::StorageError(format!("Row {} of table {} is malformed: {}", i, name, e)))?;
        if values.len() != columns.len() {
            return Err(QueryError::SchemaError(format!(
                "Row {} of table {} has {} values, expected {}",
                i, name, values.len(), columns.len()
            )));
        }
        let values = values
            .into_iter()
            .zip(&types)
            .map(|(value, data_type)| match data_type {
                Some(t) => t.coerce(value),
                None => Ok(value),
            })
            .collect::<QueryResult<Vec<_>>>()?;
        rows.push(Row::from_values(values));
    }

    Table::with_declared_types(name, columns, &types, rows)
}
