// Table Module
//
// An immutable, named relation: a shared schema plus a row source. Renaming,
// filtering and cross joining build new tables over the same source rows;
// nothing is copied or evaluated until the rows are pulled.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::catalog::schema::{ColumnType, DataType, Schema};
use crate::query::executor::expression_eval::BoundPredicate;
use crate::query::executor::operators::{FilterOperator, NestedLoopJoin, RowStream};
use crate::query::executor::result::{DataValue, QueryError, QueryResult, Row};

/// Something that can produce the rows of a table, restarting from the
/// beginning on every call
pub trait RowSource: Send + Sync {
    fn scan(&self) -> RowStream;
}

/// Rows held in memory
struct StoredRows {
    rows: Arc<[Row]>,
}

impl RowSource for StoredRows {
    fn scan(&self) -> RowStream {
        let rows = Arc::clone(&self.rows);
        Box::new((0..rows.len()).map(move |i| Ok(rows[i].clone())))
    }
}

/// Rows of another table that satisfy a predicate
struct FilteredRows {
    input: Table,
    predicate: Arc<BoundPredicate>,
}

impl RowSource for FilteredRows {
    fn scan(&self) -> RowStream {
        Box::new(FilterOperator::new(self.input.rows(), Arc::clone(&self.predicate)))
    }
}

/// Cartesian product of two tables
struct CrossProduct {
    left: Table,
    right: Table,
}

impl RowSource for CrossProduct {
    fn scan(&self) -> RowStream {
        Box::new(NestedLoopJoin::new(self.left.rows(), self.right.clone()))
    }
}

/// Represents an in-memory table
#[derive(Clone)]
pub struct Table {
    /// Table name (the alias once qualified)
    name: String,
    /// Column names shared by every row
    schema: Arc<Schema>,
    /// Where the rows come from
    source: Arc<dyn RowSource>,
}

impl fmt::Debug for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Table")
            .field("name", &self.name)
            .field("columns", &self.schema.columns())
            .finish()
    }
}

impl Table {
    /// Create a table from positional rows; every row must match the schema
    /// width. Column types are inferred from the rows.
    pub fn new(name: impl Into<String>, columns: Vec<String>, rows: Vec<Row>) -> QueryResult<Self> {
        let declared = vec![None; columns.len()];
        Table::with_declared_types(name, columns, &declared, rows)
    }

    /// Like `new`, but a declared type wins over the inferred one. Values are
    /// expected to be coerced to their declared type already.
    pub fn with_declared_types(
        name: impl Into<String>,
        columns: Vec<String>,
        declared: &[Option<DataType>],
        rows: Vec<Row>,
    ) -> QueryResult<Self> {
        let name = name.into();
        if let Some(bad) = rows.iter().position(|row| row.len() != columns.len()) {
            return Err(QueryError::SchemaError(format!(
                "Row {} of table {} has {} values, but the schema has {} columns",
                bad, name, rows[bad].len(), columns.len()
            )));
        }
        let types = (0..columns.len())
            .map(|i| match declared.get(i).copied().flatten() {
                Some(data_type) => ColumnType::Typed(data_type),
                None => rows
                    .iter()
                    .filter_map(|row| row.get(i))
                    .fold(ColumnType::Unknown, ColumnType::widen),
            })
            .collect();
        let schema = Schema::with_types(columns, types)?;
        Ok(Table {
            name,
            schema: Arc::new(schema),
            source: Arc::new(StoredRows { rows: rows.into() }),
        })
    }

    /// Create a table from rows keyed by column name; each row's key set must
    /// equal the column set exactly
    pub fn from_records(
        name: impl Into<String>,
        columns: Vec<String>,
        records: Vec<HashMap<String, DataValue>>,
    ) -> QueryResult<Self> {
        let name = name.into();
        let mut rows = Vec::with_capacity(records.len());
        for (i, mut record) in records.into_iter().enumerate() {
            if record.len() != columns.len() {
                return Err(QueryError::SchemaError(format!(
                    "Row {} of table {} has columns {:?}, expected {:?}",
                    i, name, record.keys().collect::<Vec<_>>(), columns
                )));
            }
            let mut values = Vec::with_capacity(columns.len());
            for column in &columns {
                match record.remove(column) {
                    Some(value) => values.push(value),
                    None => {
                        return Err(QueryError::SchemaError(format!(
                            "Row {} of table {} is missing column {}",
                            i, name, column
                        )))
                    }
                }
            }
            rows.push(Row::from_values(values));
        }
        Table::new(name, columns, rows)
    }

    /// Create a table over a custom row source
    pub fn from_source(name: impl Into<String>, schema: Schema, source: Arc<dyn RowSource>) -> Self {
        Table {
            name: name.into(),
            schema: Arc::new(schema),
            source,
        }
    }

    /// Get the table name
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Get all column names in order
    pub fn columns(&self) -> &[String] {
        self.schema.columns()
    }

    /// A fresh lazy scan over the rows, in storage order
    pub fn rows(&self) -> RowStream {
        self.source.scan()
    }

    /// Pull every row; fails on the first error
    pub fn collect_rows(&self) -> QueryResult<Vec<Row>> {
        self.rows().collect()
    }

    /// Same rows under a different table name
    pub fn with_name(&self, name: impl Into<String>) -> Table {
        Table {
            name: name.into(),
            schema: Arc::clone(&self.schema),
            source: Arc::clone(&self.source),
        }
    }

    /// Rename columns per the mapping; unmapped columns keep their names
    pub fn rename(&self, alias_map: &HashMap<String, String>) -> QueryResult<Table> {
        let columns = self
            .columns()
            .iter()
            .map(|c| alias_map.get(c).cloned().unwrap_or_else(|| c.clone()))
            .collect();
        let schema = self
            .schema
            .renamed(columns)
            .map_err(|e| QueryError::SchemaError(format!("Renaming table {}: {}", self.name, e)))?;
        Ok(Table {
            name: self.name.clone(),
            schema: Arc::new(schema),
            source: Arc::clone(&self.source),
        })
    }

    /// Prefix every column with `alias.` and name the table `alias`
    pub fn qualify(&self, alias: &str) -> QueryResult<Table> {
        let alias_map = self
            .columns()
            .iter()
            .map(|c| (c.clone(), format!("{}.{}", alias, c)))
            .collect();
        Ok(self.rename(&alias_map)?.with_name(alias))
    }

    /// Lazily keep only the rows satisfying a predicate bound to this table's columns
    pub fn filter(&self, predicate: Arc<BoundPredicate>) -> Table {
        Table {
            name: self.name.clone(),
            schema: Arc::clone(&self.schema),
            source: Arc::new(FilteredRows { input: self.clone(), predicate }),
        }
    }

    /// Lazy Cartesian product; the column sets must be disjoint
    pub fn cross_join(&self, other: &Table) -> QueryResult<Table> {
        let schema = self.schema.merge(&other.schema).map_err(|e| {
            QueryError::SchemaError(format!("Joining {} with {}: {}", self.name, other.name, e))
        })?;
        Ok(Table {
            name: format!("{},{}", self.name, other.name),
            schema: Arc::new(schema),
            source: Arc::new(CrossProduct {
                left: self.clone(),
                right: other.clone(),
            }),
        })
    }
}
