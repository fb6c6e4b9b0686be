// Catalog Management Module
//
// This module manages the source tables a query can name: their schemas, the
// row sources behind them and the loader that reads them from disk.

pub mod loader;
pub mod schema;
pub mod table;

// Re-export key types
pub use self::loader::TableLoader;
pub use self::schema::{ColumnType, DataType, Schema};
pub use self::table::{RowSource, Table};

use std::collections::HashMap;
use std::sync::Arc;

use log::debug;

use crate::query::executor::result::{QueryError, QueryResult};
use crate::query::parser::ast::Query;

/// The Catalog is the registry of source tables, keyed by source name
#[derive(Debug, Default, Clone)]
pub struct Catalog {
    tables: HashMap<String, Arc<Table>>,
}

impl Catalog {
    /// Create a new, empty catalog
    pub fn new() -> Self {
        Catalog::default()
    }

    /// Register a table under its own name
    pub fn add_table(&mut self, table: Table) -> QueryResult<()> {
        let name = table.name().to_string();
        if self.tables.contains_key(&name) {
            return Err(QueryError::SchemaError(format!("Table {} already exists", name)));
        }
        debug!("Registered table {} with columns {:?}", name, table.columns());
        self.tables.insert(name, Arc::new(table));
        Ok(())
    }

    /// Check if a table exists
    pub fn table_exists(&self, name: &str) -> bool {
        self.tables.contains_key(name)
    }

    /// Get a table by source name
    pub fn get_table(&self, name: &str) -> QueryResult<Arc<Table>> {
        self.tables
            .get(name)
            .cloned()
            .ok_or_else(|| QueryError::UnknownTable(name.to_string()))
    }

    /// Registered source names, sorted
    pub fn table_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tables.keys().cloned().collect();
        names.sort();
        names
    }

    /// Load every source the query names that is not registered yet
    pub fn load_for_query(&mut self, loader: &TableLoader, query: &Query) -> QueryResult<()> {
        for reference in &query.from {
            if !self.table_exists(&reference.source) {
                let table = loader.load(&reference.source)?;
                self.add_table(table)?;
            }
        }
        Ok(())
    }
}
