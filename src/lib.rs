// tinyrel: a small relational query engine over in-memory tables

pub mod catalog;
pub mod query;

// Re-export key items for convenient access
pub use catalog::{Catalog, Schema, Table, TableLoader};
pub use query::executor::engine::{ExecutionConfig, ExecutionEngine, QueryStream};
pub use query::executor::result::{DataValue, ErrorKind, QueryError, QueryResult, QueryResultSet, Row};
pub use query::parser::{parse_query, Query};
