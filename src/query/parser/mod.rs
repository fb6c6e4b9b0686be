// Query Parser Module
//
// Decodes JSON query descriptors into the AST. Query text (SQL) parsing
// happens upstream; this crate consumes the already structured form.

pub mod ast;

use crate::query::executor::result::QueryResult;

pub use self::ast::Query;

/// Decode a query descriptor from JSON text
pub fn parse_query(json: &str) -> QueryResult<Query> {
    Ok(serde_json::from_str(json)?)
}

/// Decode a query descriptor from an already parsed JSON value
pub fn parse_query_value(value: serde_json::Value) -> QueryResult<Query> {
    Ok(serde_json::from_value(value)?)
}
