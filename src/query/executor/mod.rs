// Query Executor Module
//
// This module is responsible for executing query plans and producing results.
// It implements the pull-based iterator execution model for query processing.

// Re-export public components
pub mod engine;
pub mod expression_eval;
pub mod operators;
pub mod result;

// Export key types
pub use self::engine::{ExecutionConfig, ExecutionEngine, QueryStream};
pub use self::result::{DataValue, ErrorKind, QueryError, QueryResult, QueryResultSet, Row};
