// Query Processing Module
//
// This module contains the components for decoding query descriptors,
// planning them and executing the resulting pipelines.

pub mod executor;
pub mod parser;
pub mod planner;

// Export key public interfaces
pub use executor::engine::{ExecutionConfig, ExecutionEngine};
pub use executor::result::QueryResult;
pub use parser::{parse_query, Query};
