// Query Operators Module
//
// This module defines the operators used for query execution. Every operator
// is a pull-based iterator over `QueryResult<Row>`: it asks its input for the
// next row only when its own consumer asks it for one. Filter, projection,
// cross product, distinct and limit stay lazy; hash aggregation and sort
// drain their input before emitting anything.

pub mod filter;
pub mod project;
pub mod join;
pub mod agg;
pub mod distinct;
pub mod limit;
pub mod sort;

use crate::query::executor::result::{QueryResult, Row};

/// A lazy stream of rows produced by a table or an operator
pub type RowStream = Box<dyn Iterator<Item = QueryResult<Row>>>;

pub use self::agg::{AggregateExpr, AggregateType, HashAggregateOperator};
pub use self::distinct::DistinctOperator;
pub use self::filter::FilterOperator;
pub use self::join::NestedLoopJoin;
pub use self::limit::LimitOperator;
pub use self::project::ProjectionOperator;
pub use self::sort::{SortKey, SortOperator};
