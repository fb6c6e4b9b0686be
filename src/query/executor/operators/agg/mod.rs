// Aggregation Operators Module
//
// This module contains the grouping operator and the aggregate functions it
// computes (COUNT, SUM, AVG, MIN, MAX).

mod hash;

pub use self::hash::HashAggregateOperator;

use crate::query::executor::expression_eval::BoundExpr;
use crate::query::parser::ast::AggregateFunction;

/// Types of supported aggregate functions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregateType {
    /// `count(*)`: every row
    CountRows,
    /// `count(expr)`: non-null values
    Count,
    Sum,
    Avg,
    Min,
    Max,
}

impl AggregateType {
    /// Executor aggregate for a descriptor function; `has_arg` separates
    /// `count(*)` from `count(expr)`
    pub fn from_function(function: AggregateFunction, has_arg: bool) -> Self {
        match function {
            AggregateFunction::Count if has_arg => AggregateType::Count,
            AggregateFunction::Count => AggregateType::CountRows,
            AggregateFunction::Sum => AggregateType::Sum,
            AggregateFunction::Avg => AggregateType::Avg,
            AggregateFunction::Min => AggregateType::Min,
            AggregateFunction::Max => AggregateType::Max,
        }
    }
}

/// One aggregate to compute per group
#[derive(Debug, Clone, PartialEq)]
pub struct AggregateExpr {
    pub agg_type: AggregateType,
    /// Argument bound against the aggregate's input rows; `None` only for `CountRows`
    pub arg: Option<BoundExpr>,
}
