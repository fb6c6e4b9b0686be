// Filter Operator Implementation
//
// This module implements the filter operator for filtering rows based on predicates.

use std::sync::Arc;

use crate::query::executor::expression_eval::BoundPredicate;
use crate::query::executor::operators::RowStream;
use crate::query::executor::result::{QueryResult, Row};

/// Filter operator that passes through only the rows satisfying a predicate
pub struct FilterOperator {
    /// The input stream
    input: RowStream,
    /// The predicate to evaluate, bound against the input's row layout
    predicate: Arc<BoundPredicate>,
}

impl FilterOperator {
    /// Create a new filter operator
    pub fn new(input: RowStream, predicate: Arc<BoundPredicate>) -> Self {
        FilterOperator { input, predicate }
    }
}

impl Iterator for FilterOperator {
    type Item = QueryResult<Row>;

    /// Get the next row that satisfies the predicate
    fn next(&mut self) -> Option<Self::Item> {
        // Keep pulling until a row qualifies or the input runs out
        loop {
            let row = match self.input.next()? {
                Ok(row) => row,
                Err(e) => return Some(Err(e)),
            };
            match self.predicate.evaluate(&row) {
                Ok(true) => return Some(Ok(row)),
                Ok(false) => continue,
                Err(e) => return Some(Err(e)),
            }
        }
    }
}
