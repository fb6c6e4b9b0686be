// Projection Operator Implementation
//
// This module implements the projection operator for computing the select
// list of each input row.

use std::sync::Arc;

use crate::query::executor::expression_eval::BoundExpr;
use crate::query::executor::operators::RowStream;
use crate::query::executor::result::{QueryResult, Row};

/// Projection operator that evaluates one expression per output column
pub struct ProjectionOperator {
    /// The input stream
    input: RowStream,
    /// Expressions bound against the input's row layout, in output order
    exprs: Arc<[BoundExpr]>,
}

impl ProjectionOperator {
    /// Create a new projection operator
    pub fn new(input: RowStream, exprs: Arc<[BoundExpr]>) -> Self {
        ProjectionOperator { input, exprs }
    }

    fn project_row(&self, row: &Row) -> QueryResult<Row> {
        let values = self
            .exprs
            .iter()
            .map(|expr| expr.evaluate(row))
            .collect::<QueryResult<Vec<_>>>()?;
        Ok(Row::from_values(values))
    }
}

impl Iterator for ProjectionOperator {
    type Item = QueryResult<Row>;

    fn next(&mut self) -> Option<Self::Item> {
        let row = match self.input.next()? {
            Ok(row) => row,
            Err(e) => return Some(Err(e)),
        };
        Some(self.project_row(&row))
    }
}
