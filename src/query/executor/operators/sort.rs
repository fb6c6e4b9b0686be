// Sort Operator Implementation
//
// Blocking stage: drains its input on the first pull, sorts stably by the
// listed output columns and then emits the sorted rows. Nulls sort first in
// ascending order.

use std::cmp::Ordering;

use crate::query::executor::operators::RowStream;
use crate::query::executor::result::{DataValue, QueryError, QueryResult, Row};
use crate::query::parser::ast::SortDirection;

/// One order-by key, as a position in the rows being sorted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortKey {
    pub index: usize,
    pub direction: SortDirection,
}

pub struct SortOperator {
    /// Input, taken on the first pull
    input: Option<RowStream>,
    keys: Vec<SortKey>,
    output_iter: Option<std::vec::IntoIter<Row>>,
}

impl SortOperator {
    pub fn new(input: RowStream, keys: Vec<SortKey>) -> Self {
        SortOperator {
            input: Some(input),
            keys,
            output_iter: None,
        }
    }

    fn compare_rows(&self, a: &Row, b: &Row) -> QueryResult<Ordering> {
        for key in &self.keys {
            let left = a.get(key.index).unwrap_or(&DataValue::Null);
            let right = b.get(key.index).unwrap_or(&DataValue::Null);
            let ordering = match key.direction {
                SortDirection::Asc => left.compare(right)?,
                SortDirection::Desc => right.compare(left)?,
            };
            if ordering != Ordering::Equal {
                return Ok(ordering);
            }
        }
        Ok(Ordering::Equal)
    }

    fn sort_input(&self, input: RowStream) -> QueryResult<Vec<Row>> {
        let mut rows = input.collect::<QueryResult<Vec<Row>>>()?;

        // sort_by cannot fail, so remember the first comparison error
        let mut failure: Option<QueryError> = None;
        rows.sort_by(|a, b| match self.compare_rows(a, b) {
            Ok(ordering) => ordering,
            Err(e) => {
                failure.get_or_insert(e);
                Ordering::Equal
            }
        });

        match failure {
            Some(e) => Err(e),
            None => Ok(rows),
        }
    }
}

impl Iterator for SortOperator {
    type Item = QueryResult<Row>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(input) = self.input.take() {
            match self.sort_input(input) {
                Ok(rows) => self.output_iter = Some(rows.into_iter()),
                Err(e) => return Some(Err(e)),
            }
        }
        self.output_iter.as_mut()?.next().map(Ok)
    }
}
