// Limit Operator Implementation
//
// Passes through at most `limit` rows. Once the limit is reached the input
// is never pulled again, which stops every lazy stage upstream.

use crate::query::executor::operators::RowStream;
use crate::query::executor::result::{QueryResult, Row};

pub struct LimitOperator {
    input: RowStream,
    /// Rows still allowed through
    remaining: usize,
}

impl LimitOperator {
    pub fn new(input: RowStream, limit: usize) -> Self {
        LimitOperator { input, remaining: limit }
    }
}

impl Iterator for LimitOperator {
    type Item = QueryResult<Row>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let item = self.input.next()?;
        self.remaining -= 1;
        Some(item)
    }
}
