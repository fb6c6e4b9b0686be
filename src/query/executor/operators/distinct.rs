// Distinct Operator Implementation
//
// Suppresses rows equal to one already emitted. Stays lazy: each row is
// checked against the set of rows seen so far and passed on immediately.

use std::collections::HashSet;

use crate::query::executor::operators::RowStream;
use crate::query::executor::result::{QueryResult, Row};

pub struct DistinctOperator {
    input: RowStream,
    seen: HashSet<Row>,
}

impl DistinctOperator {
    pub fn new(input: RowStream) -> Self {
        DistinctOperator {
            input,
            seen: HashSet::new(),
        }
    }
}

impl Iterator for DistinctOperator {
    type Item = QueryResult<Row>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            match self.input.next()? {
                Ok(row) => {
                    if self.seen.insert(row.clone()) {
                        return Some(Ok(row));
                    }
                }
                Err(e) => return Some(Err(e)),
            }
        }
    }
}
