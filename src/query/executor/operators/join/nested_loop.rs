// Nested Loop Join Implementation
//
// Produces the Cartesian product of two inputs lazily. The left input is
// pulled once; the right table is rescanned for every left row. Rows are
// emitted left-major, and nothing is pulled from either side until the
// consumer asks for the next combined row.

use crate::catalog::Table;
use crate::query::executor::operators::RowStream;
use crate::query::executor::result::{QueryResult, Row};

/// Nested loop cross product operator
pub struct NestedLoopJoin {
    /// Left input stream, consumed once
    left: RowStream,
    /// Right input, rescanned per left row
    right: Table,
    /// Current left row being processed
    current_left_row: Option<Row>,
    /// Scan of the right table for the current left row
    right_rows: Option<RowStream>,
    /// Set once the left input is exhausted
    finished: bool,
}

impl NestedLoopJoin {
    /// Create a new nested loop join operator
    pub fn new(left: RowStream, right: Table) -> Self {
        NestedLoopJoin {
            left,
            right,
            current_left_row: None,
            right_rows: None,
            finished: false,
        }
    }
}

impl Iterator for NestedLoopJoin {
    type Item = QueryResult<Row>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        loop {
            if self.current_left_row.is_none() {
                match self.left.next() {
                    None => {
                        self.finished = true;
                        return None;
                    }
                    Some(Err(e)) => return Some(Err(e)),
                    Some(Ok(row)) => {
                        self.current_left_row = Some(row);
                        self.right_rows = Some(self.right.rows());
                    }
                }
            }

            let next_right = self.right_rows.as_mut().and_then(|rows| rows.next());
            match next_right {
                Some(Ok(right)) => {
                    if let Some(left) = &self.current_left_row {
                        return Some(Ok(left.concat(&right)));
                    }
                }
                Some(Err(e)) => return Some(Err(e)),
                None => {}
            }

            // Right side exhausted for this left row
            self.current_left_row = None;
            self.right_rows = None;
        }
    }
}
