// Hash-based Aggregation Operator
//
// This operator implements aggregation using a hash table to group rows.
// It drains its input on the first pull. Groups are emitted in the order
// their first row appeared; each output row holds the group-by values
// followed by one value per aggregate.

use linked_hash_map::LinkedHashMap;

use super::{AggregateExpr, AggregateType};
use crate::query::executor::expression_eval::BoundExpr;
use crate::query::executor::operators::RowStream;
use crate::query::executor::result::{DataValue, QueryError, QueryResult, Row};

/// Running state of one aggregate within one group
#[derive(Debug, Clone)]
struct AggregateValue {
    agg_type: AggregateType,
    /// Rows (or non-null values) seen
    count: i64,
    /// Running SUM
    sum: Option<DataValue>,
    /// Running AVG total
    total: f64,
    /// Current MIN or MAX
    best: Option<DataValue>,
}

impl AggregateValue {
    fn new(agg_type: AggregateType) -> Self {
        AggregateValue {
            agg_type,
            count: 0,
            sum: None,
            total: 0.0,
            best: None,
        }
    }

    /// Fold one input value in; `None` is the argument-less `count(*)` case
    fn update(&mut self, value: Option<DataValue>) -> QueryResult<()> {
        let value = match value {
            None => {
                self.count += 1;
                return Ok(());
            }
            Some(DataValue::Null) => return Ok(()),
            Some(value) => value,
        };
        self.count += 1;

        match self.agg_type {
            AggregateType::CountRows | AggregateType::Count => {}
            AggregateType::Sum => {
                self.sum = Some(match self.sum.take() {
                    None => require_number(self.agg_type, value)?,
                    Some(sum) => add_numbers(sum, require_number(self.agg_type, value)?)?,
                });
            }
            AggregateType::Avg => {
                let number = require_number(self.agg_type, value)?;
                self.total += number.as_f64().unwrap_or_default();
            }
            AggregateType::Min | AggregateType::Max => {
                let replace = match &self.best {
                    None => true,
                    Some(best) => {
                        let ordering = value.compare(best)?;
                        if self.agg_type == AggregateType::Min {
                            ordering.is_lt()
                        } else {
                            ordering.is_gt()
                        }
                    }
                };
                if replace {
                    self.best = Some(value);
                }
            }
        }
        Ok(())
    }

    /// Final value; SUM, AVG, MIN and MAX of no values are NULL
    fn finish(self) -> DataValue {
        match self.agg_type {
            AggregateType::CountRows | AggregateType::Count => DataValue::Integer(self.count),
            AggregateType::Sum => self.sum.unwrap_or(DataValue::Null),
            AggregateType::Avg if self.count == 0 => DataValue::Null,
            AggregateType::Avg => DataValue::Float(self.total / self.count as f64),
            AggregateType::Min | AggregateType::Max => self.best.unwrap_or(DataValue::Null),
        }
    }
}

fn require_number(agg_type: AggregateType, value: DataValue) -> QueryResult<DataValue> {
    match value {
        DataValue::Integer(_) | DataValue::Float(_) => Ok(value),
        other => Err(QueryError::TypeError(format!(
            "{:?} needs numbers, got {} value {}",
            agg_type,
            other.kind(),
            other
        ))),
    }
}

fn add_numbers(sum: DataValue, value: DataValue) -> QueryResult<DataValue> {
    match (sum, value) {
        (DataValue::Integer(a), DataValue::Integer(b)) => {
            a.checked_add(b).map(DataValue::Integer).ok_or(QueryError::NumericOverflow)
        }
        (a, b) => match (a.as_f64(), b.as_f64()) {
            (Some(x), Some(y)) => Ok(DataValue::Float(x + y)),
            _ => Err(QueryError::TypeError(format!("Cannot add {} and {}", a, b))),
        },
    }
}

/// Hash aggregate operator
pub struct HashAggregateOperator {
    /// Input, taken on the first pull
    input: Option<RowStream>,
    /// Group-by expressions bound against the input rows
    group_by: Vec<BoundExpr>,
    aggregates: Vec<AggregateExpr>,
    output_iter: Option<std::vec::IntoIter<Row>>,
}

impl HashAggregateOperator {
    pub fn new(input: RowStream, group_by: Vec<BoundExpr>, aggregates: Vec<AggregateExpr>) -> Self {
        HashAggregateOperator {
            input: Some(input),
            group_by,
            aggregates,
            output_iter: None,
        }
    }

    fn new_group(&self) -> Vec<AggregateValue> {
        self.aggregates.iter().map(|a| AggregateValue::new(a.agg_type)).collect()
    }

    /// Drain the input into groups and produce the output rows
    fn build_groups(&self, input: RowStream) -> QueryResult<Vec<Row>> {
        let mut groups: LinkedHashMap<Vec<DataValue>, Vec<AggregateValue>> = LinkedHashMap::new();

        for row in input {
            let row = row?;
            let key = self
                .group_by
                .iter()
                .map(|expr| expr.evaluate(&row))
                .collect::<QueryResult<Vec<_>>>()?;

            if !groups.contains_key(&key) {
                groups.insert(key.clone(), self.new_group());
            }
            if let Some(values) = groups.get_mut(&key) {
                for (state, aggregate) in values.iter_mut().zip(&self.aggregates) {
                    let value = match &aggregate.arg {
                        Some(arg) => Some(arg.evaluate(&row)?),
                        None => None,
                    };
                    state.update(value)?;
                }
            }
        }

        // Without grouping columns the whole input is one group, even when empty
        if groups.is_empty() && self.group_by.is_empty() {
            groups.insert(Vec::new(), self.new_group());
        }

        Ok(groups
            .into_iter()
            .map(|(mut key, values)| {
                key.extend(values.into_iter().map(AggregateValue::finish));
                Row::from_values(key)
            })
            .collect())
    }
}

impl Iterator for HashAggregateOperator {
    type Item = QueryResult<Row>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(input) = self.input.take() {
            match self.build_groups(input) {
                Ok(rows) => self.output_iter = Some(rows.into_iter()),
                Err(e) => return Some(Err(e)),
            }
        }
        self.output_iter.as_mut()?.next().map(Ok)
    }
}
