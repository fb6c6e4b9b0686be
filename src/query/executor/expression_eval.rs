// Expression Evaluation Utility
//
// Bound forms of predicates and select expressions. Binding replaces column
// references with positions in the row layout the expression will run
// against, so evaluation is a plain walk over a tagged tree.

use std::cmp::Ordering;

use crate::query::executor::result::{DataValue, QueryError, QueryResult, Row};
use crate::query::parser::ast::{ArithmeticOp, CompareOp};

/// One side of a bound comparison
#[derive(Debug, Clone, PartialEq)]
pub enum BoundOperand {
    /// Column at `index` of the row; `name` is kept for error messages
    Column { index: usize, name: String },
    Literal(DataValue),
}

impl BoundOperand {
    fn value<'a>(&'a self, row: &'a Row) -> QueryResult<&'a DataValue> {
        match self {
            BoundOperand::Literal(value) => Ok(value),
            BoundOperand::Column { index, name } => row
                .get(*index)
                .ok_or_else(|| QueryError::UnknownColumn(format!("{} (position {} past end of row)", name, index))),
        }
    }
}

/// Executable where-clause tree
#[derive(Debug, Clone, PartialEq)]
pub enum BoundPredicate {
    Compare {
        left: BoundOperand,
        op: CompareOp,
        right: BoundOperand,
    },
    And(Vec<BoundPredicate>),
    Or(Vec<BoundPredicate>),
    Not(Box<BoundPredicate>),
    Constant(bool),
}

impl BoundPredicate {
    /// Conjunction of the given predicates; `true` when empty
    pub fn conjoin(mut predicates: Vec<BoundPredicate>) -> BoundPredicate {
        match predicates.len() {
            0 => BoundPredicate::Constant(true),
            1 => predicates.remove(0),
            _ => BoundPredicate::And(predicates),
        }
    }

    /// True when the predicate is the literal `true` and filtering can be skipped
    pub fn is_trivially_true(&self) -> bool {
        match self {
            BoundPredicate::Constant(b) => *b,
            BoundPredicate::And(children) => children.iter().all(|c| c.is_trivially_true()),
            _ => false,
        }
    }

    /// Evaluate against a row. AND and OR short-circuit left to right.
    pub fn evaluate(&self, row: &Row) -> QueryResult<bool> {
        match self {
            BoundPredicate::Constant(b) => Ok(*b),
            BoundPredicate::Compare { left, op, right } => {
                compare_values(left.value(row)?, *op, right.value(row)?)
            }
            BoundPredicate::And(children) => {
                for child in children {
                    if !child.evaluate(row)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            BoundPredicate::Or(children) => {
                for child in children {
                    if child.evaluate(row)? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
            BoundPredicate::Not(child) => Ok(!child.evaluate(row)?),
        }
    }
}

/// Apply a comparison operator. A comparison involving NULL is false; two
/// non-null values of different kinds are a type error, never coerced. The
/// planner already rejects mismatches on typed columns, so this only fires
/// for sources whose column types are unknown.
pub fn compare_values(left: &DataValue, op: CompareOp, right: &DataValue) -> QueryResult<bool> {
    if left.is_null() || right.is_null() {
        return Ok(false);
    }
    if left.kind() != right.kind() {
        return Err(QueryError::TypeError(format!(
            "Cannot compare {} value {} {} {} value {}",
            left.kind(), left, op, right.kind(), right
        )));
    }

    let ordering = left.compare(right)?;
    Ok(match op {
        CompareOp::Eq => ordering == Ordering::Equal,
        CompareOp::NotEq => ordering != Ordering::Equal,
        CompareOp::Lt => ordering == Ordering::Less,
        CompareOp::LtEq => ordering != Ordering::Greater,
        CompareOp::Gt => ordering == Ordering::Greater,
        CompareOp::GtEq => ordering != Ordering::Less,
    })
}

/// Executable select-list expression
#[derive(Debug, Clone, PartialEq)]
pub enum BoundExpr {
    Column { index: usize, name: String },
    Literal(DataValue),
    Binary {
        op: ArithmeticOp,
        left: Box<BoundExpr>,
        right: Box<BoundExpr>,
    },
}

impl BoundExpr {
    pub fn evaluate(&self, row: &Row) -> QueryResult<DataValue> {
        match self {
            BoundExpr::Literal(value) => Ok(value.clone()),
            BoundExpr::Column { index, name } => row
                .get(*index)
                .cloned()
                .ok_or_else(|| QueryError::UnknownColumn(format!("{} (position {} past end of row)", name, index))),
            BoundExpr::Binary { op, left, right } => {
                let left_val = left.evaluate(row)?;
                let right_val = right.evaluate(row)?;
                apply_arithmetic(*op, &left_val, &right_val)
            }
        }
    }
}

/// Arithmetic over numbers. NULL propagates; integer overflow is an error;
/// division always produces a float.
pub fn apply_arithmetic(op: ArithmeticOp, left: &DataValue, right: &DataValue) -> QueryResult<DataValue> {
    match (left, right) {
        (DataValue::Null, _) | (_, DataValue::Null) => Ok(DataValue::Null),

        (DataValue::Integer(a), DataValue::Integer(b)) => match op {
            ArithmeticOp::Add => a.checked_add(*b).map(DataValue::Integer).ok_or(QueryError::NumericOverflow),
            ArithmeticOp::Subtract => a.checked_sub(*b).map(DataValue::Integer).ok_or(QueryError::NumericOverflow),
            ArithmeticOp::Multiply => a.checked_mul(*b).map(DataValue::Integer).ok_or(QueryError::NumericOverflow),
            ArithmeticOp::Divide => {
                if *b == 0 {
                    Err(QueryError::DivisionByZero)
                } else {
                    Ok(DataValue::Float(*a as f64 / *b as f64))
                }
            }
        },

        (a, b) => match (a.as_f64(), b.as_f64()) {
            (Some(x), Some(y)) => match op {
                ArithmeticOp::Add => Ok(DataValue::Float(x + y)),
                ArithmeticOp::Subtract => Ok(DataValue::Float(x - y)),
                ArithmeticOp::Multiply => Ok(DataValue::Float(x * y)),
                ArithmeticOp::Divide => {
                    if y == 0.0 {
                        Err(QueryError::DivisionByZero)
                    } else {
                        Ok(DataValue::Float(x / y))
                    }
                }
            },
            _ => Err(QueryError::TypeError(format!(
                "Cannot apply {} to {} value {} and {} value {}",
                op, a.kind(), a, b.kind(), b
            ))),
        },
    }
}
