// Filter Pushdown
//
// Compiles where-clause trees into bound predicates and decides where each
// top-level conjunct runs. A conjunct that references a single source is
// hoisted onto that source's scan, ahead of the cross product. Conjuncts that
// reference several sources stay in the residual filter over combined rows.
// OR and NOT are never split.

use std::collections::{BTreeMap, BTreeSet};

use log::{debug, warn};

use crate::catalog::schema::ColumnType;
use crate::query::executor::expression_eval::{BoundOperand, BoundPredicate};
use crate::query::executor::result::{QueryError, QueryResult, Row, ValueKind};
use crate::query::parser::ast::{Comparison, Operand, Predicate};
use crate::query::planner::scope::Scope;

/// A bound predicate together with the aliases it references
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledPredicate {
    pub references: BTreeSet<String>,
    pub test: BoundPredicate,
}

/// Where every conjunct of a where clause ended up
#[derive(Debug, Clone, PartialEq)]
pub struct PushdownPlan {
    /// Per-alias predicates, bound to that source's own columns
    pub single_table: BTreeMap<String, BoundPredicate>,
    /// Predicate over the combined row; `true` when nothing remains
    pub residual: BoundPredicate,
}

impl PushdownPlan {
    /// Predicate pushed onto the given alias, if any
    pub fn for_alias(&self, alias: &str) -> Option<&BoundPredicate> {
        self.single_table.get(alias)
    }

    pub fn has_residual(&self) -> bool {
        !self.residual.is_trivially_true()
    }
}

/// Which row layout column positions are bound against
#[derive(Clone, Copy)]
enum Layout<'a> {
    /// The rows of one source table
    Source(&'a str),
    /// The cross product of every source
    Combined,
}

/// Predicate compiler over one query's scope
pub struct PredicateCompiler<'a> {
    scope: &'a Scope,
}

impl<'a> PredicateCompiler<'a> {
    pub fn new(scope: &'a Scope) -> Self {
        PredicateCompiler { scope }
    }

    /// Aliases referenced by a predicate, computed bottom-up. Also validates
    /// every column reference and type-checks every comparison whose operand
    /// kinds are known.
    pub fn references(&self, predicate: &Predicate) -> QueryResult<BTreeSet<String>> {
        let mut aliases = BTreeSet::new();
        self.collect_references(predicate, &mut aliases)?;
        Ok(aliases)
    }

    fn collect_references(&self, predicate: &Predicate, aliases: &mut BTreeSet<String>) -> QueryResult<()> {
        match predicate {
            Predicate::Literal(_) => Ok(()),
            Predicate::Compare(cmp) => {
                let left = self.operand_kind(&cmp.left, aliases)?;
                let right = self.operand_kind(&cmp.right, aliases)?;
                check_comparable(cmp, left, right)
            }
            Predicate::Not(child) => self.collect_references(child, aliases),
            Predicate::And(children) | Predicate::Or(children) => {
                for child in children {
                    self.collect_references(child, aliases)?;
                }
                Ok(())
            }
        }
    }

    /// Resolve an operand, recording its alias, and report what is known
    /// about the kind of its values
    fn operand_kind(&self, operand: &Operand, aliases: &mut BTreeSet<String>) -> QueryResult<OperandKind> {
        Ok(match operand {
            Operand::Literal(value) if value.is_null() => OperandKind::Null,
            Operand::Literal(value) => OperandKind::Known(value.kind()),
            Operand::Column(reference) => {
                let resolved = self.scope.resolve(reference)?;
                let kind = match resolved.column_type {
                    ColumnType::Typed(data_type) => OperandKind::Known(data_type.kind()),
                    ColumnType::Mixed => OperandKind::Mixed,
                    ColumnType::Unknown => OperandKind::Unknown,
                };
                aliases.insert(resolved.alias);
                kind
            }
        })
    }

    /// Compile a whole predicate. One referenced alias binds it to that
    /// source's rows; otherwise it is bound to the combined row.
    pub fn compile(&self, predicate: &Predicate) -> QueryResult<CompiledPredicate> {
        let references = self.references(predicate)?;
        let test = match references.iter().next() {
            Some(alias) if references.len() == 1 => self.bind(predicate, Layout::Source(alias.as_str()))?,
            _ => self.bind(predicate, Layout::Combined)?,
        };
        Ok(CompiledPredicate { references, test })
    }

    /// Split the top-level conjunction into per-source and residual parts
    pub fn split(&self, predicate: Option<&Predicate>) -> QueryResult<PushdownPlan> {
        let mut buckets: BTreeMap<String, Vec<BoundPredicate>> = BTreeMap::new();
        let mut residual = Vec::new();

        for conjunct in predicate.map(conjuncts).unwrap_or_default() {
            let compiled = self.compile(conjunct)?;
            match compiled.references.len() {
                0 => {
                    warn_if_false(&compiled.test);
                    for alias in self.scope.aliases() {
                        debug!("Pushing constant conjunct to every source, including {}", alias);
                        buckets.entry(alias.to_string()).or_default().push(compiled.test.clone());
                    }
                }
                1 => {
                    if let Some(alias) = compiled.references.into_iter().next() {
                        debug!("Pushing conjunct down to source {}", alias);
                        buckets.entry(alias).or_default().push(compiled.test);
                    }
                }
                _ => {
                    debug!("Keeping conjunct over {:?} as residual", compiled.references);
                    residual.push(compiled.test);
                }
            }
        }

        Ok(PushdownPlan {
            single_table: buckets
                .into_iter()
                .map(|(alias, tests)| (alias, BoundPredicate::conjoin(tests)))
                .collect(),
            residual: BoundPredicate::conjoin(residual),
        })
    }

    /// Keep every conjunct in the residual filter. Used when pushdown is disabled.
    pub fn residual_only(&self, predicate: Option<&Predicate>) -> QueryResult<PushdownPlan> {
        let residual = match predicate {
            Some(predicate) => {
                self.references(predicate)?;
                self.bind(predicate, Layout::Combined)?
            }
            None => BoundPredicate::Constant(true),
        };
        Ok(PushdownPlan {
            single_table: BTreeMap::new(),
            residual,
        })
    }

    fn bind(&self, predicate: &Predicate, layout: Layout<'_>) -> QueryResult<BoundPredicate> {
        Ok(match predicate {
            Predicate::Literal(b) => BoundPredicate::Constant(*b),
            Predicate::Compare(cmp) => BoundPredicate::Compare {
                left: self.bind_operand(&cmp.left, layout)?,
                op: cmp.op,
                right: self.bind_operand(&cmp.right, layout)?,
            },
            Predicate::Not(child) => BoundPredicate::Not(Box::new(self.bind(child, layout)?)),
            Predicate::And(children) => BoundPredicate::And(
                children.iter().map(|c| self.bind(c, layout)).collect::<QueryResult<_>>()?,
            ),
            Predicate::Or(children) => BoundPredicate::Or(
                children.iter().map(|c| self.bind(c, layout)).collect::<QueryResult<_>>()?,
            ),
        })
    }

    fn bind_operand(&self, operand: &Operand, layout: Layout<'_>) -> QueryResult<BoundOperand> {
        match operand {
            Operand::Literal(value) => Ok(BoundOperand::Literal(value.clone())),
            Operand::Column(reference) => {
                let resolved = self.scope.resolve(reference)?;
                let index = match layout {
                    Layout::Source(alias) if alias == resolved.alias => resolved.local_index,
                    Layout::Source(alias) => {
                        return Err(QueryError::UnknownColumn(format!(
                            "{} is not a column of {}",
                            reference, alias
                        )))
                    }
                    Layout::Combined => resolved.combined_index,
                };
                Ok(BoundOperand::Column {
                    index,
                    name: resolved.qualified_name(),
                })
            }
        }
    }
}

/// What the planner knows about one side of a comparison
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OperandKind {
    /// NULL literal; the comparison is false for every row
    Null,
    /// Every non-null value has this kind
    Known(ValueKind),
    /// Column holding values of several kinds
    Mixed,
    /// Untyped column with no values seen; checked per row
    Unknown,
}

/// Reject comparisons that would fail on some row, so that the outcome does
/// not depend on which conjunct happens to run first
fn check_comparable(cmp: &Comparison, left: OperandKind, right: OperandKind) -> QueryResult<()> {
    match (left, right) {
        (OperandKind::Null, _) | (_, OperandKind::Null) => Ok(()),
        (OperandKind::Mixed, _) | (_, OperandKind::Mixed) => Err(QueryError::TypeError(format!(
            "Cannot compare {} {} {}: a column holds values of several kinds",
            cmp.left, cmp.op, cmp.right
        ))),
        (OperandKind::Known(l), OperandKind::Known(r)) if l != r => Err(QueryError::TypeError(format!(
            "Cannot compare {} ({}) {} {} ({})",
            cmp.left, l, cmp.op, cmp.right, r
        ))),
        _ => Ok(()),
    }
}

/// Flatten nested top-level ANDs into their conjuncts
fn conjuncts(predicate: &Predicate) -> Vec<&Predicate> {
    match predicate {
        Predicate::And(children) => children.iter().flat_map(conjuncts).collect(),
        other => vec![other],
    }
}

/// A conjunct without column references has the same value for every row
fn warn_if_false(predicate: &BoundPredicate) {
    if let Ok(false) = predicate.evaluate(&Row::default()) {
        warn!("Where clause contains a condition that is always false; the query returns no rows");
    }
}
