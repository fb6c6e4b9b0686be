// Physical Query Plan
//
// The fully validated, bound form of a query. Everything the executor needs
// is resolved to positions: source filters against each table's own columns,
// the residual filter and the output expressions against the combined row,
// sort keys against the output row.

use std::fmt;
use std::sync::Arc;

use crate::catalog::Table;
use crate::query::executor::expression_eval::{BoundExpr, BoundPredicate};
use crate::query::executor::operators::{AggregateExpr, SortKey};

/// One entry of the from list
#[derive(Debug, Clone)]
pub struct SourcePlan {
    pub alias: String,
    pub table: Arc<Table>,
    /// Conjuncts pushed down onto this source
    pub filter: Option<Arc<BoundPredicate>>,
}

/// How output rows are computed from the combined rows
#[derive(Debug, Clone)]
pub enum OutputPlan {
    /// One expression per output column
    Project(Arc<[BoundExpr]>),
    /// Group the combined rows, then evaluate `output` over rows of
    /// `[group-by values..., aggregate values...]`
    Aggregate {
        group_by: Vec<BoundExpr>,
        aggregates: Vec<AggregateExpr>,
        output: Arc<[BoundExpr]>,
    },
}

#[derive(Debug, Clone)]
pub struct QueryPlan {
    pub sources: Vec<SourcePlan>,
    /// Filter over the combined row; `None` when nothing is left after pushdown
    pub residual: Option<Arc<BoundPredicate>>,
    pub output: OutputPlan,
    /// Output column names in select-list order
    pub columns: Vec<String>,
    pub distinct: bool,
    pub order_by: Vec<SortKey>,
    pub limit: Option<usize>,
}

impl fmt::Display for QueryPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Outermost stage first, each nested one level deeper
        let mut stages = Vec::new();
        if let Some(limit) = self.limit {
            stages.push(format!("Limit {}", limit));
        }
        if !self.order_by.is_empty() {
            let keys: Vec<String> = self
                .order_by
                .iter()
                .map(|k| format!("{} {:?}", self.columns[k.index], k.direction))
                .collect();
            stages.push(format!("Sort [{}]", keys.join(", ")));
        }
        if self.distinct {
            stages.push("Distinct".to_string());
        }
        match &self.output {
            OutputPlan::Project(_) => stages.push(format!("Project [{}]", self.columns.join(", "))),
            OutputPlan::Aggregate { group_by, aggregates, .. } => stages.push(format!(
                "HashAggregate [{} keys, {} aggregates] -> [{}]",
                group_by.len(),
                aggregates.len(),
                self.columns.join(", ")
            )),
        }
        if self.residual.is_some() {
            stages.push("Filter (residual)".to_string());
        }
        if self.sources.len() > 1 {
            stages.push(format!("CrossJoin ({} sources)", self.sources.len()));
        }

        for (depth, stage) in stages.iter().enumerate() {
            writeln!(f, "{}{}", "  ".repeat(depth), stage)?;
        }
        for source in &self.sources {
            let filtered = if source.filter.is_some() { " (filtered)" } else { "" };
            writeln!(
                f,
                "{}Scan {} AS {}{}",
                "  ".repeat(stages.len()),
                source.table.name(),
                source.alias,
                filtered
            )?;
        }
        Ok(())
    }
}
