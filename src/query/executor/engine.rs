// Query Execution Engine Implementation
//
// This module implements the engine for executing query descriptors. It
// plans the query, assembles the operator pipeline over the catalog's tables
// and hands back a lazy stream of output rows.

use std::sync::Arc;

use log::{debug, info};

use crate::catalog::{Catalog, Table};
use crate::query::executor::operators::{
    DistinctOperator, FilterOperator, HashAggregateOperator, LimitOperator, ProjectionOperator, RowStream,
    SortOperator,
};
use crate::query::executor::result::{QueryResult, QueryResultSet, Row};
use crate::query::parser::ast::Query;
use crate::query::parser::parse_query;
use crate::query::planner::{OutputPlan, Planner, QueryPlan};

/// Execution settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecutionConfig {
    /// Hoist single-table conjuncts onto their source ahead of the cross product
    pub predicate_pushdown: bool,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        ExecutionConfig { predicate_pushdown: true }
    }
}

/// Lazy output of one query. Rows are produced only as the stream is pulled.
pub struct QueryStream {
    columns: Vec<String>,
    rows: RowStream,
}

impl QueryStream {
    /// Output column names in select-list order
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Pull every row; any error discards the rows pulled so far
    pub fn collect_result(self) -> QueryResult<QueryResultSet> {
        let mut result = QueryResultSet::new(self.columns);
        for row in self.rows {
            result.add_row(row?);
        }
        Ok(result)
    }
}

impl Iterator for QueryStream {
    type Item = QueryResult<Row>;

    fn next(&mut self) -> Option<Self::Item> {
        self.rows.next()
    }
}

pub struct ExecutionEngine {
    catalog: Arc<Catalog>,
    config: ExecutionConfig,
}

impl ExecutionEngine {
    pub fn new(catalog: Arc<Catalog>) -> Self {
        ExecutionEngine::with_config(catalog, ExecutionConfig::default())
    }

    pub fn with_config(catalog: Arc<Catalog>, config: ExecutionConfig) -> Self {
        ExecutionEngine { catalog, config }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn config(&self) -> ExecutionConfig {
        self.config
    }

    /// Validate and bind a query without reading any rows
    pub fn plan(&self, query: &Query) -> QueryResult<QueryPlan> {
        Planner::new(&self.catalog)
            .with_pushdown(self.config.predicate_pushdown)
            .plan(query)
    }

    /// Plan a query and return its lazy output stream
    pub fn execute(&self, query: &Query) -> QueryResult<QueryStream> {
        let plan = self.plan(query)?;
        build_pipeline(plan)
    }

    /// Run a query to completion. Either every row is returned or the first
    /// error is; partial results are never returned.
    pub fn execute_query(&self, query: &Query) -> QueryResult<QueryResultSet> {
        let result = self.execute(query)?.collect_result()?;
        info!(
            "Query over {} source(s) returned {} row(s)",
            query.from.len(),
            result.row_count()
        );
        Ok(result)
    }

    /// Decode a JSON query descriptor and run it to completion
    pub fn execute_json(&self, descriptor: &str) -> QueryResult<QueryResultSet> {
        let query = parse_query(descriptor)?;
        self.execute_query(&query)
    }
}

/// Assemble the operator pipeline for a plan. Nothing is pulled here.
pub fn build_pipeline(plan: QueryPlan) -> QueryResult<QueryStream> {
    let QueryPlan {
        sources,
        residual,
        output,
        columns,
        distinct,
        order_by,
        limit,
    } = plan;

    // Per-source filter, then qualification, folded into a cross product
    let mut combined: Option<Table> = None;
    for source in sources {
        let mut table = source.table.as_ref().clone();
        if let Some(filter) = source.filter {
            table = table.filter(filter);
        }
        let table = table.qualify(&source.alias)?;
        combined = Some(match combined {
            None => table,
            Some(left) => left.cross_join(&table)?,
        });
    }
    let Some(combined) = combined else {
        return Ok(QueryStream { columns, rows: Box::new(std::iter::empty()) });
    };
    debug!("Combined source columns: {:?}", combined.columns());

    let mut rows: RowStream = combined.rows();
    if let Some(predicate) = residual {
        rows = Box::new(FilterOperator::new(rows, predicate));
    }

    rows = match output {
        OutputPlan::Project(exprs) => Box::new(ProjectionOperator::new(rows, exprs)),
        OutputPlan::Aggregate { group_by, aggregates, output } => {
            let grouped: RowStream = Box::new(HashAggregateOperator::new(rows, group_by, aggregates));
            Box::new(ProjectionOperator::new(grouped, output))
        }
    };

    if distinct {
        rows = Box::new(DistinctOperator::new(rows));
    }
    if !order_by.is_empty() {
        rows = Box::new(SortOperator::new(rows, order_by));
    }
    if let Some(limit) = limit {
        rows = Box::new(LimitOperator::new(rows, limit));
    }

    Ok(QueryStream { columns, rows })
}
