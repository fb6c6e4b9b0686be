// Query Planner Module
//
// This module is responsible for translating query descriptors into
// executable query plans. Every name in the query is resolved and every
// expression bound before a single row is read, so semantic errors surface
// without touching the data.

pub mod filter_pushdown;
pub mod physical_plan;
pub mod scope;

// Export key types
pub use self::filter_pushdown::{CompiledPredicate, PredicateCompiler, PushdownPlan};
pub use self::physical_plan::{OutputPlan, QueryPlan, SourcePlan};
pub use self::scope::{ResolvedColumn, Scope};

use std::collections::HashSet;
use std::sync::Arc;

use log::debug;

use crate::catalog::Catalog;
use crate::query::executor::expression_eval::BoundExpr;
use crate::query::executor::operators::{AggregateExpr, AggregateType, SortKey};
use crate::query::executor::result::{QueryError, QueryResult};
use crate::query::parser::ast::{AggregateFunction, ColumnReference, Expression, Query, SelectItem};

/// Query planner over the tables of one catalog
pub struct Planner<'a> {
    catalog: &'a Catalog,
    predicate_pushdown: bool,
}

impl<'a> Planner<'a> {
    /// Create a new planner with pushdown enabled
    pub fn new(catalog: &'a Catalog) -> Self {
        Planner {
            catalog,
            predicate_pushdown: true,
        }
    }

    pub fn with_pushdown(mut self, enabled: bool) -> Self {
        self.predicate_pushdown = enabled;
        self
    }

    /// Validate and bind a query
    pub fn plan(&self, query: &Query) -> QueryResult<QueryPlan> {
        if query.from.is_empty() {
            return Err(QueryError::InvalidQuery("Query has no sources".to_string()));
        }
        if query.select.is_empty() {
            return Err(QueryError::InvalidQuery("Query selects nothing".to_string()));
        }

        let mut scope = Scope::new();
        let mut tables = Vec::with_capacity(query.from.len());
        for reference in &query.from {
            let table = self.catalog.get_table(&reference.source)?;
            scope.add_table(reference.alias(), table.schema())?;
            tables.push((reference.alias().to_string(), table));
        }

        let compiler = PredicateCompiler::new(&scope);
        let pushdown = if self.predicate_pushdown {
            compiler.split(query.where_clause.as_ref())?
        } else {
            compiler.residual_only(query.where_clause.as_ref())?
        };

        let sources = tables
            .into_iter()
            .map(|(alias, table)| {
                let filter = pushdown.for_alias(&alias).cloned().map(Arc::new);
                SourcePlan { alias, table, filter }
            })
            .collect();
        let residual = if pushdown.has_residual() {
            Some(Arc::new(pushdown.residual.clone()))
        } else {
            None
        };

        let items = expand_select(query, &scope);
        let columns: Vec<String> = items.iter().map(|(name, _)| name.clone()).collect();
        let mut seen = HashSet::new();
        for name in &columns {
            if !seen.insert(name.as_str()) {
                return Err(QueryError::SchemaError(format!("Duplicate output column: {}", name)));
            }
        }

        let output = if query.is_aggregate() {
            plan_aggregate(query, &scope, &items)?
        } else {
            let exprs = items
                .iter()
                .map(|(_, expr)| bind_expr(expr, &scope))
                .collect::<QueryResult<Vec<_>>>()?;
            OutputPlan::Project(exprs.into())
        };

        let order_by = query
            .order_by
            .iter()
            .map(|item| {
                Ok(SortKey {
                    index: resolve_sort_column(&item.column, &columns, &items, &scope)?,
                    direction: item.direction,
                })
            })
            .collect::<QueryResult<Vec<_>>>()?;

        let plan = QueryPlan {
            sources,
            residual,
            output,
            columns,
            distinct: query.distinct,
            order_by,
            limit: query.limit,
        };
        debug!("Query plan:\n{}", plan);
        Ok(plan)
    }
}

/// Output name and expression of every select item, with `*` expanded to
/// the qualified columns of every source
fn expand_select(query: &Query, scope: &Scope) -> Vec<(String, Expression)> {
    let mut items = Vec::new();
    for item in &query.select {
        match item {
            SelectItem::Wildcard => {
                for column in scope.all_columns() {
                    items.push((
                        column.qualified_name(),
                        Expression::Column(ColumnReference::new(Some(&column.alias), &column.column)),
                    ));
                }
            }
            SelectItem::Expression { expr, alias } => {
                let name = alias.clone().unwrap_or_else(|| expr.to_string());
                items.push((name, expr.clone()));
            }
        }
    }
    items
}

/// Bind a non-aggregate expression against the combined row
fn bind_expr(expr: &Expression, scope: &Scope) -> QueryResult<BoundExpr> {
    Ok(match expr {
        Expression::Column(reference) => {
            let resolved = scope.resolve(reference)?;
            BoundExpr::Column {
                index: resolved.combined_index,
                name: resolved.qualified_name(),
            }
        }
        Expression::Literal(value) => BoundExpr::Literal(value.clone()),
        Expression::Binary { op, left, right } => BoundExpr::Binary {
            op: *op,
            left: Box::new(bind_expr(left, scope)?),
            right: Box::new(bind_expr(right, scope)?),
        },
        Expression::Aggregate { .. } => {
            return Err(QueryError::AggregationError(format!(
                "Aggregate {} is not allowed here",
                expr
            )))
        }
    })
}

/// Group keys and aggregates of an aggregate query, plus the select list
/// rewritten over the grouped rows
fn plan_aggregate(query: &Query, scope: &Scope, items: &[(String, Expression)]) -> QueryResult<OutputPlan> {
    let keys = query
        .group_by
        .iter()
        .map(|reference| scope.resolve(reference))
        .collect::<QueryResult<Vec<_>>>()?;

    let mut rewriter = AggregateRewriter {
        scope,
        keys: &keys,
        aggregates: Vec::new(),
    };
    let output = items
        .iter()
        .map(|(_, expr)| rewriter.rewrite(expr))
        .collect::<QueryResult<Vec<_>>>()?;
    let aggregates = rewriter.aggregates;

    let group_by = keys
        .iter()
        .map(|key| BoundExpr::Column {
            index: key.combined_index,
            name: key.qualified_name(),
        })
        .collect();

    Ok(OutputPlan::Aggregate {
        group_by,
        aggregates,
        output: output.into(),
    })
}

struct AggregateRewriter<'a> {
    scope: &'a Scope,
    keys: &'a [ResolvedColumn],
    aggregates: Vec<AggregateExpr>,
}

impl AggregateRewriter<'_> {
    fn rewrite(&mut self, expr: &Expression) -> QueryResult<BoundExpr> {
        Ok(match expr {
            Expression::Column(reference) => {
                let resolved = self.scope.resolve(reference)?;
                let index = self
                    .keys
                    .iter()
                    .position(|key| key.combined_index == resolved.combined_index)
                    .ok_or_else(|| {
                        QueryError::AggregationError(format!(
                            "Column {} must appear in the group-by list or inside an aggregate",
                            reference
                        ))
                    })?;
                BoundExpr::Column {
                    index,
                    name: reference.to_string(),
                }
            }
            Expression::Literal(value) => BoundExpr::Literal(value.clone()),
            Expression::Binary { op, left, right } => BoundExpr::Binary {
                op: *op,
                left: Box::new(self.rewrite(left)?),
                right: Box::new(self.rewrite(right)?),
            },
            Expression::Aggregate { function, arg } => {
                let arg = match arg {
                    Some(arg) if arg.contains_aggregate() => {
                        return Err(QueryError::AggregationError(format!(
                            "Aggregate functions cannot be nested: {}",
                            expr
                        )))
                    }
                    Some(arg) => Some(bind_expr(arg, self.scope)?),
                    None if *function == AggregateFunction::Count => None,
                    None => {
                        return Err(QueryError::AggregationError(format!(
                            "{} needs an argument",
                            function
                        )))
                    }
                };
                self.aggregates.push(AggregateExpr {
                    agg_type: AggregateType::from_function(*function, arg.is_some()),
                    arg,
                });
                BoundExpr::Column {
                    index: self.keys.len() + self.aggregates.len() - 1,
                    name: expr.to_string(),
                }
            }
        })
    }
}

/// Position in the output row of an order-by key: an output column by name,
/// or a source column that is selected as a plain column
fn resolve_sort_column(
    column: &ColumnReference,
    columns: &[String],
    items: &[(String, Expression)],
    scope: &Scope,
) -> QueryResult<usize> {
    let written = column.to_string();
    if let Some(index) = columns.iter().position(|name| *name == written) {
        return Ok(index);
    }

    let unknown = || QueryError::UnknownColumn(format!("{} is not an output column", written));
    let target = scope.resolve(column).map_err(|_| unknown())?;
    items
        .iter()
        .position(|(_, expr)| match expr {
            Expression::Column(reference) => scope
                .resolve(reference)
                .map(|r| r.combined_index == target.combined_index)
                .unwrap_or(false),
            _ => false,
        })
        .ok_or_else(unknown)
}
