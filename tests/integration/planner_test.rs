use anyhow::Result;
use serde_json::json;
use tinyrel::query::executor::expression_eval::BoundPredicate;
use tinyrel::query::parser::ast::{CompareOp, Operand, Predicate};
use tinyrel::query::parser::parse_query_value;
use tinyrel::query::planner::{OutputPlan, PredicateCompiler, Scope};
use tinyrel::{DataValue, ErrorKind, QueryError};

#[path = "../common/mod.rs"]
mod common;
use common::*;

fn scope_ab() -> Result<Scope> {
    let mut scope = Scope::new();
    scope.add_source("A", &columns(&["x"]))?;
    scope.add_source("B", &columns(&["y"]))?;
    Ok(scope)
}

fn eq(column: &str, value: i64) -> Predicate {
    Predicate::compare(Operand::column(column), CompareOp::Eq, Operand::literal(DataValue::Integer(value)))
}

#[test]
fn test_or_across_tables_is_residual() -> Result<()> {
    let scope = scope_ab()?;
    let compiler = PredicateCompiler::new(&scope);
    let tree = Predicate::or(vec![eq("A.x", 1), eq("B.y", 2)]);

    let compiled = compiler.compile(&tree)?;
    assert_eq!(compiled.references.len(), 2);

    let plan = compiler.split(Some(&tree))?;
    assert!(plan.single_table.is_empty());
    assert!(plan.has_residual());
    Ok(())
}

#[test]
fn test_conjuncts_split_per_table() -> Result<()> {
    let scope = scope_ab()?;
    let compiler = PredicateCompiler::new(&scope);
    let tree = Predicate::and(vec![eq("A.x", 1), eq("B.y", 2), eq("x", 3)]);

    let plan = compiler.split(Some(&tree))?;
    assert!(matches!(plan.for_alias("A"), Some(BoundPredicate::And(children)) if children.len() == 2));
    assert!(matches!(plan.for_alias("B"), Some(BoundPredicate::Compare { .. })));
    assert!(!plan.has_residual());
    Ok(())
}

#[test]
fn test_not_keeps_child_references() -> Result<()> {
    let scope = scope_ab()?;
    let compiler = PredicateCompiler::new(&scope);

    let single = compiler.compile(&Predicate::not(eq("y", 4)))?;
    assert_eq!(single.references.into_iter().collect::<Vec<_>>(), vec!["B".to_string()]);

    let constant = compiler.compile(&Predicate::not(Predicate::Literal(false)))?;
    assert!(constant.references.is_empty());
    Ok(())
}

#[test]
fn test_constant_conjuncts_reach_every_source() -> Result<()> {
    let scope = scope_ab()?;
    let compiler = PredicateCompiler::new(&scope);
    let plan = compiler.split(Some(&Predicate::and(vec![Predicate::Literal(false), eq("A.x", 1)])))?;

    assert_eq!(plan.for_alias("B"), Some(&BoundPredicate::Constant(false)));
    assert!(matches!(plan.for_alias("A"), Some(BoundPredicate::And(_))));
    Ok(())
}

#[test]
fn test_compile_error_kinds() -> Result<()> {
    let scope = scope_ab()?;
    let compiler = PredicateCompiler::new(&scope);

    let kind = |tree: Predicate| compiler.compile(&tree).unwrap_err().kind();
    assert_eq!(kind(eq("z", 1)), ErrorKind::UnknownColumn);
    assert_eq!(kind(eq("C.x", 1)), ErrorKind::UnknownTable);
    assert_eq!(
        kind(Predicate::compare(
            Operand::literal(DataValue::Boolean(true)),
            CompareOp::Lt,
            Operand::literal(DataValue::Integer(1)),
        )),
        ErrorKind::TypeError
    );
    Ok(())
}

#[test]
fn test_planning_reads_no_rows() -> Result<()> {
    let (cities, cities_pulled) = counted(cities()?);
    let engine = engine_with(vec![cities, states()?], true)?;

    let plan = engine.plan(&parse_query_value(json!({
        "select": ["name", "state"],
        "from": ["cities", "states"],
        "where": {"compare": {"left": {"column": "name"}, "op": "=", "right": {"column": "city"}}}
    }))?)?;
    assert!(matches!(plan.output, OutputPlan::Project(_)));
    assert_eq!(pulled(&cities_pulled), 0);

    // Semantic errors surface before any row is read
    let err = engine
        .plan(&parse_query_value(json!({"select": ["nope"], "from": ["cities"]}))?)
        .unwrap_err();
    assert!(err.is_semantic());
    assert_eq!(pulled(&cities_pulled), 0);
    Ok(())
}

#[test]
fn test_query_level_errors() -> Result<()> {
    let engine = engine_with(vec![cities()?, states()?], true)?;
    let plan_err = |descriptor: serde_json::Value| -> Result<QueryError> {
        Ok(engine.plan(&parse_query_value(descriptor)?).unwrap_err())
    };

    assert_eq!(
        plan_err(json!({"select": ["name"], "from": ["cities", {"source": "states", "as": "cities"}]}))?.kind(),
        ErrorKind::SchemaError
    );
    assert_eq!(plan_err(json!({"select": ["name"], "from": ["towns"]}))?.kind(), ErrorKind::UnknownTable);
    assert_eq!(
        plan_err(json!({"select": ["name"], "from": ["cities"], "where": {"compare": {
            "left": {"literal": "x"}, "op": "=", "right": {"literal": 1}
        }}}))?
        .kind(),
        ErrorKind::TypeError
    );
    Ok(())
}

#[test]
fn test_plan_display_mentions_every_stage() -> Result<()> {
    let engine = engine_with(vec![cities()?, states()?], true)?;
    let plan = engine.plan(&parse_query_value(json!({
        "select": ["name"],
        "from": ["cities", "states"],
        "where": {"and": [
            {"compare": {"left": {"column": "pop"}, "op": ">", "right": {"literal": 1}}},
            {"compare": {"left": {"column": "name"}, "op": "=", "right": {"column": "city"}}}
        ]},
        "distinct": true,
        "order_by": ["name"],
        "limit": 3
    }))?)?;

    let text = plan.to_string();
    for stage in ["Limit 3", "Sort [name Asc]", "Distinct", "Project [name]", "Filter (residual)", "CrossJoin"] {
        assert!(text.contains(stage), "missing {} in\n{}", stage, text);
    }
    assert!(text.contains("Scan cities AS cities (filtered)"));
    Ok(())
}
