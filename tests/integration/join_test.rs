use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result;
use serde_json::json;
use tinyrel::query::executor::expression_eval::{BoundOperand, BoundPredicate};
use tinyrel::query::parser::ast::CompareOp;
use tinyrel::query::parser::parse_query_value;
use tinyrel::{ErrorKind, Row};

#[path = "../common/mod.rs"]
mod common;
use common::*;

#[test]
fn test_cross_join_is_left_major() -> Result<()> {
    let left = table("l", &["x"], vec![vec![int(1)], vec![int(2)]])?;
    let right = table("r", &["y"], vec![vec![text("a")], vec![text("b")], vec![text("c")]])?;

    let joined = left.qualify("l")?.cross_join(&right.qualify("r")?)?;
    assert_eq!(joined.columns(), &["l.x", "r.y"]);

    let rows = joined.collect_rows()?;
    let expected: Vec<Row> = [(1, "a"), (1, "b"), (1, "c"), (2, "a"), (2, "b"), (2, "c")]
        .iter()
        .map(|(x, y)| Row::from_values(vec![int(*x), text(y)]))
        .collect();
    assert_eq!(rows, expected);

    // Restartable: a second scan yields the same rows
    assert_eq!(joined.collect_rows()?, expected);
    Ok(())
}

#[test]
fn test_cross_join_rejects_overlapping_schemas() -> Result<()> {
    let a = table("a", &["id"], vec![])?;
    let b = table("b", &["id"], vec![])?;

    let err = a.cross_join(&b).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::SchemaError);

    // Qualifying first makes them disjoint
    assert!(a.qualify("a")?.cross_join(&b.qualify("b")?).is_ok());
    Ok(())
}

#[test]
fn test_filter_then_join_reads_right_side_per_left_row() -> Result<()> {
    let (left, left_pulled) = counted(table("l", &["x"], (0..4).map(|i| vec![int(i)]).collect())?);
    let (right, right_pulled) = counted(table("r", &["y"], (0..3).map(|i| vec![int(i)]).collect())?);

    let only_odd = Arc::new(BoundPredicate::Or(vec![
        BoundPredicate::Compare {
            left: BoundOperand::Column { index: 0, name: "x".to_string() },
            op: CompareOp::Eq,
            right: BoundOperand::Literal(int(1)),
        },
        BoundPredicate::Compare {
            left: BoundOperand::Column { index: 0, name: "x".to_string() },
            op: CompareOp::Eq,
            right: BoundOperand::Literal(int(3)),
        },
    ]));
    let joined = left.filter(only_odd).cross_join(&right)?;

    assert_eq!(joined.collect_rows()?.len(), 6);
    assert_eq!(pulled(&left_pulled), 4);
    // Two surviving left rows, each rescanning the three right rows
    assert_eq!(pulled(&right_pulled), 6);
    Ok(())
}

#[test]
fn test_rename_keeps_rows() -> Result<()> {
    let cities = cities()?;
    let mut mapping = HashMap::new();
    mapping.insert("pop".to_string(), "population".to_string());

    let renamed = cities.rename(&mapping)?;
    assert_eq!(renamed.columns(), &["name", "population"]);
    assert_eq!(renamed.collect_rows()?, cities.collect_rows()?);
    Ok(())
}

#[test]
fn test_three_way_join_with_residuals() -> Result<()> {
    let employees = employees()?;
    let depts = table("dept", &["id", "floor"], vec![vec![text("eng"), int(3)], vec![text("hr"), int(1)]])?;
    let floors = table("floors", &["level", "label"], vec![vec![int(1), text("ground")], vec![int(3), text("top")]])?;
    let engine = engine_with(vec![employees, depts, floors], true)?;

    let result = engine.execute_query(&parse_query_value(json!({
        "select": ["e.name", "f.label"],
        "from": [{"source": "emp", "as": "e"}, {"source": "dept", "as": "d"}, {"source": "floors", "as": "f"}],
        "where": {"and": [
            {"compare": {"left": {"column": "e.dept"}, "op": "=", "right": {"column": "d.id"}}},
            {"compare": {"left": {"column": "d.floor"}, "op": "=", "right": {"column": "f.level"}}},
            {"compare": {"left": {"column": "e.pay"}, "op": ">=", "right": {"literal": 10}}}
        ]}
    }))?)?;

    assert_eq!(
        result.rows(),
        &[
            Row::from_values(vec![text("ann"), text("top")]),
            Row::from_values(vec![text("cy"), text("top")]),
        ]
    );
    Ok(())
}

#[test]
fn test_self_join_through_aliases() -> Result<()> {
    let engine = engine_with(vec![employees()?], true)?;
    let result = engine.execute_query(&parse_query_value(json!({
        "select": [{"column": "a.name", "as": "first"}, {"column": "b.name", "as": "second"}],
        "from": [{"source": "emp", "as": "a"}, {"source": "emp", "as": "b"}],
        "where": {"and": [
            {"compare": {"left": {"column": "a.dept"}, "op": "=", "right": {"column": "b.dept"}}},
            {"compare": {"left": {"column": "a.name"}, "op": "<", "right": {"column": "b.name"}}}
        ]}
    }))?)?;

    assert_eq!(result.rows(), &[Row::from_values(vec![text("ann"), text("cy")])]);
    Ok(())
}
