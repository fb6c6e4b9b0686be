use anyhow::Result;
use serde_json::{json, Value};
use tinyrel::query::parser::parse_query_value;
use tinyrel::{DataValue, ErrorKind, QueryError, QueryResultSet, Row};

#[path = "../common/mod.rs"]
mod common;
use common::*;

fn run(descriptor: Value) -> Result<QueryResultSet> {
    let engine = engine_with(vec![employees()?], true)?;
    Ok(engine.execute_query(&parse_query_value(descriptor)?)?)
}

fn run_err(descriptor: Value) -> Result<ErrorKind> {
    let engine = engine_with(vec![employees()?], true)?;
    let query = parse_query_value(descriptor)?;
    Ok(engine.execute_query(&query).map(|_| ()).unwrap_err().kind())
}

fn sum(column: &str) -> Value {
    json!({"aggregate": {"function": "sum", "arg": {"column": column}}})
}

#[test]
fn test_group_sum_in_first_appearance_order() -> Result<()> {
    let result = run(json!({
        "select": ["dept", sum("pay")],
        "from": ["emp"],
        "group_by": ["dept"]
    }))?;

    assert_eq!(result.columns(), &["dept", "sum(pay)"]);
    assert_eq!(
        result.rows(),
        &[
            Row::from_values(vec![text("eng"), int(30)]),
            Row::from_values(vec![text("hr"), int(5)]),
        ]
    );
    Ok(())
}

#[test]
fn test_group_order_overridden_by_order_by() -> Result<()> {
    let result = run(json!({
        "select": ["dept", {"aggregate": {"function": "sum", "arg": {"column": "pay"}}, "as": "total"}],
        "from": ["emp"],
        "group_by": ["dept"],
        "order_by": [{"column": "total", "direction": "asc"}]
    }))?;

    assert_eq!(result.column_values("dept"), Some(vec![text("hr"), text("eng")]));
    Ok(())
}

#[test]
fn test_all_aggregate_functions() -> Result<()> {
    let result = run(json!({
        "select": [
            {"aggregate": {"function": "count"}, "as": "n"},
            {"aggregate": {"function": "count", "arg": {"column": "dept"}}, "as": "depts"},
            {"aggregate": {"function": "avg", "arg": {"column": "pay"}}, "as": "avg"},
            {"aggregate": {"function": "min", "arg": {"column": "name"}}, "as": "first"},
            {"aggregate": {"function": "max", "arg": {"column": "pay"}}, "as": "top"}
        ],
        "from": ["emp"]
    }))?;

    assert_eq!(
        result.row_map(0).map(|row| row.into_iter().collect::<Vec<_>>()),
        Some(vec![
            ("n".to_string(), int(3)),
            ("depts".to_string(), int(3)),
            ("avg".to_string(), DataValue::Float(35.0 / 3.0)),
            ("first".to_string(), text("ann")),
            ("top".to_string(), int(20)),
        ])
    );
    Ok(())
}

#[test]
fn test_empty_input_yields_single_row() -> Result<()> {
    let result = run(json!({
        "select": [{"aggregate": {"function": "count"}}, sum("pay")],
        "from": ["emp"],
        "where": {"compare": {"left": {"column": "pay"}, "op": ">", "right": {"literal": 1000}}}
    }))?;

    assert_eq!(result.rows(), &[Row::from_values(vec![int(0), DataValue::Null])]);

    // With grouping columns there are no groups at all
    let grouped = run(json!({
        "select": ["dept", sum("pay")],
        "from": ["emp"],
        "where": {"literal": false},
        "group_by": ["dept"]
    }))?;
    assert_eq!(grouped.row_count(), 0);
    Ok(())
}

#[test]
fn test_expressions_over_groups() -> Result<()> {
    let result = run(json!({
        "select": [
            "dept",
            {"binary": {"op": "*", "left": sum("pay"), "right": {"literal": 2}}, "as": "double"},
            {"binary": {"op": "-", "left": {"aggregate": {"function": "max", "arg": {"column": "pay"}}},
                        "right": {"aggregate": {"function": "min", "arg": {"column": "pay"}}}}, "as": "spread"}
        ],
        "from": ["emp"],
        "group_by": ["dept"]
    }))?;

    assert_eq!(result.column_values("double"), Some(vec![int(60), int(10)]));
    assert_eq!(result.column_values("spread"), Some(vec![int(10), int(0)]));
    Ok(())
}

#[test]
fn test_group_by_join_output() -> Result<()> {
    let engine = engine_with(
        vec![
            employees()?,
            table("dept", &["id", "floor"], vec![vec![text("eng"), int(3)], vec![text("hr"), int(1)]])?,
        ],
        true,
    )?;
    let result = engine.execute_query(&parse_query_value(json!({
        "select": ["d.floor", {"aggregate": {"function": "count"}, "as": "people"}],
        "from": [{"source": "emp", "as": "e"}, {"source": "dept", "as": "d"}],
        "where": {"compare": {"left": {"column": "e.dept"}, "op": "=", "right": {"column": "d.id"}}},
        "group_by": ["d.floor"],
        "order_by": ["d.floor"]
    }))?)?;

    assert_eq!(
        result.rows(),
        &[Row::from_values(vec![int(1), int(1)]), Row::from_values(vec![int(3), int(2)])]
    );
    Ok(())
}

#[test]
fn test_aggregation_errors() -> Result<()> {
    // Non-grouped column next to an aggregate
    assert_eq!(run_err(json!({"select": ["name", sum("pay")], "from": ["emp"]}))?, ErrorKind::AggregationError);

    // Nested aggregate
    assert_eq!(
        run_err(json!({
            "select": [{"aggregate": {"function": "sum", "arg": sum("pay")}}],
            "from": ["emp"]
        }))?,
        ErrorKind::AggregationError
    );

    // Sum over text
    assert_eq!(run_err(json!({"select": [sum("name")], "from": ["emp"]}))?, ErrorKind::TypeError);
    Ok(())
}

#[test]
fn test_sum_overflow() -> Result<()> {
    let big = table("big", &["v"], vec![vec![int(i64::MAX)], vec![int(1)]])?;
    let engine = engine_with(vec![big], true)?;
    let err = engine
        .execute_query(&parse_query_value(json!({"select": [sum("v")], "from": ["big"]}))?)
        .unwrap_err();
    assert_eq!(err, QueryError::NumericOverflow);
    Ok(())
}
