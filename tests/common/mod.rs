#![allow(dead_code)]

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use anyhow::Result;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde_json::Value;
use tinyrel::catalog::RowSource;
use tinyrel::query::executor::operators::RowStream;
use tinyrel::{Catalog, DataValue, ExecutionConfig, ExecutionEngine, Row, Table};

pub fn text(s: &str) -> DataValue {
    DataValue::Text(s.to_string())
}

pub fn int(i: i64) -> DataValue {
    DataValue::Integer(i)
}

pub fn columns(names: &[&str]) -> Vec<String> {
    names.iter().map(|n| n.to_string()).collect()
}

// Build a table from column names and rows of values
pub fn table(name: &str, cols: &[&str], rows: Vec<Vec<DataValue>>) -> Result<Table> {
    Ok(Table::new(name, columns(cols), rows.into_iter().map(Row::from_values).collect())?)
}

pub fn cities() -> Result<Table> {
    table(
        "cities",
        &["name", "pop"],
        vec![
            vec![text("SF"), int(800_000)],
            vec![text("LA"), int(4_000_000)],
        ],
    )
}

pub fn states() -> Result<Table> {
    table(
        "states",
        &["city", "state"],
        vec![vec![text("SF"), text("CA")]],
    )
}

pub fn employees() -> Result<Table> {
    table(
        "emp",
        &["name", "dept", "pay"],
        vec![
            vec![text("ann"), text("eng"), int(10)],
            vec![text("bob"), text("hr"), int(5)],
            vec![text("cy"), text("eng"), int(20)],
        ],
    )
}

pub fn catalog_with(tables: Vec<Table>) -> Result<Arc<Catalog>> {
    let mut catalog = Catalog::new();
    for table in tables {
        catalog.add_table(table)?;
    }
    Ok(Arc::new(catalog))
}

pub fn engine_with(tables: Vec<Table>, predicate_pushdown: bool) -> Result<ExecutionEngine> {
    Ok(ExecutionEngine::with_config(
        catalog_with(tables)?,
        ExecutionConfig { predicate_pushdown },
    ))
}

// Wraps a table and counts the rows pulled from it across all scans
pub struct CountingSource {
    inner: Table,
    pulled: Arc<AtomicUsize>,
}

impl RowSource for CountingSource {
    fn scan(&self) -> RowStream {
        let pulled = Arc::clone(&self.pulled);
        Box::new(self.inner.rows().inspect(move |_| {
            pulled.fetch_add(1, Ordering::SeqCst);
        }))
    }
}

// Same rows as `table`, plus a counter of rows pulled
pub fn counted(table: Table) -> (Table, Arc<AtomicUsize>) {
    let pulled = Arc::new(AtomicUsize::new(0));
    let source = CountingSource {
        inner: table.clone(),
        pulled: Arc::clone(&pulled),
    };
    let counted = Table::from_source(table.name().to_string(), table.schema().clone(), Arc::new(source));
    (counted, pulled)
}

pub fn pulled(counter: &Arc<AtomicUsize>) -> usize {
    counter.load(Ordering::SeqCst)
}

// Table of `rows` random rows with small integer columns and a category
pub fn random_table(rng: &mut StdRng, name: &str, cols: &[&str], rows: usize) -> Result<Table> {
    let categories = ["a", "b", "c"];
    let data = (0..rows)
        .map(|_| {
            cols.iter()
                .enumerate()
                .map(|(i, _)| match (i, rng.gen_range(0..10)) {
                    (_, 0) => DataValue::Null,
                    (0, _) => text(categories[rng.gen_range(0..categories.len())]),
                    _ => int(rng.gen_range(0..5)),
                })
                .collect()
        })
        .collect();
    table(name, cols, data)
}

pub fn seeded_rng(seed: u64) -> StdRng {
    StdRng::seed_from_u64(seed)
}

// Sorted copy of the rows, for multiset comparison
pub fn sorted_rows(mut rows: Vec<Row>) -> Vec<Row> {
    rows.sort_by(|a, b| format!("{:?}", a).cmp(&format!("{:?}", b)));
    rows
}

// Write a table file into `dir`
pub fn write_table_file(dir: &Path, name: &str, contents: &Value) -> Result<()> {
    std::fs::write(dir.join(format!("{}.table.json", name)), serde_json::to_string(contents)?)?;
    Ok(())
}
