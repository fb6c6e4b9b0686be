// Query Descriptor AST
//
// This module defines the structured form of a query as it arrives from the
// outside world: the select list, the sources, the where tree and the
// grouping, ordering, distinct and limit clauses. Everything here derives
// `Deserialize` so a JSON document maps straight onto it.

use std::fmt;

use serde::{Deserialize, Deserializer};

use crate::query::executor::result::DataValue;

/// Column reference (could be qualified with a table alias)
///
/// Accepts either `{"table": "c", "name": "pop"}` or the shorthand `"c.pop"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize)]
#[serde(from = "ColumnReferenceRepr")]
pub struct ColumnReference {
    pub table: Option<String>,
    pub name: String,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ColumnReferenceRepr {
    Path(String),
    Parts {
        #[serde(default)]
        table: Option<String>,
        name: String,
    },
}

impl From<ColumnReferenceRepr> for ColumnReference {
    fn from(repr: ColumnReferenceRepr) -> Self {
        match repr {
            ColumnReferenceRepr::Path(path) => ColumnReference::parse(&path),
            ColumnReferenceRepr::Parts { table, name } => ColumnReference { table, name },
        }
    }
}

impl ColumnReference {
    pub fn new(table: Option<&str>, name: &str) -> Self {
        ColumnReference {
            table: table.map(str::to_string),
            name: name.to_string(),
        }
    }

    /// Split `alias.column` at the first dot; a bare name stays unqualified
    pub fn parse(path: &str) -> Self {
        match path.split_once('.') {
            Some((table, name)) => ColumnReference::new(Some(table), name),
            None => ColumnReference::new(None, path),
        }
    }
}

impl From<&str> for ColumnReference {
    fn from(path: &str) -> Self {
        ColumnReference::parse(path)
    }
}

impl fmt::Display for ColumnReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.table {
            Some(table) => write!(f, "{}.{}", table, self.name),
            None => write!(f, "{}", self.name),
        }
    }
}

/// Table reference in the from list
///
/// Accepts `{"source": "cities", "as": "c"}` or a bare source name.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "TableReferenceRepr")]
pub struct TableReference {
    pub source: String,
    pub alias: Option<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum TableReferenceRepr {
    Name(String),
    Entry {
        source: String,
        #[serde(rename = "as", default)]
        alias: Option<String>,
    },
}

impl From<TableReferenceRepr> for TableReference {
    fn from(repr: TableReferenceRepr) -> Self {
        match repr {
            TableReferenceRepr::Name(source) => TableReference { source, alias: None },
            TableReferenceRepr::Entry { source, alias } => TableReference { source, alias },
        }
    }
}

impl TableReference {
    /// The name rows of this source are qualified with
    pub fn alias(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.source)
    }
}

/// Comparison operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum CompareOp {
    #[serde(rename = "=", alias = "==")]
    Eq,
    #[serde(rename = "!=", alias = "<>")]
    NotEq,
    #[serde(rename = "<")]
    Lt,
    #[serde(rename = "<=")]
    LtEq,
    #[serde(rename = ">")]
    Gt,
    #[serde(rename = ">=")]
    GtEq,
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let symbol = match self {
            CompareOp::Eq => "=",
            CompareOp::NotEq => "!=",
            CompareOp::Lt => "<",
            CompareOp::LtEq => "<=",
            CompareOp::Gt => ">",
            CompareOp::GtEq => ">=",
        };
        write!(f, "{}", symbol)
    }
}

/// Arithmetic operators allowed in the select list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum ArithmeticOp {
    #[serde(rename = "+")]
    Add,
    #[serde(rename = "-")]
    Subtract,
    #[serde(rename = "*")]
    Multiply,
    #[serde(rename = "/")]
    Divide,
}

impl fmt::Display for ArithmeticOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let symbol = match self {
            ArithmeticOp::Add => "+",
            ArithmeticOp::Subtract => "-",
            ArithmeticOp::Multiply => "*",
            ArithmeticOp::Divide => "/",
        };
        write!(f, "{}", symbol)
    }
}

/// Aggregate functions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AggregateFunction {
    Count,
    Sum,
    Avg,
    Min,
    Max,
}

impl fmt::Display for AggregateFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AggregateFunction::Count => "count",
            AggregateFunction::Sum => "sum",
            AggregateFunction::Avg => "avg",
            AggregateFunction::Min => "min",
            AggregateFunction::Max => "max",
        };
        write!(f, "{}", name)
    }
}

/// One side of a comparison
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operand {
    Column(ColumnReference),
    Literal(DataValue),
}

impl Operand {
    pub fn column(path: &str) -> Self {
        Operand::Column(ColumnReference::parse(path))
    }

    pub fn literal(value: DataValue) -> Self {
        Operand::Literal(value)
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Column(col) => write!(f, "{}", col),
            Operand::Literal(value) => write!(f, "{}", value),
        }
    }
}

/// A binary comparison between two operands
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Comparison {
    pub left: Operand,
    pub op: CompareOp,
    pub right: Operand,
}

/// Where-clause tree
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Predicate {
    Compare(Comparison),
    And(Vec<Predicate>),
    Or(Vec<Predicate>),
    Not(Box<Predicate>),
    Literal(bool),
}

impl Predicate {
    pub fn compare(left: Operand, op: CompareOp, right: Operand) -> Self {
        Predicate::Compare(Comparison { left, op, right })
    }

    pub fn and(children: Vec<Predicate>) -> Self {
        Predicate::And(children)
    }

    pub fn or(children: Vec<Predicate>) -> Self {
        Predicate::Or(children)
    }

    #[allow(clippy::should_implement_trait)]
    pub fn not(child: Predicate) -> Self {
        Predicate::Not(Box::new(child))
    }
}

/// The where clause either as a tree or as a flat list of comparisons that
/// are all required to hold
#[derive(Deserialize)]
#[serde(untagged)]
enum WhereClause {
    Tree(Predicate),
    Conditions(Vec<Comparison>),
}

impl WhereClause {
    fn into_predicate(self) -> Predicate {
        match self {
            WhereClause::Tree(predicate) => predicate,
            WhereClause::Conditions(conditions) => {
                Predicate::And(conditions.into_iter().map(Predicate::Compare).collect())
            }
        }
    }
}

fn deserialize_where<'de, D>(deserializer: D) -> Result<Option<Predicate>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<WhereClause>::deserialize(deserializer)?.map(WhereClause::into_predicate))
}

/// Expression in the select list
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Expression {
    /// Column reference
    Column(ColumnReference),
    /// Literal value
    Literal(DataValue),
    /// Arithmetic on two sub-expressions
    Binary {
        op: ArithmeticOp,
        left: Box<Expression>,
        right: Box<Expression>,
    },
    /// Aggregate function; `count` without an argument counts rows
    Aggregate {
        function: AggregateFunction,
        #[serde(default)]
        arg: Option<Box<Expression>>,
    },
}

impl Expression {
    pub fn contains_aggregate(&self) -> bool {
        match self {
            Expression::Aggregate { .. } => true,
            Expression::Binary { left, right, .. } => left.contains_aggregate() || right.contains_aggregate(),
            Expression::Column(_) | Expression::Literal(_) => false,
        }
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expression::Column(col) => write!(f, "{}", col),
            Expression::Literal(DataValue::Text(s)) => write!(f, "'{}'", s),
            Expression::Literal(value) => write!(f, "{}", value),
            Expression::Binary { op, left, right } => write!(f, "({} {} {})", left, op, right),
            Expression::Aggregate { function, arg: Some(arg) } => write!(f, "{}({})", function, arg),
            Expression::Aggregate { function, arg: None } => write!(f, "{}(*)", function),
        }
    }
}

/// Item in the select list
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(from = "SelectItemRepr")]
pub enum SelectItem {
    /// All columns of every source, in from-list order
    Wildcard,
    /// Expression with optional alias
    Expression {
        expr: Expression,
        alias: Option<String>,
    },
}

#[derive(Deserialize)]
#[serde(untagged)]
enum SelectItemRepr {
    Path(String),
    Item {
        #[serde(flatten)]
        expr: Expression,
        #[serde(rename = "as", default)]
        alias: Option<String>,
    },
}

impl From<SelectItemRepr> for SelectItem {
    fn from(repr: SelectItemRepr) -> Self {
        match repr {
            SelectItemRepr::Path(path) if path == "*" => SelectItem::Wildcard,
            SelectItemRepr::Path(path) => SelectItem::Expression {
                expr: Expression::Column(ColumnReference::parse(&path)),
                alias: None,
            },
            SelectItemRepr::Item { expr, alias } => SelectItem::Expression { expr, alias },
        }
    }
}

/// Sort direction (ascending or descending)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    #[serde(alias = "ASC")]
    Asc,
    #[serde(alias = "DESC")]
    Desc,
}

/// Order-by key
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "OrderByRepr")]
pub struct OrderByItem {
    pub column: ColumnReference,
    pub direction: SortDirection,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OrderByRepr {
    Path(String),
    Item {
        column: ColumnReference,
        #[serde(default)]
        direction: SortDirection,
    },
}

impl From<OrderByRepr> for OrderByItem {
    fn from(repr: OrderByRepr) -> Self {
        match repr {
            OrderByRepr::Path(path) => OrderByItem {
                column: ColumnReference::parse(&path),
                direction: SortDirection::Asc,
            },
            OrderByRepr::Item { column, direction } => OrderByItem { column, direction },
        }
    }
}

/// A complete query descriptor
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Query {
    pub select: Vec<SelectItem>,
    pub from: Vec<TableReference>,
    #[serde(rename = "where", default, deserialize_with = "deserialize_where")]
    pub where_clause: Option<Predicate>,
    #[serde(default)]
    pub group_by: Vec<ColumnReference>,
    #[serde(default)]
    pub order_by: Vec<OrderByItem>,
    #[serde(default)]
    pub distinct: bool,
    #[serde(default)]
    pub limit: Option<usize>,
}

impl Query {
    /// True when the select list computes aggregates or a group-by is present
    pub fn is_aggregate(&self) -> bool {
        !self.group_by.is_empty()
            || self.select.iter().any(|item| match item {
                SelectItem::Expression { expr, .. } => expr.contains_aggregate(),
                SelectItem::Wildcard => false,
            })
    }
}
