// Name Resolution Scope
//
// The sources of one query in from-list order. Resolves column references to
// a source and a position, both within the source table and within the
// combined row that the cross product of all sources produces.

use crate::catalog::schema::{ColumnType, Schema};
use crate::query::executor::result::{QueryError, QueryResult};
use crate::query::parser::ast::ColumnReference;

/// One source as seen by name resolution
#[derive(Debug, Clone)]
struct ScopeEntry {
    alias: String,
    columns: Vec<String>,
    types: Vec<ColumnType>,
    /// Position of this source's first column in the combined row
    offset: usize,
}

/// A column reference resolved against the scope
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedColumn {
    pub alias: String,
    pub column: String,
    /// Position within the source table's own rows
    pub local_index: usize,
    /// Position within the combined row of all sources
    pub combined_index: usize,
    pub column_type: ColumnType,
}

impl ResolvedColumn {
    /// `alias.column`
    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.alias, self.column)
    }
}

#[derive(Debug, Clone, Default)]
pub struct Scope {
    entries: Vec<ScopeEntry>,
    width: usize,
}

impl Scope {
    pub fn new() -> Self {
        Scope::default()
    }

    /// Append a source of untyped columns; aliases must be unique
    pub fn add_source(&mut self, alias: &str, columns: &[String]) -> QueryResult<()> {
        self.push(alias, columns.to_vec(), vec![ColumnType::Unknown; columns.len()])
    }

    /// Append a source with the column types of its schema
    pub fn add_table(&mut self, alias: &str, schema: &Schema) -> QueryResult<()> {
        self.push(alias, schema.columns().to_vec(), schema.types().to_vec())
    }

    fn push(&mut self, alias: &str, columns: Vec<String>, types: Vec<ColumnType>) -> QueryResult<()> {
        if self.entries.iter().any(|e| e.alias == alias) {
            return Err(QueryError::SchemaError(format!("Duplicate table alias: {}", alias)));
        }
        let width = columns.len();
        self.entries.push(ScopeEntry {
            alias: alias.to_string(),
            columns,
            types,
            offset: self.width,
        });
        self.width += width;
        Ok(())
    }

    /// Aliases in from-list order
    pub fn aliases(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.alias.as_str())
    }

    /// Width of the combined row
    pub fn width(&self) -> usize {
        self.width
    }

    /// Every column of every source, qualified, in combined-row order
    pub fn all_columns(&self) -> Vec<ResolvedColumn> {
        self.entries
            .iter()
            .flat_map(|entry| {
                entry.columns.iter().enumerate().map(move |(i, column)| ResolvedColumn {
                    alias: entry.alias.clone(),
                    column: column.clone(),
                    local_index: i,
                    combined_index: entry.offset + i,
                    column_type: entry.types.get(i).copied().unwrap_or_default(),
                })
            })
            .collect()
    }

    /// Resolve a reference. A qualified reference must name a known alias; an
    /// unqualified one must match exactly one source.
    pub fn resolve(&self, reference: &ColumnReference) -> QueryResult<ResolvedColumn> {
        match &reference.table {
            Some(alias) => {
                let entry = self
                    .entries
                    .iter()
                    .find(|e| &e.alias == alias)
                    .ok_or_else(|| QueryError::UnknownTable(alias.clone()))?;
                Self::lookup(entry, &reference.name)
                    .ok_or_else(|| QueryError::UnknownColumn(reference.to_string()))
            }
            None => {
                let mut matches = self.entries.iter().filter_map(|e| Self::lookup(e, &reference.name));
                match (matches.next(), matches.next()) {
                    (Some(found), None) => Ok(found),
                    (None, _) => Err(QueryError::UnknownColumn(reference.name.clone())),
                    (Some(_), Some(_)) => {
                        let owners: Vec<&str> = self
                            .entries
                            .iter()
                            .filter(|e| e.columns.contains(&reference.name))
                            .map(|e| e.alias.as_str())
                            .collect();
                        Err(QueryError::UnknownColumn(format!(
                            "{} is ambiguous (present in {:?})",
                            reference.name, owners
                        )))
                    }
                }
            }
        }
    }

    fn lookup(entry: &ScopeEntry, name: &str) -> Option<ResolvedColumn> {
        let local_index = entry.columns.iter().position(|c| c == name)?;
        Some(ResolvedColumn {
            alias: entry.alias.clone(),
            column: name.to_string(),
            local_index,
            combined_index: entry.offset + local_index,
            column_type: entry.types.get(local_index).copied().unwrap_or_default(),
        })
    }
}
