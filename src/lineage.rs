pub mod builder;
pub mod catalog;
pub mod helper;
pub mod scope;

use anyhow::anyhow;
use serde::{Deserialize, Serialize};

use crate::{
    ast::{Ast, Query},
    lineage::{
        builder::{LineageBuilder, LineageElement},
        catalog::TableLookup,
        scope::ScopeResolver,
    },
    parser::parse_sql,
};

#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct LineageOptions {
    /// Collapse repeated references to the same real table into one node.
    #[serde(default)]
    pub merge_leaves: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lineage {
    pub elements: Vec<LineageElement>,
}

fn query_lineage<L: TableLookup + ?Sized>(
    query: &Query,
    lookup: &L,
    options: LineageOptions,
) -> anyhow::Result<Lineage> {
    let mut resolver = ScopeResolver::new(lookup, LineageBuilder::new());
    resolver.resolve(query)?;
    Ok(Lineage {
        elements: resolver.into_hooks().finish(options.merge_leaves),
    })
}

/// Extracts the lineage of every top-level query in `ast`.
///
/// Each query is resolved independently, so a failure in one of them does not
/// prevent the others from producing a lineage.
pub fn extract_lineage<L: TableLookup + ?Sized>(
    ast: &Ast,
    lookup: &L,
    options: LineageOptions,
) -> Vec<anyhow::Result<Lineage>> {
    ast.queries
        .iter()
        .map(|query| query_lineage(query, lookup, options))
        .collect()
}

/// Parses `sql`, which must contain exactly one query, and extracts its lineage.
pub fn sql_lineage<L: TableLookup + ?Sized>(
    sql: &str,
    lookup: &L,
    options: LineageOptions,
) -> anyhow::Result<Lineage> {
    let ast = parse_sql(sql)?;
    match ast.queries.as_slice() {
        [query] => query_lineage(query, lookup, options),
        queries => Err(anyhow!(
            "Expected exactly one query, found {}.",
            queries.len()
        )),
    }
}
