use std::collections::{HashMap, HashSet};

use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    ast::{SourceRange, name_matches},
    lineage::{
        catalog::TableName,
        scope::{Clause, Column, Relation, RelationKind, ResolverHooks, Target},
    },
};

pub type EdgeType = Clause;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableNode {
    pub id: String,
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub range: Option<SourceRange>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
    pub columns: Vec<Column>,
    /// The real table name as referenced, absent for query results.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table: Option<TableName>,
    /// Identity of the real table the reference resolved to, absent for query results.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EdgeEndpoint {
    pub table_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Edge {
    pub source: EdgeEndpoint,
    pub target: EdgeEndpoint,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub edge_type: Option<EdgeType>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LineageElement {
    Table(TableNode),
    Edge(Edge),
}

/// Collects table nodes and edges while a query is resolved.
#[derive(Debug, Default)]
pub struct LineageBuilder {
    elements: Vec<LineageElement>,
    seen_edges: HashSet<Edge>,
}

impl ResolverHooks for LineageBuilder {
    fn on_relation(&mut self, relation: &Relation, alias: Option<&str>) {
        let (label, payload, table, table_id) = match &relation.kind {
            RelationKind::Table(table) => {
                let name = table.name.to_string();
                let label = match alias {
                    Some(alias) if !name_matches(&table.name.table, table.name.quoted.table, alias) => {
                        format!("{} -> {}", name, alias)
                    }
                    _ => name,
                };
                (
                    label,
                    table.payload.clone(),
                    Some(table.name.clone()),
                    Some(table.table_id.clone()),
                )
            }
            RelationKind::Query(_) => (
                alias.map_or_else(|| relation.id.clone(), str::to_owned),
                None,
                None,
                None,
            ),
        };

        self.elements.push(LineageElement::Table(TableNode {
            id: relation.id.clone(),
            label,
            level: Some(-(relation.depth as i32)),
            range: relation.range,
            payload,
            columns: relation.columns.clone(),
            table,
            table_id,
        }));
    }

    fn on_column_reference(&mut self, target: &Target, source_table_id: &str, source_column_id: &str) {
        let edge = Edge {
            source: EdgeEndpoint {
                table_id: source_table_id.to_owned(),
                column_id: Some(source_column_id.to_owned()),
            },
            target: EdgeEndpoint {
                table_id: target.relation_id.clone(),
                column_id: target.column_id.clone(),
            },
            edge_type: Some(target.clause),
        };
        if self.seen_edges.insert(edge.clone()) {
            self.elements.push(LineageElement::Edge(edge));
        }
    }
}

impl LineageBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs the post-passes and returns the flat lineage list.
    pub fn finish(self, merge_leaves: bool) -> Vec<LineageElement> {
        let mut elements = self.elements;
        normalize_levels(&mut elements);
        if merge_leaves {
            elements = merge_leaf_tables(elements);
        }

        log::debug!("Lineage elements:");
        elements.iter().for_each(|el| log::debug!("{:?}", el));
        elements
    }
}

/// Rewrites raw levels so the final result gets the smallest level and the
/// deepest sources the largest.
pub fn normalize_levels(elements: &mut [LineageElement]) {
    let max_level = elements
        .iter()
        .filter_map(|el| match el {
            LineageElement::Table(table) => table.level,
            LineageElement::Edge(_) => None,
        })
        .max();
    let Some(max_level) = max_level else {
        return;
    };
    for el in elements.iter_mut() {
        if let LineageElement::Table(table) = el {
            table.level = table.level.map(|raw_level| max_level - raw_level);
        }
    }
}

/// Collapses repeated references to the same real table into one node.
///
/// Edges are rewritten to the surviving node, surviving leaves keep only
/// the columns some edge references, and tables are emitted before edges.
pub fn merge_leaf_tables(elements: Vec<LineageElement>) -> Vec<LineageElement> {
    let mut tables: IndexMap<String, TableNode> = IndexMap::new();
    let mut survivors: HashMap<String, String> = HashMap::new();
    let mut renamed: HashMap<String, String> = HashMap::new();
    let mut edges = vec![];

    for el in elements {
        match el {
            LineageElement::Table(table) => match &table.table_id {
                Some(table_id) => match survivors.get(table_id) {
                    Some(survivor_id) => {
                        renamed.insert(table.id.clone(), survivor_id.clone());
                        if let Some(survivor) = tables.get_mut(survivor_id) {
                            survivor.level = survivor.level.max(table.level);
                        }
                    }
                    None => {
                        survivors.insert(table_id.clone(), table.id.clone());
                        tables.insert(table.id.clone(), table);
                    }
                },
                None => {
                    tables.insert(table.id.clone(), table);
                }
            },
            LineageElement::Edge(edge) => edges.push(edge),
        }
    }

    let rename = |endpoint: EdgeEndpoint| match renamed.get(&endpoint.table_id) {
        Some(survivor_id) => EdgeEndpoint {
            table_id: survivor_id.clone(),
            column_id: endpoint.column_id,
        },
        None => endpoint,
    };
    let edges: IndexSet<Edge> = edges
        .into_iter()
        .map(|edge| Edge {
            source: rename(edge.source),
            target: rename(edge.target),
            edge_type: edge.edge_type,
        })
        .collect();

    let referenced: HashSet<(&str, &str)> = edges
        .iter()
        .flat_map(|edge| [&edge.source, &edge.target])
        .filter_map(|endpoint| {
            endpoint
                .column_id
                .as_deref()
                .map(|column_id| (endpoint.table_id.as_str(), column_id))
        })
        .collect();

    let mut merged: Vec<LineageElement> = tables
        .into_values()
        .map(|mut table| {
            if table.table_id.is_some() {
                table
                    .columns
                    .retain(|col| referenced.contains(&(table.id.as_str(), col.id.as_str())));
            }
            LineageElement::Table(table)
        })
        .collect();
    merged.extend(edges.into_iter().map(LineageElement::Edge));
    merged
}
