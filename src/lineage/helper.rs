use std::fmt::Display;

use anyhow::anyhow;
use serde::{Deserialize, Serialize};

use crate::lineage::{
    builder::{Edge, EdgeEndpoint, LineageElement, TableNode},
    scope::Column,
};

/// An element of a lineage list to start a graph query from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Focus {
    Table { table_id: String },
    Column { table_id: String, column_id: String },
    Edge(Edge),
}

impl Focus {
    fn endpoint(&self) -> Option<EdgeEndpoint> {
        match self {
            Focus::Table { table_id } => Some(EdgeEndpoint {
                table_id: table_id.clone(),
                column_id: None,
            }),
            Focus::Column {
                table_id,
                column_id,
            } => Some(EdgeEndpoint {
                table_id: table_id.clone(),
                column_id: Some(column_id.clone()),
            }),
            Focus::Edge(_) => None,
        }
    }
}

impl From<&EdgeEndpoint> for Focus {
    fn from(endpoint: &EdgeEndpoint) -> Self {
        match &endpoint.column_id {
            Some(column_id) => Focus::Column {
                table_id: endpoint.table_id.clone(),
                column_id: column_id.clone(),
            },
            None => Focus::Table {
                table_id: endpoint.table_id.clone(),
            },
        }
    }
}

impl Display for Focus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Focus::Table { table_id } => write!(f, "table `{}`", table_id),
            Focus::Column {
                table_id,
                column_id,
            } => write!(f, "column `{}.{}`", table_id, column_id),
            Focus::Edge(edge) => {
                let endpoint = |endpoint: &EdgeEndpoint| match &endpoint.column_id {
                    Some(column_id) => format!("{}.{}", endpoint.table_id, column_id),
                    None => endpoint.table_id.clone(),
                };
                write!(f, "edge `{} -> {}`", endpoint(&edge.source), endpoint(&edge.target))?;
                if let Some(edge_type) = &edge.edge_type {
                    write!(f, " ({})", edge_type)?;
                }
                Ok(())
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FoundElement {
    Table(TableNode),
    #[serde(rename_all = "camelCase")]
    Column { table_id: String, column: Column },
    Edge(Edge),
}

impl FoundElement {
    pub fn focus(&self) -> Focus {
        match self {
            FoundElement::Table(table) => Focus::Table {
                table_id: table.id.clone(),
            },
            FoundElement::Column { table_id, column } => Focus::Column {
                table_id: table_id.clone(),
                column_id: column.id.clone(),
            },
            FoundElement::Edge(edge) => Focus::Edge(edge.clone()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineageHelperError {
    ElementNotFound(String),
}

impl Display for LineageHelperError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LineageHelperError::ElementNotFound(focus) => {
                write!(f, "Could not find {} in the lineage.", focus)
            }
        }
    }
}

impl std::error::Error for LineageHelperError {}

/// Graph queries over a finished lineage list.
///
/// The traversals rely on the lineage graph being acyclic and do no cycle
/// detection of their own.
pub struct LineageHelper<'a> {
    tables: Vec<&'a TableNode>,
    edges: Vec<&'a Edge>,
}

impl<'a> LineageHelper<'a> {
    pub fn new(elements: &'a [LineageElement]) -> Self {
        let mut tables = vec![];
        let mut edges = vec![];
        for el in elements {
            match el {
                LineageElement::Table(table) => tables.push(table),
                LineageElement::Edge(edge) => edges.push(edge),
            }
        }
        Self { tables, edges }
    }

    pub fn find_element(&self, focus: &Focus) -> Option<FoundElement> {
        match focus {
            Focus::Table { table_id } => self
                .tables
                .iter()
                .find(|table| &table.id == table_id)
                .map(|table| FoundElement::Table((*table).clone())),
            Focus::Column {
                table_id,
                column_id,
            } => self
                .tables
                .iter()
                .find(|table| &table.id == table_id)
                .and_then(|table| table.columns.iter().find(|col| &col.id == column_id))
                .map(|column| FoundElement::Column {
                    table_id: table_id.clone(),
                    column: column.clone(),
                }),
            Focus::Edge(edge) => self
                .edges
                .iter()
                .find(|candidate| **candidate == edge)
                .map(|edge| FoundElement::Edge((*edge).clone())),
        }
    }

    /// Edges leaving exactly the focused table (as a whole) or column.
    pub fn find_edges_from_source(&self, focus: &Focus) -> Vec<&'a Edge> {
        let Some(endpoint) = focus.endpoint() else {
            return vec![];
        };
        self.edges
            .iter()
            .filter(|edge| edge.source == endpoint)
            .copied()
            .collect()
    }

    /// Edges entering exactly the focused table (as a whole) or column.
    pub fn find_edges_to_target(&self, focus: &Focus) -> Vec<&'a Edge> {
        let Some(endpoint) = focus.endpoint() else {
            return vec![];
        };
        self.edges
            .iter()
            .filter(|edge| edge.target == endpoint)
            .copied()
            .collect()
    }

    /// Returns the focused element followed by everything upstream of it, then
    /// everything downstream of it, each walked depth-first in pre-order.
    pub fn find_connected_elements(&self, focus: &Focus) -> anyhow::Result<Vec<FoundElement>> {
        let element = self
            .find_element(focus)
            .ok_or_else(|| anyhow!(LineageHelperError::ElementNotFound(focus.to_string())))?;

        let mut connected = vec![element];
        self.walk_up(focus, &mut connected);
        self.walk_down(focus, &mut connected);
        Ok(connected)
    }

    fn walk_up(&self, focus: &Focus, out: &mut Vec<FoundElement>) {
        match focus {
            Focus::Edge(edge) => {
                if let Some(source) = self.find_element(&Focus::from(&edge.source)) {
                    let next = source.focus();
                    out.push(source);
                    self.walk_up(&next, out);
                }
            }
            _ => {
                for edge in self.find_edges_to_target(focus) {
                    out.push(FoundElement::Edge(edge.clone()));
                    self.walk_up(&Focus::Edge(edge.clone()), out);
                }
            }
        }
    }

    fn walk_down(&self, focus: &Focus, out: &mut Vec<FoundElement>) {
        match focus {
            Focus::Edge(edge) => {
                if let Some(target) = self.find_element(&Focus::from(&edge.target)) {
                    let next = target.focus();
                    out.push(target);
                    self.walk_down(&next, out);
                }
            }
            _ => {
                for edge in self.find_edges_from_source(focus) {
                    out.push(FoundElement::Edge(edge.clone()));
                    self.walk_down(&Focus::Edge(edge.clone()), out);
                }
            }
        }
    }
}
