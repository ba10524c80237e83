use std::{fmt::Display, path::Path};

use anyhow::anyhow;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::ast::{Ident, name_matches};

/// A possibly partially qualified `[catalog.][schema.]table` name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct TableName {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub catalog: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,
    pub table: String,
    #[serde(default, skip_serializing_if = "QuotedParts::is_empty")]
    pub quoted: QuotedParts,
}

/// Parts of a [`TableName`] written quoted, which only match byte-for-byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct QuotedParts {
    #[serde(default)]
    pub catalog: bool,
    #[serde(default)]
    pub schema: bool,
    #[serde(default)]
    pub table: bool,
}

impl QuotedParts {
    fn is_empty(&self) -> bool {
        !(self.catalog || self.schema || self.table)
    }
}

impl TableName {
    /// Builds an unquoted name from its dotted parts, filling from the right.
    pub fn from_parts(parts: &[String]) -> Self {
        let mut parts = parts.iter().rev();
        let table = parts.next().cloned().unwrap_or_default();
        let schema = parts.next().cloned();
        let catalog = parts.next().cloned();
        Self {
            catalog,
            schema,
            table,
            quoted: QuotedParts::default(),
        }
    }

    /// Builds a name from the identifiers of a table path, keeping their quoting.
    pub fn from_idents(idents: &[Ident]) -> Self {
        let values: Vec<String> = idents.iter().map(|ident| ident.value.clone()).collect();
        let mut quoted = idents.iter().rev().map(|ident| ident.quoted);
        Self {
            quoted: QuotedParts {
                table: quoted.next().unwrap_or_default(),
                schema: quoted.next().unwrap_or_default(),
                catalog: quoted.next().unwrap_or_default(),
            },
            ..Self::from_parts(&values)
        }
    }

    /// Identity used to recognize the same real table: unquoted parts ignore case.
    pub fn key(&self) -> String {
        fn part(value: &str, quoted: bool) -> String {
            if quoted {
                value.to_owned()
            } else {
                value.to_lowercase()
            }
        }
        [
            self.catalog.as_deref().map(|catalog| part(catalog, self.quoted.catalog)),
            self.schema.as_deref().map(|schema| part(schema, self.quoted.schema)),
            Some(part(&self.table, self.quoted.table)),
        ]
        .into_iter()
        .flatten()
        .collect::<Vec<_>>()
        .join(".")
    }
}

impl Display for TableName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(catalog) = &self.catalog {
            write!(f, "{}.", catalog)?;
        }
        if let Some(schema) = &self.schema {
            write!(f, "{}.", schema)?;
        }
        write!(f, "{}", self.table)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnMetadata {
    pub column_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableMetadata {
    pub table_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
    pub columns: Vec<ColumnMetadata>,
}

/// Resolves real table references to their columns.
///
/// Called once per table occurrence in a FROM clause, results are not cached
/// so that self-joins get independent relations. Returning `None` marks the
/// table as unknown: it is still bound, with no columns.
pub trait TableLookup {
    fn lookup_table(&self, name: &TableName) -> Option<TableMetadata>;
}

impl<F> TableLookup for F
where
    F: Fn(&TableName) -> Option<TableMetadata>,
{
    fn lookup_table(&self, name: &TableName) -> Option<TableMetadata> {
        self(name)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum CatalogColumn {
    Name(String),
    Detailed {
        name: String,
        #[serde(default)]
        payload: Option<Value>,
    },
}

impl CatalogColumn {
    fn metadata(&self) -> ColumnMetadata {
        match self {
            CatalogColumn::Name(name) => ColumnMetadata {
                column_id: name.clone(),
                payload: None,
            },
            CatalogColumn::Detailed { name, payload } => ColumnMetadata {
                column_id: name.clone(),
                payload: payload.clone(),
            },
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CatalogTable {
    #[serde(default)]
    pub catalog: Option<String>,
    #[serde(default)]
    pub schema: Option<String>,
    pub name: String,
    /// Defaults to the dotted table name.
    #[serde(default)]
    pub id: Option<String>,
    pub columns: Vec<CatalogColumn>,
    #[serde(default)]
    pub payload: Option<Value>,
}

impl CatalogTable {
    /// Every part present on both sides must match, following the reference's quoting.
    fn matches(&self, name: &TableName) -> bool {
        fn part_matches(catalog_part: &Option<String>, reference_part: &Option<String>, quoted: bool) -> bool {
            match (catalog_part, reference_part) {
                (Some(catalog_part), Some(reference_part)) => {
                    name_matches(reference_part, quoted, catalog_part)
                }
                _ => true,
            }
        }
        name_matches(&name.table, name.quoted.table, &self.name)
            && part_matches(&self.schema, &name.schema, name.quoted.schema)
            && part_matches(&self.catalog, &name.catalog, name.quoted.catalog)
    }

    fn table_name(&self) -> TableName {
        TableName {
            catalog: self.catalog.clone(),
            schema: self.schema.clone(),
            table: self.name.clone(),
            quoted: QuotedParts::default(),
        }
    }
}

/// Table metadata loadable from a JSON or TOML file.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Catalog {
    pub tables: Vec<CatalogTable>,
}

impl Catalog {
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|err| anyhow!("Cannot read catalog {}: {}", path.display(), err))?;
        let catalog: Catalog = match path.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => toml::from_str(&content)?,
            Some("json") => serde_json::from_str(&content)?,
            _ => {
                return Err(anyhow!(
                    "Unsupported catalog format for {}: expected a `.json` or `.toml` file.",
                    path.display()
                ));
            }
        };
        catalog.check_duplicates()?;
        Ok(catalog)
    }

    fn check_duplicates(&self) -> anyhow::Result<()> {
        let mut seen = std::collections::HashSet::new();
        for table in &self.tables {
            let key = table.table_name().key();
            if !seen.insert(key) {
                return Err(anyhow!(
                    "Found duplicate definition of table `{}`.",
                    table.table_name()
                ));
            }
        }
        Ok(())
    }
}

impl TableLookup for Catalog {
    fn lookup_table(&self, name: &TableName) -> Option<TableMetadata> {
        let table = self.tables.iter().find(|table| table.matches(name))?;
        Some(TableMetadata {
            table_id: table
                .id
                .clone()
                .unwrap_or_else(|| table.table_name().to_string()),
            payload: table.payload.clone(),
            columns: table.columns.iter().map(CatalogColumn::metadata).collect(),
        })
    }
}
