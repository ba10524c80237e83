//! # sqlscope
//!
//! A library for resolving SQL name scopes into column-level lineage graphs and
//! cursor-aware completion candidates.
//!
//! # Features
//!
//! - Parse ANSI-flavoured `SELECT` queries (CTEs, joins, set operations, subqueries) into a typed AST.
//! - Resolve table and column references through nested scopes, following SQL visibility rules.
//! - Extract column-level lineage as a flat list of table nodes and clause-typed edges.
//! - Walk the lineage graph upstream and downstream from any table, column or edge.
//! - Classify what can be typed at a cursor: columns, relations, or neither.
//!
//! # Example
//!
//! ```rust,no_run
//! use sqlscope::{
//!     completion::complete_at,
//!     lineage::{
//!         LineageOptions,
//!         catalog::{Catalog, CatalogColumn, CatalogTable},
//!         helper::{Focus, LineageHelper},
//!         sql_lineage,
//!     },
//! };
//!
//! fn main() -> anyhow::Result<()> {
//!     env_logger::init();
//!
//!     let catalog = Catalog {
//!         tables: vec![CatalogTable {
//!             catalog: None,
//!             schema: None,
//!             name: "account".to_owned(),
//!             id: None,
//!             columns: vec![
//!                 CatalogColumn::Name("account_type".to_owned()),
//!                 CatalogColumn::Name("account_id".to_owned()),
//!             ],
//!             payload: None,
//!         }],
//!     };
//!
//!     let sql = "select account_type, account_id as id from account";
//!     let lineage = sql_lineage(sql, &catalog, LineageOptions::default())?;
//!     println!("Lineage: {}", serde_json::to_string_pretty(&lineage)?);
//!
//!     let helper = LineageHelper::new(&lineage.elements);
//!     let connected = helper.find_connected_elements(&Focus::Column {
//!         table_id: "result_1".to_owned(),
//!         column_id: "column_2".to_owned(),
//!     })?;
//!     println!("Connected: {:?}", connected);
//!
//!     println!("Completion: {:?}", complete_at("select  from account", 7, &catalog));
//!     Ok(())
//! }
//! ```
mod arena;
pub mod ast;
pub mod completion;
pub mod lineage;
pub mod parser;
pub mod scanner;
