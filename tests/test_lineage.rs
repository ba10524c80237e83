use std::collections::HashSet;

use serde::Deserialize;
use serde_json::json;
use sqlscope::lineage::{
    Lineage, LineageOptions,
    builder::{Edge, EdgeEndpoint, LineageElement, TableNode},
    catalog::{Catalog, ColumnMetadata, QuotedParts, TableLookup, TableMetadata, TableName},
    extract_lineage,
    helper::{Focus, LineageHelper},
    scope::Clause,
    sql_lineage,
};

#[derive(Deserialize, Debug)]
struct LineageTest {
    sql: String,
    #[serde(default)]
    merge_leaves: bool,
    tables: Vec<String>,
    edges: Vec<String>,
}

#[derive(Deserialize, Debug)]
struct LineageTestData {
    catalog: Catalog,
    tests: Vec<LineageTest>,
}

const LINEAGE_TESTS_FILE: &str = "tests/lineage_tests.toml";

fn load_test_data() -> LineageTestData {
    let lineage_data_file =
        std::fs::read_to_string(LINEAGE_TESTS_FILE).expect("Cannot open lineage test cases");
    toml::from_str(&lineage_data_file).expect("Cannot parse test cases defined in toml")
}

fn lineage_of(sql: &str, lookup: &impl TableLookup, merge_leaves: bool) -> Lineage {
    sql_lineage(sql, lookup, LineageOptions { merge_leaves })
        .unwrap_or_else(|err| panic!("Could not extract lineage due to: {}", err))
}

fn table_str(table: &TableNode) -> String {
    format!(
        "{} {} [{}]",
        table.id,
        table.label,
        table
            .columns
            .iter()
            .map(|col| col.label.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    )
}

fn endpoint_str(endpoint: &EdgeEndpoint) -> String {
    match &endpoint.column_id {
        Some(column_id) => format!("{}.{}", endpoint.table_id, column_id),
        None => endpoint.table_id.clone(),
    }
}

fn edge_str(edge: &Edge) -> String {
    format!(
        "{} -> {} : {}",
        endpoint_str(&edge.source),
        endpoint_str(&edge.target),
        edge.edge_type
            .map_or_else(String::new, |edge_type| edge_type.to_string())
    )
}

fn tables(lineage: &Lineage) -> Vec<&TableNode> {
    lineage
        .elements
        .iter()
        .filter_map(|el| match el {
            LineageElement::Table(table) => Some(table),
            LineageElement::Edge(_) => None,
        })
        .collect()
}

fn edges(lineage: &Lineage) -> Vec<&Edge> {
    lineage
        .elements
        .iter()
        .filter_map(|el| match el {
            LineageElement::Edge(edge) => Some(edge),
            LineageElement::Table(_) => None,
        })
        .collect()
}

#[test]
fn test_lineage() {
    let test_data = load_test_data();

    for test in test_data.tests {
        println!("Testing lineage for SQL: {}", &test.sql);
        let lineage = lineage_of(&test.sql, &test_data.catalog, test.merge_leaves);

        let table_strs: Vec<String> = tables(&lineage).into_iter().map(table_str).collect();
        assert_eq!(table_strs, test.tables);

        let edge_strs: Vec<String> = edges(&lineage).into_iter().map(edge_str).collect();
        assert_eq!(
            edge_strs.len(),
            edge_strs.iter().collect::<HashSet<_>>().len(),
            "Found duplicate edges: {:?}",
            edge_strs
        );
        assert_eq!(
            edge_strs.iter().collect::<HashSet<_>>(),
            test.edges.iter().collect::<HashSet<_>>()
        );
    }
}

fn assert_acyclic(helper: &LineageHelper, focus: &Focus, path: &mut Vec<Focus>) {
    assert!(!path.contains(focus), "Found cycle through {}", focus);
    path.push(focus.clone());
    for edge in helper.find_edges_from_source(focus) {
        assert_acyclic(helper, &Focus::from(&edge.target), path);
    }
    path.pop();
}

#[test]
fn test_lineage_invariants() {
    let test_data = load_test_data();

    for test in test_data.tests {
        println!("Checking invariants for SQL: {}", &test.sql);
        let lineage = lineage_of(&test.sql, &test_data.catalog, test.merge_leaves);

        // Every edge endpoint is a table of the same lineage.
        let table_ids: HashSet<&str> = tables(&lineage)
            .into_iter()
            .map(|table| table.id.as_str())
            .collect();
        for edge in edges(&lineage) {
            assert!(table_ids.contains(edge.source.table_id.as_str()));
            assert!(table_ids.contains(edge.target.table_id.as_str()));
        }

        // The graph is acyclic.
        let helper = LineageHelper::new(&lineage.elements);
        for edge in edges(&lineage) {
            assert_acyclic(&helper, &Focus::from(&edge.source), &mut vec![]);
        }

        // The final result is the only table at level 0.
        for table in tables(&lineage) {
            let level = table.level.expect("Every table node has a level");
            assert_eq!(level == 0, table.label == "[final result]");
        }

        // Resolving the same SQL again yields the same lineage.
        let again = lineage_of(&test.sql, &test_data.catalog, test.merge_leaves);
        assert_eq!(lineage, again);
    }
}

#[test]
fn test_levels_grow_with_distance_from_final_result() {
    let test_data = load_test_data();
    let sql = r#"
        select foo
        from (
            select foo, uhu, bar
            from (select concat(buzz, foo) as foo, foo as foo2, zoo, uhu, bar from sales) t1
            where zoo = ''
        ) t2
        order by bar
    "#;
    let lineage = lineage_of(sql, &test_data.catalog, false);
    let levels: Vec<(&str, Option<i32>)> = tables(&lineage)
        .into_iter()
        .map(|table| (table.id.as_str(), table.level))
        .collect();
    assert_eq!(
        levels,
        vec![
            ("table_1", Some(3)),
            ("result_3", Some(2)),
            ("result_2", Some(1)),
            ("result_1", Some(0)),
        ]
    );
}

#[test]
fn test_merge_leaves_emits_tables_before_edges() {
    let test_data = load_test_data();
    let sql = "select a.account_id, b.account_type from account a join account b on a.account_id = b.account_id";
    let lineage = lineage_of(sql, &test_data.catalog, true);

    let first_edge = lineage
        .elements
        .iter()
        .position(|el| matches!(el, LineageElement::Edge(_)))
        .unwrap();
    assert!(
        lineage.elements[first_edge..]
            .iter()
            .all(|el| matches!(el, LineageElement::Edge(_)))
    );

    let table_strs: Vec<String> = tables(&lineage).into_iter().map(table_str).collect();
    assert_eq!(
        table_strs,
        vec![
            "table_1 account -> a [account_type, account_id]",
            "result_1 [final result] [account_id, account_type]",
        ]
    );
    // Both join sides collapse into the same `from` edge.
    assert_eq!(edges(&lineage).len(), 3);
}

#[test]
fn test_extract_lineage_per_query() {
    let test_data = load_test_data();
    let ast = sqlscope::parser::parse_sql("select c1 from t; select account_id from account;")
        .unwrap();
    let lineages = extract_lineage(&ast, &test_data.catalog, LineageOptions::default());
    assert_eq!(lineages.len(), 2);

    let lineages: Vec<Lineage> = lineages.into_iter().map(|res| res.unwrap()).collect();
    // Every query gets its own id sequences.
    assert_eq!(
        edges(&lineages[0]).into_iter().map(edge_str).collect::<Vec<_>>(),
        vec!["table_1.c1 -> result_1.column_1 : select"]
    );
    assert_eq!(
        edges(&lineages[1]).into_iter().map(edge_str).collect::<Vec<_>>(),
        vec!["table_1.account_id -> result_1.column_1 : select"]
    );
}

#[test]
fn test_sql_lineage_requires_a_single_query() {
    let test_data = load_test_data();
    let options = LineageOptions::default();
    assert!(sql_lineage("select c1 from t; select c2 from t", &test_data.catalog, options).is_err());
    assert!(sql_lineage("", &test_data.catalog, options).is_err());
    assert!(sql_lineage("select c1 from", &test_data.catalog, options).is_err());
}

#[test]
fn test_closure_lookup_payloads() {
    let lookup = |name: &TableName| -> Option<TableMetadata> {
        if name.table != "orders" {
            return None;
        }
        Some(TableMetadata {
            table_id: format!("db:{}", name),
            payload: Some(json!({"rows": 42})),
            columns: vec![
                ColumnMetadata {
                    column_id: "id".to_owned(),
                    payload: Some(json!({"type": "int"})),
                },
                ColumnMetadata {
                    column_id: "total".to_owned(),
                    payload: None,
                },
            ],
        })
    };

    let lineage = lineage_of("select total from shop.orders", &lookup, false);
    let orders = tables(&lineage)[0];
    assert_eq!(orders.label, "shop.orders");
    assert_eq!(orders.payload, Some(json!({"rows": 42})));
    assert_eq!(orders.columns[0].payload, Some(json!({"type": "int"})));
    assert_eq!(
        orders.table,
        Some(TableName {
            catalog: None,
            schema: Some("shop".to_owned()),
            table: "orders".to_owned(),
            quoted: QuotedParts::default(),
        })
    );
    assert_eq!(orders.table_id.as_deref(), Some("db:shop.orders"));
    assert_eq!(
        edges(&lineage).into_iter().map(edge_str).collect::<Vec<_>>(),
        vec!["table_1.total -> result_1.column_1 : select"]
    );
}

#[test]
fn test_catalog_matches_qualified_names() {
    let catalog: Catalog = serde_json::from_value(json!({
        "tables": [
            {"catalog": "wh", "schema": "dbo", "name": "Sales", "columns": ["amount", {"name": "region", "payload": {"pii": false}}]}
        ]
    }))
    .unwrap();

    for sql in [
        "select amount from sales",
        "select amount from dbo.sales",
        "select amount from WH.DBO.SALES",
    ] {
        let lineage = lineage_of(sql, &catalog, false);
        assert_eq!(edges(&lineage).len(), 1, "{}", sql);
    }

    // Quoted parts only match the catalog byte-for-byte.
    let lineage = lineage_of(r#"select amount from "wh"."dbo"."Sales""#, &catalog, false);
    assert_eq!(edges(&lineage).len(), 1);
    for sql in [
        r#"select amount from "sales""#,
        r#"select amount from "WH".dbo.sales"#,
    ] {
        let lineage = lineage_of(sql, &catalog, false);
        assert!(edges(&lineage).is_empty(), "{}", sql);
    }

    let lineage = lineage_of("select amount from other.sales", &catalog, false);
    assert!(edges(&lineage).is_empty());
    assert!(tables(&lineage)[0].columns.is_empty());

    let metadata = catalog
        .lookup_table(&TableName::from_parts(&["sales".to_owned()]))
        .unwrap();
    assert_eq!(metadata.table_id, "wh.dbo.Sales");
    assert_eq!(metadata.columns[1].payload, Some(json!({"pii": false})));
}

#[test]
fn test_catalog_from_file() {
    let dir = std::env::temp_dir().join(format!("sqlscope-catalog-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();

    let toml_path = dir.join("catalog.toml");
    std::fs::write(
        &toml_path,
        "[[tables]]\nname = \"t\"\ncolumns = [\"c1\", \"c2\"]\n",
    )
    .unwrap();
    let catalog = Catalog::from_file(&toml_path).unwrap();
    assert_eq!(catalog.tables.len(), 1);

    let json_path = dir.join("catalog.json");
    std::fs::write(
        &json_path,
        r#"{"tables": [{"name": "t", "columns": ["c1"]}, {"name": "T", "columns": ["c2"]}]}"#,
    )
    .unwrap();
    let err = Catalog::from_file(&json_path).unwrap_err();
    assert!(err.to_string().contains("duplicate"));

    let yaml_path = dir.join("catalog.yaml");
    std::fs::write(&yaml_path, "tables: []").unwrap();
    assert!(Catalog::from_file(&yaml_path).is_err());

    std::fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn test_lineage_serialization() {
    let test_data = load_test_data();
    let lineage = lineage_of("select c1 from t order by c2", &test_data.catalog, false);
    let value = serde_json::to_value(&lineage).unwrap();
    let elements = value["elements"].as_array().unwrap();

    assert_eq!(elements[0]["type"], "table");
    assert_eq!(elements[0]["id"], "table_1");
    assert_eq!(elements[0]["table"], json!({"table": "t"}));

    let order_by_edge = elements
        .iter()
        .find(|el| el["type"] == "edge" && el["edgeType"] == "order-by")
        .unwrap();
    assert_eq!(
        order_by_edge["source"],
        json!({"tableId": "table_1", "columnId": "c2"})
    );
    assert_eq!(order_by_edge["target"], json!({"tableId": "result_1"}));

    let roundtrip: Lineage = serde_json::from_value(value).unwrap();
    assert_eq!(roundtrip, lineage);
}

#[test]
fn test_clause_names() {
    assert_eq!("group-by".parse::<Clause>().unwrap(), Clause::GroupBy);
    assert_eq!(Clause::OrderBy.to_string(), "order-by");
    assert_eq!(serde_json::to_value(Clause::Having).unwrap(), json!("having"));
    assert!("groupby".parse::<Clause>().is_err());
}

#[test]
fn test_table_name_key() {
    let name = TableName::from_parts(&["Dbo".to_owned(), "Sales".to_owned()]);
    assert_eq!(name.key(), "dbo.sales");

    let quoted = TableName {
        quoted: QuotedParts {
            table: true,
            ..Default::default()
        },
        ..name.clone()
    };
    assert_eq!(quoted.key(), "dbo.Sales");
    assert_eq!(quoted.to_string(), "Dbo.Sales");
    assert_ne!(quoted, name);
}

#[test]
fn test_merge_uses_resolved_table_identity() {
    let lookup = |name: &TableName| {
        Some(TableMetadata {
            table_id: format!("warehouse.{}", name.table.to_lowercase()),
            payload: None,
            columns: vec![ColumnMetadata {
                column_id: "id".to_owned(),
                payload: None,
            }],
        })
    };

    let sql = "select o.id, p.id from shop.orders o, archive.ORDERS p";
    let lineage = lineage_of(sql, &lookup, true);
    let table_strs: Vec<String> = tables(&lineage).into_iter().map(table_str).collect();
    assert_eq!(
        table_strs,
        vec!["table_1 shop.orders -> o [id]", "result_1 [final result] [id, id]"]
    );
    assert_eq!(
        edges(&lineage).into_iter().map(edge_str).collect::<Vec<_>>(),
        vec![
            "table_1.id -> result_1.column_1 : select",
            "table_1.id -> result_1.column_2 : select",
        ]
    );

    // Without merging every reference keeps its own node.
    let lineage = lineage_of(sql, &lookup, false);
    assert_eq!(tables(&lineage).len(), 3);
}
