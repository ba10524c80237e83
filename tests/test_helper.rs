use sqlscope::lineage::{
    Lineage, LineageOptions,
    builder::{Edge, EdgeEndpoint},
    catalog::Catalog,
    helper::{Focus, FoundElement, LineageHelper, LineageHelperError},
    scope::Clause,
    sql_lineage,
};

const NESTED_SQL: &str = r#"
select foo
from (
    select foo, uhu, bar
    from (
        select concat(buzz, foo) as foo, foo as foo2, zoo, uhu, bar
        from sales
    ) t1
    where zoo = ''
) t2
order by bar
"#;

fn nested_lineage() -> Lineage {
    let catalog: Catalog = toml::from_str(
        r#"
        [[tables]]
        name = "sales"
        columns = ["buzz", "foo", "zoo", "uhu", "bar"]
        "#,
    )
    .expect("Cannot parse catalog");
    sql_lineage(NESTED_SQL, &catalog, LineageOptions::default())
        .unwrap_or_else(|err| panic!("Could not extract lineage due to: {}", err))
}

fn column(table_id: &str, column_id: &str) -> Focus {
    Focus::Column {
        table_id: table_id.to_owned(),
        column_id: column_id.to_owned(),
    }
}

fn endpoint(table_id: &str, column_id: Option<&str>) -> EdgeEndpoint {
    EdgeEndpoint {
        table_id: table_id.to_owned(),
        column_id: column_id.map(str::to_owned),
    }
}

/// Short form of a found element, for readable assertions.
fn describe(element: &FoundElement) -> String {
    match element {
        FoundElement::Table(table) => format!("table {}", table.id),
        FoundElement::Column { table_id, column } => {
            format!("column {}.{} ({})", table_id, column.id, column.label)
        }
        FoundElement::Edge(edge) => format!(
            "edge {}.{} -> {}.{}",
            edge.source.table_id,
            edge.source.column_id.as_deref().unwrap_or("*"),
            edge.target.table_id,
            edge.target.column_id.as_deref().unwrap_or("*"),
        ),
    }
}

#[test]
fn test_find_element() {
    let lineage = nested_lineage();
    let helper = LineageHelper::new(&lineage.elements);

    match helper.find_element(&Focus::Table {
        table_id: "result_2".to_owned(),
    }) {
        Some(FoundElement::Table(table)) => assert_eq!(table.label, "t2"),
        other => panic!("Expected table, found {:?}", other),
    }

    match helper.find_element(&column("result_3", "column_2")) {
        Some(FoundElement::Column { table_id, column }) => {
            assert_eq!(table_id, "result_3");
            assert_eq!(column.label, "foo2");
        }
        other => panic!("Expected column, found {:?}", other),
    }

    let edge = Edge {
        source: endpoint("result_2", Some("column_3")),
        target: endpoint("result_1", None),
        edge_type: Some(Clause::OrderBy),
    };
    assert_eq!(
        helper.find_element(&Focus::Edge(edge.clone())),
        Some(FoundElement::Edge(edge.clone()))
    );

    let wrong_type = Edge {
        edge_type: Some(Clause::Select),
        ..edge
    };
    assert_eq!(helper.find_element(&Focus::Edge(wrong_type)), None);
    assert_eq!(helper.find_element(&column("result_3", "column_9")), None);
    assert_eq!(
        helper.find_element(&Focus::Table {
            table_id: "result_9".to_owned()
        }),
        None
    );
}

#[test]
fn test_find_edges_match_exact_endpoints() {
    let lineage = nested_lineage();
    let helper = LineageHelper::new(&lineage.elements);

    let from_foo = helper.find_edges_from_source(&column("table_1", "foo"));
    assert_eq!(
        from_foo
            .iter()
            .map(|edge| edge.target.column_id.as_deref())
            .collect::<Vec<_>>(),
        vec![Some("column_1"), Some("column_2")]
    );

    // Table-level focus only matches table-level endpoints.
    assert!(
        helper
            .find_edges_from_source(&Focus::Table {
                table_id: "table_1".to_owned()
            })
            .is_empty()
    );
    let to_result_2 = helper.find_edges_to_target(&Focus::Table {
        table_id: "result_2".to_owned(),
    });
    assert_eq!(to_result_2.len(), 1);
    assert_eq!(to_result_2[0].edge_type, Some(Clause::Where));
    assert_eq!(to_result_2[0].source, endpoint("result_3", Some("column_3")));

    let to_foo = helper.find_edges_to_target(&column("result_3", "column_1"));
    assert_eq!(to_foo.len(), 2);
}

#[test]
fn test_find_connected_elements() {
    let lineage = nested_lineage();
    let helper = LineageHelper::new(&lineage.elements);

    let connected = helper
        .find_connected_elements(&column("result_2", "column_3"))
        .unwrap();
    assert_eq!(
        connected.iter().map(describe).collect::<Vec<_>>(),
        vec![
            "column result_2.column_3 (bar)",
            "edge result_3.column_5 -> result_2.column_3",
            "column result_3.column_5 (bar)",
            "edge table_1.bar -> result_3.column_5",
            "column table_1.bar (bar)",
            "edge result_2.column_3 -> result_1.*",
            "table result_1",
        ]
    );
    match &connected[5] {
        FoundElement::Edge(edge) => assert_eq!(edge.edge_type, Some(Clause::OrderBy)),
        other => panic!("Expected edge, found {:?}", other),
    }
}

#[test]
fn test_find_connected_elements_fans_in() {
    let lineage = nested_lineage();
    let helper = LineageHelper::new(&lineage.elements);

    let connected = helper
        .find_connected_elements(&column("result_1", "column_1"))
        .unwrap();
    assert_eq!(
        connected.iter().map(describe).collect::<Vec<_>>(),
        vec![
            "column result_1.column_1 (foo)",
            "edge result_2.column_1 -> result_1.column_1",
            "column result_2.column_1 (foo)",
            "edge result_3.column_1 -> result_2.column_1",
            "column result_3.column_1 (foo)",
            "edge table_1.buzz -> result_3.column_1",
            "column table_1.buzz (buzz)",
            "edge table_1.foo -> result_3.column_1",
            "column table_1.foo (foo)",
        ]
    );
}

#[test]
fn test_find_connected_elements_from_edge() {
    let lineage = nested_lineage();
    let helper = LineageHelper::new(&lineage.elements);

    let edge = Edge {
        source: endpoint("result_3", Some("column_3")),
        target: endpoint("result_2", None),
        edge_type: Some(Clause::Where),
    };
    let connected = helper
        .find_connected_elements(&Focus::Edge(edge))
        .unwrap();
    assert_eq!(
        connected.iter().map(describe).collect::<Vec<_>>(),
        vec![
            "edge result_3.column_3 -> result_2.*",
            "column result_3.column_3 (zoo)",
            "edge table_1.zoo -> result_3.column_3",
            "column table_1.zoo (zoo)",
            "table result_2",
        ]
    );
}

#[test]
fn test_find_connected_elements_not_found() {
    let lineage = nested_lineage();
    let helper = LineageHelper::new(&lineage.elements);

    let err = helper
        .find_connected_elements(&column("result_2", "column_42"))
        .unwrap_err();
    assert_eq!(
        err.downcast_ref::<LineageHelperError>(),
        Some(&LineageHelperError::ElementNotFound(
            "column `result_2.column_42`".to_owned()
        ))
    );
}
