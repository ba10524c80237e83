use sqlscope::{
    ast::CARET_MARKER,
    completion::{Completion, VisibleColumn, classify, complete_at, insert_caret},
    lineage::catalog::Catalog,
    parser::parse_sql,
};

fn catalog() -> Catalog {
    toml::from_str(
        r#"
        [[tables]]
        name = "t"
        columns = ["c1", "c2"]

        [[tables]]
        name = "account"
        columns = ["account_type", "account_id"]
        "#,
    )
    .expect("Cannot parse catalog")
}

fn binding(name: &str) -> VisibleColumn {
    VisibleColumn {
        relation: None,
        name: name.to_owned(),
    }
}

fn column(relation: &str, name: &str) -> VisibleColumn {
    VisibleColumn {
        relation: Some(relation.to_owned()),
        name: name.to_owned(),
    }
}

/// Completes at the end of `sql`.
fn complete_at_end(sql: &str) -> Completion {
    complete_at(sql, sql.chars().count(), &catalog())
}

#[test]
fn test_insert_caret() {
    assert_eq!(insert_caret("abc", 1), format!("a{}bc", CARET_MARKER));
    assert_eq!(insert_caret("abc", 0), format!("{}abc", CARET_MARKER));
    assert_eq!(insert_caret("abc", 42), format!("abc{}", CARET_MARKER));
    assert_eq!(insert_caret("éa", 1), format!("é{}a", CARET_MARKER));
}

#[test]
fn test_unqualified_column_position() {
    let expected = Completion::Columns(vec![binding("t"), column("t", "c1"), column("t", "c2")]);

    assert_eq!(complete_at("select  from t", 7, &catalog()), expected);
    // A partially typed name does not narrow the candidates.
    assert_eq!(complete_at("select c from t", 8, &catalog()), expected);
    assert_eq!(complete_at_end("select c1 from t where "), expected);
    assert_eq!(complete_at_end("select c1 from t order by "), expected);
}

#[test]
fn test_qualified_column_position() {
    assert_eq!(
        complete_at("select a. from account a", 9, &catalog()),
        Completion::Columns(vec![
            column("a", "account_type"),
            column("a", "account_id"),
        ])
    );
    assert_eq!(
        complete_at("select nope. from account a", 12, &catalog()),
        Completion::Columns(vec![])
    );
}

#[test]
fn test_join_condition_sees_both_sides() {
    assert_eq!(
        complete_at_end("select * from t join account a on "),
        Completion::Columns(vec![
            binding("t"),
            binding("a"),
            column("t", "c1"),
            column("t", "c2"),
            column("a", "account_type"),
            column("a", "account_id"),
        ])
    );
}

#[test]
fn test_correlated_subquery_sees_outer_bindings() {
    let sql = "select c1 from t where exists (select 1 from account a where a.account_id = )";
    assert_eq!(
        complete_at(sql, sql.len() - 1, &catalog()),
        Completion::Columns(vec![
            binding("a"),
            binding("t"),
            column("a", "account_type"),
            column("a", "account_id"),
        ])
    );
}

#[test]
fn test_outer_table_rebound_only_under_new_alias() {
    let sql = "select c1 from t where exists (select 1 from t x where )";
    assert_eq!(
        complete_at(sql, sql.len() - 1, &catalog()),
        Completion::Columns(vec![
            binding("x"),
            binding("t"),
            column("x", "c1"),
            column("x", "c2"),
        ])
    );

    // Same name as the outer binding: nothing new is bound in the subquery.
    let sql = "select c1 from t where exists (select 1 from t where )";
    assert_eq!(
        complete_at(sql, sql.len() - 1, &catalog()),
        Completion::Columns(vec![binding("t")])
    );
}

#[test]
fn test_relation_position() {
    assert_eq!(
        complete_at_end("select * from "),
        Completion::Relations {
            ctes: vec![],
            prefix: vec![],
        }
    );
    assert_eq!(
        complete_at_end("select * from t join "),
        Completion::Relations {
            ctes: vec![],
            prefix: vec![],
        }
    );
    assert_eq!(
        complete_at_end("select * from dbo.sal"),
        Completion::Relations {
            ctes: vec![],
            prefix: vec!["dbo".to_owned(), "sal".to_owned()],
        }
    );
}

#[test]
fn test_relation_position_lists_visible_ctes() {
    assert_eq!(
        complete_at_end("with recent as (select c1 from t), older as (select c2 from t) select * from "),
        Completion::Relations {
            ctes: vec!["recent".to_owned(), "older".to_owned()],
            prefix: vec![],
        }
    );

    let sql = "with c as (select c1 from t) select * from (select * from )";
    assert_eq!(
        complete_at(sql, sql.len() - 1, &catalog()),
        Completion::Relations {
            ctes: vec!["c".to_owned()],
            prefix: vec![],
        }
    );
}

#[test]
fn test_other_position() {
    // Inside a string literal the caret is just text.
    assert_eq!(
        complete_at("select 'abc' from t", 9, &catalog()),
        Completion::Other
    );
    // The caret breaks the query.
    assert_eq!(complete_at("select c1 from t", 0, &catalog()), Completion::Other);
    // LIMIT references no relation.
    assert_eq!(complete_at_end("select c1 from t limit "), Completion::Other);
}

#[test]
fn test_classify_query() {
    let ast = parse_sql(&format!("select c1 from t; select {} from account", CARET_MARKER)).unwrap();
    assert_eq!(classify(&ast.queries[0], &catalog()).unwrap(), Completion::Other);
    assert_eq!(
        classify(&ast.queries[1], &catalog()).unwrap(),
        Completion::Columns(vec![
            binding("account"),
            column("account", "account_type"),
            column("account", "account_id"),
        ])
    );
}

#[test]
fn test_completion_serialization() {
    let completion = complete_at_end("select * from dbo.");
    assert_eq!(
        serde_json::to_value(&completion).unwrap(),
        serde_json::json!({"relations": {"ctes": [], "prefix": ["dbo"]}})
    );
}
