use serde::Deserialize;
use sqlscope::{
    ast::{CARET_MARKER, Expr, FromExpr, Literal, QueryBody, Select, SelectItem, TokenType},
    parser::parse_sql,
    scanner::Scanner,
};

#[derive(Deserialize, Debug)]
struct ParsingTest {
    sql: String,
}

#[derive(Deserialize, Debug)]
struct ParsingTestData {
    tests: Vec<ParsingTest>,
}

const PARSING_TESTS_FILE: &str = "tests/parsing_tests.toml";

fn test_sql(sql: &str) {
    let ast = parse_sql(sql);
    if let Err(err) = &ast {
        println!("{}", err)
    }
    assert!(ast.is_ok());
}

fn first_select(sql: &str) -> Select {
    let mut ast = parse_sql(sql).unwrap_or_else(|err| panic!("Could not parse sql due to: {}", err));
    match ast.queries.remove(0).body {
        QueryBody::Select(select) => *select,
        body => panic!("Expected select, found {:?}", body),
    }
}

#[test]
fn test_should_parse() {
    let parsing_test_file =
        std::fs::read_to_string(PARSING_TESTS_FILE).expect("Cannot open parsing test cases");
    let test_parsing_data: ParsingTestData =
        toml::from_str(&parsing_test_file).expect("Cannot parse test cases defined in toml");

    for test in test_parsing_data.tests {
        let sql = &test.sql;
        println!("Testing parsing for SQL: {}", sql);
        test_sql(sql);
        test_sql(&sql.to_uppercase());
        test_sql(&sql.to_lowercase());
    }
}

#[test]
fn test_should_not_parse() {
    let sqls = [
        "select",
        "select c1 from",
        "select c1 from t join account",
        "select c1 from t t2 t3",
        "select cast(c1 as ) from t",
        "with x as select 1 select * from x",
        // Cannot group again join op
        "select * from ((select 1 as x) a join (select 1 as y) b on true)",
        // Scanner errors
        "select 'unterminated",
        "select c1 from t where c1 ! 1",
        r#"select "" from t"#,
        "select 1 /* unterminated",
        "select 1.2.3",
    ];
    for sql in sqls {
        println!("Testing parsing failure for SQL: {}", sql);
        assert!(parse_sql(sql).is_err());
    }
}

#[test]
fn test_error_messages() {
    let err = parse_sql("select c1 from t join account").unwrap_err();
    let message = err.to_string();
    assert!(message.starts_with("[line 1, col "), "{}", message);
    assert!(message.ends_with("Expected `ON` or `USING`."), "{}", message);

    let err = parse_sql("select\n 'abc").unwrap_err();
    assert!(
        err.to_string()
            .starts_with("[line: 2, col: 6] Scanner error: Found unterminated string"),
        "{}",
        err
    );
}

#[test]
fn test_token_positions() {
    let mut scanner = Scanner::new("select\n  a");
    scanner.scan().unwrap();
    let tokens = scanner.tokens();

    assert_eq!(tokens[0].kind, TokenType::Select);
    assert_eq!(
        (tokens[0].line, tokens[0].col, tokens[0].offset),
        (1, 1, 0)
    );
    assert_eq!(tokens[1].kind, TokenType::Identifier("a".to_owned()));
    assert_eq!(
        (tokens[1].line, tokens[1].col, tokens[1].offset),
        (2, 3, 9)
    );
    assert_eq!(tokens[2].kind, TokenType::Eof);
}

#[test]
fn test_quoted_identifiers_and_strings() {
    let mut scanner = Scanner::new(r#"select "a ""b""", `c`, 'it''s'"#);
    scanner.scan().unwrap();
    let kinds: Vec<&TokenType> = scanner.tokens().iter().map(|tok| &tok.kind).collect();
    assert_eq!(
        kinds,
        vec![
            &TokenType::Select,
            &TokenType::QuotedIdentifier(r#"a "b""#.to_owned()),
            &TokenType::Comma,
            &TokenType::QuotedIdentifier("c".to_owned()),
            &TokenType::Comma,
            &TokenType::String("it's".to_owned()),
            &TokenType::Eof,
        ]
    );

    let select = first_select(r#"select "Col", col from `My Table`"#);
    match &select.items[0] {
        SelectItem::Expr(item) => match &item.expr {
            Expr::Identifier(ident) => {
                assert_eq!(ident.value, "Col");
                assert!(ident.quoted);
                assert!(ident.matches("Col"));
                assert!(!ident.matches("col"));
            }
            expr => panic!("Expected identifier, found {:?}", expr),
        },
        item => panic!("Expected expression, found {:?}", item),
    }
    match &select.items[1] {
        SelectItem::Expr(item) => match &item.expr {
            Expr::Identifier(ident) => {
                assert!(!ident.quoted);
                assert!(ident.matches("COL"));
            }
            expr => panic!("Expected identifier, found {:?}", expr),
        },
        item => panic!("Expected expression, found {:?}", item),
    }
    match &select.from {
        Some(FromExpr::Table(table)) => {
            assert_eq!(table.name.dotted(), "My Table");
            assert!(table.name.base().quoted);
        }
        from => panic!("Expected table, found {:?}", from),
    }
}

#[test]
fn test_select_item_text() {
    let select = first_select("select  c1 +   c2, upper(c1), 'x' as lit from t");
    let texts: Vec<&str> = select
        .items
        .iter()
        .map(|item| match item {
            SelectItem::Expr(item) => item.text.as_str(),
            item => panic!("Expected expression, found {:?}", item),
        })
        .collect();
    assert_eq!(texts, vec!["c1 + c2", "upper(c1)", "'x'"]);

    match &select.items[2] {
        SelectItem::Expr(item) => {
            assert!(matches!(&item.expr, Expr::Literal(Literal::String(s)) if s == "x"));
            assert_eq!(item.alias.as_ref().map(|alias| alias.value.as_str()), Some("lit"));
        }
        item => panic!("Expected expression, found {:?}", item),
    }
}

#[test]
fn test_caret() {
    let mut scanner = Scanner::new(&format!("select ab{}", CARET_MARKER));
    scanner.scan().unwrap();
    let tokens = scanner.tokens();
    assert_eq!(tokens[1].kind, TokenType::Identifier("ab".to_owned()));
    assert_eq!(tokens[2].kind, TokenType::Caret);
    assert_eq!(tokens[1].end().offset, tokens[2].offset);

    let select = first_select(&format!("select t.ab{} from t", CARET_MARKER));
    match &select.items[0] {
        SelectItem::Expr(item) => match &item.expr {
            Expr::Caret(caret) => {
                assert_eq!(caret.prefix.as_deref(), Some("ab"));
                assert_eq!(caret.qualifier.len(), 1);
                assert_eq!(caret.qualifier[0].value, "t");
                assert_eq!(caret.range.start.offset, 11);
            }
            expr => panic!("Expected caret, found {:?}", expr),
        },
        item => panic!("Expected expression, found {:?}", item),
    }

    // Nothing can start right after a complete select item.
    assert!(parse_sql(&format!("select ab {} from t", CARET_MARKER)).is_err());

    let select = first_select(&format!("select * from sch.{}", CARET_MARKER));
    match &select.from {
        Some(FromExpr::Caret(caret)) => {
            assert_eq!(caret.prefix, None);
            assert_eq!(caret.qualifier[0].value, "sch");
        }
        from => panic!("Expected caret, found {:?}", from),
    }
}
