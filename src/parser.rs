use anyhow::anyhow;
use strum::IntoDiscriminant;

use crate::ast::{
    Ast, BetweenExpr, BinaryExpr, BinaryOperator, CaretExpr, CaseExpr, CastExpr, Cte,
    DerivedTable, ExistsExpr, Expr, FromExpr, FunctionArg, FunctionExpr, Ident, InListExpr,
    InSubqueryExpr, IsExpr, IsValue, JoinConstraint, JoinExpr, JoinKind, LikeExpr, Limit,
    Literal, NullsOrder, ObjectName, OrderBy, OrderByItem, Position, Query, QueryBody,
    QualifiedStarItem, Select, SelectExprItem, SelectItem, SetOperation, SetOperator,
    SortDirection, SourceRange, TableAlias, TableFactor, Token, TokenType, TokenTypeVariant,
    UnaryExpr, UnaryOperator, WindowSpec, With,
};
use crate::scanner::Scanner;

pub struct Parser<'a> {
    source_tokens: &'a Vec<Token>,
    curr: usize,
}

impl<'a> Parser<'a> {
    pub fn new(tokens: &'a Vec<Token>) -> Parser<'a> {
        Self {
            source_tokens: tokens,
            curr: 0,
        }
    }

    pub fn parse(&mut self) -> anyhow::Result<Ast> {
        self.parse_queries()
    }

    fn peek_prev(&self) -> &Token {
        &self.source_tokens[self.curr.saturating_sub(1)]
    }

    fn peek(&self) -> &Token {
        &self.source_tokens[self.curr]
    }

    fn peek_next_i(&self, i: usize) -> &Token {
        match self.source_tokens.get(self.curr + i) {
            Some(tok) => tok,
            // Eof
            None => &self.source_tokens[self.source_tokens.len() - 1],
        }
    }

    fn advance(&mut self) -> &Token {
        if !self.is_at_end() {
            // Do not advance if we peek Eof
            self.curr += 1;
        }
        self.peek_prev()
    }

    fn is_at_end(&self) -> bool {
        self.peek().kind == TokenType::Eof
    }

    fn check_token_type(&self, token_type: TokenTypeVariant) -> bool {
        self.peek().kind.discriminant() == token_type
    }

    fn match_token_type(&mut self, token_type: TokenTypeVariant) -> bool {
        if self.check_token_type(token_type) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn match_token_types(&mut self, token_types: &[TokenTypeVariant]) -> bool {
        for tok in token_types {
            if self.check_token_type(*tok) {
                self.advance();
                return true;
            }
        }
        false
    }

    fn check_non_reserved_keyword(&self, value: &str) -> bool {
        match &self.peek().kind {
            TokenType::Identifier(ident) => ident.to_lowercase() == value,
            _ => false,
        }
    }

    fn match_non_reserved_keyword(&mut self, value: &str) -> bool {
        if self.check_non_reserved_keyword(value) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn consume_one_of_non_reserved_keywords(&mut self, values: &[&str]) -> anyhow::Result<&Token> {
        for value in values {
            if self.check_non_reserved_keyword(value) {
                return Ok(self.advance());
            }
        }
        let err_msg = values
            .iter()
            .map(|el| format!("`{}`", el.to_uppercase()))
            .collect::<Vec<String>>()
            .join(" or ");
        Err(anyhow!(self.error(
            self.peek(),
            &format!("Expected one of: {}.", err_msg)
        )))
    }

    fn check_identifier(&self) -> bool {
        self.check_token_type(TokenTypeVariant::Identifier)
            || self.check_token_type(TokenTypeVariant::QuotedIdentifier)
    }

    fn consume(&mut self, token_type: TokenTypeVariant) -> anyhow::Result<&Token> {
        if self.check_token_type(token_type) {
            Ok(self.advance())
        } else {
            let err_msg = format!("Expected `{}`.", token_type.variant_str());
            Err(anyhow!(self.error(self.peek(), &err_msg)))
        }
    }

    fn consume_one_of(&mut self, token_types: &[TokenTypeVariant]) -> anyhow::Result<&Token> {
        for token_type in token_types {
            if self.check_token_type(*token_type) {
                return Ok(self.advance());
            }
        }
        let err_msg = token_types
            .iter()
            .map(|el| format!("`{}`", el.variant_str()))
            .collect::<Vec<String>>()
            .join(" or ");
        Err(anyhow!(self.error(
            self.peek(),
            &format!("Expected one of: {}.", err_msg)
        )))
    }

    fn consume_identifier(&mut self) -> anyhow::Result<Ident> {
        let tok = self.consume_one_of(&[
            TokenTypeVariant::Identifier,
            TokenTypeVariant::QuotedIdentifier,
        ])?;
        Ok(ident_from_token(tok))
    }

    fn error(&self, token: &Token, message: &str) -> String {
        format!(
            "[line {}, col {}] Error {}: {}",
            token.line,
            token.col,
            &format!("at '{}'", token.lexeme),
            message
        )
    }

    fn range_from(&self, start_token: usize) -> SourceRange {
        let start = self.source_tokens[start_token].start();
        let end = if self.curr > start_token {
            self.peek_prev().end()
        } else {
            start
        };
        SourceRange { start, end }
    }

    /// Rebuilds the source text of the tokens in `start..end`, collapsing whitespace runs.
    fn text_between(&self, start: usize, end: usize) -> String {
        let mut text = String::new();
        let mut prev_end: Option<Position> = None;
        for tok in &self.source_tokens[start..end] {
            if prev_end.is_some_and(|pos| pos.offset < tok.offset) {
                text.push(' ');
            }
            text.push_str(&tok.lexeme);
            prev_end = Some(tok.end());
        }
        text
    }

    /// A caret immediately following `ident` in the source, i.e. a partially typed name.
    fn check_glued_caret(&self) -> bool {
        self.check_token_type(TokenTypeVariant::Caret)
            && self.peek_prev().end().offset == self.peek().offset
    }

    fn caret_expr(&mut self, qualifier: Vec<Ident>, prefix: Option<String>) -> CaretExpr {
        let caret = self.advance();
        CaretExpr {
            qualifier,
            prefix,
            range: SourceRange {
                start: caret.start(),
                end: caret.end(),
            },
        }
    }

    // queries -> [query (";" query)* [";"]]
    fn parse_queries(&mut self) -> anyhow::Result<Ast> {
        let mut queries = vec![];

        loop {
            while self.match_token_type(TokenTypeVariant::Semicolon) {}
            if self.check_token_type(TokenTypeVariant::Eof) {
                break;
            }

            queries.push(self.parse_query()?);

            if !self.check_token_type(TokenTypeVariant::Eof) {
                self.consume(TokenTypeVariant::Semicolon)?;
            }
        }

        self.consume(TokenTypeVariant::Eof)?;
        Ok(Ast { queries })
    }

    // query ->
    // ["WITH" with_expr] query_body
    // ["ORDER" "BY" order_by_expr]
    // ["LIMIT" expr ["OFFSET" expr]]
    fn parse_query(&mut self) -> anyhow::Result<Query> {
        let start = self.curr;
        let with = if self.match_token_type(TokenTypeVariant::With) {
            Some(self.parse_with_expr()?)
        } else {
            None
        };

        let body = self.parse_query_body()?;

        let order_by = if self.match_token_type(TokenTypeVariant::Order) {
            self.consume(TokenTypeVariant::By)?;
            Some(OrderBy {
                items: self.parse_order_by_expr()?,
            })
        } else {
            None
        };

        let limit = if self.match_token_type(TokenTypeVariant::Limit) {
            let count = self.parse_expr()?;
            let offset = if self.match_non_reserved_keyword("offset") {
                Some(self.parse_expr()?)
            } else {
                None
            };
            Some(Limit { count, offset })
        } else {
            None
        };

        Ok(Query {
            with,
            body,
            order_by,
            limit,
            range: self.range_from(start),
        })
    }

    // query_body -> query_term (("UNION" | "INTERSECT" | "EXCEPT") ["ALL" | "DISTINCT"] query_term)*
    fn parse_query_body(&mut self) -> anyhow::Result<QueryBody> {
        let mut output = self.parse_query_term()?;

        loop {
            let operator = match self.peek().kind {
                TokenType::Union => {
                    self.advance();
                    if self.match_token_type(TokenTypeVariant::All) {
                        SetOperator::UnionAll
                    } else {
                        self.match_token_type(TokenTypeVariant::Distinct);
                        SetOperator::Union
                    }
                }
                TokenType::Intersect | TokenType::Except => {
                    let operator = if self.advance().kind == TokenType::Intersect {
                        SetOperator::Intersect
                    } else {
                        SetOperator::Except
                    };
                    self.match_token_types(&[TokenTypeVariant::All, TokenTypeVariant::Distinct]);
                    operator
                }
                _ => break,
            };
            let right = self.parse_query_term()?;
            output = QueryBody::SetOperation(SetOperation {
                left: Box::new(output),
                operator,
                right: Box::new(right),
            });
        }

        Ok(output)
    }

    // query_term -> select | "(" query ")"
    fn parse_query_term(&mut self) -> anyhow::Result<QueryBody> {
        if self.match_token_type(TokenTypeVariant::LeftParen) {
            let query = self.parse_query()?;
            self.consume(TokenTypeVariant::RightParen)?;
            Ok(QueryBody::Nested(Box::new(query)))
        } else {
            Ok(QueryBody::Select(Box::new(self.parse_select()?)))
        }
    }

    // with_expr -> ["RECURSIVE"] cte ("," cte)*
    // where:
    // cte -> ("Identifier" | "QuotedIdentifier") [column_list] "AS" "(" query ")"
    fn parse_with_expr(&mut self) -> anyhow::Result<With> {
        let recursive = self.match_token_type(TokenTypeVariant::Recursive);
        let mut ctes = vec![];
        loop {
            let start = self.curr;
            let name = self.consume_identifier()?;
            let columns = if self.check_token_type(TokenTypeVariant::LeftParen) {
                self.parse_column_list()?
            } else {
                vec![]
            };
            self.consume(TokenTypeVariant::As)?;
            self.consume(TokenTypeVariant::LeftParen)?;
            let query = self.parse_query()?;
            self.consume(TokenTypeVariant::RightParen)?;
            ctes.push(Cte {
                name,
                columns,
                query,
                range: self.range_from(start),
            });

            if !self.match_token_type(TokenTypeVariant::Comma) {
                break;
            }
        }
        Ok(With { recursive, ctes })
    }

    // column_list -> "(" ("Identifier" | "QuotedIdentifier") ("," ("Identifier" | "QuotedIdentifier"))* ")"
    fn parse_column_list(&mut self) -> anyhow::Result<Vec<Ident>> {
        self.consume(TokenTypeVariant::LeftParen)?;
        let mut columns = vec![self.consume_identifier()?];
        while self.match_token_type(TokenTypeVariant::Comma) {
            columns.push(self.consume_identifier()?);
        }
        self.consume(TokenTypeVariant::RightParen)?;
        Ok(columns)
    }

    // order_by_expr -> expr [("ASC" | "DESC")] [("NULLS" "FIRST" | "NULLS" "LAST")] ("," ...)*
    fn parse_order_by_expr(&mut self) -> anyhow::Result<Vec<OrderByItem>> {
        let mut items = vec![];

        loop {
            let expr = self.parse_expr()?;

            let direction = if self.match_token_type(TokenTypeVariant::Asc) {
                Some(SortDirection::Asc)
            } else if self.match_token_type(TokenTypeVariant::Desc) {
                Some(SortDirection::Desc)
            } else {
                None
            };

            let nulls = if self.match_token_type(TokenTypeVariant::Nulls) {
                let tok = self.consume_one_of_non_reserved_keywords(&["first", "last"])?;
                match &tok.kind {
                    TokenType::Identifier(s) if s.to_lowercase() == "first" => {
                        Some(NullsOrder::First)
                    }
                    _ => Some(NullsOrder::Last),
                }
            } else {
                None
            };

            items.push(OrderByItem {
                expr,
                direction,
                nulls,
            });

            if !self.match_token_type(TokenTypeVariant::Comma) {
                break;
            }
        }

        Ok(items)
    }

    // select ->
    // "SELECT"
    // [("ALL" | "DISTINCT")]
    // select_item ("," select_item)*
    // ["FROM" from_expr]
    // ["WHERE" expr]
    // ["GROUP" "BY" expr ("," expr)*]
    // ["HAVING" expr]
    fn parse_select(&mut self) -> anyhow::Result<Select> {
        self.consume(TokenTypeVariant::Select)?;

        let distinct = self.match_token_type(TokenTypeVariant::Distinct);
        if !distinct {
            self.match_token_type(TokenTypeVariant::All);
        }

        let mut items = vec![self.parse_select_item()?];
        while self.match_token_type(TokenTypeVariant::Comma) {
            items.push(self.parse_select_item()?);
        }

        let from = if self.match_token_type(TokenTypeVariant::From) {
            Some(self.parse_from_expr()?)
        } else {
            None
        };

        let r#where = if self.match_token_type(TokenTypeVariant::Where) {
            Some(self.parse_expr()?)
        } else {
            None
        };

        let group_by = if self.match_token_type(TokenTypeVariant::Group) {
            self.consume(TokenTypeVariant::By)?;
            let mut exprs = vec![self.parse_expr()?];
            while self.match_token_type(TokenTypeVariant::Comma) {
                exprs.push(self.parse_expr()?);
            }
            Some(exprs)
        } else {
            None
        };

        let having = if self.match_token_type(TokenTypeVariant::Having) {
            Some(self.parse_expr()?)
        } else {
            None
        };

        Ok(Select {
            distinct,
            items,
            from,
            r#where,
            group_by,
            having,
        })
    }

    /// Whether the upcoming tokens are `name ("." name)* "." "*"`.
    fn is_qualified_star(&self) -> bool {
        let mut i = 0;
        loop {
            match self.peek_next_i(i).kind {
                TokenType::Identifier(_) | TokenType::QuotedIdentifier(_) => {}
                _ => return false,
            }
            if self.peek_next_i(i + 1).kind != TokenType::Dot {
                return false;
            }
            if self.peek_next_i(i + 2).kind == TokenType::Star {
                return true;
            }
            i += 2;
        }
    }

    // select_item -> "*" | name ("." name)* "." "*" | expr [as_alias]
    fn parse_select_item(&mut self) -> anyhow::Result<SelectItem> {
        let start = self.curr;
        if self.match_token_type(TokenTypeVariant::Star) {
            return Ok(SelectItem::Star(self.range_from(start)));
        }

        if self.is_qualified_star() {
            let mut parts = vec![self.consume_identifier()?];
            self.consume(TokenTypeVariant::Dot)?;
            while !self.match_token_type(TokenTypeVariant::Star) {
                parts.push(self.consume_identifier()?);
                self.consume(TokenTypeVariant::Dot)?;
            }
            return Ok(SelectItem::QualifiedStar(QualifiedStarItem {
                qualifier: ObjectName { parts },
                range: self.range_from(start),
            }));
        }

        let expr = match self.parse_expr() {
            Err(_) => {
                return Err(anyhow!(self.error(self.peek(), "Expected Expression.")));
            }
            Ok(expr) => expr,
        };
        let text = self.text_between(start, self.curr);
        let alias = self.parse_as_alias()?;
        Ok(SelectItem::Expr(SelectExprItem {
            expr,
            alias,
            text,
            range: self.range_from(start),
        }))
    }

    // as_alias -> ["AS"] ("Identifier" | "QuotedIdentifier")
    fn parse_as_alias(&mut self) -> anyhow::Result<Option<Ident>> {
        if self.match_token_type(TokenTypeVariant::As) {
            return Ok(Some(self.consume_identifier()?));
        }
        if self.check_identifier() && !self.check_non_reserved_keyword("offset") {
            return Ok(Some(self.consume_identifier()?));
        }
        Ok(None)
    }

    // table_alias -> as_alias [column_list]
    fn parse_table_alias(&mut self) -> anyhow::Result<Option<TableAlias>> {
        let Some(name) = self.parse_as_alias()? else {
            return Ok(None);
        };
        let columns = if self.check_token_type(TokenTypeVariant::LeftParen) {
            self.parse_column_list()?
        } else {
            vec![]
        };
        Ok(Some(TableAlias { name, columns }))
    }

    // from_expr -> from_item (cross_join_op from_item | cond_join_op from_item cond)*
    // where:
    // cross_join_op -> "CROSS" "JOIN" | ","
    // cond_join_op -> ["NATURAL"] (["INNER"] "JOIN" | ("LEFT" | "RIGHT" | "FULL") ["OUTER"] "JOIN")
    // cond -> "ON" expr | "USING" column_list
    fn parse_from_expr(&mut self) -> anyhow::Result<FromExpr> {
        let mut output = self.parse_from_item()?;

        loop {
            let (kind, natural) = match self.peek().kind {
                TokenType::Comma => {
                    self.advance();
                    (JoinKind::Cross, false)
                }
                TokenType::Cross => {
                    self.advance();
                    self.consume(TokenTypeVariant::Join)?;
                    (JoinKind::Cross, false)
                }
                TokenType::Natural
                | TokenType::Inner
                | TokenType::Join
                | TokenType::Left
                | TokenType::Right
                | TokenType::Full => self.parse_cond_join_op()?,
                _ => break,
            };
            let right = self.parse_from_item()?;
            let constraint = if kind == JoinKind::Cross {
                JoinConstraint::None
            } else if natural {
                JoinConstraint::Natural
            } else if matches!(right, FromExpr::Caret(_)) {
                // Nothing can follow the cursor.
                JoinConstraint::None
            } else {
                self.parse_join_constraint()?
            };
            output = FromExpr::Join(Box::new(JoinExpr {
                kind,
                left: output,
                right,
                constraint,
            }));
        }
        Ok(output)
    }

    fn parse_cond_join_op(&mut self) -> anyhow::Result<(JoinKind, bool)> {
        let natural = self.match_token_type(TokenTypeVariant::Natural);
        let tok = self.consume_one_of(&[
            TokenTypeVariant::Inner,
            TokenTypeVariant::Join,
            TokenTypeVariant::Left,
            TokenTypeVariant::Right,
            TokenTypeVariant::Full,
        ])?;
        let kind = match tok.kind {
            TokenType::Left => JoinKind::Left,
            TokenType::Right => JoinKind::Right,
            TokenType::Full => JoinKind::Full,
            _ => JoinKind::Inner,
        };
        if self.peek_prev().kind != TokenType::Join {
            if kind != JoinKind::Inner {
                self.match_token_type(TokenTypeVariant::Outer);
            }
            self.consume(TokenTypeVariant::Join)?;
        }
        Ok((kind, natural))
    }

    fn parse_join_constraint(&mut self) -> anyhow::Result<JoinConstraint> {
        if self.match_token_type(TokenTypeVariant::On) {
            Ok(JoinConstraint::On(self.parse_expr()?))
        } else if self.match_token_type(TokenTypeVariant::Using) {
            Ok(JoinConstraint::Using(self.parse_column_list()?))
        } else {
            Err(anyhow!(
                self.error(self.peek(), "Expected `ON` or `USING`.")
            ))
        }
    }

    // from_item -> table_factor | "(" query ")" [table_alias] | "(" from_expr ")" | caret
    fn parse_from_item(&mut self) -> anyhow::Result<FromExpr> {
        let start = self.curr;
        if self.match_token_type(TokenTypeVariant::LeftParen) {
            // lookahead to check whether we can parse a query
            let mut i = 0;
            while self.peek_next_i(i).kind == TokenType::LeftParen {
                i += 1;
            }
            let lookahead = &self.peek_next_i(i).kind;
            if *lookahead == TokenType::Select || *lookahead == TokenType::With {
                let query = self.parse_query()?;
                self.consume(TokenTypeVariant::RightParen)?;
                let alias = self.parse_table_alias()?;
                Ok(FromExpr::Derived(DerivedTable {
                    query: Box::new(query),
                    alias,
                    range: self.range_from(start),
                }))
            } else {
                let from_expr = self.parse_from_expr()?;
                self.consume(TokenTypeVariant::RightParen)?;
                Ok(FromExpr::Nested(Box::new(from_expr)))
            }
        } else {
            self.parse_table_factor()
        }
    }

    // table_factor -> name ("." name)* [table_alias]
    fn parse_table_factor(&mut self) -> anyhow::Result<FromExpr> {
        let start = self.curr;
        let mut parts = vec![];
        loop {
            if self.check_token_type(TokenTypeVariant::Caret) {
                return Ok(FromExpr::Caret(self.caret_expr(parts, None)));
            }
            let ident = self.consume_identifier()?;
            if self.check_glued_caret() {
                return Ok(FromExpr::Caret(self.caret_expr(parts, Some(ident.value))));
            }
            parts.push(ident);
            if !self.match_token_type(TokenTypeVariant::Dot) {
                break;
            }
        }
        let alias = self.parse_table_alias()?;
        Ok(FromExpr::Table(TableFactor {
            name: ObjectName { parts },
            alias,
            range: self.range_from(start),
        }))
    }

    // expr -> or_expr
    fn parse_expr(&mut self) -> anyhow::Result<Expr> {
        self.parse_or_expr()
    }

    /// Util function to parse a standard binary rule expression of kind
    ///
    /// `parse_rule -> parse_rule | next_parsing_rule ("T1" | "T2" | ... next_parsing_rule)*`
    fn parse_standard_binary_expr(
        &mut self,
        token_types_to_match: &[TokenTypeVariant],
        next_parsing_rule_fn: impl Fn(&mut Self) -> anyhow::Result<Expr>,
    ) -> anyhow::Result<Expr> {
        let mut output = next_parsing_rule_fn(self)?;

        while self.match_token_types(token_types_to_match) {
            let operator = binary_operator(&self.peek_prev().kind);
            let right = next_parsing_rule_fn(self)?;
            output = Expr::Binary(BinaryExpr {
                left: Box::new(output),
                operator,
                right: Box::new(right),
            });
        }

        Ok(output)
    }

    // or_expr -> and_expr ("OR" and_expr)*
    fn parse_or_expr(&mut self) -> anyhow::Result<Expr> {
        self.parse_standard_binary_expr(&[TokenTypeVariant::Or], Self::parse_and_expr)
    }

    // and_expr -> not_expr ("AND" not_expr)*
    fn parse_and_expr(&mut self) -> anyhow::Result<Expr> {
        self.parse_standard_binary_expr(&[TokenTypeVariant::And], Self::parse_not_expr)
    }

    // not_expr -> "NOT" not_expr | comparison_expr
    fn parse_not_expr(&mut self) -> anyhow::Result<Expr> {
        if self.check_token_type(TokenTypeVariant::Not)
            && self.peek_next_i(1).kind != TokenType::Exists
        {
            self.advance();
            return Ok(Expr::Unary(UnaryExpr {
                operator: UnaryOperator::Not,
                expr: Box::new(self.parse_not_expr()?),
            }));
        }
        self.parse_comparison_expr()
    }

    // comparison_expr ->
    // bitwise_or_expr
    // | bitwise_or_expr (("=" | ">" | "<" | ">=" | "<=", | "!=", | "<>") bitwise_or_expr)*
    // | bitwise_or_expr "IS" ["NOT"] ("TRUE" | "FALSE" | "NULL")
    // | bitwise_or_expr ["NOT"] "IN" "(" (query | expr ("," expr)*) ")"
    // | bitwise_or_expr ["NOT"] "BETWEEN" bitwise_or_expr "AND" bitwise_or_expr
    // | bitwise_or_expr ["NOT"] "LIKE" bitwise_or_expr
    fn parse_comparison_expr(&mut self) -> anyhow::Result<Expr> {
        let mut output = self.parse_bitwise_or_expr()?;

        loop {
            match self.peek().kind {
                TokenType::Equal
                | TokenType::Greater
                | TokenType::Less
                | TokenType::GreaterEqual
                | TokenType::LessEqual
                | TokenType::BangEqual
                | TokenType::NotEqual => {
                    let operator = binary_operator(&self.advance().kind);
                    let right = self.parse_bitwise_or_expr()?;
                    output = Expr::Binary(BinaryExpr {
                        left: Box::new(output),
                        operator,
                        right: Box::new(right),
                    })
                }
                TokenType::Is => {
                    self.advance();
                    let negated = self.match_token_type(TokenTypeVariant::Not);
                    let value = match self
                        .consume_one_of(&[
                            TokenTypeVariant::Null,
                            TokenTypeVariant::True,
                            TokenTypeVariant::False,
                        ])?
                        .kind
                    {
                        TokenType::True => IsValue::True,
                        TokenType::False => IsValue::False,
                        _ => IsValue::Null,
                    };
                    output = Expr::Is(IsExpr {
                        expr: Box::new(output),
                        negated,
                        value,
                    })
                }
                TokenType::Not | TokenType::In | TokenType::Between | TokenType::Like => {
                    let negated = self.match_token_type(TokenTypeVariant::Not);
                    let tok = self
                        .consume_one_of(&[
                            TokenTypeVariant::In,
                            TokenTypeVariant::Between,
                            TokenTypeVariant::Like,
                        ])?
                        .kind
                        .clone();
                    output = match tok {
                        TokenType::In => self.parse_in_rhs(output, negated)?,
                        TokenType::Between => {
                            let low = self.parse_bitwise_or_expr()?;
                            self.consume(TokenTypeVariant::And)?;
                            let high = self.parse_bitwise_or_expr()?;
                            Expr::Between(BetweenExpr {
                                expr: Box::new(output),
                                negated,
                                low: Box::new(low),
                                high: Box::new(high),
                            })
                        }
                        _ => Expr::Like(LikeExpr {
                            expr: Box::new(output),
                            negated,
                            pattern: Box::new(self.parse_bitwise_or_expr()?),
                        }),
                    };
                }
                _ => {
                    break;
                }
            }
        }
        Ok(output)
    }

    fn parse_in_rhs(&mut self, expr: Expr, negated: bool) -> anyhow::Result<Expr> {
        self.consume(TokenTypeVariant::LeftParen)?;
        if self.check_token_type(TokenTypeVariant::Select)
            || self.check_token_type(TokenTypeVariant::With)
        {
            let query = self.parse_query()?;
            self.consume(TokenTypeVariant::RightParen)?;
            return Ok(Expr::InSubquery(InSubqueryExpr {
                expr: Box::new(expr),
                query: Box::new(query),
                negated,
            }));
        }
        let mut list = vec![self.parse_expr()?];
        while self.match_token_type(TokenTypeVariant::Comma) {
            list.push(self.parse_expr()?);
        }
        self.consume(TokenTypeVariant::RightParen)?;
        Ok(Expr::InList(InListExpr {
            expr: Box::new(expr),
            list,
            negated,
        }))
    }

    // bitwise_or_expr -> bitwise_xor_expr ("|" bitwise_xor_expr)*
    fn parse_bitwise_or_expr(&mut self) -> anyhow::Result<Expr> {
        self.parse_standard_binary_expr(
            &[TokenTypeVariant::BitwiseOr],
            Self::parse_bitwise_xor_expr,
        )
    }

    // bitwise_xor_expr -> bitwise_and_expr ("^" bitwise_and_expr)*
    fn parse_bitwise_xor_expr(&mut self) -> anyhow::Result<Expr> {
        self.parse_standard_binary_expr(
            &[TokenTypeVariant::BitwiseXor],
            Self::parse_bitwise_and_expr,
        )
    }

    // bitwise_and_expr -> add_expr ("&" add_expr)*
    fn parse_bitwise_and_expr(&mut self) -> anyhow::Result<Expr> {
        self.parse_standard_binary_expr(&[TokenTypeVariant::BitwiseAnd], Self::parse_add_expr)
    }

    // add_expr -> mul_concat_expr (("+" | "-") mul_concat_expr)*
    fn parse_add_expr(&mut self) -> anyhow::Result<Expr> {
        self.parse_standard_binary_expr(
            &[TokenTypeVariant::Plus, TokenTypeVariant::Minus],
            Self::parse_mul_concat_expr,
        )
    }

    // mul_concat_expr -> unary_expr (("*" | "/" | "%" | "||") unary_expr)*
    fn parse_mul_concat_expr(&mut self) -> anyhow::Result<Expr> {
        self.parse_standard_binary_expr(
            &[
                TokenTypeVariant::Star,
                TokenTypeVariant::Slash,
                TokenTypeVariant::Percent,
                TokenTypeVariant::ConcatOperator,
            ],
            Self::parse_unary_expr,
        )
    }

    // unary_expr -> ("+" | "-" | "~") unary_expr | primary_expr
    fn parse_unary_expr(&mut self) -> anyhow::Result<Expr> {
        if self.match_token_types(&[
            TokenTypeVariant::Plus,
            TokenTypeVariant::Minus,
            TokenTypeVariant::BitwiseNot,
        ]) {
            let operator = match self.peek_prev().kind {
                TokenType::Plus => UnaryOperator::Plus,
                TokenType::Minus => UnaryOperator::Minus,
                _ => UnaryOperator::BitwiseNot,
            };
            return Ok(Expr::Unary(UnaryExpr {
                operator,
                expr: Box::new(self.parse_unary_expr()?),
            }));
        }
        self.parse_primary_expr()
    }

    // case_expr -> "CASE" [expr] ("WHEN" expr "THEN" expr)+ ["ELSE" expr] "END"
    fn parse_case_expr(&mut self) -> anyhow::Result<Expr> {
        self.consume(TokenTypeVariant::Case)?;

        let operand = if self.check_token_type(TokenTypeVariant::When) {
            None
        } else {
            Some(Box::new(self.parse_expr()?))
        };

        let mut when_thens = vec![];
        loop {
            self.consume(TokenTypeVariant::When)?;
            let when_expr = self.parse_expr()?;
            self.consume(TokenTypeVariant::Then)?;
            let then_expr = self.parse_expr()?;
            when_thens.push((when_expr, then_expr));

            if !self.check_token_type(TokenTypeVariant::When) {
                break;
            }
        }

        let r#else = if self.match_token_type(TokenTypeVariant::Else) {
            Some(Box::new(self.parse_expr()?))
        } else {
            None
        };

        self.consume(TokenTypeVariant::End)?;

        Ok(Expr::Case(CaseExpr {
            operand,
            when_thens,
            r#else,
        }))
    }

    // cast_expr -> "CAST" "(" expr "AS" data_type ")"
    // where:
    // data_type -> any token sequence with balanced parentheses
    fn parse_cast_expr(&mut self) -> anyhow::Result<Expr> {
        self.consume(TokenTypeVariant::Cast)?;
        self.consume(TokenTypeVariant::LeftParen)?;
        let expr = self.parse_expr()?;
        self.consume(TokenTypeVariant::As)?;

        let start = self.curr;
        let mut depth = 0;
        loop {
            match self.peek().kind {
                TokenType::Eof => {
                    return Err(anyhow!(self.error(self.peek(), "Expected `)`.")));
                }
                TokenType::LeftParen => depth += 1,
                TokenType::RightParen if depth == 0 => break,
                TokenType::RightParen => depth -= 1,
                _ => {}
            }
            self.advance();
        }
        if start == self.curr {
            return Err(anyhow!(self.error(self.peek(), "Expected data type.")));
        }
        let data_type = self.text_between(start, self.curr);
        self.consume(TokenTypeVariant::RightParen)?;

        Ok(Expr::Cast(CastExpr {
            expr: Box::new(expr),
            data_type,
        }))
    }

    // function_expr -> name "(" [["DISTINCT" | "ALL"] ("*" | expr ("," expr)*)] ")" ["OVER" window_spec]
    fn parse_function_expr(&mut self, name: ObjectName) -> anyhow::Result<Expr> {
        self.consume(TokenTypeVariant::LeftParen)?;

        let distinct = self.match_token_type(TokenTypeVariant::Distinct);
        if !distinct {
            self.match_token_type(TokenTypeVariant::All);
        }

        let mut args = vec![];
        if self.match_token_type(TokenTypeVariant::Star) {
            args.push(FunctionArg::Star);
        } else if !self.check_token_type(TokenTypeVariant::RightParen) {
            args.push(FunctionArg::Expr(self.parse_expr()?));
            while self.match_token_type(TokenTypeVariant::Comma) {
                args.push(FunctionArg::Expr(self.parse_expr()?));
            }
        }
        self.consume(TokenTypeVariant::RightParen)?;

        let over = if self.match_token_type(TokenTypeVariant::Over) {
            Some(self.parse_window_spec()?)
        } else {
            None
        };

        Ok(Expr::Function(Box::new(FunctionExpr {
            name,
            distinct,
            args,
            over,
        })))
    }

    // window_spec -> "Identifier" | "(" ["PARTITION" "BY" expr ("," expr)*] ["ORDER" "BY" order_by_expr] [frame] ")"
    // where:
    // frame -> ("ROWS" | "RANGE") any token sequence with balanced parentheses
    fn parse_window_spec(&mut self) -> anyhow::Result<WindowSpec> {
        let mut window_spec = WindowSpec {
            partition_by: vec![],
            order_by: vec![],
        };
        if self.check_identifier() {
            // Named window, nothing to resolve.
            self.advance();
            return Ok(window_spec);
        }

        self.consume(TokenTypeVariant::LeftParen)?;
        if self.match_token_type(TokenTypeVariant::Partition) {
            self.consume(TokenTypeVariant::By)?;
            window_spec.partition_by.push(self.parse_expr()?);
            while self.match_token_type(TokenTypeVariant::Comma) {
                window_spec.partition_by.push(self.parse_expr()?);
            }
        }
        if self.match_token_type(TokenTypeVariant::Order) {
            self.consume(TokenTypeVariant::By)?;
            window_spec.order_by = self.parse_order_by_expr()?;
        }
        if self.check_non_reserved_keyword("rows") || self.check_non_reserved_keyword("range") {
            let mut depth = 0;
            loop {
                match self.peek().kind {
                    TokenType::Eof => break,
                    TokenType::LeftParen => depth += 1,
                    TokenType::RightParen if depth == 0 => break,
                    TokenType::RightParen => depth -= 1,
                    _ => {}
                }
                self.advance();
            }
        }
        self.consume(TokenTypeVariant::RightParen)?;
        Ok(window_spec)
    }

    // name_expr -> name ("." name)* [caret] | name ("." name)* "." caret | function_expr
    fn parse_name_expr(&mut self) -> anyhow::Result<Expr> {
        let mut parts = vec![];
        loop {
            let ident = self.consume_identifier()?;
            if self.check_glued_caret() {
                return Ok(Expr::Caret(self.caret_expr(parts, Some(ident.value))));
            }
            parts.push(ident);

            if self.check_token_type(TokenTypeVariant::LeftParen) {
                return self.parse_function_expr(ObjectName { parts });
            }
            if !(self.check_token_type(TokenTypeVariant::Dot)
                && self.peek_next_i(1).kind != TokenType::Star)
            {
                break;
            }
            self.advance();
            if self.check_token_type(TokenTypeVariant::Caret) {
                return Ok(Expr::Caret(self.caret_expr(parts, None)));
            }
        }

        if parts.len() == 1 {
            Ok(Expr::Identifier(parts.remove(0)))
        } else {
            Ok(Expr::CompoundIdentifier(parts))
        }
    }

    // primary_expr ->
    // "TRUE" | "FALSE" | "NULL" | "String" | "Number"
    // | case_expr | cast_expr | "EXISTS" "(" query ")"
    // | name_expr | caret
    // | "(" expr ")" | "(" query ")"
    fn parse_primary_expr(&mut self) -> anyhow::Result<Expr> {
        let peek_token = self.peek().clone();
        let primary_expr = match peek_token.kind {
            TokenType::True => {
                self.advance();
                Expr::Literal(Literal::Bool(true))
            }
            TokenType::False => {
                self.advance();
                Expr::Literal(Literal::Bool(false))
            }
            TokenType::Null => {
                self.advance();
                Expr::Literal(Literal::Null)
            }
            TokenType::Number(num) => {
                self.advance();
                Expr::Literal(Literal::Number(num))
            }
            TokenType::String(str) => {
                self.advance();
                Expr::Literal(Literal::String(str))
            }
            TokenType::Case => self.parse_case_expr()?,
            TokenType::Cast => self.parse_cast_expr()?,
            TokenType::Caret => Expr::Caret(self.caret_expr(vec![], None)),
            TokenType::Not | TokenType::Exists => {
                let negated = self.match_token_type(TokenTypeVariant::Not);
                self.consume(TokenTypeVariant::Exists)?;
                self.consume(TokenTypeVariant::LeftParen)?;
                let query = self.parse_query()?;
                self.consume(TokenTypeVariant::RightParen)?;
                Expr::Exists(ExistsExpr {
                    query: Box::new(query),
                    negated,
                })
            }
            TokenType::Identifier(_) | TokenType::QuotedIdentifier(_) => {
                self.parse_name_expr()?
            }
            // Functions whose name is a reserved keyword
            TokenType::Left | TokenType::Right
                if self.peek_next_i(1).kind == TokenType::LeftParen =>
            {
                let tok = self.advance();
                let name = Ident {
                    value: tok.lexeme.clone(),
                    quoted: false,
                    range: SourceRange {
                        start: tok.start(),
                        end: tok.end(),
                    },
                };
                self.parse_function_expr(ObjectName { parts: vec![name] })?
            }
            TokenType::LeftParen => {
                self.advance();
                // Look ahead to check whether we need to parse a query or an expr
                let mut i = 0;
                while self.peek_next_i(i).kind == TokenType::LeftParen {
                    i += 1;
                }
                let lookahead = &self.peek_next_i(i).kind;
                if *lookahead == TokenType::Select || *lookahead == TokenType::With {
                    let query = self.parse_query()?;
                    self.consume(TokenTypeVariant::RightParen)?;
                    Expr::Subquery(Box::new(query))
                } else {
                    let expr = self.parse_expr()?;
                    self.consume(TokenTypeVariant::RightParen)?;
                    Expr::Nested(Box::new(expr))
                }
            }
            _ => {
                return Err(anyhow!(self.error(&peek_token, "Expected Expression.")));
            }
        };

        Ok(primary_expr)
    }
}

fn ident_from_token(tok: &Token) -> Ident {
    let (value, quoted) = match &tok.kind {
        TokenType::QuotedIdentifier(value) => (value.clone(), true),
        TokenType::Identifier(value) => (value.clone(), false),
        _ => (tok.lexeme.clone(), false),
    };
    Ident {
        value,
        quoted,
        range: SourceRange {
            start: tok.start(),
            end: tok.end(),
        },
    }
}

fn binary_operator(kind: &TokenType) -> BinaryOperator {
    match kind {
        TokenType::Equal => BinaryOperator::Eq,
        TokenType::BangEqual | TokenType::NotEqual => BinaryOperator::NotEq,
        TokenType::Less => BinaryOperator::Lt,
        TokenType::LessEqual => BinaryOperator::LtEq,
        TokenType::Greater => BinaryOperator::Gt,
        TokenType::GreaterEqual => BinaryOperator::GtEq,
        TokenType::Plus => BinaryOperator::Plus,
        TokenType::Minus => BinaryOperator::Minus,
        TokenType::Star => BinaryOperator::Multiply,
        TokenType::Slash => BinaryOperator::Divide,
        TokenType::Percent => BinaryOperator::Modulo,
        TokenType::ConcatOperator => BinaryOperator::Concat,
        TokenType::And => BinaryOperator::And,
        TokenType::Or => BinaryOperator::Or,
        TokenType::BitwiseAnd => BinaryOperator::BitwiseAnd,
        TokenType::BitwiseOr => BinaryOperator::BitwiseOr,
        _ => BinaryOperator::BitwiseXor,
    }
}

pub fn parse_sql(sql: &str) -> anyhow::Result<Ast> {
    log::debug!("Parsing {}", sql.chars().take(50).collect::<String>());

    let mut scanner = Scanner::new(sql);

    scanner.scan()?;

    log::debug!("Tokens:");
    scanner
        .tokens()
        .iter()
        .for_each(|tok| log::debug!("{:?}", tok));

    let mut parser = Parser::new(scanner.tokens());
    let ast = parser.parse()?;
    log::debug!("AST: {:?}", ast);
    Ok(ast)
}
