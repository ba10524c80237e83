use serde::{Deserialize, Serialize};
use strum_macros::EnumDiscriminants;

/// Character standing for the editor cursor when a query is analyzed for completion.
pub const CARET_MARKER: char = '\u{2038}';

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Position {
    pub line: u32,
    pub col: u32,
    /// Char offset into the source text.
    pub offset: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct SourceRange {
    pub start: Position,
    pub end: Position,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ast {
    pub queries: Vec<Query>,
}

/// An identifier as written in the source. Quoted identifiers have their
/// delimiters stripped and compare byte-for-byte, unquoted ones ignore case.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ident {
    pub value: String,
    pub quoted: bool,
    pub range: SourceRange,
}

impl Ident {
    pub fn matches(&self, name: &str) -> bool {
        name_matches(&self.value, self.quoted, name)
    }
}

/// Compares a name as written in the source against `candidate`.
pub fn name_matches(value: &str, quoted: bool, candidate: &str) -> bool {
    if quoted {
        value == candidate
    } else {
        value == candidate || value.to_lowercase() == candidate.to_lowercase()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObjectName {
    pub parts: Vec<Ident>,
}

impl ObjectName {
    /// The last part of the name, i.e. the table name of `catalog.schema.table`.
    pub fn base(&self) -> &Ident {
        // The parser never builds an empty object name.
        &self.parts[self.parts.len() - 1]
    }

    pub fn is_single(&self) -> bool {
        self.parts.len() == 1
    }

    pub fn dotted(&self) -> String {
        self.parts
            .iter()
            .map(|part| part.value.as_str())
            .collect::<Vec<_>>()
            .join(".")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Query {
    pub with: Option<With>,
    pub body: QueryBody,
    pub order_by: Option<OrderBy>,
    pub limit: Option<Limit>,
    pub range: SourceRange,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum QueryBody {
    Select(Box<Select>),
    Nested(Box<Query>),
    SetOperation(SetOperation),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetOperation {
    pub left: Box<QueryBody>,
    pub operator: SetOperator,
    pub right: Box<QueryBody>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SetOperator {
    Union,
    UnionAll,
    Intersect,
    Except,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct With {
    pub recursive: bool,
    pub ctes: Vec<Cte>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cte {
    pub name: Ident,
    pub columns: Vec<Ident>,
    pub query: Query,
    pub range: SourceRange,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderBy {
    pub items: Vec<OrderByItem>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderByItem {
    pub expr: Expr,
    pub direction: Option<SortDirection>,
    pub nulls: Option<NullsOrder>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub enum SortDirection {
    Asc,
    Desc,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub enum NullsOrder {
    First,
    Last,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Limit {
    pub count: Expr,
    pub offset: Option<Expr>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Select {
    pub distinct: bool,
    pub items: Vec<SelectItem>,
    pub from: Option<FromExpr>,
    pub r#where: Option<Expr>,
    pub group_by: Option<Vec<Expr>>,
    pub having: Option<Expr>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum SelectItem {
    Expr(SelectExprItem),
    QualifiedStar(QualifiedStarItem),
    Star(SourceRange),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectExprItem {
    pub expr: Expr,
    pub alias: Option<Ident>,
    /// Source text of `expr`, used to label unnamed output columns.
    pub text: String,
    pub range: SourceRange,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QualifiedStarItem {
    pub qualifier: ObjectName,
    pub range: SourceRange,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum FromExpr {
    Table(TableFactor),
    Derived(DerivedTable),
    Join(Box<JoinExpr>),
    Nested(Box<FromExpr>),
    Caret(CaretExpr),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableFactor {
    pub name: ObjectName,
    pub alias: Option<TableAlias>,
    pub range: SourceRange,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableAlias {
    pub name: Ident,
    pub columns: Vec<Ident>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DerivedTable {
    pub query: Box<Query>,
    pub alias: Option<TableAlias>,
    pub range: SourceRange,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JoinExpr {
    pub kind: JoinKind,
    pub left: FromExpr,
    pub right: FromExpr,
    pub constraint: JoinConstraint,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JoinKind {
    Inner,
    Left,
    Right,
    Full,
    Cross,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum JoinConstraint {
    On(Expr),
    Using(Vec<Ident>),
    Natural,
    None,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Expr {
    Identifier(Ident),
    CompoundIdentifier(Vec<Ident>),
    Literal(Literal),
    Binary(BinaryExpr),
    Unary(UnaryExpr),
    Nested(Box<Expr>),
    Function(Box<FunctionExpr>),
    Case(CaseExpr),
    Cast(CastExpr),
    InList(InListExpr),
    InSubquery(InSubqueryExpr),
    Between(BetweenExpr),
    Like(LikeExpr),
    Is(IsExpr),
    Exists(ExistsExpr),
    Subquery(Box<Query>),
    Caret(CaretExpr),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Literal {
    String(String),
    Number(String),
    Bool(bool),
    Null,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BinaryExpr {
    pub left: Box<Expr>,
    pub operator: BinaryOperator,
    pub right: Box<Expr>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinaryOperator {
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    Plus,
    Minus,
    Multiply,
    Divide,
    Modulo,
    Concat,
    And,
    Or,
    BitwiseAnd,
    BitwiseOr,
    BitwiseXor,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnaryExpr {
    pub operator: UnaryOperator,
    pub expr: Box<Expr>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnaryOperator {
    Not,
    Plus,
    Minus,
    BitwiseNot,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionExpr {
    pub name: ObjectName,
    pub distinct: bool,
    pub args: Vec<FunctionArg>,
    pub over: Option<WindowSpec>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum FunctionArg {
    Expr(Expr),
    Star,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WindowSpec {
    pub partition_by: Vec<Expr>,
    pub order_by: Vec<OrderByItem>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaseExpr {
    pub operand: Option<Box<Expr>>,
    pub when_thens: Vec<(Expr, Expr)>,
    pub r#else: Option<Box<Expr>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CastExpr {
    pub expr: Box<Expr>,
    pub data_type: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InListExpr {
    pub expr: Box<Expr>,
    pub list: Vec<Expr>,
    pub negated: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InSubqueryExpr {
    pub expr: Box<Expr>,
    pub query: Box<Query>,
    pub negated: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BetweenExpr {
    pub expr: Box<Expr>,
    pub negated: bool,
    pub low: Box<Expr>,
    pub high: Box<Expr>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LikeExpr {
    pub expr: Box<Expr>,
    pub negated: bool,
    pub pattern: Box<Expr>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IsExpr {
    pub expr: Box<Expr>,
    pub negated: bool,
    pub value: IsValue,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub enum IsValue {
    Null,
    True,
    False,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExistsExpr {
    pub query: Box<Query>,
    pub negated: bool,
}

/// The cursor marker, possibly preceded by a qualifier (`a.‸`) and glued to a
/// partially typed identifier (`acc‸`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaretExpr {
    pub qualifier: Vec<Ident>,
    pub prefix: Option<String>,
    pub range: SourceRange,
}

#[derive(PartialEq, Clone, Debug, EnumDiscriminants, Serialize, Deserialize)]
#[strum_discriminants(name(TokenTypeVariant))]
pub enum TokenType {
    LeftParen,
    RightParen,
    Comma,
    Dot,
    Minus,
    Plus,
    Star,
    Slash,
    Percent,
    BitwiseNot,
    BitwiseOr,
    BitwiseAnd,
    BitwiseXor,
    ConcatOperator,
    Semicolon,
    Equal,
    BangEqual,
    NotEqual,
    Greater,
    GreaterEqual,
    Less,
    LessEqual,
    Caret,
    QuotedIdentifier(String),
    Identifier(String),
    String(String),
    Number(String),
    Eof,

    // Reserved Keywords
    All,
    And,
    As,
    Asc,
    Between,
    By,
    Case,
    Cast,
    Cross,
    Desc,
    Distinct,
    Else,
    End,
    Except,
    Exists,
    False,
    From,
    Full,
    Group,
    Having,
    In,
    Inner,
    Intersect,
    Is,
    Join,
    Left,
    Like,
    Limit,
    Natural,
    Not,
    Null,
    Nulls,
    On,
    Or,
    Order,
    Outer,
    Over,
    Partition,
    Recursive,
    Right,
    Select,
    Then,
    True,
    Union,
    Using,
    When,
    Where,
    With,
}

impl TokenTypeVariant {
    pub(crate) fn variant_str(&self) -> &str {
        match self {
            TokenTypeVariant::LeftParen => "(",
            TokenTypeVariant::RightParen => ")",
            TokenTypeVariant::Comma => ",",
            TokenTypeVariant::Dot => ".",
            TokenTypeVariant::Minus => "-",
            TokenTypeVariant::Plus => "+",
            TokenTypeVariant::Star => "*",
            TokenTypeVariant::Slash => "/",
            TokenTypeVariant::Percent => "%",
            TokenTypeVariant::BitwiseNot => "~",
            TokenTypeVariant::BitwiseOr => "|",
            TokenTypeVariant::BitwiseAnd => "&",
            TokenTypeVariant::BitwiseXor => "^",
            TokenTypeVariant::ConcatOperator => "||",
            TokenTypeVariant::Semicolon => ";",
            TokenTypeVariant::Equal => "=",
            TokenTypeVariant::BangEqual => "!=",
            TokenTypeVariant::NotEqual => "<>",
            TokenTypeVariant::Greater => ">",
            TokenTypeVariant::GreaterEqual => ">=",
            TokenTypeVariant::Less => "<",
            TokenTypeVariant::LessEqual => "<=",
            TokenTypeVariant::Caret => "Caret",
            TokenTypeVariant::QuotedIdentifier => "QuotedIdentifier",
            TokenTypeVariant::Identifier => "Identifier",
            TokenTypeVariant::String => "String",
            TokenTypeVariant::Number => "Number",
            TokenTypeVariant::Eof => "EOF",

            // Reserved Keywords
            TokenTypeVariant::All => "ALL",
            TokenTypeVariant::And => "AND",
            TokenTypeVariant::As => "AS",
            TokenTypeVariant::Asc => "ASC",
            TokenTypeVariant::Between => "BETWEEN",
            TokenTypeVariant::By => "BY",
            TokenTypeVariant::Case => "CASE",
            TokenTypeVariant::Cast => "CAST",
            TokenTypeVariant::Cross => "CROSS",
            TokenTypeVariant::Desc => "DESC",
            TokenTypeVariant::Distinct => "DISTINCT",
            TokenTypeVariant::Else => "ELSE",
            TokenTypeVariant::End => "END",
            TokenTypeVariant::Except => "EXCEPT",
            TokenTypeVariant::Exists => "EXISTS",
            TokenTypeVariant::False => "FALSE",
            TokenTypeVariant::From => "FROM",
            TokenTypeVariant::Full => "FULL",
            TokenTypeVariant::Group => "GROUP",
            TokenTypeVariant::Having => "HAVING",
            TokenTypeVariant::In => "IN",
            TokenTypeVariant::Inner => "INNER",
            TokenTypeVariant::Intersect => "INTERSECT",
            TokenTypeVariant::Is => "IS",
            TokenTypeVariant::Join => "JOIN",
            TokenTypeVariant::Left => "LEFT",
            TokenTypeVariant::Like => "LIKE",
            TokenTypeVariant::Limit => "LIMIT",
            TokenTypeVariant::Natural => "NATURAL",
            TokenTypeVariant::Not => "NOT",
            TokenTypeVariant::Null => "NULL",
            TokenTypeVariant::Nulls => "NULLS",
            TokenTypeVariant::On => "ON",
            TokenTypeVariant::Or => "OR",
            TokenTypeVariant::Order => "ORDER",
            TokenTypeVariant::Outer => "OUTER",
            TokenTypeVariant::Over => "OVER",
            TokenTypeVariant::Partition => "PARTITION",
            TokenTypeVariant::Recursive => "RECURSIVE",
            TokenTypeVariant::Right => "RIGHT",
            TokenTypeVariant::Select => "SELECT",
            TokenTypeVariant::Then => "THEN",
            TokenTypeVariant::True => "TRUE",
            TokenTypeVariant::Union => "UNION",
            TokenTypeVariant::Using => "USING",
            TokenTypeVariant::When => "WHEN",
            TokenTypeVariant::Where => "WHERE",
            TokenTypeVariant::With => "WITH",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Token {
    pub kind: TokenType,
    pub lexeme: String,
    pub line: u32,
    pub col: u32,
    pub offset: usize,
}

impl Token {
    pub fn start(&self) -> Position {
        Position {
            line: self.line,
            col: self.col,
            offset: self.offset,
        }
    }

    pub fn end(&self) -> Position {
        let len = self.lexeme.chars().count();
        Position {
            line: self.line,
            col: self.col + len as u32,
            offset: self.offset + len,
        }
    }
}
