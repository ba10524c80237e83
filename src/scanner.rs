use anyhow::anyhow;

use crate::ast::{CARET_MARKER, Token, TokenType};

pub struct Scanner {
    source_chars: Vec<char>,
    tokens: Vec<Token>,
    start: usize,
    current: usize,
    line: u32,
    col: u32,
    start_line: u32,
    start_col: u32,
}

impl Scanner {
    pub fn new(source: &str) -> Self {
        Self {
            source_chars: source.chars().collect(),
            tokens: vec![],
            start: 0,
            current: 0,
            line: 1,
            col: 1,
            start_line: 1,
            start_col: 1,
        }
    }

    pub fn tokens(&self) -> &Vec<Token> {
        &self.tokens
    }

    fn advance(&mut self) -> char {
        let c = self.source_chars[self.current];
        self.current += 1;
        self.col += 1;
        c
    }

    fn is_at_end(&self) -> bool {
        self.current >= self.source_chars.len()
    }

    fn peek(&self) -> char {
        if self.is_at_end() {
            '\0'
        } else {
            self.source_chars[self.current]
        }
    }

    fn peek_next_i(&self, i: usize) -> char {
        if self.current + i >= self.source_chars.len() {
            '\0'
        } else {
            self.source_chars[self.current + i]
        }
    }

    fn match_char(&mut self, expected: char) -> bool {
        if self.peek() != expected {
            return false;
        };
        self.advance();
        true
    }

    fn add_token(&mut self, token_type: TokenType) {
        self.tokens.push(Token {
            kind: token_type,
            lexeme: self.current_source_str(),
            line: self.start_line,
            col: self.start_col,
            offset: self.start,
        });
    }

    fn current_source_str(&self) -> String {
        self.source_chars[self.start..self.current].iter().collect()
    }

    fn reset(&mut self) {
        self.tokens.clear();
        self.start = 0;
        self.current = 0;
        self.col = 1;
        self.line = 1;
    }

    fn new_line(&mut self) {
        self.line += 1;
        self.col = 1;
    }

    pub fn scan(&mut self) -> anyhow::Result<()> {
        self.reset();
        while self.current < self.source_chars.len() {
            self.start = self.current;
            self.start_line = self.line;
            self.start_col = self.col;
            self.scan_token()?;
        }
        self.tokens.push(Token {
            kind: TokenType::Eof,
            lexeme: String::from("eof"),
            line: self.line,
            col: self.col,
            offset: self.source_chars.len(),
        });

        Ok(())
    }

    /// Scans up to the closing `delimiter`, where a doubled delimiter stands for itself.
    /// Returns the unescaped content.
    fn scan_delimited(&mut self, delimiter: char, what: &str) -> anyhow::Result<String> {
        let mut content = String::new();
        loop {
            let peek_char = self.peek();
            if peek_char == '\0' {
                return Err(anyhow!(self.error_str(&format!("Found unterminated {}", what))));
            }
            if peek_char == delimiter {
                if self.peek_next_i(1) == delimiter {
                    self.advance();
                    self.advance();
                    content.push(delimiter);
                    continue;
                }
                self.advance();
                break;
            }
            if peek_char == '\n' {
                self.advance();
                self.new_line();
            } else {
                self.advance();
            }
            content.push(peek_char);
        }
        Ok(content)
    }

    fn match_number(&mut self) -> anyhow::Result<()> {
        let mut found_dot = self.source_chars[self.start] == '.';
        let mut found_e = false;
        loop {
            let peek_char = self.peek();

            if peek_char == '.' {
                if found_dot || found_e {
                    return Err(anyhow!(self.error_str("Found invalid number")));
                }
                found_dot = true;
                self.advance();
            } else if peek_char == 'e' || peek_char == 'E' {
                if found_e {
                    return Err(anyhow!(self.error_str("Found invalid number")));
                }
                found_e = true;
                let peek_next_char = self.peek_next_i(1);
                if peek_next_char == '+' || peek_next_char == '-' {
                    self.advance();
                    if !(self.peek_next_i(1).is_ascii_digit()) {
                        return Err(anyhow!(self.error_str("Found invalid number")));
                    }
                    self.advance();
                } else if peek_next_char.is_ascii_digit() {
                    self.advance();
                } else {
                    return Err(anyhow!(self.error_str("Found invalid number")));
                }
            } else if peek_char.is_ascii_digit() {
                self.advance();
            } else {
                self.add_token(TokenType::Number(self.current_source_str()));
                break;
            }
        }

        Ok(())
    }

    fn match_keyword_or_identifier(&mut self) {
        loop {
            let peek_char = self.peek();
            if !(peek_char.is_alphanumeric() || peek_char == '_' || peek_char == '$') {
                break;
            }
            self.advance();
        }
        let identifier = self.current_source_str();

        match identifier.to_lowercase().as_str() {
            "all" => self.add_token(TokenType::All),
            "and" => self.add_token(TokenType::And),
            "as" => self.add_token(TokenType::As),
            "asc" => self.add_token(TokenType::Asc),
            "between" => self.add_token(TokenType::Between),
            "by" => self.add_token(TokenType::By),
            "case" => self.add_token(TokenType::Case),
            "cast" => self.add_token(TokenType::Cast),
            "cross" => self.add_token(TokenType::Cross),
            "desc" => self.add_token(TokenType::Desc),
            "distinct" => self.add_token(TokenType::Distinct),
            "else" => self.add_token(TokenType::Else),
            "end" => self.add_token(TokenType::End),
            "except" => self.add_token(TokenType::Except),
            "exists" => self.add_token(TokenType::Exists),
            "false" => self.add_token(TokenType::False),
            "from" => self.add_token(TokenType::From),
            "full" => self.add_token(TokenType::Full),
            "group" => self.add_token(TokenType::Group),
            "having" => self.add_token(TokenType::Having),
            "in" => self.add_token(TokenType::In),
            "inner" => self.add_token(TokenType::Inner),
            "intersect" => self.add_token(TokenType::Intersect),
            "is" => self.add_token(TokenType::Is),
            "join" => self.add_token(TokenType::Join),
            "left" => self.add_token(TokenType::Left),
            "like" => self.add_token(TokenType::Like),
            "limit" => self.add_token(TokenType::Limit),
            "natural" => self.add_token(TokenType::Natural),
            "not" => self.add_token(TokenType::Not),
            "null" => self.add_token(TokenType::Null),
            "nulls" => self.add_token(TokenType::Nulls),
            "on" => self.add_token(TokenType::On),
            "or" => self.add_token(TokenType::Or),
            "order" => self.add_token(TokenType::Order),
            "outer" => self.add_token(TokenType::Outer),
            "over" => self.add_token(TokenType::Over),
            "partition" => self.add_token(TokenType::Partition),
            "recursive" => self.add_token(TokenType::Recursive),
            "right" => self.add_token(TokenType::Right),
            "select" => self.add_token(TokenType::Select),
            "then" => self.add_token(TokenType::Then),
            "true" => self.add_token(TokenType::True),
            "union" => self.add_token(TokenType::Union),
            "using" => self.add_token(TokenType::Using),
            "when" => self.add_token(TokenType::When),
            "where" => self.add_token(TokenType::Where),
            "with" => self.add_token(TokenType::With),
            _ => self.add_token(TokenType::Identifier(identifier)),
        }
    }

    fn match_quoted_identifier(&mut self, delimiter: char) -> anyhow::Result<()> {
        let ident = self.scan_delimited(delimiter, "quoted identifier")?;
        if ident.is_empty() {
            return Err(anyhow!(self.error_str("Found empty quoted identifier.")));
        }
        self.add_token(TokenType::QuotedIdentifier(ident));
        Ok(())
    }

    fn scan_token(&mut self) -> anyhow::Result<()> {
        let curr_char = self.advance();
        match curr_char {
            '(' => self.add_token(TokenType::LeftParen),
            ')' => self.add_token(TokenType::RightParen),
            '*' => self.add_token(TokenType::Star),
            ',' => self.add_token(TokenType::Comma),
            ';' => self.add_token(TokenType::Semicolon),
            '%' => self.add_token(TokenType::Percent),
            '.' => {
                if self.peek().is_ascii_digit() {
                    self.match_number()?;
                } else {
                    self.add_token(TokenType::Dot);
                }
            }
            '+' => self.add_token(TokenType::Plus),
            '=' => self.add_token(TokenType::Equal),
            '/' => {
                if self.match_char('*') {
                    loop {
                        if self.peek() == '\0' {
                            return Err(anyhow!(self.error_str("Found unterminated comment")));
                        }
                        if self.peek() == '*' && self.peek_next_i(1) == '/' {
                            self.advance();
                            self.advance();
                            break;
                        }
                        if self.advance() == '\n' {
                            self.new_line();
                        }
                    }
                } else {
                    self.add_token(TokenType::Slash)
                }
            }
            '-' => {
                if self.match_char('-') {
                    loop {
                        let peek_char = self.peek();
                        if peek_char == '\n' || peek_char == '\0' {
                            break;
                        }
                        self.advance();
                    }
                } else {
                    self.add_token(TokenType::Minus)
                }
            }
            '<' => {
                if self.match_char('>') {
                    self.add_token(TokenType::NotEqual);
                } else if self.match_char('=') {
                    self.add_token(TokenType::LessEqual);
                } else {
                    self.add_token(TokenType::Less);
                }
            }
            '!' => {
                if self.match_char('=') {
                    self.add_token(TokenType::BangEqual);
                } else {
                    return Err(anyhow!(self.error_str("Found unexpected character while scanning: !")));
                }
            }
            '>' => {
                if self.match_char('=') {
                    self.add_token(TokenType::GreaterEqual);
                } else {
                    self.add_token(TokenType::Greater);
                }
            }
            '~' => {
                self.add_token(TokenType::BitwiseNot);
            }
            '&' => {
                self.add_token(TokenType::BitwiseAnd);
            }
            '|' => {
                if self.match_char('|') {
                    self.add_token(TokenType::ConcatOperator);
                } else {
                    self.add_token(TokenType::BitwiseOr);
                }
            }
            '^' => {
                self.add_token(TokenType::BitwiseXor);
            }
            '\n' => {
                self.new_line();
            }
            '\r' | ' ' | '\t' => {}

            c if c == CARET_MARKER => self.add_token(TokenType::Caret),

            // strings
            '\'' => {
                let str_slice = self.scan_delimited('\'', "string")?;
                self.add_token(TokenType::String(str_slice));
            }

            // numeric
            c if c.is_ascii_digit() => {
                self.match_number()?;
            }

            // Keywords and identifiers
            c if c.is_alphabetic() || c == '_' => {
                self.match_keyword_or_identifier();
            }

            c if c == '"' || c == '`' => {
                self.match_quoted_identifier(c)?;
            }

            _ => {
                return Err(anyhow!(self.error_str(&format!(
                    "Found unexpected character while scanning: {}",
                    curr_char
                ))));
            }
        }
        Ok(())
    }

    fn error_str(&mut self, error: &str) -> String {
        format!(
            "[line: {}, col: {}] Scanner error: {}",
            self.line, self.col, error
        )
    }
}

