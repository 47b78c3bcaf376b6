//! Query text parser
//!
//! Grammar (keywords case-insensitive):
//!
//! ```text
//! query   := SELECT columns FROM name [ORDER (ASC | DESC)] [LIMIT number] [';']
//! columns := '*' | ident (',' ident)*
//! name    := '"' chars '"' | ident
//! ```
//!
//! Inside a quoted name, `\"` and `\\` are escapes.

use super::ast::{Columns, Order, Query};
use super::errors::{QueryParseError, QueryResult};

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Ident(String),
    Quoted(String),
    Number(u64),
    Star,
    Comma,
    Semicolon,
    Eof,
}

impl Token {
    fn describe(&self) -> String {
        match self {
            Token::Ident(s) => format!("identifier '{}'", s),
            Token::Quoted(s) => format!("quoted name \"{}\"", s),
            Token::Number(n) => format!("number {}", n),
            Token::Star => "'*'".to_string(),
            Token::Comma => "','".to_string(),
            Token::Semicolon => "';'".to_string(),
            Token::Eof => "end of query".to_string(),
        }
    }

    fn is_keyword(&self, keyword: &str) -> bool {
        matches!(self, Token::Ident(s) if s.eq_ignore_ascii_case(keyword))
    }
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '_' | '.' | '-')
}

fn tokenize(text: &str) -> QueryResult<Vec<(usize, Token)>> {
    let mut tokens = Vec::new();
    let mut chars = text.char_indices().peekable();

    while let Some(&(pos, c)) = chars.peek() {
        if c.is_whitespace() {
            chars.next();
            continue;
        }
        match c {
            '*' => {
                chars.next();
                tokens.push((pos, Token::Star));
            }
            ',' => {
                chars.next();
                tokens.push((pos, Token::Comma));
            }
            ';' => {
                chars.next();
                tokens.push((pos, Token::Semicolon));
            }
            '"' => {
                chars.next();
                let mut name = String::new();
                let mut terminated = false;
                while let Some((_, c)) = chars.next() {
                    match c {
                        '\\' => match chars.next() {
                            Some((_, escaped)) => name.push(escaped),
                            None => break,
                        },
                        '"' => {
                            terminated = true;
                            break;
                        }
                        other => name.push(other),
                    }
                }
                if !terminated {
                    return Err(QueryParseError::new(text, pos, "unterminated quoted name"));
                }
                tokens.push((pos, Token::Quoted(name)));
            }
            c if c.is_ascii_digit() => {
                let mut digits = String::new();
                while let Some(&(_, d)) = chars.peek() {
                    if !is_ident_char(d) {
                        break;
                    }
                    digits.push(d);
                    chars.next();
                }
                if digits.bytes().all(|b| b.is_ascii_digit()) {
                    let n = digits.parse().map_err(|_| {
                        QueryParseError::new(text, pos, format!("number out of range: {}", digits))
                    })?;
                    tokens.push((pos, Token::Number(n)));
                } else {
                    tokens.push((pos, Token::Ident(digits)));
                }
            }
            c if is_ident_char(c) => {
                let mut ident = String::new();
                while let Some(&(_, d)) = chars.peek() {
                    if !is_ident_char(d) {
                        break;
                    }
                    ident.push(d);
                    chars.next();
                }
                tokens.push((pos, Token::Ident(ident)));
            }
            other => {
                return Err(QueryParseError::new(
                    text,
                    pos,
                    format!("unexpected character '{}'", other),
                ));
            }
        }
    }

    tokens.push((text.len(), Token::Eof));
    Ok(tokens)
}

struct Parser<'a> {
    text: &'a str,
    tokens: Vec<(usize, Token)>,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> &(usize, Token) {
        // tokenize always ends with Eof, and advance never moves past it
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn advance(&mut self) -> (usize, Token) {
        let token = self.peek().clone();
        if token.1 != Token::Eof {
            self.pos += 1;
        }
        token
    }

    fn error(&self, at: usize, message: impl Into<String>) -> QueryParseError {
        QueryParseError::new(self.text, at, message)
    }

    fn expect_keyword(&mut self, keyword: &str) -> QueryResult<()> {
        let (at, token) = self.advance();
        if token.is_keyword(keyword) {
            Ok(())
        } else {
            Err(self.error(
                at,
                format!("expected {}, found {}", keyword.to_uppercase(), token.describe()),
            ))
        }
    }

    fn parse_columns(&mut self) -> QueryResult<Columns> {
        if self.peek().1 == Token::Star {
            self.advance();
            return Ok(Columns::All);
        }

        let mut names = Vec::new();
        loop {
            let (at, token) = self.advance();
            match token {
                Token::Ident(name) if !name.eq_ignore_ascii_case("from") => names.push(name),
                Token::Quoted(name) => names.push(name),
                other => {
                    return Err(self.error(
                        at,
                        format!("expected column name, found {}", other.describe()),
                    ))
                }
            }
            if self.peek().1 != Token::Comma {
                return Ok(Columns::Named(names));
            }
            self.advance();
        }
    }

    fn parse_name(&mut self) -> QueryResult<String> {
        let (at, token) = self.advance();
        match token {
            Token::Quoted(name) | Token::Ident(name) if !name.is_empty() => Ok(name),
            other => Err(self.error(
                at,
                format!("expected series name, found {}", other.describe()),
            )),
        }
    }

    fn parse(mut self) -> QueryResult<Query> {
        self.expect_keyword("select")?;
        let columns = self.parse_columns()?;
        self.expect_keyword("from")?;
        let series = self.parse_name()?;

        let mut order = Order::default();
        let mut limit = None;

        if self.peek().1.is_keyword("order") {
            self.advance();
            let (at, token) = self.advance();
            order = if token.is_keyword("asc") {
                Order::Ascending
            } else if token.is_keyword("desc") {
                Order::Descending
            } else {
                return Err(self.error(
                    at,
                    format!("expected ASC or DESC, found {}", token.describe()),
                ));
            };
        }

        if self.peek().1.is_keyword("limit") {
            self.advance();
            let (at, token) = self.advance();
            match token {
                Token::Number(n) => limit = Some(n as usize),
                other => {
                    return Err(self.error(
                        at,
                        format!("expected limit number, found {}", other.describe()),
                    ))
                }
            }
        }

        if self.peek().1 == Token::Semicolon {
            self.advance();
        }

        let (at, token) = self.advance();
        if token != Token::Eof {
            return Err(self.error(at, format!("unexpected {}", token.describe())));
        }

        Ok(Query {
            columns,
            series,
            order,
            limit,
        })
    }
}

/// Parses a single `select` query.
pub fn parse_query(text: &str) -> QueryResult<Query> {
    let tokens = tokenize(text)?;
    Parser {
        text,
        tokens,
        pos: 0,
    }
    .parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_scan() {
        let query = parse_query(r#"select * from "cpu.load""#).unwrap();
        assert_eq!(query, Query::full_scan("cpu.load"));
    }

    #[test]
    fn test_keywords_case_insensitive() {
        let query = parse_query("SELECT * FROM temp ORDER ASC LIMIT 10;").unwrap();
        assert_eq!(query.series, "temp");
        assert_eq!(query.order, Order::Ascending);
        assert_eq!(query.limit, Some(10));
    }

    #[test]
    fn test_named_columns() {
        let query = parse_query(r#"select value, host from "cpu""#).unwrap();
        assert_eq!(
            query.columns,
            Columns::Named(vec!["value".to_string(), "host".to_string()])
        );
    }

    #[test]
    fn test_escaped_quote_in_name() {
        let query = parse_query(r#"select * from "we\"ird""#).unwrap();
        assert_eq!(query.series, "we\"ird");
    }

    #[test]
    fn test_display_reparses_to_same_query() {
        let original = parse_query(r#"select a from "x\\y" order asc limit 3"#).unwrap();
        assert_eq!(parse_query(&original.to_string()).unwrap(), original);
    }

    #[test]
    fn test_raw_quote_in_name_fails() {
        let err = parse_query(r#"select * from "bad"name""#).unwrap_err();
        assert!(err.message.contains("unterminated") || err.message.contains("unexpected"));
    }

    #[test]
    fn test_missing_from() {
        let err = parse_query("select *").unwrap_err();
        assert!(err.message.contains("FROM"));
        assert_eq!(err.position, 8);
    }

    #[test]
    fn test_empty_column_list() {
        assert!(parse_query("select from cpu").is_err());
    }

    #[test]
    fn test_bad_order_direction() {
        let err = parse_query("select * from cpu order sideways").unwrap_err();
        assert!(err.message.contains("ASC or DESC"));
    }

    #[test]
    fn test_empty_quoted_name_rejected() {
        assert!(parse_query(r#"select * from """#).is_err());
    }

    #[test]
    fn test_unexpected_character() {
        let err = parse_query("select * from cpu where x = 1").unwrap_err();
        assert!(err.message.contains("unexpected"));
    }

    #[test]
    fn test_numeric_prefixed_name() {
        let query = parse_query("select * from 5m.rollup").unwrap();
        assert_eq!(query.series, "5m.rollup");
    }
}
