//! Hand-written lexer for the vizquery query-string grammar (spec §4.8).

use vizquery_core::{ErrorKey, QueryError, QueryResult};

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Ident(String),
    Number(f64),
    String(String),
    DateLit(String),
    DateTimeLit(String),
    TimeOfDayLit(String),
    Comma,
    Dot,
    LParen,
    RParen,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Plus,
    Minus,
    Star,
    Slash,
    Eof,
}

pub struct Lexer<'a> {
    src: &'a str,
    chars: Vec<char>,
    pos: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(src: &'a str) -> Self {
        Lexer {
            src,
            chars: src.chars().collect(),
            pos: 0,
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn advance(&mut self) -> Option<char> {
        let c = self.peek();
        self.pos += 1;
        c
    }

    fn err(&self, detail: impl Into<String>) -> QueryError {
        QueryError::invalid(
            ErrorKey::ParseError,
            format!("{} (at byte offset {})", detail.into(), self.pos),
        )
    }

    fn skip_whitespace(&mut self) {
        while matches!(self.peek(), Some(c) if c.is_whitespace()) {
            self.pos += 1;
        }
    }

    fn read_quoted(&mut self, quote: char) -> QueryResult<String> {
        self.advance();
        let mut out = String::new();
        loop {
            match self.advance() {
                None => return Err(self.err("unterminated string literal")),
                Some('\\') => match self.advance() {
                    Some(c) => out.push(c),
                    None => return Err(self.err("unterminated escape in string literal")),
                },
                Some(c) if c == quote => return Ok(out),
                Some(c) => out.push(c),
            }
        }
    }

    fn read_word(&mut self) -> String {
        let start = self.pos;
        while matches!(self.peek(), Some(c) if c.is_alphanumeric() || c == '_') {
            self.pos += 1;
        }
        self.chars[start..self.pos].iter().collect()
    }

    fn read_number(&mut self) -> QueryResult<f64> {
        let start = self.pos;
        if matches!(self.peek(), Some('-')) {
            self.pos += 1;
        }
        while matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
            self.pos += 1;
        }
        if matches!(self.peek(), Some('.')) {
            self.pos += 1;
            while matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
                self.pos += 1;
            }
        }
        let text: String = self.chars[start..self.pos].iter().collect();
        text.parse()
            .map_err(|_| self.err(format!("invalid number literal {text:?}")))
    }

    /// Tries to read `date '...'`, `datetime '...'`, `timeofday '...'` once
    /// the leading keyword has already been peeked as a word; returns
    /// `None` if the following token isn't a quoted literal.
    fn try_temporal_literal(&mut self, keyword: &str) -> Option<Token> {
        let save = self.pos;
        self.skip_whitespace();
        if matches!(self.peek(), Some('\'') | Some('"')) {
            let quote = self.peek().unwrap();
            if let Ok(text) = self.read_quoted(quote) {
                return Some(match keyword {
                    "date" => Token::DateLit(text),
                    "datetime" => Token::DateTimeLit(text),
                    _ => Token::TimeOfDayLit(text),
                });
            }
        }
        self.pos = save;
        None
    }

    pub fn tokenize(mut self) -> QueryResult<Vec<Token>> {
        let mut tokens = Vec::new();
        loop {
            self.skip_whitespace();
            let Some(c) = self.peek() else {
                tokens.push(Token::Eof);
                break;
            };
            let token = match c {
                ',' => {
                    self.advance();
                    Token::Comma
                }
                '.' => {
                    self.advance();
                    Token::Dot
                }
                '(' => {
                    self.advance();
                    Token::LParen
                }
                ')' => {
                    self.advance();
                    Token::RParen
                }
                '+' => {
                    self.advance();
                    Token::Plus
                }
                '-' if !matches!(self.peek_at(1), Some(c) if c.is_ascii_digit()) => {
                    self.advance();
                    Token::Minus
                }
                '*' => {
                    self.advance();
                    Token::Star
                }
                '/' => {
                    self.advance();
                    Token::Slash
                }
                '=' => {
                    self.advance();
                    Token::Eq
                }
                '!' if matches!(self.peek_at(1), Some('=')) => {
                    self.advance();
                    self.advance();
                    Token::Ne
                }
                '<' if matches!(self.peek_at(1), Some('=')) => {
                    self.advance();
                    self.advance();
                    Token::Le
                }
                '<' if matches!(self.peek_at(1), Some('>')) => {
                    self.advance();
                    self.advance();
                    Token::Ne
                }
                '<' => {
                    self.advance();
                    Token::Lt
                }
                '>' if matches!(self.peek_at(1), Some('=')) => {
                    self.advance();
                    self.advance();
                    Token::Ge
                }
                '>' => {
                    self.advance();
                    Token::Gt
                }
                '\'' | '"' => Token::String(self.read_quoted(c)?),
                c if c.is_ascii_digit() || (c == '-' ) => Token::Number(self.read_number()?),
                c if c.is_alphabetic() || c == '_' => {
                    let word = self.read_word();
                    let lower = word.to_ascii_lowercase();
                    if matches!(lower.as_str(), "date" | "datetime" | "timeofday") {
                        if let Some(t) = self.try_temporal_literal(&lower) {
                            t
                        } else {
                            Token::Ident(word)
                        }
                    } else if lower == "true" {
                        Token::Ident("true".to_string())
                    } else if lower == "false" {
                        Token::Ident("false".to_string())
                    } else {
                        Token::Ident(word)
                    }
                }
                other => return Err(self.err(format!("unexpected character {other:?} in {:?}", self.src))),
            };
            tokens.push(token);
        }
        Ok(tokens)
    }
}

pub fn tokenize(src: &str) -> QueryResult<Vec<Token>> {
    Lexer::new(src).tokenize()
}
