use thiserror::Error;

use super::{Atom, Dict, Entry, Value};

/// What went wrong while parsing a manifest.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseErrorKind {
    #[error("unexpected end of input")]
    UnexpectedEof,

    #[error("unexpected character '{found}', expected {expected}")]
    Unexpected { found: char, expected: &'static str },

    #[error("unterminated comment")]
    UnterminatedComment,

    #[error("unterminated quoted string")]
    UnterminatedString,

    #[error("unsupported escape sequence '\\{0}'")]
    InvalidEscape(char),

    /// `<hex>` data blocks never appear in project files.
    #[error("data values are not supported")]
    UnsupportedData,

    #[error("top-level value must be a dictionary")]
    RootNotDict,

    #[error("trailing content after the top-level dictionary")]
    TrailingContent,
}

/// Parse failure with the 1-based position it was detected at.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("line {line}, column {column}: {kind}")]
pub struct ParseError {
    pub line: usize,
    pub column: usize,
    pub kind: ParseErrorKind,
}

/// Parse manifest text into its top-level dictionary.
pub fn parse(input: &str) -> Result<Dict, ParseError> {
    let mut parser = Parser::new(input);
    parser.skip_trivia()?;
    let (line, column) = (parser.line, parser.column);
    let root = match parser.value()? {
        Value::Dict(dict) => dict,
        _ => return Err(ParseError { line, column, kind: ParseErrorKind::RootNotDict }),
    };
    parser.skip_trivia()?;
    if parser.peek().is_some() {
        return Err(parser.error(ParseErrorKind::TrailingContent));
    }
    Ok(root)
}

fn is_bare_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '_' | '$' | '+' | '/' | ':' | '.' | '-')
}

struct Parser<'a> {
    src: &'a str,
    pos: usize,
    line: usize,
    column: usize,
}

impl<'a> Parser<'a> {
    fn new(src: &'a str) -> Self {
        Self { src, pos: 0, line: 1, column: 1 }
    }

    fn rest(&self) -> &'a str {
        &self.src[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    fn error(&self, kind: ParseErrorKind) -> ParseError {
        ParseError { line: self.line, column: self.column, kind }
    }

    fn unexpected(&self, expected: &'static str) -> ParseError {
        match self.peek() {
            Some(found) => self.error(ParseErrorKind::Unexpected { found, expected }),
            None => self.error(ParseErrorKind::UnexpectedEof),
        }
    }

    fn expect(&mut self, wanted: char, expected: &'static str) -> Result<(), ParseError> {
        if self.peek() == Some(wanted) {
            self.bump();
            Ok(())
        } else {
            Err(self.unexpected(expected))
        }
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.bump();
        }
    }

    /// Skip whitespace and every kind of comment.
    fn skip_trivia(&mut self) -> Result<(), ParseError> {
        loop {
            self.skip_whitespace();
            if self.rest().starts_with("/*") {
                self.block_comment()?;
            } else if self.rest().starts_with("//") {
                while self.peek().is_some_and(|c| c != '\n') {
                    self.bump();
                }
            } else {
                return Ok(());
            }
        }
    }

    /// Consume `/* ... */` and return its trimmed body.
    fn block_comment(&mut self) -> Result<String, ParseError> {
        let (line, column) = (self.line, self.column);
        self.bump();
        self.bump();
        let Some(end) = self.rest().find("*/") else {
            return Err(ParseError { line, column, kind: ParseErrorKind::UnterminatedComment });
        };
        let body = self.rest()[..end].trim().to_string();
        let close = self.pos + end + 2;
        while self.pos < close {
            self.bump();
        }
        Ok(body)
    }

    fn value(&mut self) -> Result<Value, ParseError> {
        match self.peek() {
            Some('{') => self.dict().map(Value::Dict),
            Some('(') => self.array().map(Value::Array),
            Some('<') => Err(self.error(ParseErrorKind::UnsupportedData)),
            Some(_) => self.atom().map(Value::Atom),
            None => Err(self.error(ParseErrorKind::UnexpectedEof)),
        }
    }

    /// A string followed, on the same token stream, by an optional comment.
    fn atom(&mut self) -> Result<Atom, ParseError> {
        let text = match self.peek() {
            Some('"') => self.quoted()?,
            Some(c) if is_bare_char(c) => self.bare(),
            _ => return Err(self.unexpected("a string")),
        };
        self.skip_whitespace();
        let comment =
            if self.rest().starts_with("/*") { Some(self.block_comment()?) } else { None };
        Ok(Atom { text, comment })
    }

    fn bare(&mut self) -> String {
        let start = self.pos;
        while self.peek().is_some_and(is_bare_char) {
            self.bump();
        }
        self.src[start..self.pos].to_string()
    }

    fn quoted(&mut self) -> Result<String, ParseError> {
        let (line, column) = (self.line, self.column);
        self.bump();
        let mut text = String::new();
        loop {
            match self.bump() {
                Some('"') => return Ok(text),
                Some('\\') => {
                    let escaped = match self.bump() {
                        Some('n') => '\n',
                        Some('t') => '\t',
                        Some('r') => '\r',
                        Some(c @ ('"' | '\\' | '\'')) => c,
                        Some(other) => return Err(self.error(ParseErrorKind::InvalidEscape(other))),
                        None => break,
                    };
                    text.push(escaped);
                }
                Some(c) => text.push(c),
                None => break,
            }
        }
        Err(ParseError { line, column, kind: ParseErrorKind::UnterminatedString })
    }

    fn dict(&mut self) -> Result<Dict, ParseError> {
        self.bump();
        let mut entries = Vec::new();
        loop {
            self.skip_trivia()?;
            if self.peek() == Some('}') {
                self.bump();
                return Ok(Dict { entries });
            }
            let key = self.atom()?;
            self.skip_trivia()?;
            self.expect('=', "'='")?;
            self.skip_trivia()?;
            let value = self.value()?;
            self.skip_trivia()?;
            self.expect(';', "';'")?;
            entries.push(Entry { key, value });
        }
    }

    fn array(&mut self) -> Result<Vec<Value>, ParseError> {
        self.bump();
        let mut items = Vec::new();
        loop {
            self.skip_trivia()?;
            if self.peek() == Some(')') {
                self.bump();
                return Ok(items);
            }
            items.push(self.value()?);
            self.skip_trivia()?;
            match self.peek() {
                Some(',') => {
                    self.bump();
                }
                Some(')') => {}
                _ => return Err(self.unexpected("',' or ')'")),
            }
        }
    }
}
