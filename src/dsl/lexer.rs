//! Lexer (tokenizer) for the circuit DSL.

use std::collections::VecDeque;
use std::fmt;

use super::units::{parse_unit, prefix_scale, Unit};
use crate::error::{LexError, Position};

/// A token produced by the lexer.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    /// The kind of token
    pub kind: TokenKind,
    /// The token's text as written
    pub text: String,
    /// Numeric value: the scaled magnitude of a number, the scale factor of a unit
    pub value: Option<f64>,
    /// Where the token starts
    pub position: Position,
}

impl Token {
    /// Human-readable description used in syntax errors.
    pub fn describe(&self) -> String {
        match &self.kind {
            TokenKind::Identifier => format!("identifier '{}'", self.text),
            TokenKind::Keyword(_) => format!("keyword '{}'", self.text),
            TokenKind::Number => format!("number '{}'", self.text),
            TokenKind::Unit(_) => format!("unit '{}'", self.text),
            TokenKind::Eof => "end of input".to_string(),
            _ => format!("'{}'", self.text),
        }
    }
}

/// Reserved words of the language.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Keyword {
    Connect,
    Subcircuit,
    Simulate,
    Ground,
    Dc,
    Ac,
    Transient,
    Plot,
}

impl Keyword {
    pub fn from_word(word: &str) -> Option<Self> {
        match word {
            "Connect" => Some(Self::Connect),
            "Subcircuit" => Some(Self::Subcircuit),
            "Simulate" => Some(Self::Simulate),
            "ground" => Some(Self::Ground),
            "dc" => Some(Self::Dc),
            "ac" => Some(Self::Ac),
            "transient" => Some(Self::Transient),
            "plot" => Some(Self::Plot),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Connect => "Connect",
            Self::Subcircuit => "Subcircuit",
            Self::Simulate => "Simulate",
            Self::Ground => "ground",
            Self::Dc => "dc",
            Self::Ac => "ac",
            Self::Transient => "transient",
            Self::Plot => "plot",
        }
    }
}

impl fmt::Display for Keyword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Token types in the DSL.
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    /// An identifier (component id, net name, type name, port name)
    Identifier,
    /// A reserved word
    Keyword(Keyword),
    /// A number, possibly with an attached SI prefix
    Number,
    /// A unit following a number
    Unit(Unit),
    /// Open parenthesis '('
    OpenParen,
    /// Close parenthesis ')'
    CloseParen,
    /// Open brace '{'
    OpenBrace,
    /// Close brace '}'
    CloseBrace,
    /// Comma ','
    Comma,
    /// Semicolon ';'
    Semicolon,
    /// Dot '.'
    Dot,
    /// Equals sign '='
    Equals,
    /// End of input
    Eof,
}

/// Tokenize a complete source text. The final token is always [`TokenKind::Eof`].
pub fn tokenize(input: &str) -> Result<Vec<Token>, LexError> {
    let mut lexer = Lexer::new(input);
    let mut tokens = Vec::new();
    loop {
        let token = lexer.next_token()?;
        let done = token.kind == TokenKind::Eof;
        tokens.push(token);
        if done {
            return Ok(tokens);
        }
    }
}

/// Lexer for tokenizing circuit DSL input.
pub struct Lexer<'a> {
    chars: std::iter::Peekable<std::str::CharIndices<'a>>,
    line: usize,
    column: usize,
    /// Tokens already scanned but not yet handed out (a unit after its number)
    pending: VecDeque<Token>,
}

impl<'a> Lexer<'a> {
    /// Create a new lexer for the given input.
    pub fn new(input: &'a str) -> Self {
        Self {
            chars: input.char_indices().peekable(),
            line: 1,
            column: 1,
            pending: VecDeque::new(),
        }
    }

    /// Get the next token.
    pub fn next_token(&mut self) -> Result<Token, LexError> {
        if let Some(token) = self.pending.pop_front() {
            return Ok(token);
        }

        self.skip_whitespace_and_comments();

        let position = self.position();
        let ch = match self.peek() {
            Some(ch) => ch,
            None => {
                return Ok(Token {
                    kind: TokenKind::Eof,
                    text: String::new(),
                    value: None,
                    position,
                });
            }
        };

        let punct = match ch {
            '(' => Some(TokenKind::OpenParen),
            ')' => Some(TokenKind::CloseParen),
            '{' => Some(TokenKind::OpenBrace),
            '}' => Some(TokenKind::CloseBrace),
            ',' => Some(TokenKind::Comma),
            ';' => Some(TokenKind::Semicolon),
            '.' => Some(TokenKind::Dot),
            '=' => Some(TokenKind::Equals),
            _ => None,
        };
        if let Some(kind) = punct {
            self.advance();
            return Ok(Token {
                kind,
                text: ch.to_string(),
                value: None,
                position,
            });
        }

        match ch {
            '0'..='9' => self.read_number(position),
            '-' if self.peek_second().is_some_and(|c| c.is_ascii_digit()) => {
                self.read_number(position)
            }
            _ if ch.is_ascii_alphabetic() || ch == '_' => {
                let text = self.read_identifier();
                let kind = match Keyword::from_word(&text) {
                    Some(kw) => TokenKind::Keyword(kw),
                    None => TokenKind::Identifier,
                };
                Ok(Token {
                    kind,
                    text,
                    value: None,
                    position,
                })
            }
            _ => Err(LexError::new(
                position,
                format!("unexpected character '{}'", ch),
            )),
        }
    }

    fn position(&self) -> Position {
        Position::new(self.line, self.column)
    }

    fn peek(&mut self) -> Option<char> {
        self.chars.peek().map(|&(_, ch)| ch)
    }

    fn peek_second(&self) -> Option<char> {
        let mut ahead = self.chars.clone();
        ahead.next();
        ahead.next().map(|(_, ch)| ch)
    }

    fn advance(&mut self) -> Option<char> {
        let (_, ch) = self.chars.next()?;
        if ch == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(ch)
    }

    fn skip_whitespace_and_comments(&mut self) {
        while let Some(ch) = self.peek() {
            if ch.is_whitespace() {
                self.advance();
            } else if ch == '#' {
                // Skip comment until end of line
                while let Some(c) = self.peek() {
                    if c == '\n' {
                        break;
                    }
                    self.advance();
                }
            } else {
                break;
            }
        }
    }

    fn read_identifier(&mut self) -> String {
        let mut text = String::new();
        while let Some(ch) = self.peek() {
            if ch.is_ascii_alphanumeric() || ch == '_' {
                text.push(ch);
                self.advance();
            } else {
                break;
            }
        }
        text
    }

    fn read_digits(&mut self, text: &mut String) {
        while let Some(ch) = self.peek() {
            if ch.is_ascii_digit() {
                text.push(ch);
                self.advance();
            } else {
                break;
            }
        }
    }

    /// Read a number, its optional attached prefix and an optional unit.
    ///
    /// A unit becomes its own token, queued behind the number.
    fn read_number(&mut self, position: Position) -> Result<Token, LexError> {
        let mut text = String::new();

        if self.peek() == Some('-') {
            text.push('-');
            self.advance();
        }

        // Integer part
        self.read_digits(&mut text);

        // Decimal part, only when a digit follows the dot
        if self.peek() == Some('.') && self.peek_second().is_some_and(|c| c.is_ascii_digit()) {
            text.push('.');
            self.advance();
            self.read_digits(&mut text);
        }

        // Exponent part
        if matches!(self.peek(), Some('e' | 'E')) && self.exponent_follows() {
            text.push('e');
            self.advance();
            if let Some(sign @ ('-' | '+')) = self.peek() {
                text.push(sign);
                self.advance();
            }
            self.read_digits(&mut text);
        }

        let mut value: f64 = text
            .parse()
            .map_err(|_| LexError::new(position, format!("malformed number '{}'", text)))?;

        // Attached suffix: a unit ("5V"), a prefix ("10k") or garbage
        let suffix_position = self.position();
        let suffix = self.read_identifier();
        let mut unit = None;
        if !suffix.is_empty() {
            if let Some((scale, u)) = parse_unit(&suffix) {
                unit = Some(self.unit_token(suffix.clone(), scale, u, suffix_position));
            } else {
                let mut suffix_chars = suffix.chars();
                let scale = match (suffix_chars.next().and_then(prefix_scale), suffix_chars.next()) {
                    (Some(scale), None) => scale,
                    _ => {
                        return Err(LexError::new(
                            position,
                            format!("malformed number '{}{}'", text, suffix),
                        ));
                    }
                };
                value *= scale;
            }
            text.push_str(&suffix);
        }

        // Detached unit after whitespace ("100 uF", "1k ohm")
        if unit.is_none() {
            unit = self.read_detached_unit();
        }

        if let Some(unit_token) = unit {
            self.pending.push_back(unit_token);
        }

        Ok(Token {
            kind: TokenKind::Number,
            text,
            value: Some(value),
            position,
        })
    }

    /// Whether the 'e' under the cursor starts an exponent rather than a suffix.
    fn exponent_follows(&self) -> bool {
        let mut ahead = self.chars.clone();
        ahead.next();
        match ahead.next().map(|(_, ch)| ch) {
            Some(c) if c.is_ascii_digit() => true,
            Some('-' | '+') => ahead.next().is_some_and(|(_, c)| c.is_ascii_digit()),
            _ => false,
        }
    }

    /// A unit word after whitespace or comments, as `skip_whitespace_and_comments` sees them.
    fn read_detached_unit(&mut self) -> Option<Token> {
        let mut ahead = self.chars.clone();
        while let Some(&(_, c)) = ahead.peek() {
            if c.is_whitespace() {
                ahead.next();
            } else if c == '#' {
                while ahead.peek().is_some_and(|&(_, c)| c != '\n') {
                    ahead.next();
                }
            } else {
                break;
            }
        }
        let mut word = String::new();
        while let Some(&(_, c)) = ahead.peek() {
            if c.is_ascii_alphanumeric() || c == '_' {
                word.push(c);
                ahead.next();
            } else {
                break;
            }
        }
        let (scale, unit) = parse_unit(&word)?;

        self.skip_whitespace_and_comments();
        let position = self.position();
        let text = self.read_identifier();
        Some(self.unit_token(text, scale, unit, position))
    }

    fn unit_token(&self, text: String, scale: f64, unit: Unit, position: Position) -> Token {
        Token {
            kind: TokenKind::Unit(unit),
            text,
            value: Some(scale),
            position,
        }
    }
}
