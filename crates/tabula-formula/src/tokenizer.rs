//! Formula tokenizer
//!
//! A permissive, single-pass lexer. It never fails: characters it does not
//! recognise are skipped, and numeric runs that do not form a valid decimal
//! come back as [`Token::Malformed`] (or [`Token::OutOfRange`] when well
//! formed but too large) for the compiler to reject.

use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use tabula_core::OperationKind;

/// Token types
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// One of `+ - * / %` or the `sqrt` keyword
    Operator(OperationKind),
    LeftParen,
    RightParen,
    /// Numeric literal (digits and at most one decimal point)
    Number(Decimal),
    /// Column name candidate
    Identifier(String),
    /// A numeric run that is not a valid literal, e.g. `1.2.3`
    Malformed(String),
    /// A valid literal beyond the range of a decimal constant
    OutOfRange(String),
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Operator(op) => f.write_str(op.symbol()),
            Token::LeftParen => f.write_str("("),
            Token::RightParen => f.write_str(")"),
            Token::Number(n) => write!(f, "{}", n),
            Token::Identifier(name) => f.write_str(name),
            Token::Malformed(text) | Token::OutOfRange(text) => f.write_str(text),
        }
    }
}

/// A token with the byte offset where it starts
#[derive(Debug, Clone, PartialEq)]
pub struct SpannedToken {
    pub token: Token,
    pub offset: usize,
}

/// Tokenize a formula string
///
/// # Example
/// ```rust
/// use tabula_formula::tokenizer::{tokenize, Token};
///
/// let tokens = tokenize("Width * 2");
/// assert_eq!(tokens.len(), 3);
/// assert_eq!(tokens[0], Token::Identifier("Width".into()));
/// ```
pub fn tokenize(text: &str) -> Vec<Token> {
    tokenize_spanned(text)
        .into_iter()
        .map(|spanned| spanned.token)
        .collect()
}

/// Tokenize a formula string, keeping offsets
pub fn tokenize_spanned(text: &str) -> Vec<SpannedToken> {
    let mut tokenizer = Tokenizer::new(text);
    let mut tokens = Vec::new();
    while let Some(token) = tokenizer.next_token() {
        tokens.push(token);
    }
    tokens
}

struct Tokenizer<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Tokenizer<'a> {
    fn new(input: &'a str) -> Self {
        Self { input, pos: 0 }
    }

    fn next_token(&mut self) -> Option<SpannedToken> {
        loop {
            self.skip_whitespace();
            let c = self.peek_char()?;
            let offset = self.pos;

            let single = match c {
                '+' => Some(Token::Operator(OperationKind::Add)),
                '-' => Some(Token::Operator(OperationKind::Subtract)),
                '*' => Some(Token::Operator(OperationKind::Multiply)),
                '/' => Some(Token::Operator(OperationKind::Divide)),
                '%' => Some(Token::Operator(OperationKind::Percent)),
                '(' => Some(Token::LeftParen),
                ')' => Some(Token::RightParen),
                _ => None,
            };
            if let Some(token) = single {
                self.advance();
                return Some(SpannedToken { token, offset });
            }

            // `sqrt` wins over identifier scanning, so `sqrtX` is `sqrt`, `X`
            if self.starts_with_sqrt() {
                self.pos += 4;
                return Some(SpannedToken {
                    token: Token::Operator(OperationKind::Sqrt),
                    offset,
                });
            }

            if c.is_ascii_digit() || c == '.' {
                let token = self.scan_number();
                return Some(SpannedToken { token, offset });
            }

            if c.is_alphanumeric() || c == '_' {
                let token = self.scan_identifier();
                return Some(SpannedToken { token, offset });
            }

            // Unknown character
            self.advance();
        }
    }

    fn starts_with_sqrt(&self) -> bool {
        self.input[self.pos..]
            .get(..4)
            .map_or(false, |head| head.eq_ignore_ascii_case("sqrt"))
    }

    fn scan_number(&mut self) -> Token {
        let start = self.pos;
        while self
            .peek_char()
            .map_or(false, |c| c.is_ascii_digit() || c == '.')
        {
            self.advance();
        }
        parse_literal(&self.input[start..self.pos])
    }

    fn scan_identifier(&mut self) -> Token {
        let start = self.pos;
        while self
            .peek_char()
            .map_or(false, |c| c.is_alphanumeric() || c == '_')
        {
            self.advance();
        }
        Token::Identifier(self.input[start..self.pos].to_string())
    }

    // === Helper methods ===

    fn peek_char(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn advance(&mut self) {
        if let Some(c) = self.peek_char() {
            self.pos += c.len_utf8();
        }
    }

    fn skip_whitespace(&mut self) {
        while self.peek_char().map_or(false, |c| c.is_whitespace()) {
            self.advance();
        }
    }
}

/// Parse a run of digits and dots as a decimal
///
/// Accepts `3`, `2.5`, `.5` and `5.`; rejects a lone `.` and anything with two
/// decimal points.
fn parse_literal(text: &str) -> Token {
    if text.matches('.').count() > 1 || !text.chars().any(|c| c.is_ascii_digit()) {
        return Token::Malformed(text.to_string());
    }
    let mut normalized = String::with_capacity(text.len() + 2);
    if text.starts_with('.') {
        normalized.push('0');
    }
    normalized.push_str(text);
    if text.ends_with('.') {
        normalized.push('0');
    }
    match Decimal::from_str(&normalized) {
        Ok(value) => Token::Number(value),
        Err(_) => Token::OutOfRange(text.to_string()),
    }
}
