//! Lexer token types

use std::fmt;

/// Token kinds for value text and C-like expressions.
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    // Delimiters
    LParen,
    RParen,
    LBracket,
    RBracket,
    Comma,
    Dot,
    Semicolon,
    Assign,

    /// Arithmetic, comparison, and logical operators (`+`, `<=`, `&&`, `?`, ...)
    Operator(String),

    // Literals
    String(String),
    Number(f64),
    Identifier(String),

    // Special
    Eof,
    Error(String),
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::LParen => write!(f, "`(`"),
            TokenKind::RParen => write!(f, "`)`"),
            TokenKind::LBracket => write!(f, "`[`"),
            TokenKind::RBracket => write!(f, "`]`"),
            TokenKind::Comma => write!(f, "`,`"),
            TokenKind::Dot => write!(f, "`.`"),
            TokenKind::Semicolon => write!(f, "`;`"),
            TokenKind::Assign => write!(f, "`=`"),
            TokenKind::Operator(op) => write!(f, "`{}`", op),
            TokenKind::String(_) => write!(f, "string"),
            TokenKind::Number(_) => write!(f, "number"),
            TokenKind::Identifier(name) => write!(f, "identifier `{}`", name),
            TokenKind::Eof => write!(f, "end of input"),
            TokenKind::Error(msg) => write!(f, "{}", msg),
        }
    }
}

/// Source location span.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub start: usize,
    pub end: usize,
    pub line: usize,
    pub column: usize,
}

impl Default for Span {
    fn default() -> Self {
        Self {
            start: 0,
            end: 0,
            line: 1,
            column: 1,
        }
    }
}

/// A token with its kind and source location.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}
