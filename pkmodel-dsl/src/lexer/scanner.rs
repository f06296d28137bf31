//! Lexer implementation

use super::token::*;
use std::iter::Peekable;
use std::str::CharIndices;

/// Lexer over a fragment of model source.
///
/// Spans are reported relative to the position the fragment was taken from,
/// so errors point at the original file.
pub struct Lexer<'a> {
    source: &'a str,
    chars: Peekable<CharIndices<'a>>,
    line: usize,
    column: usize,
    pos: usize,
}

impl<'a> Lexer<'a> {
    /// Create a new lexer for the given source.
    pub fn new(source: &'a str) -> Self {
        Self::at(source, 1, 1)
    }

    /// Create a lexer whose first character sits at `line`/`column` of the file.
    pub fn at(source: &'a str, line: usize, column: usize) -> Self {
        Self {
            source,
            chars: source.char_indices().peekable(),
            line,
            column,
            pos: 0,
        }
    }

    /// Tokenize the entire source into a vector of tokens.
    pub fn tokenize(&mut self) -> Vec<Token> {
        let mut tokens = Vec::new();

        loop {
            let token = self.next_token();
            let is_eof = token.kind == TokenKind::Eof;
            tokens.push(token);
            if is_eof {
                break;
            }
        }

        tokens
    }

    fn next_token(&mut self) -> Token {
        self.skip_whitespace_and_comments();

        let start_pos = self.pos;
        let start_line = self.line;
        let start_col = self.column;

        let kind = match self.peek_char() {
            None => TokenKind::Eof,
            Some(c) => match c {
                '(' => self.single(TokenKind::LParen),
                ')' => self.single(TokenKind::RParen),
                '[' => self.single(TokenKind::LBracket),
                ']' => self.single(TokenKind::RBracket),
                ',' => self.single(TokenKind::Comma),
                ';' => self.single(TokenKind::Semicolon),

                '.' => {
                    if self.peek_next_char().map(|c| c.is_ascii_digit()).unwrap_or(false) {
                        self.scan_number()
                    } else {
                        self.single(TokenKind::Dot)
                    }
                }

                '=' => {
                    self.advance();
                    if self.peek_char() == Some('=') {
                        self.advance();
                        TokenKind::Operator("==".to_string())
                    } else {
                        TokenKind::Assign
                    }
                }

                '!' | '<' | '>' => {
                    self.advance();
                    if self.peek_char() == Some('=') {
                        self.advance();
                        TokenKind::Operator(format!("{}=", c))
                    } else {
                        TokenKind::Operator(c.to_string())
                    }
                }

                '&' | '|' => {
                    self.advance();
                    if self.peek_char() == Some(c) {
                        self.advance();
                        TokenKind::Operator(format!("{}{}", c, c))
                    } else {
                        TokenKind::Operator(c.to_string())
                    }
                }

                ':' => {
                    self.advance();
                    if self.peek_char() == Some(':') {
                        self.advance();
                        TokenKind::Operator("::".to_string())
                    } else {
                        TokenKind::Operator(":".to_string())
                    }
                }

                '+' | '-' | '*' | '/' | '%' | '^' | '?' => {
                    self.advance();
                    TokenKind::Operator(c.to_string())
                }

                '"' => self.scan_string(),

                c if c.is_ascii_digit() => self.scan_number(),

                c if c.is_ascii_alphabetic() || c == '_' => self.scan_identifier(),

                c => {
                    self.advance();
                    TokenKind::Error(format!("unexpected character `{}`", c))
                }
            },
        };

        Token {
            kind,
            span: Span {
                start: start_pos,
                end: self.pos,
                line: start_line,
                column: start_col,
            },
        }
    }

    fn single(&mut self, kind: TokenKind) -> TokenKind {
        self.advance();
        kind
    }

    /// Scan an identifier. The DSL has no keywords: `c`, `double`, and `TRUE`
    /// are ordinary identifiers interpreted by the parser.
    fn scan_identifier(&mut self) -> TokenKind {
        let start = self.pos;

        while let Some(c) = self.peek_char() {
            if c.is_ascii_alphanumeric() || c == '_' {
                self.advance();
            } else {
                break;
            }
        }

        TokenKind::Identifier(self.source[start..self.pos].to_string())
    }

    /// Scan a string literal with escape sequences.
    fn scan_string(&mut self) -> TokenKind {
        self.advance(); // consume opening quote
        let mut value = String::new();

        loop {
            match self.peek_char() {
                None | Some('\n') => return TokenKind::Error("unterminated string".to_string()),
                Some('"') => {
                    self.advance();
                    break;
                }
                Some('\\') => {
                    self.advance();
                    match self.peek_char() {
                        Some('n') => {
                            self.advance();
                            value.push('\n');
                        }
                        Some('t') => {
                            self.advance();
                            value.push('\t');
                        }
                        Some('r') => {
                            self.advance();
                            value.push('\r');
                        }
                        Some('\\') => {
                            self.advance();
                            value.push('\\');
                        }
                        Some('"') => {
                            self.advance();
                            value.push('"');
                        }
                        _ => value.push('\\'),
                    }
                }
                Some(c) => {
                    self.advance();
                    value.push(c);
                }
            }
        }

        TokenKind::String(value)
    }

    /// Scan a decimal literal with optional fraction and exponent (`1`, `0.5`, `.5`, `1e-3`).
    fn scan_number(&mut self) -> TokenKind {
        let start = self.pos;

        while let Some(c) = self.peek_char() {
            if c.is_ascii_digit() || c == '.' {
                self.advance();
            } else {
                break;
            }
        }

        if matches!(self.peek_char(), Some('e') | Some('E')) {
            let after = self.peek_next_char();
            let signed_digit = matches!(after, Some('+') | Some('-'))
                && self.source[self.pos..]
                    .chars()
                    .nth(2)
                    .map(|c| c.is_ascii_digit())
                    .unwrap_or(false);
            if after.map(|c| c.is_ascii_digit()).unwrap_or(false) || signed_digit {
                self.advance(); // e
                if signed_digit {
                    self.advance(); // sign
                }
                while let Some(c) = self.peek_char() {
                    if c.is_ascii_digit() {
                        self.advance();
                    } else {
                        break;
                    }
                }
            }
        }

        let text = &self.source[start..self.pos];
        match text.parse::<f64>() {
            Ok(n) => TokenKind::Number(n),
            Err(_) => TokenKind::Error(format!("invalid number `{}`", text)),
        }
    }

    /// Skip whitespace and comments.
    fn skip_whitespace_and_comments(&mut self) {
        loop {
            match self.peek_char() {
                Some(' ') | Some('\t') | Some('\r') => {
                    self.advance();
                }
                Some('\n') => {
                    self.advance();
                    self.line += 1;
                    self.column = 1;
                }
                Some('/') => {
                    let next = self.peek_next_char();
                    if next == Some('/') {
                        while let Some(c) = self.peek_char() {
                            if c == '\n' {
                                break;
                            }
                            self.advance();
                        }
                    } else if next == Some('*') {
                        self.advance(); // /
                        self.advance(); // *
                        loop {
                            match self.peek_char() {
                                None => break,
                                Some('*') if self.peek_next_char() == Some('/') => {
                                    self.advance();
                                    self.advance();
                                    break;
                                }
                                Some('\n') => {
                                    self.advance();
                                    self.line += 1;
                                    self.column = 1;
                                }
                                _ => {
                                    self.advance();
                                }
                            }
                        }
                    } else {
                        break;
                    }
                }
                _ => break,
            }
        }
    }

    fn peek_char(&mut self) -> Option<char> {
        self.chars.peek().map(|(_, c)| *c)
    }

    fn peek_next_char(&self) -> Option<char> {
        let mut iter = self.source[self.pos..].char_indices();
        iter.next();
        iter.next().map(|(_, c)| c)
    }

    fn advance(&mut self) -> Option<char> {
        if let Some((i, c)) = self.chars.next() {
            self.pos = i + c.len_utf8();
            self.column += 1;
            Some(c)
        } else {
            None
        }
    }
}

/// Tokenize `source` starting at the given file position.
pub fn tokenize_at(source: &str, line: usize, column: usize) -> Vec<Token> {
    Lexer::at(source, line, column).tokenize()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        Lexer::new(source).tokenize().into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn test_lexer_expression() {
        let tokens = kinds("THETA1*exp(ECL)");
        assert_eq!(
            tokens,
            vec![
                TokenKind::Identifier("THETA1".to_string()),
                TokenKind::Operator("*".to_string()),
                TokenKind::Identifier("exp".to_string()),
                TokenKind::LParen,
                TokenKind::Identifier("ECL".to_string()),
                TokenKind::RParen,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_lexer_list_literal() {
        let tokens = kinds(r#"c("ECL", "EVC")"#);
        assert_eq!(tokens[0], TokenKind::Identifier("c".to_string()));
        assert_eq!(tokens[1], TokenKind::LParen);
        assert_eq!(tokens[2], TokenKind::String("ECL".to_string()));
        assert_eq!(tokens[3], TokenKind::Comma);
        assert_eq!(tokens[4], TokenKind::String("EVC".to_string()));
        assert_eq!(tokens[5], TokenKind::RParen);
    }

    #[test]
    fn test_lexer_numbers() {
        let tokens = kinds("42 3.5 .5 1e-3 2E4");
        assert_eq!(tokens[0], TokenKind::Number(42.0));
        assert_eq!(tokens[1], TokenKind::Number(3.5));
        assert_eq!(tokens[2], TokenKind::Number(0.5));
        assert_eq!(tokens[3], TokenKind::Number(0.001));
        assert_eq!(tokens[4], TokenKind::Number(20000.0));
    }

    #[test]
    fn test_lexer_exponent_needs_digits() {
        // `2e` followed by an identifier character is a number then a name
        let tokens = kinds("2exp");
        assert_eq!(tokens[0], TokenKind::Number(2.0));
        assert_eq!(tokens[1], TokenKind::Identifier("exp".to_string()));
    }

    #[test]
    fn test_lexer_operators() {
        let tokens = kinds("= == != <= >= < > && || ! ? :");
        assert_eq!(tokens[0], TokenKind::Assign);
        let ops: Vec<String> = tokens[1..tokens.len() - 1]
            .iter()
            .map(|t| match t {
                TokenKind::Operator(op) => op.clone(),
                other => panic!("expected operator, got {:?}", other),
            })
            .collect();
        assert_eq!(ops, vec!["==", "!=", "<=", ">=", "<", ">", "&&", "||", "!", "?", ":"]);
    }

    #[test]
    fn test_lexer_scope_qualifier() {
        let tokens = kinds("std::exp(a ? b : c)");
        assert_eq!(tokens[0], TokenKind::Identifier("std".to_string()));
        assert_eq!(tokens[1], TokenKind::Operator("::".to_string()));
        assert_eq!(tokens[2], TokenKind::Identifier("exp".to_string()));
        assert_eq!(tokens[6], TokenKind::Identifier("b".to_string()));
        assert_eq!(tokens[7], TokenKind::Operator(":".to_string()));
    }

    #[test]
    fn test_lexer_member_access() {
        let tokens = kinds("self.time");
        assert_eq!(tokens[0], TokenKind::Identifier("self".to_string()));
        assert_eq!(tokens[1], TokenKind::Dot);
        assert_eq!(tokens[2], TokenKind::Identifier("time".to_string()));
    }

    #[test]
    fn test_lexer_comments() {
        let tokens = kinds("CL /* clearance */ + V2 // trailing");
        assert_eq!(tokens.len(), 4);
        assert_eq!(tokens[2], TokenKind::Identifier("V2".to_string()));
    }

    #[test]
    fn test_lexer_error_on_invalid_char() {
        let tokens = kinds("CL @ V2");
        assert!(matches!(tokens[1], TokenKind::Error(_)));
        assert_eq!(tokens[2], TokenKind::Identifier("V2".to_string()));
    }

    #[test]
    fn test_lexer_unterminated_string() {
        let tokens = kinds("\"abc");
        assert!(matches!(tokens[0], TokenKind::Error(_)));
    }

    #[test]
    fn test_lexer_spans_are_offset() {
        let tokens = tokenize_at("A + B", 7, 12);
        assert_eq!(tokens[0].span.line, 7);
        assert_eq!(tokens[0].span.column, 12);
        assert_eq!(tokens[2].span.column, 16);
    }
}
