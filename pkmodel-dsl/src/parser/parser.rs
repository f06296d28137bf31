//! Parser implementation

use super::ast::*;
use crate::lexer::*;
use crate::section::{split_sections, RawSection, SourceLine};
use pkmodel_core::{is_identifier, OptionValue, SectionKind, SyntaxError};
use tracing::{debug, warn};

/// Split and parse model source. Stops at the first syntax error.
pub fn parse_model(source: &str) -> Result<ModelAst, SyntaxError> {
    let sections = split_sections(source)?;
    debug!(sections = sections.len(), "split model source");
    parse_sections(&sections)
}

/// Parse already split sections. Repeated sections are concatenated.
pub fn parse_sections(sections: &[RawSection<'_>]) -> Result<ModelAst, SyntaxError> {
    let mut ast = ModelAst::default();

    for section in sections {
        let Some(kind) = section.kind else {
            warn!(section = %section.name, line = section.line, "keeping unrecognized section verbatim");
            let body = section.verbatim_body();
            match ast.extra_sections.get_mut(&section.name) {
                Some(existing) if existing.is_empty() => *existing = body,
                Some(existing) => {
                    if !body.is_empty() {
                        existing.push('\n');
                        existing.push_str(&body);
                    }
                }
                None => {
                    ast.extra_sections.insert(section.name.clone(), body);
                }
            }
            continue;
        };
        if kind == SectionKind::PkModel {
            ast.declares_pkmodel = true;
        }

        for line in section.content_lines() {
            match kind {
                SectionKind::Nmxml => ast.nmxml.push(parse_nmxml_entry(line)?),
                SectionKind::Main => ast.main.extend(parse_statements(line)?),
                SectionKind::PkModel => {
                    for (key, value, offset) in parse_pairs(line)? {
                        let value = parse_scalar(value, line, offset)?;
                        ast.pkmodel.push(Entry {
                            key,
                            value,
                            line: line.number,
                        });
                    }
                }
                SectionKind::Cmt => ast.compartments.extend(parse_names(line, "compartment")?),
                SectionKind::Table => ast.table.extend(parse_statements(line)?),
                SectionKind::Capture => ast.captures.extend(parse_names(line, "capture variable")?),
                SectionKind::Set => {
                    for (key, value, offset) in parse_pairs(line)? {
                        let value = parse_number(value).ok_or_else(|| {
                            line_error(line, offset, &format!("`$SET {}` must be numeric", key))
                        })?;
                        ast.settings.push(Entry {
                            key,
                            value,
                            line: line.number,
                        });
                    }
                }
            }
        }
    }

    debug!(
        statements = ast.statement_count(),
        compartments = ast.compartments.len(),
        extra_sections = ast.extra_sections.len(),
        "parsed model sections"
    );
    Ok(ast)
}

// ============================================================================
// SECTION GRAMMARS
// ============================================================================

/// `key = value` in `$NMXML`.
fn parse_nmxml_entry(line: &SourceLine<'_>) -> Result<Entry<ValueNode>, SyntaxError> {
    let text = strip_comment(line.text);
    let Some(eq) = find_unquoted(text, '=') else {
        return Err(line_error(line, leading_ws(text), "expected `key = value`"));
    };

    let key = text[..eq].trim();
    if !is_identifier(key) {
        return Err(line_error(line, leading_ws(text), "invalid key"));
    }

    let raw = &text[eq + 1..];
    let mut value = raw.trim();
    if let Some(stripped) = value.strip_suffix(';').or_else(|| value.strip_suffix(',')) {
        value = stripped.trim_end();
    }
    let offset = eq + 1 + leading_ws(raw);
    if value.is_empty() {
        return Err(line_error(line, offset, &format!("missing value for `{}`", key)));
    }

    let value = if is_list_literal(value) {
        ValueNode::List(parse_list_literal(value, line, offset)?)
    } else {
        ValueNode::Scalar(parse_scalar(value, line, offset)?)
    };

    Ok(Entry {
        key: key.to_string(),
        value,
        line: line.number,
    })
}

/// One or more `[type] NAME = EXPR;` statements on a line.
fn parse_statements(line: &SourceLine<'_>) -> Result<Vec<Statement>, SyntaxError> {
    let text = strip_comment(line.text);
    let pieces = split_unquoted(text, ';');
    let (last_offset, last) = pieces[pieces.len() - 1];
    if !last.trim().is_empty() {
        return Err(line_error(line, last_offset + leading_ws(last), "missing `;`"));
    }

    let mut statements = Vec::new();
    for &(offset, piece) in &pieces[..pieces.len() - 1] {
        if piece.trim().is_empty() {
            return Err(line_error(line, offset, "empty statement"));
        }
        statements.push(parse_statement(piece, line, offset)?);
    }
    Ok(statements)
}

fn parse_statement(
    piece: &str,
    line: &SourceLine<'_>,
    offset: usize,
) -> Result<Statement, SyntaxError> {
    let start = offset + leading_ws(piece);
    let Some(eq) = find_unquoted(piece, '=') else {
        return Err(line_error(line, start, "expected assignment `NAME = EXPR`"));
    };
    if piece[eq + 1..].starts_with('=') {
        return Err(line_error(line, offset + eq, "expected assignment, found `==`"));
    }

    let mut words: Vec<&str> = piece[..eq].split_whitespace().collect();
    let Some(name) = words.pop() else {
        return Err(line_error(line, start, "missing variable name"));
    };
    if !is_identifier(name) || words.iter().any(|w| !is_identifier(w)) {
        return Err(line_error(line, start, "invalid assignment target"));
    }

    let expression = piece[eq + 1..].trim();
    if expression.is_empty() {
        return Err(line_error(line, offset + eq + 1, "empty expression"));
    }

    Ok(Statement {
        declared_type: if words.is_empty() { None } else { Some(words.join(" ")) },
        name: name.to_string(),
        expression: expression.to_string(),
        line: line.number,
    })
}

/// Comma-separated `key=value` pairs as `(key, value text, value offset)`.
fn parse_pairs<'a>(line: &SourceLine<'a>) -> Result<Vec<(String, &'a str, usize)>, SyntaxError> {
    let text = strip_comment(line.text);
    let mut pairs = Vec::new();

    for (offset, piece) in split_unquoted(text, ',') {
        if piece.trim().is_empty() {
            continue;
        }
        let start = offset + leading_ws(piece);
        let Some(eq) = find_unquoted(piece, '=') else {
            return Err(line_error(line, start, "expected `key=value`"));
        };
        let key = piece[..eq].trim();
        if !is_identifier(key) {
            return Err(line_error(line, start, "invalid key"));
        }
        let raw = &piece[eq + 1..];
        let value = raw.trim();
        if value.is_empty() {
            return Err(line_error(line, offset + eq + 1, &format!("missing value for `{}`", key)));
        }
        pairs.push((key.to_string(), value, offset + eq + 1 + leading_ws(raw)));
    }

    Ok(pairs)
}

/// Whitespace or comma separated identifiers.
fn parse_names(line: &SourceLine<'_>, what: &str) -> Result<Vec<NameNode>, SyntaxError> {
    let text = strip_comment(line.text);
    let mut names = Vec::new();
    let mut offset = 0;

    for word in text.split(|c: char| c.is_whitespace() || c == ',') {
        if !word.is_empty() {
            if !is_identifier(word) {
                return Err(line_error(line, offset, &format!("invalid {} name `{}`", what, word)));
            }
            names.push(NameNode {
                name: word.to_string(),
                line: line.number,
            });
        }
        offset += word.len() + 1;
    }

    Ok(names)
}

/// Scalar value: quoted text, `TRUE`/`FALSE`, a number, or bare text.
fn parse_scalar(
    value: &str,
    line: &SourceLine<'_>,
    offset: usize,
) -> Result<OptionValue, SyntaxError> {
    if value.starts_with('"') {
        let (l, c) = position(line, offset);
        let mut parser = Parser::new(tokenize_at(value, l, c), line.text);
        let text = parser.expect_string()?;
        parser.expect_end()?;
        return Ok(OptionValue::Text(text));
    }

    Ok(match value {
        "TRUE" => OptionValue::Bool(true),
        "FALSE" => OptionValue::Bool(false),
        _ => match parse_number(value) {
            Some(n) => OptionValue::Number(n),
            None => OptionValue::Text(value.to_string()),
        },
    })
}

fn parse_list_literal(
    value: &str,
    line: &SourceLine<'_>,
    offset: usize,
) -> Result<Vec<String>, SyntaxError> {
    let (l, c) = position(line, offset);
    let mut parser = Parser::new(tokenize_at(value, l, c), line.text);
    let items = parser.parse_list()?;
    parser.expect_end()?;
    Ok(items)
}

// ============================================================================
// TOKEN CURSOR
// ============================================================================

/// Cursor over the tokens of one value.
pub struct Parser<'a> {
    pub(crate) tokens: Vec<Token>,
    pub(crate) pos: usize,
    text: &'a str,
}

impl<'a> Parser<'a> {
    /// Create a parser over `tokens`; `text` is the source line for diagnostics.
    pub fn new(tokens: Vec<Token>, text: &'a str) -> Self {
        Self {
            tokens,
            pos: 0,
            text,
        }
    }

    /// `c("A", "B", ...)`, items quoted or bare identifiers.
    pub fn parse_list(&mut self) -> Result<Vec<String>, SyntaxError> {
        match &self.current().kind {
            TokenKind::Identifier(name) if name == "c" => self.advance(),
            _ => return Err(self.error("expected list literal `c(...)`")),
        }
        self.expect(TokenKind::LParen)?;

        let mut items = Vec::new();
        if self.check(&TokenKind::RParen) {
            self.advance();
            return Ok(items);
        }

        loop {
            match &self.current().kind {
                TokenKind::String(s) | TokenKind::Identifier(s) => {
                    items.push(s.clone());
                    self.advance();
                }
                _ => return Err(self.error("expected quoted label")),
            }
            if self.check(&TokenKind::Comma) {
                self.advance();
            } else {
                break;
            }
        }

        self.expect(TokenKind::RParen)?;
        Ok(items)
    }

    // ========================================================================
    // Helper methods
    // ========================================================================

    pub(crate) fn current(&self) -> &Token {
        &self.tokens[self.pos]
    }

    pub(crate) fn advance(&mut self) {
        if !self.is_at_end() {
            self.pos += 1;
        }
    }

    pub(crate) fn is_at_end(&self) -> bool {
        self.current().kind == TokenKind::Eof
    }

    pub(crate) fn check(&self, kind: &TokenKind) -> bool {
        std::mem::discriminant(&self.current().kind) == std::mem::discriminant(kind)
    }

    pub(crate) fn expect(&mut self, kind: TokenKind) -> Result<(), SyntaxError> {
        if self.check(&kind) {
            self.advance();
            Ok(())
        } else {
            Err(self.error(&format!("expected {}", kind)))
        }
    }

    pub(crate) fn expect_string(&mut self) -> Result<String, SyntaxError> {
        match &self.current().kind {
            TokenKind::String(s) => {
                let s = s.clone();
                self.advance();
                Ok(s)
            }
            _ => Err(self.error("expected quoted string")),
        }
    }

    pub(crate) fn expect_end(&mut self) -> Result<(), SyntaxError> {
        if self.is_at_end() {
            Ok(())
        } else {
            Err(self.error("unexpected text after value"))
        }
    }

    pub(crate) fn error(&self, msg: &str) -> SyntaxError {
        let token = self.current();
        let message = match &token.kind {
            TokenKind::Error(lex) => format!("{}: {}", msg, lex),
            found => format!("{}, found {}", msg, found),
        };
        SyntaxError::new(message, token.span.line, token.span.column, self.text)
    }
}

// ============================================================================
// TEXT HELPERS
// ============================================================================

/// Parse a finite decimal number. Words such as `inf` or `NaN` are not numbers.
pub fn parse_number(text: &str) -> Option<f64> {
    let first = text.chars().next()?;
    if !(first.is_ascii_digit() || matches!(first, '+' | '-' | '.')) {
        return None;
    }
    text.parse::<f64>().ok().filter(|n| n.is_finite())
}

/// True when `value` opens a `c(...)` list literal.
pub fn is_list_literal(value: &str) -> bool {
    value
        .strip_prefix('c')
        .map(|rest| rest.trim_start().starts_with('('))
        .unwrap_or(false)
}

/// Cut a trailing `//` or `/* ... */` comment that is not inside a quoted
/// string. A block comment followed by more code stays in place.
pub fn strip_comment(text: &str) -> &str {
    let mut in_quote = false;
    let mut escaped = false;
    let bytes = text.as_bytes();
    let mut i = 0;

    while i < bytes.len() {
        let b = bytes[i];
        if in_quote {
            match b {
                _ if escaped => escaped = false,
                b'\\' => escaped = true,
                b'"' => in_quote = false,
                _ => {}
            }
        } else if b == b'"' {
            in_quote = true;
        } else if b == b'/' && bytes.get(i + 1) == Some(&b'/') {
            return &text[..i];
        } else if b == b'/' && bytes.get(i + 1) == Some(&b'*') {
            let Some(len) = text[i + 2..].find("*/") else {
                return text;
            };
            let end = i + 2 + len + 2;
            if strip_comment(&text[end..]).trim().is_empty() {
                return &text[..i];
            }
            i = end;
            continue;
        }
        i += 1;
    }
    text
}

/// Split on `sep` outside quoted strings, keeping each piece's byte offset.
fn split_unquoted(text: &str, sep: char) -> Vec<(usize, &str)> {
    let mut pieces = Vec::new();
    let mut start = 0;
    let mut in_quote = false;
    let mut escaped = false;

    for (i, c) in text.char_indices() {
        if in_quote {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_quote = false,
                _ => {}
            }
        } else if c == '"' {
            in_quote = true;
        } else if c == sep {
            pieces.push((start, &text[start..i]));
            start = i + c.len_utf8();
        }
    }
    pieces.push((start, &text[start..]));
    pieces
}

fn find_unquoted(text: &str, target: char) -> Option<usize> {
    let pieces = split_unquoted(text, target);
    if pieces.len() > 1 {
        Some(pieces[0].1.len())
    } else {
        None
    }
}

fn leading_ws(text: &str) -> usize {
    text.len() - text.trim_start().len()
}

/// File position of byte `offset` within `line.text`.
fn position(line: &SourceLine<'_>, offset: usize) -> (usize, usize) {
    let prefix = line.text.get(..offset).unwrap_or(line.text);
    (line.number, line.column + prefix.chars().count())
}

fn line_error(line: &SourceLine<'_>, offset: usize, message: &str) -> SyntaxError {
    let (number, column) = position(line, offset);
    SyntaxError::new(message, number, column, line.text)
}
