//! Line-oriented section splitter
//!
//! A section starts at a line whose first non-blank character is `$`
//! followed by its name. Anything after the name on the header line belongs
//! to the body, so `$CMT GUT CENT` and a multi-line `$CMT` read the same.

use pkmodel_core::{is_identifier, SectionKind, SyntaxError};

/// One physical line of a section body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceLine<'a> {
    /// 1-based line number in the model file
    pub number: usize,
    /// 1-based column of `text`'s first character
    pub column: usize,
    pub text: &'a str,
}

impl<'a> SourceLine<'a> {
    /// True for blank lines and whole-line `#` or `//` comments.
    pub fn is_ignorable(&self) -> bool {
        let trimmed = self.text.trim();
        trimmed.is_empty() || trimmed.starts_with('#') || trimmed.starts_with("//")
    }
}

/// A section as written, before its body is interpreted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawSection<'a> {
    /// Upper-cased header name without `$`
    pub name: String,
    /// `None` for sections the parser does not interpret
    pub kind: Option<SectionKind>,
    /// Line of the `$NAME` header
    pub line: usize,
    pub body: Vec<SourceLine<'a>>,
}

impl<'a> RawSection<'a> {
    /// Body lines that carry content.
    pub fn content_lines(&self) -> impl Iterator<Item = &SourceLine<'a>> {
        self.body.iter().filter(|l| !l.is_ignorable())
    }

    /// Body text exactly as written, without leading and trailing blank lines.
    pub fn verbatim_body(&self) -> String {
        let lines: Vec<&str> = self.body.iter().map(|l| l.text).collect();
        let first = lines.iter().position(|l| !l.trim().is_empty());
        let last = lines.iter().rposition(|l| !l.trim().is_empty());
        match (first, last) {
            (Some(first), Some(last)) => lines[first..=last].join("\n"),
            _ => String::new(),
        }
    }
}

/// Split model source into sections in file order.
///
/// Fails on a `$` without a valid name, on a known section name written
/// without its `$`, and on content before the first header.
pub fn split_sections(source: &str) -> Result<Vec<RawSection<'_>>, SyntaxError> {
    let mut sections: Vec<RawSection<'_>> = Vec::new();

    for (idx, line) in source.lines().enumerate() {
        let line_no = idx + 1;
        let indent = line.len() - line.trim_start().len();
        let trimmed = line.trim();

        if let Some(after_dollar) = trimmed.strip_prefix('$') {
            let name_len = after_dollar
                .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
                .unwrap_or(after_dollar.len());
            let name = &after_dollar[..name_len];
            let rest = &after_dollar[name_len..];

            let starts_alpha = name.chars().next().map(|c| c.is_ascii_alphabetic()).unwrap_or(false);
            let separated = rest.is_empty() || rest.starts_with(char::is_whitespace);
            if !starts_alpha || !separated {
                return Err(SyntaxError::new(
                    "malformed section header",
                    line_no,
                    indent + 1,
                    line,
                ));
            }

            let name = name.to_ascii_uppercase();
            let mut section = RawSection {
                kind: SectionKind::from_name(&name),
                name,
                line: line_no,
                body: Vec::new(),
            };

            let rest_trimmed = rest.trim_start();
            if !rest_trimmed.trim_end().is_empty() {
                let offset = trimmed.len() - rest_trimmed.len();
                section.body.push(SourceLine {
                    number: line_no,
                    column: indent + offset + 1,
                    text: rest_trimmed.trim_end(),
                });
            }

            sections.push(section);
            continue;
        }

        let current_kind = sections.last().and_then(|s| s.kind);
        let source_line = SourceLine {
            number: line_no,
            column: 1,
            text: line,
        };

        if !source_line.is_ignorable() && looks_like_bare_header(trimmed, current_kind) {
            return Err(SyntaxError::new(
                "section header is missing `$`",
                line_no,
                indent + 1,
                line,
            ));
        }

        match sections.last_mut() {
            Some(section) => section.body.push(source_line),
            None if source_line.is_ignorable() => {}
            None => {
                return Err(SyntaxError::new(
                    "content before the first section header",
                    line_no,
                    indent + 1,
                    line,
                ))
            }
        }
    }

    Ok(sections)
}

/// A known section name at the start of a line that is not an assignment to
/// a variable of the same name.
fn looks_like_bare_header(trimmed: &str, current: Option<SectionKind>) -> bool {
    let word_len = trimmed
        .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
        .unwrap_or(trimmed.len());
    let word = &trimmed[..word_len];
    if SectionKind::from_name(word).is_none() {
        return false;
    }

    let rest = trimmed[word_len..].trim_start();
    if rest.starts_with('=') || rest.starts_with(';') {
        return false;
    }
    // Inside a name list `SET` or `CMT` can be a variable or a built-in
    let in_name_list = matches!(current, Some(SectionKind::Capture | SectionKind::Cmt));
    !(in_name_list && is_name_list(trimmed))
}

/// Whitespace or comma separated identifiers, up to a trailing `//` comment.
fn is_name_list(trimmed: &str) -> bool {
    let text = trimmed.find("//").map(|i| &trimmed[..i]).unwrap_or(trimmed);
    text.split(|c: char| c.is_whitespace() || c == ',')
        .filter(|w| !w.is_empty())
        .all(is_identifier)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_inline_and_block_bodies() {
        let source = "$PKMODEL ncmt=2, depot=TRUE\n\n$CMT\nGUT\nCENT\n";
        let sections = split_sections(source).unwrap();
        assert_eq!(sections.len(), 2);

        assert_eq!(sections[0].kind, Some(SectionKind::PkModel));
        assert_eq!(sections[0].body[0].text, "ncmt=2, depot=TRUE");
        assert_eq!(sections[0].body[0].number, 1);
        assert_eq!(sections[0].body[0].column, 10);

        let names: Vec<&str> = sections[1].content_lines().map(|l| l.text).collect();
        assert_eq!(names, vec!["GUT", "CENT"]);
        assert_eq!(sections[1].line, 3);
    }

    #[test]
    fn test_header_names_are_case_insensitive() {
        let sections = split_sections("$main\ndouble CL = 1;\n").unwrap();
        assert_eq!(sections[0].name, "MAIN");
        assert_eq!(sections[0].kind, Some(SectionKind::Main));
    }

    #[test]
    fn test_unknown_section_kept_verbatim() {
        let source = "$ODE\n\n  dxdt_CENT = -KE*CENT;\n\n// done\n\n$SET end=1\n";
        let sections = split_sections(source).unwrap();
        assert_eq!(sections[0].kind, None);
        assert_eq!(sections[0].name, "ODE");
        assert_eq!(sections[0].verbatim_body(), "  dxdt_CENT = -KE*CENT;\n\n// done");
    }

    #[test]
    fn test_missing_dollar_reports_line() {
        let source = "$NMXML\nrun = 1\n\nMAIN\ndouble CL = THETA1;\n";
        let err = split_sections(source).unwrap_err();
        assert_eq!(err.line, 4);
        assert_eq!(err.column, 1);
        assert_eq!(err.text, "MAIN");
        assert!(err.message.contains("missing `$`"));
    }

    #[test]
    fn test_missing_dollar_with_inline_body() {
        let err = split_sections("$NMXML\nrun = 1\n  CMT GUT CENT\n").unwrap_err();
        assert_eq!(err.line, 3);
        assert_eq!(err.column, 3);
    }

    #[test]
    fn test_section_named_variable_is_not_a_header() {
        let sections = split_sections("$MAIN\nSET = THETA1;\n").unwrap();
        assert_eq!(sections[0].body.len(), 1);
    }

    #[test]
    fn test_capture_of_cmt_builtin_allowed() {
        let sections = split_sections("$CAPTURE\nCMT\n").unwrap();
        assert_eq!(sections[0].content_lines().count(), 1);
    }

    #[test]
    fn test_section_named_entries_in_name_lists() {
        let sections = split_sections("$TABLE\ndouble SET = 1;\n$CAPTURE\nCP\nSET\n$CMT\nTABLE GUT // odd\n").unwrap();
        assert_eq!(sections.len(), 3);
        assert_eq!(sections[1].content_lines().count(), 2);
        assert_eq!(sections[2].content_lines().count(), 1);

        // Outside a name list the same line is still a header without `$`
        let err = split_sections("$SET end=1\nCAPTURE\n").unwrap_err();
        assert_eq!(err.line, 2);
        // and a non-name line inside a list is too
        let err = split_sections("$CMT CENT\nMAIN (x)\n").unwrap_err();
        assert_eq!(err.line, 2);
    }

    #[test]
    fn test_malformed_header() {
        let err = split_sections("$NMXML\nrun = 1\n$ 2\n").unwrap_err();
        assert_eq!(err.line, 3);
        assert!(err.message.contains("malformed"));

        let err = split_sections("$MAIN-x\n").unwrap_err();
        assert_eq!(err.line, 1);
    }

    #[test]
    fn test_content_before_first_header() {
        let err = split_sections("// model\nrun = 1\n$NMXML\n").unwrap_err();
        assert_eq!(err.line, 2);
        assert!(err.message.contains("before the first section"));
    }

    #[test]
    fn test_leading_comments_allowed() {
        let sections = split_sections("# header comment\n\n$SET end=1\n").unwrap();
        assert_eq!(sections.len(), 1);
    }
}
