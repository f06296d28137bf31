//! Error types for model parsing and validation

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Sections of a model file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SectionKind {
    Nmxml,
    Main,
    PkModel,
    Cmt,
    Table,
    Capture,
    Set,
}

impl SectionKind {
    pub const ALL: [SectionKind; 7] = [
        SectionKind::Nmxml,
        SectionKind::Main,
        SectionKind::PkModel,
        SectionKind::Cmt,
        SectionKind::Table,
        SectionKind::Capture,
        SectionKind::Set,
    ];

    /// Header name without the leading `$`.
    pub fn name(self) -> &'static str {
        match self {
            SectionKind::Nmxml => "NMXML",
            SectionKind::Main => "MAIN",
            SectionKind::PkModel => "PKMODEL",
            SectionKind::Cmt => "CMT",
            SectionKind::Table => "TABLE",
            SectionKind::Capture => "CAPTURE",
            SectionKind::Set => "SET",
        }
    }

    /// Resolve an upper-cased header name.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.name() == name)
    }
}

impl fmt::Display for SectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "${}", self.name())
    }
}

/// Which `$NMXML` label list an identifier should have been declared in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LabelKind {
    RandomEffect,
    ResidualError,
}

impl LabelKind {
    /// The `$NMXML` key that declares labels of this kind.
    pub fn nmxml_key(self) -> &'static str {
        match self {
            LabelKind::RandomEffect => "olabels",
            LabelKind::ResidualError => "slabels",
        }
    }
}

impl fmt::Display for LabelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LabelKind::RandomEffect => write!(f, "random-effect"),
            LabelKind::ResidualError => write!(f, "residual-error"),
        }
    }
}

// ============================================================================
// SYNTAX ERROR
// ============================================================================

/// Malformed section or line structure. Parsing stops at the first one.
#[derive(Debug, Clone, Error, PartialEq, Eq, Serialize, Deserialize)]
#[error("syntax error at line {line}, column {column}: {message}: `{text}`")]
pub struct SyntaxError {
    pub message: String,
    /// 1-based source line
    pub line: usize,
    /// 1-based column within the line
    pub column: usize,
    /// The offending source line, trimmed
    pub text: String,
}

impl SyntaxError {
    pub fn new(message: impl Into<String>, line: usize, column: usize, text: &str) -> Self {
        Self {
            message: message.into(),
            line,
            column,
            text: text.trim().to_string(),
        }
    }
}

// ============================================================================
// VALIDATION ERRORS
// ============================================================================

/// A well-formed model that breaks a consistency rule.
#[derive(Debug, Clone, Error, PartialEq, Serialize, Deserialize)]
pub enum ValidationError {
    #[error("missing required {section} key `{key}`")]
    MissingField { section: SectionKind, key: String },

    #[error("invalid value for {section} key `{key}`: {reason}")]
    InvalidValue {
        section: SectionKind,
        key: String,
        reason: String,
    },

    #[error("duplicate {kind} `{name}`")]
    DuplicateDefinition { kind: String, name: String },

    #[error("`{name}` in {section} is not a declared {label} label (add it to `{}` in $NMXML)", .label.nmxml_key())]
    UndeclaredLabel {
        section: SectionKind,
        name: String,
        label: LabelKind,
    },

    #[error("residual-error label `{name}` cannot be used in $MAIN; residual error only exists in $TABLE")]
    MisplacedResidualError { name: String },

    #[error("`{name}` is used in {section} before it is assigned")]
    UseBeforeAssignment { section: SectionKind, name: String },

    #[error("cannot assign `{name}` in {section}: it is {reason}")]
    ReservedName {
        section: SectionKind,
        name: String,
        reason: String,
    },

    #[error("captured variable `{name}` is neither a $TABLE variable nor a built-in quantity")]
    UndefinedCapture { name: String },

    #[error("$CMT declares {actual} compartments but $PKMODEL ncmt={ncmt}, depot={} requires {expected}", r_bool(.depot))]
    CompartmentCountMismatch {
        expected: usize,
        actual: usize,
        ncmt: u32,
        depot: bool,
    },
}

impl ValidationError {
    /// The identifier (label, key, or variable) the violation is about.
    pub fn identifier(&self) -> Option<&str> {
        match self {
            ValidationError::MissingField { key, .. }
            | ValidationError::InvalidValue { key, .. } => Some(key),
            ValidationError::DuplicateDefinition { name, .. }
            | ValidationError::UndeclaredLabel { name, .. }
            | ValidationError::MisplacedResidualError { name }
            | ValidationError::UseBeforeAssignment { name, .. }
            | ValidationError::ReservedName { name, .. }
            | ValidationError::UndefinedCapture { name } => Some(name),
            ValidationError::CompartmentCountMismatch { .. } => None,
        }
    }

    /// Short name of the violated rule.
    pub fn invariant(&self) -> &'static str {
        match self {
            ValidationError::MissingField { .. } => "required-key",
            ValidationError::InvalidValue { .. } => "value-type",
            ValidationError::DuplicateDefinition { .. } => "unique-name",
            ValidationError::UndeclaredLabel { .. } => "declared-label",
            ValidationError::MisplacedResidualError { .. } => "residual-error-scope",
            ValidationError::UseBeforeAssignment { .. } => "assigned-before-use",
            ValidationError::ReservedName { .. } => "reserved-name",
            ValidationError::UndefinedCapture { .. } => "defined-capture",
            ValidationError::CompartmentCountMismatch { .. } => "compartment-count",
        }
    }
}

/// Every validation failure of one parse, in detection order.
#[derive(Debug, Clone, Error, PartialEq, Serialize, Deserialize)]
#[error("{}", format_errors(.0))]
pub struct ValidationErrors(pub Vec<ValidationError>);

impl ValidationErrors {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ValidationError> {
        self.0.iter()
    }

    /// True when some error is about `name`.
    pub fn mentions(&self, name: &str) -> bool {
        self.0.iter().any(|e| e.identifier() == Some(name))
    }
}

impl IntoIterator for ValidationErrors {
    type Item = ValidationError;
    type IntoIter = std::vec::IntoIter<ValidationError>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

fn r_bool(value: &bool) -> &'static str {
    if *value {
        "TRUE"
    } else {
        "FALSE"
    }
}

fn format_errors(errors: &[ValidationError]) -> String {
    let mut out = format!(
        "{} validation error{}",
        errors.len(),
        if errors.len() == 1 { "" } else { "s" }
    );
    for err in errors {
        out.push_str("\n  - ");
        out.push_str(&err.to_string());
    }
    out
}

// ============================================================================
// TOP-LEVEL ERROR
// ============================================================================

/// Failure of `parse`.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ModelError {
    #[error(transparent)]
    Syntax(#[from] SyntaxError),

    #[error(transparent)]
    Validation(#[from] ValidationErrors),
}

pub type ModelResult<T> = Result<T, ModelError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_section_kind_names() {
        for kind in SectionKind::ALL {
            assert_eq!(SectionKind::from_name(kind.name()), Some(kind));
        }
        assert_eq!(SectionKind::from_name("ODE"), None);
        assert_eq!(SectionKind::Main.to_string(), "$MAIN");
    }

    #[test]
    fn test_syntax_error_display() {
        let err = SyntaxError::new("section header is missing `$`", 3, 1, "  MAIN  ");
        assert_eq!(err.text, "MAIN");
        assert_eq!(
            err.to_string(),
            "syntax error at line 3, column 1: section header is missing `$`: `MAIN`"
        );
    }

    #[test]
    fn test_undeclared_label_names_identifier() {
        let err = ValidationError::UndeclaredLabel {
            section: SectionKind::Main,
            name: "EKB".to_string(),
            label: LabelKind::RandomEffect,
        };
        let msg = err.to_string();
        assert!(msg.contains("EKB"));
        assert!(msg.contains("olabels"));
        assert_eq!(err.identifier(), Some("EKB"));
        assert_eq!(err.invariant(), "declared-label");
    }

    #[test]
    fn test_validation_errors_display_lists_all() {
        let errors = ValidationErrors(vec![
            ValidationError::UndefinedCapture {
                name: "CQ".to_string(),
            },
            ValidationError::CompartmentCountMismatch {
                expected: 3,
                actual: 2,
                ncmt: 2,
                depot: true,
            },
        ]);
        let msg = errors.to_string();
        assert!(msg.starts_with("2 validation errors"));
        assert!(msg.contains("CQ"));
        assert!(msg.contains("ncmt=2, depot=TRUE requires 3"));
        assert!(errors.mentions("CQ"));
        assert!(!errors.mentions("CP"));
    }
}
