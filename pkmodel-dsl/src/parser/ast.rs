//! Syntax tree of a model file
//!
//! The tree holds what each section says, in source order, with the line it
//! was said on. Nothing here has been checked for consistency yet; that is
//! the compiler's job.

use indexmap::IndexMap;
use pkmodel_core::OptionValue;

/// Parsed model file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModelAst {
    /// `$NMXML` entries
    pub nmxml: Vec<Entry<ValueNode>>,
    /// `$MAIN` statements
    pub main: Vec<Statement>,
    /// `$PKMODEL` pairs
    pub pkmodel: Vec<Entry<OptionValue>>,
    /// A `$PKMODEL` section appeared, even an empty one
    pub declares_pkmodel: bool,
    /// `$CMT` names
    pub compartments: Vec<NameNode>,
    /// `$TABLE` statements
    pub table: Vec<Statement>,
    /// `$CAPTURE` names
    pub captures: Vec<NameNode>,
    /// `$SET` pairs
    pub settings: Vec<Entry<f64>>,
    /// Sections the parser does not interpret, by upper-cased name
    pub extra_sections: IndexMap<String, String>,
}

impl ModelAst {
    /// Number of `$MAIN` and `$TABLE` statements.
    pub fn statement_count(&self) -> usize {
        self.main.len() + self.table.len()
    }
}

/// `key = value` with its source line.
#[derive(Debug, Clone, PartialEq)]
pub struct Entry<T> {
    pub key: String,
    pub value: T,
    pub line: usize,
}

/// Right-hand side of an `$NMXML` entry.
#[derive(Debug, Clone, PartialEq)]
pub enum ValueNode {
    Scalar(OptionValue),
    /// `c("A", "B", ...)`
    List(Vec<String>),
}

impl ValueNode {
    pub fn kind(&self) -> &'static str {
        match self {
            ValueNode::Scalar(value) => value.kind(),
            ValueNode::List(_) => "list",
        }
    }
}

/// `[type] NAME = EXPR;`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Statement {
    /// Declared type words (`double`, `const double`), if any
    pub declared_type: Option<String>,
    pub name: String,
    /// Trimmed expression text, without the `;`
    pub expression: String,
    pub line: usize,
}

/// An identifier listed in `$CMT` or `$CAPTURE`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameNode {
    pub name: String,
    pub line: usize,
}
