//! Model Compiler - Validate the AST and build a ModelDescriptor
//!
//! Parsing only checks that each line has the right shape. The compiler
//! checks that the sections agree with each other: declared labels,
//! compartment counts, assignment order, captures.
//!
//! # Pipeline
//!
//! ```text
//! Source → Splitter → Parser → ModelAst → Compiler → ModelDescriptor
//!                                            ↓
//!                                 ValidationErrors (all of them)
//! ```

use crate::lexer::{Lexer, TokenKind};
use crate::parser::ast::*;
use indexmap::IndexMap;
use pkmodel_core::{
    is_builtin, is_identifier, Assignment, LabelKind, ModelDescriptor, OptionValue, PkModel,
    SectionKind, ValidationError, ValidationErrors,
};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use tracing::debug;

/// Knobs supplied by the engine the descriptor is built for.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParseOptions {
    /// Identifiers the engine provides beyond the standard built-ins
    #[serde(default)]
    pub extra_builtins: Vec<String>,
}

impl ParseOptions {
    pub fn with_builtins<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            extra_builtins: names.into_iter().map(Into::into).collect(),
        }
    }
}

/// Highest compartment count with a closed-form solution in the engine.
pub const MAX_NCMT: u32 = 2;

/// Builds a ModelDescriptor, collecting every violation on the way.
pub struct ModelCompiler<'a> {
    options: &'a ParseOptions,
    errors: Vec<ValidationError>,
    names: NameRegistry,
}

/// Registry for tracking defined names to detect duplicates.
#[derive(Debug, Default)]
struct NameRegistry {
    seen: HashMap<&'static str, HashSet<String>>,
}

impl NameRegistry {
    /// Returns false when `name` was already registered under `kind`.
    fn register(&mut self, kind: &'static str, name: &str) -> bool {
        self.seen.entry(kind).or_default().insert(name.to_string())
    }
}

/// Names a statement's expression may see.
struct Scope<'s> {
    observed: &'s [String],
    errors: &'s [String],
    compartments: &'s [String],
    extra_builtins: &'s [String],
}

impl Scope<'_> {
    fn is_builtin(&self, name: &str) -> bool {
        is_builtin(name)
            || self.compartments.iter().any(|c| c == name)
            || self.extra_builtins.iter().any(|b| b == name)
    }

    /// Why `name` cannot be assigned, if it cannot.
    fn reserved_reason(&self, name: &str) -> Option<&'static str> {
        if self.compartments.iter().any(|c| c == name) {
            Some("a compartment")
        } else if self.observed.iter().any(|l| l == name) {
            Some("a random-effect label")
        } else if self.errors.iter().any(|l| l == name) {
            Some("a residual-error label")
        } else if is_builtin(name) || self.extra_builtins.iter().any(|b| b == name) {
            Some("a built-in quantity")
        } else {
            None
        }
    }
}

impl<'a> ModelCompiler<'a> {
    pub fn new(options: &'a ParseOptions) -> Self {
        Self {
            options,
            errors: Vec::new(),
            names: NameRegistry::default(),
        }
    }

    /// Validate an AST and build the descriptor.
    pub fn compile(
        ast: &ModelAst,
        options: &ParseOptions,
    ) -> Result<ModelDescriptor, ValidationErrors> {
        let mut compiler = ModelCompiler::new(options);
        let descriptor = compiler.build(ast);

        if compiler.errors.is_empty() {
            debug!(
                run_id = descriptor.run_id,
                main = descriptor.main_statements.len(),
                table = descriptor.table_statements.len(),
                "model compiled"
            );
            Ok(descriptor)
        } else {
            debug!(errors = compiler.errors.len(), "model failed validation");
            Err(ValidationErrors(compiler.errors))
        }
    }

    fn build(&mut self, ast: &ModelAst) -> ModelDescriptor {
        let mut descriptor = ModelDescriptor {
            run_id: 0,
            project_path: String::new(),
            root_name: String::new(),
            observed_labels: Vec::new(),
            error_labels: Vec::new(),
            nmxml_options: IndexMap::new(),
            main_statements: Vec::new(),
            pk_model: PkModel::default(),
            compartment_names: Vec::new(),
            table_statements: Vec::new(),
            capture_variables: Vec::new(),
            simulation_settings: IndexMap::new(),
            extra_sections: ast.extra_sections.clone(),
        };

        self.compile_nmxml(ast, &mut descriptor);
        let pk_valid = self.compile_pkmodel(ast, &mut descriptor);
        self.compile_compartments(ast, &mut descriptor);

        // Without `$PKMODEL` the engine solves `$ODE` and any layout goes.
        let actual = descriptor.compartment_names.len();
        let expected = descriptor.expected_compartment_count();
        if ast.declares_pkmodel && pk_valid && actual != expected {
            self.report(ValidationError::CompartmentCountMismatch {
                expected,
                actual,
                ncmt: descriptor.pk_model.num_compartments,
                depot: descriptor.pk_model.has_depot,
            });
        }

        self.compile_statements(ast, &mut descriptor);
        self.compile_captures(ast, &mut descriptor);
        self.compile_settings(ast, &mut descriptor);
        descriptor
    }

    // ========================================================================
    // $NMXML
    // ========================================================================

    fn compile_nmxml(&mut self, ast: &ModelAst, descriptor: &mut ModelDescriptor) {
        let mut run = None;

        for entry in &ast.nmxml {
            if !self.names.register("$NMXML key", &entry.key) {
                self.duplicate("$NMXML key", &entry.key);
                continue;
            }

            match (entry.key.as_str(), &entry.value) {
                ("run", ValueNode::Scalar(OptionValue::Number(n))) if is_run_number(*n) => {
                    run = Some(*n as u32);
                }
                ("run", _) => {
                    run = Some(0);
                    self.invalid(SectionKind::Nmxml, "run", "expected a non-negative integer");
                }
                ("project", ValueNode::Scalar(OptionValue::Text(s))) => {
                    descriptor.project_path = s.clone();
                }
                ("root", ValueNode::Scalar(OptionValue::Text(s))) => {
                    descriptor.root_name = s.clone();
                }
                ("project" | "root", value) => {
                    let reason = format!("expected text, found {}", value.kind());
                    self.invalid(SectionKind::Nmxml, &entry.key, &reason);
                }
                ("olabels", ValueNode::List(items)) => {
                    descriptor.observed_labels = self.labels(items, LabelKind::RandomEffect);
                }
                ("slabels", ValueNode::List(items)) => {
                    descriptor.error_labels = self.labels(items, LabelKind::ResidualError);
                }
                ("olabels" | "slabels", value) => {
                    let reason = format!("expected a list literal `c(...)`, found {}", value.kind());
                    self.invalid(SectionKind::Nmxml, &entry.key, &reason);
                }
                (_, ValueNode::Scalar(value)) => {
                    descriptor.nmxml_options.insert(entry.key.clone(), value.clone());
                }
                (_, ValueNode::List(_)) => {
                    self.invalid(
                        SectionKind::Nmxml,
                        &entry.key,
                        "list literals are only accepted for `olabels` and `slabels`",
                    );
                }
            }
        }

        match run {
            Some(run) => descriptor.run_id = run,
            None => self.report(ValidationError::MissingField {
                section: SectionKind::Nmxml,
                key: "run".to_string(),
            }),
        }
    }

    fn labels(&mut self, items: &[String], kind: LabelKind) -> Vec<String> {
        let key = kind.nmxml_key();
        let mut labels = Vec::with_capacity(items.len());

        for item in items {
            if !is_identifier(item) {
                let reason = format!("`{}` is not a valid identifier", item);
                self.invalid(SectionKind::Nmxml, key, &reason);
            } else if is_builtin(item) || self.is_extra_builtin(item) {
                let reason = format!("`{}` is a built-in quantity", item);
                self.invalid(SectionKind::Nmxml, key, &reason);
            } else if !self.names.register("label", item) {
                self.duplicate("label", item);
            } else {
                labels.push(item.clone());
            }
        }

        labels
    }

    // ========================================================================
    // $PKMODEL / $CMT
    // ========================================================================

    /// Returns false when `ncmt` or `depot` is unusable.
    fn compile_pkmodel(&mut self, ast: &ModelAst, descriptor: &mut ModelDescriptor) -> bool {
        let mut valid = true;
        let pk = &mut descriptor.pk_model;

        for entry in &ast.pkmodel {
            if !self.names.register("$PKMODEL key", &entry.key) {
                self.duplicate("$PKMODEL key", &entry.key);
                continue;
            }

            let value = &entry.value;
            match entry.key.as_str() {
                "ncmt" => match value.as_f64().filter(|n| is_ncmt(*n)) {
                    Some(n) => pk.num_compartments = n as u32,
                    None => {
                        valid = false;
                        let reason = format!("expected 1 or {}, found {}", MAX_NCMT, value);
                        self.invalid(SectionKind::PkModel, "ncmt", &reason);
                    }
                },
                "depot" => match value.as_bool() {
                    Some(b) => pk.has_depot = b,
                    None => {
                        valid = false;
                        let reason = format!("expected TRUE or FALSE, found {}", value.kind());
                        self.invalid(SectionKind::PkModel, "depot", &reason);
                    }
                },
                key => {
                    pk.options.insert(key.to_string(), value.clone());
                }
            }
        }

        valid
    }

    fn compile_compartments(&mut self, ast: &ModelAst, descriptor: &mut ModelDescriptor) {
        for node in &ast.compartments {
            if self.names.register("compartment", &node.name) {
                descriptor.compartment_names.push(node.name.clone());
            } else {
                self.duplicate("compartment", &node.name);
            }
        }
    }

    // ========================================================================
    // $MAIN / $TABLE
    // ========================================================================

    fn compile_statements(&mut self, ast: &ModelAst, descriptor: &mut ModelDescriptor) {
        let options = self.options;
        let scope = Scope {
            observed: &descriptor.observed_labels,
            errors: &descriptor.error_labels,
            compartments: &descriptor.compartment_names,
            extra_builtins: &options.extra_builtins,
        };
        let mut found = Vec::new();
        let mut assigned: HashSet<&str> = HashSet::new();

        let main_names: HashSet<&str> = ast.main.iter().map(|s| s.name.as_str()).collect();
        for stmt in &ast.main {
            check_statement(&scope, SectionKind::Main, stmt, &assigned, &main_names, &mut found);
            assigned.insert(&stmt.name);
        }

        let table_names: HashSet<&str> = ast.table.iter().map(|s| s.name.as_str()).collect();
        for stmt in &ast.table {
            check_statement(&scope, SectionKind::Table, stmt, &assigned, &table_names, &mut found);
            assigned.insert(&stmt.name);
        }

        for err in found {
            self.report(err);
        }

        descriptor.main_statements = ast.main.iter().map(to_assignment).collect();
        descriptor.table_statements = ast.table.iter().map(to_assignment).collect();
    }

    // ========================================================================
    // $CAPTURE / $SET
    // ========================================================================

    fn compile_captures(&mut self, ast: &ModelAst, descriptor: &mut ModelDescriptor) {
        for node in &ast.captures {
            let name = node.name.as_str();
            if !self.names.register("capture variable", name) {
                self.duplicate("capture variable", name);
                continue;
            }

            let defined = descriptor.table_statements.iter().any(|s| s.name == name)
                || descriptor.is_compartment(name)
                || is_builtin(name)
                || self.is_extra_builtin(name);
            if !defined {
                self.report(ValidationError::UndefinedCapture {
                    name: name.to_string(),
                });
            }
            descriptor.capture_variables.push(node.name.clone());
        }
    }

    fn compile_settings(&mut self, ast: &ModelAst, descriptor: &mut ModelDescriptor) {
        for entry in &ast.settings {
            if self.names.register("$SET key", &entry.key) {
                descriptor.simulation_settings.insert(entry.key.clone(), entry.value);
            } else {
                self.duplicate("$SET key", &entry.key);
            }
        }
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    fn is_extra_builtin(&self, name: &str) -> bool {
        self.options.extra_builtins.iter().any(|b| b == name)
    }

    /// Record an error once; the same violation found twice is reported once.
    fn report(&mut self, err: ValidationError) {
        if !self.errors.contains(&err) {
            self.errors.push(err);
        }
    }

    fn duplicate(&mut self, kind: &str, name: &str) {
        self.report(ValidationError::DuplicateDefinition {
            kind: kind.to_string(),
            name: name.to_string(),
        });
    }

    fn invalid(&mut self, section: SectionKind, key: &str, reason: &str) {
        self.report(ValidationError::InvalidValue {
            section,
            key: key.to_string(),
            reason: reason.to_string(),
        });
    }
}

/// Check one assignment against what is visible at that point.
///
/// A reference that resolves nowhere is classified by where it should have
/// come from: a variable assigned later in the same section, a residual-error
/// label misused in `$MAIN`, or a missing label declaration.
fn check_statement(
    scope: &Scope<'_>,
    section: SectionKind,
    stmt: &Statement,
    assigned: &HashSet<&str>,
    section_names: &HashSet<&str>,
    found: &mut Vec<ValidationError>,
) {
    if let Some(reason) = scope.reserved_reason(&stmt.name) {
        found.push(ValidationError::ReservedName {
            section,
            name: stmt.name.clone(),
            reason: reason.to_string(),
        });
    }

    for name in expression_references(&stmt.expression) {
        let visible = assigned.contains(name.as_str())
            || scope.observed.contains(&name)
            || scope.is_builtin(&name)
            || (section == SectionKind::Table && scope.errors.contains(&name));
        if visible {
            continue;
        }

        let err = if section == SectionKind::Main && scope.errors.contains(&name) {
            ValidationError::MisplacedResidualError { name }
        } else if section_names.contains(name.as_str()) {
            ValidationError::UseBeforeAssignment { section, name }
        } else {
            let label = if section == SectionKind::Main {
                LabelKind::RandomEffect
            } else {
                LabelKind::ResidualError
            };
            ValidationError::UndeclaredLabel {
                section,
                name,
                label,
            }
        };
        found.push(err);
    }
}

/// Words of the engine's C-like expression language that never name a
/// model quantity.
const EXPRESSION_KEYWORDS: &[&str] = &[
    "true", "false", "NULL", "nullptr", "if", "else", "return", "double", "float", "int",
    "long", "unsigned", "bool", "const", "auto", "static_cast",
];

/// Identifiers an expression reads, in first-use order.
///
/// Function-call heads (`exp(`), member names (`self.time`), scope
/// qualifiers (`std::`) and language keywords are skipped; they belong to
/// the engine's expression language.
pub fn expression_references(expression: &str) -> Vec<String> {
    let tokens = Lexer::new(expression).tokenize();
    let mut names: Vec<String> = Vec::new();

    for (i, token) in tokens.iter().enumerate() {
        let TokenKind::Identifier(name) = &token.kind else {
            continue;
        };
        let qualified = i > 0
            && (tokens[i - 1].kind == TokenKind::Dot || is_scope_operator(&tokens[i - 1].kind));
        let followed_by = tokens.get(i + 1).map(|t| &t.kind);
        let is_call = matches!(followed_by, Some(TokenKind::LParen));
        let is_qualifier = followed_by.map(is_scope_operator).unwrap_or(false);
        let is_keyword = EXPRESSION_KEYWORDS.contains(&name.as_str());
        if !qualified && !is_call && !is_qualifier && !is_keyword && !names.contains(name) {
            names.push(name.clone());
        }
    }

    names
}

fn is_scope_operator(kind: &TokenKind) -> bool {
    matches!(kind, TokenKind::Operator(op) if op == "::")
}

fn to_assignment(stmt: &Statement) -> Assignment {
    Assignment::new(stmt.name.clone(), stmt.expression.clone())
}

fn is_run_number(n: f64) -> bool {
    n.fract() == 0.0 && n >= 0.0 && n <= f64::from(u32::MAX)
}

fn is_ncmt(n: f64) -> bool {
    n.fract() == 0.0 && n >= 1.0 && n <= f64::from(MAX_NCMT)
}
