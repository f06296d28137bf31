//! Model descriptor types

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// MODEL DESCRIPTOR (THE OUTPUT)
// ============================================================================

/// The validated, immutable description of one PK model file.
///
/// Built once per parse and handed to the simulation engine. Every sequence
/// keeps source order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelDescriptor {
    /// Run number (`run` in `$NMXML`)
    pub run_id: u32,

    /// Project path (`project` in `$NMXML`)
    pub project_path: String,

    /// Root file name (`root` in `$NMXML`)
    pub root_name: String,

    /// Random-effect labels (`olabels`)
    pub observed_labels: Vec<String>,

    /// Residual-error labels (`slabels`)
    pub error_labels: Vec<String>,

    /// Any other `$NMXML` key
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub nmxml_options: IndexMap<String, OptionValue>,

    /// Derived parameter assignments (`$MAIN`)
    pub main_statements: Vec<Assignment>,

    /// Analytic PK solution selector (`$PKMODEL`)
    pub pk_model: PkModel,

    /// Compartment names (`$CMT`)
    pub compartment_names: Vec<String>,

    /// Output assignments (`$TABLE`)
    pub table_statements: Vec<Assignment>,

    /// Quantities written to simulation output (`$CAPTURE`)
    pub capture_variables: Vec<String>,

    /// Numeric simulation settings (`$SET`)
    pub simulation_settings: IndexMap<String, f64>,

    /// Unrecognized sections, body kept verbatim
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub extra_sections: IndexMap<String, String>,
}

impl ModelDescriptor {
    /// Number of compartments `$CMT` must declare for this `$PKMODEL`.
    pub fn expected_compartment_count(&self) -> usize {
        self.pk_model.expected_compartment_count()
    }

    /// Look up a `$SET` value.
    pub fn setting(&self, key: &str) -> Option<f64> {
        self.simulation_settings.get(key).copied()
    }

    /// Names assigned in `$MAIN`, first assignment order, without repeats.
    pub fn main_variables(&self) -> Vec<&str> {
        unique_names(&self.main_statements)
    }

    /// Names assigned in `$TABLE`, first assignment order, without repeats.
    pub fn table_variables(&self) -> Vec<&str> {
        unique_names(&self.table_statements)
    }

    /// True when `name` is a compartment of this model.
    pub fn is_compartment(&self, name: &str) -> bool {
        self.compartment_names.iter().any(|c| c == name)
    }
}

fn unique_names(statements: &[Assignment]) -> Vec<&str> {
    let mut names: Vec<&str> = Vec::new();
    for stmt in statements {
        if !names.contains(&stmt.name.as_str()) {
            names.push(&stmt.name);
        }
    }
    names
}

/// A `type NAME = EXPR;` statement with the type dropped.
///
/// The expression is opaque text for the engine's own evaluator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assignment {
    pub name: String,
    pub expression: String,
}

impl Assignment {
    pub fn new(name: impl Into<String>, expression: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            expression: expression.into(),
        }
    }
}

/// `$PKMODEL` record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PkModel {
    /// `ncmt`: number of disposition compartments
    pub num_compartments: u32,
    /// `depot`: extravascular dosing compartment ahead of the central one
    pub has_depot: bool,
    /// Other keys (e.g. `trans`), kept for the engine
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub options: IndexMap<String, OptionValue>,
}

impl PkModel {
    pub fn expected_compartment_count(&self) -> usize {
        self.num_compartments as usize + usize::from(self.has_depot)
    }
}

impl Default for PkModel {
    fn default() -> Self {
        Self {
            num_compartments: 1,
            has_depot: false,
            options: IndexMap::new(),
        }
    }
}

/// Generic option value for keys the parser does not interpret.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OptionValue {
    Bool(bool),
    Number(f64),
    Text(String),
}

impl OptionValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            OptionValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            OptionValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Short name of the value kind, for diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            OptionValue::Bool(_) => "boolean",
            OptionValue::Number(_) => "number",
            OptionValue::Text(_) => "text",
        }
    }
}

impl fmt::Display for OptionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OptionValue::Bool(true) => write!(f, "TRUE"),
            OptionValue::Bool(false) => write!(f, "FALSE"),
            OptionValue::Number(n) => write!(f, "{}", n),
            OptionValue::Text(s) => write!(f, "{}", s),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ModelDescriptor {
        ModelDescriptor {
            run_id: 1005,
            project_path: "path".to_string(),
            root_name: "cppfile".to_string(),
            observed_labels: vec!["ECL".to_string()],
            error_labels: vec!["PROP".to_string()],
            nmxml_options: IndexMap::new(),
            main_statements: vec![
                Assignment::new("CL", "THETA1*exp(ECL)"),
                Assignment::new("CL", "CL*2"),
            ],
            pk_model: PkModel {
                num_compartments: 2,
                has_depot: true,
                options: IndexMap::new(),
            },
            compartment_names: vec!["GUT".into(), "CENT".into(), "PERIPH".into()],
            table_statements: vec![Assignment::new("CP", "CENT/V2")],
            capture_variables: vec!["CP".to_string()],
            simulation_settings: IndexMap::from([("delta".to_string(), 4.0)]),
            extra_sections: IndexMap::new(),
        }
    }

    #[test]
    fn test_expected_compartment_count_counts_depot() {
        let model = sample();
        assert_eq!(model.expected_compartment_count(), 3);
        assert_eq!(PkModel::default().expected_compartment_count(), 1);
    }

    #[test]
    fn test_option_value_accessors() {
        assert_eq!(OptionValue::Number(2.0).as_f64(), Some(2.0));
        assert_eq!(OptionValue::Bool(true).as_f64(), None);
        assert_eq!(OptionValue::Bool(false).as_bool(), Some(false));
        assert_eq!(OptionValue::Text("TRUE".into()).as_bool(), None);
    }

    #[test]
    fn test_main_variables_deduplicated() {
        assert_eq!(sample().main_variables(), vec!["CL"]);
    }

    #[test]
    fn test_setting_lookup() {
        let model = sample();
        assert_eq!(model.setting("delta"), Some(4.0));
        assert_eq!(model.setting("end"), None);
    }

    #[test]
    fn test_json_uses_camel_case() {
        let json = serde_json::to_value(sample()).unwrap();
        assert_eq!(json["runId"], 1005);
        assert_eq!(json["pkModel"]["numCompartments"], 2);
        assert_eq!(json["pkModel"]["hasDepot"], true);
        assert_eq!(json["simulationSettings"]["delta"], 4.0);
        assert!(json.get("extraSections").is_none());
    }

    #[test]
    fn test_option_value_untagged() {
        let values: Vec<OptionValue> = serde_json::from_str(r#"[true, 2, "x"]"#).unwrap();
        assert_eq!(
            values,
            vec![
                OptionValue::Bool(true),
                OptionValue::Number(2.0),
                OptionValue::Text("x".to_string()),
            ]
        );
        assert_eq!(OptionValue::Bool(false).to_string(), "FALSE");
    }
}
