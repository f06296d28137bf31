//! pkmodel Test Utilities
//!
//! Shared test infrastructure for the workspace:
//! - Proptest generators for valid model descriptors
//! - Model source fixtures
//! - Assertions over validation errors

pub use pkmodel_core::{
    Assignment, LabelKind, ModelDescriptor, ModelError, OptionValue, PkModel, SectionKind,
    SyntaxError, ValidationError, ValidationErrors,
};

use indexmap::IndexMap;

// ============================================================================
// PROPTEST GENERATORS
// ============================================================================

pub mod generators {
    //! Proptest strategies for descriptors that pass validation.
    //!
    //! Every generated name carries a prefix per role (`ETA_`, `EPS_`, `C_`,
    //! `P_`, `Y_`) so labels, compartments and variables never collide with
    //! each other or with built-ins.

    use super::*;
    use proptest::prelude::*;

    /// Free-form text, including characters the printer has to quote.
    pub fn arb_text() -> impl Strategy<Value = String> {
        "[A-Za-z0-9_/.,\" -]{0,12}"
    }

    /// Generate an OptionValue of any kind.
    pub fn arb_option_value() -> impl Strategy<Value = OptionValue> {
        prop_oneof![
            any::<bool>().prop_map(OptionValue::Bool),
            (-1.0e6f64..1.0e6).prop_map(OptionValue::Number),
            arb_text().prop_map(OptionValue::Text),
        ]
    }

    /// Generate a `$PKMODEL` record.
    pub fn arb_pk_model() -> impl Strategy<Value = PkModel> {
        (
            1u32..=2,
            any::<bool>(),
            prop::collection::btree_map("k_[a-z]{1,4}", arb_option_value(), 0..3),
        )
            .prop_map(|(num_compartments, has_depot, options)| PkModel {
                num_compartments,
                has_depot,
                options: options.into_iter().collect(),
            })
    }

    /// Generate `$SET` settings.
    pub fn arb_settings() -> impl Strategy<Value = IndexMap<String, f64>> {
        prop::collection::btree_map("[a-z][a-z_]{0,6}", -1.0e6f64..1.0e6, 0..4)
            .prop_map(|settings| settings.into_iter().collect())
    }

    /// Generate unrecognized sections with non-blank, lowercase bodies.
    pub fn arb_extra_sections() -> impl Strategy<Value = IndexMap<String, String>> {
        let body = prop::collection::vec("[a-z][a-z_ =*+;0-9]{0,20}", 0..4)
            .prop_map(|lines| lines.join("\n"));
        prop::collection::btree_map("X[A-Z]{1,5}", body, 0..3)
            .prop_map(|sections| sections.into_iter().collect())
    }

    /// Generate a descriptor that parses back to itself.
    pub fn arb_model_descriptor() -> impl Strategy<Value = ModelDescriptor> {
        arb_pk_model()
            .prop_flat_map(|pk| {
                let compartments = prop::collection::btree_set(
                    "C_[A-Z]{1,4}",
                    pk.expected_compartment_count(),
                );
                (
                    (Just(pk), compartments, any::<u32>(), arb_text(), arb_text()),
                    (
                        prop::collection::btree_set("ETA_[A-Z0-9]{1,4}", 0..4),
                        prop::collection::btree_set("EPS_[A-Z0-9]{1,4}", 0..3),
                        prop::collection::btree_map("opt_[a-z]{1,4}", arb_option_value(), 0..3),
                    ),
                    (
                        prop::collection::btree_set("P_[A-Z0-9]{1,4}", 0..6),
                        prop::collection::btree_set("Y_[A-Z0-9]{1,4}", 0..4),
                        prop::collection::vec(any::<usize>(), 20),
                        any::<bool>(),
                    ),
                    (arb_settings(), arb_extra_sections()),
                )
            })
            .prop_map(
                |(
                    (pk_model, compartments, run_id, project_path, root_name),
                    (observed, errors, nmxml_options),
                    (main_names, table_names, picks, capture_time),
                    (simulation_settings, extra_sections),
                )| {
                    let observed_labels: Vec<String> = observed.into_iter().collect();
                    let error_labels: Vec<String> = errors.into_iter().collect();
                    let compartment_names: Vec<String> = compartments.into_iter().collect();
                    let main_names: Vec<String> = main_names.into_iter().collect();
                    let table_names: Vec<String> = table_names.into_iter().collect();
                    let mut picks = picks.into_iter().cycle();
                    let mut pick = |pool: &[String]| match picks.next() {
                        Some(i) if !pool.is_empty() => pool[i % pool.len()].clone(),
                        _ => "1".to_string(),
                    };

                    let mut main_statements = Vec::new();
                    for (i, name) in main_names.iter().enumerate() {
                        let mut pool: Vec<String> = observed_labels.clone();
                        pool.extend(main_names[..i].iter().cloned());
                        pool.extend(compartment_names.iter().cloned());
                        let expression = format!("THETA{}*exp({})", i + 1, pick(&pool));
                        main_statements.push(Assignment::new(name.clone(), expression));
                    }

                    let mut table_statements = Vec::new();
                    for (i, name) in table_names.iter().enumerate() {
                        let mut pool: Vec<String> = main_names.clone();
                        pool.extend(compartment_names.iter().cloned());
                        pool.extend(observed_labels.iter().cloned());
                        pool.extend(table_names[..i].iter().cloned());
                        let mut errors = error_labels.clone();
                        errors.extend(pool.iter().cloned());
                        let expression = format!("{} * (1 + {})", pick(&pool), pick(&errors));
                        table_statements.push(Assignment::new(name.clone(), expression));
                    }

                    let mut capture_variables = table_names.clone();
                    if capture_time {
                        capture_variables.push("TIME".to_string());
                    }

                    ModelDescriptor {
                        run_id,
                        project_path,
                        root_name,
                        observed_labels,
                        error_labels,
                        nmxml_options: nmxml_options.into_iter().collect(),
                        main_statements,
                        pk_model,
                        compartment_names,
                        table_statements,
                        capture_variables,
                        simulation_settings,
                        extra_sections,
                    }
                },
            )
    }
}

// ============================================================================
// FIXTURES
// ============================================================================

pub mod fixtures {
    //! Model sources and the descriptors they should produce.

    use super::*;

    /// Two-compartment model with first-order absorption.
    pub const EXAMPLE_MODEL: &str = r#"$NMXML
run = 1005
project = path
root = "cppfile"

olabels = c("ECL", "EVC", "EKA")
slabels = c("PROP", "ADD")

$MAIN
double CL = THETA1*exp(ECL);
double V2 = THETA2*exp(EVC);
double KA = THETA3*exp(EKA);
double Q = THETA4;
double V3 = THETA5;

$PKMODEL ncmt=2, depot=TRUE

$CMT GUT CENT PERIPH

$TABLE
double CP = (CENT/V2)*(1+PROP) + ADD/5;

$CAPTURE CP

$SET delta=4, end=96
"#;

    /// Smallest model that passes validation.
    pub const MINIMAL_MODEL: &str = "$NMXML\nrun = 1\n\n$CMT CENT\n";

    /// The descriptor `EXAMPLE_MODEL` parses to.
    pub fn example_descriptor() -> ModelDescriptor {
        let labels = |names: &[&str]| names.iter().map(|s| s.to_string()).collect::<Vec<_>>();
        ModelDescriptor {
            run_id: 1005,
            project_path: "path".to_string(),
            root_name: "cppfile".to_string(),
            observed_labels: labels(&["ECL", "EVC", "EKA"]),
            error_labels: labels(&["PROP", "ADD"]),
            nmxml_options: IndexMap::new(),
            main_statements: vec![
                Assignment::new("CL", "THETA1*exp(ECL)"),
                Assignment::new("V2", "THETA2*exp(EVC)"),
                Assignment::new("KA", "THETA3*exp(EKA)"),
                Assignment::new("Q", "THETA4"),
                Assignment::new("V3", "THETA5"),
            ],
            pk_model: PkModel {
                num_compartments: 2,
                has_depot: true,
                options: IndexMap::new(),
            },
            compartment_names: labels(&["GUT", "CENT", "PERIPH"]),
            table_statements: vec![Assignment::new("CP", "(CENT/V2)*(1+PROP) + ADD/5")],
            capture_variables: labels(&["CP"]),
            simulation_settings: IndexMap::from([("delta".to_string(), 4.0), ("end".to_string(), 96.0)]),
            extra_sections: IndexMap::new(),
        }
    }

    /// `EXAMPLE_MODEL` with one line replaced (1-based line number).
    pub fn example_with_line(line: usize, replacement: &str) -> String {
        EXAMPLE_MODEL
            .lines()
            .enumerate()
            .map(|(i, l)| if i + 1 == line { replacement } else { l })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

// ============================================================================
// ASSERTIONS
// ============================================================================

pub mod assertions {
    //! Assertions over parse failures.

    use super::*;

    /// Unwrap the validation errors of a failed parse.
    pub fn expect_validation_errors<T: std::fmt::Debug>(
        result: Result<T, ModelError>,
    ) -> ValidationErrors {
        match result {
            Err(ModelError::Validation(errors)) => errors,
            other => panic!("expected validation errors, got {:?}", other),
        }
    }

    /// Unwrap the syntax error of a failed parse.
    pub fn expect_syntax_error<T: std::fmt::Debug>(result: Result<T, ModelError>) -> SyntaxError {
        match result {
            Err(ModelError::Syntax(err)) => err,
            other => panic!("expected a syntax error, got {:?}", other),
        }
    }

    /// Assert some error violates `invariant` for `name`.
    pub fn assert_violation(errors: &ValidationErrors, invariant: &str, name: &str) {
        assert!(
            errors
                .iter()
                .any(|e| e.invariant() == invariant && e.identifier() == Some(name)),
            "expected a `{}` violation for `{}`, got:\n{}",
            invariant,
            name,
            errors
        );
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::generators::*;
    use proptest::prelude::*;

    #[test]
    fn test_example_with_line() {
        let edited = example_with_line(9, "MAIN");
        assert_eq!(edited.lines().nth(8), Some("MAIN"));
        assert_eq!(edited.lines().count(), EXAMPLE_MODEL.lines().count());
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(50))]

        #[test]
        fn prop_generated_compartments_match_pk_model(model in arb_model_descriptor()) {
            prop_assert_eq!(model.compartment_names.len(), model.expected_compartment_count());
            prop_assert!(model.capture_variables.iter().all(|c| c == "TIME" || c.starts_with("Y_")));
        }
    }
}
