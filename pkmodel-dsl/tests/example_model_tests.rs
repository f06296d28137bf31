//! End-to-end tests over the two-compartment example model

use pkmodel_dsl::{parse, parse_with, round_trip, to_source, OptionValue, ParseOptions};
use pkmodel_test_utils::fixtures::*;

#[test]
fn test_example_model_fields() {
    let model = parse(EXAMPLE_MODEL).unwrap();

    assert_eq!(model.run_id, 1005);
    assert_eq!(model.project_path, "path");
    assert_eq!(model.root_name, "cppfile");
    assert_eq!(model.observed_labels, vec!["ECL", "EVC", "EKA"]);
    assert_eq!(model.error_labels, vec!["PROP", "ADD"]);
    assert_eq!(model.pk_model.num_compartments, 2);
    assert!(model.pk_model.has_depot);
    assert_eq!(model.compartment_names, vec!["GUT", "CENT", "PERIPH"]);
    assert_eq!(model.capture_variables, vec!["CP"]);
    assert_eq!(model.setting("delta"), Some(4.0));
    assert_eq!(model.setting("end"), Some(96.0));
    assert_eq!(model.main_variables(), vec!["CL", "V2", "KA", "Q", "V3"]);
    assert_eq!(model.table_statements[0].expression, "(CENT/V2)*(1+PROP) + ADD/5");
}

#[test]
fn test_example_model_matches_fixture() {
    assert_eq!(parse(EXAMPLE_MODEL).unwrap(), example_descriptor());
}

#[test]
fn test_example_model_json_shape() {
    let json = serde_json::to_value(parse(EXAMPLE_MODEL).unwrap()).unwrap();
    assert_eq!(json["runId"], 1005);
    assert_eq!(json["observedLabels"], serde_json::json!(["ECL", "EVC", "EKA"]));
    assert_eq!(json["errorLabels"], serde_json::json!(["PROP", "ADD"]));
    assert_eq!(json["pkModel"]["numCompartments"], 2);
    assert_eq!(json["pkModel"]["hasDepot"], true);
    assert_eq!(json["compartmentNames"], serde_json::json!(["GUT", "CENT", "PERIPH"]));
    assert_eq!(json["captureVariables"], serde_json::json!(["CP"]));
    assert_eq!(json["simulationSettings"], serde_json::json!({"delta": 4.0, "end": 96.0}));
}

#[test]
fn test_example_model_round_trip() {
    let canonical = round_trip(EXAMPLE_MODEL).unwrap();
    assert!(canonical.contains("$PKMODEL ncmt=2, depot=TRUE\n"));
    assert!(canonical.contains("double CP = (CENT/V2)*(1+PROP) + ADD/5;\n"));
    assert_eq!(parse(&canonical).unwrap(), example_descriptor());
    assert_eq!(round_trip(&canonical).unwrap(), canonical);
}

#[test]
fn test_minimal_model() {
    let model = parse(MINIMAL_MODEL).unwrap();
    assert_eq!(model.run_id, 1);
    assert_eq!(model.pk_model.num_compartments, 1);
    assert!(!model.pk_model.has_depot);
    assert!(model.main_statements.is_empty());
    assert!(to_source(&model).starts_with("$NMXML\nrun = 1\n"));
}

#[test]
fn test_multiline_sections_and_comments() {
    let source = r#"
# one-compartment IV model
$NMXML
run = 12 // run number
root = one
olabels = c("ECL", "EV")
slabels = c("PROP")

$MAIN
// clearance and volume
double CL = THETA1*exp(ECL); double V = THETA2*exp(EV);
double KE = CL/V;

$PKMODEL
ncmt=1,
depot=FALSE,
trans=2

$CMT
CENT

$TABLE
double CP = CENT/V;
double DV = CP*(1+PROP);

$CAPTURE CP, DV
$CAPTURE CENT

$SET delta=0.25
$SET end=24

$OMEGA @labels ECL EV
0.09 0.04
"#;
    let model = parse(source).unwrap();
    assert_eq!(model.run_id, 12);
    assert_eq!(model.root_name, "one");
    assert_eq!(model.main_variables(), vec!["CL", "V", "KE"]);
    assert_eq!(model.pk_model.options["trans"], OptionValue::Number(2.0));
    assert_eq!(model.capture_variables, vec!["CP", "DV", "CENT"]);
    assert_eq!(model.simulation_settings.len(), 2);
    assert_eq!(model.extra_sections["OMEGA"], "@labels ECL EV\n0.09 0.04");

    let reparsed = parse(&to_source(&model)).unwrap();
    assert_eq!(reparsed, model);
}

#[test]
fn test_engine_builtins_through_options() {
    let source = example_with_line(23, "$CAPTURE CP WT");
    assert!(parse(&source).is_err());

    let options = ParseOptions::with_builtins(["WT"]);
    let model = parse_with(&source, &options).unwrap();
    assert_eq!(model.capture_variables, vec!["CP", "WT"]);
}
