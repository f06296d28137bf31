//! Property-Based Tests for Model Source Round-Trip
//!
//! Property: For any valid descriptor, printing → parsing SHALL produce an
//! equal descriptor, and printing the result again SHALL produce the same text.
//!
//! This validates:
//! - Canonical printer quotes everything the parser would misread
//! - Parser preserves source order of every sequence
//! - Generated descriptors pass validation

use pkmodel_dsl::{parse, to_source, ModelDescriptor};
use pkmodel_test_utils::generators::*;
use proptest::prelude::*;

fn reparse(model: &ModelDescriptor) -> Result<ModelDescriptor, TestCaseError> {
    let source = to_source(model);
    parse(&source).map_err(|e| TestCaseError::fail(format!("{}\n--- source ---\n{}", e, source)))
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    #[test]
    fn prop_print_then_parse_is_identity(model in arb_model_descriptor()) {
        let parsed = reparse(&model)?;
        prop_assert_eq!(parsed, model);
    }

    #[test]
    fn prop_printer_is_deterministic(model in arb_model_descriptor()) {
        let first = to_source(&model);
        let second = to_source(&reparse(&model)?);
        prop_assert_eq!(first, second);
    }

    #[test]
    fn prop_text_values_survive(text in arb_text()) {
        let mut model = reparse(&ModelDescriptor {
            project_path: text.clone(),
            ..parse(pkmodel_test_utils::fixtures::MINIMAL_MODEL)
                .map_err(|e| TestCaseError::fail(e.to_string()))?
        })?;
        prop_assert_eq!(&model.project_path, &text);
        model.root_name = text.clone();
        prop_assert_eq!(reparse(&model)?.root_name, text);
    }
}
