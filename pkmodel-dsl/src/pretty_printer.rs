//! Canonical source printer for model descriptors

use crate::parser::{is_list_literal, parse_number};
use pkmodel_core::{ModelDescriptor, OptionValue, PkModel};

/// Render a descriptor as canonical model source.
///
/// Parsing the output yields an equal descriptor. Empty sections are left
/// out, except `$NMXML` which always carries `run`. A default `$PKMODEL` is
/// left out too, since an absent one parses to the same record.
pub fn to_source(model: &ModelDescriptor) -> String {
    let mut sections: Vec<String> = Vec::new();

    let mut nmxml = String::from("$NMXML\n");
    nmxml.push_str(&format!("run = {}\n", model.run_id));
    nmxml.push_str(&format!("project = {}\n", format_text(&model.project_path)));
    nmxml.push_str(&format!("root = {}\n", format_text(&model.root_name)));
    nmxml.push_str(&format!("olabels = {}\n", format_list(&model.observed_labels)));
    nmxml.push_str(&format!("slabels = {}\n", format_list(&model.error_labels)));
    for (key, value) in &model.nmxml_options {
        nmxml.push_str(&format!("{} = {}\n", key, format_value(value)));
    }
    sections.push(nmxml);

    if !model.main_statements.is_empty() {
        sections.push(format_statements("$MAIN", &model.main_statements));
    }

    let pk = &model.pk_model;
    if *pk != PkModel::default() {
        let mut pkmodel = format!(
            "$PKMODEL ncmt={}, depot={}",
            pk.num_compartments,
            format_value(&OptionValue::Bool(pk.has_depot))
        );
        for (key, value) in &pk.options {
            pkmodel.push_str(&format!(", {}={}", key, format_value(value)));
        }
        pkmodel.push('\n');
        sections.push(pkmodel);
    }

    if !model.compartment_names.is_empty() {
        sections.push(format!("$CMT {}\n", model.compartment_names.join(" ")));
    }

    if !model.table_statements.is_empty() {
        sections.push(format_statements("$TABLE", &model.table_statements));
    }

    if !model.capture_variables.is_empty() {
        sections.push(format!("$CAPTURE {}\n", model.capture_variables.join(" ")));
    }

    if !model.simulation_settings.is_empty() {
        let pairs: Vec<String> = model
            .simulation_settings
            .iter()
            .map(|(key, value)| format!("{}={}", key, value))
            .collect();
        sections.push(format!("$SET {}\n", pairs.join(", ")));
    }

    for (name, body) in &model.extra_sections {
        if body.is_empty() {
            sections.push(format!("${}\n", name));
        } else {
            sections.push(format!("${}\n{}\n", name, body));
        }
    }

    sections.join("\n")
}

fn format_statements(header: &str, statements: &[pkmodel_core::Assignment]) -> String {
    let mut out = format!("{}\n", header);
    for stmt in statements {
        out.push_str(&format!("double {} = {};\n", stmt.name, stmt.expression));
    }
    out
}

fn format_list(items: &[String]) -> String {
    let quoted: Vec<String> = items
        .iter()
        .map(|item| format!("\"{}\"", escape_string(item)))
        .collect();
    format!("c({})", quoted.join(", "))
}

fn format_value(value: &OptionValue) -> String {
    match value {
        OptionValue::Text(s) => format_text(s),
        other => other.to_string(),
    }
}

/// Bare text when it reads back as the same text, quoted otherwise.
fn format_text(s: &str) -> String {
    if needs_quotes(s) {
        format!("\"{}\"", escape_string(s))
    } else {
        s.to_string()
    }
}

fn needs_quotes(s: &str) -> bool {
    s.is_empty()
        || s.trim() != s
        || s.contains("//")
        || s.contains("/*")
        || s.contains(|c: char| matches!(c, '"' | ',' | ';') || c.is_control())
        || matches!(s, "TRUE" | "FALSE")
        || parse_number(s).is_some()
        || is_list_literal(s)
}

pub(crate) fn escape_string(s: &str) -> String {
    s.replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n")
        .replace('\t', "\\t")
        .replace('\r', "\\r")
}

#[cfg(test)]
mod tests {
    use super::*;
    use indexmap::IndexMap;
    use pkmodel_core::Assignment;

    fn model() -> ModelDescriptor {
        ModelDescriptor {
            run_id: 1005,
            project_path: "path".to_string(),
            root_name: "cppfile".to_string(),
            observed_labels: vec!["ECL".to_string()],
            error_labels: vec![],
            nmxml_options: IndexMap::new(),
            main_statements: vec![Assignment::new("CL", "THETA1*exp(ECL)")],
            pk_model: PkModel::default(),
            compartment_names: vec!["CENT".to_string()],
            table_statements: vec![],
            capture_variables: vec![],
            simulation_settings: IndexMap::from([("end".to_string(), 96.0), ("delta".to_string(), 0.5)]),
            extra_sections: IndexMap::new(),
        }
    }

    #[test]
    fn test_to_source_layout() {
        let source = to_source(&model());
        assert_eq!(
            source,
            "$NMXML\nrun = 1005\nproject = path\nroot = cppfile\nolabels = c(\"ECL\")\nslabels = c()\n\n\
             $MAIN\ndouble CL = THETA1*exp(ECL);\n\n\
             $CMT CENT\n\n\
             $SET end=96, delta=0.5\n"
        );
    }

    #[test]
    fn test_ambiguous_text_is_quoted() {
        assert_eq!(format_text("path"), "path");
        assert_eq!(format_text("/data/runs"), "/data/runs");
        assert_eq!(format_text(""), "\"\"");
        assert_eq!(format_text("42"), "\"42\"");
        assert_eq!(format_text("TRUE"), "\"TRUE\"");
        assert_eq!(format_text("a, b"), "\"a, b\"");
        assert_eq!(format_text("c(x)"), "\"c(x)\"");
        assert_eq!(format_text(" padded"), "\" padded\"");
        assert_eq!(format_text("http://host"), "\"http://host\"");
        assert_eq!(format_text("a/*b*/"), "\"a/*b*/\"");
        assert_eq!(format_text("say \"hi\""), "\"say \\\"hi\\\"\"");
    }

    #[test]
    fn test_options_and_extra_sections() {
        let mut m = model();
        m.nmxml_options.insert("omega".into(), OptionValue::Bool(true));
        m.pk_model.options.insert("trans".into(), OptionValue::Number(11.0));
        m.extra_sections.insert("ODE".into(), "dxdt_CENT = -CL/V*CENT;".into());
        m.extra_sections.insert("ENV".into(), String::new());

        let source = to_source(&m);
        assert!(source.contains("omega = TRUE\n"));
        assert!(source.contains("$PKMODEL ncmt=1, depot=FALSE, trans=11\n"));
        assert!(source.ends_with("$ODE\ndxdt_CENT = -CL/V*CENT;\n\n$ENV\n"));
    }
}
