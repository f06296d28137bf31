//! Export envelope handed to the simulation engine

use crate::config::ExportFormat;
use crate::error::CliResult;
use pkmodel_core::ModelDescriptor;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::Path;

/// A descriptor plus the identity of the source it came from.
///
/// The engine compares `source_sha256` against the file it was pointed at to
/// detect a model edited after export.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportEnvelope {
    pub source: String,
    pub source_sha256: String,
    pub descriptor: ModelDescriptor,
}

impl ExportEnvelope {
    pub fn new(path: &Path, source_text: &str, descriptor: ModelDescriptor) -> Self {
        Self {
            source: path.display().to_string(),
            source_sha256: sha256_hex(source_text),
            descriptor,
        }
    }

    /// Serialize in `format`. `pretty` only affects JSON.
    pub fn render(&self, format: ExportFormat, pretty: bool) -> CliResult<String> {
        let mut out = match format {
            ExportFormat::Json if pretty => serde_json::to_string_pretty(self)?,
            ExportFormat::Json => serde_json::to_string(self)?,
            ExportFormat::Yaml => serde_yaml::to_string(self)?,
        };
        if !out.ends_with('\n') {
            out.push('\n');
        }
        Ok(out)
    }
}

pub fn sha256_hex(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    let result = hasher.finalize();
    hex::encode(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pkmodel_test_utils::fixtures::{example_descriptor, EXAMPLE_MODEL};

    #[test]
    fn test_sha256_hex_known_value() {
        assert_eq!(
            sha256_hex(""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn test_envelope_json_shape() {
        let envelope = ExportEnvelope::new(Path::new("model.cpp"), EXAMPLE_MODEL, example_descriptor());
        let json: serde_json::Value =
            serde_json::from_str(&envelope.render(ExportFormat::Json, false).unwrap()).unwrap();
        assert_eq!(json["source"], "model.cpp");
        assert_eq!(json["sourceSha256"].as_str().map(str::len), Some(64));
        assert_eq!(json["descriptor"]["runId"], 1005);
    }

    #[test]
    fn test_envelope_yaml_round_trip() {
        let envelope = ExportEnvelope::new(Path::new("model.cpp"), EXAMPLE_MODEL, example_descriptor());
        let yaml = envelope.render(ExportFormat::Yaml, true).unwrap();
        assert!(yaml.contains("sourceSha256:"));
        let back: ExportEnvelope = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(back, envelope);
    }
}
