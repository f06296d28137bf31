//! Subcommand bodies, kept apart from argument parsing so tests can drive them.

use crate::config::{CliConfig, ExportFormat};
use crate::error::{CliError, CliResult};
use crate::export::ExportEnvelope;
use pkmodel_core::{ModelDescriptor, ModelError};
use pkmodel_dsl::{parse_with, to_source, ParseOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Outcome of `pkmodel fmt`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FmtOutcome {
    /// The file already is in canonical form.
    Canonical(String),
    /// The canonical form differs from the file.
    Changed(String),
}

impl FmtOutcome {
    pub fn source(&self) -> &str {
        match self {
            FmtOutcome::Canonical(s) | FmtOutcome::Changed(s) => s,
        }
    }

    pub fn is_canonical(&self) -> bool {
        matches!(self, FmtOutcome::Canonical(_))
    }
}

pub fn read_source(path: &Path) -> CliResult<String> {
    std::fs::read_to_string(path).map_err(|source| CliError::Read {
        path: path.to_path_buf(),
        source,
    })
}

pub fn write_output(path: &Path, contents: &str) -> CliResult<()> {
    std::fs::write(path, contents).map_err(|source| CliError::Write {
        path: path.to_path_buf(),
        source,
    })
}

fn model_error(path: &Path, source: ModelError) -> CliError {
    CliError::Model {
        path: path.to_path_buf(),
        source,
    }
}

/// Read and parse one model file.
pub fn load_model(path: &Path, options: &ParseOptions) -> CliResult<(String, ModelDescriptor)> {
    let text = read_source(path)?;
    let model = parse_with(&text, options).map_err(|e| model_error(path, e))?;
    Ok((text, model))
}

/// Validate every file, writing one report block per file to `out`.
///
/// Returns true when all files passed. A file that cannot be read counts as
/// a failure and does not stop the remaining files.
pub fn check(files: &[PathBuf], config: &CliConfig, out: &mut impl Write) -> CliResult<bool> {
    let options = config.parse_options();
    let mut failed = 0usize;

    for path in files {
        match load_model(path, &options) {
            Ok((_, model)) => {
                debug!(path = %path.display(), run_id = model.run_id, "model ok");
                writeln!(
                    out,
                    "ok: {} (run {}, {} compartments, {} captures)",
                    path.display(),
                    model.run_id,
                    model.compartment_names.len(),
                    model.capture_variables.len()
                )
                .map_err(stdout_error)?;
            }
            Err(err) => {
                failed += 1;
                write_diagnostic(&err, out).map_err(stdout_error)?;
            }
        }
    }

    info!(files = files.len(), failed, "check finished");
    Ok(failed == 0)
}

fn write_diagnostic(err: &CliError, out: &mut impl Write) -> std::io::Result<()> {
    match err {
        CliError::Model {
            path,
            source: ModelError::Validation(errors),
        } => {
            writeln!(out, "error: {}: {} validation error(s)", path.display(), errors.len())?;
            for e in errors.iter() {
                writeln!(out, "  [{}] {}", e.invariant(), e)?;
            }
            Ok(())
        }
        other => writeln!(out, "error: {}", other),
    }
}

fn stdout_error(source: std::io::Error) -> CliError {
    CliError::Write {
        path: PathBuf::from("<stdout>"),
        source,
    }
}

/// Build the rendered export envelope for one file.
pub fn export(path: &Path, format: ExportFormat, config: &CliConfig) -> CliResult<String> {
    let (text, model) = load_model(path, &config.parse_options())?;
    let envelope = ExportEnvelope::new(path, &text, model);
    envelope.render(format, config.output.pretty)
}

/// Canonical source of one file, compared against its current text.
pub fn fmt(path: &Path, config: &CliConfig) -> CliResult<FmtOutcome> {
    let (text, model) = load_model(path, &config.parse_options())?;
    let canonical = to_source(&model);
    if canonical == text {
        Ok(FmtOutcome::Canonical(canonical))
    } else {
        Ok(FmtOutcome::Changed(canonical))
    }
}
