use clap::{Parser, Subcommand};
use pkmodel_cli::{commands, init_logging, CliConfig, CliResult, ExportFormat, CONFIG_ENV};
use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "pkmodel")]
#[command(version, about = "Check, export and format PK model files")]
struct Cli {
    /// TOML config file
    #[arg(long, global = true, env = CONFIG_ENV)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse and validate model files, reporting every diagnostic
    Check {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// Emit the descriptor wrapped in an export envelope
    Export {
        file: PathBuf,

        /// Output format (defaults to `output.format` from the config)
        #[arg(short, long, value_enum)]
        format: Option<ExportFormat>,

        /// Write to this path instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Print the canonical source of a model file
    Fmt {
        file: PathBuf,

        /// Exit 1 when the file is not already canonical
        #[arg(long)]
        check: bool,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {}", err);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> CliResult<ExitCode> {
    let config = CliConfig::load(cli.config.as_deref())?;
    init_logging(&config.logging)?;

    match cli.command {
        Commands::Check { files } => {
            let stdout = std::io::stdout();
            let passed = commands::check(&files, &config, &mut stdout.lock())?;
            Ok(exit_code(passed))
        }
        Commands::Export {
            file,
            format,
            output,
        } => {
            let format = format.unwrap_or(config.output.format);
            let rendered = commands::export(&file, format, &config)?;
            match output {
                Some(path) => commands::write_output(&path, &rendered)?,
                None => print_stdout(&rendered),
            }
            Ok(ExitCode::SUCCESS)
        }
        Commands::Fmt { file, check } => {
            let outcome = commands::fmt(&file, &config)?;
            if check {
                if !outcome.is_canonical() {
                    eprintln!("{} is not in canonical form", file.display());
                }
                return Ok(exit_code(outcome.is_canonical()));
            }
            print_stdout(outcome.source());
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn print_stdout(text: &str) {
    let mut stdout = std::io::stdout().lock();
    // A closed pipe is not worth a second error message.
    let _ = stdout.write_all(text.as_bytes());
}

fn exit_code(passed: bool) -> ExitCode {
    if passed {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
