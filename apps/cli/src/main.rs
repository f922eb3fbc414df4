mod config;
mod logging;

use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::{Context as AnyhowContext, Result};
use clap::{ArgAction, Parser, Subcommand};
use serde_json::Value;
use zunder_ccda::CcdaParser;
use zunder_datetime::{hl7_to_fhir_dtm, Hl7Precision};
use zunder_hl7v2::{normalize_line_endings, Hl7v2Parser};
use zunder_normalize::normalize_fhir;

use crate::config::Config;

#[derive(Parser)]
#[command(
    name = "tlq",
    about = "Command line interface for HL7v2, C-CDA and FHIR JSON conversion helpers",
    version,
    arg_required_else_help = true
)]
struct Cli {
    /// Configuration file (defaults to ./tlq.toml when present).
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse an HL7v2 message into its segment tree.
    Hl7v2 {
        /// Path to the message (or "-" for stdin). LF and CRLF line endings are accepted.
        input: PathBuf,
        /// Output file path (stdout if omitted).
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Pretty-print JSON output.
        #[arg(short, long, action = ArgAction::SetTrue)]
        pretty: bool,
    },

    /// Convert a C-CDA (or any XML) document into its JSON tree.
    Ccda {
        /// Path to the document (or "-" for stdin).
        input: PathBuf,
        /// Output file path (stdout if omitted).
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Pretty-print JSON output.
        #[arg(short, long, action = ArgAction::SetTrue)]
        pretty: bool,
        /// Replace section narratives with their original markup.
        #[arg(long, action = ArgAction::SetTrue)]
        narrative: bool,
    },

    /// Normalize rendered FHIR JSON: prune empty values and merge duplicate bundle entries.
    Normalize {
        /// Path to the JSON (or "-" for stdin). JSON5 syntax is accepted.
        input: PathBuf,
        /// Output file path (stdout if omitted).
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Pretty-print JSON output.
        #[arg(short, long, action = ArgAction::SetTrue)]
        pretty: bool,
        /// Keep null and empty values.
        #[arg(long, action = ArgAction::SetTrue)]
        keep_empty: bool,
        /// Fold extension-only continuation entries into the preceding entry.
        #[arg(long, action = ArgAction::SetTrue)]
        merge_extensions: bool,
    },

    /// Convert an HL7 DTM value to a FHIR dateTime.
    Dtm {
        /// HL7 DTM, e.g. 20240210063557.920+0100
        value: String,
        /// Maximum precision (year, month, day, hour, minute, second, millisecond).
        #[arg(short = 'P', long)]
        precision: Option<Hl7Precision>,
    },

    /// Print CLI version.
    Version,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = Config::load(cli.config.as_deref()).context("Failed to load configuration")?;
    config
        .validate()
        .map_err(|e| anyhow::anyhow!("Invalid configuration: {e}"))?;
    logging::init_logging(&config.logging).context("Failed to initialize logging")?;

    match cli.command {
        Commands::Version => {
            println!("{}", env!("CARGO_PKG_VERSION"));
        }
        Commands::Hl7v2 {
            input,
            output,
            pretty,
        } => {
            let value = run_hl7v2(&read_input(&input)?, &config)?;
            write_json_output(&value, output.as_deref(), pretty)?;
        }
        Commands::Ccda {
            input,
            output,
            pretty,
            narrative,
        } => {
            let value = run_ccda(&read_input(&input)?, narrative, &config)?;
            write_json_output(&value, output.as_deref(), pretty)?;
        }
        Commands::Normalize {
            input,
            output,
            pretty,
            keep_empty,
            merge_extensions,
        } => {
            let value = run_normalize(&read_input(&input)?, keep_empty, merge_extensions, &config)?;
            write_json_output(&value, output.as_deref(), pretty)?;
        }
        Commands::Dtm { value, precision } => {
            let converted = hl7_to_fhir_dtm(&value, precision)
                .with_context(|| format!("Failed to convert DTM '{value}'"))?;
            println!("{converted}");
        }
    }

    Ok(())
}

fn run_hl7v2(text: &str, config: &Config) -> Result<Value> {
    let parser = Hl7v2Parser::from_options(&config.hl7v2);
    let message = parser
        .parse(&normalize_line_endings(text))
        .context("Failed to parse HL7v2 message")?;
    tracing::info!(segments = message.segments.len(), "parsed HL7v2 message");
    Ok(message.to_json())
}

fn run_ccda(text: &str, narrative: bool, config: &Config) -> Result<Value> {
    let mut options = config.ccda.clone();
    options.render_narrative |= narrative;
    let parsed = CcdaParser::new(options)
        .parse(text)
        .context("Failed to parse XML document")?;
    Ok(Value::Object(parsed))
}

fn run_normalize(
    text: &str,
    keep_empty: bool,
    merge_extensions: bool,
    config: &Config,
) -> Result<Value> {
    let mut options = config.normalize;
    if keep_empty {
        options.ignore_empty_fields = false;
    }
    options.merge_extension_entries |= merge_extensions;
    normalize_fhir(text, &options).context("Failed to normalize FHIR JSON")
}

fn read_input(path: &Path) -> Result<String> {
    if path.to_string_lossy() == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("Failed to read input from stdin")?;
        Ok(buf)
    } else {
        fs::read_to_string(path)
            .with_context(|| format!("Failed to read input file '{}'", path.display()))
    }
}

fn write_json_output(value: &Value, output: Option<&Path>, pretty: bool) -> Result<()> {
    let content = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    if let Some(output_path) = output {
        fs::write(output_path, content)
            .with_context(|| format!("Failed to write to {:?}", output_path))?;
        tracing::info!(path = %output_path.display(), "wrote output");
    } else {
        println!("{content}");
    }
    Ok(())
}
