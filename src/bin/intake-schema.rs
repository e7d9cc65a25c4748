//! Intake Schema CLI
//!
//! Command-line interface for checking APM intake payloads against the
//! intake API JSON Schemas.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};
use intake_schema::{
    load_document, process_schema, validate_intake, ComplianceError, ComplianceValidator,
    EventKind, IntakeApiRequest, SpecsConfig, Strictness, ValidationVariant,
};

#[derive(Parser)]
#[command(name = "intake-schema")]
#[command(about = "Check APM intake payloads against the intake API JSON Schemas")]
#[command(version)]
struct Cli {
    /// Log verbosity (logs go to stderr)
    #[arg(long, value_enum, default_value = "warn", global = true)]
    log_level: LogLevel,

    /// Log output format
    #[arg(long, value_enum, default_value = "text", global = true)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate one serialized record against both schema snapshots
    Validate {
        /// File containing the serialized record
        payload: PathBuf,

        /// Record type, selects the schema document
        #[arg(long, value_enum)]
        event: EventArg,

        /// Directory holding earliest_supported/ and latest_used/ snapshots
        #[arg(long, env = "INTAKE_SCHEMA_SPECS_ROOT")]
        specs_root: PathBuf,

        /// Run only one attempt of the sweep
        #[arg(long, value_enum, default_value = "all")]
        variant: VariantArg,

        /// Output results as JSON (for automation)
        #[arg(long)]
        json: bool,
    },

    /// Validate every event of a captured intake request
    Intake {
        /// Captured request (JSON with headers/body/timeReceivedAtServer)
        request: PathBuf,

        /// Treat the file as a raw NDJSON body instead of a captured request
        #[arg(long)]
        raw: bool,

        /// Directory holding earliest_supported/ and latest_used/ snapshots
        #[arg(long, env = "INTAKE_SCHEMA_SPECS_ROOT")]
        specs_root: PathBuf,
    },

    /// Print a schema with refs inlined and ref-sourced allOf flattened
    Resolve {
        /// Schema document
        schema: PathBuf,

        /// Inject additionalProperties=false (the schema used for strict checks)
        #[arg(long)]
        strict: bool,

        /// Output file (stdout if not specified)
        #[arg(long)]
        output: Option<PathBuf>,

        /// Pretty-print JSON output
        #[arg(long)]
        pretty: bool,
    },
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum EventArg {
    Metadata,
    Transaction,
    Span,
}

impl From<EventArg> for EventKind {
    fn from(arg: EventArg) -> Self {
        match arg {
            EventArg::Metadata => EventKind::Metadata,
            EventArg::Transaction => EventKind::Transaction,
            EventArg::Span => EventKind::Span,
        }
    }
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum VariantArg {
    All,
    Earliest,
    Latest,
    LatestStrict,
}

impl VariantArg {
    fn variant(self) -> Option<ValidationVariant> {
        match self {
            VariantArg::All => None,
            VariantArg::Earliest => Some(ValidationVariant::EARLIEST_PERMISSIVE),
            VariantArg::Latest => Some(ValidationVariant::LATEST_PERMISSIVE),
            VariantArg::LatestStrict => Some(ValidationVariant::LATEST_STRICT),
        }
    }
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    fn as_filter(self) -> tracing::level_filters::LevelFilter {
        match self {
            LogLevel::Error => tracing::level_filters::LevelFilter::ERROR,
            LogLevel::Warn => tracing::level_filters::LevelFilter::WARN,
            LogLevel::Info => tracing::level_filters::LevelFilter::INFO,
            LogLevel::Debug => tracing::level_filters::LevelFilter::DEBUG,
            LogLevel::Trace => tracing::level_filters::LevelFilter::TRACE,
        }
    }
}

fn init_logging(format: LogFormat, level: LogLevel) {
    let builder = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(level.as_filter())
        .with_ansi(false)
        .with_target(false);

    match format {
        LogFormat::Text => {
            let _ = builder.try_init();
        }
        LogFormat::Json => {
            let _ = builder.json().try_init();
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.log_format, cli.log_level);

    let result = match cli.command {
        Commands::Validate {
            payload,
            event,
            specs_root,
            variant,
            json,
        } => run_validate(payload, event.into(), specs_root, variant.variant(), json),

        Commands::Intake {
            request,
            raw,
            specs_root,
        } => run_intake(request, raw, specs_root),

        Commands::Resolve {
            schema,
            strict,
            output,
            pretty,
        } => run_resolve(schema, strict, output, pretty),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(code) => ExitCode::from(code),
    }
}

fn run_validate(
    payload_path: PathBuf,
    kind: EventKind,
    specs_root: PathBuf,
    variant: Option<ValidationVariant>,
    json_output: bool,
) -> Result<(), u8> {
    let payload = std::fs::read_to_string(&payload_path).map_err(|e| {
        report_error(
            json_output,
            &format!("cannot read {}: {}", payload_path.display(), e),
        );
        3u8
    })?;

    let validator = ComplianceValidator::new(SpecsConfig::new(specs_root));
    let result = match variant {
        Some(variant) => validator.validate_variant(&payload, kind.schema_path(), variant),
        None => validator.validate_event(kind, &payload),
    };

    match result {
        Ok(()) => {
            if json_output {
                println!(r#"{{"valid":true}}"#);
            } else {
                println!("Valid");
            }
            Ok(())
        }
        Err(ComplianceError::Invalid { variant, report }) => {
            if json_output {
                let output = serde_json::json!({
                    "valid": false,
                    "variant": variant.to_string(),
                    "errors": report.errors()
                });
                println!("{}", output);
            } else {
                eprintln!("Validation failed ({}):", variant);
                eprintln!("{}", report);
            }
            Err(1)
        }
        Err(e) => {
            report_error(json_output, &e.to_string());
            Err(e.exit_code() as u8)
        }
    }
}

fn run_intake(request_path: PathBuf, raw: bool, specs_root: PathBuf) -> Result<(), u8> {
    let content = std::fs::read_to_string(&request_path).map_err(|e| {
        eprintln!("Error: cannot read {}: {}", request_path.display(), e);
        3u8
    })?;

    let request = if raw {
        IntakeApiRequest::from_body(content)
    } else {
        IntakeApiRequest::from_json(&content).map_err(|e| {
            eprintln!("Error: {}", e);
            e.exit_code() as u8
        })?
    };

    let validator = ComplianceValidator::new(SpecsConfig::new(specs_root));
    match validate_intake(&validator, &request) {
        Ok(count) => {
            println!("Valid ({} events)", count);
            Ok(())
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            Err(e.exit_code() as u8)
        }
    }
}

fn run_resolve(
    schema_path: PathBuf,
    strict: bool,
    output: Option<PathBuf>,
    pretty: bool,
) -> Result<(), u8> {
    let schema = load_document(&schema_path).map_err(|e| {
        eprintln!("Error: {}", e);
        e.exit_code() as u8
    })?;

    let strictness = if strict {
        Strictness::Strict
    } else {
        Strictness::Permissive
    };
    let processed = process_schema(schema, strictness).map_err(|e| {
        eprintln!("Error: {}", e);
        2u8
    })?;

    let json_output = if pretty {
        serde_json::to_string_pretty(&processed)
    } else {
        serde_json::to_string(&processed)
    }
    .map_err(|e| {
        eprintln!("Error serializing output: {}", e);
        2u8
    })?;

    match output {
        Some(path) => {
            std::fs::write(&path, &json_output).map_err(|e| {
                eprintln!("Error writing to {}: {}", path.display(), e);
                3u8
            })?;
        }
        None => {
            println!("{}", json_output);
        }
    }

    Ok(())
}

/// Output an error message in plain text or JSON format.
fn report_error(json_output: bool, msg: &str) {
    if json_output {
        println!("{}", serde_json::json!({ "valid": false, "error": msg }));
    } else {
        eprintln!("Error: {}", msg);
    }
}
