//! objmatch - Kubernetes object drift detection CLI tool
//!
//! Compares desired and live objects read from YAML/JSON files.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::str::FromStr;

use clap::{ArgAction, Parser, Subcommand};
use k8s_objectmatcher::patch::ignore_field;
use k8s_objectmatcher::{prune, value, Config, ResourceObject, Value};
use tracing::{debug, info};

#[derive(Parser, Debug)]
#[command(name = "objmatch", version, about = "Kubernetes object drift detection")]
struct Cli {
    /// Configuration file
    #[arg(short = 'c', long = "config", global = true)]
    config: Option<PathBuf>,

    /// Log every calculation step
    #[arg(short = 'v', long = "verbose", action = ArgAction::SetTrue, global = true)]
    verbose: bool,

    /// Output location. Use '-' for stdout
    #[arg(short = 'o', long = "output", global = true, default_value = "-")]
    output: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print the patch turning the current object into the desired one
    Calculate {
        #[arg(long = "current")]
        current: PathBuf,
        #[arg(long = "desired")]
        desired: PathBuf,
        /// Compare status fields too
        #[arg(long = "no-ignore-status", action = ArgAction::SetTrue)]
        no_ignore_status: bool,
        /// Dotted field path to leave out of the comparison
        #[arg(long = "ignore-field")]
        ignore_field: Vec<String>,
    },
    /// Run the matcher of the object kind
    Match {
        #[arg(long = "current")]
        current: PathBuf,
        #[arg(long = "desired")]
        desired: PathBuf,
    },
    /// Print an object with unset fields removed
    Prune { file: PathBuf },
    /// Print an object with its last applied annotation set
    Annotate { file: PathBuf },
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let env = std::env::var("OBJMATCH_LOG").unwrap_or_else(|_| default.to_string());
    let filter = tracing_subscriber::EnvFilter::from_str(&env)
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(1),
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::from(2)
        }
    }
}

/// Runs the command; returns false when drift was found.
fn run(cli: Cli) -> Result<bool, Box<dyn std::error::Error>> {
    let config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };
    debug!(?config, "loaded configuration");

    let mut output: Box<dyn Write> = if cli.output == "-" {
        Box::new(io::stdout())
    } else {
        Box::new(
            fs::File::create(&cli.output)
                .map_err(|e| format!("Failed to create output file {:?}: {}", cli.output, e))?,
        )
    };

    match cli.command {
        Commands::Calculate {
            current,
            desired,
            no_ignore_status,
            ignore_field: fields,
        } => {
            let mut config = config;
            if no_ignore_status {
                config.ignore.status = false;
            }
            let mut opts = config.options();
            opts.extend(fields.into_iter().map(|f| ignore_field(f)));

            let result = config
                .patch_maker()
                .calculate(&read_object(&current)?, &read_object(&desired)?, &opts)?;
            writeln!(output, "{}", result.patch_str())?;
            info!(empty = result.is_empty(), "patch calculated");
            Ok(result.is_empty())
        }
        Commands::Match { current, desired } => {
            let matched = config
                .object_matcher()
                .match_objects(&read_object(&current)?, &read_object(&desired)?)?;
            writeln!(output, "{}", if matched { "match" } else { "drift" })?;
            Ok(matched)
        }
        Commands::Prune { file } => {
            let obj = read_object(&file)?;
            let pruned = prune::prune_object(&config.codec(), &obj)?;
            writeln!(output, "{}", String::from_utf8_lossy(&pruned))?;
            Ok(true)
        }
        Commands::Annotate { file } => {
            let mut obj = read_object(&file)?;
            config.patch_maker().annotator().set_last_applied_annotation(&mut obj)?;
            write!(output, "{}", value::to_yaml(obj.value())?)?;
            Ok(true)
        }
    }
}

fn read_object(path: &Path) -> Result<ResourceObject, Box<dyn std::error::Error>> {
    let content = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read file {:?}: {}", path, e))?;
    let obj = ResourceObject::from_yaml(&content)?;
    if !matches!(obj.value(), Value::Map(_)) {
        return Err(format!("{:?} does not hold an object", path).into());
    }
    Ok(obj)
}
