#![deny(clippy::expect_used)]
//! ani-bindgen Command-Line Interface
//!
//! Usage:
//!   ani-bindgen group.json                  # Generate into ./generated
//!   ani-bindgen group.json -o out           # Generate into out/
//!   ani-bindgen group.json -c bindgen.toml  # Load generator settings
//!   ani-bindgen group.json --dry-run        # Analyze and report, write nothing

use std::env;
use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use ani_bindgen::{generate, load_group_from_path, Diagnostic, GeneratorConfig};
use tracing_subscriber::EnvFilter;

const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Debug, Default, PartialEq)]
struct Options {
    input: PathBuf,
    output: Option<PathBuf>,
    config: Option<PathBuf>,
    keep_name: bool,
    module_prefix: Option<String>,
    path_prefix: Option<String>,
    diagnostics_json: bool,
    dry_run: bool,
}

#[derive(Debug, PartialEq)]
enum Command {
    Generate(Options),
    Help,
    Version,
}

fn parse_args(args: &[String]) -> Result<Command, String> {
    let mut opts = Options::default();
    let mut input = None;
    let mut iter = args.iter();

    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "-h" | "--help" => return Ok(Command::Help),
            "-V" | "--version" => return Ok(Command::Version),
            "-o" | "--output" => opts.output = Some(PathBuf::from(value_of(arg, iter.next())?)),
            "-c" | "--config" => opts.config = Some(PathBuf::from(value_of(arg, iter.next())?)),
            "--module-prefix" => opts.module_prefix = Some(value_of(arg, iter.next())?),
            "--path-prefix" => opts.path_prefix = Some(value_of(arg, iter.next())?),
            "--keep-name" => opts.keep_name = true,
            "--diagnostics-json" => opts.diagnostics_json = true,
            "--dry-run" => opts.dry_run = true,
            flag if flag.starts_with('-') => return Err(format!("unknown option {}", flag)),
            path => {
                if input.is_some() {
                    return Err(format!("unexpected argument {}", path));
                }
                input = Some(PathBuf::from(path));
            }
        }
    }

    opts.input = input.ok_or_else(|| "missing input file".to_string())?;
    Ok(Command::Generate(opts))
}

fn value_of(flag: &str, value: Option<&String>) -> Result<String, String> {
    value
        .cloned()
        .ok_or_else(|| format!("{} requires an argument", flag))
}

fn load_config(opts: &Options) -> Result<GeneratorConfig, String> {
    let mut config = match &opts.config {
        Some(path) => {
            let text = fs::read_to_string(path)
                .map_err(|e| format!("cannot read {}: {}", path.display(), e))?;
            GeneratorConfig::from_toml_str(&text).map_err(|e| e.to_string())?
        }
        None => GeneratorConfig::default(),
    };
    // Command-line flags override the file.
    if opts.keep_name {
        config.keep_name = true;
    }
    if let Some(prefix) = &opts.module_prefix {
        config.module_prefix = Some(prefix.clone());
    }
    if let Some(prefix) = &opts.path_prefix {
        config.path_prefix = Some(prefix.clone());
    }
    Ok(config)
}

fn report(diagnostics: &[Diagnostic], json: bool) {
    for diagnostic in diagnostics {
        if json {
            match serde_json::to_string(diagnostic) {
                Ok(line) => eprintln!("{}", line),
                Err(e) => eprintln!("error: cannot serialize diagnostic: {}", e),
            }
        } else {
            eprintln!("{}", diagnostic);
        }
    }
}

fn run(opts: Options) -> Result<(), String> {
    let config = load_config(&opts)?;
    let group = load_group_from_path(&opts.input).map_err(|e| e.to_string())?;
    let generation = generate(&group, config).map_err(|e| e.to_string())?;

    report(&generation.diagnostics, opts.diagnostics_json);

    if opts.dry_run {
        for path in generation.output.paths() {
            println!("{}", path);
        }
    } else {
        let dir = opts.output.unwrap_or_else(|| PathBuf::from("generated"));
        let written = generation.output.flush(&dir).map_err(|e| e.to_string())?;
        tracing::debug!(files = written.len(), dir = %dir.display(), "flushed output");
    }
    println!("{}", generation.stats);
    Ok(())
}

// Diagnostics are reported by `report`; logging is opt-in through ANI_BINDGEN_LOG.
fn init_tracing() {
    if let Ok(filter) = EnvFilter::try_from_env("ANI_BINDGEN_LOG") {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .with_level(true)
            .with_writer(std::io::stderr)
            .init();
        tracing::debug!("tracing initialized");
    }
}

fn print_usage() {
    println!(
        r#"ani-bindgen - ANI C++ binding generator

USAGE:
    ani-bindgen <group.json> [OPTIONS]

OPTIONS:
    -o, --output <dir>        Output directory (default: generated)
    -c, --config <file>       TOML generator settings
        --keep-name           Keep declaration names on the managed side
        --module-prefix <p>   Module prefix, e.g. @ohos
        --path-prefix <p>     Slash-separated path prefix
        --diagnostics-json    Report diagnostics as JSON lines
        --dry-run             List the files that would be written
    -h, --help                Show this help message
    -V, --version             Show version

ENVIRONMENT:
    ANI_BINDGEN_LOG           Log filter, e.g. ani_bindgen=debug"#
    );
}

fn main() -> ExitCode {
    init_tracing();
    let args: Vec<String> = env::args().skip(1).collect();

    let opts = match parse_args(&args) {
        Ok(Command::Generate(opts)) => opts,
        Ok(Command::Help) => {
            print_usage();
            return ExitCode::SUCCESS;
        }
        Ok(Command::Version) => {
            println!("ani-bindgen {}", VERSION);
            return ExitCode::SUCCESS;
        }
        Err(msg) => {
            eprintln!("Error: {}", msg);
            eprintln!("Run 'ani-bindgen --help' for usage.");
            return ExitCode::FAILURE;
        }
    };

    match run(opts) {
        Ok(()) => ExitCode::SUCCESS,
        Err(msg) => {
            eprintln!("Error: {}", msg);
            ExitCode::FAILURE
        }
    }
}
