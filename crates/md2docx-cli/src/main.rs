//! md2docx: CLI tool to convert Markdown files to Word documents

mod config;

use anyhow::{Context, Result};
use clap::Parser;
use log::LevelFilter;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use config::{CONFIG_FILE_NAME, Config};
use md2docx_batch::{BatchOptions, FileResult, convert_directory, convert_file};

#[derive(Parser, Debug)]
#[command(name = "md2docx")]
#[command(about = "Convert Markdown files to Word documents")]
#[command(version)]
#[command(after_help = "Examples:
  md2docx notes.md                  # Convert single file to notes.docx
  md2docx notes.md -o report.docx   # Convert to specific output file
  md2docx docs/ -o out/ -r          # Convert a directory tree
  md2docx docs/ -j4                 # Use 4 parallel jobs
  md2docx --init                    # Write a sample _md2docx.toml")]
struct Cli {
    /// Input Markdown file or directory
    #[arg(required_unless_present_any = ["print_config_schema", "init"])]
    input: Option<PathBuf>,

    /// Output file or directory
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Process directories recursively
    #[arg(short, long)]
    recursive: bool,

    /// Number of parallel jobs (defaults to number of CPUs)
    #[arg(short, long)]
    jobs: Option<usize>,

    /// Configuration file (defaults to _md2docx.toml next to the input)
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Show code blocks without syntax colours
    #[arg(long)]
    no_highlight: bool,

    /// Show diagram fences as code instead of images
    #[arg(long)]
    no_diagrams: bool,

    /// Print the token stream as JSON instead of converting
    #[arg(long)]
    dump_tokens: bool,

    /// Print the JSON schema of the configuration file
    #[arg(long)]
    print_config_schema: bool,

    /// Write a sample configuration file
    #[arg(long)]
    init: bool,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Quiet mode - only show errors
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_logging(&cli);

    if cli.print_config_schema {
        println!("{}", Config::json_schema_string()?);
        return Ok(ExitCode::SUCCESS);
    }

    if cli.init {
        let dir = match &cli.input {
            Some(path) if path.is_dir() => path.clone(),
            _ => PathBuf::from("."),
        };
        let path = write_sample_config(&dir)?;
        println!("{}", path.display());
        return Ok(ExitCode::SUCCESS);
    }

    let Some(input) = cli.input.clone() else {
        anyhow::bail!("No input path given");
    };

    if cli.dump_tokens {
        let markdown = fs::read_to_string(&input)
            .with_context(|| format!("Failed to read: {}", input.display()))?;
        let tokens = md_tokens::parse(&markdown);
        println!("{}", md_tokens::tokens_to_json(&tokens)?);
        return Ok(ExitCode::SUCCESS);
    }

    let config = load_config(&cli, &input)?;
    let options = batch_options(&cli, &config);

    if input.is_file() {
        let output = convert_file(&input, cli.output.as_deref(), &options)?;
        if !cli.quiet {
            println!("{}", output.display());
        }
    } else if input.is_dir() {
        let results = convert_directory(&input, cli.output.as_deref(), &options)?;
        if results.is_empty() {
            eprintln!("No .md files found.");
            return Ok(ExitCode::FAILURE);
        }
        print_results(&results);
    } else {
        anyhow::bail!("Input path does not exist: {}", input.display());
    }

    Ok(ExitCode::SUCCESS)
}

fn init_logging(cli: &Cli) {
    let level = if cli.quiet {
        LevelFilter::Error
    } else if cli.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };

    env_logger::Builder::new()
        .filter_level(level)
        .format(|buf, record| writeln!(buf, "{}: {}", record.level(), record.args()))
        .parse_default_env()
        .init();
}

/// `--config` if given, else `_md2docx.toml` in the input's directory
fn load_config(cli: &Cli, input: &Path) -> Result<Config> {
    if let Some(path) = &cli.config {
        return Config::load(path);
    }
    let dir = if input.is_dir() {
        input
    } else {
        input.parent().unwrap_or(Path::new("."))
    };
    let dir = if dir.as_os_str().is_empty() {
        Path::new(".")
    } else {
        dir
    };
    let config = Config::load_from_dir(dir)?;
    if config.is_some() {
        log::debug!("Using {}", dir.join(CONFIG_FILE_NAME).display());
    }
    Ok(config.unwrap_or_default())
}

/// Command-line flags override the configuration file
fn batch_options(cli: &Cli, config: &Config) -> BatchOptions {
    let mut converter = config.converter_options();
    if cli.no_highlight {
        converter.highlight_code = false;
    }
    if cli.no_diagrams {
        converter.render_diagrams = false;
    }
    BatchOptions {
        converter,
        recursive: cli.recursive || config.output.recursive.unwrap_or(false),
        jobs: cli.jobs.or(config.output.jobs),
    }
}

fn write_sample_config(dir: &Path) -> Result<PathBuf> {
    let path = dir.join(CONFIG_FILE_NAME);
    if path.exists() {
        anyhow::bail!("Config file already exists: {}", path.display());
    }
    let content = Config::sample().to_toml_with_schema()?;
    fs::write(&path, content)
        .with_context(|| format!("Failed to write: {}", path.display()))?;
    Ok(path)
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map_or_else(|| path.display().to_string(), |name| name.to_string_lossy().into_owned())
}

fn print_results(results: &[FileResult]) {
    println!("\n{}", "=".repeat(60));
    println!("CONVERSION RESULTS");
    println!("{}", "=".repeat(60));
    for result in results {
        if result.success {
            println!(
                "  [OK] {} -> {}",
                file_name(&result.input),
                file_name(&result.output)
            );
        } else {
            println!(
                "  [FAIL] {} - Error: {}",
                file_name(&result.input),
                result.error.as_deref().unwrap_or("unknown error")
            );
        }
    }

    let succeeded = results.iter().filter(|r| r.success).count();
    println!(
        "\nTotal: {} succeeded, {} failed",
        succeeded,
        results.len() - succeeded
    );
}
