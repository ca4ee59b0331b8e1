//! md2docx-batch: file and directory conversion
//!
//! This crate provides the file-system side of Markdown to `.docx`
//! conversion, shared by the CLI and other front ends:
//! - Single-file conversion with typed errors
//! - Directory conversion with parallel processing and per-file results
//!
//! Relative image paths are resolved against the directory of each input
//! file, so the `base_dir` of the converter options is replaced per file.

use log::{debug, info};
use md2docx_core::{ConverterOptions, tokens_to_docx};
use md2docx_docx::PackageError;
use rayon::prelude::*;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

/// Errors that abort the conversion of one document
#[derive(Debug, thiserror::Error)]
pub enum ConvertError {
    #[error("File not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("Not a Markdown file (expected .md): {}", .0.display())]
    WrongExtension(PathBuf),

    #[error("Not a directory: {}", .0.display())]
    NotADirectory(PathBuf),

    #[error("IO error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to package document: {0}")]
    Package(#[from] PackageError),
}

impl ConvertError {
    fn io(path: &Path) -> impl FnOnce(std::io::Error) -> Self + '_ {
        move |source| ConvertError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Options for file and directory conversion
#[derive(Debug, Clone, Default)]
pub struct BatchOptions {
    /// Conversion options applied to every document
    pub converter: ConverterOptions,
    /// Descend into subdirectories
    pub recursive: bool,
    /// Number of parallel jobs (defaults to number of CPUs)
    pub jobs: Option<usize>,
}

/// Outcome of converting one file of a directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileResult {
    pub input: PathBuf,
    pub output: PathBuf,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// True for paths ending in `.md`, in any case
pub fn is_markdown(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("md"))
}

/// Convert one Markdown file
///
/// The output defaults to the input path with a `.docx` extension; missing
/// parent directories are created. Returns the path written.
pub fn convert_file(
    input: &Path,
    output: Option<&Path>,
    options: &BatchOptions,
) -> Result<PathBuf, ConvertError> {
    if !input.is_file() {
        return Err(ConvertError::NotFound(input.to_path_buf()));
    }
    if !is_markdown(input) {
        return Err(ConvertError::WrongExtension(input.to_path_buf()));
    }
    let output = output.map_or_else(|| input.with_extension("docx"), Path::to_path_buf);
    convert_inner(input, &output, &options.converter)?;
    Ok(output)
}

fn convert_inner(
    input: &Path,
    output: &Path,
    converter: &ConverterOptions,
) -> Result<(), ConvertError> {
    let started = Instant::now();
    info!("Converting: {}", input.display());

    let markdown = fs::read_to_string(input).map_err(ConvertError::io(input))?;
    let tokens = md_tokens::parse(&markdown);
    debug!("{} tokens in {}", tokens.len(), input.display());

    let options = ConverterOptions {
        base_dir: input
            .parent()
            .map_or_else(|| PathBuf::from("."), Path::to_path_buf),
        ..converter.clone()
    };
    let bytes = tokens_to_docx(&tokens, &options)?;

    if let Some(parent) = output.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent).map_err(ConvertError::io(parent))?;
    }
    fs::write(output, bytes).map_err(ConvertError::io(output))?;

    info!(
        "Done in {:.2}s -> {}",
        started.elapsed().as_secs_f64(),
        output.display()
    );
    Ok(())
}

/// Convert every Markdown file of a directory
///
/// Outputs keep their path relative to `dir` under `output_dir`, which
/// defaults to `dir`. A failing file is recorded in its [`FileResult`] and
/// does not stop the others. Results are in sorted input order.
pub fn convert_directory(
    dir: &Path,
    output_dir: Option<&Path>,
    options: &BatchOptions,
) -> Result<Vec<FileResult>, ConvertError> {
    if !dir.is_dir() {
        return Err(ConvertError::NotADirectory(dir.to_path_buf()));
    }
    let output_dir = output_dir.unwrap_or(dir);

    let mut files = collect_markdown_files(dir, options.recursive)?;
    files.sort();
    debug!("Found {} .md files in {}", files.len(), dir.display());

    // Configure thread pool if specified
    if let Some(n) = options.jobs {
        rayon::ThreadPoolBuilder::new()
            .num_threads(n)
            .build_global()
            .ok(); // Ignore error if already initialized
    }

    let results = files
        .par_iter()
        .map(|file| {
            let relative = file.strip_prefix(dir).unwrap_or(file);
            let output = output_dir.join(relative).with_extension("docx");
            let error = convert_inner(file, &output, &options.converter)
                .err()
                .map(|e| e.to_string());
            FileResult {
                input: file.clone(),
                output,
                success: error.is_none(),
                error,
            }
        })
        .collect();
    Ok(results)
}

/// Collect all .md files in a directory
fn collect_markdown_files(dir: &Path, recursive: bool) -> Result<Vec<PathBuf>, ConvertError> {
    let mut files = Vec::new();

    for entry in fs::read_dir(dir).map_err(ConvertError::io(dir))? {
        let path = entry.map_err(ConvertError::io(dir))?.path();

        if path.is_file() {
            if is_markdown(&path) {
                files.push(path);
            }
        } else if path.is_dir() && recursive {
            files.extend(collect_markdown_files(&path, recursive)?);
        }
    }

    Ok(files)
}
