//! Writing run outputs: the persisted run document and run metadata.
use crate::planning::SolvedRun;
use anyhow::{Context, Result, ensure};
use chrono::Local;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

/// File name for the persisted run document
pub const RUN_FILE_NAME: &str = "run.json";

/// File name for run metadata
const METADATA_FILE_NAME: &str = "metadata.toml";

/// Default directory for the results of a model, under the results root
pub fn get_output_dir(model_path: &Path, results_root: PathBuf) -> Result<PathBuf> {
    let model_name = model_path
        .canonicalize()
        .with_context(|| format!("Invalid model path: {}", model_path.display()))?
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "model".to_string());

    let mut path = results_root;
    path.push(model_name);
    Ok(path)
}

/// Create the output directory, honouring the overwrite flag.
///
/// # Returns
///
/// Whether an existing directory was overwritten.
pub fn create_output_directory(output_path: &Path, overwrite: bool) -> Result<bool> {
    let existed = output_path.exists();
    ensure!(
        !existed || overwrite,
        "Output directory {} already exists. Pass --overwrite to replace it.",
        output_path.display()
    );

    if existed {
        fs::remove_dir_all(output_path)?;
    }
    fs::create_dir_all(output_path)?;

    Ok(existed)
}

/// Write the run document as JSON into the output directory
pub fn write_run(output_path: &Path, run: &SolvedRun) -> Result<PathBuf> {
    let file_path = output_path.join(RUN_FILE_NAME);
    write_run_to_path(&file_path, run)?;
    Ok(file_path)
}

/// Write the run document to the exact path given
pub fn write_run_to_path(file_path: &Path, run: &SolvedRun) -> Result<()> {
    let contents = serde_json::to_string_pretty(run)?;
    fs::write(file_path, contents)
        .with_context(|| format!("Failed to write {}", file_path.display()))
}

/// Read a previously persisted run document
pub fn read_run(file_path: &Path) -> Result<SolvedRun> {
    let contents = fs::read_to_string(file_path)
        .with_context(|| format!("Failed to read {}", file_path.display()))?;
    serde_json::from_str(&contents)
        .with_context(|| format!("Invalid run document: {}", file_path.display()))
}

/// Run metadata serialised to TOML
#[derive(Serialize)]
struct Metadata<'a> {
    run: RunMetadata<'a>,
    program: ProgramMetadata<'a>,
}

/// Information about the model run
#[derive(Serialize)]
struct RunMetadata<'a> {
    /// Path to the model which was run
    model_path: &'a Path,
    /// The date and time on which the run started
    datetime: String,
}

/// Information about the program build
#[derive(Serialize)]
struct ProgramMetadata<'a> {
    /// The program name
    name: &'a str,
    /// The program version as specified in Cargo.toml
    version: &'a str,
}

/// Write metadata to `metadata.toml` in the given output directory
pub fn write_metadata(output_path: &Path, model_path: &Path) -> Result<()> {
    let metadata = Metadata {
        run: RunMetadata {
            model_path,
            datetime: Local::now().to_rfc2822(),
        },
        program: ProgramMetadata {
            name: env!("CARGO_PKG_NAME"),
            version: env!("CARGO_PKG_VERSION"),
        },
    };
    let file_path = output_path.join(METADATA_FILE_NAME);
    fs::write(&file_path, toml::to_string(&metadata)?)?;

    Ok(())
}
