//! Lint command implementation

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use miette::{IntoDiagnostic, Result, miette};
use rspectral_core::{
    BUNDLE_EMBEDDED, FileConfig, LintOption, lint, with_dist, with_script, with_timeout,
    with_working_directory,
};
use tracing::{info, warn};

use crate::cli::{Cli, LintArgs};
use crate::output::output_results;

/// Ruleset used when neither the command line nor the config names one.
const DEFAULT_RULESET: &str = "./.spectral.yaml";

pub fn run_lint(cli: &Cli, args: &LintArgs) -> Result<bool> {
    let config = match &cli.config {
        Some(path) => FileConfig::from_file(path).into_diagnostic()?,
        None => find_config()?,
    };

    let documents = if args.documents.is_empty() {
        config.documents.clone()
    } else {
        args.documents.clone()
    };
    if documents.is_empty() {
        return Err(miette!(
            "No documents to lint. Pass them as arguments or list them in the config file."
        ));
    }

    let ruleset = args
        .ruleset
        .clone()
        .or_else(|| config.ruleset.clone())
        .unwrap_or_else(|| DEFAULT_RULESET.to_string());

    let mut options: Vec<LintOption> = Vec::new();

    let working_directory = match (&args.cwd, &config.working_directory) {
        (Some(cwd), _) => Some(PathBuf::from(cwd)),
        (None, Some(dir)) => Some(config.resolve_path(dir)),
        (None, None) => None,
    };
    if let Some(dir) = working_directory {
        options.push(with_working_directory(absolute(&dir)?));
    }

    let dist = match (&args.dist, &config.dist) {
        (Some(path), _) => Some(path.clone()),
        (None, Some(path)) => Some(config.resolve_path(path)),
        (None, None) => None,
    };
    match dist {
        Some(path) => {
            info!("Using bundle: {}", path.display());
            let bytes = fs::read(&path)
                .map_err(|e| miette!("Failed to read bundle {}: {}", path.display(), e))?;
            options.push(with_dist(bytes));
        }
        None if !BUNDLE_EMBEDDED => {
            warn!("No Spectral bundle was embedded at build time; pass --dist to provide one");
        }
        None => {}
    }

    if let Some(path) = &args.script {
        let script = fs::read_to_string(path)
            .map_err(|e| miette!("Failed to read script {}: {}", path.display(), e))?;
        options.push(with_script(script));
    }

    if let Some(timeout) = args.timeout.map(Duration::from_secs).or_else(|| config.timeout()) {
        options.push(with_timeout(timeout));
    }

    let output = lint(&documents, &ruleset, options).into_diagnostic()?;

    output_results(&output, args.format)
}

pub fn find_config() -> Result<FileConfig> {
    if let Some(path) = FileConfig::discover(".") {
        info!("Using config: {}", path.display());
        return FileConfig::from_file(&path).into_diagnostic();
    }

    info!("No config file found, using defaults");
    Ok(FileConfig::default())
}

fn absolute(path: &Path) -> Result<String> {
    let path = std::path::absolute(path).into_diagnostic()?;
    path.to_str()
        .map(str::to_string)
        .ok_or_else(|| miette!("Working directory is not valid UTF-8: {:?}", path))
}
