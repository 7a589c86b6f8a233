//! CLI argument definitions

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

/// rspectral - Spectral OpenAPI linting in an embedded JavaScript engine
#[derive(Parser)]
#[command(name = "rspectral")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Configuration file path
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Lint OpenAPI documents
    Lint(LintArgs),

    /// List the Node.js built-in modules provided to the bundle
    Modules,
}

#[derive(clap::Args)]
pub struct LintArgs {
    /// Documents to lint, relative to the working directory
    pub documents: Vec<String>,

    /// Ruleset file, relative to the working directory
    #[arg(short, long)]
    pub ruleset: Option<String>,

    /// Working directory reported to the bundle
    #[arg(long, value_name = "DIR")]
    pub cwd: Option<String>,

    /// Use this bundle instead of the embedded one
    #[arg(long, value_name = "FILE")]
    pub dist: Option<PathBuf>,

    /// Use this driver script instead of the embedded one
    #[arg(long, value_name = "FILE")]
    pub script: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,

    /// Abort the lint after this many seconds
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}
