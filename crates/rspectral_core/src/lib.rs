//! # rspectral_core
//!
//! Runs the Spectral OpenAPI linter, bundled for Node.js, inside an embedded
//! QuickJS engine.
//!
//! This crate provides:
//! - [`lint`], which creates a fresh engine, installs the Node.js shims,
//!   loads the bundle and waits for its result
//! - [`LintOption`]s to swap the bundle or driver script, point at a working
//!   directory or virtual filesystem, hook module installation and bound
//!   the run
//! - The decoded [`Output`] and the [`LintError`]/[`EvaluateError`]
//!   diagnostics
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::time::Duration;
//! use rspectral_core::{lint, with_timeout, with_working_directory};
//!
//! let output = lint(
//!     &["./openapi.yaml"],
//!     "./.spectral.yaml",
//!     [with_working_directory("./api"), with_timeout(Duration::from_secs(30))],
//! )?;
//! println!("{} violation(s)", output.len());
//! ```

mod config;
mod dist;
mod error;
mod evaluate;
mod linter;
mod modules;
mod output;
mod script;

pub use config::{
    CONFIG_FILE, CancellationToken, Config, FileConfig, LintOption, with_cancellation, with_fs,
    with_memory_limit, with_timeout, with_working_directory,
};
pub use dist::{BUNDLE_EMBEDDED, DIST_NAME, default_dist, with_dist};
pub use error::{HookError, LintError};
pub use evaluate::{EvaluateError, StackFrame, parse_stack};
pub use linter::{LINT_DOCUMENTS, LINT_RULESET, lint};
pub use modules::{
    AfterModule, BeforeModule, Enable, after_module, before_module, default_before_module,
    enables, load_modules, with_after_module, with_before_module,
};
pub use output::{Output, Position, Range, Severity, Violation, has_errors};
pub use script::{SCRIPT_NAME, default_script, with_script};

pub use rspectral_node::modules::STUB_MODULES;
pub use rspectral_node::{
    DirFs, Installer, MemoryFs, Registry, Require, ResolutionContext, VirtualFs,
};
