//! Lint configuration: the per-call [`Config`] built from [`LintOption`]s
//! and the optional `.rspectral.json` file read by the CLI.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use rspectral_node::VirtualFs;
use serde::{Deserialize, Serialize};

use crate::LintError;
use crate::dist::default_dist;
use crate::modules::{AfterModule, BeforeModule};
use crate::script::default_script;

/// Name of the configuration file looked up by [`FileConfig::discover`].
pub const CONFIG_FILE: &str = ".rspectral.json";

/// Settings of a single lint run.
#[derive(Clone)]
pub struct Config {
    /// Bundle served under [`crate::DIST_NAME`].
    pub dist: Arc<[u8]>,
    /// Driver script evaluated after the bundle is loaded.
    pub script: Arc<str>,
    /// Directory reported by `process.cwd()`. Empty means the host current
    /// directory.
    pub working_directory: String,
    /// Filesystem consulted before the real one.
    pub fs: Option<Arc<dyn VirtualFs>>,
    pub before_module: Option<BeforeModule>,
    pub after_module: Option<AfterModule>,
    pub timeout: Option<Duration>,
    pub cancellation: Option<CancellationToken>,
    /// Engine heap limit in bytes.
    pub memory_limit: Option<usize>,
}

impl Config {
    pub fn new() -> Self {
        Self {
            dist: default_dist(),
            script: default_script(),
            working_directory: String::new(),
            fs: None,
            before_module: None,
            after_module: None,
            timeout: None,
            cancellation: None,
            memory_limit: None,
        }
    }

    /// Applies `options` in order. The first failing option aborts.
    pub fn with_options(options: impl IntoIterator<Item = LintOption>) -> Result<Self, LintError> {
        let mut config = Self::new();
        for option in options {
            option.apply(&mut config)?;
        }
        Ok(config)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("dist", &format_args!("<{} bytes>", self.dist.len()))
            .field("script", &format_args!("<{} bytes>", self.script.len()))
            .field("working_directory", &self.working_directory)
            .field("fs", &self.fs)
            .field("before_module", &self.before_module.is_some())
            .field("after_module", &self.after_module.is_some())
            .field("timeout", &self.timeout)
            .field("cancellation", &self.cancellation)
            .field("memory_limit", &self.memory_limit)
            .finish()
    }
}

type ApplyFn = dyn FnOnce(&mut Config) -> Result<(), LintError>;

/// A modification of the [`Config`] of one lint run.
pub struct LintOption(Box<ApplyFn>);

impl LintOption {
    /// Creates an option from a function that may reject the configuration.
    pub fn new<F>(apply: F) -> Self
    where
        F: FnOnce(&mut Config) -> Result<(), LintError> + 'static,
    {
        Self(Box::new(apply))
    }

    pub(crate) fn set<F>(apply: F) -> Self
    where
        F: FnOnce(&mut Config) + 'static,
    {
        Self::new(move |config| {
            apply(config);
            Ok(())
        })
    }

    pub fn apply(self, config: &mut Config) -> Result<(), LintError> {
        (self.0)(config)
    }
}

impl fmt::Debug for LintOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("LintOption")
    }
}

/// Sets the directory documents and rulesets are resolved against.
pub fn with_working_directory(working_directory: impl Into<String>) -> LintOption {
    let working_directory = working_directory.into();
    LintOption::set(move |config| config.working_directory = working_directory)
}

/// Serves files from `fs` before the real filesystem. Paths are looked up
/// relative to the working directory.
pub fn with_fs(fs: impl VirtualFs + 'static) -> LintOption {
    let fs: Arc<dyn VirtualFs> = Arc::new(fs);
    LintOption::set(move |config| config.fs = Some(fs))
}

/// Bounds the whole run, including the wait for the driver's promise.
pub fn with_timeout(timeout: Duration) -> LintOption {
    LintOption::set(move |config| config.timeout = Some(timeout))
}

pub fn with_cancellation(token: CancellationToken) -> LintOption {
    LintOption::set(move |config| config.cancellation = Some(token))
}

/// Limits the engine heap. Zero is rejected.
pub fn with_memory_limit(bytes: usize) -> LintOption {
    LintOption::new(move |config| {
        if bytes == 0 {
            return Err(LintError::config("memory limit must be greater than zero"));
        }
        config.memory_limit = Some(bytes);
        Ok(())
    })
}

/// Cooperative cancellation flag shared with a running lint.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Contents of a `.rspectral.json` file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct FileConfig {
    /// Documents to lint when none are given on the command line.
    #[serde(default)]
    pub documents: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ruleset: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub working_directory: Option<String>,

    /// Alternative bundle file.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dist: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,

    /// Directory containing the configuration file.
    #[serde(skip)]
    pub base_dir: Option<PathBuf>,
}

impl FileConfig {
    /// Looks for [`CONFIG_FILE`] in `dir`.
    pub fn discover(dir: impl AsRef<Path>) -> Option<PathBuf> {
        let candidate = dir.as_ref().join(CONFIG_FILE);
        candidate.is_file().then_some(candidate)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, LintError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .map_err(|e| LintError::config(format!("Failed to read config: {}", e)))?;

        let mut config = Self::from_json(&content)?;
        if let Some(parent) = path.parent() {
            config.base_dir = Some(parent.to_path_buf());
        }

        Ok(config)
    }

    pub fn from_json(json: &str) -> Result<Self, LintError> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| LintError::config(format!("Invalid config: {}", e)))?;

        if config.timeout_ms == Some(0) {
            return Err(LintError::config("timeoutMs must be greater than zero"));
        }

        Ok(config)
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }

    /// Resolves a path from the file against its directory.
    pub fn resolve_path(&self, path: &str) -> PathBuf {
        match &self.base_dir {
            Some(base) if Path::new(path).is_relative() => base.join(path),
            _ => PathBuf::from(path),
        }
    }
}
