//! The lint entry point: one fresh engine per call.

use std::env;
use std::io;
use std::path::PathBuf;
use std::rc::Rc;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use rquickjs::context::EvalOptions;
use rquickjs::promise::PromiseState;
use rquickjs::{Context, Ctx, Function, Runtime, Value};
use rspectral_node::{Registry, SourceLoader};
use tracing::{debug, info};

use crate::config::{CancellationToken, Config, LintOption};
use crate::dist::DIST_NAME;
use crate::error::LintError;
use crate::evaluate::EvaluateError;
use crate::modules::{default_before_module, load_modules};
use crate::output::Output;
use crate::script::SCRIPT_NAME;

/// Global holding the documents passed to [`lint`].
pub const LINT_DOCUMENTS: &str = "lintDocuments";

/// Global holding the ruleset passed to [`lint`].
pub const LINT_RULESET: &str = "lintRuleset";

/// Serializes lint runs within the process.
static LINT_GATE: Mutex<()> = Mutex::new(());

/// Lints `documents` against `ruleset` with the embedded Spectral bundle.
///
/// Relative paths are resolved by the bundle against the working directory
/// (see [`crate::with_working_directory`]). Calls are serialized; each one
/// runs in its own engine.
///
/// # Example
///
/// ```rust,ignore
/// use rspectral_core::{lint, with_working_directory};
///
/// let output = lint(&["./openapi.yaml"], "./.spectral.yaml", [with_working_directory("./api")])?;
/// for violation in &output {
///     println!("{} {}", violation.code, violation.message);
/// }
/// ```
pub fn lint<S, O>(documents: &[S], ruleset: &str, options: O) -> Result<Output, LintError>
where
    S: AsRef<str>,
    O: IntoIterator<Item = LintOption>,
{
    lint_in(documents, ruleset, options, env::current_dir)
}

/// [`lint`] with the host current directory supplied by `current_dir`. It is
/// consulted only when no working directory was configured.
fn lint_in<S, O, D>(
    documents: &[S],
    ruleset: &str,
    options: O,
    current_dir: D,
) -> Result<Output, LintError>
where
    S: AsRef<str>,
    O: IntoIterator<Item = LintOption>,
    D: FnOnce() -> io::Result<PathBuf>,
{
    let _gate = LINT_GATE.lock();

    let mut config = Config::with_options(options)?;

    if config.working_directory.is_empty() {
        let cwd = current_dir().map_err(LintError::WorkingDirectory)?;
        config.working_directory = cwd.to_string_lossy().into_owned();
    }
    if config.before_module.is_none() {
        config.before_module = Some(default_before_module(
            config.working_directory.clone(),
            config.fs.clone(),
        ));
    }

    let documents: Vec<String> = documents.iter().map(|d| d.as_ref().to_string()).collect();
    info!(
        documents = documents.len(),
        ruleset,
        working_directory = %config.working_directory,
        "linting"
    );

    let watchdog = Watchdog::new(config.timeout, config.cancellation.clone());
    let runtime = Runtime::new().map_err(|e| LintError::engine(e.to_string()))?;
    if let Some(limit) = config.memory_limit {
        runtime.set_memory_limit(limit);
    }
    let interrupt = watchdog.clone();
    runtime.set_interrupt_handler(Some(Box::new(move || interrupt.should_stop())));
    let context = Context::full(&runtime).map_err(|e| LintError::engine(e.to_string()))?;

    let json = context.with(|ctx| run(&ctx, &config, &documents, ruleset, &watchdog))?;
    debug!(bytes = json.len(), "lint finished");

    Ok(serde_json::from_str(&json)?)
}

fn run<'js>(
    ctx: &Ctx<'js>,
    config: &Config,
    documents: &[String],
    ruleset: &str,
    watchdog: &Watchdog,
) -> Result<String, LintError> {
    let registry = Rc::new(Registry::new(source_loader(Arc::clone(&config.dist))));
    // An interrupted evaluation surfaces as an exception; report why it
    // was interrupted instead.
    let evaluate_error = |e: rquickjs::Error| {
        let captured = EvaluateError::capture(ctx, &registry, e);
        match watchdog.check() {
            Err(stopped) => stopped,
            Ok(()) => LintError::Evaluate(captured),
        }
    };

    let require = load_modules(
        ctx,
        &registry,
        config.before_module.as_ref(),
        config.after_module.as_ref(),
    )?;

    let globals = ctx.globals();
    globals
        .set("__dirname", config.working_directory.as_str())
        .and_then(|()| globals.set(LINT_DOCUMENTS, documents.to_vec()))
        .and_then(|()| globals.set(LINT_RULESET, ruleset))
        .map_err(|e| LintError::engine(format!("failed to bind globals: {e}")))?;

    require.require::<Value>(DIST_NAME).map_err(evaluate_error)?;

    registry.record_source(SCRIPT_NAME, &config.script);
    let result: Value = ctx
        .eval_with_options(config.script.as_bytes(), script_options())
        .map_err(evaluate_error)?;

    let value = match result.clone().into_promise() {
        Some(promise) => loop {
            match promise.state() {
                PromiseState::Pending => {
                    watchdog.check()?;
                    if !ctx.execute_pending_job() {
                        return Err(LintError::Stalled);
                    }
                }
                PromiseState::Resolved => {
                    break promise
                        .result::<Value>()
                        .transpose()
                        .map_err(|e| LintError::engine(e.to_string()))?
                        .unwrap_or_else(|| Value::new_undefined(ctx.clone()));
                }
                PromiseState::Rejected => {
                    let reason = match promise.result::<Value>() {
                        Some(Ok(reason)) => reason,
                        Some(Err(_)) => ctx.catch(),
                        None => Value::new_undefined(ctx.clone()),
                    };
                    return Err(LintError::PromiseRejected(describe(&reason)));
                }
            }
        },
        None => result,
    };

    match value.as_string() {
        Some(text) => text.to_string().map_err(|e| LintError::engine(e.to_string())),
        None => Err(LintError::UnknownReturn(type_of(ctx, &value))),
    }
}

fn script_options() -> EvalOptions {
    let mut options = EvalOptions::default();
    options.global = true;
    options.strict = false;
    options.filename = Some(SCRIPT_NAME.to_string());
    options
}

/// Serves the bundle under [`DIST_NAME`] and other names from disk.
fn source_loader(dist: Arc<[u8]>) -> SourceLoader {
    let disk = SourceLoader::disk();
    SourceLoader::new(move |name| {
        if name == DIST_NAME {
            Ok(dist.to_vec())
        } else {
            disk.load(name)
        }
    })
}

/// The guest `typeof` of `value`.
fn type_of<'js>(ctx: &Ctx<'js>, value: &Value<'js>) -> String {
    ctx.eval::<Function, _>("(function (value) { return typeof value; })")
        .and_then(|type_of| type_of.call((value.clone(),)))
        .unwrap_or_else(|_| value.type_of().as_str().to_string())
}

fn describe(value: &Value<'_>) -> String {
    value
        .get::<rquickjs::convert::Coerced<String>>()
        .map(|s| s.0)
        .unwrap_or_else(|_| format!("<{}>", value.type_of().as_str()))
}

/// Deadline and cancellation shared with the engine's interrupt handler.
#[derive(Debug, Clone)]
struct Watchdog {
    deadline: Option<(Instant, Duration)>,
    cancellation: Option<CancellationToken>,
}

impl Watchdog {
    fn new(timeout: Option<Duration>, cancellation: Option<CancellationToken>) -> Self {
        Self {
            deadline: timeout.map(|timeout| (Instant::now() + timeout, timeout)),
            cancellation,
        }
    }

    fn check(&self) -> Result<(), LintError> {
        if self.cancellation.as_ref().is_some_and(CancellationToken::is_cancelled) {
            return Err(LintError::Cancelled);
        }
        match self.deadline {
            Some((deadline, timeout)) if Instant::now() >= deadline => {
                Err(LintError::Timeout(timeout))
            }
            _ => Ok(()),
        }
    }

    fn should_stop(&self) -> bool {
        self.check().is_err()
    }
}
