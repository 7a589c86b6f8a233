//! `process` shim: working directory, environment snapshot and version
//! metadata.

use std::collections::BTreeMap;
use std::env;
use std::rc::Rc;

use rquickjs::function::{Opt, Rest};
use rquickjs::{Ctx, Exception, Function, Object, Value};
use tracing::{debug, warn};

use super::os;
use crate::js;
use crate::registry::{Installer, NativeModule, Registry, Require};

pub const MODULE_NAME: &str = "process";

/// Node release reported to the guest.
pub const NODE_VERSION: &str = "18.20.4";

/// Program name reported as `argv[0]`.
pub const PROGRAM_NAME: &str = "spectral";

const NEXT_TICK_SOURCE: &str = r#"(function () {
    return function nextTick(callback, ...args) {
        Promise.resolve().then(() => callback(...args));
    };
})"#;

/// Host data behind the `process` module.
#[derive(Debug, Clone)]
pub struct Process {
    working_directory: Option<String>,
    env: BTreeMap<String, String>,
}

impl Process {
    /// Snapshots the host environment. An empty `working_directory` means
    /// the host current directory.
    pub fn new(working_directory: impl Into<String>) -> Self {
        let working_directory = working_directory.into();
        Self {
            working_directory: (!working_directory.is_empty()).then_some(working_directory),
            env: env::vars_os()
                .map(|(k, v)| (k.to_string_lossy().into_owned(), v.to_string_lossy().into_owned()))
                .collect(),
        }
    }

    /// The configured working directory, or the host current directory.
    pub fn cwd(&self) -> std::io::Result<String> {
        match &self.working_directory {
            Some(dir) => Ok(dir.clone()),
            None => env::current_dir().map(|dir| dir.to_string_lossy().into_owned()),
        }
    }

    pub fn env(&self) -> &BTreeMap<String, String> {
        &self.env
    }
}

/// Installer bound to `working_directory`.
pub fn installer(working_directory: impl Into<String>) -> Installer {
    let working_directory = working_directory.into();
    Installer::new(move |ctx, registry, require| {
        // The environment is captured at installation time.
        let process = Rc::new(Process::new(working_directory.clone()));
        install(ctx, registry, require, process)
    })
}

/// The context-free installer. Installing it panics: the working directory
/// must come from a before-module hook.
pub fn default_installer() -> Installer {
    Installer::new(|_ctx, _registry, _require| {
        panic!("process module requires a working directory; install it through a before-module hook")
    })
}

fn install<'js>(
    ctx: &Ctx<'js>,
    registry: &Registry,
    require: &Require<'js>,
    process: Rc<Process>,
) -> rquickjs::Result<()> {
    registry.register_builtin(
        MODULE_NAME,
        NativeModule::new(move |ctx, module, _require| load(ctx, module, &process)),
    );
    js::bind_global(ctx, require, MODULE_NAME, "process")
}

fn load<'js>(ctx: &Ctx<'js>, module: &Object<'js>, process: &Rc<Process>) -> rquickjs::Result<()> {
    let exports = js::exports(module)?;

    exports.set("env", process.env().clone())?;
    exports.set(
        "on",
        Function::new(ctx.clone(), |_args: Rest<Value<'js>>| {})?.with_name("on")?,
    )?;

    let p = Rc::clone(process);
    exports.set(
        "cwd",
        Function::new(ctx.clone(), move |ctx: Ctx<'js>| {
            p.cwd()
                .map_err(|e| Exception::throw_message(&ctx, &format!("process.cwd: {e}")))
        })?
        .with_name("cwd")?,
    )?;

    let versions = Object::new(ctx.clone())?;
    versions.set("node", NODE_VERSION)?;
    exports.set("versions", versions)?;
    exports.set("version", format!("v{NODE_VERSION}"))?;
    exports.set("platform", os::platform())?;
    exports.set("arch", os::arch())?;
    exports.set("pid", std::process::id())?;
    exports.set("argv", vec![PROGRAM_NAME])?;
    exports.set("stdout", output_stream(ctx, "stdout")?)?;
    exports.set("stderr", output_stream(ctx, "stderr")?)?;

    let next_tick: Function = js::glue(ctx, "node:process", NEXT_TICK_SOURCE, ())?;
    exports.set("nextTick", next_tick)?;
    exports.set(
        "emitWarning",
        Function::new(ctx.clone(), |ctx: Ctx<'js>, warning: Value<'js>, _rest: Opt<Value<'js>>| {
            let message = super::util::inspect(&ctx, &warning)?;
            warn!(target: "rspectral::guest", "{}", message);
            Ok::<_, rquickjs::Error>(())
        })?
        .with_name("emitWarning")?,
    )?;

    Ok(())
}

/// A non-TTY sink whose writes are logged at debug level.
fn output_stream<'js>(ctx: &Ctx<'js>, name: &'static str) -> rquickjs::Result<Object<'js>> {
    let stream = Object::new(ctx.clone())?;
    stream.set("isTTY", false)?;
    stream.set(
        "write",
        Function::new(ctx.clone(), move |chunk: Value<'js>, _rest: Rest<Value<'js>>| {
            let text = js::to_display(&chunk)?;
            debug!(target: "rspectral::guest", stream = name, "{}", text.trim_end());
            Ok::<_, rquickjs::Error>(true)
        })?
        .with_name("write")?,
    )?;
    Ok(stream)
}
