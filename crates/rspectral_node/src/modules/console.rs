//! `console` shim routing guest output to `tracing`.

use rquickjs::function::Rest;
use rquickjs::{Ctx, Function, Object, Value};
use tracing::{debug, error, info, trace, warn};

use super::util::format_values;
use crate::js;
use crate::registry::{Installer, NativeModule, Registry, Require};

pub const MODULE_NAME: &str = "console";

#[derive(Debug, Clone, Copy)]
enum Level {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

const METHODS: &[(&str, Level)] = &[
    ("log", Level::Info),
    ("info", Level::Info),
    ("debug", Level::Debug),
    ("trace", Level::Trace),
    ("warn", Level::Warn),
    ("error", Level::Error),
];

pub fn installer() -> Installer {
    Installer::new(install)
}

fn install<'js>(ctx: &Ctx<'js>, registry: &Registry, require: &Require<'js>) -> rquickjs::Result<()> {
    registry.register_builtin(MODULE_NAME, NativeModule::new(load));
    js::bind_global(ctx, require, MODULE_NAME, "console")
}

fn load<'js>(ctx: &Ctx<'js>, module: &Object<'js>, _require: &Function<'js>) -> rquickjs::Result<()> {
    let exports = js::exports(module)?;

    for &(name, level) in METHODS {
        let function = Function::new(ctx.clone(), move |ctx: Ctx<'js>, args: Rest<Value<'js>>| {
            let message = format_values(&ctx, &args.0)?;
            emit(level, &message);
            Ok::<_, rquickjs::Error>(())
        })?
        .with_name(name)?;
        exports.set(name, function)?;
    }

    Ok(())
}

fn emit(level: Level, message: &str) {
    match level {
        Level::Trace => trace!(target: "rspectral::guest", "{}", message),
        Level::Debug => debug!(target: "rspectral::guest", "{}", message),
        Level::Info => info!(target: "rspectral::guest", "{}", message),
        Level::Warn => warn!(target: "rspectral::guest", "{}", message),
        Level::Error => error!(target: "rspectral::guest", "{}", message),
    }
}
