//! Small helpers shared by the shims.

use std::io;

use rquickjs::context::EvalOptions;
use rquickjs::convert::Coerced;
use rquickjs::{Ctx, Function, Object, Value};

use crate::registry::Require;

const CONSTRUCTOR_SOURCE: &str = r#"(function (name, init) {
    return {
        [name]: function (...args) {
            init.apply(this, args);
        },
    }[name];
})"#;

/// Options for evaluating a named, sloppy-mode global script.
pub(crate) fn eval_options(filename: &str) -> EvalOptions {
    let mut options = EvalOptions::default();
    options.global = true;
    options.strict = false;
    options.filename = Some(filename.to_string());
    options
}

/// The `exports` object of a module.
pub(crate) fn exports<'js>(module: &Object<'js>) -> rquickjs::Result<Object<'js>> {
    module.get("exports")
}

/// Creates a guest `Error` carrying extra string properties.
pub(crate) fn error_object<'js>(
    ctx: &Ctx<'js>,
    message: &str,
    properties: &[(&str, &str)],
) -> rquickjs::Result<Object<'js>> {
    let constructor: Function = ctx.globals().get("Error")?;
    let error: Object = constructor.call((message,))?;
    for (key, value) in properties {
        error.set(*key, *value)?;
    }
    Ok(error)
}

/// Throws a guest `Error` carrying extra string properties.
pub(crate) fn throw_error(ctx: &Ctx<'_>, message: &str, properties: &[(&str, &str)]) -> rquickjs::Error {
    match error_object(ctx, message, properties) {
        Ok(error) => ctx.throw(error.into_value()),
        Err(e) => e,
    }
}

/// Node-style error code for an I/O failure.
pub(crate) fn error_code(err: &io::Error) -> &'static str {
    match err.kind() {
        io::ErrorKind::NotFound => "ENOENT",
        io::ErrorKind::PermissionDenied => "EACCES",
        io::ErrorKind::AlreadyExists => "EEXIST",
        io::ErrorKind::InvalidInput => "EINVAL",
        io::ErrorKind::IsADirectory => "EISDIR",
        io::ErrorKind::NotADirectory => "ENOTDIR",
        _ => "EIO",
    }
}

/// Creates the guest error for a failed filesystem call.
pub(crate) fn io_error<'js>(
    ctx: &Ctx<'js>,
    err: &io::Error,
    syscall: &str,
    path: &str,
) -> rquickjs::Result<Object<'js>> {
    let code = error_code(err);
    error_object(
        ctx,
        &format!("{code}: {err}, {syscall} '{path}'"),
        &[("code", code), ("syscall", syscall), ("path", path)],
    )
}

/// Creates a constructible guest function named `name` that runs `init`
/// with the new instance as `this`.
pub(crate) fn constructor<'js>(
    ctx: &Ctx<'js>,
    name: &str,
    init: Function<'js>,
) -> rquickjs::Result<Function<'js>> {
    glue(ctx, "node:internal/constructor", CONSTRUCTOR_SOURCE, (name, init))
}

/// Evaluates a glue factory and calls it with `args`.
pub(crate) fn glue<'js, A, R>(ctx: &Ctx<'js>, filename: &str, source: &str, args: A) -> rquickjs::Result<R>
where
    A: rquickjs::function::IntoArgs<'js>,
    R: rquickjs::FromJs<'js>,
{
    let factory: Function = ctx.eval_with_options(source, eval_options(filename))?;
    factory.call(args)
}

/// Requires `module` and binds its exports as the global `global`.
pub(crate) fn bind_global<'js>(
    ctx: &Ctx<'js>,
    require: &Require<'js>,
    module: &str,
    global: &str,
) -> rquickjs::Result<()> {
    let exports: Value = require.require(module)?;
    ctx.globals().set(global, exports)
}

/// `String(value)` of a guest value.
pub(crate) fn to_display(value: &Value<'_>) -> rquickjs::Result<String> {
    Ok(value.get::<Coerced<String>>()?.0)
}
