//! `path` shim backed by [`crate::posix`]. `path.posix` is the module
//! itself.

use rquickjs::function::{Opt, Rest};
use rquickjs::{Ctx, Function, Object};

use crate::js;
use crate::posix;
use crate::registry::{Installer, NativeModule, Registry, Require};

pub const MODULE_NAME: &str = "path";

pub fn installer() -> Installer {
    Installer::new(install)
}

fn install<'js>(ctx: &Ctx<'js>, registry: &Registry, require: &Require<'js>) -> rquickjs::Result<()> {
    registry.register_builtin(MODULE_NAME, NativeModule::new(load));
    js::bind_global(ctx, require, MODULE_NAME, "path")
}

fn load<'js>(ctx: &Ctx<'js>, module: &Object<'js>, _require: &Function<'js>) -> rquickjs::Result<()> {
    let exports = js::exports(module)?;

    exports.set(
        "dirname",
        Function::new(ctx.clone(), |path: String| posix::dirname(&path))?.with_name("dirname")?,
    )?;
    exports.set(
        "basename",
        Function::new(ctx.clone(), |path: String, suffix: Opt<String>| {
            posix::basename(&path, suffix.0.as_deref())
        })?
        .with_name("basename")?,
    )?;
    exports.set(
        "extname",
        Function::new(ctx.clone(), |path: String| posix::extname(&path))?.with_name("extname")?,
    )?;
    exports.set(
        "resolve",
        Function::new(ctx.clone(), |segments: Rest<String>| posix::resolve(&segments.0))?
            .with_name("resolve")?,
    )?;
    exports.set(
        "join",
        Function::new(ctx.clone(), |segments: Rest<String>| posix::join(&segments.0))?
            .with_name("join")?,
    )?;
    exports.set(
        "normalize",
        Function::new(ctx.clone(), |path: String| normalize(&path))?.with_name("normalize")?,
    )?;
    exports.set(
        "relative",
        Function::new(ctx.clone(), |from: String, to: String| relative(&from, &to))?
            .with_name("relative")?,
    )?;
    exports.set(
        "isAbsolute",
        Function::new(ctx.clone(), |path: String| posix::is_absolute(&path))?
            .with_name("isAbsolute")?,
    )?;
    exports.set("sep", posix::SEPARATOR.to_string())?;
    exports.set("delimiter", posix::DELIMITER.to_string())?;
    exports.set("posix", exports.clone())?;

    Ok(())
}

/// Like [`posix::clean`], but keeps a trailing separator.
fn normalize(path: &str) -> String {
    let cleaned = posix::clean(path);
    if path.len() > 1 && path.ends_with(posix::SEPARATOR) && cleaned != "/" {
        format!("{cleaned}/")
    } else {
        cleaned
    }
}

/// Node's `path.relative`: an empty string for identical paths, the
/// target itself when no relative form exists.
fn relative(from: &str, to: &str) -> String {
    let from = posix::resolve(&[from]);
    let to = posix::resolve(&[to]);
    match posix::relative(&from, &to) {
        Ok(rel) if rel == "." => String::new(),
        Ok(rel) => rel,
        Err(_) => to,
    }
}
