//! `fs` shim over a [`ResolutionContext`].
//!
//! Callback-style operations complete synchronously: the callback runs
//! before the call returns. File contents are always decoded as UTF-8 text.
//! Failures reach the guest as Node-style errors (`code`, `syscall`,
//! `path`), never as host errors.

use std::io;
use std::rc::Rc;
use std::time::UNIX_EPOCH;

use rquickjs::function::{Opt, This};
use rquickjs::{Ctx, Exception, Function, Object, Value};
use tracing::debug;

use crate::js;
use crate::registry::{Installer, NativeModule, Registry, Require};
use crate::resolve::{FileKind, FileStat, ResolutionContext};

pub const MODULE_NAME: &str = "fs";

/// Installer bound to a resolution context.
pub fn installer(context: ResolutionContext) -> Installer {
    let context = Rc::new(context);
    Installer::new(move |ctx, registry, require| install(ctx, registry, require, Rc::clone(&context)))
}

/// The context-free installer. Installing it panics: the working directory
/// and filesystem must come from a before-module hook.
pub fn default_installer() -> Installer {
    Installer::new(|_ctx, _registry, _require| {
        panic!("fs module requires a working directory and filesystem; install it through a before-module hook")
    })
}

fn install<'js>(
    ctx: &Ctx<'js>,
    registry: &Registry,
    require: &Require<'js>,
    context: Rc<ResolutionContext>,
) -> rquickjs::Result<()> {
    debug!(
        working_directory = context.working_directory(),
        virtual_fs = context.has_virtual_fs(),
        "installing fs"
    );
    registry.register_builtin(
        MODULE_NAME,
        NativeModule::new(move |ctx, module, _require| load(ctx, module, &context)),
    );
    js::bind_global(ctx, require, MODULE_NAME, "fs")
}

#[derive(Debug, Clone, Copy)]
enum Syscall {
    Stat,
    Lstat,
}

impl Syscall {
    fn name(self) -> &'static str {
        match self {
            Self::Stat => "stat",
            Self::Lstat => "lstat",
        }
    }

    fn run(self, context: &ResolutionContext, path: &str) -> io::Result<FileStat> {
        match self {
            Self::Stat => context.stat(path),
            Self::Lstat => context.lstat(path),
        }
    }
}

fn load<'js>(
    ctx: &Ctx<'js>,
    module: &Object<'js>,
    context: &Rc<ResolutionContext>,
) -> rquickjs::Result<()> {
    let exports = js::exports(module)?;

    for (name, syscall) in [("stat", Syscall::Stat), ("lstat", Syscall::Lstat)] {
        let c = Rc::clone(context);
        exports.set(
            name,
            Function::new(ctx.clone(), move |ctx: Ctx<'js>, path: String, cb: Function<'js>| {
                let result = syscall.run(&c, &path);
                let result = match result {
                    Ok(stat) => Ok(stats(&ctx, &stat)?),
                    Err(e) => Err(js::io_error(&ctx, &e, syscall.name(), &path)?),
                };
                complete(&ctx, &cb, result)
            })?
            .with_name(name)?,
        )?;

        let c = Rc::clone(context);
        let sync_name = format!("{name}Sync");
        exports.set(
            sync_name.as_str(),
            Function::new(ctx.clone(), move |ctx: Ctx<'js>, path: String| {
                match syscall.run(&c, &path) {
                    Ok(stat) => stats(&ctx, &stat),
                    Err(e) => Err(throw(&ctx, js::io_error(&ctx, &e, syscall.name(), &path)?)),
                }
            })?
            .with_name(sync_name.as_str())?,
        )?;
    }

    let c = Rc::clone(context);
    exports.set(
        "readFile",
        Function::new(
            ctx.clone(),
            move |ctx: Ctx<'js>, path: String, second: Value<'js>, third: Opt<Function<'js>>| {
                let cb = match third.0 {
                    Some(cb) => cb,
                    None => match second.into_function() {
                        Some(cb) => cb,
                        None => {
                            return Err(Exception::throw_type(
                                &ctx,
                                "fs.readFile: callback must be a function",
                            ));
                        }
                    },
                };
                let result = match read_text(&c, &path) {
                    Ok(text) => Ok(rquickjs::String::from_str(ctx.clone(), &text)?.into_value()),
                    Err(e) => Err(js::io_error(&ctx, &e, "open", &path)?),
                };
                complete(&ctx, &cb, result)
            },
        )?
        .with_name("readFile")?,
    )?;

    let c = Rc::clone(context);
    exports.set(
        "readFileSync",
        Function::new(
            ctx.clone(),
            move |ctx: Ctx<'js>, path: String, _options: Opt<Value<'js>>| match read_text(&c, &path) {
                Ok(text) => Ok(text),
                Err(e) => Err(throw(&ctx, js::io_error(&ctx, &e, "open", &path)?)),
            },
        )?
        .with_name("readFileSync")?,
    )?;

    let c = Rc::clone(context);
    exports.set(
        "existsSync",
        Function::new(ctx.clone(), move |path: String| c.stat(&path).is_ok())?
            .with_name("existsSync")?,
    )?;

    let promises = Object::new(ctx.clone())?;
    let c = Rc::clone(context);
    promises.set(
        "readFile",
        Function::new(
            ctx.clone(),
            move |ctx: Ctx<'js>, path: String, _options: Opt<Value<'js>>| {
                let promise: Object = ctx.globals().get("Promise")?;
                match read_text(&c, &path) {
                    Ok(text) => {
                        let resolve: Function = promise.get("resolve")?;
                        resolve.call::<_, Value>((This(promise.clone()), text))
                    }
                    Err(e) => {
                        let error = js::io_error(&ctx, &e, "open", &path)?;
                        let reject: Function = promise.get("reject")?;
                        reject.call::<_, Value>((This(promise.clone()), error))
                    }
                }
            },
        )?
        .with_name("readFile")?,
    )?;
    exports.set("promises", promises)?;

    let realpath = Function::new(ctx.clone(), |_path: Value<'js>| -> rquickjs::Result<()> {
        panic!("fs.realpath is not implemented")
    })?
    .with_name("realpath")?;
    realpath.set(
        "native",
        Function::new(ctx.clone(), |_path: Value<'js>| -> rquickjs::Result<()> {
            panic!("fs.realpath.native is not implemented")
        })?
        .with_name("native")?,
    )?;
    exports.set("realpath", realpath)?;

    Ok(())
}

fn read_text(context: &ResolutionContext, path: &str) -> io::Result<String> {
    let bytes = context.read(path)?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// Calls a Node-style callback with `(null, value)` or `(err, null)`.
fn complete<'js>(
    ctx: &Ctx<'js>,
    cb: &Function<'js>,
    result: Result<Value<'js>, Object<'js>>,
) -> rquickjs::Result<()> {
    let null = Value::new_null(ctx.clone());
    match result {
        Ok(value) => cb.call((null, value)),
        Err(error) => cb.call((error, null)),
    }
}

fn throw<'js>(ctx: &Ctx<'js>, error: Object<'js>) -> rquickjs::Error {
    ctx.throw(error.into_value())
}

/// Builds a guest `fs.Stats` object.
fn stats<'js>(ctx: &Ctx<'js>, stat: &FileStat) -> rquickjs::Result<Value<'js>> {
    let object = Object::new(ctx.clone())?;
    object.set("size", stat.size as f64)?;
    object.set("dev", 0)?;

    let mtime_ms = stat
        .modified
        .and_then(|modified| modified.duration_since(UNIX_EPOCH).ok())
        .map_or(0.0, |elapsed| elapsed.as_secs_f64() * 1000.0);
    object.set("mtimeMs", mtime_ms)?;

    let predicates: [(&str, FileKind); 7] = [
        ("isFile", FileKind::File),
        ("isDirectory", FileKind::Directory),
        ("isSymbolicLink", FileKind::Symlink),
        ("isBlockDevice", FileKind::BlockDevice),
        ("isCharacterDevice", FileKind::CharDevice),
        ("isFIFO", FileKind::Fifo),
        ("isSocket", FileKind::Socket),
    ];
    let kind = stat.kind;
    for (name, expected) in predicates {
        object.set(
            name,
            Function::new(ctx.clone(), move || kind == expected)?.with_name(name)?,
        )?;
    }

    Ok(object.into_value())
}
