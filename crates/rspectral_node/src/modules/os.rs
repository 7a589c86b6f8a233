//! `os` shim: platform information.

use std::env;

use rquickjs::{Ctx, Function, Object};

use crate::js;
use crate::registry::{Installer, NativeModule, Registry, Require};

pub const MODULE_NAME: &str = "os";

pub fn installer() -> Installer {
    Installer::new(install)
}

fn install<'js>(ctx: &Ctx<'js>, registry: &Registry, require: &Require<'js>) -> rquickjs::Result<()> {
    registry.register_builtin(MODULE_NAME, NativeModule::new(load));
    js::bind_global(ctx, require, MODULE_NAME, "os")
}

/// Node's name for the host platform.
pub fn platform() -> &'static str {
    match env::consts::OS {
        "macos" => "darwin",
        "windows" => "win32",
        other => other,
    }
}

/// Node's name for the host architecture.
pub fn arch() -> &'static str {
    match env::consts::ARCH {
        "x86_64" => "x64",
        "x86" => "ia32",
        "aarch64" => "arm64",
        other => other,
    }
}

fn load<'js>(ctx: &Ctx<'js>, module: &Object<'js>, _require: &Function<'js>) -> rquickjs::Result<()> {
    let exports = js::exports(module)?;

    exports.set("platform", Function::new(ctx.clone(), platform)?.with_name("platform")?)?;
    exports.set("arch", Function::new(ctx.clone(), arch)?.with_name("arch")?)?;
    exports.set(
        "type",
        Function::new(ctx.clone(), || match platform() {
            "darwin" => "Darwin",
            "win32" => "Windows_NT",
            _ => "Linux",
        })?
        .with_name("type")?,
    )?;
    exports.set(
        "cpus",
        Function::new(ctx.clone(), |ctx: Ctx<'js>| cpus(&ctx))?.with_name("cpus")?,
    )?;
    exports.set(
        "tmpdir",
        Function::new(ctx.clone(), || env::temp_dir().to_string_lossy().into_owned())?
            .with_name("tmpdir")?,
    )?;
    exports.set(
        "homedir",
        Function::new(ctx.clone(), || {
            dirs::home_dir()
                .map(|home| home.to_string_lossy().into_owned())
                .unwrap_or_default()
        })?
        .with_name("homedir")?,
    )?;
    exports.set("EOL", "\n")?;

    Ok(())
}

/// A single virtual CPU.
fn cpus<'js>(ctx: &Ctx<'js>) -> rquickjs::Result<Vec<Object<'js>>> {
    let times = Object::new(ctx.clone())?;
    times.set("user", 1)?;
    times.set("nice", 0)?;
    times.set("sys", 1)?;
    times.set("idle", 0)?;
    times.set("irq", 0)?;

    let cpu = Object::new(ctx.clone())?;
    cpu.set("model", "vCPU")?;
    cpu.set("speed", 2000)?;
    cpu.set("times", times)?;

    Ok(vec![cpu])
}
