//! `global` shim: Node's `global` alias of the global object.

use rquickjs::{Ctx, Function, Object};

use crate::js;
use crate::registry::{Installer, NativeModule, Registry, Require};

pub const MODULE_NAME: &str = "global";

pub fn installer() -> Installer {
    Installer::new(install)
}

fn install<'js>(ctx: &Ctx<'js>, registry: &Registry, require: &Require<'js>) -> rquickjs::Result<()> {
    registry.register_builtin(MODULE_NAME, NativeModule::new(load));
    let exports: Object = require.require(MODULE_NAME)?;
    let global: Object = exports.get("global")?;
    ctx.globals().set("global", global)
}

fn load<'js>(ctx: &Ctx<'js>, module: &Object<'js>, _require: &Function<'js>) -> rquickjs::Result<()> {
    js::exports(module)?.set("global", ctx.globals())
}
