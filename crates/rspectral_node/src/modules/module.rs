//! `module` shim: `createRequire`.

use rquickjs::{Ctx, Function, Object};

use crate::js;
use crate::registry::{Installer, NativeModule, Registry, Require};

pub const MODULE_NAME: &str = "module";

// Module names are global to the engine, so every created require is the
// engine's own.
const CREATE_REQUIRE_SOURCE: &str = r#"(function (require) {
    return function createRequire(filename) {
        return require;
    };
})"#;

pub fn installer() -> Installer {
    Installer::new(install)
}

fn install<'js>(ctx: &Ctx<'js>, registry: &Registry, require: &Require<'js>) -> rquickjs::Result<()> {
    registry.register_builtin(MODULE_NAME, NativeModule::new(load));
    js::bind_global(ctx, require, MODULE_NAME, "module")
}

fn load<'js>(ctx: &Ctx<'js>, module: &Object<'js>, require: &Function<'js>) -> rquickjs::Result<()> {
    let create_require: Function =
        js::glue(ctx, "node:module", CREATE_REQUIRE_SOURCE, (require.clone(),))?;
    js::exports(module)?.set("createRequire", create_require)
}
