//! `tty` shim: nothing is a terminal.

use rquickjs::function::Opt;
use rquickjs::{Ctx, Function, Object, Value};

use crate::js;
use crate::registry::{Installer, NativeModule, Registry, Require};

pub const MODULE_NAME: &str = "tty";

pub fn installer() -> Installer {
    Installer::new(install)
}

fn install<'js>(ctx: &Ctx<'js>, registry: &Registry, require: &Require<'js>) -> rquickjs::Result<()> {
    registry.register_builtin(MODULE_NAME, NativeModule::new(load));
    js::bind_global(ctx, require, MODULE_NAME, "tty")
}

fn load<'js>(ctx: &Ctx<'js>, module: &Object<'js>, _require: &Function<'js>) -> rquickjs::Result<()> {
    js::exports(module)?.set(
        "isatty",
        Function::new(ctx.clone(), |_fd: Opt<Value<'js>>| false)?.with_name("isatty")?,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::with_modules;

    #[test]
    fn test_isatty_is_false() {
        with_modules(&[installer()], |ctx, _require| {
            let tty: bool = ctx.eval("require('node:tty').isatty(1) || tty.isatty()").unwrap();
            assert!(!tty);
        });
    }
}
