//! Built-ins the bundle imports but never calls into.

use rquickjs::{Ctx, Function, Object};

use crate::registry::{Installer, NativeModule};

/// Registers `name` with empty exports.
pub fn installer(name: &'static str) -> Installer {
    Installer::new(move |_ctx, registry, _require| {
        registry.register_builtin(name, NativeModule::new(load));
        Ok(())
    })
}

fn load<'js>(_ctx: &Ctx<'js>, _module: &Object<'js>, _require: &Function<'js>) -> rquickjs::Result<()> {
    Ok(())
}
