//! `events` shim: an `EventEmitter` whose methods accept and ignore
//! listeners.

use rquickjs::function::{Rest, This};
use rquickjs::{Ctx, Function, Object, Value};

use crate::js;
use crate::registry::{Installer, NativeModule, Registry, Require};

pub const MODULE_NAME: &str = "events";

const CHAINING_METHODS: &[&str] = &[
    "on",
    "addListener",
    "prependListener",
    "once",
    "off",
    "removeListener",
    "removeAllListeners",
    "setMaxListeners",
];

pub fn installer() -> Installer {
    Installer::new(install)
}

fn install<'js>(ctx: &Ctx<'js>, registry: &Registry, require: &Require<'js>) -> rquickjs::Result<()> {
    registry.register_builtin(MODULE_NAME, NativeModule::new(load));
    js::bind_global(ctx, require, MODULE_NAME, "events")
}

fn load<'js>(ctx: &Ctx<'js>, module: &Object<'js>, _require: &Function<'js>) -> rquickjs::Result<()> {
    let init = Function::new(ctx.clone(), |_this: This<Value<'js>>| {})?;
    let emitter = js::constructor(ctx, "EventEmitter", init)?;
    let prototype: Object = emitter.get("prototype")?;

    for &name in CHAINING_METHODS {
        let method = Function::new(ctx.clone(), |this: This<Value<'js>>, _args: Rest<Value<'js>>| this.0)?
            .with_name(name)?;
        prototype.set(name, method)?;
    }
    prototype.set(
        "emit",
        Function::new(ctx.clone(), |_args: Rest<Value<'js>>| false)?.with_name("emit")?,
    )?;
    prototype.set(
        "listenerCount",
        Function::new(ctx.clone(), |_args: Rest<Value<'js>>| 0)?.with_name("listenerCount")?,
    )?;

    emitter.set("EventEmitter", emitter.clone())?;
    emitter.set("defaultMaxListeners", 10)?;
    module.set("exports", emitter)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::with_modules;

    #[test]
    fn test_emitter_methods_are_no_ops() {
        with_modules(&[installer()], |ctx, _require| {
            let ok: bool = ctx
                .eval(
                    r#"
                    var EventEmitter = require('node:events').EventEmitter;
                    var emitter = new EventEmitter();
                    emitter.setMaxListeners(20);
                    emitter.once('x', function () { throw new Error('never'); }) === emitter
                        && emitter.emit('x') === false
                        && emitter.off('x') === emitter
                        && require('events') === EventEmitter
                        && events === EventEmitter
                    "#,
                )
                .unwrap();
            assert!(ok);
        });
    }

    #[test]
    fn test_emitter_supports_prototype_inheritance() {
        with_modules(&[installer()], |ctx, _require| {
            let ok: bool = ctx
                .eval(
                    r#"
                    class Watcher extends require('events') {}
                    new Watcher().on('change', function () {}) instanceof Watcher
                    "#,
                )
                .unwrap();
            assert!(ok);
        });
    }
}
