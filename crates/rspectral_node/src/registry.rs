//! Per-engine module registry and CommonJS `require`.
//!
//! The registry itself holds only host data: native loaders, namespace
//! aliases, the source loader and the sources it evaluated. The exports
//! cache lives inside the guest `require` closure so that every guest
//! value stays visible to the engine's garbage collector.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::io;
use std::rc::Rc;

use rquickjs::function::This;
use rquickjs::{Ctx, FromJs, Function, Object, Value};
use tracing::debug;

use crate::js;
use crate::posix;

/// Prefix of the namespaced built-in module names (`node:fs`).
pub const NAMESPACE_PREFIX: &str = "node:";

/// File name under which the guest `require` function is evaluated.
pub const REQUIRE_FILENAME: &str = "node:internal/require";

/// Name of the native function that loads a module on behalf of `require`.
pub const LOADER_FUNCTION: &str = "load";

/// Property set on the error thrown for an unresolved module.
pub const UNRESOLVED_MODULE_PROPERTY: &str = "moduleName";

const REQUIRE_SOURCE: &str = r#"(function (resolve, load) {
    const cache = Object.create(null);
    function require(name) {
        const id = resolve(String(name));
        const cached = cache[id];
        if (cached !== undefined) {
            return cached.exports;
        }
        const module = { id: id, exports: {}, loaded: false };
        cache[id] = module;
        try {
            load(id, module, require);
        } catch (e) {
            delete cache[id];
            throw e;
        }
        module.loaded = true;
        return module.exports;
    }
    require.cache = cache;
    return require;
})"#;

type NativeLoad = dyn for<'js> Fn(&Ctx<'js>, &Object<'js>, &Function<'js>) -> rquickjs::Result<()>;

/// Loader of a native module.
///
/// Receives the module object (whose `exports` it fills or replaces) and the
/// guest `require` function.
#[derive(Clone)]
pub struct NativeModule(Rc<NativeLoad>);

impl NativeModule {
    pub fn new<F>(load: F) -> Self
    where
        F: for<'js> Fn(&Ctx<'js>, &Object<'js>, &Function<'js>) -> rquickjs::Result<()> + 'static,
    {
        Self(Rc::new(load))
    }

    fn load<'js>(
        &self,
        ctx: &Ctx<'js>,
        module: &Object<'js>,
        require: &Function<'js>,
    ) -> rquickjs::Result<()> {
        (self.0)(ctx, module, require)
    }
}

impl fmt::Debug for NativeModule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("NativeModule")
    }
}

type Install = dyn for<'js> Fn(&Ctx<'js>, &Registry, &Require<'js>) -> rquickjs::Result<()>;

/// Installs a shim module into a registry.
#[derive(Clone)]
pub struct Installer(Rc<Install>);

impl Installer {
    pub fn new<F>(install: F) -> Self
    where
        F: for<'js> Fn(&Ctx<'js>, &Registry, &Require<'js>) -> rquickjs::Result<()> + 'static,
    {
        Self(Rc::new(install))
    }

    /// Runs the installer against a live engine.
    pub fn install<'js>(
        &self,
        ctx: &Ctx<'js>,
        registry: &Registry,
        require: &Require<'js>,
    ) -> rquickjs::Result<()> {
        (self.0)(ctx, registry, require)
    }
}

impl fmt::Debug for Installer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Installer")
    }
}

/// Supplies the source text of non-native modules.
pub struct SourceLoader(Box<dyn Fn(&str) -> io::Result<Vec<u8>>>);

impl SourceLoader {
    pub fn new<F>(load: F) -> Self
    where
        F: Fn(&str) -> io::Result<Vec<u8>> + 'static,
    {
        Self(Box::new(load))
    }

    /// Reads module sources from disk, trying a `.js` suffix when the name
    /// has none.
    pub fn disk() -> Self {
        Self::new(|name| match fs::read(name) {
            Err(e) if e.kind() == io::ErrorKind::NotFound && !name.ends_with(".js") => {
                fs::read(format!("{name}.js"))
            }
            other => other,
        })
    }

    /// Resolves no source module at all.
    pub fn none() -> Self {
        Self::new(|name| {
            Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("no source for module '{name}'"),
            ))
        })
    }

    pub fn load(&self, name: &str) -> io::Result<Vec<u8>> {
        (self.0)(name)
    }
}

impl fmt::Debug for SourceLoader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SourceLoader")
    }
}

/// Module registry of a single engine instance.
#[derive(Debug)]
pub struct Registry {
    natives: RefCell<HashMap<String, NativeModule>>,
    aliases: RefCell<HashMap<String, String>>,
    source_loader: SourceLoader,
    sources: RefCell<HashMap<String, Rc<str>>>,
}

impl Registry {
    pub fn new(source_loader: SourceLoader) -> Self {
        Self {
            natives: RefCell::new(HashMap::new()),
            aliases: RefCell::new(HashMap::new()),
            source_loader,
            sources: RefCell::new(HashMap::new()),
        }
    }

    /// Registers a native module under exactly `name`.
    pub fn register_native(&self, name: &str, module: NativeModule) {
        debug!(module = name, "registering native module");
        self.natives.borrow_mut().insert(name.to_string(), module);
    }

    /// Registers a built-in under its bare name and its namespaced alias.
    pub fn register_builtin(&self, name: &str, module: NativeModule) {
        self.register_native(name, module);
        self.aliases
            .borrow_mut()
            .insert(format!("{NAMESPACE_PREFIX}{name}"), name.to_string());
    }

    /// Maps a requested name to the name its exports are cached under.
    pub fn resolve(&self, name: &str) -> String {
        self.aliases
            .borrow()
            .get(name)
            .cloned()
            .unwrap_or_else(|| name.to_string())
    }

    /// Returns `true` if `name` (or its alias target) has a native loader.
    pub fn is_registered(&self, name: &str) -> bool {
        self.natives.borrow().contains_key(&self.resolve(name))
    }

    /// Records source text evaluated under `name`.
    pub fn record_source(&self, name: &str, source: &str) {
        self.sources
            .borrow_mut()
            .insert(name.to_string(), Rc::from(source));
    }

    /// Source text recorded for `name`.
    pub fn source(&self, name: &str) -> Option<Rc<str>> {
        self.sources.borrow().get(name).cloned()
    }

    /// The 1-based `line` of the source recorded for `name`.
    pub fn source_line(&self, name: &str, line: usize) -> Option<String> {
        let source = self.source(name)?;
        source
            .lines()
            .nth(line.checked_sub(1)?)
            .map(str::to_string)
    }

    fn load<'js>(
        &self,
        ctx: &Ctx<'js>,
        name: &str,
        module: &Object<'js>,
        require: &Function<'js>,
    ) -> rquickjs::Result<()> {
        let native = self.natives.borrow().get(name).cloned();
        if let Some(native) = native {
            return native.load(ctx, module, require);
        }

        match self.source_loader.load(name) {
            Ok(bytes) => {
                let source = String::from_utf8_lossy(&bytes);
                self.evaluate(ctx, name, &source, module, require)
            }
            Err(e) => {
                debug!(module = name, "module not found: {}", e);
                Err(js::throw_error(
                    ctx,
                    &format!("Cannot find module '{name}'"),
                    &[
                        ("code", "MODULE_NOT_FOUND"),
                        (UNRESOLVED_MODULE_PROPERTY, name),
                    ],
                ))
            }
        }
    }

    fn evaluate<'js>(
        &self,
        ctx: &Ctx<'js>,
        name: &str,
        source: &str,
        module: &Object<'js>,
        require: &Function<'js>,
    ) -> rquickjs::Result<()> {
        debug!(module = name, bytes = source.len(), "evaluating source module");
        self.record_source(name, source);

        // The wrapper opens on the first line so guest line numbers match.
        let wrapped =
            format!("(function (exports, require, module, __filename, __dirname) {{ {source}\n}})");
        let wrapper: Function = ctx.eval_with_options(wrapped, js::eval_options(name))?;
        let exports: Value = module.get("exports")?;

        wrapper.call::<_, ()>((
            This(exports.clone()),
            exports,
            require.clone(),
            module.clone(),
            name,
            posix::dirname(name),
        ))
    }
}

/// Handle to the guest `require` function of an engine.
#[derive(Clone)]
pub struct Require<'js> {
    function: Function<'js>,
}

impl<'js> Require<'js> {
    /// Requires `name` and converts its exports.
    pub fn require<T: FromJs<'js>>(&self, name: &str) -> rquickjs::Result<T> {
        self.function.call((name,))
    }

    /// The guest function itself.
    pub fn function(&self) -> &Function<'js> {
        &self.function
    }
}

/// Enables `require` on the engine: creates the guest function backed by
/// `registry` and binds it as the global `require`.
pub fn enable<'js>(registry: &Rc<Registry>, ctx: &Ctx<'js>) -> rquickjs::Result<Require<'js>> {
    let resolver = Rc::clone(registry);
    let resolve = Function::new(ctx.clone(), move |name: String| resolver.resolve(&name))?
        .with_name("resolve")?;

    let loader = Rc::clone(registry);
    let load = Function::new(
        ctx.clone(),
        move |ctx: Ctx<'js>, name: String, module: Object<'js>, require: Function<'js>| {
            loader.load(&ctx, &name, &module, &require)
        },
    )?
    .with_name(LOADER_FUNCTION)?;

    let factory: Function = ctx.eval_with_options(REQUIRE_SOURCE, js::eval_options(REQUIRE_FILENAME))?;
    let function: Function = factory.call((resolve, load))?;
    ctx.globals().set("require", function.clone())?;

    Ok(Require { function })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::with_engine;
    use pretty_assertions::assert_eq;
    use rquickjs::CatchResultExt;

    fn counter_module() -> NativeModule {
        NativeModule::new(|ctx, module, _require| {
            let exports = js::exports(module)?;
            let globals = ctx.globals();
            let loads: i32 = globals.get::<_, Option<i32>>("loads")?.unwrap_or(0) + 1;
            globals.set("loads", loads)?;
            exports.set("value", 42)?;
            Ok(())
        })
    }

    #[test]
    fn test_builtin_resolves_both_names_to_one_exports() {
        with_engine(SourceLoader::none(), |ctx, registry, _require| {
            registry.register_builtin("answer", counter_module());

            let same: bool = ctx
                .eval("require('answer') === require('node:answer')")
                .unwrap();
            let loads: i32 = ctx.globals().get("loads").unwrap();
            let value: i32 = ctx.eval("require('node:answer').value").unwrap();

            assert!(same);
            assert_eq!(loads, 1);
            assert_eq!(value, 42);
        });
    }

    #[test]
    fn test_source_module_is_wrapped_and_recorded() {
        let loader = SourceLoader::new(|name| match name {
            "./lib/answer.js" => {
                Ok(b"module.exports = { dir: __dirname, file: __filename };".to_vec())
            }
            _ => Err(io::Error::from(io::ErrorKind::NotFound)),
        });

        with_engine(loader, |_ctx, registry, require| {
            let exports: Object = require.require("./lib/answer.js").unwrap();
            let dir: String = exports.get("dir").unwrap();
            let file: String = exports.get("file").unwrap();

            assert_eq!(dir, "./lib");
            assert_eq!(file, "./lib/answer.js");
            assert!(registry.source("./lib/answer.js").is_some());
            assert_eq!(
                registry.source_line("./lib/answer.js", 1).as_deref(),
                Some("module.exports = { dir: __dirname, file: __filename };")
            );
            assert_eq!(registry.source_line("./lib/answer.js", 0), None);
        });
    }

    #[test]
    fn test_unresolved_module_throws_with_name() {
        with_engine(SourceLoader::none(), |ctx, _registry, _require| {
            let code: String = ctx
                .eval(
                    "(function () { try { require('left-pad'); } catch (e) { return e.code + ' ' + e.moduleName + ' ' + e.message; } })()",
                )
                .unwrap();

            assert_eq!(
                code,
                "MODULE_NOT_FOUND left-pad Cannot find module 'left-pad'"
            );
        });
    }

    #[test]
    fn test_failed_load_is_retried() {
        let loader = SourceLoader::new(|name| match name {
            "flaky" => Ok(b"globalThis.attempts = (globalThis.attempts || 0) + 1; if (globalThis.attempts === 1) { throw new Error('first'); } exports.ok = true;".to_vec()),
            _ => Err(io::Error::from(io::ErrorKind::NotFound)),
        });

        with_engine(loader, |ctx, _registry, require| {
            let first = require.require::<Object>("flaky").catch(ctx);
            assert!(first.is_err());

            let ok: bool = ctx.eval("require('flaky').ok").unwrap();
            assert!(ok);
        });
    }
}
