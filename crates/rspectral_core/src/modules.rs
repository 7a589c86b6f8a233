//! Ordered installation of the Node.js shims with before/after hooks.

use std::fmt;
use std::rc::Rc;
use std::sync::Arc;

use rquickjs::Ctx;
use rspectral_node::modules::{
    self, buffer, console, events, fs, global, module, os, path, process, stream, stub, tty, url,
    util,
};
use rspectral_node::{Installer, Registry, Require, ResolutionContext, VirtualFs};
use tracing::{debug, info};

use crate::config::LintOption;
use crate::error::{HookError, LintError};
use crate::evaluate::EvaluateError;

/// A shim to enable, in installation order.
#[derive(Clone)]
pub struct Enable {
    pub name: &'static str,
    pub installer: Installer,
}

impl fmt::Debug for Enable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Enable").field("name", &self.name).finish()
    }
}

type BeforeFn =
    dyn for<'js> Fn(&Enable, &Ctx<'js>, &Registry, &Require<'js>) -> Result<Installer, HookError>;
type AfterFn = dyn for<'js> Fn(&str, &Ctx<'js>, &Registry, &Require<'js>) -> Result<(), HookError>;

/// Chooses the installer for each module before it is enabled.
pub type BeforeModule = Rc<BeforeFn>;

/// Runs after each module is enabled.
pub type AfterModule = Rc<AfterFn>;

/// The shims, in the order they are enabled.
///
/// `fs` and `process` need a working directory; their installers here
/// panic and must be replaced by a before-module hook.
pub fn enables() -> Vec<Enable> {
    let placeholder = |name: &'static str| Enable {
        name,
        installer: stub::installer(name),
    };

    vec![
        Enable { name: util::MODULE_NAME, installer: util::installer() },
        Enable { name: stream::MODULE_NAME, installer: stream::installer() },
        placeholder("http"),
        placeholder("https"),
        placeholder("zlib"),
        Enable { name: url::MODULE_NAME, installer: url::installer() },
        Enable { name: global::MODULE_NAME, installer: global::installer() },
        Enable { name: fs::MODULE_NAME, installer: fs::default_installer() },
        placeholder("vm"),
        Enable { name: console::MODULE_NAME, installer: console::installer() },
        Enable { name: process::MODULE_NAME, installer: process::default_installer() },
        Enable { name: module::MODULE_NAME, installer: module::installer() },
        placeholder("perf_hooks"),
        placeholder("crypto"),
        placeholder("assert"),
        Enable { name: path::MODULE_NAME, installer: path::installer() },
        Enable { name: os::MODULE_NAME, installer: os::installer() },
        Enable { name: buffer::MODULE_NAME, installer: buffer::installer() },
        Enable { name: tty::MODULE_NAME, installer: tty::installer() },
        placeholder("constants"),
        placeholder("punycode"),
        Enable { name: events::MODULE_NAME, installer: events::installer() },
    ]
}

/// Before-module hook supplying `fs` and `process` with the working
/// directory and optional virtual filesystem. Other modules keep their
/// installer.
pub fn default_before_module(
    working_directory: impl Into<String>,
    file_system: Option<Arc<dyn VirtualFs>>,
) -> BeforeModule {
    let working_directory = working_directory.into();
    before_module(move |enable, _ctx, _registry, _require| {
        Ok(match enable.name {
            process::MODULE_NAME => process::installer(working_directory.clone()),
            fs::MODULE_NAME => fs::installer(ResolutionContext::new(
                working_directory.clone(),
                file_system.clone(),
            )),
            _ => enable.installer.clone(),
        })
    })
}

/// Enables `require` and installs every shim of [`enables`] in order.
///
/// A hook failure aborts the load with the module's name. A guest
/// exception raised by an installer becomes [`LintError::Evaluate`].
pub fn load_modules<'js>(
    ctx: &Ctx<'js>,
    registry: &Rc<Registry>,
    before: Option<&BeforeModule>,
    after: Option<&AfterModule>,
) -> Result<Require<'js>, LintError> {
    info!("loading modules");
    let shared: &Registry = registry;
    let require = rspectral_node::enable(registry, ctx)
        .map_err(|e| LintError::Evaluate(EvaluateError::capture(ctx, registry, e)))?;

    for enable in enables() {
        let installer = match before {
            Some(before) => before(&enable, ctx, shared, &require).map_err(|source| {
                info!("failed to run BeforeModule hook for {}", enable.name);
                LintError::BeforeModule {
                    module: enable.name.to_string(),
                    source,
                }
            })?,
            None => enable.installer.clone(),
        };

        debug!(module = enable.name, "enabling module");
        installer
            .install(ctx, registry, &require)
            .map_err(|e| LintError::Evaluate(EvaluateError::capture(ctx, registry, e)))?;

        if let Some(after) = after {
            after(enable.name, ctx, shared, &require).map_err(|source| {
                info!("failed to run AfterModule hook for {}", enable.name);
                LintError::AfterModule {
                    module: enable.name.to_string(),
                    source,
                }
            })?;
        }
    }

    debug!(stubs = modules::STUB_MODULES.len(), "modules loaded");
    Ok(require)
}

/// Boxes a before-module hook.
pub fn before_module<F>(before: F) -> BeforeModule
where
    F: for<'js> Fn(&Enable, &Ctx<'js>, &Registry, &Require<'js>) -> Result<Installer, HookError>
        + 'static,
{
    Rc::new(before)
}

/// Boxes an after-module hook.
pub fn after_module<F>(after: F) -> AfterModule
where
    F: for<'js> Fn(&str, &Ctx<'js>, &Registry, &Require<'js>) -> Result<(), HookError> + 'static,
{
    Rc::new(after)
}

/// Sets the before-module hook. It replaces [`default_before_module`], so
/// it must supply `fs` and `process` itself (for example by delegating to
/// [`default_before_module`]).
pub fn with_before_module<F>(before: F) -> LintOption
where
    F: for<'js> Fn(&Enable, &Ctx<'js>, &Registry, &Require<'js>) -> Result<Installer, HookError>
        + 'static,
{
    let before = before_module(before);
    LintOption::set(move |config| config.before_module = Some(before))
}

/// Sets the after-module hook.
pub fn with_after_module<F>(after: F) -> LintOption
where
    F: for<'js> Fn(&str, &Ctx<'js>, &Registry, &Require<'js>) -> Result<(), HookError> + 'static,
{
    let after = after_module(after);
    LintOption::set(move |config| config.after_module = Some(after))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rquickjs::{Context, Runtime};
    use rspectral_node::SourceLoader;
    use std::cell::RefCell;

    fn with_context<R>(f: impl for<'js> FnOnce(&Ctx<'js>, &Rc<Registry>) -> R) -> R {
        let runtime = Runtime::new().unwrap();
        let context = Context::full(&runtime).unwrap();
        context.with(|ctx| {
            let registry = Rc::new(Registry::new(SourceLoader::none()));
            f(&ctx, &registry)
        })
    }

    #[test]
    fn test_enable_order() {
        let names: Vec<_> = enables().iter().map(|e| e.name).collect();
        assert_eq!(
            names,
            vec![
                "util", "stream", "http", "https", "zlib", "url", "global", "fs", "vm", "console",
                "process", "module", "perf_hooks", "crypto", "assert", "path", "os", "buffer",
                "tty", "constants", "punycode", "events",
            ]
        );
        for stub in modules::STUB_MODULES {
            assert!(names.contains(stub));
        }
    }

    #[test]
    fn test_default_hook_installs_everything() {
        with_context(|ctx, registry| {
            let before = default_before_module("/work", None);
            let visited = Rc::new(RefCell::new(Vec::new()));
            let seen = Rc::clone(&visited);
            let after = after_module(move |name, _ctx, registry, _require| {
                assert!(registry.is_registered(name));
                assert!(registry.is_registered(&format!("node:{name}")));
                seen.borrow_mut().push(name.to_string());
                Ok(())
            });

            load_modules(ctx, registry, Some(&before), Some(&after)).unwrap();

            assert_eq!(visited.borrow().len(), enables().len());
            let cwd: String = ctx.eval("process.cwd()").unwrap();
            assert_eq!(cwd, "/work");
        });
    }

    #[test]
    fn test_before_hook_failure_names_module() {
        with_context(|ctx, registry| {
            let before = before_module(|enable, _ctx, _registry, _require| {
                if enable.name == "url" {
                    return Err("no urls today".into());
                }
                Ok(enable.installer.clone())
            });

            let err = load_modules(ctx, registry, Some(&before), None).err().unwrap();
            match err {
                LintError::BeforeModule { module, source } => {
                    assert_eq!(module, "url");
                    assert_eq!(source.to_string(), "no urls today");
                }
                other => panic!("unexpected error: {other}"),
            }
            // Modules after the failing one are never installed.
            assert!(!registry.is_registered("events"));
        });
    }

    #[test]
    fn test_after_hook_failure_aborts() {
        with_context(|ctx, registry| {
            let before = default_before_module("/work", None);
            let after = after_module(|name, _ctx, _registry, _require| {
                if name == "stream" {
                    return Err("audit failed".into());
                }
                Ok(())
            });

            let err = load_modules(ctx, registry, Some(&before), Some(&after)).err().unwrap();
            assert!(matches!(err, LintError::AfterModule { ref module, .. } if module == "stream"));
            assert!(!registry.is_registered("http"));
        });
    }

    #[test]
    #[should_panic(expected = "requires a working directory")]
    fn test_missing_hook_panics_on_fs() {
        with_context(|ctx, registry| {
            let _ = load_modules(ctx, registry, None, None);
        });
    }
}
