//! Engine fixtures for shim tests.

use std::rc::Rc;

use rquickjs::{Context, Ctx, Runtime};

use crate::registry::{Installer, Registry, Require, SourceLoader, enable};

/// Runs `f` inside a fresh engine with `require` enabled.
pub fn with_engine<R>(
    loader: SourceLoader,
    f: impl for<'js> FnOnce(&Ctx<'js>, &Rc<Registry>, &Require<'js>) -> R,
) -> R {
    let runtime = Runtime::new().expect("Failed to create runtime");
    let context = Context::full(&runtime).expect("Failed to create context");
    context.with(|ctx| {
        let registry = Rc::new(Registry::new(loader));
        let require = enable(&registry, &ctx).expect("Failed to enable require");
        f(&ctx, &registry, &require)
    })
}

/// Runs `f` inside a fresh engine with the given shims installed.
pub fn with_modules<R>(
    installers: &[Installer],
    f: impl for<'js> FnOnce(&Ctx<'js>, &Require<'js>) -> R,
) -> R {
    with_engine(SourceLoader::none(), |ctx, registry, require| {
        for installer in installers {
            installer
                .install(ctx, registry, require)
                .expect("Failed to install module");
        }
        f(ctx, require)
    })
}
