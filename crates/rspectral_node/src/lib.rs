//! # rspectral_node
//!
//! Node.js built-in module emulation for an embedded QuickJS engine.
//!
//! This crate provides:
//! - A per-engine module [`Registry`] with a CommonJS style `require`
//! - Shim modules (`fs`, `process`, `path`, `stream`, `events`, ...) covering
//!   the subset of Node.js used by webpack bundles targeting `node`
//! - A [`ResolutionContext`] that routes guest file access through an
//!   optional [`VirtualFs`] before falling back to the real filesystem
//!
//! ## Architecture
//!
//! Every shim exposes an [`Installer`]. Installing a shim registers its
//! loader under the bare name (`fs`) and the namespaced name (`node:fs`);
//! both resolve to the same cached exports object. Shims that need host
//! resources (`fs`, `process`) are built from an explicit context, their
//! default installers refuse to run without one.
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::rc::Rc;
//! use rspectral_node::{Registry, SourceLoader, modules};
//!
//! context.with(|ctx| {
//!     let registry = Rc::new(Registry::new(SourceLoader::disk()));
//!     let require = rspectral_node::enable(&registry, &ctx)?;
//!     modules::path::installer().install(&ctx, &registry, &require)?;
//!     let path: rquickjs::Object = require.require("node:path")?;
//!     Ok::<_, rquickjs::Error>(())
//! })?;
//! ```

mod error;
mod js;
pub mod modules;
pub mod posix;
mod registry;
mod resolve;
mod vfs;

#[cfg(test)]
mod test_utils;

pub use error::ShimError;
pub use registry::{
    Installer, LOADER_FUNCTION, NAMESPACE_PREFIX, NativeModule, REQUIRE_FILENAME, Registry,
    Require, SourceLoader, UNRESOLVED_MODULE_PROPERTY, enable,
};
pub use resolve::{FileKind, FileStat, ResolutionContext};
pub use vfs::{DirFs, MemoryFs, VirtualFs, VirtualMetadata};
