//! Node.js built-in shims.
//!
//! Each shim exposes `MODULE_NAME` and an installer. Installers register
//! the module under its bare and `node:` names and, where Node has one,
//! bind the matching global.

pub mod buffer;
pub mod console;
pub mod events;
pub mod fs;
pub mod global;
pub mod module;
pub mod os;
pub mod path;
pub mod process;
pub mod stream;
pub mod stub;
pub mod tty;
pub mod url;
pub mod util;

/// Built-ins the bundle imports without using their exports.
pub const STUB_MODULES: &[&str] = &[
    "http",
    "https",
    "zlib",
    "vm",
    "perf_hooks",
    "crypto",
    "assert",
    "constants",
    "punycode",
];
