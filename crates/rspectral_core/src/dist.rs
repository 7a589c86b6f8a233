//! The embedded Spectral bundle.

use std::sync::{Arc, OnceLock};

use crate::config::LintOption;

/// Name under which the driver script requires the bundle.
pub const DIST_NAME: &str = "./dist/built.js";

/// `true` when a real bundle was embedded at build time. Otherwise the
/// embedded bundle throws as soon as it is required.
pub const BUNDLE_EMBEDDED: bool = cfg!(rspectral_bundle);

static EMBEDDED: &[u8] = include_bytes!(concat!(env!("OUT_DIR"), "/built.js"));
static DEFAULT_DIST: OnceLock<Arc<[u8]>> = OnceLock::new();

/// The bundle embedded at build time.
pub fn default_dist() -> Arc<[u8]> {
    Arc::clone(DEFAULT_DIST.get_or_init(|| Arc::from(EMBEDDED)))
}

/// Uses `dist` instead of the embedded bundle. It must assign `lint` and
/// `formatOutput` to its exports, like `bundle/index.js`.
pub fn with_dist(dist: impl Into<Arc<[u8]>>) -> LintOption {
    let dist = dist.into();
    LintOption::set(move |config| config.dist = dist)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    #[test]
    fn test_default_dist_is_shared() {
        let a = default_dist();
        let b = default_dist();
        assert!(Arc::ptr_eq(&a, &b));
        assert!(!a.is_empty());
    }

    #[test]
    fn test_with_dist_replaces_bundle() {
        let config = Config::with_options([with_dist(b"exports.lint = null;".to_vec())]).unwrap();
        assert_eq!(&*config.dist, b"exports.lint = null;");
    }
}
