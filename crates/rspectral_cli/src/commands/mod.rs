mod lint;
mod modules;

pub use lint::run_lint;
pub use modules::run_modules;
