//! Modules command implementation

use miette::Result;
use rspectral_core::{STUB_MODULES, enables};

pub fn run_modules() -> Result<()> {
    for enable in enables() {
        if STUB_MODULES.contains(&enable.name) {
            println!("{} (stub)", enable.name);
        } else {
            println!("{}", enable.name);
        }
    }
    Ok(())
}
