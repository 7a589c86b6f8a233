//! JSON output formatter

use miette::{IntoDiagnostic, Result};
use rspectral_core::Violation;

pub fn output_json(output: &[Violation]) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(output).into_diagnostic()?);
    Ok(())
}
