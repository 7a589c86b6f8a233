//! Output formatting module

mod json;
mod text;

use miette::Result;
use rspectral_core::{Violation, has_errors};

use crate::cli::OutputFormat;

pub fn output_results(output: &[Violation], format: OutputFormat) -> Result<bool> {
    match format {
        OutputFormat::Json => json::output_json(output)?,
        OutputFormat::Text => text::output_text(output),
    }

    Ok(has_errors(output))
}
