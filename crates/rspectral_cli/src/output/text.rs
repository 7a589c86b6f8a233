//! Text output formatter

use std::collections::BTreeMap;

use rspectral_core::{Severity, Violation};

pub fn output_text(output: &[Violation]) {
    let mut by_source: BTreeMap<&str, Vec<&Violation>> = BTreeMap::new();
    for violation in output {
        by_source
            .entry(violation.source.as_str())
            .or_default()
            .push(violation);
    }

    for (source, violations) in &by_source {
        if source.is_empty() {
            println!("\n<ruleset>:");
        } else {
            println!("\n{}:", source);
        }
        for violation in violations {
            println!("{}", format_violation(violation));
        }
    }

    let errors = output.iter().filter(|v| v.severity == Severity::Error).count();
    println!();
    println!(
        "Found {} problems ({} errors, {} other)",
        output.len(),
        errors,
        output.len() - errors
    );
}

/// `  <line>:<character> <severity> <code> <message> (<path>)`, with
/// one-based line and character.
fn format_violation(violation: &Violation) -> String {
    let start = violation.range.start;
    format!(
        "  {}:{} {} {} {} ({})",
        start.line + 1,
        start.character + 1,
        violation.severity.as_str(),
        violation.code,
        violation.message,
        violation.path.join(".")
    )
}
