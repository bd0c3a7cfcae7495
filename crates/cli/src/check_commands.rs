use std::{fmt::Write, path::Path};

use chattext_config::validate::{self, Diagnostic, Severity, ValidationResult};

const RED: &str = "\x1b[31m";
const YELLOW: &str = "\x1b[33m";
const CYAN: &str = "\x1b[36m";
const BOLD: &str = "\x1b[1m";
const RESET: &str = "\x1b[0m";

/// Validate the config file and print a report. Exits non-zero on errors.
pub fn check(config: Option<&Path>, verbose: bool) -> anyhow::Result<()> {
    let result = validate::validate(config);
    eprint!("{}", render_report(&result, verbose, true));
    if result.has_errors() {
        std::process::exit(1);
    }
    Ok(())
}

/// Worst diagnostics first; `Info` only when `verbose`.
fn render_report(result: &ValidationResult, verbose: bool, color: bool) -> String {
    let mut out = String::new();
    match &result.config_path {
        Some(path) => {
            let _ = writeln!(out, "Checking {}\n", path.display());
        },
        None => out.push_str("No config file found; checking defaults.\n\n"),
    }

    let mut shown: Vec<&Diagnostic> = result
        .diagnostics
        .iter()
        .filter(|d| verbose || d.severity != Severity::Info)
        .collect();
    shown.sort_by_key(|d| d.severity);

    for d in &shown {
        let (tint, label) = match d.severity {
            Severity::Error => (RED, "error"),
            Severity::Warning => (YELLOW, "warning"),
            Severity::Info => (CYAN, "info"),
        };
        let label = if color {
            format!("{BOLD}{tint}{label}{RESET}")
        } else {
            label.to_string()
        };
        let location = if d.path.is_empty() {
            String::new()
        } else {
            format!("{}: ", d.path)
        };
        let _ = writeln!(out, "  {label} [{}] {location}{}", d.category, d.message);
    }
    if !shown.is_empty() {
        out.push('\n');
    }

    let errors = result.count(Severity::Error);
    let warnings = result.count(Severity::Warning);
    if errors == 0 && warnings == 0 {
        out.push_str("No issues found.\n");
    } else {
        let _ = writeln!(out, "{errors} error(s), {warnings} warning(s)");
    }
    out
}
