use serde_json::Value;
use shears_engine::{BatchResult, ItemResult};
use std::io::Write;
use std::process::ExitCode;

/// Print `value` as JSON on stdout.
pub fn json(value: &impl serde::Serialize) -> miette::Result<()> {
    let rendered = serde_json::to_string_pretty(value).map_err(|e| miette::miette!("cannot render output: {e}"))?;
    let mut stdout = std::io::stdout().lock();
    writeln!(stdout, "{rendered}").map_err(|e| miette::miette!("cannot write output: {e}"))?;
    Ok(())
}

/// One line a person can read at a glance, with the reason for each failure.
pub fn summary(batch: &BatchResult) -> String {
    let mut lines = vec![format!("{} of {} succeeded", batch.succeeded(), batch.results.len())];
    lines.extend(batch.results.iter().filter(|r| !r.success).map(|r| {
        format!("  {}: {}", r.input_path.display(), r.error.as_deref().unwrap_or("unknown error"))
    }));
    lines.join("\n")
}

pub fn batch(batch: &BatchResult) -> miette::Result<ExitCode> {
    json(batch)?;
    eprintln!("{}", summary(batch));
    Ok(exit_code(batch.success))
}

pub fn item(item: &ItemResult) -> miette::Result<ExitCode> {
    json(item)?;
    if let Some(error) = &item.error {
        eprintln!("{}: {error}", item.input_path.display());
    }
    Ok(exit_code(item.success))
}

pub fn path(path: &std::path::Path) -> miette::Result<ExitCode> {
    json(&Value::String(path.display().to_string()))?;
    Ok(ExitCode::SUCCESS)
}

fn exit_code(success: bool) -> ExitCode {
    match success {
        true => ExitCode::SUCCESS,
        false => ExitCode::FAILURE,
    }
}
