//! Rendering of command results.

use crate::client::HealthReport;
use crate::CliError;
use hook_ledger_core::RetrievalResponse;

/// Output format options
#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text
    Text,
    /// JSON output
    Json,
}

/// Render a batch, one line per event in text mode
pub fn render_batch(batch: &RetrievalResponse, format: OutputFormat) -> Result<String, CliError> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(batch)?),
        OutputFormat::Text => {
            if batch.events.is_empty() {
                return Ok("No new events".to_string());
            }
            let lines: Vec<String> = batch
                .events
                .iter()
                .map(|event| format!("[{}] {}", event.id, event.describe()))
                .collect();
            Ok(lines.join("\n"))
        }
    }
}

pub fn render_health(report: &HealthReport, format: OutputFormat) -> Result<String, CliError> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(report)?),
        OutputFormat::Text => {
            let mut lines = vec![format!(
                "{} (HTTP {})",
                if report.healthy { "healthy" } else { "unhealthy" },
                report.status_code
            )];
            if let Some(version) = &report.version {
                lines.push(format!("version: {}", version));
            }

            let mut names: Vec<&String> = report.checks.keys().collect();
            names.sort();
            for name in names {
                let check = &report.checks[name];
                lines.push(format!(
                    "  {}: {} - {}",
                    name,
                    if check.healthy { "ok" } else { "failing" },
                    check.message
                ));
            }
            Ok(lines.join("\n"))
        }
    }
}

#[cfg(test)]
#[path = "output_tests.rs"]
mod tests;
