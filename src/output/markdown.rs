//! Markdown import report generation
//!
//! The report lists the job outcome, the summary statistics, per-stage
//! timings and every error entry of the job log.

use crate::importer::{ImportOutcome, ImportSummary};
use crate::joblog::LogKind;
use crate::output::{OutputError, OutputResult};
use crate::pipeline::{StageStatus, SummaryStats};
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Categories always shown, in this order, even when zero
const REPORTED_CATEGORIES: &[(&str, &str)] = &[
    (SummaryStats::PAGES, "Pages cataloged"),
    (SummaryStats::INTERNAL_LINKS, "Internal links"),
    (SummaryStats::FILES, "Files downloaded"),
    (SummaryStats::STYLESHEETS, "Stylesheets downloaded"),
    (SummaryStats::ERRORS, "Errors"),
];

/// Writes the markdown report for an import
///
/// # Arguments
///
/// * `summary` - The finished import
/// * `output_path` - Path where the markdown file should be written
///
/// # Returns
///
/// * `Ok(())` - Successfully wrote the report
/// * `Err(OutputError)` - Failed to write the report
pub fn write_import_report(summary: &ImportSummary, output_path: &Path) -> OutputResult<()> {
    let markdown = format_import_report(summary);

    if let Some(parent) = output_path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            return Err(OutputError::Write(format!(
                "directory {} does not exist",
                parent.display()
            )));
        }
    }

    let mut file = File::create(output_path)?;
    file.write_all(markdown.as_bytes())?;

    Ok(())
}

/// Formats an import summary as markdown
pub fn format_import_report(summary: &ImportSummary) -> String {
    let mut md = String::new();

    md.push_str(&format!("# Site Import: {}\n\n", summary.site_name));

    md.push_str("## Job Information\n\n");
    md.push_str(&format!("- **Job ID**: {}\n", summary.job_id));
    md.push_str(&format!("- **Seed URL**: {}\n", summary.seed_url));
    md.push_str(&format!("- **User**: {}\n", summary.user));
    md.push_str(&format!("- **Started**: {}\n", summary.started_at.to_rfc3339()));
    md.push_str(&format!("- **Finished**: {}\n", summary.finished_at.to_rfc3339()));
    md.push_str(&format!(
        "- **Duration**: {:.2} seconds\n",
        summary.duration_seconds()
    ));
    md.push_str(&format!("- **Outcome**: {}\n\n", summary.outcome));

    if let ImportOutcome::Failed { stage, message } = &summary.outcome {
        md.push_str("> The import was rolled back after the ");
        md.push_str(&format!("`{}` stage failed: {}\n\n", stage, message));
    }

    md.push_str("## Summary Statistics\n\n");
    md.push_str("| Category | Count |\n");
    md.push_str("|----------|-------|\n");
    for (category, label) in REPORTED_CATEGORIES {
        md.push_str(&format!("| {} | {} |\n", label, summary.stat(category)));
    }
    md.push('\n');

    md.push_str("## Page Commits\n\n");
    md.push_str(&format!("- **Imported**: {}\n", summary.pages_imported));
    md.push_str(&format!("- **Still pending**: {}\n", summary.pages_pending));
    md.push_str(&format!(
        "- **All commits finished**: {}\n\n",
        if summary.commits_drained { "yes" } else { "no" }
    ));

    if !summary.timings.is_empty() {
        md.push_str("## Stage Timings\n\n");
        md.push_str("| Stage | Status | Time (ms) |\n");
        md.push_str("|-------|--------|-----------|\n");
        for timing in &summary.timings {
            let status = match timing.status {
                StageStatus::Succeeded => "ok",
                StageStatus::Skipped => "skipped",
                StageStatus::Failed => "failed",
            };
            md.push_str(&format!(
                "| {} | {} | {} |\n",
                timing.stage,
                status,
                timing.elapsed.as_millis()
            ));
        }
        md.push('\n');
    }

    let errors: Vec<_> = summary
        .log
        .iter()
        .filter(|m| m.kind == LogKind::Error)
        .collect();
    if !errors.is_empty() {
        md.push_str(&format!("## Errors ({})\n\n", errors.len()));
        for entry in errors {
            md.push_str(&format!("- `{}` {}\n", entry.category, entry.text));
        }
        md.push('\n');
    }

    md.push_str("---\n\n");
    md.push_str(&format!(
        "*Generated by site-import v{}*\n",
        env!("CARGO_PKG_VERSION")
    ));

    md
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::joblog::LogMessage;
    use crate::pipeline::StageTiming;
    use chrono::Utc;
    use std::collections::BTreeMap;
    use std::time::Duration;
    use tempfile::TempDir;

    fn summary(outcome: ImportOutcome) -> ImportSummary {
        let mut stats = BTreeMap::new();
        stats.insert(SummaryStats::PAGES.to_string(), 2);
        stats.insert(SummaryStats::INTERNAL_LINKS.to_string(), 3);
        stats.insert(SummaryStats::FILES.to_string(), 2);

        ImportSummary {
            job_id: "docs-1".to_string(),
            site_name: "docs".to_string(),
            seed_url: "http://example.com/".to_string(),
            user: "tester".to_string(),
            outcome,
            stats,
            pages_imported: 3,
            pages_pending: 0,
            commits_drained: true,
            timings: vec![StageTiming {
                stage: "links",
                elapsed: Duration::from_millis(12),
                status: StageStatus::Succeeded,
            }],
            started_at: Utc::now(),
            finished_at: Utc::now(),
            log: vec![LogMessage {
                kind: LogKind::Error,
                category: "links".to_string(),
                text: "http://example.com/missing: HTTP 404".to_string(),
                at: Utc::now(),
            }],
        }
    }

    #[test]
    fn test_report_contains_stats_and_errors() {
        let md = format_import_report(&summary(ImportOutcome::Completed));

        assert!(md.contains("# Site Import: docs"));
        assert!(md.contains("| Pages cataloged | 2 |"));
        assert!(md.contains("| Internal links | 3 |"));
        assert!(md.contains("| Stylesheets downloaded | 0 |"));
        assert!(md.contains("| links | ok | 12 |"));
        assert!(md.contains("## Errors (1)"));
    }

    #[test]
    fn test_failed_outcome_is_explained() {
        let md = format_import_report(&summary(ImportOutcome::Failed {
            stage: "site".to_string(),
            message: "Illegal state: a site named docs already exists".to_string(),
        }));
        assert!(md.contains("rolled back"));
        assert!(md.contains("`site`"));
    }

    #[test]
    fn test_write_report() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("report.md");

        write_import_report(&summary(ImportOutcome::Completed), &path).unwrap();

        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.starts_with("# Site Import: docs"));
    }

    #[test]
    fn test_write_report_missing_directory() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("missing").join("report.md");

        let result = write_import_report(&summary(ImportOutcome::Completed), &path);
        assert!(matches!(result, Err(OutputError::Write(_))));
    }
}
