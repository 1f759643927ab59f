//! Rendering of a finished ingest run

use std::collections::BTreeMap;
use std::fmt::Write;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use logscan_ingest::{IngestReport, RankedEntry};

/// Output format for the final report
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Serializable view of a report
#[derive(Debug, Serialize)]
struct ReportView<'a> {
    total_lines: u64,
    parsed_lines: u64,
    unparsed_lines: u64,
    levels: &'a BTreeMap<String, u64>,
    top_sources: Vec<RankedEntry>,
    top_messages: Vec<RankedEntry>,
    files: FilesView,
    elapsed_ms: u128,
    timed_out: bool,
}

#[derive(Debug, Serialize)]
struct FilesView {
    discovered: usize,
    complete: usize,
    partial: usize,
    failed: usize,
    problems: Vec<ProblemView>,
}

#[derive(Debug, Serialize)]
struct ProblemView {
    path: String,
    lines_read: u64,
    error: String,
}

fn problems(report: &IngestReport) -> Vec<ProblemView> {
    report
        .files
        .iter()
        .filter_map(|f| {
            f.error().map(|e| ProblemView {
                path: f.path.display().to_string(),
                lines_read: f.lines_read,
                error: error_chain(e),
            })
        })
        .collect()
}

/// `outer: inner: root` for an error and its sources
fn error_chain(err: &dyn std::error::Error) -> String {
    let mut out = err.to_string();
    let mut source = err.source();
    while let Some(e) = source {
        let _ = write!(out, ": {e}");
        source = e.source();
    }
    out
}

pub fn render(report: &IngestReport, top_k: usize, format: OutputFormat) -> serde_json::Result<String> {
    match format {
        OutputFormat::Text => Ok(render_text(report, top_k)),
        OutputFormat::Json => render_json(report, top_k),
    }
}

pub fn render_json(report: &IngestReport, top_k: usize) -> serde_json::Result<String> {
    let snapshot = &report.snapshot;
    let view = ReportView {
        total_lines: snapshot.total_lines,
        parsed_lines: snapshot.parsed_lines(),
        unparsed_lines: snapshot.unparsed_lines(),
        levels: &snapshot.level_counts,
        top_sources: snapshot.top_sources(top_k),
        top_messages: snapshot.top_messages(top_k),
        files: FilesView {
            discovered: report.files.len(),
            complete: report.complete_files(),
            partial: report.partial_files(),
            failed: report.failed_files(),
            problems: problems(report),
        },
        elapsed_ms: report.elapsed.as_millis(),
        timed_out: report.timed_out,
    };
    serde_json::to_string_pretty(&view)
}

pub fn render_text(report: &IngestReport, top_k: usize) -> String {
    let snapshot = &report.snapshot;
    let mut out = String::new();

    let _ = writeln!(out, "Total lines:    {}", snapshot.total_lines);
    let _ = writeln!(out, "Parsed lines:   {}", snapshot.parsed_lines());
    let _ = writeln!(out, "Unparsed lines: {}", snapshot.unparsed_lines());

    let _ = writeln!(out, "\nLevels:");
    write_ranked(&mut out, &snapshot.levels_ranked());

    let _ = writeln!(out, "\nTop {top_k} sources:");
    write_ranked(&mut out, &snapshot.top_sources(top_k));

    let _ = writeln!(out, "\nTop {top_k} messages:");
    write_ranked(&mut out, &snapshot.top_messages(top_k));

    let _ = writeln!(
        out,
        "\nFiles: {} scanned, {} complete, {} partial, {} failed ({:.2?})",
        report.files.len(),
        report.complete_files(),
        report.partial_files(),
        report.failed_files(),
        report.elapsed,
    );
    for problem in problems(report) {
        let _ = writeln!(
            out,
            "  {} ({} lines): {}",
            problem.path, problem.lines_read, problem.error
        );
    }
    if report.timed_out {
        let _ = writeln!(out, "Warning: shutdown timeout reached, results are incomplete");
    }

    out
}

fn write_ranked(out: &mut String, entries: &[RankedEntry]) {
    if entries.is_empty() {
        let _ = writeln!(out, "  (none)");
        return;
    }
    let width = entries
        .iter()
        .map(|e| e.count.to_string().len())
        .max()
        .unwrap_or(1);
    for entry in entries {
        let _ = writeln!(out, "  {:>width$}  {}", entry.count, entry.key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use logscan_ingest::{IngestConfig, IngestCoordinator};
    use std::fs;

    async fn sample_report() -> (tempfile::TempDir, IngestReport) {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("a.log"),
            "2025-10-22T12:34:56Z [INFO] auth - User login success id=42\n\
             2025-10-22T12:34:57Z [ERROR] db - query failed after 3 retries\n\
             2025-10-22T12:34:58Z [INFO] auth - User login success id=7\n\
             garbage line with no structure\n",
        )
        .unwrap();
        let coordinator =
            IngestCoordinator::new(IngestConfig::default().with_workers(2)).unwrap();
        let report = coordinator.run(dir.path()).await.unwrap();
        (dir, report)
    }

    #[tokio::test]
    async fn test_text_report() {
        let (_dir, report) = sample_report().await;
        let text = render_text(&report, 5);

        assert!(text.contains("Total lines:    4"));
        assert!(text.contains("Unparsed lines: 1"));
        assert!(text.contains("  2  INFO"));
        assert!(text.contains("  2  User login success id=<NUM>"));
        assert!(text.contains("query failed after <NUM> retries"));
        assert!(text.contains("Files: 1 scanned, 1 complete, 0 partial, 0 failed"));
    }

    #[tokio::test]
    async fn test_json_report() {
        let (_dir, report) = sample_report().await;
        let json: serde_json::Value =
            serde_json::from_str(&render_json(&report, 1).unwrap()).unwrap();

        assert_eq!(json["total_lines"], 4);
        assert_eq!(json["parsed_lines"], 3);
        assert_eq!(json["levels"]["ERROR"], 1);
        assert_eq!(json["top_sources"].as_array().unwrap().len(), 1);
        assert_eq!(json["top_sources"][0]["key"], "auth");
        assert_eq!(json["files"]["complete"], 1);
        assert_eq!(json["timed_out"], false);
    }

    #[test]
    fn test_format_from_toml_value() {
        #[derive(Deserialize)]
        struct Wrapper {
            format: OutputFormat,
        }
        let parsed: Wrapper = toml::from_str("format = \"json\"").unwrap();
        assert_eq!(parsed.format, OutputFormat::Json);
    }
}
