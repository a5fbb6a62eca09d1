use anyhow::Result;
use chrono::{DateTime, Utc};
use sluice_engine::{
    AcquireWindow, BatchMode, BatchReport, Orchestrator, PluginRegistry, ProjectSelection,
    ProjectSummary, TracingEventSink,
};

use super::Paths;

/// Execute the `run` command: run one project or all of them.
pub fn execute(
    paths: &Paths,
    project: &str,
    wrap: bool,
    start: Option<DateTime<Utc>>,
    end: Option<DateTime<Utc>>,
) -> Result<()> {
    let catalog = paths.catalog();
    let backend = paths.backend()?;
    let registry = PluginRegistry::with_builtins();
    let events = TracingEventSink;

    let mode = if wrap {
        BatchMode::Wrapped
    } else {
        BatchMode::FailFast
    };
    let selection = ProjectSelection::from_arg(project);

    let report = Orchestrator::new(&catalog, &backend, &registry, &events).run_batch(
        &selection,
        AcquireWindow::new(start, end),
        mode,
    )?;

    tracing::info!(
        completed = report.completed.len(),
        skipped = report.skipped.len(),
        failed = report.failed.len(),
        "Batch finished"
    );
    print_report(&report);
    if !report.is_success() {
        anyhow::bail!(
            "{} of {} project(s) failed; see `sluice failures <PROJECT>`",
            report.failed.len(),
            report.total()
        );
    }
    Ok(())
}

fn print_report(report: &BatchReport) {
    for (project, summary) in &report.completed {
        println!("Project '{project}' completed.");
        print_summary(summary);
    }
    for (project, reason) in &report.skipped {
        println!("Project '{project}' skipped: {reason}");
    }
    for failure in &report.failed {
        println!("Project '{}' FAILED: {}", failure.project, failure.message);
    }
}

fn print_summary(summary: &ProjectSummary) {
    println!("  Records acquired:  {}", summary.records_acquired);
    println!("  Records exported:  {}", summary.records_exported);
    println!("  Files parsed:      {}", summary.files_parsed);
    if summary.files_quarantined > 0 {
        println!("  Files quarantined: {}", summary.files_quarantined);
    }
    println!("  Duration:          {:.2}s", summary.duration.as_secs_f64());
}

