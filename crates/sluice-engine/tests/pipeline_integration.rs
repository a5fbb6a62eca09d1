//! Integration tests for project runs against a real directory layout.
//!
//! Each test builds a projects directory, input files and a file-backed
//! state database under a temp dir, then drives the orchestrator with the
//! built-in plugins.

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::json;
use sluice_engine::config::parser;
use sluice_engine::config::validator;
use sluice_engine::events::{CollectingEventSink, PipelineEvent};
use sluice_engine::{
    AcquireWindow, BatchMode, DirectoryCatalog, Orchestrator, PipelineError, PluginRegistry,
    ProjectOutcome, ProjectSelection, ProjectSummary, Stage,
};
use sluice_state::{SqliteStateBackend, StateBackend};
use sluice_types::{ProjectName, ProjectState};

struct Workspace {
    dir: tempfile::TempDir,
    backend: SqliteStateBackend,
    registry: PluginRegistry,
    events: CollectingEventSink,
}

impl Workspace {
    fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("projects")).unwrap();
        let backend = SqliteStateBackend::open(&dir.path().join(".sluice/state.db")).unwrap();
        Self {
            dir,
            backend,
            registry: PluginRegistry::with_builtins(),
            events: CollectingEventSink::new(),
        }
    }

    fn root(&self) -> &Path {
        self.dir.path()
    }

    fn path(&self, rel: &str) -> PathBuf {
        self.root().join(rel)
    }

    /// Write a project config; `ROOT` in the template becomes the temp dir.
    fn project(&self, name: &str, template: &str) {
        let dir = self.path(&format!("projects/{name}"));
        fs::create_dir_all(&dir).unwrap();
        let yaml = template.replace("ROOT", self.root().to_str().unwrap());
        fs::write(dir.join("config.yaml"), yaml).unwrap();
    }

    fn input(&self, rel: &str, body: &str) {
        let path = self.path(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, body).unwrap();
    }

    fn catalog(&self) -> DirectoryCatalog {
        DirectoryCatalog::new(self.path("projects"))
    }

    fn run(&self, name: &str) -> Result<ProjectOutcome, PipelineError> {
        let catalog = self.catalog();
        Orchestrator::new(&catalog, &self.backend, &self.registry, &self.events)
            .run_project(&ProjectName::new(name), AcquireWindow::default())
    }

    fn run_completed(&self, name: &str) -> ProjectSummary {
        match self.run(name).unwrap() {
            ProjectOutcome::Completed(summary) => summary,
            other => panic!("expected a completed run, got {other:?}"),
        }
    }

    fn batch(&self, mode: BatchMode) -> Result<sluice_engine::BatchReport, PipelineError> {
        let catalog = self.catalog();
        Orchestrator::new(&catalog, &self.backend, &self.registry, &self.events).run_batch(
            &ProjectSelection::All,
            AcquireWindow::default(),
            mode,
        )
    }

    fn state(&self, name: &str) -> ProjectState {
        self.backend.load_state(&ProjectName::new(name)).unwrap()
    }

    fn files(&self, rel: &str) -> Vec<String> {
        let Ok(entries) = fs::read_dir(self.path(rel)) else {
            return Vec::new();
        };
        let mut names: Vec<String> = entries
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .collect();
        names.sort();
        names
    }
}

const STATIC_CSV_TO_JSONL: &str = r"
acquire:
  static:
    settings:
      source: ROOT/in/
      on-fmt: ROOT/done/
      on-err: ROOT/err/
    parser:
      - parser: csv
        suffix: '*.csv'
      - parser: jsonl
        suffix: '*.jsonl'
export:
  jsonl:
    path: ROOT/out/{project}.jsonl
";

#[test]
fn end_to_end_quarantines_bad_file_and_keeps_good_records() {
    let ws = Workspace::new();
    ws.project("weather", STATIC_CSV_TO_JSONL);
    ws.input("in/a.csv", "station,temp\nn1,1\nn2,2\nn3,3\n");
    ws.input("in/b.csv", "station,temp\nn4\n");

    let summary = ws.run_completed("weather");

    assert_eq!(summary.records_acquired, 3);
    assert_eq!(summary.records_exported, 3);
    assert_eq!(summary.files_parsed, 1);
    assert_eq!(summary.files_quarantined, 1);
    assert_eq!(ws.files("done"), ["a.csv"]);
    assert_eq!(ws.files("err"), ["b.csv"]);
    assert!(ws.files("in").is_empty());

    let exported = fs::read_to_string(ws.path("out/weather.jsonl")).unwrap();
    assert_eq!(exported.lines().count(), 3);
    assert!(exported.starts_with("{\"station\":\"n1\",\"temp\":1}"));

    // Only the parser that produced state has a key.
    let state = ws.state("weather");
    let nested = state.get("static").unwrap().as_object().unwrap();
    assert_eq!(nested.keys().collect::<Vec<_>>(), ["csv"]);
    assert_eq!(nested["csv"]["files_parsed"], json!(1));
    assert!(state.contains_key("jsonl"));

    let notes = ws
        .backend
        .failures(&ProjectName::new("weather"), 10)
        .unwrap();
    assert_eq!(notes.len(), 1);
    assert!(notes[0].context.as_deref().unwrap().ends_with("b.csv"));
}

#[test]
fn discovery_respects_suffix_pattern() {
    let ws = Workspace::new();
    ws.project("weather", STATIC_CSV_TO_JSONL);
    ws.input("in/a.csv", "station\nn1\n");
    ws.input("in/b.txt", "not picked up");

    ws.run_completed("weather");

    assert_eq!(ws.files("done"), ["a.csv"]);
    assert_eq!(ws.files("in"), ["b.txt"]);
    assert!(ws.files("err").is_empty());
}

#[test]
fn every_starting_file_ends_in_exactly_one_archive() {
    let ws = Workspace::new();
    ws.project("weather", STATIC_CSV_TO_JSONL);
    let inputs = [
        ("in/1.csv", "a,b\n1,2\n"),
        ("in/2.csv", "a,b\n1\n"),
        ("in/3.jsonl", "{\"a\": 1}\n"),
        ("in/4.jsonl", "not json\n"),
        ("in/5.jsonl", "{\"a\": [1]}\n"),
        ("in/6.csv", "id,id\n1,2\n"),
    ];
    for (rel, body) in inputs {
        ws.input(rel, body);
    }

    ws.run_completed("weather");

    let done = ws.files("done");
    let err = ws.files("err");
    assert_eq!(done, ["1.csv", "3.jsonl"]);
    assert_eq!(err, ["2.csv", "4.jsonl", "5.jsonl", "6.csv"]);
    assert!(ws.files("in").is_empty());
    assert_eq!(
        ws.backend
            .failures(&ProjectName::new("weather"), 10)
            .unwrap()
            .len(),
        4
    );
}

#[test]
fn per_spec_on_raw_false_overrides_stage_snapshot_dir() {
    let ws = Workspace::new();
    ws.project(
        "weather",
        r"
acquire:
  static:
    settings:
      source: ROOT/in/
      on-fmt: ROOT/done/
      on-err: ROOT/err/
      on-raw: ROOT/raw/
    parser:
      - parser: csv
        suffix: '*.csv'
        on-raw: false
      - parser: jsonl
        suffix: '*.jsonl'
export:
  csv:
    path: ROOT/out/weather.csv
",
    );
    ws.input("in/a.csv", "x\n1\n");
    ws.input("in/c.jsonl", "{\"x\": 2}\n");

    ws.run_completed("weather");

    assert_eq!(ws.files("raw"), ["c.jsonl.csv"]);
    assert_eq!(
        fs::read_to_string(ws.path("raw/c.jsonl.csv")).unwrap(),
        "x\n2\n"
    );
    assert_eq!(
        fs::read_to_string(ws.path("out/weather.csv")).unwrap(),
        "x\n1\n2\n"
    );
}

#[test]
fn no_records_skips_reshape_and_export() {
    let ws = Workspace::new();
    ws.project(
        "weather",
        r"
acquire:
  static:
    settings:
      source: ROOT/in/
    parser:
      - parser: csv
reshape:
  dedupe: true
export:
  jsonl:
    path: ROOT/out/weather.jsonl
",
    );
    fs::create_dir_all(ws.path("in")).unwrap();

    let summary = ws.run_completed("weather");

    assert_eq!(summary.records_acquired, 0);
    assert!(!ws.path("out/weather.jsonl").exists());
    assert!(ws.state("weather").is_empty());

    let skipped: Vec<Stage> = ws
        .events
        .take()
        .into_iter()
        .filter_map(|e| match e {
            PipelineEvent::StageSkipped { stage, .. } => Some(stage),
            _ => None,
        })
        .collect();
    assert_eq!(skipped, [Stage::Reshape, Stage::Export]);
}

#[test]
fn reshape_pipeline_renames_then_dedupes() {
    let ws = Workspace::new();
    ws.project(
        "weather",
        r"
acquire:
  static:
    settings:
      source: ROOT/in/
      on-fmt: ROOT/done/
      on-err: ROOT/err/
    parser:
      - parser: csv
reshape:
  dedupe:
    key: station
  rename:
    fields:
      stn: station
export:
  csv:
    path: ROOT/out/weather.csv
",
    );
    ws.input("in/a.csv", "stn,temp\nn1,1\nn1,2\nn2,3\n");

    let summary = ws.run_completed("weather");

    assert_eq!(summary.records_acquired, 3);
    assert_eq!(summary.records_exported, 2);
    assert_eq!(
        fs::read_to_string(ws.path("out/weather.csv")).unwrap(),
        "station,temp\nn1,1\nn2,3\n"
    );

    // Dedupe keys survive into the next run.
    ws.input("in/b.csv", "stn,temp\nn2,9\nn3,4\n");
    let summary = ws.run_completed("weather");
    assert_eq!(summary.records_exported, 1);
}

#[test]
fn parser_state_accumulates_across_runs() {
    let ws = Workspace::new();
    ws.project("weather", STATIC_CSV_TO_JSONL);
    ws.input("in/a.csv", "x\n1\n");
    ws.run_completed("weather");

    ws.input("in/b.csv", "x\n2\n");
    ws.run_completed("weather");

    let reopened = SqliteStateBackend::open(&ws.path(".sluice/state.db")).unwrap();
    let state = reopened.load_state(&ProjectName::new("weather")).unwrap();
    assert_eq!(state.get("static").unwrap()["csv"]["files_parsed"], json!(2));
    assert_eq!(state.get("static").unwrap()["csv"]["last_file"], json!("b.csv"));
}

#[test]
fn wrapped_batch_continues_and_fail_fast_aborts() {
    let ws = Workspace::new();
    ws.project(
        "a_no_export",
        r"
acquire:
  static:
    parser: []
",
    );
    ws.project("b_weather", STATIC_CSV_TO_JSONL);
    ws.input("in/a.csv", "x\n1\n");

    let err = ws.batch(BatchMode::FailFast).unwrap_err();
    assert!(matches!(err, PipelineError::MissingSection { .. }));
    assert_eq!(ws.files("in"), ["a.csv"]);

    let report = ws.batch(BatchMode::Wrapped).unwrap();
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].project.as_str(), "a_no_export");
    assert_eq!(report.completed.len(), 1);
    assert!(ws.files("in").is_empty());

    let notes = ws
        .backend
        .failures(&ProjectName::new("a_no_export"), 10)
        .unwrap();
    assert_eq!(notes.len(), 1);
    assert_eq!(notes[0].message, "no export section defined for a_no_export");
}

#[test]
fn missing_source_directory_fails_the_project() {
    let ws = Workspace::new();
    ws.project("weather", STATIC_CSV_TO_JSONL);

    let err = ws.run("weather").unwrap_err();
    assert!(matches!(err, PipelineError::SourceMissing { .. }));
    assert!(ws.state("weather").is_empty());
}

#[test]
fn unknown_project_is_reported() {
    let ws = Workspace::new();
    let err = ws.run("ghost").unwrap_err();
    assert_eq!(err.to_string(), "could not find project matching: ghost");
}

fn fixture(rel: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures/projects")
        .join(rel)
}

#[test]
fn fixture_project_parses_and_validates() {
    std::env::set_var("SLUICE_FIXTURE_INBOX", "/srv/inbox/weather");
    let config = parser::parse_project("weather", &fixture("weather/config.yaml"))
        .expect("Failed to parse fixture project");
    std::env::remove_var("SLUICE_FIXTURE_INBOX");

    let acquire = config.section(Stage::Acquire).unwrap();
    assert_eq!(acquire["static"]["settings"]["source"], "/srv/inbox/weather");
    let exporters: Vec<&str> = config.submodules(Stage::Export).map(|(k, _)| k).collect();
    assert_eq!(exporters, ["csv", "jsonl"]);

    validator::validate_project(&config, &PluginRegistry::with_builtins())
        .expect("Validation should pass");
}

#[test]
fn broken_fixture_reports_every_problem() {
    let config = parser::parse_project("broken", &fixture("broken/config.yaml")).unwrap();
    let err = validator::validate_project(&config, &PluginRegistry::with_builtins())
        .unwrap_err()
        .to_string();
    assert!(err.contains("Missing required section 'export'"));
    assert!(err.contains("sluice.acquire.parsers.xml"));
    assert!(err.contains("sluice.reshape.pivot"));
}
