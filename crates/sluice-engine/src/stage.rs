//! Stage runners for acquire, reshape and export.
//!
//! Each runner walks the active sub-modules of its stage, hands each one its
//! own state slice, and writes the returned slice back through
//! [`ProjectState::apply`].

use std::sync::LazyLock;

use serde_json::{Map, Value};
use sluice_types::{ProjectState, Record};

use crate::activation::is_active;
use crate::config::types::{ProjectConfig, Stage};
use crate::error::PipelineError;
use crate::events::PipelineEvent;
use crate::plugin::{Reshaper, StageContext};
use crate::registry::module_path;

static EMPTY_CONFIG: LazyLock<Value> = LazyLock::new(|| Value::Object(Map::new()));

/// Sub-module config for reshapers and exporters: the mapping itself, or an
/// empty mapping for boolean shorthand.
fn sub_config(node: &Value) -> &Value {
    if node.is_object() {
        node
    } else {
        &EMPTY_CONFIG
    }
}

/// Keep typed pipeline errors raised inside a plugin; wrap everything else.
fn lift(module: String, err: anyhow::Error) -> PipelineError {
    match err.downcast::<PipelineError>() {
        Ok(typed) => typed,
        Err(err) => PipelineError::plugin(module, err),
    }
}

fn skipped(ctx: &StageContext<'_>, stage: Stage, submodule: &str) {
    ctx.emit(&PipelineEvent::SubmoduleSkipped {
        project: ctx.project.clone(),
        stage,
        submodule: submodule.to_string(),
    });
}

fn finished(
    ctx: &StageContext<'_>,
    stage: Stage,
    submodule: &str,
    records: usize,
    state_kept: bool,
) {
    ctx.emit(&PipelineEvent::SubmoduleFinished {
        project: ctx.project.clone(),
        stage,
        submodule: submodule.to_string(),
        records,
        state_kept,
    });
}

/// Run every active acquirer in config order and collect their records.
///
/// # Errors
///
/// Returns the first resolution or plugin error; state updates made by
/// earlier acquirers remain applied to `state`.
pub fn run_acquire(
    ctx: &StageContext<'_>,
    config: &ProjectConfig,
    state: &mut ProjectState,
) -> Result<Vec<Record>, PipelineError> {
    ctx.emit(&PipelineEvent::StageStarted {
        project: ctx.project.clone(),
        stage: Stage::Acquire,
    });

    let mut records = Vec::new();
    for (kind, node) in config.submodules(Stage::Acquire) {
        if !is_active(node) {
            skipped(ctx, Stage::Acquire, kind);
            continue;
        }
        let acquirer = ctx.registry.acquirer(kind)?;
        let (blob, acquired) = acquirer
            .acquire(ctx, node, state.slice(kind))
            .map_err(|e| lift(module_path(Stage::Acquire, kind), e))?;
        let count = acquired.len();
        records.extend(acquired);
        let kept = state.apply(kind, blob);
        finished(ctx, Stage::Acquire, kind, count, kept);
    }

    tracing::info!(
        project = ctx.project.as_str(),
        records = records.len(),
        "Acquire stage complete"
    );
    Ok(records)
}

/// Apply active reshapers in ascending `ord()`, ties in config order.
///
/// Skipped entirely when there are no records or no `reshape` section.
///
/// # Errors
///
/// Returns the first resolution or plugin error.
pub fn run_reshape(
    ctx: &StageContext<'_>,
    config: &ProjectConfig,
    state: &mut ProjectState,
    records: Vec<Record>,
) -> Result<Vec<Record>, PipelineError> {
    if records.is_empty() || config.section(Stage::Reshape).is_none() {
        ctx.emit(&PipelineEvent::StageSkipped {
            project: ctx.project.clone(),
            stage: Stage::Reshape,
        });
        return Ok(records);
    }
    ctx.emit(&PipelineEvent::StageStarted {
        project: ctx.project.clone(),
        stage: Stage::Reshape,
    });

    let mut active: Vec<(&str, &Value, Box<dyn Reshaper>)> = Vec::new();
    for (kind, node) in config.submodules(Stage::Reshape) {
        if !is_active(node) {
            skipped(ctx, Stage::Reshape, kind);
            continue;
        }
        active.push((kind, node, ctx.registry.reshaper(kind)?));
    }
    active.sort_by_key(|(_, _, reshaper)| reshaper.ord());

    let mut records = records;
    for (kind, node, reshaper) in active {
        let (blob, reshaped) = reshaper
            .reshape(ctx.project, sub_config(node), state.slice(kind), records)
            .map_err(|e| lift(module_path(Stage::Reshape, kind), e))?;
        records = reshaped;
        let kept = state.apply(kind, blob);
        finished(ctx, Stage::Reshape, kind, records.len(), kept);
    }
    Ok(records)
}

/// Hand the final record set to every active exporter.
///
/// Skipped, with no state change, when there are no records.
///
/// # Errors
///
/// Returns the first resolution or plugin error.
pub fn run_export(
    ctx: &StageContext<'_>,
    config: &ProjectConfig,
    state: &mut ProjectState,
    records: &[Record],
) -> Result<(), PipelineError> {
    if records.is_empty() {
        ctx.emit(&PipelineEvent::StageSkipped {
            project: ctx.project.clone(),
            stage: Stage::Export,
        });
        return Ok(());
    }
    ctx.emit(&PipelineEvent::StageStarted {
        project: ctx.project.clone(),
        stage: Stage::Export,
    });

    for (kind, node) in config.submodules(Stage::Export) {
        if !is_active(node) {
            skipped(ctx, Stage::Export, kind);
            continue;
        }
        let exporter = ctx.registry.exporter(kind)?;
        let blob = exporter
            .export(ctx.project, sub_config(node), state.slice(kind), records)
            .map_err(|e| lift(module_path(Stage::Export, kind), e))?;
        let kept = state.apply(kind, blob);
        finished(ctx, Stage::Export, kind, records.len(), kept);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use serde_json::json;
    use sluice_state::SqliteStateBackend;
    use sluice_types::{ProjectName, StateBlob};

    use crate::events::CollectingEventSink;
    use crate::plugin::{AcquireWindow, Acquirer, Exporter};
    use crate::registry::PluginRegistry;

    /// Appends a tag field so reshape order is visible in the output.
    struct Tagger {
        tag: &'static str,
        ord: i32,
    }

    impl Reshaper for Tagger {
        fn ord(&self) -> i32 {
            self.ord
        }

        fn reshape(
            &self,
            _project: &ProjectName,
            config: &Value,
            _state: StateBlob,
            records: Vec<Record>,
        ) -> anyhow::Result<(StateBlob, Vec<Record>)> {
            let records = records
                .into_iter()
                .map(|mut r| {
                    let trail = r.get("trail").map(ToString::to_string).unwrap_or_default();
                    r.insert("trail", format!("{trail}{}", self.tag));
                    r
                })
                .collect();
            Ok((StateBlob::new(config.clone()), records))
        }
    }

    struct Fixed(usize);

    impl Acquirer for Fixed {
        fn acquire(
            &self,
            _ctx: &StageContext<'_>,
            _config: &Value,
            state: StateBlob,
        ) -> anyhow::Result<(StateBlob, Vec<Record>)> {
            let records = (0..self.0).map(|i| Record::new().with("i", i as i64)).collect();
            Ok((state, records))
        }
    }

    struct Failing;

    impl Acquirer for Failing {
        fn acquire(
            &self,
            _ctx: &StageContext<'_>,
            _config: &Value,
            _state: StateBlob,
        ) -> anyhow::Result<(StateBlob, Vec<Record>)> {
            anyhow::bail!("upstream timed out")
        }
    }

    /// Records how many times it ran.
    struct Counting(Arc<AtomicUsize>);

    impl Exporter for Counting {
        fn export(
            &self,
            _project: &ProjectName,
            _config: &Value,
            _state: StateBlob,
            records: &[Record],
        ) -> anyhow::Result<StateBlob> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(StateBlob::new(json!({"rows": records.len()})))
        }
    }

    struct Harness {
        registry: PluginRegistry,
        backend: SqliteStateBackend,
        events: CollectingEventSink,
        project: ProjectName,
    }

    impl Harness {
        fn new(registry: PluginRegistry) -> Self {
            Self {
                registry,
                backend: SqliteStateBackend::in_memory().unwrap(),
                events: CollectingEventSink::new(),
                project: ProjectName::new("p"),
            }
        }

        fn ctx(&self) -> StageContext<'_> {
            StageContext {
                project: &self.project,
                window: AcquireWindow::default(),
                registry: &self.registry,
                backend: &self.backend,
                events: &self.events,
            }
        }
    }

    fn taggers() -> PluginRegistry {
        let mut registry = PluginRegistry::new();
        registry
            .register_reshaper("late", || Box::new(Tagger { tag: "L", ord: 20 }))
            .register_reshaper("early", || Box::new(Tagger { tag: "E", ord: 5 }))
            .register_reshaper("tie_a", || Box::new(Tagger { tag: "A", ord: 10 }))
            .register_reshaper("tie_b", || Box::new(Tagger { tag: "B", ord: 10 }));
        registry
    }

    #[test]
    fn reshapers_run_by_ord_with_stable_ties() {
        let h = Harness::new(taggers());
        let config = ProjectConfig::new(
            "p",
            json!({"reshape": {"late": true, "tie_b": true, "early": true, "tie_a": true}}),
        );
        let mut state = ProjectState::new();
        let out = run_reshape(&h.ctx(), &config, &mut state, vec![Record::new()]).unwrap();
        assert_eq!(out[0].get("trail").map(ToString::to_string).as_deref(), Some("EBAL"));
    }

    #[test]
    fn boolean_shorthand_gets_empty_config_and_prunes_state() {
        let h = Harness::new(taggers());
        let config = ProjectConfig::new("p", json!({"reshape": {"early": true, "late": {"k": 1}}}));
        let mut state: ProjectState = [("early".to_string(), json!({"old": true}))]
            .into_iter()
            .collect();
        run_reshape(&h.ctx(), &config, &mut state, vec![Record::new()]).unwrap();
        assert!(!state.contains_key("early"));
        assert_eq!(state.get("late"), Some(&json!({"k": 1})));
    }

    #[test]
    fn inactive_reshaper_is_skipped_and_unresolved() {
        let h = Harness::new(PluginRegistry::new());
        let config = ProjectConfig::new("p", json!({"reshape": {"missing": {"is-active": false}}}));
        let mut state = ProjectState::new();
        let out = run_reshape(&h.ctx(), &config, &mut state, vec![Record::new()]).unwrap();
        assert_eq!(out.len(), 1);
        assert!(h
            .events
            .take()
            .iter()
            .any(|e| matches!(e, PipelineEvent::SubmoduleSkipped { submodule, .. } if submodule == "missing")));
    }

    #[test]
    fn unknown_reshaper_fails_before_any_runs() {
        let h = Harness::new(taggers());
        let config = ProjectConfig::new("p", json!({"reshape": {"early": {"x": 1}, "nope": true}}));
        let mut state = ProjectState::new();
        let err = run_reshape(&h.ctx(), &config, &mut state, vec![Record::new()]).unwrap_err();
        assert!(matches!(err, PipelineError::PluginNotFound { .. }));
        assert!(state.is_empty());
    }

    #[test]
    fn empty_records_short_circuit_reshape_and_export() {
        let runs = Arc::new(AtomicUsize::new(0));
        let mut registry = taggers();
        let counter = Arc::clone(&runs);
        registry.register_exporter("count", move || Box::new(Counting(Arc::clone(&counter))));
        let h = Harness::new(registry);
        let config = ProjectConfig::new(
            "p",
            json!({"reshape": {"early": {"x": 1}}, "export": {"count": true}}),
        );
        let mut state = ProjectState::new();

        let out = run_reshape(&h.ctx(), &config, &mut state, Vec::new()).unwrap();
        run_export(&h.ctx(), &config, &mut state, &out).unwrap();

        assert_eq!(runs.load(Ordering::SeqCst), 0);
        assert!(state.is_empty());
    }

    #[test]
    fn acquire_runs_in_config_order_and_wraps_plugin_errors() {
        let mut registry = PluginRegistry::new();
        registry
            .register_acquirer("two", || Box::new(Fixed(2)))
            .register_acquirer("three", || Box::new(Fixed(3)))
            .register_acquirer("bad", || Box::new(Failing));
        let h = Harness::new(registry);
        let mut state = ProjectState::new();

        let config = ProjectConfig::new("p", json!({"acquire": {"three": true, "two": {"settings": {}}}}));
        let records = run_acquire(&h.ctx(), &config, &mut state).unwrap();
        assert_eq!(records.len(), 3);

        let config = ProjectConfig::new("p", json!({"acquire": {"bad": true}}));
        let err = run_acquire(&h.ctx(), &config, &mut state).unwrap_err();
        match err {
            PipelineError::Plugin { module, source } => {
                assert_eq!(module, "sluice.acquire.bad");
                assert!(source.to_string().contains("timed out"));
            }
            other => panic!("expected plugin error, got {other:?}"),
        }
    }

    #[test]
    fn exporter_state_is_applied() {
        let runs = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&runs);
        let mut registry = PluginRegistry::new();
        registry.register_exporter("count", move || Box::new(Counting(Arc::clone(&counter))));
        let h = Harness::new(registry);
        let config = ProjectConfig::new("p", json!({"export": {"count": true, "off": false}}));
        let mut state = ProjectState::new();

        run_export(&h.ctx(), &config, &mut state, &[Record::new().with("a", 1)]).unwrap();
        assert_eq!(runs.load(Ordering::SeqCst), 1);
        assert_eq!(state.get("count"), Some(&json!({"rows": 1})));
    }
}
