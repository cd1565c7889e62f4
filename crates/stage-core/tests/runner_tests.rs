use std::path::Path;

use ndarray::{array, Array1};
use serde::Deserialize;
use serde_json::json;
use stage_core::constants::SESSION_EVENTS_FILE;
use stage_core::event::read_jsonl;
use stage_core::session::read_summary;
use stage_core::store::resolve_alias;
use stage_core::{ArtifactKey, ConfigResolver, RunState, Session, SessionEventKind, StageError, StageRunner,
                 StoreError, TypedStage};

#[derive(Debug, Deserialize)]
struct Paths {
    #[serde(rename = "SOURCE")]
    source: String,
    #[serde(rename = "DOUBLED")]
    doubled: String,
    #[serde(rename = "ALIAS_DIR")]
    alias_dir: String,
}

#[derive(Debug, Deserialize)]
struct Settings {
    #[serde(rename = "PATHS")]
    paths: Paths,
}

fn key(s: &str) -> ArtifactKey {
    ArtifactKey::new(s).unwrap()
}

struct Produce;

impl TypedStage for Produce {
    type Settings = Settings;

    fn id(&self) -> &'static str {
        "01_produce"
    }

    fn reads(&self, _s: &Settings) -> Result<Vec<ArtifactKey>, StageError> {
        Ok(vec![])
    }

    fn writes(&self, s: &Settings) -> Result<Vec<ArtifactKey>, StageError> {
        Ok(vec![ArtifactKey::new(&s.paths.source)?])
    }

    fn run(&self, s: &Settings, session: &mut Session) -> Result<(), StageError> {
        let k = ArtifactKey::new(&s.paths.source)?;
        session.write(&k, &array![1i64, 2, 3], Some(Path::new(&s.paths.alias_dir)))?;
        Ok(())
    }
}

struct Double;

impl TypedStage for Double {
    type Settings = Settings;

    fn id(&self) -> &'static str {
        "02_double"
    }

    fn reads(&self, s: &Settings) -> Result<Vec<ArtifactKey>, StageError> {
        Ok(vec![ArtifactKey::new(&s.paths.source)?])
    }

    fn writes(&self, s: &Settings) -> Result<Vec<ArtifactKey>, StageError> {
        Ok(vec![ArtifactKey::new(&s.paths.doubled)?])
    }

    fn run(&self, s: &Settings, session: &mut Session) -> Result<(), StageError> {
        let input: Array1<i64> = session.read(&ArtifactKey::new(&s.paths.source)?)?;
        session.logger().info(format!("doubling {} values", input.len()));
        let out = input.mapv(|v| v * 2);
        session.write(&ArtifactKey::new(&s.paths.doubled)?, &out, Some(Path::new(&s.paths.alias_dir)))?;
        Ok(())
    }
}

struct Forgetful;

impl TypedStage for Forgetful {
    type Settings = Settings;

    fn id(&self) -> &'static str {
        "03_forgetful"
    }

    fn reads(&self, _s: &Settings) -> Result<Vec<ArtifactKey>, StageError> {
        Ok(vec![])
    }

    fn writes(&self, _s: &Settings) -> Result<Vec<ArtifactKey>, StageError> {
        Ok(vec![key("never.npy")])
    }

    fn run(&self, _s: &Settings, _session: &mut Session) -> Result<(), StageError> {
        Ok(())
    }
}

struct Panicky;

impl TypedStage for Panicky {
    type Settings = serde_json::Value;

    fn id(&self) -> &'static str {
        "04_panicky"
    }

    fn reads(&self, _s: &Self::Settings) -> Result<Vec<ArtifactKey>, StageError> {
        Ok(vec![])
    }

    fn writes(&self, _s: &Self::Settings) -> Result<Vec<ArtifactKey>, StageError> {
        Ok(vec![])
    }

    fn run(&self, _s: &Self::Settings, _session: &mut Session) -> Result<(), StageError> {
        panic!("numeric kernel exploded");
    }
}

struct External;

impl TypedStage for External {
    type Settings = serde_json::Value;

    fn id(&self) -> &'static str {
        "05_external"
    }

    fn reads(&self, _s: &Self::Settings) -> Result<Vec<ArtifactKey>, StageError> {
        Ok(vec![])
    }

    fn writes(&self, _s: &Self::Settings) -> Result<Vec<ArtifactKey>, StageError> {
        Ok(vec![])
    }

    fn run(&self, _s: &Self::Settings, _session: &mut Session) -> Result<(), StageError> {
        Err(StageError::external("fitting svm", "kernel matrix is not finite"))
    }
}

// Escribe ambas claves con alias y después falla.
struct HalfDone;

impl TypedStage for HalfDone {
    type Settings = Settings;

    fn id(&self) -> &'static str {
        "06_half_done"
    }

    fn reads(&self, _s: &Settings) -> Result<Vec<ArtifactKey>, StageError> {
        Ok(vec![])
    }

    fn writes(&self, s: &Settings) -> Result<Vec<ArtifactKey>, StageError> {
        Ok(vec![ArtifactKey::new(&s.paths.source)?, ArtifactKey::new(&s.paths.doubled)?])
    }

    fn run(&self, s: &Settings, session: &mut Session) -> Result<(), StageError> {
        let alias = Path::new(&s.paths.alias_dir);
        session.write(&ArtifactKey::new(&s.paths.source)?, &array![9i64, 9], Some(alias))?;
        session.write(&ArtifactKey::new(&s.paths.doubled)?, &array![18i64, 18], Some(alias))?;
        Err(StageError::external("fitting svm", "did not converge"))
    }
}

fn runner(root: &Path) -> StageRunner {
    let alias = root.join("alias");
    let resolver = ConfigResolver::new().with_tree("test",
                                                   json!({"PATHS": {"SOURCE": "data/source.npy",
                                                                    "DOUBLED": "data/doubled.npy",
                                                                    "ALIAS_DIR": alias.display().to_string()}}));
    StageRunner::new(resolver, root.join("store"))
}

#[test]
fn stages_with_inputs_present_succeed_and_outputs_are_readable() {
    let dir = tempfile::tempdir().unwrap();
    let runner = runner(dir.path());

    let first = runner.run(&Produce);
    assert_eq!(first.exit_code, 0, "{:?}", first.error);
    let second = runner.run(&Double);
    assert_eq!(second.exit_code, 0, "{:?}", second.error);
    assert_eq!(second.history,
               vec![RunState::NotStarted,
                    RunState::ConfigResolved,
                    RunState::SessionActive,
                    RunState::Succeeded,
                    RunState::Closed]);

    let store = stage_core::ArtifactStore::open(dir.path().join("store")).unwrap();
    assert_eq!(store.read::<Array1<i64>>(&key("data/doubled.npy")).unwrap(), array![2i64, 4, 6]);

    let summary = second.summary.unwrap();
    assert_eq!(summary.inputs[0].key, key("data/source.npy"));
    let run_dir = store.layout().run_dir("02_double", second.run_id.as_deref().unwrap());
    assert_eq!(read_summary(&run_dir).unwrap().fingerprint, summary.fingerprint);
    assert!(run_dir.join("logs").join("stage.log").exists());
}

#[test]
fn missing_input_fails_fast_and_aliases_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let outcome = runner(dir.path()).run(&Double);
    assert_eq!(outcome.exit_code, 3);
    assert_eq!(outcome.final_state, RunState::Closed);
    assert!(outcome.history.contains(&RunState::Failed));
    assert!(outcome.error.unwrap().contains("data/source.npy"));
    assert!(resolve_alias(&dir.path().join("alias"), &key("data/doubled.npy")).is_err());
}

#[test]
fn config_failure_never_opens_a_session() {
    let dir = tempfile::tempdir().unwrap();
    let resolver = ConfigResolver::new().with_tree("bad", json!({"PATHS": {"SOURCE": "x.npy"}}));
    let outcome = StageRunner::new(resolver, dir.path().join("store")).run(&Produce);
    assert_eq!(outcome.exit_code, 2);
    assert_eq!(outcome.history, vec![RunState::NotStarted, RunState::Failed, RunState::Closed]);
    assert!(outcome.run_id.is_none());
    assert!(!dir.path().join("store").exists());
}

#[test]
fn undeclared_outputs_panics_and_library_errors_map_to_exit_codes() {
    let dir = tempfile::tempdir().unwrap();
    let runner = runner(dir.path());
    assert_eq!(runner.run(&Forgetful).exit_code, 1);

    let panicked = runner.run(&Panicky);
    assert_eq!(panicked.exit_code, 101);
    assert!(panicked.error.unwrap().contains("numeric kernel exploded"));
    assert_eq!(panicked.final_state, RunState::Closed);

    let external = runner.run(&External);
    assert_eq!(external.exit_code, 5);
    assert_eq!(external.summary.unwrap().exit_code, 5);
}

#[test]
fn failed_run_publishes_neither_index_nor_alias() {
    let dir = tempfile::tempdir().unwrap();
    let alias_dir = dir.path().join("alias");
    let runner = runner(dir.path());
    let produced = runner.run(&Produce);
    assert_eq!(produced.exit_code, 0, "{:?}", produced.error);

    let failed = runner.run(&HalfDone);
    assert_eq!(failed.exit_code, 5);
    assert_eq!(failed.final_state, RunState::Closed);
    assert!(!failed.history.contains(&RunState::Succeeded));

    let store = stage_core::ArtifactStore::open(dir.path().join("store")).unwrap();
    assert!(!store.contains(&key("data/doubled.npy")));
    assert!(matches!(store.read::<Array1<i64>>(&key("data/doubled.npy")), Err(StoreError::NotFound(_))));
    assert!(resolve_alias(&alias_dir, &key("data/doubled.npy")).is_err());

    // La versión previa sigue vigente en índice y alias.
    assert_eq!(store.read::<Array1<i64>>(&key("data/source.npy")).unwrap(), array![1i64, 2, 3]);
    assert_eq!(store.history(&key("data/source.npy")).unwrap().len(), 1);
    let alias = resolve_alias(&alias_dir, &key("data/source.npy")).unwrap();
    assert_eq!(Some(alias.run_id), produced.run_id);

    let summary = failed.summary.unwrap();
    assert_eq!(summary.exit_code, 5);
    assert_eq!(summary.outputs.len(), 2);

    let downstream = runner.run(&Double);
    assert_eq!(downstream.exit_code, 0, "{:?}", downstream.error);
    assert_eq!(store.read::<Array1<i64>>(&key("data/doubled.npy")).unwrap(), array![2i64, 4, 6]);
}

#[test]
fn event_log_on_disk_records_writes_and_publication() {
    let dir = tempfile::tempdir().unwrap();
    let runner = runner(dir.path());
    let ok = runner.run(&Produce);
    let failed = runner.run(&HalfDone);
    let layout = stage_core::store::StoreLayout::new(dir.path().join("store"));

    let ok_events = read_jsonl(&layout.run_dir("01_produce", ok.run_id.as_deref().unwrap()).join(SESSION_EVENTS_FILE)).unwrap();
    let kinds: Vec<_> = ok_events.iter().map(|e| &e.kind).collect();
    assert!(matches!(kinds[0], SessionEventKind::SessionStarted { .. }));
    assert!(kinds.iter().any(|k| matches!(k, SessionEventKind::ArtifactPublished { key, .. } if key == "data/source.npy")));
    assert!(kinds.iter().any(|k| matches!(k, SessionEventKind::AliasUpdated { .. })));
    assert!(matches!(kinds.last(), Some(SessionEventKind::SessionClosed { exit_code: 0, .. })));
    assert!(ok_events.windows(2).all(|w| w[0].seq < w[1].seq));

    let failed_events =
        read_jsonl(&layout.run_dir("06_half_done", failed.run_id.as_deref().unwrap()).join(SESSION_EVENTS_FILE)).unwrap();
    let written = failed_events.iter()
                               .filter(|e| matches!(e.kind, SessionEventKind::ArtifactWritten { .. }))
                               .count();
    assert_eq!(written, 2);
    assert!(!failed_events.iter().any(|e| matches!(e.kind,
                                                   SessionEventKind::ArtifactPublished { .. }
                                                   | SessionEventKind::AliasUpdated { .. })));
    assert!(failed_events.iter().any(|e| matches!(e.kind, SessionEventKind::StageFailed { exit_code: 5, .. })));
}
