//! Sesión: recursos con ciclo de vida acotado a una ejecución de stage.
//!
//! Una `Session` se pasa explícitamente al cuerpo del stage (no hay estado
//! global). Agrupa config, contexto de plotting, paleta, RNG por streams,
//! logger, store ligado a la identidad del run y el log de eventos. Cerrarla
//! escribe `events.jsonl` + `session.json`, vacía el logger y cierra figuras;
//! si nadie la cierra, `Drop` lo hace con código 1.
//!
//! Los writes quedan pendientes: los archivos canónicos existen, pero índice
//! y alias solo cambian con `publish`, que el runner llama cuando el stage
//! terminó bien. Una sesión cerrada sin publicar no expone nada.

mod identity;
mod logger;
mod palette;
mod rng;

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use log::warn;
use serde::{Deserialize, Serialize};
use serde_json::json;

pub use identity::RunIdentity;
pub use logger::StageLogger;
pub use palette::{Palette, Rgb};
pub use rng::{derive_seed, RngManager};

use crate::config::Config;
use crate::constants::{PROTOCOL_VERSION, SESSION_EVENTS_FILE, SESSION_LOG_FILE, SESSION_SUMMARY_FILE};
use crate::errors::StoreError;
use crate::event::{write_jsonl, EventStore, InMemoryEventStore, SessionEvent, SessionEventKind};
use crate::hashing::hash_value;
use crate::model::{ArtifactKey, ArtifactRecord, ArtifactValue, LineageEntry};
use crate::plot::{Figure, PlotContext};
use crate::stage::RunState;
use crate::store::{atomic_write_bytes, ArtifactStore};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OutputSummary {
    pub key: ArtifactKey,
    pub hash: String,
    pub path: String,
}

/// Contenido de `session.json`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SessionSummary {
    pub protocol_version: String,
    pub stage: String,
    pub run_id: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub exit_code: u8,
    pub config_fingerprint: String,
    pub config_sources: Vec<String>,
    pub inputs: Vec<LineageEntry>,
    pub outputs: Vec<OutputSummary>,
    pub states: Vec<RunState>,
    pub figures_left_open: usize,
    pub fingerprint: String,
}

pub struct Session {
    identity: RunIdentity,
    config: Config,
    store: ArtifactStore,
    run_dir: PathBuf,
    plt: PlotContext,
    palette: Palette,
    rng: RngManager,
    logger: StageLogger,
    events: InMemoryEventStore,
    reads: Vec<LineageEntry>,
    writes: Vec<ArtifactRecord>,
    pending: Vec<(ArtifactRecord, Option<PathBuf>)>,
    closed: bool,
}

impl Session {
    /// Abre la sesión: crea el directorio del run y registra `SessionStarted`.
    pub fn open(identity: RunIdentity, config: Config, store: ArtifactStore) -> Result<Self, StoreError> {
        let run_dir = store.layout().run_dir(identity.stage(), identity.run_id());
        fs::create_dir_all(&run_dir).map_err(StoreError::io(&run_dir))?;
        let base_seed = derive_seed(0, config.fingerprint());
        let logger = StageLogger::new(identity.stage(), Some(run_dir.join(SESSION_LOG_FILE)));
        let mut session = Self { identity,
                                 config,
                                 store,
                                 run_dir,
                                 plt: PlotContext::default(),
                                 palette: Palette,
                                 rng: RngManager::new(base_seed),
                                 logger,
                                 events: InMemoryEventStore::default(),
                                 reads: vec![],
                                 writes: vec![],
                                 pending: vec![],
                                 closed: false };
        let kind = SessionEventKind::SessionStarted { stage: session.identity.stage().to_string(),
                                                      config_fingerprint: session.config.fingerprint().to_string() };
        session.record_event(kind);
        Ok(session)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn identity(&self) -> &RunIdentity {
        &self.identity
    }

    pub fn run_id(&self) -> &str {
        self.identity.run_id()
    }

    pub fn run_dir(&self) -> &Path {
        &self.run_dir
    }

    pub fn store(&self) -> &ArtifactStore {
        &self.store
    }

    pub fn plt(&mut self) -> &mut PlotContext {
        &mut self.plt
    }

    pub fn palette(&self) -> &Palette {
        &self.palette
    }

    pub fn rng(&mut self) -> &mut RngManager {
        &mut self.rng
    }

    pub fn logger(&mut self) -> &mut StageLogger {
        &mut self.logger
    }

    /// Lee un artifact confirmado y lo agrega al lineage de la sesión.
    pub fn read<T: ArtifactValue>(&mut self, key: &ArtifactKey) -> Result<T, StoreError> {
        let (value, record) = self.store.read_with_record::<T>(key)?;
        let entry = record.lineage_entry();
        self.record_event(SessionEventKind::ArtifactRead { key: key.to_string(),
                                                           hash: entry.hash.clone(),
                                                           run_id: entry.run_id.clone() });
        if !self.reads.contains(&entry) {
            self.reads.push(entry);
        }
        Ok(value)
    }

    /// Escribe bajo el run actual. El registro queda pendiente hasta
    /// `publish`; con `alias_dir` el alias se actualiza en ese momento.
    pub fn write<T: ArtifactValue>(&mut self,
                                   key: &ArtifactKey,
                                   value: &T,
                                   alias_dir: Option<&Path>)
                                   -> Result<ArtifactRecord, StoreError> {
        let record = self.store.stage(&self.identity, key, value, &self.reads)?;
        self.record_event(SessionEventKind::ArtifactWritten { key: key.to_string(),
                                                              hash: record.hash.clone(),
                                                              path: record.path.clone() });
        self.pending.push((record.clone(), alias_dir.map(Path::to_path_buf)));
        self.writes.push(record.clone());
        Ok(record)
    }

    /// Confirma en el índice (y en los alias) todo lo escrito en el run.
    ///
    /// Devuelve los registros confirmados; una segunda llamada no hace nada.
    pub fn publish(&mut self) -> Result<Vec<ArtifactRecord>, StoreError> {
        let mut published = Vec::with_capacity(self.pending.len());
        for (staged, alias_dir) in std::mem::take(&mut self.pending) {
            let record = self.store.commit(&staged, alias_dir.as_deref())?;
            self.record_event(SessionEventKind::ArtifactPublished { key: record.key.to_string(),
                                                                    hash: record.hash.clone() });
            if let Some(dir) = &alias_dir {
                self.record_event(SessionEventKind::AliasUpdated { key: record.key.to_string(),
                                                                   alias_dir: dir.display().to_string() });
            }
            published.push(record);
        }
        Ok(published)
    }

    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// Guarda una figura y la cierra en el contexto de plotting.
    pub fn save_figure(&mut self,
                       key: &ArtifactKey,
                       figure: &Figure,
                       alias_dir: Option<&Path>)
                       -> Result<ArtifactRecord, StoreError> {
        let record = self.write(key, figure, alias_dir)?;
        self.plt.close(figure);
        Ok(record)
    }

    pub fn has_written(&self, key: &ArtifactKey) -> bool {
        self.writes.iter().any(|r| &r.key == key)
    }

    pub fn written(&self) -> &[ArtifactRecord] {
        &self.writes
    }

    pub fn inputs(&self) -> &[LineageEntry] {
        &self.reads
    }

    pub fn events(&self) -> Vec<SessionEvent> {
        self.events.list(self.identity.run_id())
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub(crate) fn record_event(&mut self, kind: SessionEventKind) {
        let run_id = self.identity.run_id().to_string();
        self.events.append_kind(&run_id, kind);
    }

    /// Cierra la sesión (idempotente: el segundo cierre devuelve `Ok(None)`).
    pub fn close(&mut self, exit_code: u8, states: &[RunState]) -> Result<Option<SessionSummary>, StoreError> {
        if self.closed {
            return Ok(None);
        }
        self.closed = true;
        if !self.pending.is_empty() {
            self.logger.warn(format!("{} unpublished write(s) discarded at teardown", self.pending.len()));
            self.pending.clear();
        }
        let figures_left_open = self.plt.close_all();
        if figures_left_open > 0 {
            self.logger.warn(format!("{figures_left_open} figure(s) left open were closed at teardown"));
        }

        let outputs: Vec<OutputSummary> = self.writes
                                              .iter()
                                              .map(|r| OutputSummary { key: r.key.clone(),
                                                                       hash: r.hash.clone(),
                                                                       path: r.path.clone() })
                                              .collect();
        let fp_json = json!({
            "protocol_version": PROTOCOL_VERSION,
            "stage": self.identity.stage(),
            "config_fingerprint": self.config.fingerprint(),
            "input_hashes": self.reads.iter().map(|e| e.hash.clone()).collect::<Vec<_>>(),
            "output_hashes": outputs.iter().map(|o| o.hash.clone()).collect::<Vec<_>>(),
            "exit_code": exit_code,
        });
        let fingerprint = hash_value(&fp_json);
        self.record_event(SessionEventKind::SessionClosed { exit_code,
                                                            fingerprint: fingerprint.clone() });

        let summary = SessionSummary { protocol_version: PROTOCOL_VERSION.to_string(),
                                       stage: self.identity.stage().to_string(),
                                       run_id: self.identity.run_id().to_string(),
                                       started_at: self.identity.started_at(),
                                       finished_at: Utc::now(),
                                       exit_code,
                                       config_fingerprint: self.config.fingerprint().to_string(),
                                       config_sources: self.config.sources().to_vec(),
                                       inputs: self.reads.clone(),
                                       outputs,
                                       states: states.to_vec(),
                                       figures_left_open,
                                       fingerprint };

        let events_path = self.run_dir.join(SESSION_EVENTS_FILE);
        write_jsonl(&events_path, &self.events()).map_err(StoreError::io(&events_path))?;
        let summary_path = self.run_dir.join(SESSION_SUMMARY_FILE);
        let bytes = serde_json::to_vec_pretty(&summary).map_err(|e| StoreError::Io { path: summary_path.clone(),
                                                                                    source: std::io::Error::other(e) })?;
        atomic_write_bytes(&summary_path, &bytes).map_err(StoreError::io(&summary_path))?;
        let log_path = self.run_dir.join(SESSION_LOG_FILE);
        self.logger.flush().map_err(StoreError::io(&log_path))?;
        Ok(Some(summary))
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if !self.closed {
            if let Err(e) = self.close(1, &[]) {
                warn!("session {} could not be closed cleanly: {e}", self.identity.run_id());
            }
        }
    }
}

/// Lee el `session.json` de un directorio de run.
pub fn read_summary(run_dir: &Path) -> Result<SessionSummary, StoreError> {
    let path = run_dir.join(SESSION_SUMMARY_FILE);
    let text = fs::read_to_string(&path).map_err(StoreError::io(&path))?;
    serde_json::from_str(&text).map_err(|e| StoreError::Io { path,
                                                             source: std::io::Error::other(e) })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{array, Array1};
    use serde_json::json;

    fn open(root: &Path, stage: &str) -> Session {
        let config = Config::from_tree(json!({"MNIST": {"RANDOM_STATE": 42}})).unwrap();
        let store = ArtifactStore::open(root).unwrap();
        Session::open(RunIdentity::new(stage), config, store).unwrap()
    }

    #[test]
    fn reads_become_lineage_of_later_writes() {
        let dir = tempfile::tempdir().unwrap();
        let key_in = ArtifactKey::new("a.npy").unwrap();
        let key_out = ArtifactKey::new("b.npy").unwrap();
        {
            let mut s = open(dir.path(), "01_a");
            s.write(&key_in, &array![1u8, 2, 3], None).unwrap();
            assert_eq!(s.publish().unwrap().len(), 1);
            s.close(0, &[]).unwrap();
        }
        let mut s = open(dir.path(), "02_b");
        let a: Array1<u8> = s.read(&key_in).unwrap();
        let rec = s.write(&key_out, &a.mapv(|v| v as f64), None).unwrap();
        assert_eq!(rec.lineage.len(), 1);
        assert_eq!(rec.lineage[0].key, key_in);
        s.publish().unwrap();
        let summary = s.close(0, &[RunState::Closed]).unwrap().unwrap();
        assert_eq!(summary.inputs.len(), 1);
        assert_eq!(summary.outputs[0].key, key_out);
        assert!(s.close(0, &[]).unwrap().is_none());
        assert_eq!(read_summary(s.run_dir()).unwrap(), summary);
    }

    #[test]
    fn drop_closes_with_failure_code_and_teardown_files() {
        let dir = tempfile::tempdir().unwrap();
        let run_dir;
        {
            let mut s = open(dir.path(), "02_plot");
            let _fig = s.plt().subplots(1, 1, (100, 100));
            s.logger().info("working");
            run_dir = s.run_dir().to_path_buf();
        }
        let summary = read_summary(&run_dir).unwrap();
        assert_eq!(summary.exit_code, 1);
        assert_eq!(summary.figures_left_open, 1);
        assert!(run_dir.join(SESSION_EVENTS_FILE).exists());
        let log = fs::read_to_string(run_dir.join(SESSION_LOG_FILE)).unwrap();
        assert!(log.contains("working"));
    }

    #[test]
    fn unpublished_writes_stay_out_of_index_and_alias() {
        let dir = tempfile::tempdir().unwrap();
        let alias_dir = dir.path().join("alias");
        let key = ArtifactKey::new("mnist/predictions.npy").unwrap();
        let rec;
        {
            let mut s = open(dir.path(), "04_clf_svm");
            rec = s.write(&key, &array![9u8, 9], Some(&alias_dir)).unwrap();
            assert!(s.has_written(&key));
            assert_eq!(s.pending(), 1);
            assert!(!s.store().contains(&key));
        }
        let store = ArtifactStore::open(dir.path()).unwrap();
        assert!(store.layout().absolute(&rec.path).exists());
        assert!(!store.contains(&key));
        assert!(matches!(store.read::<Array1<u8>>(&key), Err(StoreError::NotFound(_))));
        assert!(crate::store::resolve_alias(&alias_dir, &key).is_err());
    }

    #[test]
    fn publish_commits_pending_writes_once() {
        let dir = tempfile::tempdir().unwrap();
        let alias_dir = dir.path().join("alias");
        let key = ArtifactKey::new("mnist/labels.npy").unwrap();
        let mut s = open(dir.path(), "01_download");
        s.write(&key, &array![3u8, 1, 4], Some(&alias_dir)).unwrap();
        let published = s.publish().unwrap();
        assert_eq!(published.len(), 1);
        assert!(s.publish().unwrap().is_empty());
        let stored: Array1<u8> = s.store().read(&key).unwrap();
        assert_eq!(stored, array![3u8, 1, 4]);
        let alias = crate::store::resolve_alias(&alias_dir, &key).unwrap();
        assert_eq!(alias.run_id, s.run_id());
        let kinds: Vec<_> = s.events().into_iter().map(|e| e.kind).collect();
        assert!(kinds.iter().any(|k| matches!(k, SessionEventKind::ArtifactPublished { .. })));
        assert!(kinds.iter().any(|k| matches!(k, SessionEventKind::AliasUpdated { .. })));
    }
}
