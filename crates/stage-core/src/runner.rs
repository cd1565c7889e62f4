//! `StageRunner`: ejecuta un stage dentro de una sesión con teardown garantizado.
//!
//! Flujo de un run:
//! 1. Resolver config y validar los settings del stage (sin efectos en disco).
//! 2. Abrir el store y la sesión ligada a un `RunIdentity` nuevo.
//! 3. Fallar rápido si falta alguna entrada declarada.
//! 4. Invocar el cuerpo (los panics se capturan y cuentan como fallo).
//! 5. Verificar que se escribieron todas las salidas declaradas.
//! 6. Publicar índice y alias de lo escrito; un run fallido no publica nada.
//! 7. Cerrar la sesión siempre y traducir el resultado a código de salida.
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::{Path, PathBuf};

use log::{debug, error, info};

use crate::config::{Config, ConfigResolver};
use crate::errors::StageError;
use crate::event::SessionEventKind;
use crate::session::{RunIdentity, Session, SessionSummary};
use crate::stage::{RunState, StageDefinition, StageIo, StateTracker};
use crate::store::ArtifactStore;

/// Resultado observable de un run.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub stage: String,
    /// `None` cuando el run no llegó a abrir sesión (config inválida).
    pub run_id: Option<String>,
    pub exit_code: u8,
    pub final_state: RunState,
    pub history: Vec<RunState>,
    pub error: Option<String>,
    pub summary: Option<SessionSummary>,
}

impl RunOutcome {
    pub fn succeeded(&self) -> bool {
        self.exit_code == 0
    }
}

#[derive(Debug, Clone)]
pub struct StageRunner {
    resolver: ConfigResolver,
    root: PathBuf,
}

impl StageRunner {
    pub fn new(resolver: ConfigResolver, root: impl Into<PathBuf>) -> Self {
        Self { resolver,
               root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn resolver(&self) -> &ConfigResolver {
        &self.resolver
    }

    pub fn run(&self, stage: &dyn StageDefinition) -> RunOutcome {
        let mut states = StateTracker::default();
        let stage_id = stage.id().to_string();

        let prepared = self.resolver
                           .resolve()
                           .map_err(StageError::from)
                           .and_then(|config| stage.io(&config).map(|io| (config, io)));
        let (config, io) = match prepared {
            Ok(v) => v,
            Err(e) => return abort(stage_id, states, None, e),
        };
        advance(&mut states, None, RunState::ConfigResolved);

        let mut session = match self.open_session(&stage_id, config.clone()) {
            Ok(s) => s,
            Err(e) => return abort(stage_id, states, None, e),
        };
        advance(&mut states, Some(&mut session), RunState::SessionActive);
        info!("[{stage_id}] run {} started", session.run_id());

        let result = check_inputs(&io, &session).and_then(|_| invoke(stage, &config, &mut session))
                                                  .and_then(|_| check_outputs(&io, &session))
                                                  .and_then(|_| publish(&mut session));
        let (mut exit_code, error_text) = match result {
            Ok(()) => {
                session.logger().success(format!("{stage_id} completed"));
                advance(&mut states, Some(&mut session), RunState::Succeeded);
                (0, None)
            }
            Err(e) => {
                let code = e.exit_code();
                session.logger().error(format!("{stage_id} failed: {e}"));
                session.record_event(SessionEventKind::StageFailed { error: e.to_string(),
                                                                     exit_code: code });
                advance(&mut states, Some(&mut session), RunState::Failed);
                (code, Some(e.to_string()))
            }
        };
        advance(&mut states, Some(&mut session), RunState::Closed);

        let summary = match session.close(exit_code, states.history()) {
            Ok(s) => s,
            Err(e) => {
                error!("[{stage_id}] session teardown failed: {e}");
                if exit_code == 0 {
                    exit_code = 1;
                }
                None
            }
        };
        RunOutcome { stage: stage_id,
                     run_id: Some(session.run_id().to_string()),
                     exit_code,
                     final_state: states.current(),
                     history: states.into_history(),
                     error: error_text,
                     summary }
    }

    fn open_session(&self, stage_id: &str, config: Config) -> Result<Session, StageError> {
        let store = ArtifactStore::open(&self.root)?;
        Ok(Session::open(RunIdentity::new(stage_id), config, store)?)
    }
}

// Falla antes de abrir sesión: NotStarted|ConfigResolved -> Failed -> Closed.
fn abort(stage: String, mut states: StateTracker, run_id: Option<String>, e: StageError) -> RunOutcome {
    error!("[{stage}] failed before the session started: {e}");
    advance(&mut states, None, RunState::Failed);
    advance(&mut states, None, RunState::Closed);
    RunOutcome { stage,
                 run_id,
                 exit_code: e.exit_code(),
                 final_state: states.current(),
                 history: states.into_history(),
                 error: Some(e.to_string()),
                 summary: None }
}

fn advance(states: &mut StateTracker, session: Option<&mut Session>, to: RunState) {
    match states.advance(to) {
        Ok(from) => {
            if let Some(s) = session {
                s.record_event(SessionEventKind::StateChanged { from, to });
            }
        }
        Err((from, to)) => error!("rejected run state transition {from:?} -> {to:?}"),
    }
}

fn check_inputs(io: &StageIo, session: &Session) -> Result<(), StageError> {
    match io.reads.iter().find(|k| !session.store().contains(k)) {
        Some(key) => Err(StageError::MissingDependency { key: key.clone() }),
        None => Ok(()),
    }
}

fn check_outputs(io: &StageIo, session: &Session) -> Result<(), StageError> {
    match io.writes.iter().find(|k| !session.has_written(k)) {
        Some(key) => Err(StageError::OutputNotWritten { key: key.clone() }),
        None => Ok(()),
    }
}

// Solo un stage que terminó bien confirma índice y alias.
fn publish(session: &mut Session) -> Result<(), StageError> {
    let published = session.publish()?;
    debug!("[{}] published {} artifact(s)", session.identity().stage(), published.len());
    Ok(())
}

fn invoke(stage: &dyn StageDefinition, config: &Config, session: &mut Session) -> Result<(), StageError> {
    match catch_unwind(AssertUnwindSafe(|| stage.run(config, session))) {
        Ok(result) => result,
        Err(payload) => {
            let msg = payload.downcast_ref::<&str>()
                             .map(|s| s.to_string())
                             .or_else(|| payload.downcast_ref::<String>().cloned())
                             .unwrap_or_else(|| "unknown panic payload".to_string());
            Err(StageError::Panic(msg))
        }
    }
}
