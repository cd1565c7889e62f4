use serde::{Deserialize, Serialize};

/// Estado de un run en el `StageRunner`.
///
/// Las transiciones válidas son:
/// - `NotStarted` -> `ConfigResolved`
/// - `NotStarted` -> `Failed` (la configuración no resolvió)
/// - `ConfigResolved` -> `SessionActive`
/// - `ConfigResolved` -> `Failed` (no se pudo abrir la sesión)
/// - `SessionActive` -> `Succeeded` | `Failed`
/// - `Succeeded` | `Failed` -> `Closed`
///
/// No se permiten reversiones ni saltos arbitrarios entre estados.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunState {
    NotStarted,
    ConfigResolved,
    SessionActive,
    Succeeded,
    Failed,
    Closed,
}

impl RunState {
    pub fn can_transition(self, to: RunState) -> bool {
        use RunState::*;
        matches!((self, to),
                 (NotStarted, ConfigResolved)
                 | (NotStarted, Failed)
                 | (ConfigResolved, SessionActive)
                 | (ConfigResolved, Failed)
                 | (SessionActive, Succeeded)
                 | (SessionActive, Failed)
                 | (Succeeded, Closed)
                 | (Failed, Closed))
    }

    pub fn is_terminal(self) -> bool {
        self == RunState::Closed
    }
}

/// Historial validado de estados de un run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateTracker {
    history: Vec<RunState>,
}

impl Default for StateTracker {
    fn default() -> Self {
        Self { history: vec![RunState::NotStarted] }
    }
}

impl StateTracker {
    pub fn current(&self) -> RunState {
        *self.history.last().unwrap_or(&RunState::NotStarted)
    }

    /// Aplica la transición o devuelve el par inválido.
    pub fn advance(&mut self, to: RunState) -> Result<RunState, (RunState, RunState)> {
        let from = self.current();
        if !from.can_transition(to) {
            return Err((from, to));
        }
        self.history.push(to);
        Ok(from)
    }

    pub fn history(&self) -> &[RunState] {
        &self.history
    }

    pub fn into_history(self) -> Vec<RunState> {
        self.history
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn happy_path_and_config_failure_path_are_valid() {
        let mut t = StateTracker::default();
        for s in [RunState::ConfigResolved, RunState::SessionActive, RunState::Succeeded, RunState::Closed] {
            t.advance(s).unwrap();
        }
        assert!(t.current().is_terminal());

        let mut t = StateTracker::default();
        t.advance(RunState::Failed).unwrap();
        t.advance(RunState::Closed).unwrap();
        assert_eq!(t.history(), &[RunState::NotStarted, RunState::Failed, RunState::Closed]);
    }

    #[test]
    fn skips_and_reversals_are_rejected() {
        let mut t = StateTracker::default();
        assert_eq!(t.advance(RunState::Succeeded), Err((RunState::NotStarted, RunState::Succeeded)));
        t.advance(RunState::ConfigResolved).unwrap();
        assert!(t.advance(RunState::NotStarted).is_err());
        assert!(t.advance(RunState::Closed).is_err());
        assert_eq!(t.current(), RunState::ConfigResolved);
    }
}
