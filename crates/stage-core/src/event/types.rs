//! Tipos de evento de sesión y estructura `SessionEvent`.
//!
//! Rol en el flujo:
//! - Cada sesión emite eventos a un `EventStore` append-only mientras vive.
//! - Al cerrar, la secuencia completa se vuelca a `events.jsonl` dentro del
//!   directorio del run, junto a `session.json`. Es un registro de auditoría:
//!   el historial de versiones de una clave sale de los punteros del índice.
//! - El enum `SessionEventKind` es el contrato observable del runner.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::stage::RunState;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum SessionEventKind {
    /// Primer evento de un run: fija stage y huella de configuración.
    SessionStarted { stage: String, config_fingerprint: String },
    /// Transición del state machine del runner.
    StateChanged { from: RunState, to: RunState },
    /// Lectura de un artifact confirmado (entra al lineage).
    ArtifactRead { key: String, hash: String, run_id: String },
    /// Archivo canónico escrito; todavía no visible en el índice.
    ArtifactWritten { key: String, hash: String, path: String },
    /// Escritura confirmada en el índice al terminar bien el stage.
    ArtifactPublished { key: String, hash: String },
    /// Alias recreado para la clave.
    AliasUpdated { key: String, alias_dir: String },
    /// Fallo terminal del stage.
    StageFailed { error: String, exit_code: u8 },
    /// Cierre de la sesión con su huella agregada.
    SessionClosed { exit_code: u8, fingerprint: String },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SessionEvent {
    pub seq: u64, // orden de append dentro del run
    pub run_id: String,
    pub kind: SessionEventKind,
    pub ts: DateTime<Utc>,
}
