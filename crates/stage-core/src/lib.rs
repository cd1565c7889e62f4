//! stage-core: protocolo de pipelines por stages con artifacts persistidos.
//!
//! Cada stage obtiene una configuración resuelta, lee artifacts con nombre de
//! stages anteriores, hace una transformación y escribe artifacts bajo una
//! convención que permite localizarlos de forma determinista (incluyendo
//! alias "esta salida corresponde a este dataset lógico").
pub mod config;
pub mod constants;
pub mod errors;
pub mod event;
pub mod hashing;
pub mod model;
pub mod plot;
pub mod runner;
pub mod session;
pub mod stage;
pub mod store;

pub use config::{Config, ConfigResolver, ConfigSource};
pub use errors::{ConfigError, StageError, StoreError};
pub use event::{EventStore, InMemoryEventStore, SessionEvent, SessionEventKind};
pub use model::{ArtifactKey, ArtifactKind, ArtifactRecord, ArtifactValue, TableRow};
pub use plot::{Figure, PlotContext};
pub use runner::{RunOutcome, StageRunner};
pub use session::{RunIdentity, Session, SessionSummary};
pub use stage::{Pipeline, PipelineError, RunState, StageDefinition, StageIo, TypedStage};
pub use store::ArtifactStore;
