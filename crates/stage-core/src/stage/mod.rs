//! Definiciones relacionadas a stages.
//!
//! Un stage es una unidad que lee artifacts declarados, hace una
//! transformación y escribe artifacts declarados. Este módulo define:
//! - `StageDefinition`: interfaz neutral usada por el runner.
//! - `TypedStage`: interfaz de alto nivel con settings tipados.
//! - `RunState`: state machine de un run.
//! - `Pipeline`: secuencia ordenada de stages con validación estática.

mod definition;
mod pipeline;
mod status;
mod typed;

pub use definition::{StageDefinition, StageIo};
pub use pipeline::{Pipeline, PipelineError, PlannedStage};
pub use status::{RunState, StateTracker};
pub use typed::TypedStage;
