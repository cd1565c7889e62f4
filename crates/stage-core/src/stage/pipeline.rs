use std::collections::HashMap;

use log::info;
use serde_json::json;
use thiserror::Error;

use super::StageDefinition;
use crate::config::Config;
use crate::errors::StageError;
use crate::hashing::hash_value;
use crate::model::ArtifactKey;
use crate::runner::{RunOutcome, StageRunner};

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("stage id `{0}` appears more than once")]
    DuplicateStage(String),
    #[error("artifact `{key}` is written by both `{first}` and `{second}`")]
    DuplicateProducer { key: ArtifactKey, first: String, second: String },
    #[error("stage `{stage}` reads `{key}` but no earlier stage writes it")]
    UnproducedInput { stage: String, key: ArtifactKey },
    #[error("unknown stage `{0}`")]
    UnknownStage(String),
    #[error("stage `{stage}`: {source}")]
    Stage {
        stage: String,
        #[source]
        source: StageError,
    },
}

/// Un paso del plan con sus claves resueltas.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedStage {
    pub index: usize,
    pub id: String,
    pub description: String,
    pub reads: Vec<ArtifactKey>,
    pub writes: Vec<ArtifactKey>,
}

/// Secuencia ordenada de stages.
///
/// Usage:
///   let pipeline = Pipeline::new().stage(Download).stage(PlotDigits);
///   let plan = pipeline.validate(&config)?;
#[derive(Default)]
pub struct Pipeline {
    stages: Vec<Box<dyn StageDefinition>>,
}

impl Pipeline {
    pub fn new() -> Self {
        Self { stages: vec![] }
    }

    pub fn stage<S: StageDefinition + 'static>(mut self, stage: S) -> Self {
        self.stages.push(Box::new(stage));
        self
    }

    pub fn stages(&self) -> &[Box<dyn StageDefinition>] {
        &self.stages
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Hash de la secuencia (ids + hashes de definición, en orden).
    pub fn definition_hash(&self) -> String {
        let ids: Vec<serde_json::Value> = self.stages
                                              .iter()
                                              .map(|s| json!({"id": s.id(), "hash": s.definition_hash()}))
                                              .collect();
        hash_value(&json!({ "stages": ids }))
    }

    /// Resuelve las claves de cada stage sin validar dependencias.
    pub fn plan(&self, config: &Config) -> Result<Vec<PlannedStage>, PipelineError> {
        self.stages
            .iter()
            .enumerate()
            .map(|(index, s)| {
                let io = s.io(config).map_err(|source| PipelineError::Stage { stage: s.id().to_string(),
                                                                              source })?;
                Ok(PlannedStage { index,
                                  id: s.id().to_string(),
                                  description: s.description().to_string(),
                                  reads: io.reads,
                                  writes: io.writes })
            })
            .collect()
    }

    /// Plan validado: cada lectura la escribe un stage anterior y ninguna
    /// clave tiene dos productores.
    pub fn validate(&self, config: &Config) -> Result<Vec<PlannedStage>, PipelineError> {
        let plan = self.plan(config)?;
        let mut seen_ids: Vec<&str> = Vec::new();
        let mut producers: HashMap<&ArtifactKey, &str> = HashMap::new();
        for step in &plan {
            if seen_ids.contains(&step.id.as_str()) {
                return Err(PipelineError::DuplicateStage(step.id.clone()));
            }
            seen_ids.push(&step.id);
            for key in &step.reads {
                if !producers.contains_key(key) {
                    return Err(PipelineError::UnproducedInput { stage: step.id.clone(),
                                                                key: key.clone() });
                }
            }
            for key in &step.writes {
                if let Some(first) = producers.insert(key, &step.id) {
                    return Err(PipelineError::DuplicateProducer { key: key.clone(),
                                                                  first: first.to_string(),
                                                                  second: step.id.clone() });
                }
            }
        }
        Ok(plan)
    }

    /// Ejecuta en orden desde `from` (o desde el primero); se detiene en el
    /// primer fallo. Los stages omitidos deben haber dejado sus salidas en
    /// el store en runs previos.
    pub fn run(&self, runner: &StageRunner, from: Option<&str>) -> Result<Vec<RunOutcome>, PipelineError> {
        let start = match from {
            Some(id) => self.stages
                            .iter()
                            .position(|s| s.id() == id)
                            .ok_or_else(|| PipelineError::UnknownStage(id.to_string()))?,
            None => 0,
        };
        let mut outcomes = Vec::new();
        for stage in &self.stages[start..] {
            let outcome = runner.run(stage.as_ref());
            let ok = outcome.succeeded();
            outcomes.push(outcome);
            if !ok {
                info!("pipeline stopped at `{}`", stage.id());
                break;
            }
        }
        Ok(outcomes)
    }
}
