use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identidad de un run: stage productor + id único ordenable por tiempo.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunIdentity {
    stage: String,
    run_id: String,
    started_at: DateTime<Utc>,
}

impl RunIdentity {
    /// `run_id` = `YYYYmmdd-HHMMSS_<8 hex>`: ordena cronológicamente y no colisiona
    /// entre procesos que arrancan en el mismo segundo.
    pub fn new(stage: &str) -> Self {
        let started_at = Utc::now();
        let short = Uuid::new_v4().simple().to_string();
        let run_id = format!("{}_{}", started_at.format("%Y%m%d-%H%M%S"), &short[..8]);
        Self { stage: stage.to_string(),
               run_id,
               started_at }
    }

    pub fn stage(&self) -> &str {
        &self.stage
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }
}
