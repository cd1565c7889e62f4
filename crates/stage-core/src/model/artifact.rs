//! Registro de artifacts confirmados.
//!
//! Un `ArtifactRecord` es lo que el store escribe en el puntero del índice al
//! confirmar una escritura: dónde quedó el archivo canónico, su hash blake3,
//! quién lo produjo y qué leyó esa sesión (lineage). Las versiones previas de
//! la misma clave no se borran: quedan listadas en `history`.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ArtifactKey;

/// Familias de formato en disco.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum ArtifactKind {
    /// Arreglo numérico (`.npy`).
    Array,
    /// Tabla (`.csv`).
    Table,
    /// Blob opaco serializado (`bincode`): loaders, modelos.
    Blob,
    /// Figura renderizada (SVG) + compañero serializado.
    Figure,
}

impl ArtifactKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ArtifactKind::Array => "array",
            ArtifactKind::Table => "table",
            ArtifactKind::Blob => "blob",
            ArtifactKind::Figure => "figure",
        }
    }
}

/// Entrada de lineage: un artifact leído por la sesión productora.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LineageEntry {
    pub key: ArtifactKey,
    pub hash: String,
    pub run_id: String,
}

/// Versión anterior de una clave, desplazada por una escritura posterior.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PriorVersion {
    pub run_id: String,
    pub stage: String,
    pub path: String,
    pub hash: String,
    pub written_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ArtifactRecord {
    pub key: ArtifactKey,
    pub kind: ArtifactKind,
    pub type_tag: String,
    pub schema_version: u32,
    /// Ruta canónica relativa a la raíz del store (separador `/`).
    pub path: String,
    pub companion: Option<String>,
    pub hash: String,
    pub companion_hash: Option<String>,
    pub size: u64,
    pub stage: String,
    pub run_id: String,
    pub written_at: DateTime<Utc>,
    #[serde(default)]
    pub lineage: Vec<LineageEntry>,
    #[serde(default)]
    pub history: Vec<PriorVersion>,
}

impl ArtifactRecord {
    /// Resumen de esta versión para la historia de la siguiente.
    pub fn as_prior(&self) -> PriorVersion {
        PriorVersion { run_id: self.run_id.clone(),
                       stage: self.stage.clone(),
                       path: self.path.clone(),
                       hash: self.hash.clone(),
                       written_at: self.written_at }
    }

    pub fn lineage_entry(&self) -> LineageEntry {
        LineageEntry { key: self.key.clone(),
                       hash: self.hash.clone(),
                       run_id: self.run_id.clone() }
    }
}
