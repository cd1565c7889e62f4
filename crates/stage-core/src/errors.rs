//! Errores del core: configuración, store de artifacts y ejecución de stages.
//!
//! La taxonomía es fija: `ConfigError` (resolución/merge/claves), errores del
//! store y `StageError`, que es lo que el runner convierte en código de
//! salida. Ningún error se silencia dentro de un stage.

use std::path::PathBuf;

use thiserror::Error;

use crate::model::ArtifactKey;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("config source `{path}` not readable: {reason}")]
    Source { path: String, reason: String },
    #[error("config source `{path}` is not a valid document: {reason}")]
    Parse { path: String, reason: String },
    #[error("type conflict at `{path}`: a leaf and a subtree share the same path")]
    TypeConflict { path: String },
    #[error("missing config key `{path}`")]
    MissingKey { path: String },
    #[error("invalid config value at `{path}`: {reason}")]
    Invalid { path: String, reason: String },
    #[error("config value at `{path}` looks like an expression to evaluate ({value}); only typed literals are accepted")]
    Expression { path: String, value: String },
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("artifact `{0}` has never been written")]
    NotFound(ArtifactKey),
    #[error("artifact `{key}` cannot be decoded: expected {expected}, found {actual}")]
    Format { key: ArtifactKey, expected: String, actual: String },
    #[error("artifact `{key}` was already written by run {run_id}")]
    AlreadyWritten { key: ArtifactKey, run_id: String },
    #[error("invalid artifact key `{key}`: {reason}")]
    InvalidKey { key: String, reason: String },
    #[error("artifact `{key}` cannot be encoded: {reason}")]
    Encode { key: ArtifactKey, reason: String },
    #[error("index record {} is unreadable: {reason}", path.display())]
    CorruptIndex { path: PathBuf, reason: String },
    #[error("io error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl StoreError {
    pub(crate) fn io(path: impl Into<PathBuf>) -> impl FnOnce(std::io::Error) -> StoreError {
        let path = path.into();
        move |source| StoreError::Io { path, source }
    }
}

/// Error terminal de un stage. El runner lo registra, cierra la sesión y lo
/// traduce a un código de salida distinto de cero.
#[derive(Debug, Error)]
pub enum StageError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("missing dependency: artifact `{key}` has never been written")]
    MissingDependency { key: ArtifactKey },
    #[error("artifact format error for `{key}`: expected {expected}, found {actual}")]
    ArtifactFormat { key: ArtifactKey, expected: String, actual: String },
    #[error("external library failed while {context}: {message}")]
    ExternalLibrary { context: String, message: String },
    #[error("declared output `{key}` was not written by the stage")]
    OutputNotWritten { key: ArtifactKey },
    #[error(transparent)]
    Store(StoreError),
    #[error("stage panicked: {0}")]
    Panic(String),
    #[error("internal: {0}")]
    Internal(String),
}

impl StageError {
    /// Envuelve un fallo de la librería numérica conservando su mensaje original.
    pub fn external(context: impl Into<String>, err: impl std::fmt::Display) -> Self {
        StageError::ExternalLibrary { context: context.into(),
                                      message: err.to_string() }
    }

    /// Código de salida del proceso para este error.
    pub fn exit_code(&self) -> u8 {
        match self {
            StageError::Config(_) => 2,
            StageError::MissingDependency { .. } => 3,
            StageError::ArtifactFormat { .. } => 4,
            StageError::ExternalLibrary { .. } => 5,
            StageError::Panic(_) => 101,
            StageError::OutputNotWritten { .. } | StageError::Store(_) | StageError::Internal(_) => 1,
        }
    }
}

impl From<StoreError> for StageError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(key) => StageError::MissingDependency { key },
            StoreError::Format { key, expected, actual } => StageError::ArtifactFormat { key, expected, actual },
            other => StageError::Store(other),
        }
    }
}
