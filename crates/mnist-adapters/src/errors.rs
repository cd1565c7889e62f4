use std::path::PathBuf;

use stage_core::StageError;
use thiserror::Error;

/// Fallos del colaborador numérico (descarga, parseo, librerías externas).
#[derive(Debug, Error)]
pub enum MnistError {
    #[error("download of {url} failed: {reason}")]
    Download { url: String, reason: String },
    #[error("{} is not a valid IDX file: {reason}", path.display())]
    Idx { path: PathBuf, reason: String },
    #[error("io error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("shape mismatch: {0}")]
    Shape(String),
    #[error("svm: {0}")]
    Svm(String),
    #[error("embedding: {0}")]
    Embedding(String),
}

impl MnistError {
    pub(crate) fn io(path: impl Into<PathBuf>) -> impl FnOnce(std::io::Error) -> MnistError {
        let path = path.into();
        move |source| MnistError::Io { path, source }
    }

    fn context(&self) -> &'static str {
        match self {
            MnistError::Download { .. } => "downloading the dataset",
            MnistError::Idx { .. } | MnistError::Io { .. } => "reading the raw dataset",
            MnistError::Shape(_) => "checking array shapes",
            MnistError::Svm(_) => "fitting the svm classifier",
            MnistError::Embedding(_) => "projecting the embedding",
        }
    }
}

impl From<MnistError> for StageError {
    fn from(err: MnistError) -> Self {
        StageError::external(err.context(), &err)
    }
}
