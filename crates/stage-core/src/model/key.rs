use std::fmt;

use serde::{Deserialize, Serialize};

use crate::errors::StoreError;

/// Ruta lógica normalizada que identifica un artifact entre runs.
///
/// Relativa, separada por `/`, sin segmentos `.`/`..` ni prefijo `./`.
/// `./data/mnist//x.npy` y `data/mnist/x.npy` son la misma clave.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ArtifactKey(String);

impl ArtifactKey {
    pub fn new(raw: &str) -> Result<Self, StoreError> {
        let invalid = |reason: &str| StoreError::InvalidKey { key: raw.to_string(),
                                                              reason: reason.to_string() };
        let unified = raw.trim().replace('\\', "/");
        if unified.is_empty() {
            return Err(invalid("empty key"));
        }
        if unified.starts_with('/') {
            return Err(invalid("absolute paths are not artifact keys"));
        }
        if unified.ends_with('/') {
            return Err(invalid("key names a directory"));
        }
        let mut segments = Vec::new();
        for segment in unified.split('/') {
            match segment {
                "" | "." => continue,
                ".." => return Err(invalid("parent segments are not allowed")),
                s => segments.push(s),
            }
        }
        if segments.is_empty() {
            return Err(invalid("empty key"));
        }
        Ok(Self(segments.join("/")))
    }

    /// Une un prefijo de directorio (p. ej. `PATH.MNIST.FIGURES`) con un nombre.
    pub fn under(prefix: &str, name: &str) -> Result<Self, StoreError> {
        let prefix = prefix.trim_end_matches('/');
        if prefix.is_empty() {
            Self::new(name)
        } else {
            Self::new(&format!("{prefix}/{name}"))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Último segmento (nombre del symlink de alias).
    pub fn file_name(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or(&self.0)
    }

    pub fn extension(&self) -> Option<&str> {
        let name = self.file_name();
        name.rfind('.').filter(|i| *i > 0).map(|i| &name[i + 1..])
    }
}

impl fmt::Display for ArtifactKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for ArtifactKey {
    type Error = StoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(&value)
    }
}

impl From<ArtifactKey> for String {
    fn from(key: ArtifactKey) -> Self {
        key.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_equivalent_spellings() {
        let a = ArtifactKey::new("./data/mnist//flattened_train.npy").unwrap();
        let b = ArtifactKey::new("data/mnist/flattened_train.npy").unwrap();
        assert_eq!(a, b);
        assert_eq!(a.file_name(), "flattened_train.npy");
        assert_eq!(a.extension(), Some("npy"));
    }

    #[test]
    fn rejects_escaping_or_empty_keys() {
        for raw in ["", "/abs/x.npy", "../x.npy", "data/../../x", "figures/", "./"] {
            assert!(matches!(ArtifactKey::new(raw), Err(StoreError::InvalidKey { .. })), "{raw} should be rejected");
        }
    }

    #[test]
    fn under_joins_directory_prefixes() {
        let k = ArtifactKey::under("./figures/", "umap.svg").unwrap();
        assert_eq!(k.as_str(), "figures/umap.svg");
        assert_eq!(ArtifactKey::under("", "x.csv").unwrap().as_str(), "x.csv");
    }
}
