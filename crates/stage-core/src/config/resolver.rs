//! `ConfigResolver`: fusiona fuentes ordenadas en un `Config` inmutable.

use std::path::Path;

use serde_json::{Map, Value};

use super::lint::reject_expressions;
use super::merge::merge_tree;
use super::source::ConfigSource;
use super::Config;
use crate::errors::ConfigError;

/// Lista ordenada de fuentes; la última tiene mayor prioridad.
#[derive(Debug, Clone, Default)]
pub struct ConfigResolver {
    sources: Vec<ConfigSource>,
}

impl ConfigResolver {
    pub fn new() -> Self {
        Self { sources: vec![] }
    }

    /// Todos los `*.yaml`/`*.yml`/`*.json` de `dir`, ordenados por nombre de archivo.
    pub fn from_dir(dir: &Path) -> Result<Self, ConfigError> {
        let entries = std::fs::read_dir(dir).map_err(|e| ConfigError::Source { path: dir.display().to_string(),
                                                                             reason: e.to_string() })?;
        let mut files = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| ConfigError::Source { path: dir.display().to_string(),
                                                                reason: e.to_string() })?;
            let path = entry.path();
            let is_doc = path.extension()
                             .and_then(|e| e.to_str())
                             .map(|e| matches!(e, "yaml" | "yml" | "json"))
                             .unwrap_or(false);
            if path.is_file() && is_doc {
                files.push(path);
            }
        }
        files.sort();
        Ok(Self { sources: files.into_iter().map(ConfigSource::File).collect() })
    }

    pub fn with_source(mut self, source: ConfigSource) -> Self {
        self.sources.push(source);
        self
    }

    pub fn with_tree(self, name: &str, tree: Value) -> Self {
        self.with_source(ConfigSource::Tree { name: name.to_string(),
                                              tree })
    }

    pub fn with_env(self, prefix: &str) -> Self {
        self.with_source(ConfigSource::Env { prefix: prefix.to_string() })
    }

    pub fn sources(&self) -> &[ConfigSource] {
        &self.sources
    }

    pub fn resolve(&self) -> Result<Config, ConfigError> {
        resolve(&self.sources)
    }
}

/// Fusiona las fuentes en orden y valida el árbol resultante.
pub fn resolve(sources: &[ConfigSource]) -> Result<Config, ConfigError> {
    let mut tree = Value::Object(Map::new());
    let mut used = Vec::with_capacity(sources.len());
    for source in sources {
        if let Some(doc) = source.load()? {
            tree = merge_tree(&tree, &doc)?;
            used.push(source.describe());
        }
    }
    reject_expressions(&tree)?;
    Ok(Config::new(tree, used))
}
