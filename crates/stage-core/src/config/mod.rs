//! Resolución de configuración jerárquica.
//!
//! Un `Config` es un árbol clave/valor con namespaces (`PATH.MNIST.RAW`,
//! `MNIST.BATCH_SIZE.TRAIN`) resuelto una vez por sesión a partir de fuentes
//! ordenadas. Es inmutable: sólo expone accesos de lectura y se comparte
//! detrás de un `Arc`. Los stages lo consumen a través de un esquema tipado
//! (`Config::typed`) validado al cargar, no por acceso dinámico tardío.

mod lint;
mod merge;
mod resolver;
mod source;

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::errors::ConfigError;
use crate::hashing::hash_value;

pub use lint::reject_expressions;
pub use merge::merge_tree;
pub use resolver::{resolve, ConfigResolver};
pub use source::{ConfigSource, ENV_SEPARATOR};

/// Árbol de configuración resuelto (sólo lectura).
#[derive(Debug, Clone)]
pub struct Config {
    tree: Arc<Value>,
    sources: Arc<[String]>,
    fingerprint: String,
}

impl Config {
    pub(crate) fn new(tree: Value, sources: Vec<String>) -> Self {
        let fingerprint = hash_value(&tree);
        Self { tree: Arc::new(tree),
               sources: sources.into(),
               fingerprint }
    }

    /// Construye un `Config` desde un árbol ya fusionado (útil en tests).
    pub fn from_tree(tree: Value) -> Result<Self, ConfigError> {
        resolve(&[ConfigSource::Tree { name: "inline".into(),
                                       tree }])
    }

    pub fn tree(&self) -> &Value {
        &self.tree
    }

    /// Descripción de las fuentes que aportaron claves, en orden de merge.
    pub fn sources(&self) -> &[String] {
        &self.sources
    }

    /// Hash canónico del árbol completo.
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    /// Acceso por ruta con puntos (`PATH.MNIST.RAW`).
    pub fn get(&self, path: &str) -> Result<&Value, ConfigError> {
        let mut node: &Value = &self.tree;
        for segment in path.split('.') {
            let next = match node {
                Value::Object(map) => map.get(segment),
                Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
                _ => None,
            };
            node = next.ok_or_else(|| ConfigError::MissingKey { path: path.to_string() })?;
        }
        Ok(node)
    }

    pub fn contains(&self, path: &str) -> bool {
        self.get(path).is_ok()
    }

    /// Acceso tipado por ruta.
    pub fn get_as<T: DeserializeOwned>(&self, path: &str) -> Result<T, ConfigError> {
        let node = self.get(path)?;
        serde_json::from_value(node.clone()).map_err(|e| ConfigError::Invalid { path: path.to_string(),
                                                                              reason: e.to_string() })
    }

    /// Deserializa el árbol completo en un esquema tipado.
    pub fn typed<T: DeserializeOwned>(&self) -> Result<T, ConfigError> {
        serde_json::from_value(self.tree.as_ref().clone()).map_err(|e| ConfigError::Invalid { path: "<root>".into(),
                                                                                             reason: e.to_string() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[test]
    fn dotted_access_and_missing_keys() {
        let cfg = Config::from_tree(json!({"MNIST": {"BATCH_SIZE": {"TRAIN": 64}}})).unwrap();
        assert_eq!(cfg.get_as::<usize>("MNIST.BATCH_SIZE.TRAIN").unwrap(), 64);
        assert_eq!(cfg.get("MNIST.BATCH_SIZE.TEST").unwrap_err(),
                   ConfigError::MissingKey { path: "MNIST.BATCH_SIZE.TEST".into() });
        assert!(matches!(cfg.get_as::<String>("MNIST.BATCH_SIZE.TRAIN"), Err(ConfigError::Invalid { .. })));
    }

    #[test]
    fn typed_schema_is_checked_at_load() {
        #[derive(Deserialize)]
        #[allow(dead_code)]
        struct Schema {
            #[serde(rename = "MNIST")]
            mnist: Value,
        }
        let cfg = Config::from_tree(json!({"PATH": {}})).unwrap();
        assert!(matches!(cfg.typed::<Schema>(), Err(ConfigError::Invalid { .. })));
    }

    #[test]
    fn fingerprint_ignores_key_order() {
        let a = Config::from_tree(json!({"A": 1, "B": {"C": 2}})).unwrap();
        let b = Config::from_tree(json!({"B": {"C": 2}, "A": 1})).unwrap();
        assert_eq!(a.fingerprint(), b.fingerprint());
    }
}
