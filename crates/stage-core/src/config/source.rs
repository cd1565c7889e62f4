//! Fuentes declarativas de configuración.

use std::env;
use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;
use serde_json::{Map, Value};

use crate::errors::ConfigError;

// Carga perezosa del archivo .env una sola vez por proceso.
static DOTENV_LOADED: Lazy<()> = Lazy::new(|| {
    let _ = dotenvy::dotenv(); // ignora error si no existe .env
});

/// Separador de niveles en variables de entorno (`PREFIX__MNIST__RANDOM_STATE`).
pub const ENV_SEPARATOR: &str = "__";

/// Una fuente de configuración. El orden en el resolver define la prioridad:
/// fuentes posteriores pisan a las anteriores.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigSource {
    /// Documento YAML (o JSON) en disco.
    File(PathBuf),
    /// Árbol en memoria, p. ej. overrides de tests o de la CLI.
    Tree { name: String, tree: Value },
    /// Variables de entorno con el prefijo dado; el valor se interpreta como
    /// un escalar YAML (literal tipado).
    Env { prefix: String },
}

impl ConfigSource {
    pub fn describe(&self) -> String {
        match self {
            ConfigSource::File(p) => p.display().to_string(),
            ConfigSource::Tree { name, .. } => format!("tree:{name}"),
            ConfigSource::Env { prefix } => format!("env:{prefix}{ENV_SEPARATOR}*"),
        }
    }

    /// Carga la fuente como árbol. `None` cuando la fuente no aporta claves.
    pub fn load(&self) -> Result<Option<Value>, ConfigError> {
        match self {
            ConfigSource::File(path) => load_file(path).map(Some),
            ConfigSource::Tree { name, tree } => match tree {
                Value::Object(_) => Ok(Some(tree.clone())),
                Value::Null => Ok(None),
                _ => Err(ConfigError::Parse { path: format!("tree:{name}"),
                                              reason: "top level must be a mapping".into() }),
            },
            ConfigSource::Env { prefix } => {
                Lazy::force(&DOTENV_LOADED);
                Ok(env_tree(prefix, env::vars()))
            }
        }
    }
}

fn load_file(path: &Path) -> Result<Value, ConfigError> {
    let text = std::fs::read_to_string(path).map_err(|e| ConfigError::Source { path: path.display().to_string(),
                                                                              reason: e.to_string() })?;
    let is_json = path.extension().map(|e| e == "json").unwrap_or(false);
    let parsed: Result<Value, String> = if is_json {
        serde_json::from_str(&text).map_err(|e| e.to_string())
    } else {
        serde_yaml::from_str(&text).map_err(|e| e.to_string())
    };
    let value = parsed.map_err(|reason| ConfigError::Parse { path: path.display().to_string(),
                                                              reason })?;
    match value {
        Value::Object(_) => Ok(value),
        // Documento vacío
        Value::Null => Ok(Value::Object(Map::new())),
        _ => Err(ConfigError::Parse { path: path.display().to_string(),
                                      reason: "top level must be a mapping".into() }),
    }
}

/// Construye un árbol a partir de pares (nombre, valor) con el prefijo dado.
pub(crate) fn env_tree<I>(prefix: &str, vars: I) -> Option<Value>
    where I: IntoIterator<Item = (String, String)>
{
    let wanted = format!("{prefix}{ENV_SEPARATOR}");
    let mut root = Map::new();
    let mut any = false;
    for (name, raw) in vars {
        let Some(rest) = name.strip_prefix(&wanted) else { continue };
        let segments: Vec<&str> = rest.split(ENV_SEPARATOR).filter(|s| !s.is_empty()).collect();
        if segments.is_empty() {
            continue;
        }
        insert_path(&mut root, &segments, scalar(&raw));
        any = true;
    }
    any.then_some(Value::Object(root))
}

fn insert_path(node: &mut Map<String, Value>, segments: &[&str], leaf: Value) {
    let (head, tail) = (segments[0], &segments[1..]);
    if tail.is_empty() {
        node.insert(head.to_string(), leaf);
        return;
    }
    let child = node.entry(head.to_string()).or_insert_with(|| Value::Object(Map::new()));
    if !child.is_object() {
        *child = Value::Object(Map::new());
    }
    if let Value::Object(map) = child {
        insert_path(map, tail, leaf);
    }
}

// "64" -> 64, "true" -> true, "[0.5]" -> [0.5]; cualquier otra cosa queda como string.
fn scalar(raw: &str) -> Value {
    serde_yaml::from_str::<Value>(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn env_vars_become_typed_nested_leaves() {
        let vars = vec![("APP__MNIST__BATCH_SIZE__TRAIN".to_string(), "64".to_string()),
                        ("APP__PATH__MNIST__RAW".to_string(), "./raw".to_string()),
                        ("APP__MNIST__NORMALIZE__MEAN".to_string(), "[0.5]".to_string()),
                        ("OTHER__X".to_string(), "1".to_string())];
        let tree = env_tree("APP", vars).unwrap();
        assert_eq!(tree, json!({"MNIST": {"BATCH_SIZE": {"TRAIN": 64}, "NORMALIZE": {"MEAN": [0.5]}},
                                "PATH": {"MNIST": {"RAW": "./raw"}}}));
    }

    #[test]
    fn env_without_matching_vars_contributes_nothing() {
        assert!(env_tree("APP", vec![("PATH".to_string(), "/usr/bin".to_string())]).is_none());
    }
}
