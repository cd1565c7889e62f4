//! Rechazo de valores con forma de expresión.
//!
//! La configuración sólo admite literales tipados. Cadenas que piden ser
//! evaluadas (f-strings, `eval(...)`, tuplas escritas como texto, referencias
//! `{CONFIG.X}`) se rechazan al cargar en lugar de interpretarse.

use serde_json::Value;

use crate::errors::ConfigError;

/// Recorre el árbol y devuelve el primer valor con forma de expresión.
pub fn reject_expressions(tree: &Value) -> Result<(), ConfigError> {
    let mut path = Vec::new();
    walk(tree, &mut path)
}

fn walk(value: &Value, path: &mut Vec<String>) -> Result<(), ConfigError> {
    match value {
        Value::Object(map) => {
            for (k, v) in map {
                path.push(k.clone());
                walk(v, path)?;
                path.pop();
            }
            Ok(())
        }
        Value::Array(items) => {
            for (i, v) in items.iter().enumerate() {
                path.push(i.to_string());
                walk(v, path)?;
                path.pop();
            }
            Ok(())
        }
        Value::String(s) if looks_like_expression(s) => Err(ConfigError::Expression { path: path.join("."),
                                                                                       value: s.clone() }),
        _ => Ok(()),
    }
}

fn looks_like_expression(raw: &str) -> bool {
    let s = raw.trim();
    let f_string = s.starts_with("f\"") || s.starts_with("f'");
    let call = ["eval(", "exec(", "lambda ", "lambda:", "__import__"].iter().any(|p| s.contains(p));
    let tuple = s.starts_with('(') && s.ends_with(')') && s.contains(',');
    let reference = s.contains("{CONFIG.");
    f_string || call || tuple || reference
}
