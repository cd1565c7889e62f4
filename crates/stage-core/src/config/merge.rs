//! Merge determinista de árboles de configuración.
//!
//! Semántica: las hojas de `overlay` reemplazan a las de `base`; los objetos
//! presentes en ambos lados se fusionan recursivamente; una hoja frente a un
//! subárbol en la misma ruta es un conflicto de tipos. Los arrays son hojas.

use serde_json::Value;

use crate::errors::ConfigError;

/// Fusiona `overlay` sobre `base` y devuelve el árbol resultante.
pub fn merge_tree(base: &Value, overlay: &Value) -> Result<Value, ConfigError> {
    let mut path = Vec::new();
    merge_at(base, overlay, &mut path)
}

fn merge_at(base: &Value, overlay: &Value, path: &mut Vec<String>) -> Result<Value, ConfigError> {
    match (base, overlay) {
        (Value::Object(mb), Value::Object(mo)) => {
            let mut out = mb.clone();
            for (k, v) in mo.iter() {
                path.push(k.clone());
                let merged = match mb.get(k) {
                    Some(existing) => merge_at(existing, v, path)?,
                    None => v.clone(),
                };
                path.pop();
                out.insert(k.clone(), merged);
            }
            Ok(Value::Object(out))
        }
        (Value::Object(_), _) | (_, Value::Object(_)) => Err(ConfigError::TypeConflict { path: path.join(".") }),
        // Hoja contra hoja: gana el overlay
        (_, other) => Ok(other.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn overlay_wins_on_leaves_and_keeps_disjoint_keys() {
        let a = json!({"MNIST": {"BATCH_SIZE": {"TRAIN": 32, "TEST": 1000}, "RANDOM_STATE": 42}});
        let b = json!({"MNIST": {"BATCH_SIZE": {"TRAIN": 64}}, "PATH": {"MNIST": {"RAW": "./data/raw"}}});

        let out = merge_tree(&a, &b).unwrap();

        assert_eq!(out["MNIST"]["BATCH_SIZE"]["TRAIN"], json!(64));
        assert_eq!(out["MNIST"]["BATCH_SIZE"]["TEST"], json!(1000));
        assert_eq!(out["MNIST"]["RANDOM_STATE"], json!(42));
        assert_eq!(out["PATH"]["MNIST"]["RAW"], json!("./data/raw"));
    }

    #[test]
    fn leaf_against_subtree_is_a_conflict() {
        let a = json!({"PATH": {"MNIST": {"RAW": "./raw"}}});
        let b = json!({"PATH": {"MNIST": "flat"}});
        assert_eq!(merge_tree(&a, &b), Err(ConfigError::TypeConflict { path: "PATH.MNIST".into() }));
        // y en sentido inverso
        assert_eq!(merge_tree(&b, &a), Err(ConfigError::TypeConflict { path: "PATH.MNIST".into() }));
    }

    #[test]
    fn arrays_are_replaced_not_concatenated() {
        let a = json!({"MNIST": {"NORMALIZE": {"MEAN": [0.1, 0.2]}}});
        let b = json!({"MNIST": {"NORMALIZE": {"MEAN": [0.5]}}});
        let out = merge_tree(&a, &b).unwrap();
        assert_eq!(out["MNIST"]["NORMALIZE"]["MEAN"], json!([0.5]));
    }
}
