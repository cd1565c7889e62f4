//! Hash helpers: abstracción para permitir cambiar de algoritmo sin tocar el resto del core.

use blake3::Hasher;
use serde_json::Value;

use super::to_canonical_json;

/// Hashea un string y devuelve hex.
pub fn hash_str(input: &str) -> String {
    hash_bytes(input.as_bytes())
}

/// Hashea bytes arbitrarios (contenido de artifacts) y devuelve hex.
pub fn hash_bytes(input: &[u8]) -> String {
    let mut h = Hasher::new();
    h.update(input);
    h.finalize().to_hex().to_string()
}

/// Hashea un `Value` sobre su forma canónica (independiente del orden de claves).
pub fn hash_value(value: &Value) -> String {
    hash_str(&to_canonical_json(value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn value_hash_ignores_key_order() {
        let a = json!({"MNIST": {"RANDOM_STATE": 42, "BATCH_SIZE": 64}});
        let b = json!({"MNIST": {"BATCH_SIZE": 64, "RANDOM_STATE": 42}});
        assert_eq!(hash_value(&a), hash_value(&b));
        assert_eq!(hash_str("x"), hash_bytes(b"x"));
        assert_eq!(hash_bytes(b"").len(), 64);
    }
}
