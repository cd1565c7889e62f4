//! Generadores pseudoaleatorios sembrados por nombre de stream.
use std::collections::HashMap;

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::hashing::hash_str;

/// Un generador ChaCha por stream con nombre, derivado de una semilla base.
///
/// La semilla de cada stream es `blake3("<base>:<name>")`: dos sesiones con la
/// misma base reproducen exactamente las mismas secuencias, y streams con
/// nombres distintos son independientes entre sí.
#[derive(Debug, Clone)]
pub struct RngManager {
    base_seed: u64,
    streams: HashMap<String, ChaCha8Rng>,
}

impl RngManager {
    pub fn new(base_seed: u64) -> Self {
        Self { base_seed,
               streams: HashMap::new() }
    }

    pub fn base_seed(&self) -> u64 {
        self.base_seed
    }

    /// Stream persistente dentro de la sesión (avanza entre llamadas).
    pub fn stream(&mut self, name: &str) -> &mut ChaCha8Rng {
        let seed = derive_seed(self.base_seed, name);
        self.streams.entry(name.to_string()).or_insert_with(|| ChaCha8Rng::seed_from_u64(seed))
    }

    /// Generador nuevo con semilla explícita (p. ej. `RANDOM_STATE` de la config).
    pub fn seeded(&self, name: &str, seed: u64) -> ChaCha8Rng {
        ChaCha8Rng::seed_from_u64(derive_seed(seed, name))
    }
}

pub fn derive_seed(base: u64, name: &str) -> u64 {
    let digest = hash_str(&format!("{base}:{name}"));
    u64::from_str_radix(&digest[..16], 16).unwrap_or(base)
}
