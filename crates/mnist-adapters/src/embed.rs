//! Proyección 2-D (t-SNE Barnes-Hut de `linfa-tsne`).

use linfa::prelude::*;
use linfa_tsne::TSneParams;
use ndarray::Array2;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::errors::MnistError;

/// Mínimo de muestras con el que t-SNE produce una proyección.
pub const MIN_EMBED_SAMPLES: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EmbedParams {
    pub perplexity: f64,
    pub approx_threshold: f64,
    pub max_iter: usize,
    pub seed: u64,
}

/// Perplejidad máxima admisible para `n` muestras.
pub fn max_perplexity(n: usize) -> f64 {
    (n.saturating_sub(1) as f64 / 3.0) - 1e-3
}

/// Proyecta `x` (n x d) a n x 2. La perplejidad se recorta al máximo
/// admisible para el tamaño de la muestra.
pub fn embed_2d(x: Array2<f64>, params: EmbedParams) -> Result<Array2<f64>, MnistError> {
    let n = x.nrows();
    if n < MIN_EMBED_SAMPLES {
        return Err(MnistError::Embedding(format!("need at least {MIN_EMBED_SAMPLES} samples, got {n}")));
    }
    let limit = max_perplexity(n);
    let perplexity = if params.perplexity > limit {
        log::warn!("perplexity {} too large for {n} samples, using {limit:.3}", params.perplexity);
        limit
    } else {
        params.perplexity
    };
    let rng = ChaCha8Rng::seed_from_u64(params.seed);
    TSneParams::embedding_size_with_rng(2, rng).perplexity(perplexity)
                                               .approx_threshold(params.approx_threshold)
                                               .max_iter(params.max_iter)
                                               .transform(x)
                                               .map_err(|e| MnistError::Embedding(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn points() -> Array2<f64> {
        Array2::from_shape_fn((30, 4), |(i, j)| ((i % 3) * 10 + j) as f64 + (i as f64) * 0.01)
    }

    fn params() -> EmbedParams {
        EmbedParams { perplexity: 30.0,
                      approx_threshold: 0.5,
                      max_iter: 250,
                      seed: 7 }
    }

    #[test]
    fn output_has_two_columns_per_sample() {
        let out = embed_2d(points(), params()).unwrap();
        assert_eq!(out.dim(), (30, 2));
        assert!(out.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn same_seed_same_embedding() {
        let a = embed_2d(points(), params()).unwrap();
        let b = embed_2d(points(), params()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn too_few_samples_is_an_error() {
        let x = Array2::zeros((3, 2));
        assert!(matches!(embed_2d(x, params()), Err(MnistError::Embedding(_))));
    }
}
