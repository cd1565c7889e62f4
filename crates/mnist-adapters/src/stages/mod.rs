//! Los cinco stages numerados del pipeline MNIST.
//!
//! Cada stage es un `TypedStage` con `MnistSettings` como esquema: las claves
//! que lee y escribe salen de `PATH.MNIST.*`, así que `Pipeline::validate`
//! puede comprobar el orden sin ejecutar nada.

mod clf_svm;
mod download;
mod plot_conf_mat;
mod plot_digits;
mod plot_embedding;

use std::path::Path;

use ndarray::{Array1, Array2, Axis};
use rand::Rng;
use stage_core::Pipeline;

pub use clf_svm::ClfSvm;
pub use download::Download;
pub use plot_conf_mat::PlotConfMat;
pub use plot_digits::PlotDigits;
pub use plot_embedding::PlotEmbedding;

use crate::errors::MnistError;
use crate::settings::MnistSettings;

/// Pipeline completo en orden de dependencias.
pub fn pipeline() -> Pipeline {
    Pipeline::new().stage(Download)
                   .stage(PlotDigits)
                   .stage(PlotEmbedding)
                   .stage(ClfSvm)
                   .stage(PlotConfMat)
}

fn alias_dir(settings: &MnistSettings) -> Option<&Path> {
    Some(settings.path.mnist.alias_dir.as_path())
}

/// `k` índices distintos de `0..n`, ordenados. Con `k >= n` devuelve todos.
pub(crate) fn subsample<R: Rng + ?Sized>(n: usize, k: usize, rng: &mut R) -> Vec<usize> {
    if k >= n {
        return (0..n).collect();
    }
    let mut idx = rand::seq::index::sample(rng, n, k).into_vec();
    idx.sort_unstable();
    idx
}

/// Filas `idx` de `x` como `f64` junto con sus etiquetas.
pub(crate) fn select_rows(x: &Array2<f32>,
                          y: &Array1<u8>,
                          idx: &[usize])
                          -> Result<(Array2<f64>, Array1<u8>), MnistError> {
    if x.nrows() != y.len() {
        return Err(MnistError::Shape(format!("{} rows but {} labels", x.nrows(), y.len())));
    }
    Ok((x.select(Axis(0), idx).mapv(f64::from), y.select(Axis(0), idx)))
}
