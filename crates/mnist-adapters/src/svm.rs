//! Clasificador SVM RBF one-vs-rest sobre `linfa-svm`.
//!
//! Se entrena una máquina binaria por clase (en paralelo con rayon) con
//! salida probabilística (Platt); la predicción es el argmax de las
//! probabilidades. El ancho del kernel gaussiano de linfa es
//! `exp(-||x-y||² / eps)`, o sea `eps = 1 / gamma`.

use linfa::dataset::Pr;
use linfa::prelude::*;
use linfa_svm::Svm;
use ndarray::{Array1, Array2, ArrayView1, ArrayView2};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::errors::MnistError;

/// Hiperparámetros efectivos del ajuste.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SvmParams {
    pub c: f64,
    /// `None` = `gamma="scale"`.
    pub gamma: Option<f64>,
    pub eps: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SvmModel {
    pub c: f64,
    pub gamma: f64,
    pub n_features: usize,
    pub classes: Vec<u8>,
    machines: Vec<Svm<f64, Pr>>,
}

stage_core::blob_artifact!(SvmModel, "svm_rbf_one_vs_rest");

/// `gamma="scale"`: 1 / (n_features * var(X)), con var sobre todos los valores.
pub fn scale_gamma(x: ArrayView2<'_, f64>) -> f64 {
    let n = x.len() as f64;
    if n == 0.0 {
        return 1.0;
    }
    let mean = x.sum() / n;
    let var = x.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    if var > 0.0 {
        1.0 / (x.ncols() as f64 * var)
    } else {
        1.0
    }
}

impl SvmModel {
    pub fn fit(x: ArrayView2<'_, f64>, y: ArrayView1<'_, u8>, params: SvmParams) -> Result<Self, MnistError> {
        if x.nrows() != y.len() {
            return Err(MnistError::Shape(format!("{} samples but {} labels", x.nrows(), y.len())));
        }
        let mut classes: Vec<u8> = y.iter().copied().collect();
        classes.sort_unstable();
        classes.dedup();
        if classes.len() < 2 {
            return Err(MnistError::Svm(format!("need at least two classes, found {}", classes.len())));
        }
        let gamma = params.gamma.unwrap_or_else(|| scale_gamma(x));
        let hyper = Svm::<f64, Pr>::params().pos_neg_weights(params.c, params.c)
                                            .gaussian_kernel(1.0 / gamma)
                                            .eps(params.eps);
        let machines = classes.par_iter()
                              .map(|class| {
                                  let targets: Array1<bool> = y.mapv(|v| v == *class);
                                  let ds = DatasetBase::new(x, targets.view());
                                  hyper.fit(&ds).map_err(|e| MnistError::Svm(format!("class {class}: {e}")))
                              })
                              .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { c: params.c,
                  gamma,
                  n_features: x.ncols(),
                  classes,
                  machines })
    }

    /// Probabilidad por clase: `n x classes`.
    pub fn scores(&self, x: &Array2<f64>) -> Result<Array2<f32>, MnistError> {
        if x.ncols() != self.n_features {
            return Err(MnistError::Shape(format!("model expects {} features, got {}", self.n_features, x.ncols())));
        }
        let mut out = Array2::<f32>::zeros((x.nrows(), self.classes.len()));
        for (j, machine) in self.machines.iter().enumerate() {
            let pr: Array1<Pr> = machine.predict(x);
            for (i, p) in pr.iter().enumerate() {
                out[[i, j]] = **p;
            }
        }
        Ok(out)
    }

    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<u8>, MnistError> {
        let scores = self.scores(x)?;
        Ok(scores.outer_iter()
                 .map(|row| {
                     let mut best = 0;
                     for (j, v) in row.iter().enumerate() {
                         if *v > row[best] {
                             best = j;
                         }
                     }
                     self.classes[best]
                 })
                 .collect())
    }
}
