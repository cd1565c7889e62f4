//! mnist-adapters: dominio MNIST sobre el protocolo de `stage-core`.
//!
//! Este crate provee:
//! - `settings`: esquema tipado de la configuración (`PATH.MNIST.*`, `MNIST.*`).
//! - Colaborador numérico: descarga y parseo IDX (`dataset`), loader por
//!   batches (`loader`), proyección 2-D (`embed`), SVM one-vs-rest (`svm`) y
//!   métricas (`metrics`).
//! - `artifacts`: tipos persistidos propios del dominio (reporte, loader, modelo).
//! - `stages`: los cinco stages numerados del pipeline.
//!
//! Nota: el core no sabe nada de MNIST; aquí sólo se declaran claves,
//! settings y cuerpos de stage.

pub mod artifacts;
pub mod dataset;
pub mod embed;
pub mod errors;
pub mod loader;
pub mod metrics;
pub mod settings;
pub mod stages;
pub mod svm;

pub use errors::MnistError;
pub use settings::MnistSettings;
pub use stages::{pipeline, ClfSvm, Download, PlotConfMat, PlotDigits, PlotEmbedding};
