//! Tipos de artifact que fluyen entre stages MNIST.
//!
//! Arrays y tablas usan las implementaciones genéricas del core (npy / csv);
//! aquí sólo se nombran y se registran los blobs propios.

use ndarray::{Array1, Array2};

use crate::loader::DataLoader;
use crate::metrics::ReportRow;

/// Imágenes aplanadas `n x 784`, valores en [0, 1].
pub type FlatImages = Array2<f32>;

/// Etiquetas o predicciones, una por muestra.
pub type Labels = Array1<u8>;

pub type ClassificationReport = Vec<ReportRow>;

stage_core::blob_artifact!(DataLoader, "data_loader");

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::MnistSplit;
    use ndarray::Array3;
    use rand_chacha::ChaCha8Rng;
    use stage_core::model::ArtifactValue;

    #[test]
    fn loader_blob_keeps_batches() {
        let split = MnistSplit { images: Array3::from_shape_fn((10, 2, 2), |(i, _, _)| i as u8),
                                 labels: Array1::from_shape_fn(10, |i| (i % 3) as u8) };
        let loader = DataLoader::new::<ChaCha8Rng>("test", &split, 4, 0.0, 1.0, None);
        let enc = loader.encode().unwrap();
        let back = DataLoader::decode(&enc.primary, None).unwrap();
        assert_eq!(back.num_batches(), 3);
        assert_eq!(back.batch(2).unwrap().labels, loader.batch(2).unwrap().labels);
        assert!(DataLoader::type_tag().starts_with("blob<"));
    }

    #[test]
    fn report_is_a_table() {
        assert_eq!(ClassificationReport::type_tag(), "table<classification_report>");
    }
}
