//! Loader por batches persistible.
//!
//! Guarda los píxeles crudos (`u8`) más el orden de muestreo y la
//! normalización; cada batch se normaliza al pedirlo como
//! `(x / 255 - mean) / std`. Un loader con `shuffle` fija su permutación
//! al construirse con el RNG de la sesión, así que leerlo de vuelta
//! reproduce exactamente los mismos batches.

use ndarray::{Array1, Array3};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::dataset::MnistSplit;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataLoader {
    pub split: String,
    pub batch_size: usize,
    pub shuffle: bool,
    pub mean: f32,
    pub std: f32,
    pub height: usize,
    pub width: usize,
    pixels: Vec<u8>,
    labels: Vec<u8>,
    order: Vec<usize>,
}

/// Un batch normalizado: imágenes `b x alto x ancho` y sus etiquetas.
#[derive(Debug, Clone, PartialEq)]
pub struct Batch {
    pub images: Array3<f32>,
    pub labels: Array1<u8>,
}

impl Batch {
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

impl DataLoader {
    /// `rng = Some(..)` baraja el orden; `None` conserva el orden del split.
    pub fn new<R: Rng + ?Sized>(split_name: &str,
                                data: &MnistSplit,
                                batch_size: usize,
                                mean: f32,
                                std: f32,
                                rng: Option<&mut R>)
                                -> Self {
        let (n, height, width) = data.images.dim();
        let mut order: Vec<usize> = (0..n).collect();
        let shuffle = rng.is_some();
        if let Some(rng) = rng {
            order.shuffle(rng);
        }
        Self { split: split_name.to_string(),
               batch_size: batch_size.max(1),
               shuffle,
               mean,
               std,
               height,
               width,
               pixels: data.images.iter().copied().collect(),
               labels: data.labels.to_vec(),
               order }
    }

    /// Cantidad de muestras.
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn num_batches(&self) -> usize {
        self.len().div_ceil(self.batch_size)
    }

    pub fn batch(&self, index: usize) -> Option<Batch> {
        let start = index.checked_mul(self.batch_size)?;
        if start >= self.len() {
            return None;
        }
        let end = (start + self.batch_size).min(self.len());
        let area = self.height * self.width;
        let mut images = Vec::with_capacity((end - start) * area);
        let mut labels = Vec::with_capacity(end - start);
        for &i in &self.order[start..end] {
            images.extend(self.pixels[i * area..(i + 1) * area].iter()
                                                                .map(|p| (*p as f32 / 255.0 - self.mean) / self.std));
            labels.push(self.labels[i]);
        }
        let images = Array3::from_shape_vec((end - start, self.height, self.width), images).ok()?;
        Some(Batch { images,
                     labels: Array1::from(labels) })
    }

    pub fn batches(&self) -> impl Iterator<Item = Batch> + '_ {
        (0..self.num_batches()).filter_map(move |i| self.batch(i))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array3;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn split(n: usize) -> MnistSplit {
        let images = Array3::from_shape_fn((n, 2, 2), |(i, r, c)| ((i * 4 + r * 2 + c) % 256) as u8);
        MnistSplit { images,
                     labels: Array1::from_iter((0..n).map(|i| (i % 10) as u8)) }
    }

    #[test]
    fn batches_have_the_configured_size_except_the_last() {
        let loader = DataLoader::new::<ChaCha8Rng>("train", &split(150), 64, 0.1307, 0.3081, None);
        let sizes: Vec<usize> = loader.batches().map(|b| b.len()).collect();
        assert_eq!(sizes, vec![64, 64, 22]);
        assert_eq!(loader.num_batches(), 3);
        assert!(loader.batch(3).is_none());
    }

    #[test]
    fn normalization_uses_mean_and_std() {
        let loader = DataLoader::new::<ChaCha8Rng>("test", &split(1), 1, 0.5, 0.25, None);
        let b = loader.batch(0).unwrap();
        // pixel 0 -> (0/255 - 0.5) / 0.25
        assert!((b.images[[0, 0, 0]] + 2.0).abs() < 1e-6);
    }

    #[test]
    fn shuffle_is_seeded_and_keeps_pairs_together() {
        let data = split(50);
        let mut r1 = ChaCha8Rng::seed_from_u64(3);
        let mut r2 = ChaCha8Rng::seed_from_u64(3);
        let a = DataLoader::new("train", &data, 10, 0.0, 1.0, Some(&mut r1));
        let b = DataLoader::new("train", &data, 10, 0.0, 1.0, Some(&mut r2));
        assert_eq!(a, b);
        let first = a.batch(0).unwrap();
        assert_ne!(first.labels.to_vec(), (0..10).map(|i| i as u8).collect::<Vec<_>>());
        for (k, label) in first.labels.iter().enumerate() {
            // el primer píxel codifica el índice original: i*4 % 256
            let px = first.images[[k, 0, 0]] * 255.0;
            let original = (px.round() as usize) / 4;
            assert_eq!(*label as usize, original % 10);
        }
    }
}
