//! `02_plot_digits`: grilla de muestras del primer batch de entrenamiento y
//! un ejemplo por dígito.

use stage_core::{ArtifactKey, Session, StageError, TypedStage};

use super::alias_dir;
use crate::loader::{Batch, DataLoader};
use crate::settings::{key, MnistSettings};

#[derive(Debug, Clone, Copy, Default)]
pub struct PlotDigits;

fn image_of(batch: &Batch, i: usize) -> (usize, usize, Vec<f32>) {
    let (_, h, w) = batch.images.dim();
    let pixels = batch.images.index_axis(ndarray::Axis(0), i).iter().copied().collect();
    (w, h, pixels)
}

/// Primer índice de cada dígito presente, ordenado por dígito.
fn first_per_digit(batch: &Batch) -> Vec<(u8, usize)> {
    let mut found: Vec<(u8, usize)> = Vec::new();
    for (i, label) in batch.labels.iter().enumerate() {
        if !found.iter().any(|(d, _)| d == label) {
            found.push((*label, i));
        }
    }
    found.sort_unstable();
    found
}

impl TypedStage for PlotDigits {
    type Settings = MnistSettings;

    fn id(&self) -> &'static str {
        "02_plot_digits"
    }

    fn description(&self) -> &'static str {
        "plot sample training digits"
    }

    fn settings(&self, config: &stage_core::Config) -> Result<MnistSettings, stage_core::ConfigError> {
        MnistSettings::from_config(config)
    }

    fn reads(&self, s: &MnistSettings) -> Result<Vec<ArtifactKey>, StageError> {
        Ok(vec![key(&s.path.mnist.loader.train)?])
    }

    fn writes(&self, s: &MnistSettings) -> Result<Vec<ArtifactKey>, StageError> {
        Ok(vec![s.figure_key(&s.mnist.samples.samples_file)?, s.figure_key(&s.mnist.samples.digits_file)?])
    }

    fn run(&self, s: &MnistSettings, session: &mut Session) -> Result<(), StageError> {
        let loader: DataLoader = session.read(&key(&s.path.mnist.loader.train)?)?;
        let batch = loader.batch(0)
                          .ok_or_else(|| StageError::Internal("train loader has no batches".into()))?;

        let n = s.mnist.samples.n_samples.min(batch.len());
        let cols = (n as f64).sqrt().ceil().max(1.0) as usize;
        let rows = n.div_ceil(cols).max(1);
        let mut samples = session.plt().subplots(rows, cols, (200 * cols as u32, 200 * rows as u32));
        for (i, panel) in samples.panels_mut().take(n).enumerate() {
            let (w, h, pixels) = image_of(&batch, i);
            panel.image(w, h, pixels).set_title(format!("Label: {}", batch.labels[i]));
        }
        session.save_figure(&s.figure_key(&s.mnist.samples.samples_file)?, &samples, alias_dir(s))?;

        let digits = first_per_digit(&batch);
        if digits.len() < 10 {
            session.logger()
                   .warn(format!("first batch only contains {} distinct digits", digits.len()));
        }
        let mut per_digit = session.plt().subplots(2, 5, (1500, 600));
        for (panel, (digit, i)) in per_digit.panels_mut().zip(digits.iter()) {
            let (w, h, pixels) = image_of(&batch, *i);
            panel.image(w, h, pixels).set_title(format!("Digit: {digit}"));
        }
        session.save_figure(&s.figure_key(&s.mnist.samples.digits_file)?, &per_digit, alias_dir(s))?;

        session.logger().success(format!("plotted {n} samples and {} digits", digits.len()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{Array1, Array3};

    #[test]
    fn first_example_of_each_digit_sorted() {
        let batch = Batch { images: Array3::zeros((5, 2, 2)),
                            labels: Array1::from(vec![3u8, 1, 3, 0, 1]) };
        assert_eq!(first_per_digit(&batch), vec![(0, 3), (1, 1), (3, 0)]);
    }
}
