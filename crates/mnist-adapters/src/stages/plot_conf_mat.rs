//! `05_plot_conf_mat`: matriz de confusión de las predicciones del SVM.

use ndarray::Array1;
use stage_core::{ArtifactKey, Session, StageError, TypedStage};

use super::alias_dir;
use crate::metrics::confusion_matrix;
use crate::settings::{key, MnistSettings};

/// Etiquetas fijas de la matriz (todas las clases MNIST).
const DIGITS: [u8; 10] = [0, 1, 2, 3, 4, 5, 6, 7, 8, 9];

#[derive(Debug, Clone, Copy, Default)]
pub struct PlotConfMat;

impl TypedStage for PlotConfMat {
    type Settings = MnistSettings;

    fn id(&self) -> &'static str {
        "05_plot_conf_mat"
    }

    fn description(&self) -> &'static str {
        "plot the confusion matrix of the svm predictions"
    }

    fn settings(&self, config: &stage_core::Config) -> Result<MnistSettings, stage_core::ConfigError> {
        MnistSettings::from_config(config)
    }

    fn reads(&self, s: &MnistSettings) -> Result<Vec<ArtifactKey>, StageError> {
        let r = &s.path.mnist.results;
        Ok(vec![key(&r.predictions)?, key(&r.labels)?])
    }

    fn writes(&self, s: &MnistSettings) -> Result<Vec<ArtifactKey>, StageError> {
        Ok(vec![s.figure_key(&s.mnist.conf_mat.file)?])
    }

    fn run(&self, s: &MnistSettings, session: &mut Session) -> Result<(), StageError> {
        let r = &s.path.mnist.results;
        let predictions: Array1<u8> = session.read(&key(&r.predictions)?)?;
        let labels: Array1<u8> = session.read(&key(&r.labels)?)?;
        let cm = confusion_matrix(labels.view(), predictions.view(), &DIGITS)?;

        let values: Vec<Vec<f64>> = cm.outer_iter().map(|row| row.iter().map(|v| *v as f64).collect()).collect();
        let names: Vec<String> = DIGITS.iter().map(|d| d.to_string()).collect();
        let mut fig = session.plt().subplots(1, 1, (900, 800));
        if let Some(panel) = fig.panel_mut(0, 0) {
            panel.heatmap(values, names.clone(), names)
                 .set_xyt("Predicted", "True", "Confusion Matrix");
        }
        session.save_figure(&s.figure_key(&s.mnist.conf_mat.file)?, &fig, alias_dir(s))?;
        session.logger().success(format!("confusion matrix over {} predictions", cm.sum()));
        Ok(())
    }
}
