//! `03_plot_embedding`: proyección 2-D de una submuestra de entrenamiento,
//! coloreada por dígito.

use ndarray::{Array1, Array2};
use stage_core::plot::ScatterSeries;
use stage_core::{ArtifactKey, Session, StageError, TypedStage};

use super::{alias_dir, select_rows, subsample};
use crate::embed::{embed_2d, EmbedParams};
use crate::settings::{key, MnistSettings};

#[derive(Debug, Clone, Copy, Default)]
pub struct PlotEmbedding;

impl TypedStage for PlotEmbedding {
    type Settings = MnistSettings;

    fn id(&self) -> &'static str {
        "03_plot_embedding"
    }

    fn description(&self) -> &'static str {
        "project training digits to 2-D and plot them"
    }

    fn settings(&self, config: &stage_core::Config) -> Result<MnistSettings, stage_core::ConfigError> {
        MnistSettings::from_config(config)
    }

    fn reads(&self, s: &MnistSettings) -> Result<Vec<ArtifactKey>, StageError> {
        Ok(vec![key(&s.path.mnist.flattened.train)?, key(&s.path.mnist.labels.train)?])
    }

    fn writes(&self, s: &MnistSettings) -> Result<Vec<ArtifactKey>, StageError> {
        Ok(vec![s.figure_key(&s.mnist.embed.file)?])
    }

    fn run(&self, s: &MnistSettings, session: &mut Session) -> Result<(), StageError> {
        let x: Array2<f32> = session.read(&key(&s.path.mnist.flattened.train)?)?;
        let y: Array1<u8> = session.read(&key(&s.path.mnist.labels.train)?)?;
        let e = &s.mnist.embed;
        let seed = s.mnist.umap_random_state;

        let mut rng = session.rng().seeded("embedding_sample", seed);
        let idx = subsample(x.nrows(), e.n_samples, &mut rng);
        let (x, y) = select_rows(&x, &y, &idx)?;
        session.logger().info(format!("embedding {} samples", idx.len()));

        let coords = embed_2d(x,
                              EmbedParams { perplexity: e.perplexity,
                                            approx_threshold: e.approx_threshold,
                                            max_iter: e.max_iter,
                                            seed })?;

        let mut digits: Vec<u8> = y.to_vec();
        digits.sort_unstable();
        digits.dedup();
        let series = digits.iter()
                           .map(|d| ScatterSeries { label: d.to_string(),
                                                    color: session.palette().color(*d as usize),
                                                    points: y.iter()
                                                             .zip(coords.outer_iter())
                                                             .filter(|(label, _)| *label == d)
                                                             .map(|(_, p)| (p[0], p[1]))
                                                             .collect() })
                           .collect();

        let mut fig = session.plt().subplots(1, 1, (1000, 800));
        if let Some(panel) = fig.panel_mut(0, 0) {
            panel.scatter(series)
                 .set_xyt("Embedding 1", "Embedding 2", "2-D embedding of MNIST training digits");
        }
        session.save_figure(&s.figure_key(&e.file)?, &fig, alias_dir(s))?;
        session.logger().success(format!("embedding plotted for {} digits", digits.len()));
        Ok(())
    }
}
