//! Esquema tipado de la configuración MNIST.
//!
//! Se deserializa una sola vez al resolver la configuración y se valida antes
//! de abrir la sesión: un valor faltante o fuera de rango es un `ConfigError`,
//! nunca un fallo tardío dentro del cuerpo del stage.

use std::path::PathBuf;

use serde::Deserialize;
use stage_core::{ArtifactKey, Config, ConfigError, StageError};

use crate::embed::MIN_EMBED_SAMPLES;

#[derive(Debug, Clone, Deserialize)]
pub struct MnistSettings {
    #[serde(rename = "PATH")]
    pub path: PathSection,
    #[serde(rename = "MNIST")]
    pub mnist: MnistSection,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PathSection {
    #[serde(rename = "MNIST")]
    pub mnist: MnistPaths,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct MnistPaths {
    /// Directorio con los `.gz` IDX crudos (fuera del store).
    pub raw: PathBuf,
    #[serde(default = "default_alias_dir")]
    pub alias_dir: PathBuf,
    pub loader: SplitKeys,
    pub flattened: SplitKeys,
    pub labels: SplitKeys,
    pub model_svm: String,
    /// Prefijo de clave para figuras (`mnist/figures/`).
    pub figures: String,
    pub results: ResultKeys,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct SplitKeys {
    pub train: String,
    pub test: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct ResultKeys {
    pub report: String,
    pub predictions: String,
    pub labels: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct MnistSection {
    pub batch_size: BatchSize,
    pub normalize: Normalize,
    pub random_state: u64,
    pub umap_random_state: u64,
    #[serde(default)]
    pub download: DownloadSettings,
    #[serde(default)]
    pub svm: SvmSettings,
    #[serde(default)]
    pub embed: EmbedSettings,
    #[serde(default)]
    pub samples: SampleSettings,
    #[serde(default)]
    pub conf_mat: ConfMatSettings,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct BatchSize {
    pub train: usize,
    pub test: usize,
}

/// Media y desvío por canal (MNIST tiene uno solo).
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct Normalize {
    pub mean: Vec<f32>,
    pub std: Vec<f32>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE", default)]
pub struct DownloadSettings {
    pub base_url: String,
    pub timeout_secs: u64,
    /// Descargar aunque los archivos crudos ya existan.
    pub force: bool,
}

impl Default for DownloadSettings {
    fn default() -> Self {
        Self { base_url: "https://ossci-datasets.s3.amazonaws.com/mnist".into(),
               timeout_secs: 300,
               force: false }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE", default)]
pub struct SvmSettings {
    pub c: f64,
    /// `None` equivale a `gamma="scale"`: 1 / (n_features * var(X)).
    pub gamma: Option<f64>,
    /// Tolerancia del solver.
    pub eps: f64,
    /// Submuestra de entrenamiento; `None` usa el split completo.
    pub n_train: Option<usize>,
    /// Submuestra de evaluación; `None` usa el split completo.
    pub n_test: Option<usize>,
}

impl Default for SvmSettings {
    fn default() -> Self {
        Self { c: 1.0,
               gamma: None,
               eps: 1e-3,
               n_train: Some(10_000),
               n_test: None }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE", default)]
pub struct EmbedSettings {
    pub n_samples: usize,
    pub perplexity: f64,
    pub approx_threshold: f64,
    pub max_iter: usize,
    pub file: String,
}

impl Default for EmbedSettings {
    fn default() -> Self {
        Self { n_samples: 2_000,
               perplexity: 30.0,
               approx_threshold: 0.5,
               max_iter: 1_000,
               file: "umap.svg".into() }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE", default)]
pub struct SampleSettings {
    pub n_samples: usize,
    pub samples_file: String,
    pub digits_file: String,
}

impl Default for SampleSettings {
    fn default() -> Self {
        Self { n_samples: 25,
               samples_file: "mnist_samples.svg".into(),
               digits_file: "mnist_digits.svg".into() }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE", default)]
pub struct ConfMatSettings {
    pub file: String,
}

impl Default for ConfMatSettings {
    fn default() -> Self {
        Self { file: "confusion_matrix.svg".into() }
    }
}

fn default_alias_dir() -> PathBuf {
    PathBuf::from("./data/mnist")
}

fn invalid(path: &str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid { path: path.to_string(),
                           reason: reason.into() }
}

impl MnistSettings {
    /// Deserializa y valida rangos.
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        let s: MnistSettings = config.typed()?;
        s.validate()?;
        Ok(s)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let m = &self.mnist;
        if m.batch_size.train == 0 {
            return Err(invalid("MNIST.BATCH_SIZE.TRAIN", "must be positive"));
        }
        if m.batch_size.test == 0 {
            return Err(invalid("MNIST.BATCH_SIZE.TEST", "must be positive"));
        }
        // MNIST tiene un solo canal.
        if m.normalize.mean.len() != 1 {
            return Err(invalid("MNIST.NORMALIZE.MEAN", "MNIST is single channel: expected exactly one value"));
        }
        if m.normalize.std.len() != 1 {
            return Err(invalid("MNIST.NORMALIZE.STD", "MNIST is single channel: expected exactly one value"));
        }
        if m.normalize.std.iter().any(|s| !(*s > 0.0)) {
            return Err(invalid("MNIST.NORMALIZE.STD", "values must be positive"));
        }
        if !(m.svm.c > 0.0) {
            return Err(invalid("MNIST.SVM.C", "must be positive"));
        }
        if matches!(m.svm.gamma, Some(g) if !(g > 0.0)) {
            return Err(invalid("MNIST.SVM.GAMMA", "must be positive"));
        }
        if m.svm.n_train == Some(0) {
            return Err(invalid("MNIST.SVM.N_TRAIN", "must be positive"));
        }
        if m.embed.n_samples < MIN_EMBED_SAMPLES {
            return Err(invalid("MNIST.EMBED.N_SAMPLES",
                               format!("needs at least {MIN_EMBED_SAMPLES} samples")));
        }
        if !(m.embed.perplexity > 0.0) {
            return Err(invalid("MNIST.EMBED.PERPLEXITY", "must be positive"));
        }
        if m.samples.n_samples == 0 {
            return Err(invalid("MNIST.SAMPLES.N_SAMPLES", "must be positive"));
        }
        for (path, raw) in self.keys() {
            ArtifactKey::new(raw).map_err(|e| invalid(path, e.to_string()))?;
        }
        Ok(())
    }

    fn keys(&self) -> Vec<(&'static str, &str)> {
        let p = &self.path.mnist;
        vec![("PATH.MNIST.LOADER.TRAIN", p.loader.train.as_str()),
             ("PATH.MNIST.LOADER.TEST", p.loader.test.as_str()),
             ("PATH.MNIST.FLATTENED.TRAIN", p.flattened.train.as_str()),
             ("PATH.MNIST.FLATTENED.TEST", p.flattened.test.as_str()),
             ("PATH.MNIST.LABELS.TRAIN", p.labels.train.as_str()),
             ("PATH.MNIST.LABELS.TEST", p.labels.test.as_str()),
             ("PATH.MNIST.MODEL_SVM", p.model_svm.as_str()),
             ("PATH.MNIST.RESULTS.REPORT", p.results.report.as_str()),
             ("PATH.MNIST.RESULTS.PREDICTIONS", p.results.predictions.as_str()),
             ("PATH.MNIST.RESULTS.LABELS", p.results.labels.as_str())]
    }

    /// Clave de una figura bajo `PATH.MNIST.FIGURES`.
    pub fn figure_key(&self, file: &str) -> Result<ArtifactKey, StageError> {
        Ok(ArtifactKey::under(&self.path.mnist.figures, file)?)
    }
}

/// Accesos a claves ya validadas.
pub fn key(raw: &str) -> Result<ArtifactKey, StageError> {
    Ok(ArtifactKey::new(raw)?)
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn optional_sections_take_defaults() {
        let cfg = Config::from_tree(fixtures::tree()).unwrap();
        let s = MnistSettings::from_config(&cfg).unwrap();
        assert_eq!(s.mnist.batch_size.train, 64);
        assert_eq!(s.mnist.svm.n_train, Some(10_000));
        assert_eq!(s.mnist.embed.file, "umap.svg");
        assert_eq!(s.figure_key("umap.svg").unwrap().as_str(), "mnist/figures/umap.svg");
    }

    #[test]
    fn out_of_range_values_are_config_errors() {
        let mut tree = fixtures::tree();
        tree["MNIST"]["NORMALIZE"]["STD"] = serde_json::json!([0.0]);
        let cfg = Config::from_tree(tree).unwrap();
        assert!(matches!(MnistSettings::from_config(&cfg),
                         Err(ConfigError::Invalid { path, .. }) if path == "MNIST.NORMALIZE.STD"));
    }

    #[test]
    fn normalize_lists_must_hold_a_single_channel() {
        for (field, value) in [("MEAN", serde_json::json!([0.1307, 0.5])),
                               ("STD", serde_json::json!([0.3081, 0.2])),
                               ("MEAN", serde_json::json!([]))]
        {
            let mut tree = fixtures::tree();
            tree["MNIST"]["NORMALIZE"][field] = value;
            let cfg = Config::from_tree(tree).unwrap();
            let expected = format!("MNIST.NORMALIZE.{field}");
            assert!(matches!(MnistSettings::from_config(&cfg),
                             Err(ConfigError::Invalid { path, .. }) if path == expected));
        }
    }

    #[test]
    fn embed_sample_floor_matches_the_projection() {
        let mut tree = fixtures::tree();
        tree["MNIST"]["EMBED"] = serde_json::json!({"N_SAMPLES": MIN_EMBED_SAMPLES - 1});
        let cfg = Config::from_tree(tree).unwrap();
        assert!(matches!(MnistSettings::from_config(&cfg),
                         Err(ConfigError::Invalid { path, .. }) if path == "MNIST.EMBED.N_SAMPLES"));

        let mut tree = fixtures::tree();
        tree["MNIST"]["EMBED"] = serde_json::json!({"N_SAMPLES": MIN_EMBED_SAMPLES});
        let cfg = Config::from_tree(tree).unwrap();
        assert_eq!(MnistSettings::from_config(&cfg).unwrap().mnist.embed.n_samples, MIN_EMBED_SAMPLES);
    }

    #[test]
    fn missing_required_keys_are_reported() {
        let mut tree = fixtures::tree();
        tree["MNIST"].as_object_mut().unwrap().remove("RANDOM_STATE");
        let cfg = Config::from_tree(tree).unwrap();
        let err = MnistSettings::from_config(&cfg).unwrap_err();
        assert!(err.to_string().contains("RANDOM_STATE"));
    }

    #[test]
    fn escaping_keys_are_rejected() {
        let mut tree = fixtures::tree();
        tree["PATH"]["MNIST"]["MODEL_SVM"] = serde_json::json!("../outside.bin");
        let cfg = Config::from_tree(tree).unwrap();
        assert!(MnistSettings::from_config(&cfg).is_err());
    }
}
