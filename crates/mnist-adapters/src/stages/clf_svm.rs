//! `04_clf_svm`: entrena el SVM RBF, predice el split de test y publica
//! modelo, predicciones, etiquetas evaluadas y reporte.

use ndarray::{Array1, Array2};
use stage_core::{ArtifactKey, Session, StageError, TypedStage};

use super::{alias_dir, select_rows, subsample};
use crate::artifacts::ClassificationReport;
use crate::metrics::{classification_report, confusion_matrix, report_value};
use crate::settings::{key, MnistSettings};
use crate::svm::{SvmModel, SvmParams};

#[derive(Debug, Clone, Copy, Default)]
pub struct ClfSvm;

impl TypedStage for ClfSvm {
    type Settings = MnistSettings;

    fn id(&self) -> &'static str {
        "04_clf_svm"
    }

    fn description(&self) -> &'static str {
        "fit an RBF SVM and evaluate it on the test split"
    }

    fn settings(&self, config: &stage_core::Config) -> Result<MnistSettings, stage_core::ConfigError> {
        MnistSettings::from_config(config)
    }

    fn reads(&self, s: &MnistSettings) -> Result<Vec<ArtifactKey>, StageError> {
        let p = &s.path.mnist;
        Ok(vec![key(&p.flattened.train)?, key(&p.flattened.test)?, key(&p.labels.train)?, key(&p.labels.test)?])
    }

    fn writes(&self, s: &MnistSettings) -> Result<Vec<ArtifactKey>, StageError> {
        let p = &s.path.mnist;
        Ok(vec![key(&p.model_svm)?,
                key(&p.results.predictions)?,
                key(&p.results.labels)?,
                key(&p.results.report)?])
    }

    fn run(&self, s: &MnistSettings, session: &mut Session) -> Result<(), StageError> {
        let p = &s.path.mnist;
        let cfg = &s.mnist.svm;
        let x_train: Array2<f32> = session.read(&key(&p.flattened.train)?)?;
        let x_test: Array2<f32> = session.read(&key(&p.flattened.test)?)?;
        let y_train: Array1<u8> = session.read(&key(&p.labels.train)?)?;
        let y_test: Array1<u8> = session.read(&key(&p.labels.test)?)?;

        let seed = s.mnist.random_state;
        let mut rng = session.rng().seeded("svm_train", seed);
        let train_idx = subsample(x_train.nrows(), cfg.n_train.unwrap_or(usize::MAX), &mut rng);
        let mut rng = session.rng().seeded("svm_test", seed);
        let test_idx = subsample(x_test.nrows(), cfg.n_test.unwrap_or(usize::MAX), &mut rng);
        let (x_train, y_train) = select_rows(&x_train, &y_train, &train_idx)?;
        let (x_test, y_test) = select_rows(&x_test, &y_test, &test_idx)?;

        session.logger().info(format!("fitting svm on {} samples ({} features)", x_train.nrows(), x_train.ncols()));
        let model = SvmModel::fit(x_train.view(),
                                  y_train.view(),
                                  SvmParams { c: cfg.c,
                                              gamma: cfg.gamma,
                                              eps: cfg.eps })?;
        let predictions = model.predict(&x_test)?;

        let mut classes: Vec<u8> = y_test.iter().chain(predictions.iter()).copied().collect();
        classes.sort_unstable();
        classes.dedup();
        let cm = confusion_matrix(y_test.view(), predictions.view(), &classes)?;
        let report: ClassificationReport = classification_report(&cm, &classes);

        let alias = alias_dir(s);
        session.write(&key(&p.model_svm)?, &model, alias)?;
        session.write(&key(&p.results.predictions)?, &predictions, alias)?;
        session.write(&key(&p.results.labels)?, &y_test, alias)?;
        session.write(&key(&p.results.report)?, &report, alias)?;

        let accuracy = report_value(&report, "accuracy").unwrap_or(0.0);
        let macro_f1 = report_value(&report, "macro avg").unwrap_or(0.0);
        session.logger().success(format!("Test Accuracy: {accuracy:.4}, Macro F1: {macro_f1:.4}"));
        Ok(())
    }
}
