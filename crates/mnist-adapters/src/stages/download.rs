//! `01_download`: baja (o reutiliza) los IDX crudos y publica loaders,
//! arrays aplanados y etiquetas de ambos splits.

use rand_chacha::ChaCha8Rng;
use stage_core::{ArtifactKey, Session, StageError, TypedStage};

use super::alias_dir;
use crate::dataset::{fetch_raw, load_split, Split};
use crate::loader::DataLoader;
use crate::settings::{key, MnistSettings};

#[derive(Debug, Clone, Copy, Default)]
pub struct Download;

impl TypedStage for Download {
    type Settings = MnistSettings;

    fn id(&self) -> &'static str {
        "01_download"
    }

    fn description(&self) -> &'static str {
        "download MNIST and persist loaders, flattened arrays and labels"
    }

    fn settings(&self, config: &stage_core::Config) -> Result<MnistSettings, stage_core::ConfigError> {
        MnistSettings::from_config(config)
    }

    fn reads(&self, _s: &MnistSettings) -> Result<Vec<ArtifactKey>, StageError> {
        Ok(vec![])
    }

    fn writes(&self, s: &MnistSettings) -> Result<Vec<ArtifactKey>, StageError> {
        let p = &s.path.mnist;
        Ok(vec![key(&p.loader.train)?,
                key(&p.loader.test)?,
                key(&p.flattened.train)?,
                key(&p.flattened.test)?,
                key(&p.labels.train)?,
                key(&p.labels.test)?])
    }

    fn run(&self, s: &MnistSettings, session: &mut Session) -> Result<(), StageError> {
        let p = &s.path.mnist;
        let m = &s.mnist;
        let fetched = fetch_raw(&p.raw, &m.download)?;
        if !fetched.is_empty() {
            session.logger().info(format!("downloaded {} raw files into {}", fetched.len(), p.raw.display()));
        }

        let train = load_split(&p.raw, Split::Train)?;
        let test = load_split(&p.raw, Split::Test)?;
        session.logger().info(format!("train: {} images, test: {} images", train.len(), test.len()));

        // MNIST tiene un solo canal
        let (mean, std) = (m.normalize.mean[0], m.normalize.std[0]);
        let mut rng = session.rng().seeded("train_loader", m.random_state);
        let train_loader = DataLoader::new("train", &train, m.batch_size.train, mean, std, Some(&mut rng));
        let test_loader = DataLoader::new::<ChaCha8Rng>("test", &test, m.batch_size.test, mean, std, None);

        let alias = alias_dir(s);
        session.write(&key(&p.loader.train)?, &train_loader, alias)?;
        session.write(&key(&p.loader.test)?, &test_loader, alias)?;
        session.write(&key(&p.flattened.train)?, &train.flattened(), alias)?;
        session.write(&key(&p.flattened.test)?, &test.flattened(), alias)?;
        session.write(&key(&p.labels.train)?, &train.labels, alias)?;
        session.write(&key(&p.labels.test)?, &test.labels, alias)?;

        session.logger().success(format!("train loader: {} batches of {}, test loader: {} batches of {}",
                                         train_loader.num_batches(),
                                         m.batch_size.train,
                                         test_loader.num_batches(),
                                         m.batch_size.test));
        Ok(())
    }
}
