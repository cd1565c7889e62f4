//! Punto de entrada común de los ejecutables por stage.
//!
//! Cada binario es `fn main() -> ExitCode { run_stage(&Stage) }`: parsea los
//! flags opcionales, instala el subscriber de tracing, arma el runner con la
//! config de `--config-dir` más overrides de entorno `MNISTFLOW__*` y
//! devuelve el código de salida del run.
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use stage_core::constants::DEFAULT_CONFIG_DIR;
use stage_core::{ConfigError, ConfigResolver, RunOutcome, StageDefinition, StageError, StageRunner};
use tracing_subscriber::EnvFilter;

/// Prefijo de las variables de entorno que sobreescriben la config.
pub const ENV_PREFIX: &str = "MNISTFLOW";

#[derive(Debug, Clone, Parser)]
#[command(version, about = "Run one stage of the MNIST pipeline")]
pub struct StageArgs {
    /// Directorio con los YAML de configuración.
    #[arg(long, default_value = DEFAULT_CONFIG_DIR)]
    pub config_dir: PathBuf,
    /// Raíz del store de artifacts.
    #[arg(long, default_value = ".")]
    pub root: PathBuf,
}

/// `RUST_LOG` manda; por defecto `info`. Los registros de `log` también se
/// capturan.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).with_target(false).try_init();
}

pub fn build_runner(args: &StageArgs) -> Result<StageRunner, ConfigError> {
    let resolver = ConfigResolver::from_dir(&args.config_dir)?.with_env(ENV_PREFIX);
    Ok(StageRunner::new(resolver, &args.root))
}

pub fn report(outcome: &RunOutcome) {
    match (&outcome.error, &outcome.run_id) {
        (None, Some(run_id)) => tracing::info!(stage = %outcome.stage, run_id = %run_id, "stage succeeded"),
        (None, None) => tracing::info!(stage = %outcome.stage, "stage succeeded"),
        (Some(err), _) => tracing::error!(stage = %outcome.stage,
                                          exit_code = outcome.exit_code,
                                          state = ?outcome.final_state,
                                          "stage failed: {err}"),
    }
}

pub fn run_stage(stage: &dyn StageDefinition) -> ExitCode {
    let args = StageArgs::parse();
    init_tracing();
    let runner = match build_runner(&args) {
        Ok(r) => r,
        Err(e) => {
            let err = StageError::from(e);
            tracing::error!(stage = %stage.id(), "configuration failed: {err}");
            return ExitCode::from(err.exit_code());
        }
    };
    let outcome = runner.run(stage);
    report(&outcome);
    ExitCode::from(outcome.exit_code)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn flags_are_optional() {
        let args = StageArgs::try_parse_from(["mnist-download"]).unwrap();
        assert_eq!(args.config_dir, PathBuf::from("config"));
        assert_eq!(args.root, PathBuf::from("."));
        let args = StageArgs::try_parse_from(["mnist-download", "--root", "/tmp/x"]).unwrap();
        assert_eq!(args.root, PathBuf::from("/tmp/x"));
    }

    #[test]
    fn runner_reads_the_config_dir() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("MNIST.yaml"), "MNIST:\n  RANDOM_STATE: 7\n").unwrap();
        let args = StageArgs { config_dir: dir.path().to_path_buf(),
                               root: dir.path().join("store") };
        let runner = build_runner(&args).unwrap();
        let config = runner.resolver().resolve().unwrap();
        assert_eq!(config.get_as::<u64>("MNIST.RANDOM_STATE").unwrap(), 7);
    }

    #[test]
    fn missing_config_dir_is_a_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let args = StageArgs { config_dir: dir.path().join("nope"),
                               root: dir.path().to_path_buf() };
        let err = build_runner(&args).unwrap_err();
        assert_eq!(StageError::from(err).exit_code(), 2);
    }
}
