//! mnistflow: orquestador del pipeline MNIST.
//!
//! Cada stage también existe como ejecutable propio (`mnist-cli`); este
//! binario agrega lo que ninguno de ellos ve por separado: el plan validado
//! del pipeline, la ejecución en orden (`run --from`), el estado de los alias
//! y el historial de versiones de una clave.
use std::io::Write;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use mnist_adapters::{pipeline, MnistSettings};
use stage_core::constants::DEFAULT_CONFIG_DIR;
use stage_core::store::list_aliases;
use stage_core::{ArtifactKey, ArtifactStore, ConfigError, ConfigResolver, PipelineError, StageRunner, StoreError};
use thiserror::Error;

pub use mnist_cli::{init_tracing, ENV_PREFIX};

#[derive(Debug, Parser)]
#[command(name = "mnistflow", version, about = "Plan, run and inspect the MNIST stage pipeline")]
pub struct Cli {
    /// Directorio con los YAML de configuración.
    #[arg(long, default_value = DEFAULT_CONFIG_DIR, global = true)]
    pub config_dir: PathBuf,
    /// Raíz del store de artifacts.
    #[arg(long, default_value = ".", global = true)]
    pub root: PathBuf,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Valida el pipeline y muestra lecturas/escrituras de cada stage.
    Plan,
    /// Ejecuta los stages en orden; se detiene en el primer fallo.
    Run {
        /// Empieza en este stage (los anteriores ya deben haber corrido).
        #[arg(long)]
        from: Option<String>,
    },
    /// Lista los alias vigentes.
    Aliases,
    /// Versiones escritas de una clave, de la más vieja a la actual.
    History { key: String },
}

#[derive(Debug, Error)]
pub enum FlowError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Pipeline(#[from] PipelineError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("cannot write output: {0}")]
    Output(#[from] std::io::Error),
}

impl FlowError {
    pub fn exit_code(&self) -> u8 {
        match self {
            FlowError::Config(_) => 2,
            FlowError::Pipeline(PipelineError::Stage { source, .. }) => source.exit_code(),
            FlowError::Pipeline(_) => 2,
            FlowError::Store(StoreError::NotFound(_)) => 3,
            FlowError::Store(_) | FlowError::Output(_) => 1,
        }
    }
}

/// Ejecuta `cli` con la config de `--config-dir` más overrides de entorno.
pub fn execute(cli: &Cli, out: &mut dyn Write) -> Result<u8, FlowError> {
    let resolver = ConfigResolver::from_dir(&cli.config_dir)?.with_env(ENV_PREFIX);
    execute_with(resolver, &cli.root, &cli.command, out)
}

/// Igual que `execute` pero con un resolver ya armado. Devuelve el código de
/// salida del último stage ejecutado (0 para los comandos de consulta).
pub fn execute_with(resolver: ConfigResolver,
                    root: &Path,
                    command: &Command,
                    out: &mut dyn Write)
                    -> Result<u8, FlowError> {
    let pipeline = pipeline();
    match command {
        Command::Plan => {
            let config = resolver.resolve()?;
            let plan = pipeline.validate(&config)?;
            writeln!(out, "pipeline {}", pipeline.definition_hash())?;
            for step in plan {
                writeln!(out, "{:>2} {:<18} {}", step.index, step.id, step.description)?;
                for key in &step.reads {
                    writeln!(out, "     <- {key}")?;
                }
                for key in &step.writes {
                    writeln!(out, "     -> {key}")?;
                }
            }
            Ok(0)
        }
        Command::Run { from } => {
            let config = resolver.resolve()?;
            pipeline.validate(&config)?;
            let runner = StageRunner::new(resolver, root);
            let outcomes = pipeline.run(&runner, from.as_deref())?;
            for o in &outcomes {
                writeln!(out,
                         "{:<18} {:<6} exit={} run={}",
                         o.stage,
                         if o.succeeded() { "ok" } else { "failed" },
                         o.exit_code,
                         o.run_id.as_deref().unwrap_or("-"))?;
                if let Some(err) = &o.error {
                    writeln!(out, "    {err}")?;
                }
            }
            Ok(outcomes.last().map(|o| o.exit_code).unwrap_or(0))
        }
        Command::Aliases => {
            let settings = MnistSettings::from_config(&resolver.resolve()?)?;
            for entry in list_aliases(&settings.path.mnist.alias_dir)? {
                writeln!(out,
                         "{} -> {} ({} {})",
                         entry.key,
                         entry.target.display(),
                         entry.stage,
                         entry.run_id)?;
            }
            Ok(0)
        }
        Command::History { key } => {
            let key = ArtifactKey::new(key)?;
            let store = ArtifactStore::open(root)?;
            for v in store.history(&key)? {
                writeln!(out,
                         "{} {:<18} {} {:.12} {}",
                         v.written_at.format("%Y-%m-%d %H:%M:%S"),
                         v.stage,
                         v.run_id,
                         v.hash,
                         v.path)?;
            }
            Ok(0)
        }
    }
}
