use crate::config::Config;
use crate::errors::StageError;
use crate::model::ArtifactKey;
use crate::session::Session;

/// Entradas y salidas declaradas de un stage, ya resueltas contra la config.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StageIo {
    pub reads: Vec<ArtifactKey>,
    pub writes: Vec<ArtifactKey>,
}

/// Interfaz neutral (object-safe) que usan el runner y el pipeline.
///
/// Un stage sólo se comunica con los demás a través de claves del store: nunca
/// llama a otro stage ni comparte memoria con él.
pub trait StageDefinition {
    /// Identificador estable (también nombre del directorio de salidas).
    fn id(&self) -> &str;

    /// Descripción corta para `plan` y `--help`.
    fn description(&self) -> &str {
        ""
    }

    /// Valida la configuración del stage y declara sus claves. Sin efectos.
    fn io(&self, config: &Config) -> Result<StageIo, StageError>;

    /// Cuerpo del stage. Recibe la sesión explícitamente.
    fn run(&self, config: &Config, session: &mut Session) -> Result<(), StageError>;

    /// Hash de la definición (id + tipo concreto).
    fn definition_hash(&self) -> String;
}
