use serde::de::DeserializeOwned;

use super::{StageDefinition, StageIo};
use crate::config::Config;
use crate::errors::{ConfigError, StageError};
use crate::model::ArtifactKey;
use crate::session::Session;

/// Interfaz de alto nivel para definir stages con settings tipados.
///
/// Implementadores escriben `run` con su esquema de configuración concreto;
/// el adaptador de abajo lo convierte a la interfaz neutra `StageDefinition`.
/// Las claves leídas y escritas se derivan de los settings (los nombres de
/// archivo viven en la config, no en el código).
pub trait TypedStage {
    /// Esquema deserializable desde el árbol de configuración completo.
    type Settings: DeserializeOwned;

    fn id(&self) -> &'static str;

    fn description(&self) -> &'static str {
        ""
    }

    /// Extrae y valida los settings. Por defecto deserializa el árbol entero.
    fn settings(&self, config: &Config) -> Result<Self::Settings, ConfigError> {
        config.typed()
    }

    fn reads(&self, settings: &Self::Settings) -> Result<Vec<ArtifactKey>, StageError>;

    fn writes(&self, settings: &Self::Settings) -> Result<Vec<ArtifactKey>, StageError>;

    fn run(&self, settings: &Self::Settings, session: &mut Session) -> Result<(), StageError>;
}

// -------------------------------------------------------------
// Adaptador: cualquier `TypedStage` implementa `StageDefinition` neutro.
// -------------------------------------------------------------
impl<T> StageDefinition for T where T: TypedStage + 'static
{
    fn id(&self) -> &str {
        <Self as TypedStage>::id(self)
    }

    fn description(&self) -> &str {
        <Self as TypedStage>::description(self)
    }

    fn io(&self, config: &Config) -> Result<StageIo, StageError> {
        let settings = self.settings(config)?;
        Ok(StageIo { reads: self.reads(&settings)?,
                     writes: self.writes(&settings)? })
    }

    fn run(&self, config: &Config, session: &mut Session) -> Result<(), StageError> {
        let settings = self.settings(config)?;
        <Self as TypedStage>::run(self, &settings, session)
    }

    fn definition_hash(&self) -> String {
        let hash_input = serde_json::json!({
            "id": <Self as TypedStage>::id(self),
            "type": std::any::type_name::<T>()
        });
        crate::hashing::hash_value(&hash_input)
    }
}
