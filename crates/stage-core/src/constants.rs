//! Constantes del protocolo de stages.
//!
//! Agrupa los nombres fijos del layout en disco y la versión lógica del
//! protocolo. `PROTOCOL_VERSION` participa en el fingerprint de cada sesión:
//! cambiarla invalida deterministamente las huellas previas aunque la
//! configuración y los datos no cambien.

/// Versión lógica del protocolo (layout + formato de punteros).
pub const PROTOCOL_VERSION: &str = "S1.0";

/// Directorio (relativo a la raíz del store) con las salidas canónicas por run.
pub const OUT_DIR: &str = "out";

/// Directorio (relativo a la raíz del store) con los punteros confirmados por key.
pub const INDEX_DIR: &str = ".index";

/// Subdirectorio dentro de un `alias_dir` con la tabla de indirección.
pub const ALIAS_TABLE_DIR: &str = ".aliases";

/// Sufijo del archivo compañero de un artifact (p. ej. la figura serializada
/// junto al SVG renderizado).
pub const COMPANION_SUFFIX: &str = ".blob";

/// Archivos de sesión dentro del directorio del run.
pub const SESSION_SUMMARY_FILE: &str = "session.json";
pub const SESSION_EVENTS_FILE: &str = "events.jsonl";
pub const SESSION_LOG_FILE: &str = "logs/stage.log";

/// Directorio de configuración por defecto (todos los `*.yaml` se fusionan en orden).
pub const DEFAULT_CONFIG_DIR: &str = "config";
