//! Modelos neutrales del protocolo: claves lógicas, registros de artifacts y
//! el contrato `ArtifactValue` que decide el formato en disco según el tipo.

pub mod artifact;
pub mod codec;
pub mod key;
pub mod value;

pub use artifact::{ArtifactKind, ArtifactRecord, LineageEntry, PriorVersion};
pub use key::ArtifactKey;
pub use value::{ArtifactValue, Encoded, NpyElement, TableRow};
