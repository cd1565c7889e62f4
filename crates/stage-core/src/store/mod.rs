//! Store de artifacts en filesystem.
//!
//! Layout bajo la raíz del store:
//! - `out/<stage>/<run_id>/<key>`: salidas canónicas, escritas una sola vez.
//! - `.index/<blake3(key)>.json`: puntero confirmado por clave (último write).
//!
//! Y bajo cada `alias_dir` elegido por el stage:
//! - `.aliases/<blake3(key)>.json`: tabla de indirección explícita.
//! - `<file_name>`: symlink legible al archivo canónico (unix, best effort).
//!
//! Cada clave tiene su propio archivo de puntero: escrituras concurrentes de
//! claves distintas no comparten ningún archivo.

mod alias;
mod atomic;
mod fs_store;
mod layout;

pub use alias::{link_path, list_aliases, resolve_alias, AliasEntry};
pub use atomic::atomic_write_bytes;
pub use fs_store::ArtifactStore;
pub use layout::StoreLayout;
