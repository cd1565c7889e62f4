//! Tabla de alias: referencia estable al último artifact de cada clave.
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use log::warn;
use serde::{Deserialize, Serialize};

use super::atomic::{atomic_write_bytes, temp_sibling};
use super::layout::StoreLayout;
use crate::errors::StoreError;
use crate::model::{ArtifactKey, ArtifactRecord};

/// Puntero de alias: a qué archivo canónico resuelve hoy una clave.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AliasEntry {
    pub key: ArtifactKey,
    pub target: PathBuf,
    pub companion: Option<PathBuf>,
    pub stage: String,
    pub run_id: String,
    pub hash: String,
    pub updated_at: DateTime<Utc>,
}

/// Reemplaza el puntero de alias y recrea el symlink. Idempotente.
pub(crate) fn update_alias(layout: &StoreLayout,
                           alias_dir: &Path,
                           record: &ArtifactRecord)
                           -> Result<AliasEntry, StoreError> {
    let target = absolute_target(&layout.absolute(&record.path));
    let companion = record.companion.as_deref().map(|c| absolute_target(&layout.absolute(c)));
    let entry = AliasEntry { key: record.key.clone(),
                             target,
                             companion,
                             stage: record.stage.clone(),
                             run_id: record.run_id.clone(),
                             hash: record.hash.clone(),
                             updated_at: Utc::now() };
    let pointer = StoreLayout::alias_pointer_path(alias_dir, &record.key);
    let bytes = serde_json::to_vec_pretty(&entry).map_err(|e| StoreError::Encode { key: record.key.clone(),
                                                                                  reason: e.to_string() })?;
    atomic_write_bytes(&pointer, &bytes).map_err(StoreError::io(&pointer))?;
    refresh_symlink(&link_path(alias_dir, &record.key), &entry.target);
    Ok(entry)
}

/// Ruta del symlink de una clave: la clave completa bajo `alias_dir`, así dos
/// claves con el mismo nombre de archivo no comparten link.
pub fn link_path(alias_dir: &Path, key: &ArtifactKey) -> PathBuf {
    key.as_str().split('/').fold(alias_dir.to_path_buf(), |p, seg| p.join(seg))
}

pub fn resolve_alias(alias_dir: &Path, key: &ArtifactKey) -> Result<AliasEntry, StoreError> {
    let pointer = StoreLayout::alias_pointer_path(alias_dir, key);
    if !pointer.exists() {
        return Err(StoreError::NotFound(key.clone()));
    }
    read_entry(&pointer, key)
}

/// Todas las entradas de la tabla, ordenadas por clave.
pub fn list_aliases(alias_dir: &Path) -> Result<Vec<AliasEntry>, StoreError> {
    let table = StoreLayout::alias_table_dir(alias_dir);
    if !table.exists() {
        return Ok(vec![]);
    }
    let mut out = Vec::new();
    for entry in fs::read_dir(&table).map_err(StoreError::io(&table))? {
        let path = entry.map_err(StoreError::io(&table))?.path();
        if path.extension().map(|e| e == "json").unwrap_or(false) {
            let text = fs::read_to_string(&path).map_err(StoreError::io(&path))?;
            match serde_json::from_str::<AliasEntry>(&text) {
                Ok(e) => out.push(e),
                Err(err) => warn!("skipping unreadable alias pointer {}: {err}", path.display()),
            }
        }
    }
    out.sort_by(|a, b| a.key.cmp(&b.key));
    Ok(out)
}

fn read_entry(pointer: &Path, key: &ArtifactKey) -> Result<AliasEntry, StoreError> {
    let text = fs::read_to_string(pointer).map_err(StoreError::io(pointer))?;
    serde_json::from_str(&text).map_err(|e| StoreError::Format { key: key.clone(),
                                                                 expected: "alias pointer".into(),
                                                                 actual: e.to_string() })
}

fn absolute_target(path: &Path) -> PathBuf {
    fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}

// Best effort: un archivo regular con ese nombre nunca se pisa.
#[cfg(unix)]
fn refresh_symlink(link: &Path, target: &Path) {
    use std::os::unix::fs::symlink;

    match fs::symlink_metadata(link) {
        Ok(meta) if !meta.file_type().is_symlink() => {
            warn!("not replacing {}: a regular file already uses that name", link.display());
            return;
        }
        _ => {}
    }
    if let Some(parent) = link.parent() {
        if let Err(err) = fs::create_dir_all(parent) {
            warn!("could not create {} for alias links: {err}", parent.display());
            return;
        }
    }
    let tmp = temp_sibling(link);
    let result = symlink(target, &tmp).and_then(|_| fs::rename(&tmp, link));
    if let Err(err) = result {
        let _ = fs::remove_file(&tmp);
        warn!("could not refresh symlink {} -> {}: {err}", link.display(), target.display());
    }
}

#[cfg(not(unix))]
fn refresh_symlink(_link: &Path, _target: &Path) {}
