use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::Utc;
use log::debug;

use super::alias::{update_alias, AliasEntry};
use super::atomic::{atomic_write_bytes, sync_parent, temp_sibling};
use super::layout::StoreLayout;
use crate::constants::COMPANION_SUFFIX;
use crate::errors::StoreError;
use crate::hashing::hash_bytes;
use crate::model::{ArtifactKey, ArtifactRecord, ArtifactValue, LineageEntry, PriorVersion};
use crate::session::RunIdentity;

/// Store de artifacts respaldado por el filesystem.
///
/// No guarda estado en memoria: todo lo que otra sesión necesita saber está
/// en los punteros del índice. Dos stages (o dos procesos) que abran la misma
/// raíz ven exactamente lo mismo.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    layout: StoreLayout,
}

impl ArtifactStore {
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let layout = StoreLayout::new(root);
        for dir in [layout.out_dir(), layout.index_dir()] {
            fs::create_dir_all(&dir).map_err(StoreError::io(&dir))?;
        }
        Ok(Self { layout })
    }

    pub fn root(&self) -> &Path {
        self.layout.root()
    }

    pub fn layout(&self) -> &StoreLayout {
        &self.layout
    }

    /// Persiste `value` bajo `key` y lo confirma de inmediato.
    ///
    /// Equivale a `stage` seguido de `commit`; lo usan quienes no necesitan
    /// diferir la publicación hasta el final de un run.
    pub fn write<T: ArtifactValue>(&self,
                                   run: &RunIdentity,
                                   key: &ArtifactKey,
                                   value: &T,
                                   alias_dir: Option<&Path>,
                                   lineage: &[LineageEntry])
                                   -> Result<ArtifactRecord, StoreError> {
        let staged = self.stage(run, key, value, lineage)?;
        self.commit(&staged, alias_dir)
    }

    /// Escribe los archivos canónicos de `value` sin tocar índice ni alias.
    ///
    /// Orden: codificar -> temporal + fsync -> rename al path canónico. El
    /// registro devuelto todavía no es visible para `read`/`contains`; hay que
    /// pasarlo a `commit`.
    pub fn stage<T: ArtifactValue>(&self,
                                   run: &RunIdentity,
                                   key: &ArtifactKey,
                                   value: &T,
                                   lineage: &[LineageEntry])
                                   -> Result<ArtifactRecord, StoreError> {
        let encoded = value.encode().map_err(|reason| StoreError::Encode { key: key.clone(),
                                                                          reason })?;
        let rel = StoreLayout::relative_canonical(run.stage(), run.run_id(), key);
        let abs = self.layout.absolute(&rel);
        if abs.exists() {
            return Err(StoreError::AlreadyWritten { key: key.clone(),
                                                    run_id: run.run_id().to_string() });
        }

        let (companion, companion_hash) = match &encoded.companion {
            Some(bytes) => {
                let rel_c = format!("{rel}{COMPANION_SUFFIX}");
                write_new(&self.layout.absolute(&rel_c), bytes, key, run)?;
                (Some(rel_c), Some(hash_bytes(bytes)))
            }
            None => (None, None),
        };
        write_new(&abs, &encoded.primary, key, run)?;
        debug!("staged {} -> {}", key, rel);

        Ok(ArtifactRecord { key: key.clone(),
                            kind: T::KIND,
                            type_tag: T::type_tag(),
                            schema_version: T::SCHEMA_VERSION,
                            path: rel,
                            companion,
                            hash: hash_bytes(&encoded.primary),
                            companion_hash,
                            size: encoded.primary.len() as u64,
                            stage: run.stage().to_string(),
                            run_id: run.run_id().to_string(),
                            written_at: Utc::now(),
                            lineage: lineage.to_vec(),
                            history: vec![] })
    }

    /// Confirma un registro preparado: puntero del índice y después alias.
    ///
    /// El historial se arma contra el puntero vigente al momento del commit.
    /// Si el puntero falla, el alias no cambia.
    pub fn commit(&self, staged: &ArtifactRecord, alias_dir: Option<&Path>) -> Result<ArtifactRecord, StoreError> {
        let key = &staged.key;
        let canonical = self.layout.absolute(&staged.path);
        if !canonical.exists() {
            return Err(StoreError::NotFound(key.clone()));
        }
        let history = match self.read_pointer(key)? {
            Some(prev) => {
                let mut h = prev.history.clone();
                h.push(prev.as_prior());
                h
            }
            None => vec![],
        };
        let record = ArtifactRecord { history,
                                      ..staged.clone() };
        let pointer = self.layout.pointer_path(key);
        let bytes = serde_json::to_vec_pretty(&record).map_err(|e| StoreError::Encode { key: key.clone(),
                                                                                       reason: e.to_string() })?;
        atomic_write_bytes(&pointer, &bytes).map_err(StoreError::io(&pointer))?;
        debug!("committed {} -> {}", key, record.path);

        if let Some(dir) = alias_dir {
            self.alias(dir, &record)?;
        }
        Ok(record)
    }

    /// Recrea el alias de un registro ya confirmado.
    pub fn alias(&self, alias_dir: &Path, record: &ArtifactRecord) -> Result<AliasEntry, StoreError> {
        update_alias(&self.layout, alias_dir, record)
    }

    pub fn read<T: ArtifactValue>(&self, key: &ArtifactKey) -> Result<T, StoreError> {
        self.read_with_record(key).map(|(v, _)| v)
    }

    /// Lee el último write confirmado de `key`, verificando tipo y hash.
    pub fn read_with_record<T: ArtifactValue>(&self, key: &ArtifactKey) -> Result<(T, ArtifactRecord), StoreError> {
        let record = self.record(key)?;
        let expected = describe(T::KIND.as_str(), &T::type_tag(), T::SCHEMA_VERSION);
        let actual = describe(record.kind.as_str(), &record.type_tag, record.schema_version);
        if expected != actual {
            return Err(StoreError::Format { key: key.clone(),
                                            expected,
                                            actual });
        }
        let primary = self.read_verified(key, &record.path, &record.hash)?;
        let companion = match (&record.companion, &record.companion_hash) {
            (Some(path), Some(hash)) => Some(self.read_verified(key, path, hash)?),
            (Some(path), None) => {
                let abs = self.layout.absolute(path);
                Some(fs::read(&abs).map_err(StoreError::io(&abs))?)
            }
            _ => None,
        };
        let value = T::decode(&primary, companion.as_deref()).map_err(|reason| {
                                                                 StoreError::Format { key: key.clone(),
                                                                                      expected: T::type_tag(),
                                                                                      actual: format!("undecodable content ({reason})") }
                                                             })?;
        Ok((value, record))
    }

    pub fn record(&self, key: &ArtifactKey) -> Result<ArtifactRecord, StoreError> {
        self.read_pointer(key)?.ok_or_else(|| StoreError::NotFound(key.clone()))
    }

    /// Versiones de `key` de la más antigua a la actual.
    pub fn history(&self, key: &ArtifactKey) -> Result<Vec<PriorVersion>, StoreError> {
        let record = self.record(key)?;
        let mut out = record.history.clone();
        out.push(record.as_prior());
        Ok(out)
    }

    pub fn contains(&self, key: &ArtifactKey) -> bool {
        self.layout.pointer_path(key).exists()
    }

    /// Todos los registros confirmados, ordenados por clave.
    ///
    /// Un puntero ilegible corta el listado con `CorruptIndex`.
    pub fn records(&self) -> Result<Vec<ArtifactRecord>, StoreError> {
        let dir = self.layout.index_dir();
        let mut out = Vec::new();
        for entry in fs::read_dir(&dir).map_err(StoreError::io(&dir))? {
            let path = entry.map_err(StoreError::io(&dir))?.path();
            if path.extension().map(|e| e == "json").unwrap_or(false) {
                let text = fs::read_to_string(&path).map_err(StoreError::io(&path))?;
                let rec = serde_json::from_str::<ArtifactRecord>(&text).map_err(|e| StoreError::CorruptIndex { path: path.clone(),
                                                                                                                reason: e.to_string() })?;
                out.push(rec);
            }
        }
        out.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(out)
    }

    fn read_pointer(&self, key: &ArtifactKey) -> Result<Option<ArtifactRecord>, StoreError> {
        let pointer = self.layout.pointer_path(key);
        if !pointer.exists() {
            return Ok(None);
        }
        let text = fs::read_to_string(&pointer).map_err(StoreError::io(&pointer))?;
        serde_json::from_str(&text).map(Some)
                                   .map_err(|e| StoreError::Format { key: key.clone(),
                                                                     expected: "artifact record".into(),
                                                                     actual: e.to_string() })
    }

    fn read_verified(&self, key: &ArtifactKey, rel: &str, hash: &str) -> Result<Vec<u8>, StoreError> {
        let abs = self.layout.absolute(rel);
        let bytes = fs::read(&abs).map_err(StoreError::io(&abs))?;
        let actual = hash_bytes(&bytes);
        if actual != hash {
            return Err(StoreError::Format { key: key.clone(),
                                            expected: format!("blake3 {hash}"),
                                            actual: format!("blake3 {actual}") });
        }
        Ok(bytes)
    }
}

fn describe(kind: &str, tag: &str, version: u32) -> String {
    format!("{kind} {tag} v{version}")
}

// Escritura de un archivo canónico: nunca reemplaza uno existente.
fn write_new(path: &Path, bytes: &[u8], key: &ArtifactKey, run: &RunIdentity) -> Result<(), StoreError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(StoreError::io(parent))?;
    }
    let tmp = temp_sibling(path);
    let staged = (|| {
        let mut file = fs::File::create(&tmp)?;
        file.write_all(bytes)?;
        file.sync_all()
    })();
    if let Err(source) = staged {
        let _ = fs::remove_file(&tmp);
        return Err(StoreError::Io { path: tmp, source });
    }
    if path.exists() {
        let _ = fs::remove_file(&tmp);
        return Err(StoreError::AlreadyWritten { key: key.clone(),
                                                run_id: run.run_id().to_string() });
    }
    fs::rename(&tmp, path).map_err(StoreError::io(path))?;
    sync_parent(path);
    Ok(())
}
