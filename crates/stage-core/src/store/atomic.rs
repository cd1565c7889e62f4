use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::Utc;

/// Escribe `bytes` en un temporal hermano, hace fsync y renombra sobre `path`.
///
/// Un lector nunca observa el archivo a medio escribir: o ve la versión
/// anterior o la nueva.
pub fn atomic_write_bytes(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let tmp = temp_sibling(path);
    let result = (|| {
        let mut file = fs::File::create(&tmp)?;
        file.write_all(bytes)?;
        file.sync_all()?;
        fs::rename(&tmp, path)
    })();
    if result.is_err() {
        let _ = fs::remove_file(&tmp);
    }
    result?;
    sync_parent(path);
    Ok(())
}

pub(crate) fn temp_sibling(path: &Path) -> PathBuf {
    let name = path.file_name().and_then(|s| s.to_str()).unwrap_or("tmpfile");
    let ts = Utc::now().timestamp_micros();
    path.with_file_name(format!(".{}.tmp.{}.{}", name, std::process::id(), ts))
}

pub(crate) fn sync_parent(path: &Path) {
    if let Some(parent) = path.parent() {
        if let Ok(dir) = fs::File::open(parent) {
            let _ = dir.sync_all();
        }
    }
}
