use std::path::{Path, PathBuf};

use crate::constants::{ALIAS_TABLE_DIR, INDEX_DIR, OUT_DIR};
use crate::hashing::hash_str;
use crate::model::ArtifactKey;

/// Rutas del store derivadas de la raíz. No toca el filesystem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreLayout {
    root: PathBuf,
}

impl StoreLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn out_dir(&self) -> PathBuf {
        self.root.join(OUT_DIR)
    }

    pub fn index_dir(&self) -> PathBuf {
        self.root.join(INDEX_DIR)
    }

    pub fn run_dir(&self, stage: &str, run_id: &str) -> PathBuf {
        self.out_dir().join(stage).join(run_id)
    }

    /// Ruta canónica relativa a la raíz, con `/` como separador.
    pub fn relative_canonical(stage: &str, run_id: &str, key: &ArtifactKey) -> String {
        format!("{OUT_DIR}/{stage}/{run_id}/{}", key.as_str())
    }

    pub fn absolute(&self, relative: &str) -> PathBuf {
        relative.split('/').fold(self.root.clone(), |p, seg| p.join(seg))
    }

    pub fn pointer_path(&self, key: &ArtifactKey) -> PathBuf {
        self.index_dir().join(pointer_file_name(key))
    }

    pub fn alias_table_dir(alias_dir: &Path) -> PathBuf {
        alias_dir.join(ALIAS_TABLE_DIR)
    }

    pub fn alias_pointer_path(alias_dir: &Path, key: &ArtifactKey) -> PathBuf {
        Self::alias_table_dir(alias_dir).join(pointer_file_name(key))
    }
}

fn pointer_file_name(key: &ArtifactKey) -> String {
    format!("{}.json", hash_str(key.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_paths_are_run_scoped() {
        let layout = StoreLayout::new("/tmp/store");
        let key = ArtifactKey::new("data/mnist/labels_train.npy").unwrap();
        let rel = StoreLayout::relative_canonical("01_download", "20250101-000000_abcd1234", &key);
        assert_eq!(rel, "out/01_download/20250101-000000_abcd1234/data/mnist/labels_train.npy");
        assert_eq!(layout.absolute(&rel),
                   PathBuf::from("/tmp/store/out/01_download/20250101-000000_abcd1234/data/mnist/labels_train.npy"));
    }

    #[test]
    fn pointer_names_depend_only_on_key() {
        let layout = StoreLayout::new("/a");
        let k1 = ArtifactKey::new("./x/y.csv").unwrap();
        let k2 = ArtifactKey::new("x/y.csv").unwrap();
        assert_eq!(layout.pointer_path(&k1), layout.pointer_path(&k2));
        assert_ne!(layout.pointer_path(&k1), layout.pointer_path(&ArtifactKey::new("x/z.csv").unwrap()));
    }
}
