//! Dataset MNIST crudo: descarga de los `.gz` IDX y decodificación.
//!
//! Formato IDX (big endian): `0x00 0x00 <tipo> <ndim>` seguido de `ndim`
//! dimensiones `u32` y los datos. Sólo se admite tipo `0x08` (u8): imágenes
//! con 3 dimensiones y etiquetas con 1.

use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::Duration;

use flate2::read::GzDecoder;
use log::info;
use ndarray::{Array1, Array2, Array3};
use stage_core::store::atomic_write_bytes;

use crate::errors::MnistError;
use crate::settings::DownloadSettings;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Split {
    Train,
    Test,
}

impl Split {
    pub fn name(&self) -> &'static str {
        match self {
            Split::Train => "train",
            Split::Test => "test",
        }
    }

    pub fn images_file(&self) -> &'static str {
        match self {
            Split::Train => "train-images-idx3-ubyte.gz",
            Split::Test => "t10k-images-idx3-ubyte.gz",
        }
    }

    pub fn labels_file(&self) -> &'static str {
        match self {
            Split::Train => "train-labels-idx1-ubyte.gz",
            Split::Test => "t10k-labels-idx1-ubyte.gz",
        }
    }
}

pub const RAW_FILES: [&str; 4] = ["train-images-idx3-ubyte.gz",
                                  "train-labels-idx1-ubyte.gz",
                                  "t10k-images-idx3-ubyte.gz",
                                  "t10k-labels-idx1-ubyte.gz"];

/// Un split decodificado: imágenes `n x alto x ancho` y etiquetas `n`.
#[derive(Debug, Clone, PartialEq)]
pub struct MnistSplit {
    pub images: Array3<u8>,
    pub labels: Array1<u8>,
}

impl MnistSplit {
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// `n x (alto*ancho)` con valores en [0, 1].
    pub fn flattened(&self) -> Array2<f32> {
        let (n, h, w) = self.images.dim();
        let data: Vec<f32> = self.images.iter().map(|v| *v as f32 / 255.0).collect();
        // iter() recorre en orden lógico: el largo siempre es n*h*w
        Array2::from_shape_vec((n, h * w), data).unwrap_or_else(|_| Array2::zeros((0, h * w)))
    }
}

/// Descarga los archivos que falten en `raw_dir`. Devuelve los que se bajaron.
pub fn fetch_raw(raw_dir: &Path, settings: &DownloadSettings) -> Result<Vec<PathBuf>, MnistError> {
    fs::create_dir_all(raw_dir).map_err(MnistError::io(raw_dir))?;
    let pending: Vec<&str> = RAW_FILES.iter()
                                      .copied()
                                      .filter(|f| settings.force || !raw_dir.join(f).exists())
                                      .collect();
    if pending.is_empty() {
        info!("raw MNIST files already present in {}", raw_dir.display());
        return Ok(vec![]);
    }
    let client = reqwest::blocking::Client::builder().timeout(Duration::from_secs(settings.timeout_secs))
                                                     .build()
                                                     .map_err(|e| MnistError::Download { url: settings.base_url.clone(),
                                                                                         reason: e.to_string() })?;
    let mut fetched = Vec::with_capacity(pending.len());
    for name in pending {
        let url = format!("{}/{}", settings.base_url.trim_end_matches('/'), name);
        info!("downloading {url}");
        let fail = |reason: String| MnistError::Download { url: url.clone(),
                                                           reason };
        let resp = client.get(&url).send().map_err(|e| fail(e.to_string()))?;
        let resp = resp.error_for_status().map_err(|e| fail(e.to_string()))?;
        let bytes = resp.bytes().map_err(|e| fail(e.to_string()))?;
        let target = raw_dir.join(name);
        atomic_write_bytes(&target, &bytes).map_err(MnistError::io(&target))?;
        fetched.push(target);
    }
    Ok(fetched)
}

pub fn load_split(raw_dir: &Path, split: Split) -> Result<MnistSplit, MnistError> {
    let images_path = raw_dir.join(split.images_file());
    let labels_path = raw_dir.join(split.labels_file());
    let (img_dims, img_data) = read_idx(&images_path)?;
    let (lbl_dims, lbl_data) = read_idx(&labels_path)?;
    let bad = |path: &Path, reason: String| MnistError::Idx { path: path.to_path_buf(),
                                                              reason };
    if img_dims.len() != 3 {
        return Err(bad(&images_path, format!("expected 3 dimensions, found {}", img_dims.len())));
    }
    if lbl_dims.len() != 1 {
        return Err(bad(&labels_path, format!("expected 1 dimension, found {}", lbl_dims.len())));
    }
    if img_dims[0] != lbl_dims[0] {
        return Err(MnistError::Shape(format!("{} split has {} images but {} labels",
                                             split.name(),
                                             img_dims[0],
                                             lbl_dims[0])));
    }
    let images = Array3::from_shape_vec((img_dims[0], img_dims[1], img_dims[2]), img_data).map_err(|e| bad(&images_path, e.to_string()))?;
    Ok(MnistSplit { images,
                    labels: Array1::from(lbl_data) })
}

/// Lee un archivo IDX (gzip si termina en `.gz`).
pub fn read_idx(path: &Path) -> Result<(Vec<usize>, Vec<u8>), MnistError> {
    let raw = fs::read(path).map_err(MnistError::io(path))?;
    let bytes = if path.extension().map(|e| e == "gz").unwrap_or(false) {
        let mut out = Vec::new();
        GzDecoder::new(raw.as_slice()).read_to_end(&mut out)
                                      .map_err(|e| MnistError::Idx { path: path.to_path_buf(),
                                                                     reason: format!("gzip: {e}") })?;
        out
    } else {
        raw
    };
    parse_idx(&bytes).map_err(|reason| MnistError::Idx { path: path.to_path_buf(),
                                                         reason })
}

pub fn parse_idx(bytes: &[u8]) -> Result<(Vec<usize>, Vec<u8>), String> {
    if bytes.len() < 4 {
        return Err("truncated header".into());
    }
    if bytes[0] != 0 || bytes[1] != 0 {
        return Err("bad magic number".into());
    }
    if bytes[2] != 0x08 {
        return Err(format!("unsupported element type 0x{:02x}", bytes[2]));
    }
    let ndim = bytes[3] as usize;
    let header = 4 + 4 * ndim;
    if bytes.len() < header {
        return Err("truncated dimensions".into());
    }
    let dims: Vec<usize> = (0..ndim).map(|i| {
                                        let o = 4 + 4 * i;
                                        u32::from_be_bytes([bytes[o], bytes[o + 1], bytes[o + 2], bytes[o + 3]]) as usize
                                    })
                                    .collect();
    let expected: usize = dims.iter().product();
    let data = &bytes[header..];
    if data.len() != expected {
        return Err(format!("expected {expected} data bytes, found {}", data.len()));
    }
    Ok((dims, data.to_vec()))
}

/// Codifica un IDX u8 (útil para datasets sintéticos en tests y demos).
pub fn encode_idx(dims: &[usize], data: &[u8]) -> Vec<u8> {
    let mut out = vec![0u8, 0, 0x08, dims.len() as u8];
    for d in dims {
        out.extend_from_slice(&(*d as u32).to_be_bytes());
    }
    out.extend_from_slice(data);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::Write;

    fn write_gz(path: &Path, bytes: &[u8]) {
        let mut enc = GzEncoder::new(Vec::new(), Compression::fast());
        enc.write_all(bytes).unwrap();
        fs::write(path, enc.finish().unwrap()).unwrap();
    }

    #[test]
    fn parses_headers_and_rejects_truncation() {
        let idx = encode_idx(&[2, 2, 2], &[0, 1, 2, 3, 4, 5, 6, 7]);
        let (dims, data) = parse_idx(&idx).unwrap();
        assert_eq!(dims, vec![2, 2, 2]);
        assert_eq!(data.len(), 8);
        assert!(parse_idx(&idx[..idx.len() - 1]).is_err());
        assert!(parse_idx(&[0, 0, 0x0d, 1, 0, 0, 0, 0]).is_err());
    }

    #[test]
    fn loads_gzipped_split_and_flattens() {
        let dir = tempfile::tempdir().unwrap();
        write_gz(&dir.path().join(Split::Test.images_file()), &encode_idx(&[2, 2, 2], &[0, 255, 0, 255, 255, 0, 255, 0]));
        write_gz(&dir.path().join(Split::Test.labels_file()), &encode_idx(&[2], &[3, 7]));
        let split = load_split(dir.path(), Split::Test).unwrap();
        assert_eq!(split.len(), 2);
        assert_eq!(split.labels.to_vec(), vec![3, 7]);
        let flat = split.flattened();
        assert_eq!(flat.dim(), (2, 4));
        assert_eq!(flat[[0, 1]], 1.0);
    }

    #[test]
    fn mismatched_counts_are_shape_errors() {
        let dir = tempfile::tempdir().unwrap();
        write_gz(&dir.path().join(Split::Train.images_file()), &encode_idx(&[1, 1, 1], &[9]));
        write_gz(&dir.path().join(Split::Train.labels_file()), &encode_idx(&[2], &[1, 2]));
        assert!(matches!(load_split(dir.path(), Split::Train), Err(MnistError::Shape(_))));
    }

    #[test]
    fn present_files_are_not_downloaded_again() {
        let dir = tempfile::tempdir().unwrap();
        for f in RAW_FILES {
            fs::write(dir.path().join(f), b"x").unwrap();
        }
        let settings = DownloadSettings { base_url: "http://127.0.0.1:9".into(),
                                          ..DownloadSettings::default() };
        assert!(fetch_raw(dir.path(), &settings).unwrap().is_empty());
    }
}
