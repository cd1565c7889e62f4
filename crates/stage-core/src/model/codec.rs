//! Codificadores compartidos por las implementaciones de `ArtifactValue`.

use serde::{de::DeserializeOwned, Serialize};

pub fn blob_encode<T: Serialize>(value: &T) -> Result<Vec<u8>, String> {
    bincode::serialize(value).map_err(|e| e.to_string())
}

pub fn blob_decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, String> {
    bincode::deserialize(bytes).map_err(|e| e.to_string())
}

pub fn csv_encode<R: Serialize>(rows: &[R]) -> Result<Vec<u8>, String> {
    let mut wtr = csv::Writer::from_writer(Vec::new());
    for row in rows {
        wtr.serialize(row).map_err(|e| e.to_string())?;
    }
    wtr.into_inner().map_err(|e| e.to_string())
}

pub fn csv_decode<R: DeserializeOwned>(bytes: &[u8]) -> Result<Vec<R>, String> {
    let mut rdr = csv::Reader::from_reader(bytes);
    rdr.deserialize().map(|r| r.map_err(|e| e.to_string())).collect()
}
