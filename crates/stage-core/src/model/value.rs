//! `ArtifactValue`: el tipo Rust del valor decide su formato en disco.
//!
//! - Arreglos `ndarray` -> `.npy`.
//! - `Vec<R>` con `R: TableRow` -> `.csv` con cabecera.
//! - Tipos declarados con `blob_artifact!` -> blob `bincode`.
//! - Figuras (ver `plot`) -> SVG renderizado + compañero `bincode`.
//!
//! `type_tag` + `SCHEMA_VERSION` se guardan en el registro y se comparan al
//! leer; una discrepancia es un error de formato, nunca una decodificación
//! "a ciegas".

use ndarray::{Array, Dimension};
use ndarray_npy::{ReadNpyExt, ReadableElement, WritableElement, WriteNpyExt};
use serde::{de::DeserializeOwned, Serialize};

use super::codec;
use super::ArtifactKind;

/// Bytes listos para escribir: archivo principal + compañero opcional.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Encoded {
    pub primary: Vec<u8>,
    pub companion: Option<Vec<u8>>,
}

impl Encoded {
    pub fn single(primary: Vec<u8>) -> Self {
        Self { primary,
               companion: None }
    }
}

pub trait ArtifactValue: Sized {
    const KIND: ArtifactKind;
    const SCHEMA_VERSION: u32 = 1;

    /// Etiqueta estable del tipo concreto (p. ej. `ndarray<f32,2>`).
    fn type_tag() -> String;

    fn encode(&self) -> Result<Encoded, String>;

    fn decode(primary: &[u8], companion: Option<&[u8]>) -> Result<Self, String>;
}

/// Elementos admitidos en arreglos `.npy`.
pub trait NpyElement: WritableElement + ReadableElement {
    const NAME: &'static str;
}

macro_rules! npy_elements {
    ($($t:ty => $name:literal),* $(,)?) => {
        $(impl NpyElement for $t { const NAME: &'static str = $name; })*
    };
}

npy_elements!(u8 => "u8", u16 => "u16", u32 => "u32", u64 => "u64",
              i8 => "i8", i16 => "i16", i32 => "i32", i64 => "i64",
              f32 => "f32", f64 => "f64", bool => "bool");

impl<A, D> ArtifactValue for Array<A, D>
    where A: NpyElement,
          D: Dimension
{
    const KIND: ArtifactKind = ArtifactKind::Array;

    fn type_tag() -> String {
        let ndim = D::NDIM.map(|n| n.to_string()).unwrap_or_else(|| "dyn".to_string());
        format!("ndarray<{},{}>", A::NAME, ndim)
    }

    fn encode(&self) -> Result<Encoded, String> {
        let mut buf = Vec::new();
        self.write_npy(&mut buf).map_err(|e| e.to_string())?;
        Ok(Encoded::single(buf))
    }

    fn decode(primary: &[u8], _companion: Option<&[u8]>) -> Result<Self, String> {
        Array::<A, D>::read_npy(primary).map_err(|e| e.to_string())
    }
}

/// Fila de una tabla persistida como CSV.
pub trait TableRow: Serialize + DeserializeOwned {
    const TABLE: &'static str;
    const SCHEMA_VERSION: u32 = 1;
}

impl<R: TableRow> ArtifactValue for Vec<R> {
    const KIND: ArtifactKind = ArtifactKind::Table;
    const SCHEMA_VERSION: u32 = R::SCHEMA_VERSION;

    fn type_tag() -> String {
        format!("table<{}>", R::TABLE)
    }

    fn encode(&self) -> Result<Encoded, String> {
        codec::csv_encode(self).map(Encoded::single)
    }

    fn decode(primary: &[u8], _companion: Option<&[u8]>) -> Result<Self, String> {
        codec::csv_decode(primary)
    }
}

/// Declara un tipo `Serialize + DeserializeOwned` como blob `bincode`.
///
/// ```ignore
/// blob_artifact!(SvmModel, "svm_model");
/// blob_artifact!(DataLoader, "data_loader", 2);
/// ```
#[macro_export]
macro_rules! blob_artifact {
    ($ty:ty, $tag:literal) => {
        $crate::blob_artifact!($ty, $tag, 1);
    };
    ($ty:ty, $tag:literal, $version:literal) => {
        impl $crate::model::ArtifactValue for $ty {
            const KIND: $crate::model::ArtifactKind = $crate::model::ArtifactKind::Blob;
            const SCHEMA_VERSION: u32 = $version;

            fn type_tag() -> String {
                format!("blob<{}>", $tag)
            }

            fn encode(&self) -> Result<$crate::model::Encoded, String> {
                $crate::model::codec::blob_encode(self).map($crate::model::Encoded::single)
            }

            fn decode(primary: &[u8], _companion: Option<&[u8]>) -> Result<Self, String> {
                $crate::model::codec::blob_decode(primary)
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{array, Array1, Array2};
    use serde::Deserialize;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Row {
        label: String,
        score: f64,
    }

    impl TableRow for Row {
        const TABLE: &'static str = "row";
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Weights {
        w: Vec<f64>,
        name: String,
    }

    crate::blob_artifact!(Weights, "weights");

    #[test]
    fn arrays_roundtrip_through_npy() {
        let a: Array2<f32> = array![[0.0, 0.5], [1.0, 0.25]];
        let enc = a.encode().unwrap();
        assert!(enc.primary.starts_with(b"\x93NUMPY"));
        assert_eq!(Array2::<f32>::decode(&enc.primary, None).unwrap(), a);
        assert_eq!(<Array2<f32> as ArtifactValue>::type_tag(), "ndarray<f32,2>");
        assert_eq!(<Array1<u8> as ArtifactValue>::type_tag(), "ndarray<u8,1>");
    }

    #[test]
    fn decoding_with_wrong_element_type_fails() {
        let a: Array1<u8> = array![1, 2, 3];
        let enc = a.encode().unwrap();
        assert!(Array1::<f64>::decode(&enc.primary, None).is_err());
    }

    #[test]
    fn tables_are_csv_with_header() {
        let rows = vec![Row { label: "0".into(), score: 0.5 }, Row { label: "macro avg".into(), score: 1.0 }];
        let enc = rows.encode().unwrap();
        let text = String::from_utf8(enc.primary.clone()).unwrap();
        assert!(text.starts_with("label,score\n"));
        assert_eq!(Vec::<Row>::decode(&enc.primary, None).unwrap(), rows);
    }

    #[test]
    fn blob_macro_uses_bincode() {
        let w = Weights { w: vec![1.0, -2.0], name: "svm".into() };
        let enc = w.encode().unwrap();
        assert_eq!(Weights::decode(&enc.primary, None).unwrap(), w);
        assert_eq!(<Weights as ArtifactValue>::type_tag(), "blob<weights>");
        assert_eq!(<Weights as ArtifactValue>::KIND, ArtifactKind::Blob);
    }
}
