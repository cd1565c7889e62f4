//! Plotting de sesión: modelo de figuras, contexto y render SVG.

mod context;
mod figure;
mod render;

pub use context::PlotContext;
pub use figure::{Figure, Panel, PanelContent, ScatterSeries};
pub use render::render_svg;

use crate::model::{codec, ArtifactKind, ArtifactValue, Encoded};

/// El SVG es para humanos; el compañero `bincode` permite leer la figura de vuelta.
impl ArtifactValue for Figure {
    const KIND: ArtifactKind = ArtifactKind::Figure;

    fn type_tag() -> String {
        "figure<svg>".to_string()
    }

    fn encode(&self) -> Result<Encoded, String> {
        let svg = render_svg(self)?;
        Ok(Encoded { primary: svg.into_bytes(),
                     companion: Some(codec::blob_encode(self)?) })
    }

    fn decode(_primary: &[u8], companion: Option<&[u8]>) -> Result<Self, String> {
        let bytes = companion.ok_or_else(|| "figure companion is missing".to_string())?;
        codec::blob_decode(bytes)
    }
}
