//! Modelo declarativo de figuras.
//!
//! Un stage describe qué dibujar (`Figure` con paneles en grilla) y el store
//! decide cómo persistirlo: SVG renderizado con plotters para humanos, más el
//! propio `Figure` serializado como compañero para poder leerlo de vuelta.
use serde::{Deserialize, Serialize};

use crate::session::Rgb;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Figure {
    pub(crate) id: u64,
    pub title: Option<String>,
    /// Tamaño en píxeles (ancho, alto).
    pub size: (u32, u32),
    pub rows: usize,
    pub cols: usize,
    pub panels: Vec<Panel>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Panel {
    pub title: Option<String>,
    pub x_label: Option<String>,
    pub y_label: Option<String>,
    pub content: PanelContent,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub enum PanelContent {
    #[default]
    Empty,
    /// Imagen en escala de grises, fila mayor; se reescala a [min, max].
    Image { width: usize, height: usize, pixels: Vec<f32> },
    /// Nube de puntos, una serie por categoría (con su entrada de leyenda).
    Scatter { series: Vec<ScatterSeries> },
    /// Matriz de conteos con anotaciones opcionales por celda.
    Heatmap {
        values: Vec<Vec<f64>>,
        row_labels: Vec<String>,
        col_labels: Vec<String>,
        annotate: bool,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScatterSeries {
    pub label: String,
    pub color: Rgb,
    pub points: Vec<(f64, f64)>,
}

impl Figure {
    pub(crate) fn new(id: u64, rows: usize, cols: usize, size: (u32, u32)) -> Self {
        let (rows, cols) = (rows.max(1), cols.max(1));
        Self { id,
               title: None,
               size,
               rows,
               cols,
               panels: vec![Panel::default(); rows * cols] }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    /// Panel en (fila, columna); `None` fuera de la grilla.
    pub fn panel_mut(&mut self, row: usize, col: usize) -> Option<&mut Panel> {
        if row >= self.rows || col >= self.cols {
            return None;
        }
        self.panels.get_mut(row * self.cols + col)
    }

    /// Paneles en orden de lectura (como `axes.flat`).
    pub fn panels_mut(&mut self) -> impl Iterator<Item = &mut Panel> {
        self.panels.iter_mut()
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }
}

impl Panel {
    pub fn set_title(&mut self, title: impl Into<String>) -> &mut Self {
        self.title = Some(title.into());
        self
    }

    /// Etiquetas de ejes y título en una sola llamada.
    pub fn set_xyt(&mut self, x: impl Into<String>, y: impl Into<String>, title: impl Into<String>) -> &mut Self {
        self.x_label = Some(x.into());
        self.y_label = Some(y.into());
        self.title = Some(title.into());
        self
    }

    pub fn image(&mut self, width: usize, height: usize, pixels: Vec<f32>) -> &mut Self {
        self.content = PanelContent::Image { width, height, pixels };
        self
    }

    pub fn scatter(&mut self, series: Vec<ScatterSeries>) -> &mut Self {
        self.content = PanelContent::Scatter { series };
        self
    }

    pub fn heatmap(&mut self, values: Vec<Vec<f64>>, row_labels: Vec<String>, col_labels: Vec<String>) -> &mut Self {
        self.content = PanelContent::Heatmap { values,
                                               row_labels,
                                               col_labels,
                                               annotate: true };
        self
    }
}
