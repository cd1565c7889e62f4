use std::collections::BTreeSet;

use super::Figure;

/// Contexto de plotting de una sesión: sabe qué figuras siguen abiertas.
///
/// Al cerrar la sesión todas las figuras pendientes se cierran; la cantidad
/// se informa en el resumen para detectar stages que crean figuras sin
/// guardarlas.
#[derive(Debug, Default)]
pub struct PlotContext {
    next_id: u64,
    open: BTreeSet<u64>,
}

impl PlotContext {
    /// Nueva figura con una grilla `rows x cols` de paneles.
    pub fn subplots(&mut self, rows: usize, cols: usize, size: (u32, u32)) -> Figure {
        self.next_id += 1;
        self.open.insert(self.next_id);
        Figure::new(self.next_id, rows, cols, size)
    }

    pub fn close(&mut self, figure: &Figure) -> bool {
        self.open.remove(&figure.id)
    }

    /// Cierra todo lo pendiente y devuelve cuántas figuras quedaban abiertas.
    pub fn close_all(&mut self) -> usize {
        let n = self.open.len();
        self.open.clear();
        n
    }

    pub fn open_count(&self) -> usize {
        self.open.len()
    }
}
