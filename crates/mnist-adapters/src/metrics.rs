//! Matriz de confusión y reporte de clasificación (precision/recall/F1).

use ndarray::{Array2, ArrayView1};
use serde::{Deserialize, Serialize};
use stage_core::model::TableRow;

use crate::errors::MnistError;

/// Cuenta `[verdadero, predicho]` sobre `classes` (ordenadas). Etiquetas
/// fuera de `classes` se ignoran.
pub fn confusion_matrix(y_true: ArrayView1<'_, u8>,
                        y_pred: ArrayView1<'_, u8>,
                        classes: &[u8])
                        -> Result<Array2<u64>, MnistError> {
    if y_true.len() != y_pred.len() {
        return Err(MnistError::Shape(format!("{} labels but {} predictions", y_true.len(), y_pred.len())));
    }
    let index = |v: u8| classes.iter().position(|c| *c == v);
    let mut cm = Array2::<u64>::zeros((classes.len(), classes.len()));
    for (t, p) in y_true.iter().zip(y_pred.iter()) {
        if let (Some(i), Some(j)) = (index(*t), index(*p)) {
            cm[[i, j]] += 1;
        }
    }
    Ok(cm)
}

/// Fila del reporte. Las filas de clase y los promedios llevan
/// precision/recall; la fila `accuracy` sólo `f1_score` y `support`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportRow {
    pub label: String,
    pub precision: Option<f64>,
    pub recall: Option<f64>,
    pub f1_score: f64,
    pub support: u64,
}

impl TableRow for ReportRow {
    const TABLE: &'static str = "classification_report";
}

fn ratio(num: u64, den: u64) -> f64 {
    if den == 0 {
        0.0
    } else {
        num as f64 / den as f64
    }
}

fn f1(p: f64, r: f64) -> f64 {
    if p + r == 0.0 {
        0.0
    } else {
        2.0 * p * r / (p + r)
    }
}

/// Filas por clase, luego `accuracy`, `macro avg` y `weighted avg`.
/// Divisiones por cero valen 0.
pub fn classification_report(cm: &Array2<u64>, classes: &[u8]) -> Vec<ReportRow> {
    let total: u64 = cm.sum();
    let mut rows = Vec::with_capacity(classes.len() + 3);
    for (i, class) in classes.iter().enumerate() {
        let tp = cm[[i, i]];
        let support = cm.row(i).sum();
        let predicted = cm.column(i).sum();
        let precision = ratio(tp, predicted);
        let recall = ratio(tp, support);
        rows.push(ReportRow { label: class.to_string(),
                              precision: Some(precision),
                              recall: Some(recall),
                              f1_score: f1(precision, recall),
                              support });
    }
    let n = classes.len().max(1) as f64;
    let correct: u64 = cm.diag().sum();
    let mean = |f: &dyn Fn(&ReportRow) -> f64| rows.iter().map(f).sum::<f64>() / n;
    let weighted = |f: &dyn Fn(&ReportRow) -> f64| {
        if total == 0 {
            0.0
        } else {
            rows.iter().map(|r| f(r) * r.support as f64).sum::<f64>() / total as f64
        }
    };
    let precision = |r: &ReportRow| r.precision.unwrap_or(0.0);
    let recall = |r: &ReportRow| r.recall.unwrap_or(0.0);
    let f1s = |r: &ReportRow| r.f1_score;
    let summary = [ReportRow { label: "accuracy".into(),
                               precision: None,
                               recall: None,
                               f1_score: ratio(correct, total),
                               support: total },
                   ReportRow { label: "macro avg".into(),
                               precision: Some(mean(&precision)),
                               recall: Some(mean(&recall)),
                               f1_score: mean(&f1s),
                               support: total },
                   ReportRow { label: "weighted avg".into(),
                               precision: Some(weighted(&precision)),
                               recall: Some(weighted(&recall)),
                               f1_score: weighted(&f1s),
                               support: total }];
    rows.extend(summary);
    rows
}

/// Busca la fila `label` del reporte.
pub fn report_value(rows: &[ReportRow], label: &str) -> Option<f64> {
    rows.iter().find(|r| r.label == label).map(|r| r.f1_score)
}
