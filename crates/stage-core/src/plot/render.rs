//! Render SVG de `Figure` con plotters.
use plotters::coord::Shift;
use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};

use super::{Figure, Panel, PanelContent, ScatterSeries};

type Area<'a> = DrawingArea<SVGBackend<'a>, Shift>;

fn err<E: std::fmt::Display>(e: E) -> String {
    e.to_string()
}

pub fn render_svg(fig: &Figure) -> Result<String, String> {
    let mut svg = String::new();
    {
        let root = SVGBackend::with_string(&mut svg, fig.size).into_drawing_area();
        root.fill(&WHITE).map_err(err)?;
        let body = match &fig.title {
            Some(t) => root.titled(t, ("sans-serif", 24)).map_err(err)?,
            None => root.clone(),
        };
        let areas = body.split_evenly((fig.rows, fig.cols));
        for (panel, area) in fig.panels.iter().zip(areas.iter()) {
            draw_panel(panel, area)?;
        }
        root.present().map_err(err)?;
    }
    Ok(svg)
}

fn draw_panel(panel: &Panel, area: &Area<'_>) -> Result<(), String> {
    match &panel.content {
        PanelContent::Empty => {
            if let Some(t) = &panel.title {
                area.titled(t, ("sans-serif", 14)).map_err(err)?;
            }
            Ok(())
        }
        PanelContent::Image { width, height, pixels } => draw_image(panel, area, *width, *height, pixels),
        PanelContent::Scatter { series } => draw_scatter(panel, area, series),
        PanelContent::Heatmap { values,
                                row_labels,
                                col_labels,
                                annotate, } => draw_heatmap(panel, area, values, row_labels, col_labels, *annotate),
    }
}

// Sin ejes (equivalente a axis("off")).
fn draw_image(panel: &Panel, area: &Area<'_>, width: usize, height: usize, pixels: &[f32]) -> Result<(), String> {
    if width == 0 || height == 0 {
        return Ok(());
    }
    let (w, h) = (width as i32, height as i32);
    let mut builder = ChartBuilder::on(area);
    builder.margin(4);
    if let Some(t) = &panel.title {
        builder.caption(t, ("sans-serif", 14));
    }
    let mut chart = builder.build_cartesian_2d(0..w, 0..h).map_err(err)?;
    let lo = pixels.iter().cloned().fold(f32::INFINITY, f32::min);
    let hi = pixels.iter().cloned().fold(f32::NEG_INFINITY, f32::max);
    let span = if hi > lo { hi - lo } else { 1.0 };
    chart.draw_series(pixels.iter().enumerate().take(width * height).map(|(i, v)| {
                                                                        let (r, c) = ((i / width) as i32, (i % width) as i32);
                                                                        let g = (((v - lo) / span).clamp(0.0, 1.0) * 255.0) as u8;
                                                                        Rectangle::new([(c, h - r), (c + 1, h - r - 1)], RGBColor(g, g, g).filled())
                                                                    }))
         .map_err(err)?;
    Ok(())
}

fn draw_scatter(panel: &Panel, area: &Area<'_>, series: &[ScatterSeries]) -> Result<(), String> {
    let ((x0, x1), (y0, y1)) = bounds(series);
    let mut builder = ChartBuilder::on(area);
    builder.margin(12).x_label_area_size(40).y_label_area_size(50);
    if let Some(t) = &panel.title {
        builder.caption(t, ("sans-serif", 20));
    }
    let mut chart = builder.build_cartesian_2d(x0..x1, y0..y1).map_err(err)?;
    {
        let mut mesh = chart.configure_mesh();
        if let Some(x) = &panel.x_label {
            mesh.x_desc(x.as_str());
        }
        if let Some(y) = &panel.y_label {
            mesh.y_desc(y.as_str());
        }
        mesh.draw().map_err(err)?;
    }
    for s in series {
        let color = RGBColor(s.color.0, s.color.1, s.color.2);
        chart.draw_series(s.points.iter().map(|p| Circle::new(*p, 2, color.mix(0.5).filled())))
             .map_err(err)?
             .label(s.label.as_str())
             .legend(move |(x, y)| Circle::new((x, y), 4, color.filled()));
    }
    if !series.is_empty() {
        chart.configure_series_labels()
             .position(SeriesLabelPosition::UpperRight)
             .background_style(&WHITE.mix(0.8))
             .border_style(&BLACK)
             .draw()
             .map_err(err)?;
    }
    Ok(())
}

// Celda (fila 0 arriba); los centros caen en enteros para que los ticks coincidan.
fn draw_heatmap(panel: &Panel,
                area: &Area<'_>,
                values: &[Vec<f64>],
                row_labels: &[String],
                col_labels: &[String],
                annotate: bool)
                -> Result<(), String> {
    let nr = values.len();
    let nc = values.iter().map(|r| r.len()).max().unwrap_or(0);
    if nr == 0 || nc == 0 {
        return Ok(());
    }
    let vmax = values.iter().flatten().cloned().fold(0.0_f64, f64::max);
    let mut builder = ChartBuilder::on(area);
    builder.margin(12).x_label_area_size(45).y_label_area_size(45);
    if let Some(t) = &panel.title {
        builder.caption(t, ("sans-serif", 20));
    }
    let mut chart = builder.build_cartesian_2d(-0.5..(nc as f64 - 0.5), -0.5..(nr as f64 - 0.5))
                           .map_err(err)?;
    let col_fmt = |v: &f64| label_at(*v, col_labels, |i| i);
    let row_fmt = |v: &f64| label_at(*v, row_labels, |i| nr.saturating_sub(1 + i));
    {
        let mut mesh = chart.configure_mesh();
        mesh.disable_mesh()
            .x_labels(nc + 1)
            .y_labels(nr + 1)
            .x_label_formatter(&col_fmt)
            .y_label_formatter(&row_fmt);
        if let Some(x) = &panel.x_label {
            mesh.x_desc(x.as_str());
        }
        if let Some(y) = &panel.y_label {
            mesh.y_desc(y.as_str());
        }
        mesh.draw().map_err(err)?;
    }
    for (r, row) in values.iter().enumerate() {
        let y = (nr - 1 - r) as f64;
        for (c, v) in row.iter().enumerate() {
            let x = c as f64;
            let t = if vmax > 0.0 { (v / vmax).clamp(0.0, 1.0) } else { 0.0 };
            chart.draw_series(std::iter::once(Rectangle::new([(x - 0.5, y - 0.5), (x + 0.5, y + 0.5)],
                                                             blues(t).filled())))
                 .map_err(err)?;
            if annotate {
                let ink: &'static RGBColor = if t > 0.5 { &WHITE } else { &BLACK };
                let style = ("sans-serif", 12).into_font()
                                              .color(ink)
                                              .pos(Pos::new(HPos::Center, VPos::Center));
                chart.draw_series(std::iter::once(Text::new(format_count(*v), (x, y), style)))
                     .map_err(err)?;
            }
        }
    }
    Ok(())
}

fn label_at(v: f64, labels: &[String], index: impl Fn(usize) -> usize) -> String {
    let i = v.round();
    if (v - i).abs() > 1e-6 || i < 0.0 {
        return String::new();
    }
    labels.get(index(i as usize)).cloned().unwrap_or_default()
}

fn format_count(v: f64) -> String {
    if v.fract() == 0.0 {
        format!("{}", v as i64)
    } else {
        format!("{v:.2}")
    }
}

// Interpolación lineal blanco -> azul oscuro (similar a "Blues").
fn blues(t: f64) -> RGBColor {
    let lerp = |a: u8, b: u8| (a as f64 + (b as f64 - a as f64) * t).round() as u8;
    RGBColor(lerp(247, 8), lerp(251, 48), lerp(255, 107))
}

fn bounds(series: &[ScatterSeries]) -> ((f64, f64), (f64, f64)) {
    let pts = series.iter().flat_map(|s| s.points.iter());
    let (mut x0, mut x1, mut y0, mut y1) = (f64::INFINITY, f64::NEG_INFINITY, f64::INFINITY, f64::NEG_INFINITY);
    for (x, y) in pts {
        x0 = x0.min(*x);
        x1 = x1.max(*x);
        y0 = y0.min(*y);
        y1 = y1.max(*y);
    }
    let pad = |lo: f64, hi: f64| {
        if !lo.is_finite() || !hi.is_finite() {
            (0.0, 1.0)
        } else if hi - lo < 1e-9 {
            (lo - 0.5, hi + 0.5)
        } else {
            let m = (hi - lo) * 0.05;
            (lo - m, hi + m)
        }
    };
    (pad(x0, x1), pad(y0, y1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plot::PlotContext;
    use crate::session::Palette;

    #[test]
    fn renders_titles_and_legend_entries() {
        let mut ctx = PlotContext::default();
        let mut fig = ctx.subplots(1, 1, (640, 480));
        let palette = Palette;
        if let Some(p) = fig.panel_mut(0, 0) {
            p.set_xyt("Embedding 1", "Embedding 2", "Projection");
            p.scatter(vec![ScatterSeries { label: "3".into(),
                                           color: palette.color(3),
                                           points: vec![(0.0, 1.0), (2.0, -1.0)] }]);
        }
        let svg = render_svg(&fig).unwrap();
        assert!(svg.starts_with("<svg"));
        assert!(svg.contains("Projection"));
        assert!(svg.contains("Embedding 1"));
    }

    #[test]
    fn heatmap_labels_follow_cell_centers() {
        let labels: Vec<String> = (0..3).map(|i| i.to_string()).collect();
        assert_eq!(label_at(2.0, &labels, |i| i), "2");
        assert_eq!(label_at(0.5, &labels, |i| i), "");
        assert_eq!(label_at(0.0, &labels, |i| 2 - i), "2");
        assert_eq!(format_count(12.0), "12");
    }
}
