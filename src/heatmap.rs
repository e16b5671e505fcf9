use ndarray::Array2;
use plotters::coord::Shift;
use plotters::prelude::*;
use plotters::style::colors::colormaps::{ColorMap, ViridisRGB};
use std::path::Path;

use crate::plot::RasterImage;

/// Pick a gradient color for a normalized value, interpolating linearly
/// between the supplied stops. An empty gradient falls back to Viridis.
fn gradient_color(gradient: &[RGBColor], t: f64) -> RGBColor {
    let t = t.clamp(0.0, 1.0);
    match gradient.len() {
        0 => ViridisRGB.get_color(t),
        1 => gradient[0],
        len => {
            let pos = t * (len - 1) as f64;
            let lo = pos.floor() as usize;
            let hi = (lo + 1).min(len - 1);
            let frac = pos - lo as f64;
            let mix = |a: u8, b: u8| (a as f64 + (b as f64 - a as f64) * frac).round() as u8;
            RGBColor(
                mix(gradient[lo].0, gradient[hi].0),
                mix(gradient[lo].1, gradient[hi].1),
                mix(gradient[lo].2, gradient[hi].2),
            )
        }
    }
}

fn draw_heatmap(
    root: &DrawingArea<BitMapBackend<'_>, Shift>,
    values: &Array2<f64>,
    gradient: &[RGBColor],
) -> Result<(), Box<dyn std::error::Error>> {
    root.fill(&WHITE)?;
    let (rows, cols) = values.dim();
    if rows == 0 || cols == 0 {
        return Ok(());
    }

    let mut chart = ChartBuilder::on(root)
        .margin(5)
        .build_cartesian_2d(0.0..cols as f64, 0.0..rows as f64)?;

    let finite: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    let min = finite.iter().cloned().fold(f64::INFINITY, f64::min);
    let max = finite.iter().cloned().fold(f64::NEG_INFINITY, f64::max);

    let hatch = RGBColor(120, 120, 120);
    for ((row, col), &value) in values.indexed_iter() {
        // Row 0 renders at the top, table style.
        let x0 = col as f64;
        let y0 = (rows - 1 - row) as f64;
        if value.is_finite() {
            let t = if max > min { (value - min) / (max - min) } else { 0.0 };
            let color = gradient_color(gradient, t);
            chart.draw_series(std::iter::once(Rectangle::new(
                [(x0, y0), (x0 + 1.0, y0 + 1.0)],
                color.filled(),
            )))?;
        } else {
            // Non-numeric cell: white with a diagonal hatch.
            chart.draw_series(std::iter::once(Rectangle::new(
                [(x0, y0), (x0 + 1.0, y0 + 1.0)],
                WHITE.filled(),
            )))?;
            for (from, to) in [
                ((x0, y0 + 0.5), (x0 + 0.5, y0 + 1.0)),
                ((x0, y0), (x0 + 1.0, y0 + 1.0)),
                ((x0 + 0.5, y0), (x0 + 1.0, y0 + 0.5)),
            ] {
                chart.draw_series(std::iter::once(PathElement::new(
                    vec![from, to],
                    hatch.stroke_width(1),
                )))?;
            }
        }
    }

    // Separator lines only make sense once there is something to separate.
    if rows > 1 || cols > 1 {
        for col in 0..=cols {
            chart.draw_series(std::iter::once(PathElement::new(
                vec![(col as f64, 0.0), (col as f64, rows as f64)],
                BLACK.stroke_width(1),
            )))?;
        }
        for row in 0..=rows {
            chart.draw_series(std::iter::once(PathElement::new(
                vec![(0.0, row as f64), (cols as f64, row as f64)],
                BLACK.stroke_width(1),
            )))?;
        }
    }
    Ok(())
}

/// Render a grid of doubles as a colored-cell heatmap into an RGB buffer.
pub fn render_heatmap(
    values: &Array2<f64>,
    gradient: &[RGBColor],
    width: u32,
    height: u32,
) -> Result<RasterImage, Box<dyn std::error::Error>> {
    let mut pixels = vec![0u8; width as usize * height as usize * 3];
    {
        let root = BitMapBackend::with_buffer(&mut pixels, (width, height)).into_drawing_area();
        draw_heatmap(&root, values, gradient)?;
        root.present()?;
    }
    Ok(RasterImage {
        width,
        height,
        pixels,
    })
}

/// Render a heatmap straight to a PNG path.
pub fn render_heatmap_to_path<P: AsRef<Path>>(
    path: P,
    values: &Array2<f64>,
    gradient: &[RGBColor],
    width: u32,
    height: u32,
) -> Result<(), Box<dyn std::error::Error>> {
    let root = BitMapBackend::new(path.as_ref(), (width, height)).into_drawing_area();
    draw_heatmap(&root, values, gradient)?;
    root.present()?;
    Ok(())
}
