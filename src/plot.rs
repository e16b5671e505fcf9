use plotters::coord::cartesian::Cartesian2d;
use plotters::coord::types::RangedCoordf64;
use plotters::coord::Shift;
use plotters::prelude::*;
use plotters::style::colors::colormaps::{ColorMap, ViridisRGB};
use std::path::Path;

use crate::contour::trace_iso;
use crate::density::{partition_levels, DensityGrid};
use crate::scale::AxisScale;

/// How the event population is drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlotStyle {
    Dot,
    DensityDot,
    Shadow,
    Contour,
    ShadedContour,
    Density,
}

/// Pixel geometry of the rendered canvas.
#[derive(Debug, Clone)]
pub struct CanvasSettings {
    pub width: u32,
    pub height: u32,
    pub background: RGBColor,
    pub margin: u32,
    pub x_label_area: u32,
    pub y_label_area: u32,
}

impl Default for CanvasSettings {
    fn default() -> CanvasSettings {
        CanvasSettings {
            width: 800,
            height: 600,
            background: WHITE,
            margin: 20,
            x_label_area: 45,
            y_label_area: 70,
        }
    }
}

/// One render call's worth of selection and styling. Transient; build one
/// per plot and discard it with the image.
#[derive(Debug, Clone)]
pub struct PlotRequest {
    pub x_channel: usize,
    /// `None` marks a request that is not 2D-capable; rendering it yields
    /// no image.
    pub y_channel: Option<usize>,
    pub x_label: String,
    pub y_label: String,
    pub x_scale: AxisScale,
    pub y_scale: AxisScale,
    pub style: PlotStyle,
    pub canvas: CanvasSettings,
    /// Ordered level colors, outermost band first. Empty means the built-in
    /// Viridis ramp.
    pub level_colors: Vec<RGBColor>,
    pub dot_size: u32,
    /// True when the foreground grid is a selected subset rendered over an
    /// all-events background population.
    pub foreground_is_subset: bool,
    pub contour_start_percent: f64,
    pub contour_percent: f64,
}

impl PlotRequest {
    pub fn new(x_scale: AxisScale, y_scale: AxisScale, style: PlotStyle) -> PlotRequest {
        PlotRequest {
            x_channel: 0,
            y_channel: Some(1),
            x_label: String::new(),
            y_label: String::new(),
            x_scale,
            y_scale,
            style,
            canvas: CanvasSettings::default(),
            level_colors: Vec::new(),
            dot_size: 2,
            foreground_is_subset: false,
            contour_start_percent: 10.0,
            contour_percent: 10.0,
        }
    }
}

/// Packed RGB render product.
pub struct RasterImage {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

fn renderable(foreground: &DensityGrid, request: &PlotRequest) -> bool {
    request.y_channel.is_some()
        && request.canvas.width > 0
        && request.canvas.height > 0
        && foreground.nx > 0
        && foreground.ny > 0
        && foreground.total_count() > 0.0
}

/// Render into an in-memory RGB buffer. A request that is not 2D-capable or
/// an empty population yields `Ok(None)`: the plot is simply omitted.
pub fn render_plot(
    foreground: &DensityGrid,
    background: Option<&DensityGrid>,
    request: &PlotRequest,
) -> Result<Option<RasterImage>, Box<dyn std::error::Error>> {
    if !renderable(foreground, request) {
        return Ok(None);
    }
    let (width, height) = (request.canvas.width, request.canvas.height);
    let mut pixels = vec![0u8; width as usize * height as usize * 3];
    {
        let root = BitMapBackend::with_buffer(&mut pixels, (width, height)).into_drawing_area();
        draw_plot(&root, foreground, background, request)?;
        root.present()?;
    }
    Ok(Some(RasterImage {
        width,
        height,
        pixels,
    }))
}

/// Render straight to a PNG path. Returns `Ok(false)` when the request was
/// a no-op and no file was written.
pub fn render_plot_to_path<P: AsRef<Path>>(
    path: P,
    foreground: &DensityGrid,
    background: Option<&DensityGrid>,
    request: &PlotRequest,
) -> Result<bool, Box<dyn std::error::Error>> {
    if !renderable(foreground, request) {
        return Ok(false);
    }
    let (width, height) = (request.canvas.width, request.canvas.height);
    let root = BitMapBackend::new(path.as_ref(), (width, height)).into_drawing_area();
    draw_plot(&root, foreground, background, request)?;
    root.present()?;
    Ok(true)
}

struct CellGeometry {
    x0: f64,
    y0: f64,
    dx: f64,
    dy: f64,
}

impl CellGeometry {
    fn new(grid: &DensityGrid, request: &PlotRequest) -> CellGeometry {
        let sx = &request.x_scale;
        let sy = &request.y_scale;
        let x0 = sx.apply(sx.domain_min);
        let x1 = sx.apply(sx.domain_max);
        let y0 = sy.apply(sy.domain_min);
        let y1 = sy.apply(sy.domain_max);
        CellGeometry {
            x0,
            y0,
            dx: (x1 - x0) / grid.nx as f64,
            dy: (y1 - y0) / grid.ny as f64,
        }
    }

    fn cell_rect(&self, x: usize, y: usize) -> [(f64, f64); 2] {
        let left = self.x0 + x as f64 * self.dx;
        let bottom = self.y0 + y as f64 * self.dy;
        [(left, bottom), (left + self.dx, bottom + self.dy)]
    }

    fn cell_center(&self, x: usize, y: usize) -> (f64, f64) {
        let rect = self.cell_rect(x, y);
        ((rect[0].0 + rect[1].0) / 2.0, (rect[0].1 + rect[1].1) / 2.0)
    }

    /// Contour vertices live on grid-point coordinates; map them through
    /// the cell centers.
    fn grid_point(&self, gx: f64, gy: f64) -> (f64, f64) {
        (
            self.x0 + (gx + 0.5) * self.dx,
            self.y0 + (gy + 0.5) * self.dy,
        )
    }
}

fn level_color(request: &PlotRequest, index: usize, total: usize) -> RGBColor {
    if !request.level_colors.is_empty() {
        let clamped = index.min(request.level_colors.len() - 1);
        return request.level_colors[clamped];
    }
    let t = if total > 1 {
        index as f64 / (total - 1) as f64
    } else {
        0.0
    };
    ViridisRGB.get_color(1.0 - t)
}

fn shadow_color(index: usize, total: usize) -> RGBColor {
    let t = if total > 1 {
        index as f64 / (total - 1) as f64
    } else {
        0.0
    };
    let v = (60.0 + t * 150.0) as u8;
    RGBColor(v, v, v)
}

type Chart2D<'a, 'b> = ChartContext<'a, BitMapBackend<'b>, Cartesian2d<RangedCoordf64, RangedCoordf64>>;

fn draw_level_cells(
    chart: &mut Chart2D<'_, '_>,
    geometry: &CellGeometry,
    cells: &[(usize, usize)],
    color: RGBColor,
) -> Result<(), Box<dyn std::error::Error>> {
    chart.draw_series(
        cells
            .iter()
            .map(|&(x, y)| Rectangle::new(geometry.cell_rect(x, y), color.filled())),
    )?;
    Ok(())
}

fn draw_level_dots(
    chart: &mut Chart2D<'_, '_>,
    geometry: &CellGeometry,
    cells: &[(usize, usize)],
    color: RGBColor,
    dot_size: u32,
) -> Result<(), Box<dyn std::error::Error>> {
    chart.draw_series(
        cells
            .iter()
            .map(|&(x, y)| Circle::new(geometry.cell_center(x, y), dot_size as i32, color.filled())),
    )?;
    Ok(())
}

fn draw_level_contour(
    chart: &mut Chart2D<'_, '_>,
    geometry: &CellGeometry,
    grid: &DensityGrid,
    threshold: f64,
    color: RGBColor,
) -> Result<(), Box<dyn std::error::Error>> {
    let segments = trace_iso(grid.density_values(), grid.nx, grid.ny, threshold);
    for (from, to) in segments {
        let line = vec![
            geometry.grid_point(from.0, from.1),
            geometry.grid_point(to.0, to.1),
        ];
        chart.draw_series(std::iter::once(PathElement::new(line, color.stroke_width(1))))?;
    }
    Ok(())
}

/// Underlay for the "all events" population beneath a selected subset:
/// light gray cells plus contour lines, never outlier markers.
fn draw_background_population(
    chart: &mut Chart2D<'_, '_>,
    geometry: &CellGeometry,
    background: &DensityGrid,
    request: &PlotRequest,
) -> Result<(), Box<dyn std::error::Error>> {
    let fill = RGBColor(211, 211, 211);
    let stroke = RGBColor(160, 160, 160);
    let cells = background.occupied_cells();
    draw_level_cells(chart, geometry, &cells, fill)?;

    let levels = partition_levels(
        background,
        background.total_count() as usize,
        request.contour_start_percent,
        request.contour_percent,
    );
    for level in &levels {
        draw_level_contour(chart, geometry, background, level.threshold, stroke)?;
    }
    Ok(())
}

fn draw_plot(
    root: &DrawingArea<BitMapBackend<'_>, Shift>,
    foreground: &DensityGrid,
    background: Option<&DensityGrid>,
    request: &PlotRequest,
) -> Result<(), Box<dyn std::error::Error>> {
    root.fill(&request.canvas.background)?;

    let sx = &request.x_scale;
    let sy = &request.y_scale;
    let mut chart = ChartBuilder::on(root)
        .margin(request.canvas.margin)
        .x_label_area_size(request.canvas.x_label_area)
        .y_label_area_size(request.canvas.y_label_area)
        .build_cartesian_2d(
            sx.apply(sx.domain_min)..sx.apply(sx.domain_max),
            sy.apply(sy.domain_min)..sy.apply(sy.domain_max),
        )?;

    chart
        .configure_mesh()
        .disable_mesh()
        .x_desc(request.x_label.as_str())
        .y_desc(request.y_label.as_str())
        .axis_style(BLACK.stroke_width(1))
        .label_style(("sans-serif", 15))
        .draw()?;

    let geometry = CellGeometry::new(foreground, request);

    if let Some(background) = background {
        if request.foreground_is_subset {
            let bg_geometry = CellGeometry::new(background, request);
            draw_background_population(&mut chart, &bg_geometry, background, request)?;
        }
    }

    let levels = partition_levels(
        foreground,
        foreground.total_count() as usize,
        request.contour_start_percent,
        request.contour_percent,
    );
    if levels.is_empty() {
        return Ok(());
    }
    // Density below the first crossing renders as individual outlier dots
    // instead of filled cells.
    let outlier_threshold = levels[0].threshold;

    match request.style {
        PlotStyle::Dot | PlotStyle::DensityDot | PlotStyle::Shadow | PlotStyle::Density => {
            for (index, level) in levels.iter().enumerate() {
                let color = match request.style {
                    PlotStyle::Shadow => shadow_color(index, levels.len()),
                    _ => level_color(request, index, levels.len()),
                };
                let (solid, outliers): (Vec<_>, Vec<_>) = level
                    .cells
                    .iter()
                    .copied()
                    .partition(|&(x, y)| foreground.density_at(x, y) >= outlier_threshold);
                match request.style {
                    PlotStyle::Dot | PlotStyle::DensityDot => {
                        draw_level_dots(&mut chart, &geometry, &solid, color, request.dot_size)?
                    }
                    _ => draw_level_cells(&mut chart, &geometry, &solid, color)?,
                }
                draw_level_dots(&mut chart, &geometry, &outliers, color, request.dot_size)?;
            }
        }
        PlotStyle::Contour | PlotStyle::ShadedContour => {
            for (index, level) in levels.iter().enumerate() {
                let color = level_color(request, index, levels.len());
                if request.style == PlotStyle::ShadedContour {
                    draw_level_cells(&mut chart, &geometry, &level.cells, color)?;
                }
                let stroke = if request.style == PlotStyle::ShadedContour {
                    BLACK
                } else {
                    color
                };
                draw_level_contour(&mut chart, &geometry, foreground, level.threshold, stroke)?;
            }
        }
    }
    Ok(())
}
