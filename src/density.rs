/// Binned 2D event population, produced by the external density estimator.
/// Both grids are `nx * ny`, row-major with `y * nx + x` indexing: per-cell
/// event counts and the smoothed density used for level ordering and contour
/// tracing.
#[derive(Debug, Clone)]
pub struct DensityGrid {
    pub nx: usize,
    pub ny: usize,
    counts: Vec<f64>,
    density: Vec<f64>,
}

impl DensityGrid {
    /// `None` unless both grids are exactly `nx * ny`.
    pub fn new(nx: usize, ny: usize, counts: Vec<f64>, density: Vec<f64>) -> Option<DensityGrid> {
        if counts.len() != nx * ny || density.len() != nx * ny {
            return None;
        }
        Some(DensityGrid {
            nx,
            ny,
            counts,
            density,
        })
    }

    #[inline]
    fn idx(&self, x: usize, y: usize) -> usize {
        y * self.nx + x
    }

    pub fn count_at(&self, x: usize, y: usize) -> f64 {
        self.counts[self.idx(x, y)]
    }

    pub fn density_at(&self, x: usize, y: usize) -> f64 {
        self.density[self.idx(x, y)]
    }

    pub fn density_values(&self) -> &[f64] {
        &self.density
    }

    pub fn total_count(&self) -> f64 {
        self.counts.iter().sum()
    }

    /// Cells holding at least one event.
    pub fn occupied_cells(&self) -> Vec<(usize, usize)> {
        let mut cells = Vec::new();
        for y in 0..self.ny {
            for x in 0..self.nx {
                if self.count_at(x, y) > 0.0 {
                    cells.push((x, y));
                }
            }
        }
        cells
    }
}

/// One percentile band of the density partition: the iso threshold (density
/// at the crossing cell) and the cells assigned to the band.
#[derive(Debug, Clone)]
pub struct ContourLevel {
    pub threshold: f64,
    pub cells: Vec<(usize, usize)>,
}

/// Partition the occupied cells into percentile levels.
///
/// Cells are walked in descending density order while a counter seeded at
/// `start_percent * (events - 1) / 100` is decremented by each cell's count.
/// Every zero crossing flushes the unflushed prefix into a new level whose
/// threshold is the crossing cell's density, then re-seeds the counter in
/// `step_percent` increments. A trailing partial band catches the remaining
/// cells, so the union of all levels is exactly the occupied cell set and no
/// cell lands in two levels.
pub fn partition_levels(
    grid: &DensityGrid,
    event_count: usize,
    start_percent: f64,
    step_percent: f64,
) -> Vec<ContourLevel> {
    let mut cells = grid.occupied_cells();
    if cells.is_empty() || event_count == 0 {
        return Vec::new();
    }
    cells.sort_by(|&(ax, ay), &(bx, by)| {
        grid.density_at(bx, by)
            .partial_cmp(&grid.density_at(ax, ay))
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let per_percent = event_count.saturating_sub(1) as f64 / 100.0;
    let step = step_percent * per_percent;
    let mut counter = start_percent * per_percent;

    let mut levels = Vec::new();
    let mut flushed = 0usize;
    for i in 0..cells.len() {
        let (x, y) = cells[i];
        counter -= grid.count_at(x, y);
        if counter <= 0.0 {
            levels.push(ContourLevel {
                threshold: grid.density_at(x, y),
                cells: cells[flushed..=i].to_vec(),
            });
            flushed = i + 1;
            if step > 0.0 {
                while counter <= 0.0 {
                    counter += step;
                }
            } else {
                counter = f64::INFINITY;
            }
        }
    }
    if flushed < cells.len() {
        let (x, y) = *cells.last().unwrap();
        levels.push(ContourLevel {
            threshold: grid.density_at(x, y),
            cells: cells[flushed..].to_vec(),
        });
    }
    levels
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn ramp_grid(nx: usize, ny: usize) -> DensityGrid {
        // Counts 1..=nx*ny, density equal to count.
        let counts: Vec<f64> = (1..=nx * ny).map(|v| v as f64).collect();
        DensityGrid::new(nx, ny, counts.clone(), counts).unwrap()
    }

    #[test]
    fn grid_dimensions_are_validated() {
        assert!(DensityGrid::new(3, 2, vec![0.0; 6], vec![0.0; 6]).is_some());
        assert!(DensityGrid::new(3, 2, vec![0.0; 5], vec![0.0; 6]).is_none());
    }

    #[test]
    fn levels_partition_every_occupied_cell() {
        let grid = ramp_grid(8, 8);
        let events = grid.total_count() as usize;
        for (start, step) in [(20.0, 10.0), (5.0, 5.0), (50.0, 25.0), (90.0, 2.5)] {
            let levels = partition_levels(&grid, events, start, step);
            assert!(!levels.is_empty());

            let mut seen = HashSet::new();
            for level in &levels {
                for cell in &level.cells {
                    assert!(seen.insert(*cell), "cell assigned to two levels");
                }
            }
            let occupied: HashSet<(usize, usize)> =
                grid.occupied_cells().into_iter().collect();
            assert_eq!(seen, occupied);
        }
    }

    #[test]
    fn levels_are_ordered_by_descending_density() {
        let grid = ramp_grid(6, 6);
        let events = grid.total_count() as usize;
        let levels = partition_levels(&grid, events, 25.0, 25.0);
        for pair in levels.windows(2) {
            assert!(pair[0].threshold >= pair[1].threshold);
        }
        // First level holds the densest cells.
        let top = levels[0].cells[0];
        assert_eq!(grid.density_at(top.0, top.1), 36.0);
    }

    #[test]
    fn empty_population_yields_no_levels() {
        let grid = DensityGrid::new(4, 4, vec![0.0; 16], vec![0.0; 16]).unwrap();
        assert!(partition_levels(&grid, 0, 20.0, 10.0).is_empty());
        assert!(partition_levels(&grid, 100, 20.0, 10.0).is_empty());
    }

    #[test]
    fn zero_step_collects_remainder_in_trailing_band() {
        let grid = ramp_grid(4, 4);
        let events = grid.total_count() as usize;
        let levels = partition_levels(&grid, events, 30.0, 0.0);
        assert_eq!(levels.len(), 2);
        let assigned: usize = levels.iter().map(|l| l.cells.len()).sum();
        assert_eq!(assigned, 16);
    }
}
