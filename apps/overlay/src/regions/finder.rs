//! Empty-region finder: grid-quantized occupancy scan over a grayscale raster.
//!
//! The raster is divided into square cells. A cell is occupied when any pixel in it is
//! darker than the near-white threshold. Full-width bands of unoccupied grid rows become
//! candidate text regions, near-adjacent bands are merged, and the result is ranked by
//! area. The scan is pure and deterministic for identical pixel input.

use serde::{Deserialize, Serialize};

// ────────────────────────────────────────────────────────────────────────────
// Types
// ────────────────────────────────────────────────────────────────────────────

/// A decoded single-channel raster, row-major, one byte per pixel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GrayRaster {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

impl GrayRaster {
    /// Uniform raster filled with `value`.
    #[cfg(test)]
    pub fn filled(width: u32, height: u32, value: u8) -> Self {
        Self {
            width,
            height,
            pixels: vec![value; width as usize * height as usize],
        }
    }

    #[inline]
    fn pixel(&self, x: u32, y: u32) -> u8 {
        self.pixels[y as usize * self.width as usize + x as usize]
    }

    /// False when the pixel buffer does not match the declared dimensions.
    pub fn is_consistent(&self) -> bool {
        self.pixels.len() == self.width as usize * self.height as usize
    }
}

/// Axis-aligned rectangle in image space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Region {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Region {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self { x, y, width, height }
    }

    #[inline]
    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }
}

/// Tuning knobs for the scan. Defaults match the production constants.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RegionFinderOptions {
    pub min_width: u32,
    pub min_height: u32,
    /// Edge length of one grid cell in pixels.
    pub cell_size: u32,
    /// Pixels with intensity strictly below this mark their cell as occupied.
    pub occupied_below: u8,
    /// Bands separated by fewer than `merge_gap_cells * cell_size` pixels are merged.
    pub merge_gap_cells: u32,
}

impl Default for RegionFinderOptions {
    fn default() -> Self {
        Self {
            min_width: 100,
            min_height: 30,
            cell_size: 5,
            occupied_below: 200,
            merge_gap_cells: 4,
        }
    }
}

/// Regions smaller than this are never used for text placement.
pub const CANDIDATE_MIN_WIDTH: u32 = 100;
pub const CANDIDATE_MIN_HEIGHT: u32 = 30;

// ────────────────────────────────────────────────────────────────────────────
// Scan
// ────────────────────────────────────────────────────────────────────────────

/// Finds full-width empty bands, sorted by area descending.
///
/// Returns an empty list when nothing qualifies; callers treat that as
/// "no insertion possible", not as an error.
pub fn find_empty_regions(raster: &GrayRaster, options: &RegionFinderOptions) -> Vec<Region> {
    if raster.width == 0
        || raster.height == 0
        || raster.width < options.min_width
        || !raster.is_consistent()
    {
        return Vec::new();
    }
    let cell = options.cell_size.max(1);

    let empty_rows = empty_grid_rows(raster, cell, options.occupied_below);
    let bands = qualifying_bands(&empty_rows, cell, raster.height, options.min_height);
    let merged = merge_close_bands(bands, options.merge_gap_cells.saturating_mul(cell));

    let mut regions: Vec<Region> = merged
        .into_iter()
        .map(|(y, height)| Region::new(0, y, raster.width, height))
        .collect();
    // Stable: equal areas keep top-to-bottom order.
    regions.sort_by(|a, b| b.area().cmp(&a.area()));
    regions
}

/// One flag per grid row: true when every cell in that row is unoccupied.
fn empty_grid_rows(raster: &GrayRaster, cell: u32, occupied_below: u8) -> Vec<bool> {
    let rows = raster.height.div_ceil(cell);
    let cols = raster.width.div_ceil(cell);

    (0..rows)
        .map(|row| (0..cols).all(|col| !cell_occupied(raster, col, row, cell, occupied_below)))
        .collect()
}

fn cell_occupied(raster: &GrayRaster, col: u32, row: u32, cell: u32, occupied_below: u8) -> bool {
    let x0 = col * cell;
    let y0 = row * cell;
    let x1 = (x0 + cell).min(raster.width);
    let y1 = (y0 + cell).min(raster.height);
    (y0..y1).any(|y| (x0..x1).any(|x| raster.pixel(x, y) < occupied_below))
}

/// Maximal runs of empty rows as `(y, height)` in pixels, keeping runs ≥ `min_height`.
fn qualifying_bands(empty_rows: &[bool], cell: u32, image_height: u32, min_height: u32) -> Vec<(u32, u32)> {
    let mut bands = Vec::new();
    let mut run_start: Option<u32> = None;

    for (row, &empty) in empty_rows.iter().enumerate() {
        let row = row as u32;
        match (empty, run_start) {
            (true, None) => run_start = Some(row),
            (false, Some(start)) => {
                push_band(&mut bands, start, row, cell, image_height, min_height);
                run_start = None;
            }
            _ => {}
        }
    }
    if let Some(start) = run_start {
        push_band(&mut bands, start, empty_rows.len() as u32, cell, image_height, min_height);
    }
    bands
}

fn push_band(
    bands: &mut Vec<(u32, u32)>,
    start_row: u32,
    end_row: u32,
    cell: u32,
    image_height: u32,
    min_height: u32,
) {
    let y = start_row * cell;
    let bottom = (end_row * cell).min(image_height);
    let height = bottom - y;
    if height >= min_height && height > 0 {
        bands.push((y, height));
    }
}

/// Folds each band into its predecessor when the pixel gap between them is below `max_gap`.
fn merge_close_bands(bands: Vec<(u32, u32)>, max_gap: u32) -> Vec<(u32, u32)> {
    let mut merged: Vec<(u32, u32)> = Vec::with_capacity(bands.len());
    for (y, height) in bands {
        if let Some(last) = merged.last_mut() {
            let gap = y - (last.0 + last.1);
            if gap < max_gap {
                last.1 = y + height - last.0;
                continue;
            }
        }
        merged.push((y, height));
    }
    merged
}

/// Keeps regions large enough to hold text, preserving the ranking.
pub fn candidate_regions(regions: &[Region]) -> Vec<Region> {
    regions
        .iter()
        .copied()
        .filter(|r| r.width >= CANDIDATE_MIN_WIDTH && r.height >= CANDIDATE_MIN_HEIGHT)
        .collect()
}

/// The single region text is placed into: the largest candidate.
pub fn best_region(regions: &[Region]) -> Option<Region> {
    candidate_regions(regions).into_iter().next()
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    /// White raster with dark full-width bands over the given pixel rows.
    fn banded(width: u32, height: u32, dark_rows: &[std::ops::Range<u32>]) -> GrayRaster {
        let mut raster = GrayRaster::filled(width, height, 255);
        for range in dark_rows {
            for y in range.clone() {
                for x in 0..width {
                    raster.pixels[(y * width + x) as usize] = 0;
                }
            }
        }
        raster
    }

    fn defaults() -> RegionFinderOptions {
        RegionFinderOptions::default()
    }

    // ── coverage ────────────────────────────────────────────────────────────

    #[test]
    fn test_all_white_yields_single_full_region() {
        let raster = GrayRaster::filled(1200, 800, 255);
        let regions = find_empty_regions(&raster, &defaults());
        assert_eq!(regions, vec![Region::new(0, 0, 1200, 800)]);
    }

    #[test]
    fn test_all_white_non_multiple_of_cell_clamps_height() {
        let raster = GrayRaster::filled(203, 101, 250);
        let regions = find_empty_regions(&raster, &defaults());
        assert_eq!(regions, vec![Region::new(0, 0, 203, 101)]);
    }

    #[test]
    fn test_near_white_threshold() {
        // 200 is not occupied, 199 is.
        let raster = GrayRaster::filled(300, 100, 200);
        assert_eq!(find_empty_regions(&raster, &defaults()).len(), 1);
        let raster = GrayRaster::filled(300, 100, 199);
        assert!(find_empty_regions(&raster, &defaults()).is_empty());
    }

    #[test]
    fn test_all_dark_yields_no_regions() {
        let raster = GrayRaster::filled(400, 400, 10);
        assert!(find_empty_regions(&raster, &defaults()).is_empty());
    }

    #[test]
    fn test_degenerate_inputs_yield_no_regions() {
        assert!(find_empty_regions(&GrayRaster::filled(0, 0, 255), &defaults()).is_empty());
        assert!(find_empty_regions(&GrayRaster::filled(50, 400, 255), &defaults()).is_empty());
        let bad = GrayRaster { width: 200, height: 200, pixels: vec![255; 10] };
        assert!(find_empty_regions(&bad, &defaults()).is_empty());
    }

    // ── split / merge ───────────────────────────────────────────────────────

    #[test]
    fn test_wide_dark_band_splits_into_two_regions() {
        // White 0..300, dark 300..340 (40px ≥ 4 cells), white 340..500.
        let raster = banded(600, 500, &[300..340]);
        let regions = find_empty_regions(&raster, &defaults());
        assert_eq!(regions.len(), 2);
        assert_eq!(regions[0], Region::new(0, 0, 600, 300));
        assert_eq!(regions[1], Region::new(0, 340, 600, 160));
    }

    #[test]
    fn test_gap_of_exactly_four_cells_is_not_merged() {
        let raster = banded(600, 200, &[100..120]);
        let regions = find_empty_regions(&raster, &defaults());
        assert_eq!(regions.len(), 2);
    }

    #[test]
    fn test_narrow_dark_band_is_merged() {
        // A 3px rule occupies one grid row (5px gap) → merged into one region.
        let raster = banded(600, 400, &[200..203]);
        let regions = find_empty_regions(&raster, &defaults());
        assert_eq!(regions, vec![Region::new(0, 0, 600, 400)]);
    }

    #[test]
    fn test_short_band_is_dropped() {
        // Top white band is 20px < min_height 30; it is not a region.
        let raster = banded(600, 300, &[20..100]);
        let regions = find_empty_regions(&raster, &defaults());
        assert_eq!(regions, vec![Region::new(0, 100, 600, 200)]);
    }

    #[test]
    fn test_single_dark_pixel_occupies_its_row() {
        let mut raster = GrayRaster::filled(500, 200, 255);
        raster.pixels[(102 * 500 + 499) as usize] = 0;
        let regions = find_empty_regions(&raster, &defaults());
        // Row band 100..105 is occupied, gap 5px < 20px → merged.
        assert_eq!(regions, vec![Region::new(0, 0, 500, 200)]);

        let options = RegionFinderOptions { merge_gap_cells: 1, ..defaults() };
        let regions = find_empty_regions(&raster, &options);
        assert_eq!(regions, vec![Region::new(0, 0, 500, 100), Region::new(0, 105, 500, 95)]);
    }

    // ── ordering ────────────────────────────────────────────────────────────

    #[test]
    fn test_regions_sorted_by_area_and_respect_min_height() {
        let raster = banded(400, 900, &[100..150, 300..360, 420..500]);
        let regions = find_empty_regions(&raster, &defaults());
        assert!(!regions.is_empty());
        for pair in regions.windows(2) {
            assert!(pair[0].area() >= pair[1].area());
        }
        assert!(regions.iter().all(|r| r.height >= 30));
        assert_eq!(regions[0], Region::new(0, 500, 400, 400));
    }

    #[test]
    fn test_deterministic_for_identical_input() {
        let raster = banded(640, 480, &[50..90, 200..260]);
        assert_eq!(
            find_empty_regions(&raster, &defaults()),
            find_empty_regions(&raster, &defaults())
        );
    }

    // ── candidates ──────────────────────────────────────────────────────────

    #[test]
    fn test_candidate_filter_and_best_region() {
        let regions = vec![
            Region::new(0, 0, 90, 500),
            Region::new(0, 0, 400, 40),
            Region::new(0, 0, 400, 20),
        ];
        assert_eq!(candidate_regions(&regions), vec![Region::new(0, 0, 400, 40)]);
        assert_eq!(best_region(&regions), Some(Region::new(0, 0, 400, 40)));
        assert_eq!(best_region(&[]), None);
    }
}
