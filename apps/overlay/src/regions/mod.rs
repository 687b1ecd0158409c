pub mod finder;

pub use finder::{best_region, find_empty_regions, GrayRaster, Region, RegionFinderOptions};
