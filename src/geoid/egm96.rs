// src/geoid/egm96.rs
//! EGM96 geoid grid lookup
//!
//! The NGA distributes the EGM96 geoid heights as `WW15MGH.DAC`: a 15 minute
//! grid of big-endian 16 bit integers in centimetres, 721 rows from 90°N to
//! 90°S, each with 1440 columns eastwards from 0°E. Lookups interpolate
//! bilinearly between the four surrounding grid nodes.

use crate::error::{GeoidError, Result};
use std::path::Path;
use tracing::debug;

pub const ROWS: usize = 721;
pub const COLS: usize = 1440;
pub const NODES: usize = ROWS * COLS;

/// Expected size of `WW15MGH.DAC` in bytes
pub const FILE_SIZE: usize = NODES * 2;

/// Grid nodes per degree
const NODES_PER_DEGREE: f64 = 4.0;

#[derive(Debug, Clone)]
pub struct Egm96Grid {
    heights: Vec<i16>, // centimetres, row major
}

impl Egm96Grid {
    /// Build a grid from raw `WW15MGH.DAC` content
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != FILE_SIZE {
            return Err(GeoidError::Grid(format!(
                "expected {} bytes, got {}",
                FILE_SIZE,
                bytes.len()
            )));
        }

        let heights = bytes
            .chunks_exact(2)
            .map(|pair| i16::from_be_bytes([pair[0], pair[1]]))
            .collect();

        Ok(Self { heights })
    }

    /// Build a grid from heights in centimetres, row major from the north pole
    pub fn from_heights(heights: Vec<i16>) -> Result<Self> {
        if heights.len() != NODES {
            return Err(GeoidError::Grid(format!(
                "expected {} grid nodes, got {}",
                NODES,
                heights.len()
            )));
        }
        Ok(Self { heights })
    }

    /// Read a `WW15MGH.DAC` file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path)
            .map_err(|e| GeoidError::Grid(format!("Failed to read {}: {}", path.display(), e)))?;
        let grid = Self::from_bytes(&bytes)?;
        debug!(path = %path.display(), "EGM96 grid loaded");
        Ok(grid)
    }

    /// Geoid separation in meters at the given position.
    ///
    /// Returns `None` for latitudes outside [-90, 90] and non-finite input.
    pub fn separation(&self, latitude: f64, longitude: f64) -> Option<f64> {
        if !latitude.is_finite() || !longitude.is_finite() || !(-90.0..=90.0).contains(&latitude) {
            return None;
        }

        let longitude = longitude.rem_euclid(360.0);

        let row = (90.0 - latitude) * NODES_PER_DEGREE; // [0; 720] north to south
        let col = longitude * NODES_PER_DEGREE; // [0; 1440[

        let north = row.floor() as usize;
        let south = (north + 1).min(ROWS - 1);
        let west = (col.floor() as usize) % COLS;
        let east = (west + 1) % COLS;

        let dr = row - row.floor();
        let dc = col - col.floor();

        let interpolated = self.node(north, west) * (1.0 - dr) * (1.0 - dc)
            + self.node(north, east) * (1.0 - dr) * dc
            + self.node(south, west) * dr * (1.0 - dc)
            + self.node(south, east) * dr * dc;

        Some(interpolated)
    }

    fn node(&self, row: usize, col: usize) -> f64 {
        self.heights
            .get(row * COLS + col)
            .map_or(0.0, |&cm| f64::from(cm) * 0.01)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid_from(f: impl Fn(usize, usize) -> i16) -> Egm96Grid {
        let heights = (0..NODES).map(|i| f(i / COLS, i % COLS)).collect();
        Egm96Grid::from_heights(heights).unwrap()
    }

    #[test]
    fn test_rejects_wrong_size() {
        assert!(matches!(Egm96Grid::from_bytes(&[0u8; 10]), Err(GeoidError::Grid(_))));
        assert!(Egm96Grid::from_heights(vec![0; 5]).is_err());
    }

    #[test]
    fn test_big_endian_decoding() {
        let mut bytes = vec![0u8; FILE_SIZE];
        // node (0, 0) = 0x0102 = 258 cm, node (0, 1) = -1 cm
        bytes[0] = 0x01;
        bytes[1] = 0x02;
        bytes[2] = 0xFF;
        bytes[3] = 0xFF;
        let grid = Egm96Grid::from_bytes(&bytes).unwrap();
        assert!((grid.separation(90.0, 0.0).unwrap() - 2.58).abs() < 1e-9);
        assert!((grid.separation(90.0, 0.25).unwrap() + 0.01).abs() < 1e-9);
    }

    #[test]
    fn test_constant_grid() {
        let grid = grid_from(|_, _| 4790);
        for (lat, lon) in [(48.8, 10.1), (-90.0, 0.0), (90.0, 359.99), (0.0, -120.0)] {
            assert!((grid.separation(lat, lon).unwrap() - 47.9).abs() < 1e-9);
        }
    }

    #[test]
    fn test_bilinear_midpoint() {
        // height grows 1 cm per column and 100 cm per row
        let grid = grid_from(|row, col| (row * 100 + col) as i16 % 30_000);
        // halfway between rows 4/5 and columns 40/41
        let value = grid.separation(90.0 - 4.5 / 4.0, 40.5 / 4.0).unwrap();
        let expected = (450.0 + 40.5) * 0.01;
        assert!((value - expected).abs() < 1e-9);
    }

    #[test]
    fn test_longitude_wraps_east() {
        let grid = grid_from(|_, col| if col == 0 { 100 } else { 0 });
        // halfway between column 1439 and column 0
        let value = grid.separation(0.0, 359.875).unwrap();
        assert!((value - 0.5).abs() < 1e-9);
        assert_eq!(grid.separation(0.0, -0.125), grid.separation(0.0, 359.875));
    }

    #[test]
    fn test_invalid_coordinates() {
        let grid = grid_from(|_, _| 0);
        assert_eq!(grid.separation(91.0, 0.0), None);
        assert_eq!(grid.separation(f64::NAN, 0.0), None);
        assert_eq!(grid.separation(0.0, f64::INFINITY), None);
    }

    #[test]
    fn test_load_missing_file() {
        let result = Egm96Grid::load("/nonexistent/WW15MGH.DAC");
        assert!(matches!(result, Err(GeoidError::Grid(_))));
    }
}
