//! Elevation tiles around rover positions
//!
//! Tiles cover one degree of latitude and longitude and are addressed the
//! SRTM way (`N37E127`). Positions inside a tile are mapped to a local
//! metric frame on a spherical earth:
//!
//! - x axis: - => west, + => east
//! - y axis: - => south, + => north
//! - origin at the tile centre

use std::f64::consts::PI;
use std::fmt;

use tracing::debug;

use crate::errors::TerrainError;

/// Mean earth radius in metres
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Sample value marking missing data in HGT files
const VOID_SAMPLE: i16 = i16::MIN;

/// Neighbour offsets as (row, column)
const NEIGHBOURS: [(isize, isize); 8] = [
    (-1, -1),
    (-1, 0),
    (-1, 1),
    (0, -1),
    (0, 1),
    (1, -1),
    (1, 0),
    (1, 1),
];

/// One degree tile, identified by the floored latitude and longitude of
/// its south-west corner
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TileId {
    pub lat: i16,
    pub lon: i16,
}

impl TileId {
    /// Tile containing the given position in degrees
    pub fn containing(lat: f64, lon: f64) -> Result<Self, TerrainError> {
        if !lat.is_finite() || !lon.is_finite() || lat.abs() > 90.0 || lon.abs() > 180.0 {
            return Err(TerrainError::InvalidPosition { lat, lon });
        }
        // The north pole and antimeridian belong to the last tile
        let lat_idx = lat.floor().min(89.0) as i16;
        let lon_idx = lon.floor().min(179.0) as i16;
        Ok(Self {
            lat: lat_idx,
            lon: lon_idx,
        })
    }

    /// File stem of the tile, e.g. `N37E127` or `S01W073`
    pub fn name(&self) -> String {
        format!(
            "{}{:02}{}{:03}",
            if self.lat >= 0 { 'N' } else { 'S' },
            self.lat.unsigned_abs(),
            if self.lon >= 0 { 'E' } else { 'W' },
            self.lon.unsigned_abs()
        )
    }

    /// Whether the position falls in this tile, with the same folding of the
    /// pole and antimeridian as [`TileId::containing`]
    pub fn contains(&self, lat: f64, lon: f64) -> bool {
        matches!(Self::containing(lat, lon), Ok(tile) if tile == *self)
    }

    fn check_contains(&self, lat: f64, lon: f64) -> Result<(), TerrainError> {
        if !self.contains(lat, lon) {
            return Err(TerrainError::OutsideTile {
                lat,
                lon,
                tile: self.name(),
            });
        }
        Ok(())
    }
}

impl fmt::Display for TileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}

/// Length of one degree of latitude in metres
pub fn meters_per_degree_latitude() -> f64 {
    2.0 * PI * EARTH_RADIUS_M / 360.0
}

/// Length of one degree of longitude in metres at latitude `lat`
pub fn meters_per_degree_longitude(lat: f64) -> f64 {
    let radius = EARTH_RADIUS_M * lat.abs().to_radians().cos();
    2.0 * PI * radius / 360.0
}

/// Local metric frame of a tile
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TileFrame {
    pub tile: TileId,
}

impl TileFrame {
    pub fn new(tile: TileId) -> Self {
        Self { tile }
    }

    /// Convert a position to metres from the tile centre
    pub fn to_local(&self, lat: f64, lon: f64) -> Result<(f64, f64), TerrainError> {
        self.tile.check_contains(lat, lon)?;
        let lat_remainder = lat - f64::from(self.tile.lat) - 0.5;
        let lon_remainder = lon - f64::from(self.tile.lon) - 0.5;

        let x = lon_remainder * meters_per_degree_longitude(lat);
        let y = lat_remainder * meters_per_degree_latitude();
        Ok((x, y))
    }

    /// Convert metres from the tile centre back to a position
    pub fn to_geographic(&self, x: f64, y: f64) -> (f64, f64) {
        let lat = y / meters_per_degree_latitude() + 0.5 + f64::from(self.tile.lat);
        let lon = x / meters_per_degree_longitude(lat) + 0.5 + f64::from(self.tile.lon);
        (lat, lon)
    }
}

/// Square grid of elevations in metres, first row at the north edge
#[derive(Debug, Clone, PartialEq)]
pub struct HeightMap {
    side: usize,
    samples: Vec<Option<f64>>,
}

impl HeightMap {
    /// Decode an HGT file: big-endian signed 16-bit samples, row-major
    ///
    /// Voids are filled from the mean of their valid neighbours. Two passes
    /// are made so that voids bordered only by other voids still get a
    /// value; anything left after that stays `None`.
    pub fn from_hgt(bytes: &[u8]) -> Result<Self, TerrainError> {
        if bytes.len() % 2 != 0 {
            return Err(TerrainError::InvalidGrid(bytes.len()));
        }
        let count = bytes.len() / 2;
        let side = (count as f64).sqrt().round() as usize;
        if side < 2 || side * side != count {
            return Err(TerrainError::InvalidGrid(bytes.len()));
        }

        let samples = bytes
            .chunks_exact(2)
            .map(|pair| match i16::from_be_bytes([pair[0], pair[1]]) {
                VOID_SAMPLE => None,
                value => Some(f64::from(value)),
            })
            .collect();

        let mut map = Self { side, samples };
        let voids = map.void_count();
        map.fill_voids();
        map.fill_voids();
        debug!(
            "Decoded {}x{} height map, filled {} of {} voids",
            side,
            side,
            voids - map.void_count(),
            voids
        );
        Ok(map)
    }

    pub fn side(&self) -> usize {
        self.side
    }

    pub fn void_count(&self) -> usize {
        self.samples.iter().filter(|s| s.is_none()).count()
    }

    /// Elevation at grid position, `None` for voids or outside the grid
    pub fn sample(&self, row: usize, col: usize) -> Option<f64> {
        if row >= self.side || col >= self.side {
            return None;
        }
        self.samples[row * self.side + col]
    }

    /// Elevation of the sample nearest to a position inside `tile`
    pub fn elevation_at(&self, tile: TileId, lat: f64, lon: f64) -> Result<Option<f64>, TerrainError> {
        tile.check_contains(lat, lon)?;
        let last = (self.side - 1) as f64;
        let row = ((f64::from(tile.lat) + 1.0 - lat) * last).round() as usize;
        let col = ((lon - f64::from(tile.lon)) * last).round() as usize;
        Ok(self.sample(row, col))
    }

    /// Single in-place pass, so a void filled early in the pass counts as a
    /// valid neighbour for the voids after it
    fn fill_voids(&mut self) {
        for idx in 0..self.samples.len() {
            if self.samples[idx].is_some() {
                continue;
            }
            let (row, col) = (idx / self.side, idx % self.side);

            let mut sum = 0.0;
            let mut num = 0usize;
            for (dr, dc) in NEIGHBOURS {
                let (Some(r), Some(c)) = (row.checked_add_signed(dr), col.checked_add_signed(dc)) else {
                    continue;
                };
                if let Some(value) = self.sample(r, c) {
                    sum += value;
                    num += 1;
                }
            }

            if num != 0 {
                self.samples[idx] = Some(sum / num as f64);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hgt(samples: &[i16]) -> Vec<u8> {
        samples.iter().flat_map(|s| s.to_be_bytes()).collect()
    }

    #[test]
    fn tile_names() {
        assert_eq!(TileId::containing(37.5665, 126.978).unwrap().name(), "N37E126");
        assert_eq!(TileId::containing(-0.5, -72.1).unwrap().name(), "S01W073");
        assert_eq!(TileId::containing(0.0, 0.0).unwrap().name(), "N00E000");
        assert_eq!(TileId::containing(90.0, 180.0).unwrap().name(), "N89E179");
    }

    #[test]
    fn edge_positions_stay_in_their_tile() {
        let tile = TileId::containing(90.0, 180.0).unwrap();
        assert!(tile.contains(90.0, 180.0));
        assert!(tile.contains(89.5, 179.5));
        assert!(!tile.contains(88.5, 179.5));

        let frame = TileFrame::new(TileId::containing(90.0, 0.0).unwrap());
        let (_, y) = frame.to_local(90.0, 0.0).unwrap();
        assert!((y - meters_per_degree_latitude() / 2.0).abs() < 1e-6);

        let map = HeightMap::from_hgt(&hgt(&[1, 2, 3, 4, 5, 6, 7, 8, 9])).unwrap();
        assert_eq!(map.elevation_at(tile, 90.0, 180.0).unwrap(), Some(3.0));
    }

    #[test]
    fn invalid_positions() {
        assert!(matches!(
            TileId::containing(91.0, 0.0),
            Err(TerrainError::InvalidPosition { .. })
        ));
        assert!(TileId::containing(0.0, f64::NAN).is_err());
    }

    #[test]
    fn degree_lengths() {
        assert!((meters_per_degree_latitude() - 111_194.9).abs() < 1.0);
        assert!((meters_per_degree_longitude(0.0) - meters_per_degree_latitude()).abs() < 1e-6);
        assert!((meters_per_degree_longitude(60.0) - meters_per_degree_latitude() / 2.0).abs() < 1e-6);
        assert_eq!(meters_per_degree_longitude(-45.0), meters_per_degree_longitude(45.0));
    }

    #[test]
    fn local_frame_round_trip() {
        let tile = TileId::containing(37.25, 127.75).unwrap();
        let frame = TileFrame::new(tile);

        let (x, y) = frame.to_local(37.5, 127.5).unwrap();
        assert!(x.abs() < 1e-9 && y.abs() < 1e-9);

        let (x, y) = frame.to_local(37.75, 127.75).unwrap();
        assert!(x > 0.0 && y > 0.0);
        let (lat, lon) = frame.to_geographic(x, y);
        assert!((lat - 37.75).abs() < 1e-9);
        assert!((lon - 127.75).abs() < 1e-9);

        assert!(matches!(
            frame.to_local(38.1, 127.5),
            Err(TerrainError::OutsideTile { .. })
        ));
    }

    #[test]
    fn decode_signed_samples() {
        let map = HeightMap::from_hgt(&hgt(&[1, 2, -2, 300])).unwrap();
        assert_eq!(map.side(), 2);
        assert_eq!(map.sample(0, 0), Some(1.0));
        assert_eq!(map.sample(1, 0), Some(-2.0));
        assert_eq!(map.sample(1, 1), Some(300.0));
        assert_eq!(map.sample(2, 0), None);
    }

    #[test]
    fn invalid_grid() {
        assert_eq!(HeightMap::from_hgt(&[0, 1, 2]), Err(TerrainError::InvalidGrid(3)));
        assert_eq!(
            HeightMap::from_hgt(&hgt(&[1, 2, 3])),
            Err(TerrainError::InvalidGrid(6))
        );
        assert_eq!(HeightMap::from_hgt(&hgt(&[1])), Err(TerrainError::InvalidGrid(2)));
    }

    #[test]
    fn fills_single_void_with_neighbour_mean() {
        let v = VOID_SAMPLE;
        let map = HeightMap::from_hgt(&hgt(&[1, 2, 3, 4, v, 6, 7, 8, 9])).unwrap();
        assert_eq!(map.sample(1, 1), Some(5.0));
        assert_eq!(map.void_count(), 0);
    }

    #[test]
    fn second_pass_fills_nested_voids() {
        let v = VOID_SAMPLE;
        let map = HeightMap::from_hgt(&hgt(&[v, v, v, v, v, v, v, v, 10])).unwrap();
        assert_eq!(map.void_count(), 0);
        for row in 0..3 {
            for col in 0..3 {
                assert_eq!(map.sample(row, col), Some(10.0));
            }
        }
    }

    #[test]
    fn all_void_grid_stays_void() {
        let v = VOID_SAMPLE;
        let map = HeightMap::from_hgt(&hgt(&[v, v, v, v])).unwrap();
        assert_eq!(map.void_count(), 4);
    }

    #[test]
    fn nearest_sample_elevation() {
        let tile = TileId { lat: 10, lon: 20 };
        let map = HeightMap::from_hgt(&hgt(&[1, 2, 3, 4, 5, 6, 7, 8, 9])).unwrap();

        // north-west corner is the first sample
        assert_eq!(map.elevation_at(tile, 10.999, 20.0).unwrap(), Some(1.0));
        assert_eq!(map.elevation_at(tile, 10.5, 20.5).unwrap(), Some(5.0));
        assert_eq!(map.elevation_at(tile, 10.0, 20.99).unwrap(), Some(9.0));
        assert!(map.elevation_at(tile, 11.5, 20.5).is_err());
    }
}
