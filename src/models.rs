//! Data models.

mod coordinate;

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::errors::{RoverError, TerrainError, ValueError};
use crate::terrain::TileId;

pub use coordinate::Coordinate;

/// Compass heading in degrees
///
/// 0 is due north and values increase clockwise, so 90 is due east. Any
/// finite value is accepted; use [`Heading::normalized`] to fold it into
/// `[0, 360)`.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct Heading(f64);

impl Heading {
    pub const NORTH: Heading = Heading(0.0);

    pub fn degrees(&self) -> f64 {
        self.0
    }

    /// Heading folded into `[0, 360)`
    pub fn normalized(&self) -> f64 {
        let folded = self.0.rem_euclid(360.0);
        // rem_euclid rounds tiny negative values up to exactly 360
        if folded >= 360.0 {
            0.0
        } else {
            folded
        }
    }

    /// Unit vector of the heading as `(east, north)` components
    pub fn unit_vector(&self) -> (f64, f64) {
        let rad = self.0.to_radians();
        (rad.sin(), rad.cos())
    }
}

impl TryFrom<f64> for Heading {
    type Error = ValueError;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        if !value.is_finite() {
            return Err(ValueError::NonFinite(value));
        }
        Ok(Self(value))
    }
}

impl From<Heading> for f64 {
    fn from(value: Heading) -> Self {
        value.0
    }
}

impl fmt::Display for Heading {
    /// Shortest round-trip text, always with a fractional part (`0.0`, `359.5`)
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.0)
    }
}

/// Position and heading of a single rover
///
/// Field types carry the precision rules, so fields may be reassigned
/// directly without breaking the record.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rover {
    /// Latitude in decimal degrees, 11 digits with 8 decimal places
    pub latitude: Coordinate,
    /// Longitude in decimal degrees, 11 digits with 8 decimal places
    pub longitude: Coordinate,
    /// Heading in degrees, 0 = due north, clockwise increment
    pub direction: Heading,
}

impl Rover {
    pub fn new(latitude: Coordinate, longitude: Coordinate, direction: Heading) -> Self {
        Self {
            latitude,
            longitude,
            direction,
        }
    }

    /// Create a rover from decimal text and a heading
    ///
    /// Fails with [`RoverError::Validation`] naming the first offending field.
    pub fn try_new(latitude: &str, longitude: &str, direction: f64) -> Result<Self, RoverError> {
        Ok(Self {
            latitude: latitude
                .parse()
                .map_err(|e| RoverError::validation("latitude", e))?,
            longitude: longitude
                .parse()
                .map_err(|e| RoverError::validation("longitude", e))?,
            direction: Heading::try_from(direction)
                .map_err(|e| RoverError::validation("direction", e))?,
        })
    }

    /// Create a rover from floating point degrees
    pub fn from_degrees(latitude: f64, longitude: f64, direction: f64) -> Result<Self, RoverError> {
        Ok(Self {
            latitude: Coordinate::try_from(latitude)
                .map_err(|e| RoverError::validation("latitude", e))?,
            longitude: Coordinate::try_from(longitude)
                .map_err(|e| RoverError::validation("longitude", e))?,
            direction: Heading::try_from(direction)
                .map_err(|e| RoverError::validation("direction", e))?,
        })
    }

    /// Text form `[(LAT,LONG),DIRECTION]`
    pub fn render(&self) -> String {
        self.to_string()
    }

    /// Check the position against physical bounds
    ///
    /// The stored shape allows e.g. a latitude of 999.99999999, so this is
    /// left to callers that need a real position.
    pub fn check_geographic_bounds(&self) -> Result<(), RoverError> {
        check_range("latitude", self.latitude.to_degrees(), 90.0)?;
        check_range("longitude", self.longitude.to_degrees(), 180.0)?;
        Ok(())
    }

    /// Elevation tile containing the rover
    pub fn tile(&self) -> Result<TileId, TerrainError> {
        TileId::containing(self.latitude.to_degrees(), self.longitude.to_degrees())
    }
}

fn check_range(field: &'static str, value: f64, limit: f64) -> Result<(), RoverError> {
    if value.abs() > limit {
        return Err(RoverError::validation(
            field,
            ValueError::OutOfRange {
                value,
                min: -limit,
                max: limit,
            },
        ));
    }
    Ok(())
}

impl fmt::Display for Rover {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[({},{}),{}]",
            self.latitude, self.longitude, self.direction
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_new_york() {
        let rover = Rover::try_new("40.71280000", "-74.00600000", 0.0).unwrap();
        assert_eq!(rover.render(), "[(40.71280000,-74.00600000),0.0]");
    }

    #[test]
    fn render_origin() {
        let rover = Rover::try_new("0", "0", 359.5).unwrap();
        assert_eq!(rover.render(), "[(0.00000000,0.00000000),359.5]");
    }

    #[test]
    fn render_is_deterministic() {
        let rover = Rover::from_degrees(61.866617, 28.886522, 229.6).unwrap();
        assert_eq!(rover.render(), rover.render());
        assert_eq!(rover.render(), "[(61.86661700,28.88652200),229.6]");
    }

    #[test]
    fn too_precise_latitude_is_rejected() {
        let err = Rover::try_new("123.123456789", "0", 0.0).unwrap_err();
        match err {
            RoverError::Validation { field, source } => {
                assert_eq!(field, "latitude");
                assert!(matches!(source, ValueError::DecimalPlaces { digits: 9, .. }));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn error_names_field() {
        let err = Rover::try_new("1", "1000.5", 0.0).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Validation error on longitude: `1000.5` has 4 integer digits, at most 3 allowed"
        );
    }

    #[test]
    fn non_finite_direction_is_rejected() {
        for direction in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            let err = Rover::try_new("1", "1", direction).unwrap_err();
            assert!(matches!(
                err,
                RoverError::Validation {
                    field: "direction",
                    source: ValueError::NonFinite(_)
                }
            ));
        }
    }

    #[test]
    fn direction_is_not_range_checked() {
        let rover = Rover::try_new("1", "1", -450.0).unwrap();
        assert_eq!(rover.direction.degrees(), -450.0);
        assert_eq!(rover.direction.normalized(), 270.0);
        assert_eq!(Heading::try_from(720.0).unwrap().normalized(), 0.0);
    }

    #[test]
    fn east_is_ninety_degrees() {
        let (east, north) = Heading::try_from(90.0).unwrap().unit_vector();
        assert!((east - 1.0).abs() < 1e-12);
        assert!(north.abs() < 1e-12);

        let (east, north) = Heading::NORTH.unit_vector();
        assert_eq!((east, north), (0.0, 1.0));
    }

    #[test]
    fn field_reassignment() {
        let mut rover = Rover::try_new("1", "2", 3.0).unwrap();
        rover.latitude = "-33.8688".parse().unwrap();
        rover.direction = Heading::try_from(90.0).unwrap();
        assert_eq!(rover.render(), "[(-33.86880000,2.00000000),90.0]");
    }

    #[test]
    fn geographic_bounds_are_opt_in() {
        let rover = Rover::try_new("999.99999999", "0", 0.0).unwrap();
        assert!(matches!(
            rover.check_geographic_bounds(),
            Err(RoverError::Validation {
                field: "latitude",
                ..
            })
        ));

        let rover = Rover::try_new("-90", "180", 0.0).unwrap();
        assert!(rover.check_geographic_bounds().is_ok());
    }

    #[test]
    fn serde_round_trip() {
        let rover = Rover::try_new("40.7128", "-74.006", 90.0).unwrap();
        let json = serde_json::to_string(&rover).unwrap();
        assert_eq!(
            json,
            r#"{"latitude":"40.71280000","longitude":"-74.00600000","direction":90.0}"#
        );
        let parsed: Rover = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, rover);
    }

    #[test]
    fn parse_rover_json() {
        let s = r#"{
          "latitude" : "37.5665",
          "longitude" : "126.978",
          "direction" : 45.0
        }"#;
        let rover: Rover = serde_json::from_str(s).unwrap();
        assert_eq!(rover.render(), "[(37.56650000,126.97800000),45.0]");

        let bad = r#"{"latitude":"1","longitude":"1","direction":null}"#;
        assert!(serde_json::from_str::<Rover>(bad).is_err());
    }
}
