use std::convert::TryFrom;
use std::fmt;

use thiserror::Error;

/// Equatorial circumference of the earth in kilometers.
pub const EARTH_CIRCUMFERENCE_KM: f64 = 40075.0;

/// Approximate distance in kilometers covered by one degree of latitude.
pub const KM_PER_DEG_LAT: f64 = 110.54;

/// Approximate distance in kilometers covered by one degree of longitude at
/// the equator. Shrinks with the cosine of the latitude.
pub const KM_PER_DEG_LON: f64 = 110.32;

/// A geographic location in degrees.
///
/// # Example
/// ```rust
/// # use static_map_spiral::{Coordinate, Direction};
/// let start = Coordinate::new(0.0, 0.0);
/// let north = start.step(110.54, Direction::North);
/// assert!((north.lat - 1.0).abs() < 1e-9);
/// ```
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Coordinate {
    pub lat: f64,
    pub lon: f64,
}

impl Coordinate {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// Moves `distance_km` kilometers into `direction`.
    ///
    /// Uses a flat-earth approximation: latitude changes by a constant amount per
    /// kilometer, longitude by an amount scaled with the cosine of the current
    /// latitude. Accuracy degrades close to the poles and over long distances.
    pub fn step(self, distance_km: f64, direction: Direction) -> Self {
        let Coordinate { lat, lon } = self;

        match direction {
            Direction::North => Self::new(lat + distance_km / KM_PER_DEG_LAT, lon),
            Direction::South => Self::new(lat - distance_km / KM_PER_DEG_LAT, lon),
            Direction::East => Self::new(lat, lon + lon_delta(lat, distance_km)),
            Direction::West => Self::new(lat, lon - lon_delta(lat, distance_km)),
        }
    }
}

fn lon_delta(lat: f64, distance_km: f64) -> f64 {
    distance_km / (KM_PER_DEG_LON * lat.to_radians().cos())
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.lat, self.lon)
    }
}

/// One of the four cardinal directions, cycled clockwise.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Direction {
    North,
    East,
    South,
    West,
}

impl Direction {
    /// The next direction in clockwise order.
    pub fn clockwise(self) -> Self {
        match self {
            Direction::North => Direction::East,
            Direction::East => Direction::South,
            Direction::South => Direction::West,
            Direction::West => Direction::North,
        }
    }
}

#[derive(Debug, Error, PartialEq)]
#[error("invalid direction {0}, expected 1 (north) to 4 (west)")]
pub struct InvalidDirection(pub u8);

/// Legacy numeric encoding: 1 = north, 2 = east, 3 = south, 4 = west.
impl TryFrom<u8> for Direction {
    type Error = InvalidDirection;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Direction::North),
            2 => Ok(Direction::East),
            3 => Ok(Direction::South),
            4 => Ok(Direction::West),
            other => Err(InvalidDirection(other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    #[test]
    fn one_degree_north_at_equator() {
        let c = Coordinate::new(0.0, 0.0).step(110.54, Direction::North);
        assert!((c.lat - 1.0).abs() < EPS);
        assert_eq!(c.lon, 0.0);
    }

    #[test]
    fn north_south_round_trip() {
        let start = Coordinate::new(-33.8688, 151.2093);
        let back = start
            .step(0.764, Direction::North)
            .step(0.764, Direction::South);
        assert!((back.lat - start.lat).abs() < EPS);
        assert_eq!(back.lon, start.lon);
    }

    #[test]
    fn east_west_round_trip() {
        let start = Coordinate::new(50.7929, 6.0402);
        let back = start.step(3.2, Direction::East).step(3.2, Direction::West);
        assert!((back.lon - start.lon).abs() < EPS);
        assert_eq!(back.lat, start.lat);
    }

    #[test]
    fn longitude_steps_widen_with_latitude() {
        let equator = Coordinate::new(0.0, 0.0).step(10.0, Direction::East);
        let north = Coordinate::new(60.0, 0.0).step(10.0, Direction::East);
        assert!(north.lon > equator.lon);
        assert!((north.lon - 2.0 * equator.lon).abs() < 1e-6);
    }

    #[test]
    fn clockwise_cycle() {
        let mut dir = Direction::North;
        let mut seen = Vec::new();
        for _ in 0..4 {
            dir = dir.clockwise();
            seen.push(dir);
        }
        assert_eq!(
            seen,
            vec![
                Direction::East,
                Direction::South,
                Direction::West,
                Direction::North
            ]
        );
    }

    #[test]
    fn legacy_direction_codes() {
        assert_eq!(Direction::try_from(1), Ok(Direction::North));
        assert_eq!(Direction::try_from(4), Ok(Direction::West));
        assert_eq!(Direction::try_from(0), Err(InvalidDirection(0)));
        assert_eq!(Direction::try_from(5), Err(InvalidDirection(5)));
    }
}
