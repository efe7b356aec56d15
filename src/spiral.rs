use std::str::FromStr;

use crate::coord::{Coordinate, Direction};

/// How the number of steps per spiral arm grows with every turn.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ArmGrowth {
    /// One more step on every turn (0, 1, 2, 3, ...). The arms outgrow the
    /// previous ring, so the path widens faster than a square spiral.
    Accelerating,

    /// One more step on every second turn (0, 1, 1, 2, 2, ...), tracing a
    /// square spiral that visits every grid cell exactly once.
    Square,
}

impl Default for ArmGrowth {
    fn default() -> Self {
        ArmGrowth::Accelerating
    }
}

impl FromStr for ArmGrowth {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "accelerating" => Ok(ArmGrowth::Accelerating),
            "square" => Ok(ArmGrowth::Square),
            _ => Err("unrecognized arm growth"),
        }
    }
}

/// A stop on the spiral, together with the distance budget left when it is reached.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Waypoint {
    pub coord: Coordinate,
    pub remaining_km: f64,
}

/// Iterator over the tile centers of a spiral walk.
///
/// The first item is the start itself and costs nothing. Afterwards every turn
/// deducts one step length from the budget; once the budget is used up the walk
/// ends, otherwise the direction rotates clockwise (starting north, so the first
/// arm heads east) and the arm is walked step by step from the current position.
///
/// # Example
/// ```rust
/// # use static_map_spiral::{ArmGrowth, Coordinate, Spiral};
/// let spiral = Spiral::new(Coordinate::new(0.0, 0.0), 1.0, 2.5, ArmGrowth::Accelerating);
/// assert_eq!(spiral.count(), 4);
/// ```
#[derive(Clone, Debug)]
pub struct Spiral {
    coord: Coordinate,
    direction: Direction,
    step_km: f64,
    remaining_km: f64,
    growth: ArmGrowth,
    turns: usize,
    arm_left: usize,
    started: bool,
    done: bool,
}

impl Spiral {
    /// # Panics
    /// Panics if `step_km` isn't positive or `budget_km` isn't finite.
    pub fn new(
        origin: Coordinate,
        step_km: f64,
        budget_km: f64,
        growth: ArmGrowth,
    ) -> Self {
        assert!(step_km > 0.0);
        assert!(budget_km.is_finite());

        Self {
            coord: origin,
            direction: Direction::North,
            step_km,
            remaining_km: budget_km,
            growth,
            turns: 0,
            arm_left: 0,
            started: false,
            done: false,
        }
    }

    fn waypoint(&self) -> Waypoint {
        Waypoint {
            coord: self.coord,
            remaining_km: self.remaining_km,
        }
    }

    fn arm_length(&self) -> usize {
        match self.growth {
            ArmGrowth::Accelerating => self.turns - 1,
            ArmGrowth::Square => self.turns / 2,
        }
    }

    /// Charges the budget and turns. Returns `false` when the budget is exhausted.
    fn turn(&mut self) -> bool {
        if self.turns > 0 {
            self.remaining_km -= self.step_km;
        }
        if self.remaining_km <= 0.0 {
            return false;
        }

        self.turns += 1;
        self.direction = self.direction.clockwise();
        self.arm_left = self.arm_length();

        true
    }
}

impl Iterator for Spiral {
    type Item = Waypoint;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        if !self.started {
            self.started = true;
            return Some(self.waypoint());
        }

        while self.arm_left == 0 {
            if !self.turn() {
                self.done = true;
                return None;
            }
        }

        self.arm_left -= 1;
        self.coord = self.coord.step(self.step_km, self.direction);

        Some(self.waypoint())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coord::KM_PER_DEG_LAT;
    use crate::TileGeometry;

    fn lats(spiral: Spiral) -> Vec<f64> {
        spiral.map(|w| (w.coord.lat * 1e6).round() / 1e6).collect()
    }

    #[test]
    fn exhausted_budget_visits_only_the_start() {
        let origin = Coordinate::new(-37.8136, 144.9631);
        let step = TileGeometry::default().inter_tile_distance();

        for budget in &[-1.0, 0.0, step / 2.0, step] {
            for growth in &[ArmGrowth::Accelerating, ArmGrowth::Square] {
                let visited: Vec<_> = Spiral::new(origin, step, *budget, *growth).collect();
                assert_eq!(visited.len(), 1, "budget {}", budget);
                assert_eq!(visited[0].coord, origin);
            }
        }
    }

    #[test]
    fn accelerating_arm_lengths() {
        // arms of 1, 2, 3, 4 steps
        let counts: Vec<usize> = (1..=5)
            .map(|turns| {
                Spiral::new(Coordinate::new(0.0, 0.0), 1.0, turns as f64 - 0.5, ArmGrowth::Accelerating)
                    .count()
            })
            .collect();
        assert_eq!(counts, vec![1, 2, 4, 7, 11]);
    }

    #[test]
    fn square_arm_lengths() {
        // arms of 1, 1, 2, 2 steps
        let counts: Vec<usize> = (1..=5)
            .map(|turns| {
                Spiral::new(Coordinate::new(0.0, 0.0), 1.0, turns as f64 - 0.5, ArmGrowth::Square)
                    .count()
            })
            .collect();
        assert_eq!(counts, vec![1, 2, 3, 5, 7]);
    }

    #[test]
    fn path_is_cumulative_and_turns_clockwise() {
        let spiral = Spiral::new(
            Coordinate::new(0.0, 0.0),
            KM_PER_DEG_LAT,
            KM_PER_DEG_LAT * 3.5,
            ArmGrowth::Accelerating,
        );
        let visited: Vec<_> = spiral.clone().collect();

        // start, one step south, two steps west, three steps north
        assert_eq!(lats(spiral), vec![0.0, -1.0, -1.0, -1.0, 0.0, 1.0, 2.0]);
        assert_eq!(visited[1].coord.lon, 0.0);
        assert!(visited[2].coord.lon < 0.0);
        assert!(visited[3].coord.lon < visited[2].coord.lon);
        assert_eq!(visited[6].coord.lon, visited[3].coord.lon);
    }

    #[test]
    fn square_spiral_does_not_revisit() {
        let spiral = Spiral::new(
            Coordinate::new(0.0, 0.0),
            KM_PER_DEG_LAT,
            KM_PER_DEG_LAT * 8.5,
            ArmGrowth::Square,
        );
        let mut cells: Vec<(i64, i64)> = spiral
            .map(|w| ((w.coord.lat * 1e6).round() as i64, (w.coord.lon * 1e6).round() as i64))
            .collect();
        let total = cells.len();
        cells.sort();
        cells.dedup();
        assert_eq!(cells.len(), total);
    }

    #[test]
    fn remaining_budget_is_reported() {
        let remaining: Vec<f64> = Spiral::new(Coordinate::new(0.0, 0.0), 1.0, 3.5, ArmGrowth::Accelerating)
            .map(|w| w.remaining_km)
            .collect();
        assert_eq!(remaining, vec![3.5, 2.5, 1.5, 1.5, 0.5, 0.5, 0.5]);
    }

    #[test]
    fn growth_parsing() {
        assert_eq!("Square".parse::<ArmGrowth>(), Ok(ArmGrowth::Square));
        assert_eq!("accelerating".parse::<ArmGrowth>(), Ok(ArmGrowth::Accelerating));
        assert!("spiral".parse::<ArmGrowth>().is_err());
    }
}
