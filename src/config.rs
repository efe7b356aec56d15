use std::{path::PathBuf, time::Duration};

use crate::coord::Coordinate;
use crate::spiral::{ArmGrowth, Spiral};
use crate::tile::{TileFormat, TileGeometry};
use crate::url::UrlFormat;

/// Spiral download configuration.
#[derive(Clone, Debug, PartialEq)]
pub struct Config {
    /// Center of the spiral.
    pub origin: Coordinate,

    /// Distance budget in kilometers. Every turn of the spiral uses up one
    /// inter-tile distance.
    pub distance_km: f64,

    /// How fast the spiral arms grow.
    pub growth: ArmGrowth,

    /// Zoom, scale and requested size of every tile.
    pub geometry: TileGeometry,

    /// Image format requested and saved.
    pub format: TileFormat,

    /// The URL template, styles and API key to download tiles with.
    pub url: UrlFormat,

    /// The folder to save the tile files to.
    pub output_folder: PathBuf,

    /// Array store to append every tile pair to, created if it doesn't exist.
    pub store: Option<PathBuf>,

    /// Timeout for fetching a single tile.
    ///
    /// Pass the zero duration to disable the timeout.
    pub timeout: Duration,
}

impl Config {
    /// Creates an iterator over the tile centers of the configured spiral.
    pub fn spiral(&self) -> Spiral {
        Spiral::new(
            self.origin,
            self.geometry.inter_tile_distance(),
            self.distance_km,
            self.growth,
        )
    }
}
