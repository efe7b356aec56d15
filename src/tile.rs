use image::DynamicImage;
use std::{fmt, str::FromStr};
use tracing::debug;

use crate::coord::{Coordinate, EARTH_CIRCUMFERENCE_KM};
use crate::fetch::FetchError;
use crate::url::UrlFormat;

/// Width in pixels of the whole world at zoom level 0 and scale 1.
pub const BASE_TILE_PIXELS: f64 = 256.0;

/// The two renderings downloaded for every location.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum MapType {
    Roadmap,
    Satellite,
}

impl MapType {
    /// Value of the `maptype` request parameter, also used as array store group name.
    pub fn as_str(self) -> &'static str {
        match self {
            MapType::Roadmap => "roadmap",
            MapType::Satellite => "satellite",
        }
    }

    /// Suffix used in tile file names.
    pub fn label(self) -> &'static str {
        match self {
            MapType::Roadmap => "Roadmap",
            MapType::Satellite => "Satellite",
        }
    }
}

impl fmt::Display for MapType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Image encoding requested from the API and used for the saved files.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum TileFormat {
    Png,
    Jpg,
    Gif,
}

impl TileFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            TileFormat::Png => "png",
            TileFormat::Jpg => "jpg",
            TileFormat::Gif => "gif",
        }
    }
}

impl FromStr for TileFormat {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "png" => Ok(TileFormat::Png),
            "jpg" | "jpeg" => Ok(TileFormat::Jpg),
            "gif" => Ok(TileFormat::Gif),
            _ => Err("unsupported image format"),
        }
    }
}

/// Zoom, scale and requested size of a tile, which together fix how much
/// ground a single tile covers.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TileGeometry {
    pub zoom: u8,
    pub scale: u8,
    pub size: u32,
}

impl TileGeometry {
    /// # Panics
    /// Panics if `scale` or `size` is zero.
    pub fn new(zoom: u8, scale: u8, size: u32) -> Self {
        assert!(scale > 0);
        assert!(size > 0);

        Self { zoom, scale, size }
    }

    /// Ground distance in kilometers covered by one pixel.
    pub fn pixel_distance(&self) -> f64 {
        pixel_distance(self.zoom, self.scale)
    }

    /// Ground distance in kilometers between the centers of two adjacent tiles.
    pub fn inter_tile_distance(&self) -> f64 {
        self.pixel_distance() * f64::from(self.scale) * f64::from(self.size)
    }

    /// Edge length in pixels of the images the API returns.
    pub fn pixels(&self) -> u64 {
        u64::from(self.size) * u64::from(self.scale)
    }
}

impl Default for TileGeometry {
    fn default() -> Self {
        Self::new(17, 2, 640)
    }
}

/// Ground distance in kilometers covered by one pixel at the given zoom and scale.
///
/// Every zoom level doubles the linear resolution.
pub fn pixel_distance(zoom: u8, scale: u8) -> f64 {
    EARTH_CIRCUMFERENCE_KM
        / (BASE_TILE_PIXELS * f64::from(scale) * 2_f64.powi(i32::from(zoom)))
}

/// A downloaded tile: the payload as served plus its decoded image.
#[derive(Clone, Debug)]
pub struct TileImage {
    pub bytes: Vec<u8>,
    pub image: DynamicImage,
}

/// Decodes a tile payload, keeping the raw bytes around for saving.
pub fn decode_tile(bytes: Vec<u8>) -> Result<TileImage, FetchError> {
    let image = image::load_from_memory(&bytes).map_err(FetchError::Decode)?;
    Ok(TileImage { bytes, image })
}

/// A single static map request: one rendering of one location.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Tile {
    pub coord: Coordinate,
    pub map_type: MapType,
    pub geometry: TileGeometry,
    pub format: TileFormat,
}

impl Tile {
    pub fn new(
        coord: Coordinate,
        map_type: MapType,
        geometry: TileGeometry,
        format: TileFormat,
    ) -> Self {
        Self {
            coord,
            map_type,
            geometry,
            format,
        }
    }

    /// `zoom=<z>:<lat>,<lon>:<Roadmap|Satellite>.<format>`
    pub fn file_name(&self) -> String {
        format!(
            "zoom={}:{}:{}.{}",
            self.geometry.zoom,
            self.coord,
            self.map_type.label(),
            self.format.as_str()
        )
    }

    /// Fetches the given tile from the given URL using the given HTTP client.
    pub async fn fetch_from(
        &self,
        client: &reqwest::Client,
        url_fmt: &UrlFormat,
    ) -> Result<TileImage, FetchError> {
        let formatted_url = url_fmt.tile_url(self)?;
        debug!(url = %formatted_url, "fetching {} tile", self.map_type);

        let response = client
            .get(&formatted_url)
            .send()
            .await
            .map_err(FetchError::Request)?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status));
        }

        let bytes = response.bytes().await.map_err(FetchError::Request)?;
        decode_tile(bytes.to_vec())
    }
}
