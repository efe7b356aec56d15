//! Download paired roadmap and satellite static map tiles along a spiral.
//!
//! Starting from a center coordinate, the tool walks outward in a spiral,
//! downloading a roadmap and a satellite image for every stop until a distance
//! budget is used up. Tiles are written to a folder and can be stacked into an
//! append-only array store for later processing, where [`subsection`] and
//! [`to_float`] help prepare them as classifier input.
//!
//! **Mind the API terms and quota.** Every stop costs two requests.
//!
//! # CLI Example
//!
//! ```bash
//! static-map-spiral download \
//!   --lat -27.4698 \
//!   --lon 153.0251 \
//!   --zoom 17 \
//!   --distance 10 \
//!   --key "$MAPS_API_KEY" \
//!   --style "all|labels|visibility:off" \
//!   --output ./GMAPS \
//!   --store ./tiles.redb
//! ```
//!
//! # Library Example
//! ```rust
//! use static_map_spiral::{ArmGrowth, Coordinate, Spiral, TileGeometry};
//!
//! let geometry = TileGeometry::new(17, 2, 640);
//! let stops = Spiral::new(
//!     Coordinate::new(-27.4698, 153.0251),
//!     geometry.inter_tile_distance(),
//!     2.0,
//!     ArmGrowth::Accelerating,
//! );
//!
//! for stop in stops {
//!     println!("{} ({:.2} km left)", stop.coord, stop.remaining_km);
//! }
//! ```

mod config;
mod coord;
mod fetch;
mod pixels;
mod spiral;
pub mod store;
mod subdivide;
mod tile;
mod url;

pub use config::Config;
pub use coord::{
    Coordinate, Direction, InvalidDirection, EARTH_CIRCUMFERENCE_KM, KM_PER_DEG_LAT,
    KM_PER_DEG_LON,
};
pub use fetch::{fetch, fetch_with, FailureKind, FetchError, Summary};
pub use pixels::{
    array_to_rgb, from_channel_first, load_float, rgb_to_array, to_channel_first, to_float,
};
pub use spiral::{ArmGrowth, Spiral, Waypoint};
pub use store::{ArrayStore, ImageShape, StoreError};
pub use subdivide::{factors, subsection, SubdivideError};
pub use tile::{decode_tile, pixel_distance, MapType, Tile, TileFormat, TileGeometry, TileImage};
pub use url::{Style, UrlError, UrlFormat, DEFAULT_URL_TEMPLATE};
