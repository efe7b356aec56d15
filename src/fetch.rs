use anyhow::{bail, Context, Result};
use clap::crate_version;
use indicatif::{ProgressBar, ProgressStyle};
use std::{
    path::{Path, PathBuf},
    time::Duration,
};
use thiserror::Error;
use tokio::fs;
use tracing::{info, warn};

use crate::config::Config;
use crate::coord::Coordinate;
use crate::pixels::rgb_to_array;
use crate::store::{ArrayStore, StoreError};
use crate::tile::{MapType, Tile, TileImage};
use crate::url::UrlError;

const ZERO_DURATION: Duration = Duration::from_secs(0);

/// Why a tile pair couldn't be downloaded or saved.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error(transparent)]
    Url(#[from] UrlError),

    #[error("request failed: {0}")]
    Request(#[source] reqwest::Error),

    #[error("server responded with {0}")]
    Status(reqwest::StatusCode),

    #[error("response is not a valid image: {0}")]
    Decode(#[source] image::ImageError),

    #[error("failed writing tile file: {0}")]
    Save(#[source] std::io::Error),

    #[error("failed appending to array store: {0}")]
    Store(#[from] StoreError),
}

/// Coarse classification of a [`FetchError`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum FailureKind {
    /// The tile couldn't be requested or the server refused it.
    Fetch,
    /// The server answered with something that isn't an image.
    Decode,
    /// The tile arrived but couldn't be written out.
    Save,
}

impl FetchError {
    pub fn kind(&self) -> FailureKind {
        match self {
            FetchError::Url(_) | FetchError::Request(_) | FetchError::Status(_) => {
                FailureKind::Fetch
            }
            FetchError::Decode(_) => FailureKind::Decode,
            FetchError::Save(_) | FetchError::Store(_) => FailureKind::Save,
        }
    }
}

/// Tally of a spiral download.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct Summary {
    pub pairs: usize,
    pub succeeded: usize,
    pub fetch_failures: usize,
    pub decode_failures: usize,
    pub save_failures: usize,
}

impl Summary {
    pub fn record(&mut self, outcome: &Result<(), FetchError>) {
        self.pairs += 1;

        match outcome.as_ref().map_err(FetchError::kind) {
            Ok(()) => self.succeeded += 1,
            Err(FailureKind::Fetch) => self.fetch_failures += 1,
            Err(FailureKind::Decode) => self.decode_failures += 1,
            Err(FailureKind::Save) => self.save_failures += 1,
        }
    }

    pub fn failed(&self) -> usize {
        self.pairs - self.succeeded
    }
}

/// Downloads the roadmap and satellite tiles along the spiral described by
/// `cfg` and saves them to the output folder (and the array store, if one is
/// configured).
///
/// Tiles are fetched one pair at a time. A pair that fails is logged, counted
/// in the returned [`Summary`] and skipped; failures are never retried.
///
/// # Example
/// ```rust,no_run
/// use static_map_spiral::{fetch, ArmGrowth, Config, Coordinate, TileFormat, TileGeometry, UrlFormat};
/// use std::time::Duration;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let config = Config {
///     origin: Coordinate::new(-27.4698, 153.0251),
///     distance_km: 10.0,
///     growth: ArmGrowth::Accelerating,
///     geometry: TileGeometry::new(17, 2, 640),
///     format: TileFormat::Png,
///     url: UrlFormat::default().with_key(Some("<api key>".into())),
///     output_folder: "./GMAPS".into(),
///     store: None,
///     timeout: Duration::from_secs(30),
/// };
///
/// let summary = fetch(config).await.expect("failed fetching tiles");
/// println!("{} of {} pairs downloaded", summary.succeeded, summary.pairs);
/// # }
/// ```
pub async fn fetch(cfg: Config) -> Result<Summary> {
    let mut builder = reqwest::Client::builder();
    if cfg.timeout > ZERO_DURATION {
        builder = builder.timeout(cfg.timeout);
    }

    let mut headers = reqwest::header::HeaderMap::new();
    headers.append(
        reqwest::header::USER_AGENT,
        format!("static-map-spiral_rs_{}", crate_version!())
            .parse::<reqwest::header::HeaderValue>()
            .context("invalid user agent")?,
    );

    let client = builder
        .default_headers(headers)
        .build()
        .with_context(|| "failed creating HTTP client")?;

    fetch_with(&client, &cfg).await
}

/// Like [`fetch`], but with a caller-provided HTTP client.
pub async fn fetch_with(client: &reqwest::Client, cfg: &Config) -> Result<Summary> {
    let output_folder = cfg.output_folder.as_path();
    if output_folder.exists() && !output_folder.is_dir() {
        bail!("output {} must be a directory", output_folder.display());
    }
    fs::create_dir_all(output_folder)
        .await
        .context("failed to create output directory")?;

    let store = match &cfg.store {
        Some(path) if path.exists() => Some(ArrayStore::new(path)),
        Some(path) => {
            let pixels = usize::try_from(cfg.geometry.pixels())
                .context("tiles are too large for an array store")?;
            Some(ArrayStore::init(path, pixels, pixels).context("failed to create array store")?)
        }
        None => None,
    };

    let pb = ProgressBar::new(cfg.spiral().count() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:60.cyan/blue} {pos:>7}/{len:7} ETA: {eta} {msg}")?
            .progress_chars("##-"),
    );

    let mut summary = Summary::default();
    for waypoint in cfg.spiral() {
        let coord = waypoint.coord;
        pb.set_message(format!("{:.3} km left", waypoint.remaining_km.max(0.0)));

        let outcome = fetch_pair(client, cfg, store.as_ref(), coord).await;
        pb.suspend(|| match &outcome {
            Ok(()) => info!(lat = coord.lat, lon = coord.lon, "pair downloaded"),
            Err(e) => {
                warn!(lat = coord.lat, lon = coord.lon, kind = ?e.kind(), "pair failed: {}", e)
            }
        });

        summary.record(&outcome);
        pb.inc(1);
    }

    pb.finish_and_clear();
    info!(
        pairs = summary.pairs,
        succeeded = summary.succeeded,
        failed = summary.failed(),
        "spiral download finished"
    );

    Ok(summary)
}

/// Fetches both renderings of `coord` before saving either. If saving any
/// part of the pair fails, the files already written are removed again, so a
/// pair is either saved completely or not at all.
async fn fetch_pair(
    client: &reqwest::Client,
    cfg: &Config,
    store: Option<&ArrayStore>,
    coord: Coordinate,
) -> Result<(), FetchError> {
    let roadmap = Tile::new(coord, MapType::Roadmap, cfg.geometry, cfg.format);
    let satellite = Tile::new(coord, MapType::Satellite, cfg.geometry, cfg.format);

    let roadmap_img = roadmap.fetch_from(client, &cfg.url).await?;
    let satellite_img = satellite.fetch_from(client, &cfg.url).await?;

    let mut written = Vec::with_capacity(2);
    let outcome = save_pair(
        cfg,
        store,
        [(&roadmap, &roadmap_img), (&satellite, &satellite_img)],
        &mut written,
    )
    .await;

    if outcome.is_err() {
        for path in written {
            if let Err(e) = fs::remove_file(&path).await {
                warn!(file = %path.display(), "failed removing partial pair: {}", e);
            }
        }
    }

    outcome
}

/// Writes both tile files, then appends the pair to the store. Every file
/// written is pushed to `written`.
async fn save_pair(
    cfg: &Config,
    store: Option<&ArrayStore>,
    pair: [(&Tile, &TileImage); 2],
    written: &mut Vec<PathBuf>,
) -> Result<(), FetchError> {
    for (tile, img) in pair {
        written.push(save(&cfg.output_folder, tile, img).await?);
    }

    if let Some(store) = store {
        let [(_, roadmap), (_, satellite)] = pair;
        store.append_pair(
            rgb_to_array(&roadmap.image.to_rgb8()).view(),
            rgb_to_array(&satellite.image.to_rgb8()).view(),
        )?;
    }

    Ok(())
}

async fn save(folder: &Path, tile: &Tile, img: &TileImage) -> Result<PathBuf, FetchError> {
    let path = folder.join(tile.file_name());
    fs::write(&path, &img.bytes)
        .await
        .map_err(FetchError::Save)?;

    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spiral::ArmGrowth;
    use crate::store::{ROADMAP, SATELLITE};
    use crate::tile::{TileFormat, TileGeometry};
    use crate::url::UrlFormat;
    use image::{DynamicImage, ImageOutputFormat, Rgb, RgbImage};
    use std::{io::Cursor, net::SocketAddr};
    use tokio::{
        io::{AsyncReadExt, AsyncWriteExt},
        net::TcpListener,
    };

    fn png(pixels: u32) -> Vec<u8> {
        let img = RgbImage::from_pixel(pixels, pixels, Rgb([12, 34, 56]));
        let mut bytes = Vec::new();
        DynamicImage::ImageRgb8(img)
            .write_to(&mut Cursor::new(&mut bytes), ImageOutputFormat::Png)
            .unwrap();
        bytes
    }

    /// Serves a PNG for every request under `/ok`, garbage for satellite
    /// requests under `/broken` and 404 for everything else.
    async fn tile_server(pixels: u32) -> SocketAddr {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let png = png(pixels);

        tokio::spawn(async move {
            while let Ok((mut socket, _)) = listener.accept().await {
                let png = png.clone();
                tokio::spawn(async move {
                    let mut request = Vec::new();
                    let mut buf = [0u8; 1024];
                    while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                        match socket.read(&mut buf).await {
                            Ok(0) | Err(_) => return,
                            Ok(n) => request.extend_from_slice(&buf[..n]),
                        }
                    }

                    let head = String::from_utf8_lossy(&request);
                    let path = head.split_whitespace().nth(1).unwrap_or("").to_owned();
                    let (status, body) = if path.starts_with("/ok") {
                        ("200 OK", png)
                    } else if path.starts_with("/broken") {
                        if path.contains("maptype=satellite") {
                            ("200 OK", b"over quota".to_vec())
                        } else {
                            ("200 OK", png)
                        }
                    } else {
                        ("404 Not Found", Vec::new())
                    };

                    let header = format!(
                        "HTTP/1.1 {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                        status,
                        body.len()
                    );
                    let _ = socket.write_all(header.as_bytes()).await;
                    let _ = socket.write_all(&body).await;
                });
            }
        });

        addr
    }

    fn config(addr: SocketAddr, prefix: &str, output: &Path, distance_km: f64) -> Config {
        Config {
            origin: Coordinate::new(51.4779, -0.0015),
            distance_km,
            growth: ArmGrowth::Accelerating,
            geometry: TileGeometry::new(17, 1, 8),
            format: TileFormat::Png,
            url: UrlFormat::new(format!(
                "http://{}{}/staticmap?center={{lat}},{{lon}}&maptype={{maptype}}",
                addr, prefix
            )),
            output_folder: output.join("tiles"),
            store: Some(output.join("tiles.redb")),
            timeout: Duration::from_secs(5),
        }
    }

    fn client() -> reqwest::Client {
        reqwest::Client::builder().no_proxy().build().unwrap()
    }

    #[tokio::test]
    async fn downloads_pairs_to_folder_and_store() {
        let addr = tile_server(8).await;
        let dir = tempfile::tempdir().unwrap();
        let cfg = config(addr, "/ok", dir.path(), 0.0);

        let summary = fetch_with(&client(), &cfg).await.unwrap();
        assert_eq!(summary.pairs, 1);
        assert_eq!(summary.succeeded, 1);

        let tile = Tile::new(cfg.origin, MapType::Roadmap, cfg.geometry, cfg.format);
        assert!(cfg.output_folder.join(tile.file_name()).is_file());
        let tile = Tile { map_type: MapType::Satellite, ..tile };
        assert!(cfg.output_folder.join(tile.file_name()).is_file());

        let store = ArrayStore::new(dir.path().join("tiles.redb"));
        assert_eq!(store.len(ROADMAP).unwrap(), 1);
        assert_eq!(store.len(SATELLITE).unwrap(), 1);
        assert_eq!(store.read(SATELLITE, 0).unwrap()[[7, 7, 2]], 56);
    }

    #[tokio::test]
    async fn walks_the_whole_spiral() {
        let addr = tile_server(8).await;
        let dir = tempfile::tempdir().unwrap();
        let mut cfg = config(addr, "/ok", dir.path(), 0.0);
        cfg.distance_km = cfg.geometry.inter_tile_distance() * 2.5;

        let summary = fetch_with(&client(), &cfg).await.unwrap();
        assert_eq!(summary.pairs, 4);
        assert_eq!(summary.succeeded, 4);

        let files = std::fs::read_dir(&cfg.output_folder).unwrap().count();
        assert_eq!(files, 8);
        assert_eq!(
            ArrayStore::new(dir.path().join("tiles.redb")).len(ROADMAP).unwrap(),
            4
        );
    }

    #[tokio::test]
    async fn undecodable_tiles_are_skipped() {
        let addr = tile_server(8).await;
        let dir = tempfile::tempdir().unwrap();
        let cfg = config(addr, "/broken", dir.path(), 0.0);

        let summary = fetch_with(&client(), &cfg).await.unwrap();
        assert_eq!(summary.decode_failures, 1);
        assert_eq!(summary.failed(), 1);
        assert_eq!(std::fs::read_dir(&cfg.output_folder).unwrap().count(), 0);
        assert_eq!(
            ArrayStore::new(dir.path().join("tiles.redb")).len(ROADMAP).unwrap(),
            0
        );
    }

    #[tokio::test]
    async fn http_errors_are_fetch_failures() {
        let addr = tile_server(8).await;
        let dir = tempfile::tempdir().unwrap();
        let mut cfg = config(addr, "/missing", dir.path(), 0.0);
        cfg.distance_km = cfg.geometry.inter_tile_distance() * 1.5;

        let summary = fetch_with(&client(), &cfg).await.unwrap();
        assert_eq!(summary.pairs, 2);
        assert_eq!(summary.fetch_failures, 2);
    }

    #[tokio::test]
    async fn mismatched_tiles_are_save_failures() {
        let addr = tile_server(4).await;
        let dir = tempfile::tempdir().unwrap();
        let cfg = config(addr, "/ok", dir.path(), 0.0);

        let summary = fetch_with(&client(), &cfg).await.unwrap();
        assert_eq!(summary.save_failures, 1);
        assert_eq!(summary.succeeded, 0);

        // files of the rejected pair are removed again
        assert_eq!(std::fs::read_dir(&cfg.output_folder).unwrap().count(), 0);
        assert_eq!(
            ArrayStore::new(dir.path().join("tiles.redb")).len(SATELLITE).unwrap(),
            0
        );
    }

    #[tokio::test]
    async fn unwritable_tile_rolls_back_its_partner() {
        let addr = tile_server(8).await;
        let dir = tempfile::tempdir().unwrap();
        let cfg = config(addr, "/ok", dir.path(), 0.0);

        // a directory in place of the satellite file makes its write fail
        let satellite = Tile::new(cfg.origin, MapType::Satellite, cfg.geometry, cfg.format);
        std::fs::create_dir_all(cfg.output_folder.join(satellite.file_name())).unwrap();

        let summary = fetch_with(&client(), &cfg).await.unwrap();
        assert_eq!(summary.save_failures, 1);

        let roadmap = Tile { map_type: MapType::Roadmap, ..satellite };
        assert!(!cfg.output_folder.join(roadmap.file_name()).exists());
        assert_eq!(
            ArrayStore::new(dir.path().join("tiles.redb")).len(ROADMAP).unwrap(),
            0
        );
    }

    #[test]
    fn failure_kinds() {
        let mut summary = Summary::default();
        summary.record(&Ok(()));
        summary.record(&Err(FetchError::Status(reqwest::StatusCode::FORBIDDEN)));
        summary.record(&Err(FetchError::Url(UrlError::Template("x".into()))));
        summary.record(&Err(FetchError::Save(std::io::Error::new(
            std::io::ErrorKind::Other,
            "disk full",
        ))));

        assert_eq!(
            summary,
            Summary {
                pairs: 4,
                succeeded: 1,
                fetch_failures: 2,
                decode_failures: 0,
                save_failures: 1,
            }
        );
        assert_eq!(summary.failed(), 3);
    }
}
