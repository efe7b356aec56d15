use clap::{
    app_from_crate, crate_authors, crate_description, crate_name, crate_version,
    value_t, value_t_or_exit, values_t, AppSettings, App, Arg, ArgMatches, SubCommand,
};
use std::{path::PathBuf, time::Duration};

use crate::validators::*;
use static_map_spiral::{
    ArmGrowth, Config, Coordinate, Style, TileFormat, TileGeometry, UrlFormat,
    DEFAULT_URL_TEMPLATE,
};

const LOG_LEVEL_ARG: &str = "log_level";

const DOWNLOAD_CMD: &str = "download";
const INIT_CMD: &str = "init";
const IMPORT_CMD: &str = "import";
const INSPECT_CMD: &str = "inspect";

const LAT_ARG: &str = "lat";
const LON_ARG: &str = "lon";
const ZOOM_ARG: &str = "zoom";
const DISTANCE_ARG: &str = "distance";
const SIZE_ARG: &str = "size";
const SCALE_ARG: &str = "scale";
const FORMAT_ARG: &str = "format";
const STYLE_ARG: &str = "style";
const KEY_ARG: &str = "key";
const OUTPUT_DIR_ARG: &str = "output_dir";
const STORE_ARG: &str = "store";
const URL_ARG: &str = "url";
const TIMEOUT_ARG: &str = "timeout";
const GROWTH_ARG: &str = "growth";
const DRY_RUN_ARG: &str = "dry_run";
const WIDTH_ARG: &str = "width";
const HEIGHT_ARG: &str = "height";
const DIR_ARG: &str = "dir";
const GROUP_ARG: &str = "group";
const INDEX_ARG: &str = "index";
const EXPORT_ARG: &str = "export";

pub struct DownloadArgs {
    pub lat: f64,
    pub lon: f64,
    pub zoom: u8,
    pub distance_km: f64,
    pub size: u32,
    pub scale: u8,
    pub format: TileFormat,
    pub styles: Vec<Style>,
    pub key: Option<String>,
    pub output_dir: PathBuf,
    pub store: Option<PathBuf>,
    pub url: String,
    pub timeout: Duration,
    pub growth: ArmGrowth,
    pub dry_run: bool,
}

impl std::convert::From<DownloadArgs> for Config {
    fn from(args: DownloadArgs) -> Self {
        Self {
            origin: Coordinate::new(args.lat, args.lon),
            distance_km: args.distance_km,
            growth: args.growth,
            geometry: TileGeometry::new(args.zoom, args.scale, args.size),
            format: args.format,
            url: UrlFormat::new(args.url)
                .with_styles(args.styles)
                .with_key(args.key),
            output_folder: args.output_dir,
            store: args.store,
            timeout: args.timeout,
        }
    }
}

pub enum Command {
    Download(DownloadArgs),
    Init {
        store: PathBuf,
        width: usize,
        height: usize,
    },
    Import {
        store: PathBuf,
        dir: PathBuf,
        format: TileFormat,
    },
    Inspect {
        store: PathBuf,
        group: String,
        index: u64,
        export: Option<PathBuf>,
    },
}

pub struct Args {
    pub log_level: String,
    pub command: Command,
}

impl Args {
    pub fn parse() -> Self {
        let matches = get_matches();
        // the global flag may also be given after the subcommand
        let log_level = matches
            .subcommand()
            .1
            .filter(|m| m.occurrences_of(LOG_LEVEL_ARG) > 0)
            .unwrap_or(&matches)
            .value_of(LOG_LEVEL_ARG)
            .unwrap_or("info")
            .to_owned();

        let command = match matches.subcommand() {
            (DOWNLOAD_CMD, Some(m)) => Command::Download(parse_download(m)),
            (INIT_CMD, Some(m)) => Command::Init {
                store: value_t_or_exit!(m, STORE_ARG, PathBuf),
                width: value_t_or_exit!(m, WIDTH_ARG, usize),
                height: value_t_or_exit!(m, HEIGHT_ARG, usize),
            },
            (IMPORT_CMD, Some(m)) => Command::Import {
                store: value_t_or_exit!(m, STORE_ARG, PathBuf),
                dir: value_t_or_exit!(m, DIR_ARG, PathBuf),
                format: value_t_or_exit!(m, FORMAT_ARG, TileFormat),
            },
            (INSPECT_CMD, Some(m)) => Command::Inspect {
                store: value_t_or_exit!(m, STORE_ARG, PathBuf),
                group: value_t_or_exit!(m, GROUP_ARG, String),
                index: value_t_or_exit!(m, INDEX_ARG, u64),
                export: value_t!(m, EXPORT_ARG, PathBuf).ok(),
            },
            // SubcommandRequiredElseHelp exits before we get here
            _ => unreachable!("a subcommand is required"),
        };

        Self { log_level, command }
    }
}

fn parse_download(m: &ArgMatches<'_>) -> DownloadArgs {
    DownloadArgs {
        lat: value_t_or_exit!(m, LAT_ARG, f64),
        lon: value_t_or_exit!(m, LON_ARG, f64),
        zoom: value_t_or_exit!(m, ZOOM_ARG, u8),
        distance_km: value_t_or_exit!(m, DISTANCE_ARG, f64),
        size: value_t_or_exit!(m, SIZE_ARG, u32),
        scale: value_t_or_exit!(m, SCALE_ARG, u8),
        format: value_t_or_exit!(m, FORMAT_ARG, TileFormat),
        // `values_t!` errors when the argument is absent
        styles: values_t!(m, STYLE_ARG, Style).unwrap_or_default(),
        key: m.value_of(KEY_ARG).map(str::to_owned),
        output_dir: value_t_or_exit!(m, OUTPUT_DIR_ARG, PathBuf),
        store: value_t!(m, STORE_ARG, PathBuf).ok(),
        url: value_t_or_exit!(m, URL_ARG, String),
        timeout: Duration::from_secs(value_t_or_exit!(m, TIMEOUT_ARG, u64)),
        growth: value_t_or_exit!(m, GROWTH_ARG, ArmGrowth),
        dry_run: m.is_present(DRY_RUN_ARG),
    }
}

fn store_arg() -> Arg<'static, 'static> {
    Arg::with_name(STORE_ARG)
        .help("Path of the array store file")
        .takes_value(true)
        .long("store")
}

fn format_arg() -> Arg<'static, 'static> {
    Arg::with_name(FORMAT_ARG)
        .help("Image format of the tiles (png, jpg or gif)")
        .validator(parses_as::<TileFormat>)
        .default_value("png")
        .takes_value(true)
        .short("f")
        .long("format")
}

fn download_cmd() -> App<'static, 'static> {
    SubCommand::with_name(DOWNLOAD_CMD)
        .about("Download roadmap and satellite tile pairs along a spiral")
        .arg(
            Arg::with_name(LAT_ARG)
                .help("Latitude of the spiral center (in degrees)")
                .required(true)
                .validator(is_latitude)
                .takes_value(true)
                .allow_hyphen_values(true)
                .long("lat"),
        )
        .arg(
            Arg::with_name(LON_ARG)
                .help("Longitude of the spiral center (in degrees)")
                .required(true)
                .validator(is_longitude)
                .takes_value(true)
                .allow_hyphen_values(true)
                .long("lon"),
        )
        .arg(
            Arg::with_name(ZOOM_ARG)
                .help("The zoom level to fetch")
                .validator(is_zoom)
                .default_value("17")
                .takes_value(true)
                .short("z")
                .long("zoom"),
        )
        .arg(
            Arg::with_name(DISTANCE_ARG)
                .help("Distance budget of the spiral (in km). Every turn of the spiral uses up one tile width.")
                .validator(is_distance)
                .default_value("10")
                .takes_value(true)
                .allow_hyphen_values(true)
                .short("d")
                .long("distance"),
        )
        .arg(
            Arg::with_name(SIZE_ARG)
                .help("Edge length of the requested tiles (in pixels, before scaling)")
                .validator(is_numeric_min(1))
                .default_value("640")
                .takes_value(true)
                .long("size"),
        )
        .arg(
            Arg::with_name(SCALE_ARG)
                .help("Pixel density multiplier")
                .validator(is_numeric_min(1))
                .default_value("2")
                .takes_value(true)
                .long("scale"),
        )
        .arg(format_arg())
        .arg(
            Arg::with_name(STYLE_ARG)
                .help("Map style rule as `feature|element|rule`, eg. `all|labels|visibility:off`. May be repeated.")
                .validator(parses_as::<Style>)
                .takes_value(true)
                .multiple(true)
                .number_of_values(1)
                .long("style"),
        )
        .arg(
            Arg::with_name(KEY_ARG)
                .help("API key appended to every request")
                .env("MAPS_API_KEY")
                .hide_env_values(true)
                .takes_value(true)
                .short("k")
                .long("key"),
        )
        .arg(
            Arg::with_name(OUTPUT_DIR_ARG)
                .help("The folder to save the tiles to")
                .default_value("GMAPS")
                .takes_value(true)
                .short("o")
                .long("output"),
        )
        .arg(store_arg().help("Also append every tile pair to this array store (created if missing)"))
        .arg(
            Arg::with_name(URL_ARG)
                .help("The URL with format specifiers `{lat}`, `{lon}`, `{zoom}`, `{size}`, `{maptype}`, `{scale}` and `{format}` to fetch the tiles from")
                .default_value(DEFAULT_URL_TEMPLATE)
                .takes_value(true)
                .short("u")
                .long("url"),
        )
        .arg(
            Arg::with_name(TIMEOUT_ARG)
                .help("The timeout (in seconds) for fetching a single tile. Pass 0 for no timeout.")
                .validator(is_numeric_min(0))
                .default_value("10")
                .takes_value(true)
                .short("t")
                .long("timeout"),
        )
        .arg(
            Arg::with_name(GROWTH_ARG)
                .help("How the spiral arms grow: `accelerating` adds a step every turn, `square` every second turn")
                .possible_values(&["accelerating", "square"])
                .default_value("accelerating")
                .takes_value(true)
                .long("growth"),
        )
        .arg(
            Arg::with_name(DRY_RUN_ARG)
                .help("Don't actually fetch anything, just determine how many tiles would be fetched.")
                .required(false)
                .takes_value(false)
                .long("dry-run"),
        )
}

fn get_matches() -> ArgMatches<'static> {
    app_from_crate!()
        .setting(AppSettings::GlobalVersion)
        .setting(AppSettings::VersionlessSubcommands)
        .setting(AppSettings::SubcommandRequiredElseHelp)
        .arg(
            Arg::with_name(LOG_LEVEL_ARG)
                .help("Log filter, overridden by RUST_LOG")
                .default_value("info")
                .takes_value(true)
                .global(true)
                .long("log-level"),
        )
        .subcommand(download_cmd())
        .subcommand(
            SubCommand::with_name(INIT_CMD)
                .about("Create an empty array store, replacing any existing file")
                .arg(store_arg().required(true))
                .arg(
                    Arg::with_name(WIDTH_ARG)
                        .help("Width of the stored images (in pixels)")
                        .validator(is_numeric_min(1))
                        .default_value("1280")
                        .takes_value(true)
                        .long("width"),
                )
                .arg(
                    Arg::with_name(HEIGHT_ARG)
                        .help("Height of the stored images (in pixels)")
                        .validator(is_numeric_min(1))
                        .default_value("1280")
                        .takes_value(true)
                        .long("height"),
                ),
        )
        .subcommand(
            SubCommand::with_name(IMPORT_CMD)
                .about("Append previously downloaded tiles from a folder to an array store")
                .arg(store_arg().required(true))
                .arg(
                    Arg::with_name(DIR_ARG)
                        .help("Folder containing the tiles")
                        .required(true)
                        .takes_value(true)
                        .long("dir"),
                )
                .arg(format_arg()),
        )
        .subcommand(
            SubCommand::with_name(INSPECT_CMD)
                .about("List the groups of an array store, optionally exporting one image")
                .arg(store_arg().required(true))
                .arg(
                    Arg::with_name(GROUP_ARG)
                        .help("Group to export from")
                        .default_value("satellite")
                        .takes_value(true)
                        .long("group"),
                )
                .arg(
                    Arg::with_name(INDEX_ARG)
                        .help("Index of the image to export")
                        .validator(is_numeric_min(0))
                        .default_value("0")
                        .takes_value(true)
                        .long("index"),
                )
                .arg(
                    Arg::with_name(EXPORT_ARG)
                        .help("Write the selected image to this file")
                        .takes_value(true)
                        .long("export"),
                ),
        )
        .get_matches()
}
