//! Append-only stacks of same-sized images in a single file.
//!
//! A store holds named groups. Each group has a fixed image shape and an
//! explicit length; appending writes slot `len` and bumps the length inside a
//! single write transaction, so an interrupted run leaves every group with a
//! valid prefix of its images. Slots are channel-first and gzip compressed.

use flate2::{read::GzDecoder, write::GzEncoder, Compression};
use ndarray::{Array3, ArrayView3};
use redb::{Database, ReadableTable, TableDefinition};
use std::{
    fs,
    io::{Read, Write},
    path::{Path, PathBuf},
};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::pixels::{array_to_rgb, from_channel_first, rgb_to_array, to_channel_first};

pub const ROADMAP: &str = "roadmap";
pub const SATELLITE: &str = "satellite";
/// Reserved for per-store metadata, never written by this crate.
pub const META: &str = "meta";

/// (channels, height, width, len)
type GroupRecord = (u32, u32, u32, u64);

const GROUPS: TableDefinition<&str, GroupRecord> = TableDefinition::new("groups");
const SLOT_TABLE_PREFIX: &str = "slots/";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("array store {0} does not exist")]
    Missing(PathBuf),

    #[error("unknown group `{0}`")]
    UnknownGroup(String),

    #[error("image of shape {found:?} does not fit group `{group}` of shape {expected:?}")]
    ShapeMismatch {
        group: String,
        expected: ImageShape,
        found: ImageShape,
    },

    #[error("index {index} is out of range for group `{group}` of length {len}")]
    IndexOutOfRange { group: String, index: u64, len: u64 },

    #[error("slot {index} of group `{group}` is missing or damaged")]
    Corrupt { group: String, index: u64 },

    #[error("group `{0}` does not hold RGB images")]
    NotRgb(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Image(#[from] image::ImageError),

    #[error(transparent)]
    Database(#[from] redb::DatabaseError),

    #[error(transparent)]
    Transaction(#[from] redb::TransactionError),

    #[error(transparent)]
    Table(#[from] redb::TableError),

    #[error(transparent)]
    Storage(#[from] redb::StorageError),

    #[error(transparent)]
    Commit(#[from] redb::CommitError),
}

pub type Result<T, E = StoreError> = std::result::Result<T, E>;

/// Shape of every image in a group, in channel-first order.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct ImageShape {
    pub channels: usize,
    pub height: usize,
    pub width: usize,
}

impl ImageShape {
    pub fn new(channels: usize, height: usize, width: usize) -> Self {
        Self {
            channels,
            height,
            width,
        }
    }

    /// Shape of an interleaved `(height, width, channels)` array.
    pub fn of(pixels: &ArrayView3<u8>) -> Self {
        let (height, width, channels) = pixels.dim();
        Self::new(channels, height, width)
    }

    pub fn len(&self) -> usize {
        self.channels * self.height * self.width
    }
}

/// Shape and current length of a group.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct GroupInfo {
    pub shape: ImageShape,
    pub len: u64,
}

impl GroupInfo {
    fn from_record((channels, height, width, len): GroupRecord) -> Self {
        Self {
            shape: ImageShape::new(channels as usize, height as usize, width as usize),
            len,
        }
    }

    fn to_record(self) -> GroupRecord {
        (
            self.shape.channels as u32,
            self.shape.height as u32,
            self.shape.width as u32,
            self.len,
        )
    }
}

/// Counts of files added by [`ArrayStore::import_dir`].
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct ImportSummary {
    pub roadmap: usize,
    pub satellite: usize,
    pub skipped: usize,
}

/// Handle to a store file. The file is opened and closed by every call.
///
/// # Example
/// ```rust
/// # use ndarray::Array3;
/// # use static_map_spiral::store::{ArrayStore, ROADMAP};
/// # let dir = tempfile::tempdir().unwrap();
/// let store = ArrayStore::init(dir.path().join("tiles.redb"), 4, 4).unwrap();
/// store.append(ROADMAP, Array3::<u8>::zeros((4, 4, 3)).view()).unwrap();
/// assert_eq!(store.len(ROADMAP).unwrap(), 1);
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct ArrayStore {
    path: PathBuf,
}

impl ArrayStore {
    /// Refers to an existing store without touching it.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Creates a store with empty `roadmap` and `satellite` groups for RGB
    /// images of the given size, plus the reserved `meta` group.
    ///
    /// Replaces any file already at `path`.
    pub fn init(path: impl Into<PathBuf>, width: usize, height: usize) -> Result<Self> {
        let store = Self::new(path);
        if store.path.exists() {
            fs::remove_file(&store.path)?;
        }

        let rgb = ImageShape::new(3, height, width);
        let db = Database::create(&store.path)?;
        let txn = db.begin_write()?;
        {
            let mut groups = txn.open_table(GROUPS)?;
            for (name, shape) in [
                (ROADMAP, rgb),
                (SATELLITE, rgb),
                (META, ImageShape::new(1, 2, 1)),
            ] {
                groups.insert(name, GroupInfo { shape, len: 0 }.to_record())?;

                let table = slot_table_name(name);
                txn.open_table(slot_table(&table))?;
            }
        }
        txn.commit()?;

        info!(path = %store.path.display(), width, height, "initialized array store");
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn open(&self) -> Result<Database> {
        if !self.path.is_file() {
            return Err(StoreError::Missing(self.path.clone()));
        }

        Ok(Database::open(&self.path)?)
    }

    /// Appends `image`, laid out as `(height, width, channels)`, to `group` and
    /// returns its index.
    ///
    /// Fails without writing anything if the shape doesn't match the group.
    pub fn append(&self, group: &str, image: ArrayView3<u8>) -> Result<u64> {
        let indices = self.append_all(&[(group, image)])?;
        Ok(indices[0])
    }

    /// Appends a roadmap and a satellite image atomically, keeping both groups
    /// the same length.
    pub fn append_pair<'a>(
        &self,
        roadmap: ArrayView3<'a, u8>,
        satellite: ArrayView3<'a, u8>,
    ) -> Result<u64> {
        let indices = self.append_all(&[(ROADMAP, roadmap), (SATELLITE, satellite)])?;
        Ok(indices[0])
    }

    /// Appends all images in one transaction: either all of them are stored or none.
    pub fn append_all(&self, images: &[(&str, ArrayView3<u8>)]) -> Result<Vec<u64>> {
        let db = self.open()?;
        let txn = db.begin_write()?;
        let mut indices = Vec::with_capacity(images.len());
        {
            let mut groups = txn.open_table(GROUPS)?;

            for (group, image) in images {
                let record = groups.get(*group)?.map(|r| r.value());
                let mut info = record
                    .map(GroupInfo::from_record)
                    .ok_or_else(|| StoreError::UnknownGroup(group.to_string()))?;

                let found = ImageShape::of(image);
                if found != info.shape {
                    return Err(StoreError::ShapeMismatch {
                        group: group.to_string(),
                        expected: info.shape,
                        found,
                    });
                }

                let payload = compress(&to_channel_first(image.view()).into_raw_vec())?;
                let table = slot_table_name(group);
                let mut slots = txn.open_table(slot_table(&table))?;
                slots.insert(info.len, payload.as_slice())?;

                debug!(group = *group, index = info.len, bytes = payload.len(), "appended image");
                indices.push(info.len);

                info.len += 1;
                groups.insert(*group, info.to_record())?;
            }
        }
        txn.commit()?;

        Ok(indices)
    }

    pub fn info(&self, group: &str) -> Result<GroupInfo> {
        let db = self.open()?;
        let txn = db.begin_read()?;
        let groups = txn.open_table(GROUPS)?;

        let record = groups.get(group)?.map(|r| r.value());
        record
            .map(GroupInfo::from_record)
            .ok_or_else(|| StoreError::UnknownGroup(group.to_owned()))
    }

    /// Number of images stored in `group`.
    pub fn len(&self, group: &str) -> Result<u64> {
        Ok(self.info(group)?.len)
    }

    pub fn shape(&self, group: &str) -> Result<ImageShape> {
        Ok(self.info(group)?.shape)
    }

    /// All groups in the store, sorted by name.
    pub fn groups(&self) -> Result<Vec<(String, GroupInfo)>> {
        let db = self.open()?;
        let txn = db.begin_read()?;
        let groups = txn.open_table(GROUPS)?;

        let mut all = Vec::new();
        for entry in groups.iter()? {
            let (name, record) = entry?;
            all.push((
                name.value().to_owned(),
                GroupInfo::from_record(record.value()),
            ));
        }

        Ok(all)
    }

    /// Reads image `index` of `group` as `(height, width, channels)`.
    pub fn read(&self, group: &str, index: u64) -> Result<Array3<u8>> {
        let db = self.open()?;
        let txn = db.begin_read()?;

        let record = txn.open_table(GROUPS)?.get(group)?.map(|r| r.value());
        let info = record
            .map(GroupInfo::from_record)
            .ok_or_else(|| StoreError::UnknownGroup(group.to_owned()))?;
        if index >= info.len {
            return Err(StoreError::IndexOutOfRange {
                group: group.to_owned(),
                index,
                len: info.len,
            });
        }

        let corrupt = || StoreError::Corrupt {
            group: group.to_owned(),
            index,
        };

        let table = slot_table_name(group);
        let slots = txn.open_table(slot_table(&table))?;
        let payload = slots.get(index)?.ok_or_else(corrupt)?;
        let raw = decompress(payload.value())?;
        if raw.len() != info.shape.len() {
            return Err(corrupt());
        }

        let shape = info.shape;
        let planar = Array3::from_shape_vec((shape.channels, shape.height, shape.width), raw)
            .map_err(|_| corrupt())?;

        Ok(from_channel_first(planar.view()))
    }

    /// Appends every `*.<extension>` file in `dir` whose name marks it as a
    /// roadmap or satellite tile to the matching group, in file name order.
    /// Other files are skipped.
    pub fn import_dir(&self, dir: &Path, extension: &str) -> Result<ImportSummary> {
        let mut files = fs::read_dir(dir)?
            .map(|entry| entry.map(|e| e.path()))
            .collect::<std::io::Result<Vec<_>>>()?;
        files.retain(|p| p.is_file() && p.extension().map_or(false, |e| e == extension));
        files.sort();

        let mut summary = ImportSummary::default();
        for file in files {
            let name = file
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();

            let group = if name.contains("Roadmap") {
                ROADMAP
            } else if name.contains("Satellite") {
                SATELLITE
            } else {
                warn!(file = %file.display(), "not a static map tile, skipping");
                summary.skipped += 1;
                continue;
            };

            let pixels = rgb_to_array(&image::open(&file)?.to_rgb8());
            self.append(group, pixels.view())?;

            match group {
                ROADMAP => summary.roadmap += 1,
                _ => summary.satellite += 1,
            }
        }

        info!(
            roadmap = summary.roadmap,
            satellite = summary.satellite,
            skipped = summary.skipped,
            "imported {}",
            dir.display()
        );
        Ok(summary)
    }

    /// Writes image `index` of an RGB group to an image file.
    pub fn export(&self, group: &str, index: u64, out: &Path) -> Result<()> {
        let pixels = self.read(group, index)?;
        let img = array_to_rgb(pixels.view()).ok_or_else(|| StoreError::NotRgb(group.to_owned()))?;
        img.save(out)?;

        Ok(())
    }
}

fn slot_table_name(group: &str) -> String {
    format!("{}{}", SLOT_TABLE_PREFIX, group)
}

fn slot_table(name: &str) -> TableDefinition<'_, u64, &'static [u8]> {
    TableDefinition::new(name)
}

fn compress(raw: &[u8]) -> std::io::Result<Vec<u8>> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(raw)?;
    encoder.finish()
}

fn decompress(payload: &[u8]) -> std::io::Result<Vec<u8>> {
    let mut raw = Vec::new();
    GzDecoder::new(payload).read_to_end(&mut raw)?;
    Ok(raw)
}
