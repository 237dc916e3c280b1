//! Reading and writing the packed region containers that hold chunk blobs.
//!
//! A region file is a sequence of 4096-byte sectors. Sector 0 holds 1024
//! big-endian location words, one per chunk slot, each packing a sector
//! offset in the high 24 bits and a sector count in the low 8. Sector 1
//! holds 1024 big-endian timestamps. Each chunk record starts with a
//! big-endian payload length (which counts the scheme byte), one compression
//! scheme byte, and the compressed tag tree, padded out to whole sectors.

use std::fs;
use std::io::{Read as _, Write as _};
use std::path::{Path, PathBuf};

use flate2::Compression;
use flate2::{
    read::{GzDecoder, ZlibDecoder},
    write::{GzEncoder, ZlibEncoder},
};
use log::warn;
use subslice_to_array::SubsliceToArray as _;
use thiserror::Error;


const SECTOR_BYTES: usize = 4096;
const SLOT_COUNT: usize = 1024;
const HEADER_BYTES: usize = 2 * SECTOR_BYTES;

#[derive(Debug, Error)]
pub enum RegionError {
    #[error("failed to access region file {path}: {source}")]
    Io {
        path:   PathBuf,
        source: std::io::Error,
    },
    #[error("region file is {0} bytes, too short for its header")]
    TruncatedHeader(usize),
    #[error("chunk slot {slot}: record at sector {sector} runs past the end of the file")]
    RecordOutOfBounds { slot: usize, sector: u32 },
    #[error("chunk slot {slot}: unknown compression scheme {scheme}")]
    UnknownScheme { slot: usize, scheme: u8 },
    #[error("chunk slot {slot}: {source}")]
    Codec {
        slot:   usize,
        source: std::io::Error,
    },
    #[error("chunk slot {slot}: record of {len} bytes does not fit the sector map")]
    OversizedRecord { slot: usize, len: usize },
}

/// How a single chunk record is compressed on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scheme {
    Gzip,
    Zlib,
}

impl Scheme {
    fn from_id(id: u8) -> Option<Self> {
        match id {
            1 => Some(Self::Gzip),
            2 => Some(Self::Zlib),
            _ => None,
        }
    }

    fn id(self) -> u8 {
        match self {
            Self::Gzip => 1,
            Self::Zlib => 2,
        }
    }
}

/// One still-compressed chunk record.
#[derive(Debug, Clone)]
pub struct ChunkRecord {
    pub timestamp: u32,
    pub scheme:    Scheme,
    payload:       Vec<u8>,
}

impl ChunkRecord {
    /// Builds a fresh record from uncompressed tag tree bytes.
    pub fn new(timestamp: u32, scheme: Scheme, plain: &[u8]) -> Result<Self, RegionError> {
        let mut record = Self {
            timestamp,
            scheme,
            payload: Vec::new(),
        };
        record.recompress(0, plain)?;
        Ok(record)
    }

    /// Inflates the record into the raw tag tree bytes.
    pub fn decompress(&self, slot: usize) -> Result<Vec<u8>, RegionError> {
        let mut bytes = Vec::new();
        let result = match self.scheme {
            Scheme::Gzip => GzDecoder::new(self.payload.as_slice()).read_to_end(&mut bytes),
            Scheme::Zlib => ZlibDecoder::new(self.payload.as_slice()).read_to_end(&mut bytes),
        };
        result.map_err(|source| RegionError::Codec { slot, source })?;
        Ok(bytes)
    }

    /// Replaces the payload with `bytes` compressed at the maximum level,
    /// keeping the record's scheme and timestamp.
    pub fn recompress(&mut self, slot: usize, bytes: &[u8]) -> Result<(), RegionError> {
        let mut payload = Vec::new();
        let result = match self.scheme {
            Scheme::Gzip => {
                let mut encoder = GzEncoder::new(&mut payload, Compression::best());
                encoder.write_all(bytes).and_then(|()| encoder.finish().map(|_| ()))
            }
            Scheme::Zlib => {
                let mut encoder = ZlibEncoder::new(&mut payload, Compression::best());
                encoder.write_all(bytes).and_then(|()| encoder.finish().map(|_| ()))
            }
        };
        result.map_err(|source| RegionError::Codec { slot, source })?;
        self.payload = payload;
        Ok(())
    }
}

/// An in-memory region container: 1024 chunk slots, any of which may be
/// empty.
#[derive(Debug)]
pub struct RegionFile {
    slots: Vec<Option<ChunkRecord>>,
}

impl RegionFile {
    /// A region with every slot empty.
    pub fn empty() -> Self {
        Self {
            slots: (0..SLOT_COUNT).map(|_| None).collect(),
        }
    }

    /// Places a record into a slot (0..1024), replacing any previous one.
    pub fn set_chunk(&mut self, slot: usize, record: ChunkRecord) {
        if slot < SLOT_COUNT {
            self.slots[slot] = Some(record);
        }
    }

    pub fn read(path: &Path) -> Result<Self, RegionError> {
        let bytes = fs::read(path).map_err(|source| RegionError::Io {
            path: path.to_owned(),
            source,
        })?;
        Self::from_bytes(&bytes)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, RegionError> {
        // A fresh, never-written region may be fully empty.
        if bytes.is_empty() {
            return Ok(Self::empty());
        }
        if bytes.len() < HEADER_BYTES {
            return Err(RegionError::TruncatedHeader(bytes.len()));
        }

        let mut slots = Vec::with_capacity(SLOT_COUNT);
        for slot in 0..SLOT_COUNT {
            let location = read_header_word(bytes, slot * 4);
            let timestamp = read_header_word(bytes, SECTOR_BYTES + slot * 4);

            let sector = location >> 8;
            let sector_count = location & 0xFF;
            if sector_count == 0 {
                slots.push(None);
                continue;
            }

            let start = sector as usize * SECTOR_BYTES;
            let end = start + sector_count as usize * SECTOR_BYTES;
            if start < HEADER_BYTES || end > bytes.len() {
                return Err(RegionError::RecordOutOfBounds { slot, sector });
            }

            let record = &bytes[start..end];
            let len = u32::from_be_bytes(record.subslice_to_array::<0, 4>()) as usize;
            if len == 0 {
                warn!("chunk slot {slot} has an empty record, treating as absent");
                slots.push(None);
                continue;
            }
            if 4 + len > record.len() {
                return Err(RegionError::RecordOutOfBounds { slot, sector });
            }

            let scheme_id = record[4];
            let scheme = Scheme::from_id(scheme_id).ok_or(RegionError::UnknownScheme {
                slot,
                scheme: scheme_id,
            })?;

            slots.push(Some(ChunkRecord {
                timestamp,
                scheme,
                // `len` counts the scheme byte.
                payload: record[5..4 + len].to_vec(),
            }));
        }

        Ok(Self { slots })
    }

    pub fn write(&self, path: &Path) -> Result<(), RegionError> {
        let bytes = self.to_bytes()?;
        fs::write(path, bytes).map_err(|source| RegionError::Io {
            path: path.to_owned(),
            source,
        })
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, RegionError> {
        let mut locations = vec![0u8; SECTOR_BYTES];
        let mut timestamps = vec![0u8; SECTOR_BYTES];
        let mut body: Vec<u8> = Vec::new();

        let mut next_sector: u32 = 2;
        for (slot, record) in self.slots.iter().enumerate() {
            let Some(record) = record else {
                continue;
            };

            let record_len = 4 + 1 + record.payload.len();
            let sector_count = record_len.div_ceil(SECTOR_BYTES);
            if sector_count > 0xFF {
                return Err(RegionError::OversizedRecord {
                    slot,
                    len: record_len,
                });
            }

            let location = (next_sector << 8) | sector_count as u32;
            locations[slot * 4..slot * 4 + 4].copy_from_slice(&location.to_be_bytes());
            timestamps[slot * 4..slot * 4 + 4].copy_from_slice(&record.timestamp.to_be_bytes());

            let payload_len = record.payload.len() as u32 + 1;
            body.extend_from_slice(&payload_len.to_be_bytes());
            body.push(record.scheme.id());
            body.extend_from_slice(&record.payload);
            // Pad to a sector boundary.
            body.resize(sector_count * SECTOR_BYTES + body.len() - record_len, 0);

            next_sector += sector_count as u32;
        }

        let mut bytes = Vec::with_capacity(HEADER_BYTES + body.len());
        bytes.extend_from_slice(&locations);
        bytes.extend_from_slice(&timestamps);
        bytes.extend_from_slice(&body);
        Ok(bytes)
    }

    /// The occupied slots, in slot order.
    pub fn chunks_mut(&mut self) -> impl Iterator<Item = (usize, &mut ChunkRecord)> {
        self.slots
            .iter_mut()
            .enumerate()
            .filter_map(|(slot, record)| record.as_mut().map(|record| (slot, record)))
    }

    pub fn chunk_count(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_some()).count()
    }
}

fn read_header_word(bytes: &[u8], offset: usize) -> u32 {
    u32::from_be_bytes([
        bytes[offset],
        bytes[offset + 1],
        bytes[offset + 2],
        bytes[offset + 3],
    ])
}

/// Parses a region filename of the form `r.<x>.<z>.mca`.
pub fn parse_region_name(name: &str) -> Option<(i32, i32)> {
    let rest = name.strip_prefix("r.")?;
    let rest = rest.strip_suffix(".mca")?;
    let (x, z) = rest.split_once('.')?;
    Some((x.parse().ok()?, z.parse().ok()?))
}
