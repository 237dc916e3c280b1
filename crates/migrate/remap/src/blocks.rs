//! The packed-block rewriter.
//!
//! Each vertical section stores its 4096 cell identifiers split across a
//! `Blocks` byte array (low bytes) and an optional `Add` array holding the
//! high nybbles, packed little-endian: the low nybble of `Add[i/2]` belongs
//! to the even cell, the high nybble to the odd cell. The conceptual cell
//! value is `(high << 8) | low`, range 0..=4095.

use log::trace;

use worldshift_mapping::MapInfo;
use worldshift_nbt::{Tag, TagCompound};

use crate::{nav, RemapError};


pub const SECTION_CELLS: usize = 4096;
pub const ADD_BYTES: usize = SECTION_CELLS / 2;

/// Remaps every section of a chunk through the block table. An identifier
/// without a mapping aborts the migration.
pub fn remap_sections(chunk: &mut TagCompound, map: &MapInfo) -> Result<(), RemapError> {
    let sections = nav::sections_mut(chunk)?;
    let mut done = 0usize;
    for section in sections.compounds_mut() {
        remap_section(section, map)?;
        done += 1;
    }
    trace!("remapped {done} section(s)");
    Ok(())
}

/// Remaps one section compound in place, re-emitting `Blocks` and either a
/// fresh `Add` (if any mapped cell exceeds 255) or no `Add` at all.
pub fn remap_section(section: &mut TagCompound, map: &MapInfo) -> Result<(), RemapError> {
    let blocks = require_byte_array(section, "Blocks", SECTION_CELLS)?;
    let add = match section.get("Add") {
        Some(tag) => Some(
            tag.as_byte_array()
                .ok_or_else(|| RemapError::WrongKind {
                    name:     "Add".to_owned(),
                    expected: "ByteArray".to_owned(),
                    found:    tag.kind(),
                })
                .and_then(|bytes| expect_len(bytes, "Add", ADD_BYTES))?,
        ),
        None => None,
    };

    let mut cells = decode_cells(blocks, add);

    let mut any_high = false;
    for cell in &mut cells {
        let old = i32::from(*cell);
        let new = map.remap_block(old).ok_or(RemapError::UnmappedBlock(old))?;
        if !(0..=0xFFF).contains(&new) {
            return Err(RemapError::BlockIdOutOfRange(new));
        }
        *cell = new as u16;
        if new > 0xFF {
            any_high = true;
        }
    }

    let (low, high) = encode_cells(&cells);
    section.insert("Blocks", Tag::ByteArray(low));
    if any_high {
        section.insert("Add", Tag::ByteArray(high));
    } else {
        section.remove("Add");
    }
    Ok(())
}

/// Widens the split byte arrays into one 16-bit cell per block.
pub fn decode_cells(blocks: &[u8], add: Option<&[u8]>) -> Vec<u16> {
    match add {
        None => blocks.iter().map(|&low| u16::from(low)).collect(),
        Some(add) => blocks
            .iter()
            .enumerate()
            .map(|(i, &low)| {
                let packed = add[i / 2];
                let high = if i & 1 == 0 { packed & 0x0F } else { packed >> 4 };
                (u16::from(high) << 8) | u16::from(low)
            })
            .collect(),
    }
}

/// Splits cells back into the low-byte array and the packed high-nybble
/// array. The caller decides whether the high array is worth keeping.
pub fn encode_cells(cells: &[u16]) -> (Vec<u8>, Vec<u8>) {
    let low = cells.iter().map(|&cell| (cell & 0xFF) as u8).collect();
    let high = cells
        .chunks_exact(2)
        .map(|pair| ((pair[0] >> 8) as u8 & 0x0F) | (((pair[1] >> 8) as u8 & 0x0F) << 4))
        .collect();
    (low, high)
}

fn require_byte_array<'t>(
    section: &'t TagCompound,
    name: &'static str,
    expected: usize,
) -> Result<&'t [u8], RemapError> {
    match section.get(name) {
        Some(tag) => match tag.as_byte_array() {
            Some(bytes) => expect_len(bytes, name, expected),
            None => Err(RemapError::WrongKind {
                name:     name.to_owned(),
                expected: "ByteArray".to_owned(),
                found:    tag.kind(),
            }),
        },
        None => Err(RemapError::MissingChild(name.to_owned())),
    }
}

fn expect_len<'t>(
    bytes: &'t [u8],
    name: &'static str,
    expected: usize,
) -> Result<&'t [u8], RemapError> {
    if bytes.len() == expected {
        Ok(bytes)
    } else {
        Err(RemapError::BadArrayLength {
            name,
            expected,
            found: bytes.len(),
        })
    }
}
