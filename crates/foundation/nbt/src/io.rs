use std::io::{Read, Write};

use flate2::Compression;
use flate2::{
    read::{GzDecoder, ZlibDecoder},
    write::{GzEncoder, ZlibEncoder},
};
use thiserror::Error;

use crate::raw;
use crate::{Tag, TagCompound, TagKind, TagList};


/// The maximum nesting depth accepted when reading or writing, matching what
/// the game itself enforces.
pub const DEPTH_LIMIT: u32 = 512;

/// How a tag tree is framed on disk.
///
/// Chunk blobs use [`Zlib`](Framing::Zlib); player files and `level.dat` use
/// [`Gzip`](Framing::Gzip). Compressed output is always written at the
/// maximum compression level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Framing {
    Plain,
    Zlib,
    Gzip,
}

/// Describes an error which occurred while reading or writing binary tag
/// data.
#[derive(Debug, Error)]
pub enum NbtError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid tag id {0:#04x}")]
    InvalidTagId(u8),
    #[error("root tag has id {0:#04x}, expected a compound (0x0a)")]
    InvalidRoot(u8),
    #[error("non-empty list of End tags")]
    NonEmptyEndList,
    #[error("string is not valid modified UTF-8")]
    InvalidString,
    #[error("negative length prefix")]
    NegativeLength,
    #[error("length {0} does not fit the wire format")]
    ExcessiveLength(usize),
    #[error("exceeded nesting depth limit of {DEPTH_LIMIT}")]
    DepthLimit,
}

/// Reads a framed tag tree, returning the root compound and its name.
///
/// The root must be a named compound; any other root tag is an error.
pub fn read_tree<R: Read>(
    reader: &mut R,
    framing: Framing,
) -> Result<(TagCompound, String), NbtError> {
    match framing {
        Framing::Plain => read_tree_plain(reader),
        Framing::Zlib => read_tree_plain(&mut ZlibDecoder::new(reader)),
        Framing::Gzip => read_tree_plain(&mut GzDecoder::new(reader)),
    }
}

/// Writes a framed tag tree with the given root name.
pub fn write_tree<W: Write>(
    writer: &mut W,
    framing: Framing,
    root_name: &str,
    root: &TagCompound,
) -> Result<(), NbtError> {
    match framing {
        Framing::Plain => write_tree_plain(writer, root_name, root),
        Framing::Zlib => {
            let mut encoder = ZlibEncoder::new(writer, Compression::best());
            write_tree_plain(&mut encoder, root_name, root)?;
            encoder.finish()?;
            Ok(())
        }
        Framing::Gzip => {
            let mut encoder = GzEncoder::new(writer, Compression::best());
            write_tree_plain(&mut encoder, root_name, root)?;
            encoder.finish()?;
            Ok(())
        }
    }
}

/// Convenience wrapper serializing to a fresh byte vector.
pub fn tree_to_bytes(
    framing: Framing,
    root_name: &str,
    root: &TagCompound,
) -> Result<Vec<u8>, NbtError> {
    let mut bytes = Vec::new();
    write_tree(&mut bytes, framing, root_name, root)?;
    Ok(bytes)
}

fn read_tree_plain<R: Read>(reader: &mut R) -> Result<(TagCompound, String), NbtError> {
    let root_id = raw::read_u8(reader)?;
    if root_id != TagKind::Compound.id() {
        return Err(NbtError::InvalidRoot(root_id));
    }

    let root_name = raw::read_string(reader)?;
    let root = read_compound_body(reader, 0)?;
    Ok((root, root_name))
}

fn write_tree_plain<W: Write>(
    writer: &mut W,
    root_name: &str,
    root: &TagCompound,
) -> Result<(), NbtError> {
    raw::write_u8(writer, TagKind::Compound.id())?;
    raw::write_string(writer, root_name)?;
    write_compound_body(writer, root, 0)
}

fn read_compound_body<R: Read>(
    reader: &mut R,
    depth: u32,
) -> Result<TagCompound, NbtError> {
    if depth >= DEPTH_LIMIT {
        return Err(NbtError::DepthLimit);
    }

    let mut compound = TagCompound::new();
    loop {
        let tag_id = raw::read_u8(reader)?;
        if tag_id == TagKind::End.id() {
            return Ok(compound);
        }

        let kind = TagKind::from_id(tag_id).ok_or(NbtError::InvalidTagId(tag_id))?;
        let name = raw::read_string(reader)?;
        let tag = read_tag_body(reader, kind, depth + 1)?;
        compound.insert(name, tag);
    }
}

fn read_tag_body<R: Read>(
    reader: &mut R,
    kind: TagKind,
    depth: u32,
) -> Result<Tag, NbtError> {
    let tag = match kind {
        TagKind::End    => return Err(NbtError::InvalidTagId(TagKind::End.id())),
        TagKind::Byte   => Tag::Byte  (raw::read_i8 (reader)?),
        TagKind::Short  => Tag::Short (raw::read_i16(reader)?),
        TagKind::Int    => Tag::Int   (raw::read_i32(reader)?),
        TagKind::Long   => Tag::Long  (raw::read_i64(reader)?),
        TagKind::Float  => Tag::Float (raw::read_f32(reader)?),
        TagKind::Double => Tag::Double(raw::read_f64(reader)?),
        TagKind::ByteArray => {
            let len = raw::read_len(reader)?;
            let mut bytes = vec![0; len];
            reader.read_exact(&mut bytes)?;
            Tag::ByteArray(bytes)
        }
        TagKind::String => Tag::String(raw::read_string(reader)?),
        TagKind::List => {
            let element_id = raw::read_u8(reader)?;
            let element_kind =
                TagKind::from_id(element_id).ok_or(NbtError::InvalidTagId(element_id))?;
            let len = raw::read_len(reader)?;

            if element_kind == TagKind::End {
                if len > 0 {
                    return Err(NbtError::NonEmptyEndList);
                }
                return Ok(Tag::List(TagList::new()));
            }

            if depth >= DEPTH_LIMIT {
                return Err(NbtError::DepthLimit);
            }

            let mut list = TagList::with_kind(element_kind);
            for _ in 0..len {
                let element = read_tag_body(reader, element_kind, depth + 1)?;
                // Cannot mismatch: every element was read as element_kind.
                let _ = list.push(element);
            }
            Tag::List(list)
        }
        TagKind::Compound => Tag::Compound(read_compound_body(reader, depth)?),
        TagKind::IntArray => {
            let len = raw::read_len(reader)?;
            let mut ints = Vec::with_capacity(len.min(1 << 16));
            for _ in 0..len {
                ints.push(raw::read_i32(reader)?);
            }
            Tag::IntArray(ints)
        }
        TagKind::LongArray => {
            let len = raw::read_len(reader)?;
            let mut longs = Vec::with_capacity(len.min(1 << 16));
            for _ in 0..len {
                longs.push(raw::read_i64(reader)?);
            }
            Tag::LongArray(longs)
        }
    };

    Ok(tag)
}

fn write_compound_body<W: Write>(
    writer: &mut W,
    compound: &TagCompound,
    depth: u32,
) -> Result<(), NbtError> {
    if depth >= DEPTH_LIMIT && !compound.is_empty() {
        return Err(NbtError::DepthLimit);
    }

    for (name, tag) in compound {
        raw::write_u8(writer, tag.kind().id())?;
        raw::write_string(writer, name)?;
        write_tag_body(writer, tag, depth + 1)?;
    }
    raw::write_u8(writer, TagKind::End.id())?;
    Ok(())
}

fn write_tag_body<W: Write>(writer: &mut W, tag: &Tag, depth: u32) -> Result<(), NbtError> {
    match tag {
        &Tag::Byte  (value) => raw::write_i8 (writer, value)?,
        &Tag::Short (value) => raw::write_i16(writer, value)?,
        &Tag::Int   (value) => raw::write_i32(writer, value)?,
        &Tag::Long  (value) => raw::write_i64(writer, value)?,
        &Tag::Float (value) => raw::write_f32(writer, value)?,
        &Tag::Double(value) => raw::write_f64(writer, value)?,
        Tag::ByteArray(bytes) => {
            raw::write_len(writer, bytes.len())?;
            writer.write_all(bytes)?;
        }
        Tag::String(string) => raw::write_string(writer, string)?,
        Tag::List(list) => {
            raw::write_u8(writer, list.kind().id())?;
            raw::write_len(writer, list.len())?;

            if depth >= DEPTH_LIMIT && !list.is_empty() {
                return Err(NbtError::DepthLimit);
            }

            for element in list {
                write_tag_body(writer, element, depth + 1)?;
            }
        }
        Tag::Compound(compound) => write_compound_body(writer, compound, depth)?,
        Tag::IntArray(ints) => {
            raw::write_len(writer, ints.len())?;
            for &int in ints {
                raw::write_i32(writer, int)?;
            }
        }
        Tag::LongArray(longs) => {
            raw::write_len(writer, longs.len())?;
            for &long in longs {
                raw::write_i64(writer, long)?;
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_tree() -> TagCompound {
        let mut inner = TagCompound::new();
        inner.insert("id", Tag::Short(4));
        inner.insert("Damage", Tag::Short(0));

        let mut list = TagList::new();
        list.push(Tag::Compound(inner)).unwrap();

        let mut root = TagCompound::new();
        root.insert("byte", Tag::Byte(-3));
        root.insert("short", Tag::Short(-260));
        root.insert("int", Tag::Int(1 << 20));
        root.insert("long", Tag::Long(-(1 << 40)));
        root.insert("float", Tag::Float(0.5));
        root.insert("double", Tag::Double(-2.25));
        root.insert("bytes", Tag::ByteArray(vec![0x00, 0x7F, 0x80, 0xFF]));
        root.insert("string", Tag::String("hello \u{263A}".to_owned()));
        root.insert("items", Tag::List(list));
        root.insert("empty", Tag::List(TagList::new()));
        root.insert("ints", Tag::IntArray(vec![-1, 0, 1]));
        root.insert("longs", Tag::LongArray(vec![i64::MIN, i64::MAX]));
        root
    }

    #[test]
    fn plain_round_trip() {
        let root = sample_tree();
        let bytes = tree_to_bytes(Framing::Plain, "", &root).unwrap();

        let (read_back, name) = read_tree(&mut bytes.as_slice(), Framing::Plain).unwrap();
        assert_eq!(name, "");
        assert_eq!(read_back, root);

        // Serialization is deterministic.
        let again = tree_to_bytes(Framing::Plain, "", &read_back).unwrap();
        assert_eq!(again, bytes);
    }

    #[test]
    fn zlib_and_gzip_round_trip() {
        let root = sample_tree();
        for framing in [Framing::Zlib, Framing::Gzip] {
            let bytes = tree_to_bytes(framing, "root", &root).unwrap();
            let (read_back, name) = read_tree(&mut bytes.as_slice(), framing).unwrap();
            assert_eq!(name, "root");
            assert_eq!(read_back, root);
        }
    }

    #[test]
    fn empty_list_round_trips_with_end_kind() {
        let mut root = TagCompound::new();
        root.insert("empty", Tag::List(TagList::new()));

        let bytes = tree_to_bytes(Framing::Plain, "", &root).unwrap();
        let (read_back, _) = read_tree(&mut bytes.as_slice(), Framing::Plain).unwrap();

        let list = read_back.get("empty").and_then(Tag::as_list).unwrap();
        assert!(list.is_empty());
        assert_eq!(list.kind(), TagKind::End);
    }

    #[test]
    fn non_compound_root_is_rejected() {
        // A root Byte tag: id 0x1, empty name, value.
        let bytes = [0x01, 0x00, 0x00, 0x2A];
        let err = read_tree(&mut bytes.as_slice(), Framing::Plain).unwrap_err();
        assert!(matches!(err, NbtError::InvalidRoot(0x01)));
    }

    #[test]
    fn nonempty_end_list_is_rejected() {
        // Compound root containing a list with element kind End and length 1.
        let bytes = [
            0x0A, 0x00, 0x00, // compound, empty name
            0x09, 0x00, 0x01, b'l', // list named "l"
            0x00, // element kind End
            0x00, 0x00, 0x00, 0x01, // length 1
            0x00, // TAG_End for the compound
        ];
        let err = read_tree(&mut bytes.as_slice(), Framing::Plain).unwrap_err();
        assert!(matches!(err, NbtError::NonEmptyEndList));
    }
}
