use std::borrow::Cow;
use std::io::{Read, Result as IoResult, Write};

use byteorder::{BigEndian, ReadBytesExt as _, WriteBytesExt as _};

use crate::io::NbtError;


// The disk format is big-endian throughout, with strings in the modified
// UTF-8 (CESU-8) flavor the original game engine writes.

pub(crate) fn read_u8<R: Read>(reader: &mut R) -> IoResult<u8> {
    reader.read_u8()
}

pub(crate) fn read_i8<R: Read>(reader: &mut R) -> IoResult<i8> {
    reader.read_i8()
}

pub(crate) fn read_i16<R: Read>(reader: &mut R) -> IoResult<i16> {
    reader.read_i16::<BigEndian>()
}

pub(crate) fn read_i32<R: Read>(reader: &mut R) -> IoResult<i32> {
    reader.read_i32::<BigEndian>()
}

pub(crate) fn read_i64<R: Read>(reader: &mut R) -> IoResult<i64> {
    reader.read_i64::<BigEndian>()
}

pub(crate) fn read_f32<R: Read>(reader: &mut R) -> IoResult<f32> {
    reader.read_f32::<BigEndian>()
}

pub(crate) fn read_f64<R: Read>(reader: &mut R) -> IoResult<f64> {
    reader.read_f64::<BigEndian>()
}

pub(crate) fn read_len<R: Read>(reader: &mut R) -> Result<usize, NbtError> {
    usize::try_from(read_i32(reader)?).map_err(|_| NbtError::NegativeLength)
}

pub(crate) fn read_string<R: Read>(reader: &mut R) -> Result<String, NbtError> {
    let len = usize::from(reader.read_u16::<BigEndian>()?);
    let mut bytes = vec![0; len];
    reader.read_exact(&mut bytes)?;

    match cesu8::from_java_cesu8(&bytes) {
        Ok(string) => Ok(string.into_owned()),
        Err(_) => Err(NbtError::InvalidString),
    }
}

pub(crate) fn write_u8<W: Write>(writer: &mut W, value: u8) -> IoResult<()> {
    writer.write_u8(value)
}

pub(crate) fn write_i8<W: Write>(writer: &mut W, value: i8) -> IoResult<()> {
    writer.write_i8(value)
}

pub(crate) fn write_i16<W: Write>(writer: &mut W, value: i16) -> IoResult<()> {
    writer.write_i16::<BigEndian>(value)
}

pub(crate) fn write_i32<W: Write>(writer: &mut W, value: i32) -> IoResult<()> {
    writer.write_i32::<BigEndian>(value)
}

pub(crate) fn write_i64<W: Write>(writer: &mut W, value: i64) -> IoResult<()> {
    writer.write_i64::<BigEndian>(value)
}

pub(crate) fn write_f32<W: Write>(writer: &mut W, value: f32) -> IoResult<()> {
    writer.write_f32::<BigEndian>(value)
}

pub(crate) fn write_f64<W: Write>(writer: &mut W, value: f64) -> IoResult<()> {
    writer.write_f64::<BigEndian>(value)
}

pub(crate) fn write_len<W: Write>(writer: &mut W, len: usize) -> Result<(), NbtError> {
    let len = i32::try_from(len).map_err(|_| NbtError::ExcessiveLength(len))?;
    Ok(write_i32(writer, len)?)
}

pub(crate) fn write_string<W: Write>(writer: &mut W, string: &str) -> Result<(), NbtError> {
    let bytes: Cow<'_, [u8]> = cesu8::to_java_cesu8(string);
    let len = u16::try_from(bytes.len()).map_err(|_| NbtError::ExcessiveLength(bytes.len()))?;

    writer.write_u16::<BigEndian>(len)?;
    writer.write_all(&bytes)?;
    Ok(())
}
