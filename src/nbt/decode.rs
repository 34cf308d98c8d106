//! Forgiving NBT decoder.
//!
//! Malformed input degrades to zero values instead of failing: a type
//! mismatch yields the zero value without consuming the type byte, and a read
//! past the end of the buffer yields the zero value and leaves the cursor at
//! the end so that enclosing loops stop. The only hard failures are an
//! unknown type byte inside a compound, after which the position in the
//! buffer is meaningless, and nesting deeper than [`MAX_DEPTH`].
use crate::error::DecodeError;
use crate::nbt::{Compound, List, Tag, TagKind, Value};
use byteorder::{BigEndian, ByteOrder};
use log::debug;

/// Maximum nesting of lists and compounds.
pub const MAX_DEPTH: usize = 512;

/// Decodes one tag of `kind` starting at `cursor`.
///
/// With `expect_tag` the byte at `cursor` must be the type id of `kind`, with
/// `expect_name` a length-prefixed name follows it. Returns the tag and the
/// cursor just past it.
pub fn decode(
    buffer: &[u8],
    cursor: usize,
    kind: TagKind,
    expect_tag: bool,
    expect_name: bool,
) -> Result<(Tag, usize), DecodeError> {
    let mut decoder = Decoder::new(buffer, cursor);
    let tag = decoder.decode_tag(kind, expect_tag, expect_name)?;

    Ok((tag, decoder.cursor))
}

/// Decodes the named root compound of a buffer.
pub fn parse_root(buffer: &[u8]) -> Result<Compound, DecodeError> {
    let (tag, _) = decode(buffer, 0, TagKind::Compound, true, true)?;

    match tag.into_value() {
        Value::Compound(compound) => Ok(compound),
        _ => Ok(Compound::new()),
    }
}

struct Decoder<'a> {
    buffer: &'a [u8],
    cursor: usize,
    depth: usize,
}

impl<'a> Decoder<'a> {
    fn new(buffer: &'a [u8], cursor: usize) -> Self {
        Decoder {
            buffer,
            cursor,
            depth: 0,
        }
    }

    fn is_exhausted(&self) -> bool {
        self.cursor >= self.buffer.len()
    }

    fn truncate(&mut self) {
        self.cursor = self.cursor.max(self.buffer.len());
    }

    fn peek_u8(&self) -> Option<u8> {
        self.buffer.get(self.cursor).copied()
    }

    /// Takes `length` bytes or moves the cursor to the end of the buffer.
    fn take(&mut self, length: usize) -> Option<&'a [u8]> {
        let end = match self.cursor.checked_add(length) {
            Some(end) if end <= self.buffer.len() => end,
            _ => {
                debug!(
                    target: "anvil-voxel",
                    "Truncated NBT: {} bytes requested at {}, buffer length {}",
                    length,
                    self.cursor,
                    self.buffer.len()
                );
                self.truncate();
                return None;
            }
        };

        let buffer = self.buffer;
        let bytes = &buffer[self.cursor..end];
        self.cursor = end;

        Some(bytes)
    }

    fn read_u8(&mut self) -> Option<u8> {
        self.take(1).map(|bytes| bytes[0])
    }

    fn read_u16(&mut self) -> Option<u16> {
        self.take(2).map(BigEndian::read_u16)
    }

    fn read_u32(&mut self) -> Option<u32> {
        self.take(4).map(BigEndian::read_u32)
    }

    fn read_u64(&mut self) -> Option<u64> {
        self.take(8).map(BigEndian::read_u64)
    }

    /// Reads a 32-bit element count, negative counts are empty.
    fn read_count(&mut self) -> Option<usize> {
        self.read_u32().map(|count| (count as i32).max(0) as usize)
    }

    /// Reads a string payload: 16-bit length followed by raw bytes.
    fn read_string(&mut self) -> Option<&'a [u8]> {
        let length = self.read_u16()?;
        self.take(length as usize)
    }

    fn decode_tag(
        &mut self,
        kind: TagKind,
        expect_tag: bool,
        expect_name: bool,
    ) -> Result<Tag, DecodeError> {
        if expect_tag {
            match self.peek_u8() {
                Some(type_id) if type_id == kind.id() => self.cursor += 1,
                Some(type_id) => {
                    debug!(
                        target: "anvil-voxel",
                        "Expected tag type {} at {} but found {}",
                        kind.id(),
                        self.cursor,
                        type_id
                    );
                    return Ok(Tag::anonymous(Value::zero(kind)));
                }
                None => {
                    self.truncate();
                    return Ok(Tag::anonymous(Value::zero(kind)));
                }
            }
        }

        // End markers never carry a name.
        let name = if expect_name && kind != TagKind::End {
            match self.read_string() {
                Some(bytes) => Some(String::from_utf8_lossy(bytes).into_owned()),
                None => return Ok(Tag::anonymous(Value::zero(kind))),
            }
        } else {
            None
        };

        let value = self.decode_payload(kind)?;

        Ok(Tag::new(name, value))
    }

    fn decode_payload(&mut self, kind: TagKind) -> Result<Value, DecodeError> {
        let value = match kind {
            TagKind::End => Some(Value::End),
            TagKind::Byte => self.read_u8().map(|v| Value::Byte(v as i8)),
            TagKind::Short => self.read_u16().map(|v| Value::Short(v as i16)),
            TagKind::Int => self.read_u32().map(|v| Value::Int(v as i32)),
            TagKind::Long => self.read_u64().map(|v| Value::Long(v as i64)),
            TagKind::Float => self.read_u32().map(|v| Value::Float(f32::from_bits(v))),
            TagKind::Double => self.read_u64().map(|v| Value::Double(f64::from_bits(v))),
            TagKind::ByteArray => self.decode_byte_array(),
            TagKind::String => self
                .read_string()
                .map(|bytes| Value::String(bytes.to_vec())),
            TagKind::IntArray => self.decode_int_array(),
            TagKind::List => return self.nested(Self::decode_list),
            TagKind::Compound => return self.nested(Self::decode_compound),
        };

        Ok(value.unwrap_or_else(|| Value::zero(kind)))
    }

    fn decode_byte_array(&mut self) -> Option<Value> {
        let count = self.read_count()?;
        let bytes = self.take(count)?;

        Some(Value::ByteArray(bytes.iter().map(|&b| b as i8).collect()))
    }

    fn decode_int_array(&mut self) -> Option<Value> {
        let count = self.read_count()?;
        let bytes = self.take(count.checked_mul(4)?)?;
        let values = bytes.chunks_exact(4).map(BigEndian::read_i32).collect();

        Some(Value::IntArray(values))
    }

    fn nested(
        &mut self,
        decode: fn(&mut Self) -> Result<Value, DecodeError>,
    ) -> Result<Value, DecodeError> {
        if self.depth >= MAX_DEPTH {
            return Err(DecodeError::NestingTooDeep {
                offset: self.cursor,
            });
        }

        self.depth += 1;
        let value = decode(self);
        self.depth -= 1;

        value
    }

    fn decode_list(&mut self) -> Result<Value, DecodeError> {
        let element_type_id = match self.read_u8() {
            Some(type_id) => type_id,
            None => return Ok(Value::zero(TagKind::List)),
        };

        let count = match self.read_count() {
            Some(count) => count,
            None => return Ok(Value::List(List::new(element_type_id))),
        };

        let element_kind = match TagKind::from_id(element_type_id) {
            Some(TagKind::End) => return Ok(Value::List(List::new(element_type_id))),
            Some(kind) => kind,
            None => {
                if count > 0 {
                    // Element width is unknown, nothing after this point can be located.
                    debug!(
                        target: "anvil-voxel",
                        "List of unknown type {} with {} elements at {}",
                        element_type_id,
                        count,
                        self.cursor
                    );
                    self.truncate();
                }

                return Ok(Value::List(List::new(element_type_id)));
            }
        };

        let mut values = Vec::new();

        for _ in 0..count {
            if self.is_exhausted() {
                break;
            }

            values.push(self.decode_payload(element_kind)?);
        }

        Ok(Value::List(List::with_values(element_type_id, values)))
    }

    fn decode_compound(&mut self) -> Result<Value, DecodeError> {
        let mut compound = Compound::new();

        loop {
            let type_id = match self.peek_u8() {
                Some(type_id) => type_id,
                None => {
                    self.truncate();
                    break;
                }
            };

            if type_id == TagKind::End.id() {
                self.cursor += 1;
                break;
            }

            let kind = TagKind::from_id(type_id).ok_or(DecodeError::UnknownTagType {
                type_id,
                offset: self.cursor,
            })?;

            compound.push(self.decode_tag(kind, true, true)?);
        }

        Ok(Value::Compound(compound))
    }
}
