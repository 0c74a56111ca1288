use std::io;

use super::variant::{ByteOrder, FormatVariant};
use crate::kind::TagKind;
use crate::tag::{Compound, List, NamedTag, Tag};

fn invalid(message: impl Into<String>) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, message.into())
}

/// Reads one tag tree from a byte slice using a fixed variant.
pub struct TagReader<'a> {
    data: &'a [u8],
    pos: usize,
    variant: FormatVariant,
    max_depth: usize,
}

impl<'a> TagReader<'a> {
    pub fn new(data: &'a [u8], variant: FormatVariant, max_depth: usize) -> Self {
        Self {
            data,
            pos: 0,
            variant,
            max_depth,
        }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    pub fn read_named_root(&mut self) -> io::Result<NamedTag> {
        let kind = self.read_kind()?;
        if kind == TagKind::End {
            return Err(invalid("root tag cannot be an end tag"));
        }
        let name = self.read_string()?;
        let tag = self.read_payload(kind, 0)?;
        Ok(NamedTag { name, tag })
    }

    fn read_bytes(&mut self, n: usize) -> io::Result<&'a [u8]> {
        if self.remaining() < n {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!(
                    "need {n} bytes at offset {:#x}, only {} left",
                    self.pos,
                    self.remaining()
                ),
            ));
        }
        let slice = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    fn read_array<const N: usize>(&mut self) -> io::Result<[u8; N]> {
        let mut buf = [0u8; N];
        buf.copy_from_slice(self.read_bytes(N)?);
        Ok(buf)
    }

    pub fn read_u8(&mut self) -> io::Result<u8> {
        Ok(self.read_array::<1>()?[0])
    }

    pub fn read_i8(&mut self) -> io::Result<i8> {
        Ok(self.read_u8()? as i8)
    }

    pub fn read_i16(&mut self) -> io::Result<i16> {
        let buf = self.read_array()?;
        Ok(match self.variant.byte_order() {
            ByteOrder::Big => i16::from_be_bytes(buf),
            ByteOrder::Little => i16::from_le_bytes(buf),
        })
    }

    fn read_u16(&mut self) -> io::Result<u16> {
        Ok(self.read_i16()? as u16)
    }

    fn read_fixed_i32(&mut self) -> io::Result<i32> {
        let buf = self.read_array()?;
        Ok(match self.variant.byte_order() {
            ByteOrder::Big => i32::from_be_bytes(buf),
            ByteOrder::Little => i32::from_le_bytes(buf),
        })
    }

    fn read_fixed_i64(&mut self) -> io::Result<i64> {
        let buf = self.read_array()?;
        Ok(match self.variant.byte_order() {
            ByteOrder::Big => i64::from_be_bytes(buf),
            ByteOrder::Little => i64::from_le_bytes(buf),
        })
    }

    pub fn read_f32(&mut self) -> io::Result<f32> {
        let buf = self.read_array()?;
        Ok(match self.variant.byte_order() {
            ByteOrder::Big => f32::from_be_bytes(buf),
            ByteOrder::Little => f32::from_le_bytes(buf),
        })
    }

    pub fn read_f64(&mut self) -> io::Result<f64> {
        let buf = self.read_array()?;
        Ok(match self.variant.byte_order() {
            ByteOrder::Big => f64::from_be_bytes(buf),
            ByteOrder::Little => f64::from_le_bytes(buf),
        })
    }

    pub fn read_int(&mut self) -> io::Result<i32> {
        if self.variant.uses_varints() {
            let raw = self.read_varint(32)? as u32;
            Ok(((raw >> 1) as i32) ^ -((raw & 1) as i32))
        } else {
            self.read_fixed_i32()
        }
    }

    pub fn read_long(&mut self) -> io::Result<i64> {
        if self.variant.uses_varints() {
            let raw = self.read_varint(64)?;
            Ok(((raw >> 1) as i64) ^ -((raw & 1) as i64))
        } else {
            self.read_fixed_i64()
        }
    }

    /// LEB128 unsigned varint holding at most `bits` bits.
    fn read_varint(&mut self, bits: u32) -> io::Result<u64> {
        let start = self.pos;
        let overflow = || invalid(format!("varint at offset {start:#x} overflows {bits} bits"));
        let mut value = 0u64;
        let mut shift = 0u32;
        loop {
            if shift >= bits {
                return Err(overflow());
            }
            let byte = self.read_u8()?;
            value |= u64::from(byte & 0x7f) << shift;
            if byte & 0x80 == 0 {
                break;
            }
            shift += 7;
        }
        if bits < 64 && value >> bits != 0 {
            return Err(overflow());
        }
        Ok(value)
    }

    pub fn read_string(&mut self) -> io::Result<String> {
        let len = if self.variant.uses_varints() {
            self.read_varint(32)? as usize
        } else {
            self.read_u16()? as usize
        };
        let start = self.pos;
        let bytes = self.read_bytes(len)?;
        std::str::from_utf8(bytes)
            .map(str::to_string)
            .map_err(|e| invalid(format!("string at offset {start:#x} is not UTF-8: {e}")))
    }

    fn read_kind(&mut self) -> io::Result<TagKind> {
        let id = self.read_u8()?;
        TagKind::from_id(id)
            .ok_or_else(|| invalid(format!("unknown tag type {id} at offset {:#x}", self.pos - 1)))
    }

    /// Collection length; every element occupies at least `min_width` bytes,
    /// which bounds allocations by the input size.
    fn read_len(&mut self, min_width: usize, what: &str) -> io::Result<usize> {
        let start = self.pos;
        let len = self.read_int()?;
        if len < 0 {
            return Err(invalid(format!(
                "negative {what} length {len} at offset {start:#x}"
            )));
        }
        let len = len as usize;
        if len.saturating_mul(min_width) > self.remaining() {
            return Err(invalid(format!(
                "{what} length {len} at offset {start:#x} exceeds remaining input"
            )));
        }
        Ok(len)
    }

    fn int_width(&self) -> usize {
        if self.variant.uses_varints() { 1 } else { 4 }
    }

    fn long_width(&self) -> usize {
        if self.variant.uses_varints() { 1 } else { 8 }
    }

    fn read_payload(&mut self, kind: TagKind, depth: usize) -> io::Result<Tag> {
        let tag = match kind {
            TagKind::End => return Err(invalid("unexpected end tag")),
            TagKind::Byte => Tag::Byte(self.read_i8()?),
            TagKind::Short => Tag::Short(self.read_i16()?),
            TagKind::Int => Tag::Int(self.read_int()?),
            TagKind::Long => Tag::Long(self.read_long()?),
            TagKind::Float => Tag::Float(self.read_f32()?),
            TagKind::Double => Tag::Double(self.read_f64()?),
            TagKind::String => Tag::String(self.read_string()?),
            TagKind::ByteArray => {
                let len = self.read_len(1, "byte array")?;
                let bytes = self.read_bytes(len)?;
                Tag::ByteArray(bytes.iter().map(|&b| b as i8).collect())
            }
            TagKind::IntArray => {
                let len = self.read_len(self.int_width(), "int array")?;
                let values = (0..len)
                    .map(|_| self.read_int())
                    .collect::<io::Result<Vec<_>>>()?;
                Tag::IntArray(values.into())
            }
            TagKind::LongArray => {
                let len = self.read_len(self.long_width(), "long array")?;
                let values = (0..len)
                    .map(|_| self.read_long())
                    .collect::<io::Result<Vec<_>>>()?;
                Tag::LongArray(values.into())
            }
            TagKind::List => {
                self.check_depth(depth)?;
                let item_kind = self.read_kind()?;
                let len = self.read_len(1, "list")?;
                if len > 0 && item_kind == TagKind::End {
                    return Err(invalid(format!("list of end tags with {len} items")));
                }
                let mut items = Vec::with_capacity(len);
                for _ in 0..len {
                    items.push(self.read_payload(item_kind, depth + 1)?);
                }
                Tag::List(List::new(item_kind, items).map_err(|e| invalid(e.to_string()))?)
            }
            TagKind::Compound => {
                self.check_depth(depth)?;
                let mut entries = Vec::new();
                loop {
                    let child_kind = self.read_kind()?;
                    if child_kind == TagKind::End {
                        break;
                    }
                    let name = self.read_string()?;
                    let child = self.read_payload(child_kind, depth + 1)?;
                    entries.push((name, child));
                }
                Tag::Compound(Compound::from_entries(entries).map_err(|e| invalid(e.to_string()))?)
            }
        };
        Ok(tag)
    }

    fn check_depth(&self, depth: usize) -> io::Result<()> {
        if depth >= self.max_depth {
            return Err(invalid(format!(
                "nesting deeper than {} levels at offset {:#x}",
                self.max_depth, self.pos
            )));
        }
        Ok(())
    }
}
