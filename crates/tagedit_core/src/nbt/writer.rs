use std::io;

use super::variant::{ByteOrder, FormatVariant};
use crate::kind::TagKind;
use crate::tag::{NamedTag, Tag};

fn invalid(message: impl Into<String>) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, message.into())
}

/// Serialises a tag tree using a fixed variant.
pub struct TagWriter {
    out: Vec<u8>,
    variant: FormatVariant,
}

impl TagWriter {
    pub fn new(variant: FormatVariant) -> Self {
        Self {
            out: Vec::new(),
            variant,
        }
    }

    pub fn finish(self) -> Vec<u8> {
        self.out
    }

    pub fn write_named_root(&mut self, root: &NamedTag) -> io::Result<()> {
        self.write_u8(root.tag.kind().id());
        self.write_string(&root.name)?;
        self.write_payload(&root.tag)
    }

    pub fn write_u8(&mut self, v: u8) {
        self.out.push(v);
    }

    pub fn write_i16(&mut self, v: i16) {
        match self.variant.byte_order() {
            ByteOrder::Big => self.out.extend_from_slice(&v.to_be_bytes()),
            ByteOrder::Little => self.out.extend_from_slice(&v.to_le_bytes()),
        }
    }

    pub fn write_int(&mut self, v: i32) {
        if self.variant.uses_varints() {
            self.write_varint(((v << 1) ^ (v >> 31)) as u32 as u64);
            return;
        }
        match self.variant.byte_order() {
            ByteOrder::Big => self.out.extend_from_slice(&v.to_be_bytes()),
            ByteOrder::Little => self.out.extend_from_slice(&v.to_le_bytes()),
        }
    }

    pub fn write_long(&mut self, v: i64) {
        if self.variant.uses_varints() {
            self.write_varint(((v << 1) ^ (v >> 63)) as u64);
            return;
        }
        match self.variant.byte_order() {
            ByteOrder::Big => self.out.extend_from_slice(&v.to_be_bytes()),
            ByteOrder::Little => self.out.extend_from_slice(&v.to_le_bytes()),
        }
    }

    pub fn write_f32(&mut self, v: f32) {
        match self.variant.byte_order() {
            ByteOrder::Big => self.out.extend_from_slice(&v.to_be_bytes()),
            ByteOrder::Little => self.out.extend_from_slice(&v.to_le_bytes()),
        }
    }

    pub fn write_f64(&mut self, v: f64) {
        match self.variant.byte_order() {
            ByteOrder::Big => self.out.extend_from_slice(&v.to_be_bytes()),
            ByteOrder::Little => self.out.extend_from_slice(&v.to_le_bytes()),
        }
    }

    fn write_varint(&mut self, mut v: u64) {
        while v >= 0x80 {
            self.out.push((v as u8 & 0x7f) | 0x80);
            v >>= 7;
        }
        self.out.push(v as u8);
    }

    pub fn write_string(&mut self, s: &str) -> io::Result<()> {
        if self.variant.uses_varints() {
            let len = u32::try_from(s.len())
                .map_err(|_| invalid(format!("string of {} bytes is too long", s.len())))?;
            self.write_varint(len.into());
        } else {
            let len = u16::try_from(s.len()).map_err(|_| {
                invalid(format!(
                    "string of {} bytes exceeds the {} byte limit",
                    s.len(),
                    u16::MAX
                ))
            })?;
            self.write_i16(len as i16);
        }
        self.out.extend_from_slice(s.as_bytes());
        Ok(())
    }

    fn write_len(&mut self, len: usize, what: &str) -> io::Result<()> {
        let len = i32::try_from(len)
            .map_err(|_| invalid(format!("{what} of {len} elements is too long")))?;
        self.write_int(len);
        Ok(())
    }

    pub fn write_payload(&mut self, tag: &Tag) -> io::Result<()> {
        match tag {
            Tag::Byte(v) => self.write_u8(*v as u8),
            Tag::Short(v) => self.write_i16(*v),
            Tag::Int(v) => self.write_int(*v),
            Tag::Long(v) => self.write_long(*v),
            Tag::Float(v) => self.write_f32(*v),
            Tag::Double(v) => self.write_f64(*v),
            Tag::String(s) => self.write_string(s)?,
            Tag::ByteArray(values) => {
                self.write_len(values.len(), "byte array")?;
                self.out.extend(values.iter().map(|&b| b as u8));
            }
            Tag::IntArray(values) => {
                self.write_len(values.len(), "int array")?;
                for &v in values.iter() {
                    self.write_int(v);
                }
            }
            Tag::LongArray(values) => {
                self.write_len(values.len(), "long array")?;
                for &v in values.iter() {
                    self.write_long(v);
                }
            }
            Tag::List(list) => {
                if let Some((index, found)) = list.first_mismatch() {
                    return Err(invalid(format!(
                        "list of {} holds {} at index {}",
                        list.item_kind(),
                        found,
                        index
                    )));
                }
                self.write_u8(list.item_kind().id());
                self.write_len(list.len(), "list")?;
                for item in list {
                    self.write_payload(item)?;
                }
            }
            Tag::Compound(compound) => {
                for (name, child) in compound.iter() {
                    self.write_u8(child.kind().id());
                    self.write_string(name)?;
                    self.write_payload(child)?;
                }
                self.write_u8(TagKind::End.id());
            }
        }
        Ok(())
    }
}
