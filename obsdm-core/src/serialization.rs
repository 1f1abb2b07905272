//! # Attribute Codec
//!
//! Endian-aware read/write of primitive attribute values against a byte
//! stream. The byte order is fixed when the stream is constructed; when it
//! differs from the platform's native order, bytes are swapped around every
//! I/O call. Text is length-prefixed (i32 count of UTF-8 bytes).
//!
//! Reads that run past the available bytes, or whose declared lengths are
//! inconsistent with the actual content, fail with
//! [`Error::MalformedStream`].

use std::io::{Read, Write};

use byteorder::{BigEndian, LittleEndian, ReadBytesExt, WriteBytesExt};

use crate::error::{Error, Result};
use crate::types::{ArrayTime, Entity, EntityId, Tag};
use crate::value::{ColumnType, Value};

/// Byte order of a binary stream, selected at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ByteOrder {
    /// The platform's native order.
    Native,
    #[default]
    Little,
    Big,
}

impl ByteOrder {
    fn is_little(self) -> bool {
        match self {
            ByteOrder::Little => true,
            ByteOrder::Big => false,
            ByteOrder::Native => cfg!(target_endian = "little"),
        }
    }
}

macro_rules! write_prim {
    ($name:ident, $ty:ty, $method:ident) => {
        pub fn $name(&mut self, v: $ty) -> Result<()> {
            if self.little {
                self.inner.$method::<LittleEndian>(v)?;
            } else {
                self.inner.$method::<BigEndian>(v)?;
            }
            Ok(())
        }
    };
}

macro_rules! read_prim {
    ($name:ident, $ty:ty, $method:ident) => {
        pub fn $name(&mut self) -> Result<$ty> {
            let v = if self.little {
                self.inner.$method::<LittleEndian>()
            } else {
                self.inner.$method::<BigEndian>()
            };
            v.map_err(map_eof)
        }
    };
}

/// Writer half of the attribute codec.
pub struct BinWriter<W: Write> {
    inner: W,
    little: bool,
}

impl<W: Write> BinWriter<W> {
    pub fn new(inner: W, order: ByteOrder) -> Self {
        Self { inner, little: order.is_little() }
    }

    pub fn write_bool(&mut self, v: bool) -> Result<()> {
        self.inner.write_u8(v as u8)?;
        Ok(())
    }

    pub fn write_byte(&mut self, v: u8) -> Result<()> {
        self.inner.write_u8(v)?;
        Ok(())
    }

    write_prim!(write_short, i16, write_i16);
    write_prim!(write_int, i32, write_i32);
    write_prim!(write_long, i64, write_i64);
    write_prim!(write_float, f32, write_f32);
    write_prim!(write_double, f64, write_f64);

    pub fn write_text(&mut self, s: &str) -> Result<()> {
        self.write_int(s.len() as i32)?;
        self.inner.write_all(s.as_bytes())?;
        Ok(())
    }

    /// Serialize one value. Enumerations and tags are written as their
    /// literal text form; sequences as rank, extents, then row-major values.
    pub fn write_value(&mut self, value: &Value) -> Result<()> {
        match value {
            Value::Bool(v) => self.write_bool(*v),
            Value::Byte(v) => self.write_byte(*v),
            Value::Short(v) => self.write_short(*v),
            Value::Int(v) => self.write_int(*v),
            Value::Long(v) => self.write_long(*v),
            Value::Float(v) => self.write_float(*v),
            Value::Double(v) => self.write_double(*v),
            Value::Text(s) => self.write_text(s),
            Value::Time(t) => self.write_long(t.get()),
            Value::Tag(t) => self.write_text(&t.to_string()),
            Value::Enum(name) => self.write_text(name),
            Value::IntSeq(seq) => {
                self.write_int(1)?;
                self.write_int(seq.len() as i32)?;
                for v in seq {
                    self.write_int(*v)?;
                }
                Ok(())
            }
            Value::DoubleSeq(seq) => {
                self.write_int(1)?;
                self.write_int(seq.len() as i32)?;
                for v in seq {
                    self.write_double(*v)?;
                }
                Ok(())
            }
            Value::DoubleMat(mat) => {
                let cols = mat.first().map_or(0, Vec::len);
                if mat.iter().any(|line| line.len() != cols) {
                    return Err(Error::conversion("matrix value is not rectangular"));
                }
                self.write_int(2)?;
                self.write_int(mat.len() as i32)?;
                self.write_int(cols as i32)?;
                for line in mat {
                    for v in line {
                        self.write_double(*v)?;
                    }
                }
                Ok(())
            }
        }
    }

    pub fn write_entity(&mut self, entity: &Entity) -> Result<()> {
        self.write_text(entity.id.as_str())?;
        self.write_text(&entity.type_name)?;
        self.write_text(&entity.version)
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}

/// Reader half of the attribute codec.
pub struct BinReader<R: Read> {
    inner: R,
    little: bool,
}

impl<R: Read> BinReader<R> {
    pub fn new(inner: R, order: ByteOrder) -> Self {
        Self { inner, little: order.is_little() }
    }

    pub fn read_bool(&mut self) -> Result<bool> {
        match self.inner.read_u8().map_err(map_eof)? {
            0 => Ok(false),
            1 => Ok(true),
            b => Err(Error::malformed(format!("invalid boolean byte 0x{:02x}", b))),
        }
    }

    pub fn read_byte(&mut self) -> Result<u8> {
        self.inner.read_u8().map_err(map_eof)
    }

    read_prim!(read_short, i16, read_i16);
    read_prim!(read_int, i32, read_i32);
    read_prim!(read_long, i64, read_i64);
    read_prim!(read_float, f32, read_f32);
    read_prim!(read_double, f64, read_f64);

    pub fn read_text(&mut self) -> Result<String> {
        let len = self.read_int()?;
        if len < 0 {
            return Err(Error::malformed(format!("negative text length {}", len)));
        }
        let mut buf = vec![0u8; len as usize];
        self.inner.read_exact(&mut buf).map_err(map_eof)?;
        String::from_utf8(buf).map_err(|_| Error::malformed("text is not valid UTF-8"))
    }

    /// Deserialize one value of the given type, mirroring
    /// [`BinWriter::write_value`].
    pub fn read_value(&mut self, ctype: ColumnType) -> Result<Value> {
        Ok(match ctype {
            ColumnType::Bool => Value::Bool(self.read_bool()?),
            ColumnType::Byte => Value::Byte(self.read_byte()?),
            ColumnType::Short => Value::Short(self.read_short()?),
            ColumnType::Int => Value::Int(self.read_int()?),
            ColumnType::Long => Value::Long(self.read_long()?),
            ColumnType::Float => Value::Float(self.read_float()?),
            ColumnType::Double => Value::Double(self.read_double()?),
            ColumnType::Text => Value::Text(self.read_text()?),
            ColumnType::Time => Value::Time(ArrayTime(self.read_long()?)),
            ColumnType::Tag => {
                let text = self.read_text()?;
                Value::Tag(text.parse::<Tag>().map_err(|_| {
                    Error::malformed(format!("invalid tag literal '{}'", text))
                })?)
            }
            ColumnType::Enum => {
                let name = self.read_text()?;
                if name.is_empty() {
                    return Err(Error::malformed("empty enumeration literal"));
                }
                Value::Enum(name)
            }
            ColumnType::IntSeq => {
                let len = self.read_extent(1)?;
                let mut seq = Vec::with_capacity(len);
                for _ in 0..len {
                    seq.push(self.read_int()?);
                }
                Value::IntSeq(seq)
            }
            ColumnType::DoubleSeq => {
                let len = self.read_extent(1)?;
                let mut seq = Vec::with_capacity(len);
                for _ in 0..len {
                    seq.push(self.read_double()?);
                }
                Value::DoubleSeq(seq)
            }
            ColumnType::DoubleMat => {
                self.expect_rank(2)?;
                let rows = self.read_len()?;
                let cols = self.read_len()?;
                let mut mat = Vec::with_capacity(rows);
                for _ in 0..rows {
                    let mut line = Vec::with_capacity(cols);
                    for _ in 0..cols {
                        line.push(self.read_double()?);
                    }
                    mat.push(line);
                }
                Value::DoubleMat(mat)
            }
        })
    }

    pub fn read_entity(&mut self) -> Result<Entity> {
        let id = self.read_text()?;
        let id = EntityId::parse(&id)
            .map_err(|_| Error::malformed(format!("invalid entity id '{}'", id)))?;
        let type_name = self.read_text()?;
        let version = self.read_text()?;
        Ok(Entity::new(id, type_name, version))
    }

    fn expect_rank(&mut self, rank: i32) -> Result<()> {
        let got = self.read_int()?;
        if got != rank {
            return Err(Error::malformed(format!(
                "expected rank-{} sequence, got rank {}",
                rank, got
            )));
        }
        Ok(())
    }

    fn read_len(&mut self) -> Result<usize> {
        let len = self.read_int()?;
        if len < 0 {
            return Err(Error::malformed(format!("negative sequence extent {}", len)));
        }
        Ok(len as usize)
    }

    fn read_extent(&mut self, rank: i32) -> Result<usize> {
        self.expect_rank(rank)?;
        self.read_len()
    }
}

fn map_eof(err: std::io::Error) -> Error {
    if err.kind() == std::io::ErrorKind::UnexpectedEof {
        Error::malformed("unexpected end of stream")
    } else {
        err.into()
    }
}
