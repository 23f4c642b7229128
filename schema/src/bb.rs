use crate::error::CodecError;
use crate::primitive::{ByteOrder, PrimitiveKind, PrimitiveType, PrimitiveValue};

/// A read that ran past the end of the buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Underflow {
    pub offset: usize,
    pub needed: usize,
    pub len: usize,
}

impl Underflow {
    /// Attaches the path of the element being decoded.
    pub fn at(self, path: &str) -> CodecError {
        CodecError::OutOfBounds {
            path: path.to_owned(),
            offset: self.offset,
            needed: self.needed,
            len: self.len,
        }
    }
}

macro_rules! read_number {
    ($name:ident, $ty:ty) => {
        pub fn $name(&mut self, order: ByteOrder) -> Result<$ty, Underflow> {
            let bytes = self.read_array()?;
            Ok(match order {
                ByteOrder::LittleEndian => <$ty>::from_le_bytes(bytes),
                ByteOrder::BigEndian => <$ty>::from_be_bytes(bytes),
            })
        }
    };
}

/// An SBE byte buffer meant for reading fixed-width primitives.
///
/// Example usage:
///
/// ```
/// use brine_sbe_schema::{ByteBuffer, ByteOrder};
/// let mut bb = ByteBuffer::new(&[0x2a, 0x00, 0x00, 0x01]);
/// assert_eq!(bb.read_u16(ByteOrder::LittleEndian), Ok(42));
/// assert_eq!(bb.read_u16(ByteOrder::BigEndian), Ok(1));
/// assert!(bb.read_u8().is_err());
/// ```
///
pub struct ByteBuffer<'a> {
    data: &'a [u8],
    index: usize,
}

impl<'a> ByteBuffer<'a> {
    /// Reads `data` from offset 0.
    pub fn new(data: &[u8]) -> ByteBuffer {
        ByteBuffer { data, index: 0 }
    }

    /// The whole message, independent of the read position.
    pub fn data(&self) -> &'a [u8] {
        self.data
    }

    /// Offset of the next read.
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn remaining(&self) -> usize {
        self.data.len() - self.index
    }

    /// Moves the read position. Seeking to the very end is allowed.
    pub fn seek(&mut self, index: usize) -> Result<(), Underflow> {
        if index > self.data.len() {
            return Err(Underflow {
                offset: self.index,
                needed: index - self.index.min(index),
                len: self.data.len(),
            });
        }
        self.index = index;
        Ok(())
    }

    /// Try to read `len` raw bytes starting at the current index.
    pub fn read_bytes(&mut self, len: usize) -> Result<&'a [u8], Underflow> {
        let end = self
            .index
            .checked_add(len)
            .filter(|end| *end <= self.data.len())
            .ok_or(Underflow {
                offset: self.index,
                needed: len,
                len: self.data.len(),
            })?;
        let value = &self.data[self.index..end];
        self.index = end;
        Ok(value)
    }

    fn read_array<const N: usize>(&mut self) -> Result<[u8; N], Underflow> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.read_bytes(N)?);
        Ok(out)
    }

    pub fn read_u8(&mut self) -> Result<u8, Underflow> {
        Ok(self.read_array::<1>()?[0])
    }

    pub fn read_i8(&mut self) -> Result<i8, Underflow> {
        Ok(self.read_u8()? as i8)
    }

    read_number!(read_u16, u16);
    read_number!(read_u32, u32);
    read_number!(read_u64, u64);
    read_number!(read_i16, i16);
    read_number!(read_i32, i32);
    read_number!(read_i64, i64);
    read_number!(read_f32, f32);
    read_number!(read_f64, f64);

    /// Reads one element of `primitive`. Integers widen to 64 bits and floats
    /// to `f64`; single-byte types ignore `order`.
    pub fn read_primitive(
        &mut self,
        primitive: PrimitiveType,
        order: ByteOrder,
    ) -> Result<PrimitiveValue, Underflow> {
        Ok(match primitive {
            PrimitiveType::Char | PrimitiveType::Uint8 => PrimitiveValue::UInt(self.read_u8()? as u64),
            PrimitiveType::Uint16 => PrimitiveValue::UInt(self.read_u16(order)? as u64),
            PrimitiveType::Uint32 => PrimitiveValue::UInt(self.read_u32(order)? as u64),
            PrimitiveType::Uint64 => PrimitiveValue::UInt(self.read_u64(order)?),
            PrimitiveType::Int8 => PrimitiveValue::Int(self.read_i8()? as i64),
            PrimitiveType::Int16 => PrimitiveValue::Int(self.read_i16(order)? as i64),
            PrimitiveType::Int32 => PrimitiveValue::Int(self.read_i32(order)? as i64),
            PrimitiveType::Int64 => PrimitiveValue::Int(self.read_i64(order)?),
            PrimitiveType::Float => PrimitiveValue::Float(self.read_f32(order)? as f64),
            PrimitiveType::Double => PrimitiveValue::Float(self.read_f64(order)?),
        })
    }

    /// Reads an unsigned length or count. Negative values from signed
    /// encodings come back as `None`.
    pub fn read_unsigned(
        &mut self,
        primitive: PrimitiveType,
        order: ByteOrder,
    ) -> Result<Option<u64>, Underflow> {
        Ok(self.read_primitive(primitive, order)?.as_u64())
    }
}

#[test]
fn read_u8_and_bytes() {
    let data = [1, 2, 3, 4, 5];
    let mut bb = ByteBuffer::new(&data);
    assert_eq!(bb.read_u8(), Ok(1));
    assert_eq!(bb.read_bytes(2), Ok(&data[1..3]));
    assert_eq!(bb.remaining(), 2);
    assert_eq!(
        bb.read_bytes(3),
        Err(Underflow { offset: 3, needed: 3, len: 5 })
    );
    assert_eq!(bb.index(), 3);
}

#[test]
fn read_both_byte_orders() {
    let data = [0x01, 0x02, 0x03, 0x04];
    let mut bb = ByteBuffer::new(&data);
    assert_eq!(bb.read_u32(ByteOrder::LittleEndian), Ok(0x04030201));
    bb.seek(0).unwrap();
    assert_eq!(bb.read_u32(ByteOrder::BigEndian), Ok(0x01020304));
    bb.seek(0).unwrap();
    assert_eq!(bb.read_i16(ByteOrder::BigEndian), Ok(0x0102));
    assert_eq!(bb.read_u16(ByteOrder::LittleEndian), Ok(0x0403));
}

#[test]
fn read_primitive_widens() {
    let data = [0xff, 0xff, 0xff, 0xff, 0x00, 0x00, 0xc0, 0x3f];
    let mut bb = ByteBuffer::new(&data);
    assert_eq!(
        bb.read_primitive(PrimitiveType::Int32, ByteOrder::LittleEndian),
        Ok(PrimitiveValue::Int(-1))
    );
    assert_eq!(
        bb.read_primitive(PrimitiveType::Float, ByteOrder::LittleEndian),
        Ok(PrimitiveValue::Float(1.5))
    );
    bb.seek(0).unwrap();
    assert_eq!(
        bb.read_primitive(PrimitiveType::Uint16, ByteOrder::BigEndian),
        Ok(PrimitiveValue::UInt(65535))
    );
    bb.seek(0).unwrap();
    assert_eq!(bb.read_unsigned(PrimitiveType::Int8, ByteOrder::LittleEndian), Ok(None));
}

#[test]
fn seek_bounds() {
    let mut bb = ByteBuffer::new(&[0, 0]);
    assert_eq!(bb.seek(2), Ok(()));
    assert!(bb.seek(3).is_err());
    assert!(bb.read_u8().is_err());
}

macro_rules! write_number {
    ($name:ident, $ty:ty) => {
        pub fn $name(&mut self, value: $ty, order: ByteOrder) {
            match order {
                ByteOrder::LittleEndian => self.data.extend_from_slice(&value.to_le_bytes()),
                ByteOrder::BigEndian => self.data.extend_from_slice(&value.to_be_bytes()),
            }
        }
    };
}

/// An SBE byte buffer meant for writing.
///
/// Blocks are reserved up front with [`pad_to`](#method.pad_to) and filled in
/// with [`put_primitive`](#method.put_primitive), so a field's position only
/// depends on its offset. Variable-length sections are appended.
///
/// Example usage:
///
/// ```
/// use brine_sbe_schema::{ByteBufferMut, ByteOrder};
/// let mut bb = ByteBufferMut::new();
/// bb.write_u16(0x0102, ByteOrder::BigEndian);
/// bb.write_u16(0x0102, ByteOrder::LittleEndian);
/// assert_eq!(bb.data(), [1, 2, 2, 1]);
/// ```
///
#[derive(Debug, Default)]
pub struct ByteBufferMut {
    data: Vec<u8>,
}

impl ByteBufferMut {
    /// An empty message buffer.
    pub fn new() -> ByteBufferMut {
        ByteBufferMut { data: vec![] }
    }

    /// Consumes this buffer and returns the underlying backing store.
    pub fn data(self) -> Vec<u8> {
        self.data
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    /// Returns the number of bytes written so far.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Zero-fills the buffer up to `len` bytes. Does nothing if it is already
    /// that long.
    pub fn pad_to(&mut self, len: usize) {
        if self.data.len() < len {
            self.data.resize(len, 0);
        }
    }

    /// Appends var-data payloads and char arrays as-is.
    pub fn write_bytes(&mut self, value: &[u8]) {
        self.data.extend_from_slice(value);
    }

    pub fn write_u8(&mut self, value: u8) {
        self.data.push(value);
    }

    write_number!(write_u16, u16);
    write_number!(write_u32, u32);
    write_number!(write_u64, u64);
    write_number!(write_i16, i16);
    write_number!(write_i32, i32);
    write_number!(write_i64, i64);
    write_number!(write_f32, f32);
    write_number!(write_f64, f64);

    /// Appends one element of `primitive`. Fails if `value` is the wrong shape
    /// or out of range for the primitive.
    pub fn write_primitive(
        &mut self,
        primitive: PrimitiveType,
        order: ByteOrder,
        value: &PrimitiveValue,
    ) -> Result<(), ()> {
        let at = self.data.len();
        self.pad_to(at + primitive.size());
        let result = self.put_primitive(at, primitive, order, value);
        if result.is_err() {
            self.data.truncate(at);
        }
        result
    }

    /// Overwrites one element of `primitive` at `at`, which must already be
    /// inside the buffer.
    pub fn put_primitive(
        &mut self,
        at: usize,
        primitive: PrimitiveType,
        order: ByteOrder,
        value: &PrimitiveValue,
    ) -> Result<(), ()> {
        let size = primitive.size();
        if at + size > self.data.len() {
            return Err(());
        }

        let bits: u64 = match primitive.kind() {
            PrimitiveKind::Char | PrimitiveKind::Unsigned => {
                let v = value.as_u64().ok_or(())?;
                if v > primitive.max_unsigned() {
                    return Err(());
                }
                v
            }
            PrimitiveKind::Signed => {
                let v = value.as_i64().ok_or(())?;
                if v < primitive.min_signed() || v > primitive.max_signed() {
                    return Err(());
                }
                v as u64
            }
            PrimitiveKind::Float => {
                let v = value.as_f64().ok_or(())?;
                if primitive == PrimitiveType::Float {
                    (v as f32).to_bits() as u64
                } else {
                    v.to_bits()
                }
            }
        };

        // The low `size` bytes of `bits` hold the value in either order.
        let le = bits.to_le_bytes();
        let slot = &mut self.data[at..at + size];
        match order {
            ByteOrder::LittleEndian => slot.copy_from_slice(&le[..size]),
            ByteOrder::BigEndian => {
                for (i, byte) in slot.iter_mut().enumerate() {
                    *byte = le[size - 1 - i];
                }
            }
        }
        Ok(())
    }
}

#[test]
fn write_both_byte_orders() {
    let mut bb = ByteBufferMut::new();
    bb.write_u32(0x01020304, ByteOrder::LittleEndian);
    bb.write_u32(0x01020304, ByteOrder::BigEndian);
    bb.write_i16(-2, ByteOrder::BigEndian);
    assert_eq!(bb.data(), [4, 3, 2, 1, 1, 2, 3, 4, 0xff, 0xfe]);
}

#[test]
fn put_primitive_matches_typed_writers() {
    for order in [ByteOrder::LittleEndian, ByteOrder::BigEndian] {
        let mut typed = ByteBufferMut::new();
        typed.write_i32(-3, order);
        typed.write_u64(7, order);
        typed.write_f32(1.5, order);
        typed.write_f64(-0.25, order);

        let mut generic = ByteBufferMut::new();
        generic.write_primitive(PrimitiveType::Int32, order, &PrimitiveValue::Int(-3)).unwrap();
        generic.write_primitive(PrimitiveType::Uint64, order, &PrimitiveValue::UInt(7)).unwrap();
        generic.write_primitive(PrimitiveType::Float, order, &PrimitiveValue::Float(1.5)).unwrap();
        generic.write_primitive(PrimitiveType::Double, order, &PrimitiveValue::Float(-0.25)).unwrap();

        assert_eq!(typed.data(), generic.data());
    }
}

#[test]
fn write_primitive_range_checks() {
    let mut bb = ByteBufferMut::new();
    assert_eq!(bb.write_primitive(PrimitiveType::Uint8, ByteOrder::LittleEndian, &PrimitiveValue::UInt(256)), Err(()));
    assert_eq!(bb.write_primitive(PrimitiveType::Int8, ByteOrder::LittleEndian, &PrimitiveValue::Int(-129)), Err(()));
    assert_eq!(bb.write_primitive(PrimitiveType::Uint16, ByteOrder::LittleEndian, &PrimitiveValue::Int(-1)), Err(()));
    assert_eq!(bb.write_primitive(PrimitiveType::Int64, ByteOrder::LittleEndian, &PrimitiveValue::UInt(u64::MAX)), Err(()));
    assert!(bb.is_empty());
    assert_eq!(bb.write_primitive(PrimitiveType::Int8, ByteOrder::BigEndian, &PrimitiveValue::Int(-128)), Ok(()));
    assert_eq!(bb.data(), [0x80]);
}

#[test]
fn endianness_is_observable() {
    let mut bb = ByteBufferMut::new();
    bb.write_primitive(PrimitiveType::Uint32, ByteOrder::BigEndian, &PrimitiveValue::UInt(42)).unwrap();
    let data = bb.data();
    let mut read = ByteBuffer::new(&data);
    assert_eq!(read.read_u32(ByteOrder::LittleEndian), Ok(42 << 24));
}

#[test]
fn pad_and_put() {
    let mut bb = ByteBufferMut::new();
    bb.pad_to(6);
    bb.put_primitive(2, PrimitiveType::Uint16, ByteOrder::BigEndian, &PrimitiveValue::UInt(0x0a0b)).unwrap();
    assert_eq!(bb.put_primitive(5, PrimitiveType::Uint16, ByteOrder::BigEndian, &PrimitiveValue::UInt(1)), Err(()));
    bb.pad_to(3);
    assert_eq!(bb.data(), [0, 0, 0x0a, 0x0b, 0, 0]);
}
