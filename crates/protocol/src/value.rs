//! Channel value model
//!
//! A monitored channel delivers scalar or fixed-element-type array values.
//! `ValueType` is the one-byte wire code; array codes are the scalar code
//! plus [`ARRAY_TYPE_OFFSET`].

use crate::{ProtocolError, Result};

/// Wire code offset distinguishing array types from their scalar element type
pub const ARRAY_TYPE_OFFSET: u8 = 10;

/// One-byte value-type code carried in every log frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ValueType {
    Int8 = 0,
    Int16 = 1,
    Int32 = 2,
    Int64 = 3,
    UInt8 = 4,
    UInt16 = 5,
    UInt32 = 6,
    UInt64 = 7,
    Float32 = 8,
    Float64 = 9,
    ArrayInt8 = 10,
    ArrayInt16 = 11,
    ArrayInt32 = 12,
    ArrayInt64 = 13,
    ArrayUInt8 = 14,
    ArrayUInt16 = 15,
    ArrayUInt32 = 16,
    ArrayUInt64 = 17,
    ArrayFloat32 = 18,
    ArrayFloat64 = 19,
}

impl ValueType {
    /// Convert to the wire code
    #[inline]
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    /// Parse from the wire code
    pub fn from_u8(code: u8) -> Result<Self> {
        Ok(match code {
            0 => Self::Int8,
            1 => Self::Int16,
            2 => Self::Int32,
            3 => Self::Int64,
            4 => Self::UInt8,
            5 => Self::UInt16,
            6 => Self::UInt32,
            7 => Self::UInt64,
            8 => Self::Float32,
            9 => Self::Float64,
            10 => Self::ArrayInt8,
            11 => Self::ArrayInt16,
            12 => Self::ArrayInt32,
            13 => Self::ArrayInt64,
            14 => Self::ArrayUInt8,
            15 => Self::ArrayUInt16,
            16 => Self::ArrayUInt32,
            17 => Self::ArrayUInt64,
            18 => Self::ArrayFloat32,
            19 => Self::ArrayFloat64,
            other => return Err(ProtocolError::InvalidValueType(other)),
        })
    }

    /// Element size in bytes
    pub fn element_size(self) -> usize {
        match self {
            Self::Int8 | Self::UInt8 | Self::ArrayInt8 | Self::ArrayUInt8 => 1,
            Self::Int16 | Self::UInt16 | Self::ArrayInt16 | Self::ArrayUInt16 => 2,
            Self::Int32 | Self::UInt32 | Self::Float32 | Self::ArrayInt32 | Self::ArrayUInt32
            | Self::ArrayFloat32 => 4,
            Self::Int64 | Self::UInt64 | Self::Float64 | Self::ArrayInt64 | Self::ArrayUInt64
            | Self::ArrayFloat64 => 8,
        }
    }

    /// Whether this is an array type
    #[inline]
    pub fn is_array(self) -> bool {
        self.as_u8() >= ARRAY_TYPE_OFFSET
    }
}

/// A channel value: scalar or fixed-element-type array
///
/// Numeric widths mirror what the upstream control system delivers; no
/// implicit widening happens on the way to the wire.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Int8(i8),
    Int16(i16),
    Int32(i32),
    Int64(i64),
    UInt8(u8),
    UInt16(u16),
    UInt32(u32),
    UInt64(u64),
    Float32(f32),
    Float64(f64),
    ArrayInt8(Vec<i8>),
    ArrayInt16(Vec<i16>),
    ArrayInt32(Vec<i32>),
    ArrayInt64(Vec<i64>),
    ArrayUInt8(Vec<u8>),
    ArrayUInt16(Vec<u16>),
    ArrayUInt32(Vec<u32>),
    ArrayUInt64(Vec<u64>),
    ArrayFloat32(Vec<f32>),
    ArrayFloat64(Vec<f64>),
}

macro_rules! push_le {
    ($buf:expr, $v:expr) => {
        $buf.extend_from_slice(&$v.to_le_bytes())
    };
}

macro_rules! decode_array {
    ($bytes:expr, $ty:ty, $variant:ident) => {{
        const W: usize = std::mem::size_of::<$ty>();
        if $bytes.len() % W != 0 {
            return Err(ProtocolError::invalid_frame(format!(
                "value payload length {} not a multiple of element size {}",
                $bytes.len(),
                W
            )));
        }
        let elems = $bytes
            .chunks_exact(W)
            .map(|c| <$ty>::from_le_bytes(c.try_into().expect("chunk width")))
            .collect();
        Value::$variant(elems)
    }};
}

macro_rules! decode_scalar {
    ($bytes:expr, $ty:ty, $variant:ident) => {{
        const W: usize = std::mem::size_of::<$ty>();
        let arr: [u8; W] = $bytes
            .try_into()
            .map_err(|_| ProtocolError::too_short(W, $bytes.len()))?;
        Value::$variant(<$ty>::from_le_bytes(arr))
    }};
}

impl Value {
    /// The wire type code for this value
    pub fn type_tag(&self) -> ValueType {
        match self {
            Self::Int8(_) => ValueType::Int8,
            Self::Int16(_) => ValueType::Int16,
            Self::Int32(_) => ValueType::Int32,
            Self::Int64(_) => ValueType::Int64,
            Self::UInt8(_) => ValueType::UInt8,
            Self::UInt16(_) => ValueType::UInt16,
            Self::UInt32(_) => ValueType::UInt32,
            Self::UInt64(_) => ValueType::UInt64,
            Self::Float32(_) => ValueType::Float32,
            Self::Float64(_) => ValueType::Float64,
            Self::ArrayInt8(_) => ValueType::ArrayInt8,
            Self::ArrayInt16(_) => ValueType::ArrayInt16,
            Self::ArrayInt32(_) => ValueType::ArrayInt32,
            Self::ArrayInt64(_) => ValueType::ArrayInt64,
            Self::ArrayUInt8(_) => ValueType::ArrayUInt8,
            Self::ArrayUInt16(_) => ValueType::ArrayUInt16,
            Self::ArrayUInt32(_) => ValueType::ArrayUInt32,
            Self::ArrayUInt64(_) => ValueType::ArrayUInt64,
            Self::ArrayFloat32(_) => ValueType::ArrayFloat32,
            Self::ArrayFloat64(_) => ValueType::ArrayFloat64,
        }
    }

    /// Serialize elements as contiguous little-endian bytes
    pub fn to_le_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(self.byte_len());
        match self {
            Self::Int8(v) => push_le!(buf, v),
            Self::Int16(v) => push_le!(buf, v),
            Self::Int32(v) => push_le!(buf, v),
            Self::Int64(v) => push_le!(buf, v),
            Self::UInt8(v) => push_le!(buf, v),
            Self::UInt16(v) => push_le!(buf, v),
            Self::UInt32(v) => push_le!(buf, v),
            Self::UInt64(v) => push_le!(buf, v),
            Self::Float32(v) => push_le!(buf, v),
            Self::Float64(v) => push_le!(buf, v),
            Self::ArrayInt8(vs) => vs.iter().for_each(|v| push_le!(buf, v)),
            Self::ArrayInt16(vs) => vs.iter().for_each(|v| push_le!(buf, v)),
            Self::ArrayInt32(vs) => vs.iter().for_each(|v| push_le!(buf, v)),
            Self::ArrayInt64(vs) => vs.iter().for_each(|v| push_le!(buf, v)),
            Self::ArrayUInt8(vs) => buf.extend_from_slice(vs),
            Self::ArrayUInt16(vs) => vs.iter().for_each(|v| push_le!(buf, v)),
            Self::ArrayUInt32(vs) => vs.iter().for_each(|v| push_le!(buf, v)),
            Self::ArrayUInt64(vs) => vs.iter().for_each(|v| push_le!(buf, v)),
            Self::ArrayFloat32(vs) => vs.iter().for_each(|v| push_le!(buf, v)),
            Self::ArrayFloat64(vs) => vs.iter().for_each(|v| push_le!(buf, v)),
        }
        buf
    }

    /// Deserialize from little-endian bytes and a type code
    pub fn from_le_bytes(value_type: ValueType, bytes: &[u8]) -> Result<Self> {
        Ok(match value_type {
            ValueType::Int8 => decode_scalar!(bytes, i8, Int8),
            ValueType::Int16 => decode_scalar!(bytes, i16, Int16),
            ValueType::Int32 => decode_scalar!(bytes, i32, Int32),
            ValueType::Int64 => decode_scalar!(bytes, i64, Int64),
            ValueType::UInt8 => decode_scalar!(bytes, u8, UInt8),
            ValueType::UInt16 => decode_scalar!(bytes, u16, UInt16),
            ValueType::UInt32 => decode_scalar!(bytes, u32, UInt32),
            ValueType::UInt64 => decode_scalar!(bytes, u64, UInt64),
            ValueType::Float32 => decode_scalar!(bytes, f32, Float32),
            ValueType::Float64 => decode_scalar!(bytes, f64, Float64),
            ValueType::ArrayInt8 => decode_array!(bytes, i8, ArrayInt8),
            ValueType::ArrayInt16 => decode_array!(bytes, i16, ArrayInt16),
            ValueType::ArrayInt32 => decode_array!(bytes, i32, ArrayInt32),
            ValueType::ArrayInt64 => decode_array!(bytes, i64, ArrayInt64),
            ValueType::ArrayUInt8 => Value::ArrayUInt8(bytes.to_vec()),
            ValueType::ArrayUInt16 => decode_array!(bytes, u16, ArrayUInt16),
            ValueType::ArrayUInt32 => decode_array!(bytes, u32, ArrayUInt32),
            ValueType::ArrayUInt64 => decode_array!(bytes, u64, ArrayUInt64),
            ValueType::ArrayFloat32 => decode_array!(bytes, f32, ArrayFloat32),
            ValueType::ArrayFloat64 => decode_array!(bytes, f64, ArrayFloat64),
        })
    }

    /// Serialized length in bytes
    pub fn byte_len(&self) -> usize {
        let elem = self.type_tag().element_size();
        match self {
            Self::ArrayInt8(v) => v.len() * elem,
            Self::ArrayInt16(v) => v.len() * elem,
            Self::ArrayInt32(v) => v.len() * elem,
            Self::ArrayInt64(v) => v.len() * elem,
            Self::ArrayUInt8(v) => v.len() * elem,
            Self::ArrayUInt16(v) => v.len() * elem,
            Self::ArrayUInt32(v) => v.len() * elem,
            Self::ArrayUInt64(v) => v.len() * elem,
            Self::ArrayFloat32(v) => v.len() * elem,
            Self::ArrayFloat64(v) => v.len() * elem,
            _ => elem,
        }
    }

    /// Best-effort f64 view of a scalar value, for diagnostics
    pub fn as_f64(&self) -> Option<f64> {
        Some(match self {
            Self::Int8(v) => *v as f64,
            Self::Int16(v) => *v as f64,
            Self::Int32(v) => *v as f64,
            Self::Int64(v) => *v as f64,
            Self::UInt8(v) => *v as f64,
            Self::UInt16(v) => *v as f64,
            Self::UInt32(v) => *v as f64,
            Self::UInt64(v) => *v as f64,
            Self::Float32(v) => *v as f64,
            Self::Float64(v) => *v,
            _ => return None,
        })
    }
}
