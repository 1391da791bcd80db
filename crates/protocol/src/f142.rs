//! f142 log frame - builder and zero-copy parser
//!
//! The versioned binary encoding for channel updates. Hand-written
//! vtable-based format (no codegen), built from front to back with
//! back-patched vector offsets.
//!
//! # Wire Format
//!
//! ```text
//! [4 bytes: root offset (u32 LE)] -> points to table
//! [4 bytes: schema identifier "f142"]
//! [vtable]
//!   - vtable_size (u16)
//!   - table_size (u16)
//!   - field offsets (u16 each, 0 = not present)
//! [table]
//!   - soffset to vtable (i32)
//!   - source_name offset (u32), value offset (u32)
//!   - timestamp_ns (u64)
//!   - value_type (u8), alarm_status (u8), alarm_severity (u8), pad
//! [vectors]
//!   - length (u32) + data bytes, 4-byte aligned
//! ```
//!
//! All accesses are bounds checked; corrupt frames produce errors, never
//! panics or out-of-bounds reads.

use bytes::Bytes;

use crate::{
    AlarmSeverity, AlarmStatus, ProtocolError, Result, Value, ValueType, MAX_FRAME_SIZE,
};

/// Schema identifier carried at bytes 4..8 of every frame
pub const FRAME_IDENT: &[u8; 4] = b"f142";

/// Smallest structurally valid frame
pub const MIN_FRAME_SIZE: usize = 48;

/// Field slot indices in the vtable
const FIELD_SOURCE_NAME: usize = 0;
const FIELD_VALUE: usize = 1;
const FIELD_TIMESTAMP: usize = 2;
const FIELD_VALUE_TYPE: usize = 3;
const FIELD_ALARM_STATUS: usize = 4;
const FIELD_ALARM_SEVERITY: usize = 5;
const FIELD_COUNT: usize = 6;

/// Builder for f142 log frames
///
/// # Example
///
/// ```
/// use pvf_protocol::{AlarmSeverity, AlarmStatus, LogFrameBuilder, Value};
///
/// let frame = LogFrameBuilder::new("source_name")
///     .value(&Value::Float64(4.2222))
///     .timestamp_ns(1_100_000_000)
///     .alarm(AlarmStatus::NoAlarm, AlarmSeverity::NoAlarm)
///     .build();
/// assert_eq!(&frame[4..8], b"f142");
/// ```
#[derive(Debug, Clone)]
pub struct LogFrameBuilder {
    source_name: String,
    value_type: ValueType,
    value_bytes: Vec<u8>,
    timestamp_ns: u64,
    alarm_status: AlarmStatus,
    alarm_severity: AlarmSeverity,
}

impl LogFrameBuilder {
    /// Create a builder for the given source name
    ///
    /// Defaults: empty f64 value, zero timestamp, no-change alarm fields.
    pub fn new(source_name: impl Into<String>) -> Self {
        Self {
            source_name: source_name.into(),
            value_type: ValueType::Float64,
            value_bytes: Vec::new(),
            timestamp_ns: 0,
            alarm_status: AlarmStatus::NoChange,
            alarm_severity: AlarmSeverity::NoChange,
        }
    }

    /// Set the value (type tag and element bytes)
    #[must_use]
    pub fn value(mut self, value: &Value) -> Self {
        self.value_type = value.type_tag();
        self.value_bytes = value.to_le_bytes();
        self
    }

    /// Set the source timestamp (nanoseconds since the Unix epoch)
    #[must_use]
    pub fn timestamp_ns(mut self, timestamp_ns: u64) -> Self {
        self.timestamp_ns = timestamp_ns;
        self
    }

    /// Set the alarm fields
    #[must_use]
    pub fn alarm(mut self, status: AlarmStatus, severity: AlarmSeverity) -> Self {
        self.alarm_status = status;
        self.alarm_severity = severity;
        self
    }

    /// Build the wire frame
    pub fn build(self) -> Bytes {
        // VTable: size(u16) + table_size(u16) + 6 field slots (u16 each)
        let vtable_size: u16 = 4 + (FIELD_COUNT as u16) * 2; // 16 bytes

        // Table layout after the soffset (i32):
        // +4: source_name offset (u32)
        // +8: value offset (u32)
        // +12: timestamp_ns (u64)
        // +20: value_type (u8)
        // +21: alarm_status (u8)
        // +22: alarm_severity (u8)
        // +23: padding
        let table_size: u16 = 4 + 20;

        let estimated = 8
            + vtable_size as usize
            + table_size as usize
            + 8
            + self.source_name.len()
            + self.value_bytes.len()
            + 16;
        let mut buf = Vec::with_capacity(estimated);

        // === Root offset placeholder + schema identifier ===
        buf.extend_from_slice(&[0u8; 4]);
        buf.extend_from_slice(FRAME_IDENT);

        // === VTable ===
        let vtable_start = buf.len();
        buf.extend_from_slice(&vtable_size.to_le_bytes());
        buf.extend_from_slice(&table_size.to_le_bytes());
        buf.extend_from_slice(&4u16.to_le_bytes()); // source_name
        buf.extend_from_slice(&8u16.to_le_bytes()); // value
        buf.extend_from_slice(&12u16.to_le_bytes()); // timestamp_ns
        buf.extend_from_slice(&20u16.to_le_bytes()); // value_type
        buf.extend_from_slice(&21u16.to_le_bytes()); // alarm_status
        buf.extend_from_slice(&22u16.to_le_bytes()); // alarm_severity

        // === Table ===
        let table_start = buf.len();
        let soffset: i32 = (table_start - vtable_start) as i32;
        buf.extend_from_slice(&soffset.to_le_bytes());

        let source_name_offset_pos = buf.len();
        buf.extend_from_slice(&[0u8; 4]);
        let value_offset_pos = buf.len();
        buf.extend_from_slice(&[0u8; 4]);

        buf.extend_from_slice(&self.timestamp_ns.to_le_bytes());
        buf.push(self.value_type.as_u8());
        buf.push(self.alarm_status.as_u8());
        buf.push(self.alarm_severity.as_u8());
        buf.push(0);

        // === Vectors ===
        align4(&mut buf);
        let source_name_vec_start = buf.len();
        buf.extend_from_slice(&(self.source_name.len() as u32).to_le_bytes());
        buf.extend_from_slice(self.source_name.as_bytes());

        align4(&mut buf);
        let value_vec_start = buf.len();
        buf.extend_from_slice(&(self.value_bytes.len() as u32).to_le_bytes());
        buf.extend_from_slice(&self.value_bytes);

        // === Back-patch offsets ===
        buf[0..4].copy_from_slice(&(table_start as u32).to_le_bytes());

        let source_name_rel = (source_name_vec_start - source_name_offset_pos) as u32;
        buf[source_name_offset_pos..source_name_offset_pos + 4]
            .copy_from_slice(&source_name_rel.to_le_bytes());

        let value_rel = (value_vec_start - value_offset_pos) as u32;
        buf[value_offset_pos..value_offset_pos + 4].copy_from_slice(&value_rel.to_le_bytes());

        Bytes::from(buf)
    }
}

/// Zero-copy view into an f142 log frame
///
/// `parse` validates the frame structure; field accessors defer reads and
/// bounds check every access.
#[derive(Debug, Clone, Copy)]
pub struct LogFrame<'a> {
    buf: &'a [u8],
    table_offset: usize,
    vtable_offset: usize,
    vtable_fields: usize,
}

impl<'a> LogFrame<'a> {
    /// Parse an f142 frame
    ///
    /// # Validation Stages
    ///
    /// 1. Size bounds (min 48 bytes, max 16 MB)
    /// 2. Schema identifier
    /// 3. Root offset sanity
    /// 4. VTable sanity
    ///
    /// # Errors
    ///
    /// Returns an error if any stage fails; field accessors can still fail
    /// later on truncated vectors.
    pub fn parse(buf: &'a [u8]) -> Result<Self> {
        if buf.len() < MIN_FRAME_SIZE {
            return Err(ProtocolError::too_short(MIN_FRAME_SIZE, buf.len()));
        }
        if buf.len() > MAX_FRAME_SIZE {
            return Err(ProtocolError::invalid_frame(format!(
                "frame size {} exceeds maximum {}",
                buf.len(),
                MAX_FRAME_SIZE
            )));
        }
        if &buf[4..8] != FRAME_IDENT {
            return Err(ProtocolError::invalid_frame(format!(
                "schema identifier mismatch: {:?}",
                &buf[4..8]
            )));
        }

        let root_offset = read_u32(buf, 0)? as usize;
        if root_offset + 4 > buf.len() {
            return Err(ProtocolError::invalid_frame(format!(
                "root offset {} exceeds buffer length {}",
                root_offset,
                buf.len()
            )));
        }
        let table_offset = root_offset;

        // vtable_location = table_location - soffset
        let vtable_soffset = read_i32(buf, table_offset)?;
        let vtable_offset = if vtable_soffset >= 0 {
            table_offset
                .checked_sub(vtable_soffset as usize)
                .ok_or_else(|| ProtocolError::invalid_frame("vtable offset underflow"))?
        } else {
            table_offset + ((-vtable_soffset) as usize)
        };
        if vtable_offset + 4 > buf.len() {
            return Err(ProtocolError::invalid_frame(format!(
                "vtable offset {} exceeds buffer length {}",
                vtable_offset,
                buf.len()
            )));
        }

        let vtable_size = read_u16(buf, vtable_offset)? as usize;
        if vtable_size < 4 || vtable_offset + vtable_size > buf.len() {
            return Err(ProtocolError::invalid_frame(format!(
                "invalid vtable size {} at offset {}",
                vtable_size, vtable_offset
            )));
        }
        let vtable_fields = (vtable_size - 4) / 2;

        Ok(Self {
            buf,
            table_offset,
            vtable_offset,
            vtable_fields,
        })
    }

    /// The source (channel) name the frame was produced for
    pub fn source_name(&self) -> Result<&'a str> {
        let bytes = self.vector(FIELD_SOURCE_NAME, "source_name")?;
        std::str::from_utf8(bytes)
            .map_err(|e| ProtocolError::invalid_frame(format!("source_name not UTF-8: {e}")))
    }

    /// The value type code
    pub fn value_type(&self) -> Result<ValueType> {
        let off = self
            .field_offset(FIELD_VALUE_TYPE)?
            .ok_or(ProtocolError::MissingField("value_type"))?;
        let code = *self
            .buf
            .get(self.table_offset + off)
            .ok_or_else(|| ProtocolError::invalid_frame("value_type out of bounds"))?;
        ValueType::from_u8(code)
    }

    /// The raw little-endian value bytes
    pub fn raw_value(&self) -> Result<&'a [u8]> {
        self.vector(FIELD_VALUE, "value")
    }

    /// The decoded value
    pub fn value(&self) -> Result<Value> {
        Value::from_le_bytes(self.value_type()?, self.raw_value()?)
    }

    /// Source timestamp, nanoseconds since the Unix epoch
    pub fn timestamp_ns(&self) -> Result<u64> {
        let off = self
            .field_offset(FIELD_TIMESTAMP)?
            .ok_or(ProtocolError::MissingField("timestamp_ns"))?;
        read_u64(self.buf, self.table_offset + off)
    }

    /// Alarm status field (may be the `NoChange` sentinel)
    pub fn alarm_status(&self) -> Result<AlarmStatus> {
        let off = self
            .field_offset(FIELD_ALARM_STATUS)?
            .ok_or(ProtocolError::MissingField("alarm_status"))?;
        let code = *self
            .buf
            .get(self.table_offset + off)
            .ok_or_else(|| ProtocolError::invalid_frame("alarm_status out of bounds"))?;
        Ok(AlarmStatus::from_u8(code))
    }

    /// Alarm severity field (may be the `NoChange` sentinel)
    pub fn alarm_severity(&self) -> Result<AlarmSeverity> {
        let off = self
            .field_offset(FIELD_ALARM_SEVERITY)?
            .ok_or(ProtocolError::MissingField("alarm_severity"))?;
        let code = *self
            .buf
            .get(self.table_offset + off)
            .ok_or_else(|| ProtocolError::invalid_frame("alarm_severity out of bounds"))?;
        Ok(AlarmSeverity::from_u8(code))
    }

    /// Look up a field's table offset in the vtable; `None` means absent
    fn field_offset(&self, slot: usize) -> Result<Option<usize>> {
        if slot >= self.vtable_fields {
            return Ok(None);
        }
        let pos = self.vtable_offset + 4 + slot * 2;
        let off = read_u16(self.buf, pos)? as usize;
        Ok(if off == 0 { None } else { Some(off) })
    }

    /// Resolve a vector-valued field to its byte slice
    fn vector(&self, slot: usize, name: &'static str) -> Result<&'a [u8]> {
        let off = self
            .field_offset(slot)?
            .ok_or(ProtocolError::MissingField(name))?;
        let offset_pos = self.table_offset + off;
        let rel = read_u32(self.buf, offset_pos)? as usize;
        let vec_start = offset_pos
            .checked_add(rel)
            .ok_or_else(|| ProtocolError::invalid_frame("vector offset overflow"))?;
        let len = read_u32(self.buf, vec_start)? as usize;
        let data_start = vec_start + 4;
        let data_end = data_start
            .checked_add(len)
            .filter(|end| *end <= self.buf.len())
            .ok_or_else(|| {
                ProtocolError::invalid_frame(format!("{name} vector truncated (len {len})"))
            })?;
        Ok(&self.buf[data_start..data_end])
    }
}

fn align4(buf: &mut Vec<u8>) {
    while buf.len() % 4 != 0 {
        buf.push(0);
    }
}

fn read_u16(buf: &[u8], pos: usize) -> Result<u16> {
    let bytes = buf
        .get(pos..pos + 2)
        .ok_or_else(|| ProtocolError::too_short(pos + 2, buf.len()))?;
    Ok(u16::from_le_bytes([bytes[0], bytes[1]]))
}

fn read_u32(buf: &[u8], pos: usize) -> Result<u32> {
    let bytes = buf
        .get(pos..pos + 4)
        .ok_or_else(|| ProtocolError::too_short(pos + 4, buf.len()))?;
    Ok(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
}

fn read_i32(buf: &[u8], pos: usize) -> Result<i32> {
    read_u32(buf, pos).map(|v| v as i32)
}

fn read_u64(buf: &[u8], pos: usize) -> Result<u64> {
    let bytes = buf
        .get(pos..pos + 8)
        .ok_or_else(|| ProtocolError::too_short(pos + 8, buf.len()))?;
    let mut arr = [0u8; 8];
    arr.copy_from_slice(bytes);
    Ok(u64::from_le_bytes(arr))
}
