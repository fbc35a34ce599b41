//! Lazy wire-format walker: yields (field number, value) pairs from a byte
//! buffer with no schema to validate against. Interpretation of
//! length-delimited spans is entirely caller-driven per field number.

use crate::wire::varint;

/// The four wire types the upstream format uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WireType {
    Varint,
    Fixed64,
    LengthDelimited,
    Fixed32,
}

impl WireType {
    /// Low 3 bits of a field tag byte. Returns None for wire types the
    /// format never uses (groups, reserved values).
    pub fn from_tag_bits(bits: u8) -> Option<Self> {
        match bits {
            0 => Some(WireType::Varint),
            1 => Some(WireType::Fixed64),
            2 => Some(WireType::LengthDelimited),
            5 => Some(WireType::Fixed32),
            _ => None,
        }
    }
}

/// A decoded field value. Fixed-width payloads keep their raw little-endian
/// bytes; accessors interpret them as IEEE floats on demand.
#[derive(Debug, Clone, PartialEq)]
pub enum WireValue<'a> {
    Varint(u64),
    Fixed64([u8; 8]),
    LengthDelimited(&'a [u8]),
    Fixed32([u8; 4]),
}

impl WireValue<'_> {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            WireValue::Fixed64(b) => Some(f64::from_le_bytes(*b)),
            _ => None,
        }
    }

    pub fn as_f32(&self) -> Option<f32> {
        match self {
            WireValue::Fixed32(b) => Some(f32::from_le_bytes(*b)),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct WireField<'a> {
    pub field_number: u32,
    pub value: WireValue<'a>,
}

/// Why a walk stopped before consuming the whole buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Halt {
    /// A wire type the walker cannot skip: its length is unknown, so
    /// there is no safe resynchronization point.
    UnknownWireType(u8),
    /// Buffer ended mid-varint or mid-value. Prior fields are kept.
    Truncated,
}

/// Finite, non-restartable iterator of wire fields over `buf`, starting at
/// `offset` (callers skip the 4-byte outer envelope themselves). Stops at
/// the end of the buffer, on an unknown wire type, or on truncation;
/// never panics, never reads out of bounds.
pub struct FieldReader<'a> {
    buf: &'a [u8],
    offset: usize,
    halt: Option<Halt>,
}

impl<'a> FieldReader<'a> {
    pub fn new(buf: &'a [u8], offset: usize) -> Self {
        Self { buf, offset, halt: None }
    }

    /// Set when the walk aborted rather than running off the end cleanly.
    pub fn halt(&self) -> Option<Halt> {
        self.halt
    }
}

impl<'a> Iterator for FieldReader<'a> {
    type Item = WireField<'a>;

    fn next(&mut self) -> Option<WireField<'a>> {
        if self.halt.is_some() || self.offset >= self.buf.len() {
            return None;
        }

        let tag = self.buf[self.offset];
        let field_number = u32::from(tag >> 3);
        let Some(wire_type) = WireType::from_tag_bits(tag & 0x07) else {
            self.halt = Some(Halt::UnknownWireType(tag & 0x07));
            return None;
        };
        self.offset += 1;

        match wire_type {
            WireType::Varint => {
                let (value, consumed) = varint::decode(self.buf, self.offset);
                if consumed == 0 {
                    self.halt = Some(Halt::Truncated);
                    return None;
                }
                self.offset += consumed;
                Some(WireField { field_number, value: WireValue::Varint(value) })
            }
            WireType::Fixed64 => {
                let end = self.offset + 8;
                if end > self.buf.len() {
                    self.halt = Some(Halt::Truncated);
                    return None;
                }
                let mut bytes = [0u8; 8];
                bytes.copy_from_slice(&self.buf[self.offset..end]);
                self.offset = end;
                Some(WireField { field_number, value: WireValue::Fixed64(bytes) })
            }
            WireType::LengthDelimited => {
                let (len, consumed) = varint::decode(self.buf, self.offset);
                if consumed == 0 {
                    self.halt = Some(Halt::Truncated);
                    return None;
                }
                let start = self.offset + consumed;
                let Some(end) = start.checked_add(len as usize) else {
                    self.halt = Some(Halt::Truncated);
                    return None;
                };
                if len > self.buf.len() as u64 || end > self.buf.len() {
                    self.halt = Some(Halt::Truncated);
                    return None;
                }
                self.offset = end;
                Some(WireField {
                    field_number,
                    value: WireValue::LengthDelimited(&self.buf[start..end]),
                })
            }
            WireType::Fixed32 => {
                let end = self.offset + 4;
                if end > self.buf.len() {
                    self.halt = Some(Halt::Truncated);
                    return None;
                }
                let mut bytes = [0u8; 4];
                bytes.copy_from_slice(&self.buf[self.offset..end]);
                self.offset = end;
                Some(WireField { field_number, value: WireValue::Fixed32(bytes) })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn walks_all_four_wire_types() {
        let mut buf = Vec::new();
        // field 1, varint 150
        buf.extend_from_slice(&[0x08, 0x96, 0x01]);
        // field 2, length-delimited "hi"
        buf.extend_from_slice(&[0x12, 0x02, b'h', b'i']);
        // field 3, fixed64 = 1.5f64
        buf.push(0x19);
        buf.extend_from_slice(&1.5f64.to_le_bytes());
        // field 4, fixed32 = 2.5f32
        buf.push(0x25);
        buf.extend_from_slice(&2.5f32.to_le_bytes());

        let mut reader = FieldReader::new(&buf, 0);

        let f = reader.next().unwrap();
        assert_eq!(f.field_number, 1);
        assert_eq!(f.value, WireValue::Varint(150));

        let f = reader.next().unwrap();
        assert_eq!(f.field_number, 2);
        assert_eq!(f.value, WireValue::LengthDelimited(b"hi"));

        let f = reader.next().unwrap();
        assert_eq!(f.field_number, 3);
        assert_eq!(f.value.as_f64(), Some(1.5));

        let f = reader.next().unwrap();
        assert_eq!(f.field_number, 4);
        assert_eq!(f.value.as_f32(), Some(2.5));

        assert!(reader.next().is_none());
        assert_eq!(reader.halt(), None);
    }

    #[test]
    fn unknown_wire_type_stops_the_walk() {
        // field 1 varint=1, then a tag with wire type 3 (group start, unused)
        let buf = [0x08, 0x01, 0x0b, 0x08, 0x02];
        let mut reader = FieldReader::new(&buf, 0);
        assert_eq!(reader.next().unwrap().value, WireValue::Varint(1));
        assert!(reader.next().is_none());
        assert_eq!(reader.halt(), Some(Halt::UnknownWireType(3)));
    }

    #[test]
    fn truncated_length_delimited_keeps_prior_fields() {
        // field 1 varint, then field 2 claiming 10 bytes with only 2 present
        let buf = [0x08, 0x07, 0x12, 0x0a, b'x', b'y'];
        let mut reader = FieldReader::new(&buf, 0);
        assert_eq!(reader.next().unwrap().value, WireValue::Varint(7));
        assert!(reader.next().is_none());
        assert_eq!(reader.halt(), Some(Halt::Truncated));
    }

    #[test]
    fn truncated_fixed_width_halts() {
        // fixed64 tag with only 3 payload bytes
        let buf = [0x19, 0x01, 0x02, 0x03];
        let mut reader = FieldReader::new(&buf, 0);
        assert!(reader.next().is_none());
        assert_eq!(reader.halt(), Some(Halt::Truncated));
    }

    #[test]
    fn buffer_ending_mid_varint_halts() {
        let buf = [0x08, 0x80];
        let mut reader = FieldReader::new(&buf, 0);
        assert!(reader.next().is_none());
        assert_eq!(reader.halt(), Some(Halt::Truncated));
    }

    #[test]
    fn starts_at_offset() {
        let buf = [0xde, 0xad, 0xbe, 0xef, 0x08, 0x2a];
        let mut reader = FieldReader::new(&buf, 4);
        assert_eq!(reader.next().unwrap().value, WireValue::Varint(42));
        assert!(reader.next().is_none());
    }
}
