//! Base-128 varint codec, the atomic unit of the upstream wire format.

/// Decode one varint starting at `offset`.
///
/// Returns `(value, bytes_consumed)`. Accumulates 7 bits per byte in
/// little-endian group order into a full u64; values near 2^63 occur
/// because signed quantities arrive as their unsigned two's-complement
/// form, so a narrower or floating-point accumulator would lose bits.
///
/// If the buffer ends before a terminating byte (high bit clear) is found,
/// returns `(0, 0)`; the caller must treat that as end-of-input, never as a
/// valid zero.
pub fn decode(buf: &[u8], offset: usize) -> (u64, usize) {
    let mut value = 0u64;
    let mut shift = 0u32;
    let mut read = 0usize;

    loop {
        let Some(&byte) = buf.get(offset + read) else {
            return (0, 0);
        };
        if shift < 64 {
            value |= u64::from(byte & 0x7f) << shift;
        }
        read += 1;
        if byte & 0x80 == 0 {
            return (value, read);
        }
        shift += 7;
    }
}

/// Encode a u64 as a varint byte sequence (inverse of `decode`).
pub fn encode(mut value: u64) -> Vec<u8> {
    let mut out = Vec::with_capacity(10);
    loop {
        let byte = (value & 0x7f) as u8;
        value >>= 7;
        if value == 0 {
            out.push(byte);
            return out;
        }
        out.push(byte | 0x80);
    }
}

/// Append a varint-typed field (tag + value) to `out`. Used to build the
/// fixed upstream request bodies.
pub fn encode_field(field_number: u32, value: u64, out: &mut Vec<u8>) {
    out.extend_from_slice(&encode(u64::from(field_number) << 3));
    out.extend_from_slice(&encode(value));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip_sampled_values() {
        let samples: &[u64] = &[
            0,
            1,
            127,
            128,
            300,
            16_383,
            16_384,
            20_335,
            u64::from(u32::MAX),
            (1u64 << 63) - 1,
            1u64 << 63,
            u64::MAX,
        ];
        for &v in samples {
            let bytes = encode(v);
            let (decoded, consumed) = decode(&bytes, 0);
            assert_eq!(decoded, v, "value {v}");
            assert_eq!(consumed, bytes.len(), "value {v}");
        }
    }

    #[test]
    fn decode_at_offset() {
        let mut buf = vec![0xff, 0xff];
        buf.extend_from_slice(&encode(300));
        let (value, consumed) = decode(&buf, 2);
        assert_eq!(value, 300);
        assert_eq!(consumed, 2);
    }

    #[test]
    fn exhausted_buffer_is_not_a_zero() {
        // High bit set on the final byte, no terminator.
        let buf = [0x80, 0x80];
        assert_eq!(decode(&buf, 0), (0, 0));
        // Offset past the end behaves the same.
        assert_eq!(decode(&buf, 5), (0, 0));
        // Empty buffer too.
        assert_eq!(decode(&[], 0), (0, 0));
    }

    #[test]
    fn max_u64_is_ten_bytes() {
        let bytes = encode(u64::MAX);
        assert_eq!(bytes.len(), 10);
        assert_eq!(decode(&bytes, 0), (u64::MAX, 10));
    }

    #[test]
    fn encode_field_builds_request_body() {
        // {field1: 1, field2: 2}, the daily poll body.
        let mut body = Vec::new();
        encode_field(1, 1, &mut body);
        encode_field(2, 2, &mut body);
        assert_eq!(body, vec![0x08, 0x01, 0x10, 0x02]);
    }
}
