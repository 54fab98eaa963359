//! Fixed-width field encoding helpers
//!
//! Integers are big-endian on the wire, floats keep the native
//! byte layout of their IEEE-754 representation. Callers guarantee
//! the buffer is large enough.

use byteorder::{BigEndian, ByteOrder, NativeEndian};

pub fn encode_u16(v: u16, buff: &mut [u8]) {
    BigEndian::write_u16(buff, v)
}

pub fn decode_u16(buff: &[u8]) -> u16 {
    BigEndian::read_u16(buff)
}

pub fn encode_u32(v: u32, buff: &mut [u8]) {
    BigEndian::write_u32(buff, v)
}

pub fn decode_u32(buff: &[u8]) -> u32 {
    BigEndian::read_u32(buff)
}

pub fn encode_f32(v: f32, buff: &mut [u8]) {
    NativeEndian::write_f32(buff, v)
}

pub fn decode_f32(buff: &[u8]) -> f32 {
    NativeEndian::read_f32(buff)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn integers_are_big_endian() {
        let mut buff = [0u8; 4];

        encode_u16(0x1234, &mut buff);
        assert_eq!(&buff[..2], &[0x12, 0x34]);
        assert_eq!(decode_u16(&[0xab, 0xcd]), 0xabcd);

        encode_u32(0xdeadbeef, &mut buff);
        assert_eq!(buff, [0xde, 0xad, 0xbe, 0xef]);
        assert_eq!(decode_u32(&buff), 0xdeadbeef);
    }

    #[test]
    fn float_keeps_native_layout() {
        let mut buff = [0u8; 4];
        encode_f32(-21.5, &mut buff);

        assert_eq!(buff, (-21.5f32).to_ne_bytes());
        assert_eq!(decode_f32(&buff), -21.5);
    }

    #[test]
    fn float_nan_survives() {
        let mut buff = [0u8; 4];
        encode_f32(f32::NAN, &mut buff);
        assert!(decode_f32(&buff).is_nan());
    }
}
