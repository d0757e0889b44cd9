//! Packed binary codec for chain payloads.
//!
//! Integers are little-endian, collections are varuint32-length-prefixed,
//! names travel as their raw 64-bit value. Action payloads, the embedded
//! form of an ABI, and the transaction signing payload all use this format.

use crate::crypto::{Checksum256, PublicKey, Signature};
use crate::error::PackError;
use crate::name::Name;

/// Cursor over a packed byte buffer.
pub struct ByteReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        ByteReader { buf, pos: 0 }
    }

    /// Bytes not yet consumed.
    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    /// Error unless the buffer was fully consumed.
    pub fn finish(&self) -> Result<(), PackError> {
        match self.remaining() {
            0 => Ok(()),
            n => Err(PackError::TrailingBytes(n)),
        }
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], PackError> {
        if self.remaining() < n {
            return Err(PackError::UnexpectedEnd {
                wanted: n - self.remaining(),
            });
        }
        let slice = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    pub fn read_u8(&mut self) -> Result<u8, PackError> {
        Ok(self.take(1)?[0])
    }

    pub fn read_u16(&mut self) -> Result<u16, PackError> {
        Ok(u16::from_le_bytes(self.take(2)?.try_into().expect("len 2")))
    }

    pub fn read_u32(&mut self) -> Result<u32, PackError> {
        Ok(u32::from_le_bytes(self.take(4)?.try_into().expect("len 4")))
    }

    pub fn read_u64(&mut self) -> Result<u64, PackError> {
        Ok(u64::from_le_bytes(self.take(8)?.try_into().expect("len 8")))
    }

    pub fn read_i8(&mut self) -> Result<i8, PackError> {
        Ok(self.read_u8()? as i8)
    }

    pub fn read_i16(&mut self) -> Result<i16, PackError> {
        Ok(self.read_u16()? as i16)
    }

    pub fn read_i32(&mut self) -> Result<i32, PackError> {
        Ok(self.read_u32()? as i32)
    }

    pub fn read_i64(&mut self) -> Result<i64, PackError> {
        Ok(self.read_u64()? as i64)
    }

    /// LEB128-style unsigned varint, at most 5 bytes for 32 bits.
    pub fn read_varuint32(&mut self) -> Result<u32, PackError> {
        let mut value: u64 = 0;
        for shift in (0..35).step_by(7) {
            let byte = self.read_u8()?;
            value |= u64::from(byte & 0x7f) << shift;
            if byte & 0x80 == 0 {
                return u32::try_from(value).map_err(|_| PackError::BadVaruint);
            }
        }
        Err(PackError::BadVaruint)
    }

    pub fn read_name(&mut self) -> Result<Name, PackError> {
        Ok(Name::from_raw(self.read_u64()?))
    }

    /// Varuint-prefixed byte blob.
    pub fn read_bytes(&mut self) -> Result<Vec<u8>, PackError> {
        let len = self.read_varuint32()? as usize;
        Ok(self.take(len)?.to_vec())
    }

    /// Varuint-prefixed UTF-8 string.
    pub fn read_string(&mut self) -> Result<String, PackError> {
        let raw = self.read_bytes()?;
        String::from_utf8(raw).map_err(|_| PackError::BadUtf8)
    }

    pub fn read_checksum256(&mut self) -> Result<Checksum256, PackError> {
        Ok(Checksum256::from_bytes(
            self.take(32)?.try_into().expect("len 32"),
        ))
    }

    pub fn read_public_key(&mut self) -> Result<PublicKey, PackError> {
        Ok(PublicKey::from_bytes(
            self.take(33)?.try_into().expect("len 33"),
        ))
    }

    pub fn read_signature(&mut self) -> Result<Signature, PackError> {
        Ok(Signature::from_bytes(
            self.take(65)?.try_into().expect("len 65"),
        ))
    }
}

/// Growable buffer writing the packed format.
#[derive(Default)]
pub struct ByteWriter {
    buf: Vec<u8>,
}

impl ByteWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    pub fn write_u8(&mut self, v: u8) {
        self.buf.push(v);
    }

    pub fn write_u16(&mut self, v: u16) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    pub fn write_u32(&mut self, v: u32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    pub fn write_u64(&mut self, v: u64) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    pub fn write_varuint32(&mut self, mut v: u32) {
        loop {
            let mut byte = (v & 0x7f) as u8;
            v >>= 7;
            if v != 0 {
                byte |= 0x80;
            }
            self.buf.push(byte);
            if v == 0 {
                break;
            }
        }
    }

    pub fn write_name(&mut self, name: Name) {
        self.write_u64(name.raw());
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.write_varuint32(bytes.len() as u32);
        self.buf.extend_from_slice(bytes);
    }

    pub fn write_string(&mut self, s: &str) {
        self.write_bytes(s.as_bytes());
    }

    pub fn write_checksum256(&mut self, v: &Checksum256) {
        self.buf.extend_from_slice(v.as_bytes());
    }

    pub fn write_public_key(&mut self, v: &PublicKey) {
        self.buf.extend_from_slice(v.as_bytes());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn varuint_round_trip() {
        for v in [0u32, 1, 127, 128, 300, 16384, u32::MAX] {
            let mut w = ByteWriter::new();
            w.write_varuint32(v);
            let buf = w.into_bytes();
            let mut r = ByteReader::new(&buf);
            assert_eq!(r.read_varuint32().unwrap(), v);
            r.finish().unwrap();
        }
    }

    #[test]
    fn varuint_rejects_overlong() {
        let buf = [0xff, 0xff, 0xff, 0xff, 0xff, 0x01];
        let mut r = ByteReader::new(&buf);
        assert_eq!(r.read_varuint32(), Err(PackError::BadVaruint));
    }

    #[test]
    fn string_and_name_round_trip() {
        let mut w = ByteWriter::new();
        w.write_string("hello");
        w.write_name("alice".parse().unwrap());
        let buf = w.into_bytes();

        let mut r = ByteReader::new(&buf);
        assert_eq!(r.read_string().unwrap(), "hello");
        assert_eq!(r.read_name().unwrap(), "alice".parse::<Name>().unwrap());
        r.finish().unwrap();
    }

    #[test]
    fn short_buffer_reports_wanted() {
        let mut r = ByteReader::new(&[1, 2]);
        assert_eq!(
            r.read_u64(),
            Err(PackError::UnexpectedEnd { wanted: 6 })
        );
    }

    #[test]
    fn finish_flags_trailing() {
        let mut r = ByteReader::new(&[1, 2, 3]);
        r.read_u8().unwrap();
        assert_eq!(r.finish(), Err(PackError::TrailingBytes(2)));
    }
}
