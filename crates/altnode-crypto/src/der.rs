//! Minimal ASN.1 DER reader and writer.
//!
//! Covers what ECDSA signatures and SEC1 private keys need: definite
//! lengths up to two bytes, INTEGER, OCTET STRING, BIT STRING, OBJECT
//! IDENTIFIER, SEQUENCE and context-specific constructed tags.

#![forbid(unsafe_code)]

use altnode_core::{Error, Result};

use crate::bigint::U256;

pub const TAG_INTEGER: u8 = 0x02;
pub const TAG_BIT_STRING: u8 = 0x03;
pub const TAG_OCTET_STRING: u8 = 0x04;
pub const TAG_OID: u8 = 0x06;
pub const TAG_SEQUENCE: u8 = 0x30;

/// Context-specific constructed tag `[n]`.
pub const fn context(n: u8) -> u8 {
    0xa0 | n
}

/// Cursor over DER-encoded bytes.
pub struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    pub fn is_empty(&self) -> bool {
        self.pos >= self.data.len()
    }

    pub fn peek_tag(&self) -> Option<u8> {
        self.data.get(self.pos).copied()
    }

    fn byte(&mut self) -> Result<u8> {
        let b = *self
            .data
            .get(self.pos)
            .ok_or_else(|| Error::Decode("unexpected end of DER data".into()))?;
        self.pos += 1;
        Ok(b)
    }

    fn length(&mut self) -> Result<usize> {
        let first = self.byte()?;
        match first {
            0x00..=0x7f => Ok(first as usize),
            0x81 => {
                let len = self.byte()? as usize;
                if len < 0x80 {
                    return Err(Error::Decode("non-minimal DER length".into()));
                }
                Ok(len)
            }
            0x82 => {
                let len = ((self.byte()? as usize) << 8) | self.byte()? as usize;
                if len < 0x100 {
                    return Err(Error::Decode("non-minimal DER length".into()));
                }
                Ok(len)
            }
            _ => Err(Error::Decode(format!("unsupported DER length byte 0x{first:02x}"))),
        }
    }

    /// Read any TLV, returning (tag, contents).
    pub fn read_any(&mut self) -> Result<(u8, &'a [u8])> {
        let tag = self.byte()?;
        let len = self.length()?;
        let end = self
            .pos
            .checked_add(len)
            .filter(|&end| end <= self.data.len())
            .ok_or_else(|| Error::Decode("DER length exceeds input".into()))?;
        let contents = &self.data[self.pos..end];
        self.pos = end;
        Ok((tag, contents))
    }

    /// Read a TLV that must carry `tag`.
    pub fn read(&mut self, tag: u8) -> Result<&'a [u8]> {
        let (got, contents) = self.read_any()?;
        if got != tag {
            return Err(Error::Decode(format!(
                "expected DER tag 0x{tag:02x}, got 0x{got:02x}"
            )));
        }
        Ok(contents)
    }

    /// Read a TLV with `tag` only if it is next.
    pub fn read_optional(&mut self, tag: u8) -> Result<Option<&'a [u8]>> {
        if self.peek_tag() == Some(tag) {
            self.read(tag).map(Some)
        } else {
            Ok(None)
        }
    }

    /// Read a non-negative INTEGER that fits in 256 bits.
    pub fn read_integer(&mut self) -> Result<U256> {
        let contents = self.read(TAG_INTEGER)?;
        parse_unsigned(contents)
    }

    /// Read an INTEGER small enough for a `u64`.
    pub fn read_small_integer(&mut self) -> Result<u64> {
        let v = self.read_integer()?;
        let limbs = v.limbs();
        if limbs[1] != 0 || limbs[2] != 0 || limbs[3] != 0 {
            return Err(Error::Decode("DER integer too large".into()));
        }
        Ok(limbs[0])
    }

    /// Fail if bytes remain.
    pub fn finish(self) -> Result<()> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(Error::Decode(format!(
                "{} trailing bytes after DER structure",
                self.data.len() - self.pos
            )))
        }
    }
}

/// Interpret INTEGER contents as an unsigned value.
pub fn parse_unsigned(contents: &[u8]) -> Result<U256> {
    match contents.first() {
        None => Err(Error::Decode("empty DER integer".into())),
        Some(&b) if b & 0x80 != 0 => Err(Error::Decode("negative DER integer".into())),
        Some(_) => U256::from_be_slice(contents)
            .ok_or_else(|| Error::Decode("DER integer exceeds 256 bits".into())),
    }
}

fn push_length(out: &mut Vec<u8>, len: usize) {
    if len < 0x80 {
        out.push(len as u8);
    } else if len < 0x100 {
        out.extend_from_slice(&[0x81, len as u8]);
    } else {
        debug_assert!(len <= 0xffff);
        out.extend_from_slice(&[0x82, (len >> 8) as u8, len as u8]);
    }
}

/// Append a TLV.
pub fn write_tlv(out: &mut Vec<u8>, tag: u8, contents: &[u8]) {
    out.push(tag);
    push_length(out, contents.len());
    out.extend_from_slice(contents);
}

/// Minimal INTEGER contents: no leading zeros, 0x00 guard when the MSB is set.
pub fn integer_contents(v: &U256) -> Vec<u8> {
    let trimmed = v.to_be_bytes_trimmed();
    match trimmed.first() {
        None => vec![0x00],
        Some(&b) if b & 0x80 != 0 => {
            let mut out = Vec::with_capacity(trimmed.len() + 1);
            out.push(0x00);
            out.extend_from_slice(&trimmed);
            out
        }
        Some(_) => trimmed,
    }
}

pub fn write_integer(out: &mut Vec<u8>, v: &U256) {
    write_tlv(out, TAG_INTEGER, &integer_contents(v));
}

/// Wrap `contents` in a SEQUENCE.
pub fn sequence(contents: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(contents.len() + 4);
    write_tlv(&mut out, TAG_SEQUENCE, contents);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integer_guard_byte() {
        assert_eq!(integer_contents(&U256::from_u64(0x80)), vec![0x00, 0x80]);
        assert_eq!(integer_contents(&U256::from_u64(0x7f)), vec![0x7f]);
        assert_eq!(integer_contents(&U256::ZERO), vec![0x00]);
    }

    #[test]
    fn test_integer_roundtrip() {
        let v = U256::from_limbs([1, 2, 3, 0xff00_0000_0000_0000]);
        let mut out = Vec::new();
        write_integer(&mut out, &v);
        assert_eq!(out[1], 33);
        let mut r = Reader::new(&out);
        assert_eq!(r.read_integer().unwrap(), v);
        r.finish().unwrap();
    }

    #[test]
    fn test_long_lengths() {
        for len in [0x7f, 0x80, 0xff, 0x100, 0x1234] {
            let contents = vec![0xab; len];
            let mut out = Vec::new();
            write_tlv(&mut out, TAG_OCTET_STRING, &contents);
            let mut r = Reader::new(&out);
            assert_eq!(r.read(TAG_OCTET_STRING).unwrap(), contents.as_slice());
        }
    }

    #[test]
    fn test_rejects_truncated() {
        let mut r = Reader::new(&[0x30, 0x05, 0x02, 0x01]);
        assert!(matches!(r.read(TAG_SEQUENCE), Err(Error::Decode(_))));
    }

    #[test]
    fn test_rejects_wrong_tag() {
        let mut r = Reader::new(&[0x04, 0x01, 0x00]);
        assert!(r.read(TAG_INTEGER).is_err());
    }

    #[test]
    fn test_rejects_negative_integer() {
        assert!(parse_unsigned(&[0x80]).is_err());
        assert!(parse_unsigned(&[]).is_err());
        assert_eq!(parse_unsigned(&[0x00, 0x80]).unwrap(), U256::from_u64(0x80));
    }

    #[test]
    fn test_optional_and_trailing() {
        let data = [0x02, 0x01, 0x05, 0x04, 0x00];
        let mut r = Reader::new(&data);
        assert_eq!(r.read_optional(context(0)).unwrap(), None);
        assert_eq!(r.read_small_integer().unwrap(), 5);
        assert!(Reader::new(&data[..3]).finish().is_err());
        assert!(r.read_optional(TAG_OCTET_STRING).unwrap().is_some());
        r.finish().unwrap();
    }
}
