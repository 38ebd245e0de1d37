//! Fixed-width 256-bit unsigned integers.
//!
//! Stored as 4 x 64-bit limbs in little-endian order. Modular arithmetic
//! lives in [`crate::modular`]; this type only knows carries and borrows.

#![forbid(unsafe_code)]

use std::cmp::Ordering;
use std::fmt;

use zeroize::Zeroize;

/// a + b + carry, returning (sum, carry).
#[inline(always)]
pub(crate) const fn adc(a: u64, b: u64, carry: u64) -> (u64, u64) {
    let t = (a as u128) + (b as u128) + (carry as u128);
    (t as u64, (t >> 64) as u64)
}

/// a - b - borrow, returning (difference, borrow).
#[inline(always)]
pub(crate) const fn sbb(a: u64, b: u64, borrow: u64) -> (u64, u64) {
    let t = (a as u128).wrapping_sub((b as u128) + (borrow as u128));
    (t as u64, ((t >> 64) as u64) & 1)
}

/// a + b * c + carry, returning (low, high). Cannot overflow 128 bits.
#[inline(always)]
pub(crate) const fn mac(a: u64, b: u64, c: u64, carry: u64) -> (u64, u64) {
    let t = (a as u128) + (b as u128) * (c as u128) + (carry as u128);
    (t as u64, (t >> 64) as u64)
}

/// 256-bit unsigned integer.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct U256 {
    limbs: [u64; 4],
}

impl U256 {
    pub const ZERO: Self = Self { limbs: [0; 4] };

    pub const ONE: Self = Self {
        limbs: [1, 0, 0, 0],
    };

    /// Create from 4 limbs (little-endian).
    pub const fn from_limbs(limbs: [u64; 4]) -> Self {
        Self { limbs }
    }

    pub const fn from_u64(v: u64) -> Self {
        Self {
            limbs: [v, 0, 0, 0],
        }
    }

    pub const fn limbs(&self) -> &[u64; 4] {
        &self.limbs
    }

    /// Create from 32 big-endian bytes.
    pub fn from_be_bytes(bytes: &[u8; 32]) -> Self {
        let mut limbs = [0u64; 4];
        for (i, limb) in limbs.iter_mut().enumerate() {
            let start = 32 - (i + 1) * 8;
            let mut word = [0u8; 8];
            word.copy_from_slice(&bytes[start..start + 8]);
            *limb = u64::from_be_bytes(word);
        }
        Self { limbs }
    }

    /// Create from a big-endian slice of any length.
    ///
    /// Leading zero bytes are ignored. Returns `None` if the value does not
    /// fit in 256 bits.
    pub fn from_be_slice(bytes: &[u8]) -> Option<Self> {
        let first = bytes.iter().position(|&b| b != 0).unwrap_or(bytes.len());
        let trimmed = &bytes[first..];
        if trimmed.len() > 32 {
            return None;
        }
        let mut buf = [0u8; 32];
        buf[32 - trimmed.len()..].copy_from_slice(trimmed);
        Some(Self::from_be_bytes(&buf))
    }

    /// Convert to 32 big-endian bytes.
    pub fn to_be_bytes(&self) -> [u8; 32] {
        let mut bytes = [0u8; 32];
        bytes[0..8].copy_from_slice(&self.limbs[3].to_be_bytes());
        bytes[8..16].copy_from_slice(&self.limbs[2].to_be_bytes());
        bytes[16..24].copy_from_slice(&self.limbs[1].to_be_bytes());
        bytes[24..32].copy_from_slice(&self.limbs[0].to_be_bytes());
        bytes
    }

    /// Minimal big-endian encoding (no leading zeros, empty for zero).
    pub fn to_be_bytes_trimmed(&self) -> Vec<u8> {
        let bytes = self.to_be_bytes();
        let first = bytes.iter().position(|&b| b != 0).unwrap_or(32);
        bytes[first..].to_vec()
    }

    pub const fn is_zero(&self) -> bool {
        self.limbs[0] == 0 && self.limbs[1] == 0 && self.limbs[2] == 0 && self.limbs[3] == 0
    }

    pub const fn is_odd(&self) -> bool {
        self.limbs[0] & 1 == 1
    }

    /// Bit `i` (0 = least significant).
    pub const fn bit(&self, i: usize) -> bool {
        if i >= 256 {
            return false;
        }
        (self.limbs[i / 64] >> (i % 64)) & 1 == 1
    }

    /// Number of significant bits.
    pub const fn bits(&self) -> usize {
        let mut i = 4;
        while i > 0 {
            i -= 1;
            if self.limbs[i] != 0 {
                return i * 64 + (64 - self.limbs[i].leading_zeros() as usize);
            }
        }
        0
    }

    /// Number of significant bytes.
    pub const fn byte_len(&self) -> usize {
        self.bits().div_ceil(8)
    }

    /// self + other, returning the carry out.
    pub const fn overflowing_add(&self, other: &Self) -> (Self, bool) {
        let (r0, c) = adc(self.limbs[0], other.limbs[0], 0);
        let (r1, c) = adc(self.limbs[1], other.limbs[1], c);
        let (r2, c) = adc(self.limbs[2], other.limbs[2], c);
        let (r3, c) = adc(self.limbs[3], other.limbs[3], c);
        (
            Self {
                limbs: [r0, r1, r2, r3],
            },
            c != 0,
        )
    }

    /// self - other, returning the borrow out.
    pub const fn overflowing_sub(&self, other: &Self) -> (Self, bool) {
        let (r0, b) = sbb(self.limbs[0], other.limbs[0], 0);
        let (r1, b) = sbb(self.limbs[1], other.limbs[1], b);
        let (r2, b) = sbb(self.limbs[2], other.limbs[2], b);
        let (r3, b) = sbb(self.limbs[3], other.limbs[3], b);
        (
            Self {
                limbs: [r0, r1, r2, r3],
            },
            b != 0,
        )
    }

    pub const fn wrapping_add(&self, other: &Self) -> Self {
        self.overflowing_add(other).0
    }

    pub const fn wrapping_sub(&self, other: &Self) -> Self {
        self.overflowing_sub(other).0
    }

    /// Logical right shift. Shifts of 256 or more give zero.
    pub const fn shr(&self, n: u32) -> Self {
        let words = (n / 64) as usize;
        let bits = n % 64;
        let mut limbs = [0u64; 4];
        let mut i = 0;
        while i + words < 4 {
            let lo = self.limbs[i + words] >> bits;
            let hi = if bits != 0 && i + words + 1 < 4 {
                self.limbs[i + words + 1] << (64 - bits)
            } else {
                0
            };
            limbs[i] = lo | hi;
            i += 1;
        }
        Self { limbs }
    }

    /// Usable in const context, where `Ord` is not.
    pub const fn const_lt(&self, other: &Self) -> bool {
        let mut i = 4;
        while i > 0 {
            i -= 1;
            if self.limbs[i] < other.limbs[i] {
                return true;
            }
            if self.limbs[i] > other.limbs[i] {
                return false;
            }
        }
        false
    }
}

impl Ord for U256 {
    fn cmp(&self, other: &Self) -> Ordering {
        for i in (0..4).rev() {
            match self.limbs[i].cmp(&other.limbs[i]) {
                Ordering::Equal => continue,
                ord => return ord,
            }
        }
        Ordering::Equal
    }
}

impl PartialOrd for U256 {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Debug for U256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "U256(0x{self:x})")
    }
}

impl fmt::LowerHex for U256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for b in self.to_be_bytes() {
            write!(f, "{b:02x}")?;
        }
        Ok(())
    }
}

impl Zeroize for U256 {
    fn zeroize(&mut self) {
        self.limbs.zeroize();
    }
}

impl From<u64> for U256 {
    fn from(v: u64) -> Self {
        Self::from_u64(v)
    }
}

#[cfg(test)]
pub(crate) fn u256_from_hex(s: &str) -> U256 {
    let bytes = hex::decode(s).unwrap();
    U256::from_be_slice(&bytes).unwrap()
}
