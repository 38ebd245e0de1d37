//! Arithmetic modulo an odd 256-bit modulus.
//!
//! Used for both the field prime p and the group order n. Multiplication
//! goes through Montgomery reduction (CIOS); operands and results are kept
//! in canonical form so callers never see Montgomery representation.

#![forbid(unsafe_code)]

use crate::bigint::{adc, mac, U256};

/// An odd modulus m > 2 with its Montgomery constants.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Modulus {
    m: U256,
    /// -m^(-1) mod 2^64.
    m_inv: u64,
    /// R^2 mod m, R = 2^256.
    r2: U256,
}

impl Modulus {
    /// Precompute constants for `m`. Returns `None` if `m` is even or < 3.
    pub const fn new(m: U256) -> Option<Self> {
        if !m.is_odd() || m.const_lt(&U256::from_u64(3)) {
            return None;
        }

        // Newton iteration: each step doubles the number of correct low bits.
        let m0 = m.limbs()[0];
        let mut inv: u64 = 1;
        let mut i = 0;
        while i < 6 {
            inv = inv.wrapping_mul(2u64.wrapping_sub(m0.wrapping_mul(inv)));
            i += 1;
        }

        // 2^512 mod m by repeated doubling of 1.
        let mut r2 = U256::ONE;
        let mut i = 0;
        while i < 512 {
            let (sum, carry) = r2.overflowing_add(&r2);
            r2 = if carry || !sum.const_lt(&m) {
                sum.wrapping_sub(&m)
            } else {
                sum
            };
            i += 1;
        }

        Some(Self {
            m,
            m_inv: inv.wrapping_neg(),
            r2,
        })
    }

    /// The modulus value.
    pub const fn value(&self) -> &U256 {
        &self.m
    }

    /// floor(m / 2).
    pub const fn half(&self) -> U256 {
        self.m.shr(1)
    }

    /// True if `x < m`.
    pub fn contains(&self, x: &U256) -> bool {
        *x < self.m
    }

    /// Montgomery product a * b * R^(-1) mod m.
    /// Requires a * b < m * R, which holds whenever one operand is < m.
    fn mont_mul(&self, a: &U256, b: &U256) -> U256 {
        let a = a.limbs();
        let b = b.limbs();
        let m = self.m.limbs();
        let mut t = [0u64; 6];

        for &bi in b.iter() {
            let mut c = 0;
            for j in 0..4 {
                (t[j], c) = mac(t[j], a[j], bi, c);
            }
            let (t4, c4) = adc(t[4], c, 0);
            t[4] = t4;
            t[5] = c4;

            let u = t[0].wrapping_mul(self.m_inv);
            let (_, mut c) = mac(t[0], u, m[0], 0);
            for j in 1..4 {
                (t[j - 1], c) = mac(t[j], u, m[j], c);
            }
            let (t3, c3) = adc(t[4], c, 0);
            t[3] = t3;
            t[4] = t[5] + c3;
        }

        let r = U256::from_limbs([t[0], t[1], t[2], t[3]]);
        if t[4] != 0 || r >= self.m {
            r.wrapping_sub(&self.m)
        } else {
            r
        }
    }

    /// x mod m for any 256-bit x.
    pub fn reduce(&self, x: &U256) -> U256 {
        if *x < self.m {
            return *x;
        }
        let xr = self.mont_mul(x, &self.r2);
        self.mont_mul(&xr, &U256::ONE)
    }

    /// a + b mod m. Operands must be reduced.
    pub fn add(&self, a: &U256, b: &U256) -> U256 {
        let (sum, carry) = a.overflowing_add(b);
        if carry || sum >= self.m {
            sum.wrapping_sub(&self.m)
        } else {
            sum
        }
    }

    /// a - b mod m. Operands must be reduced.
    pub fn sub(&self, a: &U256, b: &U256) -> U256 {
        let (diff, borrow) = a.overflowing_sub(b);
        if borrow {
            diff.wrapping_add(&self.m)
        } else {
            diff
        }
    }

    /// 2a mod m.
    pub fn double(&self, a: &U256) -> U256 {
        self.add(a, a)
    }

    /// -a mod m.
    pub fn neg(&self, a: &U256) -> U256 {
        if a.is_zero() {
            *a
        } else {
            self.m.wrapping_sub(a)
        }
    }

    /// a * b mod m. Operands must be reduced.
    pub fn mul(&self, a: &U256, b: &U256) -> U256 {
        let ab = self.mont_mul(a, b);
        self.mont_mul(&ab, &self.r2)
    }

    pub fn square(&self, a: &U256) -> U256 {
        self.mul(a, a)
    }

    /// base^exp mod m, square-and-multiply from the top bit.
    pub fn pow(&self, base: &U256, exp: &U256) -> U256 {
        let base_m = self.mont_mul(&self.reduce(base), &self.r2);
        let mut acc = self.mont_mul(&U256::ONE, &self.r2);

        for i in (0..exp.bits()).rev() {
            acc = self.mont_mul(&acc, &acc);
            if exp.bit(i) {
                acc = self.mont_mul(&acc, &base_m);
            }
        }

        self.mont_mul(&acc, &U256::ONE)
    }

    /// Multiplicative inverse via Fermat: a^(m-2). Valid for prime m only.
    pub fn inv(&self, a: &U256) -> Option<U256> {
        let a = self.reduce(a);
        if a.is_zero() {
            return None;
        }
        let exp = self.m.wrapping_sub(&U256::from_u64(2));
        Some(self.pow(&a, &exp))
    }

    /// Square root for prime m ≡ 3 (mod 4): a^((m+1)/4).
    ///
    /// Returns `None` if `a` is not a quadratic residue or the modulus does
    /// not have that shape.
    pub fn sqrt(&self, a: &U256) -> Option<U256> {
        if self.m.limbs()[0] & 3 != 3 {
            return None;
        }
        let a = self.reduce(a);
        // (m + 1) / 4 == (m >> 2) + 1 when m ≡ 3 (mod 4), without overflow.
        let exp = self.m.shr(2).wrapping_add(&U256::ONE);
        let root = self.pow(&a, &exp);
        if self.square(&root) == a {
            Some(root)
        } else {
            None
        }
    }
}
