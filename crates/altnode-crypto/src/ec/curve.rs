//! Short-Weierstrass domain parameters: y² = x³ + ax + b over GF(p).
//!
//! [`SECP256K1`] is evaluated at compile time. Other curves only appear
//! when a DER private key carries explicit parameters.

#![forbid(unsafe_code)]

use std::sync::Arc;

use altnode_core::{Error, Result};

use super::point::Point;
use crate::bigint::U256;
use crate::modular::Modulus;

/// p = 2^256 - 2^32 - 977.
const SECP256K1_P: U256 = U256::from_limbs([
    0xFFFFFFFEFFFFFC2F,
    0xFFFFFFFFFFFFFFFF,
    0xFFFFFFFFFFFFFFFF,
    0xFFFFFFFFFFFFFFFF,
]);

const SECP256K1_N: U256 = U256::from_limbs([
    0xBFD25E8CD0364141,
    0xBAAEDCE6AF48A03B,
    0xFFFFFFFFFFFFFFFE,
    0xFFFFFFFFFFFFFFFF,
]);

const SECP256K1_GX: U256 = U256::from_limbs([
    0x59F2815B16F81798,
    0x029BFCDB2DCE28D9,
    0x55A06295CE870B07,
    0x79BE667EF9DCBBAC,
]);

const SECP256K1_GY: U256 = U256::from_limbs([
    0x9C47D08FFB10D4B8,
    0xFD17B448A6855419,
    0x5DA4FBFC0E1108A8,
    0x483ADA7726A3C465,
]);

const fn const_modulus(m: U256) -> Modulus {
    match Modulus::new(m) {
        Some(modulus) => modulus,
        None => panic!("modulus must be odd"),
    }
}

/// The secp256k1 curve.
pub const SECP256K1: Curve = Curve {
    p: const_modulus(SECP256K1_P),
    a: U256::ZERO,
    b: U256::from_u64(7),
    gx: SECP256K1_GX,
    gy: SECP256K1_GY,
    n: const_modulus(SECP256K1_N),
    cofactor: U256::ONE,
};

/// Elliptic curve domain parameters.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Curve {
    p: Modulus,
    a: U256,
    b: U256,
    gx: U256,
    gy: U256,
    n: Modulus,
    cofactor: U256,
}

impl Curve {
    /// Build and validate a custom curve.
    ///
    /// Checks that p and n are odd, that a, b and G are reduced mod p, that
    /// the curve is non-singular, that G lies on it and that n·G is the
    /// identity. Primality of p and n is not checked.
    pub fn new(
        p: U256,
        a: U256,
        b: U256,
        generator: (U256, U256),
        n: U256,
        cofactor: U256,
    ) -> Result<Self> {
        let p = Modulus::new(p)
            .ok_or_else(|| Error::InvalidCurve("field prime must be odd".into()))?;
        let n = Modulus::new(n)
            .ok_or_else(|| Error::InvalidCurve("group order must be odd".into()))?;

        let (gx, gy) = generator;
        for (name, v) in [("a", &a), ("b", &b), ("Gx", &gx), ("Gy", &gy)] {
            if !p.contains(v) {
                return Err(Error::InvalidCurve(format!("{name} is not reduced mod p")));
            }
        }

        // 4a³ + 27b² != 0
        let a3 = p.mul(&p.square(&a), &a);
        let disc = p.add(
            &p.mul(&U256::from_u64(4), &a3),
            &p.mul(&U256::from_u64(27), &p.square(&b)),
        );
        if disc.is_zero() {
            return Err(Error::InvalidCurve("curve is singular".into()));
        }

        let curve = Self {
            p,
            a,
            b,
            gx,
            gy,
            n,
            cofactor,
        };

        if !curve.is_on_curve(&gx, &gy) {
            return Err(Error::InvalidCurve("generator is not on the curve".into()));
        }

        let curve = Arc::new(curve);
        if !Point::generator(&curve).mul_unreduced(n.value()).is_infinity() {
            return Err(Error::InvalidCurve("generator order is not n".into()));
        }

        Ok(Arc::unwrap_or_clone(curve))
    }

    /// Like [`Curve::new`], with G given as a SEC1 encoding.
    pub fn with_encoded_generator(
        p: U256,
        a: U256,
        b: U256,
        generator: &[u8],
        n: U256,
        cofactor: U256,
    ) -> Result<Self> {
        let field = Modulus::new(p)
            .ok_or_else(|| Error::InvalidCurve("field prime must be odd".into()))?;
        // Decoding G only needs p, a and b.
        let provisional = Arc::new(Self {
            p: field,
            a,
            b,
            gx: U256::ZERO,
            gy: U256::ZERO,
            n: field,
            cofactor,
        });
        let g = Point::from_sec1(provisional, generator)
            .map_err(|e| Error::InvalidCurve(format!("base point: {e}")))?;
        match (g.x(), g.y()) {
            (Some(x), Some(y)) => Self::new(p, a, b, (*x, *y), n, cofactor),
            _ => Err(Error::InvalidCurve("base point is the identity".into())),
        }
    }

    /// A shared handle to [`SECP256K1`].
    pub fn secp256k1() -> Arc<Self> {
        Arc::new(SECP256K1)
    }

    /// The field prime p.
    pub fn field(&self) -> &Modulus {
        &self.p
    }

    /// The group order n.
    pub fn order(&self) -> &Modulus {
        &self.n
    }

    pub fn a(&self) -> &U256 {
        &self.a
    }

    pub fn b(&self) -> &U256 {
        &self.b
    }

    pub fn cofactor(&self) -> &U256 {
        &self.cofactor
    }

    /// Affine coordinates of the generator G.
    pub fn generator_coords(&self) -> (U256, U256) {
        (self.gx, self.gy)
    }

    /// Width of a field element in bytes.
    pub fn field_bytes(&self) -> usize {
        self.p.value().byte_len()
    }

    /// Width of a scalar in bytes.
    pub fn order_bytes(&self) -> usize {
        self.n.value().byte_len()
    }

    pub fn is_secp256k1(&self) -> bool {
        *self == SECP256K1
    }

    /// x³ + ax + b mod p.
    pub(crate) fn rhs(&self, x: &U256) -> U256 {
        let p = &self.p;
        let x3 = p.mul(&p.square(x), x);
        let ax = p.mul(&self.a, x);
        p.add(&p.add(&x3, &ax), &self.b)
    }

    /// True if (x, y) satisfies the curve equation. Coordinates must be < p.
    pub fn is_on_curve(&self, x: &U256, y: &U256) -> bool {
        self.p.square(y) == self.rhs(x)
    }

    /// The y coordinate for `x` with the requested parity, if x is on the curve.
    pub fn lift_x(&self, x: &U256, odd: bool) -> Option<U256> {
        if !self.p.contains(x) {
            return None;
        }
        let y = self.p.sqrt(&self.rhs(x))?;
        if y.is_odd() == odd {
            Some(y)
        } else {
            Some(self.p.neg(&y))
        }
    }
}
