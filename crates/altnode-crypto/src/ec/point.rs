//! Points on a short-Weierstrass curve.
//!
//! The public [`Point`] is affine and carries its curve. Arithmetic runs in
//! Jacobian coordinates: (X, Y, Z) represents affine (X/Z², Y/Z³), with
//! Z = 0 for the point at infinity.

#![forbid(unsafe_code)]

use std::sync::Arc;

use altnode_core::{Error, Result};

use super::curve::Curve;
use crate::bigint::U256;

/// SEC1 prefix for an uncompressed point.
pub const TAG_UNCOMPRESSED: u8 = 0x04;
/// SEC1 prefix for a compressed point with even y.
pub const TAG_EVEN: u8 = 0x02;
/// SEC1 prefix for a compressed point with odd y.
pub const TAG_ODD: u8 = 0x03;

#[derive(Clone, Copy, Debug)]
struct Jacobian {
    x: U256,
    y: U256,
    z: U256,
}

impl Jacobian {
    const INFINITY: Self = Self {
        x: U256::ONE,
        y: U256::ONE,
        z: U256::ZERO,
    };

    fn from_affine(x: U256, y: U256) -> Self {
        Self { x, y, z: U256::ONE }
    }

    fn is_infinity(&self) -> bool {
        self.z.is_zero()
    }

    fn to_affine(self, curve: &Curve) -> Option<(U256, U256)> {
        if self.is_infinity() {
            return None;
        }
        let p = curve.field();
        let z_inv = p.inv(&self.z)?;
        let z_inv2 = p.square(&z_inv);
        let z_inv3 = p.mul(&z_inv2, &z_inv);
        Some((p.mul(&self.x, &z_inv2), p.mul(&self.y, &z_inv3)))
    }

    /// 2P with M = 3X² + aZ⁴.
    fn double(&self, curve: &Curve) -> Self {
        if self.is_infinity() || self.y.is_zero() {
            return Self::INFINITY;
        }
        let p = curve.field();

        // S = 4*X*Y²
        let y2 = p.square(&self.y);
        let s = p.double(&p.double(&p.mul(&self.x, &y2)));

        // M = 3*X² + a*Z⁴
        let x2 = p.square(&self.x);
        let mut m = p.add(&p.double(&x2), &x2);
        if !curve.a().is_zero() {
            let z4 = p.square(&p.square(&self.z));
            m = p.add(&m, &p.mul(curve.a(), &z4));
        }

        // X3 = M² - 2*S
        let x3 = p.sub(&p.sub(&p.square(&m), &s), &s);

        // Y3 = M*(S - X3) - 8*Y⁴
        let y4_8 = p.double(&p.double(&p.double(&p.square(&y2))));
        let y3 = p.sub(&p.mul(&m, &p.sub(&s, &x3)), &y4_8);

        // Z3 = 2*Y*Z
        let z3 = p.double(&p.mul(&self.y, &self.z));

        Self {
            x: x3,
            y: y3,
            z: z3,
        }
    }

    fn add(&self, other: &Self, curve: &Curve) -> Self {
        if self.is_infinity() {
            return *other;
        }
        if other.is_infinity() {
            return *self;
        }
        let p = curve.field();

        let z1_2 = p.square(&self.z);
        let z2_2 = p.square(&other.z);
        let z1_3 = p.mul(&z1_2, &self.z);
        let z2_3 = p.mul(&z2_2, &other.z);

        // U1 = X1*Z2², U2 = X2*Z1²
        let u1 = p.mul(&self.x, &z2_2);
        let u2 = p.mul(&other.x, &z1_2);

        // S1 = Y1*Z2³, S2 = Y2*Z1³
        let s1 = p.mul(&self.y, &z2_3);
        let s2 = p.mul(&other.y, &z1_3);

        let h = p.sub(&u2, &u1);
        let r = p.sub(&s2, &s1);

        if h.is_zero() {
            return if r.is_zero() {
                self.double(curve)
            } else {
                Self::INFINITY
            };
        }

        let h2 = p.square(&h);
        let h3 = p.mul(&h2, &h);

        // X3 = R² - H³ - 2*U1*H²
        let u1_h2 = p.mul(&u1, &h2);
        let x3 = p.sub(&p.sub(&p.sub(&p.square(&r), &h3), &u1_h2), &u1_h2);

        // Y3 = R*(U1*H² - X3) - S1*H³
        let y3 = p.sub(&p.mul(&r, &p.sub(&u1_h2, &x3)), &p.mul(&s1, &h3));

        // Z3 = H*Z1*Z2
        let z3 = p.mul(&p.mul(&h, &self.z), &other.z);

        Self {
            x: x3,
            y: y3,
            z: z3,
        }
    }

    /// k*P, double-and-add from the top bit of k.
    fn mul(&self, k: &U256, curve: &Curve) -> Self {
        let mut acc = Self::INFINITY;
        for i in (0..k.bits()).rev() {
            acc = acc.double(curve);
            if k.bit(i) {
                acc = acc.add(self, curve);
            }
        }
        acc
    }
}

/// A point on `curve`, or the point at infinity.
#[derive(Clone, Debug)]
pub struct Point {
    curve: Arc<Curve>,
    coords: Option<(U256, U256)>,
}

impl Point {
    /// The point at infinity (identity element).
    pub fn infinity(curve: Arc<Curve>) -> Self {
        Self {
            curve,
            coords: None,
        }
    }

    /// Create from affine coordinates, checking the curve equation.
    pub fn from_affine(curve: Arc<Curve>, x: U256, y: U256) -> Result<Self> {
        let p = curve.field();
        if !p.contains(&x) || !p.contains(&y) {
            return Err(Error::Decode("coordinate not reduced mod p".into()));
        }
        if !curve.is_on_curve(&x, &y) {
            return Err(Error::Decode("point not on curve".into()));
        }
        Ok(Self {
            curve,
            coords: Some((x, y)),
        })
    }

    /// Caller guarantees that (x, y) lies on `curve`.
    pub(crate) fn from_affine_unchecked(curve: Arc<Curve>, x: U256, y: U256) -> Self {
        debug_assert!(curve.is_on_curve(&x, &y));
        Self {
            curve,
            coords: Some((x, y)),
        }
    }

    /// The generator G of `curve`.
    pub fn generator(curve: &Arc<Curve>) -> Self {
        Self {
            coords: Some(curve.generator_coords()),
            curve: Arc::clone(curve),
        }
    }

    fn from_jacobian(curve: &Arc<Curve>, j: Jacobian) -> Self {
        Self {
            coords: j.to_affine(curve),
            curve: Arc::clone(curve),
        }
    }

    fn to_jacobian(&self) -> Jacobian {
        match self.coords {
            Some((x, y)) => Jacobian::from_affine(x, y),
            None => Jacobian::INFINITY,
        }
    }

    pub fn curve(&self) -> &Arc<Curve> {
        &self.curve
    }

    pub fn is_infinity(&self) -> bool {
        self.coords.is_none()
    }

    /// Affine x coordinate, `None` at infinity.
    pub fn x(&self) -> Option<&U256> {
        self.coords.as_ref().map(|(x, _)| x)
    }

    /// Affine y coordinate, `None` at infinity.
    pub fn y(&self) -> Option<&U256> {
        self.coords.as_ref().map(|(_, y)| y)
    }

    pub fn is_on_curve(&self) -> bool {
        match &self.coords {
            Some((x, y)) => self.curve.is_on_curve(x, y),
            None => true,
        }
    }

    /// P + Q. Both points must belong to the same curve.
    pub fn add(&self, other: &Self) -> Self {
        debug_assert!(same_curve(&self.curve, &other.curve));
        let sum = self
            .to_jacobian()
            .add(&other.to_jacobian(), &self.curve);
        Self::from_jacobian(&self.curve, sum)
    }

    /// 2P.
    pub fn double(&self) -> Self {
        Self::from_jacobian(&self.curve, self.to_jacobian().double(&self.curve))
    }

    /// -P.
    pub fn negate(&self) -> Self {
        Self {
            curve: Arc::clone(&self.curve),
            coords: self
                .coords
                .map(|(x, y)| (x, self.curve.field().neg(&y))),
        }
    }

    /// k*P with k taken mod n. k ≡ 0 gives infinity.
    pub fn mul(&self, k: &U256) -> Self {
        let k = self.curve.order().reduce(k);
        self.mul_unreduced(&k)
    }

    /// k*P without reducing k first.
    pub(crate) fn mul_unreduced(&self, k: &U256) -> Self {
        if k.is_zero() || self.is_infinity() {
            return Self::infinity(Arc::clone(&self.curve));
        }
        Self::from_jacobian(&self.curve, self.to_jacobian().mul(k, &self.curve))
    }

    /// u1*G + u2*Q in one pass (Shamir's trick), scalars taken mod n.
    pub fn lincomb(u1: &U256, q: &Self, u2: &U256) -> Self {
        let curve = &q.curve;
        let n = curve.order();
        let (u1, u2) = (n.reduce(u1), n.reduce(u2));

        let (gx, gy) = curve.generator_coords();
        let g = Jacobian::from_affine(gx, gy);
        let qj = q.to_jacobian();
        let gq = g.add(&qj, curve);

        let mut acc = Jacobian::INFINITY;
        for i in (0..u1.bits().max(u2.bits())).rev() {
            acc = acc.double(curve);
            match (u1.bit(i), u2.bit(i)) {
                (true, true) => acc = acc.add(&gq, curve),
                (true, false) => acc = acc.add(&g, curve),
                (false, true) => acc = acc.add(&qj, curve),
                (false, false) => {}
            }
        }
        Self::from_jacobian(curve, acc)
    }

    /// Decode SEC1 bytes: `04‖X‖Y` or `02/03‖X`.
    pub fn from_sec1(curve: Arc<Curve>, bytes: &[u8]) -> Result<Self> {
        let width = curve.field_bytes();
        let (&tag, body) = bytes
            .split_first()
            .ok_or_else(|| Error::Decode("empty public key".into()))?;

        match tag {
            TAG_UNCOMPRESSED => {
                if body.len() != 2 * width {
                    return Err(bad_length(1 + 2 * width, bytes.len()));
                }
                let x = decode_coordinate(&body[..width])?;
                let y = decode_coordinate(&body[width..])?;
                Self::from_affine(curve, x, y)
            }
            TAG_EVEN | TAG_ODD => {
                if body.len() != width {
                    return Err(bad_length(1 + width, bytes.len()));
                }
                let x = decode_coordinate(body)?;
                let y = curve
                    .lift_x(&x, tag == TAG_ODD)
                    .ok_or_else(|| Error::Decode("x has no square root mod p".into()))?;
                Ok(Self::from_affine_unchecked(curve, x, y))
            }
            other => Err(Error::Decode(format!(
                "invalid public key prefix 0x{other:02x}"
            ))),
        }
    }

    /// Encode as SEC1. The compressed prefix follows y's parity.
    pub fn to_sec1(&self, compressed: bool) -> Result<Vec<u8>> {
        let (x, y) = self.coords.as_ref().ok_or(Error::PointAtInfinity)?;
        Ok(encode_sec1(&self.curve, x, y, compressed))
    }
}

pub(crate) fn encode_sec1(curve: &Curve, x: &U256, y: &U256, compressed: bool) -> Vec<u8> {
    let width = curve.field_bytes();
    let mut out = Vec::with_capacity(1 + 2 * width);
    if compressed {
        out.push(if y.is_odd() { TAG_ODD } else { TAG_EVEN });
        out.extend_from_slice(&x.to_be_bytes()[32 - width..]);
    } else {
        out.push(TAG_UNCOMPRESSED);
        out.extend_from_slice(&x.to_be_bytes()[32 - width..]);
        out.extend_from_slice(&y.to_be_bytes()[32 - width..]);
    }
    out
}

fn same_curve(a: &Arc<Curve>, b: &Arc<Curve>) -> bool {
    Arc::ptr_eq(a, b) || a == b
}

fn bad_length(expected: usize, got: usize) -> Error {
    Error::Decode(format!("public key must be {expected} bytes, got {got}"))
}

fn decode_coordinate(bytes: &[u8]) -> Result<U256> {
    U256::from_be_slice(bytes).ok_or_else(|| Error::Decode("coordinate too large".into()))
}

impl PartialEq for Point {
    fn eq(&self, other: &Self) -> bool {
        same_curve(&self.curve, &other.curve) && self.coords == other.coords
    }
}

impl Eq for Point {}
