//! BabyJubJub elliptic curve operations
//!
//! Twisted Edwards curve over the BN254 scalar field used for stealth
//! addresses, note encryption and ElGamal vote aggregation.
//!
//! Curve equation: a*x^2 + y^2 = 1 + d*x^2*y^2 with a = 168700, d = 168696.
//! The prime-order subgroup has order
//! l = 2736030358979909402780800718157159386076813972158567259200215660948447373041.
//!
//! Points cross the API as affine 32-byte big-endian coordinate pairs;
//! arithmetic runs on projective coordinates internally. A point is valid
//! only if it is on the curve AND in the prime-order subgroup; every
//! externally-sourced point must pass [`Point::from_affine`].

use ark_bn254::Fr;
use ark_ff::{AdditiveGroup, Field, MontFp, One, Zero};
use num_bigint::BigUint;

use crate::constants::{SUBGROUP_ORDER, SUBGROUP_ORDER_BITS};
use crate::errors::{Result, SdkError};
use crate::field::{fr_from_bytes, fr_to_bytes};

/// Curve coefficient a
const COEFF_A: Fr = MontFp!("168700");
/// Curve coefficient d
const COEFF_D: Fr = MontFp!("168696");

/// x-coordinate of the prime-subgroup generator
const GENERATOR_X: Fr =
    MontFp!("5299619240641551281634865583518297030282874472190772894086521144482721001553");
/// y-coordinate of the prime-subgroup generator
const GENERATOR_Y: Fr =
    MontFp!("16950150798460657717958625567821834550301663161624707787222815936182638968203");

/// BabyJubJub point in affine coordinates (big-endian field bytes)
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Point {
    pub x: [u8; 32],
    pub y: [u8; 32],
}

impl Point {
    /// Identity element: (0, 1)
    pub fn identity() -> Self {
        let mut y = [0u8; 32];
        y[31] = 1;
        Self { x: [0u8; 32], y }
    }

    pub fn is_identity(&self) -> bool {
        *self == Self::identity()
    }

    /// The fixed prime-subgroup generator G.
    pub fn generator() -> Self {
        Affine {
            x: GENERATOR_X,
            y: GENERATOR_Y,
        }
        .into()
    }

    /// Construct from externally-sourced coordinates.
    ///
    /// Rejects with `InvalidPoint` unless the point is on the curve and in
    /// the prime-order subgroup. This is the mandatory ingress gate.
    pub fn from_affine(x: [u8; 32], y: [u8; 32]) -> Result<Self> {
        let point = Self { x, y };
        if !is_on_curve(&point)? {
            return Err(SdkError::InvalidPoint);
        }
        if !is_in_subgroup(&point)? {
            return Err(SdkError::InvalidPoint);
        }
        Ok(point)
    }

    fn to_inner(self) -> Result<Affine> {
        let x = fr_from_bytes(&self.x).map_err(|_| SdkError::InvalidPoint)?;
        let y = fr_from_bytes(&self.y).map_err(|_| SdkError::InvalidPoint)?;
        Ok(Affine { x, y })
    }
}

/// Internal affine representation
#[derive(Clone, Copy)]
struct Affine {
    x: Fr,
    y: Fr,
}

impl From<Affine> for Point {
    fn from(a: Affine) -> Self {
        Point {
            x: fr_to_bytes(&a.x),
            y: fr_to_bytes(&a.y),
        }
    }
}

/// Internal projective representation (x = X/Z, y = Y/Z)
#[derive(Clone, Copy)]
struct Projective {
    x: Fr,
    y: Fr,
    z: Fr,
}

impl Projective {
    fn identity() -> Self {
        Self {
            x: Fr::zero(),
            y: Fr::one(),
            z: Fr::one(),
        }
    }

    fn from_affine(a: &Affine) -> Self {
        Self {
            x: a.x,
            y: a.y,
            z: Fr::one(),
        }
    }

    fn to_affine(self) -> Result<Affine> {
        let z_inv = self.z.inverse().ok_or(SdkError::InvalidPoint)?;
        Ok(Affine {
            x: self.x * z_inv,
            y: self.y * z_inv,
        })
    }

    /// Unified projective addition; complete because d is a non-square.
    fn add(&self, other: &Projective) -> Projective {
        let a = self.z * other.z;
        let b = a.square();
        let c = self.x * other.x;
        let d = self.y * other.y;
        let e = COEFF_D * c * d;
        let f = b - e;
        let g = b + e;

        let x3 = a * f * ((self.x + self.y) * (other.x + other.y) - c - d);
        let y3 = a * g * (d - COEFF_A * c);
        let z3 = f * g;

        Projective {
            x: x3,
            y: y3,
            z: z3,
        }
    }

    fn double(&self) -> Projective {
        let b = (self.x + self.y).square();
        let c = self.x.square();
        let d = self.y.square();
        let e = COEFF_A * c;
        let f = e + d;
        let h = self.z.square();
        let j = f - h.double();

        Projective {
            x: (b - c - d) * j,
            y: f * (e - d),
            z: f * j,
        }
    }
}

/// Add two points.
pub fn add(p1: &Point, p2: &Point) -> Result<Point> {
    let a = Projective::from_affine(&p1.to_inner()?);
    let b = Projective::from_affine(&p2.to_inner()?);
    Ok(Point::from(a.add(&b).to_affine()?))
}

/// Double a point.
pub fn double(p: &Point) -> Result<Point> {
    let a = Projective::from_affine(&p.to_inner()?);
    Ok(Point::from(a.double().to_affine()?))
}

/// Negate a point: (x, y) -> (-x, y).
pub fn negate(p: &Point) -> Result<Point> {
    let inner = p.to_inner()?;
    Ok(Point::from(Affine {
        x: -inner.x,
        y: inner.y,
    }))
}

/// Scalar multiplication k*P.
///
/// The scalar is reduced mod the subgroup order first, then a fixed-width
/// bit scan over the order's bit length runs regardless of the scalar's
/// magnitude, so secret scalars take a data-independent path.
pub fn mul(p: &Point, scalar: &[u8; 32]) -> Result<Point> {
    let k = BigUint::from_bytes_be(scalar) % subgroup_order();
    ladder(p, &k, SUBGROUP_ORDER_BITS)
}

/// k*G for the fixed generator.
pub fn mul_base(scalar: &[u8; 32]) -> Result<Point> {
    mul(&Point::generator(), scalar)
}

/// Fixed-width double-and-add. No reduction: the subgroup check feeds the
/// order itself through here.
fn ladder(p: &Point, k: &BigUint, bits: usize) -> Result<Point> {
    let base = Projective::from_affine(&p.to_inner()?);
    let mut acc = Projective::identity();

    for i in (0..bits).rev() {
        acc = acc.double();
        if k.bit(i as u64) {
            acc = acc.add(&base);
        }
    }

    Ok(Point::from(acc.to_affine()?))
}

/// Check the twisted Edwards equation.
pub fn is_on_curve(p: &Point) -> Result<bool> {
    let inner = match p.to_inner() {
        Ok(inner) => inner,
        Err(_) => return Ok(false),
    };
    let x2 = inner.x.square();
    let y2 = inner.y.square();
    Ok(COEFF_A * x2 + y2 == Fr::one() + COEFF_D * x2 * y2)
}

/// Check prime-order subgroup membership: l*P must be the identity.
pub fn is_in_subgroup(p: &Point) -> Result<bool> {
    let order = subgroup_order();
    let result = ladder(p, &order, SUBGROUP_ORDER_BITS + 1)?;
    Ok(result.is_identity())
}

/// The subgroup order l as a big integer.
pub fn subgroup_order() -> BigUint {
    BigUint::from_bytes_be(&SUBGROUP_ORDER)
}

/// Reduce a 32-byte big-endian scalar mod l.
pub fn reduce_scalar(bytes: &[u8; 32]) -> [u8; 32] {
    let reduced = BigUint::from_bytes_be(bytes) % subgroup_order();
    scalar_to_bytes(&reduced)
}

/// (a + b) mod l
pub fn scalar_add(a: &[u8; 32], b: &[u8; 32]) -> [u8; 32] {
    let sum = (BigUint::from_bytes_be(a) + BigUint::from_bytes_be(b)) % subgroup_order();
    scalar_to_bytes(&sum)
}

/// (a * b) mod l
pub fn scalar_mul(a: &[u8; 32], b: &[u8; 32]) -> [u8; 32] {
    let prod = (BigUint::from_bytes_be(a) * BigUint::from_bytes_be(b)) % subgroup_order();
    scalar_to_bytes(&prod)
}

/// True if 0 < s < l.
pub fn scalar_is_valid(bytes: &[u8; 32]) -> bool {
    let s = BigUint::from_bytes_be(bytes);
    s != BigUint::from(0u8) && s < subgroup_order()
}

/// Left-pad a big integer to 32 big-endian bytes.
pub fn scalar_to_bytes(value: &BigUint) -> [u8; 32] {
    let raw = value.to_bytes_be();
    let mut out = [0u8; 32];
    out[32 - raw.len()..].copy_from_slice(&raw);
    out
}
