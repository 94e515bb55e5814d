//! Low-level pieces of the threshold protocol: the hyperball sampler over
//! floats, the 23-bit wire coders and modular aggregation.

use quorum_mldsa::packing::{pack_bits, unpack_bits};
use quorum_mldsa::reduce::center;
use quorum_mldsa::{Poly, PolyVec, N, Q};
use sha3::{
    digest::{ExtendableOutput, Update, XofReader},
    Shake256,
};
use zeroize::Zeroize;

use crate::error::{ThresholdError, ThresholdResult};

/// Bytes per polynomial packed at 23 bits per coefficient.
pub(crate) const POLY_Q_SIZE: usize = N * 23 / 8;

/// Domain byte prefixed to ρ' for hyperball expansion.
const HYPERBALL_DOMAIN: u8 = 0x48;

/// A float vector over the full N·(K+L) sampling space.
///
/// The first N·L coordinates are the L-block (the eventual response mask),
/// the remainder the K-block (the commitment error). Owns sensitive data;
/// callers zeroize it on every exit path.
#[derive(Clone)]
pub(crate) struct FVec {
    pub(crate) data: Box<[f64]>,
}

impl Zeroize for FVec {
    fn zeroize(&mut self) {
        for x in self.data.iter_mut() {
            *x = 0.0;
        }
    }
}

impl FVec {
    pub(crate) fn new(dim: usize) -> Self {
        Self { data: vec![0.0f64; dim].into_boxed_slice() }
    }

    /// Draw a uniform point from the radius-r′ ball, stretching the
    /// L-block by ν.
    ///
    /// Expansion is SHAKE256(0x48 ∥ ρ' ∥ nonce_le16); 8·(dim+2) bytes are
    /// read so the Box-Muller pairs come out even, and the squared norm
    /// accumulates over all of them, including the surplus pair, before
    /// any scaling. Each u64 is converted by taking its top 53 bits.
    pub(crate) fn sample_hyperball(
        &mut self,
        r_prime: f64,
        nu: f64,
        l: usize,
        rhop: &[u8; 64],
        nonce: u16,
    ) {
        use std::f64::consts::PI;

        let dim = self.data.len();
        let total = dim + 2;

        let mut hasher = Shake256::default();
        hasher.update(&[HYPERBALL_DOMAIN]);
        hasher.update(rhop);
        hasher.update(&nonce.to_le_bytes());
        let mut reader = hasher.finalize_xof();
        let mut buf = vec![0u8; total * 8];
        reader.read(&mut buf);

        let mut samples = vec![0.0f64; total];
        let mut sq = 0.0f64;
        for i in (0..total).step_by(2) {
            let u1 = uniform_unit(&buf[i * 8..(i + 1) * 8]);
            let u2 = uniform_unit(&buf[(i + 1) * 8..(i + 2) * 8]);

            let radius = (-2.0 * u1.ln()).sqrt();
            let z1 = radius * (2.0 * PI * u2).cos();
            let z2 = radius * (2.0 * PI * u2).sin();

            samples[i] = z1;
            sq += z1 * z1;
            if i + 1 < total {
                samples[i + 1] = z2;
                sq += z2 * z2;
            }

            if i < N * l {
                samples[i] *= nu;
                if i + 1 < N * l {
                    samples[i + 1] *= nu;
                }
            }
        }

        let factor = r_prime / sq.sqrt();
        for i in 0..dim {
            self.data[i] = samples[i] * factor;
        }
        samples.zeroize();
        buf.zeroize();
    }

    /// Round to integer vectors: the L-block becomes `y` (l polynomials),
    /// the K-block `e` (k polynomials), both in normal form [0, Q).
    pub(crate) fn round(&self, l: usize, k: usize) -> (PolyVec, PolyVec) {
        debug_assert_eq!(self.data.len(), N * (l + k));
        let mut y = PolyVec::zero(l);
        let mut e = PolyVec::zero(k);
        for i in 0..l {
            for j in 0..N {
                y.polys[i].coeffs[j] = round_coeff(self.data[i * N + j]);
            }
        }
        for i in 0..k {
            for j in 0..N {
                e.polys[i].coeffs[j] = round_coeff(self.data[(l + i) * N + j]);
            }
        }
        (y, e)
    }

    /// Load integer vectors as a float vector over centered representatives.
    pub(crate) fn from_polyvecs(zl: &PolyVec, zk: &PolyVec) -> Self {
        let l = zl.len();
        let k = zk.len();
        let mut fv = FVec::new(N * (l + k));
        for i in 0..l {
            for j in 0..N {
                fv.data[i * N + j] = center(zl.polys[i].coeffs[j]) as f64;
            }
        }
        for i in 0..k {
            for j in 0..N {
                fv.data[(l + i) * N + j] = center(zk.polys[i].coeffs[j]) as f64;
            }
        }
        fv
    }

    /// Pointwise addition.
    pub(crate) fn add(&mut self, other: &FVec) {
        debug_assert_eq!(self.data.len(), other.data.len());
        for (a, b) in self.data.iter_mut().zip(other.data.iter()) {
            *a += *b;
        }
    }

    /// True iff the weighted squared norm exceeds r²; the L-block
    /// contributes x²/ν².
    pub(crate) fn excess(&self, r: f64, nu: f64, l: usize) -> bool {
        let nu_sq = nu * nu;
        let mut sum = 0.0f64;
        for (i, &x) in self.data.iter().enumerate() {
            if i < N * l {
                sum += x * x / nu_sq;
            } else {
                sum += x * x;
            }
        }
        sum > r * r
    }
}

/// Top-53-bit conversion of a little-endian u64 into [0, 1), with the zero
/// case clamped to the smallest positive subnormal so ln never sees 0.
#[inline]
fn uniform_unit(bytes: &[u8]) -> f64 {
    let u = u64::from_le_bytes(bytes.try_into().expect("8-byte chunk"));
    let f = (u >> 11) as f64 * (1.0 / 9007199254740992.0); // 2^-53
    if f == 0.0 {
        f64::from_bits(1)
    } else {
        f
    }
}

#[inline]
fn round_coeff(x: f64) -> i32 {
    let mut c = (x.round() as i64 % Q as i64) as i32;
    if c > Q / 2 {
        c -= Q;
    } else if c < -(Q / 2) {
        c += Q;
    }
    if c < 0 {
        c += Q;
    }
    c
}

// ============================================================================
// 23-bit wire coders
// ============================================================================

/// Pack one polynomial at 23 bits per coefficient (little-endian stream).
pub(crate) fn pack_poly_q(out: &mut Vec<u8>, poly: &Poly) {
    let vals: Vec<u32> = poly.coeffs.iter().map(|&c| {
        debug_assert!((0..Q).contains(&c));
        c as u32
    }).collect();
    pack_bits(out, &vals, 23);
}

/// Unpack one polynomial, rejecting any coefficient ≥ Q.
pub(crate) fn unpack_poly_q(buf: &[u8]) -> ThresholdResult<Poly> {
    debug_assert_eq!(buf.len(), POLY_Q_SIZE);
    let vals = unpack_bits(buf, N, 23);
    let mut poly = Poly::zero();
    for (i, &v) in vals.iter().enumerate() {
        if v >= Q as u32 {
            return Err(ThresholdError::InvalidCoefficient);
        }
        poly.coeffs[i] = v as i32;
    }
    Ok(poly)
}

/// Pack a polynomial vector at 23 bits per coefficient, no padding.
pub(crate) fn pack_polyvec_q(out: &mut Vec<u8>, v: &PolyVec) {
    for poly in &v.polys {
        pack_poly_q(out, poly);
    }
}

/// Unpack `len` polynomials from a 23-bit stream.
pub(crate) fn unpack_polyvec_q(buf: &[u8], len: usize) -> ThresholdResult<PolyVec> {
    if buf.len() != len * POLY_Q_SIZE {
        return Err(ThresholdError::InvalidMessageSize {
            kind: "packed polynomial vector",
            expected: len * POLY_Q_SIZE,
            actual: buf.len(),
        });
    }
    let mut v = PolyVec::zero(len);
    for i in 0..len {
        v.polys[i] = unpack_poly_q(&buf[i * POLY_Q_SIZE..(i + 1) * POLY_Q_SIZE])?;
    }
    Ok(v)
}

/// Add `other` into `acc` coefficientwise mod Q.
pub(crate) fn aggregate_mod_q(acc: &mut PolyVec, other: &PolyVec) {
    debug_assert_eq!(acc.len(), other.len());
    for i in 0..acc.len() {
        for j in 0..N {
            let sum = acc.polys[i].coeffs[j] as i64 + other.polys[i].coeffs[j] as i64;
            acc.polys[i].coeffs[j] = (sum % Q as i64) as i32;
        }
    }
}
