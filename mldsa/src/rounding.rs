//! Power2Round, Decompose and the hint mechanism (FIPS 204 Algorithms 30-35).

use crate::params::{D, Q};
use crate::poly::Poly;
use crate::polyvec::PolyVec;
use crate::reduce::freeze;

/// Split r into (r1, r0) with r = r1·2^D + r0 and r0 in (-2^(D-1), 2^(D-1)].
pub fn power2round(r: i32) -> (i32, i32) {
    let r_plus = freeze(r);
    let half = 1 << (D - 1);
    let mut r0 = r_plus & ((1 << D) - 1);
    if r0 > half {
        r0 -= 1 << D;
    }
    ((r_plus - r0) >> D, r0)
}

/// Power2Round over a vector; returns (t1, t0).
pub fn power2round_vec(t: &PolyVec) -> (PolyVec, PolyVec) {
    let mut t1 = PolyVec::zero(t.len());
    let mut t0 = PolyVec::zero(t.len());
    for i in 0..t.len() {
        for j in 0..256 {
            let (hi, lo) = power2round(t.polys[i].coeffs[j]);
            t1.polys[i].coeffs[j] = hi;
            t0.polys[i].coeffs[j] = lo;
        }
    }
    (t1, t0)
}

/// Split r into (r1, r0) with r ≡ r1·2γ2 + r0 (mod Q) and r0 in (-γ2, γ2],
/// except that rPlus - r0 = Q - 1 maps to (0, r0 - 1).
pub fn decompose(r: i32, gamma2: i32) -> (i32, i32) {
    let r_plus = freeze(r);
    let alpha = 2 * gamma2;

    let mut r0 = r_plus % alpha;
    if r0 > gamma2 {
        r0 -= alpha;
    }

    if r_plus - r0 == Q - 1 {
        return (0, r0 - 1);
    }

    ((r_plus - r0) / alpha, r0)
}

/// The high part of Decompose.
pub fn high_bits(r: i32, gamma2: i32) -> i32 {
    decompose(r, gamma2).0
}

/// The low part of Decompose.
pub fn low_bits(r: i32, gamma2: i32) -> i32 {
    decompose(r, gamma2).1
}

/// HighBits over a vector.
pub fn high_bits_vec(r: &PolyVec, gamma2: i32) -> PolyVec {
    let mut out = PolyVec::zero(r.len());
    for i in 0..r.len() {
        for j in 0..256 {
            out.polys[i].coeffs[j] = high_bits(r.polys[i].coeffs[j], gamma2);
        }
    }
    out
}

/// LowBits over a vector.
pub fn low_bits_vec(r: &PolyVec, gamma2: i32) -> PolyVec {
    let mut out = PolyVec::zero(r.len());
    for i in 0..r.len() {
        for j in 0..256 {
            out.polys[i].coeffs[j] = low_bits(r.polys[i].coeffs[j], gamma2);
        }
    }
    out
}

/// Hint bit: 1 iff adding z changes the high bits of r.
pub fn make_hint(z: i32, r: i32, gamma2: i32) -> bool {
    high_bits(r, gamma2) != high_bits(freeze(r + z), gamma2)
}

/// Recover HighBits(r + z) from the hint, clamped to Z_m with
/// m = (Q - 1) / (2γ2).
pub fn use_hint(h: bool, r: i32, gamma2: i32) -> i32 {
    let m = (Q - 1) / (2 * gamma2);
    let (r1, r0) = decompose(r, gamma2);
    if !h {
        return r1;
    }
    if r0 > 0 {
        (r1 + 1).rem_euclid(m)
    } else {
        (r1 - 1).rem_euclid(m)
    }
}

/// MakeHint over vectors; returns the hint as 0/1 polynomials plus the
/// total popcount.
pub fn make_hint_vec(z: &PolyVec, r: &PolyVec, gamma2: i32) -> (PolyVec, usize) {
    debug_assert_eq!(z.len(), r.len());
    let mut hint = PolyVec::zero(z.len());
    let mut ones = 0;
    for i in 0..z.len() {
        for j in 0..256 {
            if make_hint(z.polys[i].coeffs[j], r.polys[i].coeffs[j], gamma2) {
                hint.polys[i].coeffs[j] = 1;
                ones += 1;
            }
        }
    }
    (hint, ones)
}

/// UseHint over vectors.
pub fn use_hint_vec(hint: &PolyVec, r: &PolyVec, gamma2: i32) -> PolyVec {
    debug_assert_eq!(hint.len(), r.len());
    let mut out = PolyVec::zero(r.len());
    for i in 0..r.len() {
        for j in 0..256 {
            out.polys[i].coeffs[j] =
                use_hint(hint.polys[i].coeffs[j] != 0, r.polys[i].coeffs[j], gamma2);
        }
    }
    out
}
