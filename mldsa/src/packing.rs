//! Bit-packed coders for keys, signatures and intermediate vectors.
//!
//! All coders write little-endian bit streams: coefficient i occupies bits
//! [i*d, (i+1)*d) of the stream, least significant bit first.

use crate::error::MlDsaError;
use crate::params::{Params, D, N};
use crate::polyvec::PolyVec;
use crate::reduce::center;

/// Pack `vals` at `d` bits each into a little-endian bit stream.
pub fn pack_bits(out: &mut Vec<u8>, vals: &[u32], d: usize) {
    debug_assert!(d <= 24);
    let mut acc: u64 = 0;
    let mut bits = 0;
    for &v in vals {
        debug_assert!(v >> d == 0);
        acc |= (v as u64) << bits;
        bits += d;
        while bits >= 8 {
            out.push((acc & 0xFF) as u8);
            acc >>= 8;
            bits -= 8;
        }
    }
    if bits > 0 {
        out.push((acc & 0xFF) as u8);
    }
}

/// Read `n` values of `d` bits each from a little-endian bit stream.
pub fn unpack_bits(buf: &[u8], n: usize, d: usize) -> Vec<u32> {
    debug_assert!(d <= 24);
    debug_assert!(buf.len() * 8 >= n * d);
    let mut vals = Vec::with_capacity(n);
    let mut acc: u64 = 0;
    let mut bits = 0;
    let mut pos = 0;
    for _ in 0..n {
        while bits < d {
            acc |= (buf[pos] as u64) << bits;
            pos += 1;
            bits += 8;
        }
        vals.push((acc & ((1 << d) - 1)) as u32);
        acc >>= d;
        bits -= d;
    }
    vals
}

// ============================================================================
// Polynomial coders
// ============================================================================

/// Pack t1 at 10 bits per coefficient (unsigned).
pub fn pack_t1(out: &mut Vec<u8>, t1: &PolyVec) {
    for poly in &t1.polys {
        let vals: Vec<u32> = poly.coeffs.iter().map(|&c| c as u32).collect();
        pack_bits(out, &vals, 10);
    }
}

/// Unpack t1 (k polynomials of 10-bit coefficients).
pub fn unpack_t1(buf: &[u8], k: usize) -> PolyVec {
    let mut t1 = PolyVec::zero(k);
    for (i, poly) in t1.polys.iter_mut().enumerate() {
        let vals = unpack_bits(&buf[i * 320..(i + 1) * 320], N, 10);
        for (j, &v) in vals.iter().enumerate() {
            poly.coeffs[j] = v as i32;
        }
    }
    t1
}

/// Pack t0 at 13 bits per coefficient, centered around 2^(D-1).
pub fn pack_t0(out: &mut Vec<u8>, t0: &PolyVec) {
    let half = 1 << (D - 1);
    for poly in &t0.polys {
        let vals: Vec<u32> = poly.coeffs.iter().map(|&c| (half - c) as u32).collect();
        pack_bits(out, &vals, 13);
    }
}

/// Unpack t0 (k polynomials of 13-bit coefficients).
pub fn unpack_t0(buf: &[u8], k: usize) -> PolyVec {
    let half = 1 << (D - 1);
    let poly_size = N * D / 8;
    let mut t0 = PolyVec::zero(k);
    for (i, poly) in t0.polys.iter_mut().enumerate() {
        let vals = unpack_bits(&buf[i * poly_size..(i + 1) * poly_size], N, 13);
        for (j, &v) in vals.iter().enumerate() {
            poly.coeffs[j] = half - v as i32;
        }
    }
    t0
}

/// Pack s1/s2 at 3 or 4 bits per coefficient as η - coeff.
pub fn pack_eta(out: &mut Vec<u8>, s: &PolyVec, params: &Params) {
    for poly in &s.polys {
        let vals: Vec<u32> = poly.coeffs.iter().map(|&c| (params.eta - center(c)) as u32).collect();
        pack_bits(out, &vals, params.eta_bits());
    }
}

/// Unpack an η-packed vector of `len` polynomials.
pub fn unpack_eta(buf: &[u8], len: usize, params: &Params) -> PolyVec {
    let poly_size = N * params.eta_bits() / 8;
    let mut s = PolyVec::zero(len);
    for (i, poly) in s.polys.iter_mut().enumerate() {
        let vals = unpack_bits(&buf[i * poly_size..(i + 1) * poly_size], N, params.eta_bits());
        for (j, &v) in vals.iter().enumerate() {
            poly.coeffs[j] = params.eta - v as i32;
        }
    }
    s
}

/// Pack z at 18 or 20 bits per coefficient as γ1 - coeff over centered
/// representatives.
pub fn pack_z(out: &mut Vec<u8>, z: &PolyVec, params: &Params) {
    for poly in &z.polys {
        let vals: Vec<u32> =
            poly.coeffs.iter().map(|&c| (params.gamma1 - center(c)) as u32).collect();
        pack_bits(out, &vals, params.gamma1_bits());
    }
}

/// Unpack z (l polynomials); output coefficients are centered.
pub fn unpack_z(buf: &[u8], params: &Params) -> PolyVec {
    let poly_size = N * params.gamma1_bits() / 8;
    let mut z = PolyVec::zero(params.l);
    for (i, poly) in z.polys.iter_mut().enumerate() {
        let vals = unpack_bits(&buf[i * poly_size..(i + 1) * poly_size], N, params.gamma1_bits());
        for (j, &v) in vals.iter().enumerate() {
            poly.coeffs[j] = params.gamma1 - v as i32;
        }
    }
    z
}

/// Encode w1 at 6 bits (γ2 = (Q-1)/88) or 4 bits per coefficient.
pub fn pack_w1(w1: &PolyVec, params: &Params) -> Vec<u8> {
    let mut out = Vec::with_capacity(w1.len() * N * params.w1_bits() / 8);
    for poly in &w1.polys {
        let vals: Vec<u32> = poly.coeffs.iter().map(|&c| c as u32).collect();
        pack_bits(&mut out, &vals, params.w1_bits());
    }
    out
}

// ============================================================================
// Hint coder
// ============================================================================

/// Encode the hint into ω + k bytes: ascending 1-positions per row, then a
/// running prefix-sum cursor per row.
pub fn pack_hint(out: &mut Vec<u8>, hint: &PolyVec, params: &Params) {
    let start = out.len();
    out.resize(start + params.omega + params.k, 0);
    let buf = &mut out[start..];

    let mut index = 0;
    for (i, poly) in hint.polys.iter().enumerate() {
        for (j, &c) in poly.coeffs.iter().enumerate() {
            if c != 0 {
                buf[index] = j as u8;
                index += 1;
            }
        }
        buf[params.omega + i] = index as u8;
    }
}

/// Decode the hint, rejecting any malformed encoding: decreasing cursors,
/// non-increasing indices within a row, or nonzero padding after the last
/// cursor.
pub fn unpack_hint(buf: &[u8], params: &Params) -> Result<PolyVec, MlDsaError> {
    if buf.len() != params.omega + params.k {
        return Err(MlDsaError::InvalidLength {
            kind: "hint",
            expected: params.omega + params.k,
            actual: buf.len(),
        });
    }

    let mut hint = PolyVec::zero(params.k);
    let mut index = 0usize;
    for i in 0..params.k {
        let cursor = buf[params.omega + i] as usize;
        if cursor < index || cursor > params.omega {
            return Err(MlDsaError::InvalidEncoding("hint cursor out of order"));
        }
        let mut first = true;
        let mut prev = 0u8;
        for &pos in &buf[index..cursor] {
            if !first && pos <= prev {
                return Err(MlDsaError::InvalidEncoding("hint indices not ascending"));
            }
            first = false;
            prev = pos;
            hint.polys[i].coeffs[pos as usize] = 1;
        }
        index = cursor;
    }
    for &b in &buf[index..params.omega] {
        if b != 0 {
            return Err(MlDsaError::InvalidEncoding("nonzero hint padding"));
        }
    }
    Ok(hint)
}

// ============================================================================
// Key and signature coders
// ============================================================================

/// Public key layout: ρ ∥ t1.
pub fn pack_pk(rho: &[u8; 32], t1: &PolyVec, params: &Params) -> Vec<u8> {
    let mut out = Vec::with_capacity(params.public_key_size());
    out.extend_from_slice(rho);
    pack_t1(&mut out, t1);
    out
}

/// Decode a public key into (ρ, t1).
pub fn unpack_pk(bytes: &[u8], params: &Params) -> Result<([u8; 32], PolyVec), MlDsaError> {
    if bytes.len() != params.public_key_size() {
        return Err(MlDsaError::InvalidLength {
            kind: "public key",
            expected: params.public_key_size(),
            actual: bytes.len(),
        });
    }
    let mut rho = [0u8; 32];
    rho.copy_from_slice(&bytes[..32]);
    Ok((rho, unpack_t1(&bytes[32..], params.k)))
}

/// Secret key layout: ρ ∥ K ∥ tr ∥ s1 ∥ s2 ∥ t0.
#[allow(clippy::too_many_arguments)]
pub fn pack_sk(
    rho: &[u8; 32],
    key: &[u8; 32],
    tr: &[u8; 64],
    s1: &PolyVec,
    s2: &PolyVec,
    t0: &PolyVec,
    params: &Params,
) -> Vec<u8> {
    let mut out = Vec::with_capacity(params.secret_key_size());
    out.extend_from_slice(rho);
    out.extend_from_slice(key);
    out.extend_from_slice(tr);
    pack_eta(&mut out, s1, params);
    pack_eta(&mut out, s2, params);
    pack_t0(&mut out, t0);
    out
}

/// Decoded secret key fields.
pub struct UnpackedSk {
    /// Matrix seed.
    pub rho: [u8; 32],
    /// Signing key seed.
    pub key: [u8; 32],
    /// Public key hash.
    pub tr: [u8; 64],
    /// Secret vector s1.
    pub s1: PolyVec,
    /// Secret vector s2.
    pub s2: PolyVec,
    /// Low key bits t0.
    pub t0: PolyVec,
}

/// Decode a secret key.
pub fn unpack_sk(bytes: &[u8], params: &Params) -> Result<UnpackedSk, MlDsaError> {
    if bytes.len() != params.secret_key_size() {
        return Err(MlDsaError::InvalidLength {
            kind: "secret key",
            expected: params.secret_key_size(),
            actual: bytes.len(),
        });
    }
    let mut rho = [0u8; 32];
    let mut key = [0u8; 32];
    let mut tr = [0u8; 64];
    rho.copy_from_slice(&bytes[..32]);
    key.copy_from_slice(&bytes[32..64]);
    tr.copy_from_slice(&bytes[64..128]);

    let eta_size = N * params.eta_bits() / 8;
    let mut idx = 128;
    let s1 = unpack_eta(&bytes[idx..idx + params.l * eta_size], params.l, params);
    idx += params.l * eta_size;
    let s2 = unpack_eta(&bytes[idx..idx + params.k * eta_size], params.k, params);
    idx += params.k * eta_size;
    let t0 = unpack_t0(&bytes[idx..], params.k);

    Ok(UnpackedSk { rho, key, tr, s1, s2, t0 })
}

/// Signature layout: c̃ ∥ z ∥ hint.
pub fn pack_sig(c_tilde: &[u8], z: &PolyVec, hint: &PolyVec, params: &Params) -> Vec<u8> {
    debug_assert_eq!(c_tilde.len(), params.c_tilde_size());
    let mut out = Vec::with_capacity(params.signature_size());
    out.extend_from_slice(c_tilde);
    pack_z(&mut out, z, params);
    pack_hint(&mut out, hint, params);
    out
}

/// Decode a signature into (c̃, z, hint); z comes out centered.
pub fn unpack_sig(bytes: &[u8], params: &Params) -> Result<(Vec<u8>, PolyVec, PolyVec), MlDsaError> {
    if bytes.len() != params.signature_size() {
        return Err(MlDsaError::InvalidLength {
            kind: "signature",
            expected: params.signature_size(),
            actual: bytes.len(),
        });
    }
    let c_size = params.c_tilde_size();
    let z_size = params.l * N * params.gamma1_bits() / 8;
    let c_tilde = bytes[..c_size].to_vec();
    let z = unpack_z(&bytes[c_size..c_size + z_size], params);
    let hint = unpack_hint(&bytes[c_size + z_size..], params)?;
    Ok((c_tilde, z, hint))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::{ML_DSA_44, ML_DSA_65, ML_DSA_87};

    #[test]
    fn bit_stream_roundtrip() {
        for d in [3usize, 4, 6, 10, 13, 18, 20, 23] {
            let vals: Vec<u32> = (0..256u32).map(|i| (i.wrapping_mul(2654435761)) & ((1 << d) - 1)).collect();
            let mut buf = Vec::new();
            pack_bits(&mut buf, &vals, d);
            assert_eq!(buf.len(), 256 * d / 8);
            assert_eq!(unpack_bits(&buf, 256, d), vals);
        }
    }

    #[test]
    fn t0_coder_roundtrip() {
        let mut t0 = PolyVec::zero(4);
        for (i, poly) in t0.polys.iter_mut().enumerate() {
            for (j, c) in poly.coeffs.iter_mut().enumerate() {
                *c = ((i * 256 + j) as i32 % 8191) - 4095;
            }
        }
        let mut buf = Vec::new();
        pack_t0(&mut buf, &t0);
        let back = unpack_t0(&buf, 4);
        assert_eq!(back, t0);
    }

    #[test]
    fn eta_coder_roundtrip() {
        for params in [&ML_DSA_44, &ML_DSA_65] {
            let mut s = PolyVec::zero(params.l);
            for (i, poly) in s.polys.iter_mut().enumerate() {
                for (j, c) in poly.coeffs.iter_mut().enumerate() {
                    *c = ((i + j) as i32 % (2 * params.eta + 1)) - params.eta;
                }
            }
            let mut buf = Vec::new();
            pack_eta(&mut buf, &s, params);
            assert_eq!(unpack_eta(&buf, params.l, params), s);
        }
    }

    #[test]
    fn z_coder_roundtrip() {
        for params in [&ML_DSA_44, &ML_DSA_87] {
            let mut z = PolyVec::zero(params.l);
            for (i, poly) in z.polys.iter_mut().enumerate() {
                for (j, c) in poly.coeffs.iter_mut().enumerate() {
                    *c = ((i * 31 + j * 7) as i32 % (2 * params.gamma1 - 1)) - (params.gamma1 - 1);
                }
            }
            let mut buf = Vec::new();
            pack_z(&mut buf, &z, params);
            assert_eq!(unpack_z(&buf, params), z);
        }
    }

    #[test]
    fn hint_coder_roundtrip() {
        let params = &ML_DSA_44;
        let mut hint = PolyVec::zero(params.k);
        hint.polys[0].coeffs[3] = 1;
        hint.polys[0].coeffs[200] = 1;
        hint.polys[2].coeffs[0] = 1;
        hint.polys[3].coeffs[255] = 1;

        let mut buf = Vec::new();
        pack_hint(&mut buf, &hint, params);
        assert_eq!(buf.len(), params.omega + params.k);
        assert_eq!(unpack_hint(&buf, params).unwrap(), hint);
    }

    #[test]
    fn hint_decoder_rejects_bad_cursor() {
        let params = &ML_DSA_44;
        let mut buf = vec![0u8; params.omega + params.k];
        buf[params.omega] = 2;
        buf[params.omega + 1] = 1; // cursor decreases
        assert!(unpack_hint(&buf, params).is_err());
    }

    #[test]
    fn hint_decoder_rejects_unsorted_indices() {
        let params = &ML_DSA_44;
        let mut buf = vec![0u8; params.omega + params.k];
        buf[0] = 9;
        buf[1] = 9; // duplicate index in row 0
        for i in 0..params.k {
            buf[params.omega + i] = 2;
        }
        assert!(unpack_hint(&buf, params).is_err());
    }

    #[test]
    fn hint_decoder_rejects_dirty_padding() {
        let params = &ML_DSA_44;
        let mut buf = vec![0u8; params.omega + params.k];
        buf[5] = 1; // unused slot must be zero
        assert!(unpack_hint(&buf, params).is_err());
    }

    #[test]
    fn pk_roundtrip() {
        let params = &ML_DSA_44;
        let rho = [0xAB; 32];
        let mut t1 = PolyVec::zero(params.k);
        for (i, poly) in t1.polys.iter_mut().enumerate() {
            for (j, c) in poly.coeffs.iter_mut().enumerate() {
                *c = ((i * 256 + j) % 1024) as i32;
            }
        }
        let bytes = pack_pk(&rho, &t1, params);
        assert_eq!(bytes.len(), params.public_key_size());
        let (rho2, t1_2) = unpack_pk(&bytes, params).unwrap();
        assert_eq!(rho2, rho);
        assert_eq!(t1_2, t1);
    }

    #[test]
    fn pk_length_enforced() {
        assert!(unpack_pk(&[0u8; 100], &ML_DSA_44).is_err());
    }
}
