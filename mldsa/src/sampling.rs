//! SHAKE-driven samplers and hashes (FIPS 204 Algorithms 26-29).

use crate::params::{Params, N, Q, TR_SIZE};
use crate::poly::Poly;
use crate::polyvec::{PolyMatrix, PolyVec};
use sha3::{
    digest::{ExtendableOutput, Update, XofReader},
    Shake128, Shake256,
};

/// Expand ρ into the public matrix A, output in NTT domain.
///
/// Each entry A[r][s] is rejection-sampled from SHAKE128(ρ ∥ s ∥ r).
pub fn expand_a(rho: &[u8; 32], params: &Params) -> PolyMatrix {
    let mut matrix = PolyMatrix::zero(params.k, params.l);
    for r in 0..params.k {
        for s in 0..params.l {
            let mut hasher = Shake128::default();
            hasher.update(rho);
            hasher.update(&[s as u8, r as u8]);
            let mut reader = hasher.finalize_xof();
            rej_ntt_poly(&mut reader, &mut matrix.rows[r].polys[s]);
        }
    }
    matrix
}

/// Rejection-sample a polynomial uniform in [0, Q) from 3-byte chunks,
/// little-endian, masked to 23 bits.
fn rej_ntt_poly<R: XofReader>(reader: &mut R, poly: &mut Poly) {
    let mut sampled = 0;
    let mut buf = [0u8; 3];
    while sampled < N {
        reader.read(&mut buf);
        let val = (buf[0] as i32) | ((buf[1] as i32) << 8) | (((buf[2] & 0x7F) as i32) << 16);
        if val < Q {
            poly.coeffs[sampled] = val;
            sampled += 1;
        }
    }
}

/// Expand ρ' into the secret vectors (s1, s2) with coefficients in [-η, η].
pub fn expand_s(rho_prime: &[u8; 64], params: &Params) -> (PolyVec, PolyVec) {
    let mut s1 = PolyVec::zero(params.l);
    let mut s2 = PolyVec::zero(params.k);

    for r in 0..params.l {
        let mut hasher = Shake256::default();
        hasher.update(rho_prime);
        hasher.update(&(r as u16).to_le_bytes());
        let mut reader = hasher.finalize_xof();
        rej_bounded_poly(&mut reader, &mut s1.polys[r], params.eta);
    }
    for r in 0..params.k {
        let mut hasher = Shake256::default();
        hasher.update(rho_prime);
        hasher.update(&((params.l + r) as u16).to_le_bytes());
        let mut reader = hasher.finalize_xof();
        rej_bounded_poly(&mut reader, &mut s2.polys[r], params.eta);
    }

    (s1, s2)
}

/// Rejection-sample coefficients in [-η, η] from 4-bit nibbles.
///
/// η = 2: reject nibbles ≥ 15, else 2 - (n mod 5).
/// η = 4: reject nibbles ≥ 9, else 4 - n.
pub fn rej_bounded_poly<R: XofReader>(reader: &mut R, poly: &mut Poly, eta: i32) {
    debug_assert!(eta == 2 || eta == 4);
    let mut sampled = 0;
    let mut byte = [0u8; 1];
    while sampled < N {
        reader.read(&mut byte);
        for nibble in [byte[0] & 0x0F, byte[0] >> 4] {
            if sampled == N {
                break;
            }
            let n = nibble as i32;
            if eta == 2 {
                if n < 15 {
                    poly.coeffs[sampled] = 2 - (n % 5);
                    sampled += 1;
                }
            } else if n < 9 {
                poly.coeffs[sampled] = 4 - n;
                sampled += 1;
            }
        }
    }
}

/// Expand one mask polynomial with coefficients in [-γ1+1, γ1] from
/// SHAKE256(ρ'' ∥ nonce_le16).
pub fn expand_mask_poly(seed: &[u8; 64], nonce: u16, gamma1: i32) -> Poly {
    let bits = if gamma1 == 1 << 17 { 18 } else { 20 };
    let mut hasher = Shake256::default();
    hasher.update(seed);
    hasher.update(&nonce.to_le_bytes());
    let mut reader = hasher.finalize_xof();

    let mut buf = vec![0u8; N * bits / 8];
    reader.read(&mut buf);

    let vals = crate::packing::unpack_bits(&buf, N, bits);
    let mut poly = Poly::zero();
    for (i, &v) in vals.iter().enumerate() {
        poly.coeffs[i] = gamma1 - v as i32;
    }
    poly
}

/// Expand the full mask vector y (l polynomials) at base nonce κ.
pub fn expand_mask(seed: &[u8; 64], kappa: u16, params: &Params) -> PolyVec {
    let mut y = PolyVec::zero(params.l);
    for (r, poly) in y.polys.iter_mut().enumerate() {
        *poly = expand_mask_poly(seed, kappa.wrapping_add(r as u16), params.gamma1);
    }
    y
}

/// Sample the challenge polynomial with exactly τ coefficients in {-1, +1}.
///
/// The first 8 squeezed bytes provide the sign bits, consumed one per
/// selected position; subsequent bytes give swap indices j ≤ i by
/// rejection.
pub fn sample_in_ball(c_tilde: &[u8], tau: usize) -> Poly {
    let mut hasher = Shake256::default();
    hasher.update(c_tilde);
    let mut reader = hasher.finalize_xof();

    let mut sign_bytes = [0u8; 8];
    reader.read(&mut sign_bytes);
    let mut signs = u64::from_le_bytes(sign_bytes);

    let mut poly = Poly::zero();
    let mut byte = [0u8; 1];
    for i in (N - tau)..N {
        let j = loop {
            reader.read(&mut byte);
            if byte[0] as usize <= i {
                break byte[0] as usize;
            }
        };
        poly.coeffs[i] = poly.coeffs[j];
        poly.coeffs[j] = if signs & 1 == 0 { 1 } else { Q - 1 };
        signs >>= 1;
    }
    poly
}

/// tr = SHAKE256(pk, 64).
pub fn hash_public_key(pk_bytes: &[u8]) -> [u8; TR_SIZE] {
    let mut hasher = Shake256::default();
    hasher.update(pk_bytes);
    let mut reader = hasher.finalize_xof();
    let mut tr = [0u8; TR_SIZE];
    reader.read(&mut tr);
    tr
}

/// The FIPS 204 pure-signing message frame: 0x00 ∥ len(ctx) ∥ ctx ∥ msg.
pub fn message_representative(message: &[u8], context: &[u8]) -> Vec<u8> {
    debug_assert!(context.len() <= 255);
    let mut framed = Vec::with_capacity(2 + context.len() + message.len());
    framed.push(0u8);
    framed.push(context.len() as u8);
    framed.extend_from_slice(context);
    framed.extend_from_slice(message);
    framed
}

/// μ = SHAKE256(tr ∥ m, 64), where m is already framed (or is the raw
/// message for callers that frame elsewhere).
pub fn compute_mu(tr: &[u8; TR_SIZE], m: &[u8]) -> [u8; 64] {
    let mut hasher = Shake256::default();
    hasher.update(tr);
    hasher.update(m);
    let mut reader = hasher.finalize_xof();
    let mut mu = [0u8; 64];
    reader.read(&mut mu);
    mu
}

/// c̃ = SHAKE256(μ ∥ w1Encode, λ/4).
pub fn hash_challenge(mu: &[u8; 64], w1_bytes: &[u8], c_tilde_size: usize) -> Vec<u8> {
    let mut hasher = Shake256::default();
    hasher.update(mu);
    hasher.update(w1_bytes);
    let mut reader = hasher.finalize_xof();
    let mut c_tilde = vec![0u8; c_tilde_size];
    reader.read(&mut c_tilde);
    c_tilde
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::{ML_DSA_44, ML_DSA_65};

    #[test]
    fn expand_a_is_deterministic_and_in_range() {
        let rho = [7u8; 32];
        let a1 = expand_a(&rho, &ML_DSA_44);
        let a2 = expand_a(&rho, &ML_DSA_44);
        for r in 0..ML_DSA_44.k {
            for s in 0..ML_DSA_44.l {
                assert_eq!(a1.rows[r].polys[s], a2.rows[r].polys[s]);
                for &c in &a1.rows[r].polys[s].coeffs {
                    assert!((0..Q).contains(&c));
                }
            }
        }
    }

    #[test]
    fn expand_a_entries_differ() {
        let rho = [7u8; 32];
        let a = expand_a(&rho, &ML_DSA_44);
        assert_ne!(a.rows[0].polys[0], a.rows[0].polys[1]);
        assert_ne!(a.rows[0].polys[0], a.rows[1].polys[0]);
    }

    #[test]
    fn expand_s_bounds() {
        let rho_prime = [3u8; 64];
        for params in [&ML_DSA_44, &ML_DSA_65] {
            let (s1, s2) = expand_s(&rho_prime, params);
            assert_eq!(s1.len(), params.l);
            assert_eq!(s2.len(), params.k);
            for poly in s1.polys.iter().chain(s2.polys.iter()) {
                for &c in &poly.coeffs {
                    assert!(c >= -params.eta && c <= params.eta, "coefficient {} escapes eta", c);
                }
            }
        }
    }

    #[test]
    fn expand_mask_bounds() {
        let seed = [9u8; 64];
        for gamma1 in [1 << 17, 1 << 19] {
            let y = expand_mask_poly(&seed, 3, gamma1);
            for &c in &y.coeffs {
                assert!(c > -gamma1 && c <= gamma1);
            }
        }
    }

    #[test]
    fn expand_mask_nonce_separates() {
        let seed = [9u8; 64];
        let a = expand_mask_poly(&seed, 0, 1 << 17);
        let b = expand_mask_poly(&seed, 1, 1 << 17);
        assert_ne!(a, b);
    }

    #[test]
    fn sample_in_ball_weight() {
        for tau in [39usize, 49, 60] {
            let c = sample_in_ball(&[5u8; 32], tau);
            let weight = c.coeffs.iter().filter(|&&x| x != 0).count();
            assert_eq!(weight, tau);
            for &coeff in &c.coeffs {
                assert!(coeff == 0 || coeff == 1 || coeff == Q - 1);
            }
        }
    }

    #[test]
    fn sample_in_ball_deterministic() {
        let a = sample_in_ball(&[42u8; 48], 49);
        let b = sample_in_ball(&[42u8; 48], 49);
        assert_eq!(a, b);
    }

    #[test]
    fn message_frame_layout() {
        let framed = message_representative(b"msg", &[0xDE, 0xAD]);
        assert_eq!(framed, vec![0x00, 0x02, 0xDE, 0xAD, b'm', b's', b'g']);
    }
}
