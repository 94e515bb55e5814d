//! Key generation: trusted dealer and distributed (DKG) variants.

pub mod dealer;
pub mod dkg;

pub use dealer::generate_with_dealer;

use quorum_mldsa::sampling::rej_bounded_poly;
use quorum_mldsa::{Params, PolyVec};
use sha3::{
    digest::{ExtendableOutput, Update, XofReader},
    Shake256,
};

/// Derive a share's (s1, s2) vectors from a 64-byte seed.
///
/// Polynomial p gets its own SHAKE256(seed ∥ nonce_le16) stream, nonce
/// running 0..l over s1 then l..l+k over s2; coefficients are rejection
/// sampled from nibbles into [-η, η]. Every holder of a bitmask runs this
/// on the same seed and obtains identical vectors.
pub(crate) fn derive_share_vectors(seed: &[u8; 64], params: &'static Params) -> (PolyVec, PolyVec) {
    let mut s1 = PolyVec::zero(params.l);
    let mut s2 = PolyVec::zero(params.k);
    for (nonce, poly) in s1.polys.iter_mut().chain(s2.polys.iter_mut()).enumerate() {
        let mut hasher = Shake256::default();
        hasher.update(seed);
        hasher.update(&(nonce as u16).to_le_bytes());
        let mut reader = hasher.finalize_xof();
        rej_bounded_poly(&mut reader, poly, params.eta);
    }
    (s1, s2)
}

#[cfg(test)]
mod tests {
    use super::*;
    use quorum_mldsa::{ML_DSA_44, ML_DSA_65};

    #[test]
    fn share_vectors_are_deterministic_and_bounded() {
        let seed = [0x5Au8; 64];
        for params in [&ML_DSA_44, &ML_DSA_65] {
            let (s1a, s2a) = derive_share_vectors(&seed, params);
            let (s1b, s2b) = derive_share_vectors(&seed, params);
            assert_eq!(s1a, s1b);
            assert_eq!(s2a, s2b);
            for poly in s1a.polys.iter().chain(s2a.polys.iter()) {
                for &c in &poly.coeffs {
                    assert!(c >= -params.eta && c <= params.eta);
                }
            }
        }
    }

    #[test]
    fn share_vectors_differ_per_seed() {
        let (s1a, _) = derive_share_vectors(&[1u8; 64], &ML_DSA_44);
        let (s1b, _) = derive_share_vectors(&[2u8; 64], &ML_DSA_44);
        assert_ne!(s1a, s1b);
    }
}
