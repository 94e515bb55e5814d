//! Trusted-dealer key generation.
//!
//! A single dealer expands one seed into the full share tree and the
//! public key. The dealer must erase the seed and all shares after
//! distributing them; the DKG in [`super::dkg`] removes this trust
//! assumption entirely.

use std::collections::HashMap;

use quorum_mldsa::packing::pack_pk;
use quorum_mldsa::rounding::power2round_vec;
use quorum_mldsa::sampling::expand_a;
use sha3::{
    digest::{ExtendableOutput, Update, XofReader},
    Shake256,
};
use zeroize::Zeroize;

use crate::config::ThresholdConfig;
use crate::error::ThresholdResult;
use crate::keys::{PublicKey, SecretShare, ThresholdKeyShare};
use crate::keygen::derive_share_vectors;
use crate::subsets::{holders_of, share_masks};

/// Generate a threshold key from one 32-byte seed.
///
/// Returns the public key and one [`ThresholdKeyShare`] per party
/// (index = party id). Deterministic in the seed: the same seed and
/// configuration reproduce identical bytes.
pub fn generate_with_dealer(
    seed: &[u8; 32],
    config: &ThresholdConfig,
) -> ThresholdResult<(PublicKey, Vec<ThresholdKeyShare>)> {
    let params = config.params();
    let t = config.threshold();
    let n = config.total_parties();

    // One SHAKE256 stream drives everything: ρ, the per-party keys, then
    // one 64-byte seed per share bitmask, in Gosper order.
    let mut hasher = Shake256::default();
    hasher.update(seed);
    hasher.update(&[params.k as u8, params.l as u8]);
    let mut stream = hasher.finalize_xof();

    let mut rho = [0u8; 32];
    stream.read(&mut rho);

    let mut party_keys = Vec::with_capacity(n as usize);
    for _ in 0..n {
        let mut key = [0u8; 32];
        stream.read(&mut key);
        party_keys.push(key);
    }

    let mut per_party: Vec<HashMap<u8, SecretShare>> =
        (0..n).map(|_| HashMap::new()).collect();
    let mut s1_total = quorum_mldsa::PolyVec::zero(params.l);
    let mut s2_total = quorum_mldsa::PolyVec::zero(params.k);

    for mask in share_masks(t, n) {
        let mut share_seed = [0u8; 64];
        stream.read(&mut share_seed);
        let (s1, s2) = derive_share_vectors(&share_seed, params);
        share_seed.zeroize();

        s1_total += &s1;
        s2_total += &s2;

        let secret_share = SecretShare::new(s1, s2);
        for holder in holders_of(mask) {
            per_party[holder as usize].insert(mask, secret_share.clone());
        }
    }

    s1_total.reduce();
    s2_total.reduce();

    // t = A·NTT(s1) + s2, then split off the published high bits.
    let a = expand_a(&rho, params);
    let mut s1_hat = s1_total.clone();
    s1_hat.ntt();
    let mut t_vec = a.mul_vec(&s1_hat);
    t_vec.inv_ntt();
    t_vec += &s2_total;
    t_vec.reduce();
    s1_hat.zeroize();
    s1_total.zeroize();
    s2_total.zeroize();

    let (t1, _t0) = power2round_vec(&t_vec);
    let pk_bytes = pack_pk(&rho, &t1, params);
    let public_key = PublicKey::new(params, pk_bytes);
    let tr = *public_key.tr();

    let shares = party_keys
        .into_iter()
        .enumerate()
        .map(|(i, key)| {
            ThresholdKeyShare::new(
                i as u8,
                t,
                n,
                key,
                rho,
                tr,
                std::mem::take(&mut per_party[i]),
            )
        })
        .collect();

    Ok((public_key, shares))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::subsets::is_holder;

    #[test]
    fn dealer_2_of_3() {
        let config = ThresholdConfig::new(2, 3, 44).unwrap();
        let (public_key, shares) = generate_with_dealer(&[42u8; 32], &config).unwrap();

        assert_eq!(public_key.as_bytes().len(), 1312);
        assert_eq!(shares.len(), 3);
        for (i, share) in shares.iter().enumerate() {
            assert_eq!(share.party_id(), i as u8);
            assert_eq!(share.threshold(), 2);
            assert_eq!(share.total_parties(), 3);
            // Each party belongs to 2 of the 3 pair-bitmasks
            assert_eq!(share.share_count(), 2);
        }
    }

    #[test]
    fn dealer_is_deterministic() {
        let config = ThresholdConfig::new(2, 3, 44).unwrap();
        let (pk1, _) = generate_with_dealer(&[123u8; 32], &config).unwrap();
        let (pk2, _) = generate_with_dealer(&[123u8; 32], &config).unwrap();
        assert_eq!(pk1.as_bytes(), pk2.as_bytes());
        assert_eq!(pk1.tr(), pk2.tr());
    }

    #[test]
    fn dealer_seed_separation() {
        let config = ThresholdConfig::new(2, 3, 44).unwrap();
        let (pk1, _) = generate_with_dealer(&[1u8; 32], &config).unwrap();
        let (pk2, _) = generate_with_dealer(&[2u8; 32], &config).unwrap();
        assert_ne!(pk1.as_bytes(), pk2.as_bytes());
    }

    #[test]
    fn holders_share_identical_material() {
        let config = ThresholdConfig::new(3, 5, 44).unwrap();
        let (_, shares) = generate_with_dealer(&[7u8; 32], &config).unwrap();

        for mask in share_masks(3, 5) {
            let holders = holders_of(mask);
            let reference = shares[holders[0] as usize].share(mask).unwrap();
            for &h in &holders[1..] {
                let other = shares[h as usize].share(mask).unwrap();
                assert_eq!(other.s1, reference.s1);
                assert_eq!(other.s2, reference.s2);
                assert_eq!(other.s1_hat, reference.s1_hat);
                assert_eq!(other.s2_hat, reference.s2_hat);
            }
        }
    }

    #[test]
    fn structural_secrecy() {
        // Every party lacks at least one bitmask entirely
        for (t, n) in [(2u8, 3u8), (3, 4), (2, 5)] {
            let config = ThresholdConfig::new(t, n, 44).unwrap();
            let (_, shares) = generate_with_dealer(&[9u8; 32], &config).unwrap();
            for share in &shares {
                let missing = share_masks(t, n)
                    .into_iter()
                    .any(|m| !is_holder(m, share.party_id()) && !share.holds(m));
                assert!(missing, "party {} holds everything", share.party_id());
            }
        }
    }

    #[test]
    fn all_configs_generate() {
        for n in 2..=6u8 {
            for t in 2..=n {
                let config = ThresholdConfig::new(t, n, 44).unwrap();
                let result = generate_with_dealer(&[0u8; 32], &config);
                assert!(result.is_ok(), "({}, {})", t, n);
                let (_, shares) = result.unwrap();
                assert_eq!(shares.len(), n as usize);
            }
        }
    }
}
