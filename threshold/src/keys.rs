//! Key material for threshold signing.

use std::collections::HashMap;

use quorum_mldsa::sampling::hash_public_key;
use quorum_mldsa::{Params, PolyVec, TR_SIZE};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::{ThresholdError, ThresholdResult};

/// The threshold public key.
///
/// Byte-identical to a plain ML-DSA public key of the same level; a
/// verifier needs no knowledge of the threshold structure.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PublicKey {
    params: &'static Params,
    bytes: Vec<u8>,
    rho: [u8; 32],
    tr: [u8; TR_SIZE],
}

impl PublicKey {
    pub(crate) fn new(params: &'static Params, bytes: Vec<u8>) -> Self {
        debug_assert_eq!(bytes.len(), params.public_key_size());
        let mut rho = [0u8; 32];
        rho.copy_from_slice(&bytes[..32]);
        let tr = hash_public_key(&bytes);
        Self { params, bytes, rho, tr }
    }

    /// Parse a packed public key, re-deriving tr.
    pub fn from_bytes(bytes: &[u8], params: &'static Params) -> ThresholdResult<Self> {
        if bytes.len() != params.public_key_size() {
            return Err(ThresholdError::InvalidMessageSize {
                kind: "public key",
                expected: params.public_key_size(),
                actual: bytes.len(),
            });
        }
        Ok(Self::new(params, bytes.to_vec()))
    }

    /// The packed public key bytes (standard ML-DSA layout).
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// The public key hash tr = SHAKE256(pk, 64).
    pub fn tr(&self) -> &[u8; TR_SIZE] {
        &self.tr
    }

    /// The matrix seed ρ.
    pub fn rho(&self) -> &[u8; 32] {
        &self.rho
    }

    /// The ML-DSA parameter set.
    pub fn params(&self) -> &'static Params {
        self.params
    }
}

/// One share of the secret, held jointly by the parties of its bitmask.
///
/// Every holder derives byte-identical values. The NTT-encoded copies are
/// kept alongside the normal-form vectors so share recovery can sum in the
/// NTT domain without re-transforming.
#[derive(Clone, Debug)]
pub struct SecretShare {
    /// Share of s1 (l polynomials).
    pub s1: PolyVec,
    /// Share of s2 (k polynomials).
    pub s2: PolyVec,
    /// NTT-encoded s1.
    pub s1_hat: PolyVec,
    /// NTT-encoded s2.
    pub s2_hat: PolyVec,
}

impl SecretShare {
    /// Build a share from its normal-form vectors, computing the NTT copies.
    pub fn new(s1: PolyVec, s2: PolyVec) -> Self {
        let mut s1_hat = s1.clone();
        s1_hat.ntt();
        let mut s2_hat = s2.clone();
        s2_hat.ntt();
        Self { s1, s2, s1_hat, s2_hat }
    }
}

impl Zeroize for SecretShare {
    fn zeroize(&mut self) {
        self.s1.zeroize();
        self.s2.zeroize();
        self.s1_hat.zeroize();
        self.s2_hat.zeroize();
    }
}

/// A party's long-lived threshold key material.
///
/// Contains the shares for every bitmask that includes this party's bit,
/// and nothing else: structural secrecy rests on the absent bitmasks.
#[derive(Clone)]
pub struct ThresholdKeyShare {
    party_id: u8,
    threshold: u8,
    total_parties: u8,
    key: [u8; 32],
    rho: [u8; 32],
    tr: [u8; TR_SIZE],
    shares: HashMap<u8, SecretShare>,
}

impl ThresholdKeyShare {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        party_id: u8,
        threshold: u8,
        total_parties: u8,
        key: [u8; 32],
        rho: [u8; 32],
        tr: [u8; TR_SIZE],
        shares: HashMap<u8, SecretShare>,
    ) -> Self {
        Self { party_id, threshold, total_parties, key, rho, tr, shares }
    }

    /// This party's index (0..n).
    pub fn party_id(&self) -> u8 {
        self.party_id
    }

    /// The threshold t.
    pub fn threshold(&self) -> u8 {
        self.threshold
    }

    /// The total number of parties n.
    pub fn total_parties(&self) -> u8 {
        self.total_parties
    }

    /// Number of bitmask shares held.
    pub fn share_count(&self) -> usize {
        self.shares.len()
    }

    /// True iff this party holds the share for `bitmask`.
    pub fn holds(&self, bitmask: u8) -> bool {
        self.shares.contains_key(&bitmask)
    }

    pub(crate) fn key(&self) -> &[u8; 32] {
        &self.key
    }

    pub(crate) fn rho(&self) -> &[u8; 32] {
        &self.rho
    }

    pub(crate) fn tr(&self) -> &[u8; TR_SIZE] {
        &self.tr
    }

    pub(crate) fn share(&self, bitmask: u8) -> ThresholdResult<&SecretShare> {
        self.shares.get(&bitmask).ok_or(ThresholdError::MissingShare { bitmask })
    }

    pub(crate) fn shares(&self) -> &HashMap<u8, SecretShare> {
        &self.shares
    }
}

impl Zeroize for ThresholdKeyShare {
    fn zeroize(&mut self) {
        self.key.zeroize();
        for share in self.shares.values_mut() {
            share.zeroize();
        }
        self.shares.clear();
    }
}

impl Drop for ThresholdKeyShare {
    fn drop(&mut self) {
        self.zeroize();
    }
}

impl ZeroizeOnDrop for ThresholdKeyShare {}

impl std::fmt::Debug for ThresholdKeyShare {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThresholdKeyShare")
            .field("party_id", &self.party_id)
            .field("threshold", &self.threshold)
            .field("total_parties", &self.total_parties)
            .field("key", &"[REDACTED]")
            .field("shares", &format!("{} bitmasks", self.shares.len()))
            .finish()
    }
}
