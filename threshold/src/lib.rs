//! # quorum-mldsa-threshold
//!
//! Threshold ML-DSA signatures: a set of n parties jointly holds a signing
//! key such that any t of them (2 ≤ t ≤ n ≤ 6) can cooperatively produce
//! a signature that verifies under an unmodified FIPS 204 verifier. No
//! single party ever holds the full secret.
//!
//! ## Protocol shape
//!
//! Signing runs three rounds plus a combine step, each attempt carrying
//! K_iter parallel transcripts of which one surviving transcript yields
//! the signature:
//!
//! 1. **Round 1** — every active party samples hyperball masks, derives
//!    its w commitments and broadcasts a binding hash.
//! 2. **Round 2** — parties reveal the packed commitments and fix the
//!    message digest μ.
//! 3. **Round 3** — reveals are checked against the round-1 hashes (a
//!    mismatch aborts, naming the party), the combined share is recovered
//!    from the hardcoded pattern tables, and masked responses go out.
//! 4. **Combine** — anyone aggregates the transcripts, applies the
//!    verifier-side checks and encodes a standard ML-DSA signature, or
//!    reports that this attempt must be retried with a fresh nonce.
//!
//! Keys come either from a trusted dealer ([`generate_with_dealer`]) or
//! from the four-phase DKG in [`keygen::dkg`], which produces the same
//! share structure without a dealer.
//!
//! ```ignore
//! use quorum_mldsa_threshold::{generate_with_dealer, ThresholdConfig, ThresholdSigner};
//!
//! let config = ThresholdConfig::new(2, 3, 44)?;
//! let (public_key, shares) = generate_with_dealer(&seed, &config)?;
//! // hand one share to each party, then run the rounds over your transport
//! ```
//!
//! ## Security notes
//!
//! This implementation has not been independently audited. The float-based
//! hyperball sampler is deterministic per platform but not bit-identical
//! across platforms, which is sufficient because each party only ever
//! signs with locally generated floats.

#![deny(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

pub mod broadcast;
mod config;
pub mod error;
pub mod keygen;
pub mod keys;
pub mod patterns;
mod protocol;
mod signer;
pub mod subsets;

pub use broadcast::{Round1Broadcast, Round2Broadcast, Round3Broadcast, Signature};
pub use config::{ThresholdConfig, NU};
pub use error::{
    validate_context, validate_session_id, validate_threshold_params, ThresholdError,
    ThresholdResult, MAX_PARTIES, MIN_THRESHOLD,
};
pub use keygen::dkg::{DkgOutput, DkgParty};
pub use keygen::generate_with_dealer;
pub use keys::{PublicKey, SecretShare, ThresholdKeyShare};
pub use protocol::signing::{combine, round1, round2, round3, Round1State, Round2State};
pub use signer::{ThresholdSigner, MAX_SIGNING_ATTEMPTS};

/// Verify a threshold signature.
///
/// Thin wrapper over the plain ML-DSA verifier; a threshold signature is
/// indistinguishable from a single-signer one on the wire.
pub fn verify_signature(
    public_key: &PublicKey,
    message: &[u8],
    context: &[u8],
    signature: &Signature,
) -> bool {
    if context.len() > 255 {
        return false;
    }
    let pk = match quorum_mldsa::PublicKey::from_bytes(public_key.as_bytes(), public_key.params()) {
        Ok(pk) => pk,
        Err(_) => return false,
    };
    quorum_mldsa::verify(&pk, message, context, signature.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constants() {
        assert_eq!(MAX_PARTIES, 6);
        assert_eq!(MIN_THRESHOLD, 2);
        assert_eq!(MAX_SIGNING_ATTEMPTS, 500);
    }
}
