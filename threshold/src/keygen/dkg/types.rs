//! Message and output types for the DKG phases.
//!
//! Broadcasts go to every party; the `*Private` types must be carried over
//! an authenticated *and confidential* channel to their single recipient.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::keys::{PublicKey, ThresholdKeyShare};

/// Phase 1 broadcast: session-bound commitments, one for the ρ
/// contribution and one per held bitmask seed.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Phase1Broadcast {
    /// Sending party.
    pub party_id: u8,
    /// SHAKE256(sessionId ∥ 0x01 ∥ party ∥ ρ_i, 32).
    pub rho_commitment: [u8; 32],
    /// Per-bitmask SHAKE256(sessionId ∥ 0x02 ∥ party ∥ bitmask ∥ seed, 32),
    /// keyed by bitmask, ascending.
    pub seed_commitments: Vec<(u8, [u8; 32])>,
}

/// Phase 2 broadcast: the ρ contribution in the clear.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Phase2Broadcast {
    /// Sending party.
    pub party_id: u8,
    /// The revealed ρ contribution.
    pub rho: [u8; 32],
}

/// One revealed bitmask seed.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SeedReveal {
    /// The bitmask the seed contributes to.
    pub bitmask: u8,
    /// The 32-byte seed.
    pub seed: [u8; 32],
}

/// Phase 2 private message: seed reveals for the bitmasks sender and
/// recipient hold jointly. Never sent to a non-holder.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Phase2Private {
    /// Sending party.
    pub from: u8,
    /// Receiving party.
    pub to: u8,
    /// The seed reveals.
    pub reveals: Vec<SeedReveal>,
}

/// One additive mask piece of a generator's public contribution.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MaskPiece {
    /// The bitmask whose contribution this piece belongs to.
    pub bitmask: u8,
    /// k polynomials packed at 23 bits per coefficient.
    pub piece: Vec<u8>,
}

/// Phase 3 private message: mask pieces routed confidentially from a
/// generator to one recipient.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Phase3Private {
    /// Sending party (the generator).
    pub from: u8,
    /// Receiving party.
    pub to: u8,
    /// The mask pieces.
    pub pieces: Vec<MaskPiece>,
}

/// Phase 4 broadcast: the party's aggregate of all its mask pieces.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Phase4Broadcast {
    /// Sending party.
    pub party_id: u8,
    /// k polynomials packed at 23 bits per coefficient.
    pub aggregate: Vec<u8>,
}

/// Output of a completed DKG run.
#[derive(Debug)]
pub struct DkgOutput {
    /// The shared public key; identical across all parties.
    pub public_key: PublicKey,
    /// This party's share of the signing key.
    pub share: ThresholdKeyShare,
}
