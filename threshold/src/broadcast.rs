//! Broadcast messages for the three-round signing protocol.
//!
//! Round 1 broadcasts only a binding hash of the commitment; the packed
//! commitment itself is revealed in round 2 and checked against the hash in
//! round 3.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Round 1: the commitment hash.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Round1Broadcast {
    /// Sending party.
    pub party_id: u8,
    /// SHAKE256(tr ∥ party ∥ packed commitment, 32).
    pub commitment_hash: [u8; 32],
}

/// Round 2: the packed commitment reveal.
///
/// Carries K_iter · K polynomials at 23 bits per coefficient.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Round2Broadcast {
    /// Sending party.
    pub party_id: u8,
    /// Packed w commitments for all iterations.
    pub commitment: Vec<u8>,
}

/// Round 3: the packed responses.
///
/// Carries K_iter · L polynomials at 23 bits per coefficient; rejected
/// iterations are all-zero polynomials.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Round3Broadcast {
    /// Sending party.
    pub party_id: u8,
    /// Packed z responses for all iterations.
    pub response: Vec<u8>,
}

/// A finished threshold signature in standard ML-DSA layout.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Signature {
    bytes: Vec<u8>,
}

impl Signature {
    pub(crate) fn from_vec(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }

    /// Wrap signature bytes, checking the length for the level.
    pub fn from_bytes(bytes: &[u8], signature_size: usize) -> Option<Self> {
        if bytes.len() != signature_size {
            return None;
        }
        Some(Self { bytes: bytes.to_vec() })
    }

    /// The signature bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Consume into the signature bytes.
    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}

impl AsRef<[u8]> for Signature {
    fn as_ref(&self) -> &[u8] {
        &self.bytes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signature_length_checked() {
        assert!(Signature::from_bytes(&[0u8; 2420], 2420).is_some());
        assert!(Signature::from_bytes(&[0u8; 2419], 2420).is_none());
    }

    #[cfg(feature = "serde")]
    #[test]
    fn broadcast_serde_roundtrip() {
        let r1 = Round1Broadcast { party_id: 1, commitment_hash: [9u8; 32] };
        let json = serde_json::to_string(&r1).unwrap();
        assert_eq!(serde_json::from_str::<Round1Broadcast>(&json).unwrap(), r1);

        let r2 = Round2Broadcast { party_id: 2, commitment: vec![1, 2, 3] };
        let json = serde_json::to_string(&r2).unwrap();
        assert_eq!(serde_json::from_str::<Round2Broadcast>(&json).unwrap(), r2);
    }
}
