//! Destroyable per-party DKG states.
//!
//! Both states own secret material and expose a one-shot `destroy` that
//! wipes it and poisons the state; any accessor afterwards fails.

use std::collections::HashMap;

use quorum_mldsa::PolyVec;
use zeroize::Zeroize;

use crate::error::{ThresholdError, ThresholdResult};
use crate::keys::SecretShare;

/// Secrets retained between Phase 1 and Phase 2 Finalize: the party's own
/// ρ contribution, its per-bitmask seeds, and its long-lived signing key
/// seed.
pub struct Phase1State {
    rho_contribution: [u8; 32],
    seeds: Vec<(u8, [u8; 32])>,
    signing_key: [u8; 32],
    destroyed: bool,
}

impl Phase1State {
    pub(crate) fn new(
        rho_contribution: [u8; 32],
        seeds: Vec<(u8, [u8; 32])>,
        signing_key: [u8; 32],
    ) -> Self {
        Self { rho_contribution, seeds, signing_key, destroyed: false }
    }

    pub(crate) fn rho_contribution(&self) -> ThresholdResult<&[u8; 32]> {
        self.guard()?;
        Ok(&self.rho_contribution)
    }

    pub(crate) fn seeds(&self) -> ThresholdResult<&[(u8, [u8; 32])]> {
        self.guard()?;
        Ok(&self.seeds)
    }

    pub(crate) fn signing_key(&self) -> ThresholdResult<&[u8; 32]> {
        self.guard()?;
        Ok(&self.signing_key)
    }

    fn guard(&self) -> ThresholdResult<()> {
        if self.destroyed {
            return Err(ThresholdError::StateDestroyed { state: "Phase1State" });
        }
        Ok(())
    }

    /// Wipe all stored seeds and poison the state. Idempotent.
    pub fn destroy(&mut self) {
        self.rho_contribution.zeroize();
        for (_, seed) in self.seeds.iter_mut() {
            seed.zeroize();
        }
        self.seeds.clear();
        self.signing_key.zeroize();
        self.destroyed = true;
    }

    /// True once destroy has run.
    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }
}

impl Drop for Phase1State {
    fn drop(&mut self) {
        self.destroy();
    }
}

/// Secrets carried from Phase 2 Finalize to the final aggregation: the
/// derived shares, the combined ρ, the retained own mask pieces and the
/// signing key seed.
#[derive(Debug)]
pub struct Phase2State {
    rho: [u8; 32],
    shares: HashMap<u8, SecretShare>,
    own_pieces: Vec<PolyVec>,
    signing_key: [u8; 32],
    destroyed: bool,
}

impl Phase2State {
    pub(crate) fn new(
        rho: [u8; 32],
        shares: HashMap<u8, SecretShare>,
        own_pieces: Vec<PolyVec>,
        signing_key: [u8; 32],
    ) -> Self {
        Self { rho, shares, own_pieces, signing_key, destroyed: false }
    }

    pub(crate) fn rho(&self) -> ThresholdResult<&[u8; 32]> {
        self.guard()?;
        Ok(&self.rho)
    }

    pub(crate) fn shares(&self) -> ThresholdResult<&HashMap<u8, SecretShare>> {
        self.guard()?;
        Ok(&self.shares)
    }

    pub(crate) fn own_pieces(&self) -> ThresholdResult<&[PolyVec]> {
        self.guard()?;
        Ok(&self.own_pieces)
    }

    pub(crate) fn signing_key(&self) -> ThresholdResult<&[u8; 32]> {
        self.guard()?;
        Ok(&self.signing_key)
    }

    pub(crate) fn take_shares(&mut self) -> ThresholdResult<HashMap<u8, SecretShare>> {
        self.guard()?;
        Ok(std::mem::take(&mut self.shares))
    }

    fn guard(&self) -> ThresholdResult<()> {
        if self.destroyed {
            return Err(ThresholdError::StateDestroyed { state: "Phase2State" });
        }
        Ok(())
    }

    /// Wipe shares, pieces and key material; poison the state. Idempotent.
    pub fn destroy(&mut self) {
        self.rho.zeroize();
        for share in self.shares.values_mut() {
            share.zeroize();
        }
        self.shares.clear();
        for piece in self.own_pieces.iter_mut() {
            piece.zeroize();
        }
        self.own_pieces.clear();
        self.signing_key.zeroize();
        self.destroyed = true;
    }

    /// True once destroy has run.
    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }
}

impl Drop for Phase2State {
    fn drop(&mut self) {
        self.destroy();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phase1_destroy_poisons() {
        let mut state = Phase1State::new([1u8; 32], vec![(3, [2u8; 32])], [4u8; 32]);
        assert!(state.seeds().is_ok());
        state.destroy();
        assert!(state.is_destroyed());
        assert!(matches!(
            state.rho_contribution(),
            Err(ThresholdError::StateDestroyed { state: "Phase1State" })
        ));
        assert!(state.seeds().is_err());
        assert!(state.signing_key().is_err());
        // Idempotent
        state.destroy();
        assert!(state.is_destroyed());
    }

    #[test]
    fn phase2_destroy_poisons() {
        let mut state = Phase2State::new([0u8; 32], HashMap::new(), Vec::new(), [0u8; 32]);
        assert!(state.rho().is_ok());
        state.destroy();
        assert!(state.shares().is_err());
        assert!(state.own_pieces().is_err());
        assert!(state.take_shares().is_err());
    }
}
