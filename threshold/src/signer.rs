//! Stateful per-party signer driving the three rounds.
//!
//! Each participating party wraps its key share in a [`ThresholdSigner`]
//! and advances it round by round; the signer enforces the protocol order
//! and destroys round state when a session ends, successfully or not.

use rand_core::{CryptoRng, RngCore};
use zeroize::Zeroize;

use crate::broadcast::{Round1Broadcast, Round2Broadcast, Round3Broadcast, Signature};
use crate::config::ThresholdConfig;
use crate::error::{ThresholdError, ThresholdResult};
use crate::keys::{PublicKey, ThresholdKeyShare};
use crate::protocol::signing::{combine, round1, round2, round3, Round1State, Round2State};

/// Cap on full protocol attempts for one message.
pub const MAX_SIGNING_ATTEMPTS: u16 = 500;

enum SignerState {
    Fresh,
    AfterRound1 { state1: Round1State, own_round1: Round1Broadcast },
    AfterRound2 {
        state1: Round1State,
        state2: Round2State,
        own_round2: Round2Broadcast,
        message: Vec<u8>,
        context: Vec<u8>,
    },
    AfterRound3 {
        own_round2: Round2Broadcast,
        own_round3: Round3Broadcast,
        message: Vec<u8>,
        context: Vec<u8>,
    },
}

impl Default for SignerState {
    fn default() -> Self {
        SignerState::Fresh
    }
}

/// One party's signing session driver.
pub struct ThresholdSigner {
    config: ThresholdConfig,
    public_key: PublicKey,
    share: ThresholdKeyShare,
    state: SignerState,
    next_nonce: u16,
}

impl ThresholdSigner {
    /// Create a signer for this party.
    pub fn new(
        share: ThresholdKeyShare,
        public_key: PublicKey,
        config: ThresholdConfig,
    ) -> ThresholdResult<Self> {
        if share.threshold() != config.threshold()
            || share.total_parties() != config.total_parties()
        {
            return Err(ThresholdError::InvalidParameters {
                threshold: config.threshold(),
                parties: config.total_parties(),
                reason: "key share does not match configuration",
            });
        }
        Ok(Self { config, public_key, share, state: SignerState::Fresh, next_nonce: 0 })
    }

    /// This party's id.
    pub fn party_id(&self) -> u8 {
        self.share.party_id()
    }

    /// The shared public key.
    pub fn public_key(&self) -> &PublicKey {
        &self.public_key
    }

    /// Round 1: commit. Nonces increase monotonically across attempts in
    /// this session; ρ' is drawn fresh from the caller's RNG.
    pub fn round1_commit<R: RngCore + CryptoRng>(
        &mut self,
        rng: &mut R,
    ) -> ThresholdResult<Round1Broadcast> {
        if !matches!(self.state, SignerState::Fresh) {
            return Err(ThresholdError::InvalidState {
                current: self.state_name(),
                expected: "Fresh",
            });
        }

        let mut rhop = [0u8; 64];
        rng.fill_bytes(&mut rhop);
        let nonce = self.next_nonce;
        self.next_nonce = self.next_nonce.wrapping_add(1);

        let (broadcast, state1) = round1(&self.share, &self.config, nonce, &rhop)?;
        rhop.zeroize();

        self.state = SignerState::AfterRound1 { state1, own_round1: broadcast.clone() };
        Ok(broadcast)
    }

    /// Round 2: reveal. `other_round1` holds the peers' commitments; the
    /// active set is this party plus the broadcast senders.
    pub fn round2_reveal(
        &mut self,
        message: &[u8],
        context: &[u8],
        other_round1: &[Round1Broadcast],
    ) -> ThresholdResult<Round2Broadcast> {
        let (state1, own_round1) = match std::mem::take(&mut self.state) {
            SignerState::AfterRound1 { state1, own_round1 } => (state1, own_round1),
            other => {
                self.state = other;
                return Err(ThresholdError::InvalidState {
                    current: self.state_name(),
                    expected: "AfterRound1",
                });
            }
        };

        let mut all_round1 = other_round1.to_vec();
        all_round1.push(own_round1);
        let active_ids: Vec<u8> = all_round1.iter().map(|b| b.party_id).collect();

        let result = round2(
            &self.share,
            &self.config,
            &active_ids,
            message,
            context,
            &all_round1,
            &state1,
        );
        match result {
            Ok((broadcast, state2)) => {
                self.state = SignerState::AfterRound2 {
                    state1,
                    state2,
                    own_round2: broadcast.clone(),
                    message: message.to_vec(),
                    context: context.to_vec(),
                };
                Ok(broadcast)
            }
            Err(e) => Err(e),
        }
    }

    /// Round 3: verify the peers' reveals and respond. Consumes the round
    /// states; after this only combine remains.
    pub fn round3_respond(
        &mut self,
        other_round2: &[Round2Broadcast],
    ) -> ThresholdResult<Round3Broadcast> {
        let (mut state1, mut state2, own_round2, message, context) =
            match std::mem::take(&mut self.state) {
                SignerState::AfterRound2 { state1, state2, own_round2, message, context } => {
                    (state1, state2, own_round2, message, context)
                }
                other => {
                    self.state = other;
                    return Err(ThresholdError::InvalidState {
                        current: self.state_name(),
                        expected: "AfterRound2",
                    });
                }
            };

        let result = round3(&self.share, &self.config, other_round2, &state1, &state2);

        // Round state is spent regardless of the outcome.
        state1.destroy();
        state2.destroy();

        let broadcast = result?;
        self.state = SignerState::AfterRound3 {
            own_round2,
            own_round3: broadcast.clone(),
            message,
            context,
        };
        Ok(broadcast)
    }

    /// Combine all parties' broadcasts into a signature.
    ///
    /// `other_round2`/`other_round3` are the peers' messages; this party's
    /// own are added from the session state. Returns `Ok(None)` when no
    /// iteration survived, in which case the caller resets and retries
    /// with fresh randomness.
    pub fn combine(
        &self,
        other_round2: &[Round2Broadcast],
        other_round3: &[Round3Broadcast],
    ) -> ThresholdResult<Option<Signature>> {
        let (own_round2, own_round3, message, context) = match &self.state {
            SignerState::AfterRound3 { own_round2, own_round3, message, context } => {
                (own_round2, own_round3, message, context)
            }
            _ => {
                return Err(ThresholdError::InvalidState {
                    current: self.state_name(),
                    expected: "AfterRound3",
                });
            }
        };

        let mut commitments = other_round2.to_vec();
        commitments.push(own_round2.clone());
        let mut responses = other_round3.to_vec();
        responses.push(own_round3.clone());

        combine(&self.config, &self.public_key, message, context, &commitments, &responses)
    }

    /// Abort or finish the current session and return to `Fresh`. Round
    /// nonces keep increasing; they are never reused within the signer.
    pub fn reset(&mut self) {
        match &mut self.state {
            SignerState::Fresh => {}
            SignerState::AfterRound1 { state1, .. } => state1.destroy(),
            SignerState::AfterRound2 { state1, state2, message, context, .. } => {
                state1.destroy();
                state2.destroy();
                message.zeroize();
                context.zeroize();
            }
            SignerState::AfterRound3 { message, context, .. } => {
                message.zeroize();
                context.zeroize();
            }
        }
        self.state = SignerState::Fresh;
    }

    fn state_name(&self) -> &'static str {
        match self.state {
            SignerState::Fresh => "Fresh",
            SignerState::AfterRound1 { .. } => "AfterRound1",
            SignerState::AfterRound2 { .. } => "AfterRound2",
            SignerState::AfterRound3 { .. } => "AfterRound3",
        }
    }
}

impl Drop for ThresholdSigner {
    fn drop(&mut self) {
        self.reset();
    }
}
