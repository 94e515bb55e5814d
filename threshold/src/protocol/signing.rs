//! The three-round threshold signing protocol and the combine step.
//!
//! Every attempt runs K_iter parallel transcripts; one passing transcript
//! yields a standard ML-DSA signature. Round 1 binds each party to its
//! commitment by hash, round 2 reveals the commitments and fixes μ, round
//! 3 verifies the binding and emits masked responses, and combine performs
//! the verifier-side checks and encoding.

use quorum_mldsa::packing::{pack_sig, pack_w1};
use quorum_mldsa::reduce::center;
use quorum_mldsa::rounding::{high_bits_vec, make_hint_vec};
use quorum_mldsa::sampling::{
    compute_mu, expand_a, hash_challenge, message_representative, sample_in_ball,
};
use quorum_mldsa::{PolyVec, N, TR_SIZE};
use sha3::{
    digest::{ExtendableOutput, Update, XofReader},
    Shake256,
};
use zeroize::Zeroize;

use crate::broadcast::{Round1Broadcast, Round2Broadcast, Round3Broadcast, Signature};
use crate::config::{ThresholdConfig, NU};
use crate::error::{validate_context, ThresholdError, ThresholdResult};
use crate::keys::{PublicKey, ThresholdKeyShare};
use crate::patterns::masks_for_position;
use crate::protocol::primitives::{
    aggregate_mod_q, pack_polyvec_q, unpack_polyvec_q, FVec, POLY_Q_SIZE,
};

// ============================================================================
// Round states
// ============================================================================

/// State carried from round 1: the hyperball float vectors and the packed
/// commitment awaiting reveal.
///
/// Destroy zeroes the floats and poisons the state; any later access fails.
pub struct Round1State {
    stw: Vec<FVec>,
    packed_commitment: Vec<u8>,
    destroyed: bool,
}

impl Round1State {
    pub(crate) fn stw(&self) -> ThresholdResult<&[FVec]> {
        if self.destroyed {
            return Err(ThresholdError::StateDestroyed { state: "Round1State" });
        }
        Ok(&self.stw)
    }

    /// The packed commitment to reveal in round 2.
    pub fn packed_commitment(&self) -> ThresholdResult<&[u8]> {
        if self.destroyed {
            return Err(ThresholdError::StateDestroyed { state: "Round1State" });
        }
        Ok(&self.packed_commitment)
    }

    /// Zero all sensitive buffers and poison the state. Idempotent.
    pub fn destroy(&mut self) {
        for fv in self.stw.iter_mut() {
            fv.zeroize();
        }
        self.stw.clear();
        self.packed_commitment.zeroize();
        self.packed_commitment.clear();
        self.destroyed = true;
    }

    /// True once destroy has run.
    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }
}

impl Drop for Round1State {
    fn drop(&mut self) {
        self.destroy();
    }
}

/// State carried from round 2: the peers' binding hashes, μ and the active
/// set.
#[derive(Debug)]
pub struct Round2State {
    hashes: Vec<(u8, [u8; 32])>,
    mu: [u8; 64],
    active_mask: u8,
    active_ids: Vec<u8>,
    destroyed: bool,
}

impl Round2State {
    pub(crate) fn mu(&self) -> ThresholdResult<&[u8; 64]> {
        if self.destroyed {
            return Err(ThresholdError::StateDestroyed { state: "Round2State" });
        }
        Ok(&self.mu)
    }

    pub(crate) fn hashes(&self) -> ThresholdResult<&[(u8, [u8; 32])]> {
        if self.destroyed {
            return Err(ThresholdError::StateDestroyed { state: "Round2State" });
        }
        Ok(&self.hashes)
    }

    /// The ascending list of active party ids.
    pub fn active_ids(&self) -> ThresholdResult<&[u8]> {
        if self.destroyed {
            return Err(ThresholdError::StateDestroyed { state: "Round2State" });
        }
        Ok(&self.active_ids)
    }

    /// The active-party bitmask.
    pub fn active_mask(&self) -> ThresholdResult<u8> {
        if self.destroyed {
            return Err(ThresholdError::StateDestroyed { state: "Round2State" });
        }
        Ok(self.active_mask)
    }

    /// Zero μ and poison the state. Idempotent.
    pub fn destroy(&mut self) {
        self.mu.zeroize();
        self.hashes.clear();
        self.active_ids.clear();
        self.active_mask = 0;
        self.destroyed = true;
    }

    /// True once destroy has run.
    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }
}

impl Drop for Round2State {
    fn drop(&mut self) {
        self.destroy();
    }
}

// ============================================================================
// Round 1
// ============================================================================

/// The binding hash: SHAKE256(tr ∥ party ∥ packed commitment, 32).
fn commitment_hash(tr: &[u8; TR_SIZE], party_id: u8, packed: &[u8]) -> [u8; 32] {
    let mut hasher = Shake256::default();
    hasher.update(tr);
    hasher.update(&[party_id]);
    hasher.update(packed);
    let mut reader = hasher.finalize_xof();
    let mut hash = [0u8; 32];
    reader.read(&mut hash);
    hash
}

/// Round 1: draw K_iter hyperball masks, commit to the derived w vectors.
///
/// `nonce` must be fresh per attempt within a session; ρ' drives the
/// hyperball expansion and is domain-separated per iteration by
/// nonce·K_iter + iter.
pub fn round1(
    share: &ThresholdKeyShare,
    config: &ThresholdConfig,
    nonce: u16,
    rhop: &[u8; 64],
) -> ThresholdResult<(Round1Broadcast, Round1State)> {
    let params = config.params();
    let k_iter = config.k_iterations();
    let a = expand_a(share.rho(), params);

    let mut stw = Vec::with_capacity(k_iter as usize);
    let mut packed = Vec::with_capacity(config.commitment_size());

    for iter in 0..k_iter {
        let mut fv = FVec::new(config.hyperball_dim());
        let iter_nonce = nonce.wrapping_mul(k_iter).wrapping_add(iter);
        fv.sample_hyperball(config.r_prime(), NU, params.l, rhop, iter_nonce);

        let (y, mut e) = fv.round(params.l, params.k);
        let mut y_hat = y;
        y_hat.ntt();
        let mut w = a.mul_vec(&y_hat);
        w.inv_ntt();
        w += &e;
        w.reduce();
        y_hat.zeroize();
        e.zeroize();

        pack_polyvec_q(&mut packed, &w);
        stw.push(fv);
    }

    let hash = commitment_hash(share.tr(), share.party_id(), &packed);
    let broadcast = Round1Broadcast { party_id: share.party_id(), commitment_hash: hash };
    let state = Round1State { stw, packed_commitment: packed, destroyed: false };
    Ok((broadcast, state))
}

// ============================================================================
// Round 2
// ============================================================================

/// Round 2: validate the active set, persist the round-1 hashes for later
/// binding, fix μ, and reveal the packed commitment.
pub fn round2(
    share: &ThresholdKeyShare,
    config: &ThresholdConfig,
    active_ids: &[u8],
    message: &[u8],
    context: &[u8],
    round1_hashes: &[Round1Broadcast],
    state1: &Round1State,
) -> ThresholdResult<(Round2Broadcast, Round2State)> {
    validate_context(context)?;

    if active_ids.len() < config.threshold() as usize {
        return Err(ThresholdError::InsufficientParties {
            provided: active_ids.len(),
            required: config.threshold(),
        });
    }

    let mut active_mask = 0u8;
    let mut sorted_ids = active_ids.to_vec();
    sorted_ids.sort_unstable();
    for &id in &sorted_ids {
        if id >= config.total_parties() {
            return Err(ThresholdError::InvalidPartyId {
                party_id: id,
                max_id: config.total_parties() - 1,
            });
        }
        if active_mask & (1 << id) != 0 {
            return Err(ThresholdError::DuplicateParty { party_id: id });
        }
        active_mask |= 1 << id;
    }

    let mut hashes = Vec::with_capacity(sorted_ids.len());
    for &id in &sorted_ids {
        let broadcast = round1_hashes
            .iter()
            .find(|b| b.party_id == id)
            .ok_or(ThresholdError::MissingBroadcast { party_id: id })?;
        hashes.push((id, broadcast.commitment_hash));
    }

    let framed = message_representative(message, context);
    let mu = compute_mu(share.tr(), &framed);

    let broadcast = Round2Broadcast {
        party_id: share.party_id(),
        commitment: state1.packed_commitment()?.to_vec(),
    };
    let state = Round2State { hashes, mu, active_mask, active_ids: sorted_ids, destroyed: false };
    Ok((broadcast, state))
}

// ============================================================================
// Round 3
// ============================================================================

/// Recover the active combined share for this party in NTT domain.
fn recover_share(
    share: &ThresholdKeyShare,
    config: &ThresholdConfig,
    active_mask: u8,
    active_ids: &[u8],
) -> ThresholdResult<(PolyVec, PolyVec)> {
    let params = config.params();
    let (t, n) = (config.threshold(), config.total_parties());

    let masks: Vec<u8> = if t == n {
        vec![1u8 << share.party_id()]
    } else {
        let position = active_ids
            .iter()
            .position(|&id| id == share.party_id())
            .ok_or(ThresholdError::InvalidPartyId { party_id: share.party_id(), max_id: n - 1 })?;
        masks_for_position(t, n, active_mask, position)?
    };

    let mut s1_hat = PolyVec::zero(params.l);
    let mut s2_hat = PolyVec::zero(params.k);
    for mask in masks {
        let piece = share.share(mask)?;
        aggregate_mod_q(&mut s1_hat, &piece.s1_hat);
        aggregate_mod_q(&mut s2_hat, &piece.s2_hat);
    }
    Ok((s1_hat, s2_hat))
}

/// Round 3: verify every peer's reveal against its round-1 hash, aggregate
/// the commitments, and compute this party's masked responses.
///
/// A hash mismatch aborts, naming the offending party. The response for a
/// rejected iteration is the zero vector; the rounding is performed either
/// way so the acceptance pattern does not modulate the work done.
pub fn round3(
    share: &ThresholdKeyShare,
    config: &ThresholdConfig,
    commitments: &[Round2Broadcast],
    state1: &Round1State,
    state2: &Round2State,
) -> ThresholdResult<Round3Broadcast> {
    let params = config.params();
    let k_iter = config.k_iterations() as usize;
    let commitment_size = config.commitment_size();
    let active_ids = state2.active_ids()?.to_vec();
    let mu = *state2.mu()?;

    // Re-check every reveal against the stored binding hashes.
    let mut reveals: Vec<&[u8]> = Vec::with_capacity(active_ids.len());
    for &(id, expected) in state2.hashes()? {
        let broadcast = if id == share.party_id() {
            None
        } else {
            Some(
                commitments
                    .iter()
                    .find(|c| c.party_id == id)
                    .ok_or(ThresholdError::MissingBroadcast { party_id: id })?,
            )
        };
        let packed: &[u8] = match broadcast {
            Some(b) => &b.commitment,
            None => state1.packed_commitment()?,
        };
        if packed.len() != commitment_size {
            return Err(ThresholdError::InvalidMessageSize {
                kind: "commitment",
                expected: commitment_size,
                actual: packed.len(),
            });
        }
        if commitment_hash(share.tr(), id, packed) != expected {
            return Err(ThresholdError::CommitmentMismatch { party_id: id });
        }
        reveals.push(packed);
    }

    // Aggregate all parties' w vectors per iteration.
    let mut w_final: Vec<PolyVec> = vec![PolyVec::zero(params.k); k_iter];
    for packed in &reveals {
        for (iter, w_acc) in w_final.iter_mut().enumerate() {
            let chunk = &packed[iter * params.k * POLY_Q_SIZE..(iter + 1) * params.k * POLY_Q_SIZE];
            let w = unpack_polyvec_q(chunk, params.k)?;
            aggregate_mod_q(w_acc, &w);
        }
    }

    let (mut s1_hat, mut s2_hat) =
        recover_share(share, config, state2.active_mask()?, &active_ids)?;

    let stw = state1.stw()?;
    let mut packed_responses = Vec::with_capacity(config.response_size());

    for (iter, w) in w_final.iter().enumerate() {
        let w1 = high_bits_vec(w, params.gamma2);
        let c_tilde = hash_challenge(&mu, &pack_w1(&w1, params), params.c_tilde_size());
        let mut c_hat = sample_in_ball(&c_tilde, params.tau);
        c_hat.ntt();

        let mut cs1 = PolyVec::zero(params.l);
        for i in 0..params.l {
            cs1.polys[i] = c_hat.pointwise_mul(&s1_hat.polys[i]);
        }
        cs1.inv_ntt();
        let mut cs2 = PolyVec::zero(params.k);
        for i in 0..params.k {
            cs2.polys[i] = c_hat.pointwise_mul(&s2_hat.polys[i]);
        }
        cs2.inv_ntt();

        let mut zf = FVec::from_polyvecs(&cs1, &cs2);
        zf.add(&stw[iter]);

        // Rounding happens unconditionally; rejection only selects which
        // output is emitted.
        let (mut z, mut e_discard) = zf.round(params.l, params.k);
        let rejected = zf.excess(config.r(), NU, params.l);
        if rejected {
            pack_polyvec_q(&mut packed_responses, &PolyVec::zero(params.l));
        } else {
            pack_polyvec_q(&mut packed_responses, &z);
        }

        z.zeroize();
        e_discard.zeroize();
        zf.zeroize();
        cs1.zeroize();
        cs2.zeroize();
    }

    s1_hat.zeroize();
    s2_hat.zeroize();

    Ok(Round3Broadcast { party_id: share.party_id(), response: packed_responses })
}

// ============================================================================
// Combine
// ============================================================================

/// Combine commitments and responses into a standard ML-DSA signature.
///
/// Returns `Ok(None)` when every iteration fails the verifier-side norm,
/// closeness or hint checks; the caller retries the rounds with a fresh
/// nonce.
pub fn combine(
    config: &ThresholdConfig,
    public_key: &PublicKey,
    message: &[u8],
    context: &[u8],
    commitments: &[Round2Broadcast],
    responses: &[Round3Broadcast],
) -> ThresholdResult<Option<Signature>> {
    validate_context(context)?;
    let params = config.params();
    let k_iter = config.k_iterations() as usize;

    let framed = message_representative(message, context);
    let mu = compute_mu(public_key.tr(), &framed);

    // Aggregate the per-iteration w and z sums.
    let mut w_final: Vec<PolyVec> = vec![PolyVec::zero(params.k); k_iter];
    for c in commitments {
        if c.commitment.len() != config.commitment_size() {
            return Err(ThresholdError::InvalidMessageSize {
                kind: "commitment",
                expected: config.commitment_size(),
                actual: c.commitment.len(),
            });
        }
        for (iter, w_acc) in w_final.iter_mut().enumerate() {
            let chunk =
                &c.commitment[iter * params.k * POLY_Q_SIZE..(iter + 1) * params.k * POLY_Q_SIZE];
            aggregate_mod_q(w_acc, &unpack_polyvec_q(chunk, params.k)?);
        }
    }
    let mut z_final: Vec<PolyVec> = vec![PolyVec::zero(params.l); k_iter];
    for r in responses {
        if r.response.len() != config.response_size() {
            return Err(ThresholdError::InvalidMessageSize {
                kind: "response",
                expected: config.response_size(),
                actual: r.response.len(),
            });
        }
        for (iter, z_acc) in z_final.iter_mut().enumerate() {
            let chunk =
                &r.response[iter * params.l * POLY_Q_SIZE..(iter + 1) * params.l * POLY_Q_SIZE];
            aggregate_mod_q(z_acc, &unpack_polyvec_q(chunk, params.l)?);
        }
    }

    let a = expand_a(public_key.rho(), params);
    // Work on a copy of t1; shifting mutates in place.
    let mut t1_hat = quorum_mldsa::packing::unpack_t1(&public_key.as_bytes()[32..], params.k);
    t1_hat.shift_left(quorum_mldsa::D);
    t1_hat.ntt();

    for iter in 0..k_iter {
        let z = &z_final[iter];
        let w = &w_final[iter];

        if !z.check_norm(params.gamma1 - params.beta) {
            continue;
        }

        let w1 = high_bits_vec(w, params.gamma2);
        let c_tilde = hash_challenge(&mu, &pack_w1(&w1, params), params.c_tilde_size());
        let mut c_hat = sample_in_ball(&c_tilde, params.tau);
        c_hat.ntt();

        // Az - c·(t1·2^d), back in coefficient domain.
        let mut z_hat = z.clone();
        z_hat.ntt();
        let az = a.mul_vec(&z_hat);

        let mut result = PolyVec::zero(params.k);
        for i in 0..params.k {
            let ct1 = c_hat.pointwise_mul(&t1_hat.polys[i]);
            result.polys[i] = &az.polys[i] - &ct1;
            result.polys[i].reduce();
        }
        result.inv_ntt();

        // f = result - w mod Q must stay below γ2.
        let mut f = &result - w;
        f.reduce();
        if !f.check_norm(params.gamma2) {
            continue;
        }

        // Hint letting the verifier recover w1 from result: flag the
        // coefficients where stripping f moves the high bits (the low
        // part w0 + f left its band).
        let mut neg_f = PolyVec::zero(params.k);
        for i in 0..params.k {
            for j in 0..N {
                neg_f.polys[i].coeffs[j] = -center(f.polys[i].coeffs[j]);
            }
        }
        let (hint, ones) = make_hint_vec(&neg_f, &result, params.gamma2);
        if ones > params.omega {
            continue;
        }

        let bytes = pack_sig(&c_tilde, z, &hint, params);
        return Ok(Some(Signature::from_vec(bytes)));
    }

    Ok(None)
}
