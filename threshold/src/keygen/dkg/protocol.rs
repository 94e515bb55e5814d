//! The per-party DKG protocol driver.

use std::collections::HashMap;

use quorum_mldsa::packing::pack_pk;
use quorum_mldsa::rounding::power2round_vec;
use quorum_mldsa::sampling::expand_a;
use quorum_mldsa::{PolyVec, N, Q};
use rand_core::{CryptoRng, RngCore};
use sha3::{
    digest::{ExtendableOutput, Update, XofReader},
    Shake256,
};
use zeroize::Zeroize;

use crate::config::ThresholdConfig;
use crate::error::{validate_session_id, ThresholdError, ThresholdResult};
use crate::keygen::derive_share_vectors;
use crate::keys::{PublicKey, SecretShare, ThresholdKeyShare};
use crate::protocol::primitives::{aggregate_mod_q, pack_polyvec_q, unpack_polyvec_q};
use crate::subsets::{holders_of, is_holder, share_masks};

use super::state::{Phase1State, Phase2State};
use super::types::{
    DkgOutput, MaskPiece, Phase1Broadcast, Phase2Broadcast, Phase2Private, Phase3Private,
    Phase4Broadcast, SeedReveal,
};

/// Domain byte for ρ-contribution commitments.
const TAG_RHO: u8 = 0x01;
/// Domain byte for bitmask-seed commitments.
const TAG_SEED: u8 = 0x02;

/// One party's view of a DKG session.
///
/// The same 32-byte session identifier must be agreed out of band by all
/// parties; commitments are bound to it, so messages cannot be replayed
/// across sessions.
pub struct DkgParty {
    config: ThresholdConfig,
    party_id: u8,
    session_id: [u8; 32],
}

impl DkgParty {
    /// Create a party's session view.
    pub fn new(config: ThresholdConfig, party_id: u8, session_id: &[u8]) -> ThresholdResult<Self> {
        let session_id = validate_session_id(session_id)?;
        if party_id >= config.total_parties() {
            return Err(ThresholdError::InvalidPartyId {
                party_id,
                max_id: config.total_parties() - 1,
            });
        }
        Ok(Self { config, party_id, session_id })
    }

    /// This party's id.
    pub fn party_id(&self) -> u8 {
        self.party_id
    }

    /// The bitmasks this party holds.
    fn held_masks(&self) -> Vec<u8> {
        share_masks(self.config.threshold(), self.config.total_parties())
            .into_iter()
            .filter(|&m| is_holder(m, self.party_id))
            .collect()
    }

    /// Phase 1: draw ρ contribution and per-bitmask seeds, broadcast their
    /// session-bound commitments.
    pub fn phase1<R: RngCore + CryptoRng>(
        &self,
        rng: &mut R,
    ) -> (Phase1Broadcast, Phase1State) {
        let mut rho_contribution = [0u8; 32];
        rng.fill_bytes(&mut rho_contribution);
        let mut signing_key = [0u8; 32];
        rng.fill_bytes(&mut signing_key);

        let mut seeds = Vec::new();
        let mut seed_commitments = Vec::new();
        for mask in self.held_masks() {
            let mut seed = [0u8; 32];
            rng.fill_bytes(&mut seed);
            seed_commitments.push((mask, self.seed_commitment(self.party_id, mask, &seed)));
            seeds.push((mask, seed));
        }

        let broadcast = Phase1Broadcast {
            party_id: self.party_id,
            rho_commitment: self.rho_commitment(self.party_id, &rho_contribution),
            seed_commitments,
        };
        let state = Phase1State::new(rho_contribution, seeds, signing_key);
        (broadcast, state)
    }

    /// Phase 2: reveal ρ in the clear and each bitmask seed privately to
    /// the fellow holders of that bitmask.
    pub fn phase2(
        &self,
        state1: &Phase1State,
    ) -> ThresholdResult<(Phase2Broadcast, Vec<Phase2Private>)> {
        let broadcast =
            Phase2Broadcast { party_id: self.party_id, rho: *state1.rho_contribution()? };

        let mut per_recipient: HashMap<u8, Vec<SeedReveal>> = HashMap::new();
        for &(mask, seed) in state1.seeds()? {
            for holder in holders_of(mask) {
                if holder != self.party_id {
                    per_recipient
                        .entry(holder)
                        .or_default()
                        .push(SeedReveal { bitmask: mask, seed });
                }
            }
        }

        let mut privates: Vec<Phase2Private> = per_recipient
            .into_iter()
            .map(|(to, reveals)| Phase2Private { from: self.party_id, to, reveals })
            .collect();
        privates.sort_by_key(|p| p.to);
        Ok((broadcast, privates))
    }

    /// Phase 2 Finalize: verify all commitments, derive the shares, and
    /// emit the Phase 3 mask pieces for every bitmask this party
    /// generates. Destroys the Phase 1 state.
    pub fn phase2_finalize<R: RngCore + CryptoRng>(
        &self,
        state1: &mut Phase1State,
        phase1: &[Phase1Broadcast],
        phase2: &[Phase2Broadcast],
        received: &[Phase2Private],
        rng: &mut R,
    ) -> ThresholdResult<(Vec<Phase3Private>, Phase2State)> {
        let n = self.config.total_parties();
        let params = self.config.params();

        let phase1_by_party = index_by_party(phase1, n, |b: &&Phase1Broadcast| b.party_id)?;
        let phase2_by_party = index_by_party(phase2, n, |b: &&Phase2Broadcast| b.party_id)?;

        // (a) every peer's revealed ρ must match its Phase 1 commitment.
        for j in 0..n {
            let expected = self.rho_commitment(j, &phase2_by_party[j as usize].rho);
            if expected != phase1_by_party[j as usize].rho_commitment {
                return Err(ThresholdError::DkgCommitmentMismatch { party_id: j, kind: "rho" });
            }
        }

        // Combined ρ: uniform as long as any single contribution is.
        let mut hasher = Shake256::default();
        hasher.update(&self.session_id);
        for j in 0..n {
            hasher.update(&phase2_by_party[j as usize].rho);
        }
        let mut reader = hasher.finalize_xof();
        let mut rho = [0u8; 32];
        reader.read(&mut rho);

        // (b) collect and verify the seeds for every held bitmask.
        let mut revealed: HashMap<(u8, u8), [u8; 32]> = HashMap::new();
        for msg in received {
            if msg.to != self.party_id {
                return Err(ThresholdError::DkgError(format!(
                    "private reveal addressed to party {} delivered to party {}",
                    msg.to, self.party_id
                )));
            }
            for reveal in &msg.reveals {
                if !is_holder(reveal.bitmask, self.party_id) {
                    return Err(ThresholdError::UnexpectedRecipient { bitmask: reveal.bitmask });
                }
                if !is_holder(reveal.bitmask, msg.from) {
                    return Err(ThresholdError::DkgError(format!(
                        "party {} revealed a seed for bitmask {:#b} it does not hold",
                        msg.from, reveal.bitmask
                    )));
                }
                let expected = phase1_by_party[msg.from as usize]
                    .seed_commitments
                    .iter()
                    .find(|(m, _)| *m == reveal.bitmask)
                    .map(|(_, c)| *c)
                    .ok_or_else(|| {
                        ThresholdError::DkgError(format!(
                            "party {} committed to no seed for bitmask {:#b}",
                            msg.from, reveal.bitmask
                        ))
                    })?;
                if self.seed_commitment(msg.from, reveal.bitmask, &reveal.seed) != expected {
                    return Err(ThresholdError::DkgCommitmentMismatch {
                        party_id: msg.from,
                        kind: "bitmask seed",
                    });
                }
                revealed.insert((msg.from, reveal.bitmask), reveal.seed);
            }
        }
        for &(mask, seed) in state1.seeds()? {
            revealed.insert((self.party_id, mask), seed);
        }

        // (c) derive each held share from the combined seed.
        let mut shares: HashMap<u8, SecretShare> = HashMap::new();
        for mask in self.held_masks() {
            let mut hasher = Shake256::default();
            hasher.update(&self.session_id);
            hasher.update(&[mask]);
            for holder in holders_of(mask) {
                let seed = revealed.get(&(holder, mask)).ok_or_else(|| {
                    ThresholdError::DkgError(format!(
                        "missing seed reveal from party {} for bitmask {:#b}",
                        holder, mask
                    ))
                })?;
                hasher.update(seed);
            }
            let mut reader = hasher.finalize_xof();
            let mut combined = [0u8; 64];
            reader.read(&mut combined);

            let (s1, s2) = derive_share_vectors(&combined, params);
            combined.zeroize();
            shares.insert(mask, SecretShare::new(s1, s2));
        }

        // Generator duties: split A·s1_b + s2_b into additive pieces, one
        // per holder; ours stays local, the rest travel confidentially.
        let a = expand_a(&rho, params);
        let mut own_pieces = Vec::new();
        let mut outgoing: HashMap<u8, Vec<MaskPiece>> = HashMap::new();

        for (mask, generator) in generator_assignment(self.config.threshold(), n) {
            if generator != self.party_id {
                continue;
            }
            let share = shares.get(&mask).expect("generator holds its bitmask");
            let mut contribution = a.mul_vec(&share.s1_hat);
            contribution.inv_ntt();
            contribution += &share.s2;
            contribution.reduce();

            let holders = holders_of(mask);
            let mut remainder = contribution;
            for &holder in holders.iter().filter(|&&h| h != self.party_id) {
                let piece = random_polyvec(rng, params.k);
                subtract_mod_q(&mut remainder, &piece);
                let mut packed = Vec::new();
                pack_polyvec_q(&mut packed, &piece);
                outgoing
                    .entry(holder)
                    .or_default()
                    .push(MaskPiece { bitmask: mask, piece: packed });
            }
            // The generator keeps the remainder as its own piece.
            own_pieces.push(remainder);
        }

        let mut privates: Vec<Phase3Private> = outgoing
            .into_iter()
            .map(|(to, pieces)| Phase3Private { from: self.party_id, to, pieces })
            .collect();
        privates.sort_by_key(|p| p.to);

        let state2 =
            Phase2State::new(rho, shares, own_pieces, *state1.signing_key()?);
        state1.destroy();
        Ok((privates, state2))
    }

    /// Phase 4: aggregate all mask pieces, own and received, into R_j and
    /// broadcast it.
    pub fn phase4(
        &self,
        state2: &Phase2State,
        received: &[Phase3Private],
    ) -> ThresholdResult<Phase4Broadcast> {
        let params = self.config.params();
        let generators = generator_assignment(self.config.threshold(), self.config.total_parties());

        let mut aggregate = PolyVec::zero(params.k);
        let mut covered: Vec<u8> = Vec::new();

        for piece in state2.own_pieces()? {
            aggregate_mod_q(&mut aggregate, piece);
        }
        for (mask, generator) in &generators {
            if *generator == self.party_id {
                covered.push(*mask);
            }
        }

        for msg in received {
            if msg.to != self.party_id {
                return Err(ThresholdError::DkgError(format!(
                    "mask piece addressed to party {} delivered to party {}",
                    msg.to, self.party_id
                )));
            }
            for piece in &msg.pieces {
                if !is_holder(piece.bitmask, self.party_id) {
                    return Err(ThresholdError::UnexpectedRecipient { bitmask: piece.bitmask });
                }
                match generators.get(&piece.bitmask) {
                    Some(&g) if g == msg.from => {}
                    _ => {
                        return Err(ThresholdError::DkgError(format!(
                            "party {} is not the generator of bitmask {:#b}",
                            msg.from, piece.bitmask
                        )))
                    }
                }
                if covered.contains(&piece.bitmask) {
                    return Err(ThresholdError::DkgError(format!(
                        "duplicate mask piece for bitmask {:#b}",
                        piece.bitmask
                    )));
                }
                let v = unpack_polyvec_q(&piece.piece, params.k)?;
                aggregate_mod_q(&mut aggregate, &v);
                covered.push(piece.bitmask);
            }
        }

        // Every held bitmask must have contributed exactly one piece.
        let mut held = self.held_masks();
        held.sort_unstable();
        covered.sort_unstable();
        if covered != held {
            return Err(ThresholdError::DkgError(
                "mask pieces do not cover the held bitmasks".to_string(),
            ));
        }

        let mut packed = Vec::new();
        pack_polyvec_q(&mut packed, &aggregate);
        Ok(Phase4Broadcast { party_id: self.party_id, aggregate: packed })
    }

    /// Finalize: sum the aggregates into t = A·s1 + s2, derive the public
    /// key and assemble this party's key share. Destroys the Phase 2
    /// state.
    pub fn finalize(
        &self,
        state2: &mut Phase2State,
        phase4: &[Phase4Broadcast],
    ) -> ThresholdResult<DkgOutput> {
        let n = self.config.total_parties();
        let params = self.config.params();
        let phase4_by_party = index_by_party(phase4, n, |b: &&Phase4Broadcast| b.party_id)?;

        let mut t = PolyVec::zero(params.k);
        for broadcast in &phase4_by_party {
            let v = unpack_polyvec_q(&broadcast.aggregate, params.k)?;
            aggregate_mod_q(&mut t, &v);
        }

        let (t1, _t0) = power2round_vec(&t);
        let rho = *state2.rho()?;
        let pk_bytes = pack_pk(&rho, &t1, params);
        let public_key = PublicKey::new(params, pk_bytes);

        let share = ThresholdKeyShare::new(
            self.party_id,
            self.config.threshold(),
            n,
            *state2.signing_key()?,
            rho,
            *public_key.tr(),
            state2.take_shares()?,
        );
        state2.destroy();

        Ok(DkgOutput { public_key, share })
    }

    fn rho_commitment(&self, party: u8, rho: &[u8; 32]) -> [u8; 32] {
        let mut hasher = Shake256::default();
        hasher.update(&self.session_id);
        hasher.update(&[TAG_RHO, party]);
        hasher.update(rho);
        squeeze32(hasher)
    }

    fn seed_commitment(&self, party: u8, bitmask: u8, seed: &[u8; 32]) -> [u8; 32] {
        let mut hasher = Shake256::default();
        hasher.update(&self.session_id);
        hasher.update(&[TAG_SEED, party, bitmask]);
        hasher.update(seed);
        squeeze32(hasher)
    }
}

fn squeeze32(hasher: Shake256) -> [u8; 32] {
    let mut reader = hasher.finalize_xof();
    let mut out = [0u8; 32];
    reader.read(&mut out);
    out
}

/// Require exactly one message per party 0..n and order them by party id.
fn index_by_party<'a, T>(
    messages: &'a [T],
    n: u8,
    party_of: impl Fn(&&'a T) -> u8,
) -> ThresholdResult<Vec<&'a T>> {
    if messages.len() != n as usize {
        return Err(ThresholdError::DkgError(format!(
            "expected {} broadcasts, got {}",
            n,
            messages.len()
        )));
    }
    let mut ordered: Vec<Option<&T>> = vec![None; n as usize];
    for msg in messages {
        let party = party_of(&msg);
        if party >= n {
            return Err(ThresholdError::InvalidPartyId { party_id: party, max_id: n - 1 });
        }
        if ordered[party as usize].replace(msg).is_some() {
            return Err(ThresholdError::DkgError(format!(
                "duplicate broadcast from party {}",
                party
            )));
        }
    }
    Ok(ordered.into_iter().map(|m| m.expect("all slots filled")).collect())
}

/// Deterministic generator assignment: each bitmask goes to its
/// least-loaded holder, ties broken by ascending party id, keeping the
/// per-party generation counts close to balanced.
pub(crate) fn generator_assignment(t: u8, n: u8) -> std::collections::BTreeMap<u8, u8> {
    let mut load = vec![0u32; n as usize];
    let mut assignment = std::collections::BTreeMap::new();
    for mask in share_masks(t, n) {
        let generator = holders_of(mask)
            .into_iter()
            .min_by_key(|&h| (load[h as usize], h))
            .expect("bitmask has holders");
        load[generator as usize] += 1;
        assignment.insert(mask, generator);
    }
    assignment
}

/// Uniform random polynomial vector mod Q via 23-bit rejection.
fn random_polyvec<R: RngCore + CryptoRng>(rng: &mut R, len: usize) -> PolyVec {
    let mut v = PolyVec::zero(len);
    for poly in v.polys.iter_mut() {
        for coeff in poly.coeffs.iter_mut() {
            *coeff = loop {
                let candidate = (rng.next_u32() & 0x7FFFFF) as i32;
                if candidate < Q {
                    break candidate;
                }
            };
        }
    }
    v
}

/// acc := acc - other mod Q, coefficientwise.
fn subtract_mod_q(acc: &mut PolyVec, other: &PolyVec) {
    debug_assert_eq!(acc.len(), other.len());
    for i in 0..acc.len() {
        for j in 0..N {
            let diff =
                acc.polys[i].coeffs[j] as i64 - other.polys[i].coeffs[j] as i64 + Q as i64;
            acc.polys[i].coeffs[j] = (diff % Q as i64) as i32;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generator_assignment_is_deterministic_and_near_balanced() {
        for n in 2..=6u8 {
            for t in 2..=n {
                let assignment = generator_assignment(t, n);
                assert_eq!(assignment, generator_assignment(t, n));
                assert_eq!(assignment.len(), share_masks(t, n).len());
                let mut load = vec![0u32; n as usize];
                for (&mask, &g) in &assignment {
                    assert!(is_holder(mask, g), "generator must hold its bitmask");
                    load[g as usize] += 1;
                }
                // Every party generates something and no one runs away
                // with the work; the min-load rule keeps the spread tiny.
                let max = *load.iter().max().unwrap();
                let min = *load.iter().min().unwrap();
                assert!(min >= 1, "idle party in {:?} for ({}, {})", load, t, n);
                assert!(max - min <= 2, "unbalanced load {:?} for ({}, {})", load, t, n);
            }
        }
    }

    #[test]
    fn invalid_session_id_rejected() {
        let config = ThresholdConfig::new(2, 3, 44).unwrap();
        assert!(matches!(
            DkgParty::new(config, 0, &[0u8; 31]),
            Err(ThresholdError::InvalidSessionId { length: 31 })
        ));
        assert!(DkgParty::new(config, 0, &[0u8; 32]).is_ok());
    }

    #[test]
    fn invalid_party_id_rejected() {
        let config = ThresholdConfig::new(2, 3, 44).unwrap();
        assert!(DkgParty::new(config, 3, &[0u8; 32]).is_err());
    }

    #[test]
    fn holders_derive_identical_shares() {
        // Full in-process 2-of-3 run; every pair of holders of a bitmask
        // must end up with byte-identical share vectors.
        let config = ThresholdConfig::new(2, 3, 44).unwrap();
        let session_id = [0x33u8; 32];
        let mut rng = rand::rngs::OsRng;

        let parties: Vec<DkgParty> =
            (0..3).map(|i| DkgParty::new(config, i, &session_id).unwrap()).collect();

        let mut b1 = Vec::new();
        let mut s1 = Vec::new();
        for p in &parties {
            let (b, s) = p.phase1(&mut rng);
            b1.push(b);
            s1.push(s);
        }
        let mut b2 = Vec::new();
        let mut priv2 = Vec::new();
        for (i, p) in parties.iter().enumerate() {
            let (b, pr) = p.phase2(&s1[i]).unwrap();
            b2.push(b);
            priv2.extend(pr);
        }
        let mut s2 = Vec::new();
        for (i, p) in parties.iter().enumerate() {
            let received: Vec<_> = priv2.iter().filter(|m| m.to == i as u8).cloned().collect();
            let (_out, st) =
                p.phase2_finalize(&mut s1[i], &b1, &b2, &received, &mut rng).unwrap();
            s2.push(st);
        }

        for mask in share_masks(2, 3) {
            let holders = holders_of(mask);
            let first = &s2[holders[0] as usize].shares().unwrap()[&mask];
            for &h in &holders[1..] {
                let other = &s2[h as usize].shares().unwrap()[&mask];
                assert_eq!(other.s1, first.s1, "s1 differs for bitmask {:#b}", mask);
                assert_eq!(other.s2, first.s2, "s2 differs for bitmask {:#b}", mask);
                assert_eq!(other.s1_hat, first.s1_hat);
                assert_eq!(other.s2_hat, first.s2_hat);
            }
        }
    }

    #[test]
    fn subtract_then_aggregate_is_identity() {
        let mut rng = rand::rngs::mock::StepRng::new(12345, 999983);
        // StepRng is not CryptoRng; exercise the arithmetic directly
        let mut a = PolyVec::zero(2);
        let mut b = PolyVec::zero(2);
        for i in 0..2 {
            for j in 0..N {
                a.polys[i].coeffs[j] = (rng.next_u32() % Q as u32) as i32;
                b.polys[i].coeffs[j] = (rng.next_u32() % Q as u32) as i32;
            }
        }
        let original = a.clone();
        subtract_mod_q(&mut a, &b);
        aggregate_mod_q(&mut a, &b);
        assert_eq!(a, original);
    }
}
