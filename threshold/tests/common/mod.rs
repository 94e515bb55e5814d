//! Shared driver running the full three-round protocol in-process.

use quorum_mldsa_threshold::{
    combine, round1, round2, round3, PublicKey, Signature, ThresholdConfig, ThresholdKeyShare,
    MAX_SIGNING_ATTEMPTS,
};
use rand::RngCore;

/// Run complete signing attempts over `active` until combine accepts.
///
/// `shares` must be indexed by party id. Panics if the attempt cap is
/// reached, which with correct parameters indicates a bug.
pub fn run_signing(
    config: &ThresholdConfig,
    public_key: &PublicKey,
    shares: &[ThresholdKeyShare],
    active: &[u8],
    message: &[u8],
    context: &[u8],
) -> Signature {
    let mut rng = rand::rngs::OsRng;

    for nonce in 0..MAX_SIGNING_ATTEMPTS {
        let mut round1_broadcasts = Vec::new();
        let mut states1 = Vec::new();
        for &id in active {
            let mut rhop = [0u8; 64];
            rng.fill_bytes(&mut rhop);
            let (broadcast, state) =
                round1(&shares[id as usize], config, nonce, &rhop).expect("round1");
            round1_broadcasts.push(broadcast);
            states1.push(state);
        }

        let mut round2_broadcasts = Vec::new();
        let mut states2 = Vec::new();
        for (i, &id) in active.iter().enumerate() {
            let (broadcast, state) = round2(
                &shares[id as usize],
                config,
                active,
                message,
                context,
                &round1_broadcasts,
                &states1[i],
            )
            .expect("round2");
            round2_broadcasts.push(broadcast);
            states2.push(state);
        }

        let mut round3_broadcasts = Vec::new();
        for (i, &id) in active.iter().enumerate() {
            let broadcast =
                round3(&shares[id as usize], config, &round2_broadcasts, &states1[i], &states2[i])
                    .expect("round3");
            round3_broadcasts.push(broadcast);
        }

        for state in states1.iter_mut() {
            state.destroy();
        }
        for state in states2.iter_mut() {
            state.destroy();
        }

        if let Some(signature) =
            combine(config, public_key, message, context, &round2_broadcasts, &round3_broadcasts)
                .expect("combine")
        {
            return signature;
        }
    }
    panic!("no signature produced within {} attempts", MAX_SIGNING_ATTEMPTS);
}
