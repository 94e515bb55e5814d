//! Driving the stateful signer wrapper through complete sessions.

use quorum_mldsa_threshold::{
    generate_with_dealer, verify_signature, Round1Broadcast, Round2Broadcast, Round3Broadcast,
    Signature, ThresholdConfig, ThresholdSigner, MAX_SIGNING_ATTEMPTS,
};

fn sign_with_signers(
    signers: &mut [ThresholdSigner],
    message: &[u8],
    context: &[u8],
) -> Option<Signature> {
    let mut rng = rand::rngs::OsRng;

    for _ in 0..MAX_SIGNING_ATTEMPTS {
        let round1: Vec<Round1Broadcast> =
            signers.iter_mut().map(|s| s.round1_commit(&mut rng).unwrap()).collect();

        let round2: Vec<Round2Broadcast> = signers
            .iter_mut()
            .map(|signer| {
                let others: Vec<Round1Broadcast> = round1
                    .iter()
                    .filter(|b| b.party_id != signer.party_id())
                    .cloned()
                    .collect();
                signer.round2_reveal(message, context, &others).unwrap()
            })
            .collect();

        let round3: Vec<Round3Broadcast> = signers
            .iter_mut()
            .map(|signer| {
                let others: Vec<Round2Broadcast> = round2
                    .iter()
                    .filter(|b| b.party_id != signer.party_id())
                    .cloned()
                    .collect();
                signer.round3_respond(&others).unwrap()
            })
            .collect();

        let me = signers[0].party_id();
        let other_round2: Vec<Round2Broadcast> =
            round2.iter().filter(|b| b.party_id != me).cloned().collect();
        let other_round3: Vec<Round3Broadcast> =
            round3.iter().filter(|b| b.party_id != me).cloned().collect();

        let result = signers[0].combine(&other_round2, &other_round3).unwrap();
        for signer in signers.iter_mut() {
            signer.reset();
        }
        if result.is_some() {
            return result;
        }
    }
    None
}

#[test]
fn signer_wrapper_produces_verifying_signature() {
    let config = ThresholdConfig::new(2, 2, 44).unwrap();
    let (public_key, shares) = generate_with_dealer(&[55u8; 32], &config).unwrap();

    let mut signers: Vec<ThresholdSigner> = shares
        .into_iter()
        .map(|share| ThresholdSigner::new(share, public_key.clone(), config).unwrap())
        .collect();

    let signature =
        sign_with_signers(&mut signers, b"wrapped", b"ctx").expect("signature within cap");
    assert!(verify_signature(&public_key, b"wrapped", b"ctx", &signature));
    assert!(!verify_signature(&public_key, b"wrapped", b"", &signature));
}

#[test]
fn signer_subset_of_three() {
    let config = ThresholdConfig::new(2, 3, 44).unwrap();
    let (public_key, mut shares) = generate_with_dealer(&[56u8; 32], &config).unwrap();

    // Only parties 0 and 2 participate
    let share2 = shares.remove(2);
    let share0 = shares.remove(0);
    let mut signers = vec![
        ThresholdSigner::new(share0, public_key.clone(), config).unwrap(),
        ThresholdSigner::new(share2, public_key.clone(), config).unwrap(),
    ];

    let signature = sign_with_signers(&mut signers, b"subset", b"").expect("signature within cap");
    assert!(verify_signature(&public_key, b"subset", b"", &signature));
}

#[test]
fn sessions_can_be_rerun_after_reset() {
    let config = ThresholdConfig::new(2, 2, 44).unwrap();
    let (public_key, shares) = generate_with_dealer(&[57u8; 32], &config).unwrap();
    let mut signers: Vec<ThresholdSigner> = shares
        .into_iter()
        .map(|share| ThresholdSigner::new(share, public_key.clone(), config).unwrap())
        .collect();

    let first = sign_with_signers(&mut signers, b"first", b"").expect("first signature");
    let second = sign_with_signers(&mut signers, b"second", b"").expect("second signature");
    assert!(verify_signature(&public_key, b"first", b"", &first));
    assert!(verify_signature(&public_key, b"second", b"", &second));
}
