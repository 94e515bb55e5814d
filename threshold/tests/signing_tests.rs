//! End-to-end signing through the round functions, verified against the
//! plain ML-DSA verifier.

mod common;

use common::run_signing;
use quorum_mldsa_threshold::{
    generate_with_dealer, round1, round2, round3, verify_signature, ThresholdConfig,
    ThresholdError,
};
use rand::RngCore;

#[test]
fn two_of_three_all_pairs_level2() {
    let config = ThresholdConfig::new(2, 3, 44).unwrap();
    let mut seed = [0u8; 32];
    seed[0] = 42;
    let (public_key, shares) = generate_with_dealer(&seed, &config).unwrap();
    let message = [1u8, 2, 3, 4];

    for active in [[0u8, 1], [0, 2], [1, 2]] {
        let signature = run_signing(&config, &public_key, &shares, &active, &message, b"");
        assert_eq!(signature.as_bytes().len(), 2420);
        assert!(
            verify_signature(&public_key, &message, b"", &signature),
            "pair {:?} failed",
            active
        );

        // And under the baseline verifier with no threshold knowledge
        let pk =
            quorum_mldsa::PublicKey::from_bytes(public_key.as_bytes(), config.params()).unwrap();
        assert!(quorum_mldsa::verify(&pk, &message, b"", signature.as_bytes()));
    }
}

#[test]
fn two_of_two_level2() {
    let config = ThresholdConfig::new(2, 2, 44).unwrap();
    let (public_key, shares) = generate_with_dealer(&[11u8; 32], &config).unwrap();

    let signature = run_signing(&config, &public_key, &shares, &[0, 1], b"pair message", b"");
    assert!(verify_signature(&public_key, b"pair message", b"", &signature));
}

#[test]
fn three_of_three_level2() {
    // t = n: every party holds exactly one singleton share
    let config = ThresholdConfig::new(3, 3, 44).unwrap();
    let (public_key, shares) = generate_with_dealer(&[13u8; 32], &config).unwrap();
    for share in &shares {
        assert_eq!(share.share_count(), 1);
    }

    let signature = run_signing(&config, &public_key, &shares, &[0, 1, 2], b"all hands", b"");
    assert!(verify_signature(&public_key, b"all hands", b"", &signature));
}

#[test]
fn distributed_sign_level3_sparse_active_set() {
    let config = ThresholdConfig::new(2, 3, 65).unwrap();
    let (public_key, shares) = generate_with_dealer(&[77u8; 32], &config).unwrap();

    let signature = run_signing(&config, &public_key, &shares, &[0, 2], &[42u8], b"");
    assert_eq!(signature.as_bytes().len(), 3309);
    assert!(verify_signature(&public_key, &[42u8], b"", &signature));
}

#[test]
fn tampered_commitment_is_caught_in_round3() {
    let config = ThresholdConfig::new(2, 3, 65).unwrap();
    let (_public_key, shares) = generate_with_dealer(&[78u8; 32], &config).unwrap();
    let active = [0u8, 2];
    let mut rng = rand::rngs::OsRng;

    let mut round1_broadcasts = Vec::new();
    let mut states1 = Vec::new();
    for &id in &active {
        let mut rhop = [0u8; 64];
        rng.fill_bytes(&mut rhop);
        let (b, s) = round1(&shares[id as usize], &config, 0, &rhop).unwrap();
        round1_broadcasts.push(b);
        states1.push(s);
    }

    let mut round2_broadcasts = Vec::new();
    let mut states2 = Vec::new();
    for (i, &id) in active.iter().enumerate() {
        let (b, s) = round2(
            &shares[id as usize],
            &config,
            &active,
            b"target",
            b"",
            &round1_broadcasts,
            &states1[i],
        )
        .unwrap();
        round2_broadcasts.push(b);
        states2.push(s);
    }

    // Party 2 flips one byte of its reveal
    round2_broadcasts[1].commitment[100] ^= 0x01;

    let err = round3(&shares[0], &config, &round2_broadcasts, &states1[0], &states2[0])
        .expect_err("tampered reveal must be rejected");
    assert_eq!(err, ThresholdError::CommitmentMismatch { party_id: 2 });
    assert_eq!(err.to_string(), "Commitment hash mismatch for party 2");
}

#[test]
fn context_binding() {
    let config = ThresholdConfig::new(2, 3, 44).unwrap();
    let (public_key, shares) = generate_with_dealer(&[21u8; 32], &config).unwrap();
    let context = [0xDEu8, 0xAD];

    let signature = run_signing(&config, &public_key, &shares, &[0, 1], b"bound", &context);

    assert!(verify_signature(&public_key, b"bound", &context, &signature));
    assert!(!verify_signature(&public_key, b"bound", b"", &signature));
    assert!(!verify_signature(&public_key, b"bound", &[0x00, 0x00], &signature));
}

#[test]
fn signature_is_rejected_for_other_messages() {
    let config = ThresholdConfig::new(2, 3, 44).unwrap();
    let (public_key, shares) = generate_with_dealer(&[22u8; 32], &config).unwrap();

    let signature = run_signing(&config, &public_key, &shares, &[1, 2], b"signed", b"");
    assert!(verify_signature(&public_key, b"signed", b"", &signature));
    assert!(!verify_signature(&public_key, b"not signed", b"", &signature));
}

#[test]
fn round2_validates_active_set() {
    let config = ThresholdConfig::new(2, 3, 44).unwrap();
    let (_pk, shares) = generate_with_dealer(&[23u8; 32], &config).unwrap();
    let mut rng = rand::rngs::OsRng;
    let mut rhop = [0u8; 64];
    rng.fill_bytes(&mut rhop);
    let (b0, s0) = round1(&shares[0], &config, 0, &rhop).unwrap();

    // Too few parties
    let err = round2(&shares[0], &config, &[0], b"m", b"", &[b0.clone()], &s0).unwrap_err();
    assert!(matches!(err, ThresholdError::InsufficientParties { provided: 1, required: 2 }));

    // Duplicate ids
    let err =
        round2(&shares[0], &config, &[0, 0], b"m", b"", &[b0.clone()], &s0).unwrap_err();
    assert!(matches!(err, ThresholdError::DuplicateParty { party_id: 0 }));

    // Unknown party id
    let err = round2(&shares[0], &config, &[0, 5], b"m", b"", &[b0], &s0).unwrap_err();
    assert!(matches!(err, ThresholdError::InvalidPartyId { party_id: 5, .. }));
}

#[test]
fn destroyed_round_state_is_poisoned() {
    let config = ThresholdConfig::new(2, 3, 44).unwrap();
    let (_pk, shares) = generate_with_dealer(&[24u8; 32], &config).unwrap();
    let (_b, mut state) = round1(&shares[0], &config, 0, &[9u8; 64]).unwrap();

    assert!(state.packed_commitment().is_ok());
    state.destroy();
    assert!(state.is_destroyed());
    assert!(matches!(
        state.packed_commitment(),
        Err(ThresholdError::StateDestroyed { state: "Round1State" })
    ));
    // destroy is idempotent
    state.destroy();
    assert!(state.is_destroyed());
}

#[test]
fn hint_and_norm_bounds_hold_on_accepted_signatures() {
    let config = ThresholdConfig::new(2, 3, 44).unwrap();
    let params = config.params();
    let (public_key, shares) = generate_with_dealer(&[25u8; 32], &config).unwrap();

    let signature = run_signing(&config, &public_key, &shares, &[0, 1], b"bounds", b"");
    let (_c, z, hint) =
        quorum_mldsa::packing::unpack_sig(signature.as_bytes(), params).unwrap();
    assert!(z.check_norm(params.gamma1 - params.beta));
    let ones: i32 = hint.polys.iter().flat_map(|p| p.coeffs.iter()).sum();
    assert!(ones as usize <= params.omega);
}
