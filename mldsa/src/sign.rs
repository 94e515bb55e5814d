//! Key generation, signing and verification (FIPS 204 Algorithms 1-8).
//!
//! Signing exposes both the public message/context API and the internal
//! external-μ entry point used when μ has been computed elsewhere against
//! the same public key hash.

use crate::error::{MlDsaError, Result};
use crate::packing;
use crate::params::{Params, D, TR_SIZE};
use crate::polyvec::PolyVec;
use crate::reduce::center;
use crate::rounding::{high_bits_vec, low_bits_vec, make_hint_vec, power2round_vec, use_hint_vec};
use crate::sampling::{
    compute_mu, expand_a, expand_mask, expand_s, hash_challenge, hash_public_key,
    message_representative, sample_in_ball,
};
use rand_core::{CryptoRng, RngCore};
use sha3::{
    digest::{ExtendableOutput, Update, XofReader},
    Shake256,
};
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Cap on rejection-sampling attempts; with correct parameters the loop
/// terminates after a handful of iterations.
const MAX_ATTEMPTS: u32 = 500;

/// An ML-DSA public key.
#[derive(Clone, Debug)]
pub struct PublicKey {
    /// Parameter set this key belongs to.
    pub params: &'static Params,
    /// Matrix seed ρ.
    pub rho: [u8; 32],
    /// High bits of t = A·s1 + s2.
    pub t1: PolyVec,
    /// tr = SHAKE256(pk, 64), cached for signing and μ computation.
    pub tr: [u8; TR_SIZE],
}

impl PublicKey {
    /// Serialize to the standard ρ ∥ t1 layout.
    pub fn to_bytes(&self) -> Vec<u8> {
        packing::pack_pk(&self.rho, &self.t1, self.params)
    }

    /// Parse a packed public key and re-derive tr.
    pub fn from_bytes(bytes: &[u8], params: &'static Params) -> Result<Self> {
        let (rho, t1) = packing::unpack_pk(bytes, params)?;
        let tr = hash_public_key(bytes);
        Ok(PublicKey { params, rho, t1, tr })
    }
}

/// An ML-DSA secret key. Zeroized on drop.
#[derive(Clone)]
pub struct SecretKey {
    /// Parameter set this key belongs to.
    pub params: &'static Params,
    /// Matrix seed ρ.
    pub rho: [u8; 32],
    /// Signing key seed K.
    pub key: [u8; 32],
    /// Public key hash.
    pub tr: [u8; TR_SIZE],
    /// Secret vector s1 (l polynomials in [-η, η]).
    pub s1: PolyVec,
    /// Secret vector s2 (k polynomials in [-η, η]).
    pub s2: PolyVec,
    /// Low bits of t.
    pub t0: PolyVec,
}

impl SecretKey {
    /// Serialize to the standard ρ ∥ K ∥ tr ∥ s1 ∥ s2 ∥ t0 layout.
    pub fn to_bytes(&self) -> Vec<u8> {
        packing::pack_sk(&self.rho, &self.key, &self.tr, &self.s1, &self.s2, &self.t0, self.params)
    }

    /// Parse a packed secret key.
    pub fn from_bytes(bytes: &[u8], params: &'static Params) -> Result<Self> {
        let sk = packing::unpack_sk(bytes, params)?;
        Ok(SecretKey {
            params,
            rho: sk.rho,
            key: sk.key,
            tr: sk.tr,
            s1: sk.s1,
            s2: sk.s2,
            t0: sk.t0,
        })
    }
}

impl Zeroize for SecretKey {
    fn zeroize(&mut self) {
        self.key.zeroize();
        self.s1.zeroize();
        self.s2.zeroize();
        self.t0.zeroize();
    }
}

impl Drop for SecretKey {
    fn drop(&mut self) {
        self.zeroize();
    }
}

impl ZeroizeOnDrop for SecretKey {}

impl core::fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SecretKey").field("rho", &self.rho).field("key", &"[REDACTED]").finish()
    }
}

/// Deterministic key generation from a 32-byte seed.
///
/// The seed is domain-separated with the (k, l) bytes of the parameter set
/// before expansion, so the same seed yields unrelated keys per level.
pub fn keygen_from_seed(seed: &[u8; 32], params: &'static Params) -> (PublicKey, SecretKey) {
    let mut hasher = Shake256::default();
    hasher.update(seed);
    hasher.update(&[params.k as u8, params.l as u8]);
    let mut reader = hasher.finalize_xof();

    let mut rho = [0u8; 32];
    let mut rho_prime = [0u8; 64];
    let mut key = [0u8; 32];
    reader.read(&mut rho);
    reader.read(&mut rho_prime);
    reader.read(&mut key);

    let a = expand_a(&rho, params);
    let (s1, s2) = expand_s(&rho_prime, params);
    rho_prime.zeroize();

    let mut s1_hat = s1.clone();
    s1_hat.ntt();
    let mut t = a.mul_vec(&s1_hat);
    t.inv_ntt();
    t += &s2;
    t.reduce();
    s1_hat.zeroize();

    let (t1, t0) = power2round_vec(&t);

    let pk_bytes = packing::pack_pk(&rho, &t1, params);
    let tr = hash_public_key(&pk_bytes);

    let pk = PublicKey { params, rho, t1, tr };
    let sk = SecretKey { params, rho, key, tr, s1, s2, t0 };
    (pk, sk)
}

/// Key generation from a caller-provided RNG.
pub fn keygen<R: RngCore + CryptoRng>(rng: &mut R, params: &'static Params) -> (PublicKey, SecretKey) {
    let mut seed = [0u8; 32];
    rng.fill_bytes(&mut seed);
    let out = keygen_from_seed(&seed, params);
    seed.zeroize();
    out
}

fn validate_context(context: &[u8]) -> Result<()> {
    if context.len() > 255 {
        return Err(MlDsaError::ContextTooLong { length: context.len() });
    }
    Ok(())
}

/// Hedged signing: 32 fresh random bytes enter the per-signature seed.
pub fn sign<R: RngCore + CryptoRng>(
    sk: &SecretKey,
    message: &[u8],
    context: &[u8],
    rng: &mut R,
) -> Result<Vec<u8>> {
    validate_context(context)?;
    let mut rnd = [0u8; 32];
    rng.fill_bytes(&mut rnd);
    let framed = message_representative(message, context);
    let mu = compute_mu(&sk.tr, &framed);
    let sig = sign_with_mu(sk, &mu, &rnd);
    rnd.zeroize();
    sig
}

/// Deterministic signing: the rnd bytes are zero.
pub fn sign_deterministic(sk: &SecretKey, message: &[u8], context: &[u8]) -> Result<Vec<u8>> {
    validate_context(context)?;
    let framed = message_representative(message, context);
    let mu = compute_mu(&sk.tr, &framed);
    sign_with_mu(sk, &mu, &[0u8; 32])
}

/// The rejection-sampling core, signing a caller-supplied μ.
///
/// This is the entry point higher layers use to keep the wire signature
/// identical to the plain scheme while computing μ themselves.
pub fn sign_with_mu(sk: &SecretKey, mu: &[u8; 64], rnd: &[u8; 32]) -> Result<Vec<u8>> {
    let params = sk.params;

    // ρ'' = SHAKE256(K ∥ rnd ∥ μ, 64)
    let mut hasher = Shake256::default();
    hasher.update(&sk.key);
    hasher.update(rnd);
    hasher.update(mu);
    let mut reader = hasher.finalize_xof();
    let mut rho_pp = [0u8; 64];
    reader.read(&mut rho_pp);

    let a = expand_a(&sk.rho, params);
    let mut s1_hat = sk.s1.clone();
    s1_hat.ntt();
    let mut s2_hat = sk.s2.clone();
    s2_hat.ntt();
    let mut t0_hat = sk.t0.clone();
    t0_hat.ntt();

    let mut kappa: u16 = 0;
    let mut result = Err(MlDsaError::SigningFailed { attempts: MAX_ATTEMPTS });

    for _ in 0..MAX_ATTEMPTS {
        let y = expand_mask(&rho_pp, kappa, params);
        kappa = kappa.wrapping_add(params.l as u16);

        let mut y_hat = y.clone();
        y_hat.ntt();
        let mut w = a.mul_vec(&y_hat);
        w.inv_ntt();
        y_hat.zeroize();

        let w1 = high_bits_vec(&w, params.gamma2);
        let w1_bytes = packing::pack_w1(&w1, params);
        let c_tilde = hash_challenge(mu, &w1_bytes, params.c_tilde_size());

        let mut c_hat = sample_in_ball(&c_tilde, params.tau);
        c_hat.ntt();

        let mut cs1 = PolyVec::zero(params.l);
        for i in 0..params.l {
            cs1.polys[i] = c_hat.pointwise_mul(&s1_hat.polys[i]);
        }
        cs1.inv_ntt();

        let mut z = &y + &cs1;
        z.reduce();
        cs1.zeroize();

        if !z.check_norm(params.gamma1 - params.beta) {
            continue;
        }

        let mut cs2 = PolyVec::zero(params.k);
        for i in 0..params.k {
            cs2.polys[i] = c_hat.pointwise_mul(&s2_hat.polys[i]);
        }
        cs2.inv_ntt();

        let mut w_minus_cs2 = &w - &cs2;
        w_minus_cs2.reduce();
        cs2.zeroize();

        let r0 = low_bits_vec(&w_minus_cs2, params.gamma2);
        if !r0.check_norm(params.gamma2 - params.beta) {
            continue;
        }

        let mut ct0 = PolyVec::zero(params.k);
        for i in 0..params.k {
            ct0.polys[i] = c_hat.pointwise_mul(&t0_hat.polys[i]);
        }
        ct0.inv_ntt();

        if !ct0.check_norm(params.gamma2) {
            ct0.zeroize();
            continue;
        }

        // Hint over (-ct0, w - cs2 + ct0)
        let mut r_hint = &w_minus_cs2 + &ct0;
        r_hint.reduce();
        let mut neg_ct0 = PolyVec::zero(params.k);
        for i in 0..params.k {
            for j in 0..256 {
                neg_ct0.polys[i].coeffs[j] = -center(ct0.polys[i].coeffs[j]);
            }
        }
        ct0.zeroize();

        let (hint, ones) = make_hint_vec(&neg_ct0, &r_hint, params.gamma2);
        neg_ct0.zeroize();
        if ones > params.omega {
            continue;
        }

        result = Ok(packing::pack_sig(&c_tilde, &z, &hint, params));
        break;
    }

    s1_hat.zeroize();
    s2_hat.zeroize();
    t0_hat.zeroize();
    rho_pp.zeroize();
    result
}

/// Verify a signature over a framed message and context.
///
/// Returns `false` for any cryptographic mismatch or malformed input; it
/// never panics on attacker-controlled bytes.
pub fn verify(pk: &PublicKey, message: &[u8], context: &[u8], signature: &[u8]) -> bool {
    if context.len() > 255 {
        return false;
    }
    let framed = message_representative(message, context);
    let mu = compute_mu(&pk.tr, &framed);
    verify_with_mu(pk, &mu, signature)
}

/// Verify against a caller-supplied μ.
pub fn verify_with_mu(pk: &PublicKey, mu: &[u8; 64], signature: &[u8]) -> bool {
    let params = pk.params;

    let (c_tilde, z, hint) = match packing::unpack_sig(signature, params) {
        Ok(parts) => parts,
        Err(_) => return false,
    };

    if !z.check_norm(params.gamma1 - params.beta) {
        return false;
    }

    let a = expand_a(&pk.rho, params);
    let mut c_hat = sample_in_ball(&c_tilde, params.tau);
    c_hat.ntt();

    let mut z_hat = z;
    z_hat.ntt();
    let az = a.mul_vec(&z_hat);

    let mut t1_shifted = pk.t1.clone();
    t1_shifted.shift_left(D);
    t1_shifted.ntt();

    let mut w_approx = PolyVec::zero(params.k);
    for i in 0..params.k {
        let ct1 = c_hat.pointwise_mul(&t1_shifted.polys[i]);
        w_approx.polys[i] = &az.polys[i] - &ct1;
        w_approx.polys[i].reduce();
    }
    w_approx.inv_ntt();

    let w1 = use_hint_vec(&hint, &w_approx, params.gamma2);
    let w1_bytes = packing::pack_w1(&w1, params);
    let expected = hash_challenge(mu, &w1_bytes, params.c_tilde_size());

    expected == c_tilde
}
