//! # quorum-mldsa
//!
//! ML-DSA (FIPS 204, CRYSTALS-Dilithium) signatures with all three security
//! levels behind one implementation body. A [`Params`] value chosen at
//! construction time selects ML-DSA-44, -65 or -87; keys, signatures and
//! the verifier are bit-compatible with the standard byte layouts.
//!
//! ```ignore
//! use quorum_mldsa::{keygen_from_seed, sign_deterministic, verify, ML_DSA_44};
//!
//! let (pk, sk) = keygen_from_seed(&[1u8; 32], &ML_DSA_44);
//! let sig = sign_deterministic(&sk, b"message", b"")?;
//! assert!(verify(&pk, b"message", b"", &sig));
//! ```
//!
//! Besides the one-shot API, the crate exposes its ring primitives
//! ([`poly`], [`polyvec`], [`ntt`]), samplers ([`sampling`]), decomposition
//! and hints ([`rounding`]) and bit-packed coders ([`packing`]) for layers
//! that build on the same arithmetic, such as threshold signing. The
//! [`sign_with_mu`]/[`verify_with_mu`] entry points accept an externally
//! computed message digest so such layers can stay byte-compatible on the
//! wire.

#![deny(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

pub mod error;
pub mod ntt;
pub mod packing;
pub mod params;
pub mod poly;
pub mod polyvec;
pub mod reduce;
pub mod rounding;
pub mod sampling;
pub mod sign;

pub use error::{MlDsaError, Result};
pub use params::{Params, ML_DSA_44, ML_DSA_65, ML_DSA_87, D, N, Q, TR_SIZE, ZETA};
pub use poly::Poly;
pub use polyvec::{PolyMatrix, PolyVec};
pub use sign::{
    keygen, keygen_from_seed, sign, sign_deterministic, sign_with_mu, verify, verify_with_mu,
    PublicKey, SecretKey,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_constants_accessible() {
        assert_eq!(ML_DSA_44.k, 4);
        assert_eq!(ML_DSA_65.l, 5);
        assert_eq!(ML_DSA_87.omega, 75);
    }
}
