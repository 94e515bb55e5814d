//! ML-DSA parameter sets as defined in FIPS 204.
//!
//! All three security levels share one implementation body; a [`Params`]
//! value selects the level at construction time.

use crate::error::MlDsaError;

/// The prime modulus q = 2^23 - 2^13 + 1.
pub const Q: i32 = 8380417;

/// Polynomial degree.
pub const N: usize = 256;

/// Number of bits dropped from t by Power2Round.
pub const D: usize = 13;

/// Root of unity for the NTT.
pub const ZETA: i32 = 1753;

/// Seed length for ρ and K.
pub const SEED_SIZE: usize = 32;

/// Length of the ρ' expansion used for secret sampling and signing.
pub const CRH_SIZE: usize = 64;

/// Length of tr = SHAKE256(pk).
pub const TR_SIZE: usize = 64;

/// Parameters for one ML-DSA security level.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Params {
    /// Number of rows in matrix A (k).
    pub k: usize,
    /// Number of columns in matrix A (l).
    pub l: usize,
    /// Coefficient range for the secret vectors s1, s2 (η).
    pub eta: i32,
    /// Number of ±1 coefficients in the challenge polynomial (τ).
    pub tau: usize,
    /// β = τ·η.
    pub beta: i32,
    /// Mask range γ1 (a power of two).
    pub gamma1: i32,
    /// Low-order rounding range γ2.
    pub gamma2: i32,
    /// Maximum number of 1s in the hint (ω).
    pub omega: usize,
    /// Security parameter λ in bits; c̃ is λ/4 bytes.
    pub lambda: usize,
}

impl Params {
    /// Bits per packed z coefficient.
    pub const fn gamma1_bits(&self) -> usize {
        if self.gamma1 == 1 << 17 {
            18
        } else {
            20
        }
    }

    /// Bits per packed s1/s2 coefficient.
    pub const fn eta_bits(&self) -> usize {
        if self.eta == 2 {
            3
        } else {
            4
        }
    }

    /// Bits per packed w1 coefficient.
    pub const fn w1_bits(&self) -> usize {
        // (Q-1)/(2*gamma2) - 1 is 43 for gamma2 = (Q-1)/88 and 15 for (Q-1)/32
        if self.gamma2 == (Q - 1) / 88 {
            6
        } else {
            4
        }
    }

    /// Size of c̃ in bytes.
    pub const fn c_tilde_size(&self) -> usize {
        self.lambda / 4
    }

    /// Packed public key size: ρ plus k 10-bit polynomials.
    pub const fn public_key_size(&self) -> usize {
        32 + self.k * 320
    }

    /// Packed secret key size: ρ, K, tr, s1, s2 and t0.
    pub const fn secret_key_size(&self) -> usize {
        let s1_bytes = self.l * N * self.eta_bits() / 8;
        let s2_bytes = self.k * N * self.eta_bits() / 8;
        let t0_bytes = self.k * N * D / 8;
        32 + 32 + 64 + s1_bytes + s2_bytes + t0_bytes
    }

    /// Packed signature size: c̃, z and the hint.
    pub const fn signature_size(&self) -> usize {
        self.c_tilde_size() + self.l * N * self.gamma1_bits() / 8 + self.omega + self.k
    }

    /// Look up a parameter set by security level.
    ///
    /// Accepts the FIPS 204 names {44, 65, 87} as well as the classical
    /// security-bit aliases {128, 192, 256}.
    pub fn for_level(level: u16) -> Result<&'static Params, MlDsaError> {
        match level {
            44 | 128 => Ok(&ML_DSA_44),
            65 | 192 => Ok(&ML_DSA_65),
            87 | 256 => Ok(&ML_DSA_87),
            _ => Err(MlDsaError::UnsupportedLevel { level }),
        }
    }
}

/// ML-DSA-44 (NIST level 2).
pub const ML_DSA_44: Params = Params {
    k: 4,
    l: 4,
    eta: 2,
    tau: 39,
    beta: 78,
    gamma1: 1 << 17,
    gamma2: (Q - 1) / 88,
    omega: 80,
    lambda: 128,
};

/// ML-DSA-65 (NIST level 3).
pub const ML_DSA_65: Params = Params {
    k: 6,
    l: 5,
    eta: 4,
    tau: 49,
    beta: 196,
    gamma1: 1 << 19,
    gamma2: (Q - 1) / 32,
    omega: 55,
    lambda: 192,
};

/// ML-DSA-87 (NIST level 5).
pub const ML_DSA_87: Params = Params {
    k: 8,
    l: 7,
    eta: 2,
    tau: 60,
    gamma1: 1 << 19,
    gamma2: (Q - 1) / 32,
    beta: 120,
    omega: 75,
    lambda: 256,
};
