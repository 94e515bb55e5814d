//! Error types for threshold ML-DSA operations.

use core::fmt;

/// Result type for threshold operations.
pub type ThresholdResult<T> = Result<T, ThresholdError>;

/// Maximum number of parties supported by the threshold scheme.
pub const MAX_PARTIES: u8 = 6;

/// Minimum threshold value.
pub const MIN_THRESHOLD: u8 = 2;

/// Error types for threshold operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ThresholdError {
    /// Invalid threshold parameters (t, n).
    InvalidParameters {
        /// Threshold value.
        threshold: u8,
        /// Total number of parties.
        parties: u8,
        /// Description of the validation error.
        reason: &'static str,
    },
    /// The requested security level is not supported.
    UnsupportedLevel {
        /// The level requested.
        level: u16,
    },
    /// Invalid party ID.
    InvalidPartyId {
        /// The invalid party ID.
        party_id: u8,
        /// Maximum valid party ID.
        max_id: u8,
    },
    /// Insufficient number of parties for the threshold.
    InsufficientParties {
        /// Number of parties provided.
        provided: usize,
        /// Required threshold.
        required: u8,
    },
    /// A party appears more than once in the active set.
    DuplicateParty {
        /// Party ID that appears twice.
        party_id: u8,
    },
    /// A received message had the wrong size.
    InvalidMessageSize {
        /// What was being decoded.
        kind: &'static str,
        /// Expected size in bytes.
        expected: usize,
        /// Actual size in bytes.
        actual: usize,
    },
    /// A commitment hash did not match its reveal.
    CommitmentMismatch {
        /// Party whose commitment failed to verify.
        party_id: u8,
    },
    /// A required broadcast from a party never arrived.
    MissingBroadcast {
        /// Party whose broadcast is missing.
        party_id: u8,
    },
    /// An unpacked polynomial coefficient was ≥ Q.
    InvalidCoefficient,
    /// Context string longer than 255 bytes.
    ContextTooLong {
        /// Length provided.
        length: usize,
    },
    /// The session identifier is not exactly 32 bytes.
    InvalidSessionId {
        /// Length provided.
        length: usize,
    },
    /// A round or phase state was used after being destroyed.
    StateDestroyed {
        /// Which state was touched.
        state: &'static str,
    },
    /// The signer is in the wrong state for the requested operation.
    InvalidState {
        /// Current state description.
        current: &'static str,
        /// Expected state description.
        expected: &'static str,
    },
    /// No share is held for a required bitmask.
    MissingShare {
        /// The bitmask without a share.
        bitmask: u8,
    },
    /// All signing attempts were rejected.
    SigningFailed {
        /// Number of attempts made.
        attempts: u32,
    },
    /// DKG protocol violation.
    DkgError(String),
    /// A DKG commitment (ρ or bitmask seed) failed verification.
    DkgCommitmentMismatch {
        /// Party whose commitment failed.
        party_id: u8,
        /// Which commitment kind failed.
        kind: &'static str,
    },
    /// A private DKG message arrived for a bitmask the recipient does not hold.
    UnexpectedRecipient {
        /// The bitmask in question.
        bitmask: u8,
    },
}

impl fmt::Display for ThresholdError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ThresholdError::InvalidParameters { threshold, parties, reason } => {
                write!(
                    f,
                    "Invalid threshold parameters: t={}, n={}, reason: {}",
                    threshold, parties, reason
                )
            }
            ThresholdError::UnsupportedLevel { level } => {
                write!(f, "Unsupported security level: {}", level)
            }
            ThresholdError::InvalidPartyId { party_id, max_id } => {
                write!(f, "Invalid party ID: {} (max: {})", party_id, max_id)
            }
            ThresholdError::InsufficientParties { provided, required } => {
                write!(f, "Insufficient parties: provided {}, required {}", provided, required)
            }
            ThresholdError::DuplicateParty { party_id } => {
                write!(f, "Duplicate party {} in active set", party_id)
            }
            ThresholdError::InvalidMessageSize { kind, expected, actual } => {
                write!(f, "Invalid {} size: expected {} bytes, got {}", kind, expected, actual)
            }
            ThresholdError::CommitmentMismatch { party_id } => {
                write!(f, "Commitment hash mismatch for party {}", party_id)
            }
            ThresholdError::MissingBroadcast { party_id } => {
                write!(f, "Missing broadcast from party {}", party_id)
            }
            ThresholdError::InvalidCoefficient => {
                write!(f, "Invalid polynomial coefficient")
            }
            ThresholdError::ContextTooLong { length } => {
                write!(f, "Context too long: {} bytes (max: 255)", length)
            }
            ThresholdError::InvalidSessionId { length } => {
                write!(f, "Invalid session ID length: {} bytes (expected 32)", length)
            }
            ThresholdError::StateDestroyed { state } => {
                write!(f, "{} was already destroyed", state)
            }
            ThresholdError::InvalidState { current, expected } => {
                write!(f, "Invalid signer state: currently {}, expected {}", current, expected)
            }
            ThresholdError::MissingShare { bitmask } => {
                write!(f, "No secret share held for bitmask {:#08b}", bitmask)
            }
            ThresholdError::SigningFailed { attempts } => {
                write!(f, "Threshold signing failed after {} attempts", attempts)
            }
            ThresholdError::DkgError(msg) => {
                write!(f, "DKG error: {}", msg)
            }
            ThresholdError::DkgCommitmentMismatch { party_id, kind } => {
                write!(f, "DKG {} commitment mismatch for party {}", kind, party_id)
            }
            ThresholdError::UnexpectedRecipient { bitmask } => {
                write!(f, "Received private message for unheld bitmask {:#08b}", bitmask)
            }
        }
    }
}

impl std::error::Error for ThresholdError {}

/// Validate (t, n): 2 ≤ t ≤ n ≤ 6.
pub fn validate_threshold_params(t: u8, n: u8) -> ThresholdResult<()> {
    if t < MIN_THRESHOLD {
        return Err(ThresholdError::InvalidParameters {
            threshold: t,
            parties: n,
            reason: "threshold must be at least 2",
        });
    }
    if n > MAX_PARTIES {
        return Err(ThresholdError::InvalidParameters {
            threshold: t,
            parties: n,
            reason: "too many parties (max 6)",
        });
    }
    if t > n {
        return Err(ThresholdError::InvalidParameters {
            threshold: t,
            parties: n,
            reason: "threshold cannot exceed number of parties",
        });
    }
    Ok(())
}

/// Validate an ML-DSA context string (≤ 255 bytes).
pub fn validate_context(ctx: &[u8]) -> ThresholdResult<()> {
    if ctx.len() > 255 {
        return Err(ThresholdError::ContextTooLong { length: ctx.len() });
    }
    Ok(())
}

/// Validate a DKG session identifier (exactly 32 bytes).
pub fn validate_session_id(session_id: &[u8]) -> ThresholdResult<[u8; 32]> {
    if session_id.len() != 32 {
        return Err(ThresholdError::InvalidSessionId { length: session_id.len() });
    }
    let mut sid = [0u8; 32];
    sid.copy_from_slice(session_id);
    Ok(sid)
}
