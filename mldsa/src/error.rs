//! Error types for ML-DSA operations.

use core::fmt;

/// Result type for ML-DSA operations.
pub type Result<T> = core::result::Result<T, MlDsaError>;

/// Error types for ML-DSA operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MlDsaError {
    /// The requested security level is not one of {44, 65, 87, 128, 192, 256}.
    UnsupportedLevel {
        /// The level that was requested.
        level: u16,
    },
    /// A byte string had the wrong length for its type.
    InvalidLength {
        /// What was being decoded.
        kind: &'static str,
        /// Expected length in bytes.
        expected: usize,
        /// Actual length in bytes.
        actual: usize,
    },
    /// The context string exceeds 255 bytes.
    ContextTooLong {
        /// Length provided.
        length: usize,
    },
    /// Signing did not produce an accepted candidate within the attempt cap.
    SigningFailed {
        /// Number of rejection-sampling attempts made.
        attempts: u32,
    },
    /// A decoded value was outside its permitted range.
    InvalidEncoding(&'static str),
}

impl fmt::Display for MlDsaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MlDsaError::UnsupportedLevel { level } => {
                write!(f, "unsupported security level: {}", level)
            }
            MlDsaError::InvalidLength { kind, expected, actual } => {
                write!(f, "invalid {} length: expected {} bytes, got {}", kind, expected, actual)
            }
            MlDsaError::ContextTooLong { length } => {
                write!(f, "context too long: {} bytes (max 255)", length)
            }
            MlDsaError::SigningFailed { attempts } => {
                write!(f, "signing failed after {} attempts", attempts)
            }
            MlDsaError::InvalidEncoding(what) => {
                write!(f, "invalid encoding: {}", what)
            }
        }
    }
}

impl std::error::Error for MlDsaError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_detail() {
        let e = MlDsaError::InvalidLength { kind: "public key", expected: 1312, actual: 7 };
        let s = e.to_string();
        assert!(s.contains("public key"));
        assert!(s.contains("1312"));
    }
}
