//! Distributed key generation.
//!
//! Four phases produce the same public-key/share structure as the trusted
//! dealer without any party ever holding the full secret:
//!
//! 1. **Commit** — each party commits to a ρ contribution and to one fresh
//!    seed per bitmask it holds.
//! 2. **Reveal** — ρ contributions are broadcast; bitmask seeds go
//!    confidentially to fellow holders only.
//! 3. **Finalize / mask distribution** — commitments are verified, shares
//!    derived from the combined per-bitmask seeds, and each bitmask's
//!    designated generator splits its public contribution A·s1_b + s2_b
//!    into additive mask pieces sent confidentially to the holders.
//! 4. **Aggregate** — each party broadcasts the sum of its mask pieces;
//!    the sums add up to t = A·s1 + s2, from which everyone derives the
//!    identical public key.

mod protocol;
mod state;
mod types;

pub use protocol::DkgParty;
pub use state::{Phase1State, Phase2State};
pub use types::{
    DkgOutput, MaskPiece, Phase1Broadcast, Phase2Broadcast, Phase2Private, Phase3Private,
    Phase4Broadcast, SeedReveal,
};
