//! BLS signatures over the BN254 curve.
//!
//! Signatures live in G1 and public keys carry both their G1 and G2 forms, so a signature
//! over `H(m)` verifies with the pairing check `e(sig, g2) == e(H(m), pk_g2)`.

mod errors;
mod hash;
mod keys;
mod signature;
mod signer;

pub use errors::CryptoError;
pub use hash::hash_to_g1;
pub use keys::{PrivateKey, PublicKey};
pub use signature::{aggregate_signatures, Signature};
pub use signer::{InMemorySigner, Signer};
