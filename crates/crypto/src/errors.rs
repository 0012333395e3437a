use thiserror::Error;

/// Errors produced while parsing or combining BN254 key material and signatures.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CryptoError {
    /// Secret scalar was malformed or zero.
    #[error("invalid private key: {0}")]
    InvalidPrivateKey(String),

    /// Public key bytes did not decode to a valid key pair.
    #[error("invalid public key: {0}")]
    InvalidPublicKey(String),

    /// Signature bytes were empty.
    #[error("signature is empty")]
    EmptySignature,

    /// Signature bytes did not decode to a point in G1.
    #[error("invalid signature: {0}")]
    InvalidSignature(String),

    /// Key or signature decoded to the point at infinity, which verifies any message.
    #[error("{0} is the identity point")]
    IdentityPoint(&'static str),

    /// Point encoding failed.
    #[error("serialization failed: {0}")]
    Serialization(String),

    /// Nothing to aggregate.
    #[error("cannot aggregate an empty set")]
    EmptyAggregation,
}
