use crate::{PrivateKey, PublicKey, Signature};

/// Something that can produce BLS signatures on behalf of a single identity.
pub trait Signer: Send + Sync {
    /// Signs an arbitrary message.
    fn sign_message(&self, message: &[u8]) -> Signature;

    /// Public key matching the signatures this signer produces.
    fn public_key(&self) -> PublicKey;
}

/// Signer backed by a key held in process memory.
#[derive(Debug)]
pub struct InMemorySigner {
    key: PrivateKey,
    public_key: PublicKey,
}

impl InMemorySigner {
    pub fn new(key: PrivateKey) -> Self {
        let public_key = key.public_key();
        Self { key, public_key }
    }
}

impl Signer for InMemorySigner {
    fn sign_message(&self, message: &[u8]) -> Signature {
        self.key.sign(message)
    }

    fn public_key(&self) -> PublicKey {
        self.public_key
    }
}

#[cfg(test)]
mod tests {
    use rand::thread_rng;

    use super::*;

    #[test]
    fn test_in_memory_signer_signatures_verify() {
        let signer = InMemorySigner::new(PrivateKey::random(&mut thread_rng()));
        let sig = signer.sign_message(b"task payload");
        assert!(signer.public_key().verify(b"task payload", &sig));
    }
}
