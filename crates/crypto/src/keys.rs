use std::{fmt, ops::Add};

use ark_bn254::{Bn254, Fr, G1Affine, G2Affine};
use ark_ec::{pairing::Pairing, AffineRepr, CurveGroup};
use ark_ff::{BigInteger, PrimeField, Zero};
use ark_serialize::{CanonicalDeserialize, CanonicalSerialize};
use rand::{CryptoRng, RngCore};
use serde::{de::Error as DeError, ser::Error as SerError, Deserialize, Serialize};
use zeroize::Zeroize;

use crate::{hash::hash_to_g1, signature::Signature, CryptoError};

const SCALAR_LEN: usize = 32;
const G1_COMPRESSED_LEN: usize = 32;
const G2_COMPRESSED_LEN: usize = 64;

/// A BN254 secret scalar. The scalar is wiped from memory on drop.
pub struct PrivateKey(Fr);

impl PrivateKey {
    /// Parses a 32-byte big-endian scalar.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CryptoError> {
        if bytes.len() != SCALAR_LEN {
            return Err(CryptoError::InvalidPrivateKey(format!(
                "expected {SCALAR_LEN} bytes, got {}",
                bytes.len()
            )));
        }

        let scalar = Fr::from_be_bytes_mod_order(bytes);
        if scalar.is_zero() {
            return Err(CryptoError::InvalidPrivateKey("scalar is zero".to_string()));
        }

        Ok(Self(scalar))
    }

    /// Parses a hex encoded scalar, with or without a `0x` prefix.
    pub fn from_hex(s: &str) -> Result<Self, CryptoError> {
        let mut bytes = hex::decode(s.trim_start_matches("0x"))
            .map_err(|e| CryptoError::InvalidPrivateKey(e.to_string()))?;
        let key = Self::from_bytes(&bytes);
        bytes.zeroize();
        key
    }

    /// Samples a fresh non-zero key.
    pub fn random<R: RngCore + CryptoRng>(rng: &mut R) -> Self {
        loop {
            // Wide reduction keeps the bias negligible.
            let mut bytes = [0u8; 64];
            rng.fill_bytes(&mut bytes);
            let scalar = Fr::from_be_bytes_mod_order(&bytes);
            bytes.zeroize();
            if !scalar.is_zero() {
                return Self(scalar);
            }
        }
    }

    /// Big-endian encoding of the scalar.
    pub fn to_bytes(&self) -> [u8; SCALAR_LEN] {
        let be = self.0.into_bigint().to_bytes_be();
        let mut out = [0u8; SCALAR_LEN];
        out[SCALAR_LEN - be.len()..].copy_from_slice(&be);
        out
    }

    pub fn public_key(&self) -> PublicKey {
        PublicKey {
            g1: (G1Affine::generator() * self.0).into_affine(),
            g2: (G2Affine::generator() * self.0).into_affine(),
        }
    }

    /// Signs `message` by scaling its G1 hash with the secret scalar.
    pub fn sign(&self, message: &[u8]) -> Signature {
        Signature::from_point((hash_to_g1(message) * self.0).into_affine())
    }
}

impl Drop for PrivateKey {
    fn drop(&mut self) {
        self.0.zeroize();
    }
}

impl fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PrivateKey(<redacted>)")
    }
}

/// A BN254 public key in both groups.
///
/// The G2 form is used for verification and aggregation, the G1 form is what on-chain
/// certificate checkers consume for non-signer accounting. Encoded as `g1 || g2`, both
/// compressed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PublicKey {
    g1: G1Affine,
    g2: G2Affine,
}

impl PublicKey {
    /// Length of the compressed `g1 || g2` encoding.
    pub const ENCODED_LEN: usize = G1_COMPRESSED_LEN + G2_COMPRESSED_LEN;

    pub fn g1(&self) -> &G1Affine {
        &self.g1
    }

    pub fn g2(&self) -> &G2Affine {
        &self.g2
    }

    /// Decodes a key and checks that both components share the same discrete log.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CryptoError> {
        if bytes.len() != Self::ENCODED_LEN {
            return Err(CryptoError::InvalidPublicKey(format!(
                "expected {} bytes, got {}",
                Self::ENCODED_LEN,
                bytes.len()
            )));
        }

        let (g1_bytes, g2_bytes) = bytes.split_at(G1_COMPRESSED_LEN);
        let g1 = G1Affine::deserialize_compressed(g1_bytes)
            .map_err(|e| CryptoError::InvalidPublicKey(format!("g1: {e}")))?;
        let g2 = G2Affine::deserialize_compressed(g2_bytes)
            .map_err(|e| CryptoError::InvalidPublicKey(format!("g2: {e}")))?;
        if g1.is_zero() || g2.is_zero() {
            return Err(CryptoError::IdentityPoint("public key"));
        }

        let key = Self { g1, g2 };
        if !key.is_consistent() {
            return Err(CryptoError::InvalidPublicKey(
                "g1 and g2 components do not match".to_string(),
            ));
        }

        Ok(key)
    }

    pub fn from_hex(s: &str) -> Result<Self, CryptoError> {
        let bytes = hex::decode(s.trim_start_matches("0x"))
            .map_err(|e| CryptoError::InvalidPublicKey(e.to_string()))?;
        Self::from_bytes(&bytes)
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, CryptoError> {
        let mut buf = Vec::with_capacity(Self::ENCODED_LEN);
        self.g1
            .serialize_compressed(&mut buf)
            .map_err(|e| CryptoError::Serialization(e.to_string()))?;
        self.g2
            .serialize_compressed(&mut buf)
            .map_err(|e| CryptoError::Serialization(e.to_string()))?;
        Ok(buf)
    }

    /// Checks `e(sig, g2) == e(H(message), pk)`.
    pub fn verify(&self, message: &[u8], signature: &Signature) -> bool {
        let lhs = Bn254::pairing(signature.point(), G2Affine::generator());
        let rhs = Bn254::pairing(hash_to_g1(message), self.g2);
        lhs == rhs
    }

    /// Sums a non-empty set of keys.
    pub fn aggregate<'a>(keys: impl IntoIterator<Item = &'a PublicKey>) -> Result<Self, CryptoError> {
        let mut keys = keys.into_iter();
        let first = *keys.next().ok_or(CryptoError::EmptyAggregation)?;
        Ok(keys.fold(first, |acc, key| acc + *key))
    }

    fn is_consistent(&self) -> bool {
        Bn254::pairing(self.g1, G2Affine::generator())
            == Bn254::pairing(G1Affine::generator(), self.g2)
    }
}

impl Add for PublicKey {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self {
            g1: (self.g1.into_group() + rhs.g1).into_affine(),
            g2: (self.g2.into_group() + rhs.g2).into_affine(),
        }
    }
}

impl fmt::Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_bytes() {
            Ok(bytes) => write!(f, "0x{}", hex::encode(bytes)),
            Err(_) => f.write_str("<unencodable>"),
        }
    }
}

impl Serialize for PublicKey {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let bytes = self.to_bytes().map_err(S::Error::custom)?;
        serializer.serialize_str(&format!("0x{}", hex::encode(bytes)))
    }
}

impl<'de> Deserialize<'de> for PublicKey {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(D::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use rand::thread_rng;

    use super::*;

    #[test]
    fn test_sign_and_verify() {
        let sk = PrivateKey::random(&mut thread_rng());
        let pk = sk.public_key();
        let sig = sk.sign(b"payload");

        assert!(pk.verify(b"payload", &sig));
        assert!(!pk.verify(b"other payload", &sig));
    }

    #[test]
    fn test_verify_rejects_foreign_key() {
        let sk = PrivateKey::random(&mut thread_rng());
        let other = PrivateKey::random(&mut thread_rng()).public_key();
        let sig = sk.sign(b"payload");

        assert!(!other.verify(b"payload", &sig));
    }

    #[test]
    fn test_private_key_bytes_roundtrip() {
        let sk = PrivateKey::random(&mut thread_rng());
        let restored = PrivateKey::from_bytes(&sk.to_bytes()).unwrap();
        assert_eq!(sk.public_key(), restored.public_key());

        let hexed = format!("0x{}", hex::encode(sk.to_bytes()));
        let restored = PrivateKey::from_hex(&hexed).unwrap();
        assert_eq!(sk.public_key(), restored.public_key());
    }

    #[test]
    fn test_private_key_rejects_zero_and_bad_length() {
        assert!(matches!(
            PrivateKey::from_bytes(&[0u8; 32]),
            Err(CryptoError::InvalidPrivateKey(_))
        ));
        assert!(matches!(
            PrivateKey::from_bytes(&[1u8; 31]),
            Err(CryptoError::InvalidPrivateKey(_))
        ));
    }

    #[test]
    fn test_public_key_roundtrip_verifies_identically() {
        // Scenario: a key and signature are encoded then decoded
        // Expected: decoded values verify exactly like the originals
        let sk = PrivateKey::random(&mut thread_rng());
        let pk = sk.public_key();
        let sig = sk.sign(b"digest");

        let pk2 = PublicKey::from_bytes(&pk.to_bytes().unwrap()).unwrap();
        let sig2 = Signature::from_bytes(&sig.to_bytes().unwrap()).unwrap();

        assert_eq!(pk, pk2);
        assert_eq!(sig, sig2);
        assert_eq!(pk.verify(b"digest", &sig), pk2.verify(b"digest", &sig2));
        assert_eq!(pk.verify(b"nope", &sig), pk2.verify(b"nope", &sig2));
    }

    #[test]
    fn test_public_key_rejects_mismatched_components() {
        let a = PrivateKey::random(&mut thread_rng()).public_key();
        let b = PrivateKey::random(&mut thread_rng()).public_key();
        let a_bytes = a.to_bytes().unwrap();
        let b_bytes = b.to_bytes().unwrap();

        let mut spliced = a_bytes[..G1_COMPRESSED_LEN].to_vec();
        spliced.extend_from_slice(&b_bytes[G1_COMPRESSED_LEN..]);

        assert!(matches!(
            PublicKey::from_bytes(&spliced),
            Err(CryptoError::InvalidPublicKey(_))
        ));
    }

    #[test]
    fn test_public_key_rejects_identity() {
        // Scenario: both components encode the point at infinity.
        // Expected: decoding fails, since such a key verifies an identity signature
        // for every message.
        let mut bytes = Vec::new();
        G1Affine::zero().serialize_compressed(&mut bytes).unwrap();
        G2Affine::zero().serialize_compressed(&mut bytes).unwrap();
        assert_eq!(
            PublicKey::from_bytes(&bytes),
            Err(CryptoError::IdentityPoint("public key"))
        );

        // a real g1 paired with an identity g2 is rejected too
        let pk = PrivateKey::random(&mut thread_rng()).public_key();
        let mut mixed = pk.to_bytes().unwrap()[..G1_COMPRESSED_LEN].to_vec();
        G2Affine::zero().serialize_compressed(&mut mixed).unwrap();
        assert_eq!(
            PublicKey::from_bytes(&mixed),
            Err(CryptoError::IdentityPoint("public key"))
        );
    }

    #[test]
    fn test_public_key_serde_hex() {
        let pk = PrivateKey::random(&mut thread_rng()).public_key();
        let json = serde_json::to_string(&pk).unwrap();
        assert!(json.starts_with("\"0x"));
        let back: PublicKey = serde_json::from_str(&json).unwrap();
        assert_eq!(pk, back);
    }

    #[test]
    fn test_aggregate_requires_keys() {
        let empty: Vec<PublicKey> = vec![];
        assert_eq!(
            PublicKey::aggregate(&empty),
            Err(CryptoError::EmptyAggregation)
        );
    }
}
