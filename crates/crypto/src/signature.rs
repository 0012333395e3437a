use std::{fmt, ops::Add};

use ark_bn254::G1Affine;
use ark_ec::{AffineRepr, CurveGroup};
use ark_serialize::{CanonicalDeserialize, CanonicalSerialize};
use serde::{de::Error as DeError, ser::Error as SerError, Deserialize, Serialize};

use crate::CryptoError;

/// A BLS signature, a point in G1.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Signature(G1Affine);

impl Signature {
    /// Length of the compressed encoding.
    pub const ENCODED_LEN: usize = 32;

    pub(crate) fn from_point(point: G1Affine) -> Self {
        Self(point)
    }

    pub fn point(&self) -> G1Affine {
        self.0
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CryptoError> {
        if bytes.is_empty() {
            return Err(CryptoError::EmptySignature);
        }
        if bytes.len() != Self::ENCODED_LEN {
            return Err(CryptoError::InvalidSignature(format!(
                "expected {} bytes, got {}",
                Self::ENCODED_LEN,
                bytes.len()
            )));
        }

        let point = G1Affine::deserialize_compressed(bytes)
            .map_err(|e| CryptoError::InvalidSignature(e.to_string()))?;
        if point.is_zero() {
            return Err(CryptoError::IdentityPoint("signature"));
        }
        Ok(Self(point))
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, CryptoError> {
        let mut buf = Vec::with_capacity(Self::ENCODED_LEN);
        self.0
            .serialize_compressed(&mut buf)
            .map_err(|e| CryptoError::Serialization(e.to_string()))?;
        Ok(buf)
    }
}

impl Add for Signature {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self((self.0.into_group() + rhs.0).into_affine())
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_bytes() {
            Ok(bytes) => write!(f, "0x{}", hex::encode(bytes)),
            Err(_) => f.write_str("<unencodable>"),
        }
    }
}

impl Serialize for Signature {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let bytes = self.to_bytes().map_err(S::Error::custom)?;
        serializer.serialize_str(&format!("0x{}", hex::encode(bytes)))
    }
}

impl<'de> Deserialize<'de> for Signature {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        let bytes = hex::decode(s.trim_start_matches("0x")).map_err(D::Error::custom)?;
        Self::from_bytes(&bytes).map_err(D::Error::custom)
    }
}

/// Sums a non-empty set of signatures.
pub fn aggregate_signatures<'a>(
    signatures: impl IntoIterator<Item = &'a Signature>,
) -> Result<Signature, CryptoError> {
    let mut signatures = signatures.into_iter();
    let first = *signatures.next().ok_or(CryptoError::EmptyAggregation)?;
    Ok(signatures.fold(first, |acc, sig| acc + *sig))
}
