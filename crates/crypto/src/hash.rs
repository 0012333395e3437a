use alloy_primitives::keccak256;
use ark_bn254::{Fq, G1Affine};
use ark_ff::{One, PrimeField};

/// Maps an arbitrary message onto G1 by try-and-increment.
///
/// The keccak256 digest of the message seeds the x coordinate, which is bumped by one until it
/// lands on the curve. BN254's G1 has cofactor 1, so every curve point is in the subgroup.
pub fn hash_to_g1(message: &[u8]) -> G1Affine {
    let digest = keccak256(message);
    let mut x = Fq::from_be_bytes_mod_order(digest.as_slice());
    loop {
        if let Some(point) = G1Affine::get_point_from_x_unchecked(x, false) {
            return point;
        }
        x += Fq::one();
    }
}
