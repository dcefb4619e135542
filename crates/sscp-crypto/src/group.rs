//! Arithmetic in the 3072-bit MODP group of RFC 3526 (group 15).
//!
//! Every element leaves this module as a fixed-width, big-endian, left zero-padded
//! byte array of `ELEMENT_SIZE` bytes. Callers never see the underlying integers.
//!
//! Exponentiation is not constant-time.

use crate::{fill_random, CryptoError};
use num_bigint::BigUint;
use num_traits::{One, Zero};
use once_cell::sync::Lazy;
use std::fmt;
use zeroize::Zeroizing;

/// Width in bytes of an encoded group element.
pub const ELEMENT_SIZE: usize = 384;
pub const GROUP_GENERATOR: u32 = 2;

const GROUP_PRIME: [u8; ELEMENT_SIZE] = [
    0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xc9, 0x0f, 0xda, 0xa2,
    0x21, 0x68, 0xc2, 0x34, 0xc4, 0xc6, 0x62, 0x8b, 0x80, 0xdc, 0x1c, 0xd1,
    0x29, 0x02, 0x4e, 0x08, 0x8a, 0x67, 0xcc, 0x74, 0x02, 0x0b, 0xbe, 0xa6,
    0x3b, 0x13, 0x9b, 0x22, 0x51, 0x4a, 0x08, 0x79, 0x8e, 0x34, 0x04, 0xdd,
    0xef, 0x95, 0x19, 0xb3, 0xcd, 0x3a, 0x43, 0x1b, 0x30, 0x2b, 0x0a, 0x6d,
    0xf2, 0x5f, 0x14, 0x37, 0x4f, 0xe1, 0x35, 0x6d, 0x6d, 0x51, 0xc2, 0x45,
    0xe4, 0x85, 0xb5, 0x76, 0x62, 0x5e, 0x7e, 0xc6, 0xf4, 0x4c, 0x42, 0xe9,
    0xa6, 0x37, 0xed, 0x6b, 0x0b, 0xff, 0x5c, 0xb6, 0xf4, 0x06, 0xb7, 0xed,
    0xee, 0x38, 0x6b, 0xfb, 0x5a, 0x89, 0x9f, 0xa5, 0xae, 0x9f, 0x24, 0x11,
    0x7c, 0x4b, 0x1f, 0xe6, 0x49, 0x28, 0x66, 0x51, 0xec, 0xe4, 0x5b, 0x3d,
    0xc2, 0x00, 0x7c, 0xb8, 0xa1, 0x63, 0xbf, 0x05, 0x98, 0xda, 0x48, 0x36,
    0x1c, 0x55, 0xd3, 0x9a, 0x69, 0x16, 0x3f, 0xa8, 0xfd, 0x24, 0xcf, 0x5f,
    0x83, 0x65, 0x5d, 0x23, 0xdc, 0xa3, 0xad, 0x96, 0x1c, 0x62, 0xf3, 0x56,
    0x20, 0x85, 0x52, 0xbb, 0x9e, 0xd5, 0x29, 0x07, 0x70, 0x96, 0x96, 0x6d,
    0x67, 0x0c, 0x35, 0x4e, 0x4a, 0xbc, 0x98, 0x04, 0xf1, 0x74, 0x6c, 0x08,
    0xca, 0x18, 0x21, 0x7c, 0x32, 0x90, 0x5e, 0x46, 0x2e, 0x36, 0xce, 0x3b,
    0xe3, 0x9e, 0x77, 0x2c, 0x18, 0x0e, 0x86, 0x03, 0x9b, 0x27, 0x83, 0xa2,
    0xec, 0x07, 0xa2, 0x8f, 0xb5, 0xc5, 0x5d, 0xf0, 0x6f, 0x4c, 0x52, 0xc9,
    0xde, 0x2b, 0xcb, 0xf6, 0x95, 0x58, 0x17, 0x18, 0x39, 0x95, 0x49, 0x7c,
    0xea, 0x95, 0x6a, 0xe5, 0x15, 0xd2, 0x26, 0x18, 0x98, 0xfa, 0x05, 0x10,
    0x15, 0x72, 0x8e, 0x5a, 0x8a, 0xaa, 0xc4, 0x2d, 0xad, 0x33, 0x17, 0x0d,
    0x04, 0x50, 0x7a, 0x33, 0xa8, 0x55, 0x21, 0xab, 0xdf, 0x1c, 0xba, 0x64,
    0xec, 0xfb, 0x85, 0x04, 0x58, 0xdb, 0xef, 0x0a, 0x8a, 0xea, 0x71, 0x57,
    0x5d, 0x06, 0x0c, 0x7d, 0xb3, 0x97, 0x0f, 0x85, 0xa6, 0xe1, 0xe4, 0xc7,
    0xab, 0xf5, 0xae, 0x8c, 0xdb, 0x09, 0x33, 0xd7, 0x1e, 0x8c, 0x94, 0xe0,
    0x4a, 0x25, 0x61, 0x9d, 0xce, 0xe3, 0xd2, 0x26, 0x1a, 0xd2, 0xee, 0x6b,
    0xf1, 0x2f, 0xfa, 0x06, 0xd9, 0x8a, 0x08, 0x64, 0xd8, 0x76, 0x02, 0x73,
    0x3e, 0xc8, 0x6a, 0x64, 0x52, 0x1f, 0x2b, 0x18, 0x17, 0x7b, 0x20, 0x0c,
    0xbb, 0xe1, 0x17, 0x57, 0x7a, 0x61, 0x5d, 0x6c, 0x77, 0x09, 0x88, 0xc0,
    0xba, 0xd9, 0x46, 0xe2, 0x08, 0xe2, 0x4f, 0xa0, 0x74, 0xe5, 0xab, 0x31,
    0x43, 0xdb, 0x5b, 0xfc, 0xe0, 0xfd, 0x10, 0x8e, 0x4b, 0x82, 0xd1, 0x20,
    0xa9, 0x3a, 0xd2, 0xca, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff,
];

/// The process-wide group parameters, built once on first use and never mutated.
pub static GROUP: Lazy<GroupParameters> = Lazy::new(GroupParameters::modp_3072);

pub struct GroupParameters {
    prime: BigUint,
    prime_minus_one: BigUint,
    prime_minus_two: BigUint,
    generator: BigUint,
}

impl GroupParameters {
    fn modp_3072() -> Self {
        let prime = BigUint::from_bytes_be(&GROUP_PRIME);
        let prime_minus_one = &prime - 1u32;
        let prime_minus_two = &prime - 2u32;
        Self {
            prime,
            prime_minus_one,
            prime_minus_two,
            generator: BigUint::from(GROUP_GENERATOR),
        }
    }

    #[cfg(test)]
    fn prime_bits(&self) -> u64 {
        self.prime.bits()
    }

    #[cfg(test)]
    fn prime_bytes(&self) -> [u8; ELEMENT_SIZE] {
        GROUP_PRIME
    }

    #[cfg(test)]
    fn generator(&self) -> GroupElement {
        GroupElement(self.generator.clone())
    }
}

/// A residue in `[0, P)`.
#[derive(Clone, PartialEq, Eq)]
pub struct GroupElement(BigUint);

impl GroupElement {
    /// Decodes a received element, refusing zero and anything not below the modulus.
    pub fn from_bytes(bytes: &[u8; ELEMENT_SIZE]) -> Result<Self, CryptoError> {
        let value = BigUint::from_bytes_be(bytes);
        if value.is_zero() {
            Err(CryptoError::DegenerateElement)?
        }
        if value >= GROUP.prime {
            Err(CryptoError::ElementOutOfRange)?
        }
        Ok(Self(value))
    }

    /// Reduces an arbitrary big-endian byte string modulo `P`, used to turn hash output
    /// into a blinding factor. A factor congruent to zero is refused.
    pub fn from_mask(bytes: &[u8]) -> Result<Self, CryptoError> {
        let value = BigUint::from_bytes_be(bytes) % &GROUP.prime;
        if value.is_zero() {
            Err(CryptoError::DegenerateElement)?
        }
        Ok(Self(value))
    }

    pub fn to_bytes(&self) -> [u8; ELEMENT_SIZE] {
        let raw = self.0.to_bytes_be();
        let mut out = [0u8; ELEMENT_SIZE];
        out[ELEMENT_SIZE - raw.len()..].copy_from_slice(&raw);
        out
    }

    /// `0`, `1` and `P - 1` generate trivial subgroups and are never valid public values.
    pub fn is_degenerate(&self) -> bool {
        self.0.is_zero() || self.0.is_one() || self.0 == GROUP.prime_minus_one
    }
}

impl fmt::Debug for GroupElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let bytes = self.to_bytes();
        write!(f, "GroupElement({}..)", hex::encode(&bytes[..8]))
    }
}

/// `(a * b) mod P`
pub fn mul_mod(a: &GroupElement, b: &GroupElement) -> GroupElement {
    GroupElement((&a.0 * &b.0) % &GROUP.prime)
}

/// `(a * b^-1) mod P`. The inverse is `b^(P-2)` since `P` is prime.
pub fn div_mod(a: &GroupElement, b: &GroupElement) -> Result<GroupElement, CryptoError> {
    if b.0.is_zero() {
        Err(CryptoError::DegenerateElement)?
    }
    if b.0 >= GROUP.prime {
        Err(CryptoError::ElementOutOfRange)?
    }
    let inverse = b.0.modpow(&GROUP.prime_minus_two, &GROUP.prime);
    Ok(GroupElement((&a.0 * inverse) % &GROUP.prime))
}

/// A single-use Diffie-Hellman key pair. The private exponent is wiped on drop.
pub struct KeyPair {
    private: Zeroizing<[u8; ELEMENT_SIZE]>,
    public: GroupElement,
}

impl KeyPair {
    /// Draws `R` uniformly from `[1, P - 1)` by rejection sampling and computes `G^R mod P`.
    pub fn generate() -> Result<Self, CryptoError> {
        let mut private = Zeroizing::new([0u8; ELEMENT_SIZE]);
        loop {
            fill_random(private.as_mut())?;
            let candidate = BigUint::from_bytes_be(private.as_ref());
            if !candidate.is_zero() && candidate < GROUP.prime_minus_one {
                let public = GroupElement(GROUP.generator.modpow(&candidate, &GROUP.prime));
                return Ok(Self { private, public });
            }
        }
    }

    pub fn public(&self) -> &GroupElement {
        &self.public
    }

    /// `x^R mod P` with this pair's private exponent.
    pub fn pow_priv(&self, x: &GroupElement) -> GroupElement {
        let exponent = BigUint::from_bytes_be(self.private.as_ref());
        GroupElement(x.0.modpow(&exponent, &GROUP.prime))
    }
}

impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyPair")
            .field("public", &self.public)
            .finish_non_exhaustive()
    }
}

pub fn generate_keypair() -> Result<KeyPair, CryptoError> {
    KeyPair::generate()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small(value: u32) -> GroupElement {
        let mut bytes = [0u8; ELEMENT_SIZE];
        bytes[ELEMENT_SIZE - 4..].copy_from_slice(&value.to_be_bytes());
        GroupElement::from_bytes(&bytes).unwrap()
    }

    #[test]
    fn prime_size() {
        assert_eq!(GROUP.prime_bits(), 3072);
        assert_eq!(GROUP.prime_bytes()[0], 0xff);
        assert_eq!(GROUP.prime_bytes()[ELEMENT_SIZE - 1], 0xff);
    }

    #[test]
    fn fixed_width_encoding() {
        let bytes = small(2).to_bytes();
        assert_eq!(bytes.len(), ELEMENT_SIZE);
        assert!(bytes[..ELEMENT_SIZE - 1].iter().all(|b| *b == 0));
        assert_eq!(bytes[ELEMENT_SIZE - 1], 2);
        assert_eq!(GROUP.generator(), small(GROUP_GENERATOR));
    }

    #[test]
    fn rejects_zero_and_out_of_range() {
        assert_eq!(
            GroupElement::from_bytes(&[0u8; ELEMENT_SIZE]),
            Err(CryptoError::DegenerateElement)
        );
        assert_eq!(
            GroupElement::from_bytes(&GROUP.prime_bytes()),
            Err(CryptoError::ElementOutOfRange)
        );
        assert_eq!(
            GroupElement::from_bytes(&[0xffu8; ELEMENT_SIZE]),
            Err(CryptoError::ElementOutOfRange)
        );
    }

    #[test]
    fn mask_is_reduced() {
        assert_eq!(
            GroupElement::from_mask(&GROUP.prime_bytes()),
            Err(CryptoError::DegenerateElement)
        );
        // P + 5 reduces to 5
        let mut above = vec![0u8; ELEMENT_SIZE + 1];
        above[1..].copy_from_slice(&GROUP.prime_bytes());
        let mut five = [0u8; ELEMENT_SIZE + 1];
        five[ELEMENT_SIZE] = 5;
        let sum = (BigUint::from_bytes_be(&above) + BigUint::from_bytes_be(&five)).to_bytes_be();
        assert_eq!(GroupElement::from_mask(&sum).unwrap(), small(5));
    }

    #[test]
    fn degenerate_values() {
        assert!(small(1).is_degenerate());
        assert!(!small(2).is_degenerate());
        let mut minus_one = GROUP.prime_bytes();
        minus_one[ELEMENT_SIZE - 1] -= 1;
        assert!(GroupElement::from_bytes(&minus_one).unwrap().is_degenerate());
    }

    #[test]
    fn mul_then_div() {
        let a = KeyPair::generate().unwrap();
        let b = KeyPair::generate().unwrap();
        let product = mul_mod(a.public(), b.public());
        assert_eq!(&div_mod(&product, b.public()).unwrap(), a.public());
        assert_eq!(mul_mod(&small(6), &small(7)), small(42));
        assert_eq!(div_mod(&small(42), &small(7)).unwrap(), small(6));
    }

    #[test]
    fn diffie_hellman_agrees() {
        let a = generate_keypair().unwrap();
        let b = generate_keypair().unwrap();
        let ab = a.pow_priv(b.public());
        let ba = b.pow_priv(a.public());
        assert_eq!(ab, ba);
        assert!(!ab.is_degenerate());
        assert_ne!(a.public(), b.public());
    }
}
