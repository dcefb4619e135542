use crate::{CryptoError, ELEMENT_SIZE};
use sha2::{Digest, Sha256};
use zeroize::Zeroizing;

/// Output of the long hash: 25 truncated blocks of `HASH_BLOCK_SIZE` bytes.
pub const LONG_HASH_SIZE: usize = 400;
pub const SHORT_HASH_SIZE: usize = 16;
const HASH_BLOCK_SIZE: usize = 16;
const LONG_HASH_BLOCKS: usize = LONG_HASH_SIZE / HASH_BLOCK_SIZE;

/// Domain separation tags, one per derived value.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[repr(u8)]
pub enum HashDomain {
    /// H1, masks the initiator's public value
    InitiatorBlind = 1,
    /// H2, masks the responder's public value
    ResponderBlind = 2,
    /// H3, responder -> initiator confirmation
    ResponderConfirm = 3,
    /// H4, initiator -> responder confirmation
    InitiatorConfirm = 4,
    /// H5
    EncryptionKey = 5,
    /// H6
    AuthenticationKey = 6,
}

impl HashDomain {
    pub fn tag(self) -> u8 {
        self as u8
    }
}

/// `SHA256(tag || i || z)[..16]` for `i = 1..=25`, concatenated.
pub fn long_hash(domain: HashDomain, z: &[u8]) -> Zeroizing<[u8; LONG_HASH_SIZE]> {
    let mut out = Zeroizing::new([0u8; LONG_HASH_SIZE]);
    for (i, block) in out.chunks_exact_mut(HASH_BLOCK_SIZE).enumerate() {
        let mut hasher = Sha256::new();
        hasher.update([domain.tag(), (i + 1) as u8]);
        hasher.update(z);
        let mut digest = hasher.finalize();
        block.copy_from_slice(&digest[..HASH_BLOCK_SIZE]);
        zeroize::Zeroize::zeroize(&mut digest[..]);
    }
    debug_assert_eq!(out.chunks_exact(HASH_BLOCK_SIZE).count(), LONG_HASH_BLOCKS);
    out
}

/// `SHA256(tag || len_hi || len_lo || z || z)[..16]` where `len` is the 16-bit length of `z`.
pub fn short_hash(domain: HashDomain, z: &[u8]) -> Result<[u8; SHORT_HASH_SIZE], CryptoError> {
    let len = u16::try_from(z.len()).map_err(|_| CryptoError::InputTooLong(z.len()))?;
    let mut hasher = Sha256::new();
    hasher.update([domain.tag()]);
    hasher.update(len.to_be_bytes());
    hasher.update(z);
    hasher.update(z);
    let mut digest = hasher.finalize();
    let mut out = [0u8; SHORT_HASH_SIZE];
    out.copy_from_slice(&digest[..SHORT_HASH_SIZE]);
    zeroize::Zeroize::zeroize(&mut digest[..]);
    Ok(out)
}

/// The part of a long hash used as a group-element mask.
pub fn blinding_mask(long: &[u8; LONG_HASH_SIZE]) -> &[u8] {
    &long[..ELEMENT_SIZE]
}

pub fn h1(z: &[u8]) -> Zeroizing<[u8; LONG_HASH_SIZE]> {
    long_hash(HashDomain::InitiatorBlind, z)
}

pub fn h2(z: &[u8]) -> Zeroizing<[u8; LONG_HASH_SIZE]> {
    long_hash(HashDomain::ResponderBlind, z)
}

pub fn h3(z: &[u8]) -> Result<[u8; SHORT_HASH_SIZE], CryptoError> {
    short_hash(HashDomain::ResponderConfirm, z)
}

pub fn h4(z: &[u8]) -> Result<[u8; SHORT_HASH_SIZE], CryptoError> {
    short_hash(HashDomain::InitiatorConfirm, z)
}

pub fn h5(z: &[u8]) -> Result<[u8; SHORT_HASH_SIZE], CryptoError> {
    short_hash(HashDomain::EncryptionKey, z)
}

pub fn h6(z: &[u8]) -> Result<[u8; SHORT_HASH_SIZE], CryptoError> {
    short_hash(HashDomain::AuthenticationKey, z)
}

#[cfg(test)]
mod tests {
    use super::*;

    const TRANSCRIPT: &[u8] = b"client\0\0\0\0\0\0\0\0\0\0server\0\0\0\0\0\0\0\0\0\0password";

    #[test]
    fn long_hash_layout() {
        let out = h1(TRANSCRIPT);
        assert_eq!(out.len(), LONG_HASH_SIZE);
        assert_eq!(blinding_mask(&out).len(), ELEMENT_SIZE);

        // Block i is the truncated digest of (tag, i, z)
        let mut hasher = Sha256::new();
        hasher.update([1u8, 3u8]);
        hasher.update(TRANSCRIPT);
        let third = hasher.finalize();
        assert_eq!(&out[32..48], &third[..16]);
    }

    #[test]
    fn short_hash_framing() {
        let z = b"abc";
        let mut hasher = Sha256::new();
        hasher.update([3u8, 0, 3]);
        hasher.update(b"abcabc");
        let expected = hasher.finalize();
        assert_eq!(h3(z).unwrap()[..], expected[..16]);
    }

    #[test]
    fn domains_are_independent() {
        assert_ne!(*h1(TRANSCRIPT), *h2(TRANSCRIPT));
        let shorts = [
            h3(TRANSCRIPT).unwrap(),
            h4(TRANSCRIPT).unwrap(),
            h5(TRANSCRIPT).unwrap(),
            h6(TRANSCRIPT).unwrap(),
        ];
        for i in 0..shorts.len() {
            for j in i + 1..shorts.len() {
                assert_ne!(shorts[i], shorts[j]);
            }
        }
    }

    #[test]
    fn deterministic() {
        assert_eq!(*h2(TRANSCRIPT), *h2(TRANSCRIPT));
        assert_eq!(h5(TRANSCRIPT).unwrap(), h5(TRANSCRIPT).unwrap());
        assert_ne!(h5(TRANSCRIPT).unwrap(), h5(b"other").unwrap());
    }

    #[test]
    fn short_hash_input_limit() {
        let long = vec![0u8; u16::MAX as usize + 1];
        assert_eq!(h4(&long), Err(CryptoError::InputTooLong(long.len())));
        assert!(h4(&long[1..]).is_ok());
    }
}
