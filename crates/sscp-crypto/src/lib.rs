mod group;
mod hash;
mod keys;
mod secret;
mod sequence;

pub use group::{
    div_mod, generate_keypair, mul_mod, GroupElement, GroupParameters, KeyPair, ELEMENT_SIZE,
    GROUP, GROUP_GENERATOR,
};
pub use hash::{
    blinding_mask, h1, h2, h3, h4, h5, h6, long_hash, short_hash, HashDomain, LONG_HASH_SIZE,
    SHORT_HASH_SIZE,
};
pub use keys::{
    compute_tag, ct_eq, decrypt_blocks, encrypt_blocks, fill_random, verify_tag, BLOCK_SIZE,
    IV_SIZE, KEY_SIZE, TAG_SIZE,
};
pub use secret::SessionKey;
pub use sequence::{SequenceCounter, SequenceError, SEQUENCE_SIZE};

#[derive(Copy, Clone, Debug, Eq, PartialEq, thiserror::Error)]
pub enum CryptoError {
    #[error("invalid key length")]
    InvalidKeyLength,
    #[error("operating system randomness unavailable")]
    OsRngError,
    #[error("buffer is not a whole number of blocks")]
    BlockLength,
    #[error("group element is not below the modulus")]
    ElementOutOfRange,
    #[error("degenerate group element")]
    DegenerateElement,
    #[error("hash input of {0} bytes is too long")]
    InputTooLong(usize),
}
