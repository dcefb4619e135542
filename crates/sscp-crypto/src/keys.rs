use crate::CryptoError;
use aes::cipher::{block_padding::NoPadding, BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use hmac::{Hmac, Mac};
use rand::{rngs::OsRng, TryRngCore};
use sha2::Sha256;
use subtle::ConstantTimeEq;

pub const KEY_SIZE: usize = 16;
pub const BLOCK_SIZE: usize = 16;
pub const IV_SIZE: usize = 16;
pub const TAG_SIZE: usize = 16;

type Aes128CbcEnc = cbc::Encryptor<aes::Aes128>;
type Aes128CbcDec = cbc::Decryptor<aes::Aes128>;
type HmacSha256 = Hmac<Sha256>;

impl From<digest::InvalidLength> for CryptoError {
    fn from(_: digest::InvalidLength) -> Self {
        CryptoError::InvalidKeyLength
    }
}

impl From<rand::rand_core::OsError> for CryptoError {
    fn from(_: rand::rand_core::OsError) -> Self {
        CryptoError::OsRngError
    }
}

pub fn fill_random(dest: &mut [u8]) -> Result<(), CryptoError> {
    Ok(OsRng.try_fill_bytes(dest)?)
}

/// Constant-time equality. Slices of different length compare unequal.
pub fn ct_eq(a: &[u8], b: &[u8]) -> bool {
    a.ct_eq(b).into()
}

/// AES-128-CBC over `buffer` in place. `buffer` must already be padded to whole blocks.
pub fn encrypt_blocks(
    key: &[u8; KEY_SIZE],
    iv: &[u8; IV_SIZE],
    buffer: &mut [u8],
) -> Result<(), CryptoError> {
    if buffer.len() % BLOCK_SIZE != 0 {
        return Err(CryptoError::BlockLength);
    }
    if buffer.is_empty() {
        return Ok(());
    }
    let len = buffer.len();
    Aes128CbcEnc::new_from_slices(key, iv)?
        .encrypt_padded_mut::<NoPadding>(buffer, len)
        .map_err(|_| CryptoError::BlockLength)?;
    Ok(())
}

/// Inverse of [`encrypt_blocks`]. Padding is left for the caller to validate.
pub fn decrypt_blocks(
    key: &[u8; KEY_SIZE],
    iv: &[u8; IV_SIZE],
    buffer: &mut [u8],
) -> Result<(), CryptoError> {
    if buffer.len() % BLOCK_SIZE != 0 {
        return Err(CryptoError::BlockLength);
    }
    if buffer.is_empty() {
        return Ok(());
    }
    Aes128CbcDec::new_from_slices(key, iv)?
        .decrypt_padded_mut::<NoPadding>(buffer)
        .map_err(|_| CryptoError::BlockLength)?;
    Ok(())
}

/// HMAC-SHA256 over the concatenation of `parts`, truncated to `TAG_SIZE`.
pub fn compute_tag(key: &[u8], parts: &[&[u8]]) -> Result<[u8; TAG_SIZE], CryptoError> {
    let mut mac = HmacSha256::new_from_slice(key)?;
    for part in parts {
        mac.update(part);
    }
    let mut result = mac.finalize().into_bytes();
    let mut tag = [0u8; TAG_SIZE];
    tag.copy_from_slice(&result[..TAG_SIZE]);
    zeroize::Zeroize::zeroize(&mut result[..]);
    Ok(tag)
}

/// Constant-time check of a truncated tag produced by [`compute_tag`].
pub fn verify_tag(key: &[u8], parts: &[&[u8]], tag: &[u8]) -> Result<bool, CryptoError> {
    if tag.len() != TAG_SIZE {
        return Ok(false);
    }
    let mut mac = HmacSha256::new_from_slice(key)?;
    for part in parts {
        mac.update(part);
    }
    Ok(mac.verify_truncated_left(tag).is_ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: [u8; KEY_SIZE] = [0x2b; KEY_SIZE];
    const IV: [u8; IV_SIZE] = [0x01; IV_SIZE];

    #[test]
    fn aes_cbc_known_answer() {
        // NIST SP 800-38A F.2.1, first block
        let mut key = [0u8; KEY_SIZE];
        let mut iv = [0u8; IV_SIZE];
        let mut block = [0u8; BLOCK_SIZE];
        hex::decode_to_slice("2b7e151628aed2a6abf7158809cf4f3c", &mut key).unwrap();
        hex::decode_to_slice("000102030405060708090a0b0c0d0e0f", &mut iv).unwrap();
        hex::decode_to_slice("6bc1bee22e409f96e93d7e117393172a", &mut block).unwrap();
        encrypt_blocks(&key, &iv, &mut block).unwrap();
        assert_eq!(hex::encode(block), "7649abac8119b246cee98e9b12e9197d");
    }

    #[test]
    fn encrypt_decrypt_blocks() {
        let message = *b"secret message!!secret message!!";
        let mut buffer = message;
        encrypt_blocks(&KEY, &IV, &mut buffer).unwrap();
        assert_ne!(buffer, message);
        decrypt_blocks(&KEY, &IV, &mut buffer).unwrap();
        assert_eq!(buffer, message);
    }

    #[test]
    fn partial_block_rejected() {
        let mut buffer = [0u8; 17];
        assert_eq!(
            encrypt_blocks(&KEY, &IV, &mut buffer),
            Err(CryptoError::BlockLength)
        );
        assert_eq!(
            decrypt_blocks(&KEY, &IV, &mut buffer[..15]),
            Err(CryptoError::BlockLength)
        );
        assert!(encrypt_blocks(&KEY, &IV, &mut []).is_ok());
    }

    #[test]
    fn hmac_known_answer() {
        // RFC 4231 test case 2
        let tag = compute_tag(b"Jefe", &[b"what do ya want ", b"for nothing?"]).unwrap();
        assert_eq!(hex::encode(tag), "5bdcc146bf60754e6a042426089575c7");
    }

    #[test]
    fn tag_verification() {
        let tag = compute_tag(&KEY, &[b"seq", b"body"]).unwrap();
        assert!(verify_tag(&KEY, &[b"seqbody"], &tag).unwrap());
        let mut flipped = tag;
        flipped[TAG_SIZE - 1] ^= 0x80;
        assert!(!verify_tag(&KEY, &[b"seq", b"body"], &flipped).unwrap());
        assert!(!verify_tag(&KEY, &[b"seq", b"body"], &tag[..8]).unwrap());
        assert!(!verify_tag(&[0u8; KEY_SIZE], &[b"seq", b"body"], &tag).unwrap());
    }

    #[test]
    fn constant_time_compare() {
        assert!(ct_eq(b"abc", b"abc"));
        assert!(!ct_eq(b"abc", b"abd"));
        assert!(!ct_eq(b"abc", b"ab"));
    }

    #[test]
    fn random_fill() {
        let mut a = [0u8; 32];
        let mut b = [0u8; 32];
        fill_random(&mut a).unwrap();
        fill_random(&mut b).unwrap();
        assert_ne!(a, b);
    }
}
