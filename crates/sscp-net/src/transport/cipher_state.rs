use crate::{CryptoFailureReason, ProtocolError, SessionError};
use sscp_crypto::{
    compute_tag, decrypt_blocks, encrypt_blocks, fill_random, verify_tag, SequenceCounter,
    SessionKey, BLOCK_SIZE, IV_SIZE, SEQUENCE_SIZE, TAG_SIZE,
};
use zeroize::{Zeroize, Zeroizing};

/// Width of the `total-length` prefix.
pub const LENGTH_SIZE: usize = 4;
/// Bytes a packet carries beyond its ciphertext, not counting the length prefix:
/// `sequence(4) || IV(16) || pad-length(1) || tag(16)`.
pub const PACKET_OVERHEAD: usize = SEQUENCE_SIZE + IV_SIZE + 1 + TAG_SIZE;

const IV_OFFSET: usize = SEQUENCE_SIZE;
const PAD_OFFSET: usize = IV_OFFSET + IV_SIZE;
const BODY_OFFSET: usize = PAD_OFFSET + 1;

fn padding_for(len: usize) -> usize {
    (BLOCK_SIZE - len % BLOCK_SIZE) % BLOCK_SIZE
}

/// Outbound half of the packet layer.
pub struct SendCipher {
    encryption_key: SessionKey,
    authentication_key: SessionKey,
    sequence: SequenceCounter,
}

impl SendCipher {
    pub fn new(encryption_key: SessionKey, authentication_key: SessionKey) -> Self {
        Self {
            encryption_key,
            authentication_key,
            sequence: SequenceCounter::new(),
        }
    }

    /// Sequence number the next packet will carry.
    pub fn sequence(&self) -> u32 {
        self.sequence.counter_num()
    }

    /// Builds a complete packet, length prefix included, around `plaintext`.
    pub fn seal_packet(&mut self, plaintext: &[u8]) -> Result<Vec<u8>, SessionError> {
        let pad = padding_for(plaintext.len());
        let body_len = plaintext.len() + pad;
        let total = u32::try_from(PACKET_OVERHEAD + body_len)
            .map_err(|_| ProtocolError::PacketLength(u32::MAX))?;
        let sequence = self.sequence.take_next()?;

        let mut iv = [0u8; IV_SIZE];
        fill_random(&mut iv)?;

        let mut packet = Vec::with_capacity(LENGTH_SIZE + PACKET_OVERHEAD + body_len);
        packet.extend_from_slice(&total.to_be_bytes());
        packet.extend_from_slice(&sequence.to_be_bytes());
        packet.extend_from_slice(&iv);
        packet.push(pad as u8);
        let body_start = packet.len();
        packet.extend_from_slice(plaintext);
        packet.resize(body_start + body_len, pad as u8);

        self.encryption_key
            .with(|key| encrypt_blocks(key, &iv, &mut packet[body_start..]))?;
        let tag = self
            .authentication_key
            .with(|key| compute_tag(key, &[&packet[LENGTH_SIZE..]]))?;
        packet.extend_from_slice(&tag);
        Ok(packet)
    }
}

/// Inbound half of the packet layer.
pub struct RecvCipher {
    encryption_key: SessionKey,
    authentication_key: SessionKey,
    sequence: SequenceCounter,
    max_payload_len: usize,
}

impl RecvCipher {
    pub fn new(
        encryption_key: SessionKey,
        authentication_key: SessionKey,
        max_payload_len: usize,
    ) -> Self {
        Self {
            encryption_key,
            authentication_key,
            sequence: SequenceCounter::new(),
            max_payload_len,
        }
    }

    /// Sequence number the next packet must carry.
    pub fn sequence(&self) -> u32 {
        self.sequence.counter_num()
    }

    /// Validates an untrusted `total-length` before anything is allocated for it.
    pub fn check_length(&self, total: u32) -> Result<usize, SessionError> {
        let len = total as usize;
        let max_body = self.max_payload_len.div_ceil(BLOCK_SIZE) * BLOCK_SIZE;
        if len < PACKET_OVERHEAD
            || len > PACKET_OVERHEAD + max_body
            || (len - PACKET_OVERHEAD) % BLOCK_SIZE != 0
        {
            Err(ProtocolError::PacketLength(total))?
        }
        Ok(len)
    }

    /// Authenticates, sequence checks, decrypts and unpads a packet, in that order.
    /// `packet` is everything after the length prefix and is wiped afterwards.
    pub fn open_packet(&mut self, packet: &mut [u8]) -> Result<Zeroizing<Vec<u8>>, SessionError> {
        let total = u32::try_from(packet.len()).unwrap_or(u32::MAX);
        self.check_length(total)?;

        let tag_offset = packet.len() - TAG_SIZE;
        let (body, tag) = packet.split_at_mut(tag_offset);
        let authentic = self
            .authentication_key
            .with(|key| verify_tag(key, &[&body[..]], tag))?;
        if !authentic {
            Err(SessionError::crypto(CryptoFailureReason::TagMismatch))?
        }

        let mut sequence = [0u8; SEQUENCE_SIZE];
        sequence.copy_from_slice(&body[..SEQUENCE_SIZE]);
        self.sequence.accept_next(u32::from_be_bytes(sequence))?;

        let mut iv = [0u8; IV_SIZE];
        iv.copy_from_slice(&body[IV_OFFSET..PAD_OFFSET]);
        let pad = body[PAD_OFFSET] as usize;
        let ciphertext = &mut body[BODY_OFFSET..];
        self.encryption_key
            .with(|key| decrypt_blocks(key, &iv, &mut *ciphertext))?;

        let result = unpad(ciphertext, pad, self.max_payload_len)
            .map(|plaintext| Zeroizing::new(plaintext.to_vec()));
        ciphertext.zeroize();
        result
    }
}

/// Every pad byte is checked, whatever the first mismatch.
fn unpad(body: &[u8], pad: usize, max_payload_len: usize) -> Result<&[u8], SessionError> {
    if pad >= BLOCK_SIZE || pad > body.len() {
        Err(SessionError::crypto(CryptoFailureReason::BadPadding))?
    }
    let (plaintext, padding) = body.split_at(body.len() - pad);
    let mismatch = padding.iter().fold(0u8, |acc, b| acc | (b ^ pad as u8));
    if mismatch != 0 || padding_for(plaintext.len()) != pad {
        Err(SessionError::crypto(CryptoFailureReason::BadPadding))?
    }
    if plaintext.len() > max_payload_len {
        Err(ProtocolError::PacketLength(body.len() as u32))?
    }
    Ok(plaintext)
}
