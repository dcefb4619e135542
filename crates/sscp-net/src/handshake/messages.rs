use crate::{Identity, ProtocolError, IDENTITY_SIZE};
use sscp_crypto::{ELEMENT_SIZE, SHORT_HASH_SIZE};

pub const CLIENT_HELLO_SIZE: usize = 1 + IDENTITY_SIZE;
pub const SERVER_HELLO_SIZE: usize = 1 + IDENTITY_SIZE;
pub const BLINDED_PUBLIC_SIZE: usize = ELEMENT_SIZE;
pub const BLINDED_PUBLIC_AND_CONFIRM_SIZE: usize = ELEMENT_SIZE + SHORT_HASH_SIZE;
pub const CONFIRM_SIZE: usize = SHORT_HASH_SIZE;

pub const STATUS_ACCEPTED: u8 = 0;
pub const STATUS_VERSION_MISMATCH: u8 = 1;

fn check_length(message: &'static str, bytes: &[u8], expected: usize) -> Result<(), ProtocolError> {
    if bytes.len() != expected {
        Err(ProtocolError::BadLength {
            message,
            expected,
            received: bytes.len(),
        })?
    }
    Ok(())
}

fn identity_at(bytes: &[u8]) -> Identity {
    let mut identity = [0u8; IDENTITY_SIZE];
    identity.copy_from_slice(&bytes[..IDENTITY_SIZE]);
    Identity::from_bytes(identity)
}

fn element_at(bytes: &[u8]) -> [u8; ELEMENT_SIZE] {
    let mut element = [0u8; ELEMENT_SIZE];
    element.copy_from_slice(&bytes[..ELEMENT_SIZE]);
    element
}

/// `version(1) || initiator-id(16)`
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct ClientHello {
    pub version: u8,
    pub identity: Identity,
}

impl ClientHello {
    pub fn to_bytes(&self) -> [u8; CLIENT_HELLO_SIZE] {
        let mut out = [0u8; CLIENT_HELLO_SIZE];
        out[0] = self.version;
        out[1..].copy_from_slice(self.identity.as_bytes());
        out
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ProtocolError> {
        check_length("ClientHello", bytes, CLIENT_HELLO_SIZE)?;
        Ok(Self {
            version: bytes[0],
            identity: identity_at(&bytes[1..]),
        })
    }
}

/// `status(1) || responder-id(16)`
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct ServerHello {
    pub status: u8,
    pub identity: Identity,
}

impl ServerHello {
    pub fn is_accepted(&self) -> bool {
        self.status == STATUS_ACCEPTED
    }

    pub fn to_bytes(&self) -> [u8; SERVER_HELLO_SIZE] {
        let mut out = [0u8; SERVER_HELLO_SIZE];
        out[0] = self.status;
        out[1..].copy_from_slice(self.identity.as_bytes());
        out
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ProtocolError> {
        check_length("ServerHello", bytes, SERVER_HELLO_SIZE)?;
        Ok(Self {
            status: bytes[0],
            identity: identity_at(&bytes[1..]),
        })
    }
}

/// The initiator's blinded public value `X`.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct BlindedPublic {
    pub element: [u8; ELEMENT_SIZE],
}

impl BlindedPublic {
    pub fn to_bytes(&self) -> [u8; BLINDED_PUBLIC_SIZE] {
        self.element
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ProtocolError> {
        check_length("BlindedPublic", bytes, BLINDED_PUBLIC_SIZE)?;
        Ok(Self {
            element: element_at(bytes),
        })
    }
}

/// The responder's blinded public value `Y` followed by its confirmation `S1`.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct BlindedPublicAndConfirm {
    pub element: [u8; ELEMENT_SIZE],
    pub confirm: [u8; SHORT_HASH_SIZE],
}

impl BlindedPublicAndConfirm {
    pub fn to_bytes(&self) -> [u8; BLINDED_PUBLIC_AND_CONFIRM_SIZE] {
        let mut out = [0u8; BLINDED_PUBLIC_AND_CONFIRM_SIZE];
        out[..ELEMENT_SIZE].copy_from_slice(&self.element);
        out[ELEMENT_SIZE..].copy_from_slice(&self.confirm);
        out
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ProtocolError> {
        check_length("BlindedPublicAndConfirm", bytes, BLINDED_PUBLIC_AND_CONFIRM_SIZE)?;
        let mut confirm = [0u8; SHORT_HASH_SIZE];
        confirm.copy_from_slice(&bytes[ELEMENT_SIZE..]);
        Ok(Self {
            element: element_at(bytes),
            confirm,
        })
    }
}

/// The initiator's confirmation `S2`.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Confirm {
    pub confirm: [u8; SHORT_HASH_SIZE],
}

impl Confirm {
    pub fn to_bytes(&self) -> [u8; CONFIRM_SIZE] {
        self.confirm
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ProtocolError> {
        check_length("Confirm", bytes, CONFIRM_SIZE)?;
        let mut confirm = [0u8; CONFIRM_SIZE];
        confirm.copy_from_slice(bytes);
        Ok(Self { confirm })
    }
}
