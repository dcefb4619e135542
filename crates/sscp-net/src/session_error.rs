use crate::HandshakeStage;
use sscp_crypto::{CryptoError, SequenceError};
use std::fmt;

/// Every failure a handshake or channel can report.
///
/// Cryptographic failures are deliberately opaque: their `Display` and `Debug` output is
/// the same whichever check failed. Use [`SessionError::unsafe_reason`] for local debugging
/// only.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),
    #[error("{0}")]
    Crypto(CryptoFailure),
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("channel unusable after an earlier failure")]
    Invalidated,
}

impl SessionError {
    pub(crate) fn crypto(reason: CryptoFailureReason) -> Self {
        SessionError::Crypto(CryptoFailure { reason })
    }

    pub fn is_crypto(&self) -> bool {
        matches!(self, SessionError::Crypto(_))
    }

    /// The specific reason behind a cryptographic failure. Never send this to a peer.
    pub fn unsafe_reason(&self) -> Option<CryptoFailureReason> {
        match self {
            SessionError::Crypto(failure) => Some(failure.unsafe_reason()),
            _ => None,
        }
    }

    /// Like `to_string`, but with the hidden reason appended to cryptographic failures.
    pub fn unsafe_description(&self) -> String {
        match self {
            SessionError::Crypto(failure) => failure.unsafe_description(),
            other => other.to_string(),
        }
    }
}

impl From<CryptoError> for SessionError {
    fn from(value: CryptoError) -> Self {
        match value {
            CryptoError::DegenerateElement | CryptoError::ElementOutOfRange => {
                SessionError::crypto(CryptoFailureReason::DegenerateElement)
            }
            other => SessionError::crypto(CryptoFailureReason::Primitive(other)),
        }
    }
}

impl From<SequenceError> for SessionError {
    fn from(value: SequenceError) -> Self {
        match value {
            SequenceError::Mismatch { .. } => {
                SessionError::crypto(CryptoFailureReason::SequenceMismatch)
            }
            SequenceError::Exhausted => SessionError::Protocol(ProtocolError::SequenceExhausted),
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, thiserror::Error)]
pub enum ProtocolError {
    #[error("{message} must be {expected} bytes, got {received}")]
    BadLength {
        message: &'static str,
        expected: usize,
        received: usize,
    },
    #[error("unsupported protocol version {0}")]
    VersionMismatch(u8),
    #[error("peer rejected the handshake with status {0}")]
    Rejected(u8),
    #[error("message not expected in handshake stage {0:?}")]
    OutOfOrder(HandshakeStage),
    #[error("packet length {0} outside the accepted range")]
    PacketLength(u32),
    #[error("sequence space exhausted")]
    SequenceExhausted,
}

#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("identity is {0} bytes, at most 16 allowed")]
    IdentityTooLong(usize),
    #[error("password must not be empty")]
    EmptyPassword,
    #[error("password is {0} bytes, at most 1024 allowed")]
    PasswordTooLong(usize),
    #[error("max payload length {0} outside the accepted range")]
    PayloadLimit(usize),
}

/// Which check rejected the input. Only reachable through the `unsafe_` accessors.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum CryptoFailureReason {
    ConfirmationMismatch,
    TagMismatch,
    SequenceMismatch,
    BadPadding,
    DegenerateElement,
    Primitive(CryptoError),
}

#[derive(Copy, Clone, Eq, PartialEq)]
pub struct CryptoFailure {
    reason: CryptoFailureReason,
}

impl CryptoFailure {
    pub fn unsafe_reason(&self) -> CryptoFailureReason {
        self.reason
    }

    pub fn unsafe_description(&self) -> String {
        format!("{}: {:?}", self, self.reason)
    }
}

impl fmt::Display for CryptoFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("cryptographic failure")
    }
}

impl fmt::Debug for CryptoFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("CryptoFailure")
    }
}

impl std::error::Error for CryptoFailure {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crypto_failures_look_alike() {
        let reasons = [
            CryptoFailureReason::ConfirmationMismatch,
            CryptoFailureReason::TagMismatch,
            CryptoFailureReason::SequenceMismatch,
            CryptoFailureReason::BadPadding,
            CryptoFailureReason::DegenerateElement,
        ];
        for reason in reasons {
            let error = SessionError::crypto(reason);
            assert_eq!(error.to_string(), "cryptographic failure");
            assert_eq!(format!("{:?}", error), "Crypto(CryptoFailure)");
            assert!(error.is_crypto());
            assert_eq!(error.unsafe_reason(), Some(reason));
        }
    }

    #[test]
    fn unsafe_description_reveals_reason() {
        let error = SessionError::crypto(CryptoFailureReason::BadPadding);
        assert_eq!(
            error.unsafe_description(),
            "cryptographic failure: BadPadding"
        );
        let error = SessionError::from(ProtocolError::VersionMismatch(9));
        assert_eq!(
            error.unsafe_description(),
            "protocol error: unsupported protocol version 9"
        );
        assert_eq!(error.unsafe_reason(), None);
    }

    #[test]
    fn lower_layer_conversions() {
        let error = SessionError::from(CryptoError::ElementOutOfRange);
        assert_eq!(
            error.unsafe_reason(),
            Some(CryptoFailureReason::DegenerateElement)
        );
        let error = SessionError::from(SequenceError::Mismatch {
            expected: 1,
            received: 0,
        });
        assert_eq!(
            error.unsafe_reason(),
            Some(CryptoFailureReason::SequenceMismatch)
        );
        let error = SessionError::from(SequenceError::Exhausted);
        assert!(matches!(
            error,
            SessionError::Protocol(ProtocolError::SequenceExhausted)
        ));
        let error = SessionError::from(std::io::Error::from(std::io::ErrorKind::UnexpectedEof));
        assert!(matches!(error, SessionError::Io(_)));
    }
}
