//! Password-authenticated secure sessions over an untrusted byte stream.
//!
//! A five message handshake blinds finite-field Diffie-Hellman public values with
//! password-derived masks, confirms the shared secret in both directions, and derives an
//! encryption key and an authentication key. The resulting [`SecureChannel`] frames
//! application data as sequenced, padded, AES-128-CBC encrypted and HMAC-SHA256
//! authenticated packets.
//!
//! ```text
//! initiator                                   responder
//!   ClientHello        version || id_i    ->
//!                  <-  status || id_r          ServerHello
//!   BlindedPublic      X = g^a * H1(t)    ->
//!                  <-  Y = g^b * H2(t) || S1   BlindedPublicAndConfirm
//!   Confirm            S2                 ->
//! ```

/// Wire version of the Diffie-Hellman handshake. The earlier pre-shared-key revision used `1`.
pub const PROTOCOL_VERSION: u8 = 2;
pub const IDENTITY_SIZE: usize = 16;
pub const MAX_PASSWORD_LEN: usize = 1024;
pub const DEFAULT_MAX_PAYLOAD_LEN: usize = 64 * 1024;
pub const MAX_PAYLOAD_LIMIT: usize = 16 * 1024 * 1024;

mod config;
mod handshake;
mod session;
mod session_error;
mod transport;

pub use config::{Identity, Password, SessionConfig};
pub use handshake::{
    client_handshake,
    handshake_state::{HandshakeResult, HandshakeStage, Initiator, Responder, Role},
    messages::{
        BlindedPublic, BlindedPublicAndConfirm, ClientHello, Confirm, ServerHello,
        BLINDED_PUBLIC_AND_CONFIRM_SIZE, BLINDED_PUBLIC_SIZE, CLIENT_HELLO_SIZE, CONFIRM_SIZE,
        SERVER_HELLO_SIZE, STATUS_ACCEPTED, STATUS_VERSION_MISMATCH,
    },
    server_handshake,
};
pub use session::{connect, Listener};
pub use session_error::{
    ConfigError, CryptoFailure, CryptoFailureReason, ProtocolError, SessionError,
};
pub use transport::{
    channel::{ChannelReader, ChannelWriter, SecureChannel},
    cipher_state::{RecvCipher, SendCipher, LENGTH_SIZE, PACKET_OVERHEAD},
};
