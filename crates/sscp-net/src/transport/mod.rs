pub mod channel;
pub mod cipher_state;
