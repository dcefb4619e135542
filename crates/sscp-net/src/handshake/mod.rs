pub mod handshake_state;
pub mod messages;
mod transcript;

use crate::{
    BlindedPublic, BlindedPublicAndConfirm, ClientHello, Confirm, HandshakeResult, Initiator,
    ProtocolError, Responder, SecureChannel, ServerHello, SessionConfig, SessionError,
    BLINDED_PUBLIC_AND_CONFIRM_SIZE, BLINDED_PUBLIC_SIZE, CLIENT_HELLO_SIZE, CONFIRM_SIZE,
    SERVER_HELLO_SIZE,
};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::debug;

async fn send<S: AsyncWrite + Unpin>(stream: &mut S, message: &[u8]) -> Result<(), SessionError> {
    stream.write_all(message).await?;
    stream.flush().await?;
    Ok(())
}

/// Runs the initiator side over an already connected stream. On failure the stream is
/// shut down and dropped, so no channel ever exists for a failed handshake.
pub async fn client_handshake<S>(
    mut stream: S,
    config: &SessionConfig,
) -> Result<SecureChannel<S>, SessionError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    config.validate()?;
    let mut initiator = Initiator::new(config.identity, config.password.clone());
    match run_initiator(&mut stream, &mut initiator).await {
        Ok(result) => {
            debug!(peer = %result.peer_identity, role = ?result.role, "handshake established");
            Ok(SecureChannel::new(stream, result, config.max_payload_len))
        }
        Err(e) => {
            debug!(stage = ?initiator.stage(), error = %e, "initiator handshake failed");
            let _ = stream.shutdown().await;
            Err(e)
        }
    }
}

async fn run_initiator<S>(
    stream: &mut S,
    initiator: &mut Initiator,
) -> Result<HandshakeResult, SessionError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let hello = initiator.client_hello()?;
    send(stream, &hello.to_bytes()).await?;

    let mut reply = [0u8; SERVER_HELLO_SIZE];
    stream.read_exact(&mut reply).await?;
    let reply = ServerHello::from_bytes(&reply)?;
    debug!(peer = %reply.identity, status = reply.status, "received server hello");
    let blinded = initiator.read_server_hello(&reply)?;
    send(stream, &blinded.to_bytes()).await?;

    let mut answer = [0u8; BLINDED_PUBLIC_AND_CONFIRM_SIZE];
    stream.read_exact(&mut answer).await?;
    let answer = BlindedPublicAndConfirm::from_bytes(&answer)?;
    let (confirm, result) = initiator.read_blinded_confirm(&answer)?;
    send(stream, &confirm.to_bytes()).await?;
    Ok(result)
}

/// Runs the responder side over an accepted stream. On failure the stream is shut down
/// and dropped.
pub async fn server_handshake<S>(
    mut stream: S,
    config: &SessionConfig,
) -> Result<SecureChannel<S>, SessionError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    config.validate()?;
    let mut responder = Responder::new(config.identity, config.password.clone());
    match run_responder(&mut stream, &mut responder).await {
        Ok(result) => {
            debug!(peer = %result.peer_identity, role = ?result.role, "handshake established");
            Ok(SecureChannel::new(stream, result, config.max_payload_len))
        }
        Err(e) => {
            debug!(stage = ?responder.stage(), error = %e, "responder handshake failed");
            let _ = stream.shutdown().await;
            Err(e)
        }
    }
}

async fn run_responder<S>(
    stream: &mut S,
    responder: &mut Responder,
) -> Result<HandshakeResult, SessionError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut hello = [0u8; CLIENT_HELLO_SIZE];
    stream.read_exact(&mut hello).await?;
    let hello = ClientHello::from_bytes(&hello)?;
    debug!(peer = %hello.identity, version = hello.version, "received client hello");

    // the reply goes out even on a version mismatch so the peer can see the status
    let reply = responder.read_client_hello(&hello)?;
    send(stream, &reply.to_bytes()).await?;
    if !reply.is_accepted() {
        Err(ProtocolError::VersionMismatch(hello.version))?
    }

    let mut blinded = [0u8; BLINDED_PUBLIC_SIZE];
    stream.read_exact(&mut blinded).await?;
    let answer = responder.read_blinded_public(&BlindedPublic::from_bytes(&blinded)?)?;
    send(stream, &answer.to_bytes()).await?;

    let mut confirm = [0u8; CONFIRM_SIZE];
    stream.read_exact(&mut confirm).await?;
    responder.read_confirm(&Confirm::from_bytes(&confirm)?)
}
