use crate::{client_handshake, server_handshake, SecureChannel, SessionConfig, SessionError};
use std::net::SocketAddr;
use tokio::net::{TcpListener, TcpStream, ToSocketAddrs};
use tracing::{debug, warn};

/// Dials `addr` and runs the initiator handshake. The connection is closed if the
/// handshake fails.
pub async fn connect<A: ToSocketAddrs>(
    addr: A,
    config: &SessionConfig,
) -> Result<SecureChannel<TcpStream>, SessionError> {
    config.validate()?;
    let stream = TcpStream::connect(addr).await?;
    stream.set_nodelay(true)?;
    debug!(
        peer = %stream.peer_addr()?,
        identity = %config.identity,
        "connected, starting handshake"
    );
    client_handshake(stream, config).await
}

/// Accepts TCP connections and runs the responder handshake on each before handing it out.
pub struct Listener {
    listener: TcpListener,
    config: SessionConfig,
}

impl Listener {
    pub async fn bind<A: ToSocketAddrs>(
        addr: A,
        config: SessionConfig,
    ) -> Result<Self, SessionError> {
        let listener = TcpListener::bind(addr).await?;
        Self::from_tcp(listener, config)
    }

    /// Wraps a listener the caller already bound.
    pub fn from_tcp(listener: TcpListener, config: SessionConfig) -> Result<Self, SessionError> {
        config.validate()?;
        Ok(Self { listener, config })
    }

    pub fn local_addr(&self) -> Result<SocketAddr, SessionError> {
        Ok(self.listener.local_addr()?)
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Waits for the next connection and completes its handshake. A failed handshake
    /// closes that connection and returns its error; the listener stays usable.
    pub async fn accept(&self) -> Result<(SecureChannel<TcpStream>, SocketAddr), SessionError> {
        let (stream, addr) = self.accept_raw().await?;
        let channel = self.establish(stream).await.inspect_err(|e| {
            warn!(%addr, error = %e, "handshake failed, connection closed");
        })?;
        debug!(%addr, peer = %channel.peer_identity(), "accepted session");
        Ok((channel, addr))
    }

    /// Accepts a connection without running the handshake, so handshakes can be driven
    /// from separate tasks with [`Listener::establish`].
    pub async fn accept_raw(&self) -> Result<(TcpStream, SocketAddr), SessionError> {
        let (stream, addr) = self.listener.accept().await?;
        stream.set_nodelay(true)?;
        Ok((stream, addr))
    }

    pub async fn establish(
        &self,
        stream: TcpStream,
    ) -> Result<SecureChannel<TcpStream>, SessionError> {
        server_handshake(stream, &self.config).await
    }
}
