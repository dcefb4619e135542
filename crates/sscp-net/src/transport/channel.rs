use crate::{HandshakeResult, Identity, RecvCipher, SendCipher, SessionError, LENGTH_SIZE};
use std::fmt;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use tokio::io::{split, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, ReadHalf, WriteHalf};
use tracing::warn;
use zeroize::Zeroizing;

/// Set once by a failure in either direction and never cleared. Both directions, and
/// both halves after a split, hold the same flag.
#[derive(Clone, Default)]
struct Invalidation(Arc<AtomicBool>);

impl Invalidation {
    fn is_set(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    fn set(&self) {
        self.0.store(true, Ordering::Release);
    }
}

/// Inbound state: cipher, the plaintext of the last packet, and how much of it the
/// caller has already taken.
struct ReadState {
    cipher: RecvCipher,
    buffer: Zeroizing<Vec<u8>>,
    position: usize,
    invalidation: Invalidation,
    // still set if a read was dropped before its packet was fully consumed
    in_flight: bool,
}

impl ReadState {
    fn new(cipher: RecvCipher, invalidation: Invalidation) -> Self {
        Self {
            cipher,
            buffer: Zeroizing::new(Vec::new()),
            position: 0,
            invalidation,
            in_flight: false,
        }
    }

    fn is_invalidated(&self) -> bool {
        self.in_flight || self.invalidation.is_set()
    }

    async fn read<R: AsyncRead + Unpin>(
        &mut self,
        stream: &mut R,
        buf: &mut [u8],
    ) -> Result<usize, SessionError> {
        if self.in_flight {
            warn!("channel read was cancelled mid-packet, invalidating");
            self.invalidation.set();
        }
        if self.invalidation.is_set() {
            return Err(SessionError::Invalidated);
        }
        if buf.is_empty() {
            return Ok(0);
        }
        if self.position == self.buffer.len() {
            self.in_flight = true;
            let filled = self.fill(stream).await;
            self.in_flight = false;
            if let Err(e) = filled {
                self.invalidation.set();
                warn!(error = %e, "channel read failed, invalidating");
                return Err(e);
            }
        }

        let available = &self.buffer[self.position..];
        let n = available.len().min(buf.len());
        buf[..n].copy_from_slice(&available[..n]);
        self.position += n;
        Ok(n)
    }

    /// Pulls exactly one packet off the stream.
    async fn fill<R: AsyncRead + Unpin>(&mut self, stream: &mut R) -> Result<(), SessionError> {
        let mut length = [0u8; LENGTH_SIZE];
        stream.read_exact(&mut length).await?;
        let total = self.cipher.check_length(u32::from_be_bytes(length))?;

        let mut packet = Zeroizing::new(vec![0u8; total]);
        stream.read_exact(&mut packet).await?;
        self.buffer = self.cipher.open_packet(&mut packet)?;
        self.position = 0;
        Ok(())
    }
}

struct WriteState {
    cipher: SendCipher,
    max_payload_len: usize,
    invalidation: Invalidation,
    // still set if a write was dropped before its packet was fully flushed
    in_flight: bool,
}

impl WriteState {
    fn new(cipher: SendCipher, max_payload_len: usize, invalidation: Invalidation) -> Self {
        Self {
            cipher,
            max_payload_len,
            invalidation,
            in_flight: false,
        }
    }

    fn is_invalidated(&self) -> bool {
        self.in_flight || self.invalidation.is_set()
    }

    async fn write<W: AsyncWrite + Unpin>(
        &mut self,
        stream: &mut W,
        buf: &[u8],
    ) -> Result<usize, SessionError> {
        if self.in_flight {
            warn!("channel write was cancelled mid-packet, invalidating");
            self.invalidation.set();
        }
        if self.invalidation.is_set() {
            return Err(SessionError::Invalidated);
        }
        let n = buf.len().min(self.max_payload_len);
        self.in_flight = true;
        let sent = self.send(stream, &buf[..n]).await;
        self.in_flight = false;
        if let Err(e) = sent {
            self.invalidation.set();
            warn!(error = %e, "channel write failed, invalidating");
            return Err(e);
        }
        Ok(n)
    }

    async fn send<W: AsyncWrite + Unpin>(
        &mut self,
        stream: &mut W,
        payload: &[u8],
    ) -> Result<(), SessionError> {
        let packet = self.cipher.seal_packet(payload)?;
        stream.write_all(&packet).await?;
        stream.flush().await?;
        Ok(())
    }

    async fn write_all<W: AsyncWrite + Unpin>(
        &mut self,
        stream: &mut W,
        buf: &[u8],
    ) -> Result<(), SessionError> {
        let mut written = self.write(stream, buf).await?;
        while written < buf.len() {
            written += self.write(stream, &buf[written..]).await?;
        }
        Ok(())
    }
}

fn cipher_states(result: HandshakeResult, max_payload_len: usize) -> (ReadState, WriteState) {
    let send = SendCipher::new(
        result.encryption_key.clone(),
        result.authentication_key.clone(),
    );
    let recv = RecvCipher::new(
        result.encryption_key,
        result.authentication_key,
        max_payload_len,
    );
    let invalidation = Invalidation::default();
    (
        ReadState::new(recv, invalidation.clone()),
        WriteState::new(send, max_payload_len, invalidation),
    )
}

/// An established session over `S`. Only a completed handshake produces one.
///
/// Each `read` hands out bytes from at most one packet; each `write` sends exactly one
/// packet. Any failure in either direction invalidates the whole channel for good, and
/// every later `read` or `write` returns [`SessionError::Invalidated`].
///
/// `read` and `write` are not cancel safe. Dropping one of their futures before it
/// resolves, for example when a `tokio::time::timeout` fires, may leave a packet half
/// read or half written, so the channel is invalidated and must be discarded.
///
/// The channel does not implement `AsyncRead`/`AsyncWrite`. Those traits can only
/// report `io::Error`, which would fold cryptographic failures and invalidation into I/O
/// error kinds and lose [`SessionError::unsafe_reason`]. Pump data with `read` and
/// `write_all`, on split halves when both directions run at once.
pub struct SecureChannel<S> {
    stream: S,
    local_identity: Identity,
    peer_identity: Identity,
    reader: ReadState,
    writer: WriteState,
}

impl<S> SecureChannel<S> {
    pub(crate) fn new(stream: S, result: HandshakeResult, max_payload_len: usize) -> Self {
        let local_identity = result.local_identity;
        let peer_identity = result.peer_identity;
        let (reader, writer) = cipher_states(result, max_payload_len);
        Self {
            stream,
            local_identity,
            peer_identity,
            reader,
            writer,
        }
    }

    pub fn local_identity(&self) -> Identity {
        self.local_identity
    }

    /// The identity the peer claimed in its hello, authenticated by the handshake.
    pub fn peer_identity(&self) -> Identity {
        self.peer_identity
    }

    /// The raw stream, for addresses or socket options. Reading or writing it directly
    /// breaks the framing.
    pub fn get_ref(&self) -> &S {
        &self.stream
    }

    pub fn is_invalidated(&self) -> bool {
        self.reader.is_invalidated() || self.writer.is_invalidated()
    }
}

impl<S: AsyncRead + AsyncWrite + Unpin> SecureChannel<S> {
    /// Copies buffered plaintext into `buf`, pulling one new packet only once the previous
    /// one is fully drained. `Ok(0)` means an empty packet or an empty `buf`; a closed
    /// stream is an error. Cancelling the returned future invalidates the channel.
    pub async fn read(&mut self, buf: &mut [u8]) -> Result<usize, SessionError> {
        self.reader.read(&mut self.stream, buf).await
    }

    /// Sends up to `max_payload_len` bytes of `buf` as one packet and returns how many
    /// were sent. An empty `buf` sends an empty packet. Cancelling the returned future
    /// invalidates the channel.
    pub async fn write(&mut self, buf: &[u8]) -> Result<usize, SessionError> {
        self.writer.write(&mut self.stream, buf).await
    }

    pub async fn write_all(&mut self, buf: &[u8]) -> Result<(), SessionError> {
        self.writer.write_all(&mut self.stream, buf).await
    }

    pub async fn flush(&mut self) -> Result<(), SessionError> {
        Ok(self.stream.flush().await?)
    }

    /// Closes the write side of the raw stream. Keys are wiped when the channel drops.
    pub async fn shutdown(&mut self) -> Result<(), SessionError> {
        Ok(self.stream.shutdown().await?)
    }

    /// Splits into halves that may be driven from different tasks. A failure in either
    /// half invalidates both.
    pub fn into_split(self) -> (ChannelReader<ReadHalf<S>>, ChannelWriter<WriteHalf<S>>) {
        let (read, write) = split(self.stream);
        (
            ChannelReader {
                stream: read,
                peer_identity: self.peer_identity,
                state: self.reader,
            },
            ChannelWriter {
                stream: write,
                peer_identity: self.peer_identity,
                state: self.writer,
            },
        )
    }
}

impl<S> fmt::Debug for SecureChannel<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecureChannel")
            .field("local_identity", &self.local_identity)
            .field("peer_identity", &self.peer_identity)
            .field("invalidated", &self.is_invalidated())
            .finish_non_exhaustive()
    }
}

/// Receiving half of a split [`SecureChannel`].
pub struct ChannelReader<R> {
    stream: R,
    peer_identity: Identity,
    state: ReadState,
}

impl<R> ChannelReader<R> {
    pub fn peer_identity(&self) -> Identity {
        self.peer_identity
    }

    pub fn is_invalidated(&self) -> bool {
        self.state.is_invalidated()
    }
}

impl<R: AsyncRead + Unpin> ChannelReader<R> {
    pub async fn read(&mut self, buf: &mut [u8]) -> Result<usize, SessionError> {
        self.state.read(&mut self.stream, buf).await
    }
}

/// Sending half of a split [`SecureChannel`].
pub struct ChannelWriter<W> {
    stream: W,
    peer_identity: Identity,
    state: WriteState,
}

impl<W> ChannelWriter<W> {
    pub fn peer_identity(&self) -> Identity {
        self.peer_identity
    }

    pub fn is_invalidated(&self) -> bool {
        self.state.is_invalidated()
    }
}

impl<W: AsyncWrite + Unpin> ChannelWriter<W> {
    pub async fn write(&mut self, buf: &[u8]) -> Result<usize, SessionError> {
        self.state.write(&mut self.stream, buf).await
    }

    pub async fn write_all(&mut self, buf: &[u8]) -> Result<(), SessionError> {
        self.state.write_all(&mut self.stream, buf).await
    }

    pub async fn shutdown(&mut self) -> Result<(), SessionError> {
        Ok(self.stream.shutdown().await?)
    }
}
