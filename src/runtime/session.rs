//! Connection session state machine.
//!
//! Each accepted socket gets one `Session` that carries it through its
//! lifecycle: accumulate request bytes, queue exactly one response, drain
//! it, close. The write-then-close sequencing lives in the `Phase` enum and
//! state-conditioned dispatch in the event loop; no callback swapping.

use bytes::BytesMut;
use mio::net::TcpStream;
use std::io::{self, Write};
use std::net::SocketAddr;

/// Lifecycle phase of a session.
///
/// Transitions run strictly forward; a transport error in any non-terminal
/// phase jumps straight to `Closed`, bypassing drain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Accumulating peer bytes until a request line frames.
    AwaitingRequest,
    /// Response queued; drain interest not yet registered.
    Responding,
    /// Waiting for queued-but-unsent bytes to reach zero.
    Draining,
    /// Transport handle released; session eligible for reclamation.
    Closed,
}

/// A single client connection.
///
/// Owned by exactly one worker's event loop; never shared across threads.
/// At most one request is processed per session.
pub struct Session {
    /// The underlying transport, exclusively owned; dropped once on close.
    pub stream: TcpStream,
    /// Peer address, for logging.
    pub peer: SocketAddr,
    /// Current lifecycle phase.
    pub phase: Phase,
    /// Bytes received but not yet framed into a request line.
    pub input: BytesMut,
    /// Bytes queued for the peer.
    output: BytesMut,
    /// Prefix of `output` already acknowledged as sent.
    written: usize,
}

impl Session {
    /// Create a session in the initial awaiting-request phase.
    pub fn new(stream: TcpStream, peer: SocketAddr) -> Self {
        Self {
            stream,
            peer,
            phase: Phase::AwaitingRequest,
            input: BytesMut::with_capacity(512),
            output: BytesMut::new(),
            written: 0,
        }
    }

    /// Queue the response and transition to `Responding`.
    ///
    /// Remaining input bytes are dropped: the protocol is one request per
    /// connection, so nothing after the framed line is ever read.
    pub fn queue_response(&mut self, bytes: &[u8]) {
        debug_assert_eq!(self.phase, Phase::AwaitingRequest);
        self.input.clear();
        self.output.extend_from_slice(bytes);
        self.phase = Phase::Responding;
    }

    /// Drain interest has been registered; transition to `Draining`.
    pub fn begin_drain(&mut self) {
        debug_assert_eq!(self.phase, Phase::Responding);
        self.phase = Phase::Draining;
    }

    /// Unsent remainder of the queued response.
    pub fn pending(&self) -> &[u8] {
        &self.output[self.written..]
    }

    /// Write as much of the pending response as the socket accepts.
    ///
    /// Returns the number of bytes written; errors (including `WouldBlock`)
    /// are propagated for the event loop to interpret.
    pub fn flush_pending(&mut self) -> io::Result<usize> {
        let n = self.stream.write(&self.output[self.written..])?;
        self.written += n;
        Ok(n)
    }

    /// Low-water mark: queued-but-unsent bytes have reached zero.
    pub fn is_drained(&self) -> bool {
        self.written >= self.output.len()
    }

    /// Mark the session closed.
    pub fn close(&mut self) {
        self.phase = Phase::Closed;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Build a connected (mio server side, std client side) stream pair.
    fn stream_pair() -> (TcpStream, SocketAddr, std::net::TcpStream) {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let client = std::net::TcpStream::connect(addr).unwrap();
        let (server, peer) = listener.accept().unwrap();
        server.set_nonblocking(true).unwrap();
        (TcpStream::from_std(server), peer, client)
    }

    #[test]
    fn test_phase_transitions() {
        let (stream, peer, _client) = stream_pair();
        let mut session = Session::new(stream, peer);

        assert_eq!(session.phase, Phase::AwaitingRequest);

        session.queue_response(b"payload");
        assert_eq!(session.phase, Phase::Responding);

        session.begin_drain();
        assert_eq!(session.phase, Phase::Draining);

        session.close();
        assert_eq!(session.phase, Phase::Closed);
    }

    #[test]
    fn test_queue_response_discards_input() {
        let (stream, peer, _client) = stream_pair();
        let mut session = Session::new(stream, peer);

        session.input.extend_from_slice(b"trailing bytes after the line");
        session.queue_response(b"response");

        assert!(session.input.is_empty());
        assert_eq!(session.pending(), b"response");
    }

    #[test]
    fn test_flush_pending_delivers_bytes() {
        use std::io::Read;

        let (stream, peer, mut client) = stream_pair();
        let mut session = Session::new(stream, peer);

        session.queue_response(b"menu bytes\r\n");
        assert_eq!(session.pending(), b"menu bytes\r\n");
        assert!(!session.is_drained());

        while !session.is_drained() {
            match session.flush_pending() {
                Ok(_) => {}
                Err(ref e) if e.kind() == io::ErrorKind::WouldBlock => continue,
                Err(e) => panic!("flush failed: {e}"),
            }
        }
        assert!(session.pending().is_empty());

        let mut received = [0u8; 12];
        client
            .set_read_timeout(Some(std::time::Duration::from_secs(5)))
            .unwrap();
        client.read_exact(&mut received).unwrap();
        assert_eq!(&received, b"menu bytes\r\n");
    }

    #[test]
    fn test_empty_response_is_immediately_drained() {
        let (stream, peer, _client) = stream_pair();
        let mut session = Session::new(stream, peer);

        session.queue_response(b"");
        assert!(session.is_drained());
    }
}
