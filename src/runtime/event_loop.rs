//! mio event loop implementation.
//!
//! Readiness-based model: poll tells us when sockets are ready, then we
//! perform non-blocking read/write syscalls. Uses epoll on Linux, kqueue
//! on macOS.
//!
//! Each worker owns one poll instance, one listener (kernel-balanced via
//! `SO_REUSEPORT`), and a slab of sessions. A session moves through
//! `AwaitingRequest -> Responding -> Draining -> Closed`; the drain
//! notification is writable readiness, observed until the queued-but-unsent
//! byte count reaches zero, at which point the connection is torn down.

use crate::config::Config;
use crate::hexdump;
use crate::protocol::framer::{self, FrameResult};
use crate::protocol::response::ResponseOutcome;
use crate::runtime::{Phase, Session};
use mio::net::TcpListener;
use mio::{Events, Interest, Poll, Token};
use slab::Slab;
use std::io::{self, Read};
use std::net::SocketAddr;
use std::thread;
use tracing::{debug, error, info, warn};

const LISTENER_TOKEN: Token = Token(usize::MAX);
const EVENTS_CAPACITY: usize = 1024;
const READ_CHUNK: usize = 4096;

/// Run the server: one event loop per worker thread.
pub fn run(config: Config) -> io::Result<()> {
    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;

    let num_workers = config.workers.max(1);

    info!(
        workers = num_workers,
        addr = %addr,
        "Starting reactor runtime"
    );

    let mut handles = Vec::with_capacity(num_workers);

    for worker_id in 0..num_workers {
        let config = config.clone();
        let listener = create_listener_with_reuseport(addr)?;

        let handle = thread::Builder::new()
            .name(format!("worker-{worker_id}"))
            .spawn(move || {
                if let Err(e) = worker_loop(worker_id, listener, &config) {
                    error!(worker = worker_id, error = %e, "Worker failed");
                }
            })?;

        handles.push(handle);
    }

    // Wait for all workers
    for handle in handles {
        let _ = handle.join();
    }

    Ok(())
}

/// Single worker: accept connections and drive sessions to completion.
///
/// A listener-level failure (poll or registration) propagates out and
/// terminates the loop; per-session errors only tear down that session.
fn worker_loop(worker_id: usize, listener: std::net::TcpListener, config: &Config) -> io::Result<()> {
    let mut poll = Poll::new()?;
    let mut events = Events::with_capacity(EVENTS_CAPACITY);

    let mut listener = TcpListener::from_std(listener);
    poll.registry()
        .register(&mut listener, LISTENER_TOKEN, Interest::READABLE)?;

    let mut sessions: Slab<Session> = Slab::with_capacity(config.max_connections);

    info!(
        worker = worker_id,
        root = %config.root.display(),
        listing_file = %config.listing_file,
        "Worker started"
    );

    loop {
        poll.poll(&mut events, None)?;

        for event in events.iter() {
            match event.token() {
                LISTENER_TOKEN => {
                    accept_connections(
                        &listener,
                        &mut poll,
                        &mut sessions,
                        config.max_connections,
                        worker_id,
                    )?;
                }
                Token(conn_id) => {
                    if let Err(e) =
                        handle_session_event(conn_id, event, &mut poll, &mut sessions, config)
                    {
                        debug!(conn_id, error = %e, "Connection error");
                        close_session(&mut poll, &mut sessions, conn_id);
                    }
                }
            }
        }
    }
}

fn accept_connections(
    listener: &TcpListener,
    poll: &mut Poll,
    sessions: &mut Slab<Session>,
    max_connections: usize,
    worker_id: usize,
) -> io::Result<()> {
    loop {
        match listener.accept() {
            Ok((stream, peer)) => {
                if sessions.len() >= max_connections {
                    warn!("Connection limit reached");
                    continue;
                }

                let conn_id = sessions.insert(Session::new(stream, peer));

                // Re-borrow after insert
                let session = &mut sessions[conn_id];
                poll.registry()
                    .register(&mut session.stream, Token(conn_id), Interest::READABLE)?;

                debug!(
                    worker = worker_id,
                    conn_id,
                    peer = %peer,
                    "Accepted connection"
                );
            }
            Err(ref e) if e.kind() == io::ErrorKind::WouldBlock => break,
            Err(e) => {
                error!("Accept error: {}", e);
                break;
            }
        }
    }
    Ok(())
}

fn handle_session_event(
    conn_id: usize,
    event: &mio::event::Event,
    poll: &mut Poll,
    sessions: &mut Slab<Session>,
    config: &Config,
) -> io::Result<()> {
    if !sessions.contains(conn_id) {
        return Ok(());
    }

    // A transport error notification forces immediate teardown, bypassing
    // drain; the peer is presumed gone.
    if event.is_error() {
        return Err(io::Error::new(
            io::ErrorKind::ConnectionReset,
            "transport error",
        ));
    }

    if event.is_readable() {
        handle_readable(conn_id, poll, sessions, config)?;
    }

    // Re-check session exists (may have been removed)
    if !sessions.contains(conn_id) {
        return Ok(());
    }

    if event.is_writable() {
        handle_writable(conn_id, poll, sessions)?;
    }

    Ok(())
}

fn handle_readable(
    conn_id: usize,
    poll: &mut Poll,
    sessions: &mut Slab<Session>,
    config: &Config,
) -> io::Result<()> {
    let line = {
        let session = sessions
            .get_mut(conn_id)
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "session not found"))?;

        if session.phase != Phase::AwaitingRequest {
            return Ok(());
        }

        // Pull everything the kernel has before framing, so bytes past the
        // framed line are consumed rather than left to reset the peer on
        // close.
        let mut eof = false;
        let mut chunk = [0u8; READ_CHUNK];
        loop {
            match session.stream.read(&mut chunk) {
                Ok(0) => {
                    eof = true;
                    break;
                }
                Ok(n) => session.input.extend_from_slice(&chunk[..n]),
                Err(ref e) if e.kind() == io::ErrorKind::WouldBlock => break,
                Err(ref e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }

        match framer::frame(&mut session.input, config.max_selector_len) {
            FrameResult::Complete(line) => line,
            FrameResult::Incomplete => {
                if eof {
                    return Err(io::Error::new(
                        io::ErrorKind::ConnectionReset,
                        "EOF before request line",
                    ));
                }
                return Ok(());
            }
        }
    };

    if config.hexdump {
        for row in hexdump::format_bytes(&line.bytes, 0).lines() {
            debug!(conn_id, "{row}");
        }
    }

    // Resolution and filesystem access run synchronously here and block the
    // loop for their duration.
    let outcome = crate::protocol::process(&line, &config.root, &config.listing_file);
    match &outcome {
        ResponseOutcome::Payload(bytes) => debug!(conn_id, len = bytes.len(), "Payload queued"),
        ResponseOutcome::Error(_) => debug!(conn_id, "Error item queued"),
    }

    // Re-borrow after protocol processing
    let session = sessions
        .get_mut(conn_id)
        .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "session not found"))?;

    session.queue_response(&outcome.into_bytes());

    // Framing read interest is dropped here: writable readiness doubles as
    // the drain notification from now on.
    poll.registry()
        .reregister(&mut session.stream, Token(conn_id), Interest::WRITABLE)?;
    session.begin_drain();

    Ok(())
}

fn handle_writable(
    conn_id: usize,
    poll: &mut Poll,
    sessions: &mut Slab<Session>,
) -> io::Result<()> {
    let session = sessions
        .get_mut(conn_id)
        .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "session not found"))?;

    if session.phase != Phase::Draining {
        return Ok(());
    }

    while !session.is_drained() {
        match session.flush_pending() {
            Ok(0) => {
                return Err(io::Error::new(io::ErrorKind::WriteZero, "write returned 0"));
            }
            Ok(_) => {}
            Err(ref e) if e.kind() == io::ErrorKind::WouldBlock => {
                debug!(conn_id, pending = session.pending().len(), "Drain blocked");
                return Ok(());
            }
            Err(ref e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }

    // Low-water mark reached: the full response is out, tear down.
    debug!(conn_id, "Response drained");
    close_session(poll, sessions, conn_id);

    Ok(())
}

fn close_session(poll: &mut Poll, sessions: &mut Slab<Session>, conn_id: usize) {
    if let Some(mut session) = sessions.try_remove(conn_id) {
        session.close();
        let _ = poll.registry().deregister(&mut session.stream);
        debug!(conn_id, peer = %session.peer, "Connection closed");
    }
}

/// Create a TCP listener with SO_REUSEPORT for kernel load balancing.
fn create_listener_with_reuseport(addr: SocketAddr) -> io::Result<std::net::TcpListener> {
    let socket = socket2::Socket::new(
        match addr {
            SocketAddr::V4(_) => socket2::Domain::IPV4,
            SocketAddr::V6(_) => socket2::Domain::IPV6,
        },
        socket2::Type::STREAM,
        Some(socket2::Protocol::TCP),
    )?;

    socket.set_reuse_port(true)?;
    socket.set_reuse_address(true)?;
    socket.set_nonblocking(true)?;
    socket.bind(&addr.into())?;
    socket.listen(1024)?;

    Ok(socket.into())
}
