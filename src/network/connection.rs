//! Connection Handler
//!
//! Owns one TCP socket and exchanges one request for one reply at a time.

use std::fmt;
use std::io::{self, Read, Write};
use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::thread;
use std::time::{Duration, Instant};

use bytes::{Bytes, BytesMut};
use crossbeam::channel::{self, Receiver, RecvTimeoutError, TryRecvError};
use parking_lot::{Condvar, Mutex};

use crate::config::Config;
use crate::error::{KvError, Result};
use crate::protocol::frame_len;

/// Bytes requested from the socket per read
const READ_CHUNK: usize = 4096;

/// Lifecycle of a connection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Closed,
    /// Background handshake in flight
    Opening,
    Open,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionState::Closed => write!(f, "closed"),
            ConnectionState::Opening => write!(f, "opening"),
            ConnectionState::Open => write!(f, "open"),
        }
    }
}

/// Mutable connection state, guarded as one unit
struct Inner {
    state: ConnectionState,
    stream: Option<TcpStream>,

    /// Single-slot reply buffer, reset before every request
    reply: BytesMut,

    /// Completion of a background connect
    pending: Option<Receiver<io::Result<TcpStream>>>,
}

impl Inner {
    fn close(&mut self) {
        if let Some(stream) = self.stream.take() {
            let _ = stream.shutdown(std::net::Shutdown::Both);
        }
        self.pending = None;
        self.reply.clear();
        self.state = ConnectionState::Closed;
    }
}

/// A single connection to the store
///
/// `send_and_await_reply` holds an internal lock for the whole exchange, so a
/// shared `Connection` never interleaves two requests.
pub struct Connection {
    inner: Mutex<Inner>,

    /// Signalled whenever a background connect settles or is put back
    handshake: Condvar,

    /// Target address for logging
    peer_addr: String,

    /// Default wait for a reply
    response_timeout: Duration,

    nodelay: bool,
}

impl Connection {
    /// Open a connection to `host:port` with default settings
    ///
    /// With `blocking` the handshake completes before returning and the
    /// connection is Open. Otherwise it returns at once in the Opening state;
    /// see [`Connection::poll_open`] and [`Connection::wait_open`].
    pub fn connect(host: &str, port: u16, blocking: bool) -> Result<Self> {
        let config = Config::builder()
            .host(host)
            .port(port)
            .blocking_connect(blocking)
            .build();
        Self::with_config(&config)
    }

    /// Open a connection described by `config`
    pub fn with_config(config: &Config) -> Result<Self> {
        if config.host.is_empty() {
            return Err(KvError::Config("host must not be empty".to_string()));
        }

        let peer_addr = config.addr();
        let mut conn = Self {
            inner: Mutex::new(Inner {
                state: ConnectionState::Closed,
                stream: None,
                reply: BytesMut::with_capacity(READ_CHUNK),
                pending: None,
            }),
            handshake: Condvar::new(),
            peer_addr,
            response_timeout: config.response_timeout,
            nodelay: config.nodelay,
        };

        if config.blocking_connect {
            conn.inner.get_mut().state = ConnectionState::Opening;
            match open_stream(&conn.peer_addr, config.connect_timeout) {
                Ok(stream) => {
                    let inner = conn.inner.get_mut();
                    attach(inner, stream, conn.nodelay, &conn.peer_addr)?;
                }
                Err(e) => {
                    tracing::debug!("Connect to {} failed: {}", conn.peer_addr, e);
                    return Err(KvError::Connection(e));
                }
            }
        } else {
            let (tx, rx) = channel::bounded(1);
            let addr = conn.peer_addr.clone();
            let connect_timeout = config.connect_timeout;
            thread::Builder::new()
                .name("kvlink-connect".to_string())
                .spawn(move || {
                    // The receiver may be gone if the caller disconnected first
                    let _ = tx.send(open_stream(&addr, connect_timeout));
                })
                .map_err(KvError::Connection)?;

            let inner = conn.inner.get_mut();
            inner.pending = Some(rx);
            inner.state = ConnectionState::Opening;
            tracing::debug!("Background connect to {} started", conn.peer_addr);
        }

        Ok(conn)
    }

    /// Current connection state
    pub fn state(&self) -> ConnectionState {
        self.inner.lock().state
    }

    pub fn is_open(&self) -> bool {
        self.state() == ConnectionState::Open
    }

    /// Target address string
    pub fn peer_addr(&self) -> &str {
        &self.peer_addr
    }

    pub fn response_timeout(&self) -> Duration {
        self.response_timeout
    }

    pub fn set_response_timeout(&mut self, timeout: Duration) {
        self.response_timeout = timeout;
    }

    /// Check a background connect without blocking
    ///
    /// Performs Opening → Open once the handshake has finished, or
    /// Opening → Closed (returning `KvError::Connection`) if it failed.
    pub fn poll_open(&self) -> Result<ConnectionState> {
        let mut inner = self.inner.lock();
        if inner.state != ConnectionState::Opening {
            return Ok(inner.state);
        }

        let outcome = match inner.pending.as_ref() {
            Some(rx) => rx.try_recv(),
            // wait_open on another thread holds the receiver
            None => return Ok(ConnectionState::Opening),
        };
        match outcome {
            Ok(result) => {
                let opened = self.complete_open(&mut inner, result);
                self.handshake.notify_all();
                opened?;
            }
            Err(TryRecvError::Empty) => {}
            Err(TryRecvError::Disconnected) => {
                inner.close();
                self.handshake.notify_all();
                return Err(abandoned());
            }
        }
        Ok(inner.state)
    }

    /// Block until a background connect finishes or `timeout` elapses
    ///
    /// On timeout the connection stays Opening. The lock is released while
    /// waiting, so `state` and `disconnect` stay responsive on other threads.
    pub fn wait_open(&self, timeout: Duration) -> Result<()> {
        let deadline = Instant::now() + timeout;
        let mut inner = self.inner.lock();
        let rx = loop {
            match inner.state {
                ConnectionState::Open => return Ok(()),
                ConnectionState::Closed => return Err(KvError::NotConnected),
                ConnectionState::Opening => {}
            }
            if let Some(rx) = inner.pending.take() {
                break rx;
            }
            // Another waiter owns the receiver until it settles
            if self.handshake.wait_until(&mut inner, deadline).timed_out()
                && inner.state == ConnectionState::Opening
            {
                return Err(KvError::Timeout(timeout));
            }
        };
        drop(inner);

        let outcome = rx.recv_timeout(deadline.saturating_duration_since(Instant::now()));

        let mut inner = self.inner.lock();
        let result = if inner.state != ConnectionState::Opening {
            // Disconnected while waiting
            Err(KvError::NotConnected)
        } else {
            match outcome {
                Ok(result) => self.complete_open(&mut inner, result),
                Err(RecvTimeoutError::Timeout) => {
                    inner.pending = Some(rx);
                    Err(KvError::Timeout(timeout))
                }
                Err(RecvTimeoutError::Disconnected) => {
                    inner.close();
                    Err(abandoned())
                }
            }
        };
        self.handshake.notify_all();
        result
    }

    fn complete_open(&self, inner: &mut Inner, result: io::Result<TcpStream>) -> Result<()> {
        inner.pending = None;
        match result {
            Ok(stream) => attach(inner, stream, self.nodelay, &self.peer_addr),
            Err(e) => {
                tracing::debug!("Background connect to {} failed: {}", self.peer_addr, e);
                inner.close();
                Err(KvError::Connection(e))
            }
        }
    }

    /// Close the socket. Calling it on a closed connection does nothing.
    pub fn disconnect(&self) {
        let mut inner = self.inner.lock();
        if inner.state != ConnectionState::Closed {
            tracing::debug!("Disconnecting from {}", self.peer_addr);
        }
        inner.close();
        self.handshake.notify_all();
    }

    /// Send `request` and wait for one complete reply using the default timeout
    pub fn send(&self, request: &[u8]) -> Result<Bytes> {
        self.send_and_await_reply(request, self.response_timeout)
    }

    /// Send `request` and block until one complete reply frame arrives
    ///
    /// Fails with `NotConnected` (and writes nothing) unless the connection
    /// is Open. `timeout` bounds the write and the read together. A reply
    /// that misses the deadline yields `Timeout` and leaves the connection
    /// Open; its late bytes are discarded before the next request. A write
    /// that misses the deadline yields `Timeout` and closes the connection,
    /// since part of the request may already be on the wire. Any other
    /// socket failure closes it and surfaces as `KvError::Io`.
    pub fn send_and_await_reply(&self, request: &[u8], timeout: Duration) -> Result<Bytes> {
        let mut guard = self.inner.lock();
        let inner = &mut *guard;
        if inner.state != ConnectionState::Open {
            return Err(KvError::NotConnected);
        }
        inner.reply.clear();

        let Some(stream) = inner.stream.as_mut() else {
            return Err(KvError::NotConnected);
        };
        let deadline = Instant::now() + timeout;

        let sent = match discard_stale(stream) {
            Ok(stale) => {
                if stale > 0 {
                    tracing::debug!("Discarded {} stale bytes from {}", stale, self.peer_addr);
                }
                write_request(stream, request, deadline, timeout)
            }
            Err(e) => Err(e),
        };
        if let Err(e) = sent {
            tracing::warn!("Closing connection to {}: {}", self.peer_addr, e);
            inner.close();
            return Err(e);
        }

        match read_reply(stream, &mut inner.reply, deadline, timeout) {
            Ok(len) => {
                tracing::trace!("Received {} byte reply from {}", len, self.peer_addr);
                let frame = inner.reply.split_to(len).freeze();
                inner.reply.clear();
                Ok(frame)
            }
            Err(KvError::Io(e)) => {
                tracing::warn!("Closing connection to {}: {}", self.peer_addr, e);
                inner.close();
                Err(KvError::Io(e))
            }
            Err(KvError::Timeout(t)) => {
                tracing::debug!("No reply from {} within {:?}", self.peer_addr, t);
                Err(KvError::Timeout(t))
            }
            Err(e) => Err(e),
        }
    }
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("peer_addr", &self.peer_addr)
            .field("state", &self.state())
            .field("response_timeout", &self.response_timeout)
            .finish()
    }
}

/// Configure a freshly connected stream and mark the connection Open
fn attach(inner: &mut Inner, stream: TcpStream, nodelay: bool, peer_addr: &str) -> Result<()> {
    if let Err(e) = stream.set_nodelay(nodelay) {
        inner.close();
        return Err(KvError::Connection(e));
    }
    inner.stream = Some(stream);
    inner.state = ConnectionState::Open;
    tracing::debug!("Connected to {}", peer_addr);
    Ok(())
}

fn open_stream(addr: &str, connect_timeout: Option<Duration>) -> io::Result<TcpStream> {
    let Some(timeout) = connect_timeout else {
        return TcpStream::connect(addr);
    };

    let addrs: Vec<SocketAddr> = addr.to_socket_addrs()?.collect();
    let mut last_err = None;
    for candidate in &addrs {
        match TcpStream::connect_timeout(candidate, timeout) {
            Ok(stream) => return Ok(stream),
            Err(e) => last_err = Some(e),
        }
    }
    Err(last_err.unwrap_or_else(|| {
        io::Error::new(io::ErrorKind::InvalidInput, "address resolved to nothing")
    }))
}

fn abandoned() -> KvError {
    KvError::Connection(io::Error::new(
        io::ErrorKind::Other,
        "background connect abandoned",
    ))
}

fn peer_closed() -> KvError {
    KvError::Io(io::Error::new(
        io::ErrorKind::UnexpectedEof,
        "connection closed by peer",
    ))
}

/// Read timeouts surface as WouldBlock on Unix and TimedOut on Windows
fn is_timeout(kind: io::ErrorKind) -> bool {
    matches!(kind, io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut)
}

/// Drop whatever the peer sent since the last exchange finished
///
/// Returns the number of bytes thrown away.
fn discard_stale(stream: &mut TcpStream) -> Result<usize> {
    stream.set_nonblocking(true)?;
    let drained = drain_readable(stream);
    stream.set_nonblocking(false)?;
    drained
}

fn drain_readable(stream: &mut TcpStream) -> Result<usize> {
    let mut chunk = [0u8; READ_CHUNK];
    let mut total = 0;
    loop {
        match stream.read(&mut chunk) {
            Ok(0) => return Err(peer_closed()),
            Ok(n) => total += n,
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => return Ok(total),
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        }
    }
}

/// Write all of `request` before `deadline`
fn write_request(
    stream: &mut TcpStream,
    request: &[u8],
    deadline: Instant,
    timeout: Duration,
) -> Result<()> {
    let mut written = 0;
    while written < request.len() {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            return Err(KvError::Timeout(timeout));
        }
        stream.set_write_timeout(Some(remaining))?;

        match stream.write(&request[written..]) {
            Ok(0) => {
                return Err(KvError::Io(io::Error::new(
                    io::ErrorKind::WriteZero,
                    "socket accepted no bytes",
                )))
            }
            Ok(n) => written += n,
            Err(e) if is_timeout(e.kind()) => return Err(KvError::Timeout(timeout)),
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        }
    }
    stream.flush()?;
    tracing::trace!("Sent {} bytes", request.len());
    Ok(())
}

/// Accumulate bytes until `buf` holds a full frame or `deadline` passes
///
/// Returns the frame length. Bytes past the first frame are left in `buf`.
fn read_reply(
    stream: &mut TcpStream,
    buf: &mut BytesMut,
    deadline: Instant,
    timeout: Duration,
) -> Result<usize> {
    let mut chunk = [0u8; READ_CHUNK];
    loop {
        if let Some(len) = frame_len(&buf[..])? {
            return Ok(len);
        }

        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            return Err(KvError::Timeout(timeout));
        }
        stream.set_read_timeout(Some(remaining))?;

        match stream.read(&mut chunk) {
            Ok(0) => return Err(peer_closed()),
            Ok(n) => buf.extend_from_slice(&chunk[..n]),
            Err(e) if is_timeout(e.kind()) => return Err(KvError::Timeout(timeout)),
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        }
    }
}
