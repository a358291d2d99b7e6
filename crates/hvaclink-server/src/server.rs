use std::collections::{HashMap, HashSet};
use std::io::ErrorKind;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use hvaclink_frame::FrameAssembler;
use hvaclink_transport::{Connection, Listener, ReadOutcome};
use mio::event::Event;
use mio::{Events, Interest, Poll, Token, Waker};
use tracing::{debug, error, info, trace, warn};

use crate::config::ServerConfig;
use crate::dispatch::{ConnectionSink, DispatchQueue};
use crate::error::{Result, ServerError};
use crate::processor::CommandProcessor;
use crate::status::ServerStatus;

const LISTENER: Token = Token(0);
const WAKER: Token = Token(1);
const FIRST_SESSION: usize = 2;

/// One open client session: its socket plus its framing state.
struct Session {
    conn: Connection,
    assembler: FrameAssembler,
    /// Reads are paused until pending response bytes drain.
    throttled: bool,
}

/// Where a bounded read pass left a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ReadState {
    /// The socket reported `WouldBlock`.
    Drained,
    /// The per-cycle read budget ran out with input possibly still queued.
    Budget,
    /// Too many unsent response bytes; reads wait for a writable event.
    Throttled,
    /// The session must close.
    Closed,
}

struct Shutdown {
    requested: AtomicBool,
    waker: Waker,
}

/// Stops a running [`Server`] from another thread.
#[derive(Clone)]
pub struct ServerHandle {
    shutdown: Arc<Shutdown>,
}

impl ServerHandle {
    /// Ask the server loop to return after the current readiness cycle.
    pub fn stop(&self) {
        self.shutdown.requested.store(true, Ordering::SeqCst);
        if let Err(err) = self.shutdown.waker.wake() {
            warn!(error = %err, "failed to wake server loop");
        }
    }
}

impl std::fmt::Debug for ServerHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerHandle")
            .field("stop_requested", &self.shutdown.requested.load(Ordering::SeqCst))
            .finish()
    }
}

/// Single-threaded connection multiplexer.
///
/// Owns the listening socket and every session socket, waits for readiness
/// on all of them at once, and runs accept, read, framing, dispatch and
/// response writes for each wake-up before waiting again.
pub struct Server<P> {
    config: ServerConfig,
    processor: P,
    poll: Poll,
    listener: Listener,
    sessions: HashMap<Token, Session>,
    /// Sessions whose last read pass ended on the budget. Readiness is
    /// edge-triggered, so these are read again without a new event.
    backlog: HashSet<Token>,
    queue: DispatchQueue,
    next_token: usize,
    status: ServerStatus,
    shutdown: Arc<Shutdown>,
}

impl<P: CommandProcessor> Server<P> {
    /// Validate the configured host and port, resolve the host, and bind.
    pub fn bind(config: ServerConfig, processor: P) -> Result<Self> {
        let endpoint = config.endpoint()?;
        let listener = Listener::bind(&endpoint)?;
        Self::with_listener(config, listener, processor)
    }

    /// Serve on a listener bound elsewhere. The configured host and port are
    /// not used.
    pub fn from_listener(
        listener: std::net::TcpListener,
        config: ServerConfig,
        processor: P,
    ) -> Result<Self> {
        let listener = Listener::from_std(listener)?;
        Self::with_listener(config, listener, processor)
    }

    fn with_listener(config: ServerConfig, mut listener: Listener, processor: P) -> Result<Self> {
        let poll = Poll::new()?;
        poll.registry()
            .register(listener.source_mut(), LISTENER, Interest::READABLE)?;
        let waker = Waker::new(poll.registry(), WAKER)?;

        Ok(Self {
            config,
            processor,
            poll,
            listener,
            sessions: HashMap::new(),
            backlog: HashSet::new(),
            queue: DispatchQueue::new(),
            next_token: FIRST_SESSION,
            status: ServerStatus::Undefined,
            shutdown: Arc::new(Shutdown {
                requested: AtomicBool::new(false),
                waker,
            }),
        })
    }

    /// Address the listener is bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.listener.local_addr()
    }

    /// A handle that can stop [`Server::run`] from another thread.
    pub fn handle(&self) -> ServerHandle {
        ServerHandle {
            shutdown: Arc::clone(&self.shutdown),
        }
    }

    pub fn status(&self) -> ServerStatus {
        self.status
    }

    /// Number of open client sessions.
    pub fn connection_count(&self) -> usize {
        self.sessions.len()
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Run the readiness loop.
    ///
    /// Returns `Ok(())` only after [`ServerHandle::stop`]. A failing poll is
    /// fatal; errors on a single connection only close that connection.
    pub fn run(&mut self) -> Result<()> {
        self.status = ServerStatus::ExitSuccess;
        info!(
            local_addr = %self.local_addr(),
            write_policy = %self.config.write_policy,
            reassembly = %self.config.frame.reassembly,
            "server loop started"
        );

        let mut events = Events::with_capacity(self.config.events_capacity.max(1));
        let mut buf = vec![0u8; self.config.read_buffer_size.max(1)];

        let mut serviced = HashSet::new();

        loop {
            let timeout = if self.backlog.is_empty() {
                None
            } else {
                Some(Duration::ZERO)
            };
            if let Err(err) = self.poll.poll(&mut events, timeout) {
                if err.kind() == ErrorKind::Interrupted {
                    continue;
                }
                error!(error = %err, "readiness poll failed");
                self.status = ServerStatus::ExitFailure;
                return Err(ServerError::Poll(err));
            }

            serviced.clear();
            for event in events.iter() {
                match event.token() {
                    LISTENER => self.accept_pending(),
                    WAKER => {}
                    token => {
                        serviced.insert(token);
                        self.service(token, event, &mut buf);
                    }
                }
            }

            let carried: Vec<Token> = self
                .backlog
                .iter()
                .filter(|token| !serviced.contains(*token))
                .copied()
                .collect();
            for token in carried {
                self.read_ready(token, &mut buf);
            }

            if self.shutdown.requested.load(Ordering::SeqCst) {
                break;
            }
        }

        info!(sessions = self.sessions.len(), "server loop stopping");
        let tokens: Vec<Token> = self.sessions.keys().copied().collect();
        for token in tokens {
            self.close_session(token);
        }
        self.status = ServerStatus::ExitSuccess;
        Ok(())
    }

    fn accept_pending(&mut self) {
        loop {
            let mut conn = match self.listener.accept() {
                Ok(Some(conn)) => conn,
                Ok(None) => return,
                Err(err) => {
                    warn!(error = %err, "accept failed");
                    return;
                }
            };
            let peer = conn.peer_addr();

            if let Some(max) = self.config.max_connections {
                if self.sessions.len() >= max {
                    warn!(%peer, max, "connection limit reached, refusing connection");
                    conn.shutdown();
                    continue;
                }
            }

            let token = Token(self.next_token);
            self.next_token += 1;
            if let Err(err) = self.poll.registry().register(
                conn.source_mut(),
                token,
                Interest::READABLE | Interest::WRITABLE,
            ) {
                warn!(%peer, error = %err, "failed to register connection");
                continue;
            }

            info!(%peer, local_addr = %self.listener.local_addr(), "connection accepted");
            self.sessions.insert(
                token,
                Session {
                    conn,
                    assembler: FrameAssembler::new(self.config.frame.clone()),
                    throttled: false,
                },
            );
        }
    }

    fn service(&mut self, token: Token, event: &Event, buf: &mut [u8]) {
        let Some(session) = self.sessions.get_mut(&token) else {
            trace!(?token, "event for closed session");
            return;
        };
        let peer = session.conn.peer_addr();

        if event.is_error() {
            warn!(%peer, "socket error reported, closing connection");
            self.close_session(token);
            return;
        }

        let mut resumed = false;
        if event.is_writable() {
            session.conn.set_writable(true);
            match session.conn.flush_pending() {
                Ok(0) => {}
                Ok(n) => trace!(%peer, bytes = n, "flushed pending response bytes"),
                Err(err) => {
                    warn!(%peer, error = %err, "write failed, closing connection");
                    self.close_session(token);
                    return;
                }
            }
            if session.throttled && !pending_full(&session.conn, &self.config) {
                debug!(%peer, pending = session.conn.pending_len(), "resuming reads");
                session.throttled = false;
                resumed = true;
            }
        }

        if resumed || event.is_readable() || event.is_read_closed() {
            self.read_ready(token, buf);
        }
    }

    /// Run one bounded read pass on a session and record where it stopped.
    fn read_ready(&mut self, token: Token, buf: &mut [u8]) {
        let Some(session) = self.sessions.get_mut(&token) else {
            self.backlog.remove(&token);
            return;
        };
        if session.throttled {
            self.backlog.remove(&token);
            return;
        }

        let state = read_and_dispatch(
            session,
            &mut self.processor,
            &mut self.queue,
            &self.config,
            buf,
        );
        match state {
            ReadState::Drained => {
                self.backlog.remove(&token);
            }
            ReadState::Budget => {
                self.backlog.insert(token);
            }
            ReadState::Throttled => {
                session.throttled = true;
                self.backlog.remove(&token);
            }
            ReadState::Closed => self.close_session(token),
        }
    }

    fn close_session(&mut self, token: Token) {
        self.backlog.remove(&token);
        let Some(mut session) = self.sessions.remove(&token) else {
            return;
        };
        let peer = session.conn.peer_addr();
        if let Err(err) = self.poll.registry().deregister(session.conn.source_mut()) {
            debug!(%peer, error = %err, "deregister failed");
        }
        if session.assembler.residual_len() > 0 {
            debug!(
                %peer,
                bytes = session.assembler.residual_len(),
                "discarding unterminated packet on close"
            );
        }
        if session.conn.pending_len() > 0 {
            debug!(
                %peer,
                bytes = session.conn.pending_len(),
                "discarding unsent response bytes on close"
            );
        }
        session.conn.shutdown();
        info!(%peer, "connection closed");
    }
}

fn pending_full(conn: &Connection, config: &ServerConfig) -> bool {
    conn.pending_len() >= config.max_pending_bytes.max(1)
}

/// Read up to `max_reads_per_event` chunks, framing and dispatching every
/// chunk before reading the next.
fn read_and_dispatch<P: CommandProcessor>(
    session: &mut Session,
    processor: &mut P,
    queue: &mut DispatchQueue,
    config: &ServerConfig,
    buf: &mut [u8],
) -> ReadState {
    let peer = session.conn.peer_addr();
    for _ in 0..config.max_reads_per_event.max(1) {
        if pending_full(&session.conn, config) {
            debug!(
                %peer,
                pending = session.conn.pending_len(),
                "response backlog full, pausing reads"
            );
            return ReadState::Throttled;
        }

        let n = match session.conn.read_chunk(buf) {
            Ok(ReadOutcome::Data(n)) => n,
            Ok(ReadOutcome::WouldBlock) => return ReadState::Drained,
            Ok(ReadOutcome::Closed) => {
                debug!(%peer, "peer closed connection");
                return ReadState::Closed;
            }
            Err(err) => {
                warn!(%peer, error = %err, "read failed, closing connection");
                return ReadState::Closed;
            }
        };

        trace!(%peer, bytes = n, "read chunk");
        let scan = session.assembler.push(&buf[..n], queue);
        if scan.discarded > 0 {
            debug!(%peer, discarded = scan.discarded, "malformed packets dropped");
        }

        let mut sink = ConnectionSink::new(&mut session.conn, config.write_policy);
        let report = queue.drain(processor, &mut sink);
        if let Some(err) = report.write_error {
            warn!(%peer, error = %err, "write failed, closing connection");
            return ReadState::Closed;
        }
    }
    trace!(%peer, "read budget spent");
    ReadState::Budget
}

/// Start a server on `host:port` and run it until it stops.
///
/// Invalid arguments return their status without starting the loop. The
/// loop otherwise runs until a fatal error, so in practice this returns only
/// a failure status.
pub fn start<P: CommandProcessor>(host: &str, port: u16, processor: P) -> ServerStatus {
    let mut server = match Server::bind(ServerConfig::new(host, port), processor) {
        Ok(server) => server,
        Err(err) => {
            error!(host, port, error = %err, "server failed to start");
            return err.status();
        }
    };

    match server.run() {
        Ok(()) => server.status(),
        Err(err) => {
            error!(host, port, error = %err, "server loop failed");
            err.status()
        }
    }
}
