use std::collections::BTreeSet;
use std::io::ErrorKind;
use std::net::{Shutdown, SocketAddr};
use std::sync::mpsc::{Receiver, Sender, TryRecvError};
use std::sync::Arc;
use std::time::Duration;

use mio::net::TcpStream;
use mio::{Events, Interest, Poll, Token, Waker};
use serde_json::Value;
use simplenet_transport::{TcpTransport, TransportError};
use simplenet_wire::{OutboundBuffer, WireConfig, WireError, WireReader};
use tracing::{debug, error, info, trace, warn};

use crate::command::Command;
use crate::config::ServerConfig;
use crate::error::Result;
use crate::event::{ClientId, Event};
use crate::registry::{token, Registry};

/// Name given to the worker thread.
pub(crate) const WORKER_THREAD_NAME: &str = "simplenet-worker";

const LISTENER: Token = Token(usize::MAX);
const WAKER: Token = Token(usize::MAX - 1);
const EVENT_CAPACITY: usize = 256;

/// Frames taken from one client before the other clients get a turn.
const MAX_FRAMES_PER_TURN: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Shutdown,
}

/// One live client socket with its inbound and outbound buffers.
struct Connection {
    reader: WireReader<TcpStream>,
    outbound: OutboundBuffer,
    addr: SocketAddr,
    /// Whether write interest is currently registered.
    writable: bool,
}

/// The readiness loop that owns the listener and every client socket.
///
/// One `mio::Poll` covers the listener, the waker and all clients. Each
/// iteration handles the listener first, then pending commands, then client
/// output and input. Registration is edge-triggered, so a client that still
/// has unread data after its frame allowance stays in `backlog` and the next
/// wait does not block.
pub(crate) struct Worker {
    poll: Poll,
    ready: Events,
    transport: TcpTransport,
    waker: Arc<Waker>,
    commands: Receiver<Command>,
    events: Sender<Event>,
    registry: Registry<Connection>,
    backlog: BTreeSet<ClientId>,
    wire_config: WireConfig,
    max_pending_output: usize,
    facade_gone: bool,
}

impl Worker {
    /// Bind the listener and take ownership of the worker's channel ends.
    pub fn bind(
        config: &ServerConfig,
        commands: Receiver<Command>,
        events: Sender<Event>,
    ) -> Result<Self> {
        let mut transport = TcpTransport::bind(&config.host, config.port)?;
        let poll = Poll::new().map_err(TransportError::Poll)?;
        poll.registry()
            .register(&mut transport, LISTENER, Interest::READABLE)
            .map_err(TransportError::Poll)?;
        let waker = Waker::new(poll.registry(), WAKER).map_err(TransportError::Poll)?;

        Ok(Self {
            poll,
            ready: Events::with_capacity(EVENT_CAPACITY),
            transport,
            waker: Arc::new(waker),
            commands,
            events,
            registry: Registry::new(),
            backlog: BTreeSet::new(),
            wire_config: config.wire.clone(),
            max_pending_output: config.max_pending_output,
            facade_gone: false,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.transport.local_addr()
    }

    /// Handle used to wake the worker after queueing a command.
    pub fn waker(&self) -> Arc<Waker> {
        Arc::clone(&self.waker)
    }

    /// Run until a shutdown command or a fatal condition, then tear down
    /// every client and release the listener.
    pub fn run(mut self) -> Result<()> {
        info!(local_addr = %self.local_addr(), "worker listening");

        let outcome = loop {
            match self.turn() {
                Ok(Flow::Continue) => {}
                Ok(Flow::Shutdown) => break Ok(()),
                Err(err) => {
                    error!(error = %err, "worker failed");
                    break Err(err);
                }
            }
        };

        self.terminate();
        outcome
    }

    fn turn(&mut self) -> Result<Flow> {
        let timeout = if self.backlog.is_empty() {
            None
        } else {
            Some(Duration::ZERO)
        };

        if let Err(err) = self.poll.poll(&mut self.ready, timeout) {
            if err.kind() == ErrorKind::Interrupted {
                return Ok(Flow::Continue);
            }
            return Err(TransportError::Poll(err).into());
        }
        if self.ready.is_empty() && timeout.is_none() {
            warn!("readiness wait returned with nothing ready");
            return Ok(Flow::Shutdown);
        }

        let mut accept = false;
        let mut woken = false;
        let mut writable = Vec::new();
        for event in self.ready.iter() {
            match event.token() {
                LISTENER => accept = true,
                WAKER => woken = true,
                token => {
                    let Some(client_id) = self.registry.id_for_token(token) else {
                        continue;
                    };
                    if event.is_writable() || event.is_write_closed() {
                        writable.push(client_id);
                    }
                    if event.is_readable() || event.is_read_closed() || event.is_error() {
                        self.backlog.insert(client_id);
                    }
                }
            }
        }

        if accept {
            self.accept()?;
        }

        if woken && self.drain_commands() == Flow::Shutdown {
            return Ok(Flow::Shutdown);
        }

        for client_id in writable {
            self.flush_client(client_id);
        }

        let backlog: Vec<ClientId> = self.backlog.iter().copied().collect();
        for client_id in backlog {
            self.service_client(client_id);
        }

        if self.facade_gone {
            warn!("server handle dropped, shutting down");
            return Ok(Flow::Shutdown);
        }
        Ok(Flow::Continue)
    }

    fn accept(&mut self) -> Result<()> {
        while let Some((stream, addr)) = self.transport.accept()? {
            self.admit(stream, addr);
        }
        Ok(())
    }

    fn admit(&mut self, stream: TcpStream, addr: SocketAddr) {
        let client_id = self.registry.register(Connection {
            reader: WireReader::with_config(stream, self.wire_config.clone()),
            outbound: OutboundBuffer::with_config(self.wire_config.clone()),
            addr,
            writable: false,
        });
        let Some(connection) = self.registry.get_mut(client_id) else {
            return;
        };

        if let Err(err) = self.poll.registry().register(
            connection.reader.get_mut(),
            token(client_id),
            Interest::READABLE,
        ) {
            warn!(%addr, error = %err, "dropping accepted connection");
            self.registry.unregister(client_id);
            return;
        }

        info!(client_id, %addr, clients = self.registry.len(), "client connected");
        self.emit(Event::NewConnection {
            client_id,
            host: addr.ip().to_string(),
            port: addr.port(),
        });
        // bytes may have landed before registration
        self.backlog.insert(client_id);
    }

    fn drain_commands(&mut self) -> Flow {
        loop {
            match self.commands.try_recv() {
                Ok(Command::Send { client_id, value }) => self.forward(client_id, value),
                Ok(Command::Shutdown) => {
                    debug!("shutdown requested");
                    return Flow::Shutdown;
                }
                Err(TryRecvError::Empty) => return Flow::Continue,
                Err(TryRecvError::Disconnected) => {
                    self.facade_gone = true;
                    return Flow::Continue;
                }
            }
        }
    }

    fn forward(&mut self, client_id: ClientId, value: Value) {
        let Some(connection) = self.registry.get_mut(client_id) else {
            warn!(client_id, "dropping message for unknown client");
            return;
        };

        if let Err(err) = connection.outbound.push(&[value]) {
            warn!(client_id, error = %err, "dropping message that cannot be framed");
            return;
        }
        self.flush_client(client_id);
    }

    /// Write as much queued output as the socket takes.
    ///
    /// Write interest stays registered only while output is queued. A client
    /// whose queue outgrows `max_pending_output` is torn down.
    fn flush_client(&mut self, client_id: ClientId) {
        let Some(connection) = self.registry.get_mut(client_id) else {
            return;
        };

        if let Err(err) = connection.outbound.flush_to(connection.reader.get_ref()) {
            error!(client_id, error = %err, "send to client failed");
            self.teardown(client_id);
            return;
        }

        let pending = connection.outbound.len();
        if pending > self.max_pending_output {
            warn!(
                client_id,
                pending,
                limit = self.max_pending_output,
                "client is not reading, disconnecting"
            );
            self.teardown(client_id);
            return;
        }

        let want_writable = pending > 0;
        if want_writable == connection.writable {
            return;
        }
        let interest = if want_writable {
            Interest::READABLE | Interest::WRITABLE
        } else {
            Interest::READABLE
        };
        if let Err(err) =
            self.poll
                .registry()
                .reregister(connection.reader.get_mut(), token(client_id), interest)
        {
            error!(client_id, error = %err, "couldn't update client interest");
            self.teardown(client_id);
            return;
        }
        trace!(client_id, pending, want_writable, "write interest changed");
        connection.writable = want_writable;
    }

    fn service_client(&mut self, client_id: ClientId) {
        for _ in 0..MAX_FRAMES_PER_TURN {
            let Some(connection) = self.registry.get_mut(client_id) else {
                self.backlog.remove(&client_id);
                return;
            };

            match connection.reader.try_read_fields() {
                Ok(Some(mut fields)) => {
                    if fields.len() != 1 {
                        warn!(
                            client_id,
                            fields = fields.len(),
                            "client frame must hold exactly one field"
                        );
                        self.teardown(client_id);
                        return;
                    }
                    let data = fields.remove(0);
                    self.emit(Event::Message {
                        from_client_id: client_id,
                        data,
                    });
                }
                Ok(None) => {
                    self.backlog.remove(&client_id);
                    return;
                }
                Err(WireError::ConnectionClosed) => {
                    debug!(client_id, "client closed connection");
                    self.teardown(client_id);
                    return;
                }
                Err(err) => {
                    error!(client_id, error = %err, "read from client failed");
                    self.teardown(client_id);
                    return;
                }
            }
        }
        trace!(client_id, "frame allowance used, continuing next turn");
    }

    /// Remove a client, shut its socket down and announce the disconnection.
    fn teardown(&mut self, client_id: ClientId) {
        self.backlog.remove(&client_id);
        let Some(mut connection) = self.registry.unregister(client_id) else {
            return;
        };

        if let Err(err) = self.poll.registry().deregister(connection.reader.get_mut()) {
            debug!(client_id, error = %err, "couldn't deregister socket");
        }
        if let Err(err) = connection.reader.get_ref().shutdown(Shutdown::Both) {
            debug!(client_id, error = %err, "couldn't shut down socket, probably already dead");
        }
        if !connection.outbound.is_empty() {
            debug!(client_id, discarded = connection.outbound.len(), "unsent output dropped");
        }
        info!(client_id, addr = %connection.addr, "client disconnected");
        drop(connection);

        self.emit(Event::Disconnection { client_id });
    }

    fn emit(&mut self, event: Event) {
        if self.events.send(event).is_err() && !self.facade_gone {
            warn!("event receiver dropped");
            self.facade_gone = true;
        }
    }

    fn terminate(mut self) {
        info!("shutting down");
        if !self.registry.is_empty() {
            debug!(clients = self.registry.len(), "disconnecting remaining clients");
        }
        for client_id in self.registry.ids() {
            self.teardown(client_id);
        }

        let Worker {
            transport, poll, ..
        } = self;
        drop(transport);
        drop(poll);
        info!("worker terminated");
    }
}
