use std::net::SocketAddr;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use mio::Waker;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::command::Command;
use crate::config::ServerConfig;
use crate::error::{PeerError, Result};
use crate::event::{ClientId, Event};
use crate::worker::{Worker, WORKER_THREAD_NAME};

/// A multiplexing TCP server.
///
/// All sockets live on a background worker thread. The server handle talks
/// to it through a command channel and receives connection lifecycle and
/// message notifications as [`Event`]s.
///
/// ```no_run
/// use simplenet_peer::{Event, Server};
///
/// let mut server = Server::new("127.0.0.1", 2131);
/// server.start()?;
/// while let Event::Message { from_client_id, data } = server.read()? {
///     server.send(&data, from_client_id)?;
/// }
/// server.stop()?;
/// # Ok::<(), simplenet_peer::PeerError>(())
/// ```
#[derive(Debug)]
pub struct Server {
    config: ServerConfig,
    running: Option<Running>,
}

#[derive(Debug)]
struct Running {
    commands: Sender<Command>,
    waker: Arc<Waker>,
    events: Receiver<Event>,
    worker: JoinHandle<Result<()>>,
    local_addr: SocketAddr,
}

impl Server {
    /// Create a stopped server for `host:port`.
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self::with_config(ServerConfig::new(host, port))
    }

    /// Create a stopped server with explicit configuration.
    pub fn with_config(config: ServerConfig) -> Self {
        Self {
            config,
            running: None,
        }
    }

    /// Bind the listener and launch the worker.
    ///
    /// Returns once the listener is bound, so bind failures surface here and
    /// clients may connect as soon as this returns.
    pub fn start(&mut self) -> Result<()> {
        if self.running.is_some() {
            return Err(PeerError::AlreadyRunning);
        }

        let (commands, command_rx) = mpsc::channel();
        let (event_tx, events) = mpsc::channel();
        let (ready_tx, ready_rx) = mpsc::sync_channel(1);

        let config = self.config.clone();
        let worker = thread::Builder::new()
            .name(WORKER_THREAD_NAME.to_string())
            .spawn(move || {
                let worker = match Worker::bind(&config, command_rx, event_tx) {
                    Ok(worker) => worker,
                    Err(err) => {
                        let _ = ready_tx.send(Err(err));
                        return Ok(());
                    }
                };
                let _ = ready_tx.send(Ok((worker.local_addr(), worker.waker())));
                worker.run()
            })?;

        let (local_addr, waker) = match ready_rx.recv() {
            Ok(Ok(ready)) => ready,
            Ok(Err(err)) => {
                let _ = worker.join();
                return Err(err);
            }
            Err(_) => {
                let _ = worker.join();
                return Err(PeerError::WorkerStopped(
                    "worker exited during startup".to_string(),
                ));
            }
        };

        info!(%local_addr, "server started");
        self.running = Some(Running {
            commands,
            waker,
            events,
            worker,
            local_addr,
        });
        Ok(())
    }

    /// Queue `value` for delivery to `client_id`.
    ///
    /// Delivery is asynchronous; a message for a client that is no longer
    /// connected is dropped by the worker. A client that stops reading is
    /// disconnected once its queue passes
    /// [`ServerConfig::max_pending_output`].
    pub fn send<T: Serialize + ?Sized>(&self, value: &T, client_id: ClientId) -> Result<()> {
        let running = self.running()?;
        let value = serde_json::to_value(value)?;

        running
            .commands
            .send(Command::Send { client_id, value })
            .map_err(|_| PeerError::WorkerStopped("command channel closed".to_string()))?;
        running
            .waker
            .wake()
            .map_err(|err| PeerError::WorkerStopped(err.to_string()))
    }

    /// Block until the next event.
    pub fn read(&self) -> Result<Event> {
        self.running()?
            .events
            .recv()
            .map_err(|_| worker_gone())
    }

    /// Wait up to `timeout` for the next event.
    pub fn read_timeout(&self, timeout: Duration) -> Result<Option<Event>> {
        match self.running()?.events.recv_timeout(timeout) {
            Ok(event) => Ok(Some(event)),
            Err(RecvTimeoutError::Timeout) => Ok(None),
            Err(RecvTimeoutError::Disconnected) => Err(worker_gone()),
        }
    }

    /// Return the next event if one is already queued.
    pub fn try_read(&self) -> Result<Option<Event>> {
        match self.running()?.events.try_recv() {
            Ok(event) => Ok(Some(event)),
            Err(TryRecvError::Empty) => Ok(None),
            Err(TryRecvError::Disconnected) => Err(worker_gone()),
        }
    }

    /// Shut the worker down and wait for it to finish.
    ///
    /// Every connected client is disconnected; the events produced by that,
    /// along with any other events not yet read, are returned. Stopping a
    /// server that is not running returns no events.
    pub fn stop(&mut self) -> Result<Vec<Event>> {
        let Some(running) = self.running.take() else {
            return Ok(Vec::new());
        };

        debug!("sending shutdown to worker");
        if running.commands.send(Command::Shutdown).is_err() {
            debug!("worker already gone");
        }
        if let Err(err) = running.waker.wake() {
            debug!(error = %err, "couldn't wake worker");
        }

        let outcome = running.worker.join();
        let remaining: Vec<Event> = running.events.try_iter().collect();
        info!(undelivered = remaining.len(), "server stopped");

        match outcome {
            Ok(Ok(())) => Ok(remaining),
            Ok(Err(err)) => Err(err),
            Err(_) => Err(PeerError::WorkerStopped("worker panicked".to_string())),
        }
    }

    /// Whether the worker has been started and not yet stopped.
    pub fn is_running(&self) -> bool {
        self.running.is_some()
    }

    /// Bound listener address while running.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.running.as_ref().map(|running| running.local_addr)
    }

    /// Server configuration.
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    fn running(&self) -> Result<&Running> {
        self.running.as_ref().ok_or(PeerError::NotRunning)
    }
}

impl Drop for Server {
    fn drop(&mut self) {
        if let Err(err) = self.stop() {
            warn!(error = %err, "error stopping server on drop");
        }
    }
}

fn worker_gone() -> PeerError {
    PeerError::WorkerStopped("worker terminated".to_string())
}
