use std::io::ErrorKind;
use std::net::{SocketAddr, TcpListener, TcpStream, ToSocketAddrs};
use std::time::Duration;

use mio::event::Source;
use mio::{Interest, Registry, Token};
use tracing::{debug, info, warn};

use crate::error::{Result, TransportError};

/// TCP listener transport.
///
/// Binds a listening socket for a host/port pair and accepts connections
/// from it. The listener is non-blocking and is a [`mio::event::Source`]:
/// register it with a `mio::Poll` and call [`TcpTransport::accept`] until it
/// returns `Ok(None)` after each readable event.
#[derive(Debug)]
pub struct TcpTransport {
    listener: mio::net::TcpListener,
    local_addr: SocketAddr,
}

impl TcpTransport {
    /// Resolve `host:port` and bind a listener on the first address that binds.
    pub fn bind(host: &str, port: u16) -> Result<Self> {
        let addr = format_addr(host, port);
        let candidates = resolve(host, port)?;

        let mut last_err = None;
        for candidate in candidates {
            match TcpListener::bind(candidate) {
                Ok(listener) => {
                    listener
                        .set_nonblocking(true)
                        .map_err(|source| TransportError::Bind {
                            addr: addr.clone(),
                            source,
                        })?;
                    let local_addr = listener.local_addr()?;
                    info!(%local_addr, "listening for tcp connections");
                    return Ok(Self {
                        listener: mio::net::TcpListener::from_std(listener),
                        local_addr,
                    });
                }
                Err(err) => {
                    debug!(%candidate, error = %err, "bind candidate failed");
                    last_err = Some(err);
                }
            }
        }

        Err(TransportError::Bind {
            addr,
            source: last_err.unwrap_or_else(no_candidates),
        })
    }

    /// Accept one pending connection.
    ///
    /// Returns `Ok(None)` once nothing is pending. Connections the peer
    /// abandoned before they were accepted are skipped. The returned stream
    /// is non-blocking, as every stream accepted from a mio listener is.
    pub fn accept(&self) -> Result<Option<(mio::net::TcpStream, SocketAddr)>> {
        loop {
            match self.listener.accept() {
                Ok((stream, addr)) => {
                    debug!(%addr, "accepted connection");
                    return Ok(Some((stream, addr)));
                }
                Err(err) if err.kind() == ErrorKind::WouldBlock => return Ok(None),
                Err(err) if is_transient_accept(&err) => {
                    debug!(error = %err, "transient accept failure");
                }
                Err(err) => return Err(TransportError::Accept(err)),
            }
        }
    }

    /// Resolve `host:port` and connect to the first candidate that accepts.
    ///
    /// Candidates are tried in resolver order. When every candidate fails the
    /// last failure is reported.
    pub fn connect(host: &str, port: u16, timeout: Option<Duration>) -> Result<TcpStream> {
        let addr = format_addr(host, port);
        let candidates = resolve(host, port)?;

        let mut last_err = None;
        for candidate in candidates {
            debug!(%candidate, "connecting");
            let attempt = match timeout {
                Some(timeout) => TcpStream::connect_timeout(&candidate, timeout),
                None => TcpStream::connect(candidate),
            };
            match attempt {
                Ok(stream) => {
                    info!(%candidate, "connected");
                    return Ok(stream);
                }
                Err(err) => {
                    warn!(%candidate, error = %err, "connect candidate failed");
                    last_err = Some(err);
                }
            }
        }

        Err(TransportError::Connect {
            addr,
            source: last_err.unwrap_or_else(no_candidates),
        })
    }

    /// The address the listener is actually bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }
}

impl Source for TcpTransport {
    fn register(
        &mut self,
        registry: &Registry,
        token: Token,
        interests: Interest,
    ) -> std::io::Result<()> {
        self.listener.register(registry, token, interests)
    }

    fn reregister(
        &mut self,
        registry: &Registry,
        token: Token,
        interests: Interest,
    ) -> std::io::Result<()> {
        self.listener.reregister(registry, token, interests)
    }

    fn deregister(&mut self, registry: &Registry) -> std::io::Result<()> {
        self.listener.deregister(registry)
    }
}

fn resolve(host: &str, port: u16) -> Result<Vec<SocketAddr>> {
    let candidates: Vec<SocketAddr> = (host, port)
        .to_socket_addrs()
        .map_err(|source| TransportError::Resolve {
            addr: format_addr(host, port),
            source,
        })?
        .collect();

    if candidates.is_empty() {
        return Err(TransportError::Resolve {
            addr: format_addr(host, port),
            source: no_candidates(),
        });
    }

    Ok(candidates)
}

fn format_addr(host: &str, port: u16) -> String {
    if host.contains(':') {
        format!("[{host}]:{port}")
    } else {
        format!("{host}:{port}")
    }
}

fn no_candidates() -> std::io::Error {
    std::io::Error::new(ErrorKind::AddrNotAvailable, "no addresses resolved")
}

fn is_transient_accept(err: &std::io::Error) -> bool {
    matches!(
        err.kind(),
        ErrorKind::Interrupted
            | ErrorKind::ConnectionAborted
            | ErrorKind::ConnectionReset
    )
}

#[cfg(test)]
mod tests {
    use std::io::{Read, Write};

    use mio::{Events, Poll};

    use super::*;

    const LISTENER: Token = Token(0);
    const STREAM: Token = Token(1);
    const WAIT: Duration = Duration::from_secs(5);

    #[test]
    fn accepted_stream_stays_non_blocking() {
        let mut transport = TcpTransport::bind("127.0.0.1", 0).unwrap();
        let port = transport.local_addr().port();
        assert_ne!(port, 0);

        let mut poll = Poll::new().unwrap();
        let mut events = Events::with_capacity(8);
        poll.registry()
            .register(&mut transport, LISTENER, Interest::READABLE)
            .unwrap();

        let mut client = TcpTransport::connect("127.0.0.1", port, None).unwrap();
        let (mut stream, peer) = loop {
            if let Some(accepted) = transport.accept().unwrap() {
                break accepted;
            }
            poll.poll(&mut events, Some(WAIT)).unwrap();
        };
        assert_eq!(peer, client.local_addr().unwrap());

        let mut buf = [0u8; 5];
        let err = stream.read(&mut buf).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::WouldBlock);

        poll.registry()
            .register(&mut stream, STREAM, Interest::READABLE)
            .unwrap();
        client.write_all(b"hello").unwrap();

        let mut received = Vec::new();
        while received.len() < 5 {
            match stream.read(&mut buf) {
                Ok(n) => {
                    assert_ne!(n, 0, "peer closed early");
                    received.extend_from_slice(&buf[..n]);
                }
                Err(err) if err.kind() == ErrorKind::WouldBlock => {
                    poll.poll(&mut events, Some(WAIT)).unwrap();
                }
                Err(err) => panic!("read failed: {err}"),
            }
        }
        assert_eq!(received, b"hello");
    }

    #[test]
    fn accept_drains_every_pending_connection() {
        let transport = TcpTransport::bind("127.0.0.1", 0).unwrap();
        let port = transport.local_addr().port();
        let _clients: Vec<TcpStream> = (0..3)
            .map(|_| TcpTransport::connect("127.0.0.1", port, None).unwrap())
            .collect();

        let mut accepted = 0;
        while transport.accept().unwrap().is_some() {
            accepted += 1;
        }
        assert_eq!(accepted, 3);
    }

    #[test]
    fn accept_without_pending_connection_is_none() {
        let transport = TcpTransport::bind("127.0.0.1", 0).unwrap();
        assert!(transport.accept().unwrap().is_none());
    }

    #[test]
    fn bind_conflict_reports_address() {
        let first = TcpTransport::bind("127.0.0.1", 0).unwrap();
        let port = first.local_addr().port();

        let err = TcpTransport::bind("127.0.0.1", port).unwrap_err();
        match err {
            TransportError::Bind { addr, .. } => assert_eq!(addr, format!("127.0.0.1:{port}")),
            other => panic!("expected bind error, got {other:?}"),
        }
    }

    #[test]
    fn connect_refused_reports_last_failure() {
        let port = {
            let unused = TcpTransport::bind("127.0.0.1", 0).unwrap();
            unused.local_addr().port()
        };

        let err = TcpTransport::connect("127.0.0.1", port, Some(Duration::from_secs(1)))
            .unwrap_err();
        assert!(matches!(err, TransportError::Connect { .. }));
    }

    #[test]
    fn unresolvable_host_is_resolve_error() {
        let err = TcpTransport::connect("host.invalid.", 2131, None).unwrap_err();
        assert!(matches!(err, TransportError::Resolve { .. }));
    }

    #[test]
    fn ipv6_addresses_are_bracketed() {
        assert_eq!(format_addr("::1", 80), "[::1]:80");
        assert_eq!(format_addr("localhost", 80), "localhost:80");
    }
}
