use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use simplenet_peer::{ClientId, Event, Server};
use tracing::{info, warn};

use crate::cmd::{install_ctrlc_handler, RelayArgs, EVENT_POLL_INTERVAL};
use crate::exit::{peer_error, CliResult, SUCCESS};
use crate::output::{print_event, value_text, OutputFormat};

/// Connected users keyed by client id, named by their remote address.
#[derive(Debug, Default)]
struct Roster {
    users: BTreeMap<ClientId, String>,
}

impl Roster {
    /// Update the roster for `event` and return the line to broadcast.
    fn apply(&mut self, event: &Event) -> Option<String> {
        match event {
            Event::NewConnection {
                client_id,
                host,
                port,
            } => {
                let name = format!("{host}:{port}");
                let line = format!("{name} has joined");
                self.users.insert(*client_id, name);
                Some(line)
            }
            Event::Disconnection { client_id } => {
                let name = self.users.remove(client_id)?;
                Some(format!("{name} has left"))
            }
            Event::Message {
                from_client_id,
                data,
            } => {
                let name = self.users.get(from_client_id)?;
                Some(format!("{name}: {}", value_text(data)))
            }
        }
    }

    fn ids(&self) -> impl Iterator<Item = ClientId> + '_ {
        self.users.keys().copied()
    }
}

pub fn run(args: RelayArgs, format: OutputFormat) -> CliResult<i32> {
    let mut server = Server::new(args.host.clone(), args.port);
    server
        .start()
        .map_err(|err| peer_error("bind failed", err))?;
    if let Some(addr) = server.local_addr() {
        eprintln!("listening on {addr}");
    }

    let running = Arc::new(AtomicBool::new(true));
    install_ctrlc_handler(running.clone())?;

    let mut roster = Roster::default();

    while running.load(Ordering::SeqCst) {
        let Some(event) = server
            .read_timeout(EVENT_POLL_INTERVAL)
            .map_err(|err| peer_error("receive failed", err))?
        else {
            continue;
        };
        print_event(&event, format);

        let Some(line) = roster.apply(&event) else {
            warn!(client_id = event.client_id(), "event for unknown client");
            continue;
        };
        for client_id in roster.ids() {
            server
                .send(&line, client_id)
                .map_err(|err| peer_error("broadcast failed", err))?;
        }
    }

    info!("interrupted, terminating relay");
    server
        .stop()
        .map_err(|err| peer_error("shutdown failed", err))?;
    Ok(SUCCESS)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn roster_names_users_by_address() {
        let mut roster = Roster::default();

        let joined = roster.apply(&Event::NewConnection {
            client_id: 1,
            host: "127.0.0.1".to_string(),
            port: 40000,
        });
        assert_eq!(joined.as_deref(), Some("127.0.0.1:40000 has joined"));

        let said = roster.apply(&Event::Message {
            from_client_id: 1,
            data: json!("hi all"),
        });
        assert_eq!(said.as_deref(), Some("127.0.0.1:40000: hi all"));

        let left = roster.apply(&Event::Disconnection { client_id: 1 });
        assert_eq!(left.as_deref(), Some("127.0.0.1:40000 has left"));
        assert_eq!(roster.ids().count(), 0);
    }

    #[test]
    fn unknown_clients_produce_nothing() {
        let mut roster = Roster::default();
        assert!(roster
            .apply(&Event::Message {
                from_client_id: 9,
                data: json!(1),
            })
            .is_none());
        assert!(roster
            .apply(&Event::Disconnection { client_id: 9 })
            .is_none());
    }
}
