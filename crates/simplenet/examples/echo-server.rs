//! Minimal echo server: every message is sent back to the client that sent it.
//!
//! Run with:
//!   cargo run --example echo-server
//!
//! In another terminal:
//!   cargo run --features cli -- send 2131 --json '{"hello":"world"}' --wait

use simplenet::{Event, Server};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut server = Server::new("127.0.0.1", 2131);
    server.start()?;
    if let Some(addr) = server.local_addr() {
        eprintln!("Listening on {addr}");
    }

    loop {
        match server.read()? {
            Event::Message {
                from_client_id,
                data,
            } => {
                eprintln!("Client {from_client_id} sent {data}");
                server.send(&data, from_client_id)?;
            }
            event => eprintln!("{event}"),
        }
    }
}
