use std::io::{self, BufRead};
use std::thread;

use simplenet_peer::{Client, PeerError};
use simplenet_wire::WireError;
use tracing::debug;

use crate::cmd::ChatArgs;
use crate::exit::{io_error, peer_error, CliResult, FAILURE, SUCCESS};
use crate::output::print_raw_line;

/// Send each stdin line (trimmed) and print every value the server sends.
///
/// Ends on stdin EOF, or when the server closes the connection.
pub fn run(args: ChatArgs) -> CliResult<i32> {
    let mut client = Client::connect_to(args.host.clone(), args.port)
        .map_err(|err| peer_error("connect failed", err))?;
    let mut incoming = client
        .try_clone()
        .map_err(|err| peer_error("connect failed", err))?;

    thread::Builder::new()
        .name("simplenet-chat-reader".to_string())
        .spawn(move || loop {
            match incoming.read() {
                Ok(value) => print_raw_line(&value),
                Err(PeerError::Wire(WireError::ConnectionClosed)) => {
                    eprintln!("connection closed");
                    std::process::exit(SUCCESS);
                }
                Err(err) => {
                    eprintln!("error: {}", peer_error("receive failed", err));
                    std::process::exit(FAILURE);
                }
            }
        })
        .map_err(|err| io_error("reader thread failed", err))?;

    for line in io::stdin().lock().lines() {
        let line = line.map_err(|err| io_error("stdin read failed", err))?;
        client
            .send(line.trim())
            .map_err(|err| peer_error("send failed", err))?;
    }

    debug!("stdin closed");
    client
        .close()
        .map_err(|err| peer_error("close failed", err))?;
    Ok(SUCCESS)
}
