use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use simplenet_peer::{Event, Server};
use tracing::debug;

use crate::cmd::{install_ctrlc_handler, ListenArgs, EVENT_POLL_INTERVAL};
use crate::exit::{peer_error, CliResult, SUCCESS};
use crate::output::{print_event, OutputFormat};

pub fn run(args: ListenArgs, format: OutputFormat) -> CliResult<i32> {
    let mut server = Server::new(args.host.clone(), args.port);
    server
        .start()
        .map_err(|err| peer_error("bind failed", err))?;
    if let Some(addr) = server.local_addr() {
        eprintln!("listening on {addr}");
    }

    let running = Arc::new(AtomicBool::new(true));
    install_ctrlc_handler(running.clone())?;

    let mut printed = 0usize;

    while running.load(Ordering::SeqCst) {
        let Some(event) = server
            .read_timeout(EVENT_POLL_INTERVAL)
            .map_err(|err| peer_error("receive failed", err))?
        else {
            continue;
        };

        print_event(&event, format);
        printed = printed.saturating_add(1);

        if args.echo {
            if let Event::Message {
                from_client_id,
                data,
            } = &event
            {
                server
                    .send(data, *from_client_id)
                    .map_err(|err| peer_error("echo failed", err))?;
            }
        }

        if let Some(count) = args.count {
            if printed >= count {
                break;
            }
        }
    }

    debug!(printed, "stopping server");
    let remaining = server
        .stop()
        .map_err(|err| peer_error("shutdown failed", err))?;
    if args.count.is_none() {
        for event in &remaining {
            print_event(event, format);
        }
    }

    Ok(SUCCESS)
}
