// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use anyhow::Context;
use bgp::config::{NeighborConfig, RouterConfig};
use bgp::connection_unix::UnixTransport;
use bgp::dispatcher::{Dispatcher, Exit};
use bgp::router::Router;
use clap::Parser;
use common::log::init_logger;
use slog::Logger;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(version, about = "Path vector router", long_about = None)]
struct Cli {
    /// Autonomous system number for this router
    asn: u32,

    /// Neighbors as <address>-<relation>, where relation is one of cust,
    /// peer or prov
    #[arg(required = true)]
    neighbors: Vec<NeighborConfig>,

    /// Directory holding one socket per neighbor, named by address
    #[arg(short, long, default_value = ".")]
    socket_dir: PathBuf,
}

fn main() -> anyhow::Result<()> {
    let args = Cli::parse();
    let log = init_logger();
    run(args, log.clone()).inspect_err(|e| {
        slog::error!(log, "bgpd failed: {e:#}");
    })
}

fn run(args: Cli, log: Logger) -> anyhow::Result<()> {
    let shutdown = Arc::new(AtomicBool::new(false));
    termination_handler(shutdown.clone(), log.clone())?;

    let transport =
        UnixTransport::connect(&args.socket_dir, &args.neighbors, log.clone())
            .with_context(|| {
                format!(
                    "connecting to neighbors in {}",
                    args.socket_dir.display()
                )
            })?;

    let router = Router::new(
        RouterConfig { asn: args.asn },
        &args.neighbors,
        log.clone(),
    );

    let mut dispatcher =
        Dispatcher::new(transport, router, shutdown, log.clone());
    match dispatcher.run()? {
        Exit::Shutdown => slog::info!(log, "shutting down on signal"),
        Exit::ConnectionLost(peer) => {
            slog::info!(log, "connection to {peer} lost, shutting down")
        }
    }
    Ok(())
}

fn termination_handler(
    shutdown: Arc<AtomicBool>,
    log: Logger,
) -> anyhow::Result<()> {
    ctrlc::set_handler(move || {
        slog::info!(log, "termination requested");
        shutdown.store(true, Ordering::Release);
    })
    .context("setting termination handler")
}
