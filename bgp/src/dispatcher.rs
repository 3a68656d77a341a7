// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use crate::connection::{Received, Transport};
use crate::error::Error;
use crate::log::dispatcher_log;
use crate::router::Router;
use crate::IO_TIMEOUT;
use slog::Logger;
use std::net::Ipv4Addr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

const UNIT_DISPATCHER: &str = "dispatcher";

/// Why the event loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exit {
    Shutdown,
    ConnectionLost(Ipv4Addr),
}

/// Single threaded event loop that moves messages between the neighbor links
/// and the router. Each message is handled to completion, including all of
/// the messages it causes to be sent, before the next one is read.
pub struct Dispatcher<T: Transport> {
    transport: T,
    pub router: Router,
    shutdown: Arc<AtomicBool>,
    log: Logger,
}

impl<T: Transport> Dispatcher<T> {
    pub fn new(
        transport: T,
        router: Router,
        shutdown: Arc<AtomicBool>,
        log: Logger,
    ) -> Self {
        Self {
            transport,
            router,
            shutdown,
            log,
        }
    }

    pub fn run(&mut self) -> Result<Exit, Error> {
        dispatcher_log!(self, info, "dispatcher running";
            "asn" => self.router.config.asn
        );
        loop {
            if self.shutdown.load(Ordering::Acquire) {
                dispatcher_log!(self, info, "shutdown requested");
                return Ok(Exit::Shutdown);
            }
            for peer in self.transport.poll(IO_TIMEOUT)? {
                if let Some(exit) = self.service(peer) {
                    return Ok(exit);
                }
            }
        }
    }

    /// Handle one message from `peer`. Returns the reason to stop if a link
    /// went away.
    fn service(&mut self, peer: Ipv4Addr) -> Option<Exit> {
        let value = match self.transport.recv(peer) {
            Ok(Received::Message(v)) => v,
            Ok(Received::Closed) => {
                dispatcher_log!(self, info, "neighbor closed connection";
                    "peer" => peer.to_string()
                );
                return Some(Exit::ConnectionLost(peer));
            }
            Err(Error::Parse(e)) => {
                dispatcher_log!(self, warn, "dropping unparseable message: {e}";
                    "peer" => peer.to_string()
                );
                return None;
            }
            Err(e) => {
                dispatcher_log!(self, error, "read failed: {e}";
                    "peer" => peer.to_string()
                );
                return Some(Exit::ConnectionLost(peer));
            }
        };

        let outcome = self.router.handle(peer, value);
        dispatcher_log!(self, debug, "handled message";
            "peer" => peer.to_string(),
            "disposition" => format!("{:?}", outcome.disposition),
            "egress" => outcome.egress.len()
        );

        for e in outcome.egress {
            match self.transport.send(e.to, &e.message) {
                Ok(()) => {}
                Err(Error::Parse(err)) => {
                    let message = &e.message;
                    dispatcher_log!(self, error,
                        "cannot encode {message}: {err}";
                        "peer" => e.to.to_string()
                    );
                }
                Err(err) => {
                    dispatcher_log!(self, error, "send failed: {err}";
                        "peer" => e.to.to_string()
                    );
                    return Some(Exit::ConnectionLost(e.to));
                }
            }
        }
        None
    }
}
