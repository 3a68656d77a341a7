// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/// This file contains code for testing purposes only. Note that it's only
/// included in `lib.rs` with a `#[cfg(test)]` guard. The purpose of the
/// code in this file is to implement Transport over in-memory channels such
/// that the router and dispatcher may be tested rapidly using a simulated
/// network.
use crate::connection::{Received, Transport};
use crate::error::Error;
use crate::messages::Outbound;
use serde_json::Value;
use std::collections::{BTreeMap, VecDeque};
use std::net::Ipv4Addr;
use std::sync::mpsc::{channel as mpsc_channel, Receiver, Sender, TryRecvError};
use std::thread::sleep;
use std::time::{Duration, Instant};

const POLL_INTERVAL: Duration = Duration::from_millis(1);

pub struct Endpoint<T> {
    pub rx: Receiver<T>,
    pub tx: Sender<T>,
}

impl<T> Endpoint<T> {
    fn new(rx: Receiver<T>, tx: Sender<T>) -> Self {
        Self { rx, tx }
    }
}

/// Creates a bidirectional channel pair with both sender and receiver.
pub fn channel<T>() -> (Endpoint<T>, Endpoint<T>) {
    let (tx_a, rx_b) = mpsc_channel();
    let (tx_b, rx_a) = mpsc_channel();
    (Endpoint::new(rx_a, tx_a), Endpoint::new(rx_b, tx_b))
}

struct Link {
    endpoint: Endpoint<Value>,
    pending: VecDeque<Received>,
    closed: bool,
}

impl Link {
    /// Move everything the neighbor has sent so far into the pending queue.
    fn drain(&mut self) {
        while !self.closed {
            match self.endpoint.rx.try_recv() {
                Ok(v) => self.pending.push_back(Received::Message(v)),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    self.pending.push_back(Received::Closed);
                    self.closed = true;
                }
            }
        }
    }
}

#[derive(Default)]
pub struct ChannelTransport {
    links: BTreeMap<Ipv4Addr, Link>,
}

impl ChannelTransport {
    /// Add a link to `peer` and return the neighbor's end of it. Dropping
    /// the returned endpoint closes the link.
    pub fn attach(&mut self, peer: Ipv4Addr) -> Endpoint<Value> {
        let (local, remote) = channel();
        self.links.insert(
            peer,
            Link {
                endpoint: local,
                pending: VecDeque::new(),
                closed: false,
            },
        );
        remote
    }
}

impl Transport for ChannelTransport {
    fn poll(&mut self, timeout: Duration) -> Result<Vec<Ipv4Addr>, Error> {
        let deadline = Instant::now() + timeout;
        loop {
            let mut ready = Vec::new();
            for (peer, link) in self.links.iter_mut() {
                link.drain();
                if !link.pending.is_empty() {
                    ready.push(*peer);
                }
            }
            if !ready.is_empty() || Instant::now() >= deadline {
                return Ok(ready);
            }
            sleep(POLL_INTERVAL);
        }
    }

    fn recv(&mut self, peer: Ipv4Addr) -> Result<Received, Error> {
        let link = self.links.get_mut(&peer).ok_or(Error::UnknownPeer(peer))?;
        if let Some(r) = link.pending.pop_front() {
            return Ok(r);
        }
        if link.closed {
            return Ok(Received::Closed);
        }
        Ok(match link.endpoint.rx.recv() {
            Ok(v) => Received::Message(v),
            Err(_) => {
                link.closed = true;
                Received::Closed
            }
        })
    }

    fn send(
        &mut self,
        peer: Ipv4Addr,
        message: &Outbound,
    ) -> Result<(), Error> {
        let link = self.links.get(&peer).ok_or(Error::UnknownPeer(peer))?;
        link.endpoint
            .tx
            .send(message.to_value()?)
            .map_err(|_| Error::Disconnected(peer))
    }
}
