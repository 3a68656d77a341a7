// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use crate::config::NeighborConfig;
use crate::messages::{Body, Message, Outbound};
use crate::policy::{export_allowed, Relation};
use std::collections::BTreeMap;
use std::net::Ipv4Addr;

/// A directly attached neighbor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Neighbor {
    pub address: Ipv4Addr,
    pub relation: Relation,
}

impl Neighbor {
    /// Our own address on the link to this neighbor. Links are numbered so
    /// that the router side always ends in `.1`.
    pub fn local_address(&self) -> Ipv4Addr {
        let [a, b, c, _] = self.address.octets();
        Ipv4Addr::new(a, b, c, 1)
    }

    /// A message from us to this neighbor.
    pub fn message(&self, body: Body) -> Message {
        Message::new(self.local_address(), self.address, body)
    }
}

impl From<&NeighborConfig> for Neighbor {
    fn from(cfg: &NeighborConfig) -> Self {
        Self {
            address: cfg.address,
            relation: cfg.relation,
        }
    }
}

/// A message bound for a neighbor.
#[derive(Debug, Clone, PartialEq)]
pub struct Egress {
    pub to: Ipv4Addr,
    pub message: Outbound,
}

#[derive(Debug, Default)]
pub struct Fanout {
    /// Indexed neighbor address
    egress: BTreeMap<Ipv4Addr, Neighbor>,
}

impl Fanout {
    /// Copies of `body` for every neighbor other than `origin` that export
    /// policy allows to hear about routes learned from `origin`.
    pub fn send(&self, origin: &Neighbor, body: &Body) -> Vec<Egress> {
        self.egress
            .values()
            .filter(|n| n.address != origin.address)
            .filter(|n| export_allowed(origin.relation, n.relation))
            .map(|n| Egress {
                to: n.address,
                message: n.message(body.clone()).into(),
            })
            .collect()
    }

    pub fn add_egress(&mut self, neighbor: Neighbor) {
        self.egress.insert(neighbor.address, neighbor);
    }

    pub fn get(&self, peer: Ipv4Addr) -> Option<&Neighbor> {
        self.egress.get(&peer)
    }
}
