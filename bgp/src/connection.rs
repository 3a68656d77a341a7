// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use crate::error::Error;
use crate::messages::Outbound;
use serde_json::Value;
use std::net::Ipv4Addr;
use std::time::Duration;

/// The result of reading from a neighbor link.
#[derive(Debug, Clone, PartialEq)]
pub enum Received {
    Message(Value),
    /// The neighbor closed the link.
    Closed,
}

/// The set of links to all neighbors, indexed by neighbor address.
pub trait Transport {
    /// Wait up to `timeout` for neighbors with something to read. An empty
    /// result means the timeout expired.
    fn poll(&mut self, timeout: Duration) -> Result<Vec<Ipv4Addr>, Error>;

    /// Read one complete message from `peer`. Bytes that are not JSON are
    /// reported as `Error::Parse`.
    fn recv(&mut self, peer: Ipv4Addr) -> Result<Received, Error>;

    fn send(
        &mut self,
        peer: Ipv4Addr,
        message: &Outbound,
    ) -> Result<(), Error>;
}
