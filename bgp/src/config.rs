// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use crate::error::Error;
use crate::policy::Relation;
use std::net::Ipv4Addr;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RouterConfig {
    /// Autonomous system number of this router
    pub asn: u32,
}

/// A neighbor as given on the command line, `<address>-<relation>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NeighborConfig {
    pub address: Ipv4Addr,
    pub relation: Relation,
}

impl FromStr for NeighborConfig {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || Error::InvalidNeighbor(s.to_owned());
        let (address, relation) = s.rsplit_once('-').ok_or_else(invalid)?;
        Ok(Self {
            address: address.parse().map_err(|_| invalid())?,
            relation: relation.parse()?,
        })
    }
}
