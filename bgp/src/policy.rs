// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Business relationship policy between neighbors.
//!
//! Customers pay us for transit, providers are paid by us, and peers exchange
//! traffic for free. We only carry traffic and announcements that someone is
//! paying for.

use crate::error::Error;
use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Relation {
    Customer,
    Peer,
    Provider,
}

impl FromStr for Relation {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cust" | "customer" => Ok(Relation::Customer),
            "peer" => Ok(Relation::Peer),
            "prov" | "provider" => Ok(Relation::Provider),
            other => Err(Error::UnknownRelation(other.to_owned())),
        }
    }
}

impl Display for Relation {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Relation::Customer => write!(f, "cust"),
            Relation::Peer => write!(f, "peer"),
            Relation::Provider => write!(f, "prov"),
        }
    }
}

/// Whether data arriving from a `src` neighbor may leave towards a `dst`
/// neighbor. Traffic between two non-customers is refused, except that
/// provider to provider transit is carried.
pub fn forwarding_allowed(src: Relation, dst: Relation) -> bool {
    use Relation::*;
    !matches!((src, dst), (Peer, Peer) | (Peer, Provider) | (Provider, Peer))
}

/// Whether a route learned from a `learned` neighbor may be announced to a
/// `to` neighbor. Routes from customers go everywhere. Routes from peers and
/// providers only go to customers.
pub fn export_allowed(learned: Relation, to: Relation) -> bool {
    learned == Relation::Customer || to == Relation::Customer
}
