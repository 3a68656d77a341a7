// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::net::Ipv4Addr;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    #[error("parse: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("disconnected from {0}")]
    Disconnected(Ipv4Addr),

    #[error("no connection for neighbor {0}")]
    UnknownPeer(Ipv4Addr),

    #[error("invalid neighbor {0}, expected <address>-<cust|peer|prov>")]
    InvalidNeighbor(String),

    #[error("unknown relation {0}, expected one of cust, peer, prov")]
    UnknownRelation(String),

    #[error("message conversion: {0}")]
    MessageConversion(#[from] crate::messages::MessageConvertError),

    #[error("datastore: {0}")]
    Datastore(#[from] rdb::error::Error),
}
