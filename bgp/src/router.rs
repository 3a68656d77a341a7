// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use crate::config::{NeighborConfig, RouterConfig};
use crate::error::Error;
use crate::fanout::{Egress, Fanout, Neighbor};
use crate::log::router_log;
use crate::messages::{
    Body, Envelope, Message, Outbound, RevokedNetwork, TableEntry,
    UpdateMessage,
};
use crate::policy::forwarding_allowed;
use rdb::bestpath::bestpath;
use rdb::{Db, Prefix4};
use serde_json::Value;
use slog::Logger;
use std::net::Ipv4Addr;

const UNIT_ROUTER: &str = "router";

/// What the router did with a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// A routing update was applied and passed on to the listed number of
    /// neighbors.
    Propagated(usize),
    /// Data was sent on towards the given neighbor.
    Forwarded(Ipv4Addr),
    /// A query was answered.
    Replied,
    /// The sender was told there is no route.
    NoRoute,
    Dropped,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Outcome {
    pub disposition: Disposition,
    pub egress: Vec<Egress>,
}

impl Outcome {
    fn dropped() -> Self {
        Self {
            disposition: Disposition::Dropped,
            egress: Vec::new(),
        }
    }
}

pub struct Router {
    /// The forwarding table this router updates in response to update and
    /// revoke messages from its neighbors.
    pub db: Db,

    /// The static configuration associated with this router.
    pub config: RouterConfig,

    /// Neighbors indexed by address. Used both to look up the sender of a
    /// message and to distribute routing updates.
    fanout: Fanout,

    log: Logger,
}

impl Router {
    pub fn new(
        config: RouterConfig,
        neighbors: &[NeighborConfig],
        log: Logger,
    ) -> Router {
        let mut fanout = Fanout::default();
        for n in neighbors {
            fanout.add_egress(n.into());
        }
        Self {
            db: Db::new(log.clone()),
            config,
            fanout,
            log,
        }
    }

    /// Handle one message received on the link to `from`. Nothing in here
    /// fails: every problem with the message ends in a disposition.
    pub fn handle(&mut self, from: Ipv4Addr, value: Value) -> Outcome {
        let Some(neighbor) = self.fanout.get(from).copied() else {
            router_log!(self, warn, "message from unknown neighbor";
                "peer" => from.to_string()
            );
            return Outcome::dropped();
        };

        let envelope = match Envelope::decode(&value) {
            Ok(envelope) => envelope,
            Err(e) => {
                router_log!(self, warn, "dropping unreadable message: {e}";
                    "peer" => from.to_string()
                );
                return Outcome::dropped();
            }
        };

        match self.dispatch(&neighbor, &envelope, value) {
            Ok(outcome) => outcome,
            Err(Error::Datastore(e)) => {
                router_log!(self, warn, "rejecting {}: {e}", envelope.typ;
                    "peer" => from.to_string()
                );
                Outcome::dropped()
            }
            Err(e) => {
                let typ = &envelope.typ;
                router_log!(self, warn, "failed to dispatch {typ}: {e}";
                    "peer" => from.to_string()
                );
                self.no_route(&neighbor, &envelope)
            }
        }
    }

    fn dispatch(
        &mut self,
        neighbor: &Neighbor,
        envelope: &Envelope,
        value: Value,
    ) -> Result<Outcome, Error> {
        let msg = value.get("msg").cloned().unwrap_or(Value::Null);
        let body = Body::decode(&envelope.typ, msg)?;

        match body {
            Body::Update(update) => self.handle_update(neighbor, update),
            Body::Revoke(networks) => self.handle_revoke(neighbor, networks),
            Body::Data(_) => Ok(self.handle_data(neighbor, envelope, value)),
            Body::Dump => Ok(self.handle_dump(neighbor)),
            Body::Table(_) | Body::NoRoute(_) => {
                router_log!(self, info, "ignoring {} message", envelope.typ;
                    "peer" => neighbor.address.to_string()
                );
                Ok(Outcome::dropped())
            }
            Body::Unknown(typ) => {
                router_log!(self, warn, "unknown message type {typ}";
                    "peer" => neighbor.address.to_string()
                );
                Ok(self.no_route(neighbor, envelope))
            }
        }
    }

    fn handle_update(
        &mut self,
        neighbor: &Neighbor,
        update: UpdateMessage,
    ) -> Result<Outcome, Error> {
        let prefix = update.prefix()?;
        let changed = self.db.record_advertisement(
            neighbor.address,
            prefix,
            update.attributes(),
        );

        if !changed {
            return Ok(Outcome::dropped());
        }

        let egress = self.fanout.send(neighbor, &Body::Update(update));
        router_log!(self, info, "update for {prefix}";
            "peer" => neighbor.address.to_string(),
            "propagated" => egress.len()
        );
        Ok(Outcome {
            disposition: Disposition::Propagated(egress.len()),
            egress,
        })
    }

    fn handle_revoke(
        &mut self,
        neighbor: &Neighbor,
        networks: Vec<RevokedNetwork>,
    ) -> Result<Outcome, Error> {
        let prefixes = networks
            .iter()
            .map(RevokedNetwork::prefix)
            .collect::<Result<Vec<Prefix4>, _>>()?;

        let withdrawn = self.db.record_withdrawal(neighbor.address, &prefixes);
        let egress = self.fanout.send(neighbor, &Body::Revoke(networks));
        router_log!(self, info, "revoke";
            "peer" => neighbor.address.to_string(),
            "requested" => prefixes.len(),
            "withdrawn" => withdrawn.len(),
            "propagated" => egress.len()
        );
        Ok(Outcome {
            disposition: Disposition::Propagated(egress.len()),
            egress,
        })
    }

    fn handle_data(
        &self,
        neighbor: &Neighbor,
        envelope: &Envelope,
        value: Value,
    ) -> Outcome {
        let candidates = self.db.lookup(envelope.dst);
        let Some(best) = bestpath(&candidates) else {
            router_log!(self, info, "no route to {}", envelope.dst;
                "peer" => neighbor.address.to_string()
            );
            return self.no_route(neighbor, envelope);
        };

        let Some(next) = self.fanout.get(best.peer) else {
            router_log!(self, error, "route {best} via unknown neighbor");
            return self.no_route(neighbor, envelope);
        };

        if !forwarding_allowed(neighbor.relation, next.relation) {
            router_log!(self, info, "refusing data to {}", envelope.dst;
                "peer" => neighbor.address.to_string(),
                "from_relation" => neighbor.relation.to_string(),
                "to_relation" => next.relation.to_string()
            );
            return self.no_route(neighbor, envelope);
        }

        router_log!(self, debug, "forwarding data to {}", envelope.dst;
            "peer" => neighbor.address.to_string(),
            "next_hop" => next.address.to_string()
        );
        Outcome {
            disposition: Disposition::Forwarded(next.address),
            egress: vec![Egress {
                to: next.address,
                message: Outbound::Forward(value),
            }],
        }
    }

    fn handle_dump(&self, neighbor: &Neighbor) -> Outcome {
        let entries: Vec<TableEntry> =
            self.db.entries().iter().map(TableEntry::from).collect();
        router_log!(self, debug, "dump";
            "peer" => neighbor.address.to_string(),
            "entries" => entries.len()
        );
        Outcome {
            disposition: Disposition::Replied,
            egress: vec![Egress {
                to: neighbor.address,
                message: neighbor.message(Body::Table(entries)).into(),
            }],
        }
    }

    fn no_route(&self, neighbor: &Neighbor, envelope: &Envelope) -> Outcome {
        Outcome {
            disposition: Disposition::NoRoute,
            egress: vec![Egress {
                to: neighbor.address,
                message: Message::new(
                    neighbor.local_address(),
                    envelope.src,
                    Body::NoRoute(envelope.into()),
                )
                .into(),
            }],
        }
    }
}
