// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The routing database (rdb).
//!
//! The routing database holds two things. The advertisement log records every
//! accepted update in arrival order and is only ever appended to, except
//! that a revoke prunes the records it withdraws. The forwarding table is
//! derived from the log: for every advertised prefix it holds the bestpath
//! winner among the neighbors currently advertising exactly that prefix, with
//! compatible sibling routes coalesced into aggregates.
//!
//! All mutation funnels through `record_advertisement` and
//! `record_withdrawal`, which keep the table at its aggregation fixed point.
use crate::aggregate::{disaggregate, recompute};
use crate::bestpath::bestpath;
use crate::log::rdb_log;
use crate::types::*;
use chrono::Utc;
use slog::Logger;
use std::collections::{BTreeMap, BTreeSet};
use std::net::Ipv4Addr;

/// The forwarding table. At most one active route per prefix.
pub type Table = BTreeMap<Prefix4, Route>;

pub struct Db {
    /// Accepted advertisements in the order they were received.
    updates: Vec<Advertisement>,

    /// Active routes derived from `updates`.
    table: Table,

    log: Logger,
}

/// The current advertisement of each (peer, prefix) pair, most recent first.
pub(crate) fn live(
    updates: &[Advertisement],
) -> impl Iterator<Item = &Advertisement> {
    let mut seen = BTreeSet::new();
    updates
        .iter()
        .rev()
        .filter(move |a| seen.insert((a.peer, a.prefix)))
}

/// The bestpath winner among the live advertisements for exactly `prefix`.
pub(crate) fn selected(
    updates: &[Advertisement],
    prefix: Prefix4,
) -> Option<Route> {
    let candidates: Vec<Route> = live(updates)
        .filter(|a| a.prefix == prefix)
        .map(Advertisement::route)
        .collect();
    bestpath(&candidates)
}

impl Db {
    pub fn new(log: Logger) -> Self {
        Self {
            updates: Vec::new(),
            table: Table::new(),
            log,
        }
    }

    /// Record an advertisement of `prefix` by `peer` and bring the forwarding
    /// table up to date. Returns false if the advertisement repeats the
    /// current one for this peer and prefix, in which case nothing changes.
    pub fn record_advertisement(
        &mut self,
        peer: Ipv4Addr,
        prefix: Prefix4,
        attrs: PathAttributes,
    ) -> bool {
        if self.current(peer, prefix).is_some_and(|a| a.attrs == attrs) {
            rdb_log!(self, debug, "duplicate advertisement";
                "peer" => peer.to_string(),
                "prefix" => prefix.to_string()
            );
            return false;
        }

        if let Some(region) =
            disaggregate(&mut self.table, prefix, &self.updates)
        {
            rdb_log!(self, debug, "unwound {region} for update";
                "prefix" => prefix.to_string()
            );
        }

        let received = Utc::now();
        self.updates.push(Advertisement {
            peer,
            prefix,
            attrs,
            received,
        });
        self.reselect(prefix);
        let merged = recompute(&mut self.table);

        rdb_log!(self, debug, "recorded advertisement";
            "peer" => peer.to_string(),
            "prefix" => prefix.to_string(),
            "received" => received.to_rfc3339(),
            "merged" => merged
        );
        true
    }

    /// Withdraw `prefixes` previously advertised by `peer`. Prefixes the peer
    /// is not currently advertising are ignored. Returns the prefixes that
    /// were actually withdrawn.
    pub fn record_withdrawal(
        &mut self,
        peer: Ipv4Addr,
        prefixes: &[Prefix4],
    ) -> Vec<Prefix4> {
        let mut withdrawn = Vec::new();

        for prefix in prefixes {
            let Some(age) = self
                .current(peer, *prefix)
                .map(|a| Utc::now().signed_duration_since(a.received))
            else {
                rdb_log!(self, debug, "ignoring withdrawal of unknown route";
                    "peer" => peer.to_string(),
                    "prefix" => prefix.to_string()
                );
                continue;
            };

            // Unwind while the log still describes the aggregate.
            if let Some(region) =
                disaggregate(&mut self.table, *prefix, &self.updates)
            {
                rdb_log!(self, debug, "unwound {region} for withdrawal";
                    "prefix" => prefix.to_string()
                );
            }

            self.updates
                .retain(|a| !(a.peer == peer && a.prefix == *prefix));
            self.reselect(*prefix);
            rdb_log!(self, debug, "withdrew route";
                "peer" => peer.to_string(),
                "prefix" => prefix.to_string(),
                "advertised_for_ms" => age.num_milliseconds()
            );
            withdrawn.push(*prefix);
        }

        if !withdrawn.is_empty() {
            let merged = recompute(&mut self.table);
            rdb_log!(self, debug, "recorded withdrawal";
                "peer" => peer.to_string(),
                "withdrawn" => withdrawn.len(),
                "merged" => merged
            );
        }

        withdrawn
    }

    /// All active routes whose prefix contains `addr`.
    pub fn lookup(&self, addr: Ipv4Addr) -> Vec<Route> {
        self.table
            .values()
            .filter(|route| route.prefix.contains(addr))
            .cloned()
            .collect()
    }

    /// A snapshot of the forwarding table, ordered by prefix.
    pub fn entries(&self) -> Vec<Route> {
        self.table.values().cloned().collect()
    }

    pub fn table(&self) -> &Table {
        &self.table
    }

    /// The live advertisement log in arrival order.
    pub fn advertisements(&self) -> Vec<Advertisement> {
        let mut result: Vec<Advertisement> =
            live(&self.updates).cloned().collect();
        result.reverse();
        result
    }

    fn current(
        &self,
        peer: Ipv4Addr,
        prefix: Prefix4,
    ) -> Option<&Advertisement> {
        self.updates
            .iter()
            .rev()
            .find(|a| a.peer == peer && a.prefix == prefix)
    }

    fn reselect(&mut self, prefix: Prefix4) {
        match selected(&self.updates, prefix) {
            Some(route) => {
                self.table.insert(prefix, route);
            }
            None => {
                self.table.remove(&prefix);
            }
        }
    }
}
