// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Route aggregation for the forwarding table.
//!
//! Two active routes are coalesced into their supernet when they are sibling
//! prefixes learned from the same peer with identical path attributes. The
//! supernet entry stands in for both halves. Aggregates are never stored in
//! the advertisement log, so the log remains the single source of truth for
//! unwinding them again.

use crate::db::{selected, Table};
use crate::types::{Advertisement, Prefix4, Route};
use std::collections::BTreeSet;

/// Coalesce sibling routes until no further merge applies and return the
/// number of merges performed.
///
/// A pair is only merged into a supernet whose prefix is not already present
/// in the table, so a more general route learned independently is never
/// shadowed. Whether a given pair merges depends only on the pair and the
/// supernet slot, which makes the final table independent of the order in
/// which merges are attempted. Running this on a table it has already
/// processed is a no-op.
pub fn recompute(table: &mut Table) -> usize {
    let mut merged = 0;
    loop {
        let merges: Vec<(Prefix4, Prefix4, Route)> = table
            .values()
            .filter_map(|route| {
                let sibling = route.prefix.sibling()?;
                // consider each pair once, from its lower half
                if sibling.value < route.prefix.value {
                    return None;
                }
                let other = table.get(&sibling)?;
                if !route.compatible(other) {
                    return None;
                }
                let supernet = route.prefix.supernet(&sibling)?;
                if table.contains_key(&supernet) {
                    return None;
                }
                Some((route.prefix, sibling, route.with_prefix(supernet)))
            })
            .collect();

        if merges.is_empty() {
            return merged;
        }

        for (low, high, aggregate) in merges {
            table.remove(&low);
            table.remove(&high);
            table.insert(aggregate.prefix, aggregate);
            merged += 1;
        }
    }
}

/// True if `route` was synthesized by [`recompute`] rather than selected
/// from the advertisement log for its exact prefix.
pub fn is_aggregate(updates: &[Advertisement], route: &Route) -> bool {
    selected(updates, route.prefix).as_ref() != Some(route)
}

/// Unwind the aggregate covering `target`, if there is one, so that the
/// routes it stood in for are individually present in the table again.
///
/// The covering supernet is split all the way back down to its constituents,
/// which are reconstructed from the advertisement log rather than derived
/// from the aggregate itself. This also unwinds supernets built from other
/// supernets. Callers must invoke this before changing the log for `target`
/// and run [`recompute`] afterwards. Returns the prefix of the aggregate that
/// was unwound.
pub fn disaggregate(
    table: &mut Table,
    target: Prefix4,
    updates: &[Advertisement],
) -> Option<Prefix4> {
    let region = table
        .values()
        .filter(|route| target.within(&route.prefix))
        .filter(|route| is_aggregate(updates, route))
        .map(|route| route.prefix)
        .min_by_key(|prefix| prefix.length)?;

    // Everything at or below the aggregate is rebuilt from the log. Entries
    // learned independently inside the region are rebuilt unchanged.
    table.retain(|prefix, _| !prefix.within(&region));

    let prefixes: BTreeSet<Prefix4> = updates
        .iter()
        .map(|a| a.prefix)
        .filter(|prefix| prefix.within(&region))
        .collect();

    for prefix in prefixes {
        if let Some(route) = selected(updates, prefix) {
            table.insert(prefix, route);
        }
    }

    Some(region)
}
