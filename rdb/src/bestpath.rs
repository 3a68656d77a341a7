// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use crate::types::Route;
use itertools::Itertools;

/// The bestpath algorithm chooses the single best route from a set of
/// candidates. It performs path filtering in the following ordered sequence
/// of operations, each step keeping only the candidates that tie on that
/// criterion.
///
/// - filter to the routes with the largest local preference
/// - filter to self originated routes, if there are any
/// - filter to the routes with the smallest AS path length
/// - filter to the routes with the best origin (IGP, then EGP, then UNK)
/// - filter to the routes learned from the lowest peer address
///
/// Routes that survive all of the above were learned from the same peer. The
/// most specific prefix wins, and whatever still ties is settled by the total
/// order on `Route`, so the result never depends on the order of
/// `candidates`.
pub fn bestpath(candidates: &[Route]) -> Option<Route> {
    // Short-circuit: if there's only 1 candidate, then it is the best
    if candidates.len() <= 1 {
        return candidates.first().cloned();
    }

    // Filter down to paths with the highest local preference
    let candidates = candidates
        .iter()
        .max_set_by_key(|route| route.attrs.local_pref);

    // Filter down to self originated paths. `true` orders above `false`.
    let candidates = candidates
        .into_iter()
        .max_set_by_key(|route| route.attrs.self_origin);

    // Filter down to paths with the shortest AS-Path length
    let candidates = candidates
        .into_iter()
        .min_set_by_key(|route| route.attrs.as_path.len());

    // Filter down to paths with the best origin. `Origin` is declared in
    // preference order.
    let candidates = candidates
        .into_iter()
        .min_set_by_key(|route| route.attrs.origin);

    // Filter down to paths from the lowest peer address
    let candidates = candidates.into_iter().min_set_by_key(|route| route.peer);

    candidates
        .into_iter()
        .max_set_by_key(|route| route.prefix.length)
        .into_iter()
        .min()
        .cloned()
}

#[cfg(test)]
mod test {
    use super::bestpath;
    use crate::types::{Origin, PathAttributes, Prefix4, Route};
    use pretty_assertions::assert_eq;
    use std::net::Ipv4Addr;

    fn route(peer: [u8; 4], local_pref: u32, as_path: Vec<u32>) -> Route {
        Route {
            prefix: "198.51.100.0/24".parse().unwrap(),
            peer: Ipv4Addr::from(peer),
            attrs: PathAttributes {
                origin: Origin::Egp,
                local_pref,
                as_path,
                self_origin: false,
            },
        }
    }

    #[test]
    fn test_bestpath_empty_and_single() {
        assert_eq!(bestpath(&[]), None);
        let r = route([203, 0, 113, 1], 100, vec![1, 2]);
        assert_eq!(bestpath(&[r.clone()]), Some(r));
    }

    #[test]
    fn test_bestpath_local_pref_first() {
        let low = route([203, 0, 113, 1], 100, vec![1]);
        // longer path and a higher peer address, but higher local pref
        let high = route([203, 0, 113, 2], 150, vec![1, 2, 3, 4]);
        assert_eq!(bestpath(&[low, high.clone()]), Some(high));
    }

    #[test]
    fn test_bestpath_self_origin() {
        let a = route([203, 0, 113, 1], 100, vec![1]);
        let mut b = route([203, 0, 113, 2], 100, vec![1, 2, 3]);
        b.attrs.self_origin = true;
        assert_eq!(bestpath(&[a, b.clone()]), Some(b));
    }

    #[test]
    fn test_bestpath_as_path_length() {
        let a = route([203, 0, 113, 1], 100, vec![1, 2, 3]);
        let b = route([203, 0, 113, 2], 100, vec![4, 5]);
        let c = route([203, 0, 113, 3], 100, vec![]);
        assert_eq!(bestpath(&[a.clone(), b.clone()]), Some(b.clone()));
        // an empty path is the shortest path
        assert_eq!(bestpath(&[a, b, c.clone()]), Some(c));
    }

    #[test]
    fn test_bestpath_origin() {
        let mut unk = route([203, 0, 113, 1], 100, vec![1]);
        unk.attrs.origin = Origin::Unk;
        let egp = route([203, 0, 113, 2], 100, vec![2]);
        let mut igp = route([203, 0, 113, 3], 100, vec![3]);
        igp.attrs.origin = Origin::Igp;

        assert_eq!(bestpath(&[unk.clone(), egp.clone()]), Some(egp.clone()));
        assert_eq!(bestpath(&[unk, egp, igp.clone()]), Some(igp));
    }

    #[test]
    fn test_bestpath_lowest_peer() {
        let a = route([203, 0, 113, 9], 100, vec![1]);
        let b = route([203, 0, 113, 10], 100, vec![2]);
        let c = route([10, 0, 0, 2], 100, vec![3]);
        // numeric comparison, not string comparison
        assert_eq!(bestpath(&[b.clone(), a.clone()]), Some(a.clone()));
        assert_eq!(bestpath(&[a, b, c.clone()]), Some(c));
    }

    #[test]
    fn test_bestpath_same_peer_prefers_specific() {
        let wide = route([203, 0, 113, 1], 100, vec![1]);
        let narrow = wide.with_prefix(Prefix4::new(
            Ipv4Addr::new(198, 51, 100, 128),
            25,
        ));
        assert_eq!(
            bestpath(&[wide.clone(), narrow.clone()]),
            Some(narrow.clone())
        );
        assert_eq!(bestpath(&[narrow.clone(), wide]), Some(narrow));
    }

    #[test]
    fn test_bestpath_full_tie_is_order_independent() {
        // same peer and prefix, paths of equal length
        let a = route([203, 0, 113, 1], 100, vec![2, 2]);
        let b = route([203, 0, 113, 1], 100, vec![3, 3]);
        assert_eq!(bestpath(&[a.clone(), b.clone()]), Some(a.clone()));
        assert_eq!(bestpath(&[b, a.clone()]), Some(a));
    }
}
