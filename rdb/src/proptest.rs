// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Property-based tests for prefix arithmetic, bestpath selection and
//! aggregation using proptest.

#[cfg(test)]
mod proptest {
    use crate::aggregate::recompute;
    use crate::bestpath::bestpath;
    use crate::db::{selected, Db, Table};
    use crate::types::{Origin, PathAttributes, Prefix4, Route};
    use proptest::prelude::*;
    use std::collections::BTreeSet;
    use std::net::Ipv4Addr;

    fn ipv4_prefix_strategy() -> impl Strategy<Value = Prefix4> {
        (any::<u32>(), 0u8..=32u8).prop_map(|(addr_bits, length)| {
            Prefix4::new(Ipv4Addr::from(addr_bits), length)
        })
    }

    fn origin_strategy() -> impl Strategy<Value = Origin> {
        prop_oneof![Just(Origin::Igp), Just(Origin::Egp), Just(Origin::Unk)]
    }

    // Small attribute and peer spaces so that ties and aggregation
    // opportunities are common.
    fn attrs_strategy() -> impl Strategy<Value = PathAttributes> {
        (
            origin_strategy(),
            prop_oneof![Just(100u32), Just(150u32)],
            prop::collection::vec(1u32..4, 0..3),
            any::<bool>(),
        )
            .prop_map(|(origin, local_pref, as_path, self_origin)| {
                PathAttributes {
                    origin,
                    local_pref,
                    as_path,
                    self_origin,
                }
            })
    }

    fn peer_strategy() -> impl Strategy<Value = Ipv4Addr> {
        (2u8..5).prop_map(|n| Ipv4Addr::new(192, 168, n, 2))
    }

    // Prefixes inside 10.0.0.0/21, /22 through /24.
    fn clustered_prefix_strategy() -> impl Strategy<Value = Prefix4> {
        (0u32..8, 22u8..=24u8).prop_map(|(third, length)| {
            Prefix4::new(Ipv4Addr::new(10, 0, third as u8, 0), length)
        })
    }

    fn route_strategy() -> impl Strategy<Value = Route> {
        (clustered_prefix_strategy(), peer_strategy(), attrs_strategy())
            .prop_map(|(prefix, peer, attrs)| Route {
                prefix,
                peer,
                attrs,
            })
    }

    #[derive(Debug, Clone)]
    enum Op {
        Advertise(Route),
        Withdraw(Ipv4Addr, Prefix4),
    }

    fn op_strategy() -> impl Strategy<Value = Op> {
        prop_oneof![
            3 => route_strategy().prop_map(Op::Advertise),
            1 => (peer_strategy(), clustered_prefix_strategy())
                .prop_map(|(peer, prefix)| Op::Withdraw(peer, prefix)),
        ]
    }

    fn test_db() -> Db {
        Db::new(slog::Logger::root(slog::Discard, slog::o!()))
    }

    proptest! {
        /// Property: host bits are always unset after construction
        #[test]
        fn prop_host_bits_always_unset(prefix in ipv4_prefix_strategy()) {
            prop_assert!(
                prefix.host_bits_are_unset(),
                "prefix {prefix} should have host bits unset"
            );
        }

        /// Property: a prefix contains its own network address and is
        /// within itself
        #[test]
        fn prop_contains_self(prefix in ipv4_prefix_strategy()) {
            prop_assert!(prefix.contains(prefix.value));
            prop_assert!(prefix.within(&prefix));
        }

        /// Property: netmask and prefix length are inverses
        #[test]
        fn prop_netmask_round_trip(prefix in ipv4_prefix_strategy()) {
            let rebuilt = Prefix4::from_netmask(prefix.value, prefix.netmask());
            prop_assert_eq!(rebuilt, Ok(prefix));
        }

        /// Property: splitting a supernet and merging the halves returns the
        /// original prefix, and the halves are each other's siblings
        #[test]
        fn prop_split_supernet_round_trip(prefix in ipv4_prefix_strategy()) {
            prop_assume!(prefix.length < 32);
            let (low, high) = prefix.split().unwrap();
            prop_assert!(low.is_sibling(&high));
            prop_assert!(high.is_sibling(&low));
            prop_assert_eq!(low.supernet(&high), Some(prefix));
            prop_assert_eq!(high.supernet(&low), Some(prefix));
            prop_assert_eq!(prefix.split(), Some((low, high)));
        }

        /// Property: merging siblings and splitting the supernet reproduces
        /// both original prefixes
        #[test]
        fn prop_supernet_split_round_trip(prefix in ipv4_prefix_strategy()) {
            prop_assume!(prefix.length > 0);
            let sibling = prefix.sibling().unwrap();
            let supernet = prefix.supernet(&sibling).unwrap();
            let (low, high) = supernet.split().unwrap();
            let original: BTreeSet<Prefix4> = [prefix, sibling].into();
            let restored: BTreeSet<Prefix4> = [low, high].into();
            prop_assert_eq!(original, restored);
        }

        /// Property: bestpath does not depend on the order of candidates
        #[test]
        fn prop_bestpath_order_independent(
            (routes, shuffled) in prop::collection::vec(route_strategy(), 1..8)
                .prop_flat_map(|routes| {
                    let shuffled = Just(routes.clone()).prop_shuffle();
                    (Just(routes), shuffled)
                })
        ) {
            let best = bestpath(&routes);
            prop_assert!(best.is_some());
            prop_assert_eq!(best.clone(), bestpath(&routes));
            prop_assert_eq!(best, bestpath(&shuffled));
        }

        /// Property: running the aggregator on its own output changes nothing
        #[test]
        fn prop_recompute_idempotent(
            routes in prop::collection::vec(route_strategy(), 0..16)
        ) {
            let mut table: Table =
                routes.into_iter().map(|r| (r.prefix, r)).collect();
            recompute(&mut table);
            let once = table.clone();
            prop_assert_eq!(recompute(&mut table), 0);
            prop_assert_eq!(table, once);
        }

        /// Property: the incrementally maintained table always equals the
        /// table built from scratch out of the surviving advertisements
        #[test]
        fn prop_incremental_matches_rebuild(
            ops in prop::collection::vec(op_strategy(), 1..24)
        ) {
            let mut db = test_db();
            for op in ops {
                match op {
                    Op::Advertise(r) => {
                        db.record_advertisement(r.peer, r.prefix, r.attrs);
                    }
                    Op::Withdraw(peer, prefix) => {
                        db.record_withdrawal(peer, &[prefix]);
                    }
                }
            }

            let updates = db.advertisements();
            let mut rebuilt: Table = updates
                .iter()
                .map(|a| a.prefix)
                .collect::<BTreeSet<_>>()
                .into_iter()
                .filter_map(|prefix| {
                    selected(&updates, prefix).map(|r| (prefix, r))
                })
                .collect();
            recompute(&mut rebuilt);

            prop_assert_eq!(db.table(), &rebuilt);
        }
    }
}
