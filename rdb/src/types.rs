// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use crate::error::Error;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt::{self, Display, Formatter};
use std::net::Ipv4Addr;
use std::str::FromStr;

#[derive(Debug, Copy, Clone, Eq, Hash, PartialEq)]
pub struct Prefix4 {
    pub value: Ipv4Addr,
    pub length: u8,
}

impl PartialOrd for Prefix4 {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for Prefix4 {
    fn cmp(&self, other: &Self) -> Ordering {
        if self.value != other.value {
            return self.value.cmp(&other.value);
        }
        self.length.cmp(&other.length)
    }
}

/// Returns the number of leading one bits in `netmask`. Masks that are not a
/// single contiguous run of ones followed by zeros are rejected.
///
/// ```
/// use rdb::types::prefix_length;
/// use std::net::Ipv4Addr;
/// assert_eq!(prefix_length(Ipv4Addr::new(255, 255, 254, 0)), Ok(23));
/// assert!(prefix_length(Ipv4Addr::new(255, 0, 255, 0)).is_err());
/// ```
pub fn prefix_length(netmask: Ipv4Addr) -> Result<u8, Error> {
    let bits = netmask.to_bits();
    let ones = bits.leading_ones();
    if bits.checked_shl(ones).unwrap_or(0) != 0 {
        return Err(Error::InvalidMask(netmask));
    }
    Ok(ones as u8)
}

fn mask(length: u8) -> u32 {
    match length {
        0 => 0,
        _ => (!0u32) << (32 - length),
    }
}

impl Prefix4 {
    const HOST_MASK: u8 = 32;

    /// Create a new `Prefix4` from an IP address and prefix length.
    /// The newly created `Prefix4` will have its host bits zeroed upon creation
    /// e.g.
    /// ```
    /// use rdb::types::Prefix4;
    /// use std::net::Ipv4Addr;
    /// use std::str::FromStr;
    /// let p4 = Prefix4::new(Ipv4Addr::from_str("10.0.0.10").unwrap(), 24);
    /// assert_eq!(p4.value, Ipv4Addr::from_str("10.0.0.0").unwrap());
    /// ```
    pub fn new(ip: Ipv4Addr, length: u8) -> Self {
        let mut new = Self { value: ip, length };
        new.unset_host_bits();
        new
    }

    /// Build a prefix from the network/netmask pair carried in update and
    /// revoke messages.
    pub fn from_netmask(
        network: Ipv4Addr,
        netmask: Ipv4Addr,
    ) -> Result<Self, Error> {
        Ok(Self::new(network, prefix_length(netmask)?))
    }

    pub fn netmask(&self) -> Ipv4Addr {
        Ipv4Addr::from_bits(mask(self.length))
    }

    pub fn host_bits_are_unset(&self) -> bool {
        let mask = mask(self.length);
        self.value.to_bits() & mask == self.value.to_bits()
    }

    pub fn unset_host_bits(&mut self) {
        self.value =
            Ipv4Addr::from_bits(self.value.to_bits() & mask(self.length))
    }

    /// Check if `addr` falls inside this prefix.
    pub fn contains(&self, addr: Ipv4Addr) -> bool {
        let mask = mask(self.length);
        addr.to_bits() & mask == self.value.to_bits() & mask
    }

    /// Check if this prefix is contained within another prefix.
    /// Returns true if this prefix is equal to or more specific than the other.
    pub fn within(&self, other: &Prefix4) -> bool {
        // A less specific prefix cannot be within a more specific one
        if self.length < other.length {
            return false;
        }
        other.contains(self.value)
    }

    /// The other half of the one-bit-shorter supernet this prefix belongs to.
    /// A /0 has no sibling.
    pub fn sibling(&self) -> Option<Prefix4> {
        if self.length == 0 {
            return None;
        }
        let bit = 1u32 << (Self::HOST_MASK - self.length);
        Some(Prefix4 {
            value: Ipv4Addr::from_bits(self.value.to_bits() ^ bit),
            length: self.length,
        })
    }

    /// True iff `self` and `other` are exactly the two halves of a common
    /// supernet.
    pub fn is_sibling(&self, other: &Prefix4) -> bool {
        self.sibling().is_some_and(|s| s == *other)
    }

    /// Merge two sibling prefixes into their supernet.
    pub fn supernet(&self, other: &Prefix4) -> Option<Prefix4> {
        if !self.is_sibling(other) {
            return None;
        }
        Some(Prefix4::new(self.value.min(other.value), self.length - 1))
    }

    /// Split a prefix into its two one-bit-longer halves, lower half first.
    /// A host prefix cannot be split.
    pub fn split(&self) -> Option<(Prefix4, Prefix4)> {
        if self.length >= Self::HOST_MASK {
            return None;
        }
        let length = self.length + 1;
        let bit = 1u32 << (Self::HOST_MASK - length);
        Some((
            Prefix4 {
                value: self.value,
                length,
            },
            Prefix4 {
                value: Ipv4Addr::from_bits(self.value.to_bits() | bit),
                length,
            },
        ))
    }
}

impl fmt::Display for Prefix4 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.value, self.length)
    }
}

impl FromStr for Prefix4 {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (value, length) = s
            .split_once('/')
            .ok_or(Error::MalformedPrefix(s.to_string()))?;

        let value: Ipv4Addr = value
            .parse()
            .map_err(|_| Error::MalformedPrefix(s.to_string()))?;
        let length: u8 = length
            .parse()
            .map_err(|_| Error::MalformedPrefix(s.to_string()))?;
        if length > Self::HOST_MASK {
            return Err(Error::InvalidPrefixLength(length));
        }

        Ok(Self::new(value, length))
    }
}

/// How a route was first learned. The declaration order is the preference
/// order used by bestpath: IGP beats EGP beats UNK.
#[derive(
    Debug,
    Copy,
    Clone,
    Serialize,
    Deserialize,
    Eq,
    PartialEq,
    Hash,
    PartialOrd,
    Ord,
)]
pub enum Origin {
    #[serde(rename = "IGP")]
    Igp,
    #[serde(rename = "EGP")]
    Egp,
    #[serde(rename = "UNK")]
    Unk,
}

impl Display for Origin {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Origin::Igp => write!(f, "IGP"),
            Origin::Egp => write!(f, "EGP"),
            Origin::Unk => write!(f, "UNK"),
        }
    }
}

/// The attributes of a route that take part in bestpath selection. Two routes
/// from the same peer may only be aggregated when these are identical.
#[derive(Debug, Clone, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct PathAttributes {
    pub origin: Origin,
    pub local_pref: u32,
    pub as_path: Vec<u32>,
    pub self_origin: bool,
}

/// An active forwarding table entry.
#[derive(Debug, Clone, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct Route {
    pub prefix: Prefix4,
    /// The neighbor this route was learned from. For aggregates this is the
    /// neighbor every constituent was learned from.
    pub peer: Ipv4Addr,
    pub attrs: PathAttributes,
}

impl Route {
    /// Routes can be coalesced when they were learned from the same neighbor
    /// with the same attributes.
    pub fn compatible(&self, other: &Route) -> bool {
        self.peer == other.peer && self.attrs == other.attrs
    }

    /// A copy of this route covering a different prefix.
    pub fn with_prefix(&self, prefix: Prefix4) -> Route {
        Route {
            prefix,
            peer: self.peer,
            attrs: self.attrs.clone(),
        }
    }
}

impl Display for Route {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[prefix={}, peer={}, local_pref={}, self_origin={}, \
             as_path={:?}, origin={}]",
            self.prefix,
            self.peer,
            self.attrs.local_pref,
            self.attrs.self_origin,
            self.attrs.as_path,
            self.attrs.origin,
        )
    }
}

/// A single accepted update, as recorded in the advertisement log.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Advertisement {
    pub peer: Ipv4Addr,
    pub prefix: Prefix4,
    pub attrs: PathAttributes,
    pub received: DateTime<Utc>,
}

impl Advertisement {
    pub fn route(&self) -> Route {
        Route {
            prefix: self.prefix,
            peer: self.peer,
            attrs: self.attrs.clone(),
        }
    }
}
