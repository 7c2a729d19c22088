//! Contiguous address ranges.
//!
//! A range is written either as a CIDR prefix (`192.168.1.0/24`), as two
//! explicit bounds (`10.0.0.10-10.0.0.20`), or as a single address. Bounds
//! are kept as 128-bit integers so IPv4 and IPv6 share the arithmetic.

use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::str::FromStr;

use ipnet::IpNet;

use crate::error::RangeError;

/// IP address family of a range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Family {
    V4,
    V6,
}

impl Family {
    pub fn of(addr: &IpAddr) -> Self {
        match addr {
            IpAddr::V4(_) => Family::V4,
            IpAddr::V6(_) => Family::V6,
        }
    }
}

fn to_bits(addr: IpAddr) -> u128 {
    match addr {
        IpAddr::V4(v4) => u32::from(v4) as u128,
        IpAddr::V6(v6) => u128::from(v6),
    }
}

fn from_bits(family: Family, bits: u128) -> IpAddr {
    match family {
        Family::V4 => IpAddr::V4(Ipv4Addr::from(bits as u32)),
        Family::V6 => IpAddr::V6(Ipv6Addr::from(bits)),
    }
}

/// An immutable, non-empty block of addresses `start..=end`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AddressRange {
    family: Family,
    start: u128,
    end: u128,
}

impl AddressRange {
    /// Build a range from explicit bounds
    pub fn new(start: IpAddr, end: IpAddr) -> Result<Self, RangeError> {
        let text = format!("{}-{}", start, end);
        if Family::of(&start) != Family::of(&end) {
            return Err(RangeError::MixedFamilies(text));
        }
        let (lo, hi) = (to_bits(start), to_bits(end));
        if lo > hi {
            return Err(RangeError::Inverted(text));
        }
        Ok(AddressRange {
            family: Family::of(&start),
            start: lo,
            end: hi,
        })
    }

    /// Parse CIDR, `start-end`, or single-address notation
    pub fn parse(text: &str) -> Result<Self, RangeError> {
        let text = text.trim();
        let invalid = || RangeError::InvalidRangeFormat(text.to_string());

        if text.contains('/') {
            let net = IpNet::from_str(text).map_err(|_| invalid())?;
            return AddressRange::new(net.network(), net.broadcast());
        }

        if let Some((lo, hi)) = text.split_once('-') {
            let start = lo.trim().parse::<IpAddr>().map_err(|_| invalid())?;
            let end = hi.trim().parse::<IpAddr>().map_err(|_| invalid())?;
            return AddressRange::new(start, end);
        }

        let single = text.parse::<IpAddr>().map_err(|_| invalid())?;
        AddressRange::new(single, single)
    }

    pub fn family(&self) -> Family {
        self.family
    }

    pub fn first(&self) -> IpAddr {
        from_bits(self.family, self.start)
    }

    pub fn last(&self) -> IpAddr {
        from_bits(self.family, self.end)
    }

    /// Number of addresses in the range. Saturates for the full IPv6 space.
    pub fn size(&self) -> u128 {
        (self.end - self.start).saturating_add(1)
    }

    pub fn contains(&self, addr: &IpAddr) -> bool {
        if Family::of(addr) != self.family {
            return false;
        }
        let bits = to_bits(*addr);
        self.start <= bits && bits <= self.end
    }

    /// True if the two ranges share at least one address
    pub fn overlaps(&self, other: &AddressRange) -> bool {
        self.family == other.family && self.start <= other.end && other.start <= self.end
    }

    /// Ascending iteration over every address. Each call starts afresh.
    pub fn iter(&self) -> AddressIter {
        AddressIter {
            family: self.family,
            next: Some(self.start),
            end: self.end,
        }
    }
}

impl fmt::Display for AddressRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.start == self.end {
            write!(f, "{}", self.first())
        } else {
            write!(f, "{}-{}", self.first(), self.last())
        }
    }
}

impl FromStr for AddressRange {
    type Err = RangeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AddressRange::parse(s)
    }
}

impl<'a> IntoIterator for &'a AddressRange {
    type Item = IpAddr;
    type IntoIter = AddressIter;

    fn into_iter(self) -> AddressIter {
        self.iter()
    }
}

/// Iterator over an [`AddressRange`] in ascending order
#[derive(Debug, Clone)]
pub struct AddressIter {
    family: Family,
    next: Option<u128>,
    end: u128,
}

impl Iterator for AddressIter {
    type Item = IpAddr;

    fn next(&mut self) -> Option<IpAddr> {
        let current = self.next?;
        self.next = if current < self.end { Some(current + 1) } else { None };
        Some(from_bits(self.family, current))
    }
}
