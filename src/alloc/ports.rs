//! Port sets used for address-sharing conflict detection.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Transport protocol of a service port
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "UPPERCASE")]
pub enum Protocol {
    #[default]
    Tcp,
    Udp,
    Sctp,
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Protocol::Tcp => write!(f, "TCP"),
            Protocol::Udp => write!(f, "UDP"),
            Protocol::Sctp => write!(f, "SCTP"),
        }
    }
}

/// One exposed (protocol, port) pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Port {
    pub protocol: Protocol,
    pub port: u16,
}

impl Port {
    pub fn new(protocol: Protocol, port: u16) -> Self {
        Port { protocol, port }
    }

    pub fn tcp(port: u16) -> Self {
        Port::new(Protocol::Tcp, port)
    }

    pub fn udp(port: u16) -> Self {
        Port::new(Protocol::Udp, port)
    }
}

impl fmt::Display for Port {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.protocol, self.port)
    }
}

/// The ports a service exposes on its address.
///
/// An empty set stands for "all ports" and conflicts with every other set,
/// including another empty one.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PortSet(BTreeSet<Port>);

impl PortSet {
    /// The "all ports" set
    pub fn all() -> Self {
        PortSet(BTreeSet::new())
    }

    pub fn is_all(&self) -> bool {
        self.0.is_empty()
    }

    pub fn conflicts_with(&self, other: &PortSet) -> bool {
        if self.is_all() || other.is_all() {
            return true;
        }
        !self.0.is_disjoint(&other.0)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Port> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

impl FromIterator<Port> for PortSet {
    fn from_iter<I: IntoIterator<Item = Port>>(iter: I) -> Self {
        PortSet(iter.into_iter().collect())
    }
}

impl fmt::Display for PortSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_all() {
            return write!(f, "*");
        }
        let parts: Vec<String> = self.0.iter().map(|p| p.to_string()).collect();
        write!(f, "{}", parts.join(","))
    }
}
