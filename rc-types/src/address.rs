//! Opaque node addresses.
//!
//! Cryptographic authentication of peer identity is out of scope (assumed
//! provided by the transport), so a node address is a plain string handed to
//! us by whatever transport implementation is in use -- a multiaddr, a
//! hostname, or a test fixture name. `rc-types` never inspects its contents.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifies a node on the experiment network.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeAddress(String);

impl NodeAddress {
    pub fn new(addr: impl Into<String>) -> Self {
        Self(addr.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Last `n` characters of the address, for compact logging. Mirrors the
    /// reference implementation's `addressToPrint`.
    pub fn printable(&self, n: usize) -> &str {
        if n == 0 || n >= self.0.len() {
            &self.0
        } else {
            &self.0[self.0.len() - n..]
        }
    }
}

impl From<&str> for NodeAddress {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for NodeAddress {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl fmt::Display for NodeAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn printable_truncates_to_suffix() {
        let addr = NodeAddress::new("/ip4/127.0.0.1/tcp/4001/p2p/QmAbCdEf12345");
        assert_eq!(addr.printable(5), "12345");
    }

    #[test]
    fn printable_returns_whole_address_when_shorter_than_n() {
        let addr = NodeAddress::new("abc");
        assert_eq!(addr.printable(5), "abc");
    }

    #[test]
    fn printable_zero_returns_whole_address() {
        let addr = NodeAddress::new("abcdef");
        assert_eq!(addr.printable(0), "abcdef");
    }
}
