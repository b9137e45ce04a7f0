//! Address Classifier
//!
//! Parses a raw client address and decides whether it is local or public.
//! Pure, deterministic, no I/O.

use crate::domain::value_objects::AddressClass;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

/// Error for a client address that is not an IP literal.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("malformed client address: {raw:?}")]
pub struct AddressError {
    pub raw: String,
}

pub struct AddressClassifier;

impl AddressClassifier {
    /// Classify a raw address string.
    ///
    /// Malformed input is `AddressClass::Invalid`; it is never an error that
    /// escapes the classifier.
    pub fn classify(raw: &str) -> AddressClass {
        match Self::parse(raw) {
            Ok(ip) if Self::is_private(&ip) => AddressClass::Private(ip),
            Ok(ip) => AddressClass::Public(ip),
            Err(_) => AddressClass::Invalid,
        }
    }

    /// Parse an IPv4 or IPv6 literal. Surrounding whitespace is tolerated,
    /// ports and brackets are not.
    pub fn parse(raw: &str) -> Result<IpAddr, AddressError> {
        raw.trim().parse::<IpAddr>().map_err(|_| AddressError {
            raw: raw.to_string(),
        })
    }

    /// Loopback, link-local, or private-use range, for either family.
    pub fn is_private(ip: &IpAddr) -> bool {
        match ip {
            IpAddr::V4(v4) => Self::is_private_v4(v4),
            IpAddr::V6(v6) => match v6.to_ipv4_mapped() {
                Some(v4) => Self::is_private_v4(&v4),
                None => Self::is_private_v6(v6),
            },
        }
    }

    fn is_private_v4(ip: &Ipv4Addr) -> bool {
        let [a, b, c, _] = ip.octets();
        ip.is_loopback()            // 127.0.0.0/8
            || ip.is_private()      // 10/8, 172.16/12, 192.168/16
            || ip.is_link_local()   // 169.254/16
            || (a == 224 && b == 0 && c == 0) // link-local multicast
    }

    fn is_private_v6(ip: &Ipv6Addr) -> bool {
        let first = ip.segments()[0];
        ip.is_loopback()
            || (first & 0xfe00) == 0xfc00 // unique local fc00::/7
            || (first & 0xffc0) == 0xfe80 // link-local unicast fe80::/10
            || (first & 0xff0f) == 0xff02 // link-local multicast
    }
}
