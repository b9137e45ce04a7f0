//! Client Address Resolver
//!
//! Picks the client address candidates out of request metadata.
//!
//! The forwarding header is trusted as-is: this stage must sit behind a
//! proxy that overwrites it. A client that can reach this stage directly
//! can present any address it likes.

use crate::domain::entities::RequestMeta;
use std::borrow::Cow;

pub struct ClientAddressResolver;

impl ClientAddressResolver {
    /// Ordered candidate addresses for a request.
    ///
    /// Each forwarding-header line contributes its leftmost entry (the
    /// originating client). Only when no forwarding header is present does
    /// the connection's remote address become the candidate.
    pub fn candidates(meta: &RequestMeta) -> impl Iterator<Item = Cow<'_, str>> + '_ {
        let forwarded = meta
            .forwarded_for
            .iter()
            .map(|value| Cow::Borrowed(Self::leftmost(value)));

        let remote = if meta.forwarded_for.is_empty() {
            meta.remote_addr
                .map(|addr| Cow::Owned(addr.ip().to_string()))
        } else {
            None
        };

        forwarded.chain(remote)
    }

    /// First comma-separated entry of a forwarding header value.
    pub fn leftmost(value: &str) -> &str {
        value.split(',').next().unwrap_or_default().trim()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::SocketAddr;

    fn collect(meta: &RequestMeta) -> Vec<String> {
        ClientAddressResolver::candidates(meta)
            .map(|c| c.into_owned())
            .collect()
    }

    #[test]
    fn test_header_takes_precedence_over_remote() {
        let remote: SocketAddr = "10.0.0.2:5555".parse().unwrap();
        let meta = RequestMeta::new(vec!["82.220.110.18".to_string()], Some(remote));

        assert_eq!(collect(&meta), vec!["82.220.110.18"]);
    }

    #[test]
    fn test_leftmost_entry_is_client() {
        let meta = RequestMeta::new(
            vec!["99.220.109.148, 10.0.0.1, 172.16.0.9".to_string()],
            None,
        );

        assert_eq!(collect(&meta), vec!["99.220.109.148"]);
    }

    #[test]
    fn test_one_candidate_per_header_line() {
        let meta = RequestMeta::new(
            vec!["82.220.110.18".to_string(), " 99.220.109.148 ,1.1.1.1".to_string()],
            None,
        );

        assert_eq!(collect(&meta), vec!["82.220.110.18", "99.220.109.148"]);
    }

    #[test]
    fn test_remote_addr_fallback() {
        let remote: SocketAddr = "[2001:db8::1]:443".parse().unwrap();
        let meta = RequestMeta::new(Vec::new(), Some(remote));

        assert_eq!(collect(&meta), vec!["2001:db8::1"]);
    }

    #[test]
    fn test_no_metadata_yields_nothing() {
        let meta = RequestMeta::default();
        assert!(collect(&meta).is_empty());
    }

    #[test]
    fn test_empty_header_value_is_kept() {
        let meta = RequestMeta::new(vec!["".to_string()], None);
        assert_eq!(collect(&meta), vec![""]);
    }

    #[test]
    fn test_leftmost() {
        assert_eq!(ClientAddressResolver::leftmost("a, b, c"), "a");
        assert_eq!(ClientAddressResolver::leftmost("  a  "), "a");
        assert_eq!(ClientAddressResolver::leftmost(""), "");
        assert_eq!(ClientAddressResolver::leftmost(",b"), "");
    }
}
