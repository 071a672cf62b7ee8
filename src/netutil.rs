/*!
IP address helpers used at the CLI boundary.

The engine assumes the address it is handed is syntactically valid; this
module is where that is enforced, before any source is contacted.
*/

use std::net::IpAddr;
use std::str::FromStr;

use crate::errors::{IpEnrichError, Result};

/// Parse an IPv4 or IPv6 address, tolerating surrounding whitespace and
/// IPv6 brackets (`[::1]`).
pub fn parse_ip(s: &str) -> Result<IpAddr> {
    let trimmed = s.trim();
    let bare = trimmed
        .strip_prefix('[')
        .and_then(|rest| rest.strip_suffix(']'))
        .unwrap_or(trimmed);
    IpAddr::from_str(bare).map_err(|_| IpEnrichError::invalid_ip(s))
}

/// True for addresses no public intelligence source will know about
/// (private, loopback, link-local, unspecified, documentation, ...).
pub fn is_non_public(ip: IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => {
            v4.is_private()
                || v4.is_loopback()
                || v4.is_link_local()
                || v4.is_unspecified()
                || v4.is_broadcast()
                || v4.is_documentation()
                || (v4.octets()[0] == 100 && (64..=127).contains(&v4.octets()[1]))
        }
        IpAddr::V6(v6) => {
            let first = v6.segments()[0];
            v6.is_loopback()
                || v6.is_unspecified()
                || (first & 0xfe00) == 0xfc00
                || (first & 0xffc0) == 0xfe80
                || (first == 0x2001 && v6.segments()[1] == 0x0db8)
        }
    }
}
