use std::fmt::{self, Display, Formatter};
use std::net::{IpAddr, SocketAddr};

use serde::{Deserialize, Serialize};

/// Server-observed network origin of a request, held in canonical form.
///
/// The same origin can reach us spelled two ways (`1.2.3.4` and
/// `::ffff:1.2.3.4` when the listener is dual-stack), so IPv4-mapped
/// IPv6 addresses are collapsed to plain IPv4 before any comparison.
#[derive(Clone, Debug, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub struct OriginFingerprint(String);

impl OriginFingerprint {
    pub fn from_ip(ip: IpAddr) -> OriginFingerprint {
        let canonical = match ip {
            IpAddr::V6(v6) => match v6.to_ipv4_mapped() {
                Some(v4) => IpAddr::V4(v4),
                None => IpAddr::V6(v6),
            },
            v4 => v4,
        };
        OriginFingerprint(canonical.to_string())
    }

    pub fn from_addr(addr: SocketAddr) -> OriginFingerprint {
        Self::from_ip(addr.ip())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for OriginFingerprint {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mapped_v6_collapses_to_v4() {
        let plain = OriginFingerprint::from_ip("1.2.3.4".parse().unwrap());
        let mapped = OriginFingerprint::from_ip("::ffff:1.2.3.4".parse().unwrap());
        assert_eq!(plain, mapped);
        assert_eq!(mapped.as_str(), "1.2.3.4");
    }

    #[test]
    fn native_v6_is_untouched() {
        let origin = OriginFingerprint::from_ip("2001:db8::1".parse().unwrap());
        assert_eq!(origin.as_str(), "2001:db8::1");
    }

    #[test]
    fn socket_addr_port_is_ignored() {
        let a = OriginFingerprint::from_addr("10.0.0.1:1234".parse().unwrap());
        let b = OriginFingerprint::from_addr("10.0.0.1:9999".parse().unwrap());
        assert_eq!(a, b);
    }
}
