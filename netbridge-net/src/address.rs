//! Resolved endpoints and captured peer addresses.

use std::fmt::{self, Display, Formatter};
use std::net::SocketAddr;

use socket2::{Domain, Protocol, SockAddr};

use crate::config::{AddressFamily, TransportMode};
use crate::error::FormatError;

/// A resolved address usable to create, bind or connect a socket.
///
/// Produced by [`Resolver::resolve`](crate::Resolver::resolve); consumers take candidates in the
/// order the resolver returned them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Endpoint {
    mode: TransportMode,
    address: SocketAddr,
}

impl Endpoint {
    pub(crate) fn new(mode: TransportMode, address: SocketAddr) -> Self {
        Self { mode, address }
    }

    /// Family of the address.
    pub fn family(&self) -> AddressFamily {
        AddressFamily::of(&self.address)
    }

    /// Transport mode the endpoint was resolved for.
    pub fn mode(&self) -> TransportMode {
        self.mode
    }

    /// Protocol implied by the transport mode.
    pub fn protocol(&self) -> Protocol {
        self.mode.protocol()
    }

    /// The resolved IP address and port.
    pub fn socket_addr(&self) -> SocketAddr {
        self.address
    }

    /// The raw OS socket address.
    pub fn sock_addr(&self) -> SockAddr {
        self.address.into()
    }
}

impl Display for Endpoint {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.mode, self.address)
    }
}

/// Address of the remote side of a received datagram or an accepted connection.
///
/// Holds the raw OS socket address as filled in by the kernel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeerAddress {
    raw: SockAddr,
}

impl PeerAddress {
    /// Renders the IP part in its conventional text form.
    ///
    /// Dispatches on the family tag of the raw address: dotted quad for IPv4, RFC 5952 colon-hex
    /// for IPv6.
    pub fn format(&self) -> Result<String, FormatError> {
        let domain = self.raw.domain();
        let ip = if domain == Domain::IPV4 {
            self.raw
                .as_socket_ipv4()
                .map(|address| address.ip().to_string())
        } else if domain == Domain::IPV6 {
            self.raw
                .as_socket_ipv6()
                .map(|address| address.ip().to_string())
        } else {
            None
        };

        ip.ok_or_else(|| FormatError::UnsupportedFamily(i32::from(self.raw.family())))
    }

    /// The address as an IP socket address, if it is one.
    pub fn socket_addr(&self) -> Option<SocketAddr> {
        self.raw.as_socket()
    }

    /// The port, if the address is an IP socket address.
    pub fn port(&self) -> Option<u16> {
        self.socket_addr().map(|address| address.port())
    }
}

impl From<SockAddr> for PeerAddress {
    fn from(raw: SockAddr) -> Self {
        Self { raw }
    }
}

impl From<SocketAddr> for PeerAddress {
    fn from(address: SocketAddr) -> Self {
        Self {
            raw: address.into(),
        }
    }
}

impl Display for PeerAddress {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self.format() {
            Ok(address) => f.write_str(&address),
            Err(error) => write!(f, "<{error}>"),
        }
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr, SocketAddrV6};

    use pretty_assertions::assert_eq;
    use socket2::{Protocol, SockAddr};

    use super::{Endpoint, PeerAddress};
    use crate::config::{AddressFamily, TransportMode};

    #[test]
    fn format_ipv4_loopback() {
        let peer = PeerAddress::from(SockAddr::from(SocketAddr::from((Ipv4Addr::LOCALHOST, 0))));
        assert_eq!(peer.format().unwrap(), "127.0.0.1");
    }

    #[test]
    fn format_ipv6_loopback() {
        let peer = PeerAddress::from(SockAddr::from(SocketAddr::from((Ipv6Addr::LOCALHOST, 0))));
        assert_eq!(peer.format().unwrap(), "::1");
    }

    #[test]
    fn format_ipv6_uses_compressed_form() {
        let address = SocketAddrV6::new("2001:db8:0:0:0:0:0:cafe".parse().unwrap(), 8888, 0, 0);
        let peer = PeerAddress::from(SocketAddr::V6(address));
        assert_eq!(peer.format().unwrap(), "2001:db8::cafe");
        assert_eq!(peer.port(), Some(8888));
        assert_eq!(peer.to_string(), "2001:db8::cafe");
    }

    #[test]
    fn format_ipv4_mapped_stays_ipv6() {
        let peer = PeerAddress::from("[::ffff:192.0.2.1]:80".parse::<SocketAddr>().unwrap());
        assert_eq!(peer.format().unwrap(), "::ffff:192.0.2.1");
    }

    #[cfg(unix)]
    #[test]
    fn format_rejects_other_families() {
        let peer = PeerAddress::from(SockAddr::unix("/tmp/netbridge.sock").unwrap());
        assert!(peer.format().is_err());
        assert_eq!(peer.socket_addr(), None);
        assert!(peer.to_string().starts_with("<unsupported address family"));
    }

    #[test]
    fn peer_equality_follows_raw_address() {
        let a = PeerAddress::from("127.0.0.1:4000".parse::<SocketAddr>().unwrap());
        let b = PeerAddress::from("127.0.0.1:4000".parse::<SocketAddr>().unwrap());
        let c = PeerAddress::from("127.0.0.1:4001".parse::<SocketAddr>().unwrap());
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn endpoint_accessors() {
        let endpoint = Endpoint::new(
            TransportMode::Datagram,
            "[::1]:6666".parse::<SocketAddr>().unwrap(),
        );
        assert_eq!(endpoint.family(), AddressFamily::Ipv6);
        assert_eq!(endpoint.protocol(), Protocol::UDP);
        assert_eq!(endpoint.sock_addr().as_socket(), Some(endpoint.socket_addr()));
        assert_eq!(endpoint.to_string(), "datagram [::1]:6666");
    }
}
