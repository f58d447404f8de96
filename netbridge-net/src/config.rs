//! Process configuration threaded through resolution and bootstrap calls.

use std::fmt::{self, Display, Formatter};
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};

use socket2::{Domain, Protocol, Type};

/// Service (port) shared by the demo client and server.
pub const DEFAULT_SERVICE: &str = "6666";

/// Pending connections queued by a listening stream server.
pub const DEFAULT_BACKLOG: i32 = 10;

/// Largest message the demo programs exchange in one send.
pub const DEFAULT_MAX_PAYLOAD: usize = 100;

/// Address family used for every resolution of a process run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
pub enum AddressFamily {
    /// IPv4 (`AF_INET`).
    #[default]
    Ipv4,
    /// IPv6 (`AF_INET6`).
    Ipv6,
}

impl AddressFamily {
    /// The `socket2` domain sockets of this family are created in.
    pub fn domain(self) -> Domain {
        match self {
            AddressFamily::Ipv4 => Domain::IPV4,
            AddressFamily::Ipv6 => Domain::IPV6,
        }
    }

    /// The "any interface" address used for passive binds.
    pub fn wildcard(self) -> IpAddr {
        match self {
            AddressFamily::Ipv4 => IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            AddressFamily::Ipv6 => IpAddr::V6(Ipv6Addr::UNSPECIFIED),
        }
    }

    /// The loopback address, used when neither a host nor the passive flag is given.
    pub fn loopback(self) -> IpAddr {
        match self {
            AddressFamily::Ipv4 => IpAddr::V4(Ipv4Addr::LOCALHOST),
            AddressFamily::Ipv6 => IpAddr::V6(Ipv6Addr::LOCALHOST),
        }
    }

    /// Returns the family of `address`.
    pub fn of(address: &SocketAddr) -> Self {
        match address {
            SocketAddr::V4(_) => AddressFamily::Ipv4,
            SocketAddr::V6(_) => AddressFamily::Ipv6,
        }
    }

    /// Largest payload a single datagram of this family can carry.
    ///
    /// 65535 minus the UDP header and the minimal IP header (IPv6 counts its header outside the
    /// payload length).
    pub fn max_datagram_payload(self) -> usize {
        match self {
            AddressFamily::Ipv4 => 65_507,
            AddressFamily::Ipv6 => 65_527,
        }
    }
}

impl Display for AddressFamily {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            AddressFamily::Ipv4 => f.write_str("IPv4"),
            AddressFamily::Ipv6 => f.write_str("IPv6"),
        }
    }
}

/// Connection-oriented stream or connectionless datagram transport.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
pub enum TransportMode {
    /// Ordered byte stream (TCP).
    #[default]
    Stream,
    /// Message-oriented datagrams (UDP).
    Datagram,
}

impl TransportMode {
    /// The `socket2` socket type for this mode.
    pub fn socket_type(self) -> Type {
        match self {
            TransportMode::Stream => Type::STREAM,
            TransportMode::Datagram => Type::DGRAM,
        }
    }

    /// The IP protocol carried by this mode.
    pub fn protocol(self) -> Protocol {
        match self {
            TransportMode::Stream => Protocol::TCP,
            TransportMode::Datagram => Protocol::UDP,
        }
    }
}

impl Display for TransportMode {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            TransportMode::Stream => f.write_str("stream"),
            TransportMode::Datagram => f.write_str("datagram"),
        }
    }
}

/// Explicit configuration for a process run.
///
/// Built once (usually from command line arguments) and handed to
/// [`ServerBootstrap`](crate::ServerBootstrap) or [`ClientBootstrap`](crate::ClientBootstrap).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetConfig {
    /// Family used for every resolution.
    pub family: AddressFamily,
    /// Service (decimal port or service name) to serve on or connect to.
    pub service: String,
    /// Pending connection queue length for stream servers.
    pub backlog: i32,
    /// Capacity of the message buffers.
    pub max_payload: usize,
}

impl Default for NetConfig {
    fn default() -> Self {
        Self {
            family: AddressFamily::default(),
            service: DEFAULT_SERVICE.to_owned(),
            backlog: DEFAULT_BACKLOG,
            max_payload: DEFAULT_MAX_PAYLOAD,
        }
    }
}

impl NetConfig {
    /// Returns the default configuration with `family` selected.
    pub fn with_family(family: AddressFamily) -> Self {
        Self {
            family,
            ..Self::default()
        }
    }
}
