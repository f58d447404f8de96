//! Error types for setup and I/O.
//!
//! Setup errors ([`ResolutionError`], [`SetupError`]) are fatal: the in-progress descriptor has
//! already been released when they are returned, and retrying is not expected.
//! [`IoError`] is recoverable: the caller decides whether to keep the session going.

use std::io;

use crate::config::{AddressFamily, TransportMode};
use crate::socket::SocketState;

/// Failure to turn a host and service into endpoints.
#[derive(thiserror::Error, Debug)]
pub enum ResolutionError {
    /// The service is numeric but not a valid port number.
    #[error("invalid service {service:?}")]
    InvalidService {
        /// The rejected service.
        service: String,
        /// Why parsing failed.
        #[source]
        source: std::num::ParseIntError,
    },

    /// The service name is not known to the system services database.
    #[error("unknown service {service:?}")]
    UnknownService {
        /// The service that was looked up.
        service: String,
        /// The lookup failure.
        #[source]
        source: io::Error,
    },

    /// The system resolver could not look up the host.
    #[error("failed to look up {host:?}")]
    Lookup {
        /// The host that was looked up.
        host: String,
        /// The resolver failure.
        #[source]
        source: io::Error,
    },

    /// The host resolved, but not to any address of the selected family.
    #[error("{host:?} has no {family} address")]
    NoAddress {
        /// The host that was looked up.
        host: String,
        /// The selected family.
        family: AddressFamily,
    },

    /// Resolution produced an empty candidate list.
    #[error("no candidate endpoints")]
    NoCandidates,
}

/// Fatal failure while setting up a socket.
#[derive(thiserror::Error, Debug)]
pub enum SetupError {
    /// Address resolution failed.
    #[error("address resolution failed")]
    Resolution(#[from] ResolutionError),

    /// The OS could not allocate the requested family/mode/protocol combination.
    #[error("failed to create {family} {mode} socket")]
    SocketCreation {
        /// Requested family.
        family: AddressFamily,
        /// Requested mode.
        mode: TransportMode,
        /// OS error.
        #[source]
        source: io::Error,
    },

    /// Setting options or binding to the local address failed.
    #[error("failed to bind socket")]
    Bind(#[source] io::Error),

    /// Marking the socket as listening failed.
    #[error("failed to listen on socket")]
    Listen(#[source] io::Error),

    /// The connection handshake failed.
    #[error("failed to connect")]
    Connect(#[source] io::Error),

    /// Accepting a pending connection failed.
    #[error("failed to accept connection")]
    Accept(#[source] io::Error),

    /// The operation is not valid for the handle's mode or lifecycle state.
    #[error("cannot {operation} a {mode} socket in state {state:?}")]
    InvalidState {
        /// The attempted operation.
        operation: &'static str,
        /// The handle's mode.
        mode: TransportMode,
        /// The handle's state.
        state: SocketState,
    },
}

/// Recoverable failure of a send or receive during a session.
#[derive(thiserror::Error, Debug)]
pub enum IoError {
    /// The handle was closed.
    #[error("socket is closed")]
    Closed,

    /// The operation belongs to the other transport mode, or the handle is not yet set up for it.
    #[error("operation not supported on a {mode} socket in state {state:?}")]
    WrongMode {
        /// The handle's mode.
        mode: TransportMode,
        /// The handle's state.
        state: SocketState,
    },

    /// [`send_to_destination`](crate::SocketHandle::send_to_destination) on a handle without a
    /// stored destination.
    #[error("socket has no stored destination")]
    NoDestination,

    /// The payload does not fit into a single datagram.
    #[error("payload of {len} bytes exceeds the {max} byte datagram limit")]
    PayloadTooLarge {
        /// Payload length.
        len: usize,
        /// Maximum payload for the socket's family.
        max: usize,
    },

    /// The receive buffer has no capacity.
    #[error("receive buffer has zero capacity")]
    ZeroCapacity,

    /// The OS reported an error.
    #[error("socket I/O failed")]
    Os(#[from] io::Error),
}

/// Failure to render a peer address.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum FormatError {
    /// The raw address is neither IPv4 nor IPv6.
    #[error("unsupported address family {0}")]
    UnsupportedFamily(i32),
}

/// A write into a [`BoundedBuffer`](crate::BoundedBuffer) would exceed its capacity.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("{requested} bytes do not fit, {remaining} of {capacity} bytes left")]
pub struct CapacityError {
    /// Bytes the caller tried to write.
    pub requested: usize,
    /// Bytes still free.
    pub remaining: usize,
    /// Total capacity.
    pub capacity: usize,
}
