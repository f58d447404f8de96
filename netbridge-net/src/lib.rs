//! Family-agnostic socket setup and I/O for small client/server programs.
//!
//! A process picks one [`AddressFamily`] (IPv4 or IPv6) and one [`TransportMode`] (stream or
//! datagram) and gets:
//!
//! - [`Resolver`]: host and service to candidate [`Endpoint`]s.
//! - [`SocketHandle::create`]: a socket matching an endpoint.
//! - [`ServerBootstrap`]: bind to the wildcard address, listen, accept.
//! - [`ClientBootstrap`]: connect to a destination, or remember it for datagrams.
//! - Stream I/O ([`SocketHandle::send`], [`SocketHandle::receive`]) and datagram I/O
//!   ([`SocketHandle::send_to`], [`SocketHandle::receive_from`]).
//! - [`PeerAddress::format`]: the text form of a sender's address.
//!
//! Everything is synchronous. Setup failures are [`SetupError`]s and leave nothing allocated;
//! send and receive failures are [`IoError`]s the caller may recover from.
//!
//! # Features
//!
//! - `clap`: Derive `clap::ValueEnum` for [`AddressFamily`] and [`TransportMode`]. Default: disabled.

#![forbid(unsafe_code)]
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

mod address;
mod buffer;
mod client;
mod config;
mod datagram;
mod error;
mod resolve;
mod server;
mod socket;
mod stream;

pub use address::{Endpoint, PeerAddress};
pub use buffer::BoundedBuffer;
pub use client::ClientBootstrap;
pub use config::{
    AddressFamily, DEFAULT_BACKLOG, DEFAULT_MAX_PAYLOAD, DEFAULT_SERVICE, NetConfig, TransportMode,
};
pub use datagram::ReceivedDatagram;
pub use error::{CapacityError, FormatError, IoError, ResolutionError, SetupError};
pub use resolve::Resolver;
pub use server::{BindOptions, ServerBootstrap};
pub use socket::{ReceiveMode, SocketHandle, SocketState};
pub use stream::Received;
