//! Client-side setup: resolve a destination and connect to it.

use crate::address::Endpoint;
use crate::config::{NetConfig, TransportMode};
use crate::error::SetupError;
use crate::resolve::{Resolver, try_candidates};
use crate::socket::{Descriptor, SocketHandle, SocketState, create_socket};

/// Produces client sockets ready to talk to a destination.
#[derive(Debug, Clone)]
pub struct ClientBootstrap {
    resolver: Resolver,
}

impl ClientBootstrap {
    /// Creates a bootstrap resolving destinations in `config`'s family.
    pub fn new(config: &NetConfig) -> Self {
        Self {
            resolver: Resolver::new(config.family),
        }
    }

    /// Resolves `host` and `service` and sets up a socket for it.
    ///
    /// In stream mode the connection handshake runs against each candidate in turn and the handle
    /// ends [`SocketState::Connected`]. In datagram mode nothing is sent; the first candidate
    /// becomes the handle's [`destination`](SocketHandle::destination) and the handle ends
    /// [`SocketState::Ready`].
    #[tracing::instrument(level = "debug", skip(self), fields(family = %self.resolver.family()))]
    pub fn connect(
        &self,
        host: &str,
        service: &str,
        mode: TransportMode,
    ) -> Result<SocketHandle, SetupError> {
        let endpoints = self
            .resolver
            .resolve(Some(host), service, mode, false)
            .inspect_err(|error| tracing::error!(?error, "failed to resolve destination"))?;

        match mode {
            TransportMode::Stream => try_candidates(&endpoints, connect_stream),
            TransportMode::Datagram => try_candidates(&endpoints, prepare_datagram),
        }
    }
}

fn connect_stream(endpoint: &Endpoint) -> Result<SocketHandle, SetupError> {
    let socket = create_socket(endpoint)?;
    socket.connect(&endpoint.sock_addr()).map_err(|error| {
        tracing::error!(%endpoint, %error, "failed to connect");
        SetupError::Connect(error)
    })?;

    tracing::debug!(%endpoint, "connected");
    Ok(SocketHandle::from_descriptor(
        endpoint.family(),
        TransportMode::Stream,
        SocketState::Connected,
        Descriptor::Stream(socket.into()),
    ))
}

fn prepare_datagram(endpoint: &Endpoint) -> Result<SocketHandle, SetupError> {
    let socket = create_socket(endpoint)?;
    let mut handle = SocketHandle::from_descriptor(
        endpoint.family(),
        TransportMode::Datagram,
        SocketState::Ready,
        Descriptor::Datagram(socket.into()),
    );
    handle.set_destination(*endpoint);
    Ok(handle)
}
