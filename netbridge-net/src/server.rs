//! Server-side setup: bind, listen and accept.

use crate::address::{Endpoint, PeerAddress};
use crate::config::{NetConfig, TransportMode};
use crate::error::SetupError;
use crate::resolve::{Resolver, try_candidates};
use crate::socket::{Descriptor, SocketHandle, SocketState, create_socket};

/// Socket options applied before binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BindOptions {
    /// Sets `SO_REUSEADDR`, so a restarted server can bind while old connections linger.
    pub reuse_address: bool,
}

impl Default for BindOptions {
    fn default() -> Self {
        Self {
            reuse_address: true,
        }
    }
}

/// Produces bound (and listening) server sockets on the wildcard address of the configured family.
#[derive(Debug, Clone)]
pub struct ServerBootstrap {
    resolver: Resolver,
    backlog: i32,
    options: BindOptions,
}

impl ServerBootstrap {
    /// Creates a bootstrap for `config`'s family and backlog.
    pub fn new(config: &NetConfig) -> Self {
        Self {
            resolver: Resolver::new(config.family),
            backlog: config.backlog,
            options: BindOptions::default(),
        }
    }

    /// Replaces the socket options applied before binding.
    pub fn with_options(mut self, options: BindOptions) -> Self {
        self.options = options;
        self
    }

    /// Binds a new socket to `service` on every interface.
    ///
    /// Returns a handle in [`SocketState::Bound`]. On failure nothing stays allocated.
    #[tracing::instrument(level = "debug", skip(self), fields(family = %self.resolver.family()))]
    pub fn bind(&self, service: &str, mode: TransportMode) -> Result<SocketHandle, SetupError> {
        let endpoints = self
            .resolver
            .resolve(None, service, mode, true)
            .inspect_err(|error| tracing::error!(?error, "failed to resolve local address"))?;

        let handle = try_candidates(&endpoints, |endpoint| self.bind_endpoint(endpoint))?;
        tracing::info!(address = ?handle.local_addr().ok(), %mode, "bound");
        Ok(handle)
    }

    /// Binds a stream socket to `service` and starts listening with the configured backlog.
    pub fn bind_listening(&self, service: &str) -> Result<SocketHandle, SetupError> {
        self.bind(service, TransportMode::Stream)?.listen(self.backlog)
    }

    fn bind_endpoint(&self, endpoint: &Endpoint) -> Result<SocketHandle, SetupError> {
        let socket = create_socket(endpoint)?;

        let bind_error = |error: std::io::Error| {
            tracing::error!(%endpoint, %error, "failed to bind socket");
            SetupError::Bind(error)
        };

        socket
            .set_reuse_address(self.options.reuse_address)
            .map_err(bind_error)?;
        socket.bind(&endpoint.sock_addr()).map_err(bind_error)?;

        let descriptor = match endpoint.mode() {
            TransportMode::Stream => Descriptor::Raw(socket),
            TransportMode::Datagram => Descriptor::Datagram(socket.into()),
        };

        Ok(SocketHandle::from_descriptor(
            endpoint.family(),
            endpoint.mode(),
            SocketState::Bound,
            descriptor,
        ))
    }
}

impl SocketHandle {
    /// Turns a bound stream socket into a listening one that queues up to `backlog` connections.
    ///
    /// Consumes the handle; on failure the descriptor is released.
    pub fn listen(mut self, backlog: i32) -> Result<SocketHandle, SetupError> {
        let (family, mode, state) = (self.family(), self.mode(), self.state());
        let invalid = SetupError::InvalidState {
            operation: "listen on",
            mode,
            state,
        };

        if mode != TransportMode::Stream || state != SocketState::Bound {
            return Err(invalid);
        }
        let Some(Descriptor::Raw(socket)) = self.take_descriptor() else {
            return Err(invalid);
        };

        socket.listen(backlog).map_err(|error| {
            tracing::error!(%error, backlog, "failed to listen");
            SetupError::Listen(error)
        })?;

        Ok(SocketHandle::from_descriptor(
            family,
            mode,
            SocketState::Listening,
            Descriptor::Listener(socket.into()),
        ))
    }

    /// Waits for the next pending connection.
    ///
    /// Returns an independent handle in [`SocketState::Connected`] and the peer's address. Can be
    /// called any number of times; the listening handle stays usable after a failed accept.
    pub fn accept(&self) -> Result<(SocketHandle, PeerAddress), SetupError> {
        let Ok(Descriptor::Listener(listener)) = self.descriptor() else {
            return Err(SetupError::InvalidState {
                operation: "accept on",
                mode: self.mode(),
                state: self.state(),
            });
        };

        let (stream, address) = listener.accept().map_err(|error| {
            tracing::error!(%error, "failed to accept connection");
            SetupError::Accept(error)
        })?;

        let peer = PeerAddress::from(address);
        tracing::debug!(%peer, "accepted connection");

        Ok((
            SocketHandle::from_descriptor(
                self.family(),
                TransportMode::Stream,
                SocketState::Connected,
                Descriptor::Stream(stream),
            ),
            peer,
        ))
    }
}
