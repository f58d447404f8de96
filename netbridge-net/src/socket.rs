//! Socket handles and their lifecycle.

use std::io;
use std::net::{Shutdown, SocketAddr, TcpListener, TcpStream, UdpSocket};

use socket2::Socket;

use crate::address::Endpoint;
use crate::config::{AddressFamily, TransportMode};
use crate::error::{IoError, SetupError};

/// Lifecycle state of a [`SocketHandle`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SocketState {
    /// Descriptor allocated, nothing else done yet.
    Created,
    /// Bound to a local address (server side).
    Bound,
    /// Queueing inbound stream connections.
    Listening,
    /// Stream connection established (connected client or accepted connection).
    Connected,
    /// Datagram client with a stored destination.
    Ready,
    /// Descriptor released; the handle cannot be used again.
    Closed,
}

/// The OS descriptor, typed by what setup has made of it so far.
#[derive(Debug)]
pub(crate) enum Descriptor {
    Raw(Socket),
    Listener(TcpListener),
    Stream(TcpStream),
    Datagram(UdpSocket),
}

/// Exclusive owner of one OS socket descriptor.
///
/// Created by [`SocketHandle::create`] or through [`ServerBootstrap`](crate::ServerBootstrap) and
/// [`ClientBootstrap`](crate::ClientBootstrap). Dropping the handle closes the descriptor. Handles
/// share no state with each other, so an accepted handle can be moved to another thread.
#[derive(Debug)]
pub struct SocketHandle {
    family: AddressFamily,
    mode: TransportMode,
    state: SocketState,
    descriptor: Option<Descriptor>,
    destination: Option<Endpoint>,
}

impl SocketHandle {
    /// Allocates a socket matching `endpoint`'s family, mode and protocol.
    ///
    /// The handle starts in [`SocketState::Created`].
    pub fn create(endpoint: &Endpoint) -> Result<Self, SetupError> {
        let socket = create_socket(endpoint)?;
        Ok(Self::from_descriptor(
            endpoint.family(),
            endpoint.mode(),
            SocketState::Created,
            Descriptor::Raw(socket),
        ))
    }

    pub(crate) fn from_descriptor(
        family: AddressFamily,
        mode: TransportMode,
        state: SocketState,
        descriptor: Descriptor,
    ) -> Self {
        Self {
            family,
            mode,
            state,
            descriptor: Some(descriptor),
            destination: None,
        }
    }

    /// Address family of the socket.
    pub fn family(&self) -> AddressFamily {
        self.family
    }

    /// Transport mode of the socket.
    pub fn mode(&self) -> TransportMode {
        self.mode
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SocketState {
        self.state
    }

    /// Whether [`close`](Self::close) has been called.
    pub fn is_closed(&self) -> bool {
        self.state == SocketState::Closed
    }

    /// Destination stored by [`ClientBootstrap`](crate::ClientBootstrap) for datagram clients.
    pub fn destination(&self) -> Option<&Endpoint> {
        self.destination.as_ref()
    }

    /// The local address the socket is bound to.
    pub fn local_addr(&self) -> Result<SocketAddr, IoError> {
        let address = match self.descriptor.as_ref().ok_or(IoError::Closed)? {
            Descriptor::Raw(socket) => socket.local_addr().and_then(|address| {
                address.as_socket().ok_or_else(|| {
                    io::Error::new(io::ErrorKind::InvalidData, "not an IP socket address")
                })
            }),
            Descriptor::Listener(listener) => listener.local_addr(),
            Descriptor::Stream(stream) => stream.local_addr(),
            Descriptor::Datagram(socket) => socket.local_addr(),
        }?;
        Ok(address)
    }

    /// Shuts down the sending half of a stream connection; the peer sees an orderly shutdown.
    pub fn shutdown_write(&mut self) -> Result<(), IoError> {
        let (mode, state) = (self.mode, self.state);
        match self.descriptor.as_ref().ok_or(IoError::Closed)? {
            Descriptor::Stream(stream) => Ok(stream.shutdown(Shutdown::Write)?),
            _ => Err(IoError::WrongMode { mode, state }),
        }
    }

    /// Releases the descriptor and moves the handle to [`SocketState::Closed`].
    ///
    /// Closing an already closed handle does nothing.
    pub fn close(&mut self) {
        if self.descriptor.take().is_some() {
            tracing::trace!(mode = %self.mode, state = ?self.state, "closing socket");
        }
        self.state = SocketState::Closed;
        self.destination = None;
    }

    pub(crate) fn set_destination(&mut self, destination: Endpoint) {
        self.destination = Some(destination);
    }

    /// Takes the descriptor out for a state transition.
    ///
    /// The handle is left closed; the caller builds the successor handle.
    pub(crate) fn take_descriptor(&mut self) -> Option<Descriptor> {
        let descriptor = self.descriptor.take();
        self.state = SocketState::Closed;
        descriptor
    }

    pub(crate) fn descriptor(&self) -> Result<&Descriptor, IoError> {
        self.descriptor.as_ref().ok_or(IoError::Closed)
    }

    pub(crate) fn wrong_mode(&self) -> IoError {
        IoError::WrongMode {
            mode: self.mode,
            state: self.state,
        }
    }
}

/// Allocates the raw socket for `endpoint`.
///
/// Setup code works on the returned [`Socket`] and only wraps it into a [`SocketHandle`] once
/// every step succeeded, so early returns drop (and close) it.
pub(crate) fn create_socket(endpoint: &Endpoint) -> Result<Socket, SetupError> {
    Socket::new(
        endpoint.family().domain(),
        endpoint.mode().socket_type(),
        Some(endpoint.protocol()),
    )
    .map_err(|source| {
        tracing::error!(%endpoint, error = %source, "failed to create socket");
        SetupError::SocketCreation {
            family: endpoint.family(),
            mode: endpoint.mode(),
            source,
        }
    })
}

/// Per-call blocking behaviour of a receive.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReceiveMode {
    /// Wait until data (or a shutdown) arrives.
    #[default]
    Blocking,
    /// Return immediately when nothing is pending.
    NonBlocking,
}

/// Sockets whose blocking flag can be toggled around a single call.
pub(crate) trait SetNonBlocking {
    fn set_nonblocking(&self, nonblocking: bool) -> io::Result<()>;
}

impl SetNonBlocking for TcpStream {
    fn set_nonblocking(&self, nonblocking: bool) -> io::Result<()> {
        TcpStream::set_nonblocking(self, nonblocking)
    }
}

impl SetNonBlocking for UdpSocket {
    fn set_nonblocking(&self, nonblocking: bool) -> io::Result<()> {
        UdpSocket::set_nonblocking(self, nonblocking)
    }
}

/// Runs `receive` on `socket` in the requested mode.
///
/// A non-blocking receive switches the socket back to blocking mode afterwards. Its result is
/// returned even when switching back fails, so received bytes are never dropped; the next blocking
/// receive clears the flag again before reading.
pub(crate) fn receive_in_mode<S, T>(
    socket: &S,
    mode: ReceiveMode,
    receive: impl FnOnce(&S) -> io::Result<T>,
) -> io::Result<T>
where
    S: SetNonBlocking,
{
    match mode {
        ReceiveMode::Blocking => {
            socket.set_nonblocking(false)?;
            receive(socket)
        }
        ReceiveMode::NonBlocking => {
            socket.set_nonblocking(true)?;
            let result = receive(socket);
            if let Err(error) = socket.set_nonblocking(false) {
                tracing::warn!(?error, "failed to restore blocking mode");
            }
            result
        }
    }
}
