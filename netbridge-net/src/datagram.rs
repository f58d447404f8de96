//! Send and receive single datagrams with explicit peers.

use std::io;
use std::net::{SocketAddr, UdpSocket};

use crate::address::{Endpoint, PeerAddress};
use crate::buffer::BoundedBuffer;
use crate::error::IoError;
use crate::socket::{Descriptor, ReceiveMode, SocketHandle, receive_in_mode};

/// Outcome of a datagram receive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReceivedDatagram {
    /// A datagram from `peer` was placed in the buffer.
    Data {
        /// Bytes placed in the buffer; zero for an empty datagram.
        len: usize,
        /// Sender of the datagram.
        peer: PeerAddress,
        /// The datagram was longer than the buffer; only the first `len` bytes were kept.
        truncated: bool,
    },
    /// Nothing was pending (non-blocking receives only).
    NoData,
}

impl SocketHandle {
    /// Sends `bytes` as one datagram to `destination`.
    ///
    /// Payloads larger than the family's maximum datagram payload are rejected, never split.
    pub fn send_to(&mut self, destination: &Endpoint, bytes: &[u8]) -> Result<usize, IoError> {
        self.send_datagram(destination.socket_addr(), bytes)
    }

    /// Sends `bytes` as one datagram to the destination stored by
    /// [`ClientBootstrap`](crate::ClientBootstrap).
    pub fn send_to_destination(&mut self, bytes: &[u8]) -> Result<usize, IoError> {
        let destination = self.destination().ok_or(IoError::NoDestination)?.socket_addr();
        self.send_datagram(destination, bytes)
    }

    /// Sends `bytes` as one datagram back to a peer captured by
    /// [`receive_from`](Self::receive_from).
    pub fn reply_to(&mut self, peer: &PeerAddress, bytes: &[u8]) -> Result<usize, IoError> {
        let address = peer.socket_addr().ok_or_else(|| {
            IoError::Os(io::Error::new(
                io::ErrorKind::InvalidInput,
                "peer is not an IP address",
            ))
        })?;
        self.send_datagram(address, bytes)
    }

    /// Receives one datagram into `buffer`, replacing its contents, and captures the sender.
    ///
    /// Datagrams longer than the buffer's capacity are truncated to it and reported with
    /// `truncated` set. In [`ReceiveMode::NonBlocking`], having nothing pending is
    /// [`ReceivedDatagram::NoData`] and not an error.
    pub fn receive_from(
        &mut self,
        buffer: &mut BoundedBuffer,
        mode: ReceiveMode,
    ) -> Result<ReceivedDatagram, IoError> {
        let socket = self.datagram_socket()?;
        if buffer.capacity() == 0 {
            return Err(IoError::ZeroCapacity);
        }

        let slot = buffer.receive_slot_with_spare();
        match receive_in_mode(socket, mode, |socket| socket.recv_from(slot)) {
            Ok((received, address)) => {
                buffer.set_filled(received);
                let truncated = received > buffer.capacity();
                if truncated {
                    tracing::debug!(%address, capacity = buffer.capacity(), "datagram truncated");
                }
                Ok(ReceivedDatagram::Data {
                    len: buffer.len(),
                    peer: PeerAddress::from(address),
                    truncated,
                })
            }
            Err(error)
                if mode == ReceiveMode::NonBlocking && error.kind() == io::ErrorKind::WouldBlock =>
            {
                Ok(ReceivedDatagram::NoData)
            }
            Err(error) => {
                tracing::error!(%error, "failed to receive datagram");
                Err(IoError::Os(error))
            }
        }
    }

    fn send_datagram(&self, destination: SocketAddr, bytes: &[u8]) -> Result<usize, IoError> {
        let socket = self.datagram_socket()?;

        let max = self.family().max_datagram_payload();
        if bytes.len() > max {
            tracing::error!(len = bytes.len(), max, "datagram payload too large");
            return Err(IoError::PayloadTooLarge {
                len: bytes.len(),
                max,
            });
        }

        socket.send_to(bytes, destination).map_err(|error| {
            tracing::error!(%destination, %error, "failed to send datagram");
            IoError::Os(error)
        })
    }

    fn datagram_socket(&self) -> Result<&UdpSocket, IoError> {
        match self.descriptor()? {
            Descriptor::Datagram(socket) => Ok(socket),
            _ => Err(self.wrong_mode()),
        }
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use std::net::{SocketAddr, UdpSocket};

    use pretty_assertions::assert_eq;
    use tracing_test::traced_test;

    use super::ReceivedDatagram;
    use crate::address::PeerAddress;
    use crate::buffer::BoundedBuffer;
    use crate::client::ClientBootstrap;
    use crate::config::{NetConfig, TransportMode};
    use crate::error::IoError;
    use crate::server::ServerBootstrap;
    use crate::socket::{ReceiveMode, SocketHandle};

    fn bound_server() -> (SocketHandle, String) {
        let server = ServerBootstrap::new(&NetConfig::default())
            .bind("0", TransportMode::Datagram)
            .unwrap();
        let port = server.local_addr().unwrap().port().to_string();
        (server, port)
    }

    #[test]
    fn client_to_server_and_reply() {
        let (mut server, port) = bound_server();
        let mut client = ClientBootstrap::new(&NetConfig::default())
            .connect("127.0.0.1", &port, TransportMode::Datagram)
            .unwrap();

        assert_eq!(client.send_to_destination(b"ping").unwrap(), 4);

        let mut buffer = BoundedBuffer::new(16);
        let ReceivedDatagram::Data {
            len,
            peer,
            truncated: false,
        } = server
            .receive_from(&mut buffer, ReceiveMode::Blocking)
            .unwrap()
        else {
            panic!("expected a datagram");
        };
        assert_eq!(len, 4);
        assert_eq!(buffer.as_slice(), b"ping");
        assert_eq!(peer.format().unwrap(), "127.0.0.1");
        assert_eq!(peer.port(), Some(client.local_addr().unwrap().port()));

        server.reply_to(&peer, b"pong").unwrap();
        assert!(matches!(
            client.receive_from(&mut buffer, ReceiveMode::Blocking).unwrap(),
            ReceivedDatagram::Data {
                len: 4,
                truncated: false,
                ..
            }
        ));
        assert_eq!(buffer.as_slice(), b"pong");
    }

    #[test]
    fn empty_datagram_is_data() {
        let (mut server, port) = bound_server();
        let sender = UdpSocket::bind("127.0.0.1:0").unwrap();
        sender.send_to(&[], format!("127.0.0.1:{port}")).unwrap();

        let mut buffer = BoundedBuffer::new(4);
        assert!(matches!(
            server.receive_from(&mut buffer, ReceiveMode::Blocking).unwrap(),
            ReceivedDatagram::Data { len: 0, .. }
        ));
    }

    #[test]
    fn long_datagram_is_truncated_to_capacity() {
        let (mut server, port) = bound_server();
        let sender = UdpSocket::bind("127.0.0.1:0").unwrap();
        sender.send_to(b"abcdefghij", format!("127.0.0.1:{port}")).unwrap();
        sender.send_to(b"wxyz", format!("127.0.0.1:{port}")).unwrap();

        let mut buffer = BoundedBuffer::new(4);
        assert!(matches!(
            server.receive_from(&mut buffer, ReceiveMode::Blocking).unwrap(),
            ReceivedDatagram::Data {
                len: 4,
                truncated: true,
                ..
            }
        ));
        assert_eq!(buffer.as_slice(), b"abcd");

        assert!(matches!(
            server.receive_from(&mut buffer, ReceiveMode::Blocking).unwrap(),
            ReceivedDatagram::Data {
                len: 4,
                truncated: false,
                ..
            }
        ));
        assert_eq!(buffer.as_slice(), b"wxyz");
    }

    #[test]
    fn oversized_payload_is_rejected() {
        let (mut server, port) = bound_server();
        let destination = *ClientBootstrap::new(&NetConfig::default())
            .connect("127.0.0.1", &port, TransportMode::Datagram)
            .unwrap()
            .destination()
            .unwrap();

        let payload = vec![0u8; 65_508];
        assert!(matches!(
            server.send_to(&destination, &payload),
            Err(IoError::PayloadTooLarge {
                len: 65_508,
                max: 65_507
            })
        ));
    }

    #[traced_test]
    #[test]
    fn nonblocking_without_data_is_silent() {
        let (mut server, _) = bound_server();
        assert_eq!(
            server
                .receive_from(&mut BoundedBuffer::new(8), ReceiveMode::NonBlocking)
                .unwrap(),
            ReceivedDatagram::NoData
        );
        logs_assert(|lines: &[&str]| {
            match lines
                .iter()
                .find(|line| line.contains("ERROR") || line.contains("WARN"))
            {
                Some(line) => Err(format!("unexpected event: {line}")),
                None => Ok(()),
            }
        });
    }

    #[test]
    fn missing_destination() {
        let (mut server, _) = bound_server();
        assert!(matches!(
            server.send_to_destination(b"x"),
            Err(IoError::NoDestination)
        ));
    }

    #[test]
    fn datagram_io_needs_a_datagram_socket() {
        let mut listener = ServerBootstrap::new(&NetConfig::default())
            .bind_listening("0")
            .unwrap();
        let peer = PeerAddress::from("127.0.0.1:9".parse::<SocketAddr>().unwrap());

        assert!(matches!(
            listener.reply_to(&peer, b"x"),
            Err(IoError::WrongMode { .. })
        ));
        assert!(matches!(
            listener.receive_from(&mut BoundedBuffer::new(1), ReceiveMode::NonBlocking),
            Err(IoError::WrongMode { .. })
        ));
    }
}
