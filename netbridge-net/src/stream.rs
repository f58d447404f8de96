//! Send and receive over an established stream connection.

use std::io::{self, Read, Write};
use std::net::TcpStream;

use crate::buffer::BoundedBuffer;
use crate::error::IoError;
use crate::socket::{Descriptor, ReceiveMode, SocketHandle, receive_in_mode};

/// Outcome of a stream receive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Received {
    /// This many bytes were placed in the buffer.
    Data(usize),
    /// The peer shut down its sending half; no more data will arrive.
    PeerClosed,
    /// Nothing was pending (non-blocking receives only).
    NoData,
}

impl SocketHandle {
    /// Writes as much of `bytes` as the OS accepts in one call and returns that count.
    ///
    /// The count may be smaller than `bytes.len()`; use [`send_all`](Self::send_all) to write
    /// everything.
    pub fn send(&mut self, bytes: &[u8]) -> Result<usize, IoError> {
        let mut stream = self.connected_stream()?;
        stream.write(bytes).map_err(|error| {
            tracing::error!(%error, len = bytes.len(), "failed to send");
            IoError::Os(error)
        })
    }

    /// Writes every byte of `bytes`, looping over partial sends.
    pub fn send_all(&mut self, mut bytes: &[u8]) -> Result<(), IoError> {
        while !bytes.is_empty() {
            match self.send(bytes)? {
                0 => {
                    tracing::error!(remaining = bytes.len(), "connection stopped accepting data");
                    return Err(IoError::Os(io::ErrorKind::WriteZero.into()));
                }
                sent => bytes = &bytes[sent..],
            }
        }
        Ok(())
    }

    /// Receives up to `buffer.capacity()` bytes into `buffer`, replacing its contents.
    ///
    /// An orderly shutdown by the peer is [`Received::PeerClosed`]. In
    /// [`ReceiveMode::NonBlocking`], having nothing pending is [`Received::NoData`] and not an
    /// error.
    pub fn receive(
        &mut self,
        buffer: &mut BoundedBuffer,
        mode: ReceiveMode,
    ) -> Result<Received, IoError> {
        let stream = self.connected_stream()?;
        if buffer.capacity() == 0 {
            return Err(IoError::ZeroCapacity);
        }

        let slot = buffer.receive_slot();
        match receive_in_mode(stream, mode, |mut stream| stream.read(slot)) {
            Ok(0) => Ok(Received::PeerClosed),
            Ok(count) => {
                buffer.set_filled(count);
                Ok(Received::Data(count))
            }
            Err(error)
                if mode == ReceiveMode::NonBlocking && error.kind() == io::ErrorKind::WouldBlock =>
            {
                Ok(Received::NoData)
            }
            Err(error) => {
                tracing::error!(%error, "failed to receive");
                Err(IoError::Os(error))
            }
        }
    }

    fn connected_stream(&self) -> Result<&TcpStream, IoError> {
        match self.descriptor()? {
            Descriptor::Stream(stream) => Ok(stream),
            _ => Err(self.wrong_mode()),
        }
    }
}
