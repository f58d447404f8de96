use std::io::BufRead;

use anyhow::Context;
use netbridge_net::{
    BoundedBuffer, ClientBootstrap, DEFAULT_MAX_PAYLOAD, IoError, NetConfig, SocketHandle,
    TransportMode,
};

use crate::{Common, EXIT_MESSAGE};

/// Sends lines read from stdin to `netbridge-server`.
///
/// Sending `exit` ends the client, as does the end of input.
#[derive(clap::Parser, Debug)]
#[command(version, about)]
pub struct ClientArguments {
    #[command(flatten)]
    common: Common,

    /// Host name or IP address of the server.
    #[arg(short, long, visible_alias = "destino")]
    destination: String,

    /// Largest chunk sent at once; longer lines are split.
    #[arg(long, default_value_t = DEFAULT_MAX_PAYLOAD)]
    max_payload: usize,
}

impl ClientArguments {
    pub(crate) fn config(&self) -> NetConfig {
        NetConfig {
            max_payload: self.max_payload,
            ..self.common.config()
        }
    }

    pub(crate) fn destination(&self) -> &str {
        &self.destination
    }

    /// Connects and sends stdin until `exit` or end of input.
    pub fn run(self) -> anyhow::Result<()> {
        let config = self.config();
        anyhow::ensure!(config.max_payload > 0, "--max-payload must be at least 1");
        println!("Using address family {}", config.family);

        let mut handle = ClientBootstrap::new(&config)
            .connect(&self.destination, &config.service, self.common.mode)
            .with_context(|| format!("connecting to {}:{}", self.destination, config.service))?;

        let sent = send_lines(&mut handle, std::io::stdin().lock(), config.max_payload)?;
        tracing::debug!(sent, "input finished");

        handle.close();
        println!("Shutting down client...");
        Ok(())
    }
}

/// Sends each line of `input` in chunks of at most `max_payload` bytes and returns the number of
/// lines sent.
///
/// Stops after the `exit` line or at the end of `input`. Empty lines send nothing.
fn send_lines(
    handle: &mut SocketHandle,
    input: impl BufRead,
    max_payload: usize,
) -> anyhow::Result<usize> {
    let mut message = BoundedBuffer::new(max_payload);
    let mut sent = 0;
    for line in input.lines() {
        let line = line.context("reading input")?;
        for chunk in line.as_bytes().chunks(max_payload) {
            message.clear();
            message.extend_from_slice(chunk)?;
            send_chunk(handle, message.as_slice()).context("sending message")?;
        }
        sent += 1;

        if line == EXIT_MESSAGE {
            break;
        }
    }
    Ok(sent)
}

fn send_chunk(handle: &mut SocketHandle, chunk: &[u8]) -> Result<(), IoError> {
    match handle.mode() {
        TransportMode::Stream => handle.send_all(chunk),
        TransportMode::Datagram => handle.send_to_destination(chunk).map(|_| ()),
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use std::io::Cursor;

    use netbridge_net::{
        BoundedBuffer, ClientBootstrap, NetConfig, ReceiveMode, ReceivedDatagram,
        ServerBootstrap, SocketHandle, TransportMode,
    };
    use pretty_assertions::assert_eq;

    use super::send_lines;

    fn datagram_pair() -> (SocketHandle, SocketHandle) {
        let server = ServerBootstrap::new(&NetConfig::default())
            .bind("0", TransportMode::Datagram)
            .unwrap();
        let port = server.local_addr().unwrap().port().to_string();
        let client = ClientBootstrap::new(&NetConfig::default())
            .connect("127.0.0.1", &port, TransportMode::Datagram)
            .unwrap();
        (server, client)
    }

    /// Receives `count` datagrams, then checks that nothing else is pending.
    fn received(server: &mut SocketHandle, count: usize) -> Vec<String> {
        let mut buffer = BoundedBuffer::new(100);
        let mut messages = Vec::new();
        for _ in 0..count {
            server
                .receive_from(&mut buffer, ReceiveMode::Blocking)
                .unwrap();
            messages.push(buffer.to_string_lossy().into_owned());
        }
        assert_eq!(
            server
                .receive_from(&mut buffer, ReceiveMode::NonBlocking)
                .unwrap(),
            ReceivedDatagram::NoData
        );
        messages
    }

    #[test]
    fn stops_after_exit_line() {
        let (mut server, mut client) = datagram_pair();

        let sent = send_lines(&mut client, Cursor::new("hello\nexit\nignored\n"), 100).unwrap();

        assert_eq!(sent, 2);
        assert_eq!(received(&mut server, 2), ["hello", "exit"]);
    }

    #[test]
    fn long_lines_are_chunked() {
        let (mut server, mut client) = datagram_pair();

        let sent = send_lines(&mut client, Cursor::new("abcdefgh"), 3).unwrap();

        assert_eq!(sent, 1);
        assert_eq!(received(&mut server, 3), ["abc", "def", "gh"]);
    }
}
