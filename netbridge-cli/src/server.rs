use std::io::{self, Write};
use std::thread;

use anyhow::Context;
use netbridge_net::{
    BoundedBuffer, DEFAULT_BACKLOG, DEFAULT_MAX_PAYLOAD, NetConfig, PeerAddress, ReceiveMode,
    Received, ReceivedDatagram, ServerBootstrap, SetupError, SocketHandle, TransportMode,
};

use crate::{Common, EXIT_MESSAGE};

/// Prints every message received from `netbridge-client`.
///
/// A stream session ends when the client sends `exit` or closes the connection. In datagram mode
/// the server stops after the first `exit` message.
#[derive(clap::Parser, Debug)]
#[command(version, about)]
pub struct ServerArguments {
    #[command(flatten)]
    common: Common,

    /// Pending connections queued while the server is busy.
    #[arg(long, default_value_t = DEFAULT_BACKLOG)]
    backlog: i32,

    /// Serve a single stream connection, then exit.
    #[arg(long)]
    once: bool,

    /// Largest message read at once.
    #[arg(long, default_value_t = DEFAULT_MAX_PAYLOAD)]
    max_payload: usize,
}

impl ServerArguments {
    pub(crate) fn config(&self) -> NetConfig {
        NetConfig {
            backlog: self.backlog,
            max_payload: self.max_payload,
            ..self.common.config()
        }
    }

    pub(crate) fn mode(&self) -> TransportMode {
        self.common.mode
    }

    /// Runs the server until it is done or a setup step fails.
    pub fn run(self) -> anyhow::Result<()> {
        let config = self.config();
        anyhow::ensure!(config.max_payload > 0, "--max-payload must be at least 1");
        println!("Using address family {}", config.family);

        let bootstrap = ServerBootstrap::new(&config);
        match self.mode() {
            TransportMode::Stream => {
                let listener = bootstrap
                    .bind_listening(&config.service)
                    .with_context(|| format!("listening on port {}", config.service))?;
                serve_stream(&listener, config.max_payload, self.once)
            }
            TransportMode::Datagram => {
                let socket = bootstrap
                    .bind(&config.service, TransportMode::Datagram)
                    .with_context(|| format!("binding port {}", config.service))?;
                serve_datagrams(socket, config.max_payload, &mut std::io::stdout())
            }
        }?;

        println!("Shutting down server...");
        Ok(())
    }
}

/// Accepts connections and serves each in its own thread, or only the first with `once`.
///
/// Without `once`, an aborted or interrupted accept is skipped; any other accept failure ends the
/// server.
fn serve_stream(listener: &SocketHandle, max_payload: usize, once: bool) -> anyhow::Result<()> {
    loop {
        let (connection, peer) = match listener.accept() {
            Ok(accepted) => accepted,
            Err(error) if !once && is_transient(&error) => {
                tracing::warn!(?error, "skipping failed connection");
                continue;
            }
            Err(error) => return Err(error).context("accepting connection"),
        };
        tracing::info!(%peer, "client connected");

        if once {
            return serve_connection(connection, &peer, max_payload, &mut std::io::stdout());
        }

        thread::spawn(move || {
            if let Err(error) =
                serve_connection(connection, &peer, max_payload, &mut std::io::stdout())
            {
                tracing::error!(?error, %peer, "session failed");
            }
        });
    }
}

/// Whether an accept failure only affected one pending connection.
fn is_transient(error: &SetupError) -> bool {
    matches!(
        error,
        SetupError::Accept(error)
            if matches!(
                error.kind(),
                io::ErrorKind::ConnectionAborted | io::ErrorKind::Interrupted
            )
    )
}

/// Prints messages from one connection until the peer sends `exit` or closes it.
fn serve_connection(
    mut connection: SocketHandle,
    peer: &PeerAddress,
    max_payload: usize,
    output: &mut impl Write,
) -> anyhow::Result<()> {
    let mut buffer = BoundedBuffer::new(max_payload);
    loop {
        match connection
            .receive(&mut buffer, ReceiveMode::Blocking)
            .context("receiving from client")?
        {
            Received::Data(count) => {
                report(output, count, peer, &buffer)?;
                if buffer.as_slice() == EXIT_MESSAGE.as_bytes() {
                    break;
                }
            }
            Received::PeerClosed => {
                tracing::info!(%peer, "client closed the connection");
                break;
            }
            Received::NoData => {}
        }
    }

    connection.close();
    Ok(())
}

/// Prints datagrams from any peer until one of them sends `exit`.
fn serve_datagrams(
    mut socket: SocketHandle,
    max_payload: usize,
    output: &mut impl Write,
) -> anyhow::Result<()> {
    let mut buffer = BoundedBuffer::new(max_payload);
    loop {
        match socket
            .receive_from(&mut buffer, ReceiveMode::Blocking)
            .context("receiving datagram")?
        {
            ReceivedDatagram::Data {
                len,
                peer,
                truncated,
            } => {
                if truncated {
                    tracing::warn!(%peer, max_payload, "datagram truncated");
                }
                report(output, len, &peer, &buffer)?;
                if buffer.as_slice() == EXIT_MESSAGE.as_bytes() {
                    break;
                }
            }
            ReceivedDatagram::NoData => {}
        }
    }

    socket.close();
    Ok(())
}

fn report(
    output: &mut impl Write,
    count: usize,
    peer: &PeerAddress,
    buffer: &BoundedBuffer,
) -> anyhow::Result<()> {
    writeln!(output, "-------------------------------------------------")?;
    writeln!(output, "{count} bytes received from {peer}")?;
    writeln!(output, "Message: \"{}\"", buffer.to_string_lossy())?;
    output.flush()?;
    Ok(())
}
