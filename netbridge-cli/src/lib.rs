//! `netbridge-server` and `netbridge-client`
//!
//! The client reads lines from stdin and sends them to the server, which prints every message it
//! receives. Both run over IPv4 or IPv6 and in stream or datagram mode.

#![forbid(unsafe_code)]
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

use netbridge_net::{AddressFamily, DEFAULT_SERVICE, NetConfig, TransportMode};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::filter::LevelFilter;

mod client;
mod server;

pub use client::ClientArguments;
pub use server::ServerArguments;

/// Message that ends a session.
pub const EXIT_MESSAGE: &str = "exit";

/// Options shared by both programs.
#[derive(clap::Args, Debug, Clone, PartialEq, Eq)]
struct Common {
    /// Use IPv4 addresses (the default).
    #[arg(short = '4', long = "ipv4", conflicts_with = "ipv6")]
    ipv4: bool,

    /// Use IPv6 addresses.
    #[arg(short = '6', long = "ipv6")]
    ipv6: bool,

    /// Transport to use.
    #[arg(short, long, value_enum, default_value_t = TransportMode::Stream)]
    mode: TransportMode,

    /// Port of the server.
    #[arg(short = 'p', long = "port", env = "NETBRIDGE_PORT", default_value = DEFAULT_SERVICE)]
    service: String,
}

impl Common {
    fn family(&self) -> AddressFamily {
        match (self.ipv4, self.ipv6) {
            (false, true) => AddressFamily::Ipv6,
            _ => AddressFamily::Ipv4,
        }
    }

    fn config(&self) -> NetConfig {
        NetConfig {
            service: self.service.clone(),
            ..NetConfig::with_family(self.family())
        }
    }
}

/// Parses the process arguments, exiting on `--help`, `--version` or invalid arguments.
///
/// Help and version exit with 0, every argument error with 1.
pub fn parse_arguments<T: clap::Parser>() -> T {
    T::try_parse().unwrap_or_else(|error| {
        let code = argument_exit_code(&error);
        if let Err(print_error) = error.print() {
            eprintln!("{print_error}");
        }
        std::process::exit(code)
    })
}

/// Exit status for an argument parsing outcome.
fn argument_exit_code(error: &clap::Error) -> i32 {
    if error.use_stderr() { 1 } else { 0 }
}

/// Installs the stderr log subscriber, filtered through `NETBRIDGE_LOG` (default `info`).
pub fn init_logging() -> anyhow::Result<()> {
    tracing::subscriber::set_global_default(
        tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::builder()
                    .with_default_directive(LevelFilter::INFO.into())
                    .with_env_var("NETBRIDGE_LOG")
                    .from_env()?,
            )
            .with_writer(std::io::stderr)
            .compact()
            .finish(),
    )?;
    Ok(())
}
