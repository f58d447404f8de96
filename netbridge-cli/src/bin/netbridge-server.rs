//! Prints the messages `netbridge-client` sends.

#![forbid(unsafe_code)]

use netbridge_cli::ServerArguments;

fn main() -> anyhow::Result<()> {
    let arguments: ServerArguments = netbridge_cli::parse_arguments();
    netbridge_cli::init_logging()?;
    arguments.run()
}
