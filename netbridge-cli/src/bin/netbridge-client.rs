//! Sends lines from stdin to `netbridge-server`.

#![forbid(unsafe_code)]

use netbridge_cli::ClientArguments;

fn main() -> anyhow::Result<()> {
    let arguments: ClientArguments = netbridge_cli::parse_arguments();
    netbridge_cli::init_logging()?;
    arguments.run()
}
