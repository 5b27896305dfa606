//! CLI parse tests, one file per subcommand.

use super::{Cli, CliCommand};
use clap::Parser;

pub(super) fn parse(args: &[&str]) -> CliCommand {
    let cli = Cli::try_parse_from(args).unwrap();
    cli.command
}


#[test]
fn cli_requires_a_subcommand() {
    assert!(Cli::try_parse_from(["mangashelf"]).is_err());
    assert!(Cli::try_parse_from(["mangashelf", "download"]).is_err());
}
