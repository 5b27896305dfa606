//! CLI command handlers, one file per subcommand.

mod covers;
mod io;
mod publishers;

pub use covers::{run_covers_command, CoversArgs};
pub use publishers::run_publishers_command;
