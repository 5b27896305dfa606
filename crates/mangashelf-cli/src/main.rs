use mangashelf_core::logging;

mod cli;

use crate::cli::CliCommand;

#[tokio::main]
async fn main() {
    // Initialize logging as early as possible; stderr only if the log file is unavailable.
    if let Err(err) = logging::init_logging() {
        logging::init_logging_stderr();
        tracing::warn!("file logging disabled: {:#}", err);
    }

    if let Err(err) = CliCommand::run_from_args().await {
        eprintln!("mangashelf error: {:#}", err);
        std::process::exit(1);
    }
}
