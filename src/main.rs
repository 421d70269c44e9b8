use human_panic::{metadata, setup_panic};
use log::error;
use mesplan::ISSUES_URL;
use mesplan::cli::run_cli;
use mesplan::log::is_logger_initialised;

fn main() {
    setup_panic!(metadata!().support(format!("Open an issue on Github: {ISSUES_URL}")));

    if let Err(err) = run_cli() {
        if is_logger_initialised() {
            error!("{err:?}");
        } else {
            eprintln!("Error: {err:?}");
        }

        // Terminate program, signalling an error
        std::process::exit(1);
    }
}
