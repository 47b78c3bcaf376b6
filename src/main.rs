//! aerodb-migrate entry point
//!
//! Parses arguments, dispatches to the CLI module, reports any error as a
//! JSON error response and on stderr, and exits non-zero on failure.
//! All work happens in `cli`.

use aerodb_migrate::cli;

fn main() {
    if let Err(e) = cli::run() {
        let _ = cli::write_error(e.code_str(), e.message());
        eprintln!("{}", e);
        std::process::exit(1);
    }
}
