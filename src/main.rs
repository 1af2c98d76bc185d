//! Discourse smoke test
//!
//! Drives a browser through the forum's key pages (and, unless
//! `READONLY_TESTS` is set, a login, a new topic and a reply), printing one
//! timed line per step. Exits 1 on the first failing step.

use clap::Parser;
use smoke::cli::{self, Args};
use smoke::common::{logging, Error};

#[tokio::main]
async fn main() {
    // There are no flags, so the only parse error is a wrong argument count
    let Ok(args) = Args::try_parse() else {
        println!("{}", Error::Usage);
        std::process::exit(1);
    };

    logging::init_cli();

    if let Err(e) = cli::run(args).await {
        if !e.is_step_outcome() {
            eprintln!("Error: {e}");
        }
        std::process::exit(1);
    }
}
