//! Binary entrypoint that serves the econews agent.

use std::process::ExitCode;

use econews_agent::start_econews_agent;

fn main() -> ExitCode {
    start_econews_agent::run()
}
