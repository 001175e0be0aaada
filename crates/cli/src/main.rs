use std::process::ExitCode;

fn main() -> ExitCode {
    bakeplan_cli::run()
}
