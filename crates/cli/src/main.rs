use std::process::ExitCode;

fn main() -> ExitCode {
    normbot_cli::run()
}
