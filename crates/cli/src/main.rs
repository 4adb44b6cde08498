use std::process::ExitCode;

fn main() -> ExitCode {
    buyline_cli::run()
}
