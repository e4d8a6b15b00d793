use std::process::ExitCode;

fn main() -> ExitCode {
    boxer_cli::run()
}
