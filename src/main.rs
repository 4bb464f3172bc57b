use std::process::ExitCode;

fn main() -> ExitCode {
    vmhandles_cli::run_cli()
}
