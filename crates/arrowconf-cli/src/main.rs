use std::process::ExitCode;

fn main() -> ExitCode {
    arrowconf_cli::run()
}
