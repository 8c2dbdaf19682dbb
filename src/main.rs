use std::process::ExitCode;

fn main() -> ExitCode {
    hugo_deps::cli::run()
}
