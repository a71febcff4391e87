use std::process::ExitCode;

fn main() -> ExitCode {
    pianoroll_bridge_lib::run()
}
