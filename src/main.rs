//! modreg binary entry point

use std::process::ExitCode;

fn main() -> ExitCode {
    match modreg::cli::run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            modreg::ui::output::error(format!("{e:#}"));
            ExitCode::FAILURE
        }
    }
}
