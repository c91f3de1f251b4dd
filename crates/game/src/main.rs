use std::process::ExitCode;

use tracing::error;

fn main() -> ExitCode {
    match eco_ranger::build_app() {
        Ok(app) => eco_ranger::run(app),
        Err(err) => {
            error!(error = %err, "startup_failed");
            eprintln!("eco_ranger: {err}");
            ExitCode::FAILURE
        }
    }
}
