use std::process::ExitCode;

use engine::run_app;
use tracing::info;

use super::bootstrap::AppWiring;

pub fn run(app: AppWiring) -> ExitCode {
    let AppWiring {
        config,
        mut scene,
        mut input,
    } = app;
    let summary = run_app(config, &mut scene, &mut input);

    let snapshot = scene.snapshot();
    let digest = snapshot.digest_hex();
    info!(
        ticks_run = summary.ticks_run,
        reason = summary.stop_reason.as_str(),
        digest = %digest,
        "run_complete"
    );
    println!("{}", snapshot.summary_line());
    println!("digest={digest}");

    ExitCode::SUCCESS
}
