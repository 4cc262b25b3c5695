use std::io::{self, BufRead};
use std::process::ExitCode;
use std::thread;
use std::time::Duration;

use log::{error, info};
use rustphorus_vm::{project, Config, StdHost};

fn main() -> ExitCode {
    pretty_env_logger::init();
    let path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "project.json".to_string());
    let config = Config::default();
    let frame = Duration::new(0, 1_000_000_000u32 / config.frame_rate.max(1));
    let mut engine = match project::load(&path, config, Box::new(StdHost::default())) {
        Ok(engine) => engine,
        Err(err) => {
            error!("{path}: {err}");
            eprintln!("{path}: {err}");
            return ExitCode::FAILURE;
        }
    };
    if !engine.unsupported_blocks().is_empty() {
        info!("unsupported blocks: {:?}", engine.unsupported_blocks());
    }
    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();
    engine.start();
    while engine.is_running() {
        engine.step();
        if engine.pending_question().is_some() {
            match lines.next() {
                Some(Ok(answer)) => engine.answer_question(&answer),
                _ => engine.stop(),
            }
        }
        thread::sleep(frame);
    }
    ExitCode::SUCCESS
}
