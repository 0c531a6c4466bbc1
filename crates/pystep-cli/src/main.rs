use std::env;
use std::fs;
use std::process::ExitCode;
use std::time::Instant;

use pystep_core::state::{State, StepLimits};

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args: Vec<String> = env::args().collect();
    let file_path = if args.len() > 1 { &args[1] } else { "main.py" };
    let max_steps = args.get(2).and_then(|s| s.parse::<usize>().ok());

    let code = match read_file(file_path) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {err}");
            return ExitCode::FAILURE;
        }
    };

    let program = match pystep_surface::lower(&code) {
        Ok(program) => program,
        Err(err) => {
            eprintln!("error:\n{err}");
            return ExitCode::FAILURE;
        }
    };

    let mut state = State::create(program);
    let limits = StepLimits { max_steps, max_depth: None };

    let start = Instant::now();
    match state.run_to_completion(limits) {
        Ok(()) => {
            let elapsed = start.elapsed();
            let snapshot = state.snapshot();
            let rendered = serde_json::to_string_pretty(&snapshot).unwrap_or_else(|err| format!("<unprintable snapshot: {err}>"));
            eprintln!("success after: {elapsed:?}\n{rendered}");
            ExitCode::SUCCESS
        }
        Err(err) => {
            let elapsed = start.elapsed();
            eprintln!("error after: {elapsed:?}\n{err}");
            ExitCode::FAILURE
        }
    }
}

fn read_file(file_path: &str) -> Result<String, String> {
    eprintln!("Reading file: {file_path}");
    match fs::metadata(file_path) {
        Ok(metadata) => {
            if !metadata.is_file() {
                return Err(format!("Error: {file_path} is not a file"));
            }
        }
        Err(err) => {
            return Err(format!("Error reading {file_path}: {err}"));
        }
    }
    match fs::read_to_string(file_path) {
        Ok(contents) => Ok(contents),
        Err(err) => Err(format!("Error reading file: {err}")),
    }
}
