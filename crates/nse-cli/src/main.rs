use std::{env, process::ExitCode, time::Instant};

use nse::Interpreter;

fn main() -> ExitCode {
    let args: Vec<String> = env::args().collect();
    let file_path = if args.len() > 1 { &args[1] } else { "example.nse" };

    eprintln!("Reading file: {file_path}");
    let mut interp = Interpreter::new();

    let start = Instant::now();
    match interp.load_file(file_path) {
        Ok(value) => {
            let elapsed = start.elapsed();
            eprintln!("success after: {elapsed:?}\n{value}");
            ExitCode::SUCCESS
        }
        Err(err) => {
            let elapsed = start.elapsed();
            eprintln!("error after: {elapsed:?}\n{err}");
            for frame in err.stack_trace.iter().rev() {
                eprintln!("  in {}", frame.callee);
            }
            ExitCode::FAILURE
        }
    }
}
