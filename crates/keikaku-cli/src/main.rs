use std::io::Write as _;
use std::{env, fs, io, process::ExitCode};

use keikaku::{ReplSession, Runner};

const VERSION: &str = env!("CARGO_PKG_VERSION");

fn main() -> ExitCode {
    let args: Vec<String> = env::args().skip(1).collect();

    match args.first().map(String::as_str) {
        Some("--help" | "-h") => {
            print_help();
            ExitCode::SUCCESS
        }
        Some("--version" | "-V") => {
            println!("keikaku {VERSION}");
            ExitCode::SUCCESS
        }
        Some(path) => run_file(path),
        None => run_repl(),
    }
}

fn print_help() {
    println!("keikaku {VERSION}");
    println!("Usage:");
    println!("  keikaku            start an interactive session");
    println!("  keikaku FILE       execute FILE");
    println!("  keikaku --help     print this message");
    println!("  keikaku --version  print the version");
}

fn run_file(path: &str) -> ExitCode {
    let code = match fs::read_to_string(path) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error reading {path}: {err}");
            return ExitCode::FAILURE;
        }
    };

    let runner = match Runner::new(&code, path) {
        Ok(runner) => runner,
        Err(err) => {
            eprintln!("{err}");
            return ExitCode::FAILURE;
        }
    };

    match runner.run_no_limits() {
        Ok(_) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{err}");
            ExitCode::FAILURE
        }
    }
}

fn run_repl() -> ExitCode {
    let mut session = ReplSession::new();
    let stdin = io::stdin();
    loop {
        let Some(snippet) = read_snippet(&stdin) else {
            return ExitCode::SUCCESS;
        };
        if snippet.trim().is_empty() {
            continue;
        }
        match session.execute(&snippet) {
            Ok((value, output)) => {
                print!("{output}");
                println!("{}", value.repr_string());
            }
            Err(err) => {
                eprintln!("{err}");
                let repeats = session.note_error(&err.to_string());
                if repeats >= 2 {
                    eprintln!("(same error {} times in a row)", repeats + 1);
                }
            }
        }
    }
}

/// Reads one top-level snippet: a single line, or — when the first line
/// ends with `:` and opens an indented block — that line plus every
/// following indented/blank line up to the next blank-terminated line.
fn read_snippet(stdin: &io::Stdin) -> Option<String> {
    prompt(">>> ");
    let mut snippet = String::new();
    if stdin.read_line(&mut snippet).ok()? == 0 {
        return None;
    }
    if snippet.trim_end().ends_with(':') {
        loop {
            prompt("... ");
            let mut line = String::new();
            if stdin.read_line(&mut line).ok()? == 0 || line.trim().is_empty() {
                break;
            }
            snippet.push_str(&line);
        }
    }
    Some(snippet)
}

fn prompt(text: &str) {
    print!("{text}");
    let _ = io::stdout().flush();
}
