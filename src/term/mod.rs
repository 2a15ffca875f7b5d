extern crate ansi_term;
extern crate ctrlc;
extern crate linefeed;
use ansi_term::Style;
use linefeed::{Interface, ReadResult};
use nmacro::mach::{Event, Function, Runtime};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

const PROMPT: &str = "> ";
const CONTINUE: &str = ". ";

/// Runs the files named on the command line, or an interactive prompt
/// when there are none. Returns the process exit code.
pub fn main() -> i32 {
    let interrupted = Arc::new(AtomicBool::new(false));
    let int_moved = interrupted.clone();
    if let Err(error) = ctrlc::set_handler(move || {
        int_moved.store(true, Ordering::SeqCst);
    }) {
        eprintln!("Error setting Ctrl-C handler: {}", error);
    }
    let files: Vec<String> = std::env::args().skip(1).collect();
    if !files.is_empty() {
        return run_files(&files, interrupted);
    }
    match main_loop(interrupted) {
        Ok(()) => 0,
        Err(error) => {
            eprintln!("{}", error);
            1
        }
    }
}

fn check_interrupt(runtime: &mut Runtime, interrupted: &AtomicBool) {
    if interrupted.load(Ordering::SeqCst) {
        runtime.interrupt();
        interrupted.store(false, Ordering::SeqCst);
    }
}

fn run_files(files: &[String], interrupted: Arc<AtomicBool>) -> i32 {
    let mut runtime = Runtime::default();
    let mut failed = false;
    for filename in files {
        let text = match std::fs::read_to_string(filename) {
            Ok(text) => text,
            Err(error) => {
                eprintln!("{}: {}", filename, error);
                return 1;
            }
        };
        runtime.enter(&text);
        loop {
            check_interrupt(&mut runtime, &interrupted);
            match runtime.execute(runtime.limits().cycles) {
                Event::Stopped => break,
                Event::Running | Event::Done(_) => {}
                Event::Print(s) => print!("{}", s),
                Event::Errors(errors) => {
                    failed = true;
                    for error in errors.iter() {
                        eprintln!("{}: {}", filename, Style::new().bold().paint(error.to_string()));
                    }
                }
            }
        }
        if failed {
            break;
        }
    }
    if failed {
        1
    } else {
        0
    }
}

fn main_loop(interrupted: Arc<AtomicBool>) -> std::io::Result<()> {
    let mut runtime = Runtime::default();
    let command = Interface::new("nmacro")?;
    command.set_prompt(PROMPT)?;
    let mut pending = String::new();

    loop {
        check_interrupt(&mut runtime, &interrupted);
        match runtime.execute(runtime.limits().cycles) {
            Event::Stopped => {
                let line = match command.read_line()? {
                    ReadResult::Input(line) => line,
                    ReadResult::Signal(_) | ReadResult::Eof => break,
                };
                if pending.is_empty() {
                    if let Some(name) = line.trim().strip_prefix(":dis") {
                        disassemble(&command, &runtime, name.trim())?;
                        command.add_history_unique(line);
                        continue;
                    }
                }
                match line.strip_suffix('\\') {
                    Some(joined) => pending.push_str(joined),
                    None => {
                        pending.push_str(&line);
                        pending.push('\n');
                    }
                }
                command.add_history_unique(line.clone());
                if line.ends_with('\\') || brace_depth(&pending) > 0 {
                    command.set_prompt(CONTINUE)?;
                    continue;
                }
                command.set_prompt(PROMPT)?;
                runtime.enter(&std::mem::take(&mut pending));
            }
            Event::Errors(errors) => {
                for error in errors.iter() {
                    command.write_fmt(format_args!(
                        "{}\n",
                        Style::new().bold().paint(error.to_string())
                    ))?;
                }
            }
            Event::Running => {}
            Event::Print(s) => {
                command.write_fmt(format_args!("{}", s))?;
            }
            Event::Done(val) => {
                if val.is_set() {
                    command.write_fmt(format_args!("{}\n", val))?;
                }
            }
        }
    }
    Ok(())
}

fn disassemble<T: linefeed::Terminal>(
    command: &Interface<T>,
    runtime: &Runtime,
    name: &str,
) -> std::io::Result<()> {
    match runtime.function(name) {
        Some(Function::Macro(program)) => command.write_fmt(format_args!("{}", program)),
        Some(Function::Builtin(_)) => {
            command.write_fmt(format_args!("{} is a built-in\n", name))
        }
        None => command.write_fmt(format_args!(
            "{}\n",
            Style::new()
                .bold()
                .paint(format!("not a function or subroutine: {}", name))
        )),
    }
}

/// Open braces not yet closed, outside strings and comments.
fn brace_depth(text: &str) -> i32 {
    let mut depth = 0;
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        match c {
            '{' => depth += 1,
            '}' => depth -= 1,
            '#' => {
                for c in chars.by_ref() {
                    if c == '\n' {
                        break;
                    }
                }
            }
            '"' => {
                while let Some(c) = chars.next() {
                    match c {
                        '\\' => {
                            chars.next();
                        }
                        '"' | '\n' => break,
                        _ => {}
                    }
                }
            }
            _ => {}
        }
    }
    depth
}
