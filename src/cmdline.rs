use crate::environment::Environment;
use crate::printer::{pr_str, PrintMode};
use crate::{evaluator, interpreter, reader};
use ansi_term::Colour::Red;
use linefeed::{DefaultTerminal, Interface, ReadResult, Terminal};
use std::path::PathBuf;
use std::rc::Rc;

const PROMPT: &str = "quince> ";

#[derive(Debug)]
pub enum Error {
    Io(std::io::Error),
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

/// Entry point for the binary: a file argument is loaded and evaluated,
/// otherwise an interactive session starts.
pub fn launch(args: Vec<String>, env: &Rc<Environment>) -> Result<(), Error> {
    match args.get(1) {
        Some(path) => {
            if let Err(e) = interpreter::load_file(path, env) {
                report_fatal(&e);
                std::process::exit(1);
            }
            Ok(())
        }
        None => repl(env),
    }
}

pub fn setup() -> std::io::Result<Interface<DefaultTerminal>> {
    let interface = linefeed::Interface::new("quince")?;
    interface.set_prompt(PROMPT)?;
    if let Some(path) = history_path() {
        interface.load_history(path).ok();
    };
    Ok(interface)
}

fn history_path() -> Option<PathBuf> {
    match dirs::data_dir() {
        Some(mut path) => {
            path.push(".quince_history");
            Some(path)
        }
        None => None,
    }
}

pub fn save_history<T: Terminal>(interface: &Interface<T>) -> std::io::Result<()> {
    match history_path() {
        Some(path) => interface.save_history(path),
        None => Ok(()),
    }
}

fn read_one_line<T: Terminal>(interface: &Interface<T>) -> Result<Option<String>, Error> {
    match interface.read_line() {
        Ok(ReadResult::Eof) => Ok(None),
        Ok(ReadResult::Signal(sig)) => {
            writeln!(interface, "Received signal {:?}", sig).ok();
            Ok(Some(String::new()))
        }
        Ok(ReadResult::Input(line)) => Ok(Some(line)),
        Err(e) => Err(e.into()),
    }
}

pub fn repl(env: &Rc<Environment>) -> Result<(), Error> {
    let interface = setup()?;
    loop {
        let mut code = match read_one_line(&interface)? {
            None => break,
            Some(line) => line,
        };
        // Keep reading until every paren and string literal is closed,
        // indenting the continuation prompt under the innermost open paren.
        while !reader::balanced(&code) {
            let column = reader::indent(&code, &mut Vec::new(), 2);
            interface.set_prompt(&" ".repeat(column))?;
            match read_one_line(&interface)? {
                None => break,
                Some(line) => {
                    code.push(' ');
                    code.push_str(&line);
                }
            }
        }
        interface.set_prompt(PROMPT)?;
        if code.trim().is_empty() {
            continue;
        }
        interface.add_history_unique(code.clone());
        match interpreter::run(&code, env) {
            Ok(value) => {
                if !value.is_nil() {
                    writeln!(
                        interface,
                        "{}",
                        pr_str(&value, PrintMode::ReadableRepresentation)
                    )
                    .ok();
                }
            }
            // An error halts evaluation of this input; the session goes on.
            Err(e) => {
                let message = format!("ERROR: {}", e);
                if atty::is(atty::Stream::Stdout) {
                    writeln!(interface, "{}", Red.paint(message)).ok();
                } else {
                    writeln!(interface, "{}", message).ok();
                }
            }
        }
    }
    save_history(&interface)?;
    writeln!(interface, "\nBye.").ok();
    Ok(())
}

fn report_fatal(err: &evaluator::Error) {
    let message = format!("ERROR: {}", err);
    if atty::is(atty::Stream::Stderr) {
        eprintln!("{}", Red.paint(message));
    } else {
        eprintln!("{}", message);
    }
}
