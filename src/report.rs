//! Progress reporting and confirmation prompts.
//!
//! Every component that talks to the user receives a `&dyn Report`.
//! `Console` writes colored lines to the terminal; `Recorder` keeps the
//! messages in memory and answers prompts with a fixed choice.

use std::cell::RefCell;
use std::io::{self, BufRead, Write};

use termion::color;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Info,
    Success,
    Warning,
    Error,
}

pub trait Report {
    fn message(&self, level: Level, text: &str);

    /// Asks a yes/no question. Returns `default` when no answer can be read.
    fn confirm(&self, question: &str, default: bool) -> bool;

    fn info(&self, text: &str) {
        self.message(Level::Info, text)
    }

    fn success(&self, text: &str) {
        self.message(Level::Success, text)
    }

    fn warning(&self, text: &str) {
        self.message(Level::Warning, text)
    }

    fn error(&self, text: &str) {
        self.message(Level::Error, text)
    }
}

pub struct Console {
    quiet: bool,
}

impl Console {
    pub fn new(quiet: bool) -> Console {
        Console { quiet }
    }
}

impl Report for Console {
    fn message(&self, level: Level, text: &str) {
        if self.quiet {
            return;
        }
        match level {
            Level::Info => println!("{}", text),
            Level::Success => println!(
                "{green}{text}{reset}",
                green = color::Fg(color::Green),
                text = text,
                reset = color::Fg(color::Reset)
            ),
            Level::Warning => println!(
                "{magenta}[WARNING] {text}{reset}",
                magenta = color::Fg(color::Magenta),
                text = text,
                reset = color::Fg(color::Reset)
            ),
            Level::Error => println!(
                "{red}[ERROR] {text}{reset}",
                red = color::Fg(color::Red),
                text = text,
                reset = color::Fg(color::Reset)
            ),
        }
    }

    fn confirm(&self, question: &str, default: bool) -> bool {
        if self.quiet {
            return default;
        }
        let stdin = io::stdin();
        let mut lines = stdin.lock().lines();
        loop {
            print!("{} [y/n] ", question);
            // a failed flush only hides the prompt
            let _ = io::stdout().flush();
            let answer = match lines.next() {
                Some(Ok(line)) => line,
                _ => return default,
            };
            match answer.trim().to_lowercase().as_str() {
                "y" | "yes" | "1" | "true" => return true,
                "n" | "no" | "0" | "false" => return false,
                _ => continue,
            }
        }
    }
}

/// Keeps every message and answers every prompt with `answer`.
pub struct Recorder {
    answer: bool,
    messages: RefCell<Vec<(Level, String)>>,
    questions: RefCell<Vec<String>>,
}

impl Recorder {
    pub fn new(answer: bool) -> Recorder {
        Recorder {
            answer,
            messages: RefCell::new(Vec::new()),
            questions: RefCell::new(Vec::new()),
        }
    }

    pub fn messages(&self) -> Vec<(Level, String)> {
        self.messages.borrow().clone()
    }

    pub fn questions(&self) -> Vec<String> {
        self.questions.borrow().clone()
    }

    pub fn count(&self, level: Level) -> usize {
        self.messages
            .borrow()
            .iter()
            .filter(|(l, _)| *l == level)
            .count()
    }
}

impl Report for Recorder {
    fn message(&self, level: Level, text: &str) {
        self.messages.borrow_mut().push((level, text.to_string()));
    }

    fn confirm(&self, question: &str, _default: bool) -> bool {
        self.questions.borrow_mut().push(question.to_string());
        self.answer
    }
}
