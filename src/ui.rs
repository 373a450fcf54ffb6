// UI layer: the operator-facing side of the CLI. Prompts go through the
// `Terminal` trait so flows can run against a real console (`dialoguer`)
// or against any reader/writer pair (piped stdin, tests).

use std::io::{self, BufRead, IsTerminal, StdinLock, Stdout, Write};
use std::time::Duration;

use dialoguer::{Input, Password};
use indicatif::{ProgressBar, ProgressStyle};

use crate::api::ResourceDocument;

/// Label of the action prompt.
pub const CHOOSE_ACTION: &str = "Choose action";

/// Minimal input/output capability used by the selector and auth flows.
pub trait Terminal {
    /// Show `label` and read one line of input.
    fn prompt_line(&mut self, label: &str) -> io::Result<String>;

    /// Like `prompt_line`, masking the input where possible.
    fn prompt_secret(&mut self, label: &str) -> io::Result<String>;

    /// Show the names the operator can choose from.
    fn display_choices(&mut self, names: &[String]) -> io::Result<()>;

    /// Print a message on its own line.
    fn say(&mut self, message: &str) -> io::Result<()>;
}

/// Line-oriented terminal over any reader and writer. End of input reads
/// as an empty line.
pub struct LineTerminal<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> LineTerminal<R, W> {
    pub fn new(input: R, output: W) -> Self {
        LineTerminal { input, output }
    }

    pub fn into_output(self) -> W {
        self.output
    }

    fn read_line(&mut self) -> io::Result<String> {
        let mut line = String::new();
        self.input.read_line(&mut line)?;
        while line.ends_with('\n') || line.ends_with('\r') {
            line.pop();
        }
        Ok(line)
    }
}

impl<R: BufRead, W: Write> Terminal for LineTerminal<R, W> {
    fn prompt_line(&mut self, label: &str) -> io::Result<String> {
        write!(self.output, "{}: ", label)?;
        self.output.flush()?;
        self.read_line()
    }

    // Piped input has nothing to mask.
    fn prompt_secret(&mut self, label: &str) -> io::Result<String> {
        self.prompt_line(label)
    }

    fn display_choices(&mut self, names: &[String]) -> io::Result<()> {
        writeln!(self.output, "Available actions: [{}]", names.join(" "))
    }

    fn say(&mut self, message: &str) -> io::Result<()> {
        writeln!(self.output, "{}", message)
    }
}

/// The process console: `dialoguer` prompts when stdin is a terminal,
/// plain line reads otherwise.
pub enum ConsoleTerminal {
    Interactive,
    Piped(LineTerminal<StdinLock<'static>, Stdout>),
}

impl ConsoleTerminal {
    pub fn detect() -> Self {
        if io::stdin().is_terminal() {
            ConsoleTerminal::Interactive
        } else {
            ConsoleTerminal::Piped(LineTerminal::new(io::stdin().lock(), io::stdout()))
        }
    }
}

impl Terminal for ConsoleTerminal {
    fn prompt_line(&mut self, label: &str) -> io::Result<String> {
        match self {
            ConsoleTerminal::Interactive => Input::<String>::new()
                .with_prompt(label)
                .allow_empty(true)
                .interact_text(),
            ConsoleTerminal::Piped(term) => term.prompt_line(label),
        }
    }

    fn prompt_secret(&mut self, label: &str) -> io::Result<String> {
        match self {
            // `Password` hides input in terminal for passwords.
            ConsoleTerminal::Interactive => Password::new()
                .with_prompt(label)
                .allow_empty_password(true)
                .interact(),
            ConsoleTerminal::Piped(term) => term.prompt_secret(label),
        }
    }

    fn display_choices(&mut self, names: &[String]) -> io::Result<()> {
        match self {
            ConsoleTerminal::Interactive => {
                println!("Available actions: [{}]", names.join(" "));
                Ok(())
            }
            ConsoleTerminal::Piped(term) => term.display_choices(names),
        }
    }

    fn say(&mut self, message: &str) -> io::Result<()> {
        match self {
            ConsoleTerminal::Interactive => {
                println!("{}", message);
                Ok(())
            }
            ConsoleTerminal::Piped(term) => term.say(message),
        }
    }
}

/// Link names of `doc` the operator can pick, sorted, without `self`.
pub fn choices(doc: &ResourceDocument) -> Vec<String> {
    doc.choosable().map(str::to_string).collect()
}

/// Present `names` and read the operator's answer. The answer is not
/// checked against `names`.
pub fn choose_action<T: Terminal + ?Sized>(term: &mut T, names: &[String]) -> io::Result<String> {
    term.display_choices(names)?;
    let answer = term.prompt_line(CHOOSE_ACTION)?;
    Ok(answer.trim().to_string())
}

/// Spinner shown while a request is in flight. Hidden when stderr is not
/// a terminal.
pub fn spinner(message: &str) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner} {msg}") {
        spinner.set_style(style);
    }
    spinner.set_message(message.to_string());
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner
}
