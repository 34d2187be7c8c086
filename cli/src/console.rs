use autodeploy_core::{Host, HostError, Tone};
use crossterm::style::{Color, Stylize};
use std::io::{self, BufRead, Write};

const BRAND: &str = "AutoDeploy:";

/// Line-oriented terminal host.
///
/// Reads answers from `input` and writes styled text to `output`; the stdio
/// pair is what the binary uses, tests swap in in-memory buffers.
pub struct Console<R, W> {
    input: R,
    output: W,
}

impl Console<io::BufReader<io::Stdin>, io::Stdout> {
    pub fn stdio() -> Self {
        Self::new(io::BufReader::new(io::stdin()), io::stdout())
    }
}

impl<R: BufRead, W: Write> Console<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    /// Line prefixed with the product name, used for the CLI's own prompts.
    pub fn announce(&mut self, text: &str) {
        let _ = writeln!(self.output, "{} {}", BRAND.with(Color::Magenta).bold(), text);
    }

    pub fn into_inner(self) -> (R, W) {
        (self.input, self.output)
    }

    fn read_line(&mut self) -> Result<String, HostError> {
        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Err(HostError::Closed);
        }
        Ok(line.trim_end_matches(['\r', '\n']).to_string())
    }

    fn prompt(&mut self, prompt: &str) -> Result<(), HostError> {
        write!(self.output, "{}", prompt.bold())?;
        self.output.flush()?;
        Ok(())
    }
}

impl<R: BufRead, W: Write> Host for Console<R, W> {
    fn say(&mut self, text: &str, tone: Tone) {
        let line = match tone {
            Tone::Plain => text.to_string(),
            Tone::Agent => format!("{} {}", BRAND.with(Color::Magenta).bold(), text),
            Tone::Info => text.with(Color::Cyan).to_string(),
            Tone::Success => text.with(Color::Green).bold().to_string(),
            Tone::Alert => text.with(Color::Red).bold().to_string(),
            Tone::Log => text.dim().to_string(),
        };
        // A closed stdout leaves nothing useful to report to.
        let _ = writeln!(self.output, "{}", line);
    }

    fn input(&mut self, prompt: &str) -> Result<String, HostError> {
        self.prompt(prompt)?;
        self.read_line()
    }

    fn confirm(&mut self, prompt: &str) -> Result<bool, HostError> {
        loop {
            self.prompt(&format!("{} [y/n]: ", prompt))?;
            match self.read_line()?.trim().to_ascii_lowercase().as_str() {
                "y" | "yes" => return Ok(true),
                "n" | "no" => return Ok(false),
                _ => self.say("Please answer 'y' or 'n'.", Tone::Alert),
            }
        }
    }
}
