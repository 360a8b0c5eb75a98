//! Line-based prompting over any `BufRead` / `Write` pair.
//!
//! End of input is reported as `None` everywhere so callers can abort
//! cleanly instead of spinning on an exhausted stdin.

use std::fmt::Display;
use std::io::{BufRead, Write};
use std::str::FromStr;

use anyhow::Result;
use chrono::{Datelike, NaiveDate};

use engtrack_core::{parse_date_input, ClientSelector, Engagement, SelectorOutcome};

pub struct Console<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> Console<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    pub fn output(&mut self) -> &mut W {
        &mut self.output
    }

    pub fn say(&mut self, line: impl Display) -> Result<()> {
        writeln!(self.output, "{line}")?;
        Ok(())
    }

    /// Prompt and read one line, trimmed. `None` on end of input.
    pub fn ask(&mut self, prompt: &str) -> Result<Option<String>> {
        write!(self.output, "{prompt}")?;
        self.output.flush()?;
        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            writeln!(self.output)?;
            return Ok(None);
        }
        Ok(Some(line.trim().to_string()))
    }

    /// Prompt for a value of type `T`. Unparseable input prints an error
    /// and yields `None`; the caller abandons the operation.
    pub fn ask_parsed<T: FromStr>(&mut self, prompt: &str, what: &str) -> Result<Option<T>> {
        let Some(answer) = self.ask(prompt)? else {
            return Ok(None);
        };
        match answer.parse::<T>() {
            Ok(v) => Ok(Some(v)),
            Err(_) => {
                self.say(format!("Invalid {what}: {answer:?}"))?;
                Ok(None)
            }
        }
    }

    pub fn ask_yes_no(&mut self, prompt: &str) -> Result<Option<bool>> {
        let Some(answer) = self.ask(prompt)? else {
            return Ok(None);
        };
        match answer.to_lowercase().as_str() {
            "y" | "yes" => Ok(Some(true)),
            "n" | "no" => Ok(Some(false)),
            _ => {
                self.say(format!("Please answer y or n, got {answer:?}"))?;
                Ok(None)
            }
        }
    }

    /// Re-prompt until the input is a valid calendar date.
    pub fn validate_date(&mut self, prompt: &str) -> Result<Option<NaiveDate>> {
        loop {
            let Some(answer) = self.ask(prompt)? else {
                return Ok(None);
            };
            match parse_date_input(&answer) {
                Some(date) if (1..=12).contains(&date.month()) => return Ok(Some(date)),
                _ => self.say("Invalid date. Use MM/DD/YYYY (or YYYY-MM-DD).")?,
            }
        }
    }

    /// Drive a [`ClientSelector`] until the user picks a client or gives up.
    pub fn select_client(
        &mut self,
        engagements: &[Engagement],
        prompt: &str,
    ) -> Result<Option<String>> {
        let mut selector = ClientSelector::new(engagements);
        self.say("Type part of a client name, a number, or :list to show all (blank to cancel).")?;
        loop {
            let Some(answer) = self.ask(prompt)? else {
                return Ok(None);
            };
            match selector.feed(&answer) {
                SelectorOutcome::Selected(name) => return Ok(Some(name)),
                SelectorOutcome::Cancelled => return Ok(None),
                SelectorOutcome::Listed(names) => {
                    if names.is_empty() {
                        self.say("No clients recorded.")?;
                    }
                    for (i, name) in names.iter().enumerate() {
                        self.say(format!("  {}. {name}", i + 1))?;
                    }
                }
                SelectorOutcome::NoMatch(query) => {
                    self.say(format!("No client matches {query:?}."))?;
                }
                SelectorOutcome::Ambiguous(matches) => {
                    self.say("Multiple matches:")?;
                    for (i, name) in matches.iter().enumerate() {
                        self.say(format!("  {}. {name}", i + 1))?;
                    }
                    self.say("Enter a number to choose.")?;
                }
                SelectorOutcome::OutOfRange { index, max } => {
                    self.say(format!("{index} is out of range (1-{max})."))?;
                }
            }
        }
    }
}
