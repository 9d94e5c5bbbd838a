//! Interactive counter selection.
//!
//! The prompt lists the candidate counters numbered from 1 and reads one line
//! per attempt. `0` aborts the whole run, a listed number selects that counter,
//! any other number re-prompts. What happens on non-numeric input is decided
//! by [`InvalidInput`].

use std::collections::BTreeSet;
use std::fmt;
use std::io::{self, BufRead, Write};

use tracing::{info, warn};

use crate::model::CounterDescriptor;

/// Handling of input that is not a number.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum InvalidInput {
    /// Fail the selection with a [`ParseError`].
    #[default]
    Fail,
    /// Report the bad input and prompt again.
    Reprompt,
}

/// Selection input that is not an integer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    pub input: String,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid selection '{}': expected a number", self.input)
    }
}

impl std::error::Error for ParseError {}

#[derive(Debug)]
pub enum SelectError {
    Parse(ParseError),
    Io(io::Error),
}

impl fmt::Display for SelectError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SelectError::Parse(e) => write!(f, "{}", e),
            SelectError::Io(e) => write!(f, "console I/O error: {}", e),
        }
    }
}

impl std::error::Error for SelectError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SelectError::Parse(e) => Some(e),
            SelectError::Io(e) => Some(e),
        }
    }
}

impl From<ParseError> for SelectError {
    fn from(e: ParseError) -> Self {
        SelectError::Parse(e)
    }
}

impl From<io::Error> for SelectError {
    fn from(e: io::Error) -> Self {
        SelectError::Io(e)
    }
}

/// Outcome of feeding one line to the selector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// Stay in the prompt. Carries the rejected number.
    Continue(i64),
    Select(BTreeSet<i32>),
    Abort,
}

/// Terminal result of a selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    Selected(BTreeSet<i32>),
    Aborted,
}

pub struct CounterSelector<'a> {
    counters: &'a [CounterDescriptor],
    invalid_input: InvalidInput,
}

impl<'a> CounterSelector<'a> {
    pub fn new(counters: &'a [CounterDescriptor]) -> Self {
        Self {
            counters,
            invalid_input: InvalidInput::default(),
        }
    }

    pub fn with_invalid_input(mut self, policy: InvalidInput) -> Self {
        self.invalid_input = policy;
        self
    }

    /// Applies one line of input to the prompt state.
    pub fn step(&self, line: &str) -> Result<Step, ParseError> {
        let input = line.trim();
        let n: i64 = input.parse().map_err(|_| ParseError {
            input: input.to_string(),
        })?;

        if n == 0 {
            return Ok(Step::Abort);
        }
        match usize::try_from(n) {
            Ok(pos) if pos <= self.counters.len() => {
                Ok(Step::Select(BTreeSet::from([self.counters[pos - 1].id])))
            }
            _ => Ok(Step::Continue(n)),
        }
    }

    /// Writes the numbered counter list and the prompt.
    pub fn display(&self, out: &mut impl Write) -> io::Result<()> {
        for (i, counter) in self.counters.iter().enumerate() {
            writeln!(out, "{} - {}", i + 1, counter.summary)?;
        }
        writeln!(out, "Please select a counter from the above list")?;
        write!(out, "Enter 0 to end: ")?;
        out.flush()
    }

    /// Prompts until a counter is selected or the user aborts.
    ///
    /// End of input counts as an abort.
    pub fn run(
        &self,
        input: &mut impl BufRead,
        output: &mut impl Write,
    ) -> Result<Selection, SelectError> {
        let mut line = String::new();
        loop {
            self.display(output)?;

            line.clear();
            if input.read_line(&mut line)? == 0 {
                writeln!(output)?;
                info!("end of input, aborting selection");
                return Ok(Selection::Aborted);
            }

            match self.step(&line) {
                Ok(Step::Abort) => return Ok(Selection::Aborted),
                Ok(Step::Select(ids)) => return Ok(Selection::Selected(ids)),
                Ok(Step::Continue(_)) => writeln!(output, "*** Value out of range!")?,
                Err(e) => match self.invalid_input {
                    InvalidInput::Fail => return Err(e.into()),
                    InvalidInput::Reprompt => {
                        warn!(input = %e.input, "ignoring non-numeric selection");
                        writeln!(output, "*** Please enter a number!")?;
                    }
                },
            }
        }
    }
}
