//! Client lookup as a small state machine, independent of console I/O.
//!
//! The driver feeds one line of user input at a time and renders the
//! returned [`SelectorOutcome`]. A multi-match search leaves a pending match
//! set behind so the next numeric entry picks from it; otherwise numbers
//! index the full sorted client list.

use crate::engagement::Engagement;

pub const LIST_COMMAND: &str = ":list";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectorState {
    AwaitingInput,
    PendingMatches(Vec<String>),
    Done(Option<String>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectorOutcome {
    /// The full client list, sorted ascending. Nothing is selected.
    Listed(Vec<String>),
    Selected(String),
    /// Blank input: the caller should abort.
    Cancelled,
    NoMatch(String),
    /// Several clients matched; they are now the pending match set.
    Ambiguous(Vec<String>),
    OutOfRange { index: usize, max: usize },
}

#[derive(Debug, Clone)]
pub struct ClientSelector {
    /// Distinct names in record order; searched by substring.
    names: Vec<String>,
    /// Distinct names sorted ascending; listed and indexed by number.
    sorted: Vec<String>,
    state: SelectorState,
}

impl ClientSelector {
    pub fn new(engagements: &[Engagement]) -> Self {
        let mut names: Vec<String> = Vec::new();
        for e in engagements {
            if !names.contains(&e.client_name) {
                names.push(e.client_name.clone());
            }
        }
        let mut sorted = names.clone();
        sorted.sort();
        Self {
            names,
            sorted,
            state: SelectorState::AwaitingInput,
        }
    }

    pub fn state(&self) -> &SelectorState {
        &self.state
    }

    pub fn is_done(&self) -> bool {
        matches!(self.state, SelectorState::Done(_))
    }

    pub fn sorted_names(&self) -> &[String] {
        &self.sorted
    }

    /// Advance the machine with one line of input.
    pub fn feed(&mut self, input: &str) -> SelectorOutcome {
        if let SelectorState::Done(result) = &self.state {
            return match result {
                Some(name) => SelectorOutcome::Selected(name.clone()),
                None => SelectorOutcome::Cancelled,
            };
        }

        let input = input.trim();
        if input.is_empty() {
            self.state = SelectorState::Done(None);
            return SelectorOutcome::Cancelled;
        }

        if input.eq_ignore_ascii_case(LIST_COMMAND) {
            return SelectorOutcome::Listed(self.sorted.clone());
        }

        if let Ok(index) = input.parse::<usize>() {
            return self.pick(index);
        }

        self.search(input)
    }

    fn pick(&mut self, index: usize) -> SelectorOutcome {
        let candidates = match &self.state {
            SelectorState::PendingMatches(matches) => matches,
            _ => &self.sorted,
        };
        match index.checked_sub(1).and_then(|i| candidates.get(i)) {
            Some(name) => {
                let name = name.clone();
                self.state = SelectorState::Done(Some(name.clone()));
                SelectorOutcome::Selected(name)
            }
            None => SelectorOutcome::OutOfRange {
                index,
                max: candidates.len(),
            },
        }
    }

    fn search(&mut self, query: &str) -> SelectorOutcome {
        let needle = query.to_lowercase();
        let mut matches: Vec<String> = self
            .names
            .iter()
            .filter(|n| n.to_lowercase().contains(&needle))
            .cloned()
            .collect();

        match matches.len() {
            0 => {
                self.state = SelectorState::AwaitingInput;
                SelectorOutcome::NoMatch(query.to_string())
            }
            1 => {
                let name = matches.remove(0);
                self.state = SelectorState::Done(Some(name.clone()));
                SelectorOutcome::Selected(name)
            }
            _ => {
                self.state = SelectorState::PendingMatches(matches.clone());
                SelectorOutcome::Ambiguous(matches)
            }
        }
    }
}
