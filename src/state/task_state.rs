/// Task state definitions for tracking a single crawl task
///
/// Every URL handed to the coordinator walks this lifecycle exactly once.
use crate::ScraperError;
use std::fmt;

/// Represents the current state of a crawl task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskState {
    // ===== Active States =====
    /// Task has been created for a discovered URL
    Admitted,

    /// Document fetch is in flight
    Fetching,

    /// Links and images were extracted from the fetched document
    Extracted,

    /// Child tasks have been spawned and are being awaited
    FannedOut,

    // ===== Terminal States =====
    /// Task finished, with or without a fetched document
    Done,

    /// URL failed admission (invalid, off-domain, too deep, disallowed or seen)
    Rejected,
}

impl TaskState {
    /// Returns true if no further transitions are possible
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Rejected)
    }

    /// Checks whether moving from `self` to `next` is a legal transition
    ///
    /// A fetch that yields nothing ends the task directly from `Fetching`.
    pub fn can_transition_to(&self, next: TaskState) -> bool {
        matches!(
            (self, next),
            (Self::Admitted, Self::Fetching)
                | (Self::Admitted, Self::Rejected)
                | (Self::Fetching, Self::Extracted)
                | (Self::Fetching, Self::Done)
                | (Self::Extracted, Self::FannedOut)
                | (Self::FannedOut, Self::Done)
        )
    }

    /// Short lowercase name used in log output
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Admitted => "admitted",
            Self::Fetching => "fetching",
            Self::Extracted => "extracted",
            Self::FannedOut => "fanned_out",
            Self::Done => "done",
            Self::Rejected => "rejected",
        }
    }
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Tracks the state of one task and rejects illegal transitions
#[derive(Debug, Clone)]
pub struct TaskProgress {
    url: String,
    state: TaskState,
}

impl TaskProgress {
    /// Creates a tracker in the `Admitted` state
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            state: TaskState::Admitted,
        }
    }

    pub fn state(&self) -> TaskState {
        self.state
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Moves the task to `next`
    ///
    /// # Errors
    ///
    /// Returns `ScraperError::InvalidTransition` if the move is not allowed;
    /// the current state is left untouched in that case.
    pub fn advance(&mut self, next: TaskState) -> Result<(), ScraperError> {
        if !self.state.can_transition_to(next) {
            return Err(ScraperError::InvalidTransition {
                from: self.state,
                to: next,
            });
        }
        tracing::trace!(url = %self.url, from = %self.state, to = %next, "task transition");
        self.state = next;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_terminal() {
        assert!(!TaskState::Admitted.is_terminal());
        assert!(!TaskState::Fetching.is_terminal());
        assert!(!TaskState::Extracted.is_terminal());
        assert!(!TaskState::FannedOut.is_terminal());

        assert!(TaskState::Done.is_terminal());
        assert!(TaskState::Rejected.is_terminal());
    }

    #[test]
    fn test_happy_path() {
        let mut progress = TaskProgress::new("https://example.com/");
        progress.advance(TaskState::Fetching).unwrap();
        progress.advance(TaskState::Extracted).unwrap();
        progress.advance(TaskState::FannedOut).unwrap();
        progress.advance(TaskState::Done).unwrap();
        assert_eq!(progress.state(), TaskState::Done);
    }

    #[test]
    fn test_fetch_without_document_finishes() {
        let mut progress = TaskProgress::new("https://example.com/");
        progress.advance(TaskState::Fetching).unwrap();
        progress.advance(TaskState::Done).unwrap();
        assert!(progress.state().is_terminal());
    }

    #[test]
    fn test_rejection_only_from_admitted() {
        assert!(TaskState::Admitted.can_transition_to(TaskState::Rejected));
        assert!(!TaskState::Fetching.can_transition_to(TaskState::Rejected));
        assert!(!TaskState::Done.can_transition_to(TaskState::Rejected));
    }

    #[test]
    fn test_invalid_transition_keeps_state() {
        let mut progress = TaskProgress::new("https://example.com/");
        let err = progress.advance(TaskState::FannedOut).unwrap_err();

        match err {
            ScraperError::InvalidTransition { from, to } => {
                assert_eq!(from, TaskState::Admitted);
                assert_eq!(to, TaskState::FannedOut);
            }
            other => panic!("unexpected error: {:?}", other),
        }
        assert_eq!(progress.state(), TaskState::Admitted);
    }

    #[test]
    fn test_terminal_states_have_no_exits() {
        let all = [
            TaskState::Admitted,
            TaskState::Fetching,
            TaskState::Extracted,
            TaskState::FannedOut,
            TaskState::Done,
            TaskState::Rejected,
        ];
        for next in all {
            assert!(!TaskState::Done.can_transition_to(next));
            assert!(!TaskState::Rejected.can_transition_to(next));
        }
    }

    #[test]
    fn test_display() {
        assert_eq!(format!("{}", TaskState::FannedOut), "fanned_out");
        assert_eq!(format!("{}", TaskState::Rejected), "rejected");
    }
}
