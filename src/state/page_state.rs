/// Page state definitions for tracking crawl progress
///
/// Every seed page moves through this state machine exactly once per run.
use std::fmt;

/// Represents the current state of a page in the crawl process
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PageState {
    // ===== Active States =====
    /// Page has been admitted but is waiting on the throttle
    Pending,

    /// Throttle released; the request is about to be issued
    Throttled,

    /// Request is in flight
    Fetching,

    /// Response body is being parsed into a markup tree
    Parsing,

    /// Fields are being extracted from the markup tree
    Extracting,

    // ===== Terminal Success States =====
    /// A record was produced
    Done,

    // ===== Terminal Error States =====
    /// Network, HTTP status or body decode failure
    FetchFailed,

    /// Unexpected fault while parsing or extracting
    ExtractFailed,

    // ===== Special States =====
    /// Stop was requested before the request was issued
    Skipped,
}

impl PageState {
    /// Returns true if this is a terminal state (no further processing needed)
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Done | Self::FetchFailed | Self::ExtractFailed | Self::Skipped
        )
    }

    /// Returns true if this represents a successful completion
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Done)
    }

    /// Returns true if this represents an error state
    pub fn is_error(&self) -> bool {
        matches!(self, Self::FetchFailed | Self::ExtractFailed)
    }

    /// Returns true if moving from `self` to `next` is a legal transition
    ///
    /// `Fetching -> Throttled` is the retry edge: a transient failure sends the
    /// page back through the throttle. `Throttled -> FetchFailed` ends a retry
    /// cut short by a stop request.
    pub fn can_transition_to(&self, next: PageState) -> bool {
        use PageState::*;

        matches!(
            (self, next),
            (Pending, Throttled)
                | (Pending, Skipped)
                | (Throttled, Fetching)
                | (Throttled, Skipped)
                | (Throttled, FetchFailed)
                | (Fetching, Parsing)
                | (Fetching, FetchFailed)
                | (Fetching, Throttled)
                | (Parsing, Extracting)
                | (Parsing, ExtractFailed)
                | (Extracting, Done)
                | (Extracting, ExtractFailed)
        )
    }

    /// Short lowercase name used in logs and storage
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Throttled => "throttled",
            Self::Fetching => "fetching",
            Self::Parsing => "parsing",
            Self::Extracting => "extracting",
            Self::Done => "done",
            Self::FetchFailed => "fetch_failed",
            Self::ExtractFailed => "extract_failed",
            Self::Skipped => "skipped",
        }
    }

    /// Returns all possible page states
    pub fn all_states() -> Vec<Self> {
        vec![
            Self::Pending,
            Self::Throttled,
            Self::Fetching,
            Self::Parsing,
            Self::Extracting,
            Self::Done,
            Self::FetchFailed,
            Self::ExtractFailed,
            Self::Skipped,
        ]
    }
}

impl fmt::Display for PageState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
