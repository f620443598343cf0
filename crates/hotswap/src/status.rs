use std::{fmt, str::FromStr};

/// Change-tracking status reported by a hot-swap capable debug session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatusEvent {
    NoChanges,
    ChangesReady,
    InProgress,
    SessionCompleted,
}

impl StatusEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            StatusEvent::NoChanges => "no-changes",
            StatusEvent::ChangesReady => "changes-ready",
            StatusEvent::InProgress => "in-progress",
            StatusEvent::SessionCompleted => "session-completed",
        }
    }
}

impl fmt::Display for StatusEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StatusEvent {
    type Err = eyre::Report;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "no-changes" => Ok(Self::NoChanges),
            "changes-ready" => Ok(Self::ChangesReady),
            "in-progress" => Ok(Self::InProgress),
            "session-completed" => Ok(Self::SessionCompleted),
            other => Err(eyre::eyre!("unexpected hot-swap status '{other}'")),
        }
    }
}

/// What the floating toolbar should do in response to a status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VisibilityDecision {
    Show,
    Hide,
    HideNow,
}

impl VisibilityDecision {
    /// Map a status to a decision.
    ///
    /// `InProgress` only changes the busy appearance of the control and must be handled before
    /// reaching this table.
    pub fn for_status(status: StatusEvent) -> Self {
        match status {
            StatusEvent::NoChanges => Self::Hide,
            StatusEvent::ChangesReady => Self::Show,
            StatusEvent::SessionCompleted => Self::HideNow,
            StatusEvent::InProgress => {
                unreachable!("unexpected status {status}: no visibility decision exists for it")
            }
        }
    }

    pub fn is_hide(&self) -> bool {
        matches!(self, Self::Hide | Self::HideNow)
    }
}
