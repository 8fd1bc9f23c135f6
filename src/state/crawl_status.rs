/// Crawl status definitions for the page frontier
///
/// This module defines all possible states a stored page can be in. The
/// status column is the queue: there is no other frontier.
use std::fmt;

/// Represents the crawl status of a page row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CrawlStatus {
    // ===== Active States =====
    /// Page is known and waiting to be claimed
    Pending,

    /// Page has been claimed and its links are being fetched
    InProgress,

    // ===== Terminal States =====
    /// Outbound links have been fully recorded
    Done,

    /// Link fetching failed permanently; only an explicit requeue revives it
    Failed,
}

impl CrawlStatus {
    /// Converts the status to its database string representation
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::InProgress => "in_progress",
            Self::Done => "done",
            Self::Failed => "failed",
        }
    }

    /// Parses a status from its database string representation
    ///
    /// Returns None if the string doesn't match any known status.
    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "in_progress" => Some(Self::InProgress),
            "done" => Some(Self::Done),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }

    /// Returns all possible statuses
    pub fn all() -> [Self; 4] {
        [Self::Pending, Self::InProgress, Self::Done, Self::Failed]
    }
}

impl fmt::Display for CrawlStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_string())
    }
}
