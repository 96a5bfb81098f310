use thiserror::Error;

pub type Result<T> = std::result::Result<T, ReactiveError>;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ReactiveError {
    #[error("job queue did not settle after {passes} flush passes ({dropped} jobs dropped)")]
    FlushLimitExceeded { passes: u32, dropped: usize },
}

impl ReactiveError {
    /// Jobs discarded when the error was raised.
    #[must_use]
    pub fn dropped_jobs(&self) -> usize {
        match self {
            Self::FlushLimitExceeded { dropped, .. } => *dropped,
        }
    }
}
