use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QueueError {
    #[error("Configuration error: a comparator is required")]
    MissingComparator,

    #[error("Configuration error: dedupe requires an equals function")]
    MissingEquals,

    #[error("Configuration error: invalid metrics setup: {0}")]
    InvalidMetrics(String),
}

impl QueueError {
    /// Every construction failure is a configuration problem; runtime
    /// operations never return errors.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            QueueError::MissingComparator
                | QueueError::MissingEquals
                | QueueError::InvalidMetrics(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, QueueError>;
