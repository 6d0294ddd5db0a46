use thiserror::Error;

#[derive(Error, Debug)]
pub enum MigrationError {
    #[error("validation error: {0}")]
    Validation(String),
    #[error("declared total {declared} does not match submitted record count {submitted}")]
    CountMismatch { declared: usize, submitted: usize },
    #[error("unknown batch: {0}")]
    JobNotFound(String),
    #[error("illegal job status transition: {from} -> {to}")]
    IllegalTransition { from: String, to: String },
    #[error("job {0} has not reached a terminal state")]
    JobNotTerminal(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, MigrationError>;
