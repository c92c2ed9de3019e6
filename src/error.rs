
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApocryphaError {
    #[error("Config error: {0}")]
    Config(String),
    #[error("error: {0}")]
    Client(String),
    #[error("Protocol error: {0}")]
    Protocol(String),
    #[error("Persistence error: {0}")]
    Persistence(String),
    #[error("Internal invariant violated: {0}")]
    Internal(String),
    #[error("Lock poisoned: {0}")]
    Lock(String),
}

pub type Result<T> = std::result::Result<T, ApocryphaError>;

// Helper conversions
impl From<std::io::Error> for ApocryphaError {
    fn from(e: std::io::Error) -> Self { Self::Persistence(e.to_string()) }
}
