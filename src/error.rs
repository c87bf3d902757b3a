//! CLI Error Types
//!
//! Everything here is batch-fatal: it happens before any item is processed,
//! or after all of them are done. Item-level failures live in the report.

use derive_more::{Display, Error};

pub type Error = exn::Exn<ErrorKind>;
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    #[display("invalid configuration or input")]
    Config,
    #[display("could not open output store")]
    Storage,
    #[display("could not open dataset")]
    Dataset,
    #[display("could not set up HTTP client")]
    Http,
    #[display("could not write batch report")]
    Report,
}

impl ErrorKind {
    /// Process exit code for this failure.
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Config => 2,
            _ => 1,
        }
    }
}
