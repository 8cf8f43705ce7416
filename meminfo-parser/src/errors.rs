use std::path::PathBuf;

use memory_amount::MemoryAmountParseError;

#[derive(Debug, thiserror::Error)]
pub enum MemInfoError {
    #[error("unable to read {path:?}: {err}")]
    IO {
        path: PathBuf,
        err: std::io::Error,
    },
    #[error(transparent)]
    Parse(#[from] ParseError),
}

impl MemInfoError {
    /// True when the meminfo file does not exist at all, as opposed to being unreadable.
    pub fn is_not_found(&self) -> bool {
        match self {
            MemInfoError::IO { err, .. } => err.kind() == std::io::ErrorKind::NotFound,
            MemInfoError::Parse(_) => false,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("meminfo line without a colon: {line:?}")]
    MissingColon {
        line: String
    },
    #[error("invalid value for {entry}: {err}")]
    InvalidMemoryAmount {
        entry: String,
        err: MemoryAmountParseError,
    },
    #[error("invalid count for {entry}: {value:?}")]
    InvalidCount {
        entry: String,
        value: String,
    },
}
