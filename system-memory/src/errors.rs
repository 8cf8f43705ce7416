use meminfo_parser::errors::MemInfoError;
use mount_table_parser::MountTableError;
use nix::errno::Errno;

/// A platform query that failed outright. Hosts without huge pages are not an error, see
/// [`crate::HugePageSize::Unsupported`].
#[derive(Debug, thiserror::Error)]
pub enum MemoryQueryError {
    #[error("sysconf({name}) failed: {errno}")]
    Sysconf {
        name: &'static str,
        errno: Errno,
    },
    #[error("sysconf({name}) is not defined on this system")]
    Undefined {
        name: &'static str
    },
    #[error("page size {0} is not a positive power of two")]
    InvalidPageSize(i64),
    #[error(transparent)]
    MemInfo(#[from] MemInfoError),
    #[error(transparent)]
    MountTable(#[from] MountTableError),
    #[error("huge page size {size} is not a power of two larger than the page size {page_size}")]
    InvalidHugePageSize {
        size: u64,
        page_size: usize,
    },
}
