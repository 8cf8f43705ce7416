//! Queries about the host's memory configuration: page size, pointer width and huge page size.
//!
//! Nothing is cached. Every call asks the OS again, so a host that mounts hugetlbfs while the
//! process is running is observed on the next call.

pub use crate::config::HugePageConfig;
pub use crate::errors::MemoryQueryError;
pub use crate::huge_page::{huge_page_size, HugePageSize, UnsupportedReason};
pub use crate::page::{address_size, page_size, PageSize};

pub mod config;
pub mod errors;
pub mod huge_page;
pub mod page;

/// The three memory queries. Native entry points are generic over this so they can be driven by
/// something other than the real host.
pub trait MemoryQuery {
    fn page_size(&self) -> Result<PageSize, MemoryQueryError>;

    fn address_size(&self) -> usize;

    fn huge_page_size(&self) -> Result<HugePageSize, MemoryQueryError>;
}

#[derive(Debug, Clone, Default)]
pub struct HostMemory {
    pub config: HugePageConfig,
}

impl HostMemory {
    pub fn new(config: HugePageConfig) -> Self {
        Self { config }
    }

    pub fn from_env() -> Self {
        Self::new(HugePageConfig::from_env())
    }
}

impl MemoryQuery for HostMemory {
    fn page_size(&self) -> Result<PageSize, MemoryQueryError> {
        page::page_size()
    }

    fn address_size(&self) -> usize {
        page::address_size()
    }

    fn huge_page_size(&self) -> Result<HugePageSize, MemoryQueryError> {
        huge_page::huge_page_size(&self.config)
    }
}

#[cfg(test)]
pub mod test {
    use std::thread;

    use crate::{HostMemory, MemoryQuery};

    #[test]
    pub fn concurrent_callers_agree() {
        let host = HostMemory::default();
        let expected = (host.page_size().unwrap(), host.address_size());
        let handles = (0..8).map(|_| {
            thread::spawn(|| {
                let host = HostMemory::default();
                (host.page_size().unwrap(), host.address_size())
            })
        }).collect::<Vec<_>>();
        for handle in handles {
            assert_eq!(handle.join().unwrap(), expected);
        }
    }

    #[test]
    pub fn host_huge_pages_never_zero() {
        // whatever the test host looks like, an available size is a real size
        if let Ok(size) = HostMemory::default().huge_page_size() {
            assert_ne!(size.bytes(), Some(0));
        }
    }
}
