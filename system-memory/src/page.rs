use std::fmt::{Display, Formatter};
use std::mem::size_of;

use log::{trace, warn};
use nix::unistd::{sysconf, SysconfVar};

use crate::errors::MemoryQueryError;

/// The virtual memory page size, always a positive power of two.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PageSize(usize);

impl PageSize {
    pub fn new(bytes: i64) -> Result<PageSize, MemoryQueryError> {
        match usize::try_from(bytes) {
            Ok(size) if size.is_power_of_two() => Ok(PageSize(size)),
            _ => Err(MemoryQueryError::InvalidPageSize(bytes)),
        }
    }

    pub fn get(&self) -> usize {
        self.0
    }
}

impl Display for PageSize {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

pub fn page_size() -> Result<PageSize, MemoryQueryError> {
    let name = "_SC_PAGESIZE";
    let res = match sysconf(SysconfVar::PAGE_SIZE) {
        Ok(Some(bytes)) => PageSize::new(i64::from(bytes)),
        Ok(None) => Err(MemoryQueryError::Undefined { name }),
        Err(errno) => Err(MemoryQueryError::Sysconf { name, errno }),
    };
    match &res {
        Ok(page_size) => trace!("page size is {}", page_size),
        Err(err) => warn!("unable to query page size: {}", err),
    }
    res
}

/// Pointer width of the build target in bytes. A 32 bit build on a 64 bit kernel reports 4.
pub fn address_size() -> usize {
    size_of::<*const ()>()
}

#[cfg(test)]
pub mod test {
    use std::mem::size_of;

    use crate::errors::MemoryQueryError;
    use crate::page::{address_size, page_size, PageSize};

    #[test]
    pub fn page_size_is_stable_power_of_two() {
        let first = page_size().unwrap();
        assert!(first.get() > 0);
        assert!(first.get().is_power_of_two());
        for _ in 0..16 {
            assert_eq!(page_size().unwrap(), first);
        }
    }

    #[test]
    pub fn page_size_matches_libc() {
        let raw = unsafe { libc::sysconf(libc::_SC_PAGESIZE) };
        assert_eq!(page_size().unwrap().get() as libc::c_long, raw);
    }

    #[test]
    pub fn address_size_is_pointer_width() {
        assert_eq!(address_size(), size_of::<usize>());
        #[cfg(target_pointer_width = "64")]
        assert_eq!(address_size(), 8);
        #[cfg(target_pointer_width = "32")]
        assert_eq!(address_size(), 4);
    }

    #[test]
    pub fn invalid_page_sizes() {
        assert!(matches!(PageSize::new(0), Err(MemoryQueryError::InvalidPageSize(0))));
        assert!(matches!(PageSize::new(-1), Err(MemoryQueryError::InvalidPageSize(-1))));
        assert!(matches!(PageSize::new(4095), Err(MemoryQueryError::InvalidPageSize(4095))));
        assert_eq!(PageSize::new(4096).unwrap().get(), 4096);
    }
}
