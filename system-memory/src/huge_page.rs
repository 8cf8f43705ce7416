use std::fmt::{Display, Formatter};

use log::{debug, warn};

use crate::config::HugePageConfig;
use crate::errors::MemoryQueryError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnsupportedReason {
    Platform,
    MountTableMissing,
    NoHugetlbfsMount,
    MeminfoMissing,
    NoHugepagesizeEntry,
}

impl Display for UnsupportedReason {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let reason = match self {
            UnsupportedReason::Platform => "huge pages are not supported on this platform",
            UnsupportedReason::MountTableMissing => "no mount table",
            UnsupportedReason::NoHugetlbfsMount => "hugetlbfs is not mounted",
            UnsupportedReason::MeminfoMissing => "no meminfo",
            UnsupportedReason::NoHugepagesizeEntry => "meminfo has no Hugepagesize entry",
        };
        f.write_str(reason)
    }
}

/// Outcome of a successful huge page query. A host without huge pages is `Unsupported`, never
/// `Available(0)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HugePageSize {
    Available(u64),
    Unsupported(UnsupportedReason),
}

impl HugePageSize {
    pub fn bytes(&self) -> Option<u64> {
        match self {
            HugePageSize::Available(bytes) => Some(*bytes),
            HugePageSize::Unsupported(_) => None,
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self, HugePageSize::Available(_))
    }
}

impl Display for HugePageSize {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            HugePageSize::Available(bytes) => write!(f, "{}", bytes),
            HugePageSize::Unsupported(reason) => write!(f, "unsupported ({})", reason),
        }
    }
}

#[cfg(not(target_os = "linux"))]
pub fn huge_page_size(_config: &HugePageConfig) -> Result<HugePageSize, MemoryQueryError> {
    debug!("huge page size: {}", UnsupportedReason::Platform);
    Ok(HugePageSize::Unsupported(UnsupportedReason::Platform))
}

#[cfg(target_os = "linux")]
pub fn huge_page_size(config: &HugePageConfig) -> Result<HugePageSize, MemoryQueryError> {
    let res = linux::huge_page_size(config);
    match &res {
        Ok(size) => debug!("huge page size: {}", size),
        Err(err) => warn!("unable to query huge page size: {}", err),
    }
    res
}

#[cfg(target_os = "linux")]
mod linux {
    use log::trace;
    use meminfo_parser::sync_current_meminfo;
    use memory_amount::MemoryAmount;
    use mount_table_parser::{find_hugetlbfs, sync_current_mounts};

    use crate::config::HugePageConfig;
    use crate::errors::MemoryQueryError;
    use crate::huge_page::{HugePageSize, UnsupportedReason};
    use crate::page::page_size;

    pub fn huge_page_size(config: &HugePageConfig) -> Result<HugePageSize, MemoryQueryError> {
        let mut mount_page_size = None;
        if config.require_mount {
            let entries = match sync_current_mounts(&config.mount_table) {
                Ok(entries) => entries,
                Err(err) if err.is_not_found() => return Ok(HugePageSize::Unsupported(UnsupportedReason::MountTableMissing)),
                Err(err) => return Err(err.into()),
            };
            match find_hugetlbfs(&entries, config.mount_point.as_deref()) {
                None => return Ok(HugePageSize::Unsupported(UnsupportedReason::NoHugetlbfsMount)),
                Some(mount) => {
                    trace!("found hugetlbfs at {:?}", mount.dir);
                    mount_page_size = mount.huge_page_size();
                }
            }
        }
        let amount = match mount_page_size {
            Some(amount) => amount,
            None => match default_huge_page_size(config)? {
                Ok(amount) => amount,
                Err(reason) => return Ok(HugePageSize::Unsupported(reason)),
            }
        };
        validate(amount)
    }

    fn default_huge_page_size(config: &HugePageConfig) -> Result<Result<MemoryAmount, UnsupportedReason>, MemoryQueryError> {
        let meminfo = match sync_current_meminfo(&config.meminfo) {
            Ok(meminfo) => meminfo,
            Err(err) if err.is_not_found() => return Ok(Err(UnsupportedReason::MeminfoMissing)),
            Err(err) => return Err(err.into()),
        };
        Ok(meminfo.huge_page_size().map_err(meminfo_parser::errors::MemInfoError::from)?
            .ok_or(UnsupportedReason::NoHugepagesizeEntry))
    }

    fn validate(amount: MemoryAmount) -> Result<HugePageSize, MemoryQueryError> {
        let page_size = page_size()?.get();
        let size = amount.bytes();
        if !size.is_power_of_two() || size <= page_size as u64 {
            return Err(MemoryQueryError::InvalidHugePageSize { size, page_size });
        }
        Ok(HugePageSize::Available(size))
    }
}
