use std::collections::HashMap;
use std::path::Path;

use itertools::Itertools;
use log::trace;
use memory_amount::MemoryAmount;

use crate::errors::{MemInfoError, ParseError};

pub mod errors;

pub const DEFAULT_MEMINFO_PATH: &str = "/proc/meminfo";

pub const HUGEPAGESIZE: &str = "Hugepagesize";
pub const HUGEPAGES_TOTAL: &str = "HugePages_Total";
pub const HUGEPAGES_FREE: &str = "HugePages_Free";

/// The entries of `/proc/meminfo`, keyed by name without the trailing colon.
#[derive(Debug, Clone)]
pub struct MemInfo {
    entries: HashMap<String, String>,
}

impl MemInfo {
    pub fn raw(&self, entry: &str) -> Option<&str> {
        self.entries.get(entry).map(|value| value.as_str())
    }

    pub fn memory_amount(&self, entry: &str) -> Result<Option<MemoryAmount>, ParseError> {
        match self.raw(entry) {
            None => Ok(None),
            Some(value) => {
                MemoryAmount::parse(value)
                    .map(Some)
                    .map_err(|err| ParseError::InvalidMemoryAmount { entry: entry.to_string(), err })
            }
        }
    }

    pub fn count(&self, entry: &str) -> Result<Option<u64>, ParseError> {
        match self.raw(entry) {
            None => Ok(None),
            Some(value) => {
                value.trim().parse::<u64>()
                    .map(Some)
                    .map_err(|_| ParseError::InvalidCount { entry: entry.to_string(), value: value.to_string() })
            }
        }
    }

    /// The default huge page size. Absent on kernels built without hugetlb support.
    pub fn huge_page_size(&self) -> Result<Option<MemoryAmount>, ParseError> {
        self.memory_amount(HUGEPAGESIZE)
    }

    pub fn huge_pages_total(&self) -> Result<Option<u64>, ParseError> {
        self.count(HUGEPAGES_TOTAL)
    }

    pub fn huge_pages_free(&self) -> Result<Option<u64>, ParseError> {
        self.count(HUGEPAGES_FREE)
    }

    pub fn total(&self) -> Result<Option<MemoryAmount>, ParseError> {
        self.memory_amount("MemTotal")
    }
}

pub fn sync_current_meminfo(path: impl AsRef<Path>) -> Result<MemInfo, MemInfoError> {
    let path = path.as_ref();
    trace!("reading meminfo from {:?}", path);
    let meminfo_string = std::fs::read_to_string(path).map_err(|err| MemInfoError::IO { path: path.to_path_buf(), err })?;
    Ok(parse_meminfo(meminfo_string.as_str())?)
}

pub fn parse_meminfo(meminfo: &str) -> Result<MemInfo, ParseError> {
    let mut entries = HashMap::new();
    for line in meminfo.lines() {
        if line.trim().is_empty() {
            continue;
        }
        match line.splitn(2, ':').next_tuple() {
            Some((entry_name, entry_value)) => {
                entries.entry(entry_name.trim().to_string()).or_insert_with(|| entry_value.trim().to_string());
            }
            None => {
                return Err(ParseError::MissingColon { line: line.to_string() });
            }
        }
    }
    Ok(MemInfo { entries })
}
