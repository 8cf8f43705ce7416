use std::path::PathBuf;

use log::warn;
use meminfo_parser::DEFAULT_MEMINFO_PATH;
use mount_table_parser::DEFAULT_MOUNT_TABLE_PATH;

pub const DEFAULT_HUGE_MOUNT_POINT: &str = "/mnt/huge";

pub const MOUNT_TABLE_ENV: &str = "IXY_MOUNT_TABLE";
pub const MEMINFO_ENV: &str = "IXY_MEMINFO";
pub const HUGE_MOUNT_ENV: &str = "IXY_HUGE_MOUNT";
pub const HUGE_REQUIRE_MOUNT_ENV: &str = "IXY_HUGE_REQUIRE_MOUNT";

/// Where the huge page query looks for its answers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HugePageConfig {
    pub mount_table: PathBuf,
    pub meminfo: PathBuf,
    /// `None` accepts a hugetlbfs mount anywhere.
    pub mount_point: Option<PathBuf>,
    /// Huge pages only count as available when hugetlbfs is mounted.
    pub require_mount: bool,
}

impl Default for HugePageConfig {
    fn default() -> Self {
        Self {
            mount_table: PathBuf::from(DEFAULT_MOUNT_TABLE_PATH),
            meminfo: PathBuf::from(DEFAULT_MEMINFO_PATH),
            mount_point: Some(PathBuf::from(DEFAULT_HUGE_MOUNT_POINT)),
            require_mount: true,
        }
    }
}

impl HugePageConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut res = Self::default();
        if let Some(mount_table) = lookup(MOUNT_TABLE_ENV) {
            res.mount_table = PathBuf::from(mount_table);
        }
        if let Some(meminfo) = lookup(MEMINFO_ENV) {
            res.meminfo = PathBuf::from(meminfo);
        }
        if let Some(mount_point) = lookup(HUGE_MOUNT_ENV) {
            res.mount_point = parse_mount_point(mount_point.as_str());
        }
        if let Some(require_mount) = lookup(HUGE_REQUIRE_MOUNT_ENV) {
            match parse_bool(require_mount.as_str()) {
                Some(require_mount) => res.require_mount = require_mount,
                None => warn!("ignoring {}={:?}, expected a boolean", HUGE_REQUIRE_MOUNT_ENV, require_mount),
            }
        }
        res
    }
}

/// `*` or an empty string mean any mount point.
pub fn parse_mount_point(mount_point: &str) -> Option<PathBuf> {
    match mount_point.trim() {
        "" | "*" => None,
        mount_point => Some(PathBuf::from(mount_point)),
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
pub mod test {
    use std::collections::HashMap;
    use std::path::PathBuf;

    use crate::config::{HUGE_MOUNT_ENV, HUGE_REQUIRE_MOUNT_ENV, HugePageConfig, MEMINFO_ENV, MOUNT_TABLE_ENV};

    fn config_from(vars: &[(&str, &str)]) -> HugePageConfig {
        let vars: HashMap<String, String> = vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        HugePageConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    pub fn test_defaults() {
        let config = config_from(&[]);
        assert_eq!(config, HugePageConfig::default());
        assert_eq!(config.mount_table, PathBuf::from("/etc/mtab"));
        assert_eq!(config.meminfo, PathBuf::from("/proc/meminfo"));
        assert_eq!(config.mount_point, Some(PathBuf::from("/mnt/huge")));
        assert!(config.require_mount);
    }

    #[test]
    pub fn test_overrides() {
        let config = config_from(&[
            (MOUNT_TABLE_ENV, "/proc/mounts"),
            (MEMINFO_ENV, "/tmp/meminfo"),
            (HUGE_MOUNT_ENV, "*"),
            (HUGE_REQUIRE_MOUNT_ENV, "no"),
        ]);
        assert_eq!(config.mount_table, PathBuf::from("/proc/mounts"));
        assert_eq!(config.meminfo, PathBuf::from("/tmp/meminfo"));
        assert_eq!(config.mount_point, None);
        assert!(!config.require_mount);
        assert_eq!(config_from(&[(HUGE_MOUNT_ENV, "/dev/hugepages")]).mount_point, Some(PathBuf::from("/dev/hugepages")));
    }

    #[test]
    pub fn test_bad_bool_keeps_default() {
        assert!(config_from(&[(HUGE_REQUIRE_MOUNT_ENV, "maybe")]).require_mount);
    }
}
