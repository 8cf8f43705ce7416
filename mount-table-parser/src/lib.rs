//! Parser for the `/etc/mtab` / `/proc/mounts` mount table format.

use std::path::{Path, PathBuf};

use itertools::Itertools;
use log::{trace, warn};
use memory_amount::MemoryAmount;

pub const DEFAULT_MOUNT_TABLE_PATH: &str = "/etc/mtab";
pub const HUGETLBFS: &str = "hugetlbfs";

#[derive(Debug, thiserror::Error)]
pub enum MountTableError {
    #[error("unable to read {path:?}: {err}")]
    IO {
        path: PathBuf,
        err: std::io::Error,
    },
}

impl MountTableError {
    pub fn is_not_found(&self) -> bool {
        match self {
            MountTableError::IO { err, .. } => err.kind() == std::io::ErrorKind::NotFound,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountEntry {
    pub fs_name: String,
    pub dir: PathBuf,
    pub fs_type: String,
    pub options: Vec<String>,
}

impl MountEntry {
    /// Value of a `key=value` mount option.
    pub fn option(&self, key: &str) -> Option<&str> {
        self.options.iter().find_map(|option| {
            let (option_key, value) = option.split_once('=')?;
            (option_key == key).then_some(value)
        })
    }

    pub fn is_hugetlbfs(&self) -> bool {
        self.fs_type == HUGETLBFS && self.fs_name == HUGETLBFS
    }

    /// The `pagesize=` option of a hugetlbfs mount. Mounts without it use the default huge page
    /// size from meminfo. An unparsable value is ignored with a warning.
    pub fn huge_page_size(&self) -> Option<MemoryAmount> {
        let value = self.option("pagesize")?;
        match MemoryAmount::parse(value) {
            Ok(amount) => Some(amount),
            Err(err) => {
                warn!("ignoring pagesize option of {:?}: {}", self.dir, err);
                None
            }
        }
    }
}

pub fn sync_current_mounts(path: impl AsRef<Path>) -> Result<Vec<MountEntry>, MountTableError> {
    let path = path.as_ref();
    trace!("reading mount table from {:?}", path);
    // mount points are arbitrary bytes, only whitespace and backslashes are escaped
    let mount_table = std::fs::read(path).map_err(|err| MountTableError::IO { path: path.to_path_buf(), err })?;
    Ok(parse_mount_table(mount_table.as_slice()))
}

/// Parses every readable line of a mount table. Lines with fewer than four fields or a bad
/// octal escape are skipped with a warning, the way `getmntent` skips them, so one odd mount
/// cannot hide the rest of the table.
pub fn parse_mount_table(mount_table: &[u8]) -> Vec<MountEntry> {
    let mut res = vec![];
    for (i, line) in mount_table.split(|byte| *byte == b'\n').enumerate() {
        let line_number = i + 1;
        let mut fields = line.split(|byte| byte.is_ascii_whitespace()).filter(|field| !field.is_empty()).peekable();
        match fields.peek() {
            None => continue,
            Some(first) if first.starts_with(b"#") => continue,
            Some(_) => {}
        }
        let (fs_name, dir, fs_type, options) = match fields.next_tuple() {
            Some(fields) => fields,
            None => {
                warn!("skipping mount table line {} with fewer than four fields: {:?}", line_number, String::from_utf8_lossy(line));
                continue;
            }
        };
        match parse_entry(fs_name, dir, fs_type, options) {
            Some(entry) => res.push(entry),
            None => warn!("skipping mount table line {} with a bad octal escape: {:?}", line_number, String::from_utf8_lossy(line)),
        }
    }
    res
}

/// Finds a hugetlbfs mount, optionally at a specific mount point. The first match wins.
pub fn find_hugetlbfs<'l>(entries: &'l [MountEntry], mount_point: Option<&Path>) -> Option<&'l MountEntry> {
    entries.iter()
        .filter(|entry| entry.is_hugetlbfs())
        .find(|entry| mount_point.map_or(true, |mount_point| entry.dir == mount_point))
}

fn parse_entry(fs_name: &[u8], dir: &[u8], fs_type: &[u8], options: &[u8]) -> Option<MountEntry> {
    Some(MountEntry {
        fs_name: String::from_utf8_lossy(unescape_field(fs_name)?.as_slice()).into_owned(),
        dir: path_from_bytes(unescape_field(dir)?),
        fs_type: String::from_utf8_lossy(unescape_field(fs_type)?.as_slice()).into_owned(),
        options: String::from_utf8_lossy(options).split(',').map(|option| option.to_string()).collect(),
    })
}

// getmntent encodes whitespace and backslashes as three digit octal escapes
fn unescape_field(field: &[u8]) -> Option<Vec<u8>> {
    let mut res = Vec::with_capacity(field.len());
    let mut i = 0;
    while i < field.len() {
        if field[i] == b'\\' {
            let digits = field.get(i + 1..i + 4)?;
            let byte = digits.iter().try_fold(0u8, |acc, &digit| match digit {
                b'0'..=b'7' => acc.checked_mul(8)?.checked_add(digit - b'0'),
                _ => None,
            })?;
            res.push(byte);
            i += 4;
        } else {
            res.push(field[i]);
            i += 1;
        }
    }
    Some(res)
}

#[cfg(unix)]
fn path_from_bytes(bytes: Vec<u8>) -> PathBuf {
    use std::os::unix::ffi::OsStringExt;
    PathBuf::from(std::ffi::OsString::from_vec(bytes))
}

#[cfg(not(unix))]
fn path_from_bytes(bytes: Vec<u8>) -> PathBuf {
    PathBuf::from(String::from_utf8_lossy(bytes.as_slice()).into_owned())
}
