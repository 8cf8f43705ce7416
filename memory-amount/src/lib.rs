use std::cmp::Ordering;
use std::fmt::{Display, Formatter};
use std::num::ParseIntError;
use std::str::FromStr;

#[derive(Debug, thiserror::Error)]
pub enum MemoryAmountParseError {
    #[error("invalid number {line:?}: {err}")]
    ParseIntError {
        err: ParseIntError,
        line: String,
    },
    #[error("unknown memory unit {unit:?} in {line:?}")]
    UnknownUnit {
        unit: String,
        line: String,
    },
    #[error("memory amount {line:?} does not fit in 64 bits")]
    Overflow {
        line: String
    },
    #[error("invalid memory amount {line:?}")]
    InvalidMemoryAmount {
        line: String
    },
}

/// A memory size as the kernel reports it, e.g. `2048 kB` in `/proc/meminfo` or `pagesize=1G`
/// in a hugetlbfs mount. Units are binary (`k` is 1024).
#[derive(Debug, Clone, Copy)]
pub enum MemoryAmount {
    Bytes(u64),
    KiloBytes(u64),
    MegaBytes(u64),
    GigaBytes(u64),
}

impl PartialEq for MemoryAmount {
    fn eq(&self, other: &Self) -> bool {
        self.bytes() == other.bytes()
    }
}

impl Eq for MemoryAmount {}

impl PartialOrd for MemoryAmount {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for MemoryAmount {
    fn cmp(&self, other: &Self) -> Ordering {
        self.bytes().cmp(&other.bytes())
    }
}

impl MemoryAmount {
    pub fn parse(from: impl AsRef<str>) -> Result<MemoryAmount, MemoryAmountParseError> {
        let trimmed = from.as_ref().trim();
        let digits_end = trimmed.find(|c: char| !c.is_ascii_digit()).unwrap_or(trimmed.len());
        let (number_str, unit) = trimmed.split_at(digits_end);
        if number_str.is_empty() {
            return Err(MemoryAmountParseError::InvalidMemoryAmount { line: trimmed.to_string() });
        }
        let parsed_number = match u64::from_str(number_str) {
            Ok(parsed_number) => parsed_number,
            Err(err) => {
                return Err(MemoryAmountParseError::ParseIntError { err, line: number_str.to_string() });
            }
        };
        let amount = match unit.trim() {
            "" | "B" => MemoryAmount::Bytes(parsed_number),
            "k" | "K" | "kB" | "KB" | "KiB" => MemoryAmount::KiloBytes(parsed_number),
            "M" | "MB" | "MiB" => MemoryAmount::MegaBytes(parsed_number),
            "G" | "GB" | "GiB" => MemoryAmount::GigaBytes(parsed_number),
            unit => {
                return Err(MemoryAmountParseError::UnknownUnit { unit: unit.to_string(), line: trimmed.to_string() });
            }
        };
        if amount.checked_bytes().is_none() {
            return Err(MemoryAmountParseError::Overflow { line: trimmed.to_string() });
        }
        Ok(amount)
    }

    fn multiplier(&self) -> u64 {
        match self {
            MemoryAmount::Bytes(_) => 1,
            MemoryAmount::KiloBytes(_) => 1024,
            MemoryAmount::MegaBytes(_) => 1024 * 1024,
            MemoryAmount::GigaBytes(_) => 1024 * 1024 * 1024,
        }
    }

    fn number(&self) -> u64 {
        match self {
            MemoryAmount::Bytes(n) |
            MemoryAmount::KiloBytes(n) |
            MemoryAmount::MegaBytes(n) |
            MemoryAmount::GigaBytes(n) => *n
        }
    }

    pub fn checked_bytes(&self) -> Option<u64> {
        self.number().checked_mul(self.multiplier())
    }

    /// Saturates at `u64::MAX`. Amounts produced by [`MemoryAmount::parse`] never saturate.
    pub fn bytes(&self) -> u64 {
        self.number().saturating_mul(self.multiplier())
    }

    pub fn kilobytes(&self) -> u64 {
        self.bytes() / 1024
    }
}

impl FromStr for MemoryAmount {
    type Err = MemoryAmountParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        MemoryAmount::parse(s)
    }
}

impl Display for MemoryAmount {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            MemoryAmount::Bytes(n) => write!(f, "{} B", n),
            MemoryAmount::KiloBytes(n) => write!(f, "{} kB", n),
            MemoryAmount::MegaBytes(n) => write!(f, "{} MB", n),
            MemoryAmount::GigaBytes(n) => write!(f, "{} GB", n),
        }
    }
}
