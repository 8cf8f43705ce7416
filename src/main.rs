use std::fmt::{Display, Formatter};
use std::path::PathBuf;

use anyhow::bail;
use clap::{Parser, ValueEnum};
use log::{debug, info};

use ixy_memory::{HUGE_PAGE_QUERY_FAILED, HUGE_PAGE_UNSUPPORTED, QUERY_FAILED};
use system_memory::config::{HUGE_MOUNT_ENV, HUGE_REQUIRE_MOUNT_ENV, MEMINFO_ENV, MOUNT_TABLE_ENV};
use system_memory::{HostMemory, HugePageSize, MemoryQuery};

use crate::native_library::{default_library_path, NativeMemoryLibrary, RawResults, SymbolSet};

mod native_library;

#[derive(ValueEnum, Debug, Copy, Clone, PartialEq, Eq)]
enum Binding {
    /// `MemoryUtils` JNI symbols.
    Jni,
    /// `JniMemoryManager` JNI symbols.
    JniLegacy,
    /// The versioned function table.
    Table,
    /// Skip the library and query in-process.
    Direct,
}

/// Asks the ixy memory natives about this host's page size, address size and huge page size.
#[derive(Parser, Debug)]
#[command(name = "memquery")]
struct Args {
    /// Native library to load. Defaults to the one next to this executable or in its `deps` directory.
    #[arg(long, env = "IXY_MEMORY_LIBRARY")]
    library: Option<PathBuf>,
    #[arg(long, value_enum, default_value_t = Binding::Jni)]
    binding: Binding,
    /// Mount table to search for hugetlbfs.
    #[arg(long)]
    mount_table: Option<PathBuf>,
    #[arg(long)]
    meminfo: Option<PathBuf>,
    /// Required hugetlbfs mount point, `*` for any.
    #[arg(long)]
    mount_point: Option<String>,
    /// Report the meminfo huge page size even when hugetlbfs is not mounted.
    #[arg(long)]
    no_mount_check: bool,
}

impl Args {
    // the library reads its configuration from the environment, so flags are passed the same way
    fn export_config(&self) {
        if let Some(mount_table) = &self.mount_table {
            std::env::set_var(MOUNT_TABLE_ENV, mount_table);
        }
        if let Some(meminfo) = &self.meminfo {
            std::env::set_var(MEMINFO_ENV, meminfo);
        }
        if let Some(mount_point) = &self.mount_point {
            std::env::set_var(HUGE_MOUNT_ENV, mount_point);
        }
        if self.no_mount_check {
            std::env::set_var(HUGE_REQUIRE_MOUNT_ENV, "false");
        }
    }
}

enum HugePageReport {
    Available(u64),
    Unsupported(Option<String>),
    Failed(String),
}

struct Report {
    page_size: Result<u64, String>,
    address_size: Result<u64, String>,
    huge_page_size: HugePageReport,
}

impl Report {
    fn from_raw(raw: RawResults) -> Self {
        let checked = |value: i64, what: &str| {
            if value == QUERY_FAILED as i64 {
                Err(format!("{} query failed", what))
            } else {
                u64::try_from(value).map_err(|_| format!("unexpected {} {}", what, value))
            }
        };
        let huge_page_size = match raw.huge_page_size {
            HUGE_PAGE_UNSUPPORTED => HugePageReport::Unsupported(None),
            HUGE_PAGE_QUERY_FAILED => HugePageReport::Failed("huge page size query failed".to_string()),
            bytes => match u64::try_from(bytes) {
                Ok(bytes) => HugePageReport::Available(bytes),
                Err(_) => HugePageReport::Failed(format!("unexpected huge page size {}", bytes)),
            },
        };
        Self {
            page_size: checked(raw.page_size as i64, "page size"),
            address_size: checked(raw.address_size as i64, "address size"),
            huge_page_size,
        }
    }

    fn from_host(host: &impl MemoryQuery) -> Self {
        let huge_page_size = match host.huge_page_size() {
            Ok(HugePageSize::Available(bytes)) => HugePageReport::Available(bytes),
            Ok(HugePageSize::Unsupported(reason)) => HugePageReport::Unsupported(Some(reason.to_string())),
            Err(err) => HugePageReport::Failed(err.to_string()),
        };
        Self {
            page_size: host.page_size().map(|page_size| page_size.get() as u64).map_err(|err| err.to_string()),
            address_size: Ok(host.address_size() as u64),
            huge_page_size,
        }
    }

    fn failures(&self) -> Vec<&str> {
        let mut res = vec![];
        if let Err(err) = &self.page_size {
            res.push(err.as_str());
        }
        if let Err(err) = &self.address_size {
            res.push(err.as_str());
        }
        if let HugePageReport::Failed(err) = &self.huge_page_size {
            res.push(err.as_str());
        }
        res
    }
}

impl Display for Report {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match &self.page_size {
            Ok(page_size) => writeln!(f, "page size: {}", page_size)?,
            Err(_) => writeln!(f, "page size: failed")?,
        }
        match &self.address_size {
            Ok(address_size) => writeln!(f, "address size: {}", address_size)?,
            Err(_) => writeln!(f, "address size: failed")?,
        }
        match &self.huge_page_size {
            HugePageReport::Available(bytes) => writeln!(f, "huge page size: {}", bytes),
            HugePageReport::Unsupported(Some(reason)) => writeln!(f, "huge page size: unsupported ({})", reason),
            HugePageReport::Unsupported(None) => writeln!(f, "huge page size: unsupported"),
            HugePageReport::Failed(_) => writeln!(f, "huge page size: failed"),
        }
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();
    debug!("{:?}", args);
    args.export_config();
    let report = match args.binding {
        Binding::Direct => Report::from_host(&HostMemory::from_env()),
        binding => {
            let path = args.library.clone().unwrap_or_else(default_library_path);
            let library = NativeMemoryLibrary::open(&path)?;
            if let Some(version) = library.on_load() {
                info!("JNI_OnLoad requested version {:#010x}", version);
            }
            let raw = match binding {
                Binding::Jni => library.query_jni(SymbolSet::MemoryUtils)?,
                Binding::JniLegacy => library.query_jni(SymbolSet::JniMemoryManager)?,
                _ => library.query_table()?,
            };
            debug!("{:?}", raw);
            Report::from_raw(raw)
        }
    };
    print!("{}", report);
    let failures = report.failures();
    if !failures.is_empty() {
        bail!("{}", failures.join(", "));
    }
    Ok(())
}
