use std::ffi::c_void;
use std::path::{Path, PathBuf};
use std::ptr::null_mut;

use anyhow::{bail, Context};
use libloading::{Library, Symbol};
use log::debug;

use ixy_memory::symbols;
use ixy_memory::table::{MEMORY_QUERY_TABLE_SYMBOL, MEMORY_QUERY_TABLE_VERSION, MemoryQueryTable, QueryTableAccessor};
use jni_bindings::{jint, jlong, OnLoad, StaticNoArgNative};

/// Which set of symbols to bind.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum SymbolSet {
    MemoryUtils,
    JniMemoryManager,
}

impl SymbolSet {
    fn names(&self) -> (&'static str, &'static str, &'static str) {
        match self {
            SymbolSet::MemoryUtils => (symbols::PAGE_SIZE, symbols::ADDRESS_SIZE, symbols::HUGE_PAGE_SIZE),
            SymbolSet::JniMemoryManager => (symbols::MANAGER_PAGE_SIZE, symbols::MANAGER_ADDRESS_SIZE, symbols::MANAGER_HUGE_PAGE_SIZE),
        }
    }
}

/// Raw values as the native side returned them, sentinels included.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct RawResults {
    pub page_size: jint,
    pub address_size: jint,
    pub huge_page_size: jlong,
}

/// The native memory library, loaded the way a JVM loads a JNI library.
pub struct NativeMemoryLibrary {
    path: PathBuf,
    library: Library,
}

impl NativeMemoryLibrary {
    pub fn open(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let library = open_library(path).with_context(|| format!("loading {:?}", path))?;
        debug!("loaded {:?}", path);
        Ok(Self { path: path.to_path_buf(), library })
    }

    /// Calls `JNI_OnLoad` if the library has one, returning the JNI version it asked for.
    pub fn on_load(&self) -> Option<jint> {
        // the natives never touch the vm pointer, so there is no vm to hand over
        match unsafe { self.library.get::<OnLoad>(symbols::ON_LOAD.as_bytes()) } {
            Ok(on_load) => Some(unsafe { on_load(null_mut(), null_mut::<c_void>()) }),
            Err(err) => {
                debug!("{:?} has no {}: {}", self.path, symbols::ON_LOAD, err);
                None
            }
        }
    }

    pub fn query_jni(&self, symbol_set: SymbolSet) -> anyhow::Result<RawResults> {
        let (page_size, address_size, huge_page_size) = symbol_set.names();
        unsafe {
            Ok(RawResults {
                page_size: self.call_static::<jint>(page_size)?,
                address_size: self.call_static::<jint>(address_size)?,
                huge_page_size: self.call_static::<jlong>(huge_page_size)?,
            })
        }
    }

    pub fn query_table(&self) -> anyhow::Result<RawResults> {
        let table = self.table()?;
        Ok(RawResults {
            page_size: (table.page_size)(),
            address_size: (table.address_size)(),
            huge_page_size: (table.huge_page_size)(),
        })
    }

    fn table(&self) -> anyhow::Result<MemoryQueryTable> {
        let accessor: Symbol<QueryTableAccessor> = unsafe { self.library.get(MEMORY_QUERY_TABLE_SYMBOL.as_bytes()) }
            .with_context(|| format!("resolving {}", MEMORY_QUERY_TABLE_SYMBOL))?;
        let table = unsafe { accessor().as_ref() }
            .with_context(|| format!("{} returned null", MEMORY_QUERY_TABLE_SYMBOL))?;
        if table.version != MEMORY_QUERY_TABLE_VERSION {
            bail!("unsupported memory query table version {}, expected {}", table.version, MEMORY_QUERY_TABLE_VERSION);
        }
        if (table.size as usize) < std::mem::size_of::<MemoryQueryTable>() {
            bail!("memory query table is {} bytes, too small for version {}", table.size, table.version);
        }
        Ok(*table)
    }

    // only valid for natives that ignore their env and class arguments
    unsafe fn call_static<T>(&self, symbol: &str) -> anyhow::Result<T> {
        let native: Symbol<StaticNoArgNative<T>> = self.library.get(symbol.as_bytes())
            .with_context(|| format!("resolving {}", symbol))?;
        debug!("calling {}", symbol);
        Ok(native(null_mut(), null_mut()))
    }
}

#[cfg(unix)]
fn open_library(path: &Path) -> Result<Library, libloading::Error> {
    use libloading::os::unix::{RTLD_GLOBAL, RTLD_LAZY};
    unsafe { libloading::os::unix::Library::open(Some(path), RTLD_LAZY | RTLD_GLOBAL) }.map(Library::from)
}

#[cfg(not(unix))]
fn open_library(path: &Path) -> Result<Library, libloading::Error> {
    unsafe { Library::new(path) }
}

/// The library file name for this platform, e.g. `libixy_memory.so` on Linux.
pub fn library_file_name() -> String {
    format!("{}ixy_memory{}", std::env::consts::DLL_PREFIX, std::env::consts::DLL_SUFFIX)
}

/// Next to the running executable, or in the `deps` directory beside it where cargo leaves
/// library targets built for tests. Otherwise the bare file name for the dynamic loader to search.
pub fn default_library_path() -> PathBuf {
    std::env::current_exe().ok()
        .and_then(|exe| exe.parent().and_then(find_library))
        .unwrap_or_else(|| PathBuf::from(library_file_name()))
}

pub fn find_library(dir: &Path) -> Option<PathBuf> {
    let file_name = library_file_name();
    [dir.join(file_name.as_str()), dir.join("deps").join(file_name.as_str())].into_iter()
        .find(|path| path.exists())
}
