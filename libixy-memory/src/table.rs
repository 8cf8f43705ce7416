//! Versioned function table for hosts that bind one symbol instead of the JNI names.
//!
//! The entries return the same values and sentinels as the JNI exports. New entries are only
//! ever appended, and `size` tells a caller how many of them this library provides.

use std::mem::size_of;

use crate::natives;

pub const MEMORY_QUERY_TABLE_VERSION: u32 = 1;
pub const MEMORY_QUERY_TABLE_SYMBOL: &str = "ixy_memory_query_table";

#[repr(C)]
#[derive(Debug, Copy, Clone)]
pub struct MemoryQueryTable {
    pub version: u32,
    pub size: u32,
    pub page_size: extern "C" fn() -> i32,
    pub address_size: extern "C" fn() -> i32,
    pub huge_page_size: extern "C" fn() -> i64,
}

extern "C" fn table_page_size() -> i32 {
    natives::page_size()
}

extern "C" fn table_address_size() -> i32 {
    natives::address_size()
}

extern "C" fn table_huge_page_size() -> i64 {
    natives::huge_page_size()
}

static MEMORY_QUERY_TABLE: MemoryQueryTable = MemoryQueryTable {
    version: MEMORY_QUERY_TABLE_VERSION,
    size: size_of::<MemoryQueryTable>() as u32,
    page_size: table_page_size,
    address_size: table_address_size,
    huge_page_size: table_huge_page_size,
};

pub type QueryTableAccessor = unsafe extern "C" fn() -> *const MemoryQueryTable;

#[no_mangle]
pub extern "C" fn ixy_memory_query_table() -> *const MemoryQueryTable {
    &MEMORY_QUERY_TABLE
}

#[cfg(test)]
pub mod test {
    use std::mem::size_of;

    use crate::natives;
    use crate::table::{ixy_memory_query_table, MEMORY_QUERY_TABLE_VERSION, MemoryQueryTable};

    #[test]
    pub fn table_matches_jni_exports() {
        let table = unsafe { ixy_memory_query_table().as_ref() }.unwrap();
        assert_eq!(table.version, MEMORY_QUERY_TABLE_VERSION);
        assert_eq!(table.size as usize, size_of::<MemoryQueryTable>());
        assert_eq!((table.page_size)(), natives::page_size());
        assert_eq!((table.address_size)(), natives::address_size());
        assert_eq!((table.huge_page_size)(), natives::huge_page_size());
    }

    #[test]
    pub fn table_is_a_single_static() {
        assert_eq!(ixy_memory_query_table(), ixy_memory_query_table());
    }
}
