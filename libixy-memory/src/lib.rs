//! Native half of the ixy.java memory utilities.
//!
//! The JVM binds the exports in [`natives`] by symbol name. Hosts that load this library
//! themselves can bind the single [`table::ixy_memory_query_table`] symbol instead.
//!
//! Results cross the boundary as plain integers, so failures are encoded as sentinels:
//! [`QUERY_FAILED`] when the OS query failed and [`HUGE_PAGE_UNSUPPORTED`] when the host has no
//! huge pages. Neither is a valid size.

use std::panic::UnwindSafe;

use jni_bindings::{jint, jlong};
use log::{error, warn};
use system_memory::{HugePageSize, MemoryQuery};

pub mod natives;
pub mod table;

pub const QUERY_FAILED: jint = 0;
pub const HUGE_PAGE_QUERY_FAILED: jlong = 0;
pub const HUGE_PAGE_UNSUPPORTED: jlong = -1;

pub mod symbols {
    pub const MEMORY_UTILS_CLASS: &str = "de.tum.in.net.ixy.memory.MemoryUtils";
    pub const JNI_MEMORY_MANAGER_CLASS: &str = "de.tum.in.net.ixy.memory.JniMemoryManager";

    pub const PAGE_SIZE: &str = "Java_de_tum_in_net_ixy_memory_MemoryUtils_c_1pagesize";
    pub const ADDRESS_SIZE: &str = "Java_de_tum_in_net_ixy_memory_MemoryUtils_c_1addrsize";
    pub const HUGE_PAGE_SIZE: &str = "Java_de_tum_in_net_ixy_memory_MemoryUtils_c_1hugepage";

    pub const MANAGER_PAGE_SIZE: &str = "Java_de_tum_in_net_ixy_memory_JniMemoryManager_c_1page_1size";
    pub const MANAGER_ADDRESS_SIZE: &str = "Java_de_tum_in_net_ixy_memory_JniMemoryManager_c_1address_1size";
    pub const MANAGER_HUGE_PAGE_SIZE: &str = "Java_de_tum_in_net_ixy_memory_JniMemoryManager_c_1hugepage_1size";

    pub const ON_LOAD: &str = "JNI_OnLoad";
}

pub fn page_size_native(query: &impl MemoryQuery) -> jint {
    match query.page_size() {
        Ok(page_size) => jint::try_from(page_size.get()).unwrap_or_else(|_| {
            warn!("page size {} does not fit in a jint", page_size);
            QUERY_FAILED
        }),
        Err(_) => QUERY_FAILED,
    }
}

pub fn address_size_native(query: &impl MemoryQuery) -> jint {
    let address_size = query.address_size();
    jint::try_from(address_size).unwrap_or_else(|_| {
        warn!("address size {} does not fit in a jint", address_size);
        QUERY_FAILED
    })
}

pub fn huge_page_size_native(query: &impl MemoryQuery) -> jlong {
    match query.huge_page_size() {
        Ok(HugePageSize::Available(bytes)) => jlong::try_from(bytes).unwrap_or_else(|_| {
            warn!("huge page size {} does not fit in a jlong", bytes);
            HUGE_PAGE_QUERY_FAILED
        }),
        Ok(HugePageSize::Unsupported(_)) => HUGE_PAGE_UNSUPPORTED,
        Err(_) => HUGE_PAGE_QUERY_FAILED,
    }
}

/// Runs a native body, turning a panic into `failed` so it never unwinds into the caller.
pub(crate) fn guarded<T>(failed: T, body: impl FnOnce() -> T + UnwindSafe) -> T {
    match std::panic::catch_unwind(body) {
        Ok(res) => res,
        Err(_) => {
            error!("panic in native memory query");
            failed
        }
    }
}

#[cfg(test)]
pub mod test {
    use system_memory::{HugePageSize, MemoryQuery, MemoryQueryError, PageSize, UnsupportedReason};

    use crate::{address_size_native, guarded, huge_page_size_native, HUGE_PAGE_QUERY_FAILED, HUGE_PAGE_UNSUPPORTED, page_size_native, QUERY_FAILED};

    pub struct FakeHost {
        pub page_size: Option<i64>,
        pub address_size: usize,
        pub huge_page_size: Option<HugePageSize>,
    }

    impl MemoryQuery for FakeHost {
        fn page_size(&self) -> Result<PageSize, MemoryQueryError> {
            match self.page_size {
                Some(bytes) => PageSize::new(bytes),
                None => Err(MemoryQueryError::Undefined { name: "_SC_PAGESIZE" }),
            }
        }

        fn address_size(&self) -> usize {
            self.address_size
        }

        fn huge_page_size(&self) -> Result<HugePageSize, MemoryQueryError> {
            self.huge_page_size.ok_or(MemoryQueryError::InvalidHugePageSize { size: 3, page_size: 4096 })
        }
    }

    const STANDARD_HOST: FakeHost = FakeHost {
        page_size: Some(4096),
        address_size: 8,
        huge_page_size: Some(HugePageSize::Available(2097152)),
    };

    #[test]
    pub fn standard_host() {
        assert_eq!(page_size_native(&STANDARD_HOST), 4096);
        assert_eq!(address_size_native(&STANDARD_HOST), 8);
        assert_eq!(huge_page_size_native(&STANDARD_HOST), 2097152);
    }

    #[test]
    pub fn gigantic_pages_use_the_full_width() {
        let host = FakeHost { huge_page_size: Some(HugePageSize::Available(16 << 30)), ..STANDARD_HOST };
        assert_eq!(huge_page_size_native(&host), 16 << 30);
    }

    #[test]
    pub fn unsupported_is_not_failure() {
        let host = FakeHost { huge_page_size: Some(HugePageSize::Unsupported(UnsupportedReason::NoHugetlbfsMount)), ..STANDARD_HOST };
        assert_eq!(huge_page_size_native(&host), HUGE_PAGE_UNSUPPORTED);
        let host = FakeHost { huge_page_size: None, ..STANDARD_HOST };
        assert_eq!(huge_page_size_native(&host), HUGE_PAGE_QUERY_FAILED);
        assert_ne!(HUGE_PAGE_UNSUPPORTED, HUGE_PAGE_QUERY_FAILED);
    }

    #[test]
    pub fn failures_are_sentinels() {
        let host = FakeHost { page_size: None, ..STANDARD_HOST };
        assert_eq!(page_size_native(&host), QUERY_FAILED);
        let host = FakeHost { page_size: Some(4095), ..STANDARD_HOST };
        assert_eq!(page_size_native(&host), QUERY_FAILED);
        let host = FakeHost { huge_page_size: Some(HugePageSize::Available(u64::MAX)), ..STANDARD_HOST };
        assert_eq!(huge_page_size_native(&host), HUGE_PAGE_QUERY_FAILED);
    }

    #[test]
    pub fn panics_stay_inside() {
        assert_eq!(guarded(QUERY_FAILED, || panic!("boom")), QUERY_FAILED);
        assert_eq!(guarded(QUERY_FAILED, || 4096), 4096);
    }
}
