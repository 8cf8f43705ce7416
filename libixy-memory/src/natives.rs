//! JNI exports. Both the `MemoryUtils` names from the generated header and the older
//! `JniMemoryManager` names are exported, backed by the same queries.
#![allow(non_snake_case)]

use std::ffi::c_void;

use jni_bindings::{jclass, jint, jlong, JavaVM, JNI_VERSION_1_8, JNIEnv};
use log::debug;
use system_memory::HostMemory;

use crate::{address_size_native, guarded, HUGE_PAGE_QUERY_FAILED, huge_page_size_native, page_size_native, QUERY_FAILED};

#[no_mangle]
pub unsafe extern "system" fn JNI_OnLoad(_vm: *mut JavaVM, _reserved: *mut c_void) -> jint {
    debug!("ixy memory natives loaded");
    JNI_VERSION_1_8
}

pub(crate) fn page_size() -> jint {
    guarded(QUERY_FAILED, || page_size_native(&HostMemory::default()))
}

pub(crate) fn address_size() -> jint {
    guarded(QUERY_FAILED, || address_size_native(&HostMemory::default()))
}

// configuration is re-read on every call, same as the queries themselves
pub(crate) fn huge_page_size() -> jlong {
    guarded(HUGE_PAGE_QUERY_FAILED, || huge_page_size_native(&HostMemory::from_env()))
}

#[no_mangle]
pub unsafe extern "system" fn Java_de_tum_in_net_ixy_memory_MemoryUtils_c_1pagesize(_env: *mut JNIEnv, _class: jclass) -> jint {
    page_size()
}

#[no_mangle]
pub unsafe extern "system" fn Java_de_tum_in_net_ixy_memory_MemoryUtils_c_1addrsize(_env: *mut JNIEnv, _class: jclass) -> jint {
    address_size()
}

#[no_mangle]
pub unsafe extern "system" fn Java_de_tum_in_net_ixy_memory_MemoryUtils_c_1hugepage(_env: *mut JNIEnv, _class: jclass) -> jlong {
    huge_page_size()
}

#[no_mangle]
pub unsafe extern "system" fn Java_de_tum_in_net_ixy_memory_JniMemoryManager_c_1page_1size(_env: *mut JNIEnv, _class: jclass) -> jint {
    page_size()
}

#[no_mangle]
pub unsafe extern "system" fn Java_de_tum_in_net_ixy_memory_JniMemoryManager_c_1address_1size(_env: *mut JNIEnv, _class: jclass) -> jint {
    address_size()
}

#[no_mangle]
pub unsafe extern "system" fn Java_de_tum_in_net_ixy_memory_JniMemoryManager_c_1hugepage_1size(_env: *mut JNIEnv, _class: jclass) -> jlong {
    huge_page_size()
}

#[cfg(test)]
pub mod test {
    use std::mem::size_of;
    use std::ptr::null_mut;

    use jni_bindings::{native_symbol, JNI_VERSION_1_8, StaticNoArgNative, jint, jlong};

    use crate::{HUGE_PAGE_QUERY_FAILED, symbols};
    use crate::natives::*;

    #[test]
    pub fn symbol_names_follow_jni_mangling() {
        assert_eq!(native_symbol(symbols::MEMORY_UTILS_CLASS, "c_pagesize"), symbols::PAGE_SIZE);
        assert_eq!(native_symbol(symbols::MEMORY_UTILS_CLASS, "c_addrsize"), symbols::ADDRESS_SIZE);
        assert_eq!(native_symbol(symbols::MEMORY_UTILS_CLASS, "c_hugepage"), symbols::HUGE_PAGE_SIZE);
        assert_eq!(native_symbol(symbols::JNI_MEMORY_MANAGER_CLASS, "c_page_size"), symbols::MANAGER_PAGE_SIZE);
        assert_eq!(native_symbol(symbols::JNI_MEMORY_MANAGER_CLASS, "c_address_size"), symbols::MANAGER_ADDRESS_SIZE);
        assert_eq!(native_symbol(symbols::JNI_MEMORY_MANAGER_CLASS, "c_hugepage_size"), symbols::MANAGER_HUGE_PAGE_SIZE);
    }

    #[test]
    pub fn exports_answer_without_an_env() {
        let page_size: StaticNoArgNative<jint> = Java_de_tum_in_net_ixy_memory_MemoryUtils_c_1pagesize;
        let address_size: StaticNoArgNative<jint> = Java_de_tum_in_net_ixy_memory_MemoryUtils_c_1addrsize;
        let huge_page_size: StaticNoArgNative<jlong> = Java_de_tum_in_net_ixy_memory_MemoryUtils_c_1hugepage;
        unsafe {
            let page = page_size(null_mut(), null_mut());
            assert!(page > 0);
            assert_eq!(page.count_ones(), 1);
            assert_eq!(address_size(null_mut(), null_mut()) as usize, size_of::<usize>());
            let huge = huge_page_size(null_mut(), null_mut());
            if huge != HUGE_PAGE_QUERY_FAILED && huge != crate::HUGE_PAGE_UNSUPPORTED {
                assert!(huge > page as jlong);
            }
            assert_eq!(Java_de_tum_in_net_ixy_memory_JniMemoryManager_c_1page_1size(null_mut(), null_mut()), page);
            assert_eq!(Java_de_tum_in_net_ixy_memory_JniMemoryManager_c_1address_1size(null_mut(), null_mut()), address_size(null_mut(), null_mut()));
            assert_eq!(JNI_OnLoad(null_mut(), null_mut()), JNI_VERSION_1_8);
        }
    }
}
