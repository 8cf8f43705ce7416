//! The slice of the JNI ABI that native method implementations in this workspace need.
//!
//! Only the primitive types, the opaque environment handles and the version constants are
//! declared. The function tables behind `JNIEnv` and `JavaVM` are never dereferenced here.

#![allow(non_upper_case_globals)]
#![allow(non_camel_case_types)]
#![allow(non_snake_case)]

use std::ffi::c_void;

pub type jint = i32;
pub type jlong = i64;

pub type jobject = *mut c_void;
pub type jclass = jobject;

#[repr(C)]
pub struct JNINativeInterface_ {
    _private: [u8; 0],
}

#[repr(C)]
pub struct JNIInvokeInterface_ {
    _private: [u8; 0],
}

pub type JNIEnv = *const JNINativeInterface_;
pub type JavaVM = *const JNIInvokeInterface_;

pub const JNI_VERSION_1_1: jint = 0x00010001;
pub const JNI_VERSION_1_2: jint = 0x00010002;
pub const JNI_VERSION_1_4: jint = 0x00010004;
pub const JNI_VERSION_1_6: jint = 0x00010006;
pub const JNI_VERSION_1_8: jint = 0x00010008;

/// Signature of a static native method that takes no Java arguments, e.g.
/// `private static native int c_pagesize();`.
pub type StaticNoArgNative<T> = unsafe extern "system" fn(env: *mut JNIEnv, class: jclass) -> T;

/// Signature of `JNI_OnLoad`.
pub type OnLoad = unsafe extern "system" fn(vm: *mut JavaVM, reserved: *mut c_void) -> jint;

/// Escapes one segment of a Java name the way `javah` does when building a native symbol:
/// `_` becomes `_1`, `;` becomes `_2`, `[` becomes `_3` and any other non-alphanumeric character becomes `_0xxxx`.
pub fn escape_segment(segment: &str) -> String {
    let mut res = String::with_capacity(segment.len());
    for c in segment.chars() {
        match c {
            '_' => res.push_str("_1"),
            ';' => res.push_str("_2"),
            '[' => res.push_str("_3"),
            c if c.is_ascii_alphanumeric() => res.push(c),
            c => {
                let mut units = [0u16; 2];
                for unit in c.encode_utf16(&mut units) {
                    res.push_str(format!("_0{:04x}", unit).as_str());
                }
            }
        }
    }
    res
}

/// The short native symbol name for a method, e.g.
/// `native_symbol("de.tum.in.net.ixy.memory.MemoryUtils", "c_pagesize")` is
/// `Java_de_tum_in_net_ixy_memory_MemoryUtils_c_1pagesize`.
pub fn native_symbol(class_name: &str, method_name: &str) -> String {
    let class = class_name.split(|c: char| c == '.' || c == '/').map(escape_segment).collect::<Vec<_>>().join("_");
    format!("Java_{}_{}", class, escape_segment(method_name))
}

#[cfg(test)]
pub mod test {
    use crate::{escape_segment, native_symbol};

    #[test]
    pub fn test_mangling() {
        assert_eq!(native_symbol("de.tum.in.net.ixy.memory.MemoryUtils", "c_pagesize"), "Java_de_tum_in_net_ixy_memory_MemoryUtils_c_1pagesize");
        assert_eq!(native_symbol("de/tum/in/net/ixy/memory/JniMemoryManager", "c_hugepage_size"), "Java_de_tum_in_net_ixy_memory_JniMemoryManager_c_1hugepage_1size");
        assert_eq!(escape_segment("a;[b"), "a_2_3b");
        assert_eq!(escape_segment("é"), "_000e9");
    }
}
