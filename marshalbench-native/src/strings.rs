// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! String entry points.
//!
//! Parameters arrive as a NUL-terminated narrow pointer, a NUL-terminated
//! UTF-16 pointer, or a pointer plus explicit length. The `*_create_owned*`
//! variants additionally build an owned native string from the input.
//!
//! Returns come back borrowed (pointer into the stored test string, valid until
//! the next `mb_set_test_string` on the same thread), copied into a
//! caller-supplied buffer, or in a `malloc` allocation the caller must release
//! with `mb_free_buffer`.

use std::ffi::{c_char, CStr};
use std::hint::black_box;

use crate::state::with_state;
use crate::status::MbStatus;

/// Store the string later returned by the `mb_string_return_*` family.
///
/// # Safety
/// `s` must be null or valid for reads of `len` bytes.
#[no_mangle]
#[inline(never)]
pub unsafe extern "C" fn mb_set_test_string(s: *const u8, len: usize) -> MbStatus {
    if s.is_null() {
        return MbStatus::NullPointer;
    }
    let bytes = std::slice::from_raw_parts(s, len);
    let Ok(text) = std::str::from_utf8(bytes) else {
        return MbStatus::InvalidEncoding;
    };

    with_state(|state| {
        state.test_string = text.to_owned();
        state.test_string_u16 = text.encode_utf16().collect();
    });
    MbStatus::Success
}

// =============================================================================
// Parameters
// =============================================================================

/// # Safety
/// `s` must be null or a NUL-terminated string.
#[no_mangle]
#[inline(never)]
pub unsafe extern "C" fn mb_string_param_byte_ptr(s: *const c_char) {
    black_box(s);
}

/// Copy a NUL-terminated UTF-8 string into an owned native string.
///
/// # Safety
/// `s` must be null or a NUL-terminated string.
#[no_mangle]
#[inline(never)]
pub unsafe extern "C" fn mb_string_param_byte_ptr_create_owned(s: *const c_char) -> MbStatus {
    if s.is_null() {
        return MbStatus::NullPointer;
    }
    let Ok(text) = CStr::from_ptr(s).to_str() else {
        return MbStatus::InvalidEncoding;
    };

    let owned = text.to_owned();
    with_state(|state| state.owned_narrow = owned);
    MbStatus::Success
}

/// # Safety
/// `s` must be null or valid for reads of `len` bytes.
#[no_mangle]
#[inline(never)]
pub unsafe extern "C" fn mb_string_param_byte_ptr_len(s: *const u8, len: usize) {
    black_box((s, len));
}

/// Copy a UTF-8 pointer+length string into an owned native string.
///
/// # Safety
/// `s` must be null or valid for reads of `len` bytes.
#[no_mangle]
#[inline(never)]
pub unsafe extern "C" fn mb_string_param_byte_ptr_len_create_owned(
    s: *const u8,
    len: usize,
) -> MbStatus {
    if s.is_null() {
        return MbStatus::NullPointer;
    }
    let Ok(text) = std::str::from_utf8(std::slice::from_raw_parts(s, len)) else {
        return MbStatus::InvalidEncoding;
    };

    let owned = text.to_owned();
    with_state(|state| state.owned_narrow = owned);
    MbStatus::Success
}

/// # Safety
/// `s` must be null or a NUL-terminated UTF-16 string.
#[no_mangle]
#[inline(never)]
pub unsafe extern "C" fn mb_string_param_utf16_ptr(s: *const u16) {
    black_box(s);
}

/// Copy a UTF-16 pointer+length string into an owned UTF-16 native string.
///
/// # Safety
/// `s` must be null or valid for reads of `len` UTF-16 units.
#[no_mangle]
#[inline(never)]
pub unsafe extern "C" fn mb_string_param_utf16_ptr_len_create_owned_utf16(
    s: *const u16,
    len: usize,
) -> MbStatus {
    if s.is_null() {
        return MbStatus::NullPointer;
    }

    let owned = std::slice::from_raw_parts(s, len).to_vec();
    with_state(|state| state.owned_wide = owned);
    MbStatus::Success
}

/// Transcode a UTF-16 pointer+length string into an owned UTF-8 native string.
///
/// # Safety
/// `s` must be null or valid for reads of `len` UTF-16 units.
#[no_mangle]
#[inline(never)]
pub unsafe extern "C" fn mb_string_param_utf16_ptr_len_create_owned_narrow(
    s: *const u16,
    len: usize,
) -> MbStatus {
    if s.is_null() {
        return MbStatus::NullPointer;
    }
    let Ok(owned) = String::from_utf16(std::slice::from_raw_parts(s, len)) else {
        return MbStatus::InvalidEncoding;
    };

    with_state(|state| state.owned_narrow = owned);
    MbStatus::Success
}

// =============================================================================
// Returns
// =============================================================================

/// Return a `malloc`-allocated, NUL-terminated copy of the stored test string.
/// Null on allocation failure. Release with `mb_free_buffer`.
#[no_mangle]
#[inline(never)]
pub extern "C" fn mb_string_return_alloc_narrow() -> *mut c_char {
    with_state(|state| {
        let bytes = state.test_string.as_bytes();
        let result = crate::malloc_array::<u8>(bytes.len() + 1);
        if result.is_null() {
            return std::ptr::null_mut();
        }
        // SAFETY: `result` holds `len + 1` bytes and does not overlap `bytes`.
        unsafe {
            std::ptr::copy_nonoverlapping(bytes.as_ptr(), result, bytes.len());
            *result.add(bytes.len()) = 0;
        }
        result as *mut c_char
    })
}

/// Return a `malloc`-allocated, NUL-terminated UTF-16 copy of the stored test
/// string. Null on allocation failure. Release with `mb_free_buffer`.
#[no_mangle]
#[inline(never)]
pub extern "C" fn mb_string_return_alloc_utf16() -> *mut u16 {
    with_state(|state| {
        let units = state.test_string_u16.as_slice();
        let result = crate::malloc_array::<u16>(units.len() + 1);
        if result.is_null() {
            return std::ptr::null_mut();
        }
        // SAFETY: `result` holds `len + 1` units and does not overlap `units`.
        unsafe {
            std::ptr::copy_nonoverlapping(units.as_ptr(), result, units.len());
            *result.add(units.len()) = 0;
        }
        result
    })
}

/// Borrow the stored test string's bytes.
///
/// # Safety
/// `ptr_out` and `len_out` must be null or writable.
#[no_mangle]
#[inline(never)]
pub unsafe extern "C" fn mb_string_return_byte_ptr(
    ptr_out: *mut *const u8,
    len_out: *mut usize,
) -> MbStatus {
    if ptr_out.is_null() || len_out.is_null() {
        return MbStatus::NullPointer;
    }
    let (ptr, len) = with_state(|state| (state.test_string.as_ptr(), state.test_string.len()));
    *ptr_out = ptr;
    *len_out = len;
    MbStatus::Success
}

/// Borrow the stored test string's UTF-16 units.
///
/// # Safety
/// `ptr_out` and `len_out` must be null or writable.
#[no_mangle]
#[inline(never)]
pub unsafe extern "C" fn mb_string_return_utf16_ptr(
    ptr_out: *mut *const u16,
    len_out: *mut usize,
) -> MbStatus {
    if ptr_out.is_null() || len_out.is_null() {
        return MbStatus::NullPointer;
    }
    let (ptr, len) = with_state(|state| {
        (
            state.test_string_u16.as_ptr(),
            state.test_string_u16.len(),
        )
    });
    *ptr_out = ptr;
    *len_out = len;
    MbStatus::Success
}

/// Copy the UTF-16 test string into `buffer` when it fits in `capacity` units.
///
/// When it does not fit, a `malloc` allocation is returned instead and the
/// caller must release it with `mb_free_buffer` (detectable as
/// `*ptr_out != buffer`).
///
/// # Safety
/// `buffer` must be null or writable for `capacity` units; `ptr_out` and
/// `len_out` must be null or writable.
#[no_mangle]
#[inline(never)]
pub unsafe extern "C" fn mb_string_return_reuse_buffer_utf16(
    buffer: *mut u16,
    capacity: usize,
    ptr_out: *mut *mut u16,
    len_out: *mut usize,
) -> MbStatus {
    if ptr_out.is_null() || len_out.is_null() {
        return MbStatus::NullPointer;
    }

    with_state(|state| {
        let units = state.test_string_u16.as_slice();
        let target = if !buffer.is_null() && units.len() <= capacity {
            buffer
        } else {
            let allocated = crate::malloc_array::<u16>(units.len());
            if allocated.is_null() {
                *ptr_out = std::ptr::null_mut();
                *len_out = 0;
                return MbStatus::AllocationFailed;
            }
            allocated
        };

        std::ptr::copy_nonoverlapping(units.as_ptr(), target, units.len());
        *ptr_out = target;
        *len_out = units.len();
        MbStatus::Success
    })
}

/// Return the UTF-16 test string in a fresh `malloc` allocation.
/// Release with `mb_free_buffer`.
///
/// # Safety
/// `ptr_out` and `len_out` must be null or writable.
#[no_mangle]
#[inline(never)]
pub unsafe extern "C" fn mb_string_return_allocate_buffer_utf16(
    ptr_out: *mut *mut u16,
    len_out: *mut usize,
) -> MbStatus {
    if ptr_out.is_null() || len_out.is_null() {
        return MbStatus::NullPointer;
    }

    with_state(|state| {
        let units = state.test_string_u16.as_slice();
        let allocated = crate::malloc_array::<u16>(units.len());
        if allocated.is_null() {
            *ptr_out = std::ptr::null_mut();
            *len_out = 0;
            return MbStatus::AllocationFailed;
        }

        std::ptr::copy_nonoverlapping(units.as_ptr(), allocated, units.len());
        *ptr_out = allocated;
        *len_out = units.len();
        MbStatus::Success
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mb_free_buffer;
    use std::ffi::CString;

    fn set(s: &str) {
        let status = unsafe { mb_set_test_string(s.as_ptr(), s.len()) };
        assert_eq!(status, MbStatus::Success);
    }

    fn utf16(s: &str) -> Vec<u16> {
        s.encode_utf16().collect()
    }

    #[test]
    fn test_set_test_string_rejects_null_and_bad_utf8() {
        assert_eq!(
            unsafe { mb_set_test_string(std::ptr::null(), 3) },
            MbStatus::NullPointer
        );
        let bad = [0xffu8, 0xfe];
        assert_eq!(
            unsafe { mb_set_test_string(bad.as_ptr(), bad.len()) },
            MbStatus::InvalidEncoding
        );
    }

    #[test]
    fn test_create_owned_variants_fill_sinks() {
        let c = CString::new("abcde12345").unwrap();
        assert!(unsafe { mb_string_param_byte_ptr_create_owned(c.as_ptr()) }.is_success());
        let wide_before = crate::mb_dummy_result() - 10;

        let bytes = b"xy";
        assert!(unsafe { mb_string_param_byte_ptr_len_create_owned(bytes.as_ptr(), 2) }
            .is_success());
        assert_eq!(crate::mb_dummy_result(), wide_before + 2);

        let wide = utf16("hello");
        assert!(unsafe {
            mb_string_param_utf16_ptr_len_create_owned_utf16(wide.as_ptr(), wide.len())
        }
        .is_success());
        assert!(unsafe {
            mb_string_param_utf16_ptr_len_create_owned_narrow(wide.as_ptr(), wide.len())
        }
        .is_success());
        // narrow sink now "hello", wide sink "hello"
        assert_eq!(crate::mb_dummy_result(), 10);
    }

    #[test]
    fn test_create_owned_rejects_null() {
        unsafe {
            assert_eq!(
                mb_string_param_byte_ptr_create_owned(std::ptr::null()),
                MbStatus::NullPointer
            );
            assert_eq!(
                mb_string_param_byte_ptr_len_create_owned(std::ptr::null(), 1),
                MbStatus::NullPointer
            );
            assert_eq!(
                mb_string_param_utf16_ptr_len_create_owned_narrow(std::ptr::null(), 1),
                MbStatus::NullPointer
            );
        }
    }

    #[test]
    fn test_unpaired_surrogate_is_invalid_encoding() {
        let lone = [0xd800u16];
        assert_eq!(
            unsafe { mb_string_param_utf16_ptr_len_create_owned_narrow(lone.as_ptr(), 1) },
            MbStatus::InvalidEncoding
        );
    }

    #[test]
    fn test_alloc_narrow_roundtrip() {
        set("abc");
        let p = mb_string_return_alloc_narrow();
        assert!(!p.is_null());
        let s = unsafe { CStr::from_ptr(p) }.to_str().unwrap().to_owned();
        unsafe { mb_free_buffer(p.cast()) };
        assert_eq!(s, "abc");
    }

    #[test]
    fn test_alloc_utf16_is_nul_terminated() {
        set("héllo");
        let p = mb_string_return_alloc_utf16();
        assert!(!p.is_null());
        let mut len = 0;
        while unsafe { *p.add(len) } != 0 {
            len += 1;
        }
        let s = String::from_utf16(unsafe { std::slice::from_raw_parts(p, len) }).unwrap();
        unsafe { mb_free_buffer(p.cast()) };
        assert_eq!(s, "héllo");
    }

    #[test]
    fn test_borrowed_returns() {
        set("abcdef");
        let mut ptr: *const u8 = std::ptr::null();
        let mut len = 0;
        assert!(unsafe { mb_string_return_byte_ptr(&mut ptr, &mut len) }.is_success());
        assert_eq!(unsafe { std::slice::from_raw_parts(ptr, len) }, b"abcdef");

        let mut wptr: *const u16 = std::ptr::null();
        assert!(unsafe { mb_string_return_utf16_ptr(&mut wptr, &mut len) }.is_success());
        assert_eq!(
            unsafe { std::slice::from_raw_parts(wptr, len) },
            utf16("abcdef").as_slice()
        );

        assert_eq!(
            unsafe { mb_string_return_byte_ptr(std::ptr::null_mut(), &mut len) },
            MbStatus::NullPointer
        );
    }

    #[test]
    fn test_reuse_buffer_uses_caller_buffer_when_it_fits() {
        set("abcde12345");
        let mut buffer = vec![0u16; 64];
        let mut ptr: *mut u16 = std::ptr::null_mut();
        let mut len = 0;
        let status = unsafe {
            mb_string_return_reuse_buffer_utf16(buffer.as_mut_ptr(), buffer.len(), &mut ptr, &mut len)
        };
        assert!(status.is_success());
        assert_eq!(ptr, buffer.as_mut_ptr());
        assert_eq!(&buffer[..len], utf16("abcde12345").as_slice());
    }

    #[test]
    fn test_reuse_buffer_allocates_when_too_small() {
        let long = "abcde12345".repeat(10);
        set(&long);
        let mut buffer = vec![0u16; 8];
        let mut ptr: *mut u16 = std::ptr::null_mut();
        let mut len = 0;
        let status = unsafe {
            mb_string_return_reuse_buffer_utf16(buffer.as_mut_ptr(), buffer.len(), &mut ptr, &mut len)
        };
        assert!(status.is_success());
        assert_ne!(ptr, buffer.as_mut_ptr());
        assert_eq!(len, 100);
        let s = String::from_utf16(unsafe { std::slice::from_raw_parts(ptr, len) }).unwrap();
        unsafe { mb_free_buffer(ptr.cast()) };
        assert_eq!(s, long);
    }

    #[test]
    fn test_allocate_buffer_utf16() {
        set("xyz");
        let mut ptr: *mut u16 = std::ptr::null_mut();
        let mut len = 0;
        assert!(unsafe { mb_string_return_allocate_buffer_utf16(&mut ptr, &mut len) }.is_success());
        let s = String::from_utf16(unsafe { std::slice::from_raw_parts(ptr, len) }).unwrap();
        unsafe { mb_free_buffer(ptr.cast()) };
        assert_eq!(s, "xyz");
    }

    #[test]
    fn test_empty_string_allocations_are_not_null() {
        set("");
        let p = mb_string_return_alloc_narrow();
        assert!(!p.is_null());
        unsafe { mb_free_buffer(p.cast()) };

        let mut ptr: *mut u16 = std::ptr::null_mut();
        let mut len = 1;
        assert!(unsafe { mb_string_return_allocate_buffer_utf16(&mut ptr, &mut len) }.is_success());
        assert_eq!(len, 0);
        unsafe { mb_free_buffer(ptr.cast()) };
    }
}
