// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Opaque object handles.
//!
//! `TestObject` carries a name and a couple of value-type methods.
//! `CallbackTest` owns a stored string callback and drives caller-supplied
//! callbacks in a loop, so the cost measured is the native-to-caller direction.
//!
//! Strings returned by these entry points are `malloc` allocations the caller
//! releases with `mb_free_buffer`.

use std::ffi::c_void;
use std::hint::black_box;
use std::panic::{self, UnwindSafe};

use tracing::debug;

use crate::callback::{IntPairCallbackFn, StrParamCallbackFn, StrReturnCallbackFn, StringPairCallback};
use crate::status::{MbStatus, MbStr};
use crate::values::Float4;

/// Parameter the string-parameter callback loop passes on every call.
const STRING_PARAM: &str = "abc";

#[derive(Debug)]
pub struct TestObject {
    name: String,
}

impl TestObject {
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Dropping it releases the stored callback's context.
#[derive(Debug, Default)]
pub struct CallbackTest {
    stored: Option<StringPairCallback>,
}

/// Copy `s` into a `malloc` allocation, writing pointer and length.
unsafe fn write_malloc_copy(s: &[u8], ptr_out: *mut *mut u8, len_out: *mut usize) -> MbStatus {
    let buffer = crate::malloc_array::<u8>(s.len());
    if buffer.is_null() {
        *ptr_out = std::ptr::null_mut();
        *len_out = 0;
        return MbStatus::AllocationFailed;
    }
    std::ptr::copy_nonoverlapping(s.as_ptr(), buffer, s.len());
    *ptr_out = buffer;
    *len_out = s.len();
    MbStatus::Success
}

// =============================================================================
// TestObject
// =============================================================================

/// Create a `TestObject`. Null if `name` is null or not UTF-8.
///
/// # Safety
/// `name` must be null or valid for reads of `len` bytes.
#[no_mangle]
#[inline(never)]
pub unsafe extern "C" fn mb_test_object_create(name: *const u8, len: usize) -> *mut TestObject {
    if name.is_null() {
        return std::ptr::null_mut();
    }
    let Ok(name) = std::str::from_utf8(std::slice::from_raw_parts(name, len)) else {
        return std::ptr::null_mut();
    };

    debug!(name, "Creating test object");
    Box::into_raw(Box::new(TestObject {
        name: name.to_owned(),
    }))
}

/// # Safety
/// `obj` must be null or come from `mb_test_object_create` and not have been
/// released.
#[no_mangle]
#[inline(never)]
pub unsafe extern "C" fn mb_test_object_release(obj: *mut TestObject) {
    if !obj.is_null() {
        let obj = Box::from_raw(obj);
        debug!(name = %obj.name, "Releasing test object");
    }
}

/// # Safety
/// `obj` must be null or a live object; `name` must be null or valid for reads
/// of `len` bytes.
#[no_mangle]
#[inline(never)]
pub unsafe extern "C" fn mb_test_object_set_name(
    obj: *mut TestObject,
    name: *const u8,
    len: usize,
) -> MbStatus {
    let Some(obj) = obj.as_mut() else {
        return MbStatus::NullPointer;
    };
    if name.is_null() {
        return MbStatus::NullPointer;
    }
    let Ok(name) = std::str::from_utf8(std::slice::from_raw_parts(name, len)) else {
        return MbStatus::InvalidEncoding;
    };

    obj.name.clear();
    obj.name.push_str(name);
    MbStatus::Success
}

/// Return a `malloc` copy of the object's name.
///
/// # Safety
/// `obj` must be null or a live object; `ptr_out` and `len_out` must be null or
/// writable.
#[no_mangle]
#[inline(never)]
pub unsafe extern "C" fn mb_test_object_get_name(
    obj: *const TestObject,
    ptr_out: *mut *mut u8,
    len_out: *mut usize,
) -> MbStatus {
    let Some(obj) = obj.as_ref() else {
        return MbStatus::NullPointer;
    };
    if ptr_out.is_null() || len_out.is_null() {
        return MbStatus::NullPointer;
    }
    write_malloc_copy(obj.name.as_bytes(), ptr_out, len_out)
}

/// Return `a` followed by `b` in a `malloc` allocation.
///
/// # Safety
/// `obj` must be null or a live object; both views must be valid; `ptr_out`
/// and `len_out` must be null or writable.
#[no_mangle]
#[inline(never)]
pub unsafe extern "C" fn mb_test_object_concatenate_strings(
    obj: *const TestObject,
    a: MbStr,
    b: MbStr,
    ptr_out: *mut *mut u8,
    len_out: *mut usize,
) -> MbStatus {
    if obj.is_null() || ptr_out.is_null() || len_out.is_null() {
        return MbStatus::NullPointer;
    }
    let (a, b) = (a.as_bytes(), b.as_bytes());

    let mut joined = Vec::with_capacity(a.len() + b.len());
    joined.extend_from_slice(a);
    joined.extend_from_slice(b);
    write_malloc_copy(&joined, ptr_out, len_out)
}

#[no_mangle]
#[inline(never)]
pub extern "C" fn mb_test_object_add_float_vectors(
    obj: *const TestObject,
    a: Float4,
    b: Float4,
) -> Float4 {
    black_box(obj);
    a + b
}

/// Run `f`, returning the default value if it panics.
fn guarded<T: Default>(f: impl FnOnce() -> T + UnwindSafe) -> T {
    panic::catch_unwind(f).unwrap_or_default()
}

/// Like `mb_test_object_add_float_vectors`, but a panic never unwinds into
/// the caller: it yields a zero vector instead.
#[no_mangle]
#[inline(never)]
pub extern "C" fn mb_test_object_add_float_vectors_guarded(
    obj: *const TestObject,
    a: Float4,
    b: Float4,
) -> Float4 {
    black_box(obj);
    guarded(move || a + b)
}

/// # Safety
/// `obj` must be null or a live object; `a` and `b` readable, `out` writable.
#[no_mangle]
#[inline(never)]
pub unsafe extern "C" fn mb_test_object_add_float_vectors_by_ref(
    obj: *const TestObject,
    a: *const Float4,
    b: *const Float4,
    out: *mut Float4,
) -> MbStatus {
    black_box(obj);
    match (a.as_ref(), b.as_ref()) {
        (Some(a), Some(b)) if !out.is_null() => {
            *out = *a + *b;
            MbStatus::Success
        }
        _ => MbStatus::NullPointer,
    }
}

// =============================================================================
// CallbackTest
// =============================================================================

#[no_mangle]
#[inline(never)]
pub extern "C" fn mb_callback_test_create() -> *mut CallbackTest {
    debug!("Creating callback test object");
    Box::into_raw(Box::default())
}

/// Release the object together with its stored callback's context.
///
/// # Safety
/// `obj` must be null or come from `mb_callback_test_create` and not have been
/// released.
#[no_mangle]
#[inline(never)]
pub unsafe extern "C" fn mb_callback_test_release(obj: *mut CallbackTest) {
    if !obj.is_null() {
        debug!("Releasing callback test object");
        drop(Box::from_raw(obj));
    }
}

/// Replace the stored callback, releasing the previous one's context. On a
/// null `obj` the new callback is released straight away.
///
/// # Safety
/// `obj` must be null or a live object. `callback.func` and `callback.release`
/// must accept `callback.context`, whose ownership moves to the object.
#[no_mangle]
#[inline(never)]
pub unsafe extern "C" fn mb_callback_test_set_callback(
    obj: *mut CallbackTest,
    callback: StringPairCallback,
) -> MbStatus {
    let Some(obj) = obj.as_mut() else {
        drop(callback);
        return MbStatus::NullPointer;
    };
    obj.stored = Some(callback);
    MbStatus::Success
}

/// Invoke the stored callback once. The view written to `out` is owned by the
/// callback's context.
///
/// # Safety
/// `obj` must be null or a live object; `a` and `b` valid; `out` writable.
#[no_mangle]
#[inline(never)]
pub unsafe extern "C" fn mb_callback_test_invoke_stored_callback(
    obj: *const CallbackTest,
    a: MbStr,
    b: MbStr,
    out: *mut MbStr,
) -> MbStatus {
    let Some(obj) = obj.as_ref() else {
        return MbStatus::NullPointer;
    };
    if out.is_null() {
        return MbStatus::NullPointer;
    }
    let Some(callback) = obj.stored.as_ref() else {
        return MbStatus::CallbackNotSet;
    };
    *out = (callback.func)(callback.context, a, b);
    MbStatus::Success
}

/// Call `callback(context, 1, 2)` `rounds` times and sum the results.
///
/// # Safety
/// `obj` must be null or a live object; `out` writable; `context` valid for
/// `callback` throughout the loop.
#[no_mangle]
#[inline(never)]
pub unsafe extern "C" fn mb_callback_test_invoke_int_callback_repeatedly(
    obj: *const CallbackTest,
    rounds: i64,
    callback: IntPairCallbackFn,
    context: *mut c_void,
    out: *mut i64,
) -> MbStatus {
    if obj.is_null() || out.is_null() {
        return MbStatus::NullPointer;
    }
    let mut sum = 0i64;
    for _ in 0..rounds {
        sum = sum.wrapping_add(callback(context, 1, 2) as i64);
    }
    *out = sum;
    MbStatus::Success
}

/// Call `callback(context, "abc")` `rounds` times and sum the results.
///
/// # Safety
/// `obj` must be null or a live object; `out` writable; `context` valid for
/// `callback` throughout the loop.
#[no_mangle]
#[inline(never)]
pub unsafe extern "C" fn mb_callback_test_invoke_string_param_callback_repeatedly(
    obj: *const CallbackTest,
    rounds: i64,
    callback: StrParamCallbackFn,
    context: *mut c_void,
    out: *mut i64,
) -> MbStatus {
    if obj.is_null() || out.is_null() {
        return MbStatus::NullPointer;
    }
    let param = String::from(STRING_PARAM);
    let mut sum = 0i64;
    for _ in 0..rounds {
        sum = sum.wrapping_add(callback(context, MbStr::new(&param)) as i64);
    }
    *out = sum;
    MbStatus::Success
}

/// Call `callback(context)` `rounds` times, copying each returned string into
/// an owned native string, and sum their lengths.
///
/// # Safety
/// `obj` must be null or a live object; `out` writable; `context` valid for
/// `callback` throughout the loop.
#[no_mangle]
#[inline(never)]
pub unsafe extern "C" fn mb_callback_test_invoke_string_return_callback_repeatedly(
    obj: *const CallbackTest,
    rounds: i64,
    callback: StrReturnCallbackFn,
    context: *mut c_void,
    out: *mut i64,
) -> MbStatus {
    if obj.is_null() || out.is_null() {
        return MbStatus::NullPointer;
    }
    let mut sum = 0i64;
    for _ in 0..rounds {
        let returned = callback(context);
        let Ok(owned) = std::str::from_utf8(returned.as_bytes()).map(str::to_owned) else {
            return MbStatus::InvalidEncoding;
        };
        sum = sum.wrapping_add(owned.len() as i64);
    }
    *out = sum;
    MbStatus::Success
}
