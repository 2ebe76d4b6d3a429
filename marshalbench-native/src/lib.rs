// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Marshalbench Native Boundary
//!
//! Fixed-signature `extern "C"` entry points, one per marshaling strategy.
//! Every entry point is `#[no_mangle]` and `#[inline(never)]` so a call from
//! the harness is a real C ABI call, the same one a foreign caller would make
//! against the `cdylib` build of this crate.
//!
//! # Entry point families
//!
//! - **Values**: `Float4`/`Float2` parameters and returns, scalars by value or
//!   through out-pointers ([`values`])
//! - **Strings**: narrow, UTF-16 and pointer+length parameters; borrowed,
//!   caller-buffer and callee-allocated returns ([`strings`])
//! - **Callbacks**: stateless and stateful function pointers, given per call or
//!   stored ([`callback`])
//! - **Objects**: opaque `TestObject` and `CallbackTest` handles ([`objects`])
//!
//! Native state (stored callbacks, the stored test string, owned-string sinks)
//! is thread-local to the calling thread.

pub mod callback;
pub mod objects;
mod state;
pub mod status;
pub mod strings;
pub mod values;

pub use callback::{
    BoundCallback, ContextHandle, DynamicCallbackFn, IntPairCallbackFn, NativeCallback, ReleaseFn,
    StaticCallbackFn, StrParamCallbackFn, StrReturnCallbackFn, StringPairCallback,
    StringPairCallbackFn, StringSource,
};
pub use objects::{CallbackTest, TestObject};
pub use status::{MbStatus, MbStr};
pub use values::{Float2, Float4};

/// Length of everything the owned-string sinks currently hold.
///
/// Reading it keeps the optimizer from discarding the writes made by the
/// `*_create_owned*` entry points.
#[no_mangle]
#[inline(never)]
pub extern "C" fn mb_dummy_result() -> usize {
    state::with_state(|s| s.owned_narrow.len() + s.owned_wide.len())
}

/// Does nothing. Baseline for the cost of a bare C ABI call.
#[no_mangle]
#[inline(never)]
pub extern "C" fn mb_empty_function() {}

/// Free a buffer handed out by a callee-allocating entry point.
///
/// # Safety
/// `buffer` must be null or a pointer returned by this library that has not
/// been freed yet.
#[no_mangle]
#[inline(never)]
pub unsafe extern "C" fn mb_free_buffer(buffer: *mut libc::c_void) {
    if !buffer.is_null() {
        libc::free(buffer);
    }
}

/// Allocate `count` elements of `T` with `malloc`, never asking for zero bytes.
pub(crate) fn malloc_array<T>(count: usize) -> *mut T {
    let bytes = count.max(1).saturating_mul(std::mem::size_of::<T>());
    // SAFETY: malloc has no preconditions; a null return is handled by callers.
    unsafe { libc::malloc(bytes) as *mut T }
}
