// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Thread-local native state.

use std::cell::RefCell;
use std::ffi::c_void;

use crate::callback::{DynamicCallbackFn, StaticCallbackFn};

#[derive(Default)]
pub(crate) struct NativeState {
    /// Stored test string, narrow form. Borrowed by `mb_string_return_byte_ptr`.
    pub test_string: String,
    /// Stored test string, UTF-16 form. Borrowed by `mb_string_return_utf16_ptr`.
    pub test_string_u16: Vec<u16>,
    /// Sink for the owned copies built by `*_create_owned*` entry points.
    pub owned_narrow: String,
    pub owned_wide: Vec<u16>,
    pub static_callback: Option<StaticCallbackFn>,
    /// Stored stateful callback and the context it was stored with.
    pub dynamic_callback: Option<(DynamicCallbackFn, *mut c_void)>,
}

thread_local! {
    static STATE: RefCell<NativeState> = RefCell::new(NativeState::default());
}

/// Run `f` with the calling thread's native state.
///
/// Callbacks must never be invoked from inside `f`: a callback that re-enters
/// the boundary would hit the same `RefCell`.
pub(crate) fn with_state<R>(f: impl FnOnce(&mut NativeState) -> R) -> R {
    STATE.with(|state| f(&mut state.borrow_mut()))
}

/// Forget the stored stateful callback if it was stored with `context`.
///
/// Does nothing once the thread's state has been torn down.
pub(crate) fn forget_dynamic_context(context: *mut c_void) {
    STATE
        .try_with(|state| {
            let mut state = state.borrow_mut();
            if matches!(state.dynamic_callback, Some((_, stored)) if stored == context) {
                state.dynamic_callback = None;
            }
        })
        .unwrap_or_default();
}
