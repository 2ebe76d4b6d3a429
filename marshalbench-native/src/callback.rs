// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Callback entry points and the Rust-side callback wrappers.
//!
//! A callback crosses the boundary either as a bare function pointer
//! ([`NativeCallback::Stateless`]) or as a function pointer plus an opaque
//! context pointer ([`NativeCallback::Stateful`]). The context is owned on the
//! Rust side by a [`ContextHandle`], which frees it on drop, and is only ever
//! reinterpreted by the monomorphised trampoline that matches its type.

use std::ffi::c_void;
use std::fmt;
use std::marker::PhantomData;
use std::ptr::NonNull;

use marshalbench_core::BoundaryFault;

use crate::state::{forget_dynamic_context, with_state};
use crate::status::{MbStatus, MbStr};

/// `int (*)(int)`
pub type StaticCallbackFn = extern "C" fn(i32) -> i32;
/// `int (*)(void *, int)`
pub type DynamicCallbackFn = unsafe extern "C" fn(*mut c_void, i32) -> i32;
/// `int (*)(void *, int, int)`
pub type IntPairCallbackFn = unsafe extern "C" fn(*mut c_void, i32, i32) -> i32;
/// `int (*)(void *, MbStr)`
pub type StrParamCallbackFn = unsafe extern "C" fn(*mut c_void, MbStr) -> i32;
/// `MbStr (*)(void *)`. The returned view stays valid until the next call
/// with the same context.
pub type StrReturnCallbackFn = unsafe extern "C" fn(*mut c_void) -> MbStr;
/// `MbStr (*)(void *, MbStr, MbStr)`. Same lifetime rule as
/// [`StrReturnCallbackFn`].
pub type StringPairCallbackFn = unsafe extern "C" fn(*mut c_void, MbStr, MbStr) -> MbStr;
/// `void (*)(void *)`, frees a context handed over to the native side.
pub type ReleaseFn = unsafe extern "C" fn(*mut c_void);

// =============================================================================
// Entry points
// =============================================================================

#[no_mangle]
#[inline(never)]
pub extern "C" fn mb_invoke_given_static_callback(callback: StaticCallbackFn, value: i32) -> i32 {
    callback(value)
}

/// Store (or clear, with `None`) the callback used by
/// `mb_invoke_stored_static_callback`.
#[no_mangle]
#[inline(never)]
pub extern "C" fn mb_set_static_callback(callback: Option<StaticCallbackFn>) {
    with_state(|state| state.static_callback = callback);
}

/// # Safety
/// `out` must be null or point to a writable `i32`.
#[no_mangle]
#[inline(never)]
pub unsafe extern "C" fn mb_invoke_stored_static_callback(value: i32, out: *mut i32) -> MbStatus {
    if out.is_null() {
        return MbStatus::NullPointer;
    }
    // Copied out so the callback runs with the state unborrowed.
    let Some(callback) = with_state(|state| state.static_callback) else {
        return MbStatus::CallbackNotSet;
    };
    *out = callback(value);
    MbStatus::Success
}

/// # Safety
/// `context` must be valid for the call and be what `callback` expects.
#[no_mangle]
#[inline(never)]
pub unsafe extern "C" fn mb_invoke_given_dynamic_callback(
    callback: DynamicCallbackFn,
    context: *mut c_void,
    value: i32,
) -> i32 {
    callback(context, value)
}

/// Store (or clear, with `None`) the callback used by
/// `mb_invoke_stored_dynamic_callback`, together with its context.
///
/// # Safety
/// Until the pair is replaced or cleared, `context` must stay valid and be
/// what `callback` expects.
#[no_mangle]
#[inline(never)]
pub unsafe extern "C" fn mb_set_dynamic_callback(
    callback: Option<DynamicCallbackFn>,
    context: *mut c_void,
) {
    with_state(|state| state.dynamic_callback = callback.map(|func| (func, context)));
}

/// Invoke the stored stateful callback with its stored context.
///
/// `context` identifies the caller: if it is not the context the callback was
/// stored with, nothing is invoked and `CallbackMismatch` is returned.
///
/// # Safety
/// `out` must be null or point to a writable `i32`. The stored pair must still
/// satisfy the contract of `mb_set_dynamic_callback`.
#[no_mangle]
#[inline(never)]
pub unsafe extern "C" fn mb_invoke_stored_dynamic_callback(
    context: *mut c_void,
    value: i32,
    out: *mut i32,
) -> MbStatus {
    if out.is_null() {
        return MbStatus::NullPointer;
    }
    let Some((callback, stored_context)) = with_state(|state| state.dynamic_callback) else {
        return MbStatus::CallbackNotSet;
    };
    if stored_context != context {
        return MbStatus::CallbackMismatch;
    }
    *out = callback(stored_context, value);
    MbStatus::Success
}

/// Forget both stored callbacks.
#[no_mangle]
#[inline(never)]
pub extern "C" fn mb_clear_callbacks() {
    with_state(|state| {
        state.static_callback = None;
        state.dynamic_callback = None;
    });
}

// =============================================================================
// NativeCallback
// =============================================================================

/// An `int -> int` callback as it crosses the boundary.
#[derive(Clone, Copy)]
pub enum NativeCallback<'a> {
    Stateless(StaticCallbackFn),
    Stateful(BoundCallback<'a>),
}

/// A stateful function pointer and the context it was built for.
///
/// The lifetime ties it to the [`ContextHandle`] that owns the context. The
/// fields are private so the pair can only come from
/// [`ContextHandle::callback`] or [`NativeCallback::stateful`].
#[derive(Clone, Copy)]
pub struct BoundCallback<'a> {
    func: DynamicCallbackFn,
    context: *mut c_void,
    _owner: PhantomData<&'a ()>,
}

impl BoundCallback<'_> {
    pub fn context(&self) -> *mut c_void {
        self.context
    }
}

impl fmt::Debug for NativeCallback<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NativeCallback::Stateless(_) => f.write_str("Stateless"),
            NativeCallback::Stateful(bound) => f
                .debug_struct("Stateful")
                .field("context", &bound.context)
                .finish(),
        }
    }
}

impl<'a> NativeCallback<'a> {
    /// Pair a raw function pointer with a raw context.
    ///
    /// # Safety
    /// `context` must stay valid for `'a` and be what `func` expects. If the
    /// callback is [stored](Self::store), it must be cleared with
    /// `mb_clear_callbacks` before `context` is freed.
    pub unsafe fn stateful(func: DynamicCallbackFn, context: *mut c_void) -> Self {
        NativeCallback::Stateful(BoundCallback {
            func,
            context,
            _owner: PhantomData,
        })
    }

    /// Pass the callback with the call and have it invoked once.
    #[inline]
    pub fn invoke_given(&self, value: i32) -> i32 {
        match *self {
            NativeCallback::Stateless(func) => mb_invoke_given_static_callback(func, value),
            NativeCallback::Stateful(bound) => {
                // SAFETY: the pair was built for each other, by
                // `ContextHandle::callback` or under the `stateful` contract,
                // and the context outlives `'a`.
                unsafe { mb_invoke_given_dynamic_callback(bound.func, bound.context, value) }
            }
        }
    }

    /// Register the callback on the native side, replacing whatever was
    /// stored for its kind.
    ///
    /// A stateful callback is stored with its context. The native side forgets
    /// it when the owning [`ContextHandle`] drops.
    pub fn store(&self) {
        match *self {
            NativeCallback::Stateless(func) => mb_set_static_callback(Some(func)),
            NativeCallback::Stateful(bound) => {
                // SAFETY: the pair matches as in `invoke_given`. A handle's
                // drop clears it; raw contexts are cleared per `stateful`.
                unsafe { mb_set_dynamic_callback(Some(bound.func), bound.context) }
            }
        }
    }

    /// Invoke whatever the native side has stored for this callback's kind.
    ///
    /// A stateful callback only reaches a stored callback that was stored with
    /// its own context; any other stored pair is a `CallbackMismatch`.
    #[inline]
    pub fn invoke_stored(&self, value: i32) -> Result<i32, BoundaryFault> {
        let mut out = 0;
        match *self {
            NativeCallback::Stateless(_) => {
                // SAFETY: `out` is a live local.
                unsafe { mb_invoke_stored_static_callback(value, &mut out) }
                    .into_result("mb_invoke_stored_static_callback")?;
            }
            NativeCallback::Stateful(bound) => {
                // SAFETY: `out` is a live local. Only a pair stored with this
                // live context is invoked, and such a pair is always matched.
                unsafe { mb_invoke_stored_dynamic_callback(bound.context, value, &mut out) }
                    .into_result("mb_invoke_stored_dynamic_callback")?;
            }
        }
        Ok(out)
    }
}

// =============================================================================
// ContextHandle
// =============================================================================

/// Heap cell behind a [`ContextHandle`].
struct ContextSlot<T> {
    value: T,
    // Non-zero size, so two live contexts never share an address.
    _tag: u8,
}

/// Owns a heap-allocated callback context and frees it on drop.
///
/// The pointer given out by [`as_context`](Self::as_context) is stable for the
/// handle's lifetime and distinct from that of every other live handle.
pub struct ContextHandle<T> {
    ptr: NonNull<ContextSlot<T>>,
}

impl<T> ContextHandle<T> {
    pub fn new(value: T) -> Self {
        Self {
            ptr: NonNull::from(Box::leak(Box::new(ContextSlot { value, _tag: 0 }))),
        }
    }

    pub fn as_context(&self) -> *mut c_void {
        self.ptr.as_ptr().cast()
    }
}

impl<T> Drop for ContextHandle<T> {
    fn drop(&mut self) {
        forget_dynamic_context(self.as_context());
        // SAFETY: `ptr` came from `Box::leak` in `new` and is dropped once.
        drop(unsafe { Box::from_raw(self.ptr.as_ptr()) });
    }
}

impl<T> fmt::Debug for ContextHandle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ContextHandle").field(&self.ptr).finish()
    }
}

impl<F: FnMut(i32) -> i32> ContextHandle<F> {
    /// Stateful callback dispatching to this handle's closure.
    pub fn callback(&self) -> NativeCallback<'_> {
        // SAFETY: the context is a `ContextSlot<F>`, which `trampoline::<F>`
        // expects, the returned callback borrows `self`, and `drop` clears a
        // stored copy.
        unsafe { NativeCallback::stateful(trampoline::<F>, self.as_context()) }
    }
}

impl<F: FnMut(i32, i32) -> i32> ContextHandle<F> {
    /// Trampoline for this handle's closure. Only call it with this handle's
    /// [`as_context`](Self::as_context), while the handle is alive.
    pub fn int_pair_fn(&self) -> IntPairCallbackFn {
        int_pair_trampoline::<F>
    }
}

impl<F: FnMut(&str) -> i32> ContextHandle<F> {
    /// Same calling rule as [`int_pair_fn`](Self::int_pair_fn).
    pub fn str_param_fn(&self) -> StrParamCallbackFn {
        str_param_trampoline::<F>
    }
}

/// Closure producing strings, plus the slot holding the last one so the view
/// handed back across the boundary stays valid.
pub struct StringSource<F> {
    produce: F,
    last: String,
}

impl<F: FnMut() -> String> StringSource<F> {
    pub fn new(produce: F) -> Self {
        Self {
            produce,
            last: String::new(),
        }
    }
}

impl<F: FnMut() -> String> ContextHandle<StringSource<F>> {
    /// Same calling rule as `int_pair_fn`.
    pub fn str_return_fn(&self) -> StrReturnCallbackFn {
        str_return_trampoline::<F>
    }
}

/// # Safety
/// `context` must point to a live `ContextSlot<T>`.
unsafe fn slot_value<'a, T>(context: *mut c_void) -> &'a mut T {
    &mut (*context.cast::<ContextSlot<T>>()).value
}

unsafe extern "C" fn trampoline<F: FnMut(i32) -> i32>(context: *mut c_void, value: i32) -> i32 {
    slot_value::<F>(context)(value)
}

unsafe extern "C" fn int_pair_trampoline<F: FnMut(i32, i32) -> i32>(
    context: *mut c_void,
    a: i32,
    b: i32,
) -> i32 {
    slot_value::<F>(context)(a, b)
}

unsafe extern "C" fn str_param_trampoline<F: FnMut(&str) -> i32>(
    context: *mut c_void,
    s: MbStr,
) -> i32 {
    // The native caller keeps `s` alive for the call.
    slot_value::<F>(context)(std::str::from_utf8(s.as_bytes()).unwrap_or_default())
}

unsafe extern "C" fn str_return_trampoline<F: FnMut() -> String>(context: *mut c_void) -> MbStr {
    let source = slot_value::<StringSource<F>>(context);
    source.last = (source.produce)();
    MbStr::new(&source.last)
}

// =============================================================================
// StringPairCallback
// =============================================================================

/// A `(str, str) -> str` callback whose context is handed over to the native
/// side. Dropping it calls `release` on the context, once.
///
/// It is neither `Copy` nor `Clone`, so a context cannot be released twice:
///
/// ```compile_fail
/// use marshalbench_native::StringPairCallback;
///
/// let callback = StringPairCallback::from_closure(|a, b| format!("{a}{b}"));
/// let copy = callback;
/// drop(callback);
/// drop(copy);
/// ```
#[repr(C)]
#[derive(Debug)]
pub struct StringPairCallback {
    pub(crate) func: StringPairCallbackFn,
    pub(crate) context: *mut c_void,
    pub(crate) release: Option<ReleaseFn>,
}

struct PairSlot<F> {
    combine: F,
    last: String,
}

impl StringPairCallback {
    /// Box `combine` into a context that the native side owns from here on.
    pub fn from_closure<F>(combine: F) -> Self
    where
        F: FnMut(&str, &str) -> String + 'static,
    {
        let slot = Box::new(PairSlot {
            combine,
            last: String::new(),
        });
        Self {
            func: string_pair_trampoline::<F>,
            context: Box::into_raw(slot).cast(),
            release: Some(release_pair_slot::<F>),
        }
    }
}

impl Drop for StringPairCallback {
    fn drop(&mut self) {
        if let Some(release) = self.release {
            // SAFETY: `release` belongs to `context`, and a callback is
            // dropped once.
            unsafe { release(self.context) };
        }
    }
}

unsafe extern "C" fn string_pair_trampoline<F: FnMut(&str, &str) -> String>(
    context: *mut c_void,
    a: MbStr,
    b: MbStr,
) -> MbStr {
    // Only paired with a `PairSlot<F>` context by `from_closure`; the native
    // caller keeps both views alive for the call.
    let slot = &mut *context.cast::<PairSlot<F>>();
    slot.last = (slot.combine)(
        std::str::from_utf8(a.as_bytes()).unwrap_or_default(),
        std::str::from_utf8(b.as_bytes()).unwrap_or_default(),
    );
    MbStr::new(&slot.last)
}

unsafe extern "C" fn release_pair_slot<F>(context: *mut c_void) {
    if !context.is_null() {
        // `context` came from `Box::into_raw` in `from_closure`.
        drop(Box::from_raw(context.cast::<PairSlot<F>>()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    extern "C" fn double_it(v: i32) -> i32 {
        v * 2
    }

    const STORED_DYNAMIC: &str = "mb_invoke_stored_dynamic_callback";

    struct DropFlag(Rc<Cell<u32>>);

    impl Drop for DropFlag {
        fn drop(&mut self) {
            self.0.set(self.0.get() + 1);
        }
    }

    #[test]
    fn test_stored_static_callback_not_set() {
        mb_clear_callbacks();
        let cb = NativeCallback::Stateless(double_it);
        assert_eq!(
            cb.invoke_stored(1),
            Err(BoundaryFault::CallbackNotSet {
                entry_point: "mb_invoke_stored_static_callback"
            })
        );
    }

    #[test]
    fn test_stateless_given_and_stored() {
        let cb = NativeCallback::Stateless(double_it);
        assert_eq!(cb.invoke_given(21), 42);
        cb.store();
        assert_eq!(cb.invoke_stored(5), Ok(10));
    }

    #[test]
    fn test_stateful_callback_mutates_its_context() {
        let mut calls = 0;
        {
            let handle = ContextHandle::new(|v: i32| {
                calls += 1;
                v + 1
            });
            let cb = handle.callback();
            assert_eq!(cb.invoke_given(1), 2);
            cb.store();
            assert_eq!(cb.invoke_stored(2), Ok(3));
        }
        assert_eq!(calls, 2);
    }

    #[test]
    fn test_boxed_dyn_context() {
        let boxed: Box<dyn FnMut(i32) -> i32> = Box::new(|v| v * 3);
        let handle = ContextHandle::new(boxed);
        assert_eq!(handle.callback().invoke_given(3), 9);
    }

    #[test]
    fn test_zero_sized_contexts_are_distinct() {
        let a = ContextHandle::new(|v: i32| v);
        let b = ContextHandle::new(|v: i32| v + 1);
        assert_ne!(a.as_context(), b.as_context());
    }

    #[test]
    fn test_stored_dynamic_rejects_null_out() {
        let handle = ContextHandle::new(|v: i32| v);
        handle.callback().store();
        let status =
            unsafe { mb_invoke_stored_dynamic_callback(handle.as_context(), 1, std::ptr::null_mut()) };
        assert_eq!(status, MbStatus::NullPointer);
    }

    #[test]
    fn test_stored_callback_of_other_context_type_is_not_invoked() {
        let stored = ContextHandle::new(|v: i32| v * 1000);
        stored.callback().store();

        let boxed: Box<dyn FnMut(i32) -> i32> = Box::new(|v| v + 1);
        let other = ContextHandle::new(boxed);
        assert_eq!(
            other.callback().invoke_stored(7),
            Err(BoundaryFault::CallbackMismatch {
                entry_point: STORED_DYNAMIC
            })
        );
        assert_eq!(stored.callback().invoke_stored(7), Ok(7000));
    }

    #[test]
    fn test_replaced_stored_callback_with_live_handles() {
        let first = ContextHandle::new(|v: i32| v + 1);
        let second = ContextHandle::new(|v: i32| v + 2);

        first.callback().store();
        second.callback().store();
        assert_eq!(
            first.callback().invoke_stored(1),
            Err(BoundaryFault::CallbackMismatch {
                entry_point: STORED_DYNAMIC
            })
        );
        assert_eq!(second.callback().invoke_stored(1), Ok(3));

        drop(second);
        assert_eq!(
            first.callback().invoke_stored(1),
            Err(BoundaryFault::CallbackNotSet {
                entry_point: STORED_DYNAMIC
            })
        );
    }

    #[test]
    fn test_dropped_handle_forgets_stored_callback() {
        ContextHandle::new(|v: i32| v + 1).callback().store();

        let handle = ContextHandle::new(|v: i32| v * 1000);
        assert_eq!(
            handle.callback().invoke_stored(7),
            Err(BoundaryFault::CallbackNotSet {
                entry_point: STORED_DYNAMIC
            })
        );
    }

    #[test]
    fn test_dropping_other_handle_keeps_stored_callback() {
        let stored = ContextHandle::new(|v: i32| v - 1);
        stored.callback().store();
        drop(ContextHandle::new(|v: i32| v));
        assert_eq!(stored.callback().invoke_stored(1), Ok(0));
    }

    #[test]
    fn test_raw_stored_pair_checks_context() {
        let handle = ContextHandle::new(|v: i32| v + 5);
        let NativeCallback::Stateful(bound) = handle.callback() else {
            panic!("Expected a stateful callback");
        };
        let mut out = 0;
        unsafe {
            mb_set_dynamic_callback(Some(trampoline::<fn(i32) -> i32>), std::ptr::null_mut());
            assert_eq!(
                mb_invoke_stored_dynamic_callback(bound.context(), 1, &mut out),
                MbStatus::CallbackMismatch
            );

            mb_set_dynamic_callback(Some(bound.func), bound.context());
            assert!(mb_invoke_stored_dynamic_callback(bound.context(), 1, &mut out).is_success());
            assert_eq!(out, 6);

            mb_set_dynamic_callback(None, std::ptr::null_mut());
            assert_eq!(
                mb_invoke_stored_dynamic_callback(bound.context(), 1, &mut out),
                MbStatus::CallbackNotSet
            );
        }
    }

    #[test]
    fn test_str_trampolines() {
        let params = ContextHandle::new(|s: &str| s.len() as i32);
        let f = params.str_param_fn();
        assert_eq!(unsafe { f(params.as_context(), MbStr::new("abcd")) }, 4);

        let source = ContextHandle::new(StringSource::new(|| "abcdef".to_string()));
        let f = source.str_return_fn();
        let view = unsafe { f(source.as_context()) };
        assert_eq!(unsafe { view.as_bytes() }, b"abcdef");
    }

    #[test]
    fn test_string_pair_callback_roundtrip() {
        let cb = StringPairCallback::from_closure(|a, b| format!("{a}{b}"));
        let view = unsafe { (cb.func)(cb.context, MbStr::new("ab"), MbStr::new("cd")) };
        assert_eq!(unsafe { view.as_bytes() }, b"abcd");
    }

    #[test]
    fn test_string_pair_callback_released_once() {
        let released = Rc::new(Cell::new(0));
        let flag = DropFlag(released.clone());
        let cb = StringPairCallback::from_closure(move |a, b| {
            let _ = &flag;
            format!("{a}{b}")
        });

        let moved = cb;
        assert_eq!(released.get(), 0);
        drop(moved);
        assert_eq!(released.get(), 1);
    }

    #[test]
    fn test_string_pair_callback_without_release() {
        let released = Rc::new(Cell::new(0));
        let flag = DropFlag(released.clone());
        let mut cb = StringPairCallback::from_closure(move |a, _| {
            let _ = &flag;
            a.to_string()
        });
        let context = cb.context;
        let release = cb.release.take().expect("from_closure sets a release function");
        drop(cb);
        assert_eq!(released.get(), 0);

        unsafe { release(context) };
        assert_eq!(released.get(), 1);
    }
}
