// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Object-style bindings: the numbers shown on the console.

use std::ptr::NonNull;

use marshalbench_core::{test_methods, BoundaryFault, TestHolder, TestRegistry};
use marshalbench_native::objects::{
    mb_callback_test_create, mb_callback_test_invoke_int_callback_repeatedly,
    mb_callback_test_invoke_string_param_callback_repeatedly,
    mb_callback_test_invoke_string_return_callback_repeatedly, mb_callback_test_release,
    mb_callback_test_set_callback, mb_test_object_add_float_vectors,
    mb_test_object_add_float_vectors_by_ref, mb_test_object_add_float_vectors_guarded,
    mb_test_object_concatenate_strings, mb_test_object_create, mb_test_object_get_name,
    mb_test_object_release, mb_test_object_set_name,
};
use marshalbench_native::{
    mb_empty_function, mb_free_buffer, CallbackTest, ContextHandle, Float4, MbStr,
    StringPairCallback, StringSource, TestObject,
};

use super::sink::Sink;

const OBJECT_NAME: &str = "test";

/// Take ownership of a callee-allocated UTF-8 buffer.
///
/// # Safety
/// `ptr` must be a live `malloc` allocation from the native side holding `len`
/// bytes.
unsafe fn take_native_string(
    ptr: *mut u8,
    len: usize,
    entry_point: &'static str,
) -> Result<String, BoundaryFault> {
    let copied = std::str::from_utf8(std::slice::from_raw_parts(ptr, len)).map(str::to_owned);
    mb_free_buffer(ptr.cast());
    copied.map_err(|_| BoundaryFault::InvalidEncoding { entry_point })
}

/// Strategies driving a native `TestObject` and `CallbackTest`.
///
/// Both handles are created once and released when the holder is dropped.
pub struct ObjectBindingTests {
    rounds: u64,
    sink: Sink,
    object: NonNull<TestObject>,
    callback_test: NonNull<CallbackTest>,
}

impl ObjectBindingTests {
    pub fn new(rounds: u64) -> Result<Self, BoundaryFault> {
        // SAFETY: the name is a live `&str`.
        let object = unsafe { mb_test_object_create(OBJECT_NAME.as_ptr(), OBJECT_NAME.len()) };
        let object = NonNull::new(object).ok_or(BoundaryFault::NullPointer {
            entry_point: "mb_test_object_create",
        })?;

        let Some(callback_test) = NonNull::new(mb_callback_test_create()) else {
            // SAFETY: `object` was created above and is released once.
            unsafe { mb_test_object_release(object.as_ptr()) };
            return Err(BoundaryFault::NullPointer {
                entry_point: "mb_callback_test_create",
            });
        };

        Ok(Self {
            rounds,
            sink: Sink::new(),
            object,
            callback_test,
        })
    }

    pub fn sink(&self) -> &Sink {
        &self.sink
    }

    fn native_rounds(&self) -> i64 {
        i64::try_from(self.rounds).unwrap_or(i64::MAX)
    }

    pub fn test_empty_function(&mut self) -> Result<u64, BoundaryFault> {
        for _ in 0..self.rounds {
            mb_empty_function();
        }
        Ok(self.rounds)
    }

    pub fn test_add_float_vectors(&mut self) -> Result<u64, BoundaryFault> {
        let mut sum = Float4::default();
        for _ in 0..self.rounds {
            sum = mb_test_object_add_float_vectors(
                self.object.as_ptr(),
                sum,
                Float4::new(1.0, 2.0, 3.0, 4.0),
            );
        }
        self.sink.add(f64::from(sum.sum()));
        Ok(self.rounds)
    }

    /// Same addition through the entry point that catches panics natively.
    pub fn test_add_float_vectors_guarded(&mut self) -> Result<u64, BoundaryFault> {
        let mut sum = Float4::default();
        for _ in 0..self.rounds {
            sum = mb_test_object_add_float_vectors_guarded(
                self.object.as_ptr(),
                sum,
                Float4::new(1.0, 2.0, 3.0, 4.0),
            );
        }
        self.sink.add(f64::from(sum.sum()));
        Ok(self.rounds)
    }

    pub fn test_add_float_vectors_by_ref(&mut self) -> Result<u64, BoundaryFault> {
        let mut sum = Float4::default();
        let step = Float4::new(1.0, 2.0, 3.0, 4.0);
        for _ in 0..self.rounds {
            let previous = sum;
            // SAFETY: all three pointers are live locals.
            unsafe {
                mb_test_object_add_float_vectors_by_ref(
                    self.object.as_ptr(),
                    &previous,
                    &step,
                    &mut sum,
                )
            }
            .into_result("mb_test_object_add_float_vectors_by_ref")?;
        }
        self.sink.add(f64::from(sum.sum()));
        Ok(self.rounds)
    }

    pub fn test_set_name(&mut self) -> Result<u64, BoundaryFault> {
        let name = "abc";
        for _ in 0..self.rounds {
            // SAFETY: `object` is live; `name` is a live `&str`.
            unsafe { mb_test_object_set_name(self.object.as_ptr(), name.as_ptr(), name.len()) }
                .into_result("mb_test_object_set_name")?;
        }
        Ok(self.rounds)
    }

    pub fn test_get_name(&mut self) -> Result<u64, BoundaryFault> {
        for _ in 0..self.rounds {
            let (mut ptr, mut len) = (std::ptr::null_mut(), 0);
            // SAFETY: `object` is live; the out-pointers are live locals.
            let name = unsafe {
                mb_test_object_get_name(self.object.as_ptr(), &mut ptr, &mut len)
                    .into_result("mb_test_object_get_name")?;
                take_native_string(ptr, len, "mb_test_object_get_name")?
            };
            self.sink.add_len(name.len());
        }
        Ok(self.rounds)
    }

    pub fn test_concatenate_strings(&mut self) -> Result<u64, BoundaryFault> {
        for _ in 0..self.rounds {
            let (mut ptr, mut len) = (std::ptr::null_mut(), 0);
            // SAFETY: `object` is live; both views borrow string literals.
            let joined = unsafe {
                mb_test_object_concatenate_strings(
                    self.object.as_ptr(),
                    MbStr::new("abc"),
                    MbStr::new("def"),
                    &mut ptr,
                    &mut len,
                )
                .into_result("mb_test_object_concatenate_strings")?;
                take_native_string(ptr, len, "mb_test_object_concatenate_strings")?
            };
            self.sink.add_len(joined.len());
        }
        Ok(self.rounds)
    }

    /// Hands a new boxed closure to the native side each iteration; the
    /// native side releases the previous one.
    pub fn test_replace_callback(&mut self) -> Result<u64, BoundaryFault> {
        for _ in 0..self.rounds {
            let callback = StringPairCallback::from_closure(|a, b| format!("{a}{b}"));
            // SAFETY: `callback_test` is live; ownership of the context moves.
            unsafe { mb_callback_test_set_callback(self.callback_test.as_ptr(), callback) }
                .into_result("mb_callback_test_set_callback")?;
        }
        Ok(self.rounds)
    }

    pub fn test_invoke_int_callback(&mut self) -> Result<u64, BoundaryFault> {
        let handle = ContextHandle::new(|a: i32, b: i32| a + b);
        let mut out = 0;
        // SAFETY: `callback_test` is live; `handle` outlives the call.
        unsafe {
            mb_callback_test_invoke_int_callback_repeatedly(
                self.callback_test.as_ptr(),
                self.native_rounds(),
                handle.int_pair_fn(),
                handle.as_context(),
                &mut out,
            )
        }
        .into_result("mb_callback_test_invoke_int_callback_repeatedly")?;
        self.sink.add(out as f64);
        Ok(self.rounds)
    }

    pub fn test_invoke_string_param_callback(&mut self) -> Result<u64, BoundaryFault> {
        let handle = ContextHandle::new(|s: &str| s.len() as i32);
        let mut out = 0;
        // SAFETY: `callback_test` is live; `handle` outlives the call.
        unsafe {
            mb_callback_test_invoke_string_param_callback_repeatedly(
                self.callback_test.as_ptr(),
                self.native_rounds(),
                handle.str_param_fn(),
                handle.as_context(),
                &mut out,
            )
        }
        .into_result("mb_callback_test_invoke_string_param_callback_repeatedly")?;
        self.sink.add(out as f64);
        Ok(self.rounds)
    }

    pub fn test_invoke_string_return_value_callback(&mut self) -> Result<u64, BoundaryFault> {
        let handle = ContextHandle::new(StringSource::new(|| String::from("abcdef")));
        let mut out = 0;
        // SAFETY: `callback_test` is live; `handle` outlives the call.
        unsafe {
            mb_callback_test_invoke_string_return_callback_repeatedly(
                self.callback_test.as_ptr(),
                self.native_rounds(),
                handle.str_return_fn(),
                handle.as_context(),
                &mut out,
            )
        }
        .into_result("mb_callback_test_invoke_string_return_callback_repeatedly")?;
        self.sink.add(out as f64);
        Ok(self.rounds)
    }
}

impl Drop for ObjectBindingTests {
    fn drop(&mut self) {
        // SAFETY: both handles were created in `new` and are released once.
        unsafe {
            mb_callback_test_release(self.callback_test.as_ptr());
            mb_test_object_release(self.object.as_ptr());
        }
    }
}

impl TestHolder for ObjectBindingTests {
    fn registry() -> TestRegistry<Self> {
        test_methods!(Self =>
            test_empty_function,
            test_add_float_vectors,
            test_add_float_vectors_guarded,
            test_add_float_vectors_by_ref,
            test_set_name,
            test_get_name,
            test_concatenate_strings,
            test_replace_callback,
            test_invoke_int_callback,
            test_invoke_string_param_callback,
            test_invoke_string_return_value_callback,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_order() {
        let names: Vec<_> = ObjectBindingTests::registry().names().collect();
        assert_eq!(names.first(), Some(&"test_empty_function"));
        assert_eq!(names.last(), Some(&"test_invoke_string_return_value_callback"));
        assert_eq!(names.len(), 11);
    }

    #[test]
    fn test_name_strategies() {
        let mut tests = ObjectBindingTests::new(4).unwrap();
        assert_eq!(tests.test_get_name(), Ok(4));
        assert_eq!(tests.sink().total(), 16.0);

        tests.test_set_name().unwrap();
        tests.test_get_name().unwrap();
        assert_eq!(tests.sink().total(), 28.0);
    }

    #[test]
    fn test_vector_strategies_agree() {
        let mut by_value = ObjectBindingTests::new(5).unwrap();
        let mut by_ref = ObjectBindingTests::new(5).unwrap();
        let mut guarded = ObjectBindingTests::new(5).unwrap();
        by_value.test_add_float_vectors().unwrap();
        by_ref.test_add_float_vectors_by_ref().unwrap();
        guarded.test_add_float_vectors_guarded().unwrap();
        assert_eq!(by_value.sink().total(), 50.0);
        assert_eq!(by_ref.sink().total(), 50.0);
        assert_eq!(guarded.sink().total(), 50.0);
    }

    #[test]
    fn test_callback_strategies() {
        let mut tests = ObjectBindingTests::new(10).unwrap();
        assert_eq!(tests.test_replace_callback(), Ok(10));

        tests.test_invoke_int_callback().unwrap();
        assert_eq!(tests.sink().total(), 30.0);
        tests.test_invoke_string_param_callback().unwrap();
        assert_eq!(tests.sink().total(), 60.0);
        tests.test_invoke_string_return_value_callback().unwrap();
        assert_eq!(tests.sink().total(), 120.0);
    }

    #[test]
    fn test_concatenate_strategy() {
        let mut tests = ObjectBindingTests::new(2).unwrap();
        tests.test_concatenate_strings().unwrap();
        assert_eq!(tests.sink().total(), 12.0);
    }
}
