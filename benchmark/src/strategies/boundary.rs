// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Raw boundary strategies: value types and `int -> int` callbacks.

use marshalbench_core::{test_methods, BoundaryFault, TestHolder, TestRegistry};
use marshalbench_native::callback::{mb_clear_callbacks, ContextHandle, NativeCallback};
use marshalbench_native::values::{
    mb_double_return_direct, mb_double_return_ptr, mb_int_return_direct, mb_int_return_ptr,
    mb_vector2_param_direct, mb_vector2_param_ptr, mb_vector4_param_direct, mb_vector4_param_ptr,
    mb_vector4_return_direct, mb_vector4_return_ptr,
};
use marshalbench_native::{Float2, Float4};

use super::sink::Sink;

type DynCallback = Box<dyn FnMut(i32) -> i32>;

extern "C" fn identity(value: i32) -> i32 {
    value
}

/// Value-type and callback strategies, one boundary crossing per iteration.
pub struct BoundaryTests {
    rounds: u64,
    sink: Sink,
}

impl BoundaryTests {
    pub fn new(rounds: u64) -> Self {
        Self {
            rounds,
            sink: Sink::new(),
        }
    }

    pub fn sink(&self) -> &Sink {
        &self.sink
    }

    pub fn test_param_vector4_direct(&mut self) -> Result<u64, BoundaryFault> {
        for _ in 0..self.rounds {
            mb_vector4_param_direct(Float4::new(1.0, 2.0, 3.0, 4.0));
        }
        Ok(self.rounds)
    }

    pub fn test_param_vector4_ptr(&mut self) -> Result<u64, BoundaryFault> {
        for _ in 0..self.rounds {
            let v = Float4::new(1.0, 2.0, 3.0, 4.0);
            // SAFETY: `v` is a live local.
            unsafe { mb_vector4_param_ptr(&v) };
        }
        Ok(self.rounds)
    }

    pub fn test_param_vector2_direct(&mut self) -> Result<u64, BoundaryFault> {
        for _ in 0..self.rounds {
            mb_vector2_param_direct(Float2::new(1.0, 2.0));
        }
        Ok(self.rounds)
    }

    pub fn test_param_vector2_ptr(&mut self) -> Result<u64, BoundaryFault> {
        for _ in 0..self.rounds {
            let v = Float2::new(1.0, 2.0);
            // SAFETY: `v` is a live local.
            unsafe { mb_vector2_param_ptr(&v) };
        }
        Ok(self.rounds)
    }

    pub fn test_return_vector4_direct(&mut self) -> Result<u64, BoundaryFault> {
        for _ in 0..self.rounds {
            let v = mb_vector4_return_direct();
            self.sink.add(f64::from(v.sum()));
        }
        Ok(self.rounds)
    }

    pub fn test_return_vector4_ptr(&mut self) -> Result<u64, BoundaryFault> {
        for _ in 0..self.rounds {
            let mut v = Float4::default();
            // SAFETY: `v` is a live local.
            unsafe { mb_vector4_return_ptr(&mut v) };
            self.sink.add(f64::from(v.sum()));
        }
        Ok(self.rounds)
    }

    pub fn test_return_int_direct(&mut self) -> Result<u64, BoundaryFault> {
        for _ in 0..self.rounds {
            self.sink.add(f64::from(mb_int_return_direct()));
        }
        Ok(self.rounds)
    }

    pub fn test_return_int_ptr(&mut self) -> Result<u64, BoundaryFault> {
        for _ in 0..self.rounds {
            let mut v = 0;
            // SAFETY: `v` is a live local.
            unsafe { mb_int_return_ptr(&mut v) };
            self.sink.add(f64::from(v));
        }
        Ok(self.rounds)
    }

    pub fn test_return_double_direct(&mut self) -> Result<u64, BoundaryFault> {
        for _ in 0..self.rounds {
            self.sink.add(mb_double_return_direct());
        }
        Ok(self.rounds)
    }

    pub fn test_return_double_ptr(&mut self) -> Result<u64, BoundaryFault> {
        for _ in 0..self.rounds {
            let mut v = 0.0;
            // SAFETY: `v` is a live local.
            unsafe { mb_double_return_ptr(&mut v) };
            self.sink.add(v);
        }
        Ok(self.rounds)
    }

    pub fn test_callback_given_static(&mut self) -> Result<u64, BoundaryFault> {
        let callback = NativeCallback::Stateless(identity);
        for _ in 0..self.rounds {
            self.sink.add(f64::from(callback.invoke_given(1)));
        }
        Ok(self.rounds)
    }

    pub fn test_callback_stored_static(&mut self) -> Result<u64, BoundaryFault> {
        let callback = NativeCallback::Stateless(identity);
        callback.store();
        for _ in 0..self.rounds {
            self.sink.add(f64::from(callback.invoke_stored(1)?));
        }
        Ok(self.rounds)
    }

    /// A fresh boxed closure and context per iteration.
    pub fn test_callback_given_dynamic(&mut self) -> Result<u64, BoundaryFault> {
        for _ in 0..self.rounds {
            let closure: DynCallback = Box::new(|k| k + 10);
            let handle = ContextHandle::new(closure);
            self.sink.add(f64::from(handle.callback().invoke_given(1)));
        }
        Ok(self.rounds)
    }

    pub fn test_callback_stored_dynamic(&mut self) -> Result<u64, BoundaryFault> {
        let closure: DynCallback = Box::new(|k| k);
        let handle = ContextHandle::new(closure);
        let callback = handle.callback();
        callback.store();
        for _ in 0..self.rounds {
            self.sink.add(f64::from(callback.invoke_stored(1)?));
        }
        Ok(self.rounds)
    }

    /// Stored stateful callback whose trampoline calls the closure type
    /// directly instead of through a `dyn` vtable.
    pub fn test_callback_stored_dynamic_direct(&mut self) -> Result<u64, BoundaryFault> {
        let handle = ContextHandle::new(|k: i32| k);
        let callback = handle.callback();
        callback.store();
        for _ in 0..self.rounds {
            self.sink.add(f64::from(callback.invoke_stored(1)?));
        }
        Ok(self.rounds)
    }
}

impl Drop for BoundaryTests {
    fn drop(&mut self) {
        mb_clear_callbacks();
    }
}

impl TestHolder for BoundaryTests {
    fn registry() -> TestRegistry<Self> {
        test_methods!(Self =>
            test_param_vector4_direct,
            test_param_vector4_ptr,
            test_param_vector2_direct,
            test_param_vector2_ptr,
            test_return_vector4_direct,
            test_return_vector4_ptr,
            test_return_int_direct,
            test_return_int_ptr,
            test_return_double_direct,
            test_return_double_ptr,
            test_callback_given_static,
            test_callback_stored_static,
            test_callback_given_dynamic,
            test_callback_stored_dynamic,
            test_callback_stored_dynamic_direct,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_strategy_reports_its_rounds() {
        let mut tests = BoundaryTests::new(3);
        for name in BoundaryTests::registry().names() {
            assert!(name.starts_with("test_"), "{name}");
        }
        assert_eq!(BoundaryTests::registry().len(), 15);

        assert_eq!(tests.test_param_vector4_ptr(), Ok(3));
        assert_eq!(tests.test_return_vector4_direct(), Ok(3));
        assert_eq!(tests.test_callback_stored_static(), Ok(3));
        assert_eq!(tests.test_callback_given_dynamic(), Ok(3));
        assert_eq!(tests.test_callback_stored_dynamic_direct(), Ok(3));
    }

    #[test]
    fn test_results_reach_the_sink() {
        let mut tests = BoundaryTests::new(2);
        tests.test_return_vector4_ptr().unwrap();
        assert_eq!(tests.sink().total(), 20.0);

        tests.test_callback_given_dynamic().unwrap();
        assert_eq!(tests.sink().total(), 42.0);
    }
}
