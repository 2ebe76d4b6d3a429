// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! String parameter and return strategies for one test string.
//!
//! The caller-side string is kept both as UTF-8 and as NUL-terminated UTF-16,
//! the latter standing in for a foreign runtime's native string. Strategies
//! differ in which form crosses the boundary, who converts it, and who owns
//! the memory it lands in.

use std::ffi::{c_char, CStr, CString};

use marshalbench_core::{test_methods, BoundaryFault, TestHolder, TestRegistry};
use marshalbench_native::strings::{
    mb_set_test_string, mb_string_param_byte_ptr, mb_string_param_byte_ptr_create_owned,
    mb_string_param_byte_ptr_len, mb_string_param_byte_ptr_len_create_owned,
    mb_string_param_utf16_ptr, mb_string_param_utf16_ptr_len_create_owned_narrow,
    mb_string_param_utf16_ptr_len_create_owned_utf16, mb_string_return_alloc_narrow,
    mb_string_return_alloc_utf16, mb_string_return_allocate_buffer_utf16,
    mb_string_return_byte_ptr, mb_string_return_reuse_buffer_utf16, mb_string_return_utf16_ptr,
};
use marshalbench_native::{mb_dummy_result, mb_free_buffer};

use super::buffer_pool::BufferPool;
use super::sink::Sink;

/// Largest conversion done in a stack buffer; longer strings go to the heap.
const STACK_BUFFER_LEN: usize = 4096;

fn invalid(entry_point: &'static str) -> BoundaryFault {
    BoundaryFault::InvalidEncoding { entry_point }
}

/// Length of a NUL-terminated UTF-16 string.
///
/// # Safety
/// `ptr` must point to a NUL-terminated UTF-16 string.
unsafe fn utf16_len(ptr: *const u16) -> usize {
    let mut len = 0;
    while *ptr.add(len) != 0 {
        len += 1;
    }
    len
}

/// Lossy UTF-16 to ASCII: every non-ASCII unit becomes `?`.
fn ascii_byte(unit: u16) -> u8 {
    u8::try_from(unit).ok().filter(u8::is_ascii).unwrap_or(b'?')
}

/// Transcode `units` into `out` as UTF-8 and NUL-terminate it.
/// Returns `None` when `out` is too small or `units` is not valid UTF-16.
fn encode_utf8_nul(units: &[u16], out: &mut [u8]) -> Option<usize> {
    let mut written = 0;
    for c in char::decode_utf16(units.iter().copied()) {
        let c = c.ok()?;
        let len = c.len_utf8();
        if written + len >= out.len() {
            return None;
        }
        c.encode_utf8(&mut out[written..written + len]);
        written += len;
    }
    *out.get_mut(written)? = 0;
    Some(written)
}

/// String strategies over one test string.
pub struct StringTests {
    text: String,
    /// `text` as UTF-16 with a trailing NUL.
    utf16_nul: Vec<u16>,
    rounds: u64,
    sink: Sink,
    pool: BufferPool,
}

impl StringTests {
    pub fn new(text: impl Into<String>, rounds: u64, buffer_capacity: usize) -> Self {
        let text = text.into();
        let utf16_nul = text.encode_utf16().chain(std::iter::once(0)).collect();
        Self {
            text,
            utf16_nul,
            rounds,
            sink: Sink::new(),
            pool: BufferPool::new(buffer_capacity),
        }
    }

    /// Length of the test string in UTF-16 units.
    pub fn len(&self) -> usize {
        self.utf16_nul.len() - 1
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn sink(&self) -> &Sink {
        &self.sink
    }

    fn utf16(&self) -> &[u16] {
        &self.utf16_nul[..self.len()]
    }

    /// Store this holder's string as the one returned by the native side.
    fn install_test_string(&self) -> Result<(), BoundaryFault> {
        // SAFETY: `text` is a live `&str`.
        unsafe { mb_set_test_string(self.text.as_ptr(), self.text.len()) }
            .into_result("mb_set_test_string")
    }

    /// Fresh NUL-terminated UTF-8 copy per call.
    fn fresh_c_string(&self) -> Result<CString, BoundaryFault> {
        CString::new(self.text.as_str()).map_err(|_| invalid("mb_string_param_byte_ptr"))
    }

    // =========================================================================
    // Parameters
    // =========================================================================

    /// Fresh NUL-terminated UTF-16 copy per call.
    pub fn test_param_string_utf16_copy(&mut self) -> Result<u64, BoundaryFault> {
        for _ in 0..self.rounds {
            let copy: Vec<u16> = self.text.encode_utf16().chain(std::iter::once(0)).collect();
            // SAFETY: `copy` is NUL-terminated and outlives the call.
            unsafe { mb_string_param_utf16_ptr(copy.as_ptr()) };
        }
        Ok(self.rounds)
    }

    pub fn test_param_string_narrow_copy(&mut self) -> Result<u64, BoundaryFault> {
        for _ in 0..self.rounds {
            let copy = self.fresh_c_string()?;
            // SAFETY: `copy` is NUL-terminated and outlives the call.
            unsafe { mb_string_param_byte_ptr(copy.as_ptr()) };
        }
        Ok(self.rounds)
    }

    pub fn test_param_string_narrow_copy_create_owned(&mut self) -> Result<u64, BoundaryFault> {
        for _ in 0..self.rounds {
            let copy = self.fresh_c_string()?;
            // SAFETY: `copy` is NUL-terminated and outlives the call.
            unsafe { mb_string_param_byte_ptr_create_owned(copy.as_ptr()) }
                .into_result("mb_string_param_byte_ptr_create_owned")?;
        }
        self.sink.add_len(mb_dummy_result());
        Ok(self.rounds)
    }

    /// Borrow the UTF-8 bytes in place, pointer plus length.
    pub fn test_param_string_utf8_borrowed(&mut self) -> Result<u64, BoundaryFault> {
        for _ in 0..self.rounds {
            // SAFETY: `text` outlives the call.
            unsafe { mb_string_param_byte_ptr_len(self.text.as_ptr(), self.text.len()) };
        }
        Ok(self.rounds)
    }

    pub fn test_param_string_utf8_borrowed_create_owned(&mut self) -> Result<u64, BoundaryFault> {
        for _ in 0..self.rounds {
            // SAFETY: `text` outlives the call.
            unsafe { mb_string_param_byte_ptr_len_create_owned(self.text.as_ptr(), self.text.len()) }
                .into_result("mb_string_param_byte_ptr_len_create_owned")?;
        }
        self.sink.add_len(mb_dummy_result());
        Ok(self.rounds)
    }

    /// Borrow the UTF-16 buffer in place.
    pub fn test_param_string_utf16_borrowed(&mut self) -> Result<u64, BoundaryFault> {
        for _ in 0..self.rounds {
            // SAFETY: `utf16_nul` is NUL-terminated and outlives the call.
            unsafe { mb_string_param_utf16_ptr(self.utf16_nul.as_ptr()) };
        }
        Ok(self.rounds)
    }

    pub fn test_param_string_utf16_borrowed_create_owned_utf16(
        &mut self,
    ) -> Result<u64, BoundaryFault> {
        for _ in 0..self.rounds {
            let units = self.utf16();
            // SAFETY: `units` outlives the call.
            unsafe { mb_string_param_utf16_ptr_len_create_owned_utf16(units.as_ptr(), units.len()) }
                .into_result("mb_string_param_utf16_ptr_len_create_owned_utf16")?;
        }
        self.sink.add_len(mb_dummy_result());
        Ok(self.rounds)
    }

    pub fn test_param_string_utf16_borrowed_create_owned_narrow(
        &mut self,
    ) -> Result<u64, BoundaryFault> {
        for _ in 0..self.rounds {
            let units = self.utf16();
            // SAFETY: `units` outlives the call.
            unsafe { mb_string_param_utf16_ptr_len_create_owned_narrow(units.as_ptr(), units.len()) }
                .into_result("mb_string_param_utf16_ptr_len_create_owned_narrow")?;
        }
        self.sink.add_len(mb_dummy_result());
        Ok(self.rounds)
    }

    /// Caller converts UTF-16 to ASCII into a fresh allocation.
    pub fn test_param_string_to_ascii_fresh(&mut self) -> Result<u64, BoundaryFault> {
        for _ in 0..self.rounds {
            let ascii: Vec<u8> = self
                .utf16()
                .iter()
                .map(|&unit| ascii_byte(unit))
                .chain(std::iter::once(0))
                .collect();
            // SAFETY: `ascii` is NUL-terminated and outlives the call.
            unsafe { mb_string_param_byte_ptr(ascii.as_ptr().cast::<c_char>()) };
        }
        Ok(self.rounds)
    }

    /// Caller converts UTF-16 to ASCII into a pooled buffer.
    pub fn test_param_string_to_ascii_pooled(&mut self) -> Result<u64, BoundaryFault> {
        let len = self.len();
        for _ in 0..self.rounds {
            let buffer = self.pool.bytes(len + 1);
            for (dst, &unit) in buffer.iter_mut().zip(&self.utf16_nul[..len]) {
                *dst = ascii_byte(unit);
            }
            buffer[len] = 0;
            // SAFETY: `buffer` is NUL-terminated and outlives the call.
            unsafe { mb_string_param_byte_ptr(buffer.as_ptr().cast::<c_char>()) };
        }
        Ok(self.rounds)
    }

    /// Caller transcodes UTF-16 to UTF-8 into a fresh allocation.
    pub fn test_param_string_to_utf8_fresh(&mut self) -> Result<u64, BoundaryFault> {
        for _ in 0..self.rounds {
            let utf8 = String::from_utf16(self.utf16())
                .map_err(|_| invalid("mb_string_param_byte_ptr"))?;
            let mut bytes = utf8.into_bytes();
            bytes.push(0);
            // SAFETY: `bytes` is NUL-terminated and outlives the call.
            unsafe { mb_string_param_byte_ptr(bytes.as_ptr().cast::<c_char>()) };
        }
        Ok(self.rounds)
    }

    /// Caller transcodes UTF-16 to UTF-8 into a pooled buffer.
    pub fn test_param_string_to_utf8_pooled(&mut self) -> Result<u64, BoundaryFault> {
        // Worst case is three UTF-8 bytes per UTF-16 unit.
        let max_len = self.len() * 3 + 1;
        for _ in 0..self.rounds {
            let buffer = self.pool.bytes(max_len);
            encode_utf8_nul(&self.utf16_nul[..self.utf16_nul.len() - 1], buffer)
                .ok_or_else(|| invalid("mb_string_param_byte_ptr"))?;
            // SAFETY: `buffer` is NUL-terminated and outlives the call.
            unsafe { mb_string_param_byte_ptr(buffer.as_ptr().cast::<c_char>()) };
        }
        Ok(self.rounds)
    }

    /// Caller transcodes UTF-16 to UTF-8 on the stack.
    pub fn test_param_string_to_utf8_stack(&mut self) -> Result<u64, BoundaryFault> {
        for _ in 0..self.rounds {
            self.param_utf8_stack()?;
        }
        Ok(self.rounds)
    }

    // Kept out of line so the stack buffer is released every iteration.
    #[inline(never)]
    fn param_utf8_stack(&self) -> Result<(), BoundaryFault> {
        let mut stack = [0u8; STACK_BUFFER_LEN];
        let mut heap;
        let buffer: &mut [u8] = if self.len() * 3 < STACK_BUFFER_LEN {
            &mut stack
        } else {
            heap = vec![0u8; self.len() * 3 + 1];
            &mut heap
        };
        encode_utf8_nul(self.utf16(), buffer).ok_or_else(|| invalid("mb_string_param_byte_ptr"))?;
        // SAFETY: `buffer` is NUL-terminated and outlives the call.
        unsafe { mb_string_param_byte_ptr(buffer.as_ptr().cast::<c_char>()) };
        Ok(())
    }

    // =========================================================================
    // Returns
    // =========================================================================

    /// Callee allocates a narrow string; caller copies it out and frees it.
    pub fn test_return_string_narrow_alloc(&mut self) -> Result<u64, BoundaryFault> {
        const ENTRY: &str = "mb_string_return_alloc_narrow";
        self.install_test_string()?;
        for _ in 0..self.rounds {
            let ptr = mb_string_return_alloc_narrow();
            if ptr.is_null() {
                return Err(BoundaryFault::AllocationFailed { entry_point: ENTRY });
            }
            // SAFETY: `ptr` is a NUL-terminated allocation we now own.
            let copied = unsafe { CStr::from_ptr(ptr) }.to_str().map(str::to_owned);
            // SAFETY: freed exactly once.
            unsafe { mb_free_buffer(ptr.cast()) };
            self.sink.add_len(copied.map_err(|_| invalid(ENTRY))?.len());
        }
        Ok(self.rounds)
    }

    /// Callee allocates a NUL-terminated UTF-16 string.
    pub fn test_return_string_utf16_alloc(&mut self) -> Result<u64, BoundaryFault> {
        const ENTRY: &str = "mb_string_return_alloc_utf16";
        self.install_test_string()?;
        for _ in 0..self.rounds {
            let ptr = mb_string_return_alloc_utf16();
            if ptr.is_null() {
                return Err(BoundaryFault::AllocationFailed { entry_point: ENTRY });
            }
            // SAFETY: `ptr` is a NUL-terminated allocation we now own.
            let copied = unsafe { String::from_utf16(std::slice::from_raw_parts(ptr, utf16_len(ptr))) };
            // SAFETY: freed exactly once.
            unsafe { mb_free_buffer(ptr.cast()) };
            self.sink.add_len(copied.map_err(|_| invalid(ENTRY))?.len());
        }
        Ok(self.rounds)
    }

    /// Borrow the callee's bytes and copy them into a caller string.
    pub fn test_return_string_byte_ptr(&mut self) -> Result<u64, BoundaryFault> {
        const ENTRY: &str = "mb_string_return_byte_ptr";
        self.install_test_string()?;
        for _ in 0..self.rounds {
            let (mut ptr, mut len) = (std::ptr::null(), 0);
            // SAFETY: out-pointers are live locals; the borrowed bytes stay
            // valid until the test string is replaced.
            let copied = unsafe {
                mb_string_return_byte_ptr(&mut ptr, &mut len).into_result(ENTRY)?;
                std::str::from_utf8(std::slice::from_raw_parts(ptr, len)).map(str::to_owned)
            };
            self.sink.add_len(copied.map_err(|_| invalid(ENTRY))?.len());
        }
        Ok(self.rounds)
    }

    /// Borrow the callee's UTF-16 units and transcode them.
    pub fn test_return_string_utf16_ptr(&mut self) -> Result<u64, BoundaryFault> {
        const ENTRY: &str = "mb_string_return_utf16_ptr";
        self.install_test_string()?;
        for _ in 0..self.rounds {
            let (mut ptr, mut len) = (std::ptr::null(), 0);
            // SAFETY: as above.
            let copied = unsafe {
                mb_string_return_utf16_ptr(&mut ptr, &mut len).into_result(ENTRY)?;
                String::from_utf16(std::slice::from_raw_parts(ptr, len))
            };
            self.sink.add_len(copied.map_err(|_| invalid(ENTRY))?.len());
        }
        Ok(self.rounds)
    }

    /// Callee fills a pooled buffer, or allocates when it does not fit.
    pub fn test_return_string_reuse_buffer_utf16(&mut self) -> Result<u64, BoundaryFault> {
        const ENTRY: &str = "mb_string_return_reuse_buffer_utf16";
        self.install_test_string()?;
        for _ in 0..self.rounds {
            let buffer = self.pool.units();
            let (mut ptr, mut len) = (std::ptr::null_mut(), 0);
            // SAFETY: `buffer` is writable for its length; out-pointers are
            // live locals. A pointer other than `buffer` is ours to free.
            let copied = unsafe {
                mb_string_return_reuse_buffer_utf16(
                    buffer.as_mut_ptr(),
                    buffer.len(),
                    &mut ptr,
                    &mut len,
                )
                .into_result(ENTRY)?;
                let copied = String::from_utf16(std::slice::from_raw_parts(ptr, len));
                if ptr != buffer.as_mut_ptr() {
                    mb_free_buffer(ptr.cast());
                }
                copied
            };
            self.sink.add_len(copied.map_err(|_| invalid(ENTRY))?.len());
        }
        Ok(self.rounds)
    }

    /// Callee allocates a fresh UTF-16 buffer every call.
    pub fn test_return_string_allocate_buffer_utf16(&mut self) -> Result<u64, BoundaryFault> {
        const ENTRY: &str = "mb_string_return_allocate_buffer_utf16";
        self.install_test_string()?;
        for _ in 0..self.rounds {
            let (mut ptr, mut len) = (std::ptr::null_mut(), 0);
            // SAFETY: out-pointers are live locals; the allocation is ours.
            let copied = unsafe {
                mb_string_return_allocate_buffer_utf16(&mut ptr, &mut len).into_result(ENTRY)?;
                let copied = String::from_utf16(std::slice::from_raw_parts(ptr, len));
                mb_free_buffer(ptr.cast());
                copied
            };
            self.sink.add_len(copied.map_err(|_| invalid(ENTRY))?.len());
        }
        Ok(self.rounds)
    }
}

impl TestHolder for StringTests {
    fn registry() -> TestRegistry<Self> {
        test_methods!(Self =>
            test_param_string_utf16_copy,
            test_param_string_narrow_copy,
            test_param_string_narrow_copy_create_owned,
            test_param_string_utf8_borrowed,
            test_param_string_utf8_borrowed_create_owned,
            test_param_string_utf16_borrowed,
            test_param_string_utf16_borrowed_create_owned_utf16,
            test_param_string_utf16_borrowed_create_owned_narrow,
            test_param_string_to_ascii_fresh,
            test_param_string_to_ascii_pooled,
            test_param_string_to_utf8_fresh,
            test_param_string_to_utf8_pooled,
            test_param_string_to_utf8_stack,
            test_return_string_narrow_alloc,
            test_return_string_utf16_alloc,
            test_return_string_byte_ptr,
            test_return_string_utf16_ptr,
            test_return_string_reuse_buffer_utf16,
            test_return_string_allocate_buffer_utf16,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use marshalbench_core::TestMethod;

    const BASE: &str = "abcde12345";

    #[test]
    fn test_length_is_utf16_units() {
        assert_eq!(StringTests::new(BASE, 1, 64).len(), 10);
        assert_eq!(StringTests::new("é", 1, 64).len(), 1);
        assert!(StringTests::new("", 1, 64).is_empty());
    }

    #[test]
    fn test_ascii_byte() {
        assert_eq!(ascii_byte(u16::from(b'a')), b'a');
        assert_eq!(ascii_byte(0xe9), b'?');
        assert_eq!(ascii_byte(0x4e2d), b'?');
    }

    #[test]
    fn test_encode_utf8_nul() {
        let units: Vec<u16> = "hé".encode_utf16().collect();
        let mut out = [0xffu8; 8];
        assert_eq!(encode_utf8_nul(&units, &mut out), Some(3));
        assert_eq!(&out[..4], &[b'h', 0xc3, 0xa9, 0]);

        let mut tiny = [0u8; 3];
        assert_eq!(encode_utf8_nul(&units, &mut tiny), None);
        assert_eq!(encode_utf8_nul(&[0xd800], &mut out), None);
    }

    #[test]
    fn test_every_strategy_runs() {
        let mut tests = StringTests::new(BASE, 2, 64);
        let registry = StringTests::registry();
        assert_eq!(registry.len(), 19);

        let methods: [TestMethod<StringTests>; 10] = [
            StringTests::test_param_string_utf16_copy,
            StringTests::test_param_string_narrow_copy_create_owned,
            StringTests::test_param_string_utf16_borrowed_create_owned_narrow,
            StringTests::test_param_string_to_ascii_pooled,
            StringTests::test_param_string_to_utf8_pooled,
            StringTests::test_param_string_to_utf8_stack,
            StringTests::test_return_string_narrow_alloc,
            StringTests::test_return_string_utf16_alloc,
            StringTests::test_return_string_reuse_buffer_utf16,
            StringTests::test_return_string_allocate_buffer_utf16,
        ];
        for method in methods {
            assert_eq!(method(&mut tests), Ok(2));
        }
    }

    #[test]
    fn test_return_strategies_see_the_full_string() {
        let mut tests = StringTests::new(BASE.repeat(100), 3, 64);
        tests.test_return_string_byte_ptr().unwrap();
        assert_eq!(tests.sink().total(), 3000.0);

        // 1000 units do not fit the 32-unit pool; the callee allocates.
        tests.test_return_string_reuse_buffer_utf16().unwrap();
        assert_eq!(tests.sink().total(), 6000.0);

        tests.test_return_string_utf16_ptr().unwrap();
        assert_eq!(tests.sink().total(), 9000.0);
    }

    #[test]
    fn test_long_string_uses_heap_fallback() {
        let mut tests = StringTests::new(BASE.repeat(500), 1, 64);
        assert_eq!(tests.test_param_string_to_utf8_stack(), Ok(1));
        assert_eq!(tests.test_param_string_to_utf8_pooled(), Ok(1));
    }
}
