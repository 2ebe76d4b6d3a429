// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Status codes and borrowed string views shared by all entry points.

use marshalbench_core::BoundaryFault;

/// Status returned by fallible entry points.
/// Layout is a C `int`; values are stable.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MbStatus {
    Success = 0,
    NullPointer = 1,
    CallbackNotSet = 2,
    AllocationFailed = 3,
    InvalidEncoding = 4,
    CallbackMismatch = 5,
}

impl MbStatus {
    /// Check if the status indicates success.
    #[inline]
    pub fn is_success(self) -> bool {
        self == MbStatus::Success
    }

    /// Convert to a `Result`, attributing any fault to `entry_point`.
    #[inline]
    pub fn into_result(self, entry_point: &'static str) -> Result<(), BoundaryFault> {
        match self {
            MbStatus::Success => Ok(()),
            MbStatus::NullPointer => Err(BoundaryFault::NullPointer { entry_point }),
            MbStatus::CallbackNotSet => Err(BoundaryFault::CallbackNotSet { entry_point }),
            MbStatus::AllocationFailed => Err(BoundaryFault::AllocationFailed { entry_point }),
            MbStatus::InvalidEncoding => Err(BoundaryFault::InvalidEncoding { entry_point }),
            MbStatus::CallbackMismatch => Err(BoundaryFault::CallbackMismatch { entry_point }),
        }
    }
}

/// Borrowed UTF-8 string view passed by value across the boundary.
///
/// The view does not own its bytes; the side that produced it keeps them alive
/// for the duration documented on each entry point.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct MbStr {
    pub ptr: *const u8,
    pub len: usize,
}

impl MbStr {
    /// Borrow a Rust string. The view is valid while `s` is.
    pub fn new(s: &str) -> Self {
        Self {
            ptr: s.as_ptr(),
            len: s.len(),
        }
    }

    /// An empty view with a null pointer.
    pub const fn null() -> Self {
        Self {
            ptr: std::ptr::null(),
            len: 0,
        }
    }

    /// View the bytes. A null pointer yields an empty slice.
    ///
    /// # Safety
    /// `ptr` must be null or valid for reads of `len` bytes for `'a`.
    pub unsafe fn as_bytes<'a>(&self) -> &'a [u8] {
        if self.ptr.is_null() {
            &[]
        } else {
            std::slice::from_raw_parts(self.ptr, self.len)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_into_result() {
        assert!(MbStatus::Success.into_result("mb_x").is_ok());
        assert_eq!(
            MbStatus::CallbackNotSet.into_result("mb_x"),
            Err(BoundaryFault::CallbackNotSet { entry_point: "mb_x" })
        );
        assert_eq!(
            MbStatus::CallbackMismatch.into_result("mb_x"),
            Err(BoundaryFault::CallbackMismatch { entry_point: "mb_x" })
        );
        assert!(!MbStatus::AllocationFailed.is_success());
    }

    #[test]
    fn test_status_layout_is_c_int() {
        assert_eq!(std::mem::size_of::<MbStatus>(), std::mem::size_of::<i32>());
        assert_eq!(MbStatus::InvalidEncoding as i32, 4);
        assert_eq!(MbStatus::CallbackMismatch as i32, 5);
    }

    #[test]
    fn test_mb_str_views() {
        let s = String::from("abc");
        let view = MbStr::new(&s);
        assert_eq!(unsafe { view.as_bytes() }, b"abc");
        assert!(unsafe { MbStr::null().as_bytes() }.is_empty());
    }
}
