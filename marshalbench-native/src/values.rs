// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Value-type entry points: vectors and scalars, by value or by pointer.

use std::hint::black_box;
use std::ops::Add;

/// Four packed `f32`s. Layout must match a C `struct { float x, y, z, w; }`.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Float4 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub w: f32,
}

impl Float4 {
    pub const fn new(x: f32, y: f32, z: f32, w: f32) -> Self {
        Self { x, y, z, w }
    }

    /// Sum of all lanes.
    pub fn sum(&self) -> f32 {
        self.x + self.y + self.z + self.w
    }
}

impl Add for Float4 {
    type Output = Float4;

    fn add(self, rhs: Float4) -> Float4 {
        Float4::new(
            self.x + rhs.x,
            self.y + rhs.y,
            self.z + rhs.z,
            self.w + rhs.w,
        )
    }
}

/// Two packed `f32`s. Layout must match a C `struct { float x, y; }`.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Float2 {
    pub x: f32,
    pub y: f32,
}

impl Float2 {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Vector returned by the `*_return_*` entry points.
pub const TEST_VECTOR: Float4 = Float4::new(1.0, 2.0, 3.0, 4.0);

#[no_mangle]
#[inline(never)]
pub extern "C" fn mb_vector4_param_direct(v: Float4) {
    black_box(v);
}

/// # Safety
/// `v` must be null or point to a readable `Float4`.
#[no_mangle]
#[inline(never)]
pub unsafe extern "C" fn mb_vector4_param_ptr(v: *const Float4) {
    if let Some(v) = v.as_ref() {
        black_box(*v);
    }
}

#[no_mangle]
#[inline(never)]
pub extern "C" fn mb_vector2_param_direct(v: Float2) {
    black_box(v);
}

/// # Safety
/// `v` must be null or point to a readable `Float2`.
#[no_mangle]
#[inline(never)]
pub unsafe extern "C" fn mb_vector2_param_ptr(v: *const Float2) {
    if let Some(v) = v.as_ref() {
        black_box(*v);
    }
}

#[no_mangle]
#[inline(never)]
pub extern "C" fn mb_vector4_return_direct() -> Float4 {
    black_box(TEST_VECTOR)
}

/// # Safety
/// `out` must be null or point to a writable `Float4`.
#[no_mangle]
#[inline(never)]
pub unsafe extern "C" fn mb_vector4_return_ptr(out: *mut Float4) {
    if !out.is_null() {
        *out = black_box(TEST_VECTOR);
    }
}

#[no_mangle]
#[inline(never)]
pub extern "C" fn mb_int_return_direct() -> i32 {
    black_box(1)
}

/// # Safety
/// `out` must be null or point to a writable `i32`.
#[no_mangle]
#[inline(never)]
pub unsafe extern "C" fn mb_int_return_ptr(out: *mut i32) {
    if !out.is_null() {
        *out = black_box(1);
    }
}

#[no_mangle]
#[inline(never)]
pub extern "C" fn mb_double_return_direct() -> f64 {
    black_box(1.0)
}

/// # Safety
/// `out` must be null or point to a writable `f64`.
#[no_mangle]
#[inline(never)]
pub unsafe extern "C" fn mb_double_return_ptr(out: *mut f64) {
    if !out.is_null() {
        *out = black_box(1.0);
    }
}
