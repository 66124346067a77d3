//! Lock-free float accumulation for backward kernels
//!
//! Element-wise backward passes accumulate gradients from many parallel tasks
//! into buffers whose layouts may alias (a broadcast dimension has stride 0,
//! so every task along it resolves to the same storage offset). The adds must
//! therefore be atomic.
//!
//! Hardware float fetch-add is not exposed for these types, so each impl
//! substitutes a compare-and-swap loop over the type's bit representation.
//! Which shim applies is decided per element type through the trait impl, at
//! compile time. Relaxed ordering suffices: the accumulate is commutative and
//! publishes no other memory.

use super::Element;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};

#[cfg(feature = "f16")]
use std::sync::atomic::AtomicU16;

/// Element types that support atomic in-place addition.
///
/// Required by the element-wise backward kernels; pooling backward writes are
/// disjoint per task and accumulate with plain `+=` instead.
pub trait AtomicAccum: Element {
    /// Atomically perform `*ptr += value`.
    ///
    /// # Safety
    /// - `ptr` must be valid for reads and writes and properly aligned
    /// - every concurrent access to `*ptr` for the duration of the kernel
    ///   must go through this function
    unsafe fn atomic_add(ptr: *mut Self, value: Self);
}

impl AtomicAccum for f32 {
    #[inline]
    unsafe fn atomic_add(ptr: *mut Self, value: Self) {
        let atomic = unsafe { &*(ptr as *const AtomicU32) };
        let mut current = atomic.load(Ordering::Relaxed);
        loop {
            let new = (f32::from_bits(current) + value).to_bits();
            match atomic.compare_exchange_weak(current, new, Ordering::Relaxed, Ordering::Relaxed)
            {
                Ok(_) => break,
                Err(actual) => current = actual,
            }
        }
    }
}

impl AtomicAccum for f64 {
    #[inline]
    unsafe fn atomic_add(ptr: *mut Self, value: Self) {
        let atomic = unsafe { &*(ptr as *const AtomicU64) };
        let mut current = atomic.load(Ordering::Relaxed);
        loop {
            let new = (f64::from_bits(current) + value).to_bits();
            match atomic.compare_exchange_weak(current, new, Ordering::Relaxed, Ordering::Relaxed)
            {
                Ok(_) => break,
                Err(actual) => current = actual,
            }
        }
    }
}

#[cfg(feature = "f16")]
impl AtomicAccum for half::f16 {
    #[inline]
    unsafe fn atomic_add(ptr: *mut Self, value: Self) {
        let atomic = unsafe { &*(ptr as *const AtomicU16) };
        let mut current = atomic.load(Ordering::Relaxed);
        loop {
            let new = (half::f16::from_bits(current) + value).to_bits();
            match atomic.compare_exchange_weak(current, new, Ordering::Relaxed, Ordering::Relaxed)
            {
                Ok(_) => break,
                Err(actual) => current = actual,
            }
        }
    }
}

#[cfg(feature = "f16")]
impl AtomicAccum for half::bf16 {
    #[inline]
    unsafe fn atomic_add(ptr: *mut Self, value: Self) {
        let atomic = unsafe { &*(ptr as *const AtomicU16) };
        let mut current = atomic.load(Ordering::Relaxed);
        loop {
            let new = (half::bf16::from_bits(current) + value).to_bits();
            match atomic.compare_exchange_weak(current, new, Ordering::Relaxed, Ordering::Relaxed)
            {
                Ok(_) => break,
                Err(actual) => current = actual,
            }
        }
    }
}
