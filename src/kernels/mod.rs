//! Kernel implementations
//!
//! This module provides the low-level compute kernels. Kernels are generic
//! over `T: Element`, operate on raw pointers, and perform no per-element
//! validation — callers (normally the [`crate::launch`] entry points) check
//! every precondition once before a kernel starts.
//!
//! Each kernel fans out over a flat index space, one logical task per
//! element, mirroring a device grid launch. With the `rayon` feature the
//! fan-out is multi-threaded; tasks are chunked so scheduling overhead
//! amortizes over `FAN_OUT_MIN_LEN` elements.

#![allow(unsafe_op_in_unsafe_fn)] // Kernels are already marked unsafe, inner unsafe is redundant

pub mod elementwise;
pub mod index;
pub mod pool2d;

pub use elementwise::{
    binary_backward_kernel, binary_forward_kernel, unary_backward_kernel, unary_forward_kernel,
};
pub use index::{resolve, StridedIndex};
pub use pool2d::{pool2d_backward_kernel, pool2d_forward_kernel, Pool2dKind, Pool2dOp};

#[cfg(feature = "rayon")]
use rayon::prelude::*;

/// Minimum flat indices per parallel task chunk.
///
/// Chunk boundaries never affect results beyond floating-point reduction
/// order; this only bounds scheduling overhead for small launches.
#[cfg(feature = "rayon")]
pub(crate) const FAN_OUT_MIN_LEN: usize = 1024;

/// Run `task` once for every flat index in `[0, numel)`.
#[cfg(feature = "rayon")]
#[inline]
pub(crate) fn for_each_flat(numel: usize, task: impl Fn(usize) + Send + Sync) {
    (0..numel)
        .into_par_iter()
        .with_min_len(FAN_OUT_MIN_LEN)
        .for_each(task);
}

/// Run `task` once for every flat index in `[0, numel)`.
#[cfg(not(feature = "rayon"))]
#[inline]
pub(crate) fn for_each_flat(numel: usize, task: impl Fn(usize)) {
    for i in 0..numel {
        task(i);
    }
}
