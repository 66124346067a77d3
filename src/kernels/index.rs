//! Strided index resolution
//!
//! Every element-wise kernel iterates a dense row-major logical space and
//! needs the storage offset each flat index lands on in a particular strided
//! view. [`resolve`] answers that for a single index; [`StridedIndex`] walks
//! all of them in order with incremental updates instead of per-element
//! div/mod.

use crate::layout::Layout;
use smallvec::SmallVec;

/// Map a flat row-major index to a storage offset.
///
/// Decomposes `flat_index` into a multi-index by repeated div/mod against
/// `shape`, innermost (fastest-varying) dimension first, and accumulates
/// `multi_index[d] * strides[d]`. Stride 0 collapses a broadcast dimension
/// onto a single storage element; negative strides walk backwards.
///
/// No bounds checking is performed: the caller guarantees
/// `flat_index < shape.iter().product()` and `shape.len() == strides.len()`.
/// A layout offset, if any, is the caller's to add.
#[inline]
pub fn resolve(flat_index: usize, shape: &[usize], strides: &[isize]) -> isize {
    debug_assert_eq!(shape.len(), strides.len());

    let mut remainder = flat_index;
    let mut offset = 0isize;
    for d in (0..shape.len()).rev() {
        let idx = remainder % shape[d];
        remainder /= shape[d];
        offset += idx as isize * strides[d];
    }
    offset
}

/// Resolve a flat index within a layout, including its storage offset.
#[inline]
pub(crate) fn resolve_in(layout: &Layout, flat_index: usize) -> isize {
    layout.offset() as isize + resolve(flat_index, layout.shape(), layout.strides())
}

/// Iterator over the storage offsets of a strided view, in flat row-major
/// order.
///
/// Yields exactly what [`resolve`] (plus the layout offset) yields for flat
/// indices `0..elem_count`, but advances by carrying a multi-index instead of
/// re-dividing, which is cheaper when a serial walk visits every element.
pub struct StridedIndex<'a> {
    shape: &'a [usize],
    strides: &'a [isize],
    indices: SmallVec<[usize; 4]>,
    offset: isize,
    remaining: usize,
}

impl<'a> StridedIndex<'a> {
    /// Start a walk over all elements of `layout`.
    pub fn new(layout: &'a Layout) -> Self {
        Self {
            shape: layout.shape(),
            strides: layout.strides(),
            indices: SmallVec::from_elem(0, layout.ndim()),
            offset: layout.offset() as isize,
            remaining: layout.elem_count(),
        }
    }
}

impl Iterator for StridedIndex<'_> {
    type Item = isize;

    fn next(&mut self) -> Option<isize> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;
        let current = self.offset;

        // Increment the multi-index with incremental offset updates
        for dim in (0..self.shape.len()).rev() {
            self.indices[dim] += 1;
            self.offset += self.strides[dim];

            if self.indices[dim] < self.shape[dim] {
                break;
            }

            // Reset this dimension and adjust the offset
            self.indices[dim] = 0;
            self.offset -= (self.shape[dim] as isize) * self.strides[dim];
        }

        Some(current)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl ExactSizeIterator for StridedIndex<'_> {}
